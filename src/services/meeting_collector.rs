use serde_json::Value;

use crate::error::GatewayError;
use crate::models::Meeting;
use crate::services::batch_builder::{calendar_event_params, CALENDAR_METHOD};
use crate::services::bitrix_client::BitrixTransport;
use crate::utils::dates::{parse_backend_datetime, ReportWindow};
use crate::utils::value_as_string;

pub struct MeetingCollector<'a> {
    client: &'a dyn BitrixTransport,
    user_id: &'a str,
}

impl<'a> MeetingCollector<'a> {
    pub fn new(client: &'a dyn BitrixTransport, user_id: &'a str) -> Self {
        Self { client, user_id }
    }

    /// Calendar events of the subject in the window, one direct call.
    pub async fn collect_meetings(&self, window: &ReportWindow) -> Result<Vec<Meeting>, GatewayError> {
        let params = calendar_event_params(self.user_id, window);
        let events = match self.client.call(CALENDAR_METHOD, params).await? {
            Some(Value::Array(events)) => events,
            Some(other) => {
                log::warn!("[MeetingCollector] unexpected calendar response: {}", other);
                return Ok(Vec::new());
            }
            None => {
                log::debug!("[MeetingCollector] no calendar data");
                return Ok(Vec::new());
            }
        };

        let meetings: Vec<Meeting> = events
            .iter()
            .filter_map(|raw| match parse_meeting(raw) {
                Ok(meeting) => Some(meeting),
                Err(e) => {
                    log::warn!("[MeetingCollector] skipping event: {}", e);
                    None
                }
            })
            .collect();
        log::debug!("[MeetingCollector] {} meetings collected", meetings.len());
        Ok(meetings)
    }
}

fn parse_meeting(raw: &Value) -> Result<Meeting, String> {
    let id = raw.get("ID").and_then(value_as_string).unwrap_or_default();
    let datetime = |field: &str| {
        let value = raw.get(field).and_then(Value::as_str).unwrap_or_default();
        parse_backend_datetime(value).ok_or_else(|| format!("event {} has invalid {} {:?}", id, field, value))
    };
    let date_from = datetime("DATE_FROM")?;
    let date_to = datetime("DATE_TO")?;

    Ok(Meeting {
        name: raw
            .get("NAME")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .unwrap_or("Untitled")
            .to_string(),
        date_from,
        date_to,
        attendees: parse_attendees(raw.get("ATTENDEES")),
        location: raw.get("LOCATION").and_then(value_as_string).unwrap_or_default(),
        id,
    })
}

/// Display names of attendee objects; entries without a usable name are skipped.
fn parse_attendees(raw: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(attendees)) = raw else {
        return Vec::new();
    };
    attendees
        .iter()
        .filter_map(|a| {
            ["NAME", "DISPLAY_NAME"]
                .iter()
                .filter_map(|field| a.get(*field).and_then(Value::as_str))
                .find(|name| !name.is_empty())
                .map(str::to_string)
        })
        .collect()
}

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Meeting {
    pub id: String,
    pub name: String,
    pub date_from: NaiveDateTime,
    pub date_to: NaiveDateTime,
    pub attendees: Vec<String>,
    pub location: String,
}

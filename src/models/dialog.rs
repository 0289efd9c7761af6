use serde::{Deserialize, Serialize};

/// Topic used when a dialog could not be summarized.
pub const UNSUMMARIZED_TOPIC: &str = "Chat not summarized (summary service unavailable)";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DialogSummary {
    pub dialog_id: String,
    pub dialog_name: String,
    pub message_count: usize,
    pub topic: String,
    pub agreements: Vec<String>,
    pub decisions: Vec<String>,
    pub questions: Vec<String>,
    pub awaits_response: bool,
}

impl DialogSummary {
    /// Degraded record for a dialog the summarizer could not handle.
    pub fn placeholder(dialog_id: &str, dialog_name: &str, message_count: usize) -> Self {
        Self {
            dialog_id: dialog_id.to_string(),
            dialog_name: dialog_name.to_string(),
            message_count,
            topic: UNSUMMARIZED_TOPIC.to_string(),
            agreements: Vec::new(),
            decisions: Vec::new(),
            questions: Vec::new(),
            awaits_response: false,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.topic == UNSUMMARIZED_TOPIC
    }
}

/// One chat message as fed to the summarizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub author_name: String,
    pub text: String,
    pub date: String,
}

use serde::{Deserialize, Serialize};

pub const DATA_LOADING_ERROR: &str = "Data Loading Error";
pub const DATA_LOADING_WARNING: &str = "Data Loading Warning";
pub const CHAT: &str = "Chat";
pub const HISTOGRAM: &str = "Histogram";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Warning,
    Error,
}

/// A user-facing, non-fatal notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub topic: String,
    pub message: String,
}

impl Alert {
    pub fn warning(topic: &str, message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Warning,
            topic: topic.to_string(),
            message: message.into(),
        }
    }

    pub fn error(topic: &str, message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Error,
            topic: topic.to_string(),
            message: message.into(),
        }
    }
}

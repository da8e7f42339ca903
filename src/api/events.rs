use serde::{Deserialize, Serialize};

use crate::api::models::Message;

/// What an open chat subscription reports to whoever is listening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "data", rename_all = "snake_case")]
pub enum ChatEvent {
    Refreshed(Vec<Message>),
    FetchFailed(String),
    Closed,
}

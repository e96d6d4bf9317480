//! Client-side tools an assistant may call to drive the explorer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alert::{self, Alert};
use crate::data::model::EntityId;
use crate::state::AppState;

pub const HIGHLIGHT_PATIENT_JOURNEYS: &str = "client_tool_highlight_patient_journeys";

const HIGHLIGHTED: &str = "Highlighted the patient journeys in the app by adding them to the cohort. \
Patients in the cohort are colored within the scatter plot.";
const REJECTED: &str = "The user rejected the execution of the tool call.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFunction {
    pub name: String,
    /// JSON-encoded argument object.
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub function: ToolFunction,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            function: ToolFunction {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Answer to one tool call, sent back to the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolMessage {
    pub tool_call_id: String,
    pub content: String,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool call: {0}")]
    UnknownTool(String),

    #[error("Invalid parameters for {tool}: {source}")]
    InvalidArguments {
        tool: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("no data is loaded")]
    NoSession,
}

#[derive(Debug, Deserialize)]
struct HighlightArguments {
    pids: Vec<EntityId>,
}

/// Run confirmed tool calls in order. Each successful call yields a tool
/// message; a failing call raises an error alert and yields none.
pub fn execute_tool_calls(state: &mut AppState, calls: &[ToolCall]) -> Vec<ToolMessage> {
    let mut messages = Vec::new();
    for call in calls {
        match execute(state, call) {
            Ok(content) => messages.push(ToolMessage {
                tool_call_id: call.id.clone(),
                content: content.to_string(),
            }),
            Err(e) => {
                log::error!("Tool call {} ({}) failed: {e}", call.id, call.function.name);
                state.push_alert(Alert::error(
                    alert::CHAT,
                    format!("Executing tool call \"{}\" failed. {e}", call.function.name),
                ));
            }
        }
    }
    messages
}

/// Answer every call with a rejection notice, touching no state.
pub fn reject_tool_calls(calls: &[ToolCall]) -> Vec<ToolMessage> {
    calls
        .iter()
        .map(|call| ToolMessage {
            tool_call_id: call.id.clone(),
            content: REJECTED.to_string(),
        })
        .collect()
}

fn execute(state: &mut AppState, call: &ToolCall) -> Result<&'static str, ToolError> {
    match call.function.name.as_str() {
        HIGHLIGHT_PATIENT_JOURNEYS => {
            let args: HighlightArguments = serde_json::from_str(&call.function.arguments)
                .map_err(|source| ToolError::InvalidArguments {
                    tool: HIGHLIGHT_PATIENT_JOURNEYS,
                    source,
                })?;
            let session = state.session_mut().ok_or(ToolError::NoSession)?;
            session.clear_cohort();
            let added = session.add_to_cohort(args.pids);
            log::info!("Highlighted {added} patient journeys");
            Ok(HIGHLIGHTED)
        }
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

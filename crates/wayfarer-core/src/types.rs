use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one orchestration run.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single content block in a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
}

/// A chat message exchanged with a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_role(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::with_role(Role::User, text)
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, text)
    }

    fn with_role(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentBlock::Text { text: text.into() }],
            timestamp: Some(Utc::now()),
        }
    }

    /// Extract all text content from this message.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|b| match b {
                ContentBlock::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Stop reason from the LLM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
}

/// A streaming delta from the LLM.
#[derive(Debug, Clone)]
pub enum StreamDelta {
    /// A chunk of text content.
    TextDelta(String),

    /// The response is complete.
    Stop(StopReason),

    /// Usage information.
    Usage {
        input_tokens: u64,
        output_tokens: u64,
    },
}

/// The stages of the booking workflow.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    SearchFlights,
    SelectSeat,
    ProcessPayment,
}

impl Stage {
    /// Key under which this stage's conversation history is kept.
    pub fn history_key(&self) -> &'static str {
        match self {
            Self::SearchFlights => "flight_search",
            Self::SelectSeat => "seat_selection",
            Self::ProcessPayment => "payment",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::SearchFlights => "SearchFlights",
            Self::SelectSeat => "SelectSeat",
            Self::ProcessPayment => "ProcessPayment",
        };
        f.write_str(name)
    }
}

/// Run event broadcast to all subscribers.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// Run started.
    RunStarted { run_id: RunId, limit: u64 },
    /// Control entered a stage.
    StageStarted { stage: Stage },
    /// A delegated call was charged to the run's meter.
    UsageReserved { worker: String, used: u64, limit: u64 },
    /// Flight search produced candidates.
    FlightsFound { count: usize },
    /// The seat worker returned an unusable seat and will be asked again.
    /// `label` is absent when the answer could not be parsed at all.
    SeatRejected { label: Option<String>, reason: String },
    /// Payment came back declined; the flow restarts from search.
    PaymentFailed { reason: String },
    /// A stage finished (successfully or not).
    StageCompleted { stage: Stage, elapsed_ms: u64 },
    /// Run reached a terminal state.
    RunCompleted { run_id: RunId, succeeded: bool, used: u64 },
    /// Run aborted with an error.
    RunError { run_id: RunId, error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_text() {
        let msg = ChatMessage::assistant_text("hello");
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.text(), "hello");
    }

    #[test]
    fn test_message_serialization_skips_missing_timestamp() {
        let mut msg = ChatMessage::user("hi");
        msg.timestamp = None;
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"][0]["type"], "text");
        assert!(json.get("timestamp").is_none());
    }

    #[test]
    fn test_stage_history_keys_are_distinct() {
        let keys = [
            Stage::SearchFlights.history_key(),
            Stage::SelectSeat.history_key(),
            Stage::ProcessPayment.history_key(),
        ];
        assert_eq!(keys, ["flight_search", "seat_selection", "payment"]);
        assert_eq!(Stage::SelectSeat.to_string(), "SelectSeat");
    }
}

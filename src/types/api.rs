use serde::{Deserialize, Serialize};

/// One persisted exchange from the durable transcript endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    #[serde(default)]
    pub user_message: Option<String>,
    #[serde(default)]
    pub ai_message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chatroom {
    pub id: u64,
    pub name: String,
}

/// Movie entry from the recommendation endpoint. Only the fields the list
/// view renders; the backend sends more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub year: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_turn_tolerates_sparse_records() {
        let turn: ChatTurn = serde_json::from_str(r#"{"user_message":"hi"}"#).unwrap();
        assert_eq!(turn.user_message.as_deref(), Some("hi"));
        assert!(turn.ai_message.is_none());
        assert!(turn.timestamp.is_none());
    }

    #[test]
    fn test_message_request_serializes_content_key() {
        let body = MessageRequest {
            content: "recommend something".to_string(),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["content"], "recommend something");
    }
}

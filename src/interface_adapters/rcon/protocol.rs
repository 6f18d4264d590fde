// Wire frames for the remote console protocol. The contract is external and
// fixed: JSON objects with PascalCase keys, correlated purely by Identifier.

use serde::{Deserialize, Serialize};

/// Sender name stamped on every outgoing frame; the value the server's own
/// browser console uses, so server-side logs stay familiar.
pub const SENDER_NAME: &str = "WebRcon";

/// Outgoing request frame.
#[derive(Debug, Clone, Serialize)]
pub struct CommandFrame {
    #[serde(rename = "Identifier")]
    pub identifier: u64,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Name")]
    pub name: String,
}

impl CommandFrame {
    pub fn new(identifier: u64, message: impl Into<String>) -> Self {
        Self {
            identifier,
            message: message.into(),
            name: SENDER_NAME.to_string(),
        }
    }
}

/// Incoming reply frame. Identifier 0 marks unsolicited console output.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyFrame {
    #[serde(rename = "Identifier", default)]
    pub identifier: u64,
    #[serde(rename = "Message", default)]
    pub message: String,
    #[serde(rename = "Type", default)]
    pub reply_type: String,
}

impl ReplyFrame {
    /// Unsolicited console output pushed by the server, as opposed to a
    /// reply to one of our requests.
    pub fn is_out_of_band(&self) -> bool {
        self.identifier == 0
    }
}

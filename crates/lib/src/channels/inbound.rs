//! Inbound message from the carrier: delivered to the gateway's processor task.

use chrono::{DateTime, Utc};

/// A message from the carrier webhook, routed and answered by one unit of
/// background work. Discarded after processing.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Sender identifier in the carrier's format (e.g. "whatsapp:+9144...").
    pub sender: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

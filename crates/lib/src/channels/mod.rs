//! Carrier transport (WhatsApp via Twilio).
//!
//! Inbound messages arrive as webhook POSTs handled by the gateway; outbound
//! replies are delivered through a carrier handle so the processing path does
//! not depend on a concrete carrier.

mod inbound;
mod whatsapp;

pub use inbound::IncomingMessage;
pub use whatsapp::WhatsAppChannel;

use async_trait::async_trait;

/// Handle to an outbound carrier (send a message to a recipient).
#[async_trait]
pub trait CarrierHandle: Send + Sync {
    /// Carrier id (e.g. "whatsapp").
    fn id(&self) -> &str;
    /// Deliver a text message to a recipient (carrier-format identifier).
    async fn send_message(&self, to: &str, body: &str) -> Result<(), String>;
}

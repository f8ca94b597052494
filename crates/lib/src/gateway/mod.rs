//! Gateway: webhook HTTP server.
//!
//! Serves the carrier webhook, a liveness endpoint, and a manual-send endpoint
//! on one port. Inbound messages are acked immediately and processed by a
//! background task.

mod server;

pub use server::{run_gateway, GatewayState};

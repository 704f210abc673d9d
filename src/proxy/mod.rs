//! Proxy module
//!
//! Outbound calls to the model gateway, plus per-dispatch logging.

pub mod gateway;
pub mod logging;

pub use gateway::{GatewayClient, InvalidApiKey};
pub use logging::DispatchContext;

//! skypilot-server: pilot session and web API for SkyPilot

pub mod config;
pub mod http;
pub mod logging;
pub mod session;

pub use config::{AppConfig, ConfigError, ServerConfig};
pub use http::create_router;
pub use session::{PilotSession, SessionStatus};

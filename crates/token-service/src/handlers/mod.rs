//! HTTP request handlers.

pub mod agent_handler;
pub mod auth_handler;
pub mod health_handler;

use crate::config::Config;
use crate::services::dispatch_service::DispatchService;

/// Application state shared across handlers.
pub struct AppState {
    pub config: Config,
    pub dispatch: DispatchService,
}

//! HTTP API for `AgriConnect` USSD
//!
//! The gateway webhook, a health probe, and optional session administration.

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::UssdRuntime;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<UssdRuntime>,
}

impl AppState {
    pub fn new(runtime: Arc<UssdRuntime>) -> Self {
        Self { runtime }
    }
}

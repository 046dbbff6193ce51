//! HTTP handler definitions for the Keyward server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for convenient access
//! when building the router.

pub mod enroll;
pub mod health;
pub mod identities;

pub use enroll::{enroll_handler, reenroll_handler};
pub use health::{health_handler, liveness_handler};
pub use identities::get_identity_handler;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::Json;
use serde_json::{json, Value};

use super::NetworkConfig;
use crate::ca::CaServer;
use crate::context::RequestContext;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references to shared resources so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Every CA served by this process.
    pub server: Arc<CaServer>,
    /// Network configuration (bind address, timeouts, body limit).
    pub config: Arc<NetworkConfig>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Creates the security context for one inbound request.
    #[must_use]
    pub fn context(&self, request: Request) -> RequestContext {
        RequestContext::from_request(request, Arc::clone(&self.server), self.config.max_body_bytes)
    }
}

/// Wraps a handler result in the success envelope.
fn success(result: Value) -> Json<Value> {
    Json(json!({
        "success": true,
        "result": result,
        "errors": [],
        "messages": [],
    }))
}

//! Access-token and agent-dispatch gateway.
//!
//! A thin HTTP facade over the LiveKit-style media platform: it validates a
//! request, signs an access grant or relays an agent dispatch, and returns
//! JSON. The platform owns everything hard; the design substance here is
//! the token issuer and the dispatch deduplicator.
//!
//! # Modules
//!
//! - `config` - environment configuration
//! - `errors` - error taxonomy and HTTP mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - trusted-host enforcement
//! - `models` - request/response models
//! - `routes` - router assembly
//! - `services` - token issuance and dispatch deduplication

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

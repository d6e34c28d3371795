//! Protocol adapters (HTTP, webhooks)
//!
//! This crate exposes the issue relay over HTTP: the axum routes that accept
//! GitLab webhooks and the server that hosts them.

pub mod webhook_router;
pub mod http_server;

pub use webhook_router::{reply_for, WebhookRouter, HEALTH_PATH, MAX_BODY_BYTES, WEBHOOK_PATH};
pub use http_server::{HttpServer, ServerConfig, ServerError, DEFAULT_PORT};

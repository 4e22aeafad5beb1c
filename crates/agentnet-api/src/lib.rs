//! HTTP API for AgentNet.
//!
//! Two axum routers: one exposing a discovery service, one exposing an
//! agent's message router and tools. Errors render as
//! `{"error": {"kind": ..., "message": ...}}` with a status derived from the
//! error kind.

pub mod agent;
pub mod discovery;
pub mod error;
pub mod server;

pub use agent::agent_router;
pub use discovery::discovery_router;
pub use error::{status_for, ApiError, ApiResult};
pub use server::{bind, serve, serve_on};

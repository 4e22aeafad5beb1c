//! Agent runtime for AgentNet.
//!
//! Everything an agent process needs besides its HTTP surface: the resilient
//! outbound client, the tool dispatcher and bundled tools, inbound message
//! routing, the discovery client, and the register/heartbeat lifecycle.

pub mod agent;
pub mod client;
pub mod discovery_client;
pub mod peer;
pub mod retry;
pub mod router;
pub mod supervisor;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::{generate_agent_id, AgentNode};
pub use client::{CallOptions, ClientError, HttpRequest, HttpResponse, ResilientClient, Transport};
pub use discovery_client::DiscoveryClient;
pub use peer::PeerClient;
pub use router::{MessageHandler, MessageRouter, ToolRequestHandler};
pub use supervisor::Supervisor;
pub use tools::{Tool, ToolDispatcher, ToolError};

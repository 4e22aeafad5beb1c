//! Core types for AgentNet.
//!
//! This crate defines the data structures shared by the discovery registry,
//! the agent runtime, and the HTTP surface. It contains no business logic.

pub mod agent;
pub mod config;
pub mod error;
pub mod message;
pub mod tool;

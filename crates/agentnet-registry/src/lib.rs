//! AgentNet discovery registry.
//!
//! Tracks which agents exist, where they live, and whether they are alive.
//!
//! ## Architecture
//!
//! - **RegistryStore**: concurrent table of agent records with atomic per-id mutation
//! - **Sweeper**: background task applying the ACTIVE → STALE → REMOVED state machine
//! - **DiscoveryService**: register / unregister / heartbeat / list / get over the store
//! - **AgentDirectory**: lookup trait shared by the in-process service and remote clients

pub mod clock;
pub mod directory;
pub mod discovery;
pub mod store;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use directory::AgentDirectory;
pub use discovery::{DiscoveryService, DiscoveryStats};
pub use store::{RegistryStore, SweepOutcome};
pub use sweeper::{LivenessPolicy, SweepReport, Sweeper};

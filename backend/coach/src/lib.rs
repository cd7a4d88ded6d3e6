pub mod coach;
pub mod connection;
pub mod rate_gate;
pub mod triggers;

pub use coach::Coach;
pub use connection::ConnectionContext;
pub use rate_gate::RateGate;
pub use triggers::{TriggerConfig, TriggerReason};

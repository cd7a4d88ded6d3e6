pub mod persist;
pub mod session;
pub mod store;

pub use session::{ContextMessage, Session, SessionExport, SessionStats, StoreStats};
pub use store::{StoreConfig, TranscriptStore};

//! Per-user conversation state and its lifecycle

pub mod clock;
pub mod machine;
pub mod state;
pub mod store;
pub mod supervisor;

pub use clock::{Clock, SystemClock};
pub use machine::{Handled, SessionMachine};
pub use state::{Session, SessionState};
pub use store::SessionStore;
pub use supervisor::IdleSupervisor;

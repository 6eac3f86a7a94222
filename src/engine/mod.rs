pub mod phases;
pub mod priority;
pub mod session;
pub mod summary;
pub mod types;

pub use session::Session;
pub use types::{SkipReason, SweepReport, Transition};

pub mod autoplay;
pub mod scheduler;
pub mod session;

pub use autoplay::autoplay;
pub use scheduler::{FiredTimer, Scheduler, SessionToken, TimerId, TimerKind};
pub use session::{GameSession, SessionReport, TimerOutcome};

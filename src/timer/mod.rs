pub mod clock;
pub mod format;
pub mod state;

pub use clock::{Clock, ClockId, IntervalClock, ManualClock, Tick};
pub use state::{ElapsedTimer, RestState, RestTimer};

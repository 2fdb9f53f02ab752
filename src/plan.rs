pub mod duration;
pub mod progress;
pub mod schedule;

pub use progress::{DayStatus, ProgressState};
pub use schedule::{Item, Schedule, build_schedule};

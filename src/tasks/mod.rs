pub mod power;
pub mod report;
pub mod scheduler;
pub mod timed;

pub use power::{PowerSensor, ReadingSource, SharedPowerSensor};
pub use report::ReportTask;
pub use scheduler::Scheduler;
pub use timed::{Task, TimedTask};

//! Cron scheduling of configured jobs.

pub mod cron;
pub mod scheduler;

pub use self::cron::{CronError, CronSchedule};
pub use self::scheduler::{CronScheduler, ScheduleError, ScheduledJob, SchedulerHandle};

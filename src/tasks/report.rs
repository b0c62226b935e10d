// PowerMon - Report Task
//
// Periodically collects the latest reading from every sensor and passes the
// batch to each reporter. A failing reporter is logged and skipped; it never
// stops the scheduler.

use crate::report::{ReadingResult, Reporter};
use crate::tasks::power::ReadingSource;
use crate::tasks::timed::{Task, TimedTask};

pub struct ReportTask<'a> {
    timer: TimedTask,
    interval_ms: u32,
    sources: Vec<Box<dyn ReadingSource + 'a>>,
    reporters: Vec<Box<dyn Reporter + 'a>>,
}

impl<'a> ReportTask<'a> {
    /// First report goes out one interval after `now`, once the sensors
    /// have had a chance to sample.
    pub fn new(interval_ms: u32, now: u32) -> Self {
        Self {
            timer: TimedTask::new(now.wrapping_add(interval_ms)),
            interval_ms,
            sources: Vec::new(),
            reporters: Vec::new(),
        }
    }

    pub fn source(mut self, source: impl ReadingSource + 'a) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn reporter(mut self, reporter: impl Reporter + 'a) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    pub fn collect(&self) -> Vec<ReadingResult> {
        self.sources.iter().map(|s| s.last_reading()).collect()
    }
}

impl Task for ReportTask<'_> {
    fn name(&self) -> &str {
        "report"
    }

    fn is_due(&self, now: u32) -> bool {
        self.timer.is_due(now)
    }

    fn run(&mut self, now: u32) {
        self.timer.begin(now);

        let readings = self.collect();
        for reporter in self.reporters.iter_mut() {
            if let Err(e) = reporter.report(&readings) {
                log::warn!("Reporter '{}' failed: {}", reporter.name(), e);
            }
        }

        self.timer.advance(self.interval_ms);
    }
}

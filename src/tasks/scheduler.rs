// PowerMon - Cooperative Scheduler
//
// Single execution context: every pass asks each task whether it is due and
// runs the ones that are, in registration order. Tasks never block, so the
// only sleeping happens here between passes.

use std::thread;
use std::time::Duration;

use crate::config::SCHEDULER_IDLE_MS;
use crate::platform::Clock;
use crate::tasks::timed::Task;

pub struct Scheduler<'a> {
    tasks: Vec<Box<dyn Task + 'a>>,
    idle: Duration,
}

impl<'a> Scheduler<'a> {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            idle: Duration::from_millis(SCHEDULER_IDLE_MS),
        }
    }

    pub fn with_idle(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }

    pub fn add(&mut self, task: impl Task + 'a) {
        log::info!("Scheduler: registered '{}'", task.name());
        self.tasks.push(Box::new(task));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run every task that is due at `now`. Returns how many ran.
    pub fn tick(&mut self, now: u32) -> usize {
        let mut ran = 0;
        for task in self.tasks.iter_mut() {
            if task.is_due(now) {
                task.run(now);
                ran += 1;
            }
        }
        ran
    }

    /// Drive the tasks for `duration_ms` of clock time.
    pub fn run_for(&mut self, clock: &impl Clock, duration_ms: u32) {
        let start = clock.now_ms();
        log::info!("Scheduler started ({} tasks, {} ms)", self.tasks.len(), duration_ms);
        loop {
            let now = clock.now_ms();
            if now.wrapping_sub(start) >= duration_ms {
                break;
            }
            self.tick(now);
            thread::sleep(self.idle);
        }
        log::info!("Scheduler stopped");
    }

    /// Drive the tasks for the lifetime of the program.
    pub fn run_forever(&mut self, clock: &impl Clock) -> ! {
        log::info!("Scheduler started ({} tasks)", self.tasks.len());
        loop {
            self.tick(clock.now_ms());
            thread::sleep(self.idle);
        }
    }
}

impl Default for Scheduler<'_> {
    fn default() -> Self {
        Self::new()
    }
}

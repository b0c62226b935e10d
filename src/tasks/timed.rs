// PowerMon - Timed Task Primitive
//
// A cooperative task is polled by the scheduler with the current clock value.
// When due it runs to completion without blocking and moves its own next-run
// time forward by one interval.

/// Half the counter range. Two timestamps closer than this compare correctly
/// across a wrap.
const WRAP_WINDOW: u32 = 1 << 31;

/// A unit of work driven by [`Scheduler`](super::scheduler::Scheduler).
pub trait Task {
    fn name(&self) -> &str;

    fn is_due(&self, now: u32) -> bool;

    /// Only called when due. Must not block.
    fn run(&mut self, now: u32);
}

/// Next-run bookkeeping shared by every periodic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedTask {
    next_run: u32,
    last_run_start: u32,
}

impl TimedTask {
    /// A task that first becomes due at `first_run`.
    pub fn new(first_run: u32) -> Self {
        Self {
            next_run: first_run,
            last_run_start: first_run,
        }
    }

    pub fn next_run(&self) -> u32 {
        self.next_run
    }

    pub fn last_run_start(&self) -> u32 {
        self.last_run_start
    }

    /// `now >= next_run`, tolerant of the counter wrapping.
    pub fn is_due(&self, now: u32) -> bool {
        now.wrapping_sub(self.next_run) < WRAP_WINDOW
    }

    /// Record the clock value the current run was started with.
    pub fn begin(&mut self, now: u32) {
        self.last_run_start = now;
    }

    /// Schedule the next run one interval after the slot just taken.
    ///
    /// Lateness inside an interval does not carry into the next slot. A task
    /// that missed a whole slot is re-anchored to its run start instead of
    /// running back to back to catch up.
    pub fn advance(&mut self, interval_ms: u32) {
        self.next_run = self.next_run.wrapping_add(interval_ms);
        if self.is_due(self.last_run_start) {
            self.next_run = self.last_run_start.wrapping_add(interval_ms);
        }
    }
}

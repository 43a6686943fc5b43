//! A small timer wheel for periodic and one-shot housekeeping work
//! (spec §4.8 "Jobs"): reconnection back-off, plug-in-requested timers.
//! Deliberately not a priority queue — job counts are small and `advance`
//! runs at most once per engine tick, so a linear scan is simpler and just
//! as fast in practice.

use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

enum Schedule {
    Once,
    Every(Duration),
}

struct Job {
    id: JobId,
    due: Instant,
    schedule: Schedule,
    cancelled: bool,
}

#[derive(Default)]
pub struct JobWheel {
    next_id: u64,
    jobs: Vec<Job>,
}

impl JobWheel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_once(&mut self, after: Duration) -> JobId {
        self.push(Instant::now() + after, Schedule::Once)
    }

    pub fn schedule_every(&mut self, period: Duration) -> JobId {
        self.push(Instant::now() + period, Schedule::Every(period))
    }

    fn push(&mut self, due: Instant, schedule: Schedule) -> JobId {
        let id = JobId(self.next_id);
        self.next_id += 1;
        self.jobs.push(Job {
            id,
            due,
            schedule,
            cancelled: false,
        });
        id
    }

    pub fn cancel(&mut self, id: JobId) {
        if let Some(job) = self.jobs.iter_mut().find(|j| j.id == id) {
            job.cancelled = true;
        }
    }

    /// Returns every job id due at or before `now`, rescheduling recurring
    /// ones and dropping one-shot/cancelled ones from the wheel.
    pub fn advance(&mut self, now: Instant) -> Vec<JobId> {
        let mut fired = Vec::new();
        let mut keep = Vec::with_capacity(self.jobs.len());
        for mut job in self.jobs.drain(..) {
            if job.cancelled {
                continue;
            }
            if job.due > now {
                keep.push(job);
                continue;
            }
            fired.push(job.id);
            if let Schedule::Every(period) = job.schedule {
                job.due = now + period;
                keep.push(job);
            }
        }
        self.jobs = keep;
        fired
    }

    pub fn pending(&self) -> usize {
        self.jobs.iter().filter(|j| !j.cancelled).count()
    }
}

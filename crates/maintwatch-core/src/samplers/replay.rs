//! ReplaySampler: yields a fixed sequence of readings, then reports the
//! feed as unavailable. Used for deterministic fixtures and for replaying
//! recorded sessions.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::clock::Clock;
use crate::error::SensorUnavailable;
use crate::reading::Reading;
use crate::sampler::{SamplerInfo, SamplerKind, SensorSampler};

static REPLAY_INFO: SamplerInfo = SamplerInfo {
    name: "replay",
    description: "Replays a fixed sequence of readings",
    kind: SamplerKind::Replay,
};

pub struct ReplaySampler {
    queue: Mutex<VecDeque<Reading>>,
    /// When set, each replayed reading is re-stamped with this clock's time.
    restamp: Option<Arc<dyn Clock>>,
}

impl ReplaySampler {
    /// Replay readings with their original timestamps.
    pub fn new(readings: impl IntoIterator<Item = Reading>) -> Self {
        Self {
            queue: Mutex::new(readings.into_iter().collect()),
            restamp: None,
        }
    }

    /// Replay channel values, stamping each reading with `clock.now()` when it
    /// is produced.
    pub fn restamped(readings: impl IntoIterator<Item = Reading>, clock: Arc<dyn Clock>) -> Self {
        Self {
            queue: Mutex::new(readings.into_iter().collect()),
            restamp: Some(clock),
        }
    }

    /// Readings not yet replayed.
    pub fn remaining(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl SensorSampler for ReplaySampler {
    fn info(&self) -> &SamplerInfo {
        &REPLAY_INFO
    }

    fn is_available(&self) -> bool {
        self.remaining() > 0
    }

    fn sample(&self) -> Result<Reading, SensorUnavailable> {
        let next = self
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(mut reading) => {
                if let Some(clock) = &self.restamp {
                    reading.timestamp = clock.now();
                }
                Ok(reading)
            }
            None => Err(SensorUnavailable::new("replay exhausted")),
        }
    }
}

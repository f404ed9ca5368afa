use std::{thread, time::Duration};

use anyhow::Result;

use crate::types::Frame;

/// Anything that hands out RGBA frames one at a time.
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<Frame>;
}

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_consecutive_failures: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 30,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, failures: u32) -> Duration {
        let factor = 1u32.checked_shl(failures.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Reads the next frame, sleeping and retrying after failed reads until the
/// policy's failure budget runs out.
pub fn next_frame<S: FrameSource + ?Sized>(source: &mut S, policy: &RetryPolicy) -> Result<Frame> {
    let mut failures = 0u32;
    loop {
        match source.read_frame() {
            Ok(frame) => return Ok(frame),
            Err(err) => {
                failures += 1;
                if failures >= policy.max_consecutive_failures {
                    return Err(err.context(format!(
                        "camera read failed {failures} times in a row, giving up"
                    )));
                }
                let wait = policy.backoff(failures);
                log::warn!(
                    "camera frame read failed (attempt {failures}), retrying in {wait:?}: {err:?}"
                );
                thread::sleep(wait);
            }
        }
    }
}

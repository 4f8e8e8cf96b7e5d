//! Binary chop search for the largest contiguous allocation the system will hand out.

use crate::STEP_THRESHOLD;
use crate::platformalloc::AllocFailed;
use crate::region::Region;
use thousands::Separable;

/// Anything the probe can ask for `size` contiguous, usable bytes.
pub trait Allocator {
    /// Allocate `size` bytes, force the first and last byte to be committed, and release them.
    fn try_commit(&mut self, size: u64) -> Result<(), AllocFailed>;
}

/// The operating system's allocator, through `Region`.
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn try_commit(&mut self, size: u64) -> Result<(), AllocFailed> {
        let mut r = Region::alloc(size)?;
        r.touch_ends();
        Ok(())
    }
}

/// One iteration of the search: the size tried, the step in effect, and how it went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeStep {
    pub attempt: u64,
    pub step: u64,
    pub ok: bool,
}

#[derive(Debug, Default)]
pub struct ProbeOutcome {
    /// 0 if nothing succeeded.
    pub largest_ok: u64,
    pub trace: Vec<ProbeStep>,
}

/// Starting at `attempt`, go up by `step` after each success and down by `step` after each
/// failure, halving `step` every time, until `step` is no more than `STEP_THRESHOLD`.
///
/// Only `step` decides when to stop, so the number of iterations depends on nothing but the
/// initial `step`. `attempt` saturates at both ends instead of wrapping, and a zero-byte attempt
/// counts as a failure.
pub fn probe<A: Allocator>(al: &mut A, mut attempt: u64, mut step: u64) -> ProbeOutcome {
    let mut outcome = ProbeOutcome::default();

    while step > STEP_THRESHOLD {
        eprint!("malloc({}): ", attempt.separate_with_commas());
        let ok = attempt > 0 && al.try_commit(attempt).is_ok();
        eprintln!("{}", if ok { "OK" } else { "Failed" });

        outcome.trace.push(ProbeStep { attempt, step, ok });

        if ok {
            outcome.largest_ok = attempt;
            // Successful. Can we increase a little?
            attempt = attempt.saturating_add(step);
        } else {
            attempt = attempt.saturating_sub(step);
        }
        step /= 2;
    }

    outcome
}

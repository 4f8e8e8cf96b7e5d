// CPU time consumed by this process, which is what the throughput numbers are measured in.

use std::sync::OnceLock;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Nanoseconds(pub u64);

impl Nanoseconds {
    /// Never zero, so that a rate computed from it is always finite.
    pub fn since(self, start: Nanoseconds) -> Nanoseconds {
        Nanoseconds(self.0.saturating_sub(start.0).max(1))
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }
}

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Monotonic time since the first call in this process.
pub fn wall_clock() -> Nanoseconds {
    let epoch = EPOCH.get_or_init(Instant::now);
    Nanoseconds(epoch.elapsed().as_nanos() as u64)
}

#[cfg(unix)]
pub mod p {
    use super::{Nanoseconds, wall_clock};
    use std::mem::MaybeUninit;
    use std::sync::atomic::{AtomicBool, Ordering};

    static WARNED: AtomicBool = AtomicBool::new(false);

    pub(crate) fn clock(clocktype: libc::clockid_t) -> Nanoseconds {
        let mut tp: MaybeUninit<libc::timespec> = MaybeUninit::uninit();
        let retval = unsafe { libc::clock_gettime(clocktype, tp.as_mut_ptr()) };
        if retval != 0 {
            if !WARNED.swap(true, Ordering::Relaxed) {
                eprintln!(
                    "clock_gettime({clocktype}) failed: {}; timing with wall-clock time instead",
                    std::io::Error::last_os_error()
                );
            }
            return wall_clock();
        }
        let tp = unsafe { tp.assume_init() };
        debug_assert!(tp.tv_sec >= 0);
        debug_assert!(tp.tv_nsec >= 0);
        Nanoseconds(tp.tv_sec as u64 * 1_000_000_000 + tp.tv_nsec as u64)
    }

    pub fn process_cputime() -> Nanoseconds {
        clock(libc::CLOCK_PROCESS_CPUTIME_ID)
    }
}

#[cfg(not(unix))]
pub mod p {
    use super::{Nanoseconds, wall_clock};

    // No portable per-process CPU clock here; wall-clock time stands in for it.
    pub fn process_cputime() -> Nanoseconds {
        wall_clock()
    }
}

pub use p::process_cputime;

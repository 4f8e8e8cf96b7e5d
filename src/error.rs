use crate::platformalloc::AllocFailed;
use std::fmt;

pub type Result<T> = core::result::Result<T, Error>;

/// The conditions that end a run with a failure status.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// The allocation sized below the probed maximum was refused.
    SafeAllocFailed { mib: u64 },
    /// The allocation of the full probed maximum was refused.
    MaxAllocFailed { mib: u64 },
    /// A byte read back differs from the byte that was written.
    Mismatch { offset: usize, expected: u8, found: u8 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SafeAllocFailed { mib } => write!(
                f,
                "The 'safe' allocation of {mib}MiB actually failed. Problems with fragmentation in the allocator?"
            ),
            Error::MaxAllocFailed { mib } => write!(f, "The larger allocation of {mib}MiB actually failed."),
            Error::Mismatch { offset, expected, found } => write!(
                f,
                "Memory error at offset {offset} (expected 0x{expected:02x}, found 0x{found:02x})"
            ),
        }
    }
}

impl std::error::Error for Error {}

/// Which benchmark an `AllocFailed` came from decides how it is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Benchmark {
    Safe,
    CalculatedMax,
}

impl Benchmark {
    pub(crate) fn alloc_failed(self, mib: u64) -> impl FnOnce(AllocFailed) -> Error {
        move |_| match self {
            Benchmark::Safe => Error::SafeAllocFailed { mib },
            Benchmark::CalculatedMax => Error::MaxAllocFailed { mib },
        }
    }
}

#![doc = include_str!("../README.md")]
#![allow(clippy::needless_range_loop)] // I like using needless range loops more than I like using enumerate.

// Everything runs on one thread, in order: read the hint, probe, benchmark the safe size,
// benchmark the calculated maximum. Nothing loops back.

pub mod bench;
pub mod clock;
pub mod error;
pub mod meminfo;
pub mod platformalloc;
pub mod probe;
pub mod region;

pub use error::{Error, Result};

use bytesize::ByteSize;
use thousands::Separable;

pub const MIB: u64 = 1024 * 1024;

/// Where the search starts when there is no hint to start from.
pub const INITIAL_ATTEMPT: u64 = 8 * 1024 * MIB;
pub const INITIAL_STEP: u64 = 4 * 1024 * MIB;

/// The search stops once its step is no bigger than this.
pub const STEP_THRESHOLD: u64 = 1024;

// Take 1/16th off the safe size to leave some room for other processes etc.
pub const SAFETY_NUMERATOR: u64 = 15;
pub const SAFETY_DENOMINATOR: u64 = 16;

pub const MEMINFO_PATH: &str = "/proc/meminfo";
pub const MAX_LINE_LEN: usize = 1024;

fn conv(size: u64) -> String {
    ByteSize::b(size).to_string_as(true) // true for binary units (KiB, MiB, GiB, etc.)
}

/// e.g. "8,589,934,592 (8.0 GiB)"
pub fn fmt_bytes(size: u64) -> String {
    format!("{} ({})", size.separate_with_commas(), conv(size))
}

fn print_banner() {
    eprintln!(
        "maxalloc {} on {} ({}-bit pointers)",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH,
        usize::BITS
    );
}

/// What a complete run found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub largest_ok: u64,
    pub safe: bench::Measurement,
    pub max: bench::Measurement,
}

/// Run the whole diagnostic, writing progress to stderr. Returns the first fatal error.
pub fn run() -> Result<()> {
    print_banner();

    let hint = meminfo::read_hint();
    run_with(&mut probe::SystemAllocator, hint)?;

    Ok(())
}

/// Search with `al` starting from `hint`, then run both benchmarks on real memory.
pub fn run_with<A: probe::Allocator>(al: &mut A, hint: meminfo::Hint) -> Result<Report> {
    // A binary chop search finds the largest contiguous allocatable block.
    let outcome = probe::probe(al, hint.attempt, hint.step);
    eprintln!("Largest allocation was {}", fmt_bytes(outcome.largest_ok));

    let safe = bench::benchmark_safe(outcome.largest_ok, hint.available)?;
    let max = bench::benchmark_calculated_max(outcome.largest_ok)?;

    Ok(Report { largest_ok: outcome.largest_ok, safe, max })
}

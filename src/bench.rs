//! Fill a big region with a known byte pattern, read it all back, and time it.

use crate::clock::{Nanoseconds, process_cputime};
use crate::error::{Benchmark, Error, Result};
use crate::region::Region;
use crate::{MEMINFO_PATH, MIB, SAFETY_DENOMINATOR, SAFETY_NUMERATOR, fmt_bytes};

/// How big the "safe" benchmark region is, and how that was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafeSize {
    /// The size the safety margin was taken off of.
    pub basis: u64,
    /// Whether `basis` is the available-memory hint rather than the probed maximum.
    pub hint_used: bool,
    pub mib: u64,
}

impl SafeSize {
    pub fn bytes(&self) -> u64 {
        self.mib * MIB
    }
}

/// The smaller of `largest_ok` and a non-zero `available` hint, less the safety margin, in whole
/// mebibytes.
pub fn safe_size(largest_ok: u64, available: u64) -> SafeSize {
    let hint_used = available != 0 && available < largest_ok;
    let basis = if hint_used { available } else { largest_ok };

    let shrunk = (u128::from(basis) * SAFETY_NUMERATOR as u128 / SAFETY_DENOMINATOR as u128) as u64;

    SafeSize { basis, hint_used, mib: shrunk / MIB }
}

/// The byte that belongs at `offset`.
#[inline(always)]
pub fn pattern(offset: usize) -> u8 {
    (offset & 255) as u8
}

pub fn fill(buf: &mut [u8]) {
    for i in 0..buf.len() {
        buf[i] = pattern(i);
    }
}

/// Stops at the first byte that doesn't match the fill pattern.
pub fn verify(buf: &[u8]) -> Result<()> {
    for i in 0..buf.len() {
        let found = buf[i];
        let expected = pattern(i);
        if found != expected {
            return Err(Error::Mismatch { offset: i, expected, found });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub mib: u64,
    pub elapsed: Nanoseconds,
}

impl Measurement {
    pub fn secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn mib_per_sec(&self) -> f64 {
        self.mib as f64 / self.secs()
    }
}

/// Fill then verify the whole region, timing both passes together.
pub fn fill_and_verify(buf: &mut [u8]) -> Result<Measurement> {
    let start = process_cputime();

    fill(buf);
    // Keep the compiler from reasoning its way past the read-back.
    let buf = std::hint::black_box(buf);
    verify(buf)?;

    let elapsed = process_cputime().since(start);
    Ok(Measurement { mib: (buf.len() as u64) / MIB, elapsed })
}

/// Work out the safe size, then allocate, fill, verify and time a region of that size.
pub fn benchmark_safe(largest_ok: u64, available: u64) -> Result<Measurement> {
    let ss = safe_size(largest_ok, available);
    if ss.hint_used {
        eprintln!("However, since this is larger than the recommendation from {MEMINFO_PATH},");
        eprintln!("I'm going to reduce it to {}", fmt_bytes(ss.basis));
    }
    eprintln!("I recommend asking for {}MiB for your array to ensure it does not cause swapping.", ss.mib);

    let mut region = Region::alloc(ss.bytes()).map_err(Benchmark::Safe.alloc_failed(ss.mib))?;
    let m = fill_and_verify(region.as_mut_slice())?;

    eprintln!("Memory seems OK on a quick test. Time={:.3} secs", m.secs());
    eprintln!("Memory was accessed at roughly {:.3} MiB/sec", m.mib_per_sec());
    Ok(m)
}

/// The same benchmark, sized from the unshrunk probed maximum.
///
/// Writing every byte of this much memory can get the process killed by the operating system's
/// out-of-memory handling. Nothing here can catch that; the process simply ends.
pub fn benchmark_calculated_max(largest_ok: u64) -> Result<Measurement> {
    let mib = largest_ok / MIB;
    eprintln!("BUT... let's compare the speed with the larger calculated size of {mib}MiB...");

    let mut region = Region::alloc(mib * MIB).map_err(Benchmark::CalculatedMax.alloc_failed(mib))?;
    eprintln!("There is a possibility that this test may trigger an 'Out of memory' kill,");
    eprintln!("which you'll be able to see by typing: dmesg | tail");

    let m = fill_and_verify(region.as_mut_slice())?;

    eprintln!("Memory was accessed at roughly {:.3} MiB/sec", m.mib_per_sec());
    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: u64 = 1024 * MIB;

    #[test]
    fn safe_size_without_hint() {
        let ss = safe_size(16 * MIB, 0);
        assert!(!ss.hint_used);
        assert_eq!(ss.basis, 16 * MIB);
        assert_eq!(ss.mib, 15);
    }

    #[test]
    fn safe_size_prefers_smaller_hint() {
        let ss = safe_size(8 * GIB, 2 * GIB);
        assert!(ss.hint_used);
        assert_eq!(ss.basis, 2 * GIB);
        assert_eq!(ss.mib, 1920);
    }

    #[test]
    fn safe_size_ignores_larger_hint() {
        let ss = safe_size(2 * GIB, 8 * GIB);
        assert!(!ss.hint_used);
        assert_eq!(ss.mib, 1920);
    }

    #[test]
    fn safe_size_drops_partial_mib() {
        // 15/16 of 1 MiB + a bit is still under one whole MiB.
        assert_eq!(safe_size(MIB + 1000, 0).mib, 0);
        assert_eq!(safe_size(0, 0).mib, 0);
    }

    #[test]
    fn safe_size_huge_basis_does_not_overflow() {
        let ss = safe_size(u64::MAX, 0);
        assert_eq!(ss.mib, (u64::MAX / 16 * 15 + 15 * 15 / 16) / MIB);
        assert!(ss.bytes() < u64::MAX);
    }

    #[test]
    fn fill_writes_pattern() {
        let mut buf = vec![0u8; 600];
        fill(&mut buf);
        assert_eq!(buf[0], 0);
        assert_eq!(buf[255], 255);
        assert_eq!(buf[256], 0);
        assert_eq!(buf[599], (599 % 256) as u8);
    }

    #[test]
    fn verify_reports_first_mismatch_only() {
        let mut buf = vec![0u8; 4096];
        fill(&mut buf);
        buf[1000] ^= 0xff;
        buf[3000] ^= 0xff;
        assert_eq!(verify(&buf), Err(Error::Mismatch { offset: 1000, expected: pattern(1000), found: pattern(1000) ^ 0xff }));
    }

    #[test]
    fn empty_buffer_verifies() {
        let m = fill_and_verify(&mut []).unwrap();
        assert_eq!(m.mib, 0);
        assert!(m.elapsed.0 >= 1);
    }
}

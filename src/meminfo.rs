//! Seed the probe from the kernel's own estimate of how much memory is available.

use crate::{INITIAL_ATTEMPT, INITIAL_STEP, MAX_LINE_LEN, MEMINFO_PATH, fmt_bytes};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};

const KEY: &[u8] = b"MemAvailable:";
const UNIT: &[u8] = b"kB";

/// Where the binary search starts, and the available-memory hint it started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hint {
    /// Bytes of available memory, or 0 if nothing usable was found.
    pub available: u64,
    pub attempt: u64,
    pub step: u64,
}

impl Default for Hint {
    fn default() -> Self {
        Self { available: 0, attempt: INITIAL_ATTEMPT, step: INITIAL_STEP }
    }
}

impl Hint {
    fn from_available(available: u64) -> Self {
        Self { available, attempt: available, step: available / 2 }
    }
}

/// Read `/proc/meminfo`. A missing or unreadable file gives the default starting point.
pub fn read_hint() -> Hint {
    match File::open(MEMINFO_PATH) {
        Ok(f) => {
            let hint = scan(BufReader::new(f));
            if hint.available > 0 {
                eprintln!("Using starting free mem estimate of {} derived from {MEMINFO_PATH}", fmt_bytes(hint.available));
            }
            hint
        }
        Err(_) => Hint::default(),
    }
}

/// Scan meminfo-formatted text to the end. The first well-formed, non-zero `MemAvailable:` line
/// wins; lines lacking the `kB` unit are skipped.
///
/// Text is consumed in chunks of at most `MAX_LINE_LEN` bytes, each ending at a newline or at
/// the bound. The tail of an over-long line is therefore read as a line of its own.
pub fn scan<R: BufRead>(mut r: R) -> Hint {
    let mut hint = Hint::default();
    let mut found = false;
    let mut line: Vec<u8> = Vec::with_capacity(MAX_LINE_LEN);

    loop {
        line.clear();
        match (&mut r).take(MAX_LINE_LEN as u64).read_until(b'\n', &mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if found {
            continue;
        }

        if let Some(bytes) = parse_available_kib(&line).and_then(|kib| kib.checked_mul(1024)).filter(|&b| b > 0) {
            hint = Hint::from_available(bytes);
            found = true;
        }
    }

    hint
}

/// The kibibyte count on a `MemAvailable:` line, or None if this isn't one or it is malformed.
pub fn parse_available_kib(line: &[u8]) -> Option<u64> {
    let rest = line.strip_prefix(KEY)?;
    let unitpos = rest.windows(UNIT.len()).position(|w| w == UNIT)?;
    let value = rest[..unitpos].trim_ascii_start();

    let numdigits = value.iter().take_while(|b| b.is_ascii_digit()).count();
    if numdigits == 0 {
        return None;
    }

    let mut kib: u64 = 0;
    for &d in &value[..numdigits] {
        kib = kib.checked_mul(10)?.checked_add(u64::from(d - b'0'))?;
    }
    Some(kib)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
MemTotal:        8058576 kB
MemFree:          512340 kB
MemAvailable:    2097152 kB
Buffers:          123456 kB
";

    #[test]
    fn sample_meminfo() {
        let h = scan(SAMPLE.as_bytes());
        assert_eq!(h.available, 2_097_152 * 1024);
        assert_eq!(h.attempt, 2_097_152 * 1024);
        assert_eq!(h.step, 2_097_152 * 512);
    }

    #[test]
    fn empty_source_gives_defaults() {
        let h = scan("".as_bytes());
        assert_eq!(h, Hint::default());
        assert_eq!(h.attempt, 8 * 1024 * 1024 * 1024);
        assert_eq!(h.step, 4 * 1024 * 1024 * 1024);
        assert_eq!(h.available, 0);
    }

    #[test]
    fn missing_unit_is_skipped() {
        let text = "MemAvailable:    999\nMemAvailable:    1024 kB\n";
        let h = scan(text.as_bytes());
        assert_eq!(h.available, 1024 * 1024);
    }

    #[test]
    fn first_well_formed_line_wins() {
        let text = "MemAvailable:    1024 kB\nMemAvailable:    4096 kB\nMemAvailable: 7\n";
        let h = scan(text.as_bytes());
        assert_eq!(h.available, 1024 * 1024);
    }

    #[test]
    fn key_must_be_line_prefix() {
        assert_eq!(parse_available_kib(b" MemAvailable: 5 kB"), None);
        assert_eq!(parse_available_kib(b"MemAvailableX: 5 kB"), None);
        assert_eq!(parse_available_kib(b"MemAvailable:5kB\n"), Some(5));
    }

    #[test]
    fn no_digits_is_malformed() {
        assert_eq!(parse_available_kib(b"MemAvailable:  kB\n"), None);
        assert_eq!(parse_available_kib(b"MemAvailable:  -3 kB\n"), None);
    }

    #[test]
    fn zero_is_no_hint() {
        let text = "MemAvailable:       0 kB\nMemAvailable:    8 kB\n";
        assert_eq!(scan(text.as_bytes()).available, 8 * 1024);
    }

    #[test]
    fn digits_stop_at_first_non_digit() {
        assert_eq!(parse_available_kib(b"MemAvailable:   12x34 kB\n"), Some(12));
    }

    #[test]
    fn overflowing_value_is_skipped() {
        let text = "MemAvailable: 99999999999999999999999 kB\n";
        assert_eq!(scan(text.as_bytes()), Hint::default());

        // Fits in u64 as kB, but not once converted to bytes.
        let text = format!("MemAvailable: {} kB\n", u64::MAX / 2);
        assert_eq!(scan(text.as_bytes()), Hint::default());
    }

    #[test]
    fn overlong_line_is_cut_before_unit() {
        let mut text = String::from("MemAvailable: 1");
        text.push_str(&" ".repeat(MAX_LINE_LEN));
        text.push_str("kB\n");
        assert_eq!(scan(text.as_bytes()), Hint::default());
    }

    #[test]
    fn tail_of_overlong_line_is_scanned_as_its_own_line() {
        let mut text = "x".repeat(MAX_LINE_LEN);
        text.push_str("MemAvailable: 5 kB\n");
        assert_eq!(scan(text.as_bytes()).available, 5 * 1024);

        // One byte short of the bound, the key is glued to the junk and never starts a chunk.
        let mut text = "x".repeat(MAX_LINE_LEN - 1);
        text.push_str("MemAvailable: 5 kB\n");
        assert_eq!(scan(text.as_bytes()), Hint::default());
    }
}

//! Headless runner for test ROMs that report through the serial port.
//!
//! Blargg-style ROMs print their results over serial and finish with either
//! `Passed` or `Failed`. [`run_serial_test`] steps whole frames and stops at
//! the first marker or after `max_frames`.

use std::fmt;

use log::{debug, info};

use crate::error::Result;
use crate::gameboy::GameBoy;

const PASSED: &[u8] = b"Passed";
const FAILED: &[u8] = b"Failed";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerialVerdict {
    Passed,
    Failed,
    Timeout,
}

impl fmt::Display for SerialVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SerialVerdict::Passed => "passed",
            SerialVerdict::Failed => "failed",
            SerialVerdict::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Incremental marker search over a growing serial log.
#[derive(Debug, Default)]
pub struct SerialMonitor {
    checked_up_to: usize,
}

impl SerialMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look for a marker in the bytes added since the last poll, plus
    /// enough of the old tail to catch a marker split across polls.
    pub fn poll(&mut self, serial: &[u8]) -> Option<SerialVerdict> {
        let lookbehind = PASSED.len().max(FAILED.len()) - 1;
        let start = self
            .checked_up_to
            .saturating_sub(lookbehind)
            .min(serial.len());
        let window = &serial[start..];
        self.checked_up_to = serial.len();

        // A ROM that prints "Failed" may still mention "Passed" for earlier
        // sub-tests, so a failure wins.
        if contains(window, FAILED) {
            Some(SerialVerdict::Failed)
        } else if contains(window, PASSED) {
            Some(SerialVerdict::Passed)
        } else {
            None
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|chunk| chunk == needle)
}

#[derive(Clone, Debug)]
pub struct SerialReport {
    pub verdict: SerialVerdict,
    /// Everything the ROM sent, decoded lossily.
    pub text: String,
    pub frames: u64,
}

/// Run `gb` for up to `max_frames` frames, stopping at the first serial
/// verdict. A CPU lock-up is returned as an error.
pub fn run_serial_test(gb: &mut GameBoy, max_frames: u64) -> Result<SerialReport> {
    let mut monitor = SerialMonitor::new();
    let mut verdict = SerialVerdict::Timeout;
    let mut frames = 0;

    while frames < max_frames {
        gb.step_frame()?;
        frames += 1;
        if let Some(v) = monitor.poll(gb.serial_output()) {
            verdict = v;
            break;
        }
    }

    let text = String::from_utf8_lossy(gb.serial_output()).into_owned();
    debug!("serial output after {frames} frames: {text:?}");
    info!("serial test {verdict} after {frames} frames");
    Ok(SerialReport {
        verdict,
        text,
        frames,
    })
}

//! Result verification and the pass / fail reporting channel.
//!
//! A benchmark checks its output against a precomputed reference and
//! reports every differing element, then a single pass if there were
//! none. Reports go to a [`Reporter`]; the control-word reporter produces
//! the exact store sequence a core issues to the test control port.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tinyrv_chip::ctrl;
use tracing::{info, warn};

use crate::error::{Result, RuntimeError};

/// One element that differs from its reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// Flat element index.
    pub index: usize,
    /// Computed value.
    pub actual: i64,
    /// Reference value.
    pub expected: i64,
}

/// Sink for verification results.
pub trait Reporter {
    /// One element differs from its reference.
    fn fail(&mut self, mismatch: Mismatch);

    /// Verification finished with no mismatches.
    fn pass(&mut self);
}

/// Outcome of a verification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Every mismatch, in index order.
    pub mismatches: Vec<Mismatch>,
    /// Number of elements compared.
    pub checked: usize,
    /// `(actual, expected)` lengths when they differ.
    pub length_mismatch: Option<(usize, usize)>,
}

impl Verdict {
    /// Whether the output matched the reference exactly.
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty() && self.length_mismatch.is_none()
    }
}

/// Compare `actual` against `expected`, reporting every differing index.
///
/// Pass is reported only when every element matches and the lengths agree.
pub fn verify<T>(actual: &[T], expected: &[T], reporter: &mut dyn Reporter) -> Verdict
where
    T: Copy + PartialEq + Into<i64>,
{
    let mut mismatches = Vec::new();
    for (index, (&a, &e)) in actual.iter().zip(expected).enumerate() {
        if a != e {
            let mismatch = Mismatch {
                index,
                actual: a.into(),
                expected: e.into(),
            };
            reporter.fail(mismatch);
            mismatches.push(mismatch);
        }
    }

    let length_mismatch = (actual.len() != expected.len()).then_some((actual.len(), expected.len()));
    if let Some((a, e)) = length_mismatch {
        warn!("result has {a} elements, reference has {e}");
    }

    let verdict = Verdict {
        mismatches,
        checked: actual.len().min(expected.len()),
        length_mismatch,
    };
    if verdict.passed() {
        reporter.pass();
    }
    verdict
}

/// Reports through `tracing`.
#[derive(Debug, Default)]
pub struct LogReporter {
    failures: usize,
}

impl LogReporter {
    /// Number of failures reported so far.
    pub const fn failures(&self) -> usize {
        self.failures
    }
}

impl Reporter for LogReporter {
    fn fail(&mut self, m: Mismatch) {
        self.failures += 1;
        warn!(
            "[FAILED] dest[{}] != ref[{}] ({} != {})",
            m.index, m.index, m.actual, m.expected
        );
    }

    fn pass(&mut self) {
        info!("[PASSED]");
    }
}

/// Keeps every report in memory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectingReporter {
    /// Failures in report order.
    pub failures: Vec<Mismatch>,
    /// Number of pass signals.
    pub passes: usize,
}

impl Reporter for CollectingReporter {
    fn fail(&mut self, mismatch: Mismatch) {
        self.failures.push(mismatch);
    }

    fn pass(&mut self) {
        self.passes += 1;
    }
}

/// Encodes reports as control-port stores (little-endian words).
#[derive(Debug, Default)]
pub struct ControlWordReporter {
    stream: BytesMut,
}

impl ControlWordReporter {
    /// Empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an exit message.
    pub fn exit(&mut self, status: u16) {
        self.stream.put_u32_le(ctrl::exit(status));
    }

    /// Encoded stream so far.
    pub fn freeze(self) -> Bytes {
        self.stream.freeze()
    }
}

impl Reporter for ControlWordReporter {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn fail(&mut self, m: Mismatch) {
        // the port is 32 bits wide; values travel as their low word
        self.stream.put_u32_le(ctrl::FAIL);
        self.stream.put_u32_le(m.index as u32);
        self.stream.put_u32_le(m.actual as u32);
        self.stream.put_u32_le(m.expected as u32);
    }

    fn pass(&mut self) {
        self.stream.put_u32_le(ctrl::PASS);
    }
}

/// One decoded control-port message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Verification passed.
    Pass,
    /// One failed element, values as raw 32-bit words.
    Fail {
        /// Element index.
        index: u32,
        /// Computed value.
        actual: u32,
        /// Reference value.
        expected: u32,
    },
    /// Program exit.
    Exit(u16),
}

/// Decode a control-port store stream.
///
/// # Errors
///
/// Returns [`RuntimeError::ControlStream`] for a partial word, a truncated
/// failure message, or a word that starts no known message.
pub fn decode_control_words(bytes: &[u8]) -> Result<Vec<ControlMessage>> {
    if bytes.len() % 4 != 0 {
        return Err(RuntimeError::control_stream(format!(
            "{} bytes is not a whole number of words",
            bytes.len()
        )));
    }

    let mut buf = bytes;
    let mut messages = Vec::new();
    while buf.has_remaining() {
        let word = buf.get_u32_le();
        let message = match word {
            ctrl::PASS => ControlMessage::Pass,
            ctrl::FAIL => {
                if buf.remaining() < 12 {
                    return Err(RuntimeError::control_stream("truncated failure message"));
                }
                ControlMessage::Fail {
                    index: buf.get_u32_le(),
                    actual: buf.get_u32_le(),
                    expected: buf.get_u32_le(),
                }
            }
            other => match ctrl::exit_status(other) {
                Some(status) => ControlMessage::Exit(status),
                None => {
                    return Err(RuntimeError::control_stream(format!(
                        "unknown control word {other:#010x}"
                    )))
                }
            },
        };
        messages.push(message);
    }
    Ok(messages)
}

//! Test control port.
//!
//! Benchmarks talk to the test harness by storing words to a reserved
//! address outside of memory. The harness decodes the stream:
//!
//! ```text
//! 0x0002_0000                       pass
//! 0x0002_0001, index, actual, ref   one failed element (four stores)
//! 0x0001_ssss                       exit with status ssss
//! ```

/// Control port address.
pub const CTRL_ADDR: u32 = 0x1000_0000;

/// Pass word.
pub const PASS: u32 = 0x0002_0000;

/// Header of a four-word failure message.
pub const FAIL: u32 = 0x0002_0001;

/// Upper half-word tagging an exit message.
pub const EXIT_TAG: u32 = 0x0001;

/// Encode an exit message carrying `status`.
#[must_use]
pub const fn exit(status: u16) -> u32 {
    (EXIT_TAG << 16) | status as u32
}

/// Exit status carried by `word`, if it is an exit message.
#[must_use]
pub const fn exit_status(word: u32) -> Option<u16> {
    if word >> 16 == EXIT_TAG {
        #[allow(clippy::cast_possible_truncation)]
        Some((word & 0xFFFF) as u16)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_encoding() {
        assert_eq!(exit(0), 0x0001_0000);
        assert_eq!(exit_status(exit(7)), Some(7));
        assert_eq!(exit_status(PASS), None);
        assert_eq!(exit_status(FAIL), None);
    }

    #[test]
    fn control_port_above_memory() {
        // 256 MB test memory ends below the port
        assert!(CTRL_ADDR >= 1 << 28);
    }
}

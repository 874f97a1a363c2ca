//! Flat word-addressed memory shared with the accelerator.
//!
//! Addresses are byte addresses, as the cores see them; every access is a
//! whole, 4-byte aligned word. Arrays are laid out statically by the
//! caller. There is no allocator.

use crate::error::{XcelError, XcelResult};

/// Word size in bytes.
pub const WORD_BYTES: u32 = 4;

/// Flat memory backing the accelerator's operand arrays.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    words: Vec<u32>,
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("bytes", &self.size_bytes())
            .finish()
    }
}

impl Memory {
    /// Zero-filled memory of at least `size_bytes` bytes.
    pub fn new(size_bytes: usize) -> Self {
        Self {
            words: vec![0; size_bytes.div_ceil(WORD_BYTES as usize)],
        }
    }

    /// Size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.words.len() * WORD_BYTES as usize
    }

    fn span(&self, addr: u32, len: usize) -> XcelResult<std::ops::Range<usize>> {
        if addr % WORD_BYTES != 0 {
            return Err(XcelError::Misaligned { addr });
        }
        let start = (addr / WORD_BYTES) as usize;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= self.words.len())
            .ok_or(XcelError::OutOfBounds { addr, len })?;
        Ok(start..end)
    }

    /// Read one word.
    ///
    /// # Errors
    ///
    /// Returns error if `addr` is misaligned or out of bounds.
    pub fn read_word(&self, addr: u32) -> XcelResult<u32> {
        let span = self.span(addr, 1)?;
        Ok(self.words[span.start])
    }

    /// Write one word.
    ///
    /// # Errors
    ///
    /// Returns error if `addr` is misaligned or out of bounds.
    pub fn write_word(&mut self, addr: u32, value: u32) -> XcelResult<()> {
        let span = self.span(addr, 1)?;
        self.words[span.start] = value;
        Ok(())
    }

    /// `len` words starting at `addr`.
    ///
    /// # Errors
    ///
    /// Returns error if the span is misaligned or out of bounds.
    pub fn words(&self, addr: u32, len: usize) -> XcelResult<&[u32]> {
        let span = self.span(addr, len)?;
        Ok(&self.words[span])
    }

    /// Mutable view of `len` words starting at `addr`.
    ///
    /// # Errors
    ///
    /// Returns error if the span is misaligned or out of bounds.
    pub fn words_mut(&mut self, addr: u32, len: usize) -> XcelResult<&mut [u32]> {
        let span = self.span(addr, len)?;
        Ok(&mut self.words[span])
    }

    /// Copy `data` into memory at `addr`.
    ///
    /// # Errors
    ///
    /// Returns error if the span is misaligned or out of bounds.
    pub fn load(&mut self, addr: u32, data: &[u32]) -> XcelResult<()> {
        self.words_mut(addr, data.len())?.copy_from_slice(data);
        Ok(())
    }
}

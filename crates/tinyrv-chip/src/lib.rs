//! Silicon model for the TinyRV multi-core tile and its attached accelerator.
//!
//! This crate has **no dependencies** and **no hardware access**. It is a
//! pure model of the silicon: supported core counts, the accelerator
//! register file, and the word encodings understood by the test control
//! port.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`cores`] | Supported core counts, `log2` shift for block sizing |
//! | [`regs`] | Accelerator register file: indices, function codes, status bits |
//! | [`ctrl`] | Control port address and pass / fail / exit word encodings |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cores;
pub mod ctrl;
pub mod regs;

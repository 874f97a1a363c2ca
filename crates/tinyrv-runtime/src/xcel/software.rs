//! Software (virtual) accelerator backend
//!
//! Runs the accelerator function on a dedicated device thread, the way the
//! hardware runs beside the cores. The backing [`Memory`] moves to the
//! device thread on go and comes back with the completion, so the host
//! physically cannot touch operand memory while a transaction is in
//! flight.
//!
//! ```text
//! host                        device thread
//! ────                        ─────────────
//! write(xr0..xr4)             (registers latched on go)
//! go ──── regs + Memory ────▶ execute function
//! wait ◀─── Memory + xr0 ──── done
//! ```

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use tinyrv_chip::regs;
use tracing::{debug, info};

use super::{BackendType, XcelBackend, XcelFunction, XcelReg};
use crate::error::{XcelError, XcelResult};
use crate::memory::{Memory, WORD_BYTES};

/// Default memory size (1 MB, matches the simulated test memory).
pub const DEFAULT_MEMORY_BYTES: usize = 1 << 20;

type Registers = [u32; regs::XR_COUNT];

struct Command {
    regs: Registers,
    memory: Memory,
}

struct Completion {
    memory: Memory,
    result: XcelResult<u32>,
}

/// Software accelerator backend.
#[derive(Debug)]
pub struct SoftwareXcel {
    function: XcelFunction,
    regs: Registers,
    /// `None` while the device thread owns it.
    memory: Option<Memory>,
    commands: Option<SyncSender<Command>>,
    completions: Receiver<Completion>,
    handle: Option<JoinHandle<()>>,
}

impl SoftwareXcel {
    /// Bring up a virtual accelerator with `memory_bytes` of zeroed memory.
    ///
    /// # Errors
    ///
    /// Returns error if the device thread cannot be started.
    pub fn new(function: XcelFunction, memory_bytes: usize) -> XcelResult<Self> {
        let (cmd_tx, cmd_rx) = mpsc::sync_channel::<Command>(1);
        let (done_tx, done_rx) = mpsc::sync_channel::<Completion>(1);

        let handle = thread::Builder::new()
            .name(format!("tinyrv-xcel-{}", function.name()))
            .spawn(move || {
                while let Ok(Command { regs, mut memory }) = cmd_rx.recv() {
                    let result = execute(function, &regs, &mut memory);
                    if done_tx.send(Completion { memory, result }).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| XcelError::device_lost(format!("failed to start device thread: {e}")))?;

        info!(
            "SoftwareXcel: {} accelerator, {} bytes memory",
            function.name(),
            memory_bytes
        );

        Ok(Self {
            function,
            regs: [0; regs::XR_COUNT],
            memory: Some(Memory::new(memory_bytes)),
            commands: Some(cmd_tx),
            completions: done_rx,
            handle: Some(handle),
        })
    }

    /// Last value written to `reg`.
    pub fn register(&self, reg: XcelReg) -> u32 {
        self.regs[usize::from(reg.index())]
    }
}

impl XcelBackend for SoftwareXcel {
    fn write(&mut self, reg: XcelReg, value: u32) -> XcelResult<()> {
        self.regs[usize::from(reg.index())] = value;
        Ok(())
    }

    fn go(&mut self) -> XcelResult<()> {
        let memory = self
            .memory
            .take()
            .ok_or_else(|| XcelError::device_lost("memory already owned by the device"))?;
        if !self.function.data_in_xr0() {
            self.regs[usize::from(regs::XR_GO)] = 0;
        }

        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| XcelError::device_lost("device thread shut down"))?;
        commands
            .send(Command {
                regs: self.regs,
                memory,
            })
            .map_err(|_| XcelError::device_lost("device thread exited"))
    }

    fn wait(&mut self) -> XcelResult<u32> {
        let Completion { memory, result } = self
            .completions
            .recv()
            .map_err(|_| XcelError::device_lost("device thread exited mid-transaction"))?;
        self.memory = Some(memory);
        result
    }

    fn function(&self) -> XcelFunction {
        self.function
    }

    fn memory_mut(&mut self) -> Option<&mut Memory> {
        self.memory.as_mut()
    }

    fn has_memory(&self) -> bool {
        true
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Software
    }
}

impl Drop for SoftwareXcel {
    fn drop(&mut self) {
        self.commands.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Run one accelerator transaction against `memory`.
fn execute(function: XcelFunction, regs: &Registers, memory: &mut Memory) -> XcelResult<u32> {
    let reg = |r: XcelReg| regs[usize::from(r.index())];

    match function {
        XcelFunction::Null => Ok(reg(XcelReg::Go)),

        XcelFunction::Vvadd => {
            let (src0, src1, dest) = (reg(XcelReg::Src0), reg(XcelReg::Src1), reg(XcelReg::Dest));
            let size = reg(XcelReg::Size) as usize;
            debug!("vvadd: {size} words, src0={src0:#x} src1={src1:#x} dest={dest:#x}");

            // bounds first, so a fault leaves memory untouched
            memory.words(src0, size)?;
            memory.words(src1, size)?;
            memory.words(dest, size)?;

            // word at a time: dest may alias a source
            let mut offset = 0u32;
            for _ in 0..size {
                let sum = memory
                    .read_word(src0 + offset)?
                    .wrapping_add(memory.read_word(src1 + offset)?);
                memory.write_word(dest + offset, sum)?;
                offset += WORD_BYTES;
            }
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xcel::Xcel;

    #[test]
    fn vvadd_in_place() {
        let mut xcel = Xcel::new(SoftwareXcel::new(XcelFunction::Vvadd, 64).unwrap());
        xcel.memory_mut().unwrap().load(0, &[1, 2, 3, 10, 20, 30]).unwrap();
        let status = xcel
            .transaction(&[
                (XcelReg::Src0, 0),
                (XcelReg::Src1, 12),
                (XcelReg::Dest, 0),
                (XcelReg::Size, 3),
            ])
            .unwrap();
        assert_eq!(status, 0);
        assert_eq!(xcel.memory_mut().unwrap().words(0, 3).unwrap(), &[11, 22, 33]);
    }

    #[test]
    fn vvadd_wraps() {
        let mut xcel = Xcel::new(SoftwareXcel::new(XcelFunction::Vvadd, 16).unwrap());
        xcel.memory_mut().unwrap().load(0, &[u32::MAX, 2]).unwrap();
        xcel.transaction(&[
            (XcelReg::Src0, 0),
            (XcelReg::Src1, 4),
            (XcelReg::Dest, 8),
            (XcelReg::Size, 1),
        ])
        .unwrap();
        assert_eq!(xcel.memory_mut().unwrap().read_word(8).unwrap(), 1);
    }

    #[test]
    fn fault_returns_memory_and_goes_idle() {
        let mut xcel = Xcel::new(SoftwareXcel::new(XcelFunction::Vvadd, 16).unwrap());
        let err = xcel
            .transaction(&[
                (XcelReg::Src0, 0),
                (XcelReg::Src1, 0),
                (XcelReg::Dest, 8),
                (XcelReg::Size, 4),
            ])
            .unwrap_err();
        assert!(matches!(err, XcelError::OutOfBounds { addr: 8, len: 4 }));
        // memory is back on the host side
        assert_eq!(xcel.state(), crate::xcel::XcelState::Idle);
        assert!(xcel.backend().memory.is_some());
        assert!(xcel.memory_mut().is_ok());
    }

    #[test]
    fn registers_latched() {
        let mut xcel = Xcel::new(SoftwareXcel::new(XcelFunction::Null, 0).unwrap());
        xcel.configure(XcelReg::Go, 5).unwrap();
        assert_eq!(xcel.backend().register(XcelReg::Go), 5);
        xcel.trigger().unwrap();
        assert_eq!(xcel.complete_read().unwrap(), 5);
        assert_eq!(xcel.backend().register(XcelReg::Go), 5);
    }
}

//! Core topology query.
//!
//! The core count is chosen once per run and never changes. The identity
//! of the calling core is tracked per host thread: the thread inside
//! [`BareThreads::run`](crate::BareThreads::run) is core 0, and each worker
//! thread carries the id of the core it stands in for. Any other thread
//! (the software accelerator's device thread, user threads) is unbound.

use std::cell::Cell;
use std::fmt;

use tinyrv_chip::cores;

use crate::error::{Result, RuntimeError};

thread_local! {
    static CORE_ID: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Identity of one physical execution unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CoreId(usize);

impl CoreId {
    /// The orchestrating core.
    pub const ORCHESTRATOR: Self = Self(cores::ORCHESTRATOR);

    /// Wrap a raw core index. Range is checked against a topology on use.
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Raw core index.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for CoreId {
    fn from(id: usize) -> Self {
        Self(id)
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "core{}", self.0)
    }
}

/// Fixed core topology for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    num_cores: usize,
}

impl Topology {
    /// Single-core tile.
    pub const SINGLE: Self = Self { num_cores: 1 };

    /// Validate a core count against the supported set.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnsupportedCoreCount`] for counts the tile
    /// cannot be built with.
    pub fn new(num_cores: usize) -> Result<Self> {
        if cores::is_supported(num_cores) {
            Ok(Self { num_cores })
        } else {
            Err(RuntimeError::UnsupportedCoreCount { count: num_cores })
        }
    }

    /// Number of usable cores.
    pub const fn num_cores(&self) -> usize {
        self.num_cores
    }

    /// Whether `core` names a core in this topology.
    pub const fn contains(&self, core: CoreId) -> bool {
        core.0 < self.num_cores
    }

    /// Every core except the orchestrator, in ascending order.
    pub fn peers(&self) -> impl Iterator<Item = CoreId> {
        (1..self.num_cores).map(CoreId)
    }

    /// Check that `core` is in range.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::CoreOutOfRange`] otherwise.
    pub fn check(&self, core: CoreId) -> Result<()> {
        if self.contains(core) {
            Ok(())
        } else {
            Err(RuntimeError::CoreOutOfRange {
                core: core.0,
                count: self.num_cores,
            })
        }
    }
}

/// Identity of the calling execution unit.
///
/// Unbound threads report the orchestrator: a program that never brings up
/// a runtime runs on core 0. Use [`current_core`] to tell them apart.
pub fn core_id() -> CoreId {
    current_core().unwrap_or(CoreId::ORCHESTRATOR)
}

/// Core the calling thread is bound to, `None` outside the runtime.
pub fn current_core() -> Option<CoreId> {
    CORE_ID.with(Cell::get).map(CoreId)
}

/// Bind the calling host thread to `core` for the rest of its life.
pub(crate) fn bind_current(core: CoreId) {
    CORE_ID.with(|id| id.set(Some(core.0)));
}

/// Binds the calling thread to core 0 until dropped.
#[derive(Debug)]
pub(crate) struct OrchestratorBinding {
    previous: Option<usize>,
}

impl OrchestratorBinding {
    pub(crate) fn enter() -> Self {
        let previous = CORE_ID.with(|id| id.replace(Some(cores::ORCHESTRATOR)));
        Self { previous }
    }
}

impl Drop for OrchestratorBinding {
    fn drop(&mut self) {
        CORE_ID.with(|id| id.set(self.previous));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_supported_counts() {
        for n in cores::SUPPORTED {
            assert_eq!(Topology::new(n).unwrap().num_cores(), n);
        }
    }

    #[test]
    fn rejects_unsupported_counts() {
        for n in [0, 3, 6, 12, 128] {
            assert!(matches!(
                Topology::new(n),
                Err(RuntimeError::UnsupportedCoreCount { count }) if count == n
            ));
        }
    }

    #[test]
    fn peers_skip_orchestrator() {
        let topo = Topology::new(4).unwrap();
        let peers: Vec<usize> = topo.peers().map(CoreId::index).collect();
        assert_eq!(peers, vec![1, 2, 3]);
        assert!(topo.check(CoreId::new(3)).is_ok());
        assert!(topo.check(CoreId::new(4)).is_err());
    }

    #[test]
    fn unbound_thread_reports_orchestrator() {
        assert_eq!(current_core(), None);
        assert_eq!(core_id(), CoreId::ORCHESTRATOR);
    }

    #[test]
    fn orchestrator_binding_restores_previous() {
        {
            let _bound = OrchestratorBinding::enter();
            assert_eq!(current_core(), Some(CoreId::ORCHESTRATOR));
        }
        assert_eq!(current_core(), None);
    }

    #[test]
    fn foreign_thread_is_unbound() {
        let seen = std::thread::spawn(current_core).join().unwrap();
        assert_eq!(seen, None);
    }
}

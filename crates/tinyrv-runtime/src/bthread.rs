//! Bare thread runtime.
//!
//! One worker per peer core is brought up with the runtime and lives
//! until the runtime is dropped. There is no scheduler and no queue: each
//! worker holds a single-slot handshake channel. `spawn` hands it a job
//! descriptor, `join` blocks for the completion token.
//!
//! ```text
//! core 0 (caller)              core 1..N (workers)
//! ───────────────              ───────────────────
//! spawn(1, f, a1) ───job────▶  f(a1)
//! spawn(2, f, a2) ───job────▶  f(a2)
//! f(a0)                          │
//! join(1) ◀──────────done────────┘
//! join(2) ◀──────────done──── …
//! ```
//!
//! Jobs borrow their arguments from the caller's stack. [`BareThreads::run`]
//! hands out a [`Scope`] that joins every outstanding core before it is
//! released, so an argument always outlives the job it was spawned with.

use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::error::{Result, RuntimeError};
use crate::topology::{self, CoreId, Topology};

type Job = Box<dyn FnOnce() + Send + 'static>;
type Completion = thread::Result<()>;

/// Host thread standing in for one peer core.
#[derive(Debug)]
struct Worker {
    core: CoreId,
    jobs: Option<SyncSender<Job>>,
    done: Receiver<Completion>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    fn start(core: CoreId) -> Result<Self> {
        let (job_tx, job_rx) = mpsc::sync_channel::<Job>(1);
        let (done_tx, done_rx) = mpsc::sync_channel::<Completion>(1);

        let handle = thread::Builder::new()
            .name(format!("tinyrv-{core}"))
            .spawn(move || {
                topology::bind_current(core);
                while let Ok(job) = job_rx.recv() {
                    // The job (and every borrow it captured) is gone by the
                    // time the completion token is sent.
                    let outcome = panic::catch_unwind(AssertUnwindSafe(job));
                    if done_tx.send(outcome).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            core,
            jobs: Some(job_tx),
            done: done_rx,
            handle: Some(handle),
        })
    }

    fn dispatch(&self, job: Job) -> Result<()> {
        self.jobs
            .as_ref()
            .ok_or(RuntimeError::WorkerLost {
                core: self.core.index(),
            })?
            .send(job)
            .map_err(|_| RuntimeError::WorkerLost {
                core: self.core.index(),
            })
    }

    fn wait(&self) -> Result<()> {
        match self.done.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(payload)) => Err(RuntimeError::job_panicked(self.core.index(), &*payload)),
            Err(_) => Err(RuntimeError::WorkerLost {
                core: self.core.index(),
            }),
        }
    }
}

/// Fixed set of cores with spawn / join dispatch.
#[derive(Debug)]
pub struct BareThreads {
    topology: Topology,
    /// `workers[i]` runs core `i + 1`.
    workers: Vec<Worker>,
}

impl BareThreads {
    /// Bring up one worker per peer core.
    ///
    /// # Errors
    ///
    /// Returns error if a worker thread cannot be started.
    pub fn new(topology: Topology) -> Result<Self> {
        let workers = topology
            .peers()
            .map(Worker::start)
            .collect::<Result<Vec<_>>>()?;

        info!("Bare thread runtime up: {} cores", topology.num_cores());

        Ok(Self { topology, workers })
    }

    /// Validate `num_cores` and bring up the runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the core count is unsupported or a worker cannot
    /// be started.
    pub fn with_cores(num_cores: usize) -> Result<Self> {
        Self::new(Topology::new(num_cores)?)
    }

    /// Topology of this runtime.
    pub const fn topology(&self) -> Topology {
        self.topology
    }

    /// Number of cores, including the caller.
    pub const fn num_cores(&self) -> usize {
        self.topology.num_cores()
    }

    /// Open a run scope on the calling core.
    ///
    /// Cores still running a job when `f` returns (or unwinds) are joined
    /// before `run` returns.
    pub fn run<'env, R>(&mut self, f: impl FnOnce(&mut Scope<'_, 'env>) -> R) -> R {
        let _bound = topology::OrchestratorBinding::enter();
        let mut scope = Scope {
            topology: self.topology,
            workers: &self.workers,
            spawned: vec![false; self.topology.num_cores()],
            _env: PhantomData,
        };
        f(&mut scope)
    }
}

impl Drop for BareThreads {
    fn drop(&mut self) {
        for worker in &mut self.workers {
            worker.jobs.take();
        }
        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
        }
        debug!("Bare thread runtime down");
    }
}

/// Spawn / join access to the cores for the duration of one run.
///
/// Arguments handed to [`Scope::spawn`] may borrow anything that outlives
/// the enclosing [`BareThreads::run`] call.
pub struct Scope<'rt, 'env> {
    topology: Topology,
    workers: &'rt [Worker],
    spawned: Vec<bool>,
    _env: PhantomData<&'env mut &'env ()>,
}

impl std::fmt::Debug for Scope<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("topology", &self.topology)
            .field("spawned", &self.spawned)
            .finish_non_exhaustive()
    }
}

impl<'env> Scope<'_, 'env> {
    /// Number of cores, including the caller.
    pub const fn num_cores(&self) -> usize {
        self.topology.num_cores()
    }

    /// Whether `core` has a job that has not been joined yet.
    pub fn is_spawned(&self, core: CoreId) -> bool {
        self.spawned.get(core.index()).copied().unwrap_or(false)
    }

    fn worker(&self, core: CoreId) -> &Worker {
        &self.workers[core.index() - 1]
    }

    /// Run `f(arg)` on `core`.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::CoreOutOfRange`] if `core` is not in the topology
    /// - [`RuntimeError::CoreBusy`] if `core` is the caller or already has
    ///   an unjoined job
    /// - [`RuntimeError::WorkerLost`] if the core's worker has exited
    pub fn spawn<F, A>(&mut self, core: CoreId, f: F, arg: A) -> Result<()>
    where
        F: FnOnce(A) + Send + 'env,
        A: Send + 'env,
    {
        self.topology.check(core)?;
        if core == CoreId::ORCHESTRATOR || self.spawned[core.index()] {
            return Err(RuntimeError::CoreBusy { core: core.index() });
        }

        let job: Box<dyn FnOnce() + Send + 'env> = Box::new(move || f(arg));
        // SAFETY: lifetime erasure only. The job borrows data that lives for
        // 'env, which outlives the `run` call owning this scope. The core is
        // marked spawned as soon as the job is handed over, and every spawned
        // core is joined (explicitly or in `Drop`) before the scope is
        // released. The worker drops the job before sending its completion
        // token, so no borrow survives the join.
        let job: Job = unsafe { std::mem::transmute::<Box<dyn FnOnce() + Send + 'env>, Job>(job) };

        self.worker(core).dispatch(job)?;
        self.spawned[core.index()] = true;
        debug!("spawned job on {core}");
        Ok(())
    }

    /// Block until the job spawned on `core` has returned.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::CoreOutOfRange`] if `core` is not in the topology
    /// - [`RuntimeError::NotSpawned`] if `core` has no outstanding job
    /// - [`RuntimeError::JobPanicked`] if the job panicked
    pub fn join(&mut self, core: CoreId) -> Result<()> {
        self.topology.check(core)?;
        if !self.spawned[core.index()] {
            return Err(RuntimeError::NotSpawned { core: core.index() });
        }

        self.spawned[core.index()] = false;
        let outcome = self.worker(core).wait();
        debug!("joined {core}");
        outcome
    }

    /// Spawn-peers, run-own-share, join-all.
    ///
    /// `args[i]` goes to core `i`. Peer cores are spawned first, the
    /// caller then runs `f(args[0])` itself, and finally every peer is
    /// joined. All peers are joined even if one of them fails; the first
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns error if there are more arguments than cores, or any spawn
    /// or join fails.
    pub fn fork_join<A, F>(&mut self, args: Vec<A>, f: F) -> Result<()>
    where
        F: Fn(A) + Copy + Send + 'env,
        A: Send + 'env,
    {
        if args.len() > self.num_cores() {
            return Err(RuntimeError::CoreOutOfRange {
                core: args.len() - 1,
                count: self.num_cores(),
            });
        }

        let mut args = args.into_iter();
        let Some(own) = args.next() else {
            return Ok(());
        };

        let mut peers = Vec::with_capacity(args.len());
        for (core, arg) in self.topology.peers().zip(args) {
            self.spawn(core, f, arg)?;
            peers.push(core);
        }

        f(own);

        let mut first_err = None;
        for core in peers {
            if let Err(e) = self.join(core) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl Drop for Scope<'_, '_> {
    fn drop(&mut self) {
        for index in 1..self.spawned.len() {
            if self.spawned[index] {
                let core = CoreId::new(index);
                warn!("{core} still running at end of run; joining");
                self.spawned[index] = false;
                if let Err(e) = self.worker(core).wait() {
                    warn!("{e}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::core_id;

    #[test]
    fn jobs_run_on_their_core() {
        let mut threads = BareThreads::with_cores(4).unwrap();
        let mut seen = vec![usize::MAX; 4];
        let slots: Vec<&mut usize> = seen.iter_mut().collect();
        threads
            .run(|scope| scope.fork_join(slots, |slot: &mut usize| *slot = core_id().index()))
            .unwrap();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn spawning_orchestrator_is_busy() {
        let mut threads = BareThreads::with_cores(2).unwrap();
        let err = threads.run(|scope| scope.spawn(CoreId::new(0), |()| {}, ())).unwrap_err();
        assert!(matches!(err, RuntimeError::CoreBusy { core: 0 }));
    }

    #[test]
    fn spawning_twice_is_busy() {
        let mut threads = BareThreads::with_cores(2).unwrap();
        threads.run(|scope| {
            scope.spawn(CoreId::new(1), |()| {}, ()).unwrap();
            let err = scope.spawn(CoreId::new(1), |()| {}, ()).unwrap_err();
            assert!(matches!(err, RuntimeError::CoreBusy { core: 1 }));
            scope.join(CoreId::new(1)).unwrap();
        });
    }

    #[test]
    fn out_of_range_core() {
        let mut threads = BareThreads::with_cores(2).unwrap();
        threads.run(|scope| {
            assert!(matches!(
                scope.spawn(CoreId::new(2), |()| {}, ()),
                Err(RuntimeError::CoreOutOfRange { core: 2, count: 2 })
            ));
            assert!(matches!(
                scope.join(CoreId::new(7)),
                Err(RuntimeError::CoreOutOfRange { core: 7, count: 2 })
            ));
        });
    }

    #[test]
    fn join_without_spawn() {
        let mut threads = BareThreads::with_cores(2).unwrap();
        let err = threads.run(|scope| scope.join(CoreId::new(1))).unwrap_err();
        assert!(matches!(err, RuntimeError::NotSpawned { core: 1 }));
    }

    #[test]
    fn panicking_job_reported_at_join() {
        let mut threads = BareThreads::with_cores(2).unwrap();
        threads.run(|scope| {
            scope.spawn(CoreId::new(1), |()| panic!("boom"), ()).unwrap();
            match scope.join(CoreId::new(1)) {
                Err(RuntimeError::JobPanicked { core, message }) => {
                    assert_eq!(core, 1);
                    assert_eq!(message, "boom");
                }
                other => panic!("expected JobPanicked, got {other:?}"),
            }
        });

        // core survives the panic
        let mut hit = false;
        let flag = &mut hit;
        threads.run(|scope| {
            scope.spawn(CoreId::new(1), |hit: &mut bool| *hit = true, flag).unwrap();
            scope.join(CoreId::new(1)).unwrap();
        });
        assert!(hit);
    }

    #[test]
    fn unjoined_cores_joined_at_scope_exit() {
        let mut threads = BareThreads::with_cores(4).unwrap();
        let mut out = [0u32; 3];
        let slots: Vec<&mut u32> = out.iter_mut().collect();
        threads.run(|scope| {
            for (i, slot) in slots.into_iter().enumerate() {
                scope.spawn(CoreId::new(i + 1), |slot: &mut u32| *slot = 42, slot)
                    .unwrap();
            }
        });
        assert_eq!(out, [42; 3]);
    }

    #[test]
    fn runtime_reusable_across_runs() {
        let mut threads = BareThreads::with_cores(2).unwrap();
        for round in 0..8u64 {
            let mut value = 0;
            let slot = &mut value;
            threads.run(|scope| {
                scope.spawn(CoreId::new(1), move |v: &mut u64| *v = round, slot).unwrap();
                scope.join(CoreId::new(1)).unwrap();
            });
            assert_eq!(value, round);
        }
    }

    #[test]
    fn single_core_runs_inline() {
        let mut threads = BareThreads::with_cores(1).unwrap();
        let mut total = 0;
        let args = vec![&mut total];
        threads
            .run(|scope| scope.fork_join(args, |t: &mut i32| *t = 5))
            .unwrap();
        assert_eq!(total, 5);
    }

    #[test]
    fn too_many_arguments() {
        let mut threads = BareThreads::with_cores(2).unwrap();
        let err = threads
            .run(|scope| scope.fork_join(vec![(), (), ()], |()| {}))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::CoreOutOfRange { core: 2, count: 2 }));
    }
}

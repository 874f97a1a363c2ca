//! Disjoint multi-core writes through spawn / join.

use tinyrv_runtime::{
    core_id, current_core, partition, BareThreads, CoreId, Policy, RuntimeError,
};

#[test]
fn every_element_written_exactly_once() {
    for &n in &[1, 2, 4, 8, 16, 32, 64] {
        for policy in Policy::ALL {
            let size = 1000 + n;
            let src0: Vec<i32> = (0..size as i32).collect();
            let src1: Vec<i32> = (0..size as i32).map(|x| 3 * x - 7).collect();
            let reference: Vec<i32> = src0.iter().zip(&src1).map(|(a, b)| a + b).collect();

            let mut dest = vec![0i32; size];
            let mut hits = vec![0u8; size];

            let part = partition(size, n, policy);
            let args: Vec<_> = part
                .split_mut(&mut dest, 1)
                .into_iter()
                .zip(part.split_mut(&mut hits, 1))
                .zip(part.ranges())
                .map(|((out, hit), &range)| (out, hit, range))
                .collect();

            let mut threads = BareThreads::with_cores(n).unwrap();
            let (src0, src1) = (&src0, &src1);
            threads
                .run(|scope| {
                    scope.fork_join(args, move |(out, hit, range)| {
                        for (k, i) in range.as_range().enumerate() {
                            out[k] = src0[i] + src1[i];
                            hit[k] += 1;
                        }
                    })
                })
                .unwrap();

            assert_eq!(dest, reference, "n={n} policy={policy}");
            assert!(hits.iter().all(|&h| h == 1), "n={n} policy={policy}");
        }
    }
}

#[test]
fn jobs_see_their_core_id() {
    let mut threads = BareThreads::with_cores(4).unwrap();
    let mut seen = [usize::MAX; 4];
    let slots: Vec<&mut usize> = seen.iter_mut().collect();
    threads
        .run(|scope| scope.fork_join(slots, |slot: &mut usize| *slot = core_id().index()))
        .unwrap();
    assert_eq!(seen, [0, 1, 2, 3]);
    assert_eq!(core_id(), CoreId::ORCHESTRATOR);
}

#[test]
fn caller_is_bound_only_inside_run() {
    let mut threads = BareThreads::with_cores(2).unwrap();
    assert_eq!(current_core(), None);
    let (inside, outsider) = threads.run(|_| {
        let outsider = std::thread::spawn(current_core).join().unwrap();
        (current_core(), outsider)
    });
    assert_eq!(inside, Some(CoreId::ORCHESTRATOR));
    assert_eq!(outsider, None);
    assert_eq!(current_core(), None);
}

#[test]
fn runtime_is_reusable_across_runs() {
    let mut threads = BareThreads::with_cores(2).unwrap();
    for round in 0..3u32 {
        let mut out = [0u32; 2];
        let slots: Vec<&mut u32> = out.iter_mut().collect();
        threads
            .run(|scope| scope.fork_join(slots, move |slot: &mut u32| *slot = round))
            .unwrap();
        assert_eq!(out, [round, round]);
    }
}

#[test]
fn panicking_job_reported_at_join() {
    let mut threads = BareThreads::with_cores(2).unwrap();
    let err = threads
        .run(|scope| {
            scope.spawn(CoreId::new(1), |msg: &str| panic!("{msg}"), "boom")?;
            scope.join(CoreId::new(1))
        })
        .unwrap_err();
    assert!(matches!(err, RuntimeError::JobPanicked { core: 1, .. }));

    // the worker survives the panic
    let mut flag = false;
    let slot = &mut flag;
    threads
        .run(|scope| {
            scope.spawn(CoreId::new(1), |f: &mut bool| *f = true, slot)?;
            scope.join(CoreId::new(1))
        })
        .unwrap();
    assert!(flag);
}

//! Multi-core and accelerator kernels against their scalar counterparts.

use proptest::prelude::*;
use std::io::Write;

use tinyrv_bench::kernels::{
    matmul_scalar, null_xcel, run_matmul_mt, run_vvadd_mt, vvadd_scalar, vvadd_xcel,
};
use tinyrv_bench::{MatmulData, VvaddData};
use tinyrv_chip::{cores, regs};
use tinyrv_runtime::{
    BackendType, BareThreads, MmioXcel, Policy, SoftwareXcel, Xcel, XcelError, XcelFunction,
    XcelState,
};

#[test]
fn vvadd_mt_matches_scalar_on_every_topology() {
    let data = VvaddData::generate(1003, 5);
    let mut expected = vec![0; data.len()];
    vvadd_scalar(&mut expected, &data.src0, &data.src1);

    for n in cores::SUPPORTED {
        let mut threads = BareThreads::with_cores(n).unwrap();
        for policy in Policy::ALL {
            let mut dest = vec![0; data.len()];
            run_vvadd_mt(&mut threads, &mut dest, &data.src0, &data.src1, policy).unwrap();
            assert_eq!(dest, expected, "n={n} policy={policy}");
        }
    }
}

#[test]
fn matmul_mt_matches_scalar_on_every_topology() {
    // 37 rows leaves a remainder for every core count
    let data = MatmulData::generate(37, 11);
    let mut expected = vec![0; 37 * 37];
    matmul_scalar(37, &mut expected, &data.a, &data.b);
    assert_eq!(expected, data.reference);

    for n in cores::SUPPORTED {
        let mut threads = BareThreads::with_cores(n).unwrap();
        for policy in Policy::ALL {
            let mut c = vec![-1; 37 * 37];
            let part = run_matmul_mt(&mut threads, 37, &mut c, &data.a, &data.b, policy).unwrap();
            assert_eq!(c, expected, "n={n} policy={policy} partition={part}");
        }
    }
}

#[test]
fn vvadd_xcel_matches_scalar() {
    let mut xcel = Xcel::new(SoftwareXcel::new(XcelFunction::Vvadd, 4096).unwrap());
    for len in [0, 1, 105] {
        let data = VvaddData::generate(len, len as u64);
        let mut expected = vec![0; len];
        vvadd_scalar(&mut expected, &data.src0, &data.src1);

        let mut dest = vec![0; len];
        vvadd_xcel(&mut xcel, &mut dest, &data.src0, &data.src1).unwrap();
        assert_eq!(dest, expected, "len={len}");
    }
}

proptest! {
    #[test]
    fn vvadd_mt_any_size(
        size in 0usize..600,
        n in proptest::sample::select(cores::SUPPORTED.to_vec()),
        balanced in any::<bool>(),
    ) {
        let policy = if balanced { Policy::BalancedRemainder } else { Policy::EvenSplitWithTail };
        let data = VvaddData::generate(size, 1);
        let mut threads = BareThreads::with_cores(n).unwrap();
        let mut dest = vec![0; size];
        run_vvadd_mt(&mut threads, &mut dest, &data.src0, &data.src1, policy).unwrap();
        prop_assert_eq!(dest, data.reference);
    }
}

/// Register window file with the status word already reporting DONE.
fn done_window() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let mut bytes = vec![0u8; regs::MMIO_WINDOW];
    bytes[regs::MMIO_STATUS..regs::MMIO_STATUS + 4]
        .copy_from_slice(&regs::status::DONE.to_le_bytes());
    file.write_all(&bytes).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn null_xcel_echoes_over_mmio() {
    let window = done_window();
    let mut xcel = Xcel::new(MmioXcel::open(window.path(), XcelFunction::Null).unwrap());
    assert_eq!(null_xcel(&mut xcel, 0xdead_beef).unwrap(), 0xdead_beef);
    assert_eq!(null_xcel(&mut xcel, 7).unwrap(), 7);
}

#[test]
fn vvadd_xcel_rejects_mmio_up_front() {
    let window = done_window();
    let mut xcel = Xcel::new(MmioXcel::open(window.path(), XcelFunction::Vvadd).unwrap());
    let mut dest = [0; 2];
    assert!(matches!(
        vvadd_xcel(&mut xcel, &mut dest, &[1, 2], &[3, 4]),
        Err(XcelError::UnsupportedBackend { function: "vvadd", backend: BackendType::Mmio })
    ));
    assert_eq!(xcel.state(), XcelState::Idle);
}

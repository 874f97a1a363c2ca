//! Benchmark inputs.
//!
//! Every benchmark runs on a deterministic dataset: inputs drawn from a
//! fixed-seed LCG plus a reference output computed on the host. The
//! file-driven vvadd reads its dataset from text instead:
//!
//! ```text
//! size
//! src0[0] .. src0[size-1]
//! src1[0] .. src1[size-1]
//! ref[0]  .. ref[size-1]
//! ```
//!
//! Values are whitespace-separated decimal integers; line breaks carry no
//! meaning.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{BenchError, Result};

/// Knuth MMIX LCG multiplier.
pub const LCG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
/// Knuth MMIX LCG increment.
pub const LCG_INCREMENT: u64 = 1_442_695_040_888_963_407;

/// Seed every built-in dataset is drawn with.
pub const DEFAULT_SEED: u64 = 42;

/// Largest dataset the file-driven vvadd accepts.
pub const FILEIO_CAPACITY: usize = 105;

/// Fixed-seed linear congruential generator.
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    /// Generator starting from `seed`.
    pub const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next 32 random bits (the high half of the state).
    #[allow(clippy::cast_possible_truncation)]
    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT);
        (self.state >> 32) as u32
    }

    /// Uniform value in `[0, bound)`. `bound` must be non-zero.
    pub fn below(&mut self, bound: u32) -> u32 {
        self.next_u32() % bound
    }

    /// Small non-negative `i32` in `[0, bound)`.
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn small(&mut self, bound: u32) -> i32 {
        self.below(bound.min(i32::MAX as u32)) as i32
    }
}

/// Inputs and reference for vector-vector add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VvaddData {
    /// First operand.
    pub src0: Vec<i32>,
    /// Second operand.
    pub src1: Vec<i32>,
    /// Expected `src0 + src1`.
    pub reference: Vec<i32>,
}

impl VvaddData {
    /// Random operands in `[0, 100)` of length `size`.
    pub fn generate(size: usize, seed: u64) -> Self {
        let mut rng = Lcg::new(seed);
        let src0: Vec<i32> = (0..size).map(|_| rng.small(100)).collect();
        let src1: Vec<i32> = (0..size).map(|_| rng.small(100)).collect();
        let reference = src0
            .iter()
            .zip(&src1)
            .map(|(a, b)| a.wrapping_add(*b))
            .collect();
        Self {
            src0,
            src1,
            reference,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.reference.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.reference.is_empty()
    }

    /// Parse the text format, accepting at most `capacity` elements.
    ///
    /// # Errors
    ///
    /// Returns error if a token is not an integer, the size exceeds
    /// `capacity`, or fewer than `3 * size` values follow the size.
    pub fn from_reader(mut reader: impl Read, capacity: usize) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let mut tokens = text.split_whitespace().enumerate();

        let size: usize = match tokens.next() {
            Some((i, tok)) => tok
                .parse()
                .map_err(|e| BenchError::parse(i, format!("size '{tok}': {e}")))?,
            None => return Err(BenchError::Truncated { expected: 1, found: 0 }),
        };
        if size > capacity {
            return Err(BenchError::TooLarge { size, capacity });
        }

        let values = tokens
            .take(3 * size)
            .map(|(i, tok)| {
                tok.parse::<i32>()
                    .map_err(|e| BenchError::parse(i, format!("'{tok}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        if values.len() < 3 * size {
            return Err(BenchError::Truncated {
                expected: 1 + 3 * size,
                found: 1 + values.len(),
            });
        }

        debug!("vvadd dataset: {size} elements");
        let mut chunks = values.chunks_exact(size.max(1));
        let mut next = || chunks.next().map(<[i32]>::to_vec).unwrap_or_default();
        Ok(Self {
            src0: next(),
            src1: next(),
            reference: next(),
        })
    }

    /// Load the text format from `path`.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or does not parse.
    pub fn load(path: &Path, capacity: usize) -> Result<Self> {
        Self::from_reader(File::open(path)?, capacity)
    }

    /// Write the text format.
    ///
    /// # Errors
    ///
    /// Returns error if the writer fails.
    pub fn write_to(&self, mut w: impl Write) -> io::Result<()> {
        writeln!(w, "{}", self.len())?;
        for values in [&self.src0, &self.src1, &self.reference] {
            let line: Vec<String> = values.iter().map(ToString::to_string).collect();
            writeln!(w, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

/// Inputs and reference for square matrix multiply, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatmulData {
    /// Matrix dimension.
    pub n: usize,
    /// Left operand, `n * n`.
    pub a: Vec<i32>,
    /// Right operand, `n * n`.
    pub b: Vec<i32>,
    /// Expected `a × b`.
    pub reference: Vec<i32>,
}

impl MatmulData {
    /// Random `n × n` operands in `[0, 10)`.
    pub fn generate(n: usize, seed: u64) -> Self {
        let mut rng = Lcg::new(seed);
        let a: Vec<i32> = (0..n * n).map(|_| rng.small(10)).collect();
        let b: Vec<i32> = (0..n * n).map(|_| rng.small(10)).collect();
        let mut reference = vec![0; n * n];
        for i in 0..n {
            for k in 0..n {
                let aik = a[i * n + k];
                for j in 0..n {
                    reference[i * n + j] = aik
                        .wrapping_mul(b[k * n + j])
                        .wrapping_add(reference[i * n + j]);
                }
            }
        }
        Self { n, a, b, reference }
    }
}

/// Inputs and references for unsigned divide and remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivRemData {
    /// Dividends.
    pub src0: Vec<u32>,
    /// Divisors, never zero.
    pub src1: Vec<u32>,
    /// Expected quotients.
    pub ref_div: Vec<u32>,
    /// Expected remainders.
    pub ref_rem: Vec<u32>,
}

impl DivRemData {
    /// Random full-range dividends over divisors in `[1, 1000]`.
    pub fn generate(size: usize, seed: u64) -> Self {
        let mut rng = Lcg::new(seed);
        let src0: Vec<u32> = (0..size).map(|_| rng.next_u32()).collect();
        let src1: Vec<u32> = (0..size).map(|_| rng.below(1000) + 1).collect();
        let ref_div = src0.iter().zip(&src1).map(|(a, b)| a / b).collect();
        let ref_rem = src0.iter().zip(&src1).map(|(a, b)| a % b).collect();
        Self {
            src0,
            src1,
            ref_div,
            ref_rem,
        }
    }
}

/// Input and reference for sorting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortData {
    /// Unsorted input.
    pub src: Vec<i32>,
    /// `src` in ascending order.
    pub reference: Vec<i32>,
}

impl SortData {
    /// Random values in `[0, 1000)`.
    pub fn generate(size: usize, seed: u64) -> Self {
        let mut rng = Lcg::new(seed);
        let src: Vec<i32> = (0..size).map(|_| rng.small(1000)).collect();
        let mut reference = src.clone();
        reference.sort_unstable();
        Self { src, reference }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lcg_deterministic() {
        let mut a = Lcg::new(7);
        let mut b = Lcg::new(7);
        for _ in 0..100 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
        assert_ne!(Lcg::new(1).next_u32(), Lcg::new(2).next_u32());
    }

    #[test]
    fn generated_vvadd_is_consistent() {
        let data = VvaddData::generate(100, DEFAULT_SEED);
        assert_eq!(data.len(), 100);
        assert_eq!(data, VvaddData::generate(100, DEFAULT_SEED));
        assert!(data.src0.iter().all(|&v| (0..100).contains(&v)));
        for i in 0..100 {
            assert_eq!(data.reference[i], data.src0[i] + data.src1[i]);
        }
    }

    #[test]
    fn parses_text_format() {
        let text = "3\n1 2 3\n10 20\n30\n11 22 33\n";
        let data = VvaddData::from_reader(text.as_bytes(), FILEIO_CAPACITY).unwrap();
        assert_eq!(data.src0, [1, 2, 3]);
        assert_eq!(data.src1, [10, 20, 30]);
        assert_eq!(data.reference, [11, 22, 33]);
    }

    #[test]
    fn empty_dataset() {
        let data = VvaddData::from_reader("0\n".as_bytes(), FILEIO_CAPACITY).unwrap();
        assert!(data.is_empty());
        assert!(data.src0.is_empty() && data.src1.is_empty());
    }

    #[test]
    fn negative_values_parse() {
        let data = VvaddData::from_reader("1 -5 2 -3".as_bytes(), 4).unwrap();
        assert_eq!(data.reference, [-3]);
    }

    #[test]
    fn rejects_truncated() {
        assert!(matches!(
            VvaddData::from_reader("2 1 2 3 4 5".as_bytes(), 8),
            Err(BenchError::Truncated { expected: 7, found: 6 })
        ));
        assert!(matches!(
            VvaddData::from_reader("".as_bytes(), 8),
            Err(BenchError::Truncated { expected: 1, found: 0 })
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            VvaddData::from_reader("1 2 x 4".as_bytes(), 8),
            Err(BenchError::Parse { token: 2, .. })
        ));
        assert!(matches!(
            VvaddData::from_reader("-1".as_bytes(), 8),
            Err(BenchError::Parse { token: 0, .. })
        ));
    }

    #[test]
    fn rejects_oversized() {
        assert!(matches!(
            VvaddData::from_reader("106".as_bytes(), FILEIO_CAPACITY),
            Err(BenchError::TooLarge { size: 106, capacity: 105 })
        ));
    }

    #[test]
    fn text_format_round_trip() {
        let data = VvaddData::generate(7, 3);
        let mut buf = Vec::new();
        data.write_to(&mut buf).unwrap();
        assert_eq!(VvaddData::from_reader(buf.as_slice(), 7).unwrap(), data);
    }

    #[test]
    fn matmul_reference_matches_definition() {
        let data = MatmulData::generate(5, DEFAULT_SEED);
        let n = data.n;
        for i in 0..n {
            for j in 0..n {
                let c: i32 = (0..n).map(|k| data.a[i * n + k] * data.b[k * n + j]).sum();
                assert_eq!(data.reference[i * n + j], c);
            }
        }
    }

    #[test]
    fn divrem_divisors_non_zero() {
        let data = DivRemData::generate(500, DEFAULT_SEED);
        assert!(data.src1.iter().all(|&d| d != 0));
        for i in 0..500 {
            assert_eq!(data.ref_div[i] * data.src1[i] + data.ref_rem[i], data.src0[i]);
        }
    }

    #[test]
    fn sort_reference_is_sorted() {
        let data = SortData::generate(128, DEFAULT_SEED);
        assert!(data.reference.windows(2).all(|w| w[0] <= w[1]));
    }
}

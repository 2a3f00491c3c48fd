use crate::cpu::f32::tensor::Tensor;
use crate::SoftmaxError;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(not(feature = "fast-math"))]
#[inline]
fn exp_f32(x: f32) -> f32 {
    x.exp()
}

#[cfg(feature = "fast-math")]
#[inline]
fn exp_f32(x: f32) -> f32 {
    fast_math::exp(x)
}

/// Fused softmax of a single row. `output` must be at least as long as `input`.
///
/// The row max is removed before exponentiation so large inputs stay finite.
pub fn softmax_slice(input: &[f32], output: &mut [f32]) {
    let max = input.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    let mut denominator = 0.0;
    input
        .iter()
        .zip(output.iter_mut())
        .for_each(|(&i, o)| {
            *o = exp_f32(i - max);
            denominator += *o;
        });

    let inv = 1.0 / denominator;
    output.iter_mut().for_each(|o| *o *= inv);
}

/// Multi-pass softmax of a single row: one pass for the max, one for the
/// exponentials, one for the denominator and one to normalize. Always uses
/// `f32::exp`, it is the baseline the fused kernel is checked and benched
/// against.
pub fn softmax_slice_naive(input: &[f32], output: &mut [f32]) {
    let output = &mut output[..input.len()];
    let max = input.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    for (o, &i) in output.iter_mut().zip(input) {
        *o = (i - max).exp();
    }
    let denominator: f32 = output.iter().sum();
    for o in output.iter_mut() {
        *o /= denominator;
    }
}

/// Width of the rows softmax runs on, once `x` and `out` are known to agree.
fn row_width(x: &Tensor, out: &Tensor) -> Result<usize, SoftmaxError> {
    if x.shape() != out.shape() {
        return Err(SoftmaxError::DimensionMismatch {
            expected: x.shape().to_vec(),
            got: out.shape().to_vec(),
        });
    }
    x.shape()
        .last()
        .copied()
        .ok_or(SoftmaxError::InvalidRank { expected_rank: 1 })
}

fn for_each_row<F>(x: &Tensor, out: &mut Tensor, f: F) -> Result<(), SoftmaxError>
where
    F: Fn(&[f32], &mut [f32]) + Send + Sync,
{
    let n = row_width(x, out)?;

    #[cfg(feature = "rayon")]
    out.data_mut()
        .par_chunks_exact_mut(n)
        .zip(x.data().par_chunks_exact(n))
        .for_each(|(o, i)| f(i, o));

    #[cfg(not(feature = "rayon"))]
    out.data_mut()
        .chunks_exact_mut(n)
        .zip(x.data().chunks_exact(n))
        .for_each(|(o, i)| f(i, o));

    Ok(())
}

/// Softmax on the last dimension for tensor `x`, written into `out`.
pub fn softmax(x: &Tensor, out: &mut Tensor) -> Result<(), SoftmaxError> {
    for_each_row(x, out, softmax_slice)
}

/// Same as [softmax] with the multi-pass [softmax_slice_naive] kernel.
pub fn softmax_naive(x: &Tensor, out: &mut Tensor) -> Result<(), SoftmaxError> {
    for_each_row(x, out, softmax_slice_naive)
}

/// Sum of every element of `x`
pub fn sum(x: &Tensor) -> f32 {
    x.data().iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{assert_close, assert_rows_normalized, TOLERANCE};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn simple_softmax() {
        let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]).unwrap();
        let mut out = Tensor::zeros(vec![2, 2]).unwrap();
        softmax(&a, &mut out).unwrap();
        // Values obtained through python
        assert_close(out.data(), &[0.2689, 0.7311, 0.2689, 0.7311]);
        // Input untouched
        assert_eq!(a.data(), [1.0, 2.0, 3.0, 4.0]);

        let a = Tensor::new(vec![0.0, 1.0, 0.0, 1.0, -2.0, 2.0, 3.0, -3.0], vec![2, 4]).unwrap();
        let mut out = Tensor::zeros(vec![2, 4]).unwrap();
        softmax(&a, &mut out).unwrap();
        assert_close(
            out.data(),
            // Values obtained through python
            &[0.1345, 0.3655, 0.1345, 0.3655, 0.0049, 0.2671, 0.7262, 0.0018],
        );
    }

    #[test]
    fn softmax_large_values() {
        let a = Tensor::new(vec![1000.0, 1001.0, -1000.0, 0.0], vec![2, 2]).unwrap();
        let mut out = Tensor::zeros(vec![2, 2]).unwrap();
        softmax(&a, &mut out).unwrap();
        assert!(out.data().iter().all(|v| v.is_finite()));
        assert_close(out.data(), &[0.2689, 0.7311, 0.0, 1.0]);
    }

    #[test]
    fn softmax_random_rows() {
        let mut rng = StdRng::seed_from_u64(0);
        let a = Tensor::rand(vec![16, 100], &mut rng).unwrap();
        let mut out = Tensor::zeros(vec![16, 100]).unwrap();
        softmax(&a, &mut out).unwrap();
        assert_rows_normalized(out.data(), 100);
        assert!((sum(&out) - 16.0).abs() < 1e-3);
    }

    #[test]
    fn softmax_rank3() {
        let data: Vec<_> = (0..12).map(|i| (i + 1) as f32).collect();
        let a = Tensor::new(data, vec![2, 2, 3]).unwrap();
        let mut out = Tensor::zeros(vec![2, 2, 3]).unwrap();
        softmax(&a, &mut out).unwrap();
        assert_close(
            out.data(),
            // Values obtained through python
            &[
                0.09, 0.2447, 0.6652, 0.09, 0.2447, 0.6652, 0.09, 0.2447, 0.6652, 0.09, 0.2447,
                0.6652,
            ],
        );
    }

    #[test]
    fn fused_matches_naive() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut a = Tensor::rand(vec![32, 333], &mut rng).unwrap();
        // Shift into [-1, 1)
        a.data_mut().iter_mut().for_each(|v| *v = *v * 2.0 - 1.0);

        let mut fused = Tensor::zeros(vec![32, 333]).unwrap();
        let mut naive = Tensor::zeros(vec![32, 333]).unwrap();
        softmax(&a, &mut fused).unwrap();
        softmax_naive(&a, &mut naive).unwrap();

        for (f, n) in fused.data().iter().zip(naive.data()) {
            assert!((f - n).abs() < TOLERANCE, "{f} {n}");
        }
        assert_rows_normalized(naive.data(), 333);
    }

    #[test]
    fn naive_slice() {
        let mut out = [0.0; 4];
        softmax_slice_naive(&[0.0, 1.0, 0.0, 1.0], &mut out);
        // Values obtained through python
        assert_close(&out, &[0.1345, 0.3655, 0.1345, 0.3655]);
    }

    #[test]
    fn softmax_dimension_mismatch() {
        let a = Tensor::zeros(vec![2, 3]).unwrap();
        let mut out = Tensor::zeros(vec![3, 2]).unwrap();
        match softmax(&a, &mut out) {
            Err(SoftmaxError::DimensionMismatch { expected, got }) => {
                assert_eq!(expected, vec![2, 3]);
                assert_eq!(got, vec![3, 2]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            softmax_naive(&a, &mut out),
            Err(SoftmaxError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn simple_sum() {
        let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]).unwrap();
        assert_eq!(sum(&a), 10.0);
    }
}

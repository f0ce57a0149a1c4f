//! In-place radix-2 FFT and the Blackman–Harris analysis window.
//!
//! The static spectrum estimator runs thousands of frames through the same
//! transform size, so the twiddle table lives in a reusable [`Radix2Fft`]
//! plan and the per-frame work only touches the caller's buffers.

use std::f64::consts::PI;

use crate::error::{AnalysisError, AnalysisResult};

/// 4-term Blackman–Harris coefficients `a0..a3`.
pub const BLACKMAN_HARRIS: [f64; 4] = [0.35875, 0.48829, 0.14128, 0.01168];

pub fn is_power_of_two(n: usize) -> bool {
    n > 0 && n & (n - 1) == 0
}

/// Symmetric 4-term Blackman–Harris window of length `size`.
pub fn blackman_harris(size: usize) -> Vec<f32> {
    if size <= 1 {
        return vec![1.0; size];
    }
    let [a0, a1, a2, a3] = BLACKMAN_HARRIS;
    let denom = (size - 1) as f64;
    (0..size)
        .map(|n| {
            let x = 2.0 * PI * n as f64 / denom;
            (a0 - a1 * x.cos() + a2 * (2.0 * x).cos() - a3 * (3.0 * x).cos()) as f32
        })
        .collect()
}

/// Precomputed iterative Cooley–Tukey transform for one power-of-two size.
#[derive(Clone, Debug)]
pub struct Radix2Fft {
    size: usize,
    /// `e^{-2πik/size}` for `k < size/2`, as `(cos, sin)`.
    twiddles: Vec<(f32, f32)>,
}

impl Radix2Fft {
    pub fn new(size: usize) -> AnalysisResult<Self> {
        if !is_power_of_two(size) {
            return Err(AnalysisError::InvalidFftSize { size });
        }
        let twiddles = (0..size / 2)
            .map(|k| {
                let angle = -2.0 * PI * k as f64 / size as f64;
                (angle.cos() as f32, angle.sin() as f32)
            })
            .collect();
        Ok(Self { size, twiddles })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward complex DFT of `(re, im)` in place.
    pub fn process(&self, re: &mut [f32], im: &mut [f32]) -> AnalysisResult<()> {
        let n = self.size;
        for len in [re.len(), im.len()] {
            if len != n {
                return Err(AnalysisError::LengthMismatch {
                    expected: n,
                    actual: len,
                });
            }
        }

        // Bit-reversal permutation
        let mut j = 0usize;
        for i in 0..n {
            if i < j {
                re.swap(i, j);
                im.swap(i, j);
            }
            let mut m = n >> 1;
            while m >= 1 && j >= m {
                j -= m;
                m >>= 1;
            }
            j += m;
        }

        let mut size = 2;
        while size <= n {
            let half = size >> 1;
            let stride = n / size;
            for start in (0..n).step_by(size) {
                for k in 0..half {
                    let (wr, wi) = self.twiddles[k * stride];
                    let i0 = start + k;
                    let i1 = i0 + half;

                    let tr = wr * re[i1] - wi * im[i1];
                    let ti = wr * im[i1] + wi * re[i1];

                    re[i1] = re[i0] - tr;
                    im[i1] = im[i0] - ti;
                    re[i0] += tr;
                    im[i0] += ti;
                }
            }
            size <<= 1;
        }

        Ok(())
    }
}

/// One-shot transform; builds a plan for `re.len()` and runs it.
pub fn fft_in_place(re: &mut [f32], im: &mut [f32]) -> AnalysisResult<()> {
    Radix2Fft::new(re.len())?.process(re, im)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::{num_complex::Complex, FftPlanner};

    fn sine(freq: f32, sample_rate: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn rejects_non_power_of_two() {
        assert_eq!(
            Radix2Fft::new(1000).unwrap_err(),
            AnalysisError::InvalidFftSize { size: 1000 }
        );
        assert!(Radix2Fft::new(0).is_err());
        assert!(Radix2Fft::new(1).is_ok());
    }

    #[test]
    fn rejects_mismatched_buffers() {
        let fft = Radix2Fft::new(8).unwrap();
        let mut re = vec![0.0; 8];
        let mut im = vec![0.0; 4];
        assert_eq!(
            fft.process(&mut re, &mut im),
            Err(AnalysisError::LengthMismatch {
                expected: 8,
                actual: 4
            })
        );
    }

    #[test]
    fn impulse_is_flat() {
        let mut re = vec![0.0; 16];
        let mut im = vec![0.0; 16];
        re[0] = 1.0;
        fft_in_place(&mut re, &mut im).unwrap();
        for k in 0..16 {
            assert!((re[k] - 1.0).abs() < 1e-6);
            assert!(im[k].abs() < 1e-6);
        }
    }

    #[test]
    fn sinusoid_lands_in_nearest_bin() {
        let n = 1024;
        let sr = 8000.0;
        let freq = 1234.0;
        let mut re = sine(freq, sr, n);
        let mut im = vec![0.0; n];
        fft_in_place(&mut re, &mut im).unwrap();

        let (peak_bin, _) = (0..n / 2)
            .map(|k| (k, re[k] * re[k] + im[k] * im[k]))
            .fold((0, 0.0f32), |best, cur| if cur.1 > best.1 { cur } else { best });
        let expected = freq * n as f32 / sr;
        assert!((peak_bin as f32 - expected).abs() <= 1.0);
    }

    #[test]
    fn parseval_energy_holds() {
        let n = 512;
        let signal: Vec<f32> = (0..n)
            .map(|i| (i as f32 * 0.37).sin() + 0.5 * (i as f32 * 1.91).cos())
            .collect();
        let time_energy: f64 = signal.iter().map(|&x| (x as f64).powi(2)).sum();

        let mut re = signal;
        let mut im = vec![0.0; n];
        fft_in_place(&mut re, &mut im).unwrap();
        let freq_energy: f64 = re
            .iter()
            .zip(&im)
            .map(|(&r, &i)| (r as f64).powi(2) + (i as f64).powi(2))
            .sum::<f64>()
            / n as f64;

        assert!((time_energy - freq_energy).abs() / time_energy < 1e-4);
    }

    #[test]
    fn matches_rustfft() {
        let n = 256;
        let signal: Vec<f32> = (0..n).map(|i| ((i * 7919) % 97) as f32 / 97.0 - 0.5).collect();

        let mut re = signal.clone();
        let mut im = vec![0.0; n];
        fft_in_place(&mut re, &mut im).unwrap();

        let mut reference: Vec<Complex<f32>> =
            signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
        FftPlanner::<f32>::new()
            .plan_fft_forward(n)
            .process(&mut reference);

        for k in 0..n {
            assert!((re[k] - reference[k].re).abs() < 1e-3, "re mismatch at {k}");
            assert!((im[k] - reference[k].im).abs() < 1e-3, "im mismatch at {k}");
        }
    }

    #[test]
    fn window_shape() {
        let w = blackman_harris(1025);
        assert_eq!(w.len(), 1025);
        // a0 - a1 + a2 - a3 at the edges, unity at the centre.
        assert!(w[0] < 1e-4);
        assert!((w[512] - 1.0).abs() < 1e-5);
        for i in 0..w.len() {
            assert!((w[i] - w[w.len() - 1 - i]).abs() < 1e-6);
        }
        assert_eq!(blackman_harris(0), Vec::<f32>::new());
        assert_eq!(blackman_harris(1), vec![1.0]);
    }
}

//! Resampler: pure function from (samples, rate_in, rate_out) to samples
//! at rate_out, used to bring capture-rate audio down to the 16 kHz
//! working rate shared by the VAD and the acoustic model.
//!
//! Uses `rubato`'s FFT-based fixed-input resampler (grounded in the
//! pack's terminal-voice client, which reaches for the same crate for
//! the same device-rate-to-16kHz problem). Deterministic: the same
//! input always produces the same output, and the identity case
//! (`r_in == r_out`) is a plain copy with no resampler involved.

use rubato::{FftFixedIn, Resampler};

const CHUNK_SIZE_IN: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Resamples `x` from `r_in` Hz to `r_out` Hz. Output length is
/// approximately `x.len() * r_out / r_in`.
pub fn resample(x: &[f32], r_in: u32, r_out: u32) -> Vec<f32> {
    if r_in == r_out || x.is_empty() {
        return x.to_vec();
    }

    let mut resampler = match FftFixedIn::<f32>::new(
        r_in as usize,
        r_out as usize,
        CHUNK_SIZE_IN,
        SUB_CHUNKS,
        1,
    ) {
        Ok(r) => r,
        Err(err) => {
            tracing::warn!(error = %err, "failed to build resampler, falling back to linear");
            return linear_resample(x, r_in, r_out);
        }
    };

    let expected_len = (x.len() as f64 * r_out as f64 / r_in as f64).round() as usize;
    let mut output = Vec::with_capacity(expected_len + CHUNK_SIZE_IN);
    let mut offset = 0usize;

    while offset < x.len() {
        let end = (offset + CHUNK_SIZE_IN).min(x.len());
        let mut chunk = x[offset..end].to_vec();
        if chunk.len() < CHUNK_SIZE_IN {
            chunk.resize(CHUNK_SIZE_IN, 0.0);
        }
        match resampler.process(&[chunk], None) {
            Ok(out) => output.extend_from_slice(&out[0]),
            Err(err) => {
                tracing::warn!(error = %err, "resampler process failed, falling back to linear");
                return linear_resample(x, r_in, r_out);
            }
        }
        offset = end;
    }

    output.truncate(expected_len.max(1).min(output.len().max(1)));
    if output.is_empty() && expected_len > 0 {
        return linear_resample(x, r_in, r_out);
    }
    output
}

/// Deterministic linear-interpolation fallback, used only if the FFT
/// resampler cannot be constructed or fails mid-stream.
fn linear_resample(x: &[f32], r_in: u32, r_out: u32) -> Vec<f32> {
    if x.is_empty() {
        return Vec::new();
    }
    let ratio = r_out as f64 / r_in as f64;
    let out_len = ((x.len() as f64) * ratio).round().max(1.0) as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;
        let a = x[idx.min(x.len() - 1)];
        let b = x[(idx + 1).min(x.len() - 1)];
        out.push(a + (b - a) * frac);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_rates_match() {
        let x = vec![0.1, 0.2, -0.3];
        assert_eq!(resample(&x, 16000, 16000), x);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(resample(&[], 48000, 16000).is_empty());
    }

    #[test]
    fn downsample_shrinks_length_roughly_proportionally() {
        let x = vec![0.0f32; 48000];
        let y = resample(&x, 48000, 16000);
        let expected = x.len() / 3;
        assert!((y.len() as i64 - expected as i64).abs() < expected as i64 / 4 + 16);
    }

    #[test]
    fn linear_resample_is_deterministic() {
        let x: Vec<f32> = (0..100).map(|i| (i as f32) * 0.01).collect();
        let a = linear_resample(&x, 48000, 16000);
        let b = linear_resample(&x, 48000, 16000);
        assert_eq!(a, b);
    }
}

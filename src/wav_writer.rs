//! WAV clip persistence: 16-bit PCM mono 16 kHz, written into the
//! session's audio_dir with a timestamp-derived filename.

use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::AsrError;

const WAV_SAMPLE_RATE: u32 = 16000;

/// Derives a filesystem-safe filename from an ISO-8601 start timestamp
/// by replacing `:` and `.` with `-`.
pub fn filename_for_timestamp(iso_timestamp: &str) -> String {
    let safe: String = iso_timestamp
        .chars()
        .map(|c| if c == ':' || c == '.' { '-' } else { c })
        .collect();
    format!("{safe}.wav")
}

/// Writes `samples_16k` (already at 16 kHz) to `audio_dir/<filename>` as
/// 16-bit signed PCM mono. Returns the absolute path written.
pub fn write_clip(audio_dir: &Path, filename: &str, samples_16k: &[f32]) -> Result<PathBuf, AsrError> {
    std::fs::create_dir_all(audio_dir).map_err(|e| AsrError::io(audio_dir, e))?;

    let path = audio_dir.join(filename);
    let spec = WavSpec {
        channels: 1,
        sample_rate: WAV_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(&path, spec)
        .map_err(|e| AsrError::resource("wav writer", anyhow::anyhow!("{e}")))?;

    for &sample in samples_16k {
        let clamped = sample.clamp(-1.0, 1.0);
        let pcm = (clamped * i16::MAX as f32) as i16;
        writer
            .write_sample(pcm)
            .map_err(|e| AsrError::io(&path, std::io::Error::new(std::io::ErrorKind::Other, e)))?;
    }

    writer
        .finalize()
        .map_err(|e| AsrError::io(&path, std::io::Error::new(std::io::ErrorKind::Other, e)))?;

    path.canonicalize().or_else(|_| Ok(path.clone())).map_err(|e: std::io::Error| AsrError::io(&path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_replaces_unsafe_characters() {
        assert_eq!(
            filename_for_timestamp("2026-07-28T10:15:30.123"),
            "2026-07-28T10-15-30-123.wav"
        );
    }

    #[test]
    fn writes_and_reads_back_a_clip() {
        let dir = std::env::temp_dir().join(format!("aerolex-wav-test-{}", std::process::id()));
        let samples = vec![0.0f32, 0.5, -0.5, 1.0, -1.0];
        let path = write_clip(&dir, "clip.wav", &samples).unwrap();
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, WAV_SAMPLE_RATE);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().bits_per_sample, 16);
        let _ = std::fs::remove_dir_all(&dir);
    }
}

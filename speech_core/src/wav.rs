use std::io::Cursor;

use anyhow::Context;

/// Encode PCM f32 samples as 16-bit mono WAV, peak-normalized so the
/// loudest sample hits the full 16-bit range.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> anyhow::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    let scale = if peak > 0.0 { 1.0 / peak } else { 0.0 };

    // WAV header (44 bytes) + 2 bytes per sample.
    let mut cursor = Cursor::new(Vec::<u8>::with_capacity(44 + samples.len() * 2));
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).context("wav writer init failed")?;
        for &s in samples {
            let v = ((s * scale).clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(v).context("wav sample write failed")?;
        }
        writer.finalize().context("wav finalize failed")?;
    }
    Ok(cursor.into_inner())
}

/// Decode a WAV container into f32 samples plus its sample rate.
/// Accepts both integer and float PCM.
pub fn decode_wav(bytes: &[u8]) -> anyhow::Result<(Vec<f32>, u32)> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).context("not a valid WAV payload")?;
    let spec = reader.spec();
    let sample_rate = spec.sample_rate;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .context("wav float samples")?,
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<_, _>>()
                .context("wav int samples")?
        }
    };
    Ok((samples, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_produces_riff_header() {
        let bytes = encode_wav(&[0.0, 0.25, -0.25], 24_000).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
    }

    #[test]
    fn test_encode_peak_normalizes() {
        // Quiet input should still reach full scale after normalization.
        let bytes = encode_wav(&[0.1, -0.05, 0.02], 24_000).unwrap();
        let (samples, rate) = decode_wav(&bytes).unwrap();
        assert_eq!(rate, 24_000);
        let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.99, "peak was {peak}");
    }

    #[test]
    fn test_encode_silence_stays_silent() {
        let bytes = encode_wav(&[0.0; 16], 24_000).unwrap();
        let (samples, _) = decode_wav(&bytes).unwrap();
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_roundtrip_preserves_length() {
        let input = vec![0.5f32; 240];
        let bytes = encode_wav(&input, 24_000).unwrap();
        let (samples, _) = decode_wav(&bytes).unwrap();
        assert_eq!(samples.len(), input.len());
    }
}

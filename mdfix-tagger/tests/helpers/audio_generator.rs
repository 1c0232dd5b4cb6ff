//! WAV fixtures for real tag container tests

use std::path::Path;

/// Write a short 16-bit mono sine tone to `path`
pub fn generate_test_wav(path: &Path, duration_seconds: f64) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let total_samples = (duration_seconds * spec.sample_rate as f64) as usize;

    for i in 0..total_samples {
        let t = i as f64 / spec.sample_rate as f64;
        let sample = (t * 440.0 * 2.0 * std::f64::consts::PI).sin() * 0.5;
        writer.write_sample((sample * i16::MAX as f64) as i16)?;
    }

    writer.finalize()?;
    Ok(())
}

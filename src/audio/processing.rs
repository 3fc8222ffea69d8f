use anyhow::Result;
use rubato::{SincFixedIn, SincInterpolationType, SincInterpolationParameters, WindowFunction, Resampler};

/// Averages interleaved frames down to a single channel.
pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Repeats each mono sample across `channels` interleaved outputs.
pub fn upmix(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return samples.to_vec();
    }
    samples
        .iter()
        .flat_map(|&s| std::iter::repeat(s).take(channels))
        .collect()
}

pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(
        ratio,
        2.0,
        params,
        samples.len(),
        1, // mono
    )?;

    let input = vec![samples.to_vec()];
    let output = resampler.process(&input, None)?;

    Ok(output.into_iter().next().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_frames() {
        let stereo = [1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(downmix(&stereo, 2), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn mono_passes_through() {
        let mono = [0.1, 0.2, 0.3];
        assert_eq!(downmix(&mono, 1), mono.to_vec());
        assert_eq!(upmix(&mono, 1), mono.to_vec());
    }

    #[test]
    fn upmix_duplicates_samples() {
        assert_eq!(upmix(&[0.25, -0.5], 2), vec![0.25, 0.25, -0.5, -0.5]);
    }

    #[test]
    fn same_rate_is_identity() {
        let samples = vec![0.0, 0.5, -0.5];
        assert_eq!(resample(&samples, 24_000, 24_000).unwrap(), samples);
    }

    #[test]
    fn resample_changes_length_by_ratio() {
        let samples: Vec<f32> = (0..4_800).map(|i| (i as f32 * 0.01).sin()).collect();
        let out = resample(&samples, 48_000, 24_000).unwrap();
        let expected = samples.len() / 2;
        assert!((out.len() as i64 - expected as i64).abs() < 64, "got {} samples", out.len());
    }
}

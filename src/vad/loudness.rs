/// Root-mean-square of the zero-meaned buffer, clamped to `[0, 1]`.
///
/// Removing the mean first makes the estimate insensitive to DC offset in the capture path.
/// An empty buffer is silence.
pub fn rms_centered(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let n = samples.len() as f64;
    let mean = samples.iter().map(|&s| s as f64).sum::<f64>() / n;
    let energy = samples
        .iter()
        .map(|&s| {
            let c = s as f64 - mean;
            c * c
        })
        .sum::<f64>()
        / n;

    clamp_unit(energy.sqrt() as f32)
}

/// RMS of 8-bit analyser time-domain data (silence at 128), clamped to `[0, 1]`.
pub fn rms_from_time_domain(bytes: &[u8]) -> f32 {
    if bytes.is_empty() {
        return 0.0;
    }

    let energy = bytes
        .iter()
        .map(|&b| {
            let v = (b as f64 - 128.0) / 128.0;
            v * v
        })
        .sum::<f64>()
        / bytes.len() as f64;

    clamp_unit(energy.sqrt() as f32)
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

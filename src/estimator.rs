//! Heart rate and RMSSD from peak positions.
//!
//! Both estimators return 0.0 when there are too few peaks. Callers must read
//! that zero as "no estimate yet", never as a measurement.

/// Mean beats per minute over the consecutive peak gaps. Needs two peaks.
pub fn heart_rate_bpm(peaks: &[usize], sampling_rate_hz: f64) -> f64 {
    if peaks.len() < 2 {
        return 0.0;
    }
    let gaps: Vec<f64> = peaks.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
    let mean_gap = gaps.iter().sum::<f64>() / gaps.len() as f64;
    60.0 * sampling_rate_hz / mean_gap
}

/// RR intervals in milliseconds between consecutive peaks.
pub fn rr_intervals_ms(peaks: &[usize], sampling_rate_hz: f64) -> Vec<f64> {
    peaks
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64 / sampling_rate_hz * 1000.0)
        .collect()
}

/// Root mean square of successive RR differences, in milliseconds. Needs three peaks.
pub fn rmssd_ms(peaks: &[usize], sampling_rate_hz: f64) -> f64 {
    if peaks.len() < 3 {
        return 0.0;
    }
    let rr = rr_intervals_ms(peaks, sampling_rate_hz);
    let squared: Vec<f64> = rr
        .windows(2)
        .map(|w| {
            let diff = (w[1] - w[0]).abs();
            diff * diff
        })
        .collect();
    (squared.iter().sum::<f64>() / squared.len() as f64).sqrt()
}

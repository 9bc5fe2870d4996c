/*!
 * Quantum Estimator
 * Weighted mean of observed CPU bursts
 *
 * The estimate is `sum(w * x) / sum(w)`. Each sample's weight is chosen when
 * it is folded so that it moves the estimate by at least `alpha_rise` (samples
 * above the estimate) or `alpha_fall` (samples below). Until the total weight
 * is large enough for that floor to matter, samples get a biased running-mean
 * weight: `1 + alpha_rise` when rising and `1 - alpha_fall` when falling, so
 * rises outweigh falls from the second sample on.
 *
 * The weight is returned to the caller and handed back on retraction, which
 * subtracts exactly what the fold added.
 */

use parking_lot::Mutex;
use std::time::Duration;

/// Upper bound on the weight of a single sample; keeps the sums finite
const MAX_WEIGHT: f64 = 1e9;

/// A burst folded into the estimate together with the weight it was given
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimateSample {
    pub burst: Duration,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct EstimateState {
    /// sum(w * x) in microseconds
    weighted_sum: f64,
    /// sum(w)
    total_weight: f64,
    samples: u64,
}

impl EstimateState {
    fn mean(&self) -> f64 {
        if self.total_weight > 0.0 {
            (self.weighted_sum / self.total_weight).max(0.0)
        } else {
            0.0
        }
    }
}

pub(super) struct QuantumEstimator {
    state: Mutex<EstimateState>,
    alpha_rise: f64,
    alpha_fall: f64,
}

impl QuantumEstimator {
    pub fn new(alpha_rise: f64, alpha_fall: f64) -> Self {
        Self {
            state: Mutex::new(EstimateState::default()),
            alpha_rise,
            alpha_fall,
        }
    }

    /// Current estimate, `None` until the first sample
    pub fn estimate(&self) -> Option<Duration> {
        let state = self.state.lock();
        (state.samples > 0).then(|| from_micros(state.mean()))
    }

    pub fn samples(&self) -> u64 {
        self.state.lock().samples
    }

    /// Fold one observed burst into the estimate
    pub fn fold(&self, burst: Duration) -> EstimateSample {
        let x = micros(burst);
        let mut state = self.state.lock();

        let weight = if state.samples == 0 {
            1.0
        } else {
            let (alpha, bias) = if x > state.mean() {
                (self.alpha_rise, 1.0 + self.alpha_rise)
            } else {
                (self.alpha_fall, 1.0 - self.alpha_fall)
            };
            // Weight giving a step of exactly `alpha` towards x
            let floor = state.total_weight * alpha / (1.0 - alpha);
            bias.max(floor).clamp(f64::MIN_POSITIVE, MAX_WEIGHT)
        };

        state.weighted_sum += weight * x;
        state.total_weight += weight;
        state.samples += 1;

        EstimateSample { burst, weight }
    }

    /// Remove a previously folded sample
    pub fn retract(&self, sample: &EstimateSample) -> Option<Duration> {
        let mut state = self.state.lock();

        if state.samples <= 1 {
            *state = EstimateState::default();
            return None;
        }

        state.weighted_sum -= sample.weight * micros(sample.burst);
        state.total_weight -= sample.weight;
        state.samples -= 1;

        if state.total_weight <= 0.0 {
            *state = EstimateState::default();
            return None;
        }

        Some(from_micros(state.mean()))
    }
}

#[inline(always)]
fn micros(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1e6
}

#[inline(always)]
fn from_micros(value: f64) -> Duration {
    Duration::from_secs_f64(value / 1e6)
}

use rand::Rng;

use crate::error::StatsdError;

/// Rejects rates outside of `[0, 1]`, including NaN.
pub fn check_sample_rate(sample_rate: f32) -> Result<(), StatsdError> {
    if (0.0..=1.0).contains(&sample_rate) {
        Ok(())
    } else {
        Err(StatsdError::InvalidSampleRate(sample_rate))
    }
}

pub fn check_count(count: i64) -> Result<(), StatsdError> {
    if count <= 0 {
        return Err(StatsdError::InvalidCount(count));
    }
    Ok(())
}

/// Decides whether a metric sampled at `sample_rate` goes out on the wire.
///
/// A rate of exactly 1 never touches the random source.
pub fn should_fire(sample_rate: f32) -> bool {
    if sample_rate == 1.0 {
        return true;
    }

    rand::rng().random::<f32>() <= sample_rate
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIALS: u32 = 0xff_ffff;

    fn fire_rate(sample_rate: f32) -> f64 {
        let fired = (0..TRIALS).filter(|_| should_fire(sample_rate)).count();
        fired as f64 / f64::from(TRIALS)
    }

    #[test]
    fn test_should_fire_converges() {
        for sample_rate in [0.01f32, 0.05, 0.08, 0.1, 0.5, 0.8] {
            let rate = fire_rate(sample_rate);
            assert!(
                (rate - f64::from(sample_rate)).abs() <= 0.005,
                "sample-{}: got {:.4}",
                sample_rate,
                rate
            );
        }
    }

    #[test]
    fn test_should_fire_always_at_one() {
        assert!((0..100_000).all(|_| should_fire(1.0)));
    }

    #[test]
    fn test_check_sample_rate() {
        assert!(check_sample_rate(0.0).is_ok());
        assert!(check_sample_rate(0.5).is_ok());
        assert!(check_sample_rate(1.0).is_ok());
        assert!(matches!(check_sample_rate(-0.1), Err(StatsdError::InvalidSampleRate(_))));
        assert!(matches!(check_sample_rate(1.1), Err(StatsdError::InvalidSampleRate(_))));
        assert!(matches!(check_sample_rate(f32::NAN), Err(StatsdError::InvalidSampleRate(_))));
    }

    #[test]
    fn test_check_count() {
        assert!(check_count(1).is_ok());
        for count in [0, -1, -100] {
            assert!(matches!(check_count(count), Err(StatsdError::InvalidCount(c)) if c == count));
        }
    }
}

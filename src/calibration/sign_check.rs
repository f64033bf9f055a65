use crate::config::SignCheckConfig;
use crate::types::Vec3;

/// True when any forward-axis velocity drops below the configured threshold,
/// which points to a recorder with an inverted sign convention.
pub fn sign_inversion_is_necessary(velocities: &[Vec3], config: &SignCheckConfig) -> bool {
    velocities
        .iter()
        .any(|v| v[config.forward_axis] < config.threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_exclusive() {
        let config = SignCheckConfig::default();
        let at_threshold = [Vec3::new(-4.0, 0.0, 0.0), Vec3::new(12.0, 0.0, 0.0)];
        assert!(!sign_inversion_is_necessary(&at_threshold, &config));

        let below = [Vec3::new(3.0, 0.0, 0.0), Vec3::new(-4.01, 0.0, 0.0)];
        assert!(sign_inversion_is_necessary(&below, &config));
    }

    #[test]
    fn test_only_forward_axis_counts() {
        let config = SignCheckConfig::default();
        let lateral = [Vec3::new(1.0, -20.0, -9.0)];
        assert!(!sign_inversion_is_necessary(&lateral, &config));

        let y_forward = SignCheckConfig {
            forward_axis: 1,
            ..SignCheckConfig::default()
        };
        assert!(sign_inversion_is_necessary(&lateral, &y_forward));
    }

    #[test]
    fn test_empty_series() {
        assert!(!sign_inversion_is_necessary(&[], &SignCheckConfig::default()));
    }
}

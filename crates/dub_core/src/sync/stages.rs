//! Greedy decomposition of a speed factor into bounded tempo stages.

use super::SyncError;

/// Ordered tempo stages whose product is the requested speed factor.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoPlan {
    pub speed_factor: f64,
    /// Stage multipliers, each within the configured bounds.
    pub stages: Vec<f64>,
}

impl TempoPlan {
    pub fn product(&self) -> f64 {
        self.stages.iter().product()
    }

    /// `atempo` values to apply, one per stage, in order.
    pub fn tempo_values(&self) -> Vec<f64> {
        self.stages.iter().map(|s| 1.0 / s).collect()
    }
}

/// Split `speed_factor` into stage multipliers clamped to `[min, max]`.
///
/// Full-size stages are taken at the bound until the remainder fits, and
/// the remainder becomes the last stage. A factor already inside the
/// bounds is a single stage. Requires `0 < min < 1 < max`.
pub fn decompose_speed_factor(speed_factor: f64, min: f64, max: f64) -> Result<TempoPlan, SyncError> {
    if !(min > 0.0 && min < 1.0 && max > 1.0 && max.is_finite()) {
        return Err(SyncError::InvalidStageBounds { min, max });
    }
    if !(speed_factor.is_finite() && speed_factor > 0.0) {
        return Err(SyncError::InvalidSpeedFactor(speed_factor));
    }

    let mut stages = Vec::new();
    let mut remaining = speed_factor;

    while remaining > max {
        stages.push(max);
        remaining /= max;
    }
    while remaining < min {
        stages.push(min);
        remaining /= min;
    }

    if stages.is_empty() || (remaining - 1.0).abs() > 1e-9 {
        stages.push(remaining);
    }

    Ok(TempoPlan {
        speed_factor,
        stages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: f64 = 0.5;
    const MAX: f64 = 2.0;

    fn assert_valid(plan: &TempoPlan) {
        assert!(!plan.stages.is_empty());
        for stage in &plan.stages {
            assert!(
                (MIN - 1e-12..=MAX + 1e-12).contains(stage),
                "stage {stage} out of bounds"
            );
        }
        let rel = (plan.product() - plan.speed_factor).abs() / plan.speed_factor;
        assert!(rel < 1e-9, "product {} != {}", plan.product(), plan.speed_factor);
    }

    #[test]
    fn in_range_factor_is_single_stage() {
        let plan = decompose_speed_factor(12.0 / 9.6, MIN, MAX).unwrap();
        assert_eq!(plan.stages.len(), 1);
        assert!((plan.stages[0] - 1.25).abs() < 1e-12);
        assert!((plan.tempo_values()[0] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn one_third_splits_into_half_then_two_thirds() {
        let plan = decompose_speed_factor(10.0 / 30.0, MIN, MAX).unwrap();
        assert_eq!(plan.stages.len(), 2);
        assert!((plan.stages[0] - 0.5).abs() < 1e-12);
        assert!((plan.stages[1] - 2.0 / 3.0).abs() < 1e-9);
        assert_valid(&plan);
    }

    #[test]
    fn large_factor_uses_max_stages() {
        let plan = decompose_speed_factor(5.0, MIN, MAX).unwrap();
        assert_eq!(plan.stages, vec![2.0, 2.0, 1.25]);
        assert_valid(&plan);
    }

    #[test]
    fn exact_power_has_no_unit_stage() {
        let plan = decompose_speed_factor(4.0, MIN, MAX).unwrap();
        assert_eq!(plan.stages, vec![2.0, 2.0]);

        let unit = decompose_speed_factor(1.0, MIN, MAX).unwrap();
        assert_eq!(unit.stages, vec![1.0]);
    }

    #[test]
    fn terminates_and_multiplies_back_across_range() {
        let mut factor = 0.01;
        while factor < 100.0 {
            let plan = decompose_speed_factor(factor, MIN, MAX).unwrap();
            assert_valid(&plan);
            factor *= 1.37;
        }
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(matches!(
            decompose_speed_factor(0.0, MIN, MAX),
            Err(SyncError::InvalidSpeedFactor(_))
        ));
        assert!(matches!(
            decompose_speed_factor(f64::NAN, MIN, MAX),
            Err(SyncError::InvalidSpeedFactor(_))
        ));
        assert!(matches!(
            decompose_speed_factor(f64::INFINITY, MIN, MAX),
            Err(SyncError::InvalidSpeedFactor(_))
        ));
        assert!(matches!(
            decompose_speed_factor(2.0, 1.0, 2.0),
            Err(SyncError::InvalidStageBounds { .. })
        ));
    }
}

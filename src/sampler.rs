use rand::Rng;
use rand_distr::{Distribution, Gamma};
use viral_abm_common::SimParams;

use crate::error::{Result, SimError};

/// Draws stage durations from a gamma distribution with shape `n` and scale `mean / n`.
///
/// The mean does not depend on `n`; a larger `n` narrows the spread, which models a
/// stage made of `n` exponential sub-steps.
#[derive(Debug, Clone)]
pub struct DurationSampler {
    shape: f64,
    mean: f64,
    gamma: Gamma<f64>,
}

impl DurationSampler {
    pub fn new(shape: f64, mean: f64) -> Result<Self> {
        if !(shape.is_finite() && shape > 0.0) {
            return Err(SimError::invalid("shape", format!("must be positive and finite, got {}", shape)));
        }
        if !(mean.is_finite() && mean > 0.0) {
            return Err(SimError::invalid("mean", format!("must be positive and finite, got {}", mean)));
        }
        let gamma = Gamma::new(shape, mean / shape)
            .map_err(|e| SimError::invalid("shape", e.to_string()))?;
        Ok(Self { shape, mean, gamma })
    }

    /// One independent draw.
    #[inline]
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.gamma.sample(rng)
    }

    pub fn shape(&self) -> f64 {
        self.shape
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }
}

/// The three duration distributions a simulation draws from.
#[derive(Debug, Clone)]
pub struct StageSamplers {
    pub eclipse: DurationSampler,
    pub infectious: DurationSampler,
    /// Infectious stage after fusion: same shape, mean scaled by 1.5.
    pub fused: DurationSampler,
}

impl StageSamplers {
    pub fn from_params(params: &SimParams) -> Result<Self> {
        let named = |name: &'static str, result: Result<DurationSampler>| {
            result.map_err(|e| match e {
                SimError::InvalidParameter { reason, .. } => SimError::InvalidParameter { name, reason },
                other => other,
            })
        };
        Ok(Self {
            eclipse: named("ne/tau_e", DurationSampler::new(params.ne, params.tau_e))?,
            infectious: named("ni/tau_i", DurationSampler::new(params.ni, params.tau_i))?,
            fused: named("ni/tau_i", DurationSampler::new(params.ni, params.fused_tau_i()))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_mean_and_var(sampler: &DurationSampler, n: usize) -> (f64, f64) {
        let mut rng = StdRng::seed_from_u64(7);
        let draws: Vec<f64> = (0..n).map(|_| sampler.sample(&mut rng)).collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n as f64;
        (mean, var)
    }

    #[test]
    fn test_draws_are_positive() {
        let sampler = DurationSampler::new(1.0, 0.1).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            assert!(sampler.sample(&mut rng) > 0.0);
        }
    }

    #[test]
    fn test_mean_is_independent_of_shape() {
        for shape in [1.0, 30.0, 100.0] {
            let sampler = DurationSampler::new(shape, 6.0).unwrap();
            let (mean, _) = sample_mean_and_var(&sampler, 20_000);
            assert!((mean - 6.0).abs() < 0.2, "shape {} gave mean {}", shape, mean);
        }
    }

    #[test]
    fn test_larger_shape_narrows_spread() {
        // Gamma variance is mean^2 / shape.
        let wide = DurationSampler::new(2.0, 12.0).unwrap();
        let narrow = DurationSampler::new(100.0, 12.0).unwrap();
        let (_, var_wide) = sample_mean_and_var(&wide, 20_000);
        let (_, var_narrow) = sample_mean_and_var(&narrow, 20_000);
        assert!(var_narrow < var_wide);
        assert!((var_narrow - 1.44).abs() < 0.2);
    }

    #[test]
    fn test_rejects_non_positive_parameters() {
        assert!(DurationSampler::new(0.0, 1.0).is_err());
        assert!(DurationSampler::new(1.0, -1.0).is_err());
        assert!(DurationSampler::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_fused_mean_is_scaled() {
        let samplers = StageSamplers::from_params(&SimParams::default()).unwrap();
        assert_eq!(samplers.eclipse.mean(), 6.0);
        assert_eq!(samplers.infectious.mean(), 12.0);
        assert_eq!(samplers.fused.mean(), 18.0);
        assert_eq!(samplers.fused.shape(), 100.0);
    }

    #[test]
    fn test_invalid_params_name_the_stage() {
        let params = SimParams { tau_i: 0.0, ..Default::default() };
        match StageSamplers::from_params(&params) {
            Err(SimError::InvalidParameter { name, .. }) => assert_eq!(name, "ni/tau_i"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}

use anyhow::{ensure, Context as _};
use rand::Rng;
use rand_distr::{Distribution, Poisson};

/// Homogeneous Poisson arrival process over a finite horizon: draw
/// `N ~ Poisson(λT)`, then N uniform times on `[0, T]`, sorted ascending.
#[derive(Debug, Clone, Copy)]
pub struct PoissonArrivals {
    pub lam_per_min: f64,
    pub horizon_min: f64,
}

impl PoissonArrivals {
    pub fn new(lam_per_min: f64, horizon_min: f64) -> Self {
        Self {
            lam_per_min,
            horizon_min,
        }
    }

    pub fn sample_times<R: Rng>(&self, rng: &mut R) -> anyhow::Result<Vec<f64>> {
        ensure!(self.lam_per_min >= 0.0, "arrival rate must be non-negative");
        ensure!(self.horizon_min > 0.0, "arrival horizon must be positive");

        let expected = self.lam_per_min * self.horizon_min;
        if expected == 0.0 {
            return Ok(Vec::new());
        }
        let count = Poisson::new(expected)
            .context("invalid Poisson rate")?
            .sample(rng) as usize;
        let mut times: Vec<f64> = (0..count)
            .map(|_| rng.random::<f64>() * self.horizon_min)
            .collect();
        times.sort_by(f64::total_cmp);
        Ok(times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn same_seed_reproduces_the_stream() {
        let arrivals = PoissonArrivals::new(0.4, 300.0);
        let a = arrivals
            .sample_times(&mut SmallRng::seed_from_u64(123))
            .unwrap();
        let b = arrivals
            .sample_times(&mut SmallRng::seed_from_u64(123))
            .unwrap();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn times_are_sorted_and_in_range() {
        let arrivals = PoissonArrivals::new(0.2, 120.0);
        let times = arrivals
            .sample_times(&mut SmallRng::seed_from_u64(7))
            .unwrap();
        assert!(times.iter().all(|&t| (0.0..=120.0).contains(&t)));
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn zero_rate_gives_no_arrivals() {
        let arrivals = PoissonArrivals::new(0.0, 60.0);
        let times = arrivals
            .sample_times(&mut SmallRng::seed_from_u64(1))
            .unwrap();
        assert!(times.is_empty());
    }

    #[test]
    fn invalid_horizon_is_rejected() {
        let arrivals = PoissonArrivals::new(1.0, 0.0);
        assert!(arrivals
            .sample_times(&mut SmallRng::seed_from_u64(1))
            .is_err());
    }
}

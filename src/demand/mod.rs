use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::model::order::Order;

pub mod arrivals;
pub mod orders;

pub use arrivals::PoissonArrivals;
pub use orders::{Catalog, OrderGenerator, OrderSpec, Popularity, PopularityMode};

/// One-stop order synthesis: Poisson arrivals over the horizon, each order
/// drawn from the catalog under the given popularity mode. A single seeded
/// RNG drives both stages, so equal seeds give equal streams.
pub fn make_orders(
    seed: u64,
    horizon_min: f64,
    lam_per_min: f64,
    popularity: PopularityMode,
    n_skus: usize,
    spec: OrderSpec,
) -> anyhow::Result<Vec<Order>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let catalog = Catalog::new(n_skus);
    let alpha = match popularity {
        PopularityMode::Uniform => 1.0,
        PopularityMode::Concentrated => 1.2,
    };
    let weights = Popularity::make(&catalog, popularity, alpha)?;
    let generator = OrderGenerator::new(&catalog, weights, spec)?;

    let times = PoissonArrivals::new(lam_per_min, horizon_min).sample_times(&mut rng)?;
    times
        .into_iter()
        .map(|t| generator.make_order(&mut rng, t))
        .collect()
}

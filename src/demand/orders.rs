use anyhow::{ensure, Context as _};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::order::Order;
use crate::model::placement::SkuId;

/// Catalog of sequentially numbered SKUs: `S0001`, `S0002`, …
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    pub n_skus: usize,
}

impl Catalog {
    pub fn new(n_skus: usize) -> Self {
        Self { n_skus }
    }

    pub fn ids(&self) -> Vec<SkuId> {
        (1..=self.n_skus)
            .map(|i| SkuId::new(format!("S{i:04}")))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopularityMode {
    #[default]
    Uniform,
    Concentrated,
}

impl std::fmt::Display for PopularityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PopularityMode::Uniform => write!(f, "uniform"),
            PopularityMode::Concentrated => write!(f, "concentrated"),
        }
    }
}

/// Per-SKU selection weights, normalized to sum 1. Concentrated mode uses
/// Zipf(α) over the catalog rank; α ≈ 1.1–1.3 approximates an 80/20 split.
#[derive(Debug, Clone)]
pub struct Popularity {
    weights: Vec<f64>,
}

impl Popularity {
    pub fn make(catalog: &Catalog, mode: PopularityMode, alpha: f64) -> anyhow::Result<Self> {
        ensure!(catalog.n_skus >= 1, "catalog must contain at least one SKU");
        let n = catalog.n_skus;
        let weights = match mode {
            PopularityMode::Uniform => vec![1.0 / n as f64; n],
            PopularityMode::Concentrated => {
                ensure!(alpha > 0.0, "Zipf exponent must be positive");
                let raw: Vec<f64> = (1..=n).map(|rank| 1.0 / (rank as f64).powf(alpha)).collect();
                let total: f64 = raw.iter().sum();
                raw.into_iter().map(|w| w / total).collect()
            }
        };
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

/// Order-shape rules: item count bounds and whether a SKU may repeat within
/// one order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderSpec {
    pub min_items: usize,
    pub max_items: usize,
    pub allow_duplicates: bool,
}

impl OrderSpec {
    pub fn new(min_items: usize, max_items: usize, allow_duplicates: bool) -> Self {
        Self {
            min_items,
            max_items,
            allow_duplicates,
        }
    }
}

impl Default for OrderSpec {
    fn default() -> Self {
        Self {
            min_items: 1,
            max_items: 5,
            allow_duplicates: true,
        }
    }
}

/// Draws orders with popularity-weighted item selection.
#[derive(Debug, Clone)]
pub struct OrderGenerator {
    ids: Vec<SkuId>,
    popularity: Popularity,
    spec: OrderSpec,
}

impl OrderGenerator {
    pub fn new(catalog: &Catalog, popularity: Popularity, spec: OrderSpec) -> anyhow::Result<Self> {
        ensure!(
            1 <= spec.min_items && spec.min_items <= spec.max_items,
            "order size bounds must satisfy 1 <= min <= max"
        );
        ensure!(
            popularity.weights.len() == catalog.n_skus,
            "popularity weights must cover the catalog"
        );
        Ok(Self {
            ids: catalog.ids(),
            popularity,
            spec,
        })
    }

    pub fn make_order<R: Rng>(&self, rng: &mut R, arrival_min: f64) -> anyhow::Result<Order> {
        let size = rng.random_range(self.spec.min_items..=self.spec.max_items);
        let items = if self.spec.allow_duplicates {
            self.sample_with_replacement(rng, size)?
        } else {
            self.sample_without_replacement(rng, size)?
        };
        Ok(Order::new(arrival_min, items))
    }

    fn sample_with_replacement<R: Rng>(
        &self,
        rng: &mut R,
        size: usize,
    ) -> anyhow::Result<Vec<SkuId>> {
        let indexed: Vec<usize> = (0..self.ids.len()).collect();
        let mut items = Vec::with_capacity(size);
        for _ in 0..size {
            let &idx = indexed
                .choose_weighted(rng, |&i| self.popularity.weights[i])
                .context("weighted SKU draw failed")?;
            items.push(self.ids[idx].clone());
        }
        Ok(items)
    }

    fn sample_without_replacement<R: Rng>(
        &self,
        rng: &mut R,
        size: usize,
    ) -> anyhow::Result<Vec<SkuId>> {
        let mut available: Vec<usize> = (0..self.ids.len()).collect();
        let mut items = Vec::with_capacity(size);
        while items.len() < size.min(self.ids.len()) {
            let &idx = available
                .choose_weighted(rng, |&i| self.popularity.weights[i])
                .context("weighted SKU draw failed")?;
            items.push(self.ids[idx].clone());
            available.retain(|&i| i != idx);
        }
        Ok(items)
    }
}

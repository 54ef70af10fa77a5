use std::collections::BTreeSet;
use std::fmt::{self, Debug, Display};

use anyhow::{bail, ensure, Context as _};
use serde::{Deserialize, Serialize};

use crate::define_map;
use crate::model::grid::{Cell, Grid};
use crate::model::Map;

#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SkuId(pub String);

impl SkuId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl Debug for SkuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for SkuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SkuId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

define_map!(SkuId, Cell, SkuCellMap);

/// Immutable SKU→cell assignment. Every cell is traversable, distinct from
/// the station, and holds at most one SKU.
#[derive(Debug, Clone, Default)]
pub struct SkuPlacement {
    cells: SkuCellMap,
}

impl SkuPlacement {
    pub fn new(cells: SkuCellMap, grid: &Grid) -> anyhow::Result<Self> {
        let placement = Self { cells };
        placement.validate(grid)?;
        Ok(placement)
    }

    /// Hotspot assignment: traversable non-station cells sorted by Manhattan
    /// distance to the station (ties by row, then column), popular SKUs first.
    pub fn hotspot(grid: &Grid, popular: &[SkuId], others: &[SkuId]) -> anyhow::Result<Self> {
        let station = grid.station();
        let mut slots: Vec<Cell> = grid.nodes().filter(|&c| c != station).collect();
        slots.sort_by_key(|c| (c.manhattan(station), c.y, c.x));

        let total = popular.len() + others.len();
        ensure!(
            total <= slots.len(),
            "cannot place {total} SKUs on {} eligible cells",
            slots.len()
        );

        let mut cells = SkuCellMap::default();
        for (sku, &cell) in popular.iter().chain(others).zip(slots.iter()) {
            if cells.contains_key(sku) {
                bail!("duplicate SKU id {sku} in placement input");
            }
            cells.insert(sku.clone(), cell);
        }
        Self::new(cells, grid)
    }

    pub fn cell_of(&self, sku: &SkuId) -> anyhow::Result<Cell> {
        self.cells
            .get(sku)
            .copied()
            .with_context(|| format!("SKU {sku} is not present in the placement"))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SkuId, &Cell)> {
        self.cells.iter()
    }

    fn validate(&self, grid: &Grid) -> anyhow::Result<()> {
        let mut used = BTreeSet::new();
        for (sku, &cell) in self.cells.iter() {
            ensure!(
                grid.in_bounds(cell) && grid.passable(cell),
                "SKU {sku} is assigned to non-traversable cell {cell}"
            );
            ensure!(
                cell != grid.station(),
                "SKU {sku} is assigned to the packing station {cell}"
            );
            ensure!(used.insert(cell), "cell {cell} is assigned to two SKUs");
        }
        Ok(())
    }
}

impl FromIterator<(SkuId, Cell)> for SkuCellMap {
    fn from_iter<T: IntoIterator<Item = (SkuId, Cell)>>(iter: T) -> Self {
        iter.into_iter()
            .collect::<crate::model::MapType<_, _>>()
            .into()
    }
}

use std::collections::BTreeSet;
use std::fmt::{self, Display};

use anyhow::ensure;
use serde::{Deserialize, Serialize};

/// Integer coordinate in the warehouse lattice. `x` runs along the width,
/// `y` along the height.
#[derive(
    Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: Cell) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Cell {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Warehouse floor: a `width`×`height` lattice of aisle intersections with a
/// packing station and a set of blocked cells. The station is always
/// traversable.
#[derive(Debug, Clone)]
pub struct Grid {
    width: i32,
    height: i32,
    cell_size_m: f64,
    station: Cell,
    obstacles: BTreeSet<Cell>,
}

impl Grid {
    pub fn new(
        width: i32,
        height: i32,
        cell_size_m: f64,
        station: Cell,
        obstacles: BTreeSet<Cell>,
    ) -> anyhow::Result<Self> {
        ensure!(width > 0 && height > 0, "grid dimensions must be positive");
        ensure!(cell_size_m > 0.0, "cell size must be positive");
        let grid = Self {
            width,
            height,
            cell_size_m,
            station,
            obstacles,
        };
        ensure!(
            grid.in_bounds(station),
            "packing station {station} is outside the {width}x{height} grid"
        );
        ensure!(
            grid.passable(station),
            "packing station {station} sits on an obstacle"
        );
        Ok(grid)
    }

    /// 10×20 layout with the station in the origin corner, 1 m cells.
    pub fn default_layout() -> Self {
        Self {
            width: 10,
            height: 20,
            cell_size_m: 1.0,
            station: Cell::new(0, 0),
            obstacles: BTreeSet::new(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn cell_size_m(&self) -> f64 {
        self.cell_size_m
    }

    pub fn station(&self) -> Cell {
        self.station
    }

    pub fn obstacles(&self) -> &BTreeSet<Cell> {
        &self.obstacles
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        (0..self.width).contains(&cell.x) && (0..self.height).contains(&cell.y)
    }

    pub fn passable(&self, cell: Cell) -> bool {
        !self.obstacles.contains(&cell)
    }

    /// 4-connected neighbors in fixed up, down, left, right order, filtered by
    /// bounds and passability. The enumeration order is part of the BFS
    /// determinism contract.
    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        let Cell { x, y } = cell;
        [
            Cell::new(x, y - 1),
            Cell::new(x, y + 1),
            Cell::new(x - 1, y),
            Cell::new(x + 1, y),
        ]
        .into_iter()
        .filter(|&n| self.in_bounds(n) && self.passable(n))
    }

    /// All traversable cells in row-major order.
    pub fn nodes(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height)
            .flat_map(move |y| (0..self.width).map(move |x| Cell::new(x, y)))
            .filter(|&c| self.passable(c))
    }

    /// Undirected edges between adjacent traversable cells, each reported once.
    pub fn edges(&self) -> impl Iterator<Item = (Cell, Cell)> + '_ {
        self.nodes().flat_map(move |u| {
            self.neighbors(u)
                .filter(move |&v| u < v)
                .map(move |v| (u, v))
        })
    }

    pub fn meters(&self, steps: usize) -> f64 {
        steps as f64 * self.cell_size_m
    }
}

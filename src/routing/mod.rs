use std::collections::VecDeque;

use crate::model::grid::{Cell, Grid};
use crate::model::MapType;

pub mod tours;

/// BFS step count between two cells on the 4-connected lattice. `Some(0)`
/// when `start == goal`; `None` when either endpoint is out of bounds,
/// blocked, or no path exists.
pub fn shortest_path_steps(grid: &Grid, start: Cell, goal: Cell) -> Option<usize> {
    if start == goal {
        if !grid.in_bounds(start) || !grid.passable(start) {
            return None;
        }
        return Some(0);
    }
    if !grid.in_bounds(start) || !grid.in_bounds(goal) {
        return None;
    }
    if !grid.passable(start) || !grid.passable(goal) {
        return None;
    }

    let mut dist: MapType<Cell, usize> = MapType::new();
    dist.insert(start, 0);
    let mut queue = VecDeque::from([start]);
    while let Some(u) = queue.pop_front() {
        let d = dist[&u];
        for v in grid.neighbors(u) {
            if dist.contains_key(&v) {
                continue;
            }
            if v == goal {
                return Some(d + 1);
            }
            dist.insert(v, d + 1);
            queue.push_back(v);
        }
    }
    None
}

/// A resolved multi-stop tour: total BFS steps plus the stop cells in visit
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tour {
    pub steps: usize,
    pub visits: Vec<Cell>,
}

/// Nearest-neighbor tour over `stops` starting at `start`. At each hop the
/// stop with the smallest BFS distance is taken; ties resolve to the earliest
/// remaining stop in enumeration order. `None` when any hop is unreachable.
///
/// The heuristic is a deterministic baseline, not an optimizer: adding a stop
/// never shortens the tour.
pub fn multi_stop_tour(grid: &Grid, start: Cell, stops: &[Cell]) -> Option<Tour> {
    let mut remaining = stops.to_vec();
    let mut current = start;
    let mut steps = 0;
    let mut visits = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let mut best: Option<(usize, usize)> = None;
        for (idx, &stop) in remaining.iter().enumerate() {
            let d = shortest_path_steps(grid, current, stop)?;
            if best.map_or(true, |(best_d, _)| d < best_d) {
                best = Some((d, idx));
            }
        }
        let (d, idx) = best?;
        steps += d;
        current = remaining.remove(idx);
        visits.push(current);
    }
    Some(Tour { steps, visits })
}

/// Cell-exact Manhattan walk from `a` to `b`: strictly along the x-axis
/// first, then the y-axis, both endpoints included. Obstacle-blind; this is
/// a visualization artifact, not a routing result.
pub fn manhattan_path(a: Cell, b: Cell) -> Vec<Cell> {
    let mut path = vec![a];
    let dx = (b.x - a.x).signum();
    let mut x = a.x;
    while x != b.x {
        x += dx;
        path.push(Cell::new(x, a.y));
    }
    let dy = (b.y - a.y).signum();
    let mut y = a.y;
    while y != b.y {
        y += dy;
        path.push(Cell::new(b.x, y));
    }
    path
}

/// Visual path for a whole tour: Manhattan segments concatenated through the
/// visit sequence, junction cells deduplicated, optionally closing back to
/// the station. A tour with no stops collapses to the station cell alone.
pub fn tour_path(station: Cell, visits: &[Cell], return_to_station: bool) -> Vec<Cell> {
    let mut path = vec![station];
    let mut current = station;
    for &stop in visits {
        path.extend(manhattan_path(current, stop).into_iter().skip(1));
        current = stop;
    }
    if return_to_station && current != station {
        path.extend(manhattan_path(current, station).into_iter().skip(1));
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn open_grid() -> Grid {
        Grid::default_layout()
    }

    #[test]
    fn bfs_matches_manhattan_on_open_grid() {
        let grid = open_grid();
        let steps = shortest_path_steps(&grid, Cell::new(0, 0), Cell::new(3, 5));
        assert_eq!(steps, Some(8));
        assert_eq!(
            shortest_path_steps(&grid, Cell::new(2, 2), Cell::new(2, 2)),
            Some(0)
        );
    }

    #[test]
    fn bfs_detects_a_split_grid() {
        // Wall across y = 1 disconnects the bottom row from the rest.
        let wall: BTreeSet<Cell> = (0..10).map(|x| Cell::new(x, 1)).collect();
        let grid = Grid::new(10, 20, 1.0, Cell::new(0, 0), wall).unwrap();
        assert_eq!(
            shortest_path_steps(&grid, Cell::new(0, 0), Cell::new(0, 5)),
            None
        );
        // Still connected along the bottom row itself.
        assert_eq!(
            shortest_path_steps(&grid, Cell::new(0, 0), Cell::new(9, 0)),
            Some(9)
        );
    }

    #[test]
    fn bfs_rejects_bad_endpoints() {
        let grid = Grid::new(5, 5, 1.0, Cell::new(0, 0), [Cell::new(2, 2)].into()).unwrap();
        assert_eq!(
            shortest_path_steps(&grid, Cell::new(0, 0), Cell::new(9, 9)),
            None
        );
        assert_eq!(
            shortest_path_steps(&grid, Cell::new(0, 0), Cell::new(2, 2)),
            None
        );
    }

    #[test]
    fn nn_tour_is_bounded_by_the_fixed_visit_order() {
        let grid = open_grid();
        let stops = [Cell::new(5, 0), Cell::new(5, 2), Cell::new(0, 2)];
        let tour = multi_stop_tour(&grid, Cell::new(0, 0), &stops).unwrap();
        // Visiting in the given order costs 5 + 2 + 5 = 12.
        assert!(tour.steps > 0 && tour.steps <= 12);
        assert_eq!(tour.visits.len(), 3);
    }

    #[test]
    fn nn_ties_resolve_to_the_earliest_stop() {
        let grid = open_grid();
        let stops = [Cell::new(0, 3), Cell::new(3, 0)];
        let tour = multi_stop_tour(&grid, Cell::new(0, 0), &stops).unwrap();
        assert_eq!(tour.visits[0], Cell::new(0, 3));
    }

    #[test]
    fn adding_a_stop_never_shortens_the_tour() {
        let grid = open_grid();
        let base = [Cell::new(2, 4), Cell::new(6, 1)];
        let extended = [Cell::new(2, 4), Cell::new(6, 1), Cell::new(4, 9)];
        let short = multi_stop_tour(&grid, Cell::new(0, 0), &base).unwrap();
        let long = multi_stop_tour(&grid, Cell::new(0, 0), &extended).unwrap();
        assert!(long.steps >= short.steps);
    }

    #[test]
    fn manhattan_path_goes_x_then_y() {
        let path = manhattan_path(Cell::new(0, 0), Cell::new(2, 2));
        assert_eq!(
            path,
            vec![
                Cell::new(0, 0),
                Cell::new(1, 0),
                Cell::new(2, 0),
                Cell::new(2, 1),
                Cell::new(2, 2),
            ]
        );
        assert_eq!(manhattan_path(Cell::new(3, 3), Cell::new(3, 3)).len(), 1);
    }

    #[test]
    fn tour_path_deduplicates_junctions() {
        let station = Cell::new(0, 0);
        let path = tour_path(station, &[Cell::new(3, 5)], true);
        // 8 steps out, 8 steps back: 17 cells, 16 segments.
        assert_eq!(path.len(), 17);
        assert_eq!(path.first(), Some(&station));
        assert_eq!(path.last(), Some(&station));

        let stay = tour_path(station, &[], true);
        assert_eq!(stay, vec![station]);
    }
}

use anyhow::{bail, Context as _};

use crate::model::grid::{Cell, Grid};
use crate::model::order::Order;
use crate::model::placement::SkuPlacement;
use crate::routing::{multi_stop_tour, shortest_path_steps};

/// A planned picking tour: metric totals plus the visit sequence that
/// produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct TourPlan {
    pub steps: usize,
    pub meters: f64,
    pub visits: Vec<Cell>,
}

/// Unique stop cells for a set of orders, in sorted-SKU first-occurrence
/// order. This enumeration order is the tie-break for nearest-neighbor
/// routing, so it must be stable.
fn stop_cells(placement: &SkuPlacement, orders: &[&Order]) -> anyhow::Result<Vec<Cell>> {
    let mut stops = Vec::new();
    for order in orders {
        for sku in order.unique_skus() {
            let cell = placement.cell_of(sku)?;
            if !stops.contains(&cell) {
                stops.push(cell);
            }
        }
    }
    Ok(stops)
}

fn plan(grid: &Grid, stops: Vec<Cell>, return_to_station: bool) -> anyhow::Result<TourPlan> {
    let station = grid.station();
    let Some(tour) = multi_stop_tour(grid, station, &stops) else {
        bail!("no route from station {station} through stops {stops:?}");
    };
    let mut steps = tour.steps;
    if return_to_station {
        if let Some(&last) = tour.visits.last() {
            steps += shortest_path_steps(grid, last, station)
                .with_context(|| format!("no route back to station {station} from {last}"))?;
        }
    }
    Ok(TourPlan {
        steps,
        meters: grid.meters(steps),
        visits: tour.visits,
    })
}

/// Tour over the unique SKU locations of one order, starting at the station.
pub fn order_tour(
    grid: &Grid,
    placement: &SkuPlacement,
    order: &Order,
    return_to_station: bool,
) -> anyhow::Result<TourPlan> {
    let stops = stop_cells(placement, &[order])?;
    plan(grid, stops, return_to_station)
}

/// Tour over the union of unique SKU locations across a batch of orders.
pub fn batch_tour(
    grid: &Grid,
    placement: &SkuPlacement,
    orders: &[Order],
    return_to_station: bool,
) -> anyhow::Result<TourPlan> {
    let refs: Vec<&Order> = orders.iter().collect();
    let stops = stop_cells(placement, &refs)?;
    plan(grid, stops, return_to_station)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::placement::{SkuCellMap, SkuId};

    fn placement_with(grid: &Grid, cells: &[(&str, (i32, i32))]) -> SkuPlacement {
        let map: SkuCellMap = cells
            .iter()
            .map(|&(id, c)| (SkuId::from(id), Cell::from(c)))
            .collect();
        SkuPlacement::new(map, grid).unwrap()
    }

    #[test]
    fn empty_order_stays_at_the_station() {
        let grid = Grid::default_layout();
        let placement = placement_with(&grid, &[("A", (1, 1))]);
        let order = Order::new(0.0, vec![]);
        let tour = order_tour(&grid, &placement, &order, true).unwrap();
        assert_eq!(tour.steps, 0);
        assert_eq!(tour.meters, 0.0);
        assert!(tour.visits.is_empty());
    }

    #[test]
    fn return_to_station_adds_distance() {
        let grid = Grid::default_layout();
        let placement = placement_with(&grid, &[("A", (0, 5))]);
        let order = Order::new(0.0, vec![SkuId::from("A")]);
        let one_way = order_tour(&grid, &placement, &order, false).unwrap();
        let round = order_tour(&grid, &placement, &order, true).unwrap();
        assert_eq!(one_way.steps, 5);
        assert_eq!(round.steps, 10);
        assert!(round.steps > one_way.steps);
    }

    #[test]
    fn batch_tour_is_not_worse_than_separate_round_trips() {
        let grid = Grid::default_layout();
        let placement = placement_with(
            &grid,
            &[("A", (5, 0)), ("B", (5, 2)), ("C", (0, 2)), ("D", (0, 5))],
        );
        let orders = vec![
            Order::new(0.0, vec![SkuId::from("A"), SkuId::from("B")]),
            Order::new(1.0, vec![SkuId::from("C")]),
            Order::new(2.0, vec![SkuId::from("D")]),
        ];

        let separate: usize = orders
            .iter()
            .map(|o| order_tour(&grid, &placement, o, true).unwrap().steps)
            .sum();
        let combined = batch_tour(&grid, &placement, &orders, true).unwrap();
        assert!(combined.steps <= separate);
    }

    #[test]
    fn duplicate_skus_route_once() {
        let grid = Grid::default_layout();
        let placement = placement_with(&grid, &[("A", (2, 2))]);
        let single = Order::new(0.0, vec![SkuId::from("A")]);
        let double = Order::new(0.0, vec![SkuId::from("A"), SkuId::from("A")]);
        let a = order_tour(&grid, &placement, &single, true).unwrap();
        let b = order_tour(&grid, &placement, &double, true).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unreachable_stop_is_a_routing_error() {
        let wall: std::collections::BTreeSet<Cell> = (0..10).map(|x| Cell::new(x, 1)).collect();
        let grid = Grid::new(10, 20, 1.0, Cell::new(0, 0), wall).unwrap();
        let map: SkuCellMap = [(SkuId::from("A"), Cell::new(0, 5))].into_iter().collect();
        let placement = SkuPlacement::new(map, &grid).unwrap();
        let order = Order::new(0.0, vec![SkuId::from("A")]);
        assert!(order_tour(&grid, &placement, &order, true).is_err());
    }

    #[test]
    fn missing_sku_is_a_placement_error() {
        let grid = Grid::default_layout();
        let placement = placement_with(&grid, &[("A", (1, 1))]);
        let order = Order::new(0.0, vec![SkuId::from("ZZ")]);
        assert!(order_tour(&grid, &placement, &order, true).is_err());
    }
}

//! A* search over the terrain grid.
//!
//! 8-connected: cardinal steps cost 1, diagonal steps cost √2, and a diagonal is
//! only allowed when both orthogonal tiles it passes between are walkable. The
//! heuristic is the octile distance, which is admissible and consistent for this
//! cost structure. The open set is a plain vector scanned linearly for the lowest
//! f-score; the first minimum found wins, which keeps results deterministic.

use crate::components::Waypoint;
use crate::terrain::{TerrainGrid, TileCoord};
use std::f32::consts::SQRT_2;

/// How far (in tiles) a blocked start or goal may be moved to a walkable tile.
pub const ENDPOINT_SNAP_RADIUS: i32 = 8;

/// Cardinal moves first, then diagonals.
const NEIGHBORS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Octile distance with unit cardinal cost.
pub fn octile_distance(a: TileCoord, b: TileCoord) -> f32 {
    const D: f32 = 1.0;
    let dx = (a.x - b.x).abs() as f32;
    let dy = (a.y - b.y).abs() as f32;
    D * (dx + dy) + (SQRT_2 - 2.0 * D) * dx.min(dy)
}

/// Cost of a single 8-connected step.
pub fn step_cost(from: TileCoord, to: TileCoord) -> f32 {
    if from.x != to.x && from.y != to.y {
        SQRT_2
    } else {
        1.0
    }
}

/// Path planner borrowing an immutable grid.
#[derive(Debug, Clone, Copy)]
pub struct Pathfinder<'g> {
    grid: &'g TerrainGrid,
}

impl<'g> Pathfinder<'g> {
    pub fn new(grid: &'g TerrainGrid) -> Self {
        Self { grid }
    }

    /// Tile path from `start` to `goal`, both inclusive.
    ///
    /// Non-walkable endpoints are first snapped to the nearest walkable tile within
    /// [`ENDPOINT_SNAP_RADIUS`]; returns `None` when snapping fails or the goal is
    /// unreachable.
    pub fn find_path(&self, start: TileCoord, goal: TileCoord) -> Option<Vec<TileCoord>> {
        let grid = self.grid;
        let goal = grid.find_nearest_walkable(goal, ENDPOINT_SNAP_RADIUS)?;
        let start = grid.find_nearest_walkable(start, ENDPOINT_SNAP_RADIUS)?;

        let start_index = grid.index(start)?;
        let goal_index = grid.index(goal)?;

        let total = grid.tiles().len();
        let mut g_score = vec![f32::INFINITY; total];
        let mut f_score = vec![f32::INFINITY; total];
        let mut came_from: Vec<Option<usize>> = vec![None; total];
        let mut in_open = vec![false; total];
        let mut closed = vec![false; total];
        let mut open: Vec<usize> = Vec::new();

        g_score[start_index] = 0.0;
        f_score[start_index] = octile_distance(start, goal);
        open.push(start_index);
        in_open[start_index] = true;

        while !open.is_empty() {
            let current = pop_best(&mut open, &f_score);
            in_open[current] = false;

            if current == goal_index {
                return Some(reconstruct(grid, &came_from, current));
            }
            closed[current] = true;

            let current_tile = grid.coord(current);
            for (dx, dy) in NEIGHBORS {
                let next = current_tile.offset(dx, dy);
                if !grid.is_walkable_tile(next) {
                    continue;
                }
                if dx != 0
                    && dy != 0
                    && (!grid.is_walkable_tile(current_tile.offset(dx, 0))
                        || !grid.is_walkable_tile(current_tile.offset(0, dy)))
                {
                    continue;
                }
                let Some(next_index) = grid.index(next) else {
                    continue;
                };
                if closed[next_index] {
                    continue;
                }

                let tentative = g_score[current] + step_cost(current_tile, next);
                if !in_open[next_index] || tentative < g_score[next_index] {
                    came_from[next_index] = Some(current);
                    g_score[next_index] = tentative;
                    f_score[next_index] = tentative + octile_distance(next, goal);
                    if !in_open[next_index] {
                        open.push(next_index);
                        in_open[next_index] = true;
                    }
                }
            }
        }

        None
    }

    /// Path between two world positions as tile-centre waypoints.
    pub fn find_world_path(&self, from: (f32, f32), to: (f32, f32)) -> Option<Vec<Waypoint>> {
        let start = self.grid.world_to_tile(from.0, from.1);
        let goal = self.grid.world_to_tile(to.0, to.1);
        let tiles = self.find_path(start, goal)?;
        if tiles.is_empty() {
            return None;
        }
        Some(
            tiles
                .into_iter()
                .map(|tile| {
                    let (x, y) = self.grid.tile_center(tile);
                    Waypoint::new(x, y)
                })
                .collect(),
        )
    }
}

/// Remove and return the open entry with the lowest f-score (first on ties).
fn pop_best(open: &mut Vec<usize>, f_score: &[f32]) -> usize {
    let mut best_i = 0;
    let mut best = f_score[open[0]];
    for (i, &index) in open.iter().enumerate().skip(1) {
        let f = f_score[index];
        if f < best {
            best = f;
            best_i = i;
        }
    }
    open.remove(best_i)
}

fn reconstruct(grid: &TerrainGrid, came_from: &[Option<usize>], goal: usize) -> Vec<TileCoord> {
    let mut tiles = Vec::new();
    let mut cursor = Some(goal);
    while let Some(index) = cursor {
        tiles.push(grid.coord(index));
        cursor = came_from[index];
    }
    tiles.reverse();
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::TileKind;
    use std::collections::VecDeque;

    fn grid_from_rows(rows: &[&str]) -> TerrainGrid {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        TerrainGrid::from_fn(width, height, 32.0, |t| {
            match rows[t.y as usize].as_bytes()[t.x as usize] {
                b'~' => TileKind::Water,
                _ => TileKind::Grass,
            }
        })
    }

    /// Every step is 8-connected, lands on walkable terrain and never cuts a
    /// corner past a blocked orthogonal tile.
    fn assert_valid_path(grid: &TerrainGrid, path: &[TileCoord]) {
        for tile in path {
            assert!(grid.is_walkable_tile(*tile), "{tile:?} is not walkable");
        }
        for pair in path.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let (dx, dy) = (b.x - a.x, b.y - a.y);
            assert!(dx.abs() <= 1 && dy.abs() <= 1 && (dx, dy) != (0, 0), "{a:?} -> {b:?}");
            if dx != 0 && dy != 0 {
                assert!(grid.is_walkable_tile(a.offset(dx, 0)), "corner cut at {a:?} -> {b:?}");
                assert!(grid.is_walkable_tile(a.offset(0, dy)), "corner cut at {a:?} -> {b:?}");
            }
        }
    }

    fn path_cost(path: &[TileCoord]) -> f32 {
        path.windows(2).map(|p| step_cost(p[0], p[1])).sum()
    }

    /// Reachability by flood fill under the same movement rules.
    fn reachable(grid: &TerrainGrid, start: TileCoord, goal: TileCoord) -> bool {
        let mut seen = vec![false; grid.tiles().len()];
        let mut queue = VecDeque::from([start]);
        seen[grid.index(start).unwrap()] = true;
        while let Some(tile) = queue.pop_front() {
            if tile == goal {
                return true;
            }
            for (dx, dy) in NEIGHBORS {
                let next = tile.offset(dx, dy);
                if !grid.is_walkable_tile(next) {
                    continue;
                }
                if dx != 0
                    && dy != 0
                    && (!grid.is_walkable_tile(tile.offset(dx, 0))
                        || !grid.is_walkable_tile(tile.offset(0, dy)))
                {
                    continue;
                }
                let index = grid.index(next).unwrap();
                if !seen[index] {
                    seen[index] = true;
                    queue.push_back(next);
                }
            }
        }
        false
    }

    #[test]
    fn test_octile_distance() {
        let o = TileCoord::new(0, 0);
        assert_eq!(octile_distance(o, TileCoord::new(4, 0)), 4.0);
        assert!((octile_distance(o, TileCoord::new(3, 3)) - 3.0 * SQRT_2).abs() < 1e-5);
        assert!((octile_distance(o, TileCoord::new(5, 2)) - (3.0 + 2.0 * SQRT_2)).abs() < 1e-5);
    }

    #[test]
    fn test_same_tile_path() {
        let grid = TerrainGrid::filled(4, 4, 32.0, TileKind::Grass);
        let tile = TileCoord::new(1, 2);
        assert_eq!(Pathfinder::new(&grid).find_path(tile, tile), Some(vec![tile]));
    }

    #[test]
    fn test_open_diagonal_path() {
        let grid = TerrainGrid::filled(8, 8, 32.0, TileKind::Grass);
        let path = Pathfinder::new(&grid)
            .find_path(TileCoord::new(0, 0), TileCoord::new(3, 3))
            .unwrap();
        assert_eq!(
            path,
            vec![
                TileCoord::new(0, 0),
                TileCoord::new(1, 1),
                TileCoord::new(2, 2),
                TileCoord::new(3, 3)
            ]
        );
    }

    #[test]
    fn test_no_corner_cutting() {
        let grid = grid_from_rows(&[
            ".~.", //
            "...", //
            "...",
        ]);
        let path = Pathfinder::new(&grid)
            .find_path(TileCoord::new(0, 0), TileCoord::new(2, 0))
            .unwrap();
        assert_valid_path(&grid, &path);
        // Must dip into row 1 and come back up without clipping the water tile.
        assert_eq!(path.first(), Some(&TileCoord::new(0, 0)));
        assert_eq!(path.last(), Some(&TileCoord::new(2, 0)));
        assert!(path.len() >= 4);
    }

    #[test]
    fn test_diagonal_gap_is_closed() {
        // The only link between the two halves is a diagonal gap.
        let grid = grid_from_rows(&[
            "..~..", //
            "..~..", //
            "~~.~~", //
            "..~..", //
            "..~..",
        ]);
        let pathfinder = Pathfinder::new(&grid);
        assert!(pathfinder
            .find_path(TileCoord::new(0, 0), TileCoord::new(4, 4))
            .is_none());
        assert!(pathfinder
            .find_path(TileCoord::new(0, 0), TileCoord::new(2, 2))
            .is_none());
    }

    #[test]
    fn test_enclosed_goal_returns_none() {
        let grid = grid_from_rows(&[
            ".......", //
            ".~~~~~.", //
            ".~...~.", //
            ".~...~.", //
            ".~...~.", //
            ".~~~~~.", //
            ".......",
        ]);
        assert!(Pathfinder::new(&grid)
            .find_path(TileCoord::new(0, 0), TileCoord::new(3, 3))
            .is_none());
    }

    #[test]
    fn test_water_goal_is_snapped() {
        let grid = grid_from_rows(&[
            ".....", //
            "..~..", //
            ".....",
        ]);
        let path = Pathfinder::new(&grid)
            .find_path(TileCoord::new(0, 1), TileCoord::new(2, 1))
            .unwrap();
        assert_valid_path(&grid, &path);
        // Ring 1 around (2,1) starts at (1,0).
        assert_eq!(path.last(), Some(&TileCoord::new(1, 0)));
    }

    #[test]
    fn test_water_start_is_snapped() {
        let grid = grid_from_rows(&[
            "~~.", //
            "~~.", //
            "...",
        ]);
        let path = Pathfinder::new(&grid)
            .find_path(TileCoord::new(0, 0), TileCoord::new(2, 2))
            .unwrap();
        // Ring 1 around (0,0) is all water or off-grid; ring 2 reaches (2,0).
        assert_eq!(path[0], TileCoord::new(2, 0));
        assert_valid_path(&grid, &path);
    }

    #[test]
    fn test_unsnappable_endpoint_fails() {
        let grid = TerrainGrid::from_fn(40, 3, 32.0, |t| {
            if t.x < 30 {
                TileKind::Water
            } else {
                TileKind::Grass
            }
        });
        let pathfinder = Pathfinder::new(&grid);
        // Nearest land is 20+ tiles away, beyond the snap radius.
        assert!(pathfinder
            .find_path(TileCoord::new(5, 1), TileCoord::new(35, 1))
            .is_none());
        assert!(pathfinder
            .find_path(TileCoord::new(35, 1), TileCoord::new(5, 1))
            .is_none());
    }

    #[test]
    fn test_all_water_fails() {
        let grid = TerrainGrid::filled(10, 10, 32.0, TileKind::Water);
        assert!(Pathfinder::new(&grid)
            .find_path(TileCoord::new(0, 0), TileCoord::new(9, 9))
            .is_none());
    }

    #[test]
    fn test_routes_around_water_lake() {
        // 128x128 map of tile size 32: a lake covers (10,10) and a wall hangs off
        // it; the unit starts west of the lake.
        let grid = TerrainGrid::from_fn(128, 128, 32.0, |t| {
            let lake = (t.x - 10).abs() <= 2 && (t.y - 10).abs() <= 2;
            let wall = t.x == 12 && (0..=20).contains(&t.y);
            let gap_blockers = (t.x, t.y) == (13, 21) || (t.x, t.y) == (11, 21);
            if lake || wall || gap_blockers {
                TileKind::Water
            } else {
                TileKind::Grass
            }
        });
        let start = TileCoord::new(3, 10);
        let goal = TileCoord::new(10, 10);
        let path = Pathfinder::new(&grid).find_path(start, goal).unwrap();
        assert_eq!(path[0], start);
        assert!(grid.is_walkable_tile(*path.last().unwrap()));
        assert_ne!(*path.last().unwrap(), goal);
        assert_valid_path(&grid, &path);

        // Cross the wall: (12,21) is open but both diagonals around it are flanked.
        let across = Pathfinder::new(&grid)
            .find_path(start, TileCoord::new(20, 5))
            .unwrap();
        assert_valid_path(&grid, &across);
        assert!(across.contains(&TileCoord::new(12, 21)) || across.iter().any(|t| t.y > 21));
    }

    #[test]
    fn test_world_path_uses_tile_centers() {
        let grid = TerrainGrid::filled(8, 8, 32.0, TileKind::Grass);
        let path = Pathfinder::new(&grid)
            .find_world_path((5.0, 5.0), (100.0, 5.0))
            .unwrap();
        assert_eq!(path.first(), Some(&Waypoint::new(16.0, 16.0)));
        assert_eq!(path.last(), Some(&Waypoint::new(112.0, 16.0)));
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn test_world_path_to_far_off_point_fails() {
        let grid = TerrainGrid::filled(16, 16, 32.0, TileKind::Grass);
        let pathfinder = Pathfinder::new(&grid);
        assert_eq!(pathfinder.find_world_path((40.0, 40.0), (1.0e12, 1.0e12)), None);
        assert_eq!(pathfinder.find_world_path((40.0, 40.0), (-1.0e12, 50.0)), None);
        assert_eq!(pathfinder.find_world_path((-1.0e12, 40.0), (50.0, 50.0)), None);
    }

    #[test]
    fn test_paths_on_generated_terrain() {
        let grid = TerrainGrid::generate(48, 48, 32.0, 12345, 0.12, 0.5);
        let pathfinder = Pathfinder::new(&grid);
        let walkable: Vec<TileCoord> = grid.walkable_tiles().collect();
        let stride = walkable.len() / 17;

        for i in 0..17 {
            let start = walkable[i * stride];
            let goal = walkable[(walkable.len() - 1) - i * stride / 2];
            let result = pathfinder.find_path(start, goal);
            assert_eq!(result.is_some(), reachable(&grid, start, goal), "{start:?} -> {goal:?}");
            if let Some(path) = result {
                assert_eq!(path.first(), Some(&start));
                assert_eq!(path.last(), Some(&goal));
                assert_valid_path(&grid, &path);
                // Consistent heuristic: the path is no longer than a shortest one
                // allows, and never shorter than the heuristic bound.
                assert!(path_cost(&path) + 1e-3 >= octile_distance(start, goal));
            }
        }
    }

    #[test]
    fn test_path_is_optimal_on_detour() {
        let grid = grid_from_rows(&[
            "......", //
            ".~~~~.", //
            "......",
        ]);
        let path = Pathfinder::new(&grid)
            .find_path(TileCoord::new(2, 0), TileCoord::new(2, 2))
            .unwrap();
        assert_valid_path(&grid, &path);
        // Both diagonals around the west end of the wall clip water, so the best
        // route is six cardinal steps through column 0.
        let cost = path_cost(&path);
        assert!((cost - 6.0).abs() < 1e-4, "cost {cost}");
        assert!(path.contains(&TileCoord::new(0, 1)));
    }

    #[test]
    fn test_deterministic() {
        let grid = TerrainGrid::generate(64, 64, 32.0, 4242, 0.12, 0.5);
        let pathfinder = Pathfinder::new(&grid);
        let a = pathfinder.find_world_path((40.0, 40.0), (1900.0, 1800.0));
        let b = pathfinder.find_world_path((40.0, 40.0), (1900.0, 1800.0));
        assert_eq!(a, b);
    }
}

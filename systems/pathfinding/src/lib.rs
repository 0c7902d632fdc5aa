#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Breadth-first route search over the arena's tile grid.

use std::collections::VecDeque;

use ctf_core::{Direction, GridCell, GridModel, Route, TilePosition};

/// Policy deciding which tiles a search may expand into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassabilityFilter<'a> {
    /// Open ground and breakable obstacles.
    Normal,
    /// Every tile within bounds, including unbreakable obstacles.
    Permissive,
    /// As [`PassabilityFilter::Normal`], additionally rejecting every tile of
    /// the reference route except its final tile.
    ExcludePrevious(&'a Route),
}

impl PassabilityFilter<'_> {
    /// Reports whether the cell content is passable under this filter.
    #[must_use]
    pub fn admits_cell(&self, cell: GridCell) -> bool {
        match self {
            Self::Normal | Self::ExcludePrevious(_) => {
                matches!(cell, GridCell::Open | GridCell::Breakable)
            }
            Self::Permissive => true,
        }
    }

    /// Short label used when reporting which filter produced a route.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Permissive => "permissive",
            Self::ExcludePrevious(_) => "exclude-previous",
        }
    }
}

/// Shortest-route finder that reuses its scratch buffers between searches.
#[derive(Debug, Default)]
pub struct PathFinder {
    visited: Vec<bool>,
    parents: Vec<Option<TilePosition>>,
    excluded: Vec<bool>,
    queue: VecDeque<TilePosition>,
}

impl PathFinder {
    /// Creates a path finder with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds a shortest route from `start` to `goal` under `filter`.
    ///
    /// The returned route begins with `start` and ends with `goal`. The start
    /// tile is where the searcher already stands, so it is accepted without
    /// consulting the filter; every other tile satisfies it. An empty route is
    /// returned when either endpoint lies outside the grid or the goal cannot
    /// be reached.
    pub fn find_path<G>(
        &mut self,
        grid: &G,
        start: TilePosition,
        goal: TilePosition,
        filter: PassabilityFilter<'_>,
    ) -> Route
    where
        G: GridModel + ?Sized,
    {
        let width = grid.width();
        let height = grid.height();
        if !grid.contains(start) || !grid.contains(goal) {
            return Route::empty();
        }

        let Some(cell_count) = cell_count(width, height) else {
            return Route::empty();
        };
        self.prepare(cell_count, width, filter);

        let Some(start_index) = index(width, start) else {
            return Route::empty();
        };
        self.visited[start_index] = true;
        self.queue.push_back(start);

        while let Some(tile) = self.queue.pop_front() {
            if tile == goal {
                let route = self.reconstruct(width, start, goal, cell_count);
                tracing::trace!(
                    filter = filter.label(),
                    hops = route.hops(),
                    "route found"
                );
                return route;
            }

            for direction in Direction::SEARCH_ORDER {
                let Some(neighbor) = tile.step(direction, width, height) else {
                    continue;
                };
                let Some(neighbor_index) = index(width, neighbor) else {
                    continue;
                };
                if self.visited[neighbor_index] {
                    continue;
                }
                if self.excluded[neighbor_index] || !filter.admits_cell(grid.content(neighbor)) {
                    continue;
                }

                self.visited[neighbor_index] = true;
                self.parents[neighbor_index] = Some(tile);
                self.queue.push_back(neighbor);
            }
        }

        tracing::trace!(filter = filter.label(), "no route");
        Route::empty()
    }

    /// Searches under `primary` and retries permissively when that fails.
    pub fn find_with_fallback<G>(
        &mut self,
        grid: &G,
        start: TilePosition,
        goal: TilePosition,
        primary: PassabilityFilter<'_>,
    ) -> Route
    where
        G: GridModel + ?Sized,
    {
        let route = self.find_path(grid, start, goal, primary);
        if !route.is_empty() || primary == PassabilityFilter::Permissive {
            return route;
        }

        self.find_path(grid, start, goal, PassabilityFilter::Permissive)
    }

    fn prepare(&mut self, cell_count: usize, width: u32, filter: PassabilityFilter<'_>) {
        self.visited.clear();
        self.visited.resize(cell_count, false);
        self.parents.clear();
        self.parents.resize(cell_count, None);
        self.excluded.clear();
        self.excluded.resize(cell_count, false);
        self.queue.clear();

        if let PassabilityFilter::ExcludePrevious(reference) = filter {
            let tiles = reference.tiles();
            let kept_goal = tiles.len().saturating_sub(1);
            for tile in &tiles[..kept_goal] {
                if let Some(slot) = index(width, *tile).and_then(|i| self.excluded.get_mut(i)) {
                    *slot = true;
                }
            }
        }
    }

    fn reconstruct(
        &self,
        width: u32,
        start: TilePosition,
        goal: TilePosition,
        cell_count: usize,
    ) -> Route {
        let mut tiles = vec![goal];
        let mut current = goal;

        while current != start && tiles.len() <= cell_count {
            let Some(parent) = index(width, current).and_then(|i| self.parents[i]) else {
                return Route::empty();
            };
            tiles.push(parent);
            current = parent;
        }

        tiles.reverse();
        Route::from_tiles(tiles)
    }
}

fn cell_count(width: u32, height: u32) -> Option<usize> {
    let width = usize::try_from(width).ok()?;
    let height = usize::try_from(height).ok()?;
    width.checked_mul(height)
}

fn index(width: u32, tile: TilePosition) -> Option<usize> {
    let width = usize::try_from(width).ok()?;
    let x = usize::try_from(tile.x()).ok()?;
    let y = usize::try_from(tile.y()).ok()?;
    y.checked_mul(width)?.checked_add(x)
}

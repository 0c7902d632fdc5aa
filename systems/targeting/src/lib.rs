#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that resolves the tile an agent should currently head for.

use ctf_core::{AgentState, GameView, GridModel, Route, TilePosition};
use ctf_system_pathfinding::{PassabilityFilter, PathFinder};

/// Reason a tile was chosen as the agent's objective.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Objective {
    /// The agent carries the flag and returns it to its base.
    HomeBase,
    /// The agent converges on a route broadcast by the flag carrier.
    TeammateTrail,
    /// The agent heads for the flag itself.
    Flag,
}

/// Objective tile selected for an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Target {
    /// Tile the agent should plan toward.
    pub tile: TilePosition,
    /// Policy branch that produced the tile.
    pub objective: Objective,
}

/// Target selection policy shared by every agent.
#[derive(Debug, Default)]
pub struct TargetSelector;

impl TargetSelector {
    /// Creates a new target selector.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Resolves the current objective for the agent.
    ///
    /// Carrying the flag takes precedence over a teammate trail, which in turn
    /// takes precedence over the flag's own location. The flag handle is looked
    /// up once and cached in `state`; its tile is read fresh on every call.
    /// Returns `None` when the game state offers no objective.
    pub fn resolve<A>(
        &self,
        state: &mut AgentState,
        arena: &A,
        finder: &mut PathFinder,
    ) -> Option<Target>
    where
        A: GridModel + GameView + ?Sized,
    {
        if state.carrying_flag {
            return arena.home_tile(state.tank).map(|tile| Target {
                tile,
                objective: Objective::HomeBase,
            });
        }

        if let Some(trail) = state.target_route.as_ref().filter(|route| !route.is_empty()) {
            return follow_trail(state.tile, trail, arena, finder).map(|tile| Target {
                tile,
                objective: Objective::TeammateTrail,
            });
        }

        let flag = match state.flag {
            Some(flag) => flag,
            None => {
                let flag = arena.find_flag()?;
                state.flag = Some(flag);
                flag
            }
        };

        arena.flag_tile(flag).map(|tile| Target {
            tile,
            objective: Objective::Flag,
        })
    }
}

/// Picks the trail tile with the shortest permissive route from `origin`.
///
/// Standing on the trail already converges onto its first tile. An empty
/// route ranks as the shortest candidate and also falls back to the first
/// tile.
fn follow_trail<A>(
    origin: TilePosition,
    trail: &Route,
    arena: &A,
    finder: &mut PathFinder,
) -> Option<TilePosition>
where
    A: GridModel + ?Sized,
{
    if trail.contains(origin) {
        return trail.first();
    }

    let mut closest: Option<Route> = None;
    for tile in trail.iter() {
        let candidate = finder.find_path(arena, origin, tile, PassabilityFilter::Permissive);
        match &closest {
            Some(best) if best.len() <= candidate.len() => {}
            _ => closest = Some(candidate),
        }
    }

    match closest {
        Some(best) if !best.is_empty() => best.last(),
        _ => {
            tracing::debug!(?origin, "no route onto teammate trail, using its first tile");
            trail.first()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctf_core::{FlagId, GridCell, TankId};
    use std::cell::Cell;

    struct Arena {
        width: u32,
        height: u32,
        flag: Option<TilePosition>,
        home: TilePosition,
        flag_lookups: Cell<u32>,
    }

    impl Arena {
        fn open(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                flag: Some(TilePosition::new(width - 1, height - 1)),
                home: TilePosition::new(0, 0),
                flag_lookups: Cell::new(0),
            }
        }
    }

    impl GridModel for Arena {
        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }

        fn content(&self, _tile: TilePosition) -> GridCell {
            GridCell::Open
        }
    }

    impl GameView for Arena {
        fn find_flag(&self) -> Option<FlagId> {
            self.flag_lookups.set(self.flag_lookups.get() + 1);
            self.flag.map(|_| FlagId::new(1))
        }

        fn flag_tile(&self, _flag: FlagId) -> Option<TilePosition> {
            self.flag
        }

        fn flag_carrier(&self, _flag: FlagId) -> Option<TankId> {
            None
        }

        fn home_tile(&self, _tank: TankId) -> Option<TilePosition> {
            Some(self.home)
        }
    }

    fn state_at(x: u32, y: u32) -> AgentState {
        AgentState::spawn(TankId::new(1), TilePosition::new(x, y), 50)
    }

    fn trail(tiles: &[(u32, u32)]) -> Route {
        tiles
            .iter()
            .map(|&(x, y)| TilePosition::new(x, y))
            .collect()
    }

    #[test]
    fn carrier_heads_home() {
        let arena = Arena::open(5, 5);
        let mut state = state_at(3, 3);
        state.carrying_flag = true;
        state.set_target_route(trail(&[(1, 1)]));

        let target = TargetSelector::new()
            .resolve(&mut state, &arena, &mut PathFinder::new())
            .expect("target");

        assert_eq!(target.objective, Objective::HomeBase);
        assert_eq!(target.tile, TilePosition::new(0, 0));
    }

    #[test]
    fn flag_handle_is_cached_but_position_is_fresh() {
        let mut arena = Arena::open(5, 5);
        let mut state = state_at(0, 0);
        let selector = TargetSelector::new();
        let mut finder = PathFinder::new();

        let first = selector
            .resolve(&mut state, &arena, &mut finder)
            .expect("target");
        assert_eq!(first.tile, TilePosition::new(4, 4));

        arena.flag = Some(TilePosition::new(2, 3));
        let second = selector
            .resolve(&mut state, &arena, &mut finder)
            .expect("target");

        assert_eq!(second.objective, Objective::Flag);
        assert_eq!(second.tile, TilePosition::new(2, 3));
        assert_eq!(arena.flag_lookups.get(), 1);
        assert_eq!(state.flag, Some(FlagId::new(1)));
    }

    #[test]
    fn trail_endpoint_closest_to_agent_is_chosen() {
        let arena = Arena::open(8, 8);
        let mut state = state_at(0, 4);
        state.set_target_route(trail(&[(6, 6), (5, 6), (4, 6), (3, 6), (2, 6)]));

        let target = TargetSelector::new()
            .resolve(&mut state, &arena, &mut PathFinder::new())
            .expect("target");

        assert_eq!(target.objective, Objective::TeammateTrail);
        assert_eq!(target.tile, TilePosition::new(2, 6));
    }

    #[test]
    fn equal_distances_keep_the_earliest_trail_tile() {
        let arena = Arena::open(5, 5);
        let mut state = state_at(2, 0);
        state.set_target_route(trail(&[(1, 1), (3, 1)]));

        let target = TargetSelector::new()
            .resolve(&mut state, &arena, &mut PathFinder::new())
            .expect("target");

        assert_eq!(target.tile, TilePosition::new(1, 1));
    }

    #[test]
    fn standing_on_trail_converges_on_its_first_tile() {
        let arena = Arena::open(5, 5);
        let mut state = state_at(2, 2);
        state.set_target_route(trail(&[(0, 2), (1, 2), (2, 2), (3, 2)]));

        let target = TargetSelector::new()
            .resolve(&mut state, &arena, &mut PathFinder::new())
            .expect("target");

        assert_eq!(target.tile, TilePosition::new(0, 2));
    }

    #[test]
    fn unreachable_trail_tile_falls_back_to_first_tile() {
        let arena = Arena::open(4, 4);
        let mut state = state_at(0, 0);
        state.set_target_route(trail(&[(3, 3), (2, 3), (9, 9)]));

        let target = TargetSelector::new()
            .resolve(&mut state, &arena, &mut PathFinder::new())
            .expect("target");

        assert_eq!(target.tile, TilePosition::new(3, 3));
    }

    #[test]
    fn empty_override_is_ignored() {
        let arena = Arena::open(5, 5);
        let mut state = state_at(0, 0);
        state.set_target_route(Route::empty());

        let target = TargetSelector::new()
            .resolve(&mut state, &arena, &mut PathFinder::new())
            .expect("target");

        assert_eq!(target.objective, Objective::Flag);
    }

    #[test]
    fn missing_flag_yields_no_target() {
        let mut arena = Arena::open(5, 5);
        arena.flag = None;
        let mut state = state_at(0, 0);

        let target = TargetSelector::new().resolve(&mut state, &arena, &mut PathFinder::new());

        assert!(target.is_none());
        assert!(state.flag.is_none());
    }
}

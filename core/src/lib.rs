#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the tank capture-the-flag controller.
//!
//! This crate defines the data model that connects the autonomous tank agents,
//! the authoritative arena, and the host loop. Agents read immutable views of
//! the arena through the [`Arena`] traits, keep all of their progress inside an
//! [`AgentState`], and respond exclusively with [`Command`] values that the
//! arena applies before broadcasting [`Event`] values back to the host.

use std::collections::VecDeque;
use std::f32::consts::{PI, TAU};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Number of simulation ticks executed per second of game time.
pub const TICKS_PER_SECOND: u32 = 50;

/// Unique identifier assigned to a tank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TankId(u32);

impl TankId {
    /// Creates a new tank identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlagId(u32);

impl FlagId {
    /// Creates a new flag identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Cardinal directions between neighbouring tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Neighbour enumeration order used by every grid search.
    pub const SEARCH_ORDER: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];
}

/// Location of a single grid tile expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePosition {
    x: u32,
    y: u32,
}

impl TilePosition {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Tile containing the provided continuous position.
    ///
    /// Coordinates are truncated toward zero; negative components collapse
    /// onto the first row or column.
    #[must_use]
    pub fn containing(position: Vec2) -> Self {
        Self::new(position.x.max(0.0) as u32, position.y.max(0.0) as u32)
    }

    /// Continuous position of the tile's centre.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x as f32 + 0.5, self.y as f32 + 0.5)
    }

    /// Neighbouring tile in the provided direction, if it lies within bounds.
    #[must_use]
    pub fn step(&self, direction: Direction, width: u32, height: u32) -> Option<Self> {
        let (x, y) = match direction {
            Direction::North => (Some(self.x), self.y.checked_sub(1)),
            Direction::South => (Some(self.x), self.y.checked_add(1)),
            Direction::East => (self.x.checked_add(1), Some(self.y)),
            Direction::West => (self.x.checked_sub(1), Some(self.y)),
        };
        let (x, y) = (x?, y?);
        (x < width && y < height).then_some(Self::new(x, y))
    }

    /// Computes the Manhattan distance between two tiles.
    #[must_use]
    pub fn manhattan_distance(self, other: TilePosition) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// Ordered sequence of tiles from an origin toward a destination.
///
/// An empty route is the canonical "no path found" result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    tiles: Vec<TilePosition>,
}

impl Route {
    /// Creates an empty route.
    #[must_use]
    pub const fn empty() -> Self {
        Self { tiles: Vec::new() }
    }

    /// Creates a route visiting the provided tiles in order.
    #[must_use]
    pub fn from_tiles(tiles: Vec<TilePosition>) -> Self {
        Self { tiles }
    }

    /// Number of tiles in the route.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Reports whether the route contains no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Number of moves between neighbouring tiles.
    #[must_use]
    pub fn hops(&self) -> usize {
        self.tiles.len().saturating_sub(1)
    }

    /// First tile of the route.
    #[must_use]
    pub fn first(&self) -> Option<TilePosition> {
        self.tiles.first().copied()
    }

    /// Final tile of the route.
    #[must_use]
    pub fn last(&self) -> Option<TilePosition> {
        self.tiles.last().copied()
    }

    /// Reports whether the tile appears anywhere on the route.
    #[must_use]
    pub fn contains(&self, tile: TilePosition) -> bool {
        self.tiles.contains(&tile)
    }

    /// Tiles of the route in travel order.
    #[must_use]
    pub fn tiles(&self) -> &[TilePosition] {
        &self.tiles
    }

    /// Iterator over the route's tiles in travel order.
    pub fn iter(&self) -> impl Iterator<Item = TilePosition> + '_ {
        self.tiles.iter().copied()
    }
}

impl FromIterator<TilePosition> for Route {
    fn from_iter<I: IntoIterator<Item = TilePosition>>(iter: I) -> Self {
        Self {
            tiles: iter.into_iter().collect(),
        }
    }
}

/// Content of a single grid tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridCell {
    /// Free ground.
    Open,
    /// Obstacle that shells destroy.
    Breakable,
    /// Obstacle that shells cannot destroy.
    Unbreakable,
}

/// Read-only view of the arena's tile grid.
pub trait GridModel {
    /// Number of tile columns.
    fn width(&self) -> u32;

    /// Number of tile rows.
    fn height(&self) -> u32;

    /// Content of an in-bounds tile.
    fn content(&self, tile: TilePosition) -> GridCell;

    /// Reports whether the tile lies within the grid.
    fn contains(&self, tile: TilePosition) -> bool {
        tile.x() < self.width() && tile.y() < self.height()
    }
}

/// Continuous kinematic state of a tank body captured for a single tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodySnapshot {
    /// Position of the body's centre in tile units.
    pub position: Vec2,
    /// Heading in radians; zero faces increasing rows.
    pub heading: f32,
}

impl BodySnapshot {
    /// Unit vector pointing out of the tank's barrel.
    #[must_use]
    pub fn forward(&self) -> Vec2 {
        forward_vector(self.heading)
    }

    /// Tile containing the body's centre.
    #[must_use]
    pub fn tile(&self) -> TilePosition {
        TilePosition::containing(self.position)
    }
}

/// Unit vector for a heading measured in radians.
#[must_use]
pub fn forward_vector(heading: f32) -> Vec2 {
    Vec2::new(-heading.sin(), heading.cos())
}

/// Heading that points from `from` toward `to`.
#[must_use]
pub fn bearing(from: Vec2, to: Vec2) -> f32 {
    let delta = to - from;
    (-delta.x).atan2(delta.y)
}

/// Wraps an angle into the half-open interval `[-PI, PI)`.
#[must_use]
pub fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Rotation commands accepted by a tank body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Steer {
    /// Rotate toward decreasing heading.
    Left,
    /// Rotate toward increasing heading.
    Right,
    /// Stop rotating.
    Stop,
}

/// Throttle commands accepted by a tank body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Throttle {
    /// Accelerate along the heading.
    Forward,
    /// Accelerate against the heading.
    Reverse,
    /// Halt all linear motion.
    Stop,
}

/// Commands that express all permissible arena mutations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Changes the rotation input of a tank.
    Steer {
        /// Tank receiving the input.
        tank: TankId,
        /// Requested rotation.
        steer: Steer,
    },
    /// Changes the throttle input of a tank.
    Throttle {
        /// Tank receiving the input.
        tank: TankId,
        /// Requested throttle.
        throttle: Throttle,
    },
    /// Fires a shell along the tank's heading.
    FireShell {
        /// Tank firing the shell.
        tank: TankId,
    },
    /// Advances the simulation by a single tick.
    Tick,
    /// Returns every tank, the flag and all obstacles to their initial layout.
    ResetRound,
}

/// Events broadcast by the arena after processing commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation advanced by a tick.
    TimeAdvanced {
        /// Number of ticks simulated so far.
        tick: u64,
    },
    /// A tank picked up the flag.
    FlagPickedUp {
        /// Tank now carrying the flag.
        tank: TankId,
    },
    /// A tank delivered the flag to its home base.
    FlagCaptured {
        /// Tank that scored.
        tank: TankId,
    },
    /// A shell struck a tank, which respawned at its home base.
    TankHit {
        /// Tank that was struck.
        tank: TankId,
        /// Tank that fired the shell.
        shooter: TankId,
    },
    /// A shell destroyed a breakable obstacle.
    BoxDestroyed {
        /// Tile the obstacle occupied.
        tile: TilePosition,
    },
    /// The arena returned to its initial layout.
    RoundReset,
}

/// Classification of the first structure intersected by a ray.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitTarget {
    /// A tank body.
    Tank(TankId),
    /// A breakable obstacle occupying the provided tile.
    DestructibleBox(TilePosition),
    /// Anything else, such as unbreakable obstacles or the arena boundary.
    Other,
}

/// Result of a successful ray intersection query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Structure the ray intersected first.
    pub target: HitTarget,
    /// Point where the intersection occurred.
    pub point: Vec2,
}

/// Physics collaborator that answers segment intersection queries.
pub trait RayCaster {
    /// Returns the first structure intersected between `start` and `end`.
    fn cast_ray(&self, start: Vec2, end: Vec2, radius: f32) -> Option<RayHit>;
}

/// Read-only lookups into flag and base state owned by the game collaborator.
pub trait GameView {
    /// Handle of the flag contested in the arena, if one exists.
    fn find_flag(&self) -> Option<FlagId>;

    /// Tile currently holding the flag.
    fn flag_tile(&self, flag: FlagId) -> Option<TilePosition>;

    /// Tank currently carrying the flag.
    fn flag_carrier(&self, flag: FlagId) -> Option<TankId>;

    /// Home base tile of the tank.
    fn home_tile(&self, tank: TankId) -> Option<TilePosition>;
}

/// Complete read-only context consumed by an agent during a tick.
pub trait Arena: GridModel + RayCaster + GameView {}

impl<T> Arena for T where T: GridModel + RayCaster + GameView {}

/// Position of an agent within its movement cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementPhase {
    /// Resolving a target and searching for a route.
    #[default]
    Planning,
    /// Rotating toward the active waypoint.
    Turning {
        /// Tile the agent is steering toward.
        waypoint: TilePosition,
    },
    /// Driving toward the active waypoint.
    Driving {
        /// Tile the agent is driving toward.
        waypoint: TilePosition,
    },
    /// The active waypoint was reached.
    Arrived,
}

/// Complete per-tank controller state persisted between ticks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// Tank controlled by the agent.
    pub tank: TankId,
    /// Grid tile recorded at the end of the last maneuver.
    pub tile: TilePosition,
    /// Current position in the movement cycle.
    pub phase: MovementPhase,
    /// Route produced by the most recent planning boundary, as planned.
    pub route: Route,
    /// Waypoints still to visit after the active one.
    pub remaining: VecDeque<TilePosition>,
    /// Route attempted during the previous failed maneuver.
    pub previous_route: Option<Route>,
    /// Forces the planner to avoid the previous route.
    pub alternate_mode: bool,
    /// Ticks spent on the active maneuver.
    pub stuck_ticks: u32,
    /// Ticks elapsed since the last shot, saturating at the fire period.
    pub fire_cooldown: u32,
    /// Route broadcast by a flag-carrying teammate.
    pub target_route: Option<Route>,
    /// Set externally to abandon the active maneuver.
    pub forced_reset: bool,
    /// Whether the tank currently carries the flag.
    pub carrying_flag: bool,
    /// Flag handle resolved lazily from the game state.
    pub flag: Option<FlagId>,
}

impl AgentState {
    /// Creates the state of a freshly spawned tank standing on `tile`.
    ///
    /// The fire cooldown starts charged so a tank may shoot on its first tick.
    #[must_use]
    pub fn spawn(tank: TankId, tile: TilePosition, fire_period: u32) -> Self {
        Self {
            tank,
            tile,
            phase: MovementPhase::Planning,
            route: Route::empty(),
            remaining: VecDeque::new(),
            previous_route: None,
            alternate_mode: false,
            stuck_ticks: 0,
            fire_cooldown: fire_period,
            target_route: None,
            forced_reset: false,
            carrying_flag: false,
            flag: None,
        }
    }

    /// Installs a route broadcast by a flag-carrying teammate.
    pub fn set_target_route(&mut self, route: Route) {
        self.target_route = Some(route);
    }

    /// Drops any teammate route override.
    pub fn clear_target_route(&mut self) {
        self.target_route = None;
    }

    /// Requests that the active maneuver be abandoned on the next tick.
    pub fn request_reset(&mut self) {
        self.forced_reset = true;
    }

    /// Reports whether a non-empty teammate route override is installed.
    #[must_use]
    pub fn has_target_route(&self) -> bool {
        self.target_route
            .as_ref()
            .is_some_and(|route| !route.is_empty())
    }

    /// Prepares the state for a new round.
    pub fn reset_round(&mut self) {
        self.clear_target_route();
        self.request_reset();
        self.alternate_mode = false;
    }
}

/// Tunable tolerances and periods used by agent controllers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Largest heading error, in degrees, accepted as facing a waypoint.
    pub angle_tolerance_degrees: f32,
    /// Distance, in tiles, below which a waypoint counts as reached.
    pub arrival_distance: f32,
    /// Ticks a single maneuver may take before it is abandoned.
    pub stuck_ceiling: u32,
    /// Ticks between consecutive shots.
    pub fire_period: u32,
    /// Distance ahead of the body's centre where firing rays start.
    pub ray_offset: f32,
}

impl ControllerConfig {
    /// Heading tolerance expressed in radians.
    #[must_use]
    pub fn angle_tolerance(&self) -> f32 {
        self.angle_tolerance_degrees.to_radians()
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            angle_tolerance_degrees: 3.0,
            arrival_distance: 0.1,
            stuck_ceiling: 250,
            fire_period: 50,
            ray_offset: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containing_truncates_toward_zero() {
        assert_eq!(
            TilePosition::containing(Vec2::new(2.9, 0.1)),
            TilePosition::new(2, 0)
        );
        assert_eq!(
            TilePosition::containing(Vec2::new(-0.4, 3.5)),
            TilePosition::new(0, 3)
        );
    }

    #[test]
    fn step_respects_grid_bounds() {
        let corner = TilePosition::new(0, 0);
        assert_eq!(corner.step(Direction::North, 3, 3), None);
        assert_eq!(corner.step(Direction::West, 3, 3), None);
        assert_eq!(
            corner.step(Direction::South, 3, 3),
            Some(TilePosition::new(0, 1))
        );
        assert_eq!(
            TilePosition::new(2, 1).step(Direction::East, 3, 3),
            None
        );
    }

    #[test]
    fn bearing_and_forward_agree() {
        let from = Vec2::new(1.5, 1.5);
        for to in [
            Vec2::new(1.5, 4.5),
            Vec2::new(4.5, 1.5),
            Vec2::new(0.5, 0.5),
            Vec2::new(1.5, 0.5),
        ] {
            let heading = bearing(from, to);
            let expected = (to - from).normalize();
            assert!((forward_vector(heading) - expected).length() < 1e-5);
        }
    }

    #[test]
    fn heading_zero_faces_increasing_rows() {
        let forward = forward_vector(0.0);
        assert!(forward.x.abs() < f32::EPSILON);
        assert!((forward.y - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn wrap_angle_picks_shortest_turn() {
        assert!((wrap_angle(TAU - 0.1) + 0.1).abs() < 1e-5);
        assert!((wrap_angle(-TAU + 0.1) - 0.1).abs() < 1e-5);
        assert!((wrap_angle(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn route_reports_hops() {
        let route: Route = [TilePosition::new(0, 0), TilePosition::new(0, 1)]
            .into_iter()
            .collect();
        assert_eq!(route.hops(), 1);
        assert_eq!(Route::empty().hops(), 0);
        assert!(route.contains(TilePosition::new(0, 1)));
        assert_eq!(route.last(), Some(TilePosition::new(0, 1)));
    }

    #[test]
    fn reset_round_clears_override_and_alternation() {
        let mut state = AgentState::spawn(TankId::new(1), TilePosition::new(0, 0), 50);
        state.alternate_mode = true;
        state.set_target_route(Route::from_tiles(vec![TilePosition::new(1, 1)]));

        state.reset_round();

        assert!(!state.alternate_mode);
        assert!(state.forced_reset);
        assert!(state.target_route.is_none());
    }

    #[test]
    fn empty_override_does_not_count_as_target() {
        let mut state = AgentState::spawn(TankId::new(1), TilePosition::new(0, 0), 50);
        state.set_target_route(Route::empty());
        assert!(!state.has_target_route());
    }

    #[test]
    fn agent_state_snapshot_survives_bincode() {
        let mut state = AgentState::spawn(TankId::new(3), TilePosition::new(2, 5), 50);
        state.phase = MovementPhase::Driving {
            waypoint: TilePosition::new(2, 6),
        };
        state.remaining.push_back(TilePosition::new(2, 7));
        state.previous_route = Some(Route::from_tiles(vec![TilePosition::new(2, 5)]));

        let bytes = bincode::serialize(&state).expect("serialize");
        let restored: AgentState = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, state);
    }

    #[test]
    fn default_config_matches_controller_constants() {
        let config = ControllerConfig::default();
        assert_eq!(config.stuck_ceiling, 250);
        assert_eq!(config.fire_period, 50);
        assert!((config.angle_tolerance() - 3.0_f32.to_radians()).abs() < f32::EPSILON);
    }
}

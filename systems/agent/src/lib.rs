#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Autonomous controller for a single tank.
//!
//! An [`Agent`] owns the complete [`AgentState`] of one tank together with the
//! systems that act on it. The host calls [`Agent::decide`] once per tick and
//! applies the emitted commands to the arena; everything else on this type is
//! an external mutation path used by the host in response to arena events.

use ctf_core::{
    AgentState, Arena, BodySnapshot, Command, ControllerConfig, Route, TankId, TilePosition,
};
use ctf_system_combat::CombatScanner;
use ctf_system_movement::MovementController;
use ctf_system_pathfinding::PassabilityFilter;

/// Per-tank controller combining movement and combat decisions.
#[derive(Debug)]
pub struct Agent {
    state: AgentState,
    movement: MovementController,
    scanner: CombatScanner,
}

impl Agent {
    /// Creates the controller of a tank spawned on `spawn`.
    #[must_use]
    pub fn new(tank: TankId, spawn: TilePosition, config: ControllerConfig) -> Self {
        Self {
            state: AgentState::spawn(tank, spawn, config.fire_period),
            scanner: CombatScanner::new(&config),
            movement: MovementController::new(config),
        }
    }

    /// Tank controlled by this agent.
    #[must_use]
    pub fn tank(&self) -> TankId {
        self.state.tank
    }

    /// Read-only view of the persisted controller state.
    #[must_use]
    pub fn state(&self) -> &AgentState {
        &self.state
    }

    /// Runs one tick of the controller.
    ///
    /// The combat scan runs first, then the movement cycle advances by exactly
    /// one step. Body commands are appended to `out`; a shot request is read
    /// separately through [`Agent::take_fire_request`].
    pub fn decide<A>(&mut self, body: &BodySnapshot, arena: &A, out: &mut Vec<Command>)
    where
        A: Arena + ?Sized,
    {
        let flag = self.state.flag.or_else(|| arena.find_flag());
        self.state.carrying_flag =
            flag.and_then(|flag| arena.flag_carrier(flag)) == Some(self.state.tank);

        self.scanner.scan(&mut self.state, body, arena);
        self.movement.advance(&mut self.state, body, arena, out);

        tracing::trace!(
            tank = self.state.tank.get(),
            phase = ?self.state.phase,
            stuck = self.state.stuck_ticks,
            "decided"
        );
    }

    /// Consumes the shot requested during the latest [`Agent::decide`] call.
    pub fn take_fire_request(&mut self) -> bool {
        self.scanner.take_fire_request()
    }

    /// Installs a route broadcast by a flag-carrying teammate.
    pub fn set_target_route(&mut self, route: Route) {
        self.state.set_target_route(route);
    }

    /// Drops any teammate route override.
    pub fn clear_target_route(&mut self) {
        self.state.clear_target_route();
    }

    /// Abandons the active maneuver on the next tick.
    pub fn request_reset(&mut self) {
        self.state.request_reset();
    }

    /// Prepares the agent for a new round.
    pub fn reset_round(&mut self) {
        self.state.reset_round();
    }

    /// Route the flag carrier will take from its body's tile back to base.
    ///
    /// Normal passability is tried first and permissive passability second.
    /// The route is empty when the tank has no home base.
    pub fn reveal_route<A>(&mut self, body: &BodySnapshot, arena: &A) -> Route
    where
        A: Arena + ?Sized,
    {
        let Some(home) = arena.home_tile(self.state.tank) else {
            return Route::empty();
        };
        self.movement.finder_mut().find_with_fallback(
            arena,
            body.tile(),
            home,
            PassabilityFilter::Normal,
        )
    }
}

/// Reacts to any tank being hit: every agent drops its teammate route and
/// abandons its current maneuver.
pub fn on_tank_hit(agents: &mut [Agent]) {
    for agent in agents {
        agent.clear_target_route();
        agent.request_reset();
    }
}

/// Installs the flag carrier's route as every agent's target route.
pub fn broadcast_route(agents: &mut [Agent], route: &Route) {
    let changed = agents
        .iter()
        .any(|agent| agent.state.target_route.as_ref() != Some(route));
    if changed {
        tracing::info!(hops = route.hops(), "broadcasting flag carrier route");
    }

    for agent in agents {
        agent.set_target_route(route.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctf_core::{
        FlagId, GameView, GridCell, GridModel, HitTarget, MovementPhase, RayCaster, RayHit,
    };
    use glam::Vec2;

    struct Field {
        carrier: Option<TankId>,
        target: Option<HitTarget>,
    }

    impl GridModel for Field {
        fn width(&self) -> u32 {
            4
        }

        fn height(&self) -> u32 {
            4
        }

        fn content(&self, tile: TilePosition) -> GridCell {
            if tile == TilePosition::new(1, 1) {
                GridCell::Unbreakable
            } else {
                GridCell::Open
            }
        }
    }

    impl RayCaster for Field {
        fn cast_ray(&self, _start: Vec2, end: Vec2, _radius: f32) -> Option<RayHit> {
            self.target.map(|target| RayHit { target, point: end })
        }
    }

    impl GameView for Field {
        fn find_flag(&self) -> Option<FlagId> {
            Some(FlagId::new(0))
        }

        fn flag_tile(&self, _flag: FlagId) -> Option<TilePosition> {
            Some(TilePosition::new(3, 3))
        }

        fn flag_carrier(&self, _flag: FlagId) -> Option<TankId> {
            self.carrier
        }

        fn home_tile(&self, _tank: TankId) -> Option<TilePosition> {
            Some(TilePosition::new(0, 0))
        }
    }

    fn agent() -> Agent {
        Agent::new(
            TankId::new(0),
            TilePosition::new(0, 0),
            ControllerConfig::default(),
        )
    }

    fn body_at(x: f32, y: f32) -> BodySnapshot {
        BodySnapshot {
            position: Vec2::new(x, y),
            heading: 0.0,
        }
    }

    #[test]
    fn first_decision_plans_and_may_fire() {
        let field = Field {
            carrier: None,
            target: Some(HitTarget::Tank(TankId::new(1))),
        };
        let mut agent = agent();
        let mut out = Vec::new();

        agent.decide(&body_at(0.5, 0.5), &field, &mut out);

        assert!(agent.take_fire_request());
        assert!(!agent.take_fire_request());
        assert!(matches!(agent.state().phase, MovementPhase::Turning { .. }));
        assert_eq!(agent.state().route.last(), Some(TilePosition::new(3, 3)));
    }

    #[test]
    fn carried_flag_is_refreshed_every_tick() {
        let mut field = Field {
            carrier: Some(TankId::new(0)),
            target: None,
        };
        let mut agent = agent();
        let mut out = Vec::new();

        agent.decide(&body_at(0.5, 0.5), &field, &mut out);
        assert!(agent.state().carrying_flag);

        field.carrier = Some(TankId::new(1));
        agent.decide(&body_at(0.5, 0.5), &field, &mut out);
        assert!(!agent.state().carrying_flag);
    }

    #[test]
    fn revealed_route_leads_home_around_obstacles() {
        let field = Field {
            carrier: Some(TankId::new(0)),
            target: None,
        };
        let mut agent = agent();

        let route = agent.reveal_route(&body_at(2.5, 2.5), &field);

        assert_eq!(route.first(), Some(TilePosition::new(2, 2)));
        assert_eq!(route.last(), Some(TilePosition::new(0, 0)));
        assert_eq!(route.hops(), 4);
        assert!(!route.contains(TilePosition::new(1, 1)));
    }

    #[test]
    fn tank_hit_resets_every_agent() {
        let mut agents = vec![agent(), agent()];
        let trail = Route::from_tiles(vec![TilePosition::new(2, 2), TilePosition::new(1, 2)]);
        broadcast_route(&mut agents, &trail);
        assert!(agents.iter().all(|agent| agent.state().has_target_route()));

        on_tank_hit(&mut agents);

        for agent in &agents {
            assert!(agent.state().target_route.is_none());
            assert!(agent.state().forced_reset);
        }
    }

    #[test]
    fn round_reset_clears_alternate_mode() {
        let mut agent = agent();
        agent.state.alternate_mode = true;
        agent.set_target_route(Route::from_tiles(vec![TilePosition::new(1, 0)]));

        agent.reset_round();

        assert!(!agent.state().alternate_mode);
        assert!(agent.state().forced_reset);
        assert!(!agent.state().has_target_route());
    }
}

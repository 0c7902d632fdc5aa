#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-tick movement state machine that drives a tank body along planned routes.
//!
//! Every call to [`MovementController::advance`] performs exactly one step of
//! the cycle `Planning -> Turning -> Driving -> Arrived -> Planning`. All
//! progress lives in the caller's [`AgentState`], so the controller itself only
//! holds configuration and search scratch buffers.

use ctf_core::{
    bearing, wrap_angle, AgentState, Arena, BodySnapshot, Command, ControllerConfig,
    MovementPhase, Steer, Throttle, TilePosition,
};
use ctf_system_pathfinding::{PassabilityFilter, PathFinder};
use ctf_system_targeting::TargetSelector;

/// Movement system that converts routes into steering and throttle commands.
#[derive(Debug)]
pub struct MovementController {
    config: ControllerConfig,
    finder: PathFinder,
    selector: TargetSelector,
}

impl MovementController {
    /// Creates a controller using the provided tolerances.
    #[must_use]
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            finder: PathFinder::new(),
            selector: TargetSelector::new(),
        }
    }

    /// Configuration the controller was created with.
    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Path finder shared with other planning code owned by the same agent.
    pub fn finder_mut(&mut self) -> &mut PathFinder {
        &mut self.finder
    }

    /// Advances the movement cycle by a single step.
    ///
    /// Body commands are appended to `out`; nothing is emitted while planning.
    pub fn advance<A>(
        &mut self,
        state: &mut AgentState,
        body: &BodySnapshot,
        arena: &A,
        out: &mut Vec<Command>,
    ) where
        A: Arena + ?Sized,
    {
        match state.phase {
            MovementPhase::Planning => self.plan(state, arena),
            MovementPhase::Turning { waypoint } => self.turn(state, body, waypoint, out),
            MovementPhase::Driving { waypoint } => self.drive(state, body, waypoint, out),
            MovementPhase::Arrived => settle(state, body, out),
        }
    }

    fn plan<A>(&mut self, state: &mut AgentState, arena: &A)
    where
        A: Arena + ?Sized,
    {
        let Some(target) = self.selector.resolve(state, arena, &mut self.finder) else {
            tracing::trace!(tank = state.tank.get(), "no objective available");
            return;
        };

        let primary = match (state.alternate_mode, state.previous_route.as_ref()) {
            (true, Some(previous)) => PassabilityFilter::ExcludePrevious(previous),
            _ => PassabilityFilter::Normal,
        };
        let filter = primary.label();
        let route = self
            .finder
            .find_with_fallback(arena, state.tile, target.tile, primary);

        tracing::debug!(
            tank = state.tank.get(),
            objective = ?target.objective,
            target = ?target.tile,
            filter,
            hops = route.hops(),
            "planned route"
        );

        state.remaining = route.iter().skip(1).collect();
        state.route = route;

        if let Some(waypoint) = state.remaining.pop_front() {
            state.phase = MovementPhase::Turning { waypoint };
        }
    }

    fn turn(
        &self,
        state: &mut AgentState,
        body: &BodySnapshot,
        waypoint: TilePosition,
        out: &mut Vec<Command>,
    ) {
        if state.forced_reset {
            tracing::trace!(tank = state.tank.get(), "forced reset while turning");
            settle(state, body, out);
            return;
        }

        let error = wrap_angle(bearing(body.position, waypoint.center()) - body.heading);
        if error.abs() <= self.config.angle_tolerance() {
            out.push(Command::Steer {
                tank: state.tank,
                steer: Steer::Stop,
            });
            if should_throttle(state) {
                out.push(Command::Throttle {
                    tank: state.tank,
                    throttle: Throttle::Forward,
                });
            }
            state.phase = MovementPhase::Driving { waypoint };
            return;
        }

        state.stuck_ticks += 1;
        if state.stuck_ticks > self.config.stuck_ceiling {
            tracing::debug!(tank = state.tank.get(), ?waypoint, "stuck while turning");
            switch(state);
            settle(state, body, out);
            return;
        }

        let steer = if error > 0.0 { Steer::Right } else { Steer::Left };
        out.push(Command::Steer {
            tank: state.tank,
            steer,
        });
    }

    fn drive(
        &self,
        state: &mut AgentState,
        body: &BodySnapshot,
        waypoint: TilePosition,
        out: &mut Vec<Command>,
    ) {
        if state.forced_reset {
            tracing::trace!(tank = state.tank.get(), "forced reset while driving");
            settle(state, body, out);
            return;
        }

        if body.position.distance(waypoint.center()) < self.config.arrival_distance {
            state.phase = MovementPhase::Arrived;
            return;
        }

        state.stuck_ticks += 1;
        if state.stuck_ticks > self.config.stuck_ceiling {
            tracing::debug!(tank = state.tank.get(), ?waypoint, "stuck while driving");
            switch(state);
            settle(state, body, out);
        }
    }
}

/// Throttle only when more waypoints follow, when no teammate trail is being
/// followed, or when the tank carries the flag.
fn should_throttle(state: &AgentState) -> bool {
    !state.remaining.is_empty() || !state.has_target_route() || state.carrying_flag
}

/// Halts the body, records its tile, and returns the cycle to planning.
fn settle(state: &mut AgentState, body: &BodySnapshot, out: &mut Vec<Command>) {
    out.push(Command::Steer {
        tank: state.tank,
        steer: Steer::Stop,
    });
    out.push(Command::Throttle {
        tank: state.tank,
        throttle: Throttle::Stop,
    });
    state.tile = body.tile();
    state.forced_reset = false;
    state.stuck_ticks = 0;
    state.phase = MovementPhase::Planning;
}

/// Toggles alternate mode when the abandoned route repeats the previous one.
fn switch(state: &mut AgentState) {
    if state.previous_route.as_ref() == Some(&state.route) {
        state.alternate_mode = !state.alternate_mode;
        tracing::info!(
            tank = state.tank.get(),
            alternate = state.alternate_mode,
            "route repeated, toggling alternate mode"
        );
    }
    state.previous_route = Some(state.route.clone());
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that decides when a tank should fire along its heading.

use ctf_core::{AgentState, BodySnapshot, ControllerConfig, GridModel, HitTarget, RayCaster};

/// Cooldown-gated line-of-fire check.
///
/// While the agent's cooldown is charging the scanner only counts ticks. Once
/// charged it casts a ray from just ahead of the barrel to the far side of the
/// arena and requests a shot when the first structure in line is a tank or a
/// destructible box. The request lasts for a single tick.
#[derive(Debug)]
pub struct CombatScanner {
    period: u32,
    ray_offset: f32,
    fire_requested: bool,
}

impl CombatScanner {
    /// Creates a scanner using the configured fire period and ray offset.
    #[must_use]
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            period: config.fire_period,
            ray_offset: config.ray_offset,
            fire_requested: false,
        }
    }

    /// Runs one tick of the scanner.
    pub fn scan<A>(&mut self, state: &mut AgentState, body: &BodySnapshot, arena: &A)
    where
        A: GridModel + RayCaster + ?Sized,
    {
        self.fire_requested = false;

        if state.fire_cooldown < self.period {
            state.fire_cooldown += 1;
            return;
        }

        let forward = body.forward();
        let start = body.position + forward * self.ray_offset;
        let end = body.position + forward * arena.width() as f32;

        let Some(hit) = arena.cast_ray(start, end, 0.0) else {
            return;
        };

        match hit.target {
            HitTarget::Tank(_) | HitTarget::DestructibleBox(_) => {
                tracing::debug!(tank = state.tank.get(), target = ?hit.target, "fire requested");
                state.fire_cooldown = 0;
                self.fire_requested = true;
            }
            HitTarget::Other => {}
        }
    }

    /// Reports whether the most recent scan requested a shot.
    #[must_use]
    pub fn fire_requested(&self) -> bool {
        self.fire_requested
    }

    /// Consumes the fire request raised by the most recent scan.
    pub fn take_fire_request(&mut self) -> bool {
        std::mem::take(&mut self.fire_requested)
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative arena state for tank capture-the-flag matches.
//!
//! The world owns the tile grid, the tank bodies, the flag and the score. It
//! is mutated exclusively through [`apply`], which reports every observable
//! change as an [`Event`]. Agents read it through the `ctf-core` collaborator
//! traits implemented here.

pub mod config;
pub mod map;
mod ray;

pub use config::{load_config, parse_config, ConfigError, Difficulty, GameConfig, WorldConfig};
pub use map::{ArenaMap, MapError, TankStart};

use ctf_core::{
    forward_vector, wrap_angle, Command, Event, FlagId, GameView, GridCell, GridModel, HitTarget,
    RayCaster, RayHit, Steer, TankId, Throttle, TilePosition,
};
use glam::Vec2;

/// Radius of a tank body in tiles.
pub const TANK_RADIUS: f32 = 0.3;

/// Distance a shell travels per tick, in tiles.
pub const SHELL_SPEED: f32 = 0.25;

/// Distance ahead of the body's centre where shells are launched.
const SHELL_OFFSET: f32 = 0.5;

const FLAG: FlagId = FlagId::new(0);

#[derive(Clone, Debug)]
struct Tank {
    id: TankId,
    start: TankStart,
    position: Vec2,
    heading: f32,
    speed: f32,
    steer: Steer,
    throttle: Throttle,
    acceleration: f32,
}

impl Tank {
    fn spawn(id: TankId, start: TankStart, acceleration: f32) -> Self {
        Self {
            id,
            start,
            position: start.position,
            heading: start.heading,
            speed: 0.0,
            steer: Steer::Stop,
            throttle: Throttle::Stop,
            acceleration,
        }
    }

    fn respawn(&mut self) {
        self.position = self.start.position;
        self.heading = self.start.heading;
        self.speed = 0.0;
        self.steer = Steer::Stop;
        self.throttle = Throttle::Stop;
    }
}

/// Projectile in flight. Resolved against the first tank or obstacle its
/// per-tick segment crosses; its own shooter is never hit.
#[derive(Clone, Copy, Debug)]
struct Shell {
    shooter: TankId,
    position: Vec2,
    direction: Vec2,
}

#[derive(Clone, Copy, Debug)]
struct Flag {
    position: Vec2,
    carrier: Option<TankId>,
}

/// Represents the authoritative arena state.
#[derive(Debug)]
pub struct World {
    map: ArenaMap,
    config: WorldConfig,
    cells: Vec<GridCell>,
    tanks: Vec<Tank>,
    shells: Vec<Shell>,
    flag: Flag,
    scores: Vec<u32>,
    tick_index: u64,
    captures: u32,
}

impl World {
    /// Creates a world laid out according to `map`.
    ///
    /// Tank ids follow the order of the map's starting positions. The first
    /// tank is the reference tank and always accelerates at the configured
    /// rate; all others are scaled by the difficulty modifier.
    #[must_use]
    pub fn new(map: ArenaMap, config: WorldConfig) -> Self {
        let modifier = config.difficulty.acceleration_modifier();
        let tanks: Vec<Tank> = map
            .tank_starts()
            .iter()
            .enumerate()
            .map(|(index, start)| {
                let scale = if index == 0 { 1.0 } else { modifier };
                Tank::spawn(TankId::new(index as u32), *start, config.acceleration * scale)
            })
            .collect();

        Self {
            cells: map.cells().to_vec(),
            scores: vec![0; tanks.len()],
            flag: Flag {
                position: map.flag_start(),
                carrier: None,
            },
            tanks,
            shells: Vec::new(),
            map,
            config,
            tick_index: 0,
            captures: 0,
        }
    }

    fn tank(&self, id: TankId) -> Option<&Tank> {
        self.tanks.get(id.get() as usize)
    }

    fn tank_mut(&mut self, id: TankId) -> Option<&mut Tank> {
        self.tanks.get_mut(id.get() as usize)
    }

    fn cell_index(&self, tile: TilePosition) -> Option<usize> {
        if !self.contains(tile) {
            return None;
        }
        let width = usize::try_from(self.map.width()).ok()?;
        let x = usize::try_from(tile.x()).ok()?;
        let y = usize::try_from(tile.y()).ok()?;
        Some(y * width + x)
    }

    fn step_tanks(&mut self) {
        let turn_rate = self.config.turn_rate();
        let max_speed = self.config.max_speed;

        for index in 0..self.tanks.len() {
            let tank = &mut self.tanks[index];
            match tank.steer {
                Steer::Left => tank.heading = wrap_angle(tank.heading - turn_rate),
                Steer::Right => tank.heading = wrap_angle(tank.heading + turn_rate),
                Steer::Stop => {}
            }
            tank.speed = match tank.throttle {
                Throttle::Forward => (tank.speed + tank.acceleration).min(max_speed),
                Throttle::Reverse => (tank.speed - tank.acceleration).max(-max_speed),
                Throttle::Stop => 0.0,
            };

            let from = tank.position;
            let delta = forward_vector(tank.heading) * tank.speed;
            if delta == Vec2::ZERO {
                continue;
            }

            let candidates = [
                from + delta,
                from + Vec2::new(delta.x, 0.0),
                from + Vec2::new(0.0, delta.y),
            ];
            if let Some(to) = candidates
                .into_iter()
                .find(|candidate| !self.blocked(index, from, *candidate))
            {
                self.tanks[index].position = to;
            }
        }
    }

    /// Reports whether the tank at `index` may not move from `from` to `to`.
    ///
    /// Tanks that already overlap may still separate.
    fn blocked(&self, index: usize, from: Vec2, to: Vec2) -> bool {
        let width = self.map.width() as f32;
        let height = self.map.height() as f32;
        if to.x < TANK_RADIUS
            || to.y < TANK_RADIUS
            || to.x > width - TANK_RADIUS
            || to.y > height - TANK_RADIUS
        {
            return true;
        }

        let low = (to - Vec2::splat(TANK_RADIUS)).floor().max(Vec2::ZERO);
        let high = (to + Vec2::splat(TANK_RADIUS)).floor();
        for y in low.y as u32..=high.y as u32 {
            for x in low.x as u32..=high.x as u32 {
                let tile = TilePosition::new(x, y);
                if !self.contains(tile) || self.content(tile) == GridCell::Open {
                    continue;
                }
                let corner = Vec2::new(x as f32, y as f32);
                let nearest = to.clamp(corner, corner + Vec2::ONE);
                if nearest.distance(to) < TANK_RADIUS {
                    return true;
                }
            }
        }

        self.tanks
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != index)
            .any(|(_, tank)| {
                let after = tank.position.distance(to);
                after < 2.0 * TANK_RADIUS && after < tank.position.distance(from)
            })
    }

    fn update_flag(&mut self, out_events: &mut Vec<Event>) {
        match self.flag.carrier {
            None => {
                let flag_tile = TilePosition::containing(self.flag.position);
                if let Some(tank) = self
                    .tanks
                    .iter()
                    .find(|tank| TilePosition::containing(tank.position) == flag_tile)
                {
                    let tank = tank.id;
                    self.flag.carrier = Some(tank);
                    tracing::debug!(tank = tank.get(), "flag picked up");
                    out_events.push(Event::FlagPickedUp { tank });
                }
            }
            Some(carrier) => {
                let Some((position, home)) = self
                    .tank(carrier)
                    .map(|tank| (tank.position, tank.start.home_tile()))
                else {
                    return;
                };
                self.flag.position = position;
                if TilePosition::containing(position) != home {
                    return;
                }

                if let Some(score) = self.scores.get_mut(carrier.get() as usize) {
                    *score += 1;
                }
                self.captures += 1;
                tracing::info!(tank = carrier.get(), captures = self.captures, "flag captured");
                out_events.push(Event::FlagCaptured { tank: carrier });
                self.reset_round(out_events);
            }
        }
    }

    fn fire(&mut self, shooter: TankId) {
        let Some(tank) = self.tank(shooter) else {
            return;
        };
        let direction = forward_vector(tank.heading);
        self.shells.push(Shell {
            shooter,
            position: tank.position + direction * SHELL_OFFSET,
            direction,
        });
    }

    fn step_shells(&mut self, out_events: &mut Vec<Event>) {
        let mut shells = std::mem::take(&mut self.shells);
        shells.retain_mut(|shell| {
            let end = shell.position + shell.direction * SHELL_SPEED;
            let Some(hit) = self.trace(shell.position, end, 0.0, Some(shell.shooter)) else {
                shell.position = end;
                return true;
            };
            match hit.target {
                HitTarget::Tank(victim) => self.hit_tank(victim, shell.shooter, out_events),
                HitTarget::DestructibleBox(tile) => self.destroy_box(tile, out_events),
                HitTarget::Other => {}
            }
            false
        });
        self.shells = shells;
    }

    fn destroy_box(&mut self, tile: TilePosition, out_events: &mut Vec<Event>) {
        if let Some(index) = self.cell_index(tile) {
            self.cells[index] = GridCell::Open;
            tracing::debug!(?tile, "box destroyed");
            out_events.push(Event::BoxDestroyed { tile });
        }
    }

    /// Nearest tank or obstacle along the segment, ignoring `skip`.
    fn trace(&self, start: Vec2, end: Vec2, radius: f32, skip: Option<TankId>) -> Option<RayHit> {
        let delta = end - start;
        let mut best = ray::first_obstacle(self, start, end);

        for tank in self.tanks.iter().filter(|tank| Some(tank.id) != skip) {
            let Some(t) = ray::circle_entry(start, delta, tank.position, TANK_RADIUS + radius)
            else {
                continue;
            };
            if best.map_or(true, |(nearest, _)| t <= nearest) {
                best = Some((t, HitTarget::Tank(tank.id)));
            }
        }

        best.map(|(t, target)| RayHit {
            target,
            point: start + delta * t,
        })
    }

    fn hit_tank(&mut self, victim: TankId, shooter: TankId, out_events: &mut Vec<Event>) {
        let Some(tank) = self.tank_mut(victim) else {
            return;
        };
        let dropped_at = tank.position;
        tank.respawn();

        if self.flag.carrier == Some(victim) {
            self.flag.carrier = None;
            self.flag.position = dropped_at;
        }
        tracing::debug!(tank = victim.get(), shooter = shooter.get(), "tank hit");
        out_events.push(Event::TankHit {
            tank: victim,
            shooter,
        });
    }

    fn reset_round(&mut self, out_events: &mut Vec<Event>) {
        self.cells.clear();
        self.cells.extend_from_slice(self.map.cells());
        self.shells.clear();
        for tank in &mut self.tanks {
            tank.respawn();
        }
        self.flag = Flag {
            position: self.map.flag_start(),
            carrier: None,
        };
        tracing::debug!("round reset");
        out_events.push(Event::RoundReset);
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Steer { tank, steer } => {
            if let Some(tank) = world.tank_mut(tank) {
                tank.steer = steer;
            }
        }
        Command::Throttle { tank, throttle } => {
            if let Some(tank) = world.tank_mut(tank) {
                tank.throttle = throttle;
            }
        }
        Command::FireShell { tank } => world.fire(tank),
        Command::Tick => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced {
                tick: world.tick_index,
            });
            world.step_tanks();
            world.step_shells(out_events);
            world.update_flag(out_events);
        }
        Command::ResetRound => world.reset_round(out_events),
    }
}

impl GridModel for World {
    fn width(&self) -> u32 {
        self.map.width()
    }

    fn height(&self) -> u32 {
        self.map.height()
    }

    fn content(&self, tile: TilePosition) -> GridCell {
        self.cell_index(tile)
            .and_then(|index| self.cells.get(index).copied())
            .unwrap_or(GridCell::Unbreakable)
    }
}

impl RayCaster for World {
    fn cast_ray(&self, start: Vec2, end: Vec2, radius: f32) -> Option<RayHit> {
        self.trace(start, end, radius, None)
    }
}

impl GameView for World {
    fn find_flag(&self) -> Option<FlagId> {
        Some(FLAG)
    }

    fn flag_tile(&self, flag: FlagId) -> Option<TilePosition> {
        (flag == FLAG).then(|| TilePosition::containing(self.flag.position))
    }

    fn flag_carrier(&self, flag: FlagId) -> Option<TankId> {
        if flag == FLAG {
            self.flag.carrier
        } else {
            None
        }
    }

    fn home_tile(&self, tank: TankId) -> Option<TilePosition> {
        self.tank(tank).map(|tank| tank.start.home_tile())
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use ctf_core::{BodySnapshot, GridCell, TankId, TilePosition};
    use glam::Vec2;

    use super::{GridModel, World};

    /// Identifiers of every tank in ascending order.
    pub fn tank_ids(world: &World) -> impl Iterator<Item = TankId> + '_ {
        world.tanks.iter().map(|tank| tank.id)
    }

    /// Kinematic snapshot of a tank body.
    #[must_use]
    pub fn body(world: &World, tank: TankId) -> Option<BodySnapshot> {
        world.tank(tank).map(|tank| BodySnapshot {
            position: tank.position,
            heading: tank.heading,
        })
    }

    /// Current speed of a tank along its heading, in tiles per tick.
    #[must_use]
    pub fn speed(world: &World, tank: TankId) -> Option<f32> {
        world.tank(tank).map(|tank| tank.speed)
    }

    /// Current flag position.
    #[must_use]
    pub fn flag_position(world: &World) -> Vec2 {
        world.flag.position
    }

    /// Tank carrying the flag, if any.
    #[must_use]
    pub fn flag_carrier(world: &World) -> Option<TankId> {
        world.flag.carrier
    }

    /// Captures credited to a tank.
    #[must_use]
    pub fn score(world: &World, tank: TankId) -> u32 {
        world.scores.get(tank.get() as usize).copied().unwrap_or(0)
    }

    /// Total number of captures, which equals the number of completed rounds.
    #[must_use]
    pub fn captures(world: &World) -> u32 {
        world.captures
    }

    /// Number of ticks simulated so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Current content of a tile.
    #[must_use]
    pub fn cell(world: &World, tile: TilePosition) -> GridCell {
        world.content(tile)
    }
}

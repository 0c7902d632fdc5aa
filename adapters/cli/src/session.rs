//! Headless match loop connecting agents to the authoritative world.

use ctf_core::{Command, Event, TankId};
use ctf_system_agent::{broadcast_route, on_tank_hit, Agent};
use ctf_world::{self as world, query, ArenaMap, GameConfig, World};
use serde::Serialize;

/// Conditions that end a match.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MatchLimits {
    /// Ticks simulated before the match times out.
    pub(crate) max_ticks: u64,
    /// Captures after which the match is over.
    pub(crate) max_rounds: u32,
}

/// Final standings of a match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct MatchSummary {
    pub(crate) ticks: u64,
    pub(crate) rounds: u32,
    pub(crate) scores: Vec<TankScore>,
    pub(crate) leader: Option<u32>,
}

/// Captures credited to one tank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct TankScore {
    pub(crate) tank: u32,
    pub(crate) captures: u32,
}

/// World plus one agent per tank.
#[derive(Debug)]
pub(crate) struct Session {
    world: World,
    agents: Vec<Agent>,
    events: Vec<Event>,
    commands: Vec<Command>,
}

impl Session {
    pub(crate) fn new(map: ArenaMap, config: &GameConfig) -> Self {
        let agents = map
            .tank_starts()
            .iter()
            .zip(0u32..)
            .map(|(start, id)| Agent::new(TankId::new(id), start.home_tile(), config.controller.clone()))
            .collect();

        Self {
            world: World::new(map, config.world.clone()),
            agents,
            events: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Simulates ticks until either limit is reached.
    pub(crate) fn run(&mut self, limits: &MatchLimits) -> MatchSummary {
        tracing::info!(
            tanks = self.agents.len(),
            max_ticks = limits.max_ticks,
            max_rounds = limits.max_rounds,
            "match started"
        );

        while query::tick_index(&self.world) < limits.max_ticks
            && query::captures(&self.world) < limits.max_rounds
        {
            self.step();
        }

        let summary = self.summary();
        tracing::info!(ticks = summary.ticks, rounds = summary.rounds, "match finished");
        summary
    }

    /// Runs one tick: decisions, shots, route broadcast, event reactions, then
    /// the physics step.
    pub(crate) fn step(&mut self) {
        self.events.clear();

        for agent in &mut self.agents {
            let Some(body) = query::body(&self.world, agent.tank()) else {
                continue;
            };
            agent.decide(&body, &self.world, &mut self.commands);
            for command in self.commands.drain(..) {
                world::apply(&mut self.world, command, &mut self.events);
            }
            if agent.take_fire_request() {
                world::apply(
                    &mut self.world,
                    Command::FireShell { tank: agent.tank() },
                    &mut self.events,
                );
            }
        }

        self.broadcast_carrier_route();
        self.react();

        self.events.clear();
        world::apply(&mut self.world, Command::Tick, &mut self.events);
        self.react();
    }

    fn broadcast_carrier_route(&mut self) {
        let Some(carrier) = query::flag_carrier(&self.world) else {
            return;
        };
        let Some(body) = query::body(&self.world, carrier) else {
            return;
        };
        let Some(index) = self.agents.iter().position(|agent| agent.tank() == carrier) else {
            return;
        };

        let route = self.agents[index].reveal_route(&body, &self.world);
        broadcast_route(&mut self.agents, &route);
    }

    fn react(&mut self) {
        for event in &self.events {
            match event {
                Event::TankHit { tank, shooter } => {
                    tracing::debug!(tank = tank.get(), shooter = shooter.get(), "tank hit");
                    on_tank_hit(&mut self.agents);
                }
                Event::RoundReset => {
                    for agent in &mut self.agents {
                        agent.reset_round();
                    }
                }
                Event::FlagCaptured { tank } => {
                    tracing::info!(tank = tank.get(), "flag captured");
                }
                Event::TimeAdvanced { .. }
                | Event::FlagPickedUp { .. }
                | Event::BoxDestroyed { .. } => {}
            }
        }
    }

    pub(crate) fn summary(&self) -> MatchSummary {
        let scores: Vec<TankScore> = query::tank_ids(&self.world)
            .map(|tank| TankScore {
                tank: tank.get(),
                captures: query::score(&self.world, tank),
            })
            .collect();

        let best = scores.iter().map(|score| score.captures).max().unwrap_or(0);
        let mut leaders = scores.iter().filter(|score| score.captures == best);
        let leader = match (leaders.next(), leaders.next()) {
            (Some(leader), None) if best > 0 => Some(leader.tank),
            _ => None,
        };

        MatchSummary {
            ticks: query::tick_index(&self.world),
            rounds: query::captures(&self.world),
            scores,
            leader,
        }
    }
}

use ctf_core::{Command, ControllerConfig, Event, TankId};
use ctf_system_agent::{broadcast_route, on_tank_hit, Agent};
use ctf_world::{self as world, query, ArenaMap, World, WorldConfig};

/// Minimal host loop wiring agents to a world in the order the arena binary uses.
pub struct Session {
    pub world: World,
    pub agents: Vec<Agent>,
    pub log: Vec<Event>,
}

impl Session {
    pub fn new(map: ArenaMap) -> Self {
        let agents = map
            .tank_starts()
            .iter()
            .zip(0u32..)
            .map(|(start, id)| {
                Agent::new(
                    TankId::new(id),
                    start.home_tile(),
                    ControllerConfig::default(),
                )
            })
            .collect();

        Self {
            world: World::new(map, WorldConfig::default()),
            agents,
            log: Vec::new(),
        }
    }

    pub fn step(&mut self) {
        let mut events = Vec::new();
        let mut commands = Vec::new();

        for agent in &mut self.agents {
            let Some(body) = query::body(&self.world, agent.tank()) else {
                continue;
            };
            agent.decide(&body, &self.world, &mut commands);
            for command in commands.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }
            if agent.take_fire_request() {
                world::apply(
                    &mut self.world,
                    Command::FireShell { tank: agent.tank() },
                    &mut events,
                );
            }
        }

        if let Some(carrier) = query::flag_carrier(&self.world) {
            let carrier_agent = self.agents.iter().position(|agent| agent.tank() == carrier);
            if let (Some(index), Some(body)) = (carrier_agent, query::body(&self.world, carrier)) {
                let route = self.agents[index].reveal_route(&body, &self.world);
                broadcast_route(&mut self.agents, &route);
            }
        }

        world::apply(&mut self.world, Command::Tick, &mut events);
        self.handle(events);
    }

    fn handle(&mut self, events: Vec<Event>) {
        for event in &events {
            match event {
                Event::TankHit { .. } => on_tank_hit(&mut self.agents),
                Event::RoundReset => self.agents.iter_mut().for_each(Agent::reset_round),
                _ => {}
            }
        }
        self.log.extend(events);
    }
}

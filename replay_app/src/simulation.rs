//! Tick loop: move actors, capture, validate incoming shots
//!
//! Each shot is checked twice: against the frame its client actually saw
//! (rewound) and against the current frame (what a server without lag
//! compensation would do). The difference is the point of the demo.

use lag_compensation::foundation::math::{Transform, Vec3};
use lag_compensation::physics::{BodyId, HitInfo, Hitbody, HitboxWorld, Ray};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ReplayError;
use crate::scenario::ScenarioConfig;

/// What happened to one shot
#[derive(Debug, Clone, PartialEq)]
pub struct ShotOutcome {
    /// Index of the shot in the scenario
    pub shot: usize,
    /// Tick the shot arrived at the server
    pub tick: u32,
    /// Body the client aimed at
    pub target: BodyId,
    /// Frame the client was looking at
    pub seen_frame: u32,
    /// Closest hit in the frame the client saw
    pub rewound: Option<HitInfo>,
    /// Closest hit in the current frame
    pub unrewound: Option<HitInfo>,
}

impl ShotOutcome {
    /// Whether the rewound check hit the intended target
    pub fn confirmed(&self) -> bool {
        self.rewound.map_or(false, |hit| hit.hit_object.body == self.target)
    }

    /// Whether the current-frame check would have hit the intended target
    pub fn confirmed_without_rewind(&self) -> bool {
        self.unrewound.map_or(false, |hit| hit.hit_object.body == self.target)
    }
}

/// Totals for a finished replay
#[derive(Debug, Clone, Default)]
pub struct ReplaySummary {
    /// Ticks simulated
    pub ticks: u32,
    /// Per-shot results, in firing order
    pub outcomes: Vec<ShotOutcome>,
}

impl ReplaySummary {
    /// Shots confirmed with rewind
    pub fn confirmed(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.confirmed()).count()
    }

    /// Shots that would have been confirmed without rewind
    pub fn confirmed_without_rewind(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.confirmed_without_rewind()).count()
    }
}

/// A scenario loaded into a hitbox world
pub struct Replay {
    scenario: ScenarioConfig,
    world: HitboxWorld<Hitbody>,
    rng: StdRng,
}

impl Replay {
    /// Validate `scenario` and register its actors
    pub fn new(scenario: ScenarioConfig) -> Result<Self, ReplayError> {
        scenario.validate()?;

        let mut world = HitboxWorld::new();
        for actor in &scenario.actors {
            let layout = scenario.layout_for(actor)?;
            let pose = Transform::from_position(actor.start);
            world.register_body(BodyId(actor.id), Hitbody::new(layout, pose))?;
        }
        info!(
            "Loaded scenario: {} actors, {} shots, {} ticks at {} Hz",
            scenario.actors.len(),
            scenario.shots.len(),
            scenario.ticks,
            scenario.tick_rate
        );

        let rng = StdRng::seed_from_u64(scenario.seed);
        Ok(Self { scenario, world, rng })
    }

    /// Simulate every tick and fire every due shot
    pub fn run(mut self) -> Result<ReplaySummary, ReplayError> {
        let mut order: Vec<usize> = (0..self.scenario.shots.len()).collect();
        order.sort_by_key(|index| self.scenario.shots[*index].tick);
        let mut pending = order.into_iter().peekable();

        let mut summary = ReplaySummary {
            ticks: self.scenario.ticks,
            outcomes: Vec::with_capacity(self.scenario.shots.len()),
        };

        for tick in 0..=self.scenario.ticks {
            self.move_actors(tick);
            self.world.advance_frame(tick)?;

            while let Some(&index) = pending.peek() {
                if self.scenario.shots[index].tick > tick {
                    break;
                }
                pending.next();
                summary.outcomes.push(self.fire(index, tick)?);
            }
        }

        let unfired = pending.count();
        if unfired > 0 {
            warn!("{} shots were scheduled after the last tick and never fired", unfired);
        }
        Ok(summary)
    }

    fn move_actors(&mut self, tick: u32) {
        for actor in &self.scenario.actors {
            let position = self.scenario.actor_position(actor, tick);
            if let Some(body) = self.world.body_mut(BodyId(actor.id)) {
                body.set_transform(Transform::from_position(position));
            }
        }
    }

    fn jitter(&mut self) -> Vec3 {
        let jitter = self.scenario.aim_jitter;
        if jitter <= 0.0 {
            return Vec3::zeros();
        }
        Vec3::new(
            self.rng.gen_range(-jitter..=jitter),
            self.rng.gen_range(-jitter..=jitter),
            self.rng.gen_range(-jitter..=jitter),
        )
    }

    fn fire(&mut self, index: usize, tick: u32) -> Result<ShotOutcome, ReplayError> {
        let shot = self.scenario.shots[index].clone();
        let latency = shot.latency.unwrap_or(self.scenario.latency);
        let seen_frame = tick.saturating_sub(latency);

        let actor = self
            .scenario
            .actor(shot.target)
            .ok_or(ReplayError::UnknownActor { shot: index, actor: shot.target })?;
        let aim = self.scenario.actor_position(actor, seen_frame) + shot.aim_offset;
        let aim = aim + self.jitter();

        let ray = Ray::new(shot.origin, aim - shot.origin)?;
        let rewound = self.world.raycast(seen_frame, &ray);
        let unrewound = self.world.raycast(tick, &ray);

        let outcome = ShotOutcome {
            shot: index,
            tick,
            target: BodyId(shot.target),
            seen_frame,
            rewound,
            unrewound,
        };

        match outcome.rewound {
            Some(hit) => info!(
                "Shot {} at tick {} (seen frame {}): hit body {} part {} at {:.2} m{}",
                outcome.shot,
                outcome.tick,
                outcome.seen_frame,
                hit.hit_object.body,
                hit.hit_object.part.0,
                hit.distance,
                if outcome.confirmed_without_rewind() { "" } else { ", missed without rewind" }
            ),
            None => info!(
                "Shot {} at tick {} (seen frame {}): miss",
                outcome.shot, outcome.tick, outcome.seen_frame
            ),
        }
        debug!("Shot {} ray {:?} -> {:?}", outcome.shot, ray, outcome.unrewound);

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lag_compensation::physics::PartId;

    #[test]
    fn test_default_scenario_needs_rewind() {
        let summary = Replay::new(ScenarioConfig::default()).unwrap().run().unwrap();

        assert_eq!(summary.outcomes.len(), 3);
        assert_eq!(summary.confirmed(), 3);
        assert_eq!(summary.confirmed_without_rewind(), 1);

        let head_shot = &summary.outcomes[1];
        assert_eq!(head_shot.seen_frame, 48);
        assert_eq!(head_shot.rewound.map(|hit| hit.hit_object.part), Some(PartId(0)));
    }

    #[test]
    fn test_shots_fire_in_tick_order() {
        let mut scenario = ScenarioConfig::default();
        scenario.shots.reverse();

        let summary = Replay::new(scenario).unwrap().run().unwrap();

        let ticks: Vec<u32> = summary.outcomes.iter().map(|outcome| outcome.tick).collect();
        assert_eq!(ticks, vec![30, 60, 90]);
    }

    #[test]
    fn test_latency_longer_than_game_clamps_to_first_frame() {
        let mut scenario = ScenarioConfig::default();
        scenario.shots.truncate(1);
        scenario.shots[0].latency = Some(1000);

        let summary = Replay::new(scenario).unwrap().run().unwrap();

        assert_eq!(summary.outcomes[0].seen_frame, 0);
    }

    #[test]
    fn test_shots_after_last_tick_are_not_fired() {
        let mut scenario = ScenarioConfig::default();
        scenario.ticks = 40;

        let summary = Replay::new(scenario).unwrap().run().unwrap();

        assert_eq!(summary.outcomes.len(), 1);
    }

    #[test]
    fn test_seeded_jitter_is_reproducible() {
        let mut scenario = ScenarioConfig::default();
        scenario.aim_jitter = 0.3;
        scenario.seed = 1234;

        let first = Replay::new(scenario.clone()).unwrap().run().unwrap();
        let second = Replay::new(scenario).unwrap().run().unwrap();

        assert_eq!(first.outcomes, second.outcomes);
    }
}

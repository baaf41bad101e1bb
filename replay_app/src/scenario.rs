//! Scenario files: rigs, actors and the shots fired at them
//!
//! Scenarios are plain [`Config`] documents, so they load from RON or TOML
//! by file extension. [`ScenarioConfig::default`] is a small built-in duel
//! used when no file is given.

use std::collections::BTreeMap;

use lag_compensation::config::Config;
use lag_compensation::foundation::math::{Transform, Vec3};
use lag_compensation::physics::{
    CapsuleAxis, HitCapsuleShape, HitbodyLayout, HitboxShape, HitsphereShape, PartId,
};
use serde::{Deserialize, Serialize};

use crate::error::ReplayError;

/// Margin added when a rig's proximity radius is computed instead of authored
pub const PROXIMITY_MARGIN: f32 = 0.05;

/// A moving combatant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Body id used in the hitbox world
    pub id: u32,
    /// Name of the rig in [`ScenarioConfig::rigs`]
    pub rig: String,
    /// Position at tick 0
    pub start: Vec3,
    /// Constant velocity in meters per second
    #[serde(default = "Vec3::zeros")]
    pub velocity: Vec3,
}

/// A shot fired by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotConfig {
    /// Server tick at which the shot arrives
    pub tick: u32,
    /// Muzzle position in world space
    pub origin: Vec3,
    /// Actor the client was aiming at
    pub target: u32,
    /// Point on the target the client aimed at, relative to its origin
    #[serde(default = "default_aim_offset")]
    pub aim_offset: Vec3,
    /// Client latency in ticks, overriding the scenario default
    #[serde(default)]
    pub latency: Option<u32>,
}

fn default_aim_offset() -> Vec3 {
    Vec3::new(0.0, 1.2, 0.0)
}

/// A complete replay scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Number of ticks to simulate
    pub ticks: u32,
    /// Server tick rate in Hz
    pub tick_rate: f32,
    /// Default client latency in ticks
    pub latency: u32,
    /// Maximum aim error, in meters at the target
    pub aim_jitter: f32,
    /// Seed for the aim jitter
    pub seed: u64,
    /// Named body layouts
    pub rigs: BTreeMap<String, HitbodyLayout>,
    /// Combatants
    pub actors: Vec<ActorConfig>,
    /// Shots, in any order
    pub shots: Vec<ShotConfig>,
}

impl Config for ScenarioConfig {}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let mut rigs = BTreeMap::new();
        rigs.insert("soldier".to_string(), soldier());

        Self {
            ticks: 120,
            tick_rate: 60.0,
            latency: 6,
            aim_jitter: 0.0,
            seed: 7,
            rigs,
            actors: vec![
                ActorConfig {
                    id: 1,
                    rig: "soldier".to_string(),
                    start: Vec3::new(-6.0, 0.0, 10.0),
                    velocity: Vec3::new(6.0, 0.0, 0.0),
                },
                ActorConfig {
                    id: 2,
                    rig: "soldier".to_string(),
                    start: Vec3::new(4.0, 0.0, 20.0),
                    velocity: Vec3::zeros(),
                },
            ],
            shots: vec![
                ShotConfig {
                    tick: 30,
                    origin: Vec3::new(0.0, 1.6, 0.0),
                    target: 1,
                    aim_offset: default_aim_offset(),
                    latency: None,
                },
                ShotConfig {
                    tick: 60,
                    origin: Vec3::new(0.0, 1.6, 0.0),
                    target: 1,
                    aim_offset: Vec3::new(0.0, 1.65, 0.0),
                    latency: Some(12),
                },
                ShotConfig {
                    tick: 90,
                    origin: Vec3::new(0.0, 1.6, 0.0),
                    target: 2,
                    aim_offset: default_aim_offset(),
                    latency: None,
                },
            ],
        }
    }
}

impl ScenarioConfig {
    /// Seconds per tick
    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_rate
    }

    /// Position of `actor` at `tick`
    pub fn actor_position(&self, actor: &ActorConfig, tick: u32) -> Vec3 {
        actor.start + actor.velocity * (self.tick_seconds() * tick as f32)
    }

    /// Actor with body id `id`
    pub fn actor(&self, id: u32) -> Option<&ActorConfig> {
        self.actors.iter().find(|actor| actor.id == id)
    }

    /// Check references and rates
    pub fn validate(&self) -> Result<(), ReplayError> {
        if self.tick_rate <= 0.0 || !self.tick_rate.is_finite() {
            return Err(ReplayError::InvalidTickRate(self.tick_rate));
        }
        for actor in &self.actors {
            if !self.rigs.contains_key(&actor.rig) {
                return Err(ReplayError::UnknownRig {
                    actor: actor.id,
                    rig: actor.rig.clone(),
                });
            }
        }
        for (shot, config) in self.shots.iter().enumerate() {
            if self.actor(config.target).is_none() {
                return Err(ReplayError::UnknownActor {
                    shot,
                    actor: config.target,
                });
            }
        }
        Ok(())
    }

    /// Layout for `actor`, with its proximity radius fitted or checked
    ///
    /// A zero radius is computed from the parts; an authored one must
    /// enclose them.
    pub fn layout_for(&self, actor: &ActorConfig) -> Result<HitbodyLayout, ReplayError> {
        let mut layout = self.rigs.get(&actor.rig).cloned().ok_or_else(|| ReplayError::UnknownRig {
            actor: actor.id,
            rig: actor.rig.clone(),
        })?;

        if layout.proximity_radius <= 0.0 {
            layout.fit_proximity(PROXIMITY_MARGIN);
        } else {
            layout.validate_enclosure()?;
        }
        Ok(layout)
    }
}

/// Head sphere, torso box, leg capsule
fn soldier() -> HitbodyLayout {
    HitbodyLayout {
        proximity_radius: 0.0,
        proximity_offset: Vec3::new(0.0, 0.9, 0.0),
        spheres: vec![HitsphereShape {
            part: PartId(0),
            offset: Vec3::new(0.0, 1.65, 0.0),
            radius: 0.12,
        }],
        boxes: vec![HitboxShape {
            part: PartId(1),
            transform: Transform::from_position(Vec3::new(0.0, 1.2, 0.0)),
            center: Vec3::zeros(),
            size: Vec3::new(0.5, 0.6, 0.3),
        }],
        capsules: vec![HitCapsuleShape {
            part: PartId(2),
            transform: Transform::from_position(Vec3::new(0.0, 0.45, 0.0)),
            center: Vec3::zeros(),
            radius: 0.15,
            height: 0.9,
            axis: CapsuleAxis::Y,
        }],
    }
}

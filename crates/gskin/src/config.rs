//! Game configuration file handling
//!
//! A game reads one `gskin.toml`:
//!
//! ```toml
//! [game]
//! title = "Bouncing"
//! fps = 30
//!
//! [logging]
//! filter = "gskin=debug"
//!
//! [systems.gravity]
//! enabled = false
//!
//! [systems.spawner]
//! interval_ms = 500
//!
//! [machines.door]
//! states = ["closed", "open"]
//! initial = "closed"
//! transitions = [
//!     { from = "closed", input = "push", to = "open" },
//!     { from = "open", input = "push", to = "closed" },
//!     { from = "open", input = "walk" },
//! ]
//! ```
//!
//! A transition without `to` stops the machine.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use gskin_core::{ConfigurationError, StateMachine};
use gskin_ecs::{Schedule, DEFAULT_FIXED_DELTA};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Contents of `gskin.toml`
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GameConfig {
    #[serde(default)]
    pub game: GameSection,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Per-system overrides, keyed by system name
    #[serde(default)]
    pub systems: IndexMap<String, SystemConfig>,
    /// State machines declared as data, keyed by machine name
    #[serde(default)]
    pub machines: IndexMap<String, MachineConfig>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GameSection {
    #[serde(default = "default_title")]
    pub title: String,
    /// Ticks per second; sets the schedule's fixed delta
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for GameSection {
    fn default() -> Self {
        Self {
            title: default_title(),
            fps: default_fps(),
        }
    }
}

fn default_title() -> String {
    "gskin".to_string()
}

fn default_fps() -> u32 {
    60
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter directives, used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SystemConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Run at most once per this many milliseconds
    #[serde(default)]
    pub interval_ms: Option<u64>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MachineConfig {
    pub states: Vec<String>,
    /// Defaults to the first state
    #[serde(default)]
    pub initial: Option<String>,
    #[serde(default)]
    pub transitions: Vec<TransitionConfig>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TransitionConfig {
    pub from: String,
    pub input: String,
    #[serde(default)]
    pub to: Option<String>,
}

impl GameConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: GameConfig = toml::from_str(content).context("Invalid game configuration")?;
        tracing::debug!(
            title = %config.game.title,
            systems = config.systems.len(),
            machines = config.machines.len(),
            "loaded game config"
        );
        Ok(config)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize game config")
    }

    /// Seconds per tick implied by `game.fps`
    pub fn fixed_delta(&self) -> f32 {
        if self.game.fps == 0 {
            return DEFAULT_FIXED_DELTA;
        }
        1.0 / self.game.fps as f32
    }

    /// Apply the fixed delta and every `[systems.*]` section
    pub fn apply_to_schedule<C>(&self, schedule: &mut Schedule<C>) -> Result<(), ConfigurationError> {
        schedule.set_fixed_delta(self.fixed_delta());
        for (name, system) in &self.systems {
            let interval = system.interval_ms.map(|ms| ms as f32 / 1000.0);
            schedule.configure_system(name, system.enabled, interval)?;
        }
        Ok(())
    }

    /// Build the machine declared under `[machines.<name>]`
    pub fn build_machine(&self, name: &str) -> Result<StateMachine<String, String>, ConfigurationError> {
        let machine = self
            .machines
            .get(name)
            .ok_or_else(|| ConfigurationError::UnknownMachine(name.to_string()))?;

        let mut builder = StateMachine::builder().states(machine.states.iter().cloned());
        for transition in &machine.transitions {
            builder = match &transition.to {
                Some(to) => builder.on(transition.from.clone(), transition.input.clone(), to.clone()),
                None => builder.exit_on(transition.from.clone(), transition.input.clone()),
            };
        }
        builder.build()
    }

    /// Build the machine and enter its initial state
    pub fn start_machine(&self, name: &str) -> gskin_core::Result<StateMachine<String, String>> {
        let mut machine = self.build_machine(name)?;
        let initial = self
            .machines
            .get(name)
            .and_then(|config| config.initial.clone().or_else(|| config.states.first().cloned()))
            .ok_or(ConfigurationError::NoStates)?;
        machine.start(initial)?;
        Ok(machine)
    }
}

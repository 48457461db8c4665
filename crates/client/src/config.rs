//! Client configuration.
//!
//! Defaults cover a local offline-mode server. A JSON file can override any
//! subset of fields; CLI flags are applied on top in `main.rs`.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub protocol_version: i32,
    pub timeouts: Timeouts,
    pub movement: MovementConfig,
    /// Targets queued for the movement coordinator once play starts.
    pub waypoints: Vec<[f64; 3]>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 25565,
            username: "ultimate".into(),
            protocol_version: ultimate_protocol::PROTOCOL_VERSION,
            timeouts: Timeouts::default(),
            movement: MovementConfig::default(),
            waypoints: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Load from a JSON file; missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("checking config {}", path.display()))?;
        Ok(config)
    }

    /// Reject values that would stall or crash the session.
    pub fn validate(&self) -> Result<()> {
        self.timeouts.validate()?;
        self.movement.validate()?;
        for (i, point) in self.waypoints.iter().enumerate() {
            ensure!(
                point.iter().all(|c| c.is_finite()),
                "waypoints[{}] has a non-finite coordinate: {:?}",
                i,
                point
            );
        }
        Ok(())
    }

    /// `host:port`, as handed to the socket layer.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// All waits are in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub connect_secs: f64,
    pub login_read_secs: f64,
    pub play_read_secs: f64,
    pub start_secs: f64,
    pub join_secs: f64,
    /// How long movement waits for the first server position. `null` waits forever.
    pub position_secs: Option<f64>,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_secs: 5.0,
            login_read_secs: 10.0,
            play_read_secs: 20.0,
            start_secs: 15.0,
            join_secs: 10.0,
            position_secs: Some(30.0),
        }
    }
}

impl Timeouts {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("connect_secs", Some(self.connect_secs)),
            ("login_read_secs", Some(self.login_read_secs)),
            ("play_read_secs", Some(self.play_read_secs)),
            ("start_secs", Some(self.start_secs)),
            ("join_secs", Some(self.join_secs)),
            ("position_secs", self.position_secs),
        ];
        for (name, value) in fields {
            let Some(value) = value else { continue };
            if let Err(e) = Duration::try_from_secs_f64(value) {
                anyhow::bail!("timeouts.{} = {} is not a valid duration: {}", name, value, e);
            }
        }
        Ok(())
    }

    // Accessors fall back to zero on values `validate` rejects.

    pub fn connect(&self) -> Duration {
        secs(self.connect_secs)
    }

    pub fn login_read(&self) -> Duration {
        secs(self.login_read_secs)
    }

    pub fn play_read(&self) -> Duration {
        secs(self.play_read_secs)
    }

    pub fn start(&self) -> Duration {
        secs(self.start_secs)
    }

    pub fn join(&self) -> Duration {
        secs(self.join_secs)
    }

    pub fn position(&self) -> Option<Duration> {
        self.position_secs.map(secs)
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Walking speed in blocks per second.
    pub speed: f64,
    /// Largest per-axis step in one tick.
    pub max_step: f64,
    /// A target counts as reached once every axis is closer than this.
    pub precision: f64,
}

/// Vanilla tick rate; the coordinator never steps faster than this.
pub const MAX_TICKS_PER_SECOND: f64 = 20.0;

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            speed: 4.317,
            max_step: 0.02,
            precision: 0.001,
        }
    }
}

impl MovementConfig {
    /// Every field must be a finite number above zero.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("speed", self.speed),
            ("max_step", self.max_step),
            ("precision", self.precision),
        ];
        for (name, value) in fields {
            ensure!(
                value.is_finite() && value > 0.0,
                "movement.{} must be a positive number, got {}",
                name,
                value
            );
        }
        ensure!(
            self.try_tick_period().is_some(),
            "movement.speed {} is too slow for a step of {}",
            self.speed,
            self.max_step
        );
        Ok(())
    }

    /// Time between movement ticks: `1 / min(20, speed / max_step)`.
    /// Only meaningful for a config that passes [`validate`](Self::validate).
    pub fn tick_period(&self) -> Duration {
        self.try_tick_period()
            .unwrap_or(Duration::from_secs_f64(1.0 / MAX_TICKS_PER_SECOND))
    }

    fn try_tick_period(&self) -> Option<Duration> {
        let rate = (self.speed / self.max_step).min(MAX_TICKS_PER_SECOND);
        Duration::try_from_secs_f64(1.0 / rate).ok()
    }
}

//! Movement coordinator.
//!
//! One tokio task walks the player towards queued targets, one bounded step
//! per tick, sending a Player Position packet after every step. The task is
//! driven through a cheap [`Movement`] handle that any thread may clone.
//!
//! ```text
//! Idle --target--> Approaching --reached/skip--> Idle
//!                   |      ^
//!             pause |      | resume
//!                   v      |
//!                   Paused
//! any --Stop target / shutdown--> Stopped
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use ultimate_protocol::packets::serverbound;

use crate::config::MovementConfig;
use crate::error::{ClientError, Result};
use crate::game::{GameState, PlayerPosition};
use crate::net::Outbound;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    Point { x: f64, y: f64, z: f64 },
    /// Sentinel: the coordinator exits when it pops this.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementState {
    Idle,
    Approaching,
    Paused,
    Stopped,
}

/// Checked by the coordinator at every tick boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Running,
    Paused,
    /// Abandon the current target, then carry on as `Running`.
    Skip,
}

type Callback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Targets {
    pending: VecDeque<Target>,
    /// A point has been popped and not finished yet. Skips only apply while set.
    active: bool,
}

struct Shared {
    queue: Mutex<Targets>,
    queued: Notify,
    gate: watch::Sender<Gate>,
    state: watch::Sender<MovementState>,
    shutdown: watch::Sender<bool>,
    on_pause: Mutex<Vec<Callback>>,
    on_resume: Mutex<Vec<Callback>>,
}

impl Shared {
    fn new() -> Self {
        let (gate, _) = watch::channel(Gate::Running);
        let (state, _) = watch::channel(MovementState::Idle);
        let (shutdown, _) = watch::channel(false);
        Self {
            queue: Mutex::new(Targets::default()),
            queued: Notify::new(),
            gate,
            state,
            shutdown,
            on_pause: Mutex::new(Vec::new()),
            on_resume: Mutex::new(Vec::new()),
        }
    }

    async fn next_target(&self) -> Target {
        loop {
            let queued = self.queued.notified();
            {
                let mut targets = self.queue.lock().expect("target queue poisoned");
                if let Some(target) = targets.pending.pop_front() {
                    targets.active = matches!(target, Target::Point { .. });
                    return target;
                }
            }
            queued.await;
        }
    }

    /// The current point is done, however it ended. A skip still pending
    /// for it is dropped.
    fn finish_target(&self) {
        let mut targets = self.queue.lock().expect("target queue poisoned");
        targets.active = false;
        self.gate.send_if_modified(|g| {
            let skip = *g == Gate::Skip;
            if skip {
                *g = Gate::Running;
            }
            skip
        });
    }

    fn run_callbacks(list: &Mutex<Vec<Callback>>) {
        // Snapshot so a callback may register further callbacks.
        let callbacks: Vec<Callback> = list.lock().expect("callback list poisoned").clone();
        for callback in callbacks {
            callback();
        }
    }
}

/// Handle to the movement task.
#[derive(Clone)]
pub struct Movement {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Movement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Movement")
            .field("state", &self.state())
            .field("pending", &self.pending_targets())
            .finish()
    }
}

impl Movement {
    /// Start the coordinator. It steps `game`'s shared position and queues
    /// one Player Position packet per step on `outbound`.
    ///
    /// `position_timeout` bounds the wait for the server's first position;
    /// `None` waits forever.
    pub fn spawn(
        config: MovementConfig,
        position_timeout: Option<Duration>,
        game: Arc<GameState>,
        outbound: Outbound,
    ) -> (Movement, JoinHandle<Result<()>>) {
        let shared = Arc::new(Shared::new());

        let coordinator = Coordinator {
            shared: Arc::clone(&shared),
            config,
            position_timeout,
            game,
            outbound,
        };
        let handle = tokio::spawn(coordinator.run());
        (Movement { shared }, handle)
    }

    // ── Target queue ────────────────────────────────────────────────────

    pub fn add_target(&self, x: f64, y: f64, z: f64) {
        self.shared
            .queue
            .lock()
            .expect("target queue poisoned")
            .pending
            .push_back(Target::Point { x, y, z });
        self.shared.queued.notify_one();
        tracing::debug!("Movement target queued: ({:.3}, {:.3}, {:.3})", x, y, z);
    }

    /// Drop every queued target. A queued `Stop` survives.
    pub fn clear_targets(&self) {
        let mut targets = self.shared.queue.lock().expect("target queue poisoned");
        let had_stop = targets.pending.contains(&Target::Stop);
        targets.pending.clear();
        if had_stop {
            targets.pending.push_back(Target::Stop);
        }
    }

    /// Number of queued points, not counting the one being approached.
    pub fn pending_targets(&self) -> usize {
        self.shared
            .queue
            .lock()
            .expect("target queue poisoned")
            .pending
            .iter()
            .filter(|t| matches!(t, Target::Point { .. }))
            .count()
    }

    // ── Flow control ────────────────────────────────────────────────────

    pub fn pause(&self) {
        self.shared.gate.send_if_modified(|g| {
            let running = *g == Gate::Running;
            if running {
                *g = Gate::Paused;
            }
            running
        });
    }

    pub fn resume(&self) {
        self.shared.gate.send_if_modified(|g| {
            let paused = *g == Gate::Paused;
            if paused {
                *g = Gate::Running;
            }
            paused
        });
    }

    /// Abandon the target being approached. Does nothing while idle.
    ///
    /// A target counts as current from the moment the coordinator takes it
    /// off the queue, before the state flips to `Approaching`.
    pub fn skip_current(&self) {
        let targets = self.shared.queue.lock().expect("target queue poisoned");
        if targets.active {
            self.shared.gate.send_replace(Gate::Skip);
        }
    }

    /// Drop all targets and let the coordinator exit. The target being
    /// approached is abandoned, even when paused.
    pub fn stop(&self) {
        {
            let mut targets = self.shared.queue.lock().expect("target queue poisoned");
            targets.pending.clear();
            targets.pending.push_back(Target::Stop);
        }
        self.shared.queued.notify_one();
        self.skip_current();
    }

    /// Tear the task down at its next await point, whatever it is doing.
    pub fn shutdown(&self) {
        self.shared.shutdown.send_replace(true);
    }

    pub fn on_pause(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.shared
            .on_pause
            .lock()
            .expect("callback list poisoned")
            .push(Arc::new(callback));
    }

    pub fn on_resume(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.shared
            .on_resume
            .lock()
            .expect("callback list poisoned")
            .push(Arc::new(callback));
    }

    // ── Observation ─────────────────────────────────────────────────────

    pub fn state(&self) -> MovementState {
        *self.shared.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<MovementState> {
        self.shared.state.subscribe()
    }
}

// ── Task ────────────────────────────────────────────────────────────────

enum Outcome {
    Reached,
    Skipped,
    Shutdown,
}

struct Coordinator {
    shared: Arc<Shared>,
    config: MovementConfig,
    position_timeout: Option<Duration>,
    game: Arc<GameState>,
    outbound: Outbound,
}

impl Coordinator {
    async fn run(self) -> Result<()> {
        if let Err(e) = self.config.validate() {
            self.shared.state.send_replace(MovementState::Stopped);
            let err = ClientError::InvalidConfig(format!("{:#}", e));
            tracing::error!("Movement coordinator not started: {}", err);
            return Err(err);
        }
        tracing::info!(
            "Movement coordinator started (speed {} b/s, step {}, tick {:?})",
            self.config.speed,
            self.config.max_step,
            self.config.tick_period()
        );
        let result = self.drive().await;
        self.shared.state.send_replace(MovementState::Stopped);
        match &result {
            Ok(()) => tracing::info!("Movement coordinator stopped"),
            Err(e) => tracing::error!("Movement coordinator failed: {}", e),
        }
        result
    }

    async fn drive(&self) -> Result<()> {
        let mut shutdown = self.shared.shutdown.subscribe();
        loop {
            self.shared.state.send_replace(MovementState::Idle);
            let target = tokio::select! {
                target = self.shared.next_target() => target,
                _ = shutdown.wait_for(|s| *s) => return Ok(()),
            };
            let (x, y, z) = match target {
                Target::Stop => return Ok(()),
                Target::Point { x, y, z } => (x, y, z),
            };

            self.shared.state.send_replace(MovementState::Approaching);

            let outcome = self.approach(x, y, z, &mut shutdown).await;
            self.shared.finish_target();
            match outcome? {
                Outcome::Reached => {
                    tracing::debug!("Reached ({:.3}, {:.3}, {:.3})", x, y, z)
                }
                Outcome::Skipped => {
                    tracing::debug!("Skipped ({:.3}, {:.3}, {:.3})", x, y, z)
                }
                Outcome::Shutdown => return Ok(()),
            }
        }
    }

    async fn wait_position(&self, shutdown: &mut watch::Receiver<bool>) -> Result<bool> {
        tokio::select! {
            known = self.game.position().wait_known(self.position_timeout) => known.map(|_| true),
            _ = shutdown.wait_for(|s| *s) => Ok(false),
        }
    }

    async fn approach(
        &self,
        x: f64,
        y: f64,
        z: f64,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Outcome> {
        let MovementConfig {
            max_step,
            precision,
            ..
        } = self.config;
        let mut gate = self.shared.gate.subscribe();
        let mut ticker = tokio::time::interval(self.config.tick_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.wait_for(|s| *s) => return Ok(Outcome::Shutdown),
            }

            // ── Gate ──
            let current = *gate.borrow_and_update();
            match current {
                Gate::Running => {}
                Gate::Skip => return Ok(Outcome::Skipped),
                Gate::Paused => {
                    self.shared.state.send_replace(MovementState::Paused);
                    tracing::debug!("Movement paused");
                    Shared::run_callbacks(&self.shared.on_pause);

                    let released = tokio::select! {
                        g = gate.wait_for(|g| *g != Gate::Paused) => g.map(|g| *g).ok(),
                        _ = shutdown.wait_for(|s| *s) => None,
                    };
                    let Some(released) = released else {
                        return Ok(Outcome::Shutdown);
                    };

                    tracing::debug!("Movement resumed");
                    Shared::run_callbacks(&self.shared.on_resume);
                    if released == Gate::Skip {
                        return Ok(Outcome::Skipped);
                    }
                    self.shared.state.send_replace(MovementState::Approaching);
                    ticker.reset();
                    continue;
                }
            }

            // ── Step ──
            let stepped = self.game.position().update(|pos| {
                pos.x += (x - pos.x).clamp(-max_step, max_step);
                pos.y += (y - pos.y).clamp(-max_step, max_step);
                pos.z += (z - pos.z).clamp(-max_step, max_step);
            });
            let Some(pos) = stepped else {
                // Position not known yet; the server sends it after login.
                if !self.wait_position(shutdown).await? {
                    return Ok(Outcome::Shutdown);
                }
                continue;
            };

            self.outbound
                .send(serverbound::player_position(pos.x, pos.y, pos.z, pos.on_ground));

            if reached(&pos, x, y, z, precision) {
                return Ok(Outcome::Reached);
            }
        }
    }
}

fn reached(pos: &PlayerPosition, x: f64, y: f64, z: f64, precision: f64) -> bool {
    (x - pos.x).abs() < precision && (y - pos.y).abs() < precision && (z - pos.z).abs() < precision
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reached_uses_one_precision_on_every_axis() {
        let pos = PlayerPosition {
            x: 1.0,
            y: 64.0,
            z: -3.0,
            ..Default::default()
        };
        assert!(reached(&pos, 1.0005, 64.0, -3.0, 0.001));
        assert!(!reached(&pos, 1.0, 64.002, -3.0, 0.001));
        assert!(!reached(&pos, 1.0, 64.0, -2.998, 0.001));
    }

    #[tokio::test]
    async fn skip_applies_as_soon_as_a_target_is_taken() {
        let movement = Movement {
            shared: Arc::new(Shared::new()),
        };
        movement.add_target(1.0, 2.0, 3.0);

        // Queued but not taken yet: nothing to skip.
        movement.skip_current();
        assert_eq!(*movement.shared.gate.borrow(), Gate::Running);

        // Taken, state still `Idle`: the skip lands.
        let target = movement.shared.next_target().await;
        assert_eq!(target, Target::Point { x: 1.0, y: 2.0, z: 3.0 });
        assert_eq!(movement.state(), MovementState::Idle);
        movement.skip_current();
        assert_eq!(*movement.shared.gate.borrow(), Gate::Skip);

        // Finishing the target drops the leftover skip.
        movement.shared.finish_target();
        assert_eq!(*movement.shared.gate.borrow(), Gate::Running);
        movement.skip_current();
        assert_eq!(*movement.shared.gate.borrow(), Gate::Running);
    }

    #[tokio::test]
    async fn invalid_config_stops_the_task() {
        let game = Arc::new(GameState::new());
        let (outbound, _rx) = crate::net::queue::outbound();
        let config = MovementConfig {
            max_step: -0.02,
            ..MovementConfig::default()
        };
        let (movement, handle) = Movement::spawn(config, None, game, outbound);
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(ClientError::InvalidConfig(_))));
        assert_eq!(movement.state(), MovementState::Stopped);
    }
}

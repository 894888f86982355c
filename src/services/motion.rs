// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Motion-event classifier.
//!
//! A threshold detector over accelerometer magnitude (gravity included):
//!
//! ```text
//! Idle --(|a| < 2)--> Falling --(|a| > 18)--> AwaitingConfirmation
//!   ^                    |                        |         |
//!   |         (no impact within timeout)        yes        no
//!   |                    v                        v         |
//!   +-------------------Idle <--(2 s)-- BounceWindow        |
//!   +-------------------------------------------------------+
//! ```
//!
//! Resting magnitude is ~9.8 m/s². Free fall reads near zero, an impact
//! near twice gravity. Distance is estimated as ½·g·t² from the free-fall
//! duration, ignoring drag and orientation. During the bounce window every
//! sample above 15 m/s² counts as a bounce.
//!
//! The classifier is clock-injected: all timing comes from sample
//! timestamps, so it runs identically on live sensor data and in tests.

use dashmap::DashMap;

use crate::error::{AppError, Result};
use crate::services::recorder::FallRecorder;

/// Thresholds and timings for fall detection.
#[derive(Debug, Clone)]
pub struct MotionConfig {
    /// Magnitude below which the device is considered in free fall (m/s²).
    pub free_fall_threshold: f64,
    /// Magnitude above which a falling device has hit something (m/s²).
    pub impact_threshold: f64,
    /// Magnitude above which a post-impact sample counts as a bounce (m/s²).
    pub bounce_threshold: f64,
    /// Length of the post-confirmation bounce window.
    pub bounce_window_ms: u64,
    /// Free fall without impact for this long is abandoned.
    pub fall_timeout_ms: u64,
    /// Gravitational acceleration used for the distance estimate (m/s²).
    pub gravity: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            free_fall_threshold: 2.0,
            impact_threshold: 18.0,
            bounce_threshold: 15.0,
            bounce_window_ms: 2000,
            fall_timeout_ms: crate::config::DEFAULT_FALL_TIMEOUT_MS,
            gravity: 9.8,
        }
    }
}

/// One 3-axis accelerometer reading.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
pub struct AccelSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Monotonic timestamp in milliseconds
    pub timestamp_ms: u64,
}

impl AccelSample {
    pub fn new(x: f64, y: f64, z: f64, timestamp_ms: u64) -> Self {
        Self {
            x,
            y,
            z,
            timestamp_ms,
        }
    }

    /// Euclidean norm of the three axes.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Classifier state.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionState {
    Idle,
    Falling { since_ms: u64 },
    /// Impact seen; waiting for the user to confirm it was a drop.
    AwaitingConfirmation { distance_m: f64 },
    BounceWindow {
        distance_m: f64,
        started_ms: u64,
        bounces: u32,
    },
}

/// Transitions reported to the caller.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MotionEvent {
    /// Free fall ended in an impact; ask the user to confirm.
    FallDetected { distance_m: f64, duration_s: f64 },
    /// Free fall never ended in an impact.
    FallAbandoned { duration_s: f64 },
    Bounce { count: u32 },
    /// Bounce window expired; the fall is ready to be recorded.
    BounceWindowClosed { distance_m: f64, bounces: u32 },
}

/// Free-fall/impact/bounce state machine for a single sensor.
#[derive(Debug, Clone)]
pub struct MotionClassifier {
    config: MotionConfig,
    state: MotionState,
}

impl Default for MotionClassifier {
    fn default() -> Self {
        Self::new(MotionConfig::default())
    }
}

impl MotionClassifier {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            state: MotionState::Idle,
        }
    }

    pub fn state(&self) -> &MotionState {
        &self.state
    }

    /// Estimated drop height for a free fall of `duration_s` seconds.
    pub fn estimate_distance(&self, duration_s: f64) -> f64 {
        0.5 * self.config.gravity * duration_s * duration_s
    }

    /// Feed one sample; returns the transition it caused, if any.
    ///
    /// A sample that expires a timeout is still applied to the resulting
    /// `Idle` state, which can only start a new fall and never reports an
    /// event of its own.
    pub fn process(&mut self, sample: &AccelSample) -> Option<MotionEvent> {
        let expired = self.tick(sample.timestamp_ms);

        let magnitude = sample.magnitude();
        let now = sample.timestamp_ms;

        let event = match self.state {
            MotionState::Idle => {
                if magnitude < self.config.free_fall_threshold {
                    self.state = MotionState::Falling { since_ms: now };
                }
                None
            }
            MotionState::Falling { since_ms } => {
                if magnitude > self.config.impact_threshold {
                    let duration_s = now.saturating_sub(since_ms) as f64 / 1000.0;
                    let distance_m = self.estimate_distance(duration_s);
                    tracing::debug!(distance_m, duration_s, "Fall detected");
                    self.state = MotionState::AwaitingConfirmation { distance_m };
                    Some(MotionEvent::FallDetected {
                        distance_m,
                        duration_s,
                    })
                } else {
                    None
                }
            }
            MotionState::AwaitingConfirmation { .. } => None,
            MotionState::BounceWindow {
                ref mut bounces, ..
            } => {
                if magnitude > self.config.bounce_threshold {
                    *bounces += 1;
                    Some(MotionEvent::Bounce { count: *bounces })
                } else {
                    None
                }
            }
        };

        expired.or(event)
    }

    /// Apply timeouts as of `now_ms` without a new reading.
    ///
    /// Closes an expired bounce window and abandons a free fall that has gone
    /// on longer than the configured timeout.
    pub fn tick(&mut self, now_ms: u64) -> Option<MotionEvent> {
        match self.state {
            MotionState::Falling { since_ms }
                if now_ms.saturating_sub(since_ms) > self.config.fall_timeout_ms =>
            {
                let duration_s = now_ms.saturating_sub(since_ms) as f64 / 1000.0;
                tracing::debug!(duration_s, "Free fall abandoned without impact");
                self.state = MotionState::Idle;
                Some(MotionEvent::FallAbandoned { duration_s })
            }
            MotionState::BounceWindow {
                distance_m,
                started_ms,
                bounces,
            } if now_ms.saturating_sub(started_ms) > self.config.bounce_window_ms => {
                self.state = MotionState::Idle;
                Some(MotionEvent::BounceWindowClosed {
                    distance_m,
                    bounces,
                })
            }
            _ => None,
        }
    }

    /// User confirmed the drop: start counting bounces from `now_ms`.
    pub fn confirm(&mut self, now_ms: u64) -> Result<f64> {
        match self.state {
            MotionState::AwaitingConfirmation { distance_m } => {
                self.state = MotionState::BounceWindow {
                    distance_m,
                    started_ms: now_ms,
                    bounces: 0,
                };
                Ok(distance_m)
            }
            _ => Err(AppError::BadRequest(
                "No detected fall is awaiting confirmation".to_string(),
            )),
        }
    }

    /// User rejected the drop: discard the estimate.
    pub fn reject(&mut self) -> Result<()> {
        match self.state {
            MotionState::AwaitingConfirmation { .. } => {
                self.state = MotionState::Idle;
                Ok(())
            }
            _ => Err(AppError::BadRequest(
                "No detected fall is awaiting confirmation".to_string(),
            )),
        }
    }

    /// Pretend a fall of `distance_m` was just detected (testing aid).
    pub fn simulate_fall(&mut self, distance_m: f64) -> MotionEvent {
        self.state = MotionState::AwaitingConfirmation { distance_m };
        MotionEvent::FallDetected {
            distance_m,
            duration_s: (2.0 * distance_m / self.config.gravity).sqrt(),
        }
    }
}

/// Per-identity classifiers, with closed bounce windows handed to the recorder.
pub struct MotionSessions {
    config: MotionConfig,
    classifiers: DashMap<String, MotionClassifier>,
    recorder: FallRecorder,
}

impl MotionSessions {
    pub fn new(config: MotionConfig, recorder: FallRecorder) -> Self {
        Self {
            config,
            classifiers: DashMap::new(),
            recorder,
        }
    }

    /// Feed a batch of samples for `uid` and record any completed falls.
    pub async fn ingest(&self, uid: &str, samples: &[AccelSample]) -> Result<Vec<MotionEvent>> {
        let events: Vec<MotionEvent> = {
            let mut classifier = self
                .classifiers
                .entry(uid.to_string())
                .or_insert_with(|| MotionClassifier::new(self.config.clone()));
            samples
                .iter()
                .filter_map(|sample| classifier.process(sample))
                .collect()
        };

        self.record_closed(uid, &events).await?;
        Ok(events)
    }

    /// Apply timeouts for `uid` as of `now_ms`.
    pub async fn tick(&self, uid: &str, now_ms: u64) -> Result<Option<MotionEvent>> {
        let event = self
            .classifiers
            .get_mut(uid)
            .and_then(|mut classifier| classifier.tick(now_ms));

        if let Some(event) = &event {
            self.record_closed(uid, std::slice::from_ref(event)).await?;
        }
        Ok(event)
    }

    pub fn confirm(&self, uid: &str, now_ms: u64) -> Result<f64> {
        let mut classifier = self.classifiers.get_mut(uid).ok_or_else(|| {
            AppError::BadRequest("No detected fall is awaiting confirmation".to_string())
        })?;
        classifier.confirm(now_ms)
    }

    pub fn reject(&self, uid: &str) -> Result<()> {
        let mut classifier = self.classifiers.get_mut(uid).ok_or_else(|| {
            AppError::BadRequest("No detected fall is awaiting confirmation".to_string())
        })?;
        classifier.reject()
    }

    pub fn simulate_fall(&self, uid: &str, distance_m: f64) -> MotionEvent {
        self.classifiers
            .entry(uid.to_string())
            .or_insert_with(|| MotionClassifier::new(self.config.clone()))
            .simulate_fall(distance_m)
    }

    pub fn state(&self, uid: &str) -> MotionState {
        self.classifiers
            .get(uid)
            .map(|c| c.state().clone())
            .unwrap_or(MotionState::Idle)
    }

    /// Drop the classifier for a signed-out identity.
    pub fn remove(&self, uid: &str) {
        self.classifiers.remove(uid);
    }

    async fn record_closed(&self, uid: &str, events: &[MotionEvent]) -> Result<()> {
        for event in events {
            if let MotionEvent::BounceWindowClosed {
                distance_m,
                bounces,
            } = *event
            {
                self.recorder.record_fall(uid, distance_m, bounces).await?;
            }
        }
        Ok(())
    }
}

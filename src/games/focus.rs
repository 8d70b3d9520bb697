//! "Catch": stars appear at random intervals and must be caught before they
//! fade. Measures reaction speed and accuracy.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::{check_window, EventRecorder, GameKind, GameStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusConfig {
    pub duration_ms: u64,
    /// Delay before the next star, drawn from `[min, max)` for every spawn.
    pub spawn_delay_min_ms: u64,
    pub spawn_delay_max_ms: u64,
    /// How long a star stays catchable, drawn from `[min, max)`.
    pub lifetime_min_ms: u64,
    pub lifetime_max_ms: u64,
    pub bonus_probability: f64,
    /// Reported average when nothing was caught.
    pub fallback_reaction_ms: f64,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            duration_ms: 60_000,
            spawn_delay_min_ms: 800,
            spawn_delay_max_ms: 1_800,
            lifetime_min_ms: 2_000,
            lifetime_max_ms: 4_000,
            bonus_probability: 0.2,
            fallback_reaction_ms: 1_000.0,
        }
    }
}

impl FocusConfig {
    pub fn validate(&self) -> EngineResult<()> {
        let kind = GameKind::Focus;
        if self.duration_ms == 0 {
            return Err(EngineError::invalid_config(kind, "duration must be greater than zero"));
        }
        if self.spawn_delay_min_ms == 0 || self.spawn_delay_min_ms >= self.spawn_delay_max_ms {
            return Err(EngineError::invalid_config(
                kind,
                format!(
                    "spawn delay range [{}, {}) is empty",
                    self.spawn_delay_min_ms, self.spawn_delay_max_ms
                ),
            ));
        }
        if self.lifetime_min_ms == 0 || self.lifetime_min_ms >= self.lifetime_max_ms {
            return Err(EngineError::invalid_config(
                kind,
                format!(
                    "stimulus lifetime range [{}, {}) is empty",
                    self.lifetime_min_ms, self.lifetime_max_ms
                ),
            ));
        }
        if !(0.0..=1.0).contains(&self.bonus_probability) {
            return Err(EngineError::invalid_config(
                kind,
                format!("bonus probability {} outside [0, 1]", self.bonus_probability),
            ));
        }
        check_window(kind, "duration", self.duration_ms)?;
        check_window(kind, "spawn delay", self.spawn_delay_max_ms)?;
        check_window(kind, "stimulus lifetime", self.lifetime_max_ms)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StimulusKind {
    Normal,
    Bonus,
}

impl StimulusKind {
    pub fn points(self) -> u32 {
        match self {
            StimulusKind::Normal => 1,
            StimulusKind::Bonus => 2,
        }
    }

    /// Cue frequency played when a star of this kind is caught.
    pub fn cue_frequency_hz(self) -> f32 {
        match self {
            StimulusKind::Normal => 800.0,
            StimulusKind::Bonus => 1200.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ReactionKind {
    Normal,
    Bonus,
    Missed,
}

impl From<StimulusKind> for ReactionKind {
    fn from(kind: StimulusKind) -> Self {
        match kind {
            StimulusKind::Normal => ReactionKind::Normal,
            StimulusKind::Bonus => ReactionKind::Bonus,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReactionEvent {
    pub correct: bool,
    /// Time from spawn to catch; for a miss, the star's full lifetime.
    pub reaction_time_ms: u64,
    pub kind: ReactionKind,
    /// Milliseconds since the game started.
    pub at_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Stimulus {
    pub id: u64,
    pub kind: StimulusKind,
    pub spawned_at_ms: u64,
    pub lifetime_ms: u64,
}

impl Stimulus {
    fn expires_at_ms(&self) -> u64 {
        self.spawned_at_ms.saturating_add(self.lifetime_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocusResult {
    pub reactions: Vec<ReactionEvent>,
    pub average_reaction_time_ms: f64,
    pub accuracy: f64,
    pub correct: u32,
    pub score: u32,
    pub total_time_ms: u64,
}

impl FocusResult {
    /// Freeze a reaction log into a result.
    ///
    /// Stars still on screen when the game ends are not part of `reactions`
    /// and do not count toward accuracy.
    pub fn from_reactions(
        reactions: Vec<ReactionEvent>,
        score: u32,
        total_time_ms: u64,
        fallback_reaction_ms: f64,
    ) -> Self {
        let caught: Vec<&ReactionEvent> = reactions.iter().filter(|r| r.correct).collect();
        let correct = caught.len() as u32;

        let average_reaction_time_ms = if caught.is_empty() {
            fallback_reaction_ms
        } else {
            caught.iter().map(|r| r.reaction_time_ms as f64).sum::<f64>() / caught.len() as f64
        };

        let accuracy = if reactions.is_empty() {
            0.0
        } else {
            correct as f64 / reactions.len() as f64
        };

        Self {
            reactions,
            average_reaction_time_ms,
            accuracy,
            correct,
            score,
            total_time_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FocusGame {
    config: FocusConfig,
    status: GameStatus,
    next_id: u64,
    live: Vec<Stimulus>,
    reactions: EventRecorder<ReactionEvent>,
    score: u32,
}

impl FocusGame {
    pub fn new(config: FocusConfig) -> Self {
        Self {
            config,
            status: GameStatus::Idle,
            next_id: 1,
            live: Vec::new(),
            reactions: EventRecorder::new(),
            score: 0,
        }
    }

    pub fn config(&self) -> &FocusConfig {
        &self.config
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == GameStatus::Running
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn live_stimuli(&self) -> &[Stimulus] {
        &self.live
    }

    pub fn start(&mut self) -> bool {
        if self.status != GameStatus::Idle {
            return false;
        }
        self.status = GameStatus::Running;
        true
    }

    pub fn next_spawn_delay_ms<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.gen_range(self.config.spawn_delay_min_ms..self.config.spawn_delay_max_ms)
    }

    /// Put a new star on screen. Returns `None` once the game is no longer
    /// running.
    pub fn spawn<R: Rng + ?Sized>(&mut self, now_ms: u64, rng: &mut R) -> Option<Stimulus> {
        if !self.is_running() {
            return None;
        }

        let kind = if rng.gen_bool(self.config.bonus_probability) {
            StimulusKind::Bonus
        } else {
            StimulusKind::Normal
        };
        let lifetime_ms = rng.gen_range(self.config.lifetime_min_ms..self.config.lifetime_max_ms);

        let stimulus = Stimulus {
            id: self.next_id,
            kind,
            spawned_at_ms: now_ms,
            lifetime_ms,
        };
        self.next_id += 1;
        self.live.push(stimulus);
        Some(stimulus)
    }

    /// The player tapped a star. Unknown, already-resolved or post-game ids
    /// are ignored. A tap that lands after the star's lifetime but before its
    /// expiry timer fired resolves the star as missed.
    pub fn respond(&mut self, stimulus_id: u64, now_ms: u64) -> Option<ReactionEvent> {
        if !self.is_running() {
            return None;
        }
        let stimulus = self.take_live(stimulus_id)?;

        if now_ms >= stimulus.expires_at_ms() {
            return Some(self.record_miss(&stimulus));
        }

        let event = ReactionEvent {
            correct: true,
            reaction_time_ms: now_ms.saturating_sub(stimulus.spawned_at_ms),
            kind: stimulus.kind.into(),
            at_ms: now_ms,
        };
        self.score += stimulus.kind.points();
        self.reactions.record(event.clone());
        Some(event)
    }

    /// A star's lifetime ran out. No-op if it was already caught.
    pub fn expire(&mut self, stimulus_id: u64) -> Option<ReactionEvent> {
        if !self.is_running() {
            return None;
        }
        let stimulus = self.take_live(stimulus_id)?;
        Some(self.record_miss(&stimulus))
    }

    /// Stop the game and freeze its result. Returns `None` if the game was
    /// not running, so a second countdown expiry cannot produce a result.
    pub fn complete(&mut self, now_ms: u64) -> Option<FocusResult> {
        if !self.is_running() {
            return None;
        }
        self.status = GameStatus::Completed;
        self.live.clear();

        Some(FocusResult::from_reactions(
            self.reactions.drain(),
            self.score,
            now_ms,
            self.config.fallback_reaction_ms,
        ))
    }

    fn take_live(&mut self, stimulus_id: u64) -> Option<Stimulus> {
        let index = self.live.iter().position(|s| s.id == stimulus_id)?;
        Some(self.live.remove(index))
    }

    fn record_miss(&mut self, stimulus: &Stimulus) -> ReactionEvent {
        let event = ReactionEvent {
            correct: false,
            reaction_time_ms: stimulus.lifetime_ms,
            kind: ReactionKind::Missed,
            at_ms: stimulus.expires_at_ms(),
        };
        self.reactions.record(event.clone());
        event
    }
}

//! Converts frozen game results into bounded 0-10 behavioral scores.
//!
//! Every function here is total: empty logs, zero attempts and non-finite
//! inputs resolve to [`NEUTRAL_SCORE`] instead of dividing by zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::games::{EnergyResult, FocusResult, MemoryResult, RawResult};

pub const NEUTRAL_SCORE: u8 = 5;
pub const MAX_SCORE: u8 = 10;

/// Reaction time (ms) that costs one point of speed score.
const SPEED_MS_PER_POINT: f64 = 200.0;
/// Stars needed for full sustained-attention credit.
const SUSTAINED_ATTENTION_TARGETS: f64 = 15.0;
/// Rounds needed for full pattern-recognition credit.
const PATTERN_RECOGNITION_ROUNDS: f64 = 5.0;
const WORKING_MEMORY_SPAN_CAP: usize = 7;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralScore {
    pub overall: u8,
    pub breakdown: BTreeMap<String, f64>,
}

impl BehavioralScore {
    pub fn neutral() -> Self {
        Self {
            overall: NEUTRAL_SCORE,
            breakdown: BTreeMap::new(),
        }
    }

    fn new(overall: f64, breakdown: impl IntoIterator<Item = (&'static str, f64)>) -> Self {
        Self {
            overall: bounded(overall),
            breakdown: breakdown
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }
}

pub fn score_result(result: &RawResult) -> BehavioralScore {
    match result {
        RawResult::Focus(focus) => score_focus(focus),
        RawResult::Energy(energy) => score_energy(energy),
        RawResult::Memory(memory) => score_memory(memory),
    }
}

pub fn score_focus(result: &FocusResult) -> BehavioralScore {
    let total = result.reactions.len();
    if total == 0 {
        return BehavioralScore::neutral();
    }

    let caught = result.reactions.iter().filter(|r| r.correct).count();
    let accuracy = caught as f64 / total as f64;
    let speed = speed_score(result.average_reaction_time_ms);
    let sustained = (total as f64 / SUSTAINED_ATTENTION_TARGETS * 10.0).min(10.0);

    BehavioralScore::new(
        (accuracy * 5.0 + speed * 5.0) / 10.0,
        [
            ("accuracy", (accuracy * 100.0).round()),
            ("speed", speed.round()),
            ("sustained_attention", sustained),
            ("average_reaction_time_ms", finite_or(result.average_reaction_time_ms, 0.0)),
            ("total_targets", total as f64),
        ],
    )
}

pub fn score_energy(result: &EnergyResult) -> BehavioralScore {
    let coordination = f64::from(result.dance_accuracy);
    let rhythm = f64::from(result.rhythm);
    let intensity = f64::from(result.movement_intensity);

    BehavioralScore::new(
        (coordination + rhythm + intensity) / 3.0,
        [
            ("coordination", coordination),
            ("rhythm_sense", rhythm),
            ("physical_activity", intensity),
            ("engagement", ((coordination + rhythm) / 2.0).min(10.0)),
        ],
    )
}

pub fn score_memory(result: &MemoryResult) -> BehavioralScore {
    if result.total_attempts == 0 {
        return BehavioralScore::neutral();
    }

    let accuracy = f64::from(result.correct_recalls) / f64::from(result.total_attempts);
    let rounds = result.patterns.len();

    BehavioralScore::new(
        accuracy * 10.0,
        [
            ("accuracy", (accuracy * 100.0).round()),
            ("working_memory_span", rounds.min(WORKING_MEMORY_SPAN_CAP) as f64),
            (
                "pattern_recognition",
                (rounds as f64 / PATTERN_RECOGNITION_ROUNDS * 10.0).min(10.0),
            ),
            ("correct_recalls", f64::from(result.correct_recalls)),
            ("total_attempts", f64::from(result.total_attempts)),
        ],
    )
}

/// Faster average reactions score higher, linearly, floored at zero.
fn speed_score(average_reaction_ms: f64) -> f64 {
    if !average_reaction_ms.is_finite() {
        return 0.0;
    }
    (10.0 - average_reaction_ms / SPEED_MS_PER_POINT).max(0.0)
}

fn bounded(value: f64) -> u8 {
    if !value.is_finite() {
        return NEUTRAL_SCORE;
    }
    value.round().clamp(0.0, f64::from(MAX_SCORE)) as u8
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::{GridCell, ReactionEvent, ReactionKind};

    fn reactions(caught: usize, missed: usize, reaction_ms: u64) -> Vec<ReactionEvent> {
        let hits = (0..caught).map(|i| ReactionEvent {
            correct: true,
            reaction_time_ms: reaction_ms,
            kind: ReactionKind::Normal,
            at_ms: i as u64 * 1_000,
        });
        let misses = (0..missed).map(|i| ReactionEvent {
            correct: false,
            reaction_time_ms: 3_000,
            kind: ReactionKind::Missed,
            at_ms: 50_000 + i as u64 * 1_000,
        });
        hits.chain(misses).collect()
    }

    fn energy(accuracy: u32, rhythm: u32, intensity: u32) -> EnergyResult {
        EnergyResult {
            score: 0,
            dance_accuracy: accuracy,
            rhythm,
            movement_intensity: intensity,
            total_moves: 0,
            correct_moves: 0,
            final_combo: 0,
            max_combo: 0,
            energy_level: 0,
            game_time_ms: 0,
            moves: Vec::new(),
        }
    }

    #[test]
    fn focus_scenario_eight_of_ten_at_400ms() {
        let result = FocusResult::from_reactions(reactions(8, 2, 400), 8, 60_000, 1_000.0);
        assert_eq!(result.score, 8);
        assert!((result.accuracy - 0.8).abs() < 1e-9);
        assert_eq!(result.average_reaction_time_ms, 400.0);

        let score = score_focus(&result);
        assert_eq!(score.breakdown["speed"], 8.0);
        assert_eq!(score.breakdown["accuracy"], 80.0);
        // (0.8 * 5 + 8 * 5) / 10 = 4.4
        assert_eq!(score.overall, 4);
        assert!((score.breakdown["sustained_attention"] - 10.0 * 10.0 / 15.0).abs() < 1e-9);
    }

    #[test]
    fn focus_with_nothing_spawned_is_neutral() {
        let result = FocusResult::from_reactions(Vec::new(), 0, 60_000, 1_000.0);
        assert_eq!(result.accuracy, 0.0);
        assert_eq!(score_focus(&result), BehavioralScore::neutral());
    }

    #[test]
    fn slow_reactions_floor_speed_at_zero() {
        let result = FocusResult::from_reactions(reactions(0, 20, 0), 0, 60_000, 1_000.0);
        let score = score_focus(&result);
        assert_eq!(score.breakdown["speed"], 5.0);
        assert_eq!(score.breakdown["sustained_attention"], 10.0);

        let mut slow = FocusResult::from_reactions(reactions(5, 0, 4_000), 5, 60_000, 1_000.0);
        assert_eq!(score_focus(&slow).breakdown["speed"], 0.0);
        slow.average_reaction_time_ms = f64::NAN;
        assert!(score_focus(&slow).overall <= MAX_SCORE);
    }

    #[test]
    fn energy_averages_three_components() {
        let score = score_energy(&energy(9, 9, 9));
        assert_eq!(score.overall, 9);
        assert_eq!(score.breakdown["engagement"], 9.0);

        assert_eq!(score_energy(&energy(10, 3, 1)).overall, 5);
        assert_eq!(score_energy(&energy(0, 0, 0)).overall, 0);
    }

    #[test]
    fn memory_scenario_eighteen_of_twenty() {
        let result = MemoryResult {
            correct_recalls: 18,
            total_attempts: 20,
            rounds_completed: 4,
            patterns: vec![vec![GridCell { col: 0, row: 0 }]; 4],
        };
        let score = score_memory(&result);
        assert_eq!(score.overall, 9);
        assert_eq!(score.breakdown["accuracy"], 90.0);
        assert_eq!(score.breakdown["working_memory_span"], 4.0);
        assert_eq!(score.breakdown["pattern_recognition"], 8.0);
    }

    #[test]
    fn memory_without_attempts_is_neutral() {
        let result = MemoryResult {
            correct_recalls: 0,
            total_attempts: 0,
            rounds_completed: 0,
            patterns: Vec::new(),
        };
        assert_eq!(score_memory(&result).overall, NEUTRAL_SCORE);
    }

    #[test]
    fn overall_is_always_within_bounds() {
        for caught in 0..12 {
            for missed in 0..12 {
                for reaction_ms in [0, 150, 400, 1_999, 5_000] {
                    let result = FocusResult::from_reactions(
                        reactions(caught, missed, reaction_ms),
                        0,
                        60_000,
                        1_000.0,
                    );
                    assert!(score_focus(&result).overall <= MAX_SCORE);
                }
            }
        }
        for a in 0..=10 {
            for r in 0..=10 {
                assert!(score_energy(&energy(a, r, 10)).overall <= MAX_SCORE);
            }
        }
        assert!(score_energy(&energy(u32::MAX, u32::MAX, u32::MAX)).overall <= MAX_SCORE);
    }
}

//! "Dance": Teddy shows a move, the player copies it. Measures coordination,
//! rhythm (streaks) and overall movement intensity.

use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::{check_window, EventRecorder, GameKind, GameStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EnergyConfig {
    pub duration_ms: u64,
    /// Pause between pressing start and the first move.
    pub lead_in_ms: u64,
    pub show_ms: u64,
    pub response_ms: u64,
    /// Pause after a response (or timeout) before the next move is shown.
    pub round_gap_ms: u64,
    pub energy_per_correct: u32,
    pub energy_per_miss: u32,
    pub energy_cap: u32,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            duration_ms: 90_000,
            lead_in_ms: 1_000,
            show_ms: 3_000,
            response_ms: 4_000,
            round_gap_ms: 1_000,
            energy_per_correct: 20,
            energy_per_miss: 5,
            energy_cap: 200,
        }
    }
}

impl EnergyConfig {
    pub fn validate(&self) -> EngineResult<()> {
        let kind = GameKind::Energy;
        if self.duration_ms == 0 {
            return Err(EngineError::invalid_config(kind, "duration must be greater than zero"));
        }
        if self.show_ms == 0 || self.response_ms == 0 {
            return Err(EngineError::invalid_config(
                kind,
                "show and response windows must be greater than zero",
            ));
        }
        if self.energy_cap == 0
            || self.energy_per_correct > self.energy_cap
            || self.energy_per_miss > self.energy_cap
        {
            return Err(EngineError::invalid_config(
                kind,
                format!(
                    "energy steps correct={} miss={} must fit within cap {}",
                    self.energy_per_correct, self.energy_per_miss, self.energy_cap
                ),
            ));
        }
        for (name, value_ms) in [
            ("duration", self.duration_ms),
            ("lead-in", self.lead_in_ms),
            ("show window", self.show_ms),
            ("response window", self.response_ms),
            ("round gap", self.round_gap_ms),
        ] {
            check_window(kind, name, value_ms)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum DanceMove {
    Clap,
    Jump,
    Spin,
    Wave,
    Wiggle,
    Heart,
    Star,
    Dance,
}

impl DanceMove {
    pub const ALL: [DanceMove; 8] = [
        DanceMove::Clap,
        DanceMove::Jump,
        DanceMove::Spin,
        DanceMove::Wave,
        DanceMove::Wiggle,
        DanceMove::Heart,
        DanceMove::Star,
        DanceMove::Dance,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DanceMove::Clap => "clap",
            DanceMove::Jump => "jump",
            DanceMove::Spin => "spin",
            DanceMove::Wave => "wave",
            DanceMove::Wiggle => "wiggle",
            DanceMove::Heart => "heart",
            DanceMove::Star => "star",
            DanceMove::Dance => "dance",
        }
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            DanceMove::Clap => "Clap your hands!",
            DanceMove::Jump => "Jump up high!",
            DanceMove::Spin => "Spin around!",
            DanceMove::Wave => "Wave hello!",
            DanceMove::Wiggle => "Wiggle your body!",
            DanceMove::Heart => "Make a heart!",
            DanceMove::Star => "Reach for stars!",
            DanceMove::Dance => "Free dance!",
        }
    }

    pub fn cue_frequency_hz(&self) -> f32 {
        match self {
            DanceMove::Clap => 440.0,
            DanceMove::Jump => 660.0,
            DanceMove::Spin => 880.0,
            DanceMove::Wave => 550.0,
            DanceMove::Wiggle => 770.0,
            DanceMove::Heart => 990.0,
            DanceMove::Star => 1_100.0,
            DanceMove::Dance => 1_320.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum EnergyPhase {
    /// Waiting for the next move to be shown (also the lead-in and the gap
    /// between rounds).
    #[default]
    Ready,
    Showing,
    Responding,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MoveAttempt {
    pub round: u32,
    pub expected: DanceMove,
    /// `None` when the response window closed without a selection.
    pub selected: Option<DanceMove>,
    pub correct: bool,
    pub points: u32,
    pub combo: u32,
    pub energy: u32,
    pub at_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnergyResult {
    pub score: u32,
    pub dance_accuracy: u32,
    pub rhythm: u32,
    pub movement_intensity: u32,
    pub total_moves: u32,
    pub correct_moves: u32,
    pub final_combo: u32,
    pub max_combo: u32,
    pub energy_level: u32,
    pub game_time_ms: u64,
    pub moves: Vec<MoveAttempt>,
}

impl EnergyResult {
    pub fn from_moves(
        moves: Vec<MoveAttempt>,
        score: u32,
        final_combo: u32,
        max_combo: u32,
        energy_level: u32,
        game_time_ms: u64,
    ) -> Self {
        let total_moves = moves.len() as u32;
        let correct_moves = moves.iter().filter(|m| m.correct).count() as u32;

        let dance_accuracy = if total_moves > 0 {
            (10.0 * correct_moves as f64 / total_moves as f64).round() as u32
        } else {
            5
        };
        let rhythm = (final_combo + 2).clamp(1, 10);
        let movement_intensity = (energy_level as f64 / 20.0).clamp(1.0, 10.0).round() as u32;

        Self {
            score,
            dance_accuracy,
            rhythm,
            movement_intensity,
            total_moves,
            correct_moves,
            final_combo,
            max_combo,
            energy_level,
            game_time_ms,
            moves,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnergyGame {
    config: EnergyConfig,
    status: GameStatus,
    phase: EnergyPhase,
    round: u32,
    current: Option<DanceMove>,
    combo: u32,
    max_combo: u32,
    energy: u32,
    score: u32,
    moves: EventRecorder<MoveAttempt>,
}

impl EnergyGame {
    pub fn new(config: EnergyConfig) -> Self {
        Self {
            config,
            status: GameStatus::Idle,
            phase: EnergyPhase::Ready,
            round: 0,
            current: None,
            combo: 0,
            max_combo: 0,
            energy: 0,
            score: 0,
            moves: EventRecorder::new(),
        }
    }

    pub fn config(&self) -> &EnergyConfig {
        &self.config
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn phase(&self) -> EnergyPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.status == GameStatus::Running
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn current_move(&self) -> Option<DanceMove> {
        self.current
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn energy(&self) -> u32 {
        self.energy
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn start(&mut self) -> bool {
        if self.status != GameStatus::Idle {
            return false;
        }
        self.status = GameStatus::Running;
        self.phase = EnergyPhase::Ready;
        true
    }

    /// Pick and show the next move. Returns the new round number.
    pub fn begin_round<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<(u32, DanceMove)> {
        if !self.is_running() || self.phase != EnergyPhase::Ready {
            return None;
        }
        let dance_move = *DanceMove::ALL.choose(rng)?;
        self.round += 1;
        self.current = Some(dance_move);
        self.phase = EnergyPhase::Showing;
        Some((self.round, dance_move))
    }

    /// Hide the move and open the response window for `round`.
    pub fn open_response(&mut self, round: u32) -> bool {
        if !self.is_running() || self.phase != EnergyPhase::Showing || self.round != round {
            return false;
        }
        self.phase = EnergyPhase::Responding;
        true
    }

    pub fn is_responding(&self, round: u32) -> bool {
        self.is_running() && self.phase == EnergyPhase::Responding && self.round == round
    }

    /// Score the player's selection. Ignored outside the response window.
    pub fn respond(&mut self, selected: DanceMove, now_ms: u64) -> Option<MoveAttempt> {
        if !self.is_running() || self.phase != EnergyPhase::Responding {
            return None;
        }
        Some(self.resolve(Some(selected), now_ms))
    }

    /// The response window for `round` closed. Ignored if that round already
    /// got a response or the game moved on.
    pub fn timeout(&mut self, round: u32, now_ms: u64) -> Option<MoveAttempt> {
        if !self.is_responding(round) {
            return None;
        }
        Some(self.resolve(None, now_ms))
    }

    /// Stop the game regardless of phase. A round still being shown or
    /// awaiting a response is dropped.
    pub fn complete(&mut self, now_ms: u64) -> Option<EnergyResult> {
        if !self.is_running() {
            return None;
        }
        self.status = GameStatus::Completed;
        self.phase = EnergyPhase::Completed;
        self.current = None;

        Some(EnergyResult::from_moves(
            self.moves.drain(),
            self.score,
            self.combo,
            self.max_combo,
            self.energy,
            now_ms,
        ))
    }

    fn resolve(&mut self, selected: Option<DanceMove>, now_ms: u64) -> MoveAttempt {
        // Phase guards above guarantee a move is on stage.
        let expected = self.current.take().unwrap_or(DanceMove::Clap);
        let correct = selected == Some(expected);

        let points = if correct {
            self.combo += 1;
            self.max_combo = self.max_combo.max(self.combo);
            self.energy = self
                .energy
                .saturating_add(self.config.energy_per_correct)
                .min(self.config.energy_cap);
            1 + self.combo / 3
        } else {
            self.combo = 0;
            self.energy = self
                .energy
                .saturating_add(self.config.energy_per_miss)
                .min(self.config.energy_cap);
            0
        };
        self.score = self.score.saturating_add(points);
        self.phase = EnergyPhase::Ready;

        let attempt = MoveAttempt {
            round: self.round,
            expected,
            selected,
            correct,
            points,
            combo: self.combo,
            energy: self.energy,
            at_ms: now_ms,
        };
        self.moves.record(attempt.clone());
        attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn running_game() -> (EnergyGame, StdRng) {
        let mut game = EnergyGame::new(EnergyConfig::default());
        assert!(game.start());
        (game, StdRng::seed_from_u64(42))
    }

    /// Show a move, open the window, and answer it (correctly or not).
    fn play_round(game: &mut EnergyGame, rng: &mut StdRng, correct: bool) -> MoveAttempt {
        let (round, shown) = game.begin_round(rng).unwrap();
        assert!(game.open_response(round));
        let answer = if correct {
            shown
        } else {
            *DanceMove::ALL.iter().find(|m| **m != shown).unwrap()
        };
        game.respond(answer, u64::from(round) * 8_000).unwrap()
    }

    #[test]
    fn third_consecutive_hit_earns_combo_bonus() {
        let (mut game, mut rng) = running_game();

        let points: Vec<u32> = (0..3)
            .map(|_| play_round(&mut game, &mut rng, true).points)
            .collect();
        assert_eq!(points, vec![1, 1, 2]);
        assert_eq!(game.combo(), 3);
        assert_eq!(game.score(), 4);

        let miss = play_round(&mut game, &mut rng, false);
        assert_eq!(miss.points, 0);
        assert_eq!(game.combo(), 0);

        assert_eq!(play_round(&mut game, &mut rng, true).points, 1);
    }

    #[test]
    fn energy_accumulates_and_caps() {
        let (mut game, mut rng) = running_game();
        play_round(&mut game, &mut rng, true);
        play_round(&mut game, &mut rng, false);
        assert_eq!(game.energy(), 25);

        for _ in 0..20 {
            play_round(&mut game, &mut rng, true);
        }
        assert_eq!(game.energy(), 200);
    }

    #[test]
    fn responses_outside_window_are_ignored() {
        let (mut game, mut rng) = running_game();
        assert!(game.respond(DanceMove::Clap, 0).is_none());

        let (round, shown) = game.begin_round(&mut rng).unwrap();
        assert!(game.respond(shown, 100).is_none());
        assert!(game.begin_round(&mut rng).is_none());

        assert!(game.open_response(round));
        assert!(game.respond(shown, 3_500).is_some());
        assert!(game.respond(shown, 3_600).is_none());
    }

    #[test]
    fn timeout_counts_as_miss_only_when_unanswered() {
        let (mut game, mut rng) = running_game();
        play_round(&mut game, &mut rng, true);
        play_round(&mut game, &mut rng, true);

        let (round, _) = game.begin_round(&mut rng).unwrap();
        game.open_response(round);
        let timed_out = game.timeout(round, 30_000).unwrap();
        assert_eq!(timed_out.selected, None);
        assert!(!timed_out.correct);
        assert_eq!(game.combo(), 0);

        // The stale timeout for an already-answered round does nothing.
        let answered = play_round(&mut game, &mut rng, true);
        assert!(game.timeout(answered.round, 40_000).is_none());
        assert_eq!(game.combo(), 1);
    }

    #[test]
    fn completion_discards_round_in_flight() {
        let (mut game, mut rng) = running_game();
        play_round(&mut game, &mut rng, true);
        let (round, shown) = game.begin_round(&mut rng).unwrap();
        game.open_response(round);

        let result = game.complete(90_000).unwrap();
        assert_eq!(result.total_moves, 1);
        assert_eq!(result.correct_moves, 1);
        assert_eq!(result.dance_accuracy, 10);
        assert_eq!(result.rhythm, 3);
        assert_eq!(result.movement_intensity, 1);

        assert!(game.respond(shown, 90_100).is_none());
        assert!(game.timeout(round, 90_200).is_none());
        assert!(game.complete(90_300).is_none());
    }

    #[test]
    fn empty_game_uses_neutral_accuracy() {
        let (mut game, _) = running_game();
        let result = game.complete(1_000).unwrap();
        assert_eq!(result.dance_accuracy, 5);
        assert_eq!(result.rhythm, 2);
        assert_eq!(result.movement_intensity, 1);
    }

    #[test]
    fn intensity_and_rhythm_clamp_to_ten() {
        let moves: Vec<MoveAttempt> = (1..=12)
            .map(|round| MoveAttempt {
                round,
                expected: DanceMove::Star,
                selected: Some(DanceMove::Star),
                correct: true,
                points: 1,
                combo: round,
                energy: 200,
                at_ms: u64::from(round) * 8_000,
            })
            .collect();
        let result = EnergyResult::from_moves(moves, 30, 12, 12, 200, 90_000);
        assert_eq!(result.rhythm, 10);
        assert_eq!(result.movement_intensity, 10);
        assert_eq!(result.dance_accuracy, 10);
    }

    #[test]
    fn rejects_energy_steps_above_cap() {
        let config = EnergyConfig {
            energy_per_correct: u32::MAX,
            ..EnergyConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig {
                kind: GameKind::Energy,
                ..
            })
        ));

        let no_cap = EnergyConfig {
            energy_cap: 0,
            energy_per_correct: 0,
            energy_per_miss: 0,
            ..EnergyConfig::default()
        };
        assert!(no_cap.validate().is_err());
        assert!(EnergyConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_windows_longer_than_an_hour() {
        let config = EnergyConfig {
            response_ms: crate::games::MAX_WINDOW_MS + 1,
            ..EnergyConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn energy_saturates_at_cap_without_overflow() {
        let mut game = EnergyGame::new(EnergyConfig {
            energy_per_correct: u32::MAX,
            energy_cap: u32::MAX,
            ..EnergyConfig::default()
        });
        assert!(game.start());
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..2 {
            let (round, shown) = game.begin_round(&mut rng).unwrap();
            assert!(game.open_response(round));
            assert!(game.respond(shown, 0).unwrap().correct);
        }
        assert_eq!(game.energy(), u32::MAX);
    }
}

use std::sync::Arc;

use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use tokio::{sync::Notify, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::games::{
    EnergyGame, EnergyPhase, FocusGame, GameKind, GameStatus, MemoryGame, MemoryPhase, RawResult,
};
use crate::session::GameSession;
use crate::settings::GameSettings;

/// The live state machine behind one arena slot.
#[derive(Debug)]
pub(crate) enum Machine {
    Focus(FocusGame),
    Energy(EnergyGame),
    Memory(MemoryGame),
}

impl Machine {
    pub(crate) fn new(kind: GameKind, settings: &GameSettings) -> Self {
        match kind {
            GameKind::Focus => Machine::Focus(FocusGame::new(settings.focus.clone())),
            GameKind::Energy => Machine::Energy(EnergyGame::new(settings.energy.clone())),
            GameKind::Memory => Machine::Memory(MemoryGame::new(settings.memory.clone())),
        }
    }

    pub(crate) fn start(&mut self) -> bool {
        match self {
            Machine::Focus(game) => game.start(),
            Machine::Energy(game) => game.start(),
            Machine::Memory(game) => game.start(),
        }
    }

    pub(crate) fn status(&self) -> GameStatus {
        match self {
            Machine::Focus(game) => game.status(),
            Machine::Energy(game) => game.status(),
            Machine::Memory(game) => game.status(),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.status() == GameStatus::Running
    }

    /// Countdown length for timed games; memory runs until its last round.
    pub(crate) fn duration_ms(&self) -> Option<u64> {
        match self {
            Machine::Focus(game) => Some(game.config().duration_ms),
            Machine::Energy(game) => Some(game.config().duration_ms),
            Machine::Memory(_) => None,
        }
    }

    pub(crate) fn complete(&mut self, now_ms: u64) -> Option<RawResult> {
        match self {
            Machine::Focus(game) => game.complete(now_ms).map(RawResult::Focus),
            Machine::Energy(game) => game.complete(now_ms).map(RawResult::Energy),
            Machine::Memory(game) => game.complete().map(RawResult::Memory),
        }
    }

    fn phase_label(&self) -> String {
        let label = match self {
            Machine::Focus(game) => match game.status() {
                GameStatus::Idle => "idle",
                GameStatus::Running => "running",
                GameStatus::Completed => "completed",
            },
            Machine::Energy(game) => match game.phase() {
                EnergyPhase::Ready => "ready",
                EnergyPhase::Showing => "showing",
                EnergyPhase::Responding => "responding",
                EnergyPhase::Completed => "completed",
            },
            Machine::Memory(game) => match game.phase() {
                MemoryPhase::Ready => "ready",
                MemoryPhase::Showing => "showing",
                MemoryPhase::Testing => "testing",
                MemoryPhase::Completed => "completed",
            },
        };
        label.to_string()
    }

    fn score(&self) -> u32 {
        match self {
            Machine::Focus(game) => game.score(),
            Machine::Energy(game) => game.score(),
            Machine::Memory(game) => game.correct_recalls(),
        }
    }

    fn round(&self) -> u32 {
        match self {
            Machine::Focus(_) => 0,
            Machine::Energy(game) => game.round(),
            Machine::Memory(game) => game.round(),
        }
    }
}

/// One arena: a machine plus everything needed to tell its timers apart from
/// those of an earlier play of the same kind.
#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) machine: Machine,
    pub(crate) generation: u64,
    pub(crate) cancel: CancellationToken,
    pub(crate) started: Instant,
    /// Wakes the round driver early when the player answers.
    pub(crate) wake: Arc<Notify>,
}

impl Slot {
    pub(crate) fn new(machine: Machine, generation: u64) -> Self {
        Self {
            machine,
            generation,
            cancel: CancellationToken::new(),
            started: Instant::now(),
            wake: Arc::new(Notify::new()),
        }
    }

    pub(crate) fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub(crate) fn is_live(&self, generation: u64) -> bool {
        self.generation == generation && !self.cancel.is_cancelled() && self.machine.is_running()
    }

    fn remaining_ms(&self) -> Option<u64> {
        let duration = self.machine.duration_ms()?;
        if !self.machine.is_running() {
            return Some(0);
        }
        Some(duration.saturating_sub(self.elapsed_ms()))
    }
}

/// Point-in-time view of one game slot.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub kind: GameKind,
    pub status: GameStatus,
    pub phase: String,
    pub score: u32,
    pub round: u32,
    /// `None` for untimed games.
    pub remaining_ms: Option<u64>,
    pub generation: u64,
}

impl GameSnapshot {
    pub(crate) fn idle(kind: GameKind) -> Self {
        Self {
            kind,
            status: GameStatus::Idle,
            phase: "idle".to_string(),
            score: 0,
            round: 0,
            remaining_ms: None,
            generation: 0,
        }
    }

    pub(crate) fn from_slot(kind: GameKind, slot: &Slot) -> Self {
        Self {
            kind,
            status: slot.machine.status(),
            phase: slot.machine.phase_label(),
            score: slot.machine.score(),
            round: slot.machine.round(),
            remaining_ms: slot.remaining_ms(),
            generation: slot.generation,
        }
    }
}

pub(crate) struct EngineState {
    pub(crate) session: GameSession,
    pub(crate) settings: GameSettings,
    pub(crate) slots: [Option<Slot>; 3],
    pub(crate) rng: StdRng,
    next_generation: u64,
}

impl EngineState {
    pub(crate) fn new(session: GameSession, settings: GameSettings) -> Self {
        let rng = match settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            session,
            settings,
            slots: [None, None, None],
            rng,
            next_generation: 1,
        }
    }

    pub(crate) fn bump_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    pub(crate) fn slot(&self, kind: GameKind) -> Option<&Slot> {
        self.slots[kind.index()].as_ref()
    }

    /// The slot for `kind`, only if it is still running under `generation`.
    pub(crate) fn live_slot_mut(&mut self, kind: GameKind, generation: u64) -> Option<&mut Slot> {
        self.slots[kind.index()]
            .as_mut()
            .filter(|slot| slot.is_live(generation))
    }

    pub(crate) fn live_slot_and_rng(
        &mut self,
        kind: GameKind,
        generation: u64,
    ) -> Option<(&mut Slot, &mut StdRng)> {
        let slot = self.slots[kind.index()]
            .as_mut()
            .filter(|slot| slot.is_live(generation))?;
        Some((slot, &mut self.rng))
    }

    /// Cancel every slot's timers and forget them.
    pub(crate) fn clear_slots(&mut self) {
        for slot in self.slots.iter_mut() {
            if let Some(slot) = slot.take() {
                slot.cancel.cancel();
            }
        }
    }

    /// Freeze the game in `kind`'s slot and store its result. The slot's
    /// token is cancelled before the result is written.
    pub(crate) fn finish_slot(&mut self, kind: GameKind, generation: u64) -> Option<RawResult> {
        let slot = self.live_slot_mut(kind, generation)?;
        let now_ms = slot.elapsed_ms();
        slot.cancel.cancel();
        let result = slot.machine.complete(now_ms)?;
        self.session.record_result(result.clone());
        Some(result)
    }
}

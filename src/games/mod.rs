//! The three behavioral mini-games as pure state machines.
//!
//! Machines never touch a clock or spawn work on their own. The engine feeds
//! them timestamps (milliseconds since the game started) and an RNG, and asks
//! them for the next transition. Every transition checks the machine's own
//! phase first, so a late timer or a stray response is a no-op rather than an
//! error.

pub mod energy;
pub mod focus;
pub mod memory;
pub mod recorder;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use energy::{DanceMove, EnergyConfig, EnergyGame, EnergyPhase, EnergyResult, MoveAttempt};
pub use focus::{
    FocusConfig, FocusGame, FocusResult, ReactionEvent, ReactionKind, Stimulus, StimulusKind,
};
pub use memory::{
    GridCell, MemoryConfig, MemoryGame, MemoryPhase, MemoryResult, RecallOutcome, Treasure,
};
pub use recorder::EventRecorder;

use crate::error::{EngineError, EngineResult};

/// Longest accepted value for any configured duration or window: one hour.
pub const MAX_WINDOW_MS: u64 = 60 * 60 * 1_000;

/// Reject a timing setting above [`MAX_WINDOW_MS`].
pub(crate) fn check_window(kind: GameKind, name: &str, value_ms: u64) -> EngineResult<()> {
    if value_ms > MAX_WINDOW_MS {
        return Err(EngineError::invalid_config(
            kind,
            format!("{name} of {value_ms}ms exceeds the {MAX_WINDOW_MS}ms limit"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum GameKind {
    Focus,
    Energy,
    Memory,
}

impl GameKind {
    pub const ALL: [GameKind; 3] = [GameKind::Focus, GameKind::Energy, GameKind::Memory];

    /// Slot index used by the engine's per-kind arena.
    pub fn index(self) -> usize {
        match self {
            GameKind::Focus => 0,
            GameKind::Energy => 1,
            GameKind::Memory => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::Focus => "focus",
            GameKind::Energy => "energy",
            GameKind::Memory => "memory",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    #[default]
    Idle,
    Running,
    Completed,
}

/// Frozen output of one completed game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RawResult {
    Focus(FocusResult),
    Energy(EnergyResult),
    Memory(MemoryResult),
}

impl RawResult {
    pub fn kind(&self) -> GameKind {
        match self {
            RawResult::Focus(_) => GameKind::Focus,
            RawResult::Energy(_) => GameKind::Energy,
            RawResult::Memory(_) => GameKind::Memory,
        }
    }
}

/// A player interaction routed to one game.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    #[serde(rename_all = "camelCase")]
    Catch { stimulus_id: u64 },
    #[serde(rename_all = "camelCase")]
    Dance { dance_move: DanceMove },
    Recall { cell: GridCell },
}

impl Response {
    pub fn kind(&self) -> GameKind {
        match self {
            Response::Catch { .. } => GameKind::Focus,
            Response::Dance { .. } => GameKind::Energy,
            Response::Recall { .. } => GameKind::Memory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_serialize_lowercase_and_index_uniquely() {
        let json = serde_json::to_string(&GameKind::ALL).unwrap();
        assert_eq!(json, r#"["focus","energy","memory"]"#);

        let mut indices: Vec<usize> = GameKind::ALL.iter().map(|k| k.index()).collect();
        indices.dedup();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn responses_know_their_game() {
        assert_eq!(Response::Catch { stimulus_id: 1 }.kind(), GameKind::Focus);
        assert_eq!(
            Response::Dance {
                dance_move: DanceMove::Spin
            }
            .kind(),
            GameKind::Energy
        );
        assert_eq!(
            Response::Recall {
                cell: GridCell { col: 0, row: 0 }
            }
            .kind(),
            GameKind::Memory
        );
    }
}

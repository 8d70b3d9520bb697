use serde::Serialize;

use crate::games::{
    DanceMove, GameKind, GridCell, MoveAttempt, RawResult, ReactionEvent, RecallOutcome, Stimulus,
};
use crate::session::SessionReport;

/// Everything the engine tells its observers (UI, companion character,
/// loggers). Delivered over a broadcast channel; slow receivers may lag.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EngineEvent {
    #[serde(rename_all = "camelCase")]
    GameStarted { kind: GameKind, generation: u64 },
    #[serde(rename_all = "camelCase")]
    StimulusSpawned { stimulus: Stimulus },
    #[serde(rename_all = "camelCase")]
    StimulusResolved {
        stimulus_id: u64,
        reaction: ReactionEvent,
    },
    #[serde(rename_all = "camelCase")]
    DanceMoveShown {
        round: u32,
        dance_move: DanceMove,
        instruction: &'static str,
    },
    #[serde(rename_all = "camelCase")]
    ResponseWindowOpened { round: u32 },
    #[serde(rename_all = "camelCase")]
    MoveScored { attempt: MoveAttempt },
    #[serde(rename_all = "camelCase")]
    MemoryRoundShown { round: u32, cells: Vec<GridCell> },
    #[serde(rename_all = "camelCase")]
    MemoryTestingStarted { round: u32 },
    #[serde(rename_all = "camelCase")]
    RecallScored { cell: GridCell, outcome: RecallOutcome },
    #[serde(rename_all = "camelCase")]
    CountdownTick { kind: GameKind, remaining_ms: u64 },
    #[serde(rename_all = "camelCase")]
    GameCompleted { kind: GameKind, result: RawResult },
    #[serde(rename_all = "camelCase")]
    GameAbandoned { kind: GameKind },
    #[serde(rename_all = "camelCase")]
    SessionFinalized { report: Box<SessionReport> },
}

//! "Treasure Recall": treasures are shown on a grid, hidden, then recalled by
//! position. Measures spatial working memory.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::{check_window, GameKind, GameStatus};

const MAX_PLACEMENT_ATTEMPTS: u32 = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryConfig {
    pub max_rounds: u32,
    pub grid_columns: u8,
    pub grid_rows: u8,
    pub base_items: u32,
    pub max_items: u32,
    /// Study time is `base_show_ms + round * show_ms_per_round`.
    pub base_show_ms: u64,
    pub show_ms_per_round: u64,
    pub round_gap_ms: u64,
    /// Redraws allowed per treasure before an overlapping cell is accepted.
    pub placement_attempts: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_rounds: 4,
            grid_columns: 4,
            grid_rows: 3,
            base_items: 3,
            max_items: 6,
            base_show_ms: 3_000,
            show_ms_per_round: 1_000,
            round_gap_ms: 1_000,
            placement_attempts: 20,
        }
    }
}

impl MemoryConfig {
    pub fn validate(&self) -> EngineResult<()> {
        let kind = GameKind::Memory;
        if self.max_rounds == 0 {
            return Err(EngineError::invalid_config(kind, "at least one round is required"));
        }
        if self.grid_columns == 0 || self.grid_rows == 0 {
            return Err(EngineError::invalid_config(kind, "grid must have at least one cell"));
        }
        if self.base_items == 0 || self.max_items < self.base_items {
            return Err(EngineError::invalid_config(
                kind,
                format!(
                    "item counts base={} max={} are inconsistent",
                    self.base_items, self.max_items
                ),
            ));
        }
        let cells = u32::from(self.grid_columns) * u32::from(self.grid_rows);
        if self.max_items > cells {
            return Err(EngineError::invalid_config(
                kind,
                format!("{} items do not fit on a grid of {} cells", self.max_items, cells),
            ));
        }
        if self.placement_attempts == 0 || self.placement_attempts > MAX_PLACEMENT_ATTEMPTS {
            return Err(EngineError::invalid_config(
                kind,
                format!(
                    "placement attempts {} outside [1, {}]",
                    self.placement_attempts, MAX_PLACEMENT_ATTEMPTS
                ),
            ));
        }
        if self.base_show_ms == 0 {
            return Err(EngineError::invalid_config(kind, "study time must be greater than zero"));
        }
        check_window(kind, "study time", self.show_duration_ms(self.max_rounds))?;
        check_window(kind, "round gap", self.round_gap_ms)?;
        Ok(())
    }

    pub fn items_for_round(&self, round: u32) -> u32 {
        self.base_items.saturating_add(round / 2).min(self.max_items)
    }

    pub fn show_duration_ms(&self, round: u32) -> u64 {
        self.show_ms_per_round
            .saturating_mul(u64::from(round))
            .saturating_add(self.base_show_ms)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    pub col: u8,
    pub row: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Treasure {
    pub id: u64,
    pub cell: GridCell,
    pub found: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum MemoryPhase {
    #[default]
    Ready,
    Showing,
    Testing,
    Completed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum RecallOutcome {
    /// Not in the testing phase, or the game is over.
    Ignored,
    /// Every treasure in the cell was already found.
    AlreadyFound,
    /// Nothing was hidden there.
    #[serde(rename_all = "camelCase")]
    Miss { round: u32 },
    #[serde(rename_all = "camelCase")]
    Found {
        round: u32,
        treasure_id: u64,
        round_complete: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryResult {
    pub correct_recalls: u32,
    pub total_attempts: u32,
    pub rounds_completed: u32,
    /// One position set per round reached, in round order.
    pub patterns: Vec<Vec<GridCell>>,
}

#[derive(Debug, Clone)]
pub struct MemoryGame {
    config: MemoryConfig,
    status: GameStatus,
    phase: MemoryPhase,
    round: u32,
    next_id: u64,
    treasures: Vec<Treasure>,
    correct_recalls: u32,
    total_attempts: u32,
    rounds_completed: u32,
    patterns: Vec<Vec<GridCell>>,
}

impl MemoryGame {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            status: GameStatus::Idle,
            phase: MemoryPhase::Ready,
            round: 0,
            next_id: 1,
            treasures: Vec::new(),
            correct_recalls: 0,
            total_attempts: 0,
            rounds_completed: 0,
            patterns: Vec::new(),
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn phase(&self) -> MemoryPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.status == GameStatus::Running
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn treasures(&self) -> &[Treasure] {
        &self.treasures
    }

    pub fn correct_recalls(&self) -> u32 {
        self.correct_recalls
    }

    pub fn total_attempts(&self) -> u32 {
        self.total_attempts
    }

    /// True once the last round's treasures have all been found.
    pub fn finished_all_rounds(&self) -> bool {
        self.rounds_completed >= self.config.max_rounds
    }

    pub fn start(&mut self) -> bool {
        if self.status != GameStatus::Idle {
            return false;
        }
        self.status = GameStatus::Running;
        self.phase = MemoryPhase::Ready;
        true
    }

    /// Lay out the next round's treasures and enter the showing phase.
    pub fn generate_round<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<(u32, Vec<GridCell>)> {
        if !self.is_running() || self.phase != MemoryPhase::Ready || self.finished_all_rounds() {
            return None;
        }
        self.round += 1;

        let count = self.config.items_for_round(self.round);
        let mut cells: Vec<GridCell> = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let cell = self.place(&cells, rng);
            cells.push(cell);
        }

        self.treasures = cells
            .iter()
            .map(|&cell| {
                let id = self.next_id;
                self.next_id += 1;
                Treasure {
                    id,
                    cell,
                    found: false,
                }
            })
            .collect();
        self.patterns.push(cells.clone());
        self.phase = MemoryPhase::Showing;
        Some((self.round, cells))
    }

    /// Hide the treasures of `round` and start accepting selections.
    pub fn begin_testing(&mut self, round: u32) -> bool {
        if !self.is_running() || self.phase != MemoryPhase::Showing || self.round != round {
            return false;
        }
        self.phase = MemoryPhase::Testing;
        true
    }

    pub fn select(&mut self, cell: GridCell) -> RecallOutcome {
        if !self.is_running() || self.phase != MemoryPhase::Testing {
            return RecallOutcome::Ignored;
        }

        let mut in_cell = self.treasures.iter_mut().filter(|t| t.cell == cell).peekable();
        if in_cell.peek().is_none() {
            self.total_attempts += 1;
            return RecallOutcome::Miss { round: self.round };
        }

        let Some(treasure) = in_cell.find(|t| !t.found) else {
            return RecallOutcome::AlreadyFound;
        };
        treasure.found = true;
        let treasure_id = treasure.id;

        self.correct_recalls += 1;
        self.total_attempts += 1;

        let round_complete = self.treasures.iter().all(|t| t.found);
        if round_complete {
            self.rounds_completed += 1;
            self.phase = MemoryPhase::Ready;
        }

        RecallOutcome::Found {
            round: self.round,
            treasure_id,
            round_complete,
        }
    }

    pub fn complete(&mut self) -> Option<MemoryResult> {
        if !self.is_running() {
            return None;
        }
        self.status = GameStatus::Completed;
        self.phase = MemoryPhase::Completed;

        Some(MemoryResult {
            correct_recalls: self.correct_recalls,
            total_attempts: self.total_attempts,
            rounds_completed: self.rounds_completed,
            patterns: std::mem::take(&mut self.patterns),
        })
    }

    fn place<R: Rng + ?Sized>(&self, taken: &[GridCell], rng: &mut R) -> GridCell {
        let mut cell = self.random_cell(rng);
        let mut attempts = 1;
        while taken.contains(&cell) && attempts < self.config.placement_attempts {
            cell = self.random_cell(rng);
            attempts += 1;
        }
        cell
    }

    fn random_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> GridCell {
        GridCell {
            col: rng.gen_range(0..self.config.grid_columns),
            row: rng.gen_range(0..self.config.grid_rows),
        }
    }
}

pub mod report;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::games::{GameKind, RawResult};

pub use report::{
    finalize, generate_recommendations, LastSessionScore, LatestAssessment, ProgressDelta,
    Recommendation, SessionReport, Urgency, GEMS_PER_SESSION, REPORT_VERSION,
};

const DEFAULT_CHILD_NAME: &str = "Child";
const DEFAULT_CHILD_AGE: u32 = 6;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChildProfile {
    pub child_id: String,
    pub child_name: String,
    pub child_age: u32,
}

impl ChildProfile {
    /// Blank names fall back to "Child" and a missing age to 6.
    pub fn new(
        child_id: impl Into<String>,
        child_name: Option<&str>,
        child_age: Option<u32>,
    ) -> Self {
        let child_name = child_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_CHILD_NAME)
            .to_string();

        Self {
            child_id: child_id.into(),
            child_name,
            child_age: child_age.unwrap_or(DEFAULT_CHILD_AGE),
        }
    }
}

/// One sitting: the child's context plus the latest result of every game
/// completed so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub session_id: String,
    pub child: ChildProfile,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub game_results: BTreeMap<GameKind, RawResult>,
    pub completion_order: Vec<GameKind>,
}

impl GameSession {
    pub fn new(child: ChildProfile, now: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            child,
            created_at: now,
            started_at: None,
            game_results: BTreeMap::new(),
            completion_order: Vec::new(),
        }
    }

    /// Record the first game start. Later starts (and replays) keep the
    /// original timestamp.
    pub fn mark_started(&mut self, now: DateTime<Utc>) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    /// Store a completed game's result, replacing any earlier result of the
    /// same kind.
    pub fn record_result(&mut self, result: RawResult) {
        let kind = result.kind();
        self.game_results.insert(kind, result);
        self.completion_order.retain(|k| *k != kind);
        self.completion_order.push(kind);
    }

    pub fn result(&self, kind: GameKind) -> Option<&RawResult> {
        self.game_results.get(&kind)
    }

    pub fn completed_count(&self) -> usize {
        self.game_results.len()
    }

    pub fn is_completed(&self, kind: GameKind) -> bool {
        self.game_results.contains_key(&kind)
    }

    pub fn duration_ms(&self, now: DateTime<Utc>) -> u64 {
        let from = self.started_at.unwrap_or(self.created_at);
        (now - from).num_milliseconds().max(0) as u64
    }
}

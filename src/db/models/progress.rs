//! Per-child counters maintained across sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{LastSessionScore, LatestAssessment};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChildProgress {
    pub child_id: String,
    pub child_name: String,
    pub total_gems: u64,
    pub daily_tests_completed: u64,
    pub sessions_completed: u64,
    pub total_time_spent_secs: u64,
    pub last_session_score: Option<LastSessionScore>,
    /// Absent for rows written before the assessment column existed.
    pub latest_assessment: Option<LatestAssessment>,
    pub last_active_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

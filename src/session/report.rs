use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::games::{GameKind, RawResult};
use crate::scoring::{score_result, BehavioralScore};

use super::GameSession;

pub const REPORT_VERSION: &str = "3.1";

/// Gems awarded for finishing a sitting, regardless of how many games ran.
pub const GEMS_PER_SESSION: u32 = 15;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Urgency {
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub area: GameKind,
    pub suggestion: String,
    pub activity: String,
    pub urgency: Urgency,
}

/// Immutable record of one finished sitting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub session_id: String,
    /// Human-readable day, e.g. `Mon Oct 19 2026`.
    pub date: String,
    pub timestamp: DateTime<Utc>,
    pub child_id: String,
    pub child_name: String,
    pub child_age: u32,
    pub raw_results: BTreeMap<GameKind, RawResult>,
    /// Only kinds that have a raw result; absent kinds are never filled in.
    pub behavioral_scores: BTreeMap<GameKind, BehavioralScore>,
    pub session_duration_ms: u64,
    pub game_completion_order: Vec<GameKind>,
    pub recommendations: Vec<Recommendation>,
    pub version: String,
}

impl SessionReport {
    /// Storage key: one document per child per finalize.
    pub fn storage_key(&self) -> String {
        format!("{}_{}", self.child_id, self.timestamp.timestamp_millis())
    }

    pub fn score(&self, kind: GameKind) -> Option<u8> {
        self.behavioral_scores.get(&kind).map(|s| s.overall)
    }
}

/// Close out a session. Works with any number of completed games, including
/// none (empty scores, no recommendations).
pub fn finalize(session: &GameSession, now: DateTime<Utc>) -> SessionReport {
    let behavioral_scores: BTreeMap<GameKind, BehavioralScore> = session
        .game_results
        .iter()
        .map(|(kind, result)| (*kind, score_result(result)))
        .collect();
    let recommendations = generate_recommendations(&behavioral_scores);

    SessionReport {
        session_id: session.session_id.clone(),
        date: now.format("%a %b %d %Y").to_string(),
        timestamp: now,
        child_id: session.child.child_id.clone(),
        child_name: session.child.child_name.clone(),
        child_age: session.child.child_age,
        raw_results: session.game_results.clone(),
        behavioral_scores,
        session_duration_ms: session.duration_ms(now),
        game_completion_order: session.completion_order.clone(),
        recommendations,
        version: REPORT_VERSION.to_string(),
    }
}

/// Rule table, evaluated independently per area. Areas without a score are
/// skipped.
pub fn generate_recommendations(
    scores: &BTreeMap<GameKind, BehavioralScore>,
) -> Vec<Recommendation> {
    let overall = |kind: GameKind| scores.get(&kind).map(|s| s.overall);
    let mut recommendations = Vec::new();

    if overall(GameKind::Focus).is_some_and(|s| s <= 5) {
        recommendations.push(Recommendation {
            area: GameKind::Focus,
            suggestion: "Break tasks into smaller chunks and use visual cues".into(),
            activity: "Short 10-minute focused games with Pink Teddy".into(),
            urgency: Urgency::High,
        });
    }

    if overall(GameKind::Energy).is_some_and(|s| s >= 8) {
        recommendations.push(Recommendation {
            area: GameKind::Energy,
            suggestion: "Include physical activity breaks every 20 minutes".into(),
            activity: "Dance sessions and movement games with Pink Teddy".into(),
            urgency: Urgency::Medium,
        });
    }

    if overall(GameKind::Memory).is_some_and(|s| s <= 5) {
        recommendations.push(Recommendation {
            area: GameKind::Memory,
            suggestion: "Use repetition and visual memory techniques".into(),
            activity: "Memory games and story recall with Pink Teddy".into(),
            urgency: Urgency::Medium,
        });
    }

    recommendations
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LastSessionScore {
    pub focus: Option<u8>,
    pub energy: Option<u8>,
    pub memory: Option<u8>,
    pub session_id: String,
    pub date: String,
    pub timestamp: DateTime<Utc>,
}

/// The parts of the newest report a dashboard shows without loading the
/// report itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LatestAssessment {
    pub behavioral_scores: BTreeMap<GameKind, BehavioralScore>,
    pub recommendations: Vec<Recommendation>,
    pub date: String,
    pub session_duration_ms: u64,
}

/// Incremental counters applied to a child's progress after a finalize.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDelta {
    pub child_name: String,
    pub gems: u32,
    pub daily_tests_completed: u32,
    pub sessions_completed: u32,
    pub time_spent_secs: u64,
    pub last_session_score: LastSessionScore,
    pub latest_assessment: LatestAssessment,
}

impl ProgressDelta {
    pub fn from_report(report: &SessionReport) -> Self {
        Self {
            child_name: report.child_name.clone(),
            gems: GEMS_PER_SESSION,
            daily_tests_completed: 1,
            sessions_completed: 1,
            time_spent_secs: (report.session_duration_ms + 500) / 1_000,
            last_session_score: LastSessionScore {
                focus: report.score(GameKind::Focus),
                energy: report.score(GameKind::Energy),
                memory: report.score(GameKind::Memory),
                session_id: report.storage_key(),
                date: report.date.clone(),
                timestamp: report.timestamp,
            },
            latest_assessment: LatestAssessment {
                behavioral_scores: report.behavioral_scores.clone(),
                recommendations: report.recommendations.clone(),
                date: report.date.clone(),
                session_duration_ms: report.session_duration_ms,
            },
        }
    }
}

//! Parent-facing summaries over a child's stored reports.
//!
//! This is the only place a missing area is read as the neutral score 5;
//! stored reports never contain filled-in scores for games that did not run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::games::GameKind;
use crate::scoring::NEUTRAL_SCORE;
use crate::session::SessionReport;

const LOW_RISK_FLOOR: u8 = 8;
const MEDIUM_RISK_FLOOR: u8 = 6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrendDirection {
    Improving,
    Declining,
    Steady,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RiskLevel {
    Low,
    Medium,
    NeedsAttention,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        if score >= LOW_RISK_FLOOR {
            RiskLevel::Low
        } else if score >= MEDIUM_RISK_FLOOR {
            RiskLevel::Medium
        } else {
            RiskLevel::NeedsAttention
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AreaInsight {
    pub latest: u8,
    /// Score from the session before the latest, if there was one.
    pub previous: Option<u8>,
    pub average: f64,
    pub trend: TrendDirection,
    pub risk: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub sessions_considered: usize,
    pub last_session_at: Option<DateTime<Utc>>,
    pub areas: BTreeMap<GameKind, AreaInsight>,
}

/// Summarize reports in any order; the newest one counts as "latest".
/// An empty history yields an empty summary.
pub fn summarize_history(reports: &[SessionReport]) -> HistorySummary {
    let mut newest_first: Vec<&SessionReport> = reports.iter().collect();
    newest_first.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let Some(latest) = newest_first.first() else {
        return HistorySummary::default();
    };

    let areas = GameKind::ALL
        .iter()
        .map(|&kind| {
            let scores: Vec<u8> = newest_first
                .iter()
                .map(|report| area_score(report, kind))
                .collect();
            (kind, area_insight(&scores))
        })
        .collect();

    HistorySummary {
        sessions_considered: newest_first.len(),
        last_session_at: Some(latest.timestamp),
        areas,
    }
}

fn area_score(report: &SessionReport, kind: GameKind) -> u8 {
    report.score(kind).unwrap_or(NEUTRAL_SCORE)
}

/// `scores` is newest first and non-empty.
fn area_insight(scores: &[u8]) -> AreaInsight {
    let latest = scores.first().copied().unwrap_or(NEUTRAL_SCORE);
    let previous = scores.get(1).copied();
    let average = if scores.is_empty() {
        f64::from(NEUTRAL_SCORE)
    } else {
        scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64
    };

    let trend = match previous {
        Some(previous) if latest > previous => TrendDirection::Improving,
        Some(previous) if latest < previous => TrendDirection::Declining,
        _ => TrendDirection::Steady,
    };

    AreaInsight {
        latest,
        previous,
        average,
        trend,
        risk: RiskLevel::from_score(latest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::{EnergyResult, MemoryResult, RawResult};
    use crate::session::{finalize, ChildProfile, GameSession};
    use chrono::{Duration, TimeZone};

    fn memory(correct: u32, attempts: u32) -> RawResult {
        RawResult::Memory(MemoryResult {
            correct_recalls: correct,
            total_attempts: attempts,
            rounds_completed: 4,
            patterns: Vec::new(),
        })
    }

    fn energy(level: u32) -> RawResult {
        RawResult::Energy(EnergyResult {
            score: 10,
            dance_accuracy: level,
            rhythm: level,
            movement_intensity: level,
            total_moves: 10,
            correct_moves: level,
            final_combo: 0,
            max_combo: 0,
            energy_level: 100,
            game_time_ms: 90_000,
            moves: Vec::new(),
        })
    }

    fn report(day: i64, results: Vec<RawResult>) -> SessionReport {
        let at = Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap() + Duration::days(day);
        let mut session = GameSession::new(ChildProfile::new("kid-1", None, None), at);
        for result in results {
            session.record_result(result);
        }
        finalize(&session, at)
    }

    #[test]
    fn empty_history_has_no_areas() {
        let summary = summarize_history(&[]);
        assert_eq!(summary.sessions_considered, 0);
        assert!(summary.areas.is_empty());
        assert!(summary.last_session_at.is_none());
    }

    #[test]
    fn trend_compares_latest_with_previous_regardless_of_input_order() {
        let reports = vec![
            report(2, vec![memory(9, 10), energy(6)]),
            report(1, vec![memory(6, 10), energy(8)]),
        ];
        let summary = summarize_history(&[reports[1].clone(), reports[0].clone()]);

        let memory = &summary.areas[&GameKind::Memory];
        assert_eq!(memory.latest, 9);
        assert_eq!(memory.previous, Some(6));
        assert_eq!(memory.trend, TrendDirection::Improving);
        assert_eq!(memory.risk, RiskLevel::Low);
        assert!((memory.average - 7.5).abs() < f64::EPSILON);

        let energy = &summary.areas[&GameKind::Energy];
        assert_eq!(energy.trend, TrendDirection::Declining);
        assert_eq!(energy.risk, RiskLevel::Medium);
        assert_eq!(summary.last_session_at, Some(reports[0].timestamp));
    }

    #[test]
    fn absent_areas_read_as_neutral() {
        let summary = summarize_history(&[report(0, vec![energy(9)])]);
        let focus = &summary.areas[&GameKind::Focus];
        assert_eq!(focus.latest, NEUTRAL_SCORE);
        assert_eq!(focus.previous, None);
        assert_eq!(focus.trend, TrendDirection::Steady);
        assert_eq!(focus.risk, RiskLevel::NeedsAttention);
    }
}

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    helpers::{parse_datetime, parse_optional_json, to_i64, to_u64},
    models::ChildProgress,
    Database,
};
use crate::session::ProgressDelta;

fn row_to_progress(row: &Row) -> Result<ChildProgress> {
    let last_session_score: Option<String> = row.get("last_session_score")?;
    let latest_assessment: Option<String> = row.get("latest_assessment")?;
    let last_active_at: String = row.get("last_active_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(ChildProgress {
        child_id: row.get("child_id")?,
        child_name: row.get("child_name")?,
        total_gems: to_u64(row.get("total_gems")?, "total_gems")?,
        daily_tests_completed: to_u64(
            row.get("daily_tests_completed")?,
            "daily_tests_completed",
        )?,
        sessions_completed: to_u64(row.get("sessions_completed")?, "sessions_completed")?,
        total_time_spent_secs: to_u64(
            row.get("total_time_spent_secs")?,
            "total_time_spent_secs",
        )?,
        last_session_score: parse_optional_json(last_session_score, "last_session_score")?,
        latest_assessment: parse_optional_json(latest_assessment, "latest_assessment")?,
        last_active_at: parse_datetime(&last_active_at, "last_active_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    /// Add `delta` to the child's counters, creating the row on first use.
    /// The name, last-session snapshot and latest assessment are replaced,
    /// not accumulated.
    pub async fn apply_progress(&self, child_id: &str, delta: &ProgressDelta) -> Result<()> {
        let child_id = child_id.to_string();
        let delta = delta.clone();
        let snapshot = serde_json::to_string(&delta.last_session_score)
            .context("failed to encode last session score")?;
        let assessment = serde_json::to_string(&delta.latest_assessment)
            .context("failed to encode latest assessment")?;

        self.execute(move |conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO child_progress (
                     child_id, child_name, total_gems, daily_tests_completed,
                     sessions_completed, total_time_spent_secs, last_session_score,
                     latest_assessment, last_active_at, updated_at
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(child_id) DO UPDATE SET
                     child_name = excluded.child_name,
                     total_gems = total_gems + excluded.total_gems,
                     daily_tests_completed = daily_tests_completed + excluded.daily_tests_completed,
                     sessions_completed = sessions_completed + excluded.sessions_completed,
                     total_time_spent_secs = total_time_spent_secs + excluded.total_time_spent_secs,
                     last_session_score = excluded.last_session_score,
                     latest_assessment = excluded.latest_assessment,
                     last_active_at = excluded.last_active_at,
                     updated_at = excluded.updated_at",
                params![
                    child_id,
                    delta.child_name,
                    i64::from(delta.gems),
                    i64::from(delta.daily_tests_completed),
                    i64::from(delta.sessions_completed),
                    to_i64(delta.time_spent_secs)?,
                    snapshot,
                    assessment,
                    delta.last_session_score.timestamp.to_rfc3339(),
                    now,
                ],
            )
            .with_context(|| format!("failed to update progress for {child_id}"))?;
            Ok(())
        })
        .await
    }

    pub async fn get_progress(&self, child_id: &str) -> Result<Option<ChildProgress>> {
        let child_id = child_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT child_id, child_name, total_gems, daily_tests_completed,
                        sessions_completed, total_time_spent_secs, last_session_score,
                        latest_assessment, last_active_at, updated_at
                 FROM child_progress
                 WHERE child_id = ?1",
            )?;

            let progress = stmt
                .query_row(params![child_id], |row| Ok(row_to_progress(row)))
                .optional()?
                .transpose()?;
            Ok(progress)
        })
        .await
    }
}

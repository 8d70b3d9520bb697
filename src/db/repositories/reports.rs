use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::db::{helpers::to_i64, Database};
use crate::session::SessionReport;

fn decode_report(payload: &str) -> Result<SessionReport> {
    serde_json::from_str(payload).context("failed to decode stored session report")
}

impl Database {
    /// Store a finalized report under its `childId_timestampMillis` key.
    /// Saving the same key again replaces the stored document.
    pub async fn insert_report(&self, report: &SessionReport) -> Result<()> {
        let id = report.storage_key();
        let payload = serde_json::to_string(report).context("failed to encode session report")?;
        let session_id = report.session_id.clone();
        let child_id = report.child_id.clone();
        let date = report.date.clone();
        let timestamp = report.timestamp;
        let duration_ms = report.session_duration_ms;
        let games_completed = report.raw_results.len() as i64;

        self.execute(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO session_reports (
                     id, session_id, child_id, report_date, timestamp, timestamp_ms,
                     session_duration_ms, games_completed, payload, created_at
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id,
                    session_id,
                    child_id,
                    date,
                    timestamp.to_rfc3339(),
                    timestamp.timestamp_millis(),
                    to_i64(duration_ms)?,
                    games_completed,
                    payload,
                    Utc::now().to_rfc3339(),
                ],
            )
            .with_context(|| format!("failed to insert session report {id}"))?;
            Ok(())
        })
        .await
    }

    pub async fn get_report(&self, report_id: &str) -> Result<Option<SessionReport>> {
        let report_id = report_id.to_string();
        self.execute(move |conn| {
            let payload: Option<String> = conn
                .query_row(
                    "SELECT payload FROM session_reports WHERE id = ?1",
                    params![report_id],
                    |row| row.get(0),
                )
                .optional()?;

            payload.as_deref().map(decode_report).transpose()
        })
        .await
    }

    /// Newest first, at most `limit` reports.
    pub async fn list_recent_reports(
        &self,
        child_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionReport>> {
        let child_id = child_id.to_string();
        let limit = limit as i64;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT payload
                 FROM session_reports
                 WHERE child_id = ?1
                 ORDER BY timestamp_ms DESC
                 LIMIT ?2",
            )?;

            let mut rows = stmt.query(params![child_id, limit])?;
            let mut reports = Vec::new();
            while let Some(row) = rows.next()? {
                let payload: String = row.get(0)?;
                reports.push(decode_report(&payload)?);
            }

            Ok(reports)
        })
        .await
    }

    pub async fn delete_reports_for_child(&self, child_id: &str) -> Result<usize> {
        let child_id = child_id.to_string();
        self.execute(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM session_reports WHERE child_id = ?1",
                params![child_id],
            )?;
            Ok(deleted)
        })
        .await
    }
}

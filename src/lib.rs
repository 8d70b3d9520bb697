pub mod audio;
pub mod db;
pub mod engine;
pub mod error;
pub mod games;
pub mod insights;
pub mod persistence;
pub mod scoring;
pub mod session;
pub mod settings;
pub mod utils;

use std::{path::Path, sync::Arc};

use anyhow::Result;

pub use audio::{SilentTones, ToneSink};
pub use db::Database;
pub use engine::{EngineEvent, GameEngine, GameSnapshot};
pub use error::{EngineError, EngineResult};
pub use games::{GameKind, RawResult, Response};
pub use insights::{summarize_history, HistorySummary};
pub use persistence::ReportStore;
pub use session::{ChildProfile, SessionReport};
pub use settings::{GameSettings, SettingsStore};
pub use utils::init_logging;

/// Device-wide handles: the report database, persisted settings and the
/// audio output. Each sitting gets its own [`GameEngine`] from here.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Arc<SettingsStore>,
    tones: Arc<dyn ToneSink>,
}

impl AppState {
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;

        let db = Database::new(data_dir.join("teddy-games.sqlite3"))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;

        Ok(Self {
            db,
            settings: Arc::new(settings),
            tones: default_tones(),
        })
    }

    /// New engine for `child`, using the settings as they are right now.
    pub fn start_session(&self, child: ChildProfile) -> GameEngine {
        GameEngine::new(
            child,
            self.settings.game_settings(),
            Some(Arc::new(self.db.clone())),
            self.tones.clone(),
        )
    }

    /// Dashboard view over the child's `limit` most recent reports.
    pub async fn history(&self, child_id: &str, limit: usize) -> Result<HistorySummary> {
        let reports = self.db.list_recent_reports(child_id, limit).await?;
        Ok(summarize_history(&reports))
    }
}

#[cfg(feature = "audio")]
fn default_tones() -> Arc<dyn ToneSink> {
    Arc::new(audio::ToneEngineHandle::new())
}

#[cfg(not(feature = "audio"))]
fn default_tones() -> Arc<dyn ToneSink> {
    Arc::new(SilentTones)
}

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};

use crate::audio::{
    ToneCue, ToneSink, Waveform, GAME_COMPLETE_CUE, GAME_START_CUE, SESSION_FINISHED_CUE,
    TREASURE_FOUND_CUE, WRONG_MOVE_CUE,
};
use crate::error::{EngineError, EngineResult};
use crate::games::{
    DanceMove, GameKind, GridCell, RawResult, ReactionKind, RecallOutcome, Response, StimulusKind,
};
use crate::persistence::ReportStore;
use crate::session::{finalize, ChildProfile, GameSession, ProgressDelta, SessionReport};
use crate::settings::GameSettings;
use crate::{log_debug, log_error, log_info, log_warn};

use super::drivers;
use super::events::EngineEvent;
use super::state::{EngineState, GameSnapshot, Machine, Slot};

const ENABLE_LOGS: bool = true;
const EVENT_CHANNEL_CAPACITY: usize = 256;
const CATCH_CUE_MS: u64 = 200;

/// Runs one child's sitting: starts and replays games, routes responses,
/// and closes the session into a report.
///
/// Cloning is cheap; all clones drive the same session.
#[derive(Clone)]
pub struct GameEngine {
    pub(super) state: Arc<Mutex<EngineState>>,
    store: Option<Arc<dyn ReportStore>>,
    pub(super) tones: Arc<dyn ToneSink>,
    events: broadcast::Sender<EngineEvent>,
    pub(super) tick_log_every: u32,
}

impl GameEngine {
    pub fn new(
        child: ChildProfile,
        settings: GameSettings,
        store: Option<Arc<dyn ReportStore>>,
        tones: Arc<dyn ToneSink>,
    ) -> Self {
        let debug_mode = std::env::var("TEDDY_GAMES_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let session = GameSession::new(child, Utc::now());

        Self {
            state: Arc::new(Mutex::new(EngineState::new(session, settings))),
            store,
            tones,
            events,
            tick_log_every: if debug_mode { 1 } else { 10 },
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub async fn session(&self) -> GameSession {
        self.state.lock().await.session.clone()
    }

    /// Replace the settings used by the next `start_game`. Games already
    /// running keep the configuration they started with.
    pub async fn update_settings(&self, settings: GameSettings) -> EngineResult<()> {
        settings.validate()?;
        self.state.lock().await.settings = settings;
        Ok(())
    }

    /// Start (or replay) `kind`. Any earlier play of the same kind is
    /// cancelled first; its timers become no-ops. Returns the new
    /// generation number.
    pub async fn start_game(&self, kind: GameKind) -> EngineResult<u64> {
        let (generation, slot_token, started, settings) = {
            let mut state = self.state.lock().await;
            state.settings.validate_kind(kind)?;

            if let Some(previous) = state.slots[kind.index()].take() {
                previous.cancel.cancel();
                log_info!(
                    "replaying {} game, cancelled generation {}",
                    kind,
                    previous.generation
                );
            }

            state.session.mark_started(Utc::now());
            let generation = state.bump_generation();
            let mut machine = Machine::new(kind, &state.settings);
            machine.start();

            let slot = Slot::new(machine, generation);
            let token = slot.cancel.clone();
            let started = slot.started;
            state.slots[kind.index()] = Some(slot);
            (generation, token, started, state.settings.clone())
        };

        log_info!("{} game started (generation {})", kind, generation);
        self.tones.play_cue(GAME_START_CUE);
        self.emit(EngineEvent::GameStarted { kind, generation });

        drivers::spawn_for(self.clone(), kind, generation, slot_token, started, settings);

        Ok(generation)
    }

    /// Route a player response to the live game of `kind`. Returns whether
    /// the response changed anything; late or misrouted responses are
    /// ignored.
    pub async fn record_response(&self, kind: GameKind, response: Response) -> bool {
        if response.kind() != kind {
            log_warn!("ignoring {:?} sent to {} game", response, kind);
            return false;
        }

        match response {
            Response::Catch { stimulus_id } => self.catch_stimulus(stimulus_id).await,
            Response::Dance { dance_move } => self.pick_move(dance_move).await,
            Response::Recall { cell } => self.recall_cell(cell).await,
        }
    }

    /// Stop a running game without recording a result. Returns `false` when
    /// nothing was running.
    pub async fn abandon_game(&self, kind: GameKind) -> bool {
        let abandoned = {
            let mut state = self.state.lock().await;
            let slot = &mut state.slots[kind.index()];
            match slot.take() {
                Some(live) if live.machine.is_running() => {
                    live.cancel.cancel();
                    true
                }
                other => {
                    *slot = other;
                    false
                }
            }
        };

        if abandoned {
            log_info!("{} game abandoned", kind);
            self.emit(EngineEvent::GameAbandoned { kind });
        }
        abandoned
    }

    pub async fn snapshot(&self, kind: GameKind) -> GameSnapshot {
        let state = self.state.lock().await;
        state
            .slot(kind)
            .map(|slot| GameSnapshot::from_slot(kind, slot))
            .unwrap_or_else(|| GameSnapshot::idle(kind))
    }

    /// Close the sitting. Running games are cancelled and contribute
    /// nothing. Persistence is best-effort: the report is returned even if
    /// saving fails, and a sitting with no completed game is neither saved
    /// nor credited. The engine then starts a fresh session for the same
    /// child.
    pub async fn finalize_session(&self) -> SessionReport {
        let report = {
            let mut state = self.state.lock().await;
            state.clear_slots();
            let now = Utc::now();
            let report = finalize(&state.session, now);
            state.session = GameSession::new(state.session.child.clone(), now);
            report
        };

        log_info!(
            "session {} finalized with {} game(s)",
            report.session_id,
            report.raw_results.len()
        );
        self.emit(EngineEvent::SessionFinalized {
            report: Box::new(report.clone()),
        });
        self.tones.play_cue(SESSION_FINISHED_CUE);

        if let Err(err) = self.persist(&report).await {
            log_error!("Failed to persist report {}: {}", report.storage_key(), err);
        }

        report
    }

    async fn persist(&self, report: &SessionReport) -> EngineResult<()> {
        let Some(store) = self.store.as_ref() else {
            log_debug!("no report store configured, skipping persistence");
            return Ok(());
        };
        if report.raw_results.is_empty() {
            log_debug!(
                "session {} has no completed games, nothing to persist",
                report.session_id
            );
            return Ok(());
        }

        store.save_report(report).await.map_err(EngineError::Persistence)?;
        store
            .update_progress(&report.child_id, &ProgressDelta::from_report(report))
            .await
            .map_err(EngineError::Persistence)
    }

    async fn catch_stimulus(&self, stimulus_id: u64) -> bool {
        let reaction = {
            let mut state = self.state.lock().await;
            let Some(slot) = state.slots[GameKind::Focus.index()].as_mut() else {
                return false;
            };
            let now_ms = slot.elapsed_ms();
            match &mut slot.machine {
                Machine::Focus(game) => game.respond(stimulus_id, now_ms),
                _ => None,
            }
        };

        let Some(reaction) = reaction else {
            return false;
        };

        let cue = match reaction.kind {
            ReactionKind::Normal => Some(StimulusKind::Normal),
            ReactionKind::Bonus => Some(StimulusKind::Bonus),
            ReactionKind::Missed => None,
        };
        if let Some(kind) = cue {
            self.tones
                .play_tone(kind.cue_frequency_hz(), CATCH_CUE_MS, Waveform::Triangle);
        }

        self.emit(EngineEvent::StimulusResolved {
            stimulus_id,
            reaction,
        });
        true
    }

    async fn pick_move(&self, dance_move: DanceMove) -> bool {
        let scored = {
            let mut state = self.state.lock().await;
            let Some(slot) = state.slots[GameKind::Energy.index()].as_mut() else {
                return false;
            };
            let now_ms = slot.elapsed_ms();
            let attempt = match &mut slot.machine {
                Machine::Energy(game) => game.respond(dance_move, now_ms),
                _ => None,
            };
            attempt.map(|attempt| (attempt, slot.wake.clone()))
        };

        let Some((attempt, wake)) = scored else {
            return false;
        };
        wake.notify_one();

        if attempt.correct {
            self.tones.play_cue(ToneCue::new(
                dance_move.cue_frequency_hz(),
                CATCH_CUE_MS,
                Waveform::Triangle,
            ));
        } else {
            self.tones.play_cue(WRONG_MOVE_CUE);
        }
        self.emit(EngineEvent::MoveScored { attempt });
        true
    }

    async fn recall_cell(&self, cell: GridCell) -> bool {
        let (outcome, completed) = {
            let mut state = self.state.lock().await;
            let Some(slot) = state.slots[GameKind::Memory.index()].as_mut() else {
                return false;
            };
            let generation = slot.generation;
            let (outcome, finished) = match &mut slot.machine {
                Machine::Memory(game) => {
                    let outcome = game.select(cell);
                    (outcome, game.finished_all_rounds())
                }
                _ => (RecallOutcome::Ignored, false),
            };

            let mut completed = None;
            if let RecallOutcome::Found {
                round_complete: true,
                ..
            } = outcome
            {
                slot.wake.notify_one();
                if finished {
                    completed = state.finish_slot(GameKind::Memory, generation);
                }
            }
            (outcome, completed)
        };

        match outcome {
            RecallOutcome::Ignored | RecallOutcome::AlreadyFound => return false,
            RecallOutcome::Found { .. } => self.tones.play_cue(TREASURE_FOUND_CUE),
            RecallOutcome::Miss { .. } => {}
        }
        self.emit(EngineEvent::RecallScored { cell, outcome });

        if let Some(result) = completed {
            self.announce_completion(GameKind::Memory, result);
        }
        true
    }

    /// Countdown or last-round completion for the slot's current play.
    /// No-op if the slot has since been replayed, abandoned or finished.
    pub(super) async fn complete_game(&self, kind: GameKind, generation: u64) -> Option<RawResult> {
        let result = self.state.lock().await.finish_slot(kind, generation)?;
        self.announce_completion(kind, result.clone());
        Some(result)
    }

    fn announce_completion(&self, kind: GameKind, result: RawResult) {
        log_info!("{} game completed", kind);
        self.tones.play_cue(GAME_COMPLETE_CUE);
        self.emit(EngineEvent::GameCompleted { kind, result });
    }

    pub(super) fn emit(&self, event: EngineEvent) {
        // No subscribers is fine; events are advisory.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use anyhow::anyhow;
    use async_trait::async_trait;
    use tokio::time;

    use super::*;
    use crate::audio::SilentTones;
    use crate::db::Database;
    use crate::games::GameStatus;

    fn settings() -> GameSettings {
        GameSettings {
            rng_seed: Some(7),
            ..GameSettings::default()
        }
    }

    fn engine_with(store: Option<Arc<dyn ReportStore>>, settings: GameSettings) -> GameEngine {
        GameEngine::new(
            ChildProfile::new("kid-1", Some("Mia"), Some(6)),
            settings,
            store,
            Arc::new(SilentTones),
        )
    }

    #[derive(Default)]
    struct RecordingTones {
        played: StdMutex<Vec<u32>>,
    }

    impl ToneSink for RecordingTones {
        fn play_tone(&self, frequency_hz: f32, _duration_ms: u64, _waveform: Waveform) {
            self.played.lock().unwrap().push(frequency_hz as u32);
        }
    }

    struct FailingStore;

    #[async_trait]
    impl ReportStore for FailingStore {
        async fn save_report(&self, _report: &SessionReport) -> anyhow::Result<()> {
            Err(anyhow!("disk full"))
        }

        async fn update_progress(
            &self,
            _child_id: &str,
            _delta: &ProgressDelta,
        ) -> anyhow::Result<()> {
            Err(anyhow!("disk full"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn focus_game_completes_when_countdown_runs_out() {
        let engine = engine_with(None, settings());
        let mut events = engine.subscribe();
        engine.start_game(GameKind::Focus).await.unwrap();

        time::sleep(Duration::from_millis(60_500)).await;

        let snapshot = engine.snapshot(GameKind::Focus).await;
        assert_eq!(snapshot.status, GameStatus::Completed);
        assert_eq!(snapshot.remaining_ms, Some(0));
        assert!(engine.session().await.game_results.contains_key(&GameKind::Focus));

        let mut completions = 0;
        let mut ticks = 0;
        while let Ok(event) = events.try_recv() {
            match event {
                EngineEvent::GameCompleted { kind, .. } => {
                    assert_eq!(kind, GameKind::Focus);
                    completions += 1;
                }
                EngineEvent::CountdownTick { .. } => ticks += 1,
                _ => {}
            }
        }
        assert_eq!(completions, 1);
        assert!(ticks >= 55, "expected about one tick per second, got {ticks}");
    }

    #[tokio::test(start_paused = true)]
    async fn caught_star_scores_and_plays_its_cue() {
        let tones = Arc::new(RecordingTones::default());
        let engine = GameEngine::new(
            ChildProfile::new("kid-1", None, None),
            settings(),
            None,
            tones.clone(),
        );
        let mut events = engine.subscribe();
        engine.start_game(GameKind::Focus).await.unwrap();

        let stimulus = loop {
            match events.recv().await.unwrap() {
                EngineEvent::StimulusSpawned { stimulus } => break stimulus,
                _ => continue,
            }
        };

        time::sleep(Duration::from_millis(300)).await;
        assert!(
            engine
                .record_response(GameKind::Focus, Response::Catch { stimulus_id: stimulus.id })
                .await
        );
        // Second tap on the same star is ignored.
        assert!(
            !engine
                .record_response(GameKind::Focus, Response::Catch { stimulus_id: stimulus.id })
                .await
        );

        assert_eq!(
            engine.snapshot(GameKind::Focus).await.score,
            stimulus.kind.points()
        );
        let played = tones.played.lock().unwrap().clone();
        assert_eq!(played[0], 660);
        assert_eq!(played[1], stimulus.kind.cue_frequency_hz() as u32);
    }

    #[tokio::test(start_paused = true)]
    async fn replay_cancels_stale_timers_and_overwrites_result() {
        let engine = engine_with(None, settings());
        let first = engine.start_game(GameKind::Focus).await.unwrap();
        time::sleep(Duration::from_secs(30)).await;

        let second = engine.start_game(GameKind::Focus).await.unwrap();
        assert!(second > first);

        // The first play's countdown would have fired at 60s.
        time::sleep(Duration::from_secs(35)).await;
        let snapshot = engine.snapshot(GameKind::Focus).await;
        assert_eq!(snapshot.status, GameStatus::Running);
        assert_eq!(snapshot.generation, second);
        assert!(engine.session().await.game_results.is_empty());
        assert!(engine.complete_game(GameKind::Focus, first).await.is_none());

        time::sleep(Duration::from_secs(30)).await;
        let session = engine.session().await;
        assert_eq!(session.game_results.len(), 1);
        assert_eq!(session.completion_order, vec![GameKind::Focus]);
    }

    #[tokio::test(start_paused = true)]
    async fn energy_round_accepts_one_answer() {
        let engine = engine_with(None, settings());
        let mut events = engine.subscribe();
        engine.start_game(GameKind::Energy).await.unwrap();

        let (round, shown) = loop {
            match events.recv().await.unwrap() {
                EngineEvent::DanceMoveShown {
                    round, dance_move, ..
                } => break (round, dance_move),
                _ => continue,
            }
        };
        assert_eq!(round, 1);

        // Still showing: answers are ignored.
        assert!(
            !engine
                .record_response(GameKind::Energy, Response::Dance { dance_move: shown })
                .await
        );

        loop {
            if let EngineEvent::ResponseWindowOpened { round } = events.recv().await.unwrap() {
                assert_eq!(round, 1);
                break;
            }
        }
        assert!(
            engine
                .record_response(GameKind::Energy, Response::Dance { dance_move: shown })
                .await
        );
        assert!(
            !engine
                .record_response(GameKind::Energy, Response::Dance { dance_move: shown })
                .await
        );

        let snapshot = engine.snapshot(GameKind::Energy).await;
        assert_eq!(snapshot.score, 1);
        assert_eq!(snapshot.phase, "ready");

        // The gap then the next round, well before the old window would close.
        time::sleep(Duration::from_millis(1_100)).await;
        let snapshot = engine.snapshot(GameKind::Energy).await;
        assert_eq!(snapshot.round, 2);
        assert_eq!(snapshot.phase, "showing");
    }

    #[tokio::test(start_paused = true)]
    async fn energy_unanswered_rounds_time_out_until_countdown() {
        let engine = engine_with(None, settings());
        engine.start_game(GameKind::Energy).await.unwrap();

        time::sleep(Duration::from_secs(91)).await;

        let session = engine.session().await;
        let Some(RawResult::Energy(result)) = session.game_results.get(&GameKind::Energy) else {
            panic!("energy result missing");
        };
        assert!(result.total_moves > 0);
        assert_eq!(result.correct_moves, 0);
        assert_eq!(result.final_combo, 0);
        assert!(result.moves.iter().all(|m| m.selected.is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn memory_game_finishes_after_last_round() {
        let engine = engine_with(None, settings());
        let mut events = engine.subscribe();
        engine.start_game(GameKind::Memory).await.unwrap();

        let mut rounds_seen = 0;
        loop {
            match events.recv().await.unwrap() {
                EngineEvent::MemoryRoundShown { round, .. } => rounds_seen = round,
                EngineEvent::MemoryTestingStarted { round } => {
                    // One wrong guess on a cell that holds nothing, if any.
                    let treasures: Vec<GridCell> = {
                        let state = engine.state.lock().await;
                        match &state.slot(GameKind::Memory).unwrap().machine {
                            Machine::Memory(game) => {
                                game.treasures().iter().map(|t| t.cell).collect()
                            }
                            _ => unreachable!(),
                        }
                    };
                    if round == 1 {
                        let empty = (0..4u8)
                            .flat_map(|col| (0..3u8).map(move |row| GridCell { col, row }))
                            .find(|cell| !treasures.contains(cell))
                            .unwrap();
                        assert!(
                            engine
                                .record_response(GameKind::Memory, Response::Recall { cell: empty })
                                .await
                        );
                    }
                    for cell in treasures {
                        engine
                            .record_response(GameKind::Memory, Response::Recall { cell })
                            .await;
                    }
                }
                EngineEvent::GameCompleted { kind, result } => {
                    assert_eq!(kind, GameKind::Memory);
                    let RawResult::Memory(memory) = result else {
                        panic!("wrong result kind");
                    };
                    assert_eq!(memory.rounds_completed, 4);
                    assert_eq!(memory.patterns.len(), 4);
                    assert_eq!(memory.total_attempts, memory.correct_recalls + 1);
                    break;
                }
                _ => {}
            }
        }
        assert_eq!(rounds_seen, 4);
        assert_eq!(engine.snapshot(GameKind::Memory).await.status, GameStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_game_records_nothing() {
        let engine = engine_with(None, settings());
        engine.start_game(GameKind::Focus).await.unwrap();
        time::sleep(Duration::from_secs(5)).await;

        assert!(engine.abandon_game(GameKind::Focus).await);
        assert!(!engine.abandon_game(GameKind::Focus).await);

        time::sleep(Duration::from_secs(60)).await;
        assert!(engine.session().await.game_results.is_empty());
        assert_eq!(engine.snapshot(GameKind::Focus).await.status, GameStatus::Idle);
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected_at_start() {
        let mut bad = settings();
        bad.focus.duration_ms = 0;
        let engine = engine_with(None, bad);

        let err = engine.start_game(GameKind::Focus).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidConfig {
                kind: GameKind::Focus,
                ..
            }
        ));
        // Other kinds are unaffected.
        assert!(engine.start_game(GameKind::Memory).await.is_ok());
        assert!(engine.session().await.started_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn finalize_returns_report_even_when_store_fails() {
        let engine = engine_with(Some(Arc::new(FailingStore)), settings());
        engine.start_game(GameKind::Energy).await.unwrap();
        time::sleep(Duration::from_secs(91)).await;

        let report = engine.finalize_session().await;
        assert_eq!(report.behavioral_scores.len(), 1);
        assert!(report.score(GameKind::Energy).is_some());
        assert!(engine.session().await.game_results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn finalize_cancels_live_games_and_persists() {
        let db = Database::open_in_memory().unwrap();
        let engine = engine_with(Some(Arc::new(db.clone())), settings());
        let mut events = engine.subscribe();

        engine.start_game(GameKind::Focus).await.unwrap();
        time::sleep(Duration::from_secs(61)).await;
        engine.start_game(GameKind::Energy).await.unwrap();
        time::sleep(Duration::from_secs(10)).await;

        let report = engine.finalize_session().await;
        assert_eq!(report.raw_results.len(), 1);
        assert!(report.raw_results.contains_key(&GameKind::Focus));
        assert_eq!(engine.snapshot(GameKind::Energy).await.status, GameStatus::Idle);

        let stored = db.get_report(&report.storage_key()).await.unwrap().unwrap();
        assert_eq!(stored, report);
        let progress = db.get_progress("kid-1").await.unwrap().unwrap();
        assert_eq!(progress.sessions_completed, 1);

        let mut finalized = false;
        while let Ok(event) = events.try_recv() {
            if let EngineEvent::SessionFinalized { report: sent } = event {
                assert_eq!(sent.session_id, report.session_id);
                finalized = true;
            }
        }
        assert!(finalized);
    }

    #[tokio::test]
    async fn empty_sitting_is_not_saved_or_credited() {
        let db = Database::open_in_memory().unwrap();
        let engine = engine_with(Some(Arc::new(db.clone())), settings());

        for _ in 0..2 {
            let report = engine.finalize_session().await;
            assert!(report.raw_results.is_empty());
            assert!(report.behavioral_scores.is_empty());
        }

        assert!(db.get_progress("kid-1").await.unwrap().is_none());
        assert!(db.list_recent_reports("kid-1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_memory_layout_is_rejected_at_start() {
        let mut huge = settings();
        huge.memory.base_items = 200_000;
        huge.memory.max_items = 200_000;
        let engine = engine_with(None, huge);

        assert!(matches!(
            engine.start_game(GameKind::Memory).await,
            Err(EngineError::InvalidConfig {
                kind: GameKind::Memory,
                ..
            })
        ));
        assert_eq!(engine.snapshot(GameKind::Memory).await.status, GameStatus::Idle);
    }

    #[tokio::test]
    async fn misrouted_response_is_ignored() {
        let engine = engine_with(None, settings());
        engine.start_game(GameKind::Energy).await.unwrap();
        assert!(
            !engine
                .record_response(
                    GameKind::Focus,
                    Response::Dance {
                        dance_move: DanceMove::Clap
                    }
                )
                .await
        );
    }
}

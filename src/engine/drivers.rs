//! Timer tasks behind each game slot.
//!
//! Every task owns a clone of its slot's cancellation token and the
//! generation it was spawned for. After each wake-up it re-enters the engine
//! lock through [`with_live`], which hands out the slot only while that
//! generation is still running, so timers from a replayed or abandoned play
//! fall through as no-ops.

use std::time::Duration;

use rand::rngs::StdRng;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::audio::{ToneCue, ROUND_START_CUE};
use crate::games::{EnergyConfig, GameKind, MemoryConfig, MemoryPhase, Stimulus};
use crate::settings::GameSettings;
use crate::log_debug;

use super::controller::GameEngine;
use super::events::EngineEvent;
use super::state::{Machine, Slot};

const ENABLE_LOGS: bool = true;
const TICK: Duration = Duration::from_secs(1);

pub(super) fn spawn_for(
    engine: GameEngine,
    kind: GameKind,
    generation: u64,
    token: CancellationToken,
    started: Instant,
    settings: GameSettings,
) {
    match kind {
        GameKind::Focus => {
            tokio::spawn(run_countdown(
                engine.clone(),
                kind,
                generation,
                token.clone(),
                started,
                settings.focus.duration_ms,
            ));
            tokio::spawn(run_focus_spawner(engine, generation, token));
        }
        GameKind::Energy => {
            tokio::spawn(run_countdown(
                engine.clone(),
                kind,
                generation,
                token.clone(),
                started,
                settings.energy.duration_ms,
            ));
            tokio::spawn(run_energy_rounds(engine, generation, token, settings.energy));
        }
        GameKind::Memory => {
            tokio::spawn(run_memory_rounds(engine, generation, token, settings.memory));
        }
    }
}

/// Run `f` against the slot for `kind` if `generation` is still the live
/// play. `None` means the play is gone and the caller should stop.
async fn with_live<T>(
    engine: &GameEngine,
    kind: GameKind,
    generation: u64,
    f: impl FnOnce(&mut Slot, &mut StdRng) -> Option<T>,
) -> Option<T> {
    let mut state = engine.state.lock().await;
    let (slot, rng) = state.live_slot_and_rng(kind, generation)?;
    f(slot, rng)
}

/// Returns `false` if the slot was cancelled before `ms` elapsed.
async fn pause(token: &CancellationToken, ms: u64) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = time::sleep(Duration::from_millis(ms)) => true,
    }
}

async fn run_countdown(
    engine: GameEngine,
    kind: GameKind,
    generation: u64,
    token: CancellationToken,
    started: Instant,
    duration_ms: u64,
) {
    let deadline = started + Duration::from_millis(duration_ms);
    let mut interval = time::interval_at(started + TICK, TICK);
    let mut ticks: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = time::sleep_until(deadline) => {
                if engine.complete_game(kind, generation).await.is_none() {
                    log_debug!("{} countdown expired after generation {} ended", kind, generation);
                }
                return;
            }
            _ = interval.tick() => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    continue;
                }

                ticks = ticks.wrapping_add(1);
                let remaining_ms = remaining.as_millis() as u64;
                if ticks % engine.tick_log_every == 0 {
                    log_debug!("{} countdown: {}ms left", kind, remaining_ms);
                }
                engine.emit(EngineEvent::CountdownTick { kind, remaining_ms });
            }
        }
    }
}

async fn run_focus_spawner(engine: GameEngine, generation: u64, token: CancellationToken) {
    loop {
        let delay = with_live(&engine, GameKind::Focus, generation, |slot, rng| {
            match &slot.machine {
                Machine::Focus(game) => Some(game.next_spawn_delay_ms(rng)),
                _ => None,
            }
        })
        .await;
        let Some(delay) = delay else {
            return;
        };

        if !pause(&token, delay).await {
            return;
        }

        let spawned = with_live(&engine, GameKind::Focus, generation, |slot, rng| {
            let now_ms = slot.elapsed_ms();
            match &mut slot.machine {
                Machine::Focus(game) => game.spawn(now_ms, rng),
                _ => None,
            }
        })
        .await;
        let Some(stimulus) = spawned else {
            return;
        };

        engine.emit(EngineEvent::StimulusSpawned { stimulus });
        tokio::spawn(expire_stimulus(
            engine.clone(),
            generation,
            token.clone(),
            stimulus,
        ));
    }
}

async fn expire_stimulus(
    engine: GameEngine,
    generation: u64,
    token: CancellationToken,
    stimulus: Stimulus,
) {
    if !pause(&token, stimulus.lifetime_ms).await {
        return;
    }

    let expired = with_live(&engine, GameKind::Focus, generation, |slot, _| {
        match &mut slot.machine {
            Machine::Focus(game) => game.expire(stimulus.id),
            _ => None,
        }
    })
    .await;

    if let Some(reaction) = expired {
        engine.emit(EngineEvent::StimulusResolved {
            stimulus_id: stimulus.id,
            reaction,
        });
    }
}

async fn run_energy_rounds(
    engine: GameEngine,
    generation: u64,
    token: CancellationToken,
    config: EnergyConfig,
) {
    if !pause(&token, config.lead_in_ms).await {
        return;
    }

    loop {
        let shown = with_live(&engine, GameKind::Energy, generation, |slot, rng| {
            let wake = slot.wake.clone();
            match &mut slot.machine {
                Machine::Energy(game) => game
                    .begin_round(rng)
                    .map(|(round, dance_move)| (round, dance_move, wake)),
                _ => None,
            }
        })
        .await;
        let Some((round, dance_move, wake)) = shown else {
            return;
        };

        engine.tones.play_cue(ToneCue::new(
            dance_move.cue_frequency_hz(),
            ROUND_START_CUE.duration_ms,
            ROUND_START_CUE.waveform,
        ));
        engine.emit(EngineEvent::DanceMoveShown {
            round,
            dance_move,
            instruction: dance_move.instruction(),
        });

        if !pause(&token, config.show_ms).await {
            return;
        }

        let opened = with_live(&engine, GameKind::Energy, generation, |slot, _| {
            match &mut slot.machine {
                Machine::Energy(game) => Some(game.open_response(round)),
                _ => None,
            }
        })
        .await;
        if opened != Some(true) {
            return;
        }
        engine.emit(EngineEvent::ResponseWindowOpened { round });

        let deadline = Instant::now() + Duration::from_millis(config.response_ms);
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                _ = time::sleep_until(deadline) => break,
                _ = wake.notified() => {
                    // A leftover wake-up from an earlier round is not an answer.
                    let responding = with_live(&engine, GameKind::Energy, generation, |slot, _| {
                        match &slot.machine {
                            Machine::Energy(game) => Some(game.is_responding(round)),
                            _ => None,
                        }
                    })
                    .await;
                    if responding != Some(true) {
                        break;
                    }
                }
            }
        }

        let timed_out = with_live(&engine, GameKind::Energy, generation, |slot, _| {
            let now_ms = slot.elapsed_ms();
            match &mut slot.machine {
                Machine::Energy(game) => game.timeout(round, now_ms),
                _ => None,
            }
        })
        .await;
        if let Some(attempt) = timed_out {
            log_debug!("dance round {} timed out", round);
            engine.emit(EngineEvent::MoveScored { attempt });
        }

        if !pause(&token, config.round_gap_ms).await {
            return;
        }
    }
}

async fn run_memory_rounds(
    engine: GameEngine,
    generation: u64,
    token: CancellationToken,
    config: MemoryConfig,
) {
    loop {
        let laid_out = with_live(&engine, GameKind::Memory, generation, |slot, rng| {
            let wake = slot.wake.clone();
            match &mut slot.machine {
                Machine::Memory(game) => game
                    .generate_round(rng)
                    .map(|(round, cells)| (round, cells, wake)),
                _ => None,
            }
        })
        .await;
        let Some((round, cells, wake)) = laid_out else {
            return;
        };

        engine.tones.play_cue(ROUND_START_CUE);
        engine.emit(EngineEvent::MemoryRoundShown { round, cells });

        if !pause(&token, config.show_duration_ms(round)).await {
            return;
        }

        let testing = with_live(&engine, GameKind::Memory, generation, |slot, _| {
            match &mut slot.machine {
                Machine::Memory(game) => Some(game.begin_testing(round)),
                _ => None,
            }
        })
        .await;
        if testing != Some(true) {
            return;
        }
        engine.emit(EngineEvent::MemoryTestingStarted { round });

        // The last round's final find completes the game from the response
        // path, which cancels the token.
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                _ = wake.notified() => {
                    let still_testing = with_live(&engine, GameKind::Memory, generation, |slot, _| {
                        match &slot.machine {
                            Machine::Memory(game) => Some(
                                game.phase() == MemoryPhase::Testing && game.round() == round,
                            ),
                            _ => None,
                        }
                    })
                    .await;
                    match still_testing {
                        Some(true) => continue,
                        Some(false) => break,
                        None => return,
                    }
                }
            }
        }

        if !pause(&token, config.round_gap_ms).await {
            return;
        }
    }
}

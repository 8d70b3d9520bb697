//! Audio cue collaborator. Cues are fire-and-forget: a missing output device
//! or a dead audio thread is logged and otherwise ignored, never surfaced to
//! game logic.

pub mod tone;

pub use tone::{Tone, Waveform};

#[cfg(feature = "audio")]
pub use player::ToneEngineHandle;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToneCue {
    pub frequency_hz: f32,
    pub duration_ms: u64,
    pub waveform: Waveform,
}

impl ToneCue {
    pub const fn new(frequency_hz: f32, duration_ms: u64, waveform: Waveform) -> Self {
        Self {
            frequency_hz,
            duration_ms,
            waveform,
        }
    }
}

pub const GAME_START_CUE: ToneCue = ToneCue::new(660.0, 300, Waveform::Triangle);
pub const GAME_COMPLETE_CUE: ToneCue = ToneCue::new(880.0, 500, Waveform::Sine);
pub const SESSION_FINISHED_CUE: ToneCue = ToneCue::new(1_320.0, 800, Waveform::Sine);
pub const ROUND_START_CUE: ToneCue = ToneCue::new(880.0, 400, Waveform::Triangle);
pub const TREASURE_FOUND_CUE: ToneCue = ToneCue::new(1_100.0, 300, Waveform::Triangle);
pub const WRONG_MOVE_CUE: ToneCue = ToneCue::new(200.0, 200, Waveform::Sawtooth);

/// Plays short cue tones. Implementations must not block the caller.
pub trait ToneSink: Send + Sync {
    fn play_tone(&self, frequency_hz: f32, duration_ms: u64, waveform: Waveform);

    fn play_cue(&self, cue: ToneCue) {
        self.play_tone(cue.frequency_hz, cue.duration_ms, cue.waveform);
    }
}

/// Used when the host has no audio output.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentTones;

impl ToneSink for SilentTones {
    fn play_tone(&self, _frequency_hz: f32, _duration_ms: u64, _waveform: Waveform) {}
}

#[cfg(feature = "audio")]
mod player {
    use std::sync::{
        mpsc::{self, Sender},
        Arc, Mutex,
    };
    use std::thread;

    use log::warn;
    use rodio::{OutputStream, Sink};

    use super::{Tone, ToneSink, Waveform};

    enum AudioCommand {
        Play(Tone),
        SetVolume(f32),
    }

    /// Owns a dedicated thread holding the non-`Send` rodio stream. The thread
    /// is created lazily on the first cue.
    #[derive(Clone, Default)]
    pub struct ToneEngineHandle {
        tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
    }

    impl ToneEngineHandle {
        pub fn new() -> Self {
            Self::default()
        }

        fn ensure_thread(&self) -> Result<Sender<AudioCommand>, String> {
            let mut guard = self.tx.lock().map_err(|e| e.to_string())?;
            if let Some(tx) = guard.as_ref() {
                return Ok(tx.clone());
            }

            let (tx, rx) = mpsc::channel::<AudioCommand>();

            thread::Builder::new()
                .name("tone-engine".to_string())
                .spawn(move || {
                    let (_stream, sink) = match OutputStream::try_default()
                        .map_err(|e| format!("Failed to create audio output stream: {}", e))
                        .and_then(|(stream, handle)| {
                            Sink::try_new(&handle)
                                .map(|sink| (stream, sink))
                                .map_err(|e| format!("Failed to create audio sink: {}", e))
                        }) {
                        Ok(pair) => pair,
                        Err(err) => {
                            warn!("Audio unavailable, continuing silently: {err}");
                            // Drain commands so senders never observe a closed channel mid-game.
                            while rx.recv().is_ok() {}
                            return;
                        }
                    };

                    while let Ok(cmd) = rx.recv() {
                        match cmd {
                            AudioCommand::Play(tone) => sink.append(tone),
                            AudioCommand::SetVolume(v) => sink.set_volume(v.clamp(0.0, 1.0)),
                        }
                    }
                })
                .map_err(|e| e.to_string())?;

            *guard = Some(tx.clone());
            Ok(tx)
        }

        pub fn set_volume(&self, volume: f32) {
            self.send(AudioCommand::SetVolume(volume));
        }

        fn send(&self, command: AudioCommand) {
            let result = self
                .ensure_thread()
                .and_then(|tx| tx.send(command).map_err(|e| e.to_string()));
            if let Err(err) = result {
                warn!("Dropping audio cue: {err}");
            }
        }
    }

    impl ToneSink for ToneEngineHandle {
        fn play_tone(&self, frequency_hz: f32, duration_ms: u64, waveform: Waveform) {
            self.send(AudioCommand::Play(Tone::new(frequency_hz, duration_ms, waveform)));
        }
    }
}

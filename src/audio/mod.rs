#[cfg(feature = "audio")]
pub mod tone;
pub mod volume;

use volume::SystemVolume;

use crate::devices::AudioSink;
use crate::error::DeviceError;

#[cfg(feature = "audio")]
pub use engine::ToneEngine;

#[cfg(feature = "audio")]
mod engine {
    use std::sync::{
        mpsc::{self, Sender},
        Mutex,
    };
    use std::thread;

    use log::{error, warn};
    use rodio::{OutputStream, Sink};

    use super::tone::AlarmTone;
    use crate::error::DeviceError;

    enum ToneCommand {
        Play {
            frequency_hz: u32,
            duration_ms: u64,
            done: Sender<Result<(), String>>,
        },
        Shutdown,
    }

    /// Plays tones on a dedicated thread that owns the (non-`Send`) output
    /// stream. The stream is opened lazily and reopened after a failure.
    pub struct ToneEngine {
        tx: Mutex<Option<Sender<ToneCommand>>>,
    }

    impl ToneEngine {
        pub fn new() -> Self {
            Self {
                tx: Mutex::new(None),
            }
        }

        fn ensure_thread(&self) -> Result<Sender<ToneCommand>, String> {
            let mut guard = self.tx.lock().map_err(|e| e.to_string())?;
            if let Some(tx) = guard.as_ref() {
                return Ok(tx.clone());
            }

            let (tx, rx) = mpsc::channel::<ToneCommand>();

            thread::Builder::new()
                .name("alarm-tone".to_string())
                .spawn(move || {
                    let mut _stream: Option<OutputStream> = None;
                    let mut sink: Option<Sink> = None;

                    fn ensure_sink(
                        stream: &mut Option<OutputStream>,
                        sink: &mut Option<Sink>,
                    ) -> Result<(), String> {
                        if sink.is_none() {
                            let (s, handle) = OutputStream::try_default()
                                .map_err(|e| format!("Failed to open audio output: {}", e))?;
                            let new_sink = Sink::try_new(&handle)
                                .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                            *stream = Some(s);
                            *sink = Some(new_sink);
                        }
                        Ok(())
                    }

                    while let Ok(cmd) = rx.recv() {
                        match cmd {
                            ToneCommand::Play {
                                frequency_hz,
                                duration_ms,
                                done,
                            } => {
                                let result = ensure_sink(&mut _stream, &mut sink).map(|_| {
                                    if let Some(ref s) = sink {
                                        s.append(AlarmTone::new(frequency_hz, duration_ms));
                                        s.sleep_until_end();
                                    }
                                });
                                if let Err(ref err) = result {
                                    warn!("{err}");
                                    sink = None;
                                    _stream = None;
                                }
                                let _ = done.send(result);
                            }
                            ToneCommand::Shutdown => break,
                        }
                    }
                })
                .map_err(|e| e.to_string())?;

            *guard = Some(tx.clone());
            Ok(tx)
        }

        pub fn play(&self, frequency_hz: u32, duration_ms: u64) -> Result<(), DeviceError> {
            let tx = self.ensure_thread().map_err(DeviceError::Unavailable)?;
            let (done_tx, done_rx) = mpsc::channel();
            tx.send(ToneCommand::Play {
                frequency_hz,
                duration_ms,
                done: done_tx,
            })
            .map_err(|e| DeviceError::Unavailable(e.to_string()))?;

            done_rx
                .recv()
                .map_err(|e| DeviceError::Unavailable(e.to_string()))?
                .map_err(DeviceError::Unavailable)
        }
    }

    impl Default for ToneEngine {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for ToneEngine {
        fn drop(&mut self) {
            let guard = match self.tx.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(tx) = guard.as_ref() {
                if let Err(err) = tx.send(ToneCommand::Shutdown) {
                    error!("Failed to stop alarm tone thread: {err}");
                }
            }
        }
    }
}

/// The machine's real audio: rodio tones (with the `audio` feature) and the
/// platform volume tools.
pub struct SystemAudio {
    #[cfg(feature = "audio")]
    tones: ToneEngine,
    volume: SystemVolume,
}

impl SystemAudio {
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "audio")]
            tones: ToneEngine::new(),
            volume: SystemVolume,
        }
    }
}

impl Default for SystemAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for SystemAudio {
    fn has_volume_control(&self) -> bool {
        self.volume.is_supported()
    }

    fn get_volume(&self) -> Result<u8, DeviceError> {
        self.volume.get()
    }

    fn set_volume(&self, volume: u8) -> Result<(), DeviceError> {
        self.volume.set(volume)
    }

    #[cfg(feature = "audio")]
    fn play_tone(&self, frequency_hz: u32, duration_ms: u64) -> Result<(), DeviceError> {
        self.tones.play(frequency_hz, duration_ms)
    }

    #[cfg(not(feature = "audio"))]
    fn play_tone(&self, _frequency_hz: u32, _duration_ms: u64) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported)
    }
}

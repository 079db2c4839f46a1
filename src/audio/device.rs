//! Duplex audio path using CPAL (Cross-Platform Audio Library).
//!
//! Two streams, usually on different devices: the capture stream feeds
//! [`Engine::process_input`] and the playback stream drains
//! [`Engine::process_output`]. Both run f32 interleaved at the engine's
//! fixed rate and channel count.

use crate::engine::Engine;
use crate::error::{BleepdError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// Suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers when
/// probing audio backends.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2.
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Quiet down JACK/ALSA backend probing before any stream is opened.
///
/// # Safety
/// Modifies environment variables; call at startup before spawning threads.
pub fn suppress_audio_warnings() {
    // SAFETY: Called at startup before any threads are spawned
    unsafe {
        std::env::set_var("JACK_NO_START_SERVER", "1");
        std::env::set_var("ALSA_DEBUG", "0");
        std::env::set_var("PW_LOG", "0");
    }
}

/// List available input device names.
pub fn list_input_devices() -> Result<Vec<String>> {
    list_devices(true)
}

/// List available output device names.
pub fn list_output_devices() -> Result<Vec<String>> {
    list_devices(false)
}

fn list_devices(input: bool) -> Result<Vec<String>> {
    let devices = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        if input {
            host.input_devices().map(|d| d.collect::<Vec<_>>())
        } else {
            host.output_devices().map(|d| d.collect::<Vec<_>>())
        }
    })
    .map_err(|e| BleepdError::AudioStream {
        message: format!("Failed to enumerate devices: {}", e),
    })?;

    Ok(devices.into_iter().filter_map(|d| d.name().ok()).collect())
}

/// Find a device by exact name, or fall back to the system default.
fn find_device(name: Option<&str>, input: bool) -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        if let Some(name) = name {
            let devices = if input {
                host.input_devices()
            } else {
                host.output_devices()
            }
            .map_err(|e| BleepdError::AudioStream {
                message: format!("Failed to enumerate devices: {}", e),
            })?;

            for device in devices {
                if device.name().is_ok_and(|n| n == name) {
                    return Ok(device);
                }
            }
            return Err(BleepdError::AudioDeviceNotFound {
                device: name.to_string(),
            });
        }

        let default = if input {
            host.default_input_device()
        } else {
            host.default_output_device()
        };
        default.ok_or_else(|| BleepdError::AudioDeviceNotFound {
            device: "default".to_string(),
        })
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: The streams are created and dropped on the thread that owns the
/// `AudioIo`; they are never driven from another thread. The wrapper only
/// exists so `AudioIo` can live inside types that require Send.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// A running capture + playback pair wired to an engine.
///
/// Dropping stops both streams; drop (or [`stop`](AudioIo::stop)) before
/// calling [`Engine::stop`] so no callback runs during teardown.
pub struct AudioIo {
    input: Option<SendableStream>,
    output: Option<SendableStream>,
}

impl AudioIo {
    /// Open both devices at the engine's rate/channel count and start
    /// streaming.
    pub fn start(
        engine: Arc<Engine>,
        input_device: Option<&str>,
        output_device: Option<&str>,
    ) -> Result<Self> {
        let config = cpal::StreamConfig {
            channels: engine.config().channels as u16,
            sample_rate: cpal::SampleRate(engine.config().sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let capture_device = find_device(input_device, true)?;
        let playback_device = find_device(output_device, false)?;

        let err_callback = |err| {
            eprintln!("bleepd: audio stream error: {}", err);
        };

        let input_engine = Arc::clone(&engine);
        let input_stream = capture_device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    input_engine.process_input(data);
                },
                err_callback,
                None,
            )
            .map_err(|e| BleepdError::AudioStream {
                message: format!("Failed to build capture stream: {}", e),
            })?;

        let output_engine = Arc::clone(&engine);
        let output_stream = playback_device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    output_engine.process_output(data);
                },
                err_callback,
                None,
            )
            .map_err(|e| BleepdError::AudioStream {
                message: format!("Failed to build playback stream: {}", e),
            })?;

        // Output first so the gate sees fill grow from a running consumer.
        output_stream.play().map_err(|e| BleepdError::AudioStream {
            message: format!("Failed to start playback stream: {}", e),
        })?;
        input_stream.play().map_err(|e| BleepdError::AudioStream {
            message: format!("Failed to start capture stream: {}", e),
        })?;

        Ok(Self {
            input: Some(SendableStream(input_stream)),
            output: Some(SendableStream(output_stream)),
        })
    }

    /// Pause and drop both streams.
    pub fn stop(&mut self) {
        if let Some(stream) = self.input.take() {
            let _ = stream.0.pause();
        }
        if let Some(stream) = self.output.take() {
            let _ = stream.0.pause();
        }
    }
}

impl Drop for AudioIo {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::recognizer::{RawSegment, Recognizer};
    use crate::censor::lexicon::Lexicon;
    use crate::engine::EngineConfig;

    struct NullRecognizer;

    impl Recognizer for NullRecognizer {
        fn transcribe_chunk(&self, _pcm: &[f32]) -> Result<Vec<RawSegment>> {
            Ok(Vec::new())
        }
        fn name(&self) -> &str {
            "null"
        }
    }

    #[test]
    fn unknown_device_name_is_reported() {
        let engine = Arc::new(
            Engine::new(
                EngineConfig {
                    quiet: true,
                    ..EngineConfig::default()
                },
                Arc::new(Lexicon::from_lines([])),
                Arc::new(NullRecognizer),
            )
            .unwrap(),
        );

        match AudioIo::start(engine, Some("NoSuchDevice12345"), None) {
            Err(BleepdError::AudioDeviceNotFound { device }) => {
                assert_eq!(device, "NoSuchDevice12345");
            }
            Err(BleepdError::AudioStream { .. }) => {
                // Acceptable on hosts with no audio backend at all.
            }
            Ok(_) => panic!("nonexistent device should not open"),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn duplex_streams_open_on_default_devices() {
        let engine = Arc::new(
            Engine::new(
                EngineConfig {
                    quiet: true,
                    ..EngineConfig::default()
                },
                Arc::new(Lexicon::from_lines([])),
                Arc::new(NullRecognizer),
            )
            .unwrap(),
        );
        engine.start().unwrap();

        let mut io = AudioIo::start(Arc::clone(&engine), None, None).expect("open devices");
        std::thread::sleep(std::time::Duration::from_millis(200));
        io.stop();
        engine.stop();
    }
}

//! The delay-and-censor engine.
//!
//! Owns the delay line, capture ring, playback gate, and the Whisper
//! worker's lifecycle. The audio driver calls [`Engine::process_input`]
//! from its capture context and [`Engine::process_output`] from its
//! playback context; everything else happens on the worker thread and
//! reaches the audio path only through atomic flags and the bounded patch
//! queue.

pub mod capture;
pub mod delay_line;
pub mod gate;

use crate::asr::recognizer::Recognizer;
use crate::asr::worker::{AsrWorker, AsrWorkerConfig};
use crate::censor::lexicon::Lexicon;
use crate::censor::{Censor, CensorMode, PatchRequest};
use crate::defaults;
use crate::error::{BleepdError, Result};
use crate::stats::{Counters, EngineStats};
use capture::{CaptureBuffer, ChunkHandoff};
use crossbeam_channel::{Receiver, Sender, bounded};
use delay_line::DelayLine;
use gate::{GateTransition, PlaybackGate};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Size of the patch request queue. Drained every output block, so even a
/// profanity-dense chunk stays far below this.
const PATCH_QUEUE_LEN: usize = 64;

/// How often a deferred chunk handoff is logged, in input blocks.
const DEFERRAL_LOG_INTERVAL: u64 = 100;

/// Engine parameters, fixed for the lifetime of a session.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub channels: usize,
    /// Analysis chunk length in seconds.
    pub chunk_seconds: f32,
    /// Seconds buffered before playback starts.
    pub initial_delay_seconds: f32,
    /// Delay-line capacity beyond the initial delay, in seconds.
    pub delay_headroom_seconds: f32,
    pub censor_mode: CensorMode,
    pub enable_vocal_filter: bool,
    pub enable_timestamp_refiner: bool,
    /// Suppress status messages.
    pub quiet: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            channels: defaults::CHANNELS,
            chunk_seconds: defaults::CHUNK_SECONDS,
            initial_delay_seconds: defaults::INITIAL_DELAY_SECONDS,
            delay_headroom_seconds: defaults::DELAY_HEADROOM_SECONDS,
            censor_mode: CensorMode::default(),
            enable_vocal_filter: true,
            enable_timestamp_refiner: true,
            quiet: false,
        }
    }
}

impl EngineConfig {
    fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: &str| {
            Err(BleepdError::ConfigInvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        };
        if self.sample_rate == 0 {
            return invalid("sample_rate", "must be positive");
        }
        if self.channels == 0 {
            return invalid("channels", "must be at least 1");
        }
        if self.chunk_seconds <= 0.0 {
            return invalid("chunk_seconds", "must be positive");
        }
        if self.initial_delay_seconds < self.chunk_seconds {
            return invalid(
                "initial_delay_seconds",
                "must cover at least one analysis chunk",
            );
        }
        if self.delay_headroom_seconds <= 0.0 {
            return invalid("delay_headroom_seconds", "must be positive");
        }
        Ok(())
    }

    fn chunk_frames(&self) -> usize {
        (self.sample_rate as f32 * self.chunk_seconds) as usize
    }

    fn delay_frames(&self) -> usize {
        (self.sample_rate as f32 * (self.initial_delay_seconds + self.delay_headroom_seconds))
            as usize
    }
}

/// Capture-side state touched only by the input context.
struct CaptureState {
    ring: CaptureBuffer,
    /// Frames accumulated since the last successful chunk handoff.
    since_last_chunk: usize,
    /// Input blocks spent waiting on a busy worker (for rate-limited logs).
    deferred_blocks: u64,
}

/// The pipelined delay-and-censor engine.
///
/// Create with [`Engine::new`], wrap in an `Arc`, call
/// [`start`](Engine::start), then feed audio from the driver callbacks.
pub struct Engine {
    config: EngineConfig,
    chunk_frames: usize,
    delay: DelayLine,
    gate: Arc<PlaybackGate>,
    capture: Mutex<CaptureState>,
    handoff: Arc<ChunkHandoff>,
    counters: Arc<Counters>,
    mode: Arc<AtomicU8>,
    lyrics: Arc<Mutex<Option<String>>>,
    lexicon: Arc<Lexicon>,
    recognizer: Arc<dyn Recognizer>,
    patch_tx: Sender<PatchRequest>,
    patch_rx: Receiver<PatchRequest>,
    stop: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
}

impl Engine {
    /// Build an engine. Allocates the full delay line up front; no further
    /// allocation happens on the audio paths.
    pub fn new(
        config: EngineConfig,
        lexicon: Arc<Lexicon>,
        recognizer: Arc<dyn Recognizer>,
    ) -> Result<Self> {
        config.validate()?;

        let chunk_frames = config.chunk_frames();
        let delay = DelayLine::new(config.delay_frames(), config.channels);
        let gate = Arc::new(PlaybackGate::new(
            config.initial_delay_seconds,
            defaults::PAUSE_MARGIN_SECONDS,
            defaults::UNDERRUN_MARGIN_SECONDS,
            config.sample_rate,
        ));
        let (patch_tx, patch_rx) = bounded(PATCH_QUEUE_LEN);

        Ok(Self {
            chunk_frames,
            delay,
            gate,
            capture: Mutex::new(CaptureState {
                ring: CaptureBuffer::new(chunk_frames),
                since_last_chunk: 0,
                deferred_blocks: 0,
            }),
            handoff: Arc::new(ChunkHandoff::new(chunk_frames)),
            counters: Arc::new(Counters::default()),
            mode: Arc::new(AtomicU8::new(config.censor_mode.as_u8())),
            lyrics: Arc::new(Mutex::new(None)),
            lexicon,
            recognizer,
            patch_tx,
            patch_rx,
            stop: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
            started: AtomicBool::new(false),
            config,
        })
    }

    /// Spawn the transcription worker. Must be called once before audio
    /// flows.
    pub fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(BleepdError::EngineState {
                message: "engine already started".to_string(),
            });
        }

        let censor = Censor::new(
            Arc::clone(&self.lexicon),
            Arc::clone(&self.gate),
            Arc::clone(&self.counters),
            self.patch_tx.clone(),
            Arc::clone(&self.mode),
            self.config.sample_rate,
            self.chunk_frames as u64,
            self.config.quiet,
        );

        let worker = AsrWorker {
            config: AsrWorkerConfig {
                sample_rate: self.config.sample_rate,
                chunk_frames: self.chunk_frames,
                chunk_seconds: self.config.chunk_seconds as f64,
                enable_vocal_filter: self.config.enable_vocal_filter,
                enable_timestamp_refiner: self.config.enable_timestamp_refiner,
                quiet: self.config.quiet,
            },
            handoff: Arc::clone(&self.handoff),
            recognizer: Arc::clone(&self.recognizer),
            censor,
            lyrics: Arc::clone(&self.lyrics),
            counters: Arc::clone(&self.counters),
            stop: Arc::clone(&self.stop),
        };

        let handle = worker.spawn();
        if let Ok(mut slot) = self.worker.lock() {
            *slot = Some(handle);
        }
        Ok(())
    }

    /// Signal shutdown and join the worker. Safe to call more than once.
    /// The audio driver must stop calling the process methods first.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.handoff.notify_stop();
        if let Ok(mut slot) = self.worker.lock()
            && let Some(handle) = slot.take()
        {
            let _ = handle.join();
        }
    }

    /// Capture path: consume one interleaved input block.
    ///
    /// Writes every frame into the delay line, downmixes into the capture
    /// ring, and hands a chunk to the worker when one is due and the worker
    /// is idle. Lock-free except for the capture mutex (sole owner) and the
    /// handoff mutex (taken only when publishing, uncontended by design).
    pub fn process_input(&self, interleaved: &[f32]) {
        let channels = self.config.channels;
        debug_assert_eq!(interleaved.len() % channels, 0);

        let Ok(mut capture) = self.capture.lock() else {
            return;
        };

        let mut level_sum = 0.0f32;
        for frame in interleaved.chunks_exact(channels) {
            let mono = frame.iter().sum::<f32>() / channels as f32;
            self.delay.write_frame(frame);
            capture.ring.push(mono);
            capture.since_last_chunk += 1;
            level_sum += frame[0] * frame[0];
        }

        let frames = interleaved.len() / channels;
        if frames > 0 {
            self.counters
                .set_input_level((level_sum / frames as f32).sqrt());
        }

        if capture.since_last_chunk >= self.chunk_frames {
            if !self.handoff.is_busy() {
                self.handoff.publish(&capture.ring, &self.delay);
                capture.since_last_chunk = 0;
                capture.deferred_blocks = 0;
            } else {
                // Worker still transcribing: leave the counter running, the
                // ring keeps the most recent chunk. Log sparingly.
                capture.deferred_blocks += 1;
                if !self.config.quiet && capture.deferred_blocks % DEFERRAL_LOG_INTERVAL == 1 {
                    let extra = (capture.since_last_chunk - self.chunk_frames) as f32
                        / self.config.sample_rate as f32;
                    eprintln!("bleepd: waiting for transcription ({extra:.2}s behind)");
                }
            }
        }
    }

    /// Playback path: fill one interleaved output block.
    ///
    /// Applies queued censor patches, then either streams delayed frames or
    /// writes silence, per the gate.
    pub fn process_output(&self, out: &mut [f32]) {
        self.apply_pending_patches();

        let channels = self.config.channels;
        debug_assert_eq!(out.len() % channels, 0);

        for frame in out.chunks_exact_mut(channels) {
            let fill = self.delay.fill();
            let (can_play, transition) = self.gate.advance_reporting(fill);
            if let Some(transition) = transition {
                self.report_gate_transition(transition, fill);
            }
            if can_play {
                self.delay.read_frame(frame);
            } else {
                frame.fill(0.0);
            }
        }
    }

    /// Convenience for blocking duplex drivers and tests: one call per
    /// block, input and output of equal frame counts.
    pub fn process(&self, input: &[f32], output: &mut [f32]) {
        self.process_input(input);
        self.process_output(output);
    }

    /// Drain the patch queue and apply each request, truncating spans whose
    /// front the read cursor has already passed.
    fn apply_pending_patches(&self) {
        while let Ok(request) = self.patch_rx.try_recv() {
            let read_pos = self.delay.read_pos();
            let write_pos = self.delay.write_pos();

            let end = request.end_abs.min(write_pos);
            let start = request.start_abs.max(read_pos);

            // Frames of the requested span that already reached the output.
            let leaked = read_pos.min(end).saturating_sub(request.start_abs);
            if leaked > 0 {
                self.counters
                    .leaked_frames
                    .fetch_add(leaked, Ordering::Relaxed);
            }

            if start < end {
                self.delay.patch(start, end, request.op);
            }
        }
    }

    fn report_gate_transition(&self, transition: GateTransition, fill: u64) {
        if self.config.quiet {
            return;
        }
        let seconds = fill as f64 / self.config.sample_rate as f64;
        match transition {
            GateTransition::Started => {
                eprintln!("bleepd: {seconds:.1}s buffered, playback starting");
            }
            GateTransition::Paused => {
                eprintln!("bleepd: buffer low ({seconds:.1}s), pausing playback");
            }
            GateTransition::Resumed => {
                eprintln!("bleepd: buffer recovered ({seconds:.1}s), resuming");
            }
        }
    }

    /// Switch censor mode at runtime; affects hits detected from now on.
    pub fn set_censor_mode(&self, mode: CensorMode) {
        self.mode.store(mode.as_u8(), Ordering::Release);
    }

    pub fn censor_mode(&self) -> CensorMode {
        CensorMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    /// Install or clear the reference lyric used by the aligner.
    pub fn set_lyrics(&self, lyrics: Option<String>) {
        if let Ok(mut slot) = self.lyrics.lock() {
            *slot = lyrics;
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Loose snapshot of the engine's counters and cursors.
    pub fn stats(&self) -> EngineStats {
        let fill = self.delay.fill();
        EngineStats {
            gate: self.gate.state(),
            fill_frames: fill,
            fill_seconds: fill as f64 / self.config.sample_rate as f64,
            underrun: self.gate.is_underrun(),
            profanity_hits: self.counters.profanity_hits.load(Ordering::Relaxed),
            skipped_hits: self.counters.skipped_hits.load(Ordering::Relaxed),
            leaked_frames: self.counters.leaked_frames.load(Ordering::Relaxed),
            chunks_processed: self.counters.chunks_processed.load(Ordering::Relaxed),
            input_level: self.counters.input_level(),
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

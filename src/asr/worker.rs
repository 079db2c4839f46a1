//! The background transcription worker.
//!
//! One dedicated OS thread per engine. It sleeps on the chunk handoff
//! condvar, and for every published chunk runs the full analysis pass:
//! vocal filter → resample to 16 kHz → recognize → synthesize word timings
//! → refine → lyrics-align → censor. Everything here may block; nothing
//! here ever touches the audio contexts except through the patch queue.

use crate::asr::recognizer::Recognizer;
use crate::asr::refine::TimestampRefiner;
use crate::asr::resample::linear_resample;
use crate::asr::vocal::VocalFilter;
use crate::asr::synthesize_words;
use crate::censor::Censor;
use crate::defaults::WHISPER_SAMPLE_RATE;
use crate::engine::capture::ChunkHandoff;
use crate::lyrics;
use crate::stats::Counters;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Worker-side knobs, fixed at engine start.
pub struct AsrWorkerConfig {
    pub sample_rate: u32,
    pub chunk_frames: usize,
    pub chunk_seconds: f64,
    pub enable_vocal_filter: bool,
    pub enable_timestamp_refiner: bool,
    pub quiet: bool,
}

/// Owns the worker loop state; consumed by [`spawn`](AsrWorker::spawn).
pub struct AsrWorker {
    pub config: AsrWorkerConfig,
    pub handoff: Arc<ChunkHandoff>,
    pub recognizer: Arc<dyn Recognizer>,
    pub censor: Censor,
    /// Reference lyric shared with the engine; `None` bypasses alignment.
    pub lyrics: Arc<Mutex<Option<String>>>,
    pub counters: Arc<Counters>,
    pub stop: Arc<AtomicBool>,
}

impl AsrWorker {
    /// Start the worker thread. It exits when the stop flag is raised and
    /// the handoff condvar is notified.
    pub fn spawn(self) -> JoinHandle<()> {
        thread::spawn(move || self.run())
    }

    fn run(self) {
        if !self.config.quiet {
            eprintln!("bleepd: transcription worker running ({})", self.recognizer.name());
        }

        let mut local = vec![0.0f32; self.config.chunk_frames];
        loop {
            let Some(capture_end_pos) = self.handoff.take(&mut local, &self.stop) else {
                break;
            };
            self.process_chunk(&mut local, capture_end_pos);

            if self.stop.load(Ordering::Acquire) {
                break;
            }
        }

        if !self.config.quiet {
            eprintln!("bleepd: transcription worker stopped");
        }
    }

    /// Full analysis pass over one chunk. `samples` is the mono snapshot at
    /// the engine's native rate; it is filtered in place so the refiner sees
    /// the same signal the recognizer heard.
    fn process_chunk(&self, samples: &mut [f32], capture_end_pos: u64) {
        let started = Instant::now();

        if self.config.enable_vocal_filter {
            VocalFilter::new(self.config.sample_rate).process(samples);
        }

        let pcm_16k = if self.config.sample_rate == WHISPER_SAMPLE_RATE {
            samples.to_vec()
        } else {
            linear_resample(samples, self.config.sample_rate, WHISPER_SAMPLE_RATE)
        };

        let segments = match self.recognizer.transcribe_chunk(&pcm_16k) {
            Ok(segments) => segments,
            Err(e) => {
                // Recoverable: skip this chunk, keep the pipeline alive.
                if !self.config.quiet {
                    eprintln!("bleepd: transcription failed: {e}");
                }
                return;
            }
        };

        let mut words = synthesize_words(
            &segments,
            self.recognizer.end_of_transcript_id(),
            self.config.chunk_seconds,
        );

        if self.config.enable_timestamp_refiner && !words.is_empty() {
            let refiner = TimestampRefiner::new(self.config.sample_rate);
            for word in &mut words {
                refiner.refine(word, samples);
            }
        }

        if let Ok(guard) = self.lyrics.lock()
            && let Some(reference) = guard.as_ref()
        {
            words = lyrics::align(&words, reference);
        }

        if !self.config.quiet && !words.is_empty() {
            let transcript: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
            eprintln!("bleepd: \"{}\"", transcript.join(" "));
        }

        self.censor.process_words(&words, capture_end_pos);
        self.counters.chunks_processed.fetch_add(1, Ordering::Relaxed);

        let real_time_factor = started.elapsed().as_secs_f64() / self.config.chunk_seconds;
        if real_time_factor > 1.0 && !self.config.quiet {
            eprintln!(
                "bleepd: transcription slower than real time (RTF {real_time_factor:.2})"
            );
        }
    }
}

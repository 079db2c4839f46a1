//! End-to-end engine scenarios with scripted recognizers.
//!
//! These drive the full pipeline (capture ring → chunk handoff → worker →
//! censor → patch queue → delay line → gated output) through the public
//! API, with recognizers that return canned word timings instead of running
//! a model.

use bleepd::asr::recognizer::{RawSegment, RawToken, Recognizer};
use bleepd::asr::synthesize_words;
use bleepd::censor::CensorMode;
use bleepd::engine::gate::GateState;
use bleepd::engine::{Engine, EngineConfig};
use bleepd::error::Result;
use bleepd::{Lexicon, defaults};
use crossbeam_channel::{Receiver, Sender, bounded};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const RATE: u32 = 48_000;
const CHANNELS: usize = 2;
/// Frames per simulated driver block.
const BLOCK: usize = 480;
/// Frames per 5s analysis chunk.
const CHUNK_FRAMES: u64 = 240_000;
/// Frames buffered before the gate opens (10s).
const INITIAL_FRAMES: u64 = 480_000;
/// First output frame that carries delayed audio rather than warm-up
/// silence. Input leads output by one block inside `process()`, so playback
/// begins one block before the per-frame ideal.
const PLAY_START: u64 = INITIAL_FRAMES - BLOCK as u64;

/// Deterministic nonzero test signal, distinct per channel.
fn signal(frame: u64, channel: usize) -> f32 {
    let x = frame
        .wrapping_mul(2_654_435_761)
        .wrapping_add(channel as u64 * 7_919)
        % 1_000;
    0.05 + 0.85 * (x as f32 / 999.0)
}

fn silence(_frame: u64, _channel: usize) -> f32 {
    0.0
}

/// One single-token segment so synthesized word timing is exactly
/// `[start, end]`.
fn scripted_word(text: &str, start: f64, end: f64) -> RawSegment {
    RawSegment {
        start_cs: (start * 100.0).round() as i64,
        end_cs: (end * 100.0).round() as i64,
        tokens: vec![RawToken {
            id: 0,
            text: format!(" {text}"),
        }],
    }
}

/// The padded frame span the censor will patch for a scripted hit,
/// computed through the crate's own word-timing synthesis and the same
/// padding expressions, so float truncation matches the engine exactly.
fn expected_span(segments: &[RawSegment]) -> (u64, u64) {
    let words = synthesize_words(segments, i32::MAX, 5.0);
    let rate = RATE as f64;
    let start = ((words.first().unwrap().start - defaults::PRE_ROLL_SECONDS) * rate) as i64;
    let end = ((words.last().unwrap().end + defaults::POST_ROLL_SECONDS) * rate) as i64;
    let start = start.clamp(0, CHUNK_FRAMES as i64) as u64;
    let end = end.clamp(start as i64, CHUNK_FRAMES as i64) as u64;
    (start, end)
}

/// Pops one canned response per chunk; empty once the script runs out.
struct ScriptRecognizer {
    scripts: Mutex<VecDeque<Vec<RawSegment>>>,
}

impl ScriptRecognizer {
    fn new(scripts: Vec<Vec<RawSegment>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
        }
    }
}

impl Recognizer for ScriptRecognizer {
    fn transcribe_chunk(&self, _pcm_16k: &[f32]) -> Result<Vec<RawSegment>> {
        Ok(self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Scripted recognizer that signals entry and blocks until released,
/// simulating a recognizer slower than real time.
struct StalledRecognizer {
    inner: ScriptRecognizer,
    entered: Sender<()>,
    release: Receiver<()>,
}

impl Recognizer for StalledRecognizer {
    fn transcribe_chunk(&self, pcm_16k: &[f32]) -> Result<Vec<RawSegment>> {
        let _ = self.entered.send(());
        let _ = self.release.recv();
        self.inner.transcribe_chunk(pcm_16k)
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

fn build_engine(
    recognizer: Arc<dyn Recognizer>,
    lexicon_words: &[&str],
    mode: CensorMode,
) -> Arc<Engine> {
    let engine = Arc::new(
        Engine::new(
            EngineConfig {
                sample_rate: RATE,
                channels: CHANNELS,
                chunk_seconds: 5.0,
                initial_delay_seconds: 10.0,
                delay_headroom_seconds: 10.0,
                censor_mode: mode,
                enable_vocal_filter: false,
                enable_timestamp_refiner: false,
                quiet: true,
            },
            Arc::new(Lexicon::from_lines(lexicon_words.iter().copied())),
            recognizer,
        )
        .unwrap(),
    );
    engine.start().unwrap();
    engine
}

/// Feed `frames` frames of `source` through the engine in driver-sized
/// blocks, appending all produced output (interleaved) to `produced`.
fn feed(
    engine: &Engine,
    source: fn(u64, usize) -> f32,
    next_frame: &mut u64,
    frames: u64,
    produced: &mut Vec<f32>,
) {
    assert_eq!(frames % BLOCK as u64, 0);
    let mut input = vec![0.0f32; BLOCK * CHANNELS];
    let mut output = vec![0.0f32; BLOCK * CHANNELS];

    for _ in 0..frames / BLOCK as u64 {
        for i in 0..BLOCK {
            for ch in 0..CHANNELS {
                input[i * CHANNELS + ch] = source(*next_frame, ch);
            }
            *next_frame += 1;
        }
        engine.process(&input, &mut output);
        produced.extend_from_slice(&output);
    }
}

/// Drain output without feeding input (simulates capture stopping).
fn drain(engine: &Engine, frames: u64, produced: &mut Vec<f32>) {
    assert_eq!(frames % BLOCK as u64, 0);
    let mut output = vec![0.0f32; BLOCK * CHANNELS];
    for _ in 0..frames / BLOCK as u64 {
        engine.process_output(&mut output);
        produced.extend_from_slice(&output);
    }
}

fn wait_chunks(engine: &Engine, count: u64) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while engine.stats().chunks_processed < count {
        assert!(
            Instant::now() < deadline,
            "worker stuck below {count} chunks"
        );
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Map an output frame index to its delay-line (= input) frame, if playing.
fn delayed_source_frame(output_frame: u64) -> Option<u64> {
    output_frame.checked_sub(PLAY_START)
}

/// Assert the produced output equals the delayed input everywhere except
/// the given muted/reversed spans (input-frame ranges).
fn assert_identity_except(produced: &[f32], except: &[(u64, u64)]) {
    for (index, &sample) in produced.iter().enumerate() {
        let output_frame = (index / CHANNELS) as u64;
        let channel = index % CHANNELS;
        match delayed_source_frame(output_frame) {
            None => assert_eq!(sample, 0.0, "warm-up frame {output_frame} not silent"),
            Some(source) => {
                if except.iter().any(|&(s, e)| source >= s && source < e) {
                    continue;
                }
                assert_eq!(
                    sample,
                    signal(source, channel),
                    "frame {output_frame} ch {channel} (source {source}) altered"
                );
            }
        }
    }
}

// --- Scenario 1: silent input -------------------------------------------

#[test]
fn silent_input_warms_then_plays_silence() {
    let engine = build_engine(Arc::new(ScriptRecognizer::new(vec![])), &["badword"], CensorMode::Mute);

    let mut produced = Vec::new();
    let mut frame = 0u64;
    feed(&engine, silence, &mut frame, 15 * RATE as u64, &mut produced);

    wait_chunks(&engine, 2);
    engine.stop();

    assert!(produced.iter().all(|&s| s == 0.0), "nonzero sample on silent input");

    let stats = engine.stats();
    assert_eq!(stats.gate, GateState::Playing);
    // Fill settles at the initial delay, within one driver block.
    assert!(stats.fill_frames <= INITIAL_FRAMES);
    assert!(stats.fill_frames >= INITIAL_FRAMES - BLOCK as u64);
    assert_eq!(stats.profanity_hits, 0);
}

// --- Scenario 2: single profanity, Mute ---------------------------------

#[test]
fn single_profanity_is_muted_in_the_delayed_output() {
    // One hit in the first chunk: "badword" at 2.0-2.4s of input.
    let hit = vec![scripted_word("badword", 2.0, 2.4)];
    let engine = build_engine(
        Arc::new(ScriptRecognizer::new(vec![hit.clone()])),
        &["badword"],
        CensorMode::Mute,
    );

    let mut produced = Vec::new();
    let mut frame = 0u64;

    // First chunk, then let the worker patch before playback gets close.
    feed(&engine, signal, &mut frame, CHUNK_FRAMES, &mut produced);
    wait_chunks(&engine, 1);
    feed(&engine, signal, &mut frame, 15 * RATE as u64, &mut produced);
    engine.stop();

    // Padded span [2.0 - 0.4, 2.4 + 0.1]s = input frames [76800, 120000).
    let span = expected_span(&hit);

    // Muted region is exactly zero on both channels.
    for source in span.0..span.1 {
        let output_frame = (PLAY_START + source) as usize;
        assert_eq!(produced[output_frame * CHANNELS], 0.0);
        assert_eq!(produced[output_frame * CHANNELS + 1], 0.0);
    }
    // Everything else is the identity pass-through.
    assert_identity_except(&produced, &[span]);
    assert_eq!(engine.stats().profanity_hits, 1);
    assert_eq!(engine.stats().leaked_frames, 0);
}

// --- Scenario 3: single profanity, Reverse ------------------------------

#[test]
fn single_profanity_is_reversed_attenuated_and_faded() {
    let hit = vec![scripted_word("badword", 2.0, 2.4)];
    let engine = build_engine(
        Arc::new(ScriptRecognizer::new(vec![hit.clone()])),
        &["badword"],
        CensorMode::Reverse,
    );

    let mut produced = Vec::new();
    let mut frame = 0u64;
    feed(&engine, signal, &mut frame, CHUNK_FRAMES, &mut produced);
    wait_chunks(&engine, 1);
    feed(&engine, signal, &mut frame, 15 * RATE as u64, &mut produced);
    engine.stop();

    let (start, end) = expected_span(&hit);
    let span = (end - start) as usize;
    let fade = 480usize.min(span / 4);
    assert_eq!(fade, 480); // 10ms at 48kHz

    for i in 0..span {
        // Time-reversed source, attenuated, linear fades at both ends.
        let mirrored = start + (span - 1 - i) as u64;
        let gain = if i < fade {
            i as f32 / fade as f32
        } else if i >= span - fade {
            (span - i) as f32 / fade as f32
        } else {
            1.0
        };
        let output_frame = (PLAY_START + start + i as u64) as usize;
        for ch in 0..CHANNELS {
            let expect = signal(mirrored, ch) * 0.5 * gain;
            let got = produced[output_frame * CHANNELS + ch];
            assert!(
                (got - expect).abs() < 1e-5,
                "reversed frame {i} ch {ch}: got {got}, expected {expect}"
            );
        }
    }
    assert_identity_except(&produced, &[(start, end)]);
}

// --- Scenario 4: bigram hit ---------------------------------------------

#[test]
fn bigram_hit_patches_one_combined_span() {
    let hit = vec![
        scripted_word("holy", 1.0, 1.3),
        scripted_word("cow", 1.3, 1.6),
    ];
    // Only the concatenated form is in the lexicon.
    let engine = build_engine(
        Arc::new(ScriptRecognizer::new(vec![hit.clone()])),
        &["holycow"],
        CensorMode::Mute,
    );

    let mut produced = Vec::new();
    let mut frame = 0u64;
    feed(&engine, signal, &mut frame, CHUNK_FRAMES, &mut produced);
    wait_chunks(&engine, 1);
    feed(&engine, signal, &mut frame, 15 * RATE as u64, &mut produced);
    engine.stop();

    // Combined span [1.0 - 0.4, 1.6 + 0.1] = [0.6, 1.7]s, patched once.
    let span = expected_span(&hit);
    for source in span.0..span.1 {
        let output_frame = (PLAY_START + source) as usize;
        assert_eq!(produced[output_frame * CHANNELS], 0.0);
    }
    assert_identity_except(&produced, &[span]);
    assert_eq!(engine.stats().profanity_hits, 1);
}

// --- Scenario 5: ASR stall tolerance ------------------------------------

#[test]
fn stalled_recognizer_defers_chunks_without_dropouts() {
    // Hit late in the first chunk so it is still unplayed when the stalled
    // recognizer finally returns.
    let (entered_tx, entered_rx) = bounded(8);
    let (release_tx, release_rx) = bounded(8);
    let hit = vec![scripted_word("badword", 4.5, 4.8)];
    let recognizer = StalledRecognizer {
        inner: ScriptRecognizer::new(vec![hit.clone()]),
        entered: entered_tx,
        release: release_rx,
    };
    let engine = build_engine(Arc::new(recognizer), &["badword"], CensorMode::Mute);

    let mut produced = Vec::new();
    let mut frame = 0u64;

    // 5s: first chunk hands off; the worker enters the recognizer and hangs.
    feed(&engine, signal, &mut frame, CHUNK_FRAMES, &mut produced);
    entered_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("worker never reached the recognizer");

    // 8 more seconds of audio while the recognizer is stuck. Playback
    // starts at 10s; nothing may be handed off and nothing may drop out.
    feed(&engine, signal, &mut frame, 8 * RATE as u64, &mut produced);
    assert_eq!(engine.stats().chunks_processed, 0);
    assert_eq!(engine.stats().gate, GateState::Playing);

    // Recognizer completes at simulated t=13s; the hit spans input
    // [4.1, 4.9]s and plays at 14.1s, so the patch still lands in time.
    release_tx.send(()).unwrap();
    wait_chunks(&engine, 1);

    feed(&engine, signal, &mut frame, 7 * RATE as u64, &mut produced);

    // The deferred second chunk went out after the first completed; release
    // it so shutdown is clean.
    while entered_rx.try_recv().is_ok() {}
    drop(release_tx);
    engine.stop();

    // Padded span [4.5 - 0.4, 4.8 + 0.1]s of the first chunk.
    let span = expected_span(&hit);
    for source in span.0..span.1 {
        let output_frame = (PLAY_START + source) as usize;
        assert_eq!(produced[output_frame * CHANNELS], 0.0);
    }
    // No dropouts anywhere else: output is the delayed identity.
    assert_identity_except(&produced, &[span]);
    assert_eq!(engine.stats().leaked_frames, 0);
}

// --- Scenario 6: underrun suppression -----------------------------------

#[test]
fn underrun_suppresses_censorship_and_word_leaks_through() {
    // The second chunk carries the hit; its recognition is gated so the
    // underrun can be forced first.
    let (entered_tx, entered_rx) = bounded(8);
    let (release_tx, release_rx) = bounded(8);
    let recognizer = StalledRecognizer {
        inner: ScriptRecognizer::new(vec![
            Vec::new(),
            vec![scripted_word("badword", 2.0, 2.4)],
        ]),
        entered: entered_tx,
        release: release_rx,
    };
    let engine = build_engine(Arc::new(recognizer), &["badword"], CensorMode::Mute);

    let mut produced = Vec::new();
    let mut frame = 0u64;

    // 10s: both chunks hand off, gate opens. Let chunk 1 (empty) through.
    feed(&engine, signal, &mut frame, CHUNK_FRAMES, &mut produced);
    entered_rx.recv_timeout(Duration::from_secs(10)).unwrap();
    release_tx.send(()).unwrap();
    wait_chunks(&engine, 1);
    feed(&engine, signal, &mut frame, CHUNK_FRAMES, &mut produced);
    entered_rx.recv_timeout(Duration::from_secs(10)).unwrap();

    // Capture stops while playback continues: fill sinks below the
    // underrun threshold (9s) but stays above the pause threshold (8s).
    drain(&engine, 72_000, &mut produced); // 1.5s
    let stats = engine.stats();
    assert!(stats.underrun, "underrun flag not raised at {}s fill", stats.fill_seconds);
    assert_eq!(stats.gate, GateState::Playing);

    // Chunk 2's hit arrives now and must be skipped, not patched.
    release_tx.send(()).unwrap();
    wait_chunks(&engine, 2);
    drop(release_tx);

    feed(&engine, signal, &mut frame, 5 * RATE as u64, &mut produced);
    engine.stop();

    let stats = engine.stats();
    assert_eq!(stats.profanity_hits, 0);
    assert_eq!(stats.skipped_hits, 1);

    // The word plays through untouched: full identity, no muted span.
    assert_identity_except(&produced, &[]);
}

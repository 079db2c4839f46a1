//! Mono capture accumulator and the chunk handoff to the Whisper worker.
//!
//! The input context downmixes every frame into a ring of exactly one chunk
//! (`K` samples). When a chunk's worth of new audio has arrived and the
//! worker is idle, the ring is snapshotted (oldest sample first) into the
//! handoff slot together with the absolute write position at that instant.
//! Ring storage means a stalled worker never causes dropped audio: the ring
//! simply keeps overwriting its oldest samples until the worker is ready
//! for the most recent `K`.

use crate::engine::delay_line::DelayLine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

/// Fixed-length mono ring holding the most recent `K` downmixed samples.
pub struct CaptureBuffer {
    data: Vec<f32>,
    write_pos: usize,
    total: u64,
}

impl CaptureBuffer {
    pub fn new(chunk_frames: usize) -> Self {
        assert!(chunk_frames > 0, "chunk length must be non-zero");
        Self {
            data: vec![0.0; chunk_frames],
            write_pos: 0,
            total: 0,
        }
    }

    /// Chunk length `K` in samples.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Total samples ever pushed.
    pub fn total_written(&self) -> u64 {
        self.total
    }

    /// Append one downmixed sample, overwriting the oldest when full.
    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.data[self.write_pos] = sample;
        self.write_pos += 1;
        if self.write_pos == self.data.len() {
            self.write_pos = 0;
        }
        self.total += 1;
    }

    /// Copy the most recent `K` samples into `out`, oldest first.
    ///
    /// Requires that at least `K` samples have been pushed.
    pub fn snapshot_into(&self, out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.data.len());
        debug_assert!(self.total >= self.data.len() as u64);
        let tail = self.data.len() - self.write_pos;
        out[..tail].copy_from_slice(&self.data[self.write_pos..]);
        out[tail..].copy_from_slice(&self.data[..self.write_pos]);
    }
}

/// State shared between the input context and the Whisper worker for one
/// chunk in flight.
struct ChunkSlot {
    /// Snapshot of the capture ring, oldest sample first.
    samples: Vec<f32>,
    /// Delay-line write position at the instant of handoff. The chunk covers
    /// absolute frames `[capture_end_pos - K, capture_end_pos)`.
    capture_end_pos: u64,
}

/// Single-slot rendezvous between capture and the Whisper worker.
///
/// The input context publishes only when the worker is idle
/// (`is_busy() == false`), so the mutex is uncontended by construction: the
/// worker copies the slot out and releases the lock before it touches the
/// recognizer.
pub struct ChunkHandoff {
    slot: Mutex<ChunkSlot>,
    ready: Condvar,
    has_new: AtomicBool,
}

impl ChunkHandoff {
    pub fn new(chunk_frames: usize) -> Self {
        Self {
            slot: Mutex::new(ChunkSlot {
                samples: vec![0.0; chunk_frames],
                capture_end_pos: 0,
            }),
            ready: Condvar::new(),
            has_new: AtomicBool::new(false),
        }
    }

    /// True while the worker has not yet collected the last published chunk.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.has_new.load(Ordering::Acquire)
    }

    /// Publish the capture ring to the worker. Input context only; callers
    /// must have checked `is_busy() == false`.
    pub fn publish(&self, capture: &CaptureBuffer, delay: &DelayLine) {
        // A poisoned mutex means the worker panicked; the audio context must
        // keep running regardless, so the chunk is simply not published.
        let Ok(mut slot) = self.slot.lock() else {
            return;
        };
        capture.snapshot_into(&mut slot.samples);
        slot.capture_end_pos = delay.write_pos();
        self.has_new.store(true, Ordering::Release);
        self.ready.notify_one();
    }

    /// Worker side: block until a chunk is published or `stop` is raised.
    ///
    /// Returns the chunk's `capture_end_pos`, copying its samples into
    /// `local`, or `None` on shutdown.
    pub fn take(&self, local: &mut [f32], stop: &AtomicBool) -> Option<u64> {
        let Ok(mut slot) = self.slot.lock() else {
            return None;
        };
        while !self.has_new.load(Ordering::Acquire) && !stop.load(Ordering::Acquire) {
            slot = match self.ready.wait(slot) {
                Ok(guard) => guard,
                Err(_) => return None,
            };
        }
        if stop.load(Ordering::Acquire) {
            return None;
        }
        local.copy_from_slice(&slot.samples);
        let end_pos = slot.capture_end_pos;
        self.has_new.store(false, Ordering::Release);
        Some(end_pos)
    }

    /// Wake the worker so it can observe a stop flag.
    pub fn notify_stop(&self) {
        self.ready.notify_all();
    }
}

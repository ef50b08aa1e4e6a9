//! Sliding-window bulk-data reliability: tracks in-flight `Data` frames,
//! interprets cumulative ACK + NACK bitmap, and detects timeouts.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::core::NACK_BITMAP_BITS;

/// A single in-flight frame tracked by the window.
#[derive(Debug, Clone)]
struct InFlight {
    encoded: Vec<u8>,
    sent_at: Instant,
    retry_count: u32,
}

/// Bounded set of in-flight `Data` frames awaiting acknowledgement.
///
/// Owned exclusively by the GATT transport (per the concurrency model, no
/// component shares this state — it is mutated by one task at a time).
#[derive(Debug)]
pub struct SlidingWindow {
    entries: BTreeMap<u64, InFlight>,
    window_size: usize,
}

impl SlidingWindow {
    /// Create a window admitting at most `window_size` in-flight sequences.
    /// `window_size` is clamped to at least 1.
    pub fn new(window_size: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            window_size: window_size.max(1),
        }
    }

    /// `true` if `seq` is already in flight (an idempotent resend), or the
    /// window has a free slot.
    pub fn can_send(&self, seq: u64) -> bool {
        self.entries.contains_key(&seq) || self.entries.len() < self.window_size
    }

    /// Record (or refresh) that `seq` was just sent.
    pub fn mark_sent(&mut self, seq: u64, encoded: Vec<u8>, now: Instant) {
        self.entries.insert(
            seq,
            InFlight {
                encoded,
                sent_at: now,
                retry_count: 0,
            },
        );
    }

    /// Apply a cumulative + selective ACK. Removes every entry with
    /// `sequence <= cum_seq`, then returns the still-in-flight sequences
    /// named by `nack_bitmap` (bit `b` => sequence `cum_seq + 1 + b`),
    /// sorted ascending.
    pub fn process_ack(&mut self, cum_seq: u64, nack_bitmap: u64) -> Vec<u64> {
        self.entries.retain(|&seq, _| seq > cum_seq);

        let mut retransmit = Vec::new();
        for bit in 0..NACK_BITMAP_BITS {
            if nack_bitmap & (1 << bit) == 0 {
                continue;
            }
            let seq = cum_seq + 1 + bit;
            if self.entries.contains_key(&seq) {
                retransmit.push(seq);
            }
        }
        retransmit.sort_unstable();
        trace!(cum_seq, nack_bitmap, ?retransmit, "processed ack");
        retransmit
    }

    /// Every in-flight sequence whose `sent_at` has not been refreshed
    /// within `timeout`, sorted ascending.
    pub fn timed_out_sequences(&self, now: Instant, timeout: Duration) -> Vec<u64> {
        let mut timed_out: Vec<u64> = self
            .entries
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.sent_at) >= timeout)
            .map(|(&seq, _)| seq)
            .collect();
        timed_out.sort_unstable();
        timed_out
    }

    /// Refresh `sent_at` and bump `retry_count` for a retransmitted entry.
    /// No-op if `seq` is no longer tracked (already acked).
    pub fn mark_retransmitted(&mut self, seq: u64, now: Instant) {
        if let Some(entry) = self.entries.get_mut(&seq) {
            entry.sent_at = now;
            entry.retry_count += 1;
        }
    }

    /// Number of sequences currently in flight.
    pub fn inflight_count(&self) -> usize {
        self.entries.len()
    }

    /// Retry count for a tracked sequence, if any.
    pub fn retry_count(&self, seq: u64) -> Option<u32> {
        self.entries.get(&seq).map(|e| e.retry_count)
    }

    /// The previously-sent encoded bytes for a tracked sequence, if any.
    pub fn encoded(&self, seq: u64) -> Option<&[u8]> {
        self.entries.get(&seq).map(|e| e.encoded.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_send_respects_window_size_and_idempotent_resend() {
        let mut window = SlidingWindow::new(2);
        assert!(window.can_send(0));
        window.mark_sent(0, vec![], Instant::now());
        assert!(window.can_send(1));
        window.mark_sent(1, vec![], Instant::now());
        // Window full: a new sequence is rejected...
        assert!(!window.can_send(2));
        // ...but re-sending an already-tracked one is fine.
        assert!(window.can_send(0));
    }

    #[test]
    fn cumulative_ack_clears_covered_sequences() {
        let mut window = SlidingWindow::new(8);
        let now = Instant::now();
        for seq in 0..5 {
            window.mark_sent(seq, vec![], now);
        }
        let retransmit = window.process_ack(3, 0);
        assert!(retransmit.is_empty());
        assert_eq!(window.inflight_count(), 1); // only seq 4 remains
        assert!(window.can_send(4));
        assert!(window.can_send(100)); // below window size now
    }

    #[test]
    fn nack_bitmap_returns_selective_retransmit_candidates() {
        let mut window = SlidingWindow::new(16);
        let now = Instant::now();
        for seq in 10..=14 {
            window.mark_sent(seq, vec![], now);
        }
        // inflight {10,11,12,13,14}; cumSeq=10, bitmap 0b101 => bits 0 and 2
        // set => sequences 11 and 13.
        let retransmit = window.process_ack(10, 0b101);
        assert_eq!(retransmit, vec![11, 13]);
    }

    #[test]
    fn nack_bitmap_ignores_sequences_already_acked_or_unsent() {
        let mut window = SlidingWindow::new(16);
        window.mark_sent(11, vec![], Instant::now());
        // Bit for seq 13 set too, but 13 was never sent.
        let retransmit = window.process_ack(10, 0b101);
        assert_eq!(retransmit, vec![11]);
    }

    #[test]
    fn timeout_detection_respects_refreshed_sent_at() {
        let mut window = SlidingWindow::new(4);
        let t0 = Instant::now();
        window.mark_sent(1, vec![], t0);

        let timeout = Duration::from_millis(100);
        assert_eq!(window.timed_out_sequences(t0 + timeout, timeout), vec![1]);

        window.mark_retransmitted(1, t0 + timeout);
        assert!(
            window
                .timed_out_sequences(t0 + timeout, timeout)
                .is_empty()
        );
        assert_eq!(window.retry_count(1), Some(1));
    }

    #[test]
    fn multiple_timeouts_sorted_ascending() {
        let mut window = SlidingWindow::new(8);
        let t0 = Instant::now();
        window.mark_sent(5, vec![], t0);
        window.mark_sent(2, vec![], t0);
        window.mark_sent(9, vec![], t0);

        let timeout = Duration::from_millis(10);
        let timed_out = window.timed_out_sequences(t0 + timeout, timeout);
        assert_eq!(timed_out, vec![2, 5, 9]);
    }

    #[test]
    fn zero_window_size_is_clamped_to_one() {
        let window = SlidingWindow::new(0);
        assert!(window.can_send(0));
    }
}

//! GATT transport: fragments envelopes across MTU-sized packets,
//! reassembles incoming packets, and drives sliding-window retransmission
//! over an unreliable, flow-controlled write path.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::core::{
    GATT_FLAG_BULK, GATT_FLAG_CONTROL, GATT_HEADER_SIZE, GATT_MAGIC, GATT_MIN_PACKET_SIZE,
    GhostDropConfig, TransportError,
};
use crate::frame::{self, Frame};
use crate::window::SlidingWindow;

use super::TransportKind;
use super::radio::GattLink;

/// Fixed GATT packet header: `magic | frameID | fragmentIndex |
/// fragmentCount | flags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PacketHeader {
    frame_id: u32,
    fragment_index: u16,
    fragment_count: u16,
    flags: u8,
}

impl PacketHeader {
    fn encode(&self) -> [u8; GATT_HEADER_SIZE] {
        let mut out = [0u8; GATT_HEADER_SIZE];
        out[0..2].copy_from_slice(&GATT_MAGIC);
        out[2..6].copy_from_slice(&self.frame_id.to_be_bytes());
        out[6..8].copy_from_slice(&self.fragment_index.to_be_bytes());
        out[8..10].copy_from_slice(&self.fragment_count.to_be_bytes());
        out[10] = self.flags;
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self, TransportError> {
        if bytes.len() < GATT_HEADER_SIZE {
            return Err(TransportError::Io("truncated GATT packet header".into()));
        }
        if bytes[0..2] != GATT_MAGIC {
            return Err(TransportError::Io("bad GATT packet magic".into()));
        }
        Ok(Self {
            frame_id: u32::from_be_bytes(bytes[2..6].try_into().unwrap()),
            fragment_index: u16::from_be_bytes(bytes[6..8].try_into().unwrap()),
            fragment_count: u16::from_be_bytes(bytes[8..10].try_into().unwrap()),
            flags: bytes[10],
        })
    }
}

/// Split an encoded envelope into `ceil(len / capacity)` (at least one)
/// full wire packets, each carrying `header || fragment`.
fn fragment_envelope(envelope: &[u8], frame_id: u32, flags: u8, capacity: usize) -> Vec<Vec<u8>> {
    let fragment_count = envelope.len().div_ceil(capacity).max(1) as u16;
    let mut packets = Vec::with_capacity(fragment_count as usize);

    for index in 0..fragment_count {
        let start = (index as usize) * capacity;
        let end = (start + capacity).min(envelope.len());
        let header = PacketHeader {
            frame_id,
            fragment_index: index,
            fragment_count,
            flags,
        };
        let mut packet = Vec::with_capacity(GATT_HEADER_SIZE + (end - start));
        packet.extend_from_slice(&header.encode());
        packet.extend_from_slice(&envelope[start..end]);
        packets.push(packet);
    }
    packets
}

struct ReassemblyEntry {
    fragment_count: u16,
    fragments: HashMap<u16, Vec<u8>>,
    updated_at: Instant,
}

/// Monotonic frame-ID generator used purely as a reassembly key (not a
/// sequence number); wraps around `u32::MAX` while skipping zero.
#[derive(Default)]
struct FrameIdGenerator(u32);

impl FrameIdGenerator {
    fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_add(1);
        if self.0 == 0 {
            self.0 = 1;
        }
        self.0
    }
}

/// Fragmentation + sliding-window reliability over a [`GattLink`].
pub struct GattTransport {
    link: Arc<dyn GattLinkHandle>,
    capacity: usize,
    window: Arc<Mutex<SlidingWindow>>,
    window_notify: Arc<Notify>,
    frame_ids: Arc<Mutex<FrameIdGenerator>>,
    incoming_rx: mpsc::UnboundedReceiver<Frame>,
    tasks: Vec<JoinHandle<()>>,
}

/// Object-safe facade over [`GattLink`] so [`GattTransport`] can hold a
/// trait object without becoming generic over every adapter type.
trait GattLinkHandle: Send + Sync {
    fn write_packet<'a>(
        &'a self,
        bytes: &'a [u8],
        requires_response: bool,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), TransportError>> + Send + 'a>>;

    fn can_send_without_response<'a>(
        &'a self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = bool> + Send + 'a>>;

    fn wait_for_write_without_response_ready<'a>(
        &'a self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>>;

    fn next_incoming_packet<'a>(
        &'a self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Option<Vec<u8>>> + Send + 'a>>;
}

impl<L: GattLink + Sync + 'static> GattLinkHandle for L {
    fn write_packet<'a>(
        &'a self,
        bytes: &'a [u8],
        requires_response: bool,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), TransportError>> + Send + 'a>>
    {
        Box::pin(GattLink::write_packet(self, bytes, requires_response))
    }

    fn can_send_without_response<'a>(
        &'a self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = bool> + Send + 'a>> {
        Box::pin(GattLink::can_send_without_response(self))
    }

    fn wait_for_write_without_response_ready<'a>(
        &'a self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
        Box::pin(GattLink::wait_for_write_without_response_ready(self))
    }

    fn next_incoming_packet<'a>(
        &'a self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Option<Vec<u8>>> + Send + 'a>> {
        Box::pin(GattLink::next_incoming_packet(self))
    }
}

impl GattTransport {
    /// Start the transport over `link`. Spawns the receive/reassembly loop
    /// and the retry timer as background tasks.
    pub fn new<L: GattLink + Sync + 'static>(
        link: L,
        max_packet_size: usize,
        window_size: usize,
        config: &GhostDropConfig,
    ) -> Self {
        let max_packet_size = max_packet_size.max(GATT_MIN_PACKET_SIZE);
        let capacity = max_packet_size - GATT_HEADER_SIZE;
        let link: Arc<dyn GattLinkHandle> = Arc::new(link);
        let window = Arc::new(Mutex::new(SlidingWindow::new(window_size)));
        let window_notify = Arc::new(Notify::new());
        let frame_ids = Arc::new(Mutex::new(FrameIdGenerator::default()));
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();

        let receive_task = tokio::spawn(receive_loop(
            link.clone(),
            window.clone(),
            window_notify.clone(),
            frame_ids.clone(),
            capacity,
            config.reassembly_stale_after,
            incoming_tx,
        ));
        let retry_task = tokio::spawn(retry_loop(
            link.clone(),
            window.clone(),
            window_notify.clone(),
            frame_ids.clone(),
            capacity,
            config.retry_interval,
            config.retry_timeout,
        ));

        Self {
            link,
            capacity,
            window,
            window_notify,
            frame_ids,
            incoming_rx,
            tasks: vec![receive_task, retry_task],
        }
    }

    /// Send a frame, following the bulk-vs-control policy from the spec.
    pub async fn send(&self, frame: Frame) -> Result<(), TransportError> {
        let envelope = frame::encode(&frame);

        if let Frame::Data { seq, .. } = &frame {
            let seq = *seq;
            self.wait_for_window_slot(seq).await;
            let frame_id = self.frame_ids.lock().await.next();
            send_fragments_unacked(&self.link, &envelope, frame_id, GATT_FLAG_BULK, self.capacity)
                .await?;
            self.window
                .lock()
                .await
                .mark_sent(seq, envelope, Instant::now());
            self.window_notify.notify_waiters();
            Ok(())
        } else {
            let frame_id = self.frame_ids.lock().await.next();
            send_fragments_acked(&self.link, &envelope, frame_id, GATT_FLAG_CONTROL, self.capacity)
                .await
        }
    }

    async fn wait_for_window_slot(&self, seq: u64) {
        loop {
            let notified = self.window_notify.notified();
            if self.window.lock().await.can_send(seq) {
                return;
            }
            notified.await;
        }
    }

    /// Receive the next reassembled, decoded frame. `None` once the
    /// background receive task has ended (link closed).
    pub async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        self.incoming_rx.recv().await.map(Ok)
    }

    /// Stop background tasks.
    pub async fn close(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    /// Always `Gatt`.
    pub fn current_kind(&self) -> TransportKind {
        TransportKind::Gatt
    }

    #[cfg(test)]
    fn capacity(&self) -> usize {
        self.capacity
    }
}

async fn send_fragments_unacked(
    link: &Arc<dyn GattLinkHandle>,
    envelope: &[u8],
    frame_id: u32,
    flags: u8,
    capacity: usize,
) -> Result<(), TransportError> {
    let packets = fragment_envelope(envelope, frame_id, flags, capacity);
    for packet in packets {
        if !link.can_send_without_response().await {
            link.wait_for_write_without_response_ready().await;
        }
        link.write_packet(&packet, false).await?;
    }
    Ok(())
}

async fn send_fragments_acked(
    link: &Arc<dyn GattLinkHandle>,
    envelope: &[u8],
    frame_id: u32,
    flags: u8,
    capacity: usize,
) -> Result<(), TransportError> {
    let packets = fragment_envelope(envelope, frame_id, flags, capacity);
    for packet in packets {
        link.write_packet(&packet, true).await?;
    }
    Ok(())
}

async fn retransmit_bulk(
    link: &Arc<dyn GattLinkHandle>,
    encoded: &[u8],
    capacity: usize,
    frame_ids: &Arc<Mutex<FrameIdGenerator>>,
) -> Result<(), TransportError> {
    let frame_id = frame_ids.lock().await.next();
    let packets = fragment_envelope(encoded, frame_id, GATT_FLAG_BULK, capacity);
    for packet in packets {
        if !link.can_send_without_response().await {
            link.wait_for_write_without_response_ready().await;
        }
        link.write_packet(&packet, false).await?;
    }
    Ok(())
}

async fn receive_loop(
    link: Arc<dyn GattLinkHandle>,
    window: Arc<Mutex<SlidingWindow>>,
    window_notify: Arc<Notify>,
    frame_ids: Arc<Mutex<FrameIdGenerator>>,
    capacity: usize,
    stale_after: Duration,
    incoming_tx: mpsc::UnboundedSender<Frame>,
) {
    let mut reassembly: HashMap<u32, ReassemblyEntry> = HashMap::new();

    loop {
        let Some(packet) = link.next_incoming_packet().await else {
            debug!("GATT link closed, ending receive loop");
            return;
        };

        let header = match PacketHeader::decode(&packet) {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "dropping malformed GATT packet");
                continue;
            }
        };

        let fragment = packet[GATT_HEADER_SIZE..].to_vec();
        let now = Instant::now();
        let entry = reassembly.entry(header.frame_id).or_insert_with(|| ReassemblyEntry {
            fragment_count: header.fragment_count,
            fragments: HashMap::new(),
            updated_at: now,
        });
        entry.fragments.insert(header.fragment_index, fragment);
        entry.updated_at = now;

        if entry.fragments.len() == entry.fragment_count as usize {
            let entry = reassembly.remove(&header.frame_id).unwrap();
            let mut envelope = Vec::new();
            for index in 0..entry.fragment_count {
                match entry.fragments.get(&index) {
                    Some(bytes) => envelope.extend_from_slice(bytes),
                    None => {
                        warn!(frame_id = header.frame_id, "reassembly missing fragment");
                        continue;
                    }
                }
            }

            match frame::decode(&envelope) {
                Ok(Frame::Ack { cum_seq, nack_bitmap }) => {
                    let retransmit = window.lock().await.process_ack(cum_seq, nack_bitmap);
                    window_notify.notify_waiters();
                    for seq in retransmit {
                        let encoded = window.lock().await.encoded(seq).map(|b| b.to_vec());
                        if let Some(encoded) = encoded {
                            if let Err(e) =
                                retransmit_bulk(&link, &encoded, capacity, &frame_ids).await
                            {
                                warn!(seq, error = %e, "NACK-triggered retransmit failed");
                            }
                        }
                    }
                }
                Ok(frame) => {
                    if incoming_tx.send(frame).is_err() {
                        return;
                    }
                }
                Err(e) => warn!(error = %e, "dropping malformed reassembled envelope"),
            }
        }

        reassembly.retain(|_, e| now.saturating_duration_since(e.updated_at) < stale_after);
    }
}

async fn retry_loop(
    link: Arc<dyn GattLinkHandle>,
    window: Arc<Mutex<SlidingWindow>>,
    window_notify: Arc<Notify>,
    frame_ids: Arc<Mutex<FrameIdGenerator>>,
    capacity: usize,
    retry_interval: Duration,
    retry_timeout: Duration,
) {
    let mut ticker = tokio::time::interval(retry_interval);
    loop {
        ticker.tick().await;
        let now = Instant::now();
        let timed_out = window.lock().await.timed_out_sequences(now, retry_timeout);
        for seq in timed_out {
            let encoded = window.lock().await.encoded(seq).map(|b| b.to_vec());
            let Some(encoded) = encoded else { continue };
            trace!(seq, "retransmitting timed-out sequence");
            if let Err(e) = retransmit_bulk(&link, &encoded, capacity, &frame_ids).await {
                warn!(seq, error = %e, "timeout-triggered retransmit failed");
                continue;
            }
            window.lock().await.mark_retransmitted(seq, now);
            window_notify.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = PacketHeader {
            frame_id: 0xDEADBEEF,
            fragment_index: 2,
            fragment_count: 5,
            flags: GATT_FLAG_CONTROL,
        };
        let encoded = header.encode();
        let decoded = PacketHeader::decode(&encoded).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn fragmentation_covers_whole_envelope_and_uses_at_least_one_fragment() {
        let envelope = vec![7u8; 250];
        let packets = fragment_envelope(&envelope, 1, GATT_FLAG_BULK, 40);
        assert_eq!(packets.len(), 250usize.div_ceil(40));

        let mut reconstructed = Vec::new();
        for packet in &packets {
            reconstructed.extend_from_slice(&packet[GATT_HEADER_SIZE..]);
        }
        assert_eq!(reconstructed, envelope);

        // Empty envelope still yields exactly one fragment.
        let empty = fragment_envelope(&[], 2, GATT_FLAG_BULK, 40);
        assert_eq!(empty.len(), 1);
    }

    #[test]
    fn frame_id_generator_wraps_skipping_zero() {
        let mut gen = FrameIdGenerator(u32::MAX);
        assert_eq!(gen.next(), 1);
        let mut gen = FrameIdGenerator(0);
        assert_eq!(gen.next(), 1);
    }
}

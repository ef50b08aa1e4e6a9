//! L2CAP transport: a thin byte-stream wrapper that feeds the frame codec's
//! streaming reassembly over a reliable, credit-flow-controlled channel.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::core::TransportError;
use crate::frame::{self, Frame};

use super::TransportKind;
use super::radio::L2capLink;

/// Object-safe facade over [`L2capLink`], mirroring [`super::gatt`]'s
/// bridge from a generic link type to a concrete transport struct.
trait L2capLinkHandle: Send + Sync {
    fn write<'a>(
        &'a self,
        bytes: &'a [u8],
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), TransportError>> + Send + 'a>>;

    fn read<'a>(
        &'a self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<u8>, TransportError>> + Send + 'a>>;
}

impl<L: L2capLink + Sync + 'static> L2capLinkHandle for L {
    fn write<'a>(
        &'a self,
        bytes: &'a [u8],
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), TransportError>> + Send + 'a>>
    {
        Box::pin(L2capLink::write(self, bytes))
    }

    fn read<'a>(
        &'a self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<u8>, TransportError>> + Send + 'a>>
    {
        Box::pin(L2capLink::read(self))
    }
}

/// Stream-oriented frame transport over an L2CAP channel-of-credit link.
pub struct L2capTransport {
    link: Arc<dyn L2capLinkHandle>,
    incoming_rx: mpsc::UnboundedReceiver<Result<Frame, TransportError>>,
    reader_task: Option<JoinHandle<()>>,
}

impl L2capTransport {
    /// Wrap `link`, spawning the background reader loop.
    pub fn new<L: L2capLink + Sync + 'static>(link: L) -> Self {
        let link: Arc<dyn L2capLinkHandle> = Arc::new(link);
        let (tx, rx) = mpsc::unbounded_channel();
        let reader_task = tokio::spawn(reader_loop(link.clone(), tx));
        Self {
            link,
            incoming_rx: rx,
            reader_task: Some(reader_task),
        }
    }

    /// Encode and write `frame` to the stream. May await on peer credit.
    pub async fn send(&self, frame: Frame) -> Result<(), TransportError> {
        let encoded = frame::encode(&frame);
        self.link.write(&encoded).await
    }

    /// Receive the next frame decoded from the stream, or the error that
    /// terminated it.
    pub async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        self.incoming_rx.recv().await
    }

    /// Stop the background reader loop.
    pub async fn close(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }

    /// Always `L2cap`.
    pub fn current_kind(&self) -> TransportKind {
        TransportKind::L2cap
    }
}

async fn reader_loop(
    link: Arc<dyn L2capLinkHandle>,
    tx: mpsc::UnboundedSender<Result<Frame, TransportError>>,
) {
    let mut buffer = Vec::new();
    loop {
        let chunk = match link.read().await {
            Ok(chunk) => chunk,
            Err(e) => {
                let _ = tx.send(Err(TransportError::Io(e.to_string())));
                return;
            }
        };
        if chunk.is_empty() {
            debug!("L2CAP stream closed cleanly");
            return;
        }
        buffer.extend_from_slice(&chunk);

        match frame::consume_frames(&mut buffer) {
            Ok(frames) => {
                for frame in frames {
                    if tx.send(Ok(frame)).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                let _ = tx.send(Err(TransportError::Codec(e)));
                return;
            }
        }
    }
}

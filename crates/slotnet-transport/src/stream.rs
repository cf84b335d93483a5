use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use slotnet_packet::{Packet, Reassembler};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::inbound::{InboundSink, SlotId, TransportKind};
use crate::socket::{configure_stream, DEFAULT_BUFFER_SIZE};

/// A slot's TCP channel.
///
/// Idle until [`connect`](StreamChannel::connect) binds an accepted stream,
/// back to idle after [`disconnect`](StreamChannel::disconnect). The same
/// channel object is reused for every connection the slot ever carries.
#[derive(Debug)]
pub struct StreamChannel {
    slot: SlotId,
    buffer_size: usize,
    generation: AtomicU64,
    state: Mutex<Option<StreamConnection>>,
}

#[derive(Debug)]
struct StreamConnection {
    writer: Arc<tokio::sync::Mutex<OwnedWriteHalf>>,
    peer: SocketAddr,
    generation: u64,
    reader: JoinHandle<()>,
}

impl StreamChannel {
    pub fn new(slot: SlotId) -> Self {
        Self::with_buffer_size(slot, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(slot: SlotId, buffer_size: usize) -> Self {
        Self {
            slot,
            buffer_size,
            generation: AtomicU64::new(0),
            state: Mutex::new(None),
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Bind an accepted stream and start its receive task.
    ///
    /// Fails with [`TransportError::Occupied`] when the channel already
    /// carries a connection; the check and the bind happen under one lock.
    /// Must be called from within a tokio runtime.
    pub fn connect(&self, stream: TcpStream, sink: Arc<dyn InboundSink>) -> Result<SocketAddr> {
        let mut state = self.lock_state();
        if state.is_some() {
            return Err(TransportError::Occupied);
        }

        configure_stream(&stream, self.buffer_size)?;
        let peer = stream.peer_addr()?;
        let (reader, writer) = stream.into_split();

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let reader = tokio::spawn(receive_loop(
            self.slot,
            generation,
            reader,
            self.buffer_size,
            sink,
        ));

        *state = Some(StreamConnection {
            writer: Arc::new(tokio::sync::Mutex::new(writer)),
            peer,
            generation,
            reader,
        });
        info!(slot = self.slot, %peer, generation, "stream connected");
        Ok(peer)
    }

    /// Write a finalized packet to the connection.
    pub async fn send(&self, packet: &Packet) -> Result<()> {
        if !packet.is_finalized() {
            return Err(TransportError::Unframed);
        }
        let writer = self
            .lock_state()
            .as_ref()
            .map(|conn| Arc::clone(&conn.writer))
            .ok_or(TransportError::NotConnected)?;

        let mut writer = writer.lock().await;
        writer.write_all(packet.as_bytes()).await?;
        Ok(())
    }

    /// Drop the connection and stop its receive task. Idempotent.
    ///
    /// Returns whether a connection was actually torn down.
    pub fn disconnect(&self) -> bool {
        let conn = self.lock_state().take();
        self.teardown(conn)
    }

    /// Disconnect only if the current connection has the given generation.
    pub fn disconnect_generation(&self, generation: u64) -> bool {
        let conn = {
            let mut state = self.lock_state();
            match state.as_ref() {
                Some(conn) if conn.generation == generation => state.take(),
                _ => None,
            }
        };
        self.teardown(conn)
    }

    pub fn is_connected(&self) -> bool {
        self.lock_state().is_some()
    }

    /// Remote address of the current connection.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.lock_state().as_ref().map(|conn| conn.peer)
    }

    /// Generation of the current connection, if any.
    pub fn generation(&self) -> Option<u64> {
        self.lock_state().as_ref().map(|conn| conn.generation)
    }

    fn teardown(&self, conn: Option<StreamConnection>) -> bool {
        match conn {
            Some(conn) => {
                conn.reader.abort();
                info!(slot = self.slot, peer = %conn.peer, generation = conn.generation, "stream disconnected");
                true
            }
            None => false,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, Option<StreamConnection>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn receive_loop(
    slot: SlotId,
    generation: u64,
    mut reader: OwnedReadHalf,
    buffer_size: usize,
    sink: Arc<dyn InboundSink>,
) {
    let mut scratch = vec![0u8; buffer_size.max(1)];
    let mut reassembler = Reassembler::new();

    loop {
        match reader.read(&mut scratch).await {
            Ok(0) => {
                debug!(slot, "peer closed stream");
                break;
            }
            Ok(n) => {
                for frame in reassembler.feed(&scratch[..n]) {
                    sink.on_frame(slot, TransportKind::Stream, frame);
                }
            }
            Err(err) => {
                warn!(slot, error = %err, "stream read failed");
                break;
            }
        }
    }

    sink.on_stream_closed(slot, generation);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use slotnet_packet::Frame;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    use super::*;

    #[derive(Debug)]
    enum Event {
        Frame(SlotId, Frame),
        Closed(SlotId, u64),
    }

    struct ChannelSink(mpsc::UnboundedSender<Event>);

    impl InboundSink for ChannelSink {
        fn on_frame(&self, slot: SlotId, _kind: TransportKind, frame: Frame) {
            let _ = self.0.send(Event::Frame(slot, frame));
        }

        fn on_stream_closed(&self, slot: SlotId, generation: u64) {
            let _ = self.0.send(Event::Closed(slot, generation));
        }
    }

    fn sink() -> (Arc<dyn InboundSink>, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(ChannelSink(tx)), rx)
    }

    async fn accepted_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (server, client)
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
        tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("event should arrive")
            .expect("sink should stay open")
    }

    #[tokio::test]
    async fn frames_reach_sink_and_close_is_reported() {
        let channel = StreamChannel::new(2);
        let (server, mut client) = accepted_pair().await;
        let (sink, mut rx) = sink();

        channel.connect(server, sink).unwrap();
        assert!(channel.is_connected());
        let generation = channel.generation().unwrap();

        let mut packet = Packet::with_type(1);
        packet.write_bytes(&[1, 2, 3, 4]);
        packet.finalize_length_prefix().unwrap();
        client.write_all(packet.as_bytes()).await.unwrap();

        match next_event(&mut rx).await {
            Event::Frame(slot, frame) => {
                assert_eq!(slot, 2);
                assert_eq!(frame.packet_type().unwrap(), 1);
                assert_eq!(&frame.payload()[4..], &[1, 2, 3, 4]);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        drop(client);
        match next_event(&mut rx).await {
            Event::Closed(slot, closed) => {
                assert_eq!(slot, 2);
                assert_eq!(closed, generation);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn second_connect_is_rejected() {
        let channel = StreamChannel::new(0);
        let (first, _c1) = accepted_pair().await;
        let (second, _c2) = accepted_pair().await;
        let (sink, _rx) = sink();

        channel.connect(first, Arc::clone(&sink)).unwrap();
        assert!(matches!(
            channel.connect(second, sink),
            Err(TransportError::Occupied)
        ));
    }

    #[tokio::test]
    async fn send_requires_framing_and_connection() {
        let channel = StreamChannel::new(0);
        let mut packet = Packet::with_type(1);

        assert!(matches!(
            channel.send(&packet).await,
            Err(TransportError::Unframed)
        ));
        packet.finalize_length_prefix().unwrap();
        assert!(matches!(
            channel.send(&packet).await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn send_writes_exact_bytes() {
        let channel = StreamChannel::new(0);
        let (server, mut client) = accepted_pair().await;
        let (sink, _rx) = sink();
        channel.connect(server, sink).unwrap();

        let mut packet = Packet::with_type(9);
        packet.write("hi");
        packet.finalize_length_prefix().unwrap();
        channel.send(&packet).await.unwrap();

        let mut received = vec![0u8; packet.len()];
        client.read_exact(&mut received).await.unwrap();
        assert_eq!(received, packet.as_bytes());
    }

    #[tokio::test]
    async fn stale_generation_does_not_disconnect_newer_connection() {
        let channel = StreamChannel::new(1);
        let (sink, _rx) = sink();

        let (first, _c1) = accepted_pair().await;
        channel.connect(first, Arc::clone(&sink)).unwrap();
        let old = channel.generation().unwrap();
        assert!(channel.disconnect());
        assert!(!channel.disconnect());

        let (second, _c2) = accepted_pair().await;
        channel.connect(second, sink).unwrap();
        assert!(!channel.disconnect_generation(old));
        assert!(channel.is_connected());

        let current = channel.generation().unwrap();
        assert!(channel.disconnect_generation(current));
        assert!(!channel.is_connected());
    }
}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use slotnet_lanes::LaneScheduler;
use slotnet_packet::Packet;
use slotnet_transport::{bind_datagram_socket, bind_stream_listener, InboundSink, SlotId, TransportKind};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, trace};

use crate::cast;
use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::listener::{accept_loop, datagram_loop};
use crate::pool::SlotPool;
use crate::registry::HandlerRegistry;

/// A running server.
///
/// Owns the slot pool, the lane scheduler and the handler registry, and the
/// accept, datagram and tick tasks that drive them. Dropping the server
/// stops those tasks and disconnects every slot.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    pool: Arc<SlotPool>,
    scheduler: Arc<LaneScheduler>,
    registry: Arc<HandlerRegistry>,
    stream_addr: SocketAddr,
    datagram_addr: SocketAddr,
    tasks: Vec<JoinHandle<()>>,
}

impl Server {
    /// Bind both transports and start serving.
    ///
    /// Handlers may still be added to `registry` after start.
    pub async fn start(config: ServerConfig, registry: Arc<HandlerRegistry>) -> Result<Self> {
        config.validate()?;

        let listener = bind_stream_listener(config.bind_addr()).await?;
        let stream_addr = listener.local_addr()?;
        let socket = Arc::new(bind_datagram_socket(
            SocketAddr::new(config.bind_addr().ip(), stream_addr.port()),
            config.buffer_size,
        )?);
        let datagram_addr = socket.local_addr()?;

        let pool = Arc::new(SlotPool::new(
            config.max_clients,
            config.buffer_size,
            Arc::clone(&socket),
        ));
        let scheduler = Arc::new(LaneScheduler::new(config.max_concurrency, Handle::current())?);
        let sink: Arc<dyn InboundSink> = Arc::new(Dispatcher::new(
            Arc::clone(&pool),
            Arc::clone(&scheduler),
            Arc::clone(&registry),
        ));

        let tasks = vec![
            tokio::spawn(accept_loop(listener, Arc::clone(&pool), Arc::clone(&sink))),
            tokio::spawn(datagram_loop(socket, Arc::clone(&pool), sink)),
            tokio::spawn(tick_loop(Arc::clone(&scheduler), config.tick_interval())),
        ];

        info!(
            name = %config.name,
            %stream_addr,
            %datagram_addr,
            slots = pool.capacity(),
            lanes = scheduler.lane_count(),
            "server started"
        );

        Ok(Self {
            config,
            pool,
            scheduler,
            registry,
            stream_addr,
            datagram_addr,
            tasks,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<SlotPool> {
        &self.pool
    }

    pub fn scheduler(&self) -> &Arc<LaneScheduler> {
        &self.scheduler
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Bound TCP address.
    pub fn stream_addr(&self) -> SocketAddr {
        self.stream_addr
    }

    /// Bound UDP address.
    pub fn datagram_addr(&self) -> SocketAddr {
        self.datagram_addr
    }

    pub async fn unicast(&self, kind: TransportKind, slot: SlotId, packet: &mut Packet) -> Result<()> {
        cast::unicast(&self.pool, kind, slot, packet).await
    }

    pub async fn broadcast(&self, kind: TransportKind, packet: &mut Packet) -> Result<usize> {
        cast::broadcast(&self.pool, kind, packet).await
    }

    pub async fn multicast(
        &self,
        kind: TransportKind,
        packet: &mut Packet,
        exclude: &[SlotId],
    ) -> Result<usize> {
        cast::multicast(&self.pool, kind, packet, exclude).await
    }

    /// Stop the background tasks, refuse new work and disconnect every slot.
    pub fn shutdown(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.scheduler.shutdown();
        self.pool.disconnect_all();
        info!(name = %self.config.name, "server stopped");
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn tick_loop(scheduler: Arc<LaneScheduler>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        let started = scheduler.tick();
        if started > 0 {
            trace!(started, "tick");
        }
    }
}

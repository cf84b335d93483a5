use std::sync::Arc;

use slotnet_packet::Packet;
use slotnet_server::{cast, HandlerRegistry, Server, ServerConfig, SlotPool};
use slotnet_transport::{SlotId, TransportKind};
use tokio::runtime::Handle;

use crate::cmd::{runtime, ServeArgs};
use crate::exit::{io_error, server_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: ServeArgs, _format: OutputFormat) -> CliResult<i32> {
    let config = args.settings.resolve()?;
    let echo_type = (!args.no_echo).then_some(args.echo_type);
    runtime()?.block_on(serve(config, echo_type))
}

async fn serve(config: ServerConfig, echo_type: Option<i32>) -> CliResult<i32> {
    let registry = Arc::new(HandlerRegistry::new());
    let mut server = Server::start(config, Arc::clone(&registry))
        .await
        .map_err(|err| server_error("failed to start server", err))?;

    if let Some(packet_type) = echo_type {
        install_echo(&registry, server.pool(), packet_type);
    }

    tokio::signal::ctrl_c()
        .await
        .map_err(|err| io_error("failed to listen for ctrl-c", err))?;
    tracing::info!("interrupt received, shutting down");
    server.shutdown();
    Ok(SUCCESS)
}

/// Reply to every `packet_type` packet with the same type and body.
///
/// Replies go over the stream channel when the slot has one, otherwise over
/// its datagram association.
fn install_echo(registry: &HandlerRegistry, pool: &Arc<SlotPool>, packet_type: i32) {
    let pool = Arc::clone(pool);
    let runtime = Handle::current();
    registry.register(packet_type, move |slot: SlotId, packet: Packet| {
        let body = packet.remaining();
        tracing::debug!(slot, packet_type, len = body.len(), "echoing packet");

        let pool = Arc::clone(&pool);
        runtime.spawn(async move {
            let kind = match pool.get(slot) {
                Some(client) if client.stream().is_connected() => TransportKind::Stream,
                Some(_) => TransportKind::Datagram,
                None => return,
            };
            let mut reply = Packet::with_type(packet_type);
            reply.write_bytes(&body);
            if let Err(err) = cast::unicast(&pool, kind, slot, &mut reply).await {
                tracing::warn!(slot, %kind, error = %err, "echo reply failed");
            }
        });
    });
    tracing::info!(packet_type, "echo handler registered");
}

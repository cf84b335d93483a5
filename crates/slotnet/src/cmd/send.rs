use std::net::SocketAddr;
use std::time::Duration;

use slotnet_packet::{Frame, Packet};
use slotnet_server::{DatagramClient, ServerError, StreamClient};

use crate::cmd::{parse_duration, runtime, SendArgs};
use crate::exit::{server_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let packet = build_packet(&args);

    let runtime = runtime()?;
    let reply = match args.slot.filter(|_| args.udp) {
        Some(slot) => runtime.block_on(send_datagram(
            args.addr,
            args.bind,
            slot,
            packet,
            args.wait,
            wait_timeout,
        ))?,
        None => runtime.block_on(send_stream(args.addr, packet, args.wait, wait_timeout))?,
    };
    if let Some(frame) = reply {
        print_frame(&frame, args.addr, format);
    }
    Ok(SUCCESS)
}

fn build_packet(args: &SendArgs) -> Packet {
    let mut packet = Packet::with_type(args.packet_type);
    if let Some(data) = &args.data {
        packet.write_bytes(data.as_bytes());
    }
    packet
}

async fn send_stream(
    addr: SocketAddr,
    packet: Packet,
    wait: bool,
    wait_timeout: Duration,
) -> CliResult<Option<Frame>> {
    let mut client = StreamClient::connect(addr)
        .await
        .map_err(|err| server_error("connect failed", err))?;
    client
        .send(packet)
        .await
        .map_err(|err| server_error("send failed", err))?;
    if !wait {
        return Ok(None);
    }

    let frame = tokio::time::timeout(wait_timeout, client.recv())
        .await
        .map_err(|_| timed_out(wait_timeout))?
        .map_err(|err| server_error("receive failed", err))?
        .ok_or_else(|| server_error("receive failed", ServerError::Closed))?;
    Ok(Some(frame))
}

async fn send_datagram(
    addr: SocketAddr,
    bind: Option<SocketAddr>,
    slot: usize,
    packet: Packet,
    wait: bool,
    wait_timeout: Duration,
) -> CliResult<Option<Frame>> {
    let client = match bind {
        Some(local) => DatagramClient::bind(local, addr, slot).await,
        None => DatagramClient::connect(addr, slot).await,
    }
    .map_err(|err| server_error("bind failed", err))?;
    client
        .rendezvous()
        .await
        .map_err(|err| server_error("rendezvous failed", err))?;
    client
        .send([packet])
        .await
        .map_err(|err| server_error("send failed", err))?;
    if !wait {
        return Ok(None);
    }

    let frames = tokio::time::timeout(wait_timeout, client.recv())
        .await
        .map_err(|_| timed_out(wait_timeout))?
        .map_err(|err| server_error("receive failed", err))?;
    Ok(frames.into_iter().next())
}

fn timed_out(after: Duration) -> CliError {
    CliError::new(TIMEOUT, format!("no reply within {after:?}"))
}

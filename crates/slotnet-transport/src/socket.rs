use std::net::SocketAddr;

use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Default send/receive socket buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Bind the TCP listener that feeds the slot pool.
pub async fn bind_stream_listener(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| TransportError::Bind { addr, source })?;
    info!(addr = %listener.local_addr()?, "listening for stream connections");
    Ok(listener)
}

/// Bind the UDP socket shared by every slot's datagram channel.
pub fn bind_datagram_socket(addr: SocketAddr, buffer_size: usize) -> Result<UdpSocket> {
    let bind_err = |source| TransportError::Bind { addr, source };

    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
        .map_err(bind_err)?;
    socket.set_reuse_address(true).map_err(bind_err)?;
    socket.set_recv_buffer_size(buffer_size).map_err(bind_err)?;
    socket.set_send_buffer_size(buffer_size).map_err(bind_err)?;
    socket.set_nonblocking(true).map_err(bind_err)?;
    socket.bind(&addr.into()).map_err(bind_err)?;

    let socket = UdpSocket::from_std(socket.into()).map_err(bind_err)?;
    info!(addr = %socket.local_addr()?, "listening for datagrams");
    Ok(socket)
}

/// Apply per-connection socket options to an accepted stream.
pub fn configure_stream(stream: &TcpStream, buffer_size: usize) -> Result<()> {
    let sock = SockRef::from(stream);
    sock.set_send_buffer_size(buffer_size)?;
    sock.set_recv_buffer_size(buffer_size)?;
    stream.set_nodelay(true)?;
    debug!(buffer_size, "configured stream socket");
    Ok(())
}

use std::fmt;
use std::io;

use slotnet_lanes::LaneError;
use slotnet_packet::PacketError;
use slotnet_server::ServerError;
use slotnet_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::AddrInUse => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn packet_error(context: &str, err: PacketError) -> CliError {
    match err {
        PacketError::Io(source) => io_error(context, source),
        PacketError::Underrun { .. }
        | PacketError::InvalidLength(_)
        | PacketError::TooLarge { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::Packet(err) => packet_error(context, err),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn lane_error(context: &str, err: LaneError) -> CliError {
    match err {
        LaneError::InvalidConcurrency(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn server_error(context: &str, err: ServerError) -> CliError {
    match err {
        ServerError::Transport(err) => transport_error(context, err),
        ServerError::Packet(err) => packet_error(context, err),
        ServerError::Lane(err) => lane_error(context, err),
        ServerError::Io(err) => io_error(context, err),
        ServerError::Config(_) | ServerError::Json(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        ServerError::UnknownSlot(_) => CliError::new(USAGE, format!("{context}: {err}")),
        ServerError::Closed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_connection_is_a_plain_failure() {
        let err = server_error(
            "connect failed",
            ServerError::Transport(TransportError::Connect {
                addr: "127.0.0.1:1".parse().unwrap(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            }),
        );
        assert_eq!(err.code, FAILURE);
        assert!(err.message.starts_with("connect failed: "));
    }

    #[test]
    fn invalid_config_is_data_invalid() {
        let err = server_error("bad config", ServerError::Config("max_clients".into()));
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn nested_packet_errors_keep_their_code() {
        let err = transport_error(
            "send failed",
            TransportError::Packet(PacketError::TooLarge { size: usize::MAX }),
        );
        assert_eq!(err.code, DATA_INVALID);

        let err = transport_error("send failed", TransportError::NotConnected);
        assert_eq!(err.code, TRANSPORT_ERROR);
    }
}

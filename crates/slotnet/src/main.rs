mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "slotnet", version, about = "Multi-client TCP/UDP packet server")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "SLOTNET_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "slotnet",
            "send",
            "127.0.0.1:8888",
            "--type",
            "7",
            "--data",
            "hello",
        ])
        .expect("send args should parse");

        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.packet_type, 7);
        assert_eq!(args.data.as_deref(), Some("hello"));
        assert!(!args.udp);
    }

    #[test]
    fn udp_send_requires_a_slot() {
        let err = Cli::try_parse_from(["slotnet", "send", "127.0.0.1:8888", "--udp"])
            .expect_err("--udp without --slot should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let cli = Cli::try_parse_from([
            "slotnet",
            "send",
            "127.0.0.1:8888",
            "--udp",
            "--slot",
            "3",
        ])
        .expect("udp send should parse");
        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.slot, Some(3));
        assert_eq!(args.bind, None);
    }

    #[test]
    fn bind_address_is_udp_only() {
        let cli = Cli::try_parse_from([
            "slotnet",
            "send",
            "127.0.0.1:8888",
            "--udp",
            "--slot",
            "0",
            "--bind",
            "127.0.0.1:40000",
        ])
        .expect("udp send with bind should parse");
        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.bind, Some("127.0.0.1:40000".parse().unwrap()));

        let err = Cli::try_parse_from([
            "slotnet",
            "send",
            "127.0.0.1:8888",
            "--bind",
            "127.0.0.1:40000",
        ])
        .expect_err("--bind without --udp should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn rejects_malformed_address() {
        let err = Cli::try_parse_from(["slotnet", "send", "not-an-address"])
            .expect_err("address should be validated");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::try_parse_from([
            "slotnet",
            "--log-format",
            "json",
            "serve",
            "--port",
            "9000",
            "--max-clients",
            "4",
            "--echo-type",
            "42",
        ])
        .expect("serve args should parse");

        assert!(matches!(cli.log_format, LogFormat::Json));
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.settings.port, Some(9000));
        assert_eq!(args.settings.max_clients, Some(4));
        assert_eq!(args.echo_type, 42);
    }

    #[test]
    fn parses_config_subcommand() {
        let cli = Cli::try_parse_from(["slotnet", "--format", "json", "config"])
            .expect("config args should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert!(matches!(cli.command, Command::Config(_)));
    }
}

use std::io::{IsTerminal, Write};
use std::net::SocketAddr;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use slotnet_packet::Frame;
use slotnet_server::ServerConfig;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    packet_type: Option<i32>,
    body_size: usize,
    body: String,
    peer: &'a str,
}

const TYPE_ID_SIZE: usize = std::mem::size_of::<i32>();

/// Bytes after the packet-type id.
fn frame_body(frame: &Frame) -> &[u8] {
    frame.payload().get(TYPE_ID_SIZE..).unwrap_or_default()
}

pub fn print_frame(frame: &Frame, peer: SocketAddr, format: OutputFormat) {
    let packet_type = frame.packet_type().ok();
    let body = frame_body(frame);
    let peer = peer.to_string();

    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                packet_type,
                body_size: body.len(),
                body: body_preview(body),
                peer: &peer,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "SIZE", "PEER", "BODY"])
                .add_row(vec![
                    type_label(packet_type),
                    body.len().to_string(),
                    peer,
                    body_preview(body),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "type={} size={} peer={} body={}",
                type_label(packet_type),
                body.len(),
                peer,
                body_preview(body)
            );
        }
        OutputFormat::Raw => print_raw(body),
    }
}

pub fn print_config(config: &ServerConfig, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => println!(
            "{}",
            serde_json::to_string(config).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SETTING", "VALUE"]);
            for (key, value) in config_rows(config) {
                table.add_row(vec![key.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (key, value) in config_rows(config) {
                println!("{key}: {value}");
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn config_rows(config: &ServerConfig) -> Vec<(&'static str, String)> {
    vec![
        ("name", config.name.clone()),
        ("port", config.port.to_string()),
        ("max_clients", config.max_clients.to_string()),
        ("buffer_size", config.buffer_size.to_string()),
        ("max_concurrency", config.max_concurrency.to_string()),
        ("tick_interval_ms", config.tick_interval_ms.to_string()),
    ]
}

fn type_label(packet_type: Option<i32>) -> String {
    packet_type.map_or_else(|| "-".to_string(), |t| t.to_string())
}

fn body_preview(body: &[u8]) -> String {
    match std::str::from_utf8(body) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", body.len()),
    }
}

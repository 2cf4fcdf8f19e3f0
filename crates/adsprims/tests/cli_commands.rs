#![cfg(feature = "cli")]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::Command;
use std::thread;

use adsprims_frame::command::STATE_FLAG_RESPONSE;
use adsprims_frame::{
    decode_packet, encode_ads_packet, AdsPacket, AmsHeader, AmsPacket, ADS_READ, ADS_READ_WRITE,
    DEFAULT_MAX_FRAME,
};
use adsprims_types::AdsDataType;
use bytes::BytesMut;

fn adsprims() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_adsprims"));
    for var in [
        "ADSPRIMS_ROUTER",
        "ADSPRIMS_TARGET_NETID",
        "ADSPRIMS_TARGET_PORT",
        "ADSPRIMS_LOCAL_NETID",
        "ADSPRIMS_LOCAL_PORT",
        "ADSPRIMS_TIMEOUT",
        "ADSPRIMS_LOG_LEVEL",
        "ADSPRIMS_LOG_FORMAT",
    ] {
        cmd.env_remove(var);
    }
    cmd.arg("--log-level").arg("error");
    cmd
}

fn entry(words: &[u32], names: &[&str], tail: &[u16]) -> Vec<u8> {
    let mut body = Vec::new();
    for word in words {
        body.extend_from_slice(&word.to_le_bytes());
    }
    for name in names {
        body.extend_from_slice(&(name.len() as u16).to_le_bytes());
    }
    for extra in tail {
        body.extend_from_slice(&extra.to_le_bytes());
    }
    for name in names {
        body.extend_from_slice(name.as_bytes());
        body.push(0);
    }
    let mut out = ((body.len() + 4) as u32).to_le_bytes().to_vec();
    out.extend_from_slice(&body);
    out
}

fn reply_payload(request: &AdsPacket) -> Vec<u8> {
    let mut out = 0u32.to_le_bytes().to_vec();
    let data = match request.header.command {
        ADS_READ_WRITE => {
            let name = &request.payload[16..request.payload.len() - 1];
            match name {
                // group, offset, size, data type, flags + array dims, then name/type/comment lengths
                b"MAIN.counter" => {
                    let mut raw = Vec::new();
                    for word in [0x4040u32, 0x10, 2, AdsDataType::BigType.code()] {
                        raw.extend_from_slice(&word.to_le_bytes());
                    }
                    raw.extend_from_slice(&8u16.to_le_bytes());
                    raw.extend_from_slice(&0u16.to_le_bytes());
                    for len in [12u16, 3, 0] {
                        raw.extend_from_slice(&len.to_le_bytes());
                    }
                    raw.extend_from_slice(b"MAIN.counter\0INT\0\0");
                    let mut entry = ((raw.len() + 4) as u32).to_le_bytes().to_vec();
                    entry.extend_from_slice(&raw);
                    entry
                }
                b"INT" => entry(
                    &[1, 0, 0, 2, 0, AdsDataType::Int16.code(), 1],
                    &["INT", "", ""],
                    &[0, 0],
                ),
                _ => return 0x710u32.to_le_bytes().to_vec(),
            }
        }
        ADS_READ => vec![0x2A, 0x00],
        _ => return 0x701u32.to_le_bytes().to_vec(),
    };
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&data);
    out
}

/// Serve one connection as a device holding `MAIN.counter : INT = 42`.
fn serve_one(listener: TcpListener) {
    let (mut stream, _): (TcpStream, _) = listener.accept().expect("accept");
    let mut buf = BytesMut::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        while let Ok(Some(packet)) = decode_packet(&mut buf, DEFAULT_MAX_FRAME) {
            let AmsPacket::Ads(request) = packet else { continue };
            let header = AmsHeader {
                target: request.header.source,
                source: request.header.target,
                state_flags: request.header.state_flags | STATE_FLAG_RESPONSE,
                ..request.header
            };
            let mut out = BytesMut::new();
            encode_ads_packet(&header, &reply_payload(&request), &mut out).expect("encode");
            if stream.write_all(&out).is_err() {
                return;
            }
        }
    }
}

fn fake_device() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr").to_string();
    thread::spawn(move || serve_one(listener));
    addr
}

#[test]
fn version_prints_package_version() {
    let output = adsprims().arg("version").output().expect("run version");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("adsprims {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn bad_net_id_exits_with_usage() {
    let output = adsprims()
        .args(["--target-netid", "1.2.3", "read", "MAIN.x"])
        .output()
        .expect("run read");
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid AMS net id"));
}

#[test]
fn unreachable_router_exits_with_transport_error() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("local addr").to_string()
    };
    let output = adsprims()
        .args(["--router", &addr, "info"])
        .output()
        .expect("run info");
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn log_settings_fall_back_to_environment() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("local addr").to_string()
    };
    let output = Command::new(env!("CARGO_BIN_EXE_adsprims"))
        .env("ADSPRIMS_LOG_LEVEL", "debug")
        .env("ADSPRIMS_LOG_FORMAT", "json")
        .args(["--router", &addr, "info"])
        .output()
        .expect("run info");
    assert_eq!(output.status.code(), Some(3));

    let stderr = String::from_utf8_lossy(&output.stderr);
    let connecting = stderr
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .find(|event| event["message"] == "connecting to ams router");
    let event = connecting.unwrap_or_else(|| panic!("no connect log in: {stderr}"));
    assert_eq!(event["level"], "DEBUG");
}

#[test]
fn read_against_fake_device_prints_json() {
    let router = fake_device();
    let output = adsprims()
        .args([
            "--format",
            "json",
            "--router",
            &router,
            "--target-netid",
            "10.0.0.1.1.1",
            "--local-netid",
            "10.0.0.2.1.1",
            "--local-port",
            "30000",
            "read",
            "MAIN.counter",
        ])
        .output()
        .expect("run read");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be json");
    assert_eq!(json["path"], "MAIN.counter");
    assert_eq!(json["value"], 42);
}

#[test]
fn unknown_symbol_exits_with_ads_error() {
    let router = fake_device();
    let output = adsprims()
        .args([
            "--router",
            &router,
            "--local-netid",
            "10.0.0.2.1.1",
            "--local-port",
            "30000",
            "read",
            "MAIN.missing",
        ])
        .output()
        .expect("run read");
    assert_eq!(output.status.code(), Some(70));
    assert!(String::from_utf8_lossy(&output.stderr).contains("0x710"));
}

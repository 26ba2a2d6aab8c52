//! Integration tests for the `molt serve` HTTP API.
//!
//! Each test starts the server as a child process on a unique port,
//! makes HTTP requests, and verifies the responses.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Once;
use std::time::Duration;

/// Port counter seeded from the process ID, so separate test binaries
/// running at the same time start from different ranges.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: Once = Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 21000 + (std::process::id() as u16 % 19000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

/// Start `molt serve` and wait until it accepts connections.
fn start_server(port: u16) -> Child {
    let child = Command::new(env!("CARGO_BIN_EXE_molt"))
        .args(["serve", "--port", &port.to_string()])
        .env_remove("MOLT_CONFIG")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to start molt serve");

    for _ in 0..50 {
        if TcpStream::connect(("127.0.0.1", port)).is_ok() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    child
}

fn stop(mut child: Child) {
    child.kill().ok();
    child.wait().ok();
}

/// Status line, raw header block and decoded body of one response.
struct Reply {
    status: u16,
    headers: String,
    body: String,
}

impl Reply {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }

    fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body)
            .unwrap_or_else(|e| panic!("invalid JSON ({}): {}", e, self.body))
    }
}

/// Send one request over a fresh connection (`Connection: close`).
fn send(port: u16, method: &str, path: &str, headers: &[(&str, &str)], body: &str) -> Reply {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .expect("set timeout");

    let mut request = format!("{method} {path} HTTP/1.1\r\nHost: localhost:{port}\r\n");
    for (name, value) in headers {
        request.push_str(&format!("{name}: {value}\r\n"));
    }
    if !body.is_empty() {
        request.push_str(&format!(
            "Content-Type: application/json\r\nContent-Length: {}\r\n",
            body.len()
        ));
    }
    request.push_str("Connection: close\r\n\r\n");
    request.push_str(body);
    stream.write_all(request.as_bytes()).expect("failed to write");

    let mut raw = String::new();
    let _ = stream.read_to_string(&mut raw);
    parse_reply(&raw)
}

fn get(port: u16, path: &str) -> Reply {
    send(port, "GET", path, &[], "")
}

fn post(port: u16, path: &str, body: &str) -> Reply {
    send(port, "POST", path, &[], body)
}

fn parse_reply(raw: &str) -> Reply {
    let (headers, body) = raw.split_once("\r\n\r\n").unwrap_or((raw, ""));
    let status = headers
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let mut reply = Reply {
        status,
        headers: headers.to_string(),
        body: body.to_string(),
    };
    if reply
        .header("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    {
        reply.body = dechunk(body);
    }
    reply
}

/// Join the chunks of a chunked body, stopping at the zero-size chunk.
fn dechunk(mut rest: &str) -> String {
    let mut out = String::new();
    while let Some((size, tail)) = rest.split_once("\r\n") {
        let size = match usize::from_str_radix(size.trim(), 16) {
            Ok(0) | Err(_) => break,
            Ok(n) => n.min(tail.len()),
        };
        out.push_str(&tail[..size]);
        rest = tail[size..].strip_prefix("\r\n").unwrap_or(&tail[size..]);
    }
    out
}

// ──────────────────────────────────────────────
// Health
// ──────────────────────────────────────────────

#[test]
fn health_returns_200_with_version() {
    let port = next_port();
    let child = start_server(port);
    let reply = get(port, "/health");
    stop(child);

    assert_eq!(reply.status, 200);
    let json = reply.json();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "healthy");
    assert!(json["data"]["version"].is_string());
    assert!(reply
        .header("content-type")
        .is_some_and(|v| v.starts_with("application/json")));
}

// ──────────────────────────────────────────────
// Translate
// ──────────────────────────────────────────────

#[test]
fn translate_to_molt() {
    let port = next_port();
    let child = start_server(port);
    let reply = post(
        port,
        "/translate",
        r#"{"text": "Fetch data from API and return JSON"}"#,
    );
    stop(child);

    assert_eq!(reply.status, 200, "body: {}", reply.body);
    let json = reply.json();
    assert_eq!(json["success"], true);
    let data = &json["data"];
    assert_eq!(data["moltlang"], "[op:fetch][src:api][ret:json]");
    assert_eq!(data["token_count"], 3);
    assert_eq!(data["original_token_count"], 7);
    assert!(data["efficiency"].as_f64().unwrap() > 0.5);
    assert_eq!(data["confidence"], 1.0);
}

#[test]
fn translate_from_molt() {
    let port = next_port();
    let child = start_server(port);
    let reply = post(
        port,
        "/translate",
        r#"{"text": "[op:fetch][src:api][ret:json]", "to_molt": false}"#,
    );
    stop(child);

    assert_eq!(reply.status, 200, "body: {}", reply.body);
    let data = &reply.json()["data"];
    assert_eq!(data["translation"], "Fetch data from API return JSON");
    assert_eq!(data["token_count"], 3);
    assert!(data.get("moltlang").is_none());
}

#[test]
fn translate_bad_bodies_return_400_envelope() {
    let port = next_port();
    let child = start_server(port);
    let missing_text = post(port, "/translate", r#"{"to_molt": true}"#);
    let malformed = post(port, "/translate", "{not json");
    stop(child);

    for reply in [missing_text, malformed] {
        assert_eq!(reply.status, 400, "body: {}", reply.body);
        let json = reply.json();
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());
    }
}

// ──────────────────────────────────────────────
// Validate
// ──────────────────────────────────────────────

#[test]
fn validate_scores_translation() {
    let port = next_port();
    let child = start_server(port);
    let reply = post(
        port,
        "/validate",
        r#"{"original": "Fetch data from API and return JSON", "translated": "[op:fetch][src:api][ret:json]"}"#,
    );
    stop(child);

    assert_eq!(reply.status, 200, "body: {}", reply.body);
    let data = &reply.json()["data"];
    assert!(data["is_valid"].is_boolean());
    assert!(data["score"].as_f64().is_some());
    assert!(data["issues"].is_array());
    assert!(data["metrics"].is_object());
}

#[test]
fn validate_reports_syntax_errors() {
    let port = next_port();
    let child = start_server(port);
    let reply = post(
        port,
        "/validate",
        r#"{"original": "Fetch data", "translated": "[op:fetch"}"#,
    );
    stop(child);

    assert_eq!(reply.status, 200, "body: {}", reply.body);
    let data = &reply.json()["data"];
    assert_eq!(data["is_valid"], false);
    let issues = data["issues"].as_array().expect("issues array");
    assert!(issues.iter().any(|i| i["severity"] == "error"));
}

// ──────────────────────────────────────────────
// Vocabulary
// ──────────────────────────────────────────────

#[test]
fn vocabulary_lists_all_tokens() {
    let port = next_port();
    let child = start_server(port);
    let reply = get(port, "/vocabulary");
    stop(child);

    assert_eq!(reply.status, 200);
    let data = &reply.json()["data"];
    let tokens = data["tokens"].as_array().expect("tokens array");
    assert_eq!(data["count"].as_u64(), Some(tokens.len() as u64));
    assert!(data["filtered_by"].is_null());
    assert!(tokens
        .iter()
        .any(|t| t["name"] == "op:fetch" && t["value"] == "[op:fetch]"));
}

#[test]
fn vocabulary_filtered_by_category() {
    let port = next_port();
    let child = start_server(port);
    let reply = get(port, "/vocabulary?token_type=op");
    stop(child);

    assert_eq!(reply.status, 200);
    let data = &reply.json()["data"];
    assert_eq!(data["count"], 11);
    assert_eq!(data["filtered_by"], "op");
    for token in data["tokens"].as_array().expect("tokens array") {
        assert!(token["name"].as_str().unwrap().starts_with("op:"));
    }
}

#[test]
fn vocabulary_bad_queries_return_400_envelope() {
    let port = next_port();
    let child = start_server(port);
    let unknown = get(port, "/vocabulary?token_type=bogus");
    let repeated = get(port, "/vocabulary?token_type=op&token_type=src");
    stop(child);

    for reply in [unknown, repeated] {
        assert_eq!(reply.status, 400, "body: {}", reply.body);
        let json = reply.json();
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());
    }
}

// ──────────────────────────────────────────────
// Routing and CORS
// ──────────────────────────────────────────────

#[test]
fn unknown_route_returns_404() {
    let port = next_port();
    let child = start_server(port);
    let reply = get(port, "/nonexistent");
    stop(child);

    assert_eq!(reply.status, 404);
    let json = reply.json();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "not found");
}

#[test]
fn cors_allows_any_origin() {
    let port = next_port();
    let child = start_server(port);
    let reply = send(port, "GET", "/health", &[("Origin", "http://example.com")], "");
    stop(child);

    assert_eq!(reply.status, 200);
    assert_eq!(reply.header("access-control-allow-origin"), Some("*"));
}

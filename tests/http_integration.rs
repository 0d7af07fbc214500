/*
 * http_integration.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Tagliacarte.
 *
 * Tagliacarte is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This file is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this file.  If not, see <http://www.gnu.org/licenses/>.
 */

//! End-to-end tests driving a real bound loopback listener, not mocked
//! sockets: each test starts its own `Server` on an OS-assigned port in a
//! background thread and talks HTTP/1.1 to it over a plain `TcpStream`.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use postino::config::Config;
use postino::json::JsonValue;
use postino::router::{self, AppState};
use postino::server::Server;
use postino::store::memory::MemoryBackend;

struct Harness {
    addr: SocketAddr,
}

impl Harness {
    fn start() -> Self {
        Self::start_with(|c| c)
    }

    fn start_with(customize: impl FnOnce(Config) -> Config) -> Self {
        let mut config = Config { port: 0, max_connections: 64, ..Config::default() };
        config = customize(config);
        let tmp = tempfile::tempdir().unwrap();
        let static_dir = tmp.path().join("static");
        let template_dir = tmp.path().join("templates");
        std::fs::create_dir_all(&static_dir).unwrap();
        std::fs::create_dir_all(&template_dir).unwrap();
        std::fs::write(template_dir.join("learn.html"), b"hello").unwrap();

        let backend = Arc::new(MemoryBackend::new());
        let state = Arc::new(AppState::new(
            backend,
            static_dir.to_string_lossy().into_owned(),
            template_dir.to_string_lossy().into_owned(),
            tmp.path().to_string_lossy().into_owned(),
        ));
        let route_state = Arc::clone(&state);
        let mut server = Server::bind(&config, move |req| router::route(&route_state, req)).unwrap();
        let addr = server.local_addr().unwrap();
        // Keep `tmp` and `state` alive for the lifetime of the background thread.
        std::thread::spawn(move || {
            let _keep_alive = (tmp, state);
            server.run(|| true).ok();
        });
        // Give the loop thread a moment to reach its first `poll`.
        std::thread::sleep(Duration::from_millis(50));
        Harness { addr }
    }

    fn request(&self, raw: &str) -> (u16, Vec<(String, String)>, Vec<u8>) {
        let mut stream = TcpStream::connect(self.addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        stream.write_all(raw.as_bytes()).unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break None;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = find(&buf, b"\r\n\r\n") {
                break Some(pos);
            }
        };
        let header_end = header_end.expect("response headers");
        let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
        let mut lines = head.split("\r\n");
        let status_line = lines.next().unwrap();
        let code: u16 = status_line.split_whitespace().nth(1).unwrap().parse().unwrap();
        let mut headers = Vec::new();
        let mut content_length = 0usize;
        for line in lines {
            if let Some((k, v)) = line.split_once(':') {
                let k = k.trim().to_string();
                let v = v.trim().to_string();
                if k.eq_ignore_ascii_case("content-length") {
                    content_length = v.parse().unwrap_or(0);
                }
                headers.push((k, v));
            }
        }
        let mut body = buf[header_end + 4..].to_vec();
        while body.len() < content_length {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        (code, headers, body)
    }

    fn post_json(&self, path: &str, token: Option<&str>, body: &JsonValue) -> (u16, JsonValue) {
        let payload = body.to_bytes();
        let auth = token.map(|t| format!("Authorization: Bearer {t}\r\n")).unwrap_or_default();
        let raw = format!(
            "POST {path} HTTP/1.1\r\nHost: x\r\nContent-Type: application/json\r\nContent-Length: {}\r\n{auth}\r\n",
            payload.len()
        );
        let mut full = raw.into_bytes();
        full.extend_from_slice(&payload);
        let (code, _headers, resp_body) = self.request(&String::from_utf8_lossy(&full));
        (code, JsonValue::parse(&resp_body).unwrap_or(JsonValue::object()))
    }

    fn get_json(&self, path: &str, token: Option<&str>) -> (u16, JsonValue) {
        let auth = token.map(|t| format!("Authorization: Bearer {t}\r\n")).unwrap_or_default();
        let raw = format!("GET {path} HTTP/1.1\r\nHost: x\r\n{auth}\r\n");
        let (code, _headers, body) = self.request(&raw);
        (code, JsonValue::parse(&body).unwrap_or(JsonValue::object()))
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn register(h: &Harness, username: &str, email: &str, password: &str) -> (String, i64) {
    let mut body = JsonValue::object();
    body.insert("username", JsonValue::from_str(username));
    body.insert("email", JsonValue::from_str(email));
    body.insert("password", JsonValue::from_str(password));
    let (code, resp) = h.post_json("/api/register", None, &body);
    assert_eq!(code, 201, "{resp:?}");
    let token = resp.get_str("token").unwrap().to_string();
    let id = resp.get("user").unwrap().get("id").unwrap().as_i64().unwrap();
    (token, id)
}

#[test]
fn register_then_login_returns_distinct_tokens() {
    let h = Harness::start();
    let (token, _id) = register(&h, "carol", "carol@example.com", "secret1");
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

    let mut body = JsonValue::object();
    body.insert("username", JsonValue::from_str("carol"));
    body.insert("password", JsonValue::from_str("secret1"));
    let (code, resp) = h.post_json("/api/login", None, &body);
    assert_eq!(code, 200);
    let token2 = resp.get_str("token").unwrap();
    assert_ne!(token, token2);
}

#[test]
fn duplicate_username_is_rejected_with_409() {
    let h = Harness::start();
    register(&h, "carol", "carol@example.com", "secret1");
    let mut body = JsonValue::object();
    body.insert("username", JsonValue::from_str("carol"));
    body.insert("email", JsonValue::from_str("other@example.com"));
    body.insert("password", JsonValue::from_str("abcdef"));
    let (code, resp) = h.post_json("/api/register", None, &body);
    assert_eq!(code, 409);
    assert_eq!(resp.get("error").unwrap().get_str("code").unwrap(), "username_taken");
}

#[test]
fn send_then_read_from_recipient_inbox() {
    let h = Harness::start();
    let (carol_token, _) = register(&h, "carol", "carol@example.com", "secret1");
    register(&h, "dave", "dave@example.com", "secret1");

    let mut compose = JsonValue::object();
    compose.insert("subject", JsonValue::from_str("hi"));
    compose.insert("body", JsonValue::from_str("hello"));
    compose.insert("recipients", JsonValue::from_str("dave"));
    let (code, resp) = h.post_json("/api/messages", Some(&carol_token), &compose);
    assert_eq!(code, 200, "{resp:?}");

    let mut login = JsonValue::object();
    login.insert("username", JsonValue::from_str("dave"));
    login.insert("password", JsonValue::from_str("secret1"));
    let (login_code, login_resp) = h.post_json("/api/login", None, &login);
    assert_eq!(login_code, 200);
    let dave_token = login_resp.get_str("token").unwrap().to_string();

    let (code, resp) = h.get_json("/api/messages?folder=inbox", Some(&dave_token));
    assert_eq!(code, 200);
    let messages = resp.get("messages").unwrap().as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].get_str("subject").unwrap(), "hi");
}

#[test]
fn star_then_read_shows_starred_flag() {
    let h = Harness::start();
    let (token, _) = register(&h, "carol", "carol@example.com", "secret1");
    let mut compose = JsonValue::object();
    compose.insert("subject", JsonValue::from_str("draft me"));
    compose.insert("body", JsonValue::from_str("x"));
    compose.insert("recipients", JsonValue::from_str(""));
    compose.insert("saveAsDraft", JsonValue::Bool(true));
    let (_, resp) = h.post_json("/api/messages", Some(&token), &compose);
    let draft_id = resp.get("draftId").unwrap().as_i64().unwrap();

    let mut star_body = JsonValue::object();
    star_body.insert("starred", JsonValue::Bool(true));
    let (code, _) = h.post_json(&format!("/api/messages/{draft_id}/star"), Some(&token), &star_body);
    assert_eq!(code, 200);

    let (code, resp) = h.get_json(&format!("/api/messages/{draft_id}"), Some(&token));
    assert_eq!(code, 200);
    assert_eq!(resp.get("message").unwrap().get_bool("isStarred"), Some(true));
}

#[test]
fn archive_with_group_moves_folder_and_stores_group() {
    let h = Harness::start();
    let (token, _) = register(&h, "carol", "carol@example.com", "secret1");
    let mut compose = JsonValue::object();
    compose.insert("subject", JsonValue::from_str("old stuff"));
    compose.insert("body", JsonValue::from_str("x"));
    compose.insert("recipients", JsonValue::from_str(""));
    compose.insert("saveAsDraft", JsonValue::Bool(true));
    let (_, resp) = h.post_json("/api/messages", Some(&token), &compose);
    let id = resp.get("draftId").unwrap().as_i64().unwrap();

    let mut archive_body = JsonValue::object();
    archive_body.insert("archived", JsonValue::Bool(true));
    archive_body.insert("archiveGroup", JsonValue::from_str("old"));
    let (code, _) = h.post_json(&format!("/api/messages/{id}/archive"), Some(&token), &archive_body);
    assert_eq!(code, 200);

    let (_, resp) = h.get_json(&format!("/api/messages/{id}"), Some(&token));
    let message = resp.get("message").unwrap();
    assert_eq!(message.get_str("folder"), Some("archive"));
    assert_eq!(message.get_str("archiveGroup"), Some("old"));
}

#[test]
fn api_routes_require_a_bearer_token_except_register_login() {
    let h = Harness::start();
    let (code, _) = h.get_json("/api/session", None);
    assert_eq!(code, 401);
    let (code, _) = h.get_json("/api/mailboxes", None);
    assert_eq!(code, 401);
    let (code, _) = h.get_json("/api/messages", None);
    assert_eq!(code, 401);
}

#[test]
fn static_path_traversal_is_rejected() {
    let h = Harness::start();
    let (code, headers, _) = h.request("GET /static/../secret HTTP/1.1\r\nHost: x\r\n\r\n");
    assert_eq!(code, 400);
    let has_content_type = headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type"));
    assert!(has_content_type);

    let (code, _, _) = h.request("GET /static/..%2Fsecret HTTP/1.1\r\nHost: x\r\n\r\n");
    assert_eq!(code, 400);
}

#[test]
fn json_round_trips_control_bytes_and_quotes() {
    let h = Harness::start();
    let (token, _) = register(&h, "carol", "carol@example.com", "secret1");
    let mut compose = JsonValue::object();
    let tricky = "line1\nline2\ttabbed \"quoted\" back\\slash";
    compose.insert("subject", JsonValue::from_str(tricky));
    compose.insert("body", JsonValue::from_str("x"));
    compose.insert("recipients", JsonValue::from_str(""));
    compose.insert("saveAsDraft", JsonValue::Bool(true));
    let (_, resp) = h.post_json("/api/messages", Some(&token), &compose);
    let id = resp.get("draftId").unwrap().as_i64().unwrap();

    let (_, resp) = h.get_json(&format!("/api/messages/{id}"), Some(&token));
    assert_eq!(resp.get("message").unwrap().get_str("subject"), Some(tricky));
}

#[test]
fn lru_eviction_closes_the_oldest_connection_past_capacity() {
    let h = Harness::start_with(|c| Config { max_connections: 2, ..c });
    let mut first = TcpStream::connect(h.addr).unwrap();
    let _second = TcpStream::connect(h.addr).unwrap();
    std::thread::sleep(Duration::from_millis(100));
    let _third = TcpStream::connect(h.addr).unwrap();
    std::thread::sleep(Duration::from_millis(200));

    first.set_read_timeout(Some(Duration::from_millis(500))).unwrap();
    let mut buf = [0u8; 16];
    let n = first.read(&mut buf).unwrap_or(0);
    assert_eq!(n, 0, "the oldest connection should have been closed by admission control");
}

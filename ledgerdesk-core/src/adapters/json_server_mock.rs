//! Mock json-server for testing
//!
//! In-process HTTP server holding the collections in memory, so the REST
//! repository can be exercised without a running collaborator:
//! - GET/POST `/{collection}`, GET/PATCH/DELETE `/{collection}/{id}`
//! - GET `/cuentas?usuarioId=N` filters by owner
//! - POST `/login` checks the seeded credentials

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value};

use super::demo::{
    generate_demo_accounts, generate_demo_transfers, generate_demo_users, DEMO_PASSWORD,
};

const COLLECTIONS: [&str; 3] = ["usuarios", "cuentas", "transferencias"];

/// Mock server configuration
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// When set, every request except `/login` must carry this bearer token
    pub require_token: Option<String>,
    /// Answer every request with this status code
    pub fail_with: Option<u16>,
    /// Seed the demo dataset
    pub seed_demo: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            require_token: None,
            fail_with: None,
            seed_demo: true,
        }
    }
}

#[derive(Default)]
struct MockState {
    collections: BTreeMap<String, Vec<Value>>,
    /// email -> password
    credentials: BTreeMap<String, String>,
}

/// Mock json-server for testing
pub struct MockJsonServer {
    port: u16,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockJsonServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();
        let state = Arc::new(Mutex::new(seed(&config)));

        // Non-blocking so the accept loop notices shutdown
        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        let state = state.clone();
                        thread::spawn(move || handle_connection(stream, &cfg, &state));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockJsonServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn seed(config: &MockConfig) -> MockState {
    let mut state = MockState::default();
    for name in COLLECTIONS {
        state.collections.insert(name.to_string(), Vec::new());
    }
    if !config.seed_demo {
        return state;
    }

    let users = generate_demo_users();
    for user in &users {
        state
            .credentials
            .insert(user.email.clone(), DEMO_PASSWORD.to_string());
    }
    state.collections.insert(
        "usuarios".into(),
        users
            .iter()
            .filter_map(|u| serde_json::to_value(u).ok())
            .collect(),
    );
    state.collections.insert(
        "cuentas".into(),
        generate_demo_accounts()
            .iter()
            .filter_map(|a| serde_json::to_value(a).ok())
            .collect(),
    );
    state.collections.insert(
        "transferencias".into(),
        generate_demo_transfers()
            .iter()
            .filter_map(|t| serde_json::to_value(t).ok())
            .collect(),
    );
    state
}

struct Request {
    method: String,
    path: String,
    query: Option<String>,
    authorization: Option<String>,
    body: Option<Value>,
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut reader = BufReader::new(stream);

    let mut first_line = String::new();
    reader.read_line(&mut first_line).ok()?;
    let mut parts = first_line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                "authorization" => authorization = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    let body = if content_length > 0 {
        let mut buf = vec![0u8; content_length];
        reader.read_exact(&mut buf).ok()?;
        serde_json::from_slice(&buf).ok()
    } else {
        None
    };

    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), Some(q.to_string())),
        None => (target, None),
    };

    Some(Request {
        method,
        path,
        query,
        authorization,
        body,
    })
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig, state: &Mutex<MockState>) {
    // Accepted sockets inherit non-blocking mode on some platforms
    let _ = stream.set_nonblocking(false);
    let request = match read_request(&mut stream) {
        Some(r) => r,
        None => {
            send_response(&mut stream, 400, &json!({"error": "Invalid request"}));
            return;
        }
    };

    if let Some(code) = config.fail_with {
        send_response(&mut stream, code, &json!({"error": "Simulated failure"}));
        return;
    }

    if request.path != "/login" {
        if let Some(expected) = &config.require_token {
            let expected = format!("Bearer {}", expected);
            if request.authorization.as_deref() != Some(expected.as_str()) {
                send_response(&mut stream, 401, &json!({"error": "Unauthorized"}));
                return;
            }
        }
    }

    let mut state = match state.lock() {
        Ok(s) => s,
        Err(_) => {
            send_response(&mut stream, 500, &json!({"error": "State poisoned"}));
            return;
        }
    };
    let (status, body) = route(&mut state, &request);
    send_response(&mut stream, status, &body);
}

fn route(state: &mut MockState, req: &Request) -> (u16, Value) {
    let segments: Vec<&str> = req.path.trim_matches('/').split('/').collect();

    if req.method == "POST" && segments == ["login"] {
        return login(state, req.body.as_ref());
    }

    let collection = match segments.first() {
        Some(name) if COLLECTIONS.contains(name) => name.to_string(),
        _ => return not_found(),
    };
    let id: Option<i64> = match segments.get(1) {
        Some(raw) => match raw.parse() {
            Ok(id) => Some(id),
            Err(_) => return not_found(),
        },
        None => None,
    };
    let items = state.collections.entry(collection).or_default();

    match (req.method.as_str(), id) {
        ("GET", None) => {
            let filtered: Vec<Value> = items
                .iter()
                .filter(|item| matches_query(item, req.query.as_deref()))
                .cloned()
                .collect();
            (200, Value::Array(filtered))
        }
        ("GET", Some(id)) => match items.iter().find(|item| item_id(item) == Some(id)) {
            Some(item) => (200, item.clone()),
            None => not_found(),
        },
        ("POST", None) => {
            let mut record = match &req.body {
                Some(Value::Object(map)) => map.clone(),
                _ => return (400, json!({"error": "Expected a JSON object"})),
            };
            let next_id = items.iter().filter_map(item_id).max().unwrap_or(0) + 1;
            record.insert("id".into(), json!(next_id));
            let record = Value::Object(record);
            items.push(record.clone());
            (201, record)
        }
        ("PATCH", Some(id)) => {
            let patch = match &req.body {
                Some(Value::Object(map)) => map.clone(),
                _ => return (400, json!({"error": "Expected a JSON object"})),
            };
            match items.iter_mut().find(|item| item_id(item) == Some(id)) {
                Some(Value::Object(record)) => {
                    for (key, value) in patch {
                        if key != "id" {
                            record.insert(key, value);
                        }
                    }
                    (200, Value::Object(record.clone()))
                }
                _ => not_found(),
            }
        }
        ("DELETE", Some(id)) => {
            let before = items.len();
            items.retain(|item| item_id(item) != Some(id));
            if items.len() < before {
                (200, json!({}))
            } else {
                not_found()
            }
        }
        _ => (405, json!({"error": "Method not allowed"})),
    }
}

fn login(state: &MockState, body: Option<&Value>) -> (u16, Value) {
    let email = body.and_then(|b| b.get("email")).and_then(Value::as_str);
    let password = body.and_then(|b| b.get("password")).and_then(Value::as_str);
    let (email, password) = match (email, password) {
        (Some(e), Some(p)) => (e, p),
        _ => return (400, json!({"error": "email and password required"})),
    };

    if state.credentials.get(email).map(String::as_str) != Some(password) {
        return (401, json!({"error": "Invalid credentials"}));
    }
    let user = state
        .collections
        .get("usuarios")
        .and_then(|users| {
            users
                .iter()
                .find(|u| u.get("email").and_then(Value::as_str) == Some(email))
        })
        .cloned();
    match user {
        Some(usuario) => (200, json!({"usuario": usuario, "token": format!("mock-{}", email)})),
        None => (401, json!({"error": "Invalid credentials"})),
    }
}

fn item_id(item: &Value) -> Option<i64> {
    item.get("id").and_then(Value::as_i64)
}

/// json-server style `field=value` equality filters
fn matches_query(item: &Value, query: Option<&str>) -> bool {
    let query = match query {
        Some(q) if !q.is_empty() => q,
        _ => return true,
    };
    query.split('&').all(|pair| {
        let (key, expected) = pair.split_once('=').unwrap_or((pair, ""));
        match item.get(key) {
            Some(Value::String(s)) => s == expected,
            Some(other) => other.to_string() == expected,
            None => false,
        }
    })
}

fn not_found() -> (u16, Value) {
    (404, json!({"error": "Not found"}))
}

fn send_response(stream: &mut TcpStream, status: u16, body: &Value) {
    let status_text = match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        405 => "Method Not Allowed",
        _ => "Error",
    };
    let body = body.to_string();
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_server_starts() {
        let server = MockJsonServer::start(MockConfig::default()).unwrap();
        assert!(server.port() > 0);
        assert!(server.base_url().starts_with("http://127.0.0.1:"));
    }

    #[test]
    fn test_query_filter() {
        let item = json!({"id": 1, "usuarioId": 2, "banco": "Banco ABC"});
        assert!(matches_query(&item, Some("usuarioId=2")));
        assert!(!matches_query(&item, Some("usuarioId=1")));
        assert!(matches_query(&item, Some("banco=Banco ABC")));
        assert!(matches_query(&item, None));
    }

    #[test]
    fn test_route_post_assigns_next_id() {
        let mut state = seed(&MockConfig::default());
        let req = Request {
            method: "POST".into(),
            path: "/usuarios".into(),
            query: None,
            authorization: None,
            body: Some(json!({"nombre": "Ana"})),
        };
        let (status, body) = route(&mut state, &req);
        assert_eq!(status, 201);
        assert_eq!(body["id"], 4);
    }
}

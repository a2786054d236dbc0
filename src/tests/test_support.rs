use crate::{Config, SessionClient};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing::subscriber::{DefaultGuard, set_default};
use wiremock::ResponseTemplate;

pub fn base_config(server_uri: &str) -> Config {
    Config::from_values(server_uri, None)
}

pub async fn signed_in_client(server_uri: &str, access: &str, refresh: &str) -> SessionClient {
    let client = SessionClient::new(base_config(server_uri)).expect("client builds");
    client
        .store()
        .set_tokens(access, refresh, Some(900))
        .await
        .expect("tokens stored");
    client
}

pub fn envelope(code: i64, msg: &str, data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "code": code, "msg": msg, "data": data }))
}

pub fn ok(data: Value) -> ResponseTemplate {
    envelope(200, "success", data)
}

/// Formatted log output shared with the subscriber installed by [`capture_logs`].
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn capture_logs() -> (LogBuffer, DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .with_ansi(false)
        .finish();
    (buffer, set_default(subscriber))
}

pub fn count_lines(logs: &[String], level: &str, needle: &str) -> usize {
    logs.iter()
        .filter(|line| line.contains(level) && line.contains(needle))
        .count()
}

//! Outbound text notifications for joins, departures and the initial scan.
//!
//! Delivery never fails loudly: every error is logged and reported as
//! `false`, and nothing is retried within a cycle.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lanwatch_core::{Device, DiscoveryEvent, EventPayload};
use serde_json::json;

use crate::config::TelegramConfig;
use crate::directory::DeviceDirectory;
use crate::error::{DiscoverError, Result};
use crate::sink::EventSink;

/// Accepts a short HTML-formatted message.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// True when the message was accepted for delivery.
    async fn send(&self, text: &str) -> bool;
}

/// Telegram Bot API `sendMessage`.
pub struct TelegramSink {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramSink {
    pub fn new(api_base: &str, bot_token: &str, chat_id: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DiscoverError::Notification(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{bot_token}/sendMessage", api_base.trim_end_matches('/')),
            chat_id: chat_id.to_string(),
        })
    }

    async fn deliver(&self, text: &str) -> Result<()> {
        let payload = json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "HTML",
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DiscoverError::Notification(e.without_url().to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::OK {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(DiscoverError::Notification(format!("HTTP {status}: {body}")))
    }
}

#[async_trait]
impl MessageSink for TelegramSink {
    async fn send(&self, text: &str) -> bool {
        match self.deliver(text).await {
            Ok(()) => {
                tracing::info!(chat_id = %self.chat_id, "Notification sent");
                true
            }
            Err(e) => {
                tracing::warn!(chat_id = %self.chat_id, error = %e, "Notification not delivered");
                false
            }
        }
    }
}

/// Stand-in when notifications are off or not configured.
pub struct DisabledSink {
    reason: String,
}

impl DisabledSink {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl MessageSink for DisabledSink {
    async fn send(&self, _text: &str) -> bool {
        tracing::debug!(reason = %self.reason, "Notification skipped");
        false
    }
}

/// Pick the message sink described by `config`.
pub fn sink_from_config(config: &TelegramConfig) -> Arc<dyn MessageSink> {
    if !config.enabled {
        return Arc::new(DisabledSink::new("notifications disabled"));
    }

    let (Some(token), Some(chat_id)) = (
        config.bot_token.as_deref().filter(|t| !t.is_empty()),
        config.chat_id.as_deref().filter(|c| !c.is_empty()),
    ) else {
        tracing::warn!("Telegram enabled but bot_token or chat_id is missing");
        return Arc::new(DisabledSink::new("missing bot token or chat id"));
    };

    let timeout = Duration::from_secs(config.timeout_secs);
    match TelegramSink::new(&config.api_base, token, chat_id, timeout) {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            tracing::warn!(error = %e, "Telegram sink unavailable");
            Arc::new(DisabledSink::new(e.to_string()))
        }
    }
}

/// Turns discovery events into messages, honoring aliases and exclusions.
pub struct Notifier {
    sink: Arc<dyn MessageSink>,
    directory: Arc<DeviceDirectory>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn MessageSink>, directory: Arc<DeviceDirectory>) -> Self {
        Self { sink, directory }
    }

    pub async fn device_joined(&self, device: &Device) -> bool {
        if self.muted(device) {
            return false;
        }
        let message = format!("🆕 {}", escape_html(&self.directory.device_name(device)));
        self.sink.send(&message).await
    }

    pub async fn device_departed(&self, device: &Device) -> bool {
        if self.muted(device) {
            return false;
        }
        let message = format!("❌ {}", escape_html(&self.directory.device_name(device)));
        self.sink.send(&message).await
    }

    /// One summary message for the first scan, excluded devices omitted.
    pub async fn initial_scan(&self, devices: &[Device]) -> bool {
        let message = initial_scan_message(devices, &self.directory);
        self.sink.send(&message).await
    }

    fn muted(&self, device: &Device) -> bool {
        match self.directory.exclusion(&device.mac) {
            Some(reason) => {
                tracing::info!(
                    hostname = %device.hostname,
                    mac = %device.mac,
                    reason,
                    "Notification suppressed for excluded device"
                );
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl EventSink for Notifier {
    async fn on_event(&self, event: &DiscoveryEvent) {
        match &event.payload {
            EventPayload::InitialScan { devices } => {
                self.initial_scan(devices).await;
            }
            EventPayload::DeviceJoined { device } => {
                self.device_joined(device).await;
            }
            EventPayload::DeviceDeparted { device } => {
                self.device_departed(device).await;
            }
            EventPayload::ScanCompleted { .. } => {}
        }
    }
}

pub fn initial_scan_message(devices: &[Device], directory: &DeviceDirectory) -> String {
    let lines: Vec<String> = devices
        .iter()
        .filter(|d| !directory.is_excluded(&d.mac))
        .map(|d| format!("• {}", escape_html(&directory.device_name(d))))
        .collect();

    if lines.is_empty() {
        return "🔍 <b>Initial scan:</b> No devices detected (or all are excluded).".to_string();
    }
    format!("🔍 <b>Online devices:</b>\n\n{}", lines.join("\n"))
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanwatch_core::Hostname;
    use std::collections::HashMap;
    use std::net::Ipv4Addr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MessageSink for RecordingSink {
        async fn send(&self, text: &str) -> bool {
            self.sent.lock().await.push(text.to_string());
            true
        }
    }

    fn device(tail: u8, name: &str) -> Device {
        Device::new(
            Ipv4Addr::new(192, 168, 1, tail),
            format!("aa:bb:cc:dd:ee:{tail:02x}").parse().unwrap(),
            Hostname::Resolved(name.to_string()),
        )
    }

    fn directory() -> Arc<DeviceDirectory> {
        Arc::new(DeviceDirectory::new(
            HashMap::from([("aa:bb:cc:dd:ee:01".to_string(), "Printer <2F>".to_string())]),
            HashMap::from([("aa:bb:cc:dd:ee:02".to_string(), "Router".to_string())]),
        ))
    }

    #[tokio::test]
    async fn test_join_and_departure_messages_use_alias() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Notifier::new(sink.clone(), directory());

        assert!(notifier.device_joined(&device(1, "hp")).await);
        assert!(notifier.device_departed(&device(3, "phone")).await);

        let sent = sink.sent.lock().await;
        assert_eq!(*sent, vec!["🆕 Printer &lt;2F&gt;".to_string(), "❌ phone".to_string()]);
    }

    #[tokio::test]
    async fn test_excluded_device_is_not_sent() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Notifier::new(sink.clone(), directory());

        assert!(!notifier.device_joined(&device(2, "router")).await);
        assert!(!notifier.device_departed(&device(2, "router")).await);
        assert!(sink.sent.lock().await.is_empty());
    }

    #[test]
    fn test_initial_scan_message() {
        let dir = directory();
        let msg = initial_scan_message(&[device(1, "hp"), device(2, "router"), device(3, "phone")], &dir);
        assert_eq!(msg, "🔍 <b>Online devices:</b>\n\n• Printer &lt;2F&gt;\n• phone");

        let empty = initial_scan_message(&[device(2, "router")], &dir);
        assert_eq!(
            empty,
            "🔍 <b>Initial scan:</b> No devices detected (or all are excluded)."
        );
    }

    #[tokio::test]
    async fn test_disabled_config_never_delivers() {
        let sink = sink_from_config(&TelegramConfig::default());
        assert!(!sink.send("hello").await);

        let missing = sink_from_config(&TelegramConfig {
            enabled: true,
            ..Default::default()
        });
        assert!(!missing.send("hello").await);
    }

    #[tokio::test]
    async fn test_unreachable_api_returns_false() {
        let sink = TelegramSink::new(
            "http://127.0.0.1:9",
            "token",
            "42",
            Duration::from_millis(500),
        )
        .unwrap();
        assert!(!sink.send("hello").await);
    }

    /// Serve exactly one HTTP response and hand back the raw request.
    async fn one_shot_api(status_line: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }

            let body = r#"{"ok":true}"#;
            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8(request).unwrap()
        });

        (base, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let Some(split) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let head = String::from_utf8_lossy(&request[..split]);
        let length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() - (split + 4) >= length
    }

    #[tokio::test]
    async fn test_accepted_message_posts_html_payload() {
        let (base, server) = one_shot_api("HTTP/1.1 200 OK").await;
        let sink = TelegramSink::new(&base, "123:abc", "42", Duration::from_secs(5)).unwrap();

        assert!(sink.send("🆕 <b>Printer</b>").await);

        let request = server.await.unwrap();
        let (head, body) = request.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("POST /bot123:abc/sendMessage HTTP/1.1"));
        assert!(head.to_ascii_lowercase().contains("content-type: application/json"));

        let payload: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(
            payload,
            json!({"chat_id": "42", "text": "🆕 <b>Printer</b>", "parse_mode": "HTML"})
        );
    }

    #[tokio::test]
    async fn test_rejected_message_returns_false() {
        let (base, server) = one_shot_api("HTTP/1.1 400 Bad Request").await;
        let sink = TelegramSink::new(&base, "123:abc", "42", Duration::from_secs(5)).unwrap();

        assert!(!sink.send("hello").await);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_other_success_status_is_not_delivery() {
        let (base, server) = one_shot_api("HTTP/1.1 202 Accepted").await;
        let sink = TelegramSink::new(&base, "123:abc", "42", Duration::from_secs(5)).unwrap();

        assert!(!sink.send("hello").await);
        server.await.unwrap();
    }
}

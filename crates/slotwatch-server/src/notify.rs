//! Notification fan-out.
//!
//! [`NotificationSink`] is what the discovery loop talks to; [`TelegramSink`]
//! delivers through the Telegram Bot API to the subscribers kept in a
//! [`SubscriberStore`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use slotwatch_booking::BoxFuture;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ServerError, ServerResult};
use crate::subscribers::SubscriberStore;
use crate::telemetry;

/// Default Telegram Bot API base URL.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Delivers text to subscribers.
pub trait NotificationSink: Send + Sync {
    /// Current subscriber ids.
    fn list_subscribers(&self) -> BoxFuture<'_, ServerResult<Vec<i64>>>;

    /// Sends `text` to one subscriber.
    fn send<'a>(&'a self, subscriber: i64, text: &'a str) -> BoxFuture<'a, ServerResult<()>>;
}

/// Outcome of a broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub recipients: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Sends `text` to every current subscriber.
///
/// A failing recipient is logged and counted; the remaining ones are still
/// tried. Only a failure to list subscribers is returned as an error.
pub async fn broadcast(sink: &dyn NotificationSink, text: &str) -> ServerResult<BroadcastReport> {
    let subscribers = sink.list_subscribers().await?;
    let mut report = BroadcastReport {
        recipients: subscribers.len(),
        ..Default::default()
    };

    for subscriber in subscribers {
        match sink.send(subscriber, text).await {
            Ok(()) => {
                telemetry::record_notification_sent();
                report.delivered += 1;
            }
            Err(e) => {
                warn!(subscriber, error = %e, "failed to notify subscriber");
                telemetry::record_delivery_failure();
                report.failed += 1;
            }
        }
    }

    debug!(
        recipients = report.recipients,
        delivered = report.delivered,
        failed = report.failed,
        "broadcast finished"
    );
    Ok(report)
}

/// Telegram Bot API settings.
#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_base: Url,
    pub timeout: Duration,
}

impl TelegramConfig {
    /// Creates a config for the given bot token.
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_base: Url::parse(TELEGRAM_API_BASE).expect("default Telegram URL is valid"),
            timeout: Duration::from_secs(10),
        }
    }

    /// Builder: override the API base URL.
    pub fn with_api_base(mut self, api_base: Url) -> Self {
        self.api_base = api_base;
        self
    }

    /// Builder: set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"***")
            .field("api_base", &self.api_base.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct TelegramReply {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sink that posts `sendMessage` calls to the Telegram Bot API.
#[derive(Debug)]
pub struct TelegramSink {
    http: reqwest::Client,
    config: TelegramConfig,
    subscribers: Arc<SubscriberStore>,
}

impl TelegramSink {
    /// Creates a sink delivering to the subscribers in `subscribers`.
    pub fn new(config: TelegramConfig, subscribers: Arc<SubscriberStore>) -> ServerResult<Self> {
        if config.bot_token.is_empty() {
            return Err(ServerError::config("Telegram bot token is required"));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ServerError::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            config,
            subscribers,
        })
    }

    fn send_message_url(&self) -> ServerResult<Url> {
        self.config
            .api_base
            .join(&format!("bot{}/sendMessage", self.config.bot_token))
            .map_err(|e| ServerError::config(format!("invalid Telegram API URL: {}", e)))
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> ServerResult<()> {
        let response = self
            .http
            .post(self.send_message_url()?)
            .json(&SendMessage {
                chat_id,
                text,
                disable_web_page_preview: true,
            })
            .send()
            .await
            // The URL carries the bot token; keep it out of errors and logs.
            .map_err(|e| ServerError::sink(format!("sendMessage failed: {}", e.without_url())))?;

        let status = response.status();
        let reply: Option<TelegramReply> = response.json().await.ok();
        match reply {
            Some(reply) if status.is_success() && reply.ok => Ok(()),
            Some(reply) => Err(ServerError::sink(format!(
                "sendMessage rejected (status {}): {}",
                status.as_u16(),
                reply.description.unwrap_or_else(|| "no description".to_string())
            ))),
            None => Err(ServerError::sink(format!(
                "sendMessage returned status {} with unreadable body",
                status.as_u16()
            ))),
        }
    }
}

impl NotificationSink for TelegramSink {
    fn list_subscribers(&self) -> BoxFuture<'_, ServerResult<Vec<i64>>> {
        Box::pin(self.subscribers.ids())
    }

    fn send<'a>(&'a self, subscriber: i64, text: &'a str) -> BoxFuture<'a, ServerResult<()>> {
        Box::pin(self.send_message(subscriber, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct RecordingSink {
        subscribers: Vec<i64>,
        failing: Vec<i64>,
        sent: Mutex<Vec<i64>>,
    }

    impl NotificationSink for RecordingSink {
        fn list_subscribers(&self) -> BoxFuture<'_, ServerResult<Vec<i64>>> {
            Box::pin(async move { Ok(self.subscribers.clone()) })
        }

        fn send<'a>(&'a self, subscriber: i64, _text: &'a str) -> BoxFuture<'a, ServerResult<()>> {
            Box::pin(async move {
                self.sent.lock().unwrap().push(subscriber);
                if self.failing.contains(&subscriber) {
                    Err(ServerError::sink("blocked by user"))
                } else {
                    Ok(())
                }
            })
        }
    }

    #[tokio::test]
    async fn broadcast_continues_after_failure() {
        let sink = RecordingSink {
            subscribers: vec![1, 2, 3],
            failing: vec![2],
            sent: Mutex::new(Vec::new()),
        };
        let report = broadcast(&sink, "hello").await.unwrap();
        assert_eq!(
            report,
            BroadcastReport {
                recipients: 3,
                delivered: 2,
                failed: 1
            }
        );
        assert_eq!(*sink.sent.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn broadcast_counts_sent_and_failed_notifications() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let sink = RecordingSink {
            subscribers: vec![1, 2, 3],
            failing: vec![3],
            sent: Mutex::new(Vec::new()),
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        metrics::with_local_recorder(&recorder, || {
            runtime.block_on(broadcast(&sink, "hello")).unwrap();
        });

        let rendered = handle.render();
        assert!(rendered.contains("slotwatch_notifications_sent_total 2"), "{rendered}");
        assert!(rendered.contains("slotwatch_delivery_failures_total 1"), "{rendered}");
    }

    #[test]
    fn config_debug_masks_token() {
        let config = TelegramConfig::new("123:secret");
        assert!(!format!("{:?}", config).contains("secret"));
    }

    #[test]
    fn empty_token_is_rejected() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SubscriberStore::new(dir.path().join("s.json")));
        assert!(TelegramSink::new(TelegramConfig::new(""), store).is_err());
    }

    async fn sink_for(server: &MockServer, dir: &tempfile::TempDir) -> TelegramSink {
        let store = Arc::new(SubscriberStore::new(dir.path().join("s.json")));
        store.add(42).await.unwrap();
        let config =
            TelegramConfig::new("TOKEN").with_api_base(Url::parse(&server.uri()).unwrap());
        TelegramSink::new(config, store).unwrap()
    }

    #[tokio::test]
    async fn telegram_send_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .and(body_json(json!({
                "chat_id": 42,
                "text": "new slot",
                "disable_web_page_preview": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let sink = sink_for(&server, &dir).await;
        assert_eq!(sink.list_subscribers().await.unwrap(), vec![42]);
        sink.send(42, "new slot").await.unwrap();
    }

    #[tokio::test]
    async fn telegram_ok_false_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "ok": false,
                "error_code": 403,
                "description": "Forbidden: bot was blocked by the user"
            })))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let sink = sink_for(&server, &dir).await;
        let err = sink.send(42, "x").await.unwrap_err();
        assert!(err.to_string().contains("blocked by the user"));
        assert!(!err.to_string().contains("TOKEN"));
    }
}

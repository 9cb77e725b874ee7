//! Notification service
//!
//! Events are handed to [`Notifications`], a cloneable one-way sender. A
//! dispatcher task owns the [`NotificationSink`] and delivers events in send
//! order. Senders never wait for delivery and never see its result.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use warden_client::TelegramClient;
use warden_core::domain::event::Event;
use warden_core::domain::job::StepStatus;

use crate::config::TelegramConfig;

/// Destination for notification events
///
/// Implementations log their own delivery failures; nothing is returned to
/// the caller.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, event: &Event);
}

/// Fire-and-forget handle for emitting events
#[derive(Debug, Clone)]
pub struct Notifications {
    tx: mpsc::UnboundedSender<Event>,
}

impl Notifications {
    /// Creates a handle and the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Creates a handle whose events are delivered to `sink` by a background task
    pub fn spawn(sink: Arc<dyn NotificationSink>) -> (Self, tokio::task::JoinHandle<()>) {
        let (notifications, mut rx) = Self::channel();

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                sink.deliver(&event).await;
            }
            debug!("Notification dispatcher stopped");
        });

        (notifications, handle)
    }

    /// Emits an event without waiting for delivery
    pub fn notify(&self, event: Event) {
        if let Err(e) = self.tx.send(event) {
            debug!("Notification dropped, dispatcher is gone: {:?}", e.0);
        }
    }
}

/// Delivers events as HTML messages to a Telegram chat
pub struct TelegramSink {
    client: Option<TelegramClient>,
    chat_id: String,
}

impl TelegramSink {
    pub fn new(config: &TelegramConfig) -> Self {
        let client = if config.chat_id.is_empty() {
            warn!("TELEGRAM_CHAT_ID not set, notifications will only be logged");
            None
        } else {
            match TelegramClient::new(&config.api_url, &config.bot_token) {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!("Telegram notifications disabled: {}", e);
                    None
                }
            }
        };

        Self {
            client,
            chat_id: config.chat_id.clone(),
        }
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn deliver(&self, event: &Event) {
        let message = render(event);

        let Some(client) = &self.client else {
            warn!("Telegram not configured. Message not sent: {}", message);
            return;
        };

        debug!(job_id = %event.job_id(), "Sending Telegram message");
        if let Err(e) = client.send_message(&self.chat_id, &message).await {
            error!(job_id = %event.job_id(), "Failed to send message to Telegram: {}", e);
        }
    }
}

/// Renders an event as a Telegram HTML message
pub fn render(event: &Event) -> String {
    match event {
        Event::WorkflowStarted { job_id } => format!(
            "🚀 <b>New VPS Workflow Started</b>\n\nWorkflow ID: {}\nStatus: Initializing...",
            job_id
        ),
        Event::Step {
            job_id,
            step,
            status,
        } => {
            let emoji = match status {
                StepStatus::InProgress => "⏳",
                StepStatus::Success => "✅",
                _ => "❌",
            };
            format!(
                "{} <b>Workflow {}</b>\n\nStep: {}\nStatus: {}",
                emoji,
                job_id,
                escape_html(step),
                escape_html(&status.to_string())
            )
        }
        Event::TunnelUrl { job_id, url } => format!(
            "🔗 <b>SSHX URL Ready</b>\n\nWorkflow ID: {}\n\nURL: <code>{}</code>\n\nYou can now access the VPS via this link!",
            job_id,
            escape_html(url)
        ),
        Event::WorkflowEnded { job_id, success } => {
            let (emoji, status) = if *success {
                ("✅", "Completed Successfully")
            } else {
                ("❌", "Failed")
            };
            format!(
                "{} <b>Workflow Ended</b>\n\nWorkflow ID: {}\nStatus: {}",
                emoji, job_id, status
            )
        }
        Event::Error { job_id, message } => format!(
            "❌ <b>Workflow Error</b>\n\nWorkflow ID: {}\n\nError: {}",
            job_id,
            escape_html(message)
        ),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;
    use warden_core::domain::job::JobId;

    fn job_id() -> JobId {
        JobId::at(chrono::DateTime::from_timestamp(1_704_067_200, 0).unwrap())
    }

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<Event>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn deliver(&self, event: &Event) {
            self.delivered.lock().await.push(event.clone());
        }
    }

    #[tokio::test]
    async fn test_dispatcher_delivers_in_order() {
        let sink = Arc::new(RecordingSink::default());
        let (notifications, handle) = Notifications::spawn(sink.clone());

        notifications.notify(Event::WorkflowStarted { job_id: job_id() });
        notifications.notify(Event::WorkflowEnded {
            job_id: job_id(),
            success: true,
        });
        drop(notifications);
        handle.await.unwrap();

        let delivered = sink.delivered.lock().await;
        assert_eq!(delivered.len(), 2);
        assert!(matches!(delivered[0], Event::WorkflowStarted { .. }));
        assert!(matches!(delivered[1], Event::WorkflowEnded { success: true, .. }));
    }

    #[test]
    fn test_notify_after_receiver_dropped_does_not_panic() {
        let (notifications, rx) = Notifications::channel();
        drop(rx);
        notifications.notify(Event::WorkflowStarted { job_id: job_id() });
    }

    #[tokio::test]
    async fn test_unconfigured_sink_swallows_events() {
        let sink = TelegramSink::new(&TelegramConfig::default());
        assert!(sink.client.is_none());
        sink.deliver(&Event::WorkflowStarted { job_id: job_id() }).await;
    }

    fn config(api_url: String) -> TelegramConfig {
        TelegramConfig {
            api_url,
            bot_token: "testtoken".to_string(),
            chat_id: "-1001".to_string(),
        }
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let sink = TelegramSink::new(&config(format!("http://{}", addr)));
        assert!(sink.client.is_some());
        sink.deliver(&Event::WorkflowStarted { job_id: job_id() }).await;
    }

    #[tokio::test]
    async fn test_delivers_rendered_message_to_chat() {
        use axum::{Json, Router, extract::State, routing::post};

        type Received = Arc<Mutex<Vec<serde_json::Value>>>;

        async fn send_message(
            State(received): State<Received>,
            Json(body): Json<serde_json::Value>,
        ) -> Json<serde_json::Value> {
            received.lock().await.push(body);
            Json(serde_json::json!({ "ok": true, "result": { "message_id": 1 } }))
        }

        let received = Received::default();
        let app = Router::new()
            .route("/bottesttoken/sendMessage", post(send_message))
            .with_state(received.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let sink = TelegramSink::new(&config(format!("http://{}", addr)));
        sink.deliver(&Event::WorkflowStarted { job_id: job_id() }).await;

        let received = received.lock().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["chat_id"], "-1001");
        let text = received[0]["text"].as_str().unwrap();
        assert!(text.contains("Workflow ID: WF-20240101-000000"));
    }

    #[test]
    fn test_render_step_emoji() {
        let render_status = |status| {
            render(&Event::Step {
                job_id: job_id(),
                step: "Cloning Repository".to_string(),
                status,
            })
        };

        assert!(render_status(StepStatus::InProgress).starts_with("⏳"));
        assert!(render_status(StepStatus::Success).starts_with("✅"));
        let failed = render_status(StepStatus::failed("fatal: not found"));
        assert!(failed.starts_with("❌"));
        assert!(failed.contains("Status: Failed: fatal: not found"));
        assert!(failed.contains("Workflow WF-20240101-000000"));
    }

    #[test]
    fn test_render_escapes_dynamic_text() {
        let text = render(&Event::Error {
            job_id: job_id(),
            message: "expected <path> & more".to_string(),
        });
        assert!(text.contains("expected &lt;path&gt; &amp; more"));
    }

    #[test]
    fn test_render_workflow_end() {
        let ok = render(&Event::WorkflowEnded {
            job_id: job_id(),
            success: true,
        });
        let failed = render(&Event::WorkflowEnded {
            job_id: job_id(),
            success: false,
        });
        assert!(ok.contains("Completed Successfully"));
        assert!(failed.contains("Status: Failed"));
    }
}

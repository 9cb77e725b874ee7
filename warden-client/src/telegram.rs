//! Telegram Bot API client

use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use warden_core::dto::telegram::{BotResponse, SendMessage, Update};

use crate::error::{ClientError, Result};
use crate::http::{handle_response, trim_base_url};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for a single Telegram bot
#[derive(Debug, Clone)]
pub struct TelegramClient {
    /// API root including the bot token, e.g. `https://api.telegram.org/bot<token>`
    bot_url: String,
    client: Client,
}

impl TelegramClient {
    /// # Arguments
    /// * `api_url` - Bot API root (normally `https://api.telegram.org`)
    /// * `bot_token` - Token issued by @BotFather
    pub fn new(api_url: impl Into<String>, bot_token: &str) -> Result<Self> {
        if bot_token.is_empty() {
            return Err(ClientError::InvalidRequest(
                "bot token cannot be empty".to_string(),
            ));
        }

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            bot_url: format!("{}/bot{}", trim_base_url(api_url), bot_token),
            client,
        })
    }

    /// Send an HTML-formatted message to a chat
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        let url = format!("{}/sendMessage", self.bot_url);
        let response = self
            .client
            .post(&url)
            .json(&SendMessage {
                chat_id: chat_id.to_string(),
                text: text.to_string(),
                parse_mode: "HTML".to_string(),
            })
            .send()
            .await
            .map_err(without_token)?;

        let body: BotResponse<serde_json::Value> = handle_response(response).await?;
        if !body.ok {
            return Err(ClientError::api_error(
                200,
                body.description.unwrap_or_else(|| "Telegram rejected the message".to_string()),
            ));
        }

        debug!("Message sent to Telegram");
        Ok(())
    }

    /// Fetch pending updates, used to discover chat ids
    pub async fn get_updates(&self) -> Result<Vec<Update>> {
        let url = format!("{}/getUpdates", self.bot_url);
        let response = self.client.get(&url).send().await.map_err(without_token)?;

        let body: BotResponse<Vec<Update>> = handle_response(response).await?;
        Ok(body.result.unwrap_or_default())
    }
}

/// Request URLs embed the bot token, so errors must not carry them
fn without_token(error: reqwest::Error) -> ClientError {
    ClientError::RequestFailed(error.without_url())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const TOKEN: &str = "123456:SECRETTOKEN";

    /// Base URL of a local port nothing listens on
    async fn closed_port() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    /// Serves one canned HTTP response and returns its base URL
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_connection_errors_do_not_leak_token() {
        let client = TelegramClient::new(closed_port().await, TOKEN).unwrap();

        let err = client.send_message("42", "hello").await.unwrap_err();
        assert!(matches!(err, ClientError::RequestFailed(_)));
        assert!(!err.to_string().contains("SECRETTOKEN"), "{}", err);

        let err = client.get_updates().await.unwrap_err();
        assert!(!err.to_string().contains("SECRETTOKEN"), "{}", err);
    }

    #[tokio::test]
    async fn test_parse_errors_do_not_leak_token() {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 3\r\n\r\nabc",
        )
        .await;
        let client = TelegramClient::new(base, TOKEN).unwrap();

        let err = client.send_message("42", "hello").await.unwrap_err();
        assert!(matches!(err, ClientError::ParseError(_)));
        assert!(!err.to_string().contains("SECRETTOKEN"), "{}", err);
    }

    #[tokio::test]
    async fn test_rejected_message_is_an_api_error() {
        let body = r#"{"ok":false,"description":"Bad Request: chat not found"}"#;
        let response: &'static str = Box::leak(
            format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
                body.len(),
                body
            )
            .into_boxed_str(),
        );
        let client = TelegramClient::new(serve_once(response).await, TOKEN).unwrap();

        match client.send_message("42", "hello").await {
            Err(ClientError::ApiError { message, .. }) => {
                assert_eq!(message, "Bad Request: chat not found");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_rejects_empty_token() {
        let err = TelegramClient::new("https://api.telegram.org", "").unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }

    #[test]
    fn test_bot_url_includes_token() {
        let client = TelegramClient::new("https://api.telegram.org/", "123:abc").unwrap();
        assert_eq!(client.bot_url, "https://api.telegram.org/bot123:abc");
    }
}

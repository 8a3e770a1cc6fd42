//! Telegram Bot HTTP API client. Implements [`dbot_core::Bot`] and feeds the poller with raw updates.
//!
//! Every call is a POST of a JSON body to `{api_url}/bot{token}/{method}`; the `{ok, result, description}`
//! envelope is unwrapped here and a failed call becomes [`DbotError::Bot`].

use async_trait::async_trait;
use dbot_core::{Bot, DbotError, Message, Reply, Result, SendOptions, User};
use dispatcher::BotCommand;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::types::{ApiResponse, Update, UserProfilePhotos};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramApi {
    client: Client,
    endpoint: String,
}

impl TelegramApi {
    pub fn new(token: &str, api_url: &str) -> Self {
        Self::with_client(Client::new(), token, api_url)
    }

    pub fn with_client(client: Client, token: &str, api_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let url = format!("{}/{}", self.endpoint, method);
        let response = self
            .client
            .post(&url)
            .json(&params)
            .send()
            .await
            .map_err(|e| DbotError::Bot(format!("{}: {}", method, e)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DbotError::Bot(format!("{}: {}", method, e)))?;

        let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            DbotError::Bot(format!("{}: HTTP {} with undecodable body: {}", method, status, e))
        })?;
        if !envelope.ok {
            return Err(DbotError::Bot(format!(
                "{}: error {}: {}",
                method,
                envelope.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                envelope.description.unwrap_or_default()
            )));
        }
        envelope
            .result
            .ok_or_else(|| DbotError::Bot(format!("{}: ok response without result", method)))
    }

    /// Long-polls for updates starting at `offset`; `timeout` is the server-side wait in seconds.
    #[instrument(skip(self))]
    pub async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>> {
        let updates: Vec<Update> = self
            .call("getUpdates", json!({"offset": offset, "timeout": timeout}))
            .await?;
        debug!(offset, count = updates.len(), "getUpdates returned");
        Ok(updates)
    }

    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", json!({})).await
    }

    pub async fn set_my_name(&self, name: &str) -> Result<bool> {
        self.call("setMyName", json!({ "name": name })).await
    }

    pub async fn set_my_description(&self, description: &str) -> Result<bool> {
        self.call("setMyDescription", json!({ "description": description }))
            .await
    }

    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<bool> {
        self.call("setMyCommands", json!({ "commands": commands }))
            .await
    }

    pub async fn get_user_profile_photos(
        &self,
        user_id: i64,
        offset: u32,
        limit: u32,
    ) -> Result<UserProfilePhotos> {
        self.call(
            "getUserProfilePhotos",
            json!({"user_id": user_id, "offset": offset, "limit": limit}),
        )
        .await
    }

    fn send_params(chat_id: i64, text: &str, options: SendOptions) -> Value {
        let mut params = json!({
            "chat_id": chat_id,
            "text": text,
            "reply_markup": options
                .reply_markup
                .unwrap_or_else(|| json!({"remove_keyboard": true})),
        });
        if let Some(mode) = options.parse_mode {
            params["parse_mode"] = json!(mode.as_str());
        }
        params
    }
}

#[async_trait]
impl Bot for TelegramApi {
    #[instrument(skip(self, text, options))]
    async fn send_message(&self, chat_id: i64, text: &str, options: SendOptions) -> Result<Message> {
        let sent: Value = self
            .call("sendMessage", Self::send_params(chat_id, text, options))
            .await?;
        Message::from_raw(sent)
    }

    #[instrument(skip(self, message, text, options), fields(chat_id = message.chat.id, message_id = message.id))]
    async fn reply_to(&self, message: &Message, text: &str, options: SendOptions) -> Result<Reply> {
        let mut params = Self::send_params(message.chat.id, text, options);
        params["reply_parameters"] = json!({ "message_id": message.id });

        let mut sent: Value = self.call("sendMessage", params).await?;
        let replied = sent
            .as_object_mut()
            .and_then(|m| m.remove("reply_to_message"))
            .map(Message::from_raw)
            .transpose()?;
        Ok(Reply {
            message: Message::from_raw(sent)?,
            reply_to_message: replied,
        })
    }
}

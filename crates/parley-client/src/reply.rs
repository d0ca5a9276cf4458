//! Optional automated replies.
//!
//! A [`ReplyGenerator`] never fails from the caller's point of view: any
//! problem reaching the service becomes [`REPLY_FALLBACK`].

use std::future::Future;

use anyhow::Context;
use parley_shared::constants::REPLY_FALLBACK;
use parley_store::{Conversation, MessageBody};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ReplyConfig;

const SYSTEM_INSTRUCTION: &str = "You are a helpful and friendly chat bot. The user is chatting \
with you as if you are another person. Keep your responses concise and conversational.";

pub trait ReplyGenerator {
    /// Produce a reply to `new_message`, the newest outbound text in
    /// `conversation`.  `None` means no reply is wanted.
    fn reply(
        &self,
        conversation: &Conversation,
        new_message: &str,
    ) -> impl Future<Output = Option<String>> + Send;
}

/// Used when no reply service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReply;

impl ReplyGenerator for NoReply {
    async fn reply(&self, _conversation: &Conversation, _new_message: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

impl Content {
    fn new(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

/// Reply service reached over HTTP with a `generateContent`-style API.
pub struct HttpReplyClient {
    http_client: reqwest::Client,
    config: ReplyConfig,
}

impl HttpReplyClient {
    pub fn new(config: ReplyConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client,
            config,
        }
    }

    async fn request(&self, conversation: &Conversation, new_message: &str) -> anyhow::Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        let body = GenerateRequest {
            system_instruction: Content::new(None, SYSTEM_INSTRUCTION),
            contents: build_contents(conversation, new_message),
        };

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .context("Failed to send reply request")?
            .error_for_status()
            .context("Reply service returned an error status")?;

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse reply response")?;

        parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<String>()
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("Reply response had no text"))
    }
}

impl ReplyGenerator for HttpReplyClient {
    async fn reply(&self, conversation: &Conversation, new_message: &str) -> Option<String> {
        match self.request(conversation, new_message).await {
            Ok(text) => {
                debug!(counterpart = %conversation.counterpart, "reply generated");
                Some(text)
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "reply service failed, using fallback");
                Some(REPLY_FALLBACK.to_string())
            }
        }
    }
}

/// Chat history for the model: earlier text messages (the counterpart's as
/// `model`, the rest as `user`) followed by the new message.  If the
/// conversation already ends with the new message it is not repeated.
fn build_contents(conversation: &Conversation, new_message: &str) -> Vec<Content> {
    let mut history: &[_] = &conversation.messages;
    if let Some((last, rest)) = history.split_last() {
        if matches!(&last.body, MessageBody::Text { text } if text == new_message) {
            history = rest;
        }
    }

    let mut contents: Vec<Content> = history
        .iter()
        .filter_map(|m| match &m.body {
            MessageBody::Text { text } => {
                let role = if m.sender_uid == conversation.counterpart {
                    "model"
                } else {
                    "user"
                };
                Some(Content::new(Some(role), text))
            }
            _ => None,
        })
        .collect();
    contents.push(Content::new(Some("user"), new_message));
    contents
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_shared::types::AccountId;
    use parley_store::{Attachment, Message};
    use std::time::Duration;

    fn uid(s: &str) -> AccountId {
        AccountId::parse(s).unwrap()
    }

    fn msg(id: u64, sender: &AccountId, body: MessageBody) -> Message {
        Message {
            id,
            sender_uid: sender.clone(),
            timestamp: "12:00".into(),
            body,
        }
    }

    #[test]
    fn history_roles_and_trailing_message() {
        let me = uid("11111111");
        let bot = uid("22222222");
        let mut convo = Conversation::new(bot.clone());
        convo.messages = vec![
            msg(1, &me, MessageBody::text("hi")),
            msg(2, &bot, MessageBody::text("hello!")),
            msg(
                3,
                &me,
                MessageBody::Image(Attachment {
                    file_url: "data:image/png;base64,AA==".into(),
                    file_name: "a.png".into(),
                    file_size: "0.00 KB".into(),
                }),
            ),
            msg(4, &me, MessageBody::text("how are you?")),
        ];

        let contents = build_contents(&convo, "how are you?");
        let roles: Vec<_> = contents.iter().map(|c| c.role.as_deref().unwrap()).collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(contents[2].parts[0].text, "how are you?");
    }

    #[tokio::test]
    async fn no_reply_is_silent() {
        let convo = Conversation::new(uid("22222222"));
        assert!(NoReply.reply(&convo, "hello").await.is_none());
    }

    #[tokio::test]
    async fn unreachable_service_falls_back() {
        let client = HttpReplyClient::new(ReplyConfig {
            endpoint: "http://127.0.0.1:9".into(),
            api_key: "test".into(),
            model: "test-model".into(),
            timeout: Duration::from_secs(2),
        });
        let convo = Conversation::new(uid("22222222"));
        let reply = client.reply(&convo, "hello").await;
        assert_eq!(reply.as_deref(), Some(REPLY_FALLBACK));
    }
}

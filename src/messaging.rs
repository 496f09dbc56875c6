use log::{debug, error};
use reqwest::header;

use crate::model::MessagingConfig;

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub enum MsgKind {
    #[serde(rename = "info")]
    Info,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "payment")]
    Payment,
    #[serde(rename = "moderation")]
    Moderation,
    #[serde(rename = "security")]
    Security,
}

fn is_enabled(kind: MsgKind, cfg: &MessagingConfig) -> bool {
    cfg.notify_on.contains(&kind)
}

fn send_telegram_message(bot_token: &str, chat_ids: &[String], msg: &str) {
    for chat_id in chat_ids {
        let bot = rustelebot::create_instance(bot_token, chat_id);
        match rustelebot::send_message(&bot, msg, None) {
            Ok(()) => debug!("Text message sent successfully to {chat_id}"),
            Err(e) => error!("Text message wasn't sent to {chat_id} because of: {e}"),
        }
    }
}

pub fn send_message(kind: MsgKind, cfg: Option<&MessagingConfig>, msg: &str) {
    let Some(messaging) = cfg else { return; };
    if !is_enabled(kind, messaging) {
        return;
    }
    if let Some(telegram) = &messaging.telegram {
        let bot_token = telegram.bot_token.clone();
        let chat_ids = telegram.chat_ids.clone();
        let data = msg.to_owned();
        // rustelebot is blocking
        tokio::task::spawn_blocking(move || send_telegram_message(&bot_token, &chat_ids, &data));
    }

    if let Some(rest) = &messaging.rest {
        let url = rest.url.clone();
        let data = serde_json::json!({"kind": kind, "message": msg}).to_string();
        tokio::spawn(async move {
            let client = reqwest::Client::new();
            match client.post(&url)
                .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())
                .body(data)
                .send()
                .await {
                Ok(_) => debug!("Text message sent successfully to rest api"),
                Err(e) => error!("Text message wasn't sent to rest api because of: {e}"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{is_enabled, MsgKind};
    use crate::model::MessagingConfig;

    #[test]
    fn test_notify_on() {
        let cfg: MessagingConfig = serde_yaml::from_str("notify_on: [payment, moderation]").unwrap();
        assert!(is_enabled(MsgKind::Payment, &cfg));
        assert!(!is_enabled(MsgKind::Security, &cfg));
    }
}

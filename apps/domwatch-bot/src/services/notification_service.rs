use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{error, warn};

use domwatch_db::repositories::SubscriberRepository;

/// Broadcast boundary used by the transition engine. Delivery problems
/// never propagate back into check execution.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn broadcast(&self, text: &str);

    async fn notify_downtime(&self, domain: &str, reason: &str) {
        self.broadcast(&format!(
            "❌ <b>{domain}</b> is down\nReason: <code>{reason}</code>"
        ))
        .await;
    }

    async fn notify_recovery(&self, domain: &str) {
        self.broadcast(&format!("✅ <b>{domain}</b> is back up")).await;
    }
}

pub struct TelegramNotifier {
    bot: Bot,
    subscribers: SubscriberRepository,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, subscribers: SubscriberRepository) -> Self {
        Self { bot, subscribers }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn broadcast(&self, text: &str) {
        let subscribers = match self.subscribers.list().await {
            Ok(subscribers) => subscribers,
            Err(e) => {
                error!("Failed to load subscriber list: {e:#}");
                return;
            }
        };

        for subscriber in subscribers {
            if let Err(e) = self
                .bot
                .send_message(ChatId(subscriber.chat_id), text)
                .parse_mode(ParseMode::Html)
                .await
            {
                warn!("Failed to deliver notification to {}: {}", subscriber.chat_id, e);
            }
            // Telegram flood limits: ~30 messages/second allowed
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

use async_trait::async_trait;

use crate::models::{Channel, OutboxEntry};

/// One transport the delivery worker can hand a message to. Implementations
/// report transient failures through Err; the worker owns retry policy.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    fn channel(&self) -> Channel;

    async fn send(&self, entry: &OutboxEntry) -> anyhow::Result<()>;
}

/// Logs instead of talking to a real email provider. Stands in until an
/// SMTP or API-backed sender is wired up.
pub struct StubEmailSender;

#[async_trait]
impl NotificationSender for StubEmailSender {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(&self, entry: &OutboxEntry) -> anyhow::Result<()> {
        tracing::info!(
            to = %entry.to_address,
            subject = entry.subject.as_deref().unwrap_or(""),
            "email sent (stub)"
        );
        Ok(())
    }
}

/// Logs instead of talking to a real SMS gateway.
pub struct StubSmsSender;

#[async_trait]
impl NotificationSender for StubSmsSender {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    async fn send(&self, entry: &OutboxEntry) -> anyhow::Result<()> {
        tracing::info!(to = %entry.to_address, "sms sent (stub)");
        Ok(())
    }
}

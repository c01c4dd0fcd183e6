pub mod twilio;

use async_trait::async_trait;

/// Outbound text channel used by the SMS notifier.
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()>;
}

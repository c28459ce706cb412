use async_trait::async_trait;

/// Outbound message channel used by the registration flow.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body_html: &str) -> anyhow::Result<()>;
}

/// Writes messages to the log instead of delivering them. Useful for local
/// development where no mail relay is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, body_html: &str) -> anyhow::Result<()> {
        tracing::info!(to, subject, body = body_html, "notification");
        Ok(())
    }
}

use async_trait::async_trait;
use dohproxy_domain::DomainError;
use hickory_proto::op::Message;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Resolves the single question of `query` upstream. Cancelling `ctx`
    /// aborts the exchange and returns `DomainError::QueryCancelled`.
    async fn request(
        &self,
        ctx: &CancellationToken,
        query: &Message,
    ) -> Result<Message, DomainError>;
}

use async_trait::async_trait;
use dohproxy_domain::DomainError;
use hickory_proto::op::Message;

/// Delivers one response back to the client that sent the query.
#[async_trait]
pub trait ResponseWriter: Send {
    async fn write_message(&mut self, response: &Message) -> Result<(), DomainError>;
}

use crate::application_port::*;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Current role and status of a user. Authoritative over anything embedded
    /// in a previously issued token.
    async fn get_identity(&self, id: UserId) -> Result<Option<Identity>, TokenError>;
}

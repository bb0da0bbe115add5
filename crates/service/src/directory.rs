use async_trait::async_trait;
use models::{user::User, RecordId};

use crate::errors::ServiceError;

/// Read access to the current set of users.
///
/// The review store resolves user names and checks user existence through this
/// trait, so it never depends on how users are stored.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn users(&self) -> Result<Vec<User>, ServiceError>;

    async fn contains(&self, id: RecordId) -> Result<bool, ServiceError> {
        Ok(self.users().await?.iter().any(|u| u.id == id))
    }
}

#[async_trait]
impl UserDirectory for Vec<User> {
    async fn users(&self) -> Result<Vec<User>, ServiceError> {
        Ok(self.clone())
    }
}

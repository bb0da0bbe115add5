use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use models::{
    derive_id,
    user::{NewUser, User, UserPatch},
    RecordId,
};
use tracing::{info, warn};

use crate::directory::UserDirectory;
use crate::errors::ServiceError;
use crate::storage::{
    delimited::{parse_rows, render_document, Quoting},
    flat_file::{FlatFile, ReadPolicy},
    record_store::{RecordCodec, RecordStore},
};

pub const USERS_HEADER: &str = "Name,Email";

/// `Name,Email` lines, quoted only where a value holds a comma. Ids are
/// derived from the email on decode.
pub struct UserCodec;

#[async_trait]
impl RecordCodec for UserCodec {
    type Record = User;

    fn id_of(record: &User) -> RecordId {
        record.id
    }

    async fn decode(&self, text: &str) -> Result<Vec<User>, ServiceError> {
        let users = parse_rows(text)
            .into_iter()
            .filter_map(|row| {
                let email = row.field(1);
                if email.is_empty() {
                    warn!(line = row.line_no, "skipping user line without an email");
                    return None;
                }
                Some(User { id: derive_id(email), name: row.field(0).to_string(), email: email.to_string() })
            })
            .collect();
        Ok(users)
    }

    async fn encode(&self, records: &[User]) -> Result<String, ServiceError> {
        let rows = records.iter().map(|u| vec![u.name.clone(), u.email.clone()]);
        render_document(USERS_HEADER, rows, Quoting::Necessary)
    }
}

/// File-backed user store.
pub struct UserStore {
    records: RecordStore<UserCodec>,
}

impl UserStore {
    /// Open the store at `path`. A missing file is an empty user set.
    pub fn new<P: Into<PathBuf>>(path: P, policy: ReadPolicy) -> Arc<Self> {
        let records = RecordStore::new(FlatFile::new(path, policy), UserCodec, "user");
        Arc::new(Self { records })
    }

    pub fn records(&self) -> &RecordStore<UserCodec> {
        &self.records
    }

    pub async fn list(&self) -> Result<Vec<User>, ServiceError> {
        self.records.list_all().await
    }

    pub async fn get(&self, id: RecordId) -> Result<Option<User>, ServiceError> {
        self.records.find_by_id(id).await
    }

    /// Validate and insert a new user; the email must be unique ignoring case.
    pub async fn create(&self, input: NewUser) -> Result<User, ServiceError> {
        let user = input.validate()?;
        let created = self
            .records
            .mutate(|users| {
                if users.iter().any(|u| u.has_email(&user.email)) {
                    return Err(ServiceError::Conflict("User with this email already exists".into()));
                }
                users.push(user.clone());
                Ok(user)
            })
            .await?;
        info!(id = created.id, "user created");
        Ok(created)
    }

    /// Apply a partial update. Changing the email changes the derived id.
    pub async fn update(&self, id: RecordId, patch: UserPatch) -> Result<User, ServiceError> {
        patch.validate()?;
        self.records
            .mutate(|users| {
                let idx = users
                    .iter()
                    .position(|u| u.id == id)
                    .ok_or_else(|| ServiceError::not_found("user"))?;
                if let Some(email) = patch.email.as_deref().map(str::trim) {
                    if users.iter().any(|u| u.id != id && u.has_email(email)) {
                        return Err(ServiceError::Conflict("User with this email already exists".into()));
                    }
                }
                let mut next = users[idx].clone();
                patch.apply(&mut next)?;
                users[idx] = next.clone();
                Ok(next)
            })
            .await
    }

    pub async fn delete(&self, id: RecordId) -> Result<User, ServiceError> {
        let removed = self.records.remove(id).await?;
        info!(id, "user deleted");
        Ok(removed)
    }
}

#[async_trait]
impl UserDirectory for UserStore {
    async fn users(&self) -> Result<Vec<User>, ServiceError> {
        self.list().await
    }
}

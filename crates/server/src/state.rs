use std::sync::Arc;

use configs::StorageConfig;
use service::{
    directory::UserDirectory,
    file::{
        review_store::{ReviewStore, ReviewStoreOptions},
        user_store::UserStore,
    },
    storage::flat_file::ReadPolicy,
};

#[derive(Clone)]
pub struct ServerState {
    pub users: Arc<UserStore>,
    pub reviews: Arc<ReviewStore>,
}

impl ServerState {
    /// Open both stores from the storage section of the config. Nothing is read yet.
    pub fn from_config(storage: &StorageConfig) -> Self {
        let policy = ReadPolicy::from_strict(storage.strict_reads);
        let users = UserStore::new(&storage.users_file, policy);
        let directory: Arc<dyn UserDirectory> = users.clone();
        let reviews = ReviewStore::new(
            &storage.reviews_file,
            directory,
            ReviewStoreOptions {
                layout: storage.review_layout,
                policy,
                require_existing_user: storage.require_existing_user,
            },
        );
        Self { users, reviews }
    }
}

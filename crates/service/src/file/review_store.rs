use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use configs::ReviewLayout;
use models::{
    review::{NewReview, RatingType, Review, ReviewPatch, MAX_RATING, MIN_RATING},
    user::User,
    RecordId,
};
use tracing::{debug, info, warn};

use crate::directory::UserDirectory;
use crate::errors::ServiceError;
use crate::stats::ReviewStats;
use crate::storage::{
    delimited::{header_line, parse_rows, render_document, Quoting, Row},
    flat_file::{FlatFile, ReadPolicy},
    record_store::{RecordCodec, RecordStore},
};

pub const LEGACY_HEADER: &str = "Title,Rating,Content,RatingType,ProductBarcode,UserName,Date";
pub const KEYED_HEADER: &str = "Id,UserId,Title,Rating,Content,RatingType,ProductBarcode,Date";
pub const UNKNOWN_USER: &str = "Unknown User";

const DEFAULT_RATING: u8 = 3;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reviews codec.
///
/// Writes the configured layout. Reads sniff the header so that a legacy file
/// stays readable after switching to the keyed layout.
pub struct ReviewCodec {
    layout: ReviewLayout,
    users: Arc<dyn UserDirectory>,
}

impl ReviewCodec {
    pub fn new(layout: ReviewLayout, users: Arc<dyn UserDirectory>) -> Self {
        Self { layout, users }
    }

    fn decode_keyed(rows: Vec<Row>) -> Vec<Review> {
        rows.into_iter()
            .filter_map(|row| {
                let (Ok(id), Ok(user_id)) = (row.field(0).parse::<RecordId>(), row.field(1).parse::<RecordId>()) else {
                    warn!(line = row.line_no, "skipping review line with a malformed id");
                    return None;
                };
                Some(review_from_row(&row, id, user_id, 2, 7))
            })
            .collect()
    }

    /// Resolve `UserName` against one fresh user snapshot; unmatched names get
    /// a placeholder id well outside the range of derived user ids.
    fn decode_legacy(rows: Vec<Row>, users: &[User]) -> Vec<Review> {
        let base = Utc::now().timestamp_millis();
        rows.into_iter()
            .map(|row| {
                let placeholder = base + row.line_no as i64;
                let name = row.field(5);
                let user_id = match users.iter().find(|u| u.name == name) {
                    Some(user) => user.id,
                    None => {
                        debug!(line = row.line_no, user = %name, "review references an unknown user");
                        placeholder
                    }
                };
                review_from_row(&row, placeholder, user_id, 0, 6)
            })
            .collect()
    }
}

#[async_trait]
impl RecordCodec for ReviewCodec {
    type Record = Review;

    fn id_of(record: &Review) -> RecordId {
        record.id
    }

    async fn decode(&self, text: &str) -> Result<Vec<Review>, ServiceError> {
        let keyed = header_line(text).is_some_and(|h| h.starts_with("Id,"));
        let rows = parse_rows(text);
        if keyed {
            return Ok(Self::decode_keyed(rows));
        }
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let users = self.users.users().await?;
        Ok(Self::decode_legacy(rows, &users))
    }

    async fn encode(&self, records: &[Review]) -> Result<String, ServiceError> {
        match self.layout {
            ReviewLayout::Keyed => {
                let rows = records.iter().map(|r| {
                    let mut row = vec![r.id.to_string(), r.user_id.to_string()];
                    row.extend(body_fields(r));
                    row.push(r.date.format(DATE_FORMAT).to_string());
                    row
                });
                render_document(KEYED_HEADER, rows, Quoting::Always)
            }
            ReviewLayout::Legacy => {
                let users = if records.is_empty() { Vec::new() } else { self.users.users().await? };
                let rows = records.iter().map(|r| {
                    let name = users
                        .iter()
                        .find(|u| u.id == r.user_id)
                        .map(|u| u.name.clone())
                        .unwrap_or_else(|| UNKNOWN_USER.to_string());
                    let mut row = body_fields(r);
                    row.push(name);
                    row.push(r.date.format(DATE_FORMAT).to_string());
                    row
                });
                render_document(LEGACY_HEADER, rows, Quoting::Always)
            }
        }
    }
}

/// `Title,Rating,Content,RatingType,ProductBarcode`
fn body_fields(r: &Review) -> Vec<String> {
    vec![
        r.title.clone(),
        r.rating.to_string(),
        r.content.clone(),
        r.rating_type.to_string(),
        r.product_barcode.clone().unwrap_or_default(),
    ]
}

/// Build a review from the five body fields starting at `at` and the date at `date_at`.
fn review_from_row(row: &Row, id: RecordId, user_id: RecordId, at: usize, date_at: usize) -> Review {
    let rating = row
        .field(at + 1)
        .parse::<u8>()
        .ok()
        .filter(|r| (MIN_RATING..=MAX_RATING).contains(r))
        .unwrap_or_else(|| {
            debug!(line = row.line_no, value = row.field(at + 1), "rating unreadable, using default");
            DEFAULT_RATING
        });
    let rating_type = match row.field(at + 3) {
        "" => RatingType::default(),
        value => value.parse::<RatingType>().unwrap_or_else(|_| {
            warn!(line = row.line_no, value, "unknown rating type, using general");
            RatingType::default()
        }),
    };
    let barcode = row.field(at + 4);
    let date = NaiveDate::parse_from_str(row.field(date_at), DATE_FORMAT)
        .unwrap_or_else(|_| Utc::now().date_naive());
    Review {
        id,
        user_id,
        title: row.field(at).to_string(),
        rating,
        content: row.field(at + 2).to_string(),
        rating_type,
        product_barcode: (!barcode.is_empty()).then(|| barcode.to_string()),
        date,
    }
}

/// Settings for [`ReviewStore::new`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ReviewStoreOptions {
    pub layout: ReviewLayout,
    pub policy: ReadPolicy,
    /// Reject reviews for users that do not exist.
    pub require_existing_user: bool,
}

/// File-backed review store.
pub struct ReviewStore {
    records: RecordStore<ReviewCodec>,
    users: Arc<dyn UserDirectory>,
    require_existing_user: bool,
}

impl ReviewStore {
    pub fn new<P: Into<PathBuf>>(
        path: P,
        users: Arc<dyn UserDirectory>,
        opts: ReviewStoreOptions,
    ) -> Arc<Self> {
        let codec = ReviewCodec::new(opts.layout, Arc::clone(&users));
        let records = RecordStore::new(FlatFile::new(path, opts.policy), codec, "review");
        Arc::new(Self { records, users, require_existing_user: opts.require_existing_user })
    }

    pub fn records(&self) -> &RecordStore<ReviewCodec> {
        &self.records
    }

    pub async fn list(&self) -> Result<Vec<Review>, ServiceError> {
        self.records.list_all().await
    }

    pub async fn get(&self, id: RecordId) -> Result<Option<Review>, ServiceError> {
        self.records.find_by_id(id).await
    }

    pub async fn list_by_user(&self, user_id: RecordId) -> Result<Vec<Review>, ServiceError> {
        self.records.filter_by(|r| r.user_id == user_id).await
    }

    /// Validate and append a review. The id is the current epoch millisecond,
    /// moved past the largest id already in the file.
    pub async fn create(&self, input: NewReview) -> Result<Review, ServiceError> {
        let draft = input.validate()?;
        if self.require_existing_user && !self.users.contains(draft.user_id).await? {
            return Err(ServiceError::not_found("user"));
        }
        let created = self
            .records
            .mutate(|reviews| {
                let now = Utc::now();
                let mut id = now.timestamp_millis();
                if let Some(max) = reviews.iter().map(|r| r.id).max() {
                    let next = max
                        .checked_add(1)
                        .ok_or_else(|| ServiceError::Storage(format!("no review id left after {max}")))?;
                    id = id.max(next);
                }
                let review = draft.into_review(id, now.date_naive());
                reviews.push(review.clone());
                Ok(review)
            })
            .await?;
        info!(id = created.id, user_id = created.user_id, "review created");
        Ok(created)
    }

    /// Apply a partial update; the merged review is validated before anything is written.
    pub async fn update(&self, id: RecordId, patch: ReviewPatch) -> Result<Review, ServiceError> {
        patch.validate()?;
        self.records
            .update(id, |review| patch.apply(review).map_err(ServiceError::from))
            .await
    }

    pub async fn delete(&self, id: RecordId) -> Result<Review, ServiceError> {
        let removed = self.records.remove(id).await?;
        info!(id, "review deleted");
        Ok(removed)
    }

    pub async fn stats(&self) -> Result<ReviewStats, ServiceError> {
        Ok(ReviewStats::from_reviews(&self.list().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tmp() -> PathBuf {
        std::env::temp_dir().join(format!("reviews_{}.csv", uuid::Uuid::new_v4()))
    }

    fn jane() -> User {
        User::new("Jane", "jane@x.io")
    }

    fn directory(users: Vec<User>) -> Arc<dyn UserDirectory> {
        Arc::new(users)
    }

    fn review(id: RecordId, user_id: RecordId, title: &str) -> Review {
        Review {
            id,
            user_id,
            title: title.into(),
            rating: 4,
            content: "solid".into(),
            rating_type: RatingType::Product,
            product_barcode: Some("0123456789".into()),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    fn new_review(body: serde_json::Value) -> NewReview {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn legacy_decode_resolves_names_and_keeps_quoted_commas() -> anyhow::Result<()> {
        let codec = ReviewCodec::new(ReviewLayout::Legacy, directory(vec![jane()]));
        let text = format!("{LEGACY_HEADER}\n\"A, B\",\"3\",\"ok\",\"general\",\"\",\"Jane\",\"2024-01-01\"\n");
        let reviews = codec.decode(&text).await?;
        assert_eq!(reviews.len(), 1);
        let r = &reviews[0];
        assert_eq!(r.title, "A, B");
        assert_eq!(r.rating, 3);
        assert_eq!(r.user_id, jane().id);
        assert_eq!(r.product_barcode, None);
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        Ok(())
    }

    #[tokio::test]
    async fn legacy_decode_orphans_unknown_names() -> anyhow::Result<()> {
        let codec = ReviewCodec::new(ReviewLayout::Legacy, directory(vec![jane()]));
        let text = format!("{LEGACY_HEADER}\n\"Meh\",\"2\",\"\",\"service\",\"\",\"Nobody\",\"2024-02-02\"\n");
        let reviews = codec.decode(&text).await?;
        assert_eq!(reviews.len(), 1);
        assert_ne!(reviews[0].user_id, jane().id);
        // placeholder ids are epoch milliseconds, far above any derived user id
        assert!(reviews[0].user_id > i64::from(u32::MAX));
        assert_eq!(reviews[0].rating_type, RatingType::Service);
        Ok(())
    }

    #[tokio::test]
    async fn legacy_decode_falls_back_on_bad_fields() -> anyhow::Result<()> {
        let codec = ReviewCodec::new(ReviewLayout::Legacy, directory(vec![]));
        let text = format!("{LEGACY_HEADER}\n\"T\",\"nine\",\"\",\"weird\",\"\",\"X\",\"yesterday\"\n");
        let reviews = codec.decode(&text).await?;
        let r = &reviews[0];
        assert_eq!(r.rating, 3);
        assert_eq!(r.rating_type, RatingType::General);
        assert_eq!(r.date, Utc::now().date_naive());
        Ok(())
    }

    #[tokio::test]
    async fn legacy_encode_writes_names_or_placeholder() -> anyhow::Result<()> {
        let codec = ReviewCodec::new(ReviewLayout::Legacy, directory(vec![jane()]));
        let text = codec.encode(&[review(1, jane().id, "Good"), review(2, 77, "Lost")]).await?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], LEGACY_HEADER);
        assert_eq!(lines[1], r#""Good","4","solid","product","0123456789","Jane","2024-01-01""#);
        assert_eq!(lines[2], r#""Lost","4","solid","product","0123456789","Unknown User","2024-01-01""#);
        Ok(())
    }

    #[tokio::test]
    async fn keyed_layout_round_trips_without_user_lookup() -> anyhow::Result<()> {
        // an empty directory proves ids come from the file, not from names
        let codec = ReviewCodec::new(ReviewLayout::Keyed, directory(vec![]));
        let mut plain = review(2, 99, "Plain");
        plain.rating_type = RatingType::General;
        plain.product_barcode = None;
        plain.content = String::new();
        let records = vec![review(1, 42, "Fine, thanks"), plain];

        let text = codec.encode(&records).await?;
        assert!(text.starts_with(KEYED_HEADER));
        assert_eq!(codec.decode(&text).await?, records);
        Ok(())
    }

    #[tokio::test]
    async fn keyed_codec_still_reads_legacy_files() -> anyhow::Result<()> {
        let codec = ReviewCodec::new(ReviewLayout::Keyed, directory(vec![jane()]));
        let text = format!("{LEGACY_HEADER}\n\"Old\",\"5\",\"\",\"general\",\"\",\"Jane\",\"2023-05-05\"\n");
        let reviews = codec.decode(&text).await?;
        assert_eq!(reviews[0].user_id, jane().id);
        let rewritten = codec.encode(&reviews).await?;
        assert!(rewritten.starts_with(KEYED_HEADER));
        Ok(())
    }

    #[tokio::test]
    async fn review_store_crud_and_filters() -> anyhow::Result<()> {
        let path = tmp();
        let store = ReviewStore::new(&path, directory(vec![jane()]), ReviewStoreOptions::default());

        let a = store.create(new_review(json!({"userId": jane().id, "title": "A", "rating": 5}))).await?;
        let b = store
            .create(new_review(json!({
                "userId": 7, "title": "B", "rating": 2,
                "ratingType": "product", "productBarcode": "999"
            })))
            .await?;
        assert!(b.id > a.id);
        assert_eq!(store.get(a.id).await?, Some(a.clone()));
        assert_eq!(store.list_by_user(jane().id).await?, vec![a.clone()]);

        let patch: ReviewPatch = serde_json::from_value(json!({"content": " updated "}))?;
        let updated = store.update(a.id, patch).await?;
        assert_eq!(updated.content, "updated");
        assert_eq!(updated.title, "A");

        let removed = store.delete(b.id).await?;
        assert_eq!(removed, b);
        assert_eq!(store.list().await?, vec![updated]);
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn invalid_rating_update_leaves_file_byte_identical() -> anyhow::Result<()> {
        let path = tmp();
        let store = ReviewStore::new(&path, directory(vec![]), ReviewStoreOptions::default());
        let a = store.create(new_review(json!({"userId": 1, "title": "A", "rating": 4}))).await?;
        let before = tokio::fs::read(&path).await?;

        let patch: ReviewPatch = serde_json::from_value(json!({"rating": 6}))?;
        assert!(matches!(store.update(a.id, patch).await, Err(ServiceError::Model(_))));
        let patch: ReviewPatch = serde_json::from_value(json!({"ratingType": "product"}))?;
        assert!(matches!(store.update(a.id, patch).await, Err(ServiceError::Model(_))));

        assert_eq!(tokio::fs::read(&path).await?, before);
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn delete_unknown_review_is_not_found() -> anyhow::Result<()> {
        let path = tmp();
        let store = ReviewStore::new(&path, directory(vec![]), ReviewStoreOptions::default());
        store.create(new_review(json!({"userId": 1, "title": "A", "rating": 4}))).await?;
        let before = tokio::fs::read(&path).await?;
        assert!(matches!(store.delete(1).await, Err(ServiceError::NotFound(_))));
        assert_eq!(tokio::fs::read(&path).await?, before);
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn create_after_largest_possible_id_fails_without_writing() -> anyhow::Result<()> {
        let path = tmp();
        let text = format!("{KEYED_HEADER}\n\"{}\",\"1\",\"Top\",\"4\",\"\",\"general\",\"\",\"2024-01-01\"\n", i64::MAX);
        tokio::fs::write(&path, &text).await?;
        let store = ReviewStore::new(&path, directory(vec![]), ReviewStoreOptions::default());

        let res = store.create(new_review(json!({"userId": 1, "title": "A", "rating": 4}))).await;
        assert!(matches!(res, Err(ServiceError::Storage(_))));
        assert_eq!(tokio::fs::read_to_string(&path).await?, text);
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn existing_user_check_is_configurable() -> anyhow::Result<()> {
        let body = json!({"userId": 12345, "title": "Ghost", "rating": 3});

        let open = ReviewStore::new(tmp(), directory(vec![jane()]), ReviewStoreOptions::default());
        assert!(open.create(new_review(body.clone())).await.is_ok());

        let strict_opts = ReviewStoreOptions { require_existing_user: true, ..Default::default() };
        let strict = ReviewStore::new(tmp(), directory(vec![jane()]), strict_opts);
        assert!(matches!(strict.create(new_review(body)).await, Err(ServiceError::NotFound(_))));
        let ok = strict.create(new_review(json!({"userId": jane().id, "title": "Real", "rating": 3}))).await;
        assert!(ok.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn stats_reflect_stored_reviews() -> anyhow::Result<()> {
        let store = ReviewStore::new(tmp(), directory(vec![]), ReviewStoreOptions::default());
        let empty = store.stats().await?;
        assert_eq!(empty.total_reviews, 0);
        assert_eq!(empty.average_rating, 0.0);

        for rating in [5, 4, 4] {
            store.create(new_review(json!({"userId": 1, "title": "t", "rating": rating}))).await?;
        }
        let stats = store.stats().await?;
        assert_eq!(stats.total_reviews, 3);
        assert_eq!(stats.average_rating, 4.3);
        assert_eq!(stats.rating_distribution[&4], 2);
        assert_eq!(stats.rating_type_distribution.general, 3);
        Ok(())
    }
}

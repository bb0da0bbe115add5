use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Number;

use crate::errors::ModelError;
use crate::identity::RecordId;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// What a review is about.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingType {
    #[default]
    General,
    Product,
    Service,
}

impl RatingType {
    pub const ALL: [RatingType; 3] = [RatingType::General, RatingType::Product, RatingType::Service];

    pub fn as_str(&self) -> &'static str {
        match self {
            RatingType::General => "general",
            RatingType::Product => "product",
            RatingType::Service => "service",
        }
    }
}

impl fmt::Display for RatingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RatingType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RatingType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ModelError::invalid("Invalid rating type. Must be general, product, or service"))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: RecordId,
    pub user_id: RecordId,
    pub title: String,
    pub rating: u8,
    pub content: String,
    pub rating_type: RatingType,
    pub product_barcode: Option<String>,
    pub date: NaiveDate,
}

impl Review {
    /// Cross-field rule: product reviews carry a barcode.
    pub fn check_barcode(&self) -> Result<(), ModelError> {
        if self.rating_type == RatingType::Product && self.product_barcode.is_none() {
            return Err(ModelError::invalid("Product barcode is required for product reviews"));
        }
        Ok(())
    }
}

/// Integer in `1..=5`. JSON numbers such as `4.5` or `6` are rejected.
pub fn validate_rating(rating: &Number) -> Result<u8, ModelError> {
    rating
        .as_i64()
        .filter(|r| (i64::from(MIN_RATING)..=i64::from(MAX_RATING)).contains(r))
        .map(|r| r as u8)
        .ok_or_else(|| ModelError::invalid("Rating must be an integer between 1 and 5"))
}

fn parse_rating_type(value: &str) -> Result<RatingType, ModelError> {
    value.parse()
}

/// Empty barcodes are treated as absent.
fn normalize_barcode(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// A validated review that has not been assigned an id or date yet.
#[derive(Clone, Debug, PartialEq)]
pub struct ReviewDraft {
    pub user_id: RecordId,
    pub title: String,
    pub rating: u8,
    pub content: String,
    pub rating_type: RatingType,
    pub product_barcode: Option<String>,
}

impl ReviewDraft {
    pub fn into_review(self, id: RecordId, date: NaiveDate) -> Review {
        Review {
            id,
            user_id: self.user_id,
            title: self.title,
            rating: self.rating,
            content: self.content,
            rating_type: self.rating_type,
            product_barcode: self.product_barcode,
            date,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub user_id: Option<RecordId>,
    pub title: Option<String>,
    pub rating: Option<Number>,
    pub content: Option<String>,
    pub rating_type: Option<String>,
    pub product_barcode: Option<String>,
}

impl NewReview {
    pub fn validate(&self) -> Result<ReviewDraft, ModelError> {
        let title = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let (user_id, title, rating) = match (self.user_id, title, &self.rating) {
            (Some(user_id), Some(title), Some(rating)) if user_id != 0 => (user_id, title, rating),
            _ => return Err(ModelError::invalid("User ID, title, and rating are required")),
        };
        let rating = validate_rating(rating)?;
        let rating_type = match self.rating_type.as_deref() {
            None | Some("") => RatingType::default(),
            Some(value) => parse_rating_type(value)?,
        };
        let product_barcode = normalize_barcode(self.product_barcode.as_deref());
        if rating_type == RatingType::Product && product_barcode.is_none() {
            return Err(ModelError::invalid("Product barcode is required for product reviews"));
        }
        Ok(ReviewDraft {
            user_id,
            title: title.to_string(),
            rating,
            content: self.content.as_deref().map(str::trim).unwrap_or_default().to_string(),
            rating_type,
            product_barcode,
        })
    }
}

/// Partial update. `productBarcode: null` clears the barcode, omitting it keeps it.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPatch {
    pub title: Option<String>,
    pub rating: Option<Number>,
    pub content: Option<String>,
    pub rating_type: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub product_barcode: Option<Option<String>>,
}

fn present<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(de).map(Some)
}

impl ReviewPatch {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.rating.is_none()
            && self.content.is_none()
            && self.rating_type.is_none()
            && self.product_barcode.is_none()
    }

    /// Field-level checks that do not need the stored record.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.is_empty() {
            return Err(ModelError::invalid("At least one field is required"));
        }
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(ModelError::invalid("title must not be blank"));
            }
        }
        if let Some(rating) = &self.rating {
            validate_rating(rating)?;
        }
        if let Some(rating_type) = &self.rating_type {
            parse_rating_type(rating_type)?;
        }
        Ok(())
    }

    /// Validate and apply. On error `review` is left untouched.
    pub fn apply(&self, review: &mut Review) -> Result<(), ModelError> {
        self.validate()?;
        let mut next = review.clone();
        if let Some(title) = &self.title {
            next.title = title.trim().to_string();
        }
        if let Some(rating) = &self.rating {
            next.rating = validate_rating(rating)?;
        }
        if let Some(content) = &self.content {
            next.content = content.trim().to_string();
        }
        if let Some(rating_type) = &self.rating_type {
            next.rating_type = parse_rating_type(rating_type)?;
        }
        if let Some(barcode) = &self.product_barcode {
            next.product_barcode = normalize_barcode(barcode.as_deref());
        }
        next.check_barcode()?;
        *review = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Review {
        Review {
            id: 1,
            user_id: 42,
            title: "Great".into(),
            rating: 4,
            content: String::new(),
            rating_type: RatingType::General,
            product_barcode: None,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn rating_type_parses_lowercase_only() {
        assert_eq!("product".parse::<RatingType>().unwrap(), RatingType::Product);
        assert!("Product".parse::<RatingType>().is_err());
        assert!("other".parse::<RatingType>().is_err());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let v = serde_json::to_value(sample()).unwrap();
        assert_eq!(v["userId"], 42);
        assert_eq!(v["ratingType"], "general");
        assert_eq!(v["productBarcode"], serde_json::Value::Null);
        assert_eq!(v["date"], "2024-01-01");
    }

    #[test]
    fn new_review_defaults() {
        let input: NewReview = serde_json::from_value(json!({
            "userId": 42, "title": " Nice ", "rating": 5
        }))
        .unwrap();
        let draft = input.validate().unwrap();
        assert_eq!(draft.title, "Nice");
        assert_eq!(draft.content, "");
        assert_eq!(draft.rating_type, RatingType::General);
        assert_eq!(draft.product_barcode, None);
    }

    #[test]
    fn new_review_rejects_bad_input() {
        let cases = [
            json!({"title": "t", "rating": 3}),
            json!({"userId": 1, "rating": 3}),
            json!({"userId": 1, "title": "t"}),
            json!({"userId": 1, "title": "t", "rating": 0}),
            json!({"userId": 1, "title": "t", "rating": 6}),
            json!({"userId": 1, "title": "t", "rating": 4.5}),
            json!({"userId": 1, "title": "t", "rating": 3, "ratingType": "food"}),
            json!({"userId": 1, "title": "t", "rating": 3, "ratingType": "product"}),
            json!({"userId": 1, "title": "t", "rating": 3, "ratingType": "product", "productBarcode": ""}),
        ];
        for case in cases {
            let input: NewReview = serde_json::from_value(case.clone()).unwrap();
            assert!(input.validate().is_err(), "{case}");
        }
    }

    #[test]
    fn patch_rating_six_leaves_review_untouched() {
        let mut review = sample();
        let patch: ReviewPatch = serde_json::from_value(json!({"rating": 6, "title": "x"})).unwrap();
        assert!(patch.apply(&mut review).is_err());
        assert_eq!(review, sample());
    }

    #[test]
    fn patch_distinguishes_null_from_absent_barcode() {
        let mut review = sample();
        review.product_barcode = Some("123".into());

        let keep: ReviewPatch = serde_json::from_value(json!({"title": "New"})).unwrap();
        keep.apply(&mut review).unwrap();
        assert_eq!(review.product_barcode.as_deref(), Some("123"));

        let clear: ReviewPatch = serde_json::from_value(json!({"productBarcode": null})).unwrap();
        clear.apply(&mut review).unwrap();
        assert_eq!(review.product_barcode, None);
    }

    #[test]
    fn patch_to_product_needs_barcode() {
        let mut review = sample();
        let patch: ReviewPatch = serde_json::from_value(json!({"ratingType": "product"})).unwrap();
        assert!(patch.apply(&mut review).is_err());
        assert_eq!(review.rating_type, RatingType::General);

        let patch: ReviewPatch =
            serde_json::from_value(json!({"ratingType": "product", "productBarcode": "0123"})).unwrap();
        patch.apply(&mut review).unwrap();
        assert_eq!(review.rating_type, RatingType::Product);
    }

    #[test]
    fn empty_patch_is_rejected() {
        assert!(ReviewPatch::default().validate().is_err());
    }
}

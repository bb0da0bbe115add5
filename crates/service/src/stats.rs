//! Aggregates over the full review set.

use std::collections::BTreeMap;

use models::review::{RatingType, Review, MAX_RATING, MIN_RATING};
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RatingTypeCounts {
    pub general: usize,
    pub product: usize,
    pub service: usize,
}

impl RatingTypeCounts {
    fn bump(&mut self, rating_type: RatingType) {
        match rating_type {
            RatingType::General => self.general += 1,
            RatingType::Product => self.product += 1,
            RatingType::Service => self.service += 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_reviews: usize,
    /// Mean rating rounded to one decimal; `0.0` when there are no reviews.
    pub average_rating: f64,
    /// Always holds the keys `1..=5`.
    pub rating_distribution: BTreeMap<u8, usize>,
    pub rating_type_distribution: RatingTypeCounts,
}

impl ReviewStats {
    pub fn from_reviews(reviews: &[Review]) -> Self {
        let mut rating_distribution: BTreeMap<u8, usize> =
            (MIN_RATING..=MAX_RATING).map(|r| (r, 0)).collect();
        let mut rating_type_distribution = RatingTypeCounts::default();
        let mut total: u64 = 0;

        for review in reviews {
            *rating_distribution.entry(review.rating).or_default() += 1;
            rating_type_distribution.bump(review.rating_type);
            total += u64::from(review.rating);
        }

        let average_rating = if reviews.is_empty() {
            0.0
        } else {
            round_one_decimal(total as f64 / reviews.len() as f64)
        };

        Self {
            total_reviews: reviews.len(),
            average_rating,
            rating_distribution,
            rating_type_distribution,
        }
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

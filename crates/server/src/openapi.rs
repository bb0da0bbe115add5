use serde::Serialize;
use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(Serialize, ToSchema)]
pub struct UserDoc { pub id: i64, pub name: String, pub email: String }

#[derive(Serialize, ToSchema)]
pub struct UserListDoc { pub success: bool, pub count: usize, pub data: Vec<UserDoc> }

#[derive(ToSchema)]
pub struct NewUserDoc { pub name: String, pub email: String }

#[derive(ToSchema)]
pub struct UserPatchDoc { pub name: Option<String>, pub email: Option<String> }

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDoc {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    /// 1 to 5
    pub rating: u8,
    pub content: String,
    /// `general`, `product` or `service`
    pub rating_type: String,
    pub product_barcode: Option<String>,
    /// `YYYY-MM-DD`
    pub date: String,
}

#[derive(Serialize, ToSchema)]
pub struct ReviewListDoc { pub success: bool, pub count: usize, pub data: Vec<ReviewDoc> }

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewReviewDoc {
    pub user_id: i64,
    pub title: String,
    pub rating: u8,
    pub content: String,
    pub rating_type: Option<String>,
    /// Required when `ratingType` is `product`.
    pub product_barcode: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPatchDoc {
    pub title: Option<String>,
    pub rating: Option<u8>,
    pub content: Option<String>,
    pub rating_type: Option<String>,
    pub product_barcode: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct RatingTypeCountsDoc { pub general: usize, pub product: usize, pub service: usize }

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStatsDoc {
    pub total_reviews: usize,
    pub average_rating: f64,
    /// Keys `"1"` to `"5"`.
    pub rating_distribution: std::collections::BTreeMap<String, usize>,
    pub rating_type_distribution: RatingTypeCountsDoc,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::users::list,
        crate::routes::users::get,
        crate::routes::users::create,
        crate::routes::users::update,
        crate::routes::users::delete,
        crate::routes::reviews::list,
        crate::routes::reviews::get,
        crate::routes::reviews::list_by_user,
        crate::routes::reviews::stats,
        crate::routes::reviews::create,
        crate::routes::reviews::update,
        crate::routes::reviews::delete,
    ),
    components(
        schemas(
            HealthResponse,
            UserDoc,
            UserListDoc,
            NewUserDoc,
            UserPatchDoc,
            ReviewDoc,
            ReviewListDoc,
            NewReviewDoc,
            ReviewPatchDoc,
            RatingTypeCountsDoc,
            ReviewStatsDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "users"),
        (name = "reviews")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for p in [
            "/health",
            "/api/users",
            "/api/users/{id}",
            "/api/reviews",
            "/api/reviews/{id}",
            "/api/reviews/user/{user_id}",
            "/api/reviews/stats/overview",
        ] {
            assert!(paths.contains(&p), "missing {p}");
        }
    }
}

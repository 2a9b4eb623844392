use serde::Serialize;
use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// `user` or `publisher`
    pub role: Option<String>,
}

#[derive(ToSchema)]
pub struct LoginRequest { pub email: String, pub password: String }

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListingRequest {
    pub name: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: String,
    pub careers: Vec<String>,
    pub housing: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfferingRequest {
    pub title: String,
    pub description: String,
    pub weeks: String,
    pub cost: f64,
    /// `beginner`, `intermediate` or `advanced`
    pub minimum_skill: String,
    pub scholarships_available: Option<bool>,
}

#[derive(ToSchema)]
pub struct ReviewRequest { pub title: String, pub text: String, pub rating: f64 }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::listings::list,
        crate::routes::listings::create,
        crate::routes::offerings::create,
        crate::routes::reviews::create,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            ListingRequest,
            OfferingRequest,
            ReviewRequest,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "listings"),
        (name = "offerings"),
        (name = "reviews")
    )
)]
pub struct ApiDoc;

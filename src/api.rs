use actix_web::{web, HttpResponse, Scope};
use chrono::Utc;
use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{self, AuthContext};
use crate::db::Database;
use crate::error::ApiError;
use crate::models::location::Location;

#[derive(Deserialize)]
pub struct LocationRequest {
    pub name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub author: Option<String>, // only honored on update; create stamps the caller
    pub rating: Option<i64>,
    pub review_text: Option<String>,
}

// Route table, shared by the server binary and the test harness
pub fn routes() -> Scope {
    web::scope("/api")
        .route("/register", web::post().to(auth::register))
        .route("/login", web::post().to(auth::login))
        .route("/locations", web::post().to(create_location))
        .route("/locations", web::get().to(list_locations))
        .route("/locations/{locationid}", web::get().to(read_location))
        .route("/locations/{locationid}/reviews", web::post().to(create_review))
        .route(
            "/locations/{locationid}/reviews/{reviewid}",
            web::get().to(read_review),
        )
        .route(
            "/locations/{locationid}/reviews/{reviewid}",
            web::put().to(update_review),
        )
        .route(
            "/locations/{locationid}/reviews/{reviewid}",
            web::delete().to(delete_review),
        )
}

pub async fn create_location(
    db: web::Data<Database>,
    body: web::Json<LocationRequest>,
) -> Result<HttpResponse, ApiError> {
    let name = body
        .into_inner()
        .name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::Validation("All fields required".into()))?;

    let location = Location {
        id: Uuid::new_v4().to_string(),
        name,
        rating: 0,
    };
    db.create_location(&location).await?;
    Ok(HttpResponse::Created().json(location))
}

pub async fn list_locations(db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    let locations = db.list_locations().await?;
    info!("Returning {} locations", locations.len());
    Ok(HttpResponse::Ok().json(locations))
}

pub async fn read_location(
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let location_id = path.into_inner();
    let location = db
        .get_location(&location_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Location not found".into()))?;
    let reviews = db.get_reviews(&location_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "id": location.id,
        "name": location.name,
        "rating": location.rating,
        "reviews": reviews,
    })))
}

pub async fn create_review(
    db: web::Data<Database>,
    ctx: AuthContext,
    path: web::Path<String>,
    body: web::Json<ReviewRequest>,
) -> Result<HttpResponse, ApiError> {
    let location_id = path.into_inner();
    let author = resolve_author(&db, &ctx).await?;

    db.get_location(&location_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Location not found".into()))?;

    let body = body.into_inner();
    let review_id = Uuid::new_v4().to_string();
    db.insert_review(
        &location_id,
        &review_id,
        Some(&author),
        body.rating,
        body.review_text.as_deref(),
        Utc::now(),
    )
    .await?;

    update_average_rating(&db, &location_id).await;

    let review = db
        .get_review(&location_id, &review_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Review not found".into()))?;
    Ok(HttpResponse::Created().json(review))
}

pub async fn read_review(
    db: web::Data<Database>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (location_id, review_id) = path.into_inner();

    let location = db
        .get_location(&location_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("location not found".into()))?;

    let reviews = db.get_reviews(&location_id).await?;
    if reviews.is_empty() {
        return Err(ApiError::NotFound("No reviews found".into()));
    }

    let review = reviews
        .into_iter()
        .find(|review| review.id == review_id)
        .ok_or_else(|| ApiError::NotFound("review not found".into()))?;

    Ok(HttpResponse::Ok().json(json!({
        "location": {
            "name": location.name,
            "id": location_id,
        },
        "review": review,
    })))
}

pub async fn update_review(
    db: web::Data<Database>,
    ctx: AuthContext,
    path: web::Path<(String, String)>,
    body: web::Json<ReviewRequest>,
) -> Result<HttpResponse, ApiError> {
    let (location_id, review_id) = path.into_inner();
    resolve_author(&db, &ctx).await?;

    db.get_location(&location_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Location not found".into()))?;

    let reviews = db.get_reviews(&location_id).await?;
    if reviews.is_empty() {
        return Err(ApiError::NotFound("No review to update".into()));
    }
    if !reviews.iter().any(|review| review.id == review_id) {
        return Err(ApiError::NotFound("Review not found".into()));
    }

    let body = body.into_inner();
    db.update_review(
        &location_id,
        &review_id,
        body.author.as_deref(),
        body.rating,
        body.review_text.as_deref(),
    )
    .await?;

    update_average_rating(&db, &location_id).await;

    let review = db
        .get_review(&location_id, &review_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Review not found".into()))?;
    Ok(HttpResponse::Ok().json(review))
}

pub async fn delete_review(
    db: web::Data<Database>,
    ctx: AuthContext,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (location_id, review_id) = path.into_inner();
    resolve_author(&db, &ctx).await?;

    db.get_location(&location_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Location not found".into()))?;

    let reviews = db.get_reviews(&location_id).await?;
    if reviews.is_empty() {
        return Err(ApiError::NotFound("No Review to delete".into()));
    }
    if !reviews.iter().any(|review| review.id == review_id) {
        return Err(ApiError::NotFound("Review not found".into()));
    }

    db.delete_review(&location_id, &review_id).await?;

    update_average_rating(&db, &location_id).await;

    Ok(HttpResponse::NoContent().finish())
}

// Look up the caller's display name from the session email
async fn resolve_author(db: &Database, ctx: &AuthContext) -> Result<String, ApiError> {
    match db.find_user_by_email(&ctx.email).await? {
        Some(user) => Ok(user.name),
        None => Err(ApiError::NotFound("User not found".into())),
    }
}

// A failed recompute never fails the request that triggered it
async fn update_average_rating(db: &Database, location_id: &str) {
    if let Err(e) = db.recompute_rating(location_id).await {
        error!("Failed to update average rating: {}", e);
    }
}

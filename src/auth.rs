use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest, HttpResponse};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::Database;
use crate::error::ApiError;
use crate::models::user::User;

const HASH_ROUNDS: u32 = 100_000;
const TOKEN_LIFETIME_DAYS: i64 = 7;

// Token payload. The email claim drives author lookup on review mutations.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub exp: usize,
}

// Signs and verifies session tokens with a shared secret
#[derive(Clone)]
pub struct JwtHandler {
    secret: String,
}

impl JwtHandler {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    pub fn issue(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            exp: (Utc::now() + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))
    }
}

// Authenticated caller identity, extracted from the bearer token
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub email: String,
    pub name: String,
}

impl FromRequest for AuthContext {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(auth_context(req))
    }
}

fn auth_context(req: &HttpRequest) -> Result<AuthContext, ApiError> {
    let jwt = req
        .app_data::<web::Data<JwtHandler>>()
        .ok_or_else(|| ApiError::Unauthorized("Authorization is not configured".into()))?;

    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Authorization header required".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Bearer token required".into()))?;

    let claims = jwt.verify(token)?;
    Ok(AuthContext {
        user_id: claims.sub,
        email: claims.email,
        name: claims.name,
    })
}

pub fn new_salt() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn hash_password(password: &str, salt: &str) -> String {
    let mut digest = Sha256::digest(format!("{salt}{password}").as_bytes());
    for _ in 1..HASH_ROUNDS {
        digest = Sha256::digest(digest.as_slice());
    }
    STANDARD.encode(digest.as_slice())
}

pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    hash_password(password, salt) == expected_hash
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

pub async fn register(
    db: web::Data<Database>,
    jwt: web::Data<JwtHandler>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let (name, email, password) = match (
        non_empty(body.name),
        non_empty(body.email),
        non_empty(body.password),
    ) {
        (Some(name), Some(email), Some(password)) => (name, email, password),
        _ => return Err(ApiError::Validation("All fields required".into())),
    };

    if db.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::DuplicateUser);
    }

    let salt = new_salt();
    let user = User {
        id: Uuid::new_v4().to_string(),
        name,
        email,
        password_hash: hash_password(&password, &salt),
        password_salt: salt,
    };

    if let Err(e) = db.create_user(&user).await {
        error!("Error saving user: {}", e);
        return Err(ApiError::NotFound(format!("Database error: {}", e)));
    }

    let token = jwt.issue(&user)?;
    Ok(HttpResponse::Ok().json(json!({ "token": token })))
}

pub async fn login(
    db: web::Data<Database>,
    jwt: web::Data<JwtHandler>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let (email, password) = match (non_empty(body.email), non_empty(body.password)) {
        (Some(email), Some(password)) => (email, password),
        _ => return Err(ApiError::Validation("All fields required".into())),
    };

    let user = db
        .find_user_by_email(&email)
        .await
        .map_err(|e| ApiError::NotFound(format!("Database error: {}", e)))?;

    let user = match user {
        Some(user) if verify_password(&password, &user.password_salt, &user.password_hash) => user,
        _ => return Err(ApiError::Unauthorized("Incorrect email or password.".into())),
    };

    let token = jwt.issue(&user)?;
    Ok(HttpResponse::Ok().json(json!({ "token": token })))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: "u-1".into(),
            name: "Simon Holmes".into(),
            email: "simon@example.com".into(),
            password_hash: String::new(),
            password_salt: String::new(),
        }
    }

    #[test]
    fn hash_is_deterministic_per_salt() {
        let salt = new_salt();
        let first = hash_password("s3cret", &salt);
        let second = hash_password("s3cret", &salt);
        assert_eq!(first, second);

        let other_salt = new_salt();
        assert_ne!(first, hash_password("s3cret", &other_salt));
    }

    #[test]
    fn verify_password_detects_mismatch() {
        let salt = new_salt();
        let hash = hash_password("s3cret", &salt);
        assert!(verify_password("s3cret", &salt, &hash));
        assert!(!verify_password("wrong", &salt, &hash));
    }

    #[test]
    fn token_roundtrip_preserves_claims() {
        let jwt = JwtHandler::new("test-secret".into());
        let token = jwt.issue(&test_user()).unwrap();

        let claims = jwt.verify(&token).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.email, "simon@example.com");
        assert_eq!(claims.name, "Simon Holmes");
    }

    #[test]
    fn tampered_token_rejected() {
        let jwt = JwtHandler::new("test-secret".into());
        let mut token = jwt.issue(&test_user()).unwrap();
        token.push('x');
        assert!(jwt.verify(&token).is_err());
    }

    #[test]
    fn wrong_secret_rejected() {
        let jwt = JwtHandler::new("test-secret".into());
        let token = jwt.issue(&test_user()).unwrap();

        let other = JwtHandler::new("other-secret".into());
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let jwt = JwtHandler::new("test-secret".into());
        let claims = Claims {
            sub: "u-1".into(),
            email: "simon@example.com".into(),
            name: "Simon Holmes".into(),
            exp: (Utc::now() - Duration::hours(2)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("test-secret".as_bytes()),
        )
        .unwrap();

        assert!(jwt.verify(&token).is_err());
    }
}

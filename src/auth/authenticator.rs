use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};

use crate::api::model::app_state::AppState;
use crate::auth::auth_bearer::AuthBearer;
use crate::model::{Role, User, WebAuthConfig};
use crate::streamhub_error::{StreamHubError, StreamHubErrorKind};
use crate::utils::{MSG_FORBIDDEN, MSG_UNAUTHORIZED};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: Role,
    iss: String,
    iat: i64,
    exp: i64,
}

pub fn create_jwt(web_auth_config: &WebAuthConfig, user: &User, now: DateTime<Utc>) -> Result<String, StreamHubError> {
    let mut header = Header::new(Algorithm::HS256);
    header.typ = Some("JWT".to_string());
    let claims = Claims {
        sub: user.id.clone(),
        username: user.username.clone(),
        role: user.role,
        iss: web_auth_config.issuer.clone(),
        iat: now.timestamp(),
        exp: (now + Duration::minutes(i64::from(web_auth_config.token_ttl_mins))).timestamp(),
    };
    encode(&header, &claims, &EncodingKey::from_secret(web_auth_config.secret.as_bytes()))
        .map_err(|err| StreamHubError::new(StreamHubErrorKind::Info, format!("Failed to create token: {err}")))
}

pub fn verify_token(token: &str, web_auth_config: &WebAuthConfig) -> Option<TokenData<Claims>> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[web_auth_config.issuer.as_str()]);
    decode::<Claims>(token, &DecodingKey::from_secret(web_auth_config.secret.as_bytes()), &validation).ok()
}

async fn authenticate(parts: &mut Parts, app_state: &Arc<AppState>) -> Result<User, StreamHubError> {
    let AuthBearer(token) = AuthBearer::from_request_parts(parts, app_state).await?;
    let token_data = verify_token(&token, &app_state.config.web_auth)
        .ok_or_else(|| StreamHubError::unauthorized(MSG_UNAUTHORIZED))?;
    let user_id = token_data.claims.sub;
    app_state.repos.users.find(|u| u.id == user_id).await
        .ok_or_else(|| StreamHubError::unauthorized(MSG_UNAUTHORIZED))
}

/// The user behind a valid bearer token, loaded fresh from the user store.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = StreamHubError;

    async fn from_request_parts(parts: &mut Parts, app_state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }
        authenticate(parts, app_state).await.map(AuthUser)
    }
}

/// Like [`AuthUser`] but tolerates anonymous requests.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<User>);

impl FromRequestParts<Arc<AppState>> for MaybeAuthUser {
    type Rejection = StreamHubError;

    async fn from_request_parts(parts: &mut Parts, app_state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        if parts.headers.contains_key(axum::http::header::AUTHORIZATION) {
            AuthUser::from_request_parts(parts, app_state).await.map(|AuthUser(user)| Self(Some(user)))
        } else {
            Ok(Self(None))
        }
    }
}

pub async fn validator_admin(
    axum::extract::State(app_state): axum::extract::State<Arc<AppState>>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<axum::response::Response, StreamHubError> {
    let (mut parts, body) = request.into_parts();
    let user = authenticate(&mut parts, &app_state).await?;
    if !user.is_admin() {
        return Err(StreamHubError::forbidden(MSG_FORBIDDEN));
    }
    parts.extensions.insert(AuthUser(user));
    Ok(next.run(axum::extract::Request::from_parts(parts, body)).await)
}

#[cfg(test)]
mod tests {
    use super::{create_jwt, verify_token};
    use crate::model::user::tests::test_user;
    use crate::model::{Role, WebAuthConfig};
    use chrono::{Duration, Utc};

    fn web_auth() -> WebAuthConfig {
        WebAuthConfig {
            issuer: "streamhub".to_string(),
            secret: "0123456789abcdef0123".to_string(),
            token_ttl_mins: 30,
            admin_users: vec![],
        }
    }

    #[test]
    fn test_create_verify() {
        let now = Utc::now();
        let user = test_user("anna", now);
        let token = create_jwt(&web_auth(), &user, now).unwrap();
        let data = verify_token(&token, &web_auth()).unwrap();
        assert_eq!(data.claims.sub, "anna");
        assert_eq!(data.claims.role, Role::User);
    }

    #[test]
    fn test_reject_foreign_and_expired() {
        let now = Utc::now();
        let user = test_user("anna", now);
        let mut other = web_auth();
        other.issuer = "other".to_string();
        let token = create_jwt(&other, &user, now).unwrap();
        assert!(verify_token(&token, &web_auth()).is_none());
        let expired = create_jwt(&web_auth(), &user, now - Duration::hours(2)).unwrap();
        assert!(verify_token(&expired, &web_auth()).is_none());
        let mut wrong_secret = web_auth();
        wrong_secret.secret = "fedcba9876543210fedc".to_string();
        let token = create_jwt(&wrong_secret, &user, now).unwrap();
        assert!(verify_token(&token, &web_auth()).is_none());
    }
}

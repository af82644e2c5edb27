use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tower_cookies::{
    Cookie, Cookies,
    cookie::{SameSite, time::Duration},
};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dto::auth::Claims,
    error::{AppError, AppResult},
    models::Role,
    state::AppState,
};

pub const SESSION_COOKIE: &str = "session";

/// HttpOnly cookie carrying a freshly issued token.
pub fn session_cookie(config: &AppConfig, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(Duration::hours(config.session_ttl_hours))
        .build()
}

/// Matches the path of [`session_cookie`] so the browser drops it.
pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

/// Authenticated caller whose role is `ADMIN`. Declaring it in a handler is the
/// whole authorization check for that route.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

pub fn ensure_role(user: &AuthUser, role: Role) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, Role::Admin)
}

pub fn decode_session(token: &str, secret: &str) -> AppResult<AuthUser> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    let user_id = Uuid::parse_str(&decoded.claims.sub).map_err(|_| AppError::Unauthorized)?;
    let role = decoded
        .claims
        .role
        .parse::<Role>()
        .map_err(|_| AppError::Unauthorized)?;

    Ok(AuthUser { user_id, role })
}

// The session cookie wins over an Authorization header.
fn session_token(parts: &Parts) -> AppResult<Option<String>> {
    if let Some(cookie) = parts
        .extensions
        .get::<Cookies>()
        .and_then(|cookies| cookies.get(SESSION_COOKIE))
    {
        return Ok(Some(cookie.value().to_string()));
    }

    let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let auth_str = auth_header.to_str().map_err(|_| AppError::Unauthorized)?;
    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;
    Ok(Some(token.trim().to_string()))
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let token = session_token(parts)?.ok_or(AppError::Unauthorized)?;
        decode_session(&token, &state.config.jwt_secret)
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        ensure_admin(&user)?;
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with_header(value: &str) -> Parts {
        let (parts, _) = Request::builder()
            .header(header::AUTHORIZATION, value)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn bearer_header_is_read_when_no_cookie() {
        let parts = parts_with_header("Bearer abc.def");
        assert_eq!(session_token(&parts).unwrap().as_deref(), Some("abc.def"));
    }

    #[test]
    fn other_schemes_are_unauthorized() {
        let parts = parts_with_header("Basic Zm9vOmJhcg==");
        assert!(matches!(session_token(&parts), Err(AppError::Unauthorized)));
    }

    #[test]
    fn garbage_token_is_unauthorized() {
        assert!(matches!(
            decode_session("not-a-token", "secret"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn role_guard() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::User,
        };
        assert!(matches!(ensure_admin(&user), Err(AppError::Forbidden)));
        let admin = AuthUser {
            role: Role::Admin,
            ..user
        };
        assert!(ensure_admin(&admin).is_ok());
    }
}

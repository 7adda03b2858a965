use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use base64::prelude::*;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ApiError;

/// The single admin credential pair every protected route is checked against.
pub struct AdminCredentials {
    username: String,
    password: String,
}

impl AdminCredentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_owned(),
            password: password.to_owned(),
        }
    }

    /// Compare both fields in constant time. Both comparisons always run, so a wrong
    /// username takes as long to reject as a wrong password.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let username_matches = self.username.as_bytes().ct_eq(username.as_bytes());
        let password_matches = self.password.as_bytes().ct_eq(password.as_bytes());

        (username_matches & password_matches).into()
    }
}

/// Split an `Authorization: Basic <base64(username:password)>` header value.
/// The password may contain colons; the username may not.
pub fn parse_basic_auth(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = BASE64_STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some((username.to_owned(), password.to_owned()))
}

/// Extractor guarding a route with the admin credentials. Being a `FromRequestParts`
/// extractor it runs before the body is read, so bad credentials win over a bad payload.
pub struct AdminAuth;

#[async_trait]
impl<S> FromRequestParts<S> for AdminAuth
where
    Arc<AdminCredentials>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let credentials = Arc::<AdminCredentials>::from_ref(state);

        let Some((username, password)) = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_basic_auth)
        else {
            warn!(path = %parts.uri.path(), "request without basic credentials");
            return Err(ApiError::Unauthorized);
        };

        if !credentials.verify(&username, &password) {
            warn!(path = %parts.uri.path(), "rejected invalid admin credentials");
            return Err(ApiError::Unauthorized);
        }

        Ok(AdminAuth)
    }
}

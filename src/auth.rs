use std::sync::Arc;

use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;

use crate::error::ApiError;
use crate::identity::Identity;
use crate::session::{AuthSession, SessionStore};

/// The session and signed-in identity behind a bearer token.
pub struct Authenticated {
    pub token: String,
    pub session: Arc<AuthSession>,
    pub identity: Identity,
}

pub async fn authenticate(
    sessions: &SessionStore,
    auth: Option<Authorization<Bearer>>,
) -> Result<Authenticated, ApiError> {
    let unauthorized = || ApiError::Unauthorized("Invalid authentication token".into());
    let token = auth.map(|a| a.token().to_string()).ok_or_else(unauthorized)?;
    let session = sessions.get(&token).await.ok_or_else(unauthorized)?;
    let identity = session.refresh().ok_or_else(unauthorized)?;
    Ok(Authenticated {
        token,
        session,
        identity,
    })
}

/// Like [`authenticate`], but also requires a verified email address.
pub async fn authenticate_verified(
    sessions: &SessionStore,
    auth: Option<Authorization<Bearer>>,
) -> Result<Authenticated, ApiError> {
    let authenticated = authenticate(sessions, auth).await?;
    if !authenticated.identity.email_verified {
        return Err(ApiError::Forbidden(
            "Please verify your email before publishing classes.".into(),
        ));
    }
    Ok(authenticated)
}

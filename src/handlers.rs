use axum::extract::{Path, Query, State};
use axum::{Json, http::StatusCode, response::IntoResponse};
use axum_extra::extract::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    AppState,
    auth::{authenticate, authenticate_verified},
    error::ApiError,
    identity::{AuthError, Identity},
    models::{ClassForm, ClassListing, ClassType},
    search::{SearchFilters, VocabularyField, suggest_for_field},
};

type BearerHeader = Option<TypedHeader<Authorization<Bearer>>>;

fn bearer(auth: BearerHeader) -> Option<Authorization<Bearer>> {
    auth.map(|TypedHeader(a)| a)
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub class_type: Option<String>,
}

impl SearchParams {
    fn filters(&self) -> Result<SearchFilters, ApiError> {
        let class_type = match self.class_type.as_deref() {
            None | Some("") => None,
            Some(value) => Some(
                value
                    .parse::<ClassType>()
                    .map_err(|err| ApiError::BadRequest(err.to_string()))?,
            ),
        };
        Ok(SearchFilters {
            subject: self.subject.clone(),
            grade: self.grade.clone(),
            location: self.location.clone(),
            class_type,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmVerificationRequest {
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    pub identity: Identity,
    /// Set when the session is open but the account still needs attention,
    /// e.g. an unverified email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[utoipa::path(get, path = "/", tag = "marketplace")]
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Tutor Marketplace API",
        "endpoints": {
            "/classes": "Search class listings (q, subject, grade, location, type)",
            "/suggestions": "Autocomplete for the search box",
            "/vocabulary": "Subjects, grades and locations",
            "/auth/login": "Sign in and receive a bearer token"
        }
    }))
}

#[utoipa::path(get, path = "/healthz/live", tag = "marketplace")]
pub async fn healthz_live() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(get, path = "/healthz/ready", tag = "marketplace")]
pub async fn healthz_ready() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(
    get,
    path = "/classes",
    params(
        ("q" = Option<String>, Query, description = "Free text matched against subject, grade, teacher name and description"),
        ("subject" = Option<String>, Query, description = "Exact subject"),
        ("grade" = Option<String>, Query, description = "Exact grade"),
        ("location" = Option<String>, Query, description = "Exact location of any time slot"),
        ("type" = Option<String>, Query, description = "individual, group or mass")
    ),
    responses(
        (status = 200, description = "Matching classes in catalog order", body = [ClassListing]),
        (status = 400, description = "Unknown class type")
    ),
    tag = "classes"
)]
pub async fn search_classes(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ClassListing>>, ApiError> {
    let filters = params.filters()?;
    let catalog = state.catalog.read().await;
    let results = catalog
        .search(&params.q, &filters)
        .into_iter()
        .cloned()
        .map(ClassListing::from)
        .collect();
    Ok(Json(results))
}

#[utoipa::path(
    get,
    path = "/classes/{id}",
    params(("id" = String, Path, description = "Class id")),
    responses(
        (status = 200, description = "The class", body = ClassListing),
        (status = 404, description = "No such class")
    ),
    tag = "classes"
)]
pub async fn get_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClassListing>, ApiError> {
    let catalog = state.catalog.read().await;
    catalog
        .get(&id)
        .cloned()
        .map(|record| Json(record.into()))
        .ok_or_else(|| ApiError::NotFound(format!("class {id} not found")))
}

#[utoipa::path(
    post,
    path = "/classes",
    request_body = ClassForm,
    responses(
        (status = 201, description = "Class published", body = ClassListing),
        (status = 400, description = "Invalid class form"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Email not verified")
    ),
    security(("bearer_auth" = [])),
    tag = "classes"
)]
pub async fn create_class(
    State(state): State<AppState>,
    auth: BearerHeader,
    Json(form): Json<ClassForm>,
) -> Result<impl IntoResponse, ApiError> {
    let user = authenticate_verified(&state.sessions, bearer(auth)).await?;
    let mut catalog = state.catalog.write().await;
    let record = catalog.create(form, &user.identity)?.clone();
    Ok((StatusCode::CREATED, Json(ClassListing::from(record))))
}

#[utoipa::path(
    put,
    path = "/classes/{id}",
    params(("id" = String, Path, description = "Class id")),
    request_body = ClassForm,
    responses(
        (status = 200, description = "Class updated", body = ClassListing),
        (status = 400, description = "Invalid class form"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Not the owner of this class"),
        (status = 404, description = "No such class")
    ),
    security(("bearer_auth" = [])),
    tag = "classes"
)]
pub async fn update_class(
    State(state): State<AppState>,
    auth: BearerHeader,
    Path(id): Path<String>,
    Json(form): Json<ClassForm>,
) -> Result<Json<ClassListing>, ApiError> {
    let user = authenticate(&state.sessions, bearer(auth)).await?;
    let mut catalog = state.catalog.write().await;
    let record = catalog.edit(&id, form, &user.identity.email)?.clone();
    Ok(Json(record.into()))
}

#[utoipa::path(
    delete,
    path = "/classes/{id}",
    params(("id" = String, Path, description = "Class id")),
    responses(
        (status = 204, description = "Class deleted"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Not the owner of this class"),
        (status = 404, description = "No such class")
    ),
    security(("bearer_auth" = [])),
    tag = "classes"
)]
pub async fn delete_class(
    State(state): State<AppState>,
    auth: BearerHeader,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user = authenticate(&state.sessions, bearer(auth)).await?;
    state
        .catalog
        .write()
        .await
        .delete(&id, &user.identity.email)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/teachers/{teacher_id}/classes",
    params(("teacher_id" = String, Path, description = "Teacher uid")),
    responses((status = 200, description = "The teacher's classes", body = [ClassListing])),
    tag = "classes"
)]
pub async fn teacher_classes(
    State(state): State<AppState>,
    Path(teacher_id): Path<String>,
) -> Json<Vec<ClassListing>> {
    let catalog = state.catalog.read().await;
    Json(
        catalog
            .by_teacher(&teacher_id)
            .into_iter()
            .cloned()
            .map(ClassListing::from)
            .collect(),
    )
}

#[utoipa::path(
    get,
    path = "/suggestions",
    params(("q" = Option<String>, Query, description = "What has been typed so far")),
    responses((status = 200, description = "Up to 8 suggestions", body = [String])),
    tag = "search"
)]
pub async fn suggestions(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
) -> Json<Vec<String>> {
    Json(state.catalog.read().await.suggest(&params.q))
}

#[utoipa::path(
    get,
    path = "/suggestions/{field}",
    params(
        ("field" = VocabularyField, Path, description = "subject, grade or location"),
        ("q" = Option<String>, Query, description = "Current filter text")
    ),
    responses((status = 200, description = "Matching vocabulary entries", body = [String])),
    tag = "search"
)]
pub async fn field_suggestions(
    State(state): State<AppState>,
    Path(field): Path<VocabularyField>,
    Query(params): Query<SuggestParams>,
) -> Json<Vec<String>> {
    let catalog = state.catalog.read().await;
    Json(
        suggest_for_field(catalog.vocabulary(), field, &params.q)
            .into_iter()
            .map(str::to_string)
            .collect(),
    )
}

#[utoipa::path(
    get,
    path = "/vocabulary",
    responses((status = 200, description = "Reference lists", body = crate::catalog::Vocabulary)),
    tag = "search"
)]
pub async fn vocabulary(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.catalog.read().await.vocabulary().clone())
}

#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created, verification mail sent", body = SessionResponse),
        (status = 400, description = "Invalid email or weak password"),
        (status = 409, description = "Email already registered")
    ),
    tag = "auth"
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.sessions.session();
    let identity = session.signup(
        &request.email,
        &request.password,
        request.display_name.as_deref(),
    )?;
    let token = state.sessions.open(session).await;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token,
            identity,
            message: None,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 401, description = "Invalid email or password"),
        (status = 403, description = "Email not verified; the session stays open so verification can be resent", body = SessionResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let session = state.sessions.session();
    let (status, identity, message) =
        match session.login_with_password(&request.email, &request.password) {
            Ok(identity) => (StatusCode::OK, identity, None),
            Err(err @ AuthError::EmailNotVerified) => {
                let identity = session.current_identity().ok_or(AuthError::NotSignedIn)?;
                (StatusCode::FORBIDDEN, identity, Some(err.to_string()))
            }
            Err(err) => return Err(err.into()),
        };
    let token = state.sessions.open(session).await;
    Ok((
        status,
        Json(SessionResponse {
            token,
            identity,
            message,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Signed out"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    auth: BearerHeader,
) -> Result<StatusCode, ApiError> {
    let user = authenticate(&state.sessions, bearer(auth)).await?;
    state.sessions.close(&user.token).await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "The signed-in identity", body = Identity),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    auth: BearerHeader,
) -> Result<Json<Identity>, ApiError> {
    let user = authenticate(&state.sessions, bearer(auth)).await?;
    Ok(Json(user.identity))
}

#[utoipa::path(
    post,
    path = "/auth/verification",
    responses(
        (status = 202, description = "Verification mail sent unless already verified"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn resend_verification(
    State(state): State<AppState>,
    auth: BearerHeader,
) -> Result<StatusCode, ApiError> {
    let user = authenticate(&state.sessions, bearer(auth)).await?;
    user.session.send_verification_email()?;
    Ok(StatusCode::ACCEPTED)
}

#[utoipa::path(
    post,
    path = "/auth/verification/confirm",
    request_body = ConfirmVerificationRequest,
    responses(
        (status = 200, description = "Email verified", body = Identity),
        (status = 400, description = "Unknown or used code")
    ),
    tag = "auth"
)]
pub async fn confirm_verification(
    State(state): State<AppState>,
    Json(request): Json<ConfirmVerificationRequest>,
) -> Result<Json<Identity>, ApiError> {
    let identity = state
        .sessions
        .provider()
        .confirm_verification(request.code.trim())?;
    Ok(Json(identity))
}

//! HTTP routes and handlers.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use portal_core::model::{
    DifficultyId, DifficultyLevel, Domain, DomainId, EnrollmentNo, Niche, NicheId,
    QuestionFormat, QuestionHierarchy, SessionId, SessionStatus, SubDomain, SubDomainId,
};
use services::{
    AppServices, ForceEndSessionRequest, IssueBatchRequest, IssuedBatch, SubmitSessionRequest,
    ValidationError, checked_id,
};
use storage::SessionEntry;

use crate::error::ApiError;

const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Build the application router over assembled services.
pub fn router(services: AppServices) -> Router {
    let json_only = Router::new()
        .route("/questions/fetch", post(fetch_questions))
        .route("/practice-session/submit", post(submit_session))
        .route("/practice-session/end-forcefully", post(end_session_forcefully))
        .route_layer(middleware::from_fn(require_json));

    Router::new()
        .route("/", get(index))
        .route("/questions/hierarchy", get(question_hierarchy))
        .route("/questions/domains", get(domains))
        .route("/questions/subdomains/:domain_id", get(sub_domains))
        .route("/questions/niches/:sub_domain_id", get(niches))
        .route("/questions/difficulty-levels/:niche_id", get(difficulty_levels))
        .route("/questions/formats/:difficulty_level_id", get(formats))
        .route("/practice-session/history/:enrollment_no", get(session_history))
        .route("/practice-session/:session_id", get(session_by_id))
        .merge(json_only)
        .with_state(services)
}

/// Reject bodies that are not declared as JSON.
///
/// # Errors
///
/// `ApiError::MissingContentType` without a `Content-Type` header,
/// `ApiError::UnsupportedMediaType` for anything but `application/json`.
pub fn check_json_content_type(headers: &HeaderMap) -> Result<(), ApiError> {
    let value = headers
        .get(header::CONTENT_TYPE)
        .ok_or(ApiError::MissingContentType)?;
    let mime = value
        .to_str()
        .map_err(|_| ApiError::UnsupportedMediaType)?
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();
    if mime.eq_ignore_ascii_case("application/json") {
        Ok(())
    } else {
        Err(ApiError::UnsupportedMediaType)
    }
}

async fn require_json(req: Request, next: Next) -> Result<Response, ApiError> {
    check_json_content_type(req.headers())?;
    Ok(next.run(req).await)
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub async fn index() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Student practice portal is running",
    })
}

//
// ─── PRACTICE SESSIONS ─────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
pub struct FetchQuestionsResponse {
    #[serde(flatten)]
    pub issued: IssuedBatch,
    pub message: &'static str,
}

pub async fn fetch_questions(
    State(app): State<AppServices>,
    payload: Result<Json<IssueBatchRequest>, JsonRejection>,
) -> Result<Json<FetchQuestionsResponse>, ApiError> {
    let Json(request) = payload?;
    let issued = app.practice().issue_batch(request.validate()?).await?;
    Ok(Json(FetchQuestionsResponse {
        issued,
        message: "Practice session started successfully",
    }))
}

pub async fn submit_session(
    State(app): State<AppServices>,
    payload: Result<Json<SubmitSessionRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload?;
    app.practice().submit(request.validate()?).await?;
    Ok(Json(MessageResponse {
        message: "Practice session submitted successfully",
    }))
}

pub async fn end_session_forcefully(
    State(app): State<AppServices>,
    payload: Result<Json<ForceEndSessionRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload?;
    app.practice().force_end(request.validate()?).await?;
    Ok(Json(MessageResponse {
        message: "Practice session forcefully ended successfully",
    }))
}

/// Stored session fields; absent once a session was force-ended.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecordView {
    #[serde(rename = "domainID")]
    pub domain_id: DomainId,
    #[serde(rename = "subDomainID")]
    pub sub_domain_id: SubDomainId,
    #[serde(rename = "difficultyID")]
    pub difficulty_id: DifficultyId,
    pub questions_attempted: i64,
    pub questions_correct: i64,
    pub score_earned: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub feedbacks: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[serde(rename = "practiceSessionID")]
    pub session_id: SessionId,
    pub enrollment_no: EnrollmentNo,
    pub status: SessionStatus,
    pub session: Option<SessionRecordView>,
}

impl From<SessionEntry> for SessionView {
    fn from(entry: SessionEntry) -> Self {
        Self {
            session_id: entry.status.session_id,
            enrollment_no: entry.status.enrollment_no,
            status: entry.status.status,
            session: entry.session.map(|s| SessionRecordView {
                domain_id: s.domain_id(),
                sub_domain_id: s.sub_domain_id(),
                difficulty_id: s.difficulty_id(),
                questions_attempted: s.questions_attempted(),
                questions_correct: s.questions_correct(),
                score_earned: s.score_earned(),
                start_time: s.start_time(),
                end_time: s.end_time(),
                feedbacks: s.feedback().to_string(),
            }),
        }
    }
}

pub async fn session_by_id(
    State(app): State<AppServices>,
    session_id: Result<Path<u64>, PathRejection>,
) -> Result<Json<SessionView>, ApiError> {
    let Path(session_id) = session_id?;
    let session_id = checked_id("session_id", session_id)?;
    let entry = app
        .practice()
        .get_session(SessionId::new(session_id))
        .await?;
    Ok(Json(entry.into()))
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

pub async fn session_history(
    State(app): State<AppServices>,
    enrollment_no: Result<Path<String>, PathRejection>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<SessionView>>, ApiError> {
    let Path(enrollment_no) = enrollment_no?;
    let Query(query) = query?;
    let enrollment_no = EnrollmentNo::parse(enrollment_no).map_err(ValidationError::from)?;
    let entries = app
        .practice()
        .history(&enrollment_no, query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
        .await?;
    Ok(Json(entries.into_iter().map(SessionView::from).collect()))
}

//
// ─── QUESTION HIERARCHY ────────────────────────────────────────────────────────
//

pub async fn question_hierarchy(
    State(app): State<AppServices>,
) -> Result<Json<QuestionHierarchy>, ApiError> {
    Ok(Json(app.hierarchy().snapshot().await?))
}

pub async fn domains(State(app): State<AppServices>) -> Result<Json<Vec<Domain>>, ApiError> {
    Ok(Json(app.hierarchy().domains().await?))
}

pub async fn sub_domains(
    State(app): State<AppServices>,
    domain_id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Vec<SubDomain>>, ApiError> {
    let Path(domain_id) = domain_id?;
    let domain_id = checked_id("domain_id", domain_id)?;
    Ok(Json(
        app.hierarchy()
            .sub_domains(DomainId::new(domain_id))
            .await?,
    ))
}

pub async fn niches(
    State(app): State<AppServices>,
    sub_domain_id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Vec<Niche>>, ApiError> {
    let Path(sub_domain_id) = sub_domain_id?;
    let sub_domain_id = checked_id("sub_domain_id", sub_domain_id)?;
    Ok(Json(
        app.hierarchy()
            .niches(SubDomainId::new(sub_domain_id))
            .await?,
    ))
}

pub async fn difficulty_levels(
    State(app): State<AppServices>,
    niche_id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Vec<DifficultyLevel>>, ApiError> {
    let Path(niche_id) = niche_id?;
    let niche_id = checked_id("niche_id", niche_id)?;
    Ok(Json(
        app.hierarchy()
            .difficulty_levels(NicheId::new(niche_id))
            .await?,
    ))
}

pub async fn formats(
    State(app): State<AppServices>,
    difficulty_id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Vec<QuestionFormat>>, ApiError> {
    let Path(difficulty_id) = difficulty_id?;
    let difficulty_id = checked_id("difficulty_id", difficulty_id)?;
    Ok(Json(
        app.hierarchy()
            .formats(DifficultyId::new(difficulty_id))
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(content_type: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        headers
    }

    #[test]
    fn json_content_type_is_required() {
        assert!(check_json_content_type(&headers(Some("application/json"))).is_ok());
        assert!(
            check_json_content_type(&headers(Some("application/json; charset=utf-8"))).is_ok()
        );
        assert!(matches!(
            check_json_content_type(&headers(None)),
            Err(ApiError::MissingContentType)
        ));
        assert!(matches!(
            check_json_content_type(&headers(Some("text/plain"))),
            Err(ApiError::UnsupportedMediaType)
        ));
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::DataPaths;
use crate::intake::{self, SurveyForm};
use crate::models::WidgetState;
use crate::report::{self, Surface};
use crate::store::{self, StoreLoad};

pub const SESSION_COOKIE: &str = "survey_session";

/// Sessions untouched for this long are dropped on the next save.
pub const SESSION_TTL_HOURS: i64 = 12;

struct Session {
    widgets: WidgetState,
    last_seen: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AppState {
    paths: Arc<DataPaths>,
    sessions: Arc<Mutex<HashMap<Uuid, Session>>>,
    /// Held across read-merge-write so concurrent submissions do not lose rows.
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(paths: DataPaths) -> Self {
        Self {
            paths: Arc::new(paths),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    fn session(&self, id: Uuid) -> Option<WidgetState> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.get(&id).map(|session| session.widgets.clone())
    }

    fn save_session(&self, id: Uuid, widgets: WidgetState) {
        let now = Utc::now();
        let cutoff = now - Duration::hours(SESSION_TTL_HOURS);
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, session| session.last_seen >= cutoff);
        if sessions.len() < before {
            debug!(evicted = before - sessions.len(), "expired sessions dropped");
        }
        sessions.insert(
            id,
            Session {
                widgets,
                last_seen: now,
            },
        );
    }

    #[cfg(test)]
    fn session_count(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(survey_page))
        .route("/survey", get(survey_page).post(submit_survey))
        .route("/visuals", get(visuals_page))
        .route("/data.csv", get(download_csv))
        .with_state(state)
}

pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", self.0)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

async fn survey_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let paths = state.paths.clone();
    let page = tokio::task::spawn_blocking(move || intake::render(&paths, None)).await?;
    Ok(Html(page))
}

async fn submit_survey(
    State(state): State<AppState>,
    Form(form): Form<SurveyForm>,
) -> Result<Html<String>, AppError> {
    let _guard = state.write_lock.lock().await;
    let paths = state.paths.clone();
    let page = tokio::task::spawn_blocking(move || {
        let submission = intake::submit(&paths, form);
        intake::render(&paths, Some(&submission))
    })
    .await?;
    Ok(Html(page))
}

async fn visuals_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Response, AppError> {
    let existing = session_id(&headers);
    let known = existing.and_then(|id| state.session(id));
    let is_known = known.is_some();
    let widgets = apply_query(known.unwrap_or_default(), query.as_deref().unwrap_or_default());

    let paths = state.paths.clone();
    let pass =
        tokio::task::spawn_blocking(move || report::render(&paths, widgets, Surface::Live)).await?;

    // Visitors still on default widgets get no session until they change one.
    let mut response = Html(pass.html).into_response();
    if !is_known && pass.state == WidgetState::default() {
        return Ok(response);
    }
    let id = existing.unwrap_or_else(Uuid::new_v4);
    state.save_session(id, pass.state);

    if existing.is_none() {
        let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
        response
            .headers_mut()
            .insert(header::SET_COOKIE, HeaderValue::from_str(&cookie)?);
    }
    Ok(response)
}

/// Serves the store exactly as it sits on disk, but only when it parses.
async fn download_csv(State(state): State<AppState>) -> Result<Response, AppError> {
    let paths = state.paths.clone();
    let filename = paths.csv_name();
    match tokio::task::spawn_blocking(move || store::load(&paths.csv)).await? {
        StoreLoad::Loaded { bytes, .. } => Ok((
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                ),
            ],
            bytes,
        )
            .into_response()),
        StoreLoad::Missing | StoreLoad::Empty | StoreLoad::Unreadable(_) => {
            Ok((StatusCode::NOT_FOUND, format!("{filename} is not available")).into_response())
        }
    }
}

fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
}

/// Applies widget changes from the query string. `bins` sets the bin count;
/// a submitted filter form (`filter=1`) replaces the major selection with the
/// repeated `major` values, possibly none.
pub fn apply_query(state: WidgetState, query: &str) -> WidgetState {
    let mut bins = None;
    let mut filter_submitted = false;
    let mut majors = Vec::new();

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "bins" => bins = value.trim().parse::<usize>().ok(),
            "filter" => filter_submitted = value != "0",
            "major" => majors.push(value.into_owned()),
            _ => {}
        }
    }

    let mut state = state;
    if let Some(bins) = bins {
        state = state.with_bins(bins);
    }
    if filter_submitted {
        state = state.with_majors(majors);
    }
    state
}

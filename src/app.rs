use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use quick_xml::escape::escape;
use rand_core::{OsRng, RngCore};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::ai::flows::{self, BookSummary};
use crate::ai::http::HttpModelProvider;
use crate::ai::{AiError, AiFlow, FlowError, ModelProvider};
use crate::catalog::{self, ToolCategory};
use crate::config::Config;
use crate::converter::{self, ConversionKind, ConvertError, Converter, InputFile};
use crate::csv_json::{self, CsvJsonError};
use crate::history;
use crate::notes::{self, NoteDraft, NoteVault, NotesError};
use crate::password::{self, GenerationResult, GeneratorOptions};
use crate::sitemap;
use crate::storage::{Storage, StorageError};
use crate::task::TaskRegistry;
use crate::units::{self, UnitCategory, UnitError};

// Room for multipart framing around a maximum-size upload
const MULTIPART_OVERHEAD: usize = 64 * 1024;

const SESSION_TOKEN_BYTES: usize = 32;

/// The unlocked vault and the bearer tokens of the clients that unlocked it
struct NotesSession {
    vault: NoteVault,
    tokens: HashSet<String>,
}

pub struct AppState {
    config: Config,
    storage: Mutex<Storage>,
    notes: Mutex<Option<NotesSession>>,
    converter: Converter,
    provider: Option<Arc<dyn ModelProvider>>,
    tasks: TaskRegistry,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Storage,
        converter: Converter,
        provider: Option<Arc<dyn ModelProvider>>,
    ) -> Self {
        let converter = converter.with_max_file_size(config.server.max_upload_bytes);
        Self {
            config,
            storage: Mutex::new(storage),
            notes: Mutex::new(None),
            converter,
            provider,
            tasks: TaskRegistry::new(),
        }
    }

    fn storage(&self) -> MutexGuard<'_, Storage> {
        self.storage.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Lock order: notes before storage
    fn notes(&self) -> MutexGuard<'_, Option<NotesSession>> {
        self.notes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Install `vault` as the unlocked vault and hand out a new token for it
    fn open_session(&self, vault: NoteVault) -> String {
        let token = new_session_token();
        let mut sessions = self.notes();
        match sessions.as_mut() {
            Some(session) => {
                session.vault = vault;
                session.tokens.insert(token.clone());
            }
            None => {
                *sessions = Some(NotesSession {
                    vault,
                    tokens: HashSet::from([token.clone()]),
                });
            }
        }
        token
    }
}

/// JSON error body: `{"status": "error", "message": ...}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            log::error!("{}: {}", self.status, self.message);
        }
        let body = StatusResponse {
            status: "error",
            message: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<UnitError> for ApiError {
    fn from(e: UnitError) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl From<CsvJsonError> for ApiError {
    fn from(e: CsvJsonError) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        Self::internal(e.to_string())
    }
}

impl From<ConvertError> for ApiError {
    fn from(e: ConvertError) -> Self {
        let status = match &e {
            ConvertError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ConvertError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ConvertError::UnsupportedInput { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ConvertError::Storage(_) | ConvertError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        };
        Self::new(status, e.to_string())
    }
}

impl From<NotesError> for ApiError {
    fn from(e: NotesError) -> Self {
        let status = match &e {
            NotesError::WrongPassword => StatusCode::UNAUTHORIZED,
            NotesError::MasterPasswordNotSet | NotesError::MasterPasswordAlreadySet => StatusCode::CONFLICT,
            NotesError::NoteNotFound(_) => StatusCode::NOT_FOUND,
            NotesError::PasswordTooShort | NotesError::EmptyNote | NotesError::Backup(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<FlowError> for ApiError {
    fn from(e: FlowError) -> Self {
        let status = match &e {
            FlowError::SchemaMismatch { .. } => StatusCode::BAD_GATEWAY,
            FlowError::Provider(AiError::InvalidInput(_) | AiError::InvalidDataUri(_)) => {
                StatusCode::BAD_REQUEST
            }
            FlowError::Provider(AiError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            FlowError::Provider(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, e.to_string())
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// `scheme://host[:port]` of the public site, the form browsers send in `Origin`
fn site_origin(base_url: &str) -> Option<HeaderValue> {
    let url = Url::parse(base_url).ok()?;
    let origin = url.origin();
    if !origin.is_tuple() {
        return None;
    }
    HeaderValue::from_str(&origin.ascii_serialization()).ok()
}

/// Cross-origin access for the public site only; other origins get no CORS headers
fn cors_layer(base_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    match site_origin(base_url) {
        Some(origin) => cors.allow_origin(AllowOrigin::list([origin])),
        None => {
            log::warn!("base URL {base_url:?} has no origin; cross-origin requests are refused");
            cors
        }
    }
}

/// Every route, with uploads capped at the configured size
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.server.max_upload_bytes + MULTIPART_OVERHEAD;
    let cors = cors_layer(&state.config.server.base_url);

    Router::new()
        .route("/", get(serve_landing))
        .route("/sitemap.xml", get(serve_sitemap))
        .route("/api/tools", get(list_tools))
        .route("/api/tools/:id", get(get_tool))
        .route("/api/units/convert", post(convert_units))
        .route("/api/units/:category", get(list_units))
        .route("/api/password/generate", post(generate_password))
        .route("/api/password/last-batch", get(last_password_batch))
        .route("/api/password/strength", post(check_strength))
        .route("/api/csv-to-json", post(csv_to_json))
        .route("/api/json-to-csv", post(json_to_csv))
        .route("/api/convert/:key", post(convert_document))
        .route("/api/convert/:key/history", get(conversion_history))
        .route("/api/ai/book-summary/last", get(last_book_summary))
        .route("/api/ai/:flow", post(run_ai_flow))
        .route("/api/tasks/:name", get(task_state))
        .route("/api/notes/status", get(notes_status))
        .route("/api/notes/master", post(set_master_password))
        .route("/api/notes/unlock", post(unlock_notes))
        .route("/api/notes/lock", post(lock_notes))
        .route("/api/notes/password", post(change_master_password))
        .route("/api/notes/backup", get(export_notes_backup).post(import_notes_backup))
        .route("/api/notes", get(list_notes).post(add_note))
        .route("/api/notes/:id", axum::routing::put(update_note).delete(delete_note))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let storage = Storage::open_file(config.storage.store_path())?;

    let provider: Option<Arc<dyn ModelProvider>> = match HttpModelProvider::new(&config.ai) {
        Ok(provider) => Some(Arc::new(provider)),
        Err(e) => {
            log::warn!("AI tools disabled: {e}");
            None
        }
    };

    let bind = config.server.bind.clone();
    let state = Arc::new(AppState::new(config, storage, Converter::default(), provider));
    let app = router(state);

    let listener = TcpListener::bind(&bind).await?;
    log::info!("listening on http://{bind}");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_landing() -> Html<String> {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>Toolbench</title></head>\n<body>\n<h1>Toolbench</h1>\n",
    );
    for category in ToolCategory::ALL {
        let tools = catalog::by_category(category);
        if tools.is_empty() {
            continue;
        }
        html.push_str(&format!("<h2>{}</h2>\n<ul>\n", escape(category.label())));
        for tool in tools {
            html.push_str(&format!(
                "<li>{} <a href=\"{}\">{}</a> - {}</li>\n",
                tool.icon.glyph(),
                tool.route,
                escape(tool.title),
                escape(tool.description)
            ));
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</body>\n</html>\n");
    Html(html)
}

async fn serve_sitemap(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let xml = sitemap::build_sitemap(&state.config.server.base_url, Utc::now().date_naive());
    ([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], xml)
}

#[derive(Deserialize)]
struct ToolQuery {
    q: Option<String>,
    category: Option<String>,
}

async fn list_tools(Query(params): Query<ToolQuery>) -> ApiResult<impl IntoResponse> {
    let category = match params.category.as_deref() {
        Some(name) => Some(
            ToolCategory::parse(name)
                .ok_or_else(|| ApiError::bad_request(format!("unknown tool category: {name}")))?,
        ),
        None => None,
    };
    Ok(Json(catalog::filter(params.q.as_deref(), category)))
}

async fn get_tool(Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    catalog::find(&id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("unknown tool: {id}")))
}

#[derive(Deserialize)]
struct UnitRequest {
    category: String,
    value: String,
    from: String,
    to: String,
}

async fn convert_units(Json(request): Json<UnitRequest>) -> ApiResult<impl IntoResponse> {
    let conversion = units::convert_input(&request.category, &request.value, &request.from, &request.to)?;
    Ok(Json(conversion))
}

async fn list_units(Path(name): Path<String>) -> ApiResult<impl IntoResponse> {
    let category = UnitCategory::parse(&name).ok_or(UnitError::UnknownCategory(name))?;
    Ok(Json(serde_json::json!({
        "category": category,
        "label": category.label(),
        "units": category.unit_names(),
    })))
}

#[derive(Deserialize)]
struct GenerateRequest {
    #[serde(flatten)]
    options: GeneratorOptions,
    #[serde(default)]
    count: Option<usize>,
}

async fn generate_password(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<Response> {
    match request.count {
        Some(count) if count > 1 => {
            let batch = password::generate_batch(&request.options, count).map_err(ApiError::bad_request)?;
            password::remember_batch(&mut state.storage(), &batch)?;
            Ok(Json(serde_json::json!({ "passwords": batch })).into_response())
        }
        _ => match password::generate(&request.options) {
            GenerationResult::Error(message) => Err(ApiError::bad_request(message)),
            result => Ok(Json(result).into_response()),
        },
    }
}

async fn last_password_batch(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(password::last_batch(&state.storage()))
}

#[derive(Deserialize)]
struct StrengthRequest {
    password: String,
}

async fn check_strength(Json(request): Json<StrengthRequest>) -> impl IntoResponse {
    Json(password::evaluate(&request.password))
}

async fn csv_to_json(body: String) -> ApiResult<impl IntoResponse> {
    let json = csv_json::csv_to_json_string(&body, true)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], json))
}

async fn json_to_csv(body: String) -> ApiResult<impl IntoResponse> {
    let csv = csv_json::json_to_csv(&body)?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv))
}

// Header-safe version of a generated file name
fn attachment_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

async fn read_upload(mut multipart: Multipart) -> ApiResult<InputFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?;

        let mut file = InputFile::new(name, bytes.to_vec());
        if let Some(content_type) = content_type {
            file = file.with_content_type(content_type);
        }
        return Ok(file);
    }
    Err(ApiError::bad_request("No file data received"))
}

async fn convert_document(
    Path(key): Path<String>,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<Response> {
    let kind = ConversionKind::from_key(&key).ok_or_else(|| ConvertError::NotImplemented(key.clone()))?;
    let file = read_upload(multipart).await?;
    let file_name = file.name.clone();

    let tracker = state.tasks.tracker(kind.key());
    let converter = state.converter.clone();
    let result = tracker
        .run(async move {
            tokio::task::spawn_blocking(move || converter.convert(kind, &file))
                .await
                .map_err(|e| ConvertError::Render(format!("conversion task failed: {e}")))?
        })
        .await;

    converter::record_outcome(&mut state.storage(), kind, &file_name, &result);
    let converted = result?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, converted.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", attachment_name(&converted.file_name)),
        )
        .header("x-fidelity-note", converted.fidelity_note)
        .body(Body::from(converted.bytes))
        .map_err(|e| ApiError::internal(e.to_string()))
}

async fn conversion_history(
    Path(tool): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(history::load(&state.storage(), &tool))
}

async fn run_ai_flow(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(input): Json<Value>,
) -> ApiResult<Response> {
    let flow = AiFlow::from_name(&name).ok_or_else(|| ApiError::not_found(format!("unknown AI flow: {name}")))?;
    let provider = state.provider.clone().ok_or(FlowError::Provider(AiError::NotConfigured))?;

    let tracker = state.tasks.tracker(flow.tool_id());
    let output = match tracker.run(flow.run_json(provider.as_ref(), input)).await {
        Ok(output) => output,
        Err(FlowError::SchemaMismatch { raw }) => match flow.fallback() {
            Some(fallback) => {
                log::warn!("{} answered off-schema, serving fallback", flow.name());
                return Ok(([("x-ai-fallback", "true")], Json(fallback)).into_response());
            }
            None => return Err(FlowError::SchemaMismatch { raw }.into()),
        },
        Err(e) => return Err(e.into()),
    };

    if flow == AiFlow::BookSummary {
        match serde_json::from_value::<BookSummary>(output.clone()) {
            Ok(summary) => flows::remember_book_summary(&mut state.storage(), &summary)?,
            Err(e) => log::warn!("book summary not stored: {e}"),
        }
    }
    Ok(Json(output).into_response())
}

async fn last_book_summary(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    flows::last_book_summary(&state.storage())
        .map(Json)
        .ok_or_else(|| ApiError::not_found("no book summary yet"))
}

async fn task_state(Path(name): Path<String>, State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    state
        .tasks
        .state(&name)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no task named {name}")))
}

#[derive(Deserialize)]
struct PasswordRequest {
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

#[derive(Serialize)]
struct SessionResponse {
    status: &'static str,
    token: String,
}

fn new_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(|token| token.trim().to_string())
}

fn locked() -> ApiError {
    ApiError::new(StatusCode::UNAUTHORIZED, "notes are locked")
}

/// The session `token` belongs to, if the vault is unlocked for it
fn unlocked<'a>(sessions: &'a mut Option<NotesSession>, token: Option<&str>) -> ApiResult<&'a mut NotesSession> {
    let token = token.ok_or_else(locked)?;
    match sessions {
        Some(session) if session.tokens.contains(token) => Ok(session),
        _ => Err(locked()),
    }
}

async fn notes_status(State(state): State<Arc<AppState>>, headers: HeaderMap) -> impl IntoResponse {
    let master_password_set = notes::has_master_password(&state.storage());
    let token = bearer_token(&headers);
    let is_unlocked = unlocked(&mut state.notes(), token.as_deref()).is_ok();
    Json(serde_json::json!({
        "masterPasswordSet": master_password_set,
        "unlocked": is_unlocked,
    }))
}

fn ok_status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        message: None,
    })
}

fn session_opened(token: String) -> Json<SessionResponse> {
    Json(SessionResponse { status: "ok", token })
}

// Argon2 is slow on purpose, so keep it off the async workers
async fn with_password<F>(state: Arc<AppState>, work: F) -> ApiResult<NoteVault>
where
    F: FnOnce(&mut Storage) -> Result<NoteVault, NotesError> + Send + 'static,
{
    let vault = tokio::task::spawn_blocking(move || work(&mut state.storage()))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;
    Ok(vault)
}

async fn set_master_password(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let vault = with_password(state.clone(), move |storage| {
        NoteVault::set_master_password(storage, &request.password)
    })
    .await?;
    Ok(session_opened(state.open_session(vault)))
}

async fn unlock_notes(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let vault = with_password(state.clone(), move |storage| NoteVault::unlock(storage, &request.password)).await?;
    Ok(session_opened(state.open_session(vault)))
}

/// End the caller's session; the key is dropped once no session is left
async fn lock_notes(State(state): State<Arc<AppState>>, headers: HeaderMap) -> impl IntoResponse {
    let Some(token) = bearer_token(&headers) else {
        return ok_status();
    };
    let mut sessions = state.notes();
    let last_session = match sessions.as_mut() {
        Some(session) => {
            session.tokens.remove(&token);
            session.tokens.is_empty()
        }
        None => false,
    };
    if last_session {
        *sessions = None;
        log::info!("secure notes locked");
    }
    ok_status()
}

/// Re-key the vault; every other session is ended
async fn change_master_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let token = bearer_token(&headers).ok_or_else(locked)?;
    tokio::task::spawn_blocking(move || {
        let mut sessions = state.notes();
        let session = unlocked(&mut sessions, Some(token.as_str()))?;
        session.vault.change_master_password(
            &mut state.storage(),
            &request.current_password,
            &request.new_password,
        )?;
        session.tokens.retain(|t| *t == token);
        Ok::<_, ApiError>(())
    })
    .await
    .map_err(|e| ApiError::internal(e.to_string()))??;
    Ok(ok_status())
}

async fn export_notes_backup(State(state): State<Arc<AppState>>, headers: HeaderMap) -> ApiResult<Response> {
    let token = bearer_token(&headers);
    let mut sessions = state.notes();
    unlocked(&mut sessions, token.as_deref())?;
    let backup = notes::export_backup(&state.storage())?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_DISPOSITION, "attachment; filename=\"secure-notes.backup\"")
        .body(Body::from(backup))
        .map_err(|e| ApiError::internal(e.to_string()))
}

/// Restore a backup. Once a master password exists this needs a session,
/// and every session ends because the vault now has the backup's password.
async fn import_notes_backup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let token = bearer_token(&headers);
    let mut sessions = state.notes();
    if notes::has_master_password(&state.storage()) {
        unlocked(&mut sessions, token.as_deref())?;
    }
    notes::import_backup(&mut state.storage(), &body)?;
    *sessions = None;
    Ok(ok_status())
}

#[derive(Deserialize)]
struct NoteQuery {
    q: Option<String>,
    category: Option<String>,
}

async fn list_notes(
    Query(params): Query<NoteQuery>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let token = bearer_token(&headers);
    let mut sessions = state.notes();
    let vault = &unlocked(&mut sessions, token.as_deref())?.vault;

    let mut found = match params.q.as_deref() {
        Some(query) => vault.search(query),
        None => vault.list().iter().collect(),
    };
    if let Some(category) = params.category.as_deref() {
        found.retain(|note| note.category.eq_ignore_ascii_case(category));
    }
    Ok(Json(serde_json::json!({
        "notes": found,
        "categories": vault.categories(),
    })))
}

async fn add_note(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(draft): Json<NoteDraft>,
) -> ApiResult<impl IntoResponse> {
    let token = bearer_token(&headers);
    let mut sessions = state.notes();
    let session = unlocked(&mut sessions, token.as_deref())?;
    let note = session.vault.add(&mut state.storage(), draft)?;
    Ok((StatusCode::CREATED, Json(note)))
}

async fn update_note(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(draft): Json<NoteDraft>,
) -> ApiResult<impl IntoResponse> {
    let token = bearer_token(&headers);
    let mut sessions = state.notes();
    let session = unlocked(&mut sessions, token.as_deref())?;
    let note = session.vault.update(&mut state.storage(), &id, draft)?;
    Ok(Json(note))
}

async fn delete_note(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let token = bearer_token(&headers);
    let mut sessions = state.notes();
    let session = unlocked(&mut sessions, token.as_deref())?;
    session.vault.delete(&mut state.storage(), &id)?;
    Ok(ok_status())
}

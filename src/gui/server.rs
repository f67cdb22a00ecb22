//! Web server for the pages, form actions, exports and JSON API

use axum::{
    Json, Router,
    extract::{Multipart, Path as AxumPath, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::forms::{self, FormError, FormValues};
use super::pages::{self, Page, PageQuery};
use crate::commands::{self, records};
use crate::export::{self, ExportFormat, Table};
use crate::models::{Case, Client, Document, EntityKind, Event, Filter, Record, Task, Transaction};
use crate::session::{Session, Upload};

/// Default port for the web server
pub const DEFAULT_PORT: u16 = 3030;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The single user's session; every request holds the lock for its whole action
    pub session: Arc<Mutex<Session>>,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }
}

/// Call a generic function with the record type matching `kind`.
macro_rules! for_kind {
    ($kind:expr, $func:ident ( $($arg:expr),* $(,)? )) => {
        match $kind {
            EntityKind::Client => $func::<Client>($($arg),*),
            EntityKind::Case => $func::<Case>($($arg),*),
            EntityKind::Task => $func::<Task>($($arg),*),
            EntityKind::Event => $func::<Event>($($arg),*),
            EntityKind::Transaction => $func::<Transaction>($($arg),*),
            EntityKind::Document => $func::<Document>($($arg),*),
        }
    };
}

/// Request failure shown as a plain-text response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn not_found(message: impl fmt::Display) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.to_string(),
        }
    }

    fn bad_request(message: impl fmt::Display) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
        }
    }

    fn internal(message: impl fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

fn parse_kind(entity: &str) -> Result<EntityKind, AppError> {
    EntityKind::parse(entity).ok_or_else(|| AppError::not_found(format!("unknown record type '{}'", entity)))
}

/// Run `action` on the blocking pool with the session locked.
///
/// Backends perform blocking HTTP, so the lock is taken inside the blocking
/// task. The first action of the process loads the records.
async fn run<F, R>(state: &AppState, action: F) -> Result<R, AppError>
where
    F: FnOnce(&mut Session) -> R + Send + 'static,
    R: Send + 'static,
{
    let session = state.session.clone();
    tokio::task::spawn_blocking(move || {
        let mut session = session.blocking_lock();
        session.bootstrap();
        action(&mut session)
    })
    .await
    .map_err(AppError::internal)
}

/// Build the router for `state`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/overview") }))
        .route("/overview", get(overview_page))
        .route("/clients", get(list_page::<Client>))
        .route("/cases", get(list_page::<Case>))
        .route("/documents", get(list_page::<Document>))
        .route("/calendar", get(list_page::<Event>))
        .route("/tasks", get(list_page::<Task>))
        .route("/finance", get(list_page::<Transaction>))
        .route("/cases-by-client", get(cases_by_client_page))
        .route("/reports", get(reports_page))
        .route("/records/{entity}", post(save_form))
        .route("/records/{entity}/upload", post(save_multipart))
        .route("/records/{entity}/new", post(open_create))
        .route("/records/{entity}/cancel", post(cancel_form))
        .route("/records/{entity}/{index}/edit", post(open_edit))
        .route("/records/{entity}/{index}/delete", post(delete_record))
        .route("/export/{file}", get(export_file))
        .route("/api/overview", get(api_overview))
        .route("/api/{entity}", get(api_list))
        .with_state(state)
}

/// Start the web server
pub async fn start_server(
    session: Session,
    host: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(AppState::new(session));

    let host_addr: std::net::IpAddr = host
        .parse()
        .map_err(|e| format!("Invalid host address '{}': {}", host, e))?;
    let addr = SocketAddr::from((host_addr, port));
    info!(%addr, "starting web server");
    println!("Starting docket at http://{}", addr);
    println!("Press Ctrl+C to stop");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// === Pages ===

async fn overview_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    run(&state, pages::overview).await.map(Html)
}

async fn list_page<T: Page>(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    run(&state, move |session| pages::entity_page::<T>(session, &query, None))
        .await
        .map(Html)
}

async fn cases_by_client_page(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    run(&state, move |session| pages::cases_by_client_page(session, &query))
        .await
        .map(Html)
}

async fn reports_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    run(&state, pages::reports).await.map(Html)
}

// === Form actions ===

/// Save the submitted form: the open edit when there is one, else a create.
///
/// An edit whose record moved or disappeared is dropped without saving.
fn save_record<T: Page>(
    session: &mut Session,
    values: &FormValues,
    upload: Option<Upload>,
) -> Result<(), FormError> {
    let was_editing = session.ui().editing(T::KIND).is_some();
    match session.resolve_edit::<T>() {
        Some(index) => {
            let base = session.store().get::<T>(index).cloned().unwrap_or_default();
            let record = forms::parse_record(base, values)?;
            match session.save_edit(record) {
                Ok(Some(index)) => debug!(kind = %T::KIND, index, "saved edit"),
                Ok(None) | Err(_) => debug!(kind = %T::KIND, "dropped stale edit"),
            }
        }
        None if was_editing => debug!(kind = %T::KIND, "dropped stale edit"),
        None => {
            let record = forms::parse_record(T::default(), values)?;
            T::insert(session, record, upload);
        }
    }
    Ok(())
}

fn submit<T: Page>(session: &mut Session, values: FormValues, upload: Option<Upload>) -> Response {
    match save_record::<T>(session, &values, upload) {
        Ok(()) => Redirect::to(T::PATH).into_response(),
        Err(error) => {
            let html = pages::entity_page::<T>(session, &PageQuery::default(), Some(&error));
            (StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response()
        }
    }
}

async fn save_form(
    State(state): State<AppState>,
    AxumPath(entity): AxumPath<String>,
    axum::Form(values): axum::Form<FormValues>,
) -> Result<Response, AppError> {
    let kind = parse_kind(&entity)?;
    run(&state, move |session| for_kind!(kind, submit(session, values, None))).await
}

/// Same as [`save_form`], for multipart forms carrying a file.
async fn save_multipart(
    State(state): State<AppState>,
    AxumPath(entity): AxumPath<String>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let kind = parse_kind(&entity)?;
    let mut values = FormValues::new();
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(AppError::bad_request)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "upload" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(AppError::bad_request)?;
            if !filename.is_empty() && !bytes.is_empty() {
                upload = Some(Upload {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            let text = field.text().await.map_err(AppError::bad_request)?;
            values.insert(name, text);
        }
    }
    run(&state, move |session| for_kind!(kind, submit(session, values, upload))).await
}

async fn open_create(
    State(state): State<AppState>,
    AxumPath(entity): AxumPath<String>,
) -> Result<Redirect, AppError> {
    let kind = parse_kind(&entity)?;
    run(&state, move |session| {
        session.ui_mut().begin_create(kind);
        Redirect::to(pages::page_path(kind))
    })
    .await
}

async fn cancel_form(
    State(state): State<AppState>,
    AxumPath(entity): AxumPath<String>,
) -> Result<Redirect, AppError> {
    let kind = parse_kind(&entity)?;
    run(&state, move |session| {
        session.ui_mut().cancel();
        Redirect::to(pages::page_path(kind))
    })
    .await
}

fn begin_edit<T: Record>(session: &mut Session, index: usize) -> bool {
    session.begin_edit::<T>(index)
}

async fn open_edit(
    State(state): State<AppState>,
    AxumPath((entity, index)): AxumPath<(String, usize)>,
) -> Result<Redirect, AppError> {
    let kind = parse_kind(&entity)?;
    run(&state, move |session| {
        if !for_kind!(kind, begin_edit(session, index)) {
            session.ui_mut().cancel();
        }
        Redirect::to(pages::page_path(kind))
    })
    .await
}

async fn delete_record(
    State(state): State<AppState>,
    AxumPath((entity, index)): AxumPath<(String, usize)>,
) -> Result<Redirect, AppError> {
    let kind = parse_kind(&entity)?;
    run(&state, move |session| {
        match session.delete_kind(kind, index) {
            Ok(summary) => info!(%kind, index, %summary, "deleted"),
            Err(e) => {
                debug!(%kind, index, error = %e, "delete skipped");
                session.ui_mut().cancel();
            }
        }
        Redirect::to(pages::page_path(kind))
    })
    .await
}

// === Export ===

/// Download a collection, e.g. `/export/clientes.xlsx`
async fn export_file(
    State(state): State<AppState>,
    AxumPath(file): AxumPath<String>,
) -> Result<Response, AppError> {
    let (name, extension) = file
        .rsplit_once('.')
        .ok_or_else(|| AppError::not_found(format!("no export named '{}'", file)))?;
    let kind = parse_kind(name)?;
    let format = ExportFormat::parse(extension)
        .ok_or_else(|| AppError::not_found(format!("unknown export format '{}'", extension)))?;

    let bytes = run(&state, move |session| {
        export::render(&Table::for_kind(session.store(), kind), format)
    })
    .await?
    .map_err(AppError::internal)?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::file_name(kind, format)
    );
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

// === JSON API ===

async fn api_overview(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    run(&state, |session| serde_json::to_value(commands::overview(session)))
        .await?
        .map(Json)
        .map_err(AppError::internal)
}

fn list_json<T: Page>(session: &mut Session, filter: &Filter) -> serde_json::Result<serde_json::Value> {
    serde_json::to_value(records::list::<T>(session, filter))
}

async fn api_list(
    State(state): State<AppState>,
    AxumPath(entity): AxumPath<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let kind = parse_kind(&entity)?;
    let (filter, error) = query.filter();
    if let Some(error) = error {
        return Err(AppError::bad_request(error));
    }
    run(&state, move |session| for_kind!(kind, list_json(session, &filter)))
        .await?
        .map(Json)
        .map_err(AppError::internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DisabledBackend;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState::new(Session::new(Box::new(DisabledBackend::new("tests"))))
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, String, Response) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let (parts, body) = response.into_parts();
        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        let text = String::from_utf8_lossy(&bytes).into_owned();
        (status, text, Response::from_parts(parts, Body::empty()))
    }

    async fn get_page(state: &AppState, uri: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, body, _) = send(state, request).await;
        (status, body)
    }

    async fn post_form(state: &AppState, uri: &str, form: &str) -> (StatusCode, String, Response) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        send(state, request).await
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    #[tokio::test]
    async fn test_root_redirects_to_overview() {
        let state = state();
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, _, response) = send(&state, request).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/overview");
    }

    #[tokio::test]
    async fn test_every_nav_page_renders() {
        let state = state();
        for entry in super::super::html::NAV {
            let (status, body) = get_page(&state, entry.path).await;
            assert_eq!(status, StatusCode::OK, "{}", entry.path);
            assert!(body.contains(&format!(r#"<a href="{}" class="active">"#, entry.path)));
        }
    }

    #[tokio::test]
    async fn test_create_client_and_list_it() {
        let state = state();
        let (status, _, response) =
            post_form(&state, "/records/clients", "name=Ana&email=a%40x.com&phone=111").await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/clients");

        let (_, body) = get_page(&state, "/clients").await;
        assert!(body.contains("Ana"));
        assert!(body.contains("a@x.com"));
        assert_eq!(state.session.lock().await.store().clients.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_form_is_shown_again() {
        let state = state();
        post_form(&state, "/records/transactions/new", "").await;
        let (status, body, _) =
            post_form(&state, "/records/transactions", "amount=-5&category=Custas").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.contains("negative"));
        assert!(body.contains(r#"value="Custas""#));

        let session = state.session.lock().await;
        assert!(session.store().transactions.is_empty());
        assert!(session.ui().is_creating(EntityKind::Transaction));
    }

    #[tokio::test]
    async fn test_edit_replaces_record_in_place() {
        let state = state();
        post_form(&state, "/records/clients", "name=Ana").await;
        post_form(&state, "/records/clients", "name=Caio").await;

        let (status, _, _) = post_form(&state, "/records/clients/0/edit", "").await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        let (_, body) = get_page(&state, "/clients").await;
        assert!(body.contains("Editar Cliente #0"));

        post_form(&state, "/records/clients", "name=Bia").await;
        let session = state.session.lock().await;
        let names: Vec<&str> = session.store().clients.all().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Bia", "Caio"]);
        assert_eq!(session.ui().editing(EntityKind::Client), None);
    }

    #[tokio::test]
    async fn test_delete_drops_shifted_edit_form() {
        let state = state();
        post_form(&state, "/records/clients", "name=Ana").await;
        post_form(&state, "/records/clients", "name=Bia").await;
        post_form(&state, "/records/clients/1/edit", "").await;

        let (status, _, _) = post_form(&state, "/records/clients/0/delete", "").await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        let (_, body) = get_page(&state, "/clients").await;
        assert!(!body.contains("Editar Cliente"));
        assert!(!body.contains(">Ana<"));

        // deleting past the end is not an error
        let (status, _, _) = post_form(&state, "/records/clients/5/delete", "").await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(state.session.lock().await.store().clients.len(), 1);
    }

    #[tokio::test]
    async fn test_document_upload_keeps_file_name_without_backend() {
        let state = state();
        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"client\"\r\n\r\nAna\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nContrato\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"upload\"; filename=\"contrato.pdf\"\r\n\
             Content-Type: application/pdf\r\n\r\n%PDF-1.4 test\r\n--{b}--\r\n",
            b = boundary
        );
        let request = Request::builder()
            .method("POST")
            .uri("/records/documents/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();
        let (status, _, response) = send(&state, request).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/documents");

        let session = state.session.lock().await;
        let document = &session.store().documents.all()[0];
        assert_eq!(document.title, "Contrato");
        assert_eq!(document.file, "contrato.pdf");
    }

    #[tokio::test]
    async fn test_export_pdf_download() {
        let state = state();
        post_form(&state, "/records/clients", "name=Ana").await;
        let request = Request::builder()
            .uri("/export/clientes.pdf")
            .body(Body::empty())
            .unwrap();
        let (status, body, response) = send(&state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("%PDF"));
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"clientes.pdf\""
        );
    }

    #[tokio::test]
    async fn test_unknown_export_is_not_found() {
        let state = state();
        let (status, _) = get_page(&state, "/export/planetas.xlsx").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get_page(&state, "/export/clientes.csv").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_api_list_applies_filters() {
        let state = state();
        post_form(&state, "/records/tasks", "description=Protocolar+recurso&priority=high&due_on=2024-03-01").await;
        post_form(&state, "/records/tasks", "description=Ligar+para+Ana&priority=low&due_on=2024-05-01").await;

        let (status, body) = get_page(&state, "/api/tasks?due=2024-04-01").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["total"], 2);
        assert_eq!(json["items"][0]["description"], "Protocolar recurso");

        let (_, body) = get_page(&state, "/api/tasks?status=Baixa").await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["items"][0]["index"], 1);

        let (status, _) = get_page(&state, "/api/tasks?due=ontem").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_api_overview_balance() {
        let state = state();
        post_form(&state, "/records/transactions", "kind=income&amount=500").await;
        post_form(&state, "/records/transactions", "kind=expense&amount=120").await;
        let (_, body) = get_page(&state, "/api/overview").await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["balance_display"], "R$ 380.00");
    }
}

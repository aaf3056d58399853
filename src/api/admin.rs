//! Admin CMS pages
//!
//! Login and logout are public; everything else sits behind the session
//! guard. Writes redirect back to their list page with a `notice` or `error`
//! query parameter for the flash message.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    middleware as axum_middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tera::Context as TeraContext;

use crate::api::middleware::{
    clear_session_cookie, extract_session, require_admin, session_cookie, AppState, PageError,
    LOGIN_PATH,
};
use crate::backend::UploadFile;
use crate::models::{ImageRef, Machine, MachineCategory};
use crate::services::admin::{AdminError, BlogForm, EnquiryFilter, MachineForm, PartForm};

const DASHBOARD_PATH: &str = "/admin/dashboard";

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/admin/login", get(login_page).post(login))
        .route("/admin/logout", post(logout))
}

pub fn protected_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/admin", get(|| async { Redirect::to(DASHBOARD_PATH) }))
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/machines", get(machines_page).post(create_machine))
        .route("/admin/machines/{id}", post(update_machine))
        .route("/admin/machines/{id}/delete", post(delete_machine))
        .route("/admin/parts", get(parts_page).post(create_part))
        .route("/admin/parts/{id}/delete", post(delete_part))
        .route("/admin/blogs", get(blogs_page).post(create_blog))
        .route("/admin/blogs/{id}/delete", post(delete_blog))
        .route("/admin/enquiries", get(enquiries_page))
        .route("/admin/enquiries/mark-read", post(mark_enquiries_read))
        .layer(DefaultBodyLimit::max(state.config.upload.max_request_size))
        .route_layer(axum_middleware::from_fn(require_admin))
}

/// Flash message and page options carried in the query string
#[derive(Debug, Default, Deserialize)]
pub struct AdminQuery {
    pub notice: Option<String>,
    pub error: Option<String>,
    pub edit: Option<String>,
    pub filter: Option<String>,
}

#[derive(Debug, Serialize)]
struct Flash<'a> {
    notice: Option<&'a str>,
    error: Option<&'a str>,
}

impl<'a> Flash<'a> {
    fn from_query(query: &'a AdminQuery) -> Self {
        Self {
            notice: query.notice.as_deref().filter(|s| !s.is_empty()),
            error: query.error.as_deref().filter(|s| !s.is_empty()),
        }
    }

    fn error(message: &'a str) -> Self {
        Self {
            notice: None,
            error: Some(message),
        }
    }
}

fn with_notice(path: &str, notice: &str) -> Redirect {
    Redirect::to(&format!("{}?notice={}", path, urlencoding::encode(notice)))
}

fn with_error(path: &str, error: &str) -> Redirect {
    Redirect::to(&format!("{}?error={}", path, urlencoding::encode(error)))
}

/// Status for a failed save that re-renders its form
fn failure_status(error: &AdminError) -> StatusCode {
    match error {
        AdminError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AdminError::Upload(_) | AdminError::Backend(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Redirect after a write: notice on success, error otherwise
fn after_write(path: &str, result: Result<&str, AdminError>) -> Result<Response, PageError> {
    match result {
        Ok(notice) => Ok(with_notice(path, notice).into_response()),
        Err(e) => {
            if let Some(expired) = PageError::from_admin(&e) {
                return Err(expired);
            }
            tracing::warn!("Admin write to {} failed: {}", path, e);
            Ok(with_error(path, &e.user_message()).into_response())
        }
    }
}

// ============================================================================
// Login
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// GET /admin/login
async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, PageError> {
    if extract_session(&headers).is_authenticated() {
        return Ok(Redirect::to(DASHBOARD_PATH).into_response());
    }
    let mut context = TeraContext::new();
    context.insert("email", "");
    context.insert("error", &None::<String>);
    Ok(state.render("admin/login.html", &context, LOGIN_PATH)?.into_response())
}

/// POST /admin/login
async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Result<Response, PageError> {
    let (status, message) = match state.admin.login(&form.email, &form.password).await {
        Ok(token) => match session_cookie(&token, state.config.admin.session_hours) {
            Ok(cookie) => {
                return Ok(([(header::SET_COOKIE, cookie)], Redirect::to(DASHBOARD_PATH)).into_response());
            }
            Err(e) => {
                tracing::warn!("Backend issued a token that cannot be stored in a cookie: {}", e);
                (StatusCode::BAD_GATEWAY, "Login failed".to_string())
            }
        },
        Err(e) => (StatusCode::UNAUTHORIZED, e.user_message()),
    };

    let mut context = TeraContext::new();
    context.insert("email", form.email.trim());
    context.insert("error", &Some(message));
    let html = state.render("admin/login.html", &context, LOGIN_PATH)?;
    Ok((status, html).into_response())
}

/// POST /admin/logout
async fn logout() -> Response {
    tracing::info!("Admin signed out");
    ([(header::SET_COOKIE, clear_session_cookie())], Redirect::to(LOGIN_PATH)).into_response()
}

// ============================================================================
// Dashboard
// ============================================================================

/// GET /admin/dashboard
async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AdminQuery>,
) -> Result<Html<String>, PageError> {
    let session = extract_session(&headers);
    let dashboard = match state.admin.dashboard(&session).await {
        Ok(dashboard) => dashboard,
        Err(e) => return Err(PageError::from_admin(&e).unwrap_or_else(|| unexpected(&state, &e))),
    };

    let mut context = TeraContext::new();
    context.insert("dashboard", &dashboard);
    context.insert("flash", &Flash::from_query(&query));
    state.render("admin/dashboard.html", &context, DASHBOARD_PATH)
}

fn unexpected(state: &AppState, error: &AdminError) -> PageError {
    tracing::error!("Admin page failed: {}", error);
    match state.render("error.html", &TeraContext::new(), DASHBOARD_PATH) {
        Ok(Html(html)) => PageError::Internal(html),
        Err(e) => e,
    }
}

// ============================================================================
// Multipart forms
// ============================================================================

/// Text fields, kept image indexes and new files of an admin form
#[derive(Debug, Default)]
struct MultipartForm {
    fields: HashMap<String, String>,
    kept: Vec<usize>,
    files: Vec<UploadFile>,
}

impl MultipartForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AdminError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(unreadable)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "images" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let data = field.bytes().await.map_err(unreadable)?;
                    if !file_name.is_empty() && !data.is_empty() {
                        form.files.push(UploadFile {
                            file_name,
                            content_type,
                            data: data.to_vec(),
                        });
                    }
                }
                "keep_image" => {
                    let value = field.text().await.map_err(unreadable)?;
                    if let Ok(index) = value.trim().parse() {
                        form.kept.push(index);
                    }
                }
                _ => {
                    let value = field.text().await.map_err(unreadable)?;
                    form.fields.insert(name.clone(), value);
                }
            }
        }
        Ok(form)
    }

    fn take(&mut self, key: &str) -> String {
        self.fields.remove(key).unwrap_or_default()
    }

    fn machine_form(&mut self) -> MachineForm {
        MachineForm {
            title: self.take("title"),
            category: self.take("category"),
            purpose: self.take("type"),
            model: self.take("model"),
            year: self.take("year"),
            hours: self.take("hours"),
            condition: self.take("condition"),
            location: self.take("location"),
            status: self.take("status"),
        }
    }

    fn part_form(&mut self) -> PartForm {
        PartForm {
            name: self.take("name"),
            compatibility: self.take("compatibility"),
            condition: self.take("condition"),
        }
    }

    fn blog_form(&mut self) -> BlogForm {
        BlogForm {
            title: self.take("title"),
            content: self.take("content"),
            author: self.take("author"),
        }
    }
}

fn unreadable(e: axum::extract::multipart::MultipartError) -> AdminError {
    tracing::warn!("Failed to read admin form: {}", e);
    AdminError::Invalid("The form could not be read. Check the size of the selected images.".to_string())
}

// ============================================================================
// Machines
// ============================================================================

const MACHINES_PATH: &str = "/admin/machines";

/// Stored image of the machine being edited
#[derive(Debug, Serialize)]
struct ExistingImage {
    index: usize,
    url: String,
    /// Storage id, shown on hover
    public_id: Option<String>,
}

fn existing_images(machine: &Machine) -> Vec<ExistingImage> {
    machine
        .image_source()
        .refs()
        .iter()
        .enumerate()
        .filter_map(|(index, image)| {
            image.resolve().map(|url| ExistingImage {
                index,
                url: url.to_string(),
                public_id: image.public_id().map(str::to_string),
            })
        })
        .collect()
}

/// Machine being edited on the form
struct Editing<'a> {
    id: &'a str,
    machine: &'a Machine,
}

async fn render_machines(
    state: &AppState,
    form: &MachineForm,
    editing: Option<Editing<'_>>,
    flash: Flash<'_>,
    status: StatusCode,
) -> Result<Response, PageError> {
    let (rows, load_failed) = match state.admin.machines().await {
        Ok(rows) => (rows, false),
        Err(e) => {
            tracing::warn!("Failed to load machines: {}", e);
            (Vec::new(), true)
        }
    };
    let categories: Vec<&str> = MachineCategory::ALL.iter().map(|c| c.label()).collect();

    let mut context = TeraContext::new();
    context.insert("rows", &rows);
    context.insert("load_failed", &load_failed);
    context.insert("form", &MachineFormView::from(form));
    context.insert("editing_id", &editing.as_ref().map(|e| e.id));
    context.insert(
        "existing_images",
        &editing.map(|e| existing_images(e.machine)).unwrap_or_default(),
    );
    context.insert("categories", &categories);
    context.insert("statuses", &["Available", "Sold", "Unavailable"]);
    context.insert("max_images", &state.admin.max_images());
    context.insert("flash", &flash);
    let html = state.render("admin/machines.html", &context, MACHINES_PATH)?;
    Ok((status, html).into_response())
}

/// Form values as the template reads them
#[derive(Debug, Serialize)]
struct MachineFormView<'a> {
    title: &'a str,
    category: &'a str,
    purpose: &'a str,
    model: &'a str,
    year: &'a str,
    hours: &'a str,
    condition: &'a str,
    location: &'a str,
    status: &'a str,
}

impl<'a> From<&'a MachineForm> for MachineFormView<'a> {
    fn from(form: &'a MachineForm) -> Self {
        Self {
            title: &form.title,
            category: &form.category,
            purpose: &form.purpose,
            model: &form.model,
            year: &form.year,
            hours: &form.hours,
            condition: &form.condition,
            location: &form.location,
            status: &form.status,
        }
    }
}

/// GET /admin/machines
async fn machines_page(
    State(state): State<AppState>,
    Query(query): Query<AdminQuery>,
) -> Result<Response, PageError> {
    let Some(id) = query.edit.as_deref().filter(|id| !id.is_empty()) else {
        let flash = Flash::from_query(&query);
        return render_machines(&state, &MachineForm::default(), None, flash, StatusCode::OK).await;
    };

    match state.admin.machine(id).await {
        Ok(Some(machine)) => {
            let form = MachineForm::from_machine(&machine);
            let editing = Editing { id, machine: &machine };
            render_machines(&state, &form, Some(editing), Flash::from_query(&query), StatusCode::OK).await
        }
        Ok(None) => {
            let flash = Flash::error("Machine not found");
            render_machines(&state, &MachineForm::default(), None, flash, StatusCode::NOT_FOUND).await
        }
        Err(e) => {
            let message = e.user_message();
            let flash = Flash::error(&message);
            render_machines(&state, &MachineForm::default(), None, flash, StatusCode::BAD_GATEWAY).await
        }
    }
}

/// POST /admin/machines
async fn create_machine(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, PageError> {
    let session = extract_session(&headers);
    let mut upload = match MultipartForm::read(multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            let message = e.user_message();
            let flash = Flash::error(&message);
            return render_machines(&state, &MachineForm::default(), None, flash, failure_status(&e)).await;
        }
    };
    let form = upload.machine_form();

    match state
        .admin
        .save_machine(&session, None, &form, Vec::new(), upload.files)
        .await
    {
        Ok(notice) => Ok(with_notice(MACHINES_PATH, notice).into_response()),
        Err(e) => {
            if let Some(expired) = PageError::from_admin(&e) {
                return Err(expired);
            }
            tracing::warn!("Failed to add machine: {}", e);
            let message = e.user_message();
            render_machines(&state, &form, None, Flash::error(&message), failure_status(&e)).await
        }
    }
}

/// POST /admin/machines/{id}
async fn update_machine(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response, PageError> {
    let session = extract_session(&headers);
    let existing = match state.admin.machine(&id).await {
        Ok(Some(machine)) => machine,
        Ok(None) => return Ok(with_error(MACHINES_PATH, "Machine not found").into_response()),
        Err(e) => return after_write(MACHINES_PATH, Err(e)),
    };
    let editing = || {
        Some(Editing {
            id: &id,
            machine: &existing,
        })
    };

    let mut upload = match MultipartForm::read(multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            let message = e.user_message();
            let form = MachineForm::from_machine(&existing);
            return render_machines(&state, &form, editing(), Flash::error(&message), failure_status(&e)).await;
        }
    };
    let form = upload.machine_form();
    let refs = existing.image_source().refs();
    let kept: Vec<ImageRef> = upload
        .kept
        .iter()
        .filter_map(|&index| refs.get(index).cloned())
        .collect();

    match state
        .admin
        .save_machine(&session, Some(&id), &form, kept, upload.files)
        .await
    {
        Ok(notice) => Ok(with_notice(MACHINES_PATH, notice).into_response()),
        Err(e) => {
            if let Some(expired) = PageError::from_admin(&e) {
                return Err(expired);
            }
            tracing::warn!("Failed to update machine {}: {}", id, e);
            let message = e.user_message();
            render_machines(&state, &form, editing(), Flash::error(&message), failure_status(&e)).await
        }
    }
}

/// POST /admin/machines/{id}/delete
async fn delete_machine(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, PageError> {
    let session = extract_session(&headers);
    let result = state
        .admin
        .delete_machine(&session, &id)
        .await
        .map(|_| "Machine deleted successfully");
    after_write(MACHINES_PATH, result)
}

// ============================================================================
// Spare parts
// ============================================================================

const PARTS_PATH: &str = "/admin/parts";

#[derive(Debug, Serialize)]
struct PartFormView<'a> {
    name: &'a str,
    compatibility: &'a str,
    condition: &'a str,
}

async fn render_parts(
    state: &AppState,
    form: &PartForm,
    flash: Flash<'_>,
    status: StatusCode,
) -> Result<Response, PageError> {
    let (rows, load_failed) = match state.admin.parts().await {
        Ok(rows) => (rows, false),
        Err(e) => {
            tracing::warn!("Failed to load parts: {}", e);
            (Vec::new(), true)
        }
    };

    let mut context = TeraContext::new();
    context.insert("rows", &rows);
    context.insert("load_failed", &load_failed);
    context.insert(
        "form",
        &PartFormView {
            name: &form.name,
            compatibility: &form.compatibility,
            condition: &form.condition,
        },
    );
    context.insert("max_images", &state.admin.max_images());
    context.insert("flash", &flash);
    let html = state.render("admin/parts.html", &context, PARTS_PATH)?;
    Ok((status, html).into_response())
}

/// GET /admin/parts
async fn parts_page(
    State(state): State<AppState>,
    Query(query): Query<AdminQuery>,
) -> Result<Response, PageError> {
    render_parts(&state, &PartForm::default(), Flash::from_query(&query), StatusCode::OK).await
}

/// POST /admin/parts
async fn create_part(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, PageError> {
    let session = extract_session(&headers);
    let mut upload = match MultipartForm::read(multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            let message = e.user_message();
            return render_parts(&state, &PartForm::default(), Flash::error(&message), failure_status(&e)).await;
        }
    };
    let form = upload.part_form();

    match state.admin.save_part(&session, &form, upload.files).await {
        Ok(notice) => Ok(with_notice(PARTS_PATH, notice).into_response()),
        Err(e) => {
            if let Some(expired) = PageError::from_admin(&e) {
                return Err(expired);
            }
            tracing::warn!("Failed to add part: {}", e);
            let message = e.user_message();
            render_parts(&state, &form, Flash::error(&message), failure_status(&e)).await
        }
    }
}

/// POST /admin/parts/{id}/delete
async fn delete_part(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, PageError> {
    let session = extract_session(&headers);
    let result = state
        .admin
        .delete_part(&session, &id)
        .await
        .map(|_| "Part deleted successfully");
    after_write(PARTS_PATH, result)
}

// ============================================================================
// Blogs
// ============================================================================

const BLOGS_PATH: &str = "/admin/blogs";

#[derive(Debug, Serialize)]
struct BlogFormView<'a> {
    title: &'a str,
    content: &'a str,
    author: &'a str,
}

async fn render_blogs(
    state: &AppState,
    form: &BlogForm,
    flash: Flash<'_>,
    status: StatusCode,
) -> Result<Response, PageError> {
    let (rows, load_failed) = match state.admin.blogs().await {
        Ok(rows) => (rows, false),
        Err(e) => {
            tracing::warn!("Failed to load blogs: {}", e);
            (Vec::new(), true)
        }
    };

    let mut context = TeraContext::new();
    context.insert("rows", &rows);
    context.insert("load_failed", &load_failed);
    context.insert(
        "form",
        &BlogFormView {
            title: &form.title,
            content: &form.content,
            author: &form.author,
        },
    );
    context.insert("max_images", &state.admin.max_images());
    context.insert("flash", &flash);
    let html = state.render("admin/blogs.html", &context, BLOGS_PATH)?;
    Ok((status, html).into_response())
}

/// GET /admin/blogs
async fn blogs_page(
    State(state): State<AppState>,
    Query(query): Query<AdminQuery>,
) -> Result<Response, PageError> {
    render_blogs(&state, &BlogForm::default(), Flash::from_query(&query), StatusCode::OK).await
}

/// POST /admin/blogs
async fn create_blog(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, PageError> {
    let session = extract_session(&headers);
    let mut upload = match MultipartForm::read(multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            let message = e.user_message();
            return render_blogs(&state, &BlogForm::default(), Flash::error(&message), failure_status(&e)).await;
        }
    };
    let form = upload.blog_form();

    match state.admin.save_blog(&session, &form, upload.files).await {
        Ok(notice) => Ok(with_notice(BLOGS_PATH, notice).into_response()),
        Err(e) => {
            if let Some(expired) = PageError::from_admin(&e) {
                return Err(expired);
            }
            tracing::warn!("Failed to add blog: {}", e);
            let message = e.user_message();
            render_blogs(&state, &form, Flash::error(&message), failure_status(&e)).await
        }
    }
}

/// POST /admin/blogs/{id}/delete
async fn delete_blog(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, PageError> {
    let session = extract_session(&headers);
    let result = state
        .admin
        .delete_blog(&session, &id)
        .await
        .map(|_| "Blog deleted successfully");
    after_write(BLOGS_PATH, result)
}

// ============================================================================
// Enquiries
// ============================================================================

const ENQUIRIES_PATH: &str = "/admin/enquiries";

/// GET /admin/enquiries
async fn enquiries_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AdminQuery>,
) -> Result<Response, PageError> {
    let session = extract_session(&headers);
    let filter = EnquiryFilter::from_key(query.filter.as_deref().unwrap_or("all"));

    let mut context = TeraContext::new();
    let status = match state.admin.enquiries(&session, filter).await {
        Ok(page) => {
            context.insert("page", &page);
            context.insert("flash", &Flash::from_query(&query));
            StatusCode::OK
        }
        Err(e) => {
            if let Some(expired) = PageError::from_admin(&e) {
                return Err(expired);
            }
            tracing::warn!("Failed to load enquiries: {}", e);
            context.insert("page", &None::<()>);
            context.insert("flash", &Flash::error("Failed to load enquiries"));
            StatusCode::BAD_GATEWAY
        }
    };
    let html = state.render("admin/enquiries.html", &context, ENQUIRIES_PATH)?;
    Ok((status, html).into_response())
}

/// POST /admin/enquiries/mark-read
async fn mark_enquiries_read(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, PageError> {
    let session = extract_session(&headers);
    let result = state
        .admin
        .mark_enquiries_read(&session)
        .await
        .map(|_| "All enquiries marked as read");
    after_write(ENQUIRIES_PATH, result)
}

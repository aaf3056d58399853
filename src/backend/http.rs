//! HTTP client for the backend REST API.
//!
//! Handles bearer authentication, timeouts, status classification and
//! JSON / multipart request bodies.

use async_trait::async_trait;
use reqwest::{multipart, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{AuthSession, Backend, BackendError, BackendResult, MachineFilter, UploadFile};
use crate::config::BackendConfig;
use crate::models::{
    BlogPost, CreateBlogInput, CreatePartInput, DashboardCounts, Enquiry, ImageRef, Machine, Part,
};

/// Multipart field the upload endpoint reads files from
const UPLOAD_FIELD: &str = "images";

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Backend reached over HTTP
#[derive(Clone)]
pub struct HttpBackend {
    inner: Client,
    /// Origin of the API without trailing slash, e.g. "http://127.0.0.1:5000"
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> BackendResult<Self> {
        let inner = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn boxed(config: &BackendConfig) -> BackendResult<Arc<dyn Backend>> {
        Ok(Arc::new(Self::new(config)?))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.inner.request(method, format!("{}{}", self.base_url, path))
    }

    /// Attach the bearer token; a session without one never reaches the wire
    fn authorized(
        &self,
        method: Method,
        path: &str,
        session: &AuthSession,
    ) -> BackendResult<RequestBuilder> {
        let token = session
            .token()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BackendError::Unauthorized("Token missing".to_string()))?;
        Ok(self.request(method, path).bearer_auth(token))
    }

    async fn send(&self, builder: RequestBuilder, label: &str) -> BackendResult<Response> {
        debug!("backend {}", label);
        let response = builder.send().await.map_err(Self::classify_error)?;
        Self::check_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        label: &str,
    ) -> BackendResult<T> {
        let response = self.send(builder, label).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Decode(format!("{label}: {e}")))
    }

    /// Map non-success statuses to typed errors, reading `{ "error": ... }` bodies
    async fn check_status(response: Response) -> BackendResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error.or(b.message))
            .unwrap_or(body);

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
            StatusCode::NOT_FOUND => BackendError::NotFound,
            _ => BackendError::Status {
                status: status.as_u16(),
                message,
            },
        })
    }

    fn classify_error(e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Transport(format!("request timed out: {e}"))
        } else if e.is_connect() {
            BackendError::Transport(format!("connection failed: {e}"))
        } else if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else {
            BackendError::Transport(e.to_string())
        }
    }

    fn machines_path(filter: &MachineFilter) -> String {
        let mut params = Vec::new();
        if let Some(purpose) = filter.purpose {
            params.push(format!("type={}", urlencoding::encode(&purpose.to_string())));
        }
        if let Some(category) = filter.category {
            params.push(format!("category={}", urlencoding::encode(category.label())));
        }
        if params.is_empty() {
            "/api/machines".to_string()
        } else {
            format!("/api/machines?{}", params.join("&"))
        }
    }
}

/// Treat 404 on a single-entity read as absence
fn optional<T>(result: BackendResult<T>) -> BackendResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(BackendError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn login(&self, email: &str, password: &str) -> BackendResult<String> {
        let body = serde_json::json!({ "email": email, "password": password });
        let builder = self.request(Method::POST, "/admin/login").json(&body);
        let response: LoginResponse = self.send_json(builder, "POST /admin/login").await?;
        Ok(response.token)
    }

    async fn list_machines(&self, filter: &MachineFilter) -> BackendResult<Vec<Machine>> {
        let path = Self::machines_path(filter);
        let builder = self.request(Method::GET, &path);
        self.send_json(builder, &format!("GET {path}")).await
    }

    async fn get_machine(&self, id: &str) -> BackendResult<Option<Machine>> {
        let path = format!("/api/machines/{}", urlencoding::encode(id));
        let builder = self.request(Method::GET, &path);
        optional(self.send_json(builder, &format!("GET {path}")).await)
    }

    async fn create_machine(&self, session: &AuthSession, machine: &Machine) -> BackendResult<()> {
        let builder = self
            .authorized(Method::POST, "/admin/machines", session)?
            .json(machine);
        self.send(builder, "POST /admin/machines").await.map(|_| ())
    }

    async fn update_machine(
        &self,
        session: &AuthSession,
        id: &str,
        machine: &Machine,
    ) -> BackendResult<()> {
        let path = format!("/admin/machines/{}", urlencoding::encode(id));
        let builder = self.authorized(Method::PUT, &path, session)?.json(machine);
        self.send(builder, &format!("PUT {path}")).await.map(|_| ())
    }

    async fn delete_machine(&self, session: &AuthSession, id: &str) -> BackendResult<()> {
        let path = format!("/admin/machines/{}", urlencoding::encode(id));
        let builder = self.authorized(Method::DELETE, &path, session)?;
        self.send(builder, &format!("DELETE {path}")).await.map(|_| ())
    }

    async fn list_parts(&self) -> BackendResult<Vec<Part>> {
        let builder = self.request(Method::GET, "/api/parts");
        self.send_json(builder, "GET /api/parts").await
    }

    async fn create_part(&self, session: &AuthSession, part: &CreatePartInput) -> BackendResult<()> {
        let builder = self.authorized(Method::POST, "/admin/parts", session)?.json(part);
        self.send(builder, "POST /admin/parts").await.map(|_| ())
    }

    async fn delete_part(&self, session: &AuthSession, id: &str) -> BackendResult<()> {
        let path = format!("/admin/parts/{}", urlencoding::encode(id));
        let builder = self.authorized(Method::DELETE, &path, session)?;
        self.send(builder, &format!("DELETE {path}")).await.map(|_| ())
    }

    async fn list_blogs(&self) -> BackendResult<Vec<BlogPost>> {
        let builder = self.request(Method::GET, "/api/blogs");
        self.send_json(builder, "GET /api/blogs").await
    }

    async fn get_blog(&self, id: &str) -> BackendResult<Option<BlogPost>> {
        let path = format!("/api/blogs/{}", urlencoding::encode(id));
        let builder = self.request(Method::GET, &path);
        optional(self.send_json(builder, &format!("GET {path}")).await)
    }

    async fn create_blog(&self, session: &AuthSession, blog: &CreateBlogInput) -> BackendResult<()> {
        let builder = self.authorized(Method::POST, "/admin/blogs", session)?.json(blog);
        self.send(builder, "POST /admin/blogs").await.map(|_| ())
    }

    async fn delete_blog(&self, session: &AuthSession, id: &str) -> BackendResult<()> {
        let path = format!("/admin/blogs/{}", urlencoding::encode(id));
        let builder = self.authorized(Method::DELETE, &path, session)?;
        self.send(builder, &format!("DELETE {path}")).await.map(|_| ())
    }

    async fn submit_enquiry(&self, enquiry: &Enquiry) -> BackendResult<()> {
        let builder = self.request(Method::POST, "/api/enquiry").json(enquiry);
        self.send(builder, "POST /api/enquiry").await.map(|_| ())
    }

    async fn list_enquiries(&self, session: &AuthSession) -> BackendResult<Vec<Enquiry>> {
        let builder = self.authorized(Method::GET, "/admin/enquiries", session)?;
        self.send_json(builder, "GET /admin/enquiries").await
    }

    async fn mark_enquiries_read(&self, session: &AuthSession) -> BackendResult<()> {
        let builder = self
            .authorized(Method::POST, "/admin/enquiries/mark-read", session)?
            .json(&serde_json::json!({}));
        self.send(builder, "POST /admin/enquiries/mark-read")
            .await
            .map(|_| ())
    }

    async fn dashboard_counts(&self, session: &AuthSession) -> BackendResult<DashboardCounts> {
        let builder = self.authorized(Method::GET, "/admin/dashboard/counts", session)?;
        self.send_json(builder, "GET /admin/dashboard/counts").await
    }

    /// Multipart forms cannot be cloned, so uploads are sent once
    async fn upload_images(
        &self,
        session: &AuthSession,
        files: Vec<UploadFile>,
    ) -> BackendResult<Vec<ImageRef>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let mut form = multipart::Form::new();
        for file in files {
            let part = multipart::Part::bytes(file.data)
                .file_name(file.file_name)
                .mime_str(&file.content_type)
                .map_err(|e| BackendError::Decode(format!("invalid content type: {e}")))?;
            form = form.part(UPLOAD_FIELD, part);
        }

        let builder = self
            .authorized(Method::POST, "/admin/upload", session)?
            .multipart(form);
        self.send_json(builder, "POST /admin/upload (multipart)").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MachineCategory, Purpose};
    use axum::{
        extract::{Multipart, Path, RawQuery},
        http::{header, HeaderMap, StatusCode as AxumStatus},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;

    /// Serve `router` on an ephemeral port and return a client pointed at it
    async fn stub_backend(router: Router) -> HttpBackend {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let config = BackendConfig {
            base_url: format!("http://{addr}/"),
            timeout_secs: 5,
            ..BackendConfig::default()
        };
        HttpBackend::new(&config).unwrap()
    }

    fn bearer(headers: &HeaderMap) -> Option<String> {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    #[tokio::test]
    async fn test_bearer_token_sent_on_admin_calls() {
        let router = Router::new().route(
            "/admin/dashboard/counts",
            get(|headers: HeaderMap| async move {
                if bearer(&headers).as_deref() == Some("Bearer tok-1") {
                    (AxumStatus::OK, Json(json!({"machines": 4, "parts": 1, "blogs": 2, "enquiries": 7})))
                } else {
                    (AxumStatus::UNAUTHORIZED, Json(json!({"error": "Token missing"})))
                }
            }),
        );
        let backend = stub_backend(router).await;

        let counts = backend
            .dashboard_counts(&AuthSession::with_token("tok-1"))
            .await
            .unwrap();
        assert_eq!(counts.machines, 4);
        assert_eq!(counts.enquiry_total(), 7);

        let err = backend
            .dashboard_counts(&AuthSession::with_token("stale"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized(ref m) if m == "Token missing"));
    }

    #[tokio::test]
    async fn test_missing_token_short_circuits() {
        let backend = stub_backend(Router::new()).await;
        let err = backend.list_enquiries(&AuthSession::new()).await.unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_detail_404_is_absent() {
        let router = Router::new()
            .route(
                "/api/blogs/{id}",
                get(|Path(id): Path<String>| async move {
                    if id == "known" {
                        (AxumStatus::OK, Json(json!({"_id": "known", "title": "Hello"})))
                    } else {
                        (AxumStatus::NOT_FOUND, Json(json!({"error": "Blog not found"})))
                    }
                }),
            )
            .route(
                "/api/machines/{id}",
                get(|| async { (AxumStatus::NOT_FOUND, Json(json!({"error": "Machine not found"}))) }),
            );
        let backend = stub_backend(router).await;

        assert_eq!(backend.get_blog("known").await.unwrap().unwrap().title, "Hello");
        assert!(backend.get_blog("missing").await.unwrap().is_none());
        assert!(backend.get_machine("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_listing_query_and_server_errors() {
        let router = Router::new()
            .route(
                "/api/machines",
                get(|RawQuery(query): RawQuery| async move {
                    Json(json!([{"_id": "m1", "title": query.unwrap_or_default()}]))
                }),
            )
            .route(
                "/api/enquiry",
                post(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "database down") }),
            );
        let backend = stub_backend(router).await;

        let filter = MachineFilter::all()
            .with_purpose(Purpose::Rental)
            .with_category(MachineCategory::BackhoeLoader);
        let machines = backend.list_machines(&filter).await.unwrap();
        assert_eq!(machines[0].title, "type=Rental&category=Backhoe%20Loader");

        let err = backend.submit_enquiry(&Enquiry::default()).await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 500, ref message } if message == "database down"));
    }

    #[tokio::test]
    async fn test_login_returns_token_or_backend_error() {
        let router = Router::new().route(
            "/admin/login",
            post(|Json(body): Json<serde_json::Value>| async move {
                if body["password"] == "secret" {
                    (AxumStatus::OK, Json(json!({"token": "jwt-123"})))
                } else {
                    (AxumStatus::UNAUTHORIZED, Json(json!({"error": "Invalid credentials"})))
                }
            }),
        );
        let backend = stub_backend(router).await;

        assert_eq!(backend.login("a@b.c", "secret").await.unwrap(), "jwt-123");
        let err = backend.login("a@b.c", "nope").await.unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized(ref m) if m == "Invalid credentials"));
    }

    #[tokio::test]
    async fn test_upload_sends_images_field() {
        let router = Router::new().route(
            "/admin/upload",
            post(|mut multipart: Multipart| async move {
                let mut refs = Vec::new();
                while let Some(field) = multipart.next_field().await.unwrap() {
                    let name = field.name().unwrap_or("").to_string();
                    let file = field.file_name().unwrap_or("").to_string();
                    let kind = field.content_type().unwrap_or("").to_string();
                    refs.push(json!({
                        "secure_url": format!("https://cdn/{name}/{file}"),
                        "public_id": kind,
                    }));
                }
                Json(json!(refs))
            }),
        );
        let backend = stub_backend(router).await;

        let files = vec![
            UploadFile {
                file_name: "a.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
                data: vec![1, 2, 3],
            },
            UploadFile {
                file_name: "b.png".to_string(),
                content_type: "image/png".to_string(),
                data: vec![4],
            },
        ];
        let refs = backend
            .upload_images(&AuthSession::with_token("t"), files)
            .await
            .unwrap();

        let urls: Vec<_> = refs.iter().filter_map(ImageRef::resolve).collect();
        assert_eq!(urls, vec!["https://cdn/images/a.jpg", "https://cdn/images/b.png"]);
        assert_eq!(refs[1].public_id(), Some("image/png"));
    }
}

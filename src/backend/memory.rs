//! In-process backend
//!
//! Keeps records in memory behind a `tokio::sync::RwLock`. Used when the site
//! runs without the REST API (`backend.driver: memory`) and by the tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuthSession, Backend, BackendError, BackendResult, MachineFilter, UploadFile};
use crate::models::{
    BlogPost, CreateBlogInput, CreatePartInput, DashboardCounts, Enquiry, ImageRef, ImageSource,
    Machine, MachineCategory, MachineStatus, Part, Purpose,
};

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@heavyhorizon.in";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Default)]
struct Store {
    machines: Vec<Machine>,
    parts: Vec<Part>,
    blogs: Vec<BlogPost>,
    enquiries: Vec<Enquiry>,
    tokens: Vec<String>,
}

pub struct MemoryBackend {
    store: RwLock<Store>,
    admin_email: String,
    admin_password: String,
    fail_reads: AtomicBool,
    fail_enquiries: AtomicBool,
    fail_uploads: AtomicBool,
    enquiry_calls: AtomicUsize,
}

/// Identifier in the backend's format: creation seconds then random hex
fn new_id() -> String {
    let secs = chrono::Utc::now().timestamp().max(0) as u32;
    let random = Uuid::new_v4().simple().to_string();
    format!("{:08x}{}", secs, &random[..16])
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Empty store with the default admin account
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store::default()),
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            fail_reads: AtomicBool::new(false),
            fail_enquiries: AtomicBool::new(false),
            fail_uploads: AtomicBool::new(false),
            enquiry_calls: AtomicUsize::new(0),
        }
    }

    /// Store pre-filled with a few listings, a part and a blog post
    pub fn with_sample_data() -> Self {
        let mut backend = Self::new();
        {
            let store = backend.store.get_mut();
            store.machines = sample_machines();
            store.parts = vec![Part {
                id: "65a1c2d3e4f5a6b7c8d9e0f1".to_string(),
                name: "Bucket Teeth Set".to_string(),
                compatibility: "JCB 3DX, JCB 3DX Super".to_string(),
                condition: "Good condition, lightly used".to_string(),
                images: ImageSource::None,
            }];
            store.blogs = vec![BlogPost {
                id: "65a1c2d3e4f5a6b7c8d9e0f2".to_string(),
                title: "Choosing between a backhoe loader and an excavator".to_string(),
                content: "Both machines dig, but they suit different sites.\n## Backhoe loaders\nVersatile and road-mobile.\n## Excavators\nBuilt for heavy, continuous earthwork.".to_string(),
                ..BlogPost::default()
            }];
        }
        backend
    }

    /// Make public catalog reads fail until switched back
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make enquiry persistence fail until switched back
    pub fn set_fail_enquiries(&self, fail: bool) {
        self.fail_enquiries.store(fail, Ordering::SeqCst);
    }

    /// Make uploads fail until switched back
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Number of enquiry submissions attempted, failed ones included
    pub fn enquiry_calls(&self) -> usize {
        self.enquiry_calls.load(Ordering::SeqCst)
    }

    /// Invalidate every issued token, as an expired JWT would be
    pub async fn revoke_sessions(&self) {
        self.store.write().await.tokens.clear();
    }

    pub async fn insert_machine(&self, machine: Machine) -> String {
        let mut machine = machine;
        if machine.id.is_empty() {
            machine.id = new_id();
        }
        let id = machine.id.clone();
        self.store.write().await.machines.push(machine);
        id
    }

    pub async fn insert_blog(&self, blog: BlogPost) -> String {
        let mut blog = blog;
        if blog.id.is_empty() {
            blog.id = new_id();
        }
        let id = blog.id.clone();
        self.store.write().await.blogs.push(blog);
        id
    }

    pub async fn enquiries(&self) -> Vec<Enquiry> {
        self.store.read().await.enquiries.clone()
    }

    pub async fn machines(&self) -> Vec<Machine> {
        self.store.read().await.machines.clone()
    }

    fn check_reads(&self) -> BackendResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("connection refused".to_string()));
        }
        Ok(())
    }

    async fn authorize(&self, session: &AuthSession) -> BackendResult<()> {
        let token = session
            .token()
            .ok_or_else(|| BackendError::Unauthorized("Token missing".to_string()))?;
        if self.store.read().await.tokens.iter().any(|t| t == token) {
            Ok(())
        } else {
            Err(BackendError::Unauthorized("Invalid token".to_string()))
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn login(&self, email: &str, password: &str) -> BackendResult<String> {
        if email != self.admin_email || password != self.admin_password {
            return Err(BackendError::Unauthorized("Invalid credentials".to_string()));
        }
        let token = Uuid::new_v4().simple().to_string();
        self.store.write().await.tokens.push(token.clone());
        Ok(token)
    }

    async fn list_machines(&self, filter: &MachineFilter) -> BackendResult<Vec<Machine>> {
        self.check_reads()?;
        let store = self.store.read().await;
        Ok(store
            .machines
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    async fn get_machine(&self, id: &str) -> BackendResult<Option<Machine>> {
        self.check_reads()?;
        let store = self.store.read().await;
        Ok(store.machines.iter().find(|m| m.id == id).cloned())
    }

    async fn create_machine(&self, session: &AuthSession, machine: &Machine) -> BackendResult<()> {
        self.authorize(session).await?;
        let mut machine = machine.clone();
        machine.id = new_id();
        self.store.write().await.machines.push(machine);
        Ok(())
    }

    async fn update_machine(
        &self,
        session: &AuthSession,
        id: &str,
        machine: &Machine,
    ) -> BackendResult<()> {
        self.authorize(session).await?;
        let mut store = self.store.write().await;
        let existing = store
            .machines
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(BackendError::NotFound)?;
        *existing = Machine {
            id: id.to_string(),
            ..machine.clone()
        };
        Ok(())
    }

    async fn delete_machine(&self, session: &AuthSession, id: &str) -> BackendResult<()> {
        self.authorize(session).await?;
        let mut store = self.store.write().await;
        let before = store.machines.len();
        store.machines.retain(|m| m.id != id);
        if store.machines.len() == before {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }

    async fn list_parts(&self) -> BackendResult<Vec<Part>> {
        self.check_reads()?;
        Ok(self.store.read().await.parts.clone())
    }

    async fn create_part(&self, session: &AuthSession, part: &CreatePartInput) -> BackendResult<()> {
        self.authorize(session).await?;
        let part = Part {
            id: new_id(),
            name: part.name.clone(),
            compatibility: part.compatibility.clone(),
            condition: part.condition.clone(),
            images: ImageSource::List(part.images.clone()),
        };
        self.store.write().await.parts.push(part);
        Ok(())
    }

    async fn delete_part(&self, session: &AuthSession, id: &str) -> BackendResult<()> {
        self.authorize(session).await?;
        let mut store = self.store.write().await;
        let before = store.parts.len();
        store.parts.retain(|p| p.id != id);
        if store.parts.len() == before {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }

    async fn list_blogs(&self) -> BackendResult<Vec<BlogPost>> {
        self.check_reads()?;
        Ok(self.store.read().await.blogs.clone())
    }

    async fn get_blog(&self, id: &str) -> BackendResult<Option<BlogPost>> {
        self.check_reads()?;
        let store = self.store.read().await;
        Ok(store.blogs.iter().find(|b| b.id == id).cloned())
    }

    async fn create_blog(&self, session: &AuthSession, blog: &CreateBlogInput) -> BackendResult<()> {
        self.authorize(session).await?;
        let post = BlogPost {
            id: new_id(),
            title: blog.title.clone(),
            content: blog.content.clone(),
            author: blog.author.clone(),
            images: ImageSource::List(blog.images.clone()),
            featured_image: blog
                .featured_image
                .clone()
                .map(|url| ImageSource::Single(ImageRef::Url(url)))
                .unwrap_or_default(),
            created_at: None,
        };
        self.store.write().await.blogs.push(post);
        Ok(())
    }

    async fn delete_blog(&self, session: &AuthSession, id: &str) -> BackendResult<()> {
        self.authorize(session).await?;
        let mut store = self.store.write().await;
        let before = store.blogs.len();
        store.blogs.retain(|b| b.id != id);
        if store.blogs.len() == before {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }

    async fn submit_enquiry(&self, enquiry: &Enquiry) -> BackendResult<()> {
        self.enquiry_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_enquiries.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("connection refused".to_string()));
        }
        let mut enquiry = enquiry.clone();
        enquiry.id = new_id();
        enquiry.read = false;
        self.store.write().await.enquiries.push(enquiry);
        Ok(())
    }

    async fn list_enquiries(&self, session: &AuthSession) -> BackendResult<Vec<Enquiry>> {
        self.authorize(session).await?;
        Ok(self.store.read().await.enquiries.clone())
    }

    async fn mark_enquiries_read(&self, session: &AuthSession) -> BackendResult<()> {
        self.authorize(session).await?;
        for enquiry in self.store.write().await.enquiries.iter_mut() {
            enquiry.read = true;
        }
        Ok(())
    }

    async fn dashboard_counts(&self, session: &AuthSession) -> BackendResult<DashboardCounts> {
        self.authorize(session).await?;
        let store = self.store.read().await;
        Ok(DashboardCounts {
            machines: store.machines.len() as u64,
            parts: store.parts.len() as u64,
            blogs: store.blogs.len() as u64,
            enquiries: store.enquiries.len() as u64,
            total_enquiries: None,
        })
    }

    async fn upload_images(
        &self,
        session: &AuthSession,
        files: Vec<UploadFile>,
    ) -> BackendResult<Vec<ImageRef>> {
        self.authorize(session).await?;
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(BackendError::Status {
                status: 500,
                message: "Upload failed".to_string(),
            });
        }
        Ok(files
            .into_iter()
            .map(|file| {
                let public_id = format!("heavy-horizon/{}", Uuid::new_v4().simple());
                let url = format!(
                    "https://via.placeholder.com/800x600?text={}",
                    urlencoding::encode(&file.file_name)
                );
                ImageRef::uploaded(url, public_id)
            })
            .collect())
    }
}

#[allow(clippy::too_many_arguments)]
fn sample_machine(
    id: &str,
    title: &str,
    category: MachineCategory,
    purpose: Purpose,
    model: &str,
    year: u32,
    hours: u32,
    code: &str,
) -> Machine {
    Machine {
        id: id.to_string(),
        title: title.to_string(),
        category,
        kind: Some(purpose),
        model: model.to_string(),
        year,
        hours,
        condition: "<p>Well maintained, ready for work.</p>".to_string(),
        location: "Chennai".to_string(),
        machine_code: Some(code.to_string()),
        status: MachineStatus::Available,
        images: ImageSource::List(Vec::new()),
        ..Machine::default()
    }
}

fn sample_machines() -> Vec<Machine> {
    vec![
        sample_machine(
            "65a1c2d3e4f5a6b7c8d9e001",
            "JCB 3DX",
            MachineCategory::BackhoeLoader,
            Purpose::Rental,
            "3DX Super",
            2021,
            3200,
            "BL-0001",
        ),
        sample_machine(
            "65a1c2d3e4f5a6b7c8d9e002",
            "CAT 320D",
            MachineCategory::Excavator,
            Purpose::Rental,
            "320D2",
            2019,
            5400,
            "EXE-0001",
        ),
        sample_machine(
            "65a1c2d3e4f5a6b7c8d9e003",
            "JCB 3DX with Breaker",
            MachineCategory::BackhoeBreaker,
            Purpose::Rental,
            "3DX Xtra",
            2020,
            4100,
            "BLB-0001",
        ),
        sample_machine(
            "65a1c2d3e4f5a6b7c8d9e004",
            "Komatsu PC210",
            MachineCategory::Excavator,
            Purpose::Sales,
            "PC210-10M0",
            2018,
            7800,
            "EXE-0002",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn admin(backend: &MemoryBackend) -> AuthSession {
        let token = backend
            .login(DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD)
            .await
            .unwrap();
        AuthSession::with_token(token)
    }

    #[test]
    fn test_new_id_embeds_creation_time() {
        let id = new_id();
        assert_eq!(id.len(), 24);
        let ts = crate::models::id_timestamp(&id).unwrap();
        assert!((chrono::Utc::now() - ts).num_seconds().abs() < 5);
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let backend = MemoryBackend::new();
        let err = backend.login(DEFAULT_ADMIN_EMAIL, "wrong").await.unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_admin_calls_require_issued_token() {
        let backend = MemoryBackend::with_sample_data();
        let forged = AuthSession::with_token("forged");
        assert!(matches!(
            backend.dashboard_counts(&forged).await,
            Err(BackendError::Unauthorized(_))
        ));

        let session = admin(&backend).await;
        let counts = backend.dashboard_counts(&session).await.unwrap();
        assert_eq!(counts.machines, 4);
        assert_eq!(counts.parts, 1);
        assert_eq!(counts.blogs, 1);

        backend.revoke_sessions().await;
        assert!(backend.list_enquiries(&session).await.is_err());
    }

    #[tokio::test]
    async fn test_machine_crud() {
        let backend = MemoryBackend::new();
        let session = admin(&backend).await;

        let machine = Machine {
            title: "Hyundai R210".to_string(),
            category: MachineCategory::Excavator,
            kind: Some(Purpose::Sales),
            ..Machine::default()
        };
        backend.create_machine(&session, &machine).await.unwrap();

        let sales = backend
            .list_machines(&MachineFilter::all().with_purpose(Purpose::Sales))
            .await
            .unwrap();
        assert_eq!(sales.len(), 1);
        let id = sales[0].id.clone();

        let updated = Machine {
            year: 2017,
            ..sales[0].clone()
        };
        backend.update_machine(&session, &id, &updated).await.unwrap();
        assert_eq!(backend.get_machine(&id).await.unwrap().unwrap().year, 2017);

        backend.delete_machine(&session, &id).await.unwrap();
        assert!(backend.get_machine(&id).await.unwrap().is_none());
        assert!(matches!(
            backend.delete_machine(&session, &id).await,
            Err(BackendError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_enquiry_failure_switch() {
        let backend = MemoryBackend::new();
        backend.set_fail_enquiries(true);
        assert!(backend.submit_enquiry(&Enquiry::default()).await.is_err());
        backend.set_fail_enquiries(false);
        backend.submit_enquiry(&Enquiry::default()).await.unwrap();

        assert_eq!(backend.enquiry_calls(), 2);
        assert_eq!(backend.enquiries().await.len(), 1);

        let session = admin(&backend).await;
        backend.mark_enquiries_read(&session).await.unwrap();
        assert!(backend.enquiries().await.iter().all(|e| e.read));
    }
}

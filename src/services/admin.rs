//! Admin CMS operations
//!
//! Saves follow one order: validate the form, upload new images, then create
//! or update the entity. A failed upload aborts the save before anything is
//! written.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::backend::{AuthSession, Backend, BackendError, MachineFilter, UploadFile};
use crate::config::UploadConfig;
use crate::models::image::PLACEHOLDER_THUMBNAIL;
use crate::models::{
    first_image_url, next_machine_code, BlogPost, CreateBlogInput, CreatePartInput,
    DashboardCounts, Enquiry, EnquiryType, ImageRef, Machine, MachineCategory, MachineStatus,
    Part, Purpose,
};
use crate::services::blog::{created_instant, enquiry_date};
use crate::services::whatsapp;

/// Enquiries shown on the dashboard
const RECENT_ENQUIRIES: usize = 5;
/// Characters of the message shown in the enquiry table
const MESSAGE_PREVIEW_CHARS: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("{0}")]
    Invalid(String),

    #[error("Image upload failed: {0}")]
    Upload(BackendError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl AdminError {
    /// The backend rejected the session token
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Backend(BackendError::Unauthorized(_)) | Self::Upload(BackendError::Unauthorized(_))
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Invalid(message) => message.clone(),
            Self::Upload(e) => format!("Image upload failed: {}", e.user_message()),
            Self::Backend(e) => e.user_message(),
        }
    }
}

pub type AdminResult<T> = Result<T, AdminError>;

/// Reject files the site would not accept before they reach the backend
pub fn check_uploads(config: &UploadConfig, files: &[UploadFile]) -> AdminResult<()> {
    for file in files {
        if !config.is_type_allowed(&file.content_type) {
            return Err(AdminError::Invalid(format!(
                "File type not allowed: {} ({})",
                file.file_name, file.content_type
            )));
        }
        if file.data.len() as u64 > config.max_file_size {
            return Err(AdminError::Invalid(format!(
                "File too large: {} (max {} MB)",
                file.file_name,
                config.max_file_size / (1024 * 1024)
            )));
        }
    }
    Ok(())
}

/// Editor output that counts as no description at all
fn is_blank_description(html: &str) -> bool {
    let html = html.trim();
    html.is_empty() || html == "<p><br></p>"
}

fn required(value: &str, label: &str) -> AdminResult<()> {
    if value.trim().is_empty() {
        return Err(AdminError::Invalid(format!("{} is required", label)));
    }
    Ok(())
}

fn coerce_number(value: &str) -> u32 {
    value.trim().parse().unwrap_or(0)
}

/// Fields of the machine add/edit form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MachineForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, rename = "type")]
    pub purpose: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub hours: String,
    /// Description HTML
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub status: String,
}

impl MachineForm {
    pub fn from_machine(machine: &Machine) -> Self {
        Self {
            title: machine.title.clone(),
            category: machine.category.label().to_string(),
            purpose: machine.purpose().unwrap_or(Purpose::Rental).to_string(),
            model: machine.model.clone(),
            year: machine.year.to_string(),
            hours: machine.hours.to_string(),
            condition: machine.condition.clone(),
            location: machine.location.clone(),
            status: machine.status.to_string(),
        }
    }

    /// Validated machine with `images`, code not yet assigned
    pub fn to_machine(&self, images: Vec<ImageRef>) -> AdminResult<Machine> {
        if is_blank_description(&self.condition) {
            return Err(AdminError::Invalid("Description is mandatory".to_string()));
        }
        required(&self.title, "Brand / title")?;
        required(&self.model, "Model")?;
        required(&self.location, "Location")?;
        let category: MachineCategory = self
            .category
            .parse()
            .map_err(|_| AdminError::Invalid("Please select a category".to_string()))?;
        let purpose: Purpose = self.purpose.parse().unwrap_or(Purpose::Rental);

        Ok(Machine {
            title: self.title.trim().to_string(),
            category,
            kind: Some(purpose),
            model: self.model.trim().to_string(),
            year: coerce_number(&self.year),
            hours: coerce_number(&self.hours),
            condition: self.condition.clone(),
            location: self.location.trim().to_string(),
            status: self.status.parse().unwrap_or(MachineStatus::Available),
            images: images.into(),
            ..Machine::default()
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub compatibility: String,
    #[serde(default)]
    pub condition: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlogForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: String,
}

/// Row of the machine table
#[derive(Debug, Clone, Serialize)]
pub struct MachineRow {
    pub id: String,
    pub thumbnail: String,
    pub title: String,
    pub category: String,
    pub purpose: String,
    pub year: u32,
    pub hours: u32,
    pub status: String,
    pub code: String,
}

impl From<&Machine> for MachineRow {
    fn from(machine: &Machine) -> Self {
        Self {
            id: machine.id.clone(),
            thumbnail: first_image_url(machine.image_source(), PLACEHOLDER_THUMBNAIL),
            title: machine.title.clone(),
            category: machine.category.label().to_string(),
            purpose: machine.purpose().map(|p| p.to_string()).unwrap_or_default(),
            year: machine.year,
            hours: machine.hours,
            status: machine.status.to_string(),
            code: machine.code().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PartRow {
    pub id: String,
    pub thumbnail: String,
    pub name: String,
    pub compatibility: String,
    pub condition: String,
}

impl From<&Part> for PartRow {
    fn from(part: &Part) -> Self {
        Self {
            id: part.id.clone(),
            thumbnail: first_image_url(&part.images, PLACEHOLDER_THUMBNAIL),
            name: part.name.clone(),
            compatibility: part.compatibility.clone(),
            condition: part.condition.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BlogRow {
    pub id: String,
    pub thumbnail: String,
    pub title: String,
    pub author: String,
    pub image_count: usize,
}

impl From<&BlogPost> for BlogRow {
    fn from(post: &BlogPost) -> Self {
        Self {
            id: post.id.clone(),
            thumbnail: first_image_url(post.image_source(), PLACEHOLDER_THUMBNAIL),
            title: post.title.clone(),
            author: post.author.clone(),
            image_count: post.image_urls().len(),
        }
    }
}

/// Tab of the enquiry table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnquiryFilter {
    #[default]
    All,
    Only(EnquiryType),
}

impl EnquiryFilter {
    pub const KEYS: [&'static str; 5] = ["all", "rental", "sales", "parts", "contact"];

    /// Unknown keys show everything
    pub fn from_key(key: &str) -> Self {
        EnquiryType::ALL
            .into_iter()
            .find(|t| t.filter_key() == key)
            .map(Self::Only)
            .unwrap_or(Self::All)
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Only(kind) => kind.filter_key(),
        }
    }

    pub fn matches(&self, enquiry: &Enquiry) -> bool {
        match self {
            Self::All => true,
            Self::Only(kind) => enquiry.kind == *kind,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterTab {
    pub key: &'static str,
    pub label: String,
    pub active: bool,
}

fn filter_tabs(active: EnquiryFilter) -> Vec<FilterTab> {
    EnquiryFilter::KEYS
        .iter()
        .map(|&key| {
            let mut label = key.to_string();
            if let Some(first) = label.get_mut(..1) {
                first.make_ascii_uppercase();
            }
            FilterTab {
                key,
                label,
                active: key == active.key(),
            }
        })
        .collect()
}

/// Row of the enquiry tables
#[derive(Debug, Clone, Serialize)]
pub struct EnquiryRow {
    pub id: String,
    pub kind: String,
    pub badge: &'static str,
    pub name: String,
    pub item: String,
    pub message: String,
    pub mobile: String,
    pub email: String,
    pub date: String,
    pub whatsapp_url: Option<String>,
    pub read: bool,
}

impl EnquiryRow {
    pub fn new(enquiry: &Enquiry, offset: FixedOffset) -> Self {
        let message: String = enquiry.message.chars().take(MESSAGE_PREVIEW_CHARS).collect();
        Self {
            id: enquiry.id.clone(),
            kind: enquiry.kind.to_string(),
            badge: enquiry.kind.filter_key(),
            name: or_dash(&enquiry.name),
            item: enquiry.item().unwrap_or("N/A").to_string(),
            message: or_dash(&message),
            mobile: enquiry.mobile.clone(),
            email: enquiry.email.clone().unwrap_or_default(),
            date: enquiry_date(enquiry.created_at.as_deref(), &enquiry.id, offset),
            whatsapp_url: whatsapp::reply_link(&enquiry.mobile),
            read: enquiry.read,
        }
    }
}

fn or_dash(value: &str) -> String {
    if value.trim().is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

/// Newest first; enquiries without any timestamp go last in arrival order
fn sort_newest_first(enquiries: &mut [Enquiry]) {
    let key = |e: &Enquiry| -> Option<DateTime<Utc>> { created_instant(e.created_at.as_deref(), &e.id) };
    enquiries.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[derive(Debug, Clone, Serialize)]
pub struct EnquiriesPage {
    pub filter: &'static str,
    pub tabs: Vec<FilterTab>,
    pub rows: Vec<EnquiryRow>,
    pub total: usize,
    pub unread: usize,
}

/// Dashboard stat cards; all `None` when the counts could not be loaded
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub machines: Option<u64>,
    pub parts: Option<u64>,
    pub blogs: Option<u64>,
    pub enquiries: Option<u64>,
    pub unread: Option<usize>,
    pub recent: Vec<EnquiryRow>,
    pub failed: bool,
}

impl Dashboard {
    fn failed() -> Self {
        Self {
            machines: None,
            parts: None,
            blogs: None,
            enquiries: None,
            unread: None,
            recent: Vec::new(),
            failed: true,
        }
    }

    fn loaded(counts: DashboardCounts, mut enquiries: Vec<Enquiry>, offset: FixedOffset) -> Self {
        let unread = enquiries.iter().filter(|e| !e.read).count();
        sort_newest_first(&mut enquiries);
        Self {
            machines: Some(counts.machines),
            parts: Some(counts.parts),
            blogs: Some(counts.blogs),
            enquiries: Some(counts.enquiry_total()),
            unread: Some(unread),
            recent: enquiries
                .iter()
                .take(RECENT_ENQUIRIES)
                .map(|e| EnquiryRow::new(e, offset))
                .collect(),
            failed: false,
        }
    }
}

pub struct AdminService {
    backend: Arc<dyn Backend>,
    upload: UploadConfig,
    offset: FixedOffset,
}

impl AdminService {
    pub fn new(backend: Arc<dyn Backend>, upload: UploadConfig, offset: FixedOffset) -> Self {
        Self {
            backend,
            upload,
            offset,
        }
    }

    pub fn max_images(&self) -> usize {
        self.upload.max_images
    }

    pub async fn login(&self, email: &str, password: &str) -> AdminResult<String> {
        required(email, "Email")?;
        required(password, "Password")?;
        match self.backend.login(email.trim(), password).await {
            Ok(token) => {
                tracing::info!("Admin signed in");
                Ok(token)
            }
            Err(BackendError::Unauthorized(message)) | Err(BackendError::Status { message, .. })
                if !message.is_empty() =>
            {
                Err(AdminError::Invalid(message))
            }
            Err(e) => {
                tracing::warn!("Admin login failed: {}", e);
                Err(AdminError::Invalid("Login failed".to_string()))
            }
        }
    }

    /// Counts and enquiries, fetched together
    ///
    /// An expired session is reported; any other failure yields a dashboard
    /// without numbers.
    pub async fn dashboard(&self, session: &AuthSession) -> AdminResult<Dashboard> {
        let result = futures::try_join!(
            self.backend.dashboard_counts(session),
            self.backend.list_enquiries(session)
        );
        match result {
            Ok((counts, enquiries)) => Ok(Dashboard::loaded(counts, enquiries, self.offset)),
            Err(e @ BackendError::Unauthorized(_)) => Err(e.into()),
            Err(e) => {
                tracing::warn!("Failed to load dashboard: {}", e);
                Ok(Dashboard::failed())
            }
        }
    }

    fn check_image_total(&self, kept: usize, files: &[UploadFile]) -> AdminResult<()> {
        check_uploads(&self.upload, files)?;
        if kept + files.len() > self.upload.max_images {
            return Err(AdminError::Invalid(format!(
                "Maximum {} images allowed",
                self.upload.max_images
            )));
        }
        Ok(())
    }

    async fn upload(&self, session: &AuthSession, files: Vec<UploadFile>) -> AdminResult<Vec<ImageRef>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }
        let count = files.len();
        match self.backend.upload_images(session, files).await {
            Ok(images) => {
                tracing::info!("Uploaded {} image(s)", count);
                Ok(images)
            }
            Err(e) => {
                tracing::warn!("Image upload failed: {}", e);
                Err(AdminError::Upload(e))
            }
        }
    }

    pub async fn machines(&self) -> AdminResult<Vec<MachineRow>> {
        let machines = self.backend.list_machines(&MachineFilter::all()).await?;
        Ok(machines.iter().map(MachineRow::from).collect())
    }

    pub async fn machine(&self, id: &str) -> AdminResult<Option<Machine>> {
        Ok(self.backend.get_machine(id).await?)
    }

    /// Create (`id == None`) or update a machine
    ///
    /// Final images are the kept existing ones followed by the new uploads.
    /// Returns the flash notice for the list page.
    pub async fn save_machine(
        &self,
        session: &AuthSession,
        id: Option<&str>,
        form: &MachineForm,
        kept: Vec<ImageRef>,
        files: Vec<UploadFile>,
    ) -> AdminResult<&'static str> {
        let kept = if id.is_some() { kept } else { Vec::new() };
        let mut machine = form.to_machine(Vec::new())?;
        self.check_image_total(kept.len(), &files)?;

        let existing_code = match id {
            Some(id) => self
                .backend
                .get_machine(id)
                .await?
                .ok_or(BackendError::NotFound)?
                .machine_code
                .filter(|c| !c.trim().is_empty()),
            None => None,
        };
        machine.machine_code = match existing_code {
            Some(code) => Some(code),
            None => {
                let all = self.backend.list_machines(&MachineFilter::all()).await?;
                next_machine_code(machine.category, all.iter().map(Machine::code))
            }
        };

        let uploaded = self.upload(session, files).await?;
        let mut images = kept;
        images.extend(uploaded);
        machine.images = images.into();

        match id {
            Some(id) => {
                self.backend.update_machine(session, id, &machine).await?;
                tracing::info!("Machine updated: {}", id);
                Ok("Machine updated successfully")
            }
            None => {
                self.backend.create_machine(session, &machine).await?;
                tracing::info!("Machine added: {}", machine.code());
                Ok("Machine added successfully")
            }
        }
    }

    pub async fn delete_machine(&self, session: &AuthSession, id: &str) -> AdminResult<()> {
        self.backend.delete_machine(session, id).await?;
        tracing::info!("Machine deleted: {}", id);
        Ok(())
    }

    pub async fn parts(&self) -> AdminResult<Vec<PartRow>> {
        let parts = self.backend.list_parts().await?;
        Ok(parts.iter().map(PartRow::from).collect())
    }

    pub async fn save_part(
        &self,
        session: &AuthSession,
        form: &PartForm,
        files: Vec<UploadFile>,
    ) -> AdminResult<&'static str> {
        required(&form.name, "Part name")?;
        required(&form.compatibility, "Compatibility")?;
        required(&form.condition, "Condition")?;
        self.check_image_total(0, &files)?;

        let images = self.upload(session, files).await?;
        let input = CreatePartInput {
            name: form.name.trim().to_string(),
            compatibility: form.compatibility.trim().to_string(),
            condition: form.condition.trim().to_string(),
            images,
        };
        self.backend.create_part(session, &input).await?;
        tracing::info!("Part added: {}", input.name);
        Ok("Part added successfully")
    }

    pub async fn delete_part(&self, session: &AuthSession, id: &str) -> AdminResult<()> {
        self.backend.delete_part(session, id).await?;
        Ok(())
    }

    pub async fn blogs(&self) -> AdminResult<Vec<BlogRow>> {
        let posts = self.backend.list_blogs().await?;
        Ok(posts.iter().map(BlogRow::from).collect())
    }

    pub async fn save_blog(
        &self,
        session: &AuthSession,
        form: &BlogForm,
        files: Vec<UploadFile>,
    ) -> AdminResult<&'static str> {
        required(&form.title, "Title")?;
        required(&form.content, "Content")?;
        self.check_image_total(0, &files)?;

        let images = self.upload(session, files).await?;
        let input = CreateBlogInput::new(
            form.title.trim().to_string(),
            form.content.clone(),
            form.author.trim().to_string(),
            images,
        );
        self.backend.create_blog(session, &input).await?;
        tracing::info!("Blog added: {}", input.title);
        Ok("Blog added successfully")
    }

    pub async fn delete_blog(&self, session: &AuthSession, id: &str) -> AdminResult<()> {
        self.backend.delete_blog(session, id).await?;
        Ok(())
    }

    pub async fn enquiries(&self, session: &AuthSession, filter: EnquiryFilter) -> AdminResult<EnquiriesPage> {
        let mut enquiries = self.backend.list_enquiries(session).await?;
        sort_newest_first(&mut enquiries);
        let unread = enquiries.iter().filter(|e| !e.read).count();
        let rows: Vec<EnquiryRow> = enquiries
            .iter()
            .filter(|e| filter.matches(e))
            .map(|e| EnquiryRow::new(e, self.offset))
            .collect();
        Ok(EnquiriesPage {
            filter: filter.key(),
            tabs: filter_tabs(filter),
            total: enquiries.len(),
            unread,
            rows,
        })
    }

    pub async fn mark_enquiries_read(&self, session: &AuthSession) -> AdminResult<()> {
        self.backend.mark_enquiries_read(session).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::services::blog::site_offset;

    async fn setup() -> (Arc<MemoryBackend>, AdminService, AuthSession) {
        let backend = Arc::new(MemoryBackend::with_sample_data());
        let service = AdminService::new(backend.clone(), UploadConfig::default(), site_offset(0));
        let token = service.login("admin@heavyhorizon.in", "admin123").await.unwrap();
        (backend, service, AuthSession::with_token(token))
    }

    fn machine_form() -> MachineForm {
        MachineForm {
            title: "Hyundai R210".to_string(),
            category: "Excavator".to_string(),
            purpose: "Rental".to_string(),
            model: "R210 Smart".to_string(),
            year: "2020".to_string(),
            hours: "abc".to_string(),
            condition: "<p>Fresh service</p>".to_string(),
            location: "Chennai".to_string(),
            status: "Available".to_string(),
        }
    }

    fn jpeg(name: &str) -> UploadFile {
        UploadFile {
            file_name: name.to_string(),
            content_type: "image/jpeg".to_string(),
            data: vec![0xff, 0xd8, 0xff],
        }
    }

    #[test]
    fn test_blank_description_rejected() {
        for condition in ["", "   ", "<p><br></p>"] {
            let form = MachineForm {
                condition: condition.to_string(),
                ..machine_form()
            };
            let err = form.to_machine(Vec::new()).unwrap_err();
            assert_eq!(err.user_message(), "Description is mandatory");
        }
    }

    #[test]
    fn test_form_coerces_numbers() {
        let machine = machine_form().to_machine(Vec::new()).unwrap();
        assert_eq!(machine.year, 2020);
        assert_eq!(machine.hours, 0);
        assert_eq!(machine.kind, Some(Purpose::Rental));
        assert_eq!(machine.category, MachineCategory::Excavator);
    }

    #[test]
    fn test_upload_checks() {
        let config = UploadConfig::default();
        assert!(check_uploads(&config, &[jpeg("a.jpg")]).is_ok());

        let pdf = UploadFile {
            content_type: "application/pdf".to_string(),
            ..jpeg("a.pdf")
        };
        assert!(matches!(check_uploads(&config, &[pdf]), Err(AdminError::Invalid(_))));

        let small = UploadConfig {
            max_file_size: 2,
            ..UploadConfig::default()
        };
        assert!(check_uploads(&small, &[jpeg("big.jpg")]).is_err());
    }

    #[test]
    fn test_enquiry_filter_keys() {
        assert_eq!(EnquiryFilter::from_key("parts"), EnquiryFilter::Only(EnquiryType::Part));
        assert_eq!(EnquiryFilter::from_key("bogus"), EnquiryFilter::All);
        let untyped = Enquiry::default();
        assert!(EnquiryFilter::from_key("contact").matches(&untyped));
        assert!(!EnquiryFilter::from_key("parts").matches(&untyped));

        let tabs = filter_tabs(EnquiryFilter::from_key("parts"));
        assert_eq!(tabs[3].label, "Parts");
        assert!(tabs[3].active);
        assert_eq!(tabs.iter().filter(|t| t.active).count(), 1);
    }

    #[test]
    fn test_enquiry_row() {
        let enquiry = Enquiry {
            mobile: "+91 98765 43210".to_string(),
            message: "x".repeat(80),
            ..Enquiry::default()
        };
        let row = EnquiryRow::new(&enquiry, site_offset(0));
        assert_eq!(row.message.chars().count(), 50);
        assert_eq!(row.name, "-");
        assert_eq!(row.item, "N/A");
        assert_eq!(row.date, "N/A");
        assert_eq!(row.whatsapp_url.as_deref(), Some("https://wa.me/919876543210"));
    }

    #[tokio::test]
    async fn test_create_assigns_next_code() {
        let (backend, service, session) = setup().await;
        let notice = service
            .save_machine(&session, None, &machine_form(), Vec::new(), vec![jpeg("r210.jpg")])
            .await
            .unwrap();
        assert_eq!(notice, "Machine added successfully");

        let created = backend
            .machines()
            .await
            .into_iter()
            .find(|m| m.title == "Hyundai R210")
            .unwrap();
        assert_eq!(created.code(), "EXE-0003");
        assert_eq!(created.image_urls().len(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_code_and_kept_images_first() {
        let (backend, service, session) = setup().await;
        let id = "65a1c2d3e4f5a6b7c8d9e001";
        let form = MachineForm {
            category: "Backhoe Loader".to_string(),
            ..machine_form()
        };
        service
            .save_machine(
                &session,
                Some(id),
                &form,
                vec![ImageRef::from("https://x/kept.jpg")],
                vec![jpeg("new.jpg")],
            )
            .await
            .unwrap();

        let updated = backend.machines().await.into_iter().find(|m| m.id == id).unwrap();
        assert_eq!(updated.code(), "BL-0001");
        let urls = updated.image_urls();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0], "https://x/kept.jpg");
    }

    #[tokio::test]
    async fn test_upload_failure_aborts_save() {
        let (backend, service, session) = setup().await;
        backend.set_fail_uploads(true);
        let before = backend.machines().await.len();

        let err = service
            .save_machine(&session, None, &machine_form(), Vec::new(), vec![jpeg("a.jpg")])
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Upload(_)));
        assert_eq!(backend.machines().await.len(), before);
    }

    #[tokio::test]
    async fn test_image_limit() {
        let (_backend, service, session) = setup().await;
        let files: Vec<_> = (0..11).map(|i| jpeg(&format!("{}.jpg", i))).collect();
        let err = service
            .save_machine(&session, None, &machine_form(), Vec::new(), files)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Maximum 10 images allowed");
    }

    #[tokio::test]
    async fn test_dashboard_recent_newest_first() {
        let (backend, service, session) = setup().await;
        for (i, stamp) in ["2024-01-01T00:00:00Z", "2024-03-01T00:00:00Z", "2024-02-01T00:00:00Z"]
            .iter()
            .enumerate()
        {
            backend
                .submit_enquiry(&Enquiry {
                    name: format!("n{}", i),
                    created_at: Some(stamp.to_string()),
                    ..Enquiry::default()
                })
                .await
                .unwrap();
        }

        let dashboard = service.dashboard(&session).await.unwrap();
        assert_eq!(dashboard.machines, Some(4));
        assert_eq!(dashboard.enquiries, Some(3));
        assert_eq!(dashboard.unread, Some(3));
        let names: Vec<_> = dashboard.recent.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["n1", "n2", "n0"]);
    }

    #[tokio::test]
    async fn test_dashboard_reports_expired_session() {
        let (backend, service, session) = setup().await;
        backend.revoke_sessions().await;
        let err = service.dashboard(&session).await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_enquiries_filtered() {
        let (backend, service, session) = setup().await;
        for kind in [EnquiryType::Rental, EnquiryType::Part, EnquiryType::Contact] {
            backend
                .submit_enquiry(&Enquiry {
                    kind,
                    ..Enquiry::default()
                })
                .await
                .unwrap();
        }
        let page = service
            .enquiries(&session, EnquiryFilter::from_key("parts"))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].kind, "Part");

        service.mark_enquiries_read(&session).await.unwrap();
        let page = service.enquiries(&session, EnquiryFilter::All).await.unwrap();
        assert_eq!(page.unread, 0);
    }

    #[tokio::test]
    async fn test_blog_and_part_saves() {
        let (backend, service, session) = setup().await;
        service
            .save_blog(
                &session,
                &BlogForm {
                    title: "Monsoon maintenance".to_string(),
                    content: "## Tips\nGrease daily".to_string(),
                    author: " ".to_string(),
                },
                vec![jpeg("cover.jpg")],
            )
            .await
            .unwrap();
        let blogs = service.blogs().await.unwrap();
        let row = blogs.iter().find(|b| b.title == "Monsoon maintenance").unwrap();
        assert_eq!(row.author, "Admin");
        assert_eq!(row.image_count, 1);

        let err = service
            .save_part(&session, &PartForm::default(), Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Part name is required");
        assert_eq!(backend.enquiry_calls(), 0);
    }
}

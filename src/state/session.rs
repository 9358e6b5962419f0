/// Admin form sessions
///
/// Each form (project, client, contact, newsletter) is one `FormSession`
/// value. Events arrive as `Message`s and `update` applies them, returning an
/// `Effect` that names the async work to run next. Completions come back as
/// messages tagged with the `RequestToken` of the effect that started them;
/// anything carrying an outdated token is dropped.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

use super::data::{NewClient, NewContact, NewProject, NewSubscription};
use crate::config::ImageLimits;
use crate::crop::cropper::{AspectRatio, CropSession, Offset, PixelRect};
use crate::crop::data_url::DataUrl;
use crate::crop::{reader, renderer};
use crate::error::{ImageError, SubmitError};

/// Identifies one in-flight async operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestToken(u64);

/// Which form a session drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormKind {
    Project,
    Client,
    Contact,
    Newsletter,
}

impl FormKind {
    /// Collection endpoint the form submits to
    pub fn endpoint(self) -> &'static str {
        match self {
            FormKind::Project => "/api/projects",
            FormKind::Client => "/api/clients",
            FormKind::Contact => "/api/contacts",
            FormKind::Newsletter => "/api/newsletter",
        }
    }

    /// Crop aspect for forms that carry an image
    pub fn aspect(self) -> Option<AspectRatio> {
        match self {
            FormKind::Project => Some(AspectRatio::PROJECT_CARD),
            FormKind::Client => Some(AspectRatio::SQUARE),
            FormKind::Contact | FormKind::Newsletter => None,
        }
    }

    /// Whether records of this kind can be deleted by id
    pub fn deletable(self) -> bool {
        matches!(self, FormKind::Project | FormKind::Client)
    }

    fn success_message(self) -> &'static str {
        match self {
            FormKind::Project => "Project added",
            FormKind::Client => "Client added",
            FormKind::Contact => "Thanks! We will be in touch soon.",
            FormKind::Newsletter => "Thank you for subscribing to our newsletter!",
        }
    }
}

/// Editable text fields across all forms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Description,
    Designation,
    FullName,
    Email,
    Mobile,
    City,
}

/// The pending create payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fields", rename_all = "snake_case")]
pub enum Draft {
    Project(NewProject),
    Client(NewClient),
    Contact(NewContact),
    Newsletter(NewSubscription),
}

impl Draft {
    pub fn empty(kind: FormKind) -> Self {
        match kind {
            FormKind::Project => Draft::Project(NewProject::default()),
            FormKind::Client => Draft::Client(NewClient::default()),
            FormKind::Contact => Draft::Contact(NewContact::default()),
            FormKind::Newsletter => Draft::Newsletter(NewSubscription::default()),
        }
    }

    pub fn kind(&self) -> FormKind {
        match self {
            Draft::Project(_) => FormKind::Project,
            Draft::Client(_) => FormKind::Client,
            Draft::Contact(_) => FormKind::Contact,
            Draft::Newsletter(_) => FormKind::Newsletter,
        }
    }

    /// The image field, for drafts that have one
    pub fn image(&self) -> Option<&str> {
        match self {
            Draft::Project(p) => Some(&p.image),
            Draft::Client(c) => Some(&c.image),
            Draft::Contact(_) | Draft::Newsletter(_) => None,
        }
    }

    fn set_image(&mut self, image: String) {
        match self {
            Draft::Project(p) => p.image = image,
            Draft::Client(c) => c.image = image,
            Draft::Contact(_) | Draft::Newsletter(_) => {}
        }
    }

    /// Set a text field. Fields the form does not have are ignored.
    pub fn set_field(&mut self, field: Field, value: String) {
        match (self, field) {
            (Draft::Project(p), Field::Name) => p.name = value,
            (Draft::Project(p), Field::Description) => p.description = value,
            (Draft::Client(c), Field::Name) => c.name = value,
            (Draft::Client(c), Field::Description) => c.description = value,
            (Draft::Client(c), Field::Designation) => c.designation = value,
            (Draft::Contact(c), Field::FullName) => c.full_name = value,
            (Draft::Contact(c), Field::Email) => c.email = value,
            (Draft::Contact(c), Field::Mobile) => c.mobile = value,
            (Draft::Contact(c), Field::City) => c.city = value,
            (Draft::Newsletter(n), Field::Email) => n.email = value,
            _ => {}
        }
    }

    /// Every required field, including the image, is filled in
    pub fn is_complete(&self) -> bool {
        let filled = |value: &str| !value.trim().is_empty();
        match self {
            Draft::Project(p) => filled(&p.name) && filled(&p.description) && filled(&p.image),
            Draft::Client(c) => {
                filled(&c.name) && filled(&c.description) && filled(&c.designation) && filled(&c.image)
            }
            Draft::Contact(c) => filled(&c.full_name) && filled(&c.email) && filled(&c.mobile) && filled(&c.city),
            Draft::Newsletter(n) => filled(&n.email),
        }
    }

    /// JSON body for the create request
    pub fn to_body(&self) -> serde_json::Value {
        let body = match self {
            Draft::Project(p) => serde_json::to_value(p),
            Draft::Client(c) => serde_json::to_value(c),
            Draft::Contact(c) => serde_json::to_value(c),
            Draft::Newsletter(n) => serde_json::to_value(n),
        };
        // Plain string fields always serialize
        body.unwrap_or_default()
    }
}

/// Where the form is in its lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Phase {
    /// Form closed; the record list is shown
    Idle,
    /// Form open and editable
    FormOpen,
    /// A selected file is being read
    Reading { token: RequestToken },
    /// The crop view is open
    Cropping { session: CropSession },
    /// The confirmed crop is being rendered
    Rendering { token: RequestToken },
    /// The create request is in flight
    Submitting { token: RequestToken },
    /// A delete request for `id` is in flight
    Deleting { id: i64, token: RequestToken },
}

/// User-facing status line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// Events fed into [`FormSession::update`]
#[derive(Debug)]
pub enum Message {
    OpenForm,
    CloseForm,
    Edit(Field, String),
    FileSelected(PathBuf),
    FileRead {
        token: RequestToken,
        result: Result<DataUrl, ImageError>,
    },
    Pan {
        dx: f64,
        dy: f64,
    },
    SetOffset(Offset),
    SetZoom(f64),
    ZoomBy(f64),
    ConfirmCrop,
    CancelCrop,
    CropRendered {
        token: RequestToken,
        result: Result<DataUrl, ImageError>,
    },
    RemoveImage,
    Submit,
    SubmitFinished {
        token: RequestToken,
        result: Result<(), SubmitError>,
    },
    Delete(i64),
    DeleteFinished {
        token: RequestToken,
        result: Result<(), SubmitError>,
    },
    DismissNotice,
}

/// Async work requested by [`FormSession::update`]
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    ReadFile {
        token: RequestToken,
        path: PathBuf,
    },
    RenderCrop {
        token: RequestToken,
        source: DataUrl,
        area: PixelRect,
    },
    Submit {
        token: RequestToken,
        endpoint: &'static str,
        body: serde_json::Value,
    },
    Delete {
        token: RequestToken,
        endpoint: String,
    },
    /// Reload the record list
    Refresh {
        endpoint: &'static str,
    },
}

impl Effect {
    /// Run effects that need no network access, producing their completion.
    ///
    /// Network effects are handed back unchanged for the caller to perform.
    pub async fn perform_local(self, limits: ImageLimits) -> Result<Message, Effect> {
        match self {
            Effect::ReadFile { token, path } => {
                let result = reader::read_image_file(&path, limits.max_upload_bytes).await;
                Ok(Message::FileRead { token, result })
            }
            Effect::RenderCrop { token, source, area } => {
                let result = renderer::render_crop_async(source, area, limits).await;
                Ok(Message::CropRendered { token, result })
            }
            other => Err(other),
        }
    }
}

/// One form's complete client-side state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSession {
    draft: Draft,
    phase: Phase,
    notice: Option<Notice>,
    last_token: u64,
    limits: ImageLimits,
}

impl FormSession {
    pub fn new(kind: FormKind, limits: ImageLimits) -> Self {
        Self {
            draft: Draft::empty(kind),
            phase: Phase::Idle,
            notice: None,
            last_token: 0,
            limits,
        }
    }

    pub fn kind(&self) -> FormKind {
        self.draft.kind()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// The open crop session, if any
    pub fn crop(&self) -> Option<&CropSession> {
        match &self.phase {
            Phase::Cropping { session } => Some(session),
            _ => None,
        }
    }

    /// Submit button state
    pub fn can_submit(&self) -> bool {
        self.phase == Phase::FormOpen && self.draft.is_complete()
    }

    /// Apply one event
    pub fn update(&mut self, message: Message) -> Effect {
        match message {
            Message::OpenForm => {
                if self.phase == Phase::Idle {
                    self.phase = Phase::FormOpen;
                }
                Effect::None
            }
            Message::CloseForm => {
                if self.form_visible() && !matches!(self.phase, Phase::Submitting { .. }) {
                    // Closing abandons any read or render still in flight
                    self.phase = Phase::Idle;
                    self.draft = Draft::empty(self.kind());
                }
                Effect::None
            }
            Message::Edit(field, value) => {
                if self.editable() {
                    self.draft.set_field(field, value);
                }
                Effect::None
            }
            Message::FileSelected(path) => {
                if self.phase != Phase::FormOpen || self.kind().aspect().is_none() {
                    return Effect::None;
                }
                let token = self.issue();
                self.phase = Phase::Reading { token };
                self.notice = None;
                Effect::ReadFile { token, path }
            }
            Message::FileRead { token, result } => {
                if !self.is_current(token) {
                    debug!("Dropping stale file read {:?}", token);
                    return Effect::None;
                }
                self.phase = Phase::FormOpen;

                let aspect = match self.kind().aspect() {
                    Some(aspect) => aspect,
                    None => return Effect::None,
                };
                match result.and_then(|source| CropSession::open(source, aspect, self.limits.max_dimension)) {
                    Ok(session) => self.phase = Phase::Cropping { session },
                    Err(e) => self.fail_image(e),
                }
                Effect::None
            }
            Message::Pan { dx, dy } => {
                if let Phase::Cropping { session } = &mut self.phase {
                    session.pan_by(dx, dy);
                }
                Effect::None
            }
            Message::SetOffset(offset) => {
                if let Phase::Cropping { session } = &mut self.phase {
                    session.set_offset(offset);
                }
                Effect::None
            }
            Message::SetZoom(zoom) => {
                if let Phase::Cropping { session } = &mut self.phase {
                    session.set_zoom(zoom);
                }
                Effect::None
            }
            Message::ZoomBy(delta) => {
                if let Phase::Cropping { session } = &mut self.phase {
                    session.zoom_by(delta);
                }
                Effect::None
            }
            Message::ConfirmCrop => {
                if !matches!(self.phase, Phase::Cropping { .. }) {
                    return Effect::None;
                }
                let token = self.issue();
                match std::mem::replace(&mut self.phase, Phase::Rendering { token }) {
                    Phase::Cropping { session } => {
                        let (source, area) = session.into_parts();
                        Effect::RenderCrop { token, source, area }
                    }
                    other => {
                        self.phase = other;
                        Effect::None
                    }
                }
            }
            Message::CancelCrop => {
                if matches!(self.phase, Phase::Cropping { .. } | Phase::Rendering { .. }) {
                    self.phase = Phase::FormOpen;
                }
                Effect::None
            }
            Message::CropRendered { token, result } => {
                if !self.is_current(token) {
                    debug!("Dropping stale crop render {:?}", token);
                    return Effect::None;
                }
                self.phase = Phase::FormOpen;
                match result {
                    Ok(image) => self.draft.set_image(image.to_string()),
                    Err(e) => self.fail_image(e),
                }
                Effect::None
            }
            Message::RemoveImage => {
                if self.editable() {
                    self.draft.set_image(String::new());
                }
                Effect::None
            }
            Message::Submit => {
                if !self.can_submit() {
                    return Effect::None;
                }
                let token = self.issue();
                self.phase = Phase::Submitting { token };
                self.notice = None;
                Effect::Submit {
                    token,
                    endpoint: self.kind().endpoint(),
                    body: self.draft.to_body(),
                }
            }
            Message::SubmitFinished { token, result } => {
                if !self.is_current(token) {
                    debug!("Dropping stale submit response {:?}", token);
                    return Effect::None;
                }
                match result {
                    Ok(()) => {
                        let kind = self.kind();
                        self.draft = Draft::empty(kind);
                        self.phase = Phase::Idle;
                        self.notice = Some(Notice::Success(kind.success_message().to_string()));
                        Effect::Refresh {
                            endpoint: kind.endpoint(),
                        }
                    }
                    Err(e) => {
                        self.phase = Phase::FormOpen;
                        self.fail_request(e);
                        Effect::None
                    }
                }
            }
            Message::Delete(id) => {
                if self.phase != Phase::Idle || !self.kind().deletable() {
                    return Effect::None;
                }
                let token = self.issue();
                self.phase = Phase::Deleting { id, token };
                Effect::Delete {
                    token,
                    endpoint: format!("{}/{}", self.kind().endpoint(), id),
                }
            }
            Message::DeleteFinished { token, result } => {
                if !self.is_current(token) {
                    debug!("Dropping stale delete response {:?}", token);
                    return Effect::None;
                }
                self.phase = Phase::Idle;
                match result {
                    Ok(()) => Effect::Refresh {
                        endpoint: self.kind().endpoint(),
                    },
                    Err(e) => {
                        self.fail_request(e);
                        Effect::None
                    }
                }
            }
            Message::DismissNotice => {
                self.notice = None;
                Effect::None
            }
        }
    }

    fn issue(&mut self) -> RequestToken {
        self.last_token += 1;
        RequestToken(self.last_token)
    }

    /// Whether `token` belongs to the operation the current phase waits on
    fn is_current(&self, token: RequestToken) -> bool {
        match self.phase {
            Phase::Reading { token: current }
            | Phase::Rendering { token: current }
            | Phase::Submitting { token: current }
            | Phase::Deleting { token: current, .. } => current == token,
            _ => false,
        }
    }

    fn form_visible(&self) -> bool {
        !matches!(self.phase, Phase::Idle | Phase::Deleting { .. })
    }

    fn editable(&self) -> bool {
        matches!(
            self.phase,
            Phase::FormOpen | Phase::Reading { .. } | Phase::Rendering { .. }
        )
    }

    fn fail_image(&mut self, error: ImageError) {
        warn!("Image step failed: {error}");
        let message = match error {
            ImageError::Read(_) | ImageError::Task(_) => {
                "Could not load the selected image. Please try again.".to_string()
            }
            ImageError::Decode(_) | ImageError::InvalidDataUrl(_) => {
                "The selected file is not a supported image.".to_string()
            }
            other => other.to_string(),
        };
        self.notice = Some(Notice::Error(message));
    }

    fn fail_request(&mut self, error: SubmitError) {
        warn!("Request failed: {error}");
        let message = match error {
            SubmitError::Duplicate => error.to_string(),
            SubmitError::Failed(_) => "Something went wrong. Please try again.".to_string(),
        };
        self.notice = Some(Notice::Error(message));
    }
}

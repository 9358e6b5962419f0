use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::error::ApiError;
use super::state::AppState;
use crate::crop::cropper::PixelRect;
use crate::crop::data_url::DataUrl;
use crate::crop::renderer::render_crop_async;
use crate::state::data::{Client, Contact, NewClient, NewContact, NewProject, NewSubscription, Project, Subscription};
use crate::state::library::Counts;

type Shared = State<Arc<AppState>>;
type Payload<T> = Result<Json<T>, JsonRejection>;

/// Reject image fields whose decoded size exceeds the upload cap
fn check_image_size(state: &AppState, image: &str) -> Result<(), ApiError> {
    let limit = state.config.limits.max_upload_bytes;
    let size = DataUrl::decoded_len_hint(image).unwrap_or(0) as u64;

    if size > limit {
        return Err(ApiError::PayloadTooLarge { size, limit });
    }
    Ok(())
}

// ========== Projects ==========

pub async fn list_projects(State(state): Shared) -> Result<Json<Vec<Project>>, ApiError> {
    let library = state.library.lock().await;
    library
        .list_projects()
        .map(Json)
        .map_err(|e| ApiError::store("Failed to fetch projects", e))
}

pub async fn create_project(
    State(state): Shared,
    payload: Payload<NewProject>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let Json(payload) = payload?;
    let payload = payload.validate()?;
    check_image_size(&state, &payload.image)?;

    let project = state
        .library
        .lock()
        .await
        .create_project(payload)
        .map_err(|e| ApiError::store("Failed to create project", e))?;

    info!("Created project {}", project.id);
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn delete_project(
    State(state): Shared,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    let removed = state
        .library
        .lock()
        .await
        .delete_project(id)
        .map_err(|e| ApiError::store("Failed to delete project", e))?;

    info!("Delete project {id}: removed={removed}");
    Ok(Json(json!({ "message": "Project deleted successfully" })))
}

// ========== Clients ==========

pub async fn list_clients(State(state): Shared) -> Result<Json<Vec<Client>>, ApiError> {
    let library = state.library.lock().await;
    library
        .list_clients()
        .map(Json)
        .map_err(|e| ApiError::store("Failed to fetch clients", e))
}

pub async fn create_client(
    State(state): Shared,
    payload: Payload<NewClient>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let Json(payload) = payload?;
    let payload = payload.validate()?;
    check_image_size(&state, &payload.image)?;

    let client = state
        .library
        .lock()
        .await
        .create_client(payload)
        .map_err(|e| ApiError::store("Failed to create client", e))?;

    info!("Created client {}", client.id);
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn delete_client(
    State(state): Shared,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    let removed = state
        .library
        .lock()
        .await
        .delete_client(id)
        .map_err(|e| ApiError::store("Failed to delete client", e))?;

    info!("Delete client {id}: removed={removed}");
    Ok(Json(json!({ "message": "Client deleted successfully" })))
}

// ========== Contacts ==========

pub async fn list_contacts(State(state): Shared) -> Result<Json<Vec<Contact>>, ApiError> {
    let library = state.library.lock().await;
    library
        .list_contacts()
        .map(Json)
        .map_err(|e| ApiError::store("Failed to fetch contacts", e))
}

pub async fn create_contact(
    State(state): Shared,
    payload: Payload<NewContact>,
) -> Result<(StatusCode, Json<Contact>), ApiError> {
    let Json(payload) = payload?;
    let payload = payload.validate()?;

    let contact = state
        .library
        .lock()
        .await
        .create_contact(payload)
        .map_err(|e| ApiError::store("Failed to create contact", e))?;

    info!("Received contact {}", contact.id);
    Ok((StatusCode::CREATED, Json(contact)))
}

// ========== Newsletter ==========

pub async fn list_subscriptions(State(state): Shared) -> Result<Json<Vec<Subscription>>, ApiError> {
    let library = state.library.lock().await;
    library
        .list_subscriptions()
        .map(Json)
        .map_err(|e| ApiError::store("Failed to fetch newsletters", e))
}

pub async fn subscribe(
    State(state): Shared,
    payload: Payload<NewSubscription>,
) -> Result<(StatusCode, Json<Subscription>), ApiError> {
    let Json(payload) = payload?;
    let payload = payload.validate()?;

    let subscription = state
        .library
        .lock()
        .await
        .subscribe(payload)
        .map_err(|e| ApiError::store("Failed to subscribe", e))?;

    info!("New newsletter subscriber {}", subscription.id);
    Ok((StatusCode::CREATED, Json(subscription)))
}

// ========== Cropping ==========

#[derive(Deserialize)]
pub struct CropRequest {
    image: String,
    area: PixelRect,
}

#[derive(Serialize)]
pub struct CropResponse {
    image: String,
}

/// Crop an uploaded data URL on the server
pub async fn crop_handler(
    State(state): Shared,
    payload: Payload<CropRequest>,
) -> Result<Json<CropResponse>, ApiError> {
    let Json(CropRequest { image, area }) = payload?;
    check_image_size(&state, &image)?;

    let source: DataUrl = image.parse()?;
    let cropped = render_crop_async(source, area, state.config.limits).await?;

    Ok(Json(CropResponse {
        image: cropped.to_string(),
    }))
}

pub async fn health_handler(State(state): Shared) -> Result<Json<Counts>, ApiError> {
    let library = state.library.lock().await;
    library
        .counts()
        .map(Json)
        .map_err(|e| ApiError::store("Failed to count records", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ImageLimits};
    use crate::crop::renderer::tests::gradient_png;
    use crate::server::router;
    use crate::state::library::Library;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request},
        Router,
    };
    use tower::ServiceExt;

    fn app_with_limits(limits: ImageLimits) -> Router {
        let config = Config {
            port: 0,
            database_path: ":memory:".into(),
            limits,
        };
        let library = Library::open_in_memory().unwrap();
        router(AppState::new(config, library))
    }

    fn app() -> Router {
        app_with_limits(ImageLimits::default())
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn project_body(name: &str) -> Value {
        json!({
            "name": name,
            "description": "A project",
            "image": gradient_png(8, 8).to_string(),
        })
    }

    #[tokio::test]
    async fn test_create_then_list_projects() {
        let app = app();

        let (status, created) = call(&app, Method::POST, "/api/projects", Some(project_body("first"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["name"], "first");
        assert!(created["_id"].is_i64());

        call(&app, Method::POST, "/api/projects", Some(project_body("second"))).await;

        let (status, list) = call(&app, Method::GET, "/api/projects", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list[0]["name"], "second");
        assert_eq!(list[1]["name"], "first");
    }

    #[tokio::test]
    async fn test_delete_missing_project_is_a_noop() {
        let app = app();
        call(&app, Method::POST, "/api/projects", Some(project_body("kept"))).await;
        let (_, before) = call(&app, Method::GET, "/api/projects", None).await;

        let (status, body) = call(&app, Method::DELETE, "/api/projects/9999", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Project deleted successfully");

        let (_, after) = call(&app, Method::GET, "/api/projects", None).await;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_delete_client() {
        let app = app();
        let (_, created) = call(
            &app,
            Method::POST,
            "/api/clients",
            Some(json!({
                "name": "Ada",
                "description": "Great to work with",
                "designation": "CTO",
                "image": gradient_png(4, 4).to_string(),
            })),
        )
        .await;

        let uri = format!("/api/clients/{}", created["_id"]);
        let (status, _) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, list) = call(&app, Method::GET, "/api/clients", None).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn test_duplicate_newsletter_email() {
        let app = app();
        let body = json!({ "email": "Reader@Example.com" });

        let (status, created) = call(&app, Method::POST, "/api/newsletter", Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["email"], "reader@example.com");

        let (status, error) = call(&app, Method::POST, "/api/newsletter", Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error["error"], "Email already subscribed");

        let (_, list) = call(&app, Method::GET, "/api/newsletter", None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_contact_submission() {
        let app = app();
        let (status, created) = call(
            &app,
            Method::POST,
            "/api/contacts",
            Some(json!({
                "fullName": " Grace Hopper ",
                "email": "GRACE@example.com",
                "mobile": "555-0100",
                "city": "Arlington",
            })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["fullName"], "Grace Hopper");
        assert_eq!(created["email"], "grace@example.com");
    }

    #[tokio::test]
    async fn test_missing_image_is_rejected() {
        let app = app();
        let (status, error) = call(
            &app,
            Method::POST,
            "/api/projects",
            Some(json!({ "name": "No photo", "description": "d", "image": "" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "image is required");
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_bad_request() {
        let app = app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/newsletter")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_image_is_rejected() {
        let app = app_with_limits(ImageLimits {
            max_upload_bytes: 64,
            ..ImageLimits::default()
        });

        let image = DataUrl::new("image/png", vec![0u8; 1024]).to_string();
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/projects",
            Some(json!({ "name": "Big", "description": "d", "image": image })),
        )
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_body_over_the_limit_is_payload_too_large() {
        let limits = ImageLimits {
            max_upload_bytes: 1024,
            ..ImageLimits::default()
        };
        let app = app_with_limits(limits);

        // Base64 of this image alone is well past the body limit
        let image = DataUrl::new("image/png", vec![0u8; 200_000]).to_string();
        let (status, error) = call(
            &app,
            Method::POST,
            "/api/projects",
            Some(json!({ "name": "Huge", "description": "d", "image": image })),
        )
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(error["error"].as_str().unwrap().starts_with("Request body too large"));

        let (_, list) = call(&app, Method::GET, "/api/projects", None).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn test_duplicate_reply_drives_the_form_notice() {
        use crate::error::SubmitError;
        use crate::state::session::{Effect, Field, FormKind, FormSession, Message, Notice, Phase};

        let app = app();
        call(&app, Method::POST, "/api/newsletter", Some(json!({ "email": "reader@example.com" }))).await;

        let mut session = FormSession::new(FormKind::Newsletter, ImageLimits::default());
        session.update(Message::OpenForm);
        session.update(Message::Edit(Field::Email, "reader@example.com".into()));

        let (token, endpoint, body) = match session.update(Message::Submit) {
            Effect::Submit { token, endpoint, body } => (token, endpoint, body),
            other => panic!("expected a submit, got {other:?}"),
        };
        let (status, reply) = call(&app, Method::POST, endpoint, Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let result = SubmitError::check(status, &reply);
        assert_eq!(result, Err(SubmitError::Duplicate));
        session.update(Message::SubmitFinished { token, result });

        assert_eq!(session.phase(), &Phase::FormOpen);
        assert_eq!(session.notice(), Some(&Notice::Error("Email already subscribed".into())));
    }

    #[tokio::test]
    async fn test_created_reply_resets_the_form() {
        use crate::error::SubmitError;
        use crate::state::session::{Effect, Field, FormKind, FormSession, Message, Phase};

        let app = app();
        let mut session = FormSession::new(FormKind::Newsletter, ImageLimits::default());
        session.update(Message::OpenForm);
        session.update(Message::Edit(Field::Email, "new@example.com".into()));

        let (token, endpoint, body) = match session.update(Message::Submit) {
            Effect::Submit { token, endpoint, body } => (token, endpoint, body),
            other => panic!("expected a submit, got {other:?}"),
        };
        let (status, reply) = call(&app, Method::POST, endpoint, Some(body)).await;

        let effect = session.update(Message::SubmitFinished {
            token,
            result: SubmitError::check(status, &reply),
        });
        assert_eq!(effect, Effect::Refresh { endpoint: "/api/newsletter" });
        assert_eq!(session.phase(), &Phase::Idle);
    }

    #[tokio::test]
    async fn test_crop_endpoint() {
        let app = app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/crop",
            Some(json!({
                "image": gradient_png(1200, 800).to_string(),
                "area": { "x": 100, "y": 100, "width": 450, "height": 350 },
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let cropped: DataUrl = body["image"].as_str().unwrap().parse().unwrap();
        let decoded = image::load_from_memory(cropped.bytes()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (450, 350));
    }

    #[tokio::test]
    async fn test_crop_endpoint_rejects_garbage() {
        let app = app();
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/crop",
            Some(json!({
                "image": DataUrl::new("image/png", b"nope".to_vec()).to_string(),
                "area": { "x": 0, "y": 0, "width": 1, "height": 1 },
            })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_health_reports_counts() {
        let app = app();
        call(&app, Method::POST, "/api/newsletter", Some(json!({ "email": "a@b.c" }))).await;

        let (status, body) = call(&app, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subscriptions"], 1);
        assert_eq!(body["projects"], 0);
    }
}

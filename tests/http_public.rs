mod support;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tower::ServiceExt;

use nextconfig::application::images::ImageStore;
use nextconfig::application::mail::{MailError, Mailer, OutboundMail};
use nextconfig::application::repos::{
    ContentRepository, DatabaseProbe, FaqsWriteRepo, PostsWriteRepo, ReviewsWriteRepo,
};
use nextconfig::application::submissions::SubmissionService;
use nextconfig::infra::http::{PublicState, build_public_router};
use nextconfig::infra::uploads::ImageStorage;

use support::{Harness, faq_input, post_params, review_input};

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutboundMail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutboundMail) -> Result<(), MailError> {
        self.sent.lock().await.push(mail);
        Ok(())
    }
}

struct App {
    harness: Harness,
    mailer: Arc<RecordingMailer>,
    router: Router,
    _uploads: tempfile::TempDir,
}

fn app() -> App {
    let harness = Harness::in_memory();
    let mailer = Arc::new(RecordingMailer::default());
    let uploads = tempfile::tempdir().expect("temp upload dir");
    let images: Arc<dyn ImageStore> =
        Arc::new(ImageStorage::new(uploads.path().to_path_buf()).expect("image storage"));
    let reads: Arc<dyn ContentRepository> = harness.repo.clone();
    let db: Arc<dyn DatabaseProbe> = harness.repo.clone();

    let state = PublicState {
        content: harness.content.clone(),
        submissions: SubmissionService::new(
            reads,
            harness.writer.clone(),
            mailer.clone(),
            "workshop@example.com",
        ),
        images,
        db,
    };

    App {
        router: build_public_router(state),
        harness,
        mailer,
        _uploads: uploads,
    }
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = router
        .clone()
        .oneshot(request.body(body).expect("request should build"))
        .await
        .expect("router should respond");

    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

#[tokio::test]
async fn unknown_post_is_not_found() {
    let app = app();
    let (status, body) = send(&app.router, Method::GET, "/blog/no-such-post", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
    assert_eq!(body["error"]["hint"], "post not found");
}

#[tokio::test]
async fn blog_listing_and_detail_are_served_from_the_cache() {
    let app = app();
    app.harness
        .repo
        .create_post(post_params("Quiet workstation", "quiet-workstation", true, vec![]))
        .await
        .expect("seed post");

    let (status, body) = send(&app.router, Method::GET, "/blog", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["posts"][0]["slug"], "quiet-workstation");

    let (status, body) = send(&app.router, Method::GET, "/blog/quiet-workstation", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["title"], "Quiet workstation");
    assert_eq!(body["comments"], json!([]));

    send(&app.router, Method::GET, "/blog", None).await;
    assert_eq!(app.harness.repo.calls("list_posts").await, 1);
}

#[tokio::test]
async fn comment_submission_waits_for_moderation() {
    let app = app();
    app.harness
        .repo
        .create_post(post_params("Cable management", "cable-management", true, vec![]))
        .await
        .expect("seed post");

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/blog/cable-management/comment",
        Some(json!({
            "name": "Ines",
            "email": "ines@example.com",
            "content": "Which sleeved cables did you use?"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["is_approved"], false);
    assert_eq!(body["data"]["post_slug"], "cable-management");
    assert!(body.get("warnings").is_none());

    let (_, detail) = send(&app.router, Method::GET, "/blog/cable-management", None).await;
    assert_eq!(detail["comments"], json!([]));
    assert_eq!(
        app.harness
            .content
            .pending_comment_count()
            .await
            .expect("pending"),
        1
    );
}

#[tokio::test]
async fn invalid_comment_lists_field_errors() {
    let app = app();
    app.harness
        .repo
        .create_post(post_params("Thermal paste", "thermal-paste", true, vec![]))
        .await
        .expect("seed post");

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/blog/thermal-paste/comment",
        Some(json!({ "name": "", "email": "not-an-email", "content": "Hi" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_failed");
    assert!(body["error"]["fields"]["name"].is_array());
    assert!(body["error"]["fields"]["email"].is_array());
    assert!(body["error"]["fields"].get("content").is_none());
}

#[tokio::test]
async fn comment_on_unknown_post_is_not_found() {
    let app = app();
    let (status, _) = send(
        &app.router,
        Method::POST,
        "/blog/ghost/comment",
        Some(json!({ "name": "Jo", "email": "jo@example.com", "content": "Hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/reviews")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .expect("request should build");
    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn review_submission_ignores_moderation_flags() {
    let app = app();
    let (status, body) = send(
        &app.router,
        Method::POST,
        "/reviews",
        Some(json!({
            "name": "Karim",
            "rating": 5,
            "comment": "Silent and fast.",
            "is_approved": true,
            "is_featured": true
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["is_approved"], false);
    assert_eq!(body["data"]["is_featured"], false);

    let (_, home) = send(&app.router, Method::GET, "/", None).await;
    assert_eq!(home["reviews"], json!([]));
}

#[tokio::test]
async fn out_of_range_rating_is_rejected() {
    let app = app();
    let (status, body) = send(
        &app.router,
        Method::POST,
        "/reviews",
        Some(json!({ "name": "Lea", "rating": 6, "comment": "Too good" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["fields"]["rating"].is_array());
}

#[tokio::test]
async fn home_shows_featured_reviews_first() {
    let app = app();
    app.harness
        .repo
        .create_review(review_input("Featured", 5, true, true))
        .await
        .expect("seed featured");
    app.harness
        .repo
        .create_review(review_input("Regular", 4, true, false))
        .await
        .expect("seed regular");

    let (status, body) = send(&app.router, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reviews"][0]["name"], "Featured");
    assert_eq!(body["reviews"][1]["name"], "Regular");
}

#[tokio::test]
async fn faq_page_lists_visible_entries_only() {
    let app = app();
    app.harness
        .repo
        .create_faq(faq_input("Visible question", 1, true))
        .await
        .expect("seed visible");
    app.harness
        .repo
        .create_faq(faq_input("Hidden question", 2, false))
        .await
        .expect("seed hidden");

    let (status, body) = send(&app.router, Method::GET, "/faq", None).await;
    assert_eq!(status, StatusCode::OK);
    let faqs = body["faqs"].as_array().expect("faq array");
    assert_eq!(faqs.len(), 1);
    assert_eq!(faqs[0]["question"], "Visible question");
}

#[tokio::test]
async fn contact_form_is_forwarded_by_mail() {
    let app = app();
    let (status, body) = send(
        &app.router,
        Method::POST,
        "/contact/send",
        Some(json!({
            "name": "Marc",
            "email": "marc@example.com",
            "subject": "Upgrade",
            "message": "Can you upgrade my GPU?"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body["message"].is_string());

    let sent = app.mailer.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "workshop@example.com");
    assert_eq!(sent[0].reply_to, "marc@example.com");
    assert!(sent[0].body.contains("Can you upgrade my GPU?"));
}

#[tokio::test]
async fn invalid_contact_form_sends_nothing() {
    let app = app();
    let (status, _) = send(
        &app.router,
        Method::POST,
        "/contact/send",
        Some(json!({ "name": "Marc", "email": "marc", "subject": "", "message": "" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(app.mailer.sent.lock().await.is_empty());
}

#[tokio::test]
async fn missing_upload_is_not_found() {
    let app = app();
    let (status, _) = send(&app.router, Method::GET, "/uploads/blog/missing.webp", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn database_health_reports_no_content() {
    let app = app();
    let (status, body) = send(&app.router, Method::GET, "/_health/db", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
}

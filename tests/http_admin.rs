mod support;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use nextconfig::application::admin::{
    AdminBlogService, AdminCommentService, AdminDashboardService, AdminFaqService,
    AdminPortfolioService, AdminReviewService, AdminTagService,
};
use nextconfig::application::images::ImageStore;
use nextconfig::application::repos::{
    CommentsWriteRepo, ContentRepository, DatabaseProbe, PostsWriteRepo,
};
use nextconfig::infra::http::{AdminState, build_admin_router};
use nextconfig::infra::uploads::ImageStorage;

use support::{Harness, comment_params, post_params};

const BOUNDARY: &str = "nextconfig-test-boundary";
const MAX_IMAGE_BYTES: u64 = 2 * 1024 * 1024;
const UPLOAD_LIMIT: usize = 8 * 1024 * 1024;

struct App {
    harness: Harness,
    router: Router,
    uploads: tempfile::TempDir,
}

fn app() -> App {
    let harness = Harness::in_memory();
    let uploads = tempfile::tempdir().expect("temp upload dir");
    let images: Arc<dyn ImageStore> =
        Arc::new(ImageStorage::new(uploads.path().to_path_buf()).expect("image storage"));
    let reads: Arc<dyn ContentRepository> = harness.repo.clone();
    let db: Arc<dyn DatabaseProbe> = harness.repo.clone();
    let content = harness.content.clone();
    let writer = harness.writer.clone();

    let state = AdminState {
        dashboard: Arc::new(AdminDashboardService::new(
            reads.clone(),
            content.clone(),
            writer.clone(),
        )),
        blog: Arc::new(AdminBlogService::new(
            reads.clone(),
            content.clone(),
            writer.clone(),
            images.clone(),
            MAX_IMAGE_BYTES,
        )),
        portfolio: Arc::new(AdminPortfolioService::new(
            content.clone(),
            writer.clone(),
            images,
            MAX_IMAGE_BYTES,
        )),
        comments: Arc::new(AdminCommentService::new(content.clone(), writer.clone())),
        reviews: Arc::new(AdminReviewService::new(
            reads.clone(),
            content.clone(),
            writer.clone(),
        )),
        faqs: Arc::new(AdminFaqService::new(content, writer.clone())),
        tags: Arc::new(AdminTagService::new(reads, writer.clone())),
        writer,
        db,
    };

    App {
        router: build_admin_router(state, UPLOAD_LIMIT),
        harness,
        uploads,
    }
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn collect(response: axum::response::Response) -> (StatusCode, Value) {
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

async fn send_json(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
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
    collect(response).await
}

async fn send_form(router: &Router, uri: &str, parts: &[Part<'_>]) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .expect("request should build");
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    collect(response).await
}

#[tokio::test]
async fn creating_a_post_derives_a_unique_slug_and_stores_the_image() {
    let app = app();
    app.harness
        .repo
        .create_post(post_params("Build log", "build-log", true, vec![]))
        .await
        .expect("seed post");

    let (status, body) = send_form(
        &app.router,
        "/blog",
        &[
            Part::Text("title", "Build log"),
            Part::Text("content", "Second entry."),
            Part::Text("is_published", "1"),
            Part::Text("order", "2"),
            Part::File {
                name: "image",
                file_name: "cover.png",
                content_type: "image/png",
                data: b"\x89PNG\r\n\x1a\nfake",
            },
        ],
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["slug"], "build-log-2");
    assert_eq!(body["data"]["order"], 2);

    let image = body["data"]["featured_image"]
        .as_str()
        .expect("image path stored");
    assert!(app.uploads.path().join(image).exists());

    let listing = app.harness.content.published_posts().await.expect("listing");
    assert_eq!(listing.len(), 2);
}

#[tokio::test]
async fn removing_a_project_image_promotes_the_next_one() {
    let app = app();
    let png: &[u8] = b"\x89PNG\r\n\x1a\nfake";

    let (status, created) = send_form(
        &app.router,
        "/portfolio",
        &[
            Part::Text("title", "Silent workstation"),
            Part::Text("description", "Ryzen 9, fanless PSU."),
            Part::File {
                name: "images[]",
                file_name: "front.png",
                content_type: "image/png",
                data: png,
            },
            Part::File {
                name: "images[]",
                file_name: "side.png",
                content_type: "image/png",
                data: png,
            },
        ],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let id = created["data"]["id"].as_i64().expect("project id");
    let images = created["data"]["images"].as_array().expect("images");
    assert_eq!(images.len(), 2);
    let first_id = images[0]["id"].as_i64().expect("image id");
    let first_path = images[0]["image_path"].as_str().expect("path").to_string();
    let second_path = images[1]["image_path"].as_str().expect("path").to_string();
    assert_eq!(created["data"]["image_path"], first_path.as_str());

    let first_id = first_id.to_string();
    let (status, updated) = send_form(
        &app.router,
        &format!("/portfolio/{id}"),
        &[
            Part::Text("title", "Silent workstation"),
            Part::Text("description", "Ryzen 9, fanless PSU."),
            Part::Text("delete_images[]", &first_id),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{updated}");
    let images = updated["data"]["images"].as_array().expect("images");
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["image_path"], second_path.as_str());
    assert_eq!(images[0]["is_main"], true);
    assert_eq!(updated["data"]["image_path"], second_path.as_str());
    assert!(!app.uploads.path().join(&first_path).exists());
    assert!(app.uploads.path().join(&second_path).exists());

    let visible = app.harness.content.visible_projects().await.expect("projects");
    assert_eq!(visible[0].image_path.as_deref(), Some(second_path.as_str()));
}

#[tokio::test]
async fn post_form_errors_are_reported_per_field() {
    let app = app();
    let (status, body) = send_form(
        &app.router,
        "/blog",
        &[
            Part::Text("title", ""),
            Part::Text("content", "Body"),
            Part::Text("order", "first"),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["fields"]["order"].is_array());
}

#[tokio::test]
async fn unknown_tags_are_rejected() {
    let app = app();
    let (status, body) = send_form(
        &app.router,
        "/blog",
        &[
            Part::Text("title", "Tagged"),
            Part::Text("content", "Body"),
            Part::Text("tag_ids[]", "77"),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["fields"]["tag_ids"].is_array());
}

#[tokio::test]
async fn faq_crud_refreshes_the_cached_listing() {
    let app = app();

    let (status, _) = send_json(&app.router, Method::GET, "/faq", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, created) = send_json(
        &app.router,
        Method::POST,
        "/faq",
        Some(json!({ "question": "Do you offer financing?", "answer": "Yes.", "order": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["is_visible"], true);

    let (_, listing) = send_json(&app.router, Method::GET, "/faq", None).await;
    assert_eq!(listing.as_array().expect("faq array").len(), 1);

    let id = created["data"]["id"].as_i64().expect("faq id");
    let (status, _) = send_json(&app.router, Method::DELETE, &format!("/faq/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, listing) = send_json(&app.router, Method::GET, "/faq", None).await;
    assert!(listing.as_array().expect("faq array").is_empty());
}

#[tokio::test]
async fn deleting_a_missing_faq_is_not_found() {
    let app = app();
    let (status, body) = send_json(&app.router, Method::DELETE, "/faq/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn comment_approval_moves_it_out_of_the_queue() {
    let app = app();
    let post = app
        .harness
        .repo
        .create_post(post_params("Fan curves", "fan-curves", true, vec![]))
        .await
        .expect("seed post");
    let comment = app
        .harness
        .repo
        .create_comment(comment_params(post.id, "Nora", false))
        .await
        .expect("seed comment");

    let (_, queue) = send_json(&app.router, Method::GET, "/comments", None).await;
    assert_eq!(queue["pending_count"], 1);

    let (status, approved) = send_json(
        &app.router,
        Method::PATCH,
        &format!("/comments/{}/approve", comment.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["data"]["is_approved"], true);

    let (_, queue) = send_json(&app.router, Method::GET, "/comments", None).await;
    assert_eq!(queue["pending_count"], 0);
    assert_eq!(queue["approved"].as_array().expect("approved").len(), 1);

    let detail = app
        .harness
        .content
        .post_detail("fan-curves")
        .await
        .expect("detail");
    assert_eq!(detail.comments.len(), 1);
}

#[tokio::test]
async fn review_approval_toggles_visibility() {
    let app = app();
    let (status, created) = send_json(
        &app.router,
        Method::POST,
        "/reviews",
        Some(json!({
            "name": "Omar",
            "rating": 4,
            "comment": "Great support.",
            "is_featured": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["data"]["id"].as_i64().expect("review id");

    let (status, _) = send_json(
        &app.router,
        Method::PATCH,
        &format!("/reviews/{id}/approval"),
        Some(json!({ "approved": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.harness
            .content
            .featured_reviews(6)
            .await
            .expect("featured")
            .len(),
        1
    );

    let (_, listing) = send_json(&app.router, Method::GET, "/reviews", None).await;
    assert_eq!(listing["pending_count"], 0);
}

#[tokio::test]
async fn duplicate_tag_names_are_rejected() {
    let app = app();
    let (status, _) = send_json(
        &app.router,
        Method::POST,
        "/tags",
        Some(json!({ "name": "Liquid cooling" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send_json(
        &app.router,
        Method::POST,
        "/tags",
        Some(json!({ "name": "Liquid cooling" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["fields"]["name"].is_array());
}

#[tokio::test]
async fn dashboard_reflects_revenue_updates() {
    let app = app();
    let (status, before) =
        send_json(&app.router, Method::GET, "/dashboard?year=2024", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(before["revenue"]["total"], 0.0);

    let (status, _) = send_json(
        &app.router,
        Method::POST,
        "/dashboard/monthly-revenue",
        Some(json!({ "month": 3, "year": 2024, "amount": 4500.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, after) = send_json(&app.router, Method::GET, "/dashboard?year=2024", None).await;
    assert_eq!(after["revenue"]["months"][2], 4500.0);
    assert_eq!(after["revenue"]["total"], 4500.0);
    assert!(
        after["revenue"]["available_years"]
            .as_array()
            .expect("years")
            .contains(&json!(2024))
    );
}

#[tokio::test]
async fn invalid_revenue_month_is_rejected() {
    let app = app();
    let (status, body) = send_json(
        &app.router,
        Method::POST,
        "/dashboard/monthly-revenue",
        Some(json!({ "month": 13, "year": 2024, "amount": 10.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["fields"]["month"].is_array());
}

#[tokio::test]
async fn flush_endpoint_reports_attempted_keys() {
    let app = app();
    let (status, body) = send_json(&app.router, Method::POST, "/cache/flush", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["attempted"].as_u64().expect("attempted") > 0);
    assert!(body.get("warnings").is_none());
}

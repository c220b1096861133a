//! Integration tests for the course, hole, and hole image HTTP routes.

mod common;

use common::{png_bytes, FakeGenerator, TestHarness};
use fairway::config::Config;
use fairway::server::user::USER_HEADER;
use fairway_common::{ImageStatus, UserId};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};

fn file_form(bytes: Vec<u8>, filename: &str, content_type: &str) -> Form {
    let part = Part::bytes(bytes)
        .file_name(filename.to_string())
        .mime_str(content_type)
        .unwrap();
    Form::new().part("file", part)
}

async fn upload(
    addr: std::net::SocketAddr,
    hole_id: &str,
    user: UserId,
    form: Form,
) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/api/holes/{hole_id}/images"))
        .header(USER_HEADER, user.to_string())
        .multipart(form)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_check() {
    let (_h, addr) = TestHarness::with_server().await;
    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn create_course_generates_holes() {
    let (_h, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/api/courses"))
        .json(&json!({ "name": "Links", "location": "St Andrews", "num_holes": 9 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["name"], "Links");
    assert!(body["style_seed"].is_i64(), "a seed is assigned");

    let holes = body["holes"].as_array().unwrap();
    assert_eq!(holes.len(), 9);
    let numbers: Vec<i64> = holes.iter().map(|h| h["number"].as_i64().unwrap()).collect();
    assert_eq!(numbers, (1..=9).collect::<Vec<_>>());

    // Unsupported counts fall back to 18.
    let resp = client
        .post(format!("http://{addr}/api/courses"))
        .json(&json!({ "name": "Dunes", "location": "Carnoustie", "num_holes": 12 }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["holes"].as_array().unwrap().len(), 18);

    let list: Value = reqwest::get(format!("http://{addr}/api/courses"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn hole_page_has_topics_and_no_display_image() {
    let (h, addr) = TestHarness::with_server().await;
    let (course, holes) = h.create_course(18);

    let resp = reqwest::get(format!("http://{addr}/api/courses/{}/holes/3", course.id))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["id"], holes[2].id.to_string());
    assert_eq!(body["number"], 3);
    assert!(body["display_image"].is_null());
    assert_eq!(body["images_topic"], format!("hole_{}_images", holes[2].id));
    assert_eq!(body["flash_topic"], format!("hole_{}_flash", holes[2].id));

    let resp = reqwest::get(format!("http://{addr}/api/courses/{}/holes/19", course.id))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn update_hole_details() {
    let (h, addr) = TestHarness::with_server().await;
    let hole = h.first_hole();
    let client = reqwest::Client::new();

    let resp = client
        .patch(format!("http://{addr}/api/holes/{}", hole.id))
        .json(&json!({ "par": 4, "yardage": 412 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["par"], 4);
    assert_eq!(body["yardage"], 412);

    let resp = client
        .patch(format!("http://{addr}/api/holes/{}", hole.id))
        .json(&json!({ "par": 9 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn display_image_404_without_ready_images() {
    let (h, addr) = TestHarness::with_server().await;
    let hole = h.first_hole();

    let resp = reqwest::get(format!(
        "http://{addr}/api/holes/{}/images/display",
        hole.id
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn upload_requires_user_header() {
    let (h, addr) = TestHarness::with_server().await;
    let hole = h.first_hole();

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/holes/{}/images", hole.id))
        .multipart(file_form(png_bytes(4, 4), "a.png", "image/png"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn upload_then_display_and_serve_file() {
    let (h, addr) = TestHarness::with_server().await;
    let hole = h.first_hole();
    let hole_id = hole.id.to_string();

    let resp = upload(
        addr,
        &hole_id,
        UserId::new(),
        file_form(png_bytes(8, 8), "green.png", "image/png"),
    )
    .await;
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["kind"], "original");
    assert_eq!(body["status"], "processing");

    let original_id = body["id"].as_str().unwrap().parse().unwrap();
    h.wait_for_status(original_id, ImageStatus::Ready).await;
    h.wait_for_image_count(&hole, 2).await;

    let display: Value = reqwest::get(format!("http://{addr}/api/holes/{hole_id}/images/display"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(display["kind"], "stylized");

    let stylized_id = display["id"].as_str().unwrap();
    let resp = reqwest::get(format!("http://{addr}/api/images/{stylized_id}/file"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap().to_str().unwrap(),
        "image/png"
    );
    let bytes = resp.bytes().await.unwrap();
    assert!(bytes.starts_with(b"\x89PNG"));

    let recent: Value = reqwest::get(format!("http://{addr}/api/holes/{hole_id}/images/recent"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(recent.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn upload_rejects_unsupported_type() {
    let (h, addr) = TestHarness::with_server().await;
    let hole = h.first_hole();

    let resp = upload(
        addr,
        &hole.id.to_string(),
        UserId::new(),
        file_form(b"%PDF-1.4".to_vec(), "card.pdf", "application/pdf"),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Only image and video uploads are supported.");
    assert!(h.images_for(&hole).is_empty());
}

#[tokio::test]
async fn upload_rejects_oversized_file() {
    let mut config = Config::default();
    config.uploads.max_bytes = 1024;
    let harness = TestHarness::with_config_and_generator(config, FakeGenerator::succeeding());
    let (h, addr) = TestHarness::serve(harness).await;
    let hole = h.first_hole();

    let resp = upload(
        addr,
        &hole.id.to_string(),
        UserId::new(),
        file_form(vec![0u8; 4096], "big.png", "image/png"),
    )
    .await;
    assert_eq!(resp.status(), 413);
    assert!(h.images_for(&hole).is_empty());
}

#[tokio::test]
async fn votes_are_recounted_per_user() {
    let (h, addr) = TestHarness::with_server().await;
    let hole = h.first_hole();
    let image = h
        .ctx
        .images
        .upload(hole.id, UserId::new(), common::video_upload())
        .await
        .unwrap();
    let url = format!("http://{addr}/api/holes/{}/images/{}/vote", hole.id, image.id);
    let client = reqwest::Client::new();

    let voter = UserId::new();
    let vote = |user: UserId, value: i64| {
        client
            .post(&url)
            .header(USER_HEADER, user.to_string())
            .json(&json!({ "value": value }))
            .send()
    };

    let body: Value = vote(voter, 1).await.unwrap().json().await.unwrap();
    assert_eq!(body["upvotes_count"], 1);
    assert_eq!(body["downvotes_count"], 0);

    // Same user switching sides replaces the vote.
    let body: Value = vote(voter, -1).await.unwrap().json().await.unwrap();
    assert_eq!(body["upvotes_count"], 0);
    assert_eq!(body["downvotes_count"], 1);

    // Anything other than -1 counts as an upvote.
    let body: Value = vote(UserId::new(), 5).await.unwrap().json().await.unwrap();
    assert_eq!(body["upvotes_count"], 1);
    assert_eq!(body["downvotes_count"], 1);
    assert_eq!(body["score"], 0.5);

    let stored = h.image(image.id);
    assert_eq!((stored.upvotes_count, stored.downvotes_count), (1, 1));
}

#[tokio::test]
async fn only_uploader_can_delete() {
    let (h, addr) = TestHarness::with_server().await;
    let hole = h.first_hole();
    let owner = UserId::new();
    let image = h
        .ctx
        .images
        .upload(hole.id, owner, common::video_upload())
        .await
        .unwrap();
    let url = format!("http://{addr}/api/holes/{}/images/{}", hole.id, image.id);
    let client = reqwest::Client::new();

    let resp = client
        .delete(&url)
        .header(USER_HEADER, UserId::new().to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "You can only delete your own uploads.");

    let resp = client
        .delete(&url)
        .header(USER_HEADER, owner.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    assert!(h.images_for(&hole).is_empty());

    let resp = client
        .delete(&url)
        .header(USER_HEADER, owner.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn redo_is_limited_to_uploader_and_images() {
    let (h, addr) = TestHarness::with_server().await;
    let hole = h.first_hole();
    let owner = UserId::new();
    let video = h
        .ctx
        .images
        .upload(hole.id, owner, common::video_upload())
        .await
        .unwrap();
    let url = format!("http://{addr}/api/holes/{}/images/{}/redo", hole.id, video.id);
    let client = reqwest::Client::new();

    let resp = client
        .post(&url)
        .header(USER_HEADER, UserId::new().to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = client
        .post(&url)
        .header(USER_HEADER, owner.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Only images can be stylized.");
}

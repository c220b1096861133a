//! Integration tests for the upload → stylize → display lifecycle.

mod common;

use assert_matches::assert_matches;
use common::{png_bytes, png_upload, video_upload, FakeGenerator, Reply, TestHarness};
use fairway::state::HoleEvent;
use fairway::stylize::{StylizeJob, StylizeOutcome, Stylizer, NO_IMAGE_MESSAGE};
use fairway_common::{ImageKind, ImageStatus, StylizationStatus};
use fairway_db::queries::courses::NewCourse;
use fairway_db::queries::hole_images;

fn stylizer(h: &TestHarness) -> Stylizer {
    Stylizer::new(
        h.db.clone(),
        h.ctx.images.store().clone(),
        h.ctx.events.clone(),
        h.generator.clone(),
    )
}

#[tokio::test]
async fn image_upload_produces_stylized_rendition() {
    let h = TestHarness::new();
    let hole = h.first_hole();
    let user = TestHarness::user();

    let original = h.ctx.images.upload(hole.id, user, png_upload()).await.unwrap();
    assert_eq!(original.kind, ImageKind::Original);
    assert_eq!(original.status, ImageStatus::Processing);
    assert!(original.attachment.is_some());

    let original = h.wait_for_status(original.id, ImageStatus::Ready).await;
    assert!(original.error_message.is_none());

    let images = h.wait_for_image_count(&hole, 2).await;
    let stylized = images
        .iter()
        .find(|i| i.kind == ImageKind::Stylized)
        .expect("stylized rendition");
    assert_eq!(stylized.source_image_id, Some(original.id));
    assert_eq!(stylized.user_id, user);
    assert_eq!(stylized.status, ImageStatus::Ready);

    let attachment = stylized.attachment.as_ref().unwrap();
    assert_eq!(attachment.content_type, "image/png");
    assert_eq!(attachment.filename, "styled.png");

    // Only the stylized rendition is eligible for display now.
    let display = h.ctx.images.display_images(hole.id).unwrap();
    assert_eq!(display.len(), 1);
    assert_eq!(display[0].id, stylized.id);

    let hole = h.ctx.images.hole(hole.id).unwrap();
    assert_eq!(hole.stylization_status, Some(StylizationStatus::Ready));
}

#[tokio::test]
async fn video_upload_is_ready_without_stylization() {
    let h = TestHarness::new();
    let hole = h.first_hole();

    let video = h
        .ctx
        .images
        .upload(hole.id, TestHarness::user(), video_upload())
        .await
        .unwrap();
    assert_eq!(video.status, ImageStatus::Ready);

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(h.generator.calls(), 0);
    assert!(h.ctx.images.display_images(hole.id).unwrap().is_empty());
}

#[tokio::test]
async fn empty_generation_marks_upload_and_hole_failed() {
    let h = TestHarness::with_generator(FakeGenerator::new(vec![Reply::NoImage]));
    let hole = h.first_hole();

    let original = h
        .ctx
        .images
        .upload(hole.id, TestHarness::user(), png_upload())
        .await
        .unwrap();
    let failed = h.wait_for_status(original.id, ImageStatus::Failed).await;
    assert_eq!(failed.error_message.as_deref(), Some(NO_IMAGE_MESSAGE));

    let hole = h.ctx.images.hole(hole.id).unwrap();
    assert_eq!(hole.stylization_status, Some(StylizationStatus::Failed));
    assert_eq!(hole.stylization_error.as_deref(), Some(NO_IMAGE_MESSAGE));
    assert_eq!(h.images_for(&hole).len(), 1);
}

#[tokio::test]
async fn generator_error_is_recorded_on_upload() {
    let h = TestHarness::with_generator(FakeGenerator::new(vec![Reply::Fail(
        "bad request".into(),
    )]));
    let hole = h.first_hole();

    let original = h
        .ctx
        .images
        .upload(hole.id, TestHarness::user(), png_upload())
        .await
        .unwrap();
    let failed = h.wait_for_status(original.id, ImageStatus::Failed).await;
    let message = failed.error_message.unwrap();
    assert!(message.contains("400"), "unexpected message: {message}");
    assert!(message.contains("bad request"));
}

#[tokio::test]
async fn redo_after_failure_stylizes_again() {
    let generator = FakeGenerator::new(vec![Reply::NoImage, Reply::Image(png_bytes(4, 4))]);
    let h = TestHarness::with_generator(generator);
    let hole = h.first_hole();
    let user = TestHarness::user();

    let original = h.ctx.images.upload(hole.id, user, png_upload()).await.unwrap();
    h.wait_for_status(original.id, ImageStatus::Failed).await;

    let redone = h.ctx.images.redo(hole.id, original.id, user).await.unwrap();
    assert_eq!(redone.status, ImageStatus::Processing);

    let ready = h.wait_for_status(original.id, ImageStatus::Ready).await;
    assert!(ready.error_message.is_none());
    h.wait_for_image_count(&hole, 2).await;
    assert_eq!(h.generator.calls(), 2);
}

#[tokio::test]
async fn course_seed_is_passed_to_generator() {
    let h = TestHarness::new();
    let (_, holes) =
        h.create_course_with(NewCourse::new("Seaside", "Fife").with_style_seed(4242), 9);
    let hole = &holes[0];

    let original = h
        .ctx
        .images
        .upload(hole.id, TestHarness::user(), png_upload())
        .await
        .unwrap();
    h.wait_for_status(original.id, ImageStatus::Ready).await;
    assert_eq!(h.generator.seeds(), vec![Some(4242)]);
}

#[tokio::test]
async fn stylizer_outcomes() {
    let h = TestHarness::with_generator(FakeGenerator::new(vec![
        Reply::Image(png_bytes(4, 4)),
        Reply::NoImage,
    ]));
    let hole = h.first_hole();

    // Insert directly so the queue does not race the inline runs.
    let original = {
        let (attachment, _pin) = h
            .ctx
            .images
            .store()
            .store(&png_bytes(8, 8), "image/png", "a.png")
            .unwrap();
        let conn = h.conn();
        let image = hole_images::insert_hole_image(
            &conn,
            &fairway_db::models::NewHoleImage::upload(hole.id, TestHarness::user()),
        )
        .unwrap();
        hole_images::attach(&conn, image.id, &attachment).unwrap()
    };
    let stylizer = stylizer(&h);

    let outcome = stylizer.run(&StylizeJob::for_upload(hole.id, original.id)).await;
    assert_matches!(outcome, StylizeOutcome::Completed { stylized_id: Some(_) });

    let outcome = stylizer.run(&StylizeJob::for_upload(hole.id, original.id)).await;
    assert_matches!(outcome, StylizeOutcome::NoImage);

    // No upload and no layout: nothing to do.
    let outcome = stylizer.run(&StylizeJob::for_layout(hole.id)).await;
    assert_matches!(outcome, StylizeOutcome::Skipped);
}

#[tokio::test]
async fn layout_upload_sets_stylized_layout() {
    let h = TestHarness::new();
    let hole = h.first_hole();

    let updated = h.ctx.images.upload_layout(hole.id, png_upload()).await.unwrap();
    assert_eq!(updated.layout.as_ref().unwrap().filename, "hole.png");

    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    let hole = loop {
        let hole = h.ctx.images.hole(hole.id).unwrap();
        if hole.stylization_status == Some(StylizationStatus::Ready) {
            break hole;
        }
        assert!(tokio::time::Instant::now() < deadline, "layout never stylized");
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    };

    let stylized = hole.stylized_layout.expect("stylized layout");
    assert_eq!(stylized.filename, "hole_stylized.png");
    let (attachment, bytes) = h.ctx.images.layout_file(hole.id, true).unwrap();
    assert_eq!(attachment.key, stylized.key);
    assert!(!bytes.is_empty());
}

#[tokio::test]
async fn upload_events_reach_subscribers() {
    let h = TestHarness::new();
    let hole = h.first_hole();
    let mut rx = h.ctx.events.subscribe();

    let original = h
        .ctx
        .images
        .upload(hole.id, TestHarness::user(), png_upload())
        .await
        .unwrap();
    h.wait_for_status(original.id, ImageStatus::Ready).await;
    h.wait_for_image_count(&hole, 2).await;

    let mut created = 0;
    let mut flash_cleared = false;
    while let Ok(event) = rx.try_recv() {
        assert_eq!(event.hole_id(), hole.id);
        match event {
            HoleEvent::TileCreated { .. } => created += 1,
            HoleEvent::FlashCleared { .. } => flash_cleared = true,
            _ => {}
        }
    }
    assert_eq!(created, 2, "original and stylized tiles");
    assert!(flash_cleared);
}

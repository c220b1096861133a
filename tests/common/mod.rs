//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB, a temporary
//! attachment directory, a scripted [`FakeGenerator`], and a full
//! [`AppContext`]. The [`TestHarness::with_server`] constructor starts Axum
//! on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;
use tokio::task::JoinHandle;

use fairway::config::Config;
use fairway::generation::{GenerationError, ImageGenerator};
use fairway::images::UploadedFile;
use fairway::server::{create_router, AppContext};
use fairway_common::{HoleImageId, ImageStatus, UserId};
use fairway_db::models::{Course, Hole, HoleImage};
use fairway_db::pool::{init_memory_pool, DbPool, PooledConnection};
use fairway_db::queries::courses::NewCourse;

/// What the fake generator answers for one call.
#[derive(Debug, Clone)]
pub enum Reply {
    Image(Vec<u8>),
    NoImage,
    Fail(String),
}

/// Scripted [`ImageGenerator`].
///
/// Replies are consumed in order; the last one repeats once the script runs
/// out.
pub struct FakeGenerator {
    replies: Mutex<Vec<Reply>>,
    calls: AtomicUsize,
    seeds: Mutex<Vec<Option<i64>>>,
}

impl FakeGenerator {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies),
            calls: AtomicUsize::new(0),
            seeds: Mutex::new(Vec::new()),
        })
    }

    /// Always returns a small stylized PNG.
    pub fn succeeding() -> Arc<Self> {
        Self::new(vec![Reply::Image(png_bytes(4, 4))])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seeds(&self) -> Vec<Option<i64>> {
        self.seeds.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for FakeGenerator {
    fn name(&self) -> &str {
        "fake"
    }

    async fn stylize(
        &self,
        _input: &[u8],
        _mime_type: &str,
        seed: Option<i64>,
    ) -> Result<Option<Vec<u8>>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seeds.lock().unwrap().push(seed);

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                replies.remove(0)
            } else {
                replies.first().cloned().unwrap_or(Reply::NoImage)
            }
        };

        match reply {
            Reply::Image(bytes) => Ok(Some(bytes)),
            Reply::NoImage => Ok(None),
            Reply::Fail(message) => Err(GenerationError::Status {
                status: 400,
                message,
            }),
        }
    }
}

/// Encode a solid-colour PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([34, 139, 34]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .expect("failed to encode png");
    out.into_inner()
}

pub fn png_upload() -> UploadedFile {
    UploadedFile {
        filename: "hole.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: png_bytes(8, 8),
    }
}

pub fn video_upload() -> UploadedFile {
    UploadedFile {
        filename: "flyover.mp4".to_string(),
        content_type: "video/mp4".to_string(),
        bytes: b"\x00\x00\x00\x18ftypmp42 fake video".to_vec(),
    }
}

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory database.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub generator: Arc<FakeGenerator>,
    pub dispatcher: JoinHandle<()>,
    _data_dir: TempDir,
}

impl TestHarness {
    /// Create a new harness whose generator always succeeds.
    pub fn new() -> Self {
        Self::with_generator(FakeGenerator::succeeding())
    }

    /// Create a new harness with a scripted generator.
    pub fn with_generator(generator: Arc<FakeGenerator>) -> Self {
        Self::with_config_and_generator(Config::default(), generator)
    }

    pub fn with_config_and_generator(mut config: Config, generator: Arc<FakeGenerator>) -> Self {
        let data_dir = tempfile::tempdir().expect("failed to create temp dir");
        config.storage.data_dir = data_dir.path().to_path_buf();

        let db = init_memory_pool().expect("failed to create in-memory pool");
        let (ctx, dispatcher) = AppContext::build(config, db.clone(), generator.clone());

        Self {
            ctx,
            db,
            generator,
            dispatcher,
            _data_dir: data_dir,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::serve(Self::new()).await
    }

    pub async fn serve(harness: Self) -> (Self, SocketAddr) {
        let app = create_router(harness.ctx.clone(), None);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Get a database connection from the pool.
    ///
    /// The in-memory pool holds one connection; drop this before awaiting
    /// anything that touches the database.
    pub fn conn(&self) -> PooledConnection {
        fairway_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }

    /// Create a course with `holes` holes.
    pub fn create_course(&self, holes: i64) -> (Course, Vec<Hole>) {
        self.create_course_with(NewCourse::new("Pebble Creek", "Monterey, CA"), holes)
    }

    pub fn create_course_with(&self, new: NewCourse, holes: i64) -> (Course, Vec<Hole>) {
        let course = self
            .ctx
            .images
            .create_course(&new, holes)
            .expect("failed to create course");
        let (course, holes) = self
            .ctx
            .images
            .course_with_holes(course.id)
            .expect("failed to load course");
        (course, holes)
    }

    pub fn first_hole(&self) -> Hole {
        self.create_course(18).1.remove(0)
    }

    pub fn image(&self, id: HoleImageId) -> HoleImage {
        let conn = self.conn();
        fairway_db::queries::hole_images::get_hole_image(&conn, id)
            .expect("query failed")
            .expect("image not found")
    }

    pub fn images_for(&self, hole: &Hole) -> Vec<HoleImage> {
        let conn = self.conn();
        fairway_db::queries::hole_images::list_for_hole(&conn, hole.id).expect("query failed")
    }

    /// Poll until `id` reaches `status`.
    pub async fn wait_for_status(&self, id: HoleImageId, status: ImageStatus) -> HoleImage {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let image = self.image(id);
            if image.status == status {
                return image;
            }
            if tokio::time::Instant::now() > deadline {
                panic!("image {id} stuck in {} waiting for {status}", image.status);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Poll until the hole has `count` image rows.
    pub async fn wait_for_image_count(&self, hole: &Hole, count: usize) -> Vec<HoleImage> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let images = self.images_for(hole);
            if images.len() == count {
                return images;
            }
            if tokio::time::Instant::now() > deadline {
                panic!("hole has {} images, expected {count}", images.len());
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    pub fn user() -> UserId {
        UserId::new()
    }
}

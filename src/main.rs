mod cli;

use fairway::{
    config,
    generation::GeminiClient,
    images::AttachmentStore,
    server,
    state::EventBus,
    stylize::{StylizeJob, StylizeOutcome, Stylizer},
};
use fairway_common::{HoleId, HoleImageId};
use fairway_crop::{Container, CropSession, PickedFile};
use fairway_db::pool::{get_conn, init_pool, DbPool};
use fairway_db::queries::courses::{self, NewCourse};
use fairway_db::queries::holes;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;

fn open_database(config: &config::Config) -> Result<DbPool> {
    let data_dir = &config.storage.data_dir;
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

    let db_path = config.storage.database_path();
    let db_path_str = db_path.to_string_lossy();
    tracing::info!("Opening database at {}", db_path_str);
    Ok(init_pool(&db_path_str)?)
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting fairway server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    let pool = open_database(&config)?;
    server::start_server(config, pool).await
}

async fn stylize_once(
    hole_id: &str,
    image_id: Option<&str>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let hole_id: HoleId = hole_id.parse().context("Invalid hole ID")?;
    let image_id: Option<HoleImageId> = image_id
        .map(|id| id.parse().context("Invalid image ID"))
        .transpose()?;

    let pool = open_database(&config)?;
    let generator = Arc::new(GeminiClient::from_config(&config.generation)?);
    let stylizer = Stylizer::new(
        pool,
        AttachmentStore::new(config.storage.attachments_dir()),
        EventBus::new(),
        generator,
    );

    let outcome = stylizer.run(&StylizeJob { hole_id, image_id }).await;
    match &outcome {
        StylizeOutcome::Completed {
            stylized_id: Some(id),
        } => println!("Stylized image created: {id}"),
        StylizeOutcome::Completed { stylized_id: None } => {
            println!("Stylized layout attached to hole {hole_id}")
        }
        StylizeOutcome::NoImage => println!("No image returned; marked failed"),
        StylizeOutcome::Failed(message) => println!("Stylization failed: {message}"),
        StylizeOutcome::Skipped => println!("Nothing to stylize for hole {hole_id}"),
    }
    Ok(())
}

struct CropArgs {
    aspect: String,
    zoom: f64,
    offset: (f64, f64),
    container: Container,
}

fn crop_file(input: &Path, out: &Path, args: CropArgs) -> Result<()> {
    let bytes = std::fs::read(input)
        .with_context(|| format!("Failed to read input: {}", input.display()))?;
    let content_type = image::ImageFormat::from_path(input)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut session = CropSession::new(args.container);
    session.open(PickedFile {
        name,
        content_type: content_type.to_string(),
        bytes,
    })?;
    session.set_aspect(&args.aspect)?;
    session.set_zoom(args.zoom)?;
    session.pointer_down(0.0, 0.0);
    session.pointer_move(args.offset.0, args.offset.1);
    session.pointer_up();

    let rect = session.crop_rect(None)?;
    let Some(cropped) = session.confirm(None)? else {
        anyhow::bail!("Crop rectangle is empty; nothing written");
    };

    std::fs::write(out, &cropped.bytes)
        .with_context(|| format!("Failed to write output: {}", out.display()))?;
    println!(
        "Cropped {}x{} at ({}, {}) -> {} ({}x{}, {})",
        rect.width,
        rect.height,
        rect.left,
        rect.top,
        out.display(),
        cropped.width,
        cropped.height,
        cropped.content_type
    );
    Ok(())
}

fn add_course(
    config_path: Option<&Path>,
    new: NewCourse,
    num_holes: i64,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let pool = open_database(&config)?;
    let conn = get_conn(&pool)?;

    let course = courses::create_course(&conn, &new, num_holes)?;
    let hole_count = holes::list_holes(&conn, course.id)?.len();
    println!(
        "Created course {} ({}, {}) with {} holes",
        course.id, course.name, course.location, hole_count
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "fairway=trace,fairway_db=debug,fairway_crop=debug,tower_http=debug".to_string()
        } else {
            "fairway=debug,fairway_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Stylize { hole_id, image } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(stylize_once(&hole_id, image.as_deref(), cli.config.as_deref()))
        }
        Commands::Crop {
            input,
            out,
            aspect,
            zoom,
            offset_x,
            offset_y,
            viewport_width,
            viewport_height,
        } => crop_file(
            &input,
            &out,
            CropArgs {
                aspect,
                zoom,
                offset: (offset_x, offset_y),
                container: Container {
                    width: viewport_width,
                    available_height: viewport_height,
                },
            },
        ),
        Commands::AddCourse {
            name,
            location,
            holes,
            seed,
            description,
        } => {
            let mut new = NewCourse::new(name, location);
            new.style_seed = seed;
            new.description = description;
            add_course(cli.config.as_deref(), new, holes)
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("fairway {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Data dir: {}", config.storage.data_dir.display());
            println!("  Generation model: {}", config.generation.model);
            println!(
                "  API key: {}",
                if config.generation.resolved_api_key().is_some() {
                    "configured"
                } else {
                    "missing"
                }
            );
            println!(
                "  Jobs: {} workers, queue capacity {}",
                config.jobs.workers, config.jobs.queue_capacity
            );
            println!("  Max upload: {} bytes", config.uploads.max_bytes);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Data dir: {}", config.storage.data_dir.display());
        }
    }

    Ok(())
}

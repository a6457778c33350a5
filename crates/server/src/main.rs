use std::path::PathBuf;
use std::process;

use actix_web::{web, App, HttpServer};
use clap::Parser;

use facecast_core::capture::domain::frame_source::FrameSource;
use facecast_core::capture::infrastructure::nokhwa_camera::NokhwaCamera;
use facecast_core::capture::infrastructure::test_pattern_source::TestPatternSource;
use facecast_core::detection::domain::face_scanner::FaceScanner;
use facecast_core::detection::infrastructure::onnx_box_detector::OnnxBoxDetector;
use facecast_core::encode::jpeg_encoder::JpegEncoder;
use facecast_core::pipeline::frame_hub::{FrameHub, HubConfig};
use facecast_core::pipeline::frame_processor::FrameProcessor;
use facecast_core::shared::constants::{
    DEFAULT_EYE_CONFIDENCE, DEFAULT_FACE_CONFIDENCE, EYE_MODEL_INPUT, EYE_MODEL_NAME,
    EYE_MODEL_URL, FACE_MODEL_INPUT, FACE_MODEL_NAME, FACE_MODEL_URL,
};
use facecast_core::shared::model_resolver;

mod mjpeg;
mod routes;

/// Live webcam face and eye annotation streamed as MJPEG.
#[derive(Parser)]
#[command(name = "facecast")]
struct Cli {
    /// Address to bind the HTTP server to.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Capture source: camera or test-pattern.
    #[arg(long, default_value = "camera")]
    source: String,

    /// Camera device index.
    #[arg(long, default_value = "0")]
    camera: u32,

    /// Requested capture width (requires --height; the device may negotiate).
    #[arg(long)]
    width: Option<u32>,

    /// Requested capture height (requires --width).
    #[arg(long)]
    height: Option<u32>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_FACE_CONFIDENCE)]
    face_confidence: f32,

    /// Eye detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_EYE_CONFIDENCE)]
    eye_confidence: f32,

    /// Run detection every Nth frame (1 = every frame).
    #[arg(long, default_value = "1")]
    detect_every: usize,

    /// JPEG quality (1-100).
    #[arg(long, default_value = "80")]
    jpeg_quality: u8,

    /// Directory with pre-downloaded model files.
    #[arg(long)]
    model_dir: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    // Everything that can fail from configuration fails here, before the
    // server binds: model load, detector session, camera open. Setup stays
    // synchronous: the blocking model download must not run inside the
    // server runtime.
    let scanner = build_scanner(&cli)?;
    let processor = FrameProcessor::new(scanner, JpegEncoder::new(cli.jpeg_quality));

    let mut source = build_source(&cli);
    let format = source.open()?;
    log::info!(
        "capture ready: {}x{} @ {} fps",
        format.width,
        format.height,
        format.fps
    );

    let hub = web::Data::new(FrameHub::new(HubConfig::default()));
    hub.start(source, processor);

    log::info!("listening on http://{}", cli.bind);
    let data = hub.clone();
    let bind = cli.bind.clone();
    actix_web::rt::System::new().block_on(async move {
        HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .service(routes::index)
                .service(routes::video_feed)
        })
        .bind(&bind)?
        .run()
        .await
    })?;

    hub.stop();
    Ok(())
}

fn build_source(cli: &Cli) -> Box<dyn FrameSource> {
    let requested = match (cli.width, cli.height) {
        (Some(w), Some(h)) => Some((w, h)),
        _ => None,
    };

    if cli.source == "test-pattern" {
        let (w, h) = requested.unwrap_or((640, 480));
        Box::new(TestPatternSource::new(w, h))
    } else {
        Box::new(NokhwaCamera::new(cli.camera, requested))
    }
}

fn build_scanner(cli: &Cli) -> Result<FaceScanner, Box<dyn std::error::Error>> {
    let face_path = resolve_model(FACE_MODEL_NAME, FACE_MODEL_URL, cli)?;
    let eye_path = resolve_model(EYE_MODEL_NAME, EYE_MODEL_URL, cli)?;

    let face = OnnxBoxDetector::new(&face_path, FACE_MODEL_INPUT, cli.face_confidence)?;
    let eye = OnnxBoxDetector::new(&eye_path, EYE_MODEL_INPUT, cli.eye_confidence)?;

    Ok(FaceScanner::new(
        Box::new(face),
        Box::new(eye),
        cli.detect_every,
    )?)
}

fn resolve_model(
    name: &str,
    url: &str,
    cli: &Cli,
) -> Result<PathBuf, model_resolver::ModelResolveError> {
    log::info!("Resolving model: {name}");
    let path = model_resolver::resolve(
        name,
        url,
        cli.model_dir.as_deref(),
        Some(Box::new(download_progress)),
    )?;
    eprintln!();
    Ok(path)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.source != "camera" && cli.source != "test-pattern" {
        return Err(format!(
            "Source must be 'camera' or 'test-pattern', got '{}'",
            cli.source
        )
        .into());
    }
    if cli.width.is_some() != cli.height.is_some() {
        return Err("--width and --height must be given together".into());
    }
    if !(0.0..=1.0).contains(&cli.face_confidence) {
        return Err(format!(
            "Face confidence must be between 0.0 and 1.0, got {}",
            cli.face_confidence
        )
        .into());
    }
    if !(0.0..=1.0).contains(&cli.eye_confidence) {
        return Err(format!(
            "Eye confidence must be between 0.0 and 1.0, got {}",
            cli.eye_confidence
        )
        .into());
    }
    if cli.detect_every < 1 {
        return Err("--detect-every must be at least 1".into());
    }
    if cli.jpeg_quality == 0 || cli.jpeg_quality > 100 {
        return Err(format!(
            "JPEG quality must be between 1 and 100, got {}",
            cli.jpeg_quality
        )
        .into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading detection model... {pct}%");
    } else {
        eprint!("\rDownloading detection model... {downloaded} bytes");
    }
}

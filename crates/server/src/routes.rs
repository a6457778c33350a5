//! Route definitions.

use actix_web::{get, web, HttpResponse, Responder};

use facecast_core::pipeline::frame_hub::FrameHub;

use crate::mjpeg;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<title>facecast</title>
</head>
<body>
<div class="container">
    <h3>Live annotated stream</h3>
    <img src="/video_feed" width="100%">
</div>
</body>
</html>
"#;

/// Index page embedding the live stream.
#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

/// The MJPEG stream. Each request gets its own subscription to the shared
/// frame hub; dropping the connection drops the subscription and nothing
/// else.
#[get("/video_feed")]
pub async fn video_feed(hub: web::Data<FrameHub>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(mjpeg::content_type())
        .streaming(mjpeg::body_stream(hub.subscribe()))
}

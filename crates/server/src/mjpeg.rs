//! Multipart-replace framing for the MJPEG response body.

use std::convert::Infallible;

use actix_web::web::Bytes;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

/// Multipart boundary token. Fixed: browsers key the replace behavior off
/// the boundary declared in the Content-Type header.
pub const BOUNDARY: &str = "frame";

pub fn content_type() -> String {
    format!("multipart/x-mixed-replace; boundary={BOUNDARY}")
}

/// Frames one encoded image as a multipart part:
/// `--frame\r\nContent-Type: image/jpeg\r\n\r\n<JPEG bytes>\r\n`
pub fn part(jpeg: &[u8]) -> Bytes {
    let mut buf = Vec::with_capacity(jpeg.len() + BOUNDARY.len() + 40);
    buf.extend_from_slice(b"--");
    buf.extend_from_slice(BOUNDARY.as_bytes());
    buf.extend_from_slice(b"\r\nContent-Type: image/jpeg\r\n\r\n");
    buf.extend_from_slice(jpeg);
    buf.extend_from_slice(b"\r\n");
    Bytes::from(buf)
}

/// Adapts a hub subscription into a multipart body stream.
///
/// Ends when the hub's pipeline terminates. A client that lags behind the
/// broadcast capacity skips to the newest chunk; under replace semantics
/// the viewer only ever wanted the newest frame anyway.
pub fn body_stream(
    rx: broadcast::Receiver<Bytes>,
) -> impl Stream<Item = Result<Bytes, Infallible>> {
    BroadcastStream::new(rx).filter_map(|item| match item {
        Ok(jpeg) => Some(Ok(part(&jpeg))),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            log::debug!("subscriber lagged, skipped {skipped} chunks");
            None
        }
    })
}

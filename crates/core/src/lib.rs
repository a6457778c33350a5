//! Core library for facecast: webcam capture, face/eye detection,
//! annotation, and MJPEG chunk production.
//!
//! The server crate owns the HTTP surface; everything here is transport
//! agnostic.

pub mod annotate;
pub mod capture;
pub mod detection;
pub mod encode;
pub mod pipeline;
pub mod shared;

/// Image acquisition and cropping pipeline
///
/// This module handles:
/// - Reading a selected file into a data URL (reader.rs)
/// - Tracking pan/zoom and deriving the crop rectangle (cropper.rs)
/// - Cutting the rectangle out and re-encoding it (renderer.rs)
/// - Parsing and building data URLs (data_url.rs)

pub mod cropper;
pub mod data_url;
pub mod reader;
pub mod renderer;

use std::fs;
use std::path::Path;

use crate::error::FaceError;
use crate::shared::frame::Frame;

/// Where input pixels come from: encoded bytes, a file on disk, or an
/// already-decoded buffer.
///
/// One enum replaces per-source method families on the recognizer and
/// tracker APIs. JPEG decoding is always available; other formats are
/// accepted whenever the underlying decoder recognizes them.
#[derive(Clone, Copy, Debug)]
pub enum ImageSource<'a> {
    Bytes(&'a [u8]),
    File(&'a Path),
    Frame(&'a Frame),
}

impl ImageSource<'_> {
    pub fn decode(&self) -> Result<Frame, FaceError> {
        match self {
            ImageSource::Bytes(data) => {
                if data.is_empty() {
                    return Err(FaceError::ImageLoad("empty image buffer".into()));
                }
                decode_bytes(data)
            }
            ImageSource::File(path) => {
                if !path.is_file() {
                    return Err(FaceError::ImageLoad(format!(
                        "file '{}' not found",
                        path.display()
                    )));
                }
                let data = fs::read(path)
                    .map_err(|e| FaceError::ImageLoad(format!("{}: {e}", path.display())))?;
                decode_bytes(&data)
            }
            ImageSource::Frame(frame) => {
                if frame.is_empty() {
                    return Err(FaceError::ImageLoad("empty pixel buffer".into()));
                }
                Ok((*frame).clone())
            }
        }
    }
}

fn decode_bytes(data: &[u8]) -> Result<Frame, FaceError> {
    let img = image::load_from_memory(data).map_err(|e| FaceError::ImageLoad(e.to_string()))?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Frame::new(rgb.into_raw(), width, height))
}

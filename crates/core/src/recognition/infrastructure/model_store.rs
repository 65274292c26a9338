use std::fs;
use std::path::{Path, PathBuf};

use crate::error::FaceError;

/// Resolve a model file by name, checking local locations before
/// downloading.
///
/// Resolution order:
/// 1. User cache directory
/// 2. Bundled directory (development / pre-packaged installs)
/// 3. Download from `url` into the cache
///
/// Failures to locate or fetch a model are initialization-time resource
/// errors and surface as `FaceError::ImageLoad`.
pub fn resolve(name: &str, url: &str, bundled_dir: Option<&Path>) -> Result<PathBuf, FaceError> {
    let cache = cache_dir()?;
    let cached = cache.join(name);
    if cached.exists() {
        return Ok(cached);
    }

    if let Some(dir) = bundled_dir {
        let bundled = dir.join(name);
        if bundled.exists() {
            return Ok(bundled);
        }
    }

    fs::create_dir_all(&cache)
        .map_err(|e| FaceError::ImageLoad(format!("cannot create model cache: {e}")))?;
    download(url, &cached)?;
    Ok(cached)
}

/// Per-user model cache directory.
pub fn cache_dir() -> Result<PathBuf, FaceError> {
    dirs::cache_dir()
        .map(|d| d.join("faceprint").join("models"))
        .ok_or_else(|| FaceError::ImageLoad("could not determine model cache directory".into()))
}

fn download(url: &str, dest: &Path) -> Result<(), FaceError> {
    log::info!("downloading model {url}");
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| FaceError::ImageLoad(format!("download failed for {url}: {e}")))?;
    let bytes = response
        .bytes()
        .map_err(|e| FaceError::ImageLoad(format!("download failed for {url}: {e}")))?;

    // Write through a temp file, then rename, so a torn download never
    // shadows the cache entry.
    let temp = dest.with_extension("part");
    fs::write(&temp, &bytes)
        .map_err(|e| FaceError::ImageLoad(format!("cannot write {}: {e}", temp.display())))?;
    fs::rename(&temp, dest)
        .map_err(|e| FaceError::ImageLoad(format!("cannot write {}: {e}", dest.display())))?;
    Ok(())
}

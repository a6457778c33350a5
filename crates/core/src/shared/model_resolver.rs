use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("could not determine model cache directory")]
    NoCacheDir,
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("downloaded model {0} is empty")]
    EmptyModel(String),
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 when the server sent no Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Resolve a detector model file by name.
///
/// Resolution order:
/// 1. User cache directory (platform-specific)
/// 2. An explicit bundled directory, if given (development / packaged installs)
/// 3. Download from `url` into the cache
///
/// Called once per model at process start; a failure here is a fatal
/// configuration error, never deferred to the first request.
pub fn resolve(
    name: &str,
    url: &str,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cache_dir = model_cache_dir()?;
    let cached = cache_dir.join(name);
    if cached.exists() {
        return Ok(cached);
    }

    if let Some(dir) = bundled_dir {
        let bundled = dir.join(name);
        if bundled.exists() {
            return Ok(bundled);
        }
    }

    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    download(url, &cached, progress)?;

    let len = fs::metadata(&cached).map(|m| m.len()).unwrap_or(0);
    if len == 0 {
        let _ = fs::remove_file(&cached);
        return Err(ModelResolveError::EmptyModel(name.to_string()));
    }

    Ok(cached)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Facecast/models/`
/// - Linux: `$XDG_CACHE_HOME/Facecast/models/` or `~/.cache/Facecast/models/`
/// - Windows: `%LOCALAPPDATA%/Facecast/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("Facecast").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("Facecast").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let map_download = |e: reqwest::Error| ModelResolveError::Download {
        url: url.to_string(),
        source: e,
    };
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(map_download)?;

    let total = response.content_length().unwrap_or(0);
    let bytes = response.bytes().map_err(map_download)?;

    // Write to a temp file first, then rename, so an interrupted download
    // never leaves a truncated model at the final path.
    let temp_path = dest.with_extension("part");
    let map_write = |path: &Path| {
        let path = path.to_path_buf();
        move |e: std::io::Error| ModelResolveError::Write { path, source: e }
    };

    let mut file = fs::File::create(&temp_path).map_err(map_write(&temp_path))?;

    let mut written: u64 = 0;
    for chunk in bytes.chunks(1024 * 1024) {
        file.write_all(chunk).map_err(map_write(&temp_path))?;
        written += chunk.len() as u64;
        if let Some(ref cb) = progress {
            cb(written, total);
        }
    }
    file.flush().map_err(map_write(&temp_path))?;
    drop(file);

    fs::rename(&temp_path, dest).map_err(map_write(dest))?;
    Ok(())
}

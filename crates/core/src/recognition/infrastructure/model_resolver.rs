use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::recognition::domain::model::ModelId;

#[derive(Error, Debug)]
pub enum ModelResolveError {
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
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Resolve a model file by id, downloading into the cache on a miss.
///
/// There is deliberately no progress callback here: the blocking download is
/// observed from outside by the acquisition estimator polling the cache
/// directory size.
pub fn resolve(model: ModelId) -> Result<PathBuf, ModelResolveError> {
    let cache_dir = model_cache_dir()?;
    let cached_path = cache_dir.join(model.file_name());
    if cached_path.exists() {
        return Ok(cached_path);
    }

    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    download(&model.url(), &cached_path)?;
    Ok(cached_path)
}

/// Checks whether a model is already present in the cache, without
/// downloading anything.
pub fn is_cached(model: ModelId) -> bool {
    model_cache_dir()
        .map(|dir| is_cached_in(&dir, model))
        .unwrap_or(false)
}

fn is_cached_in(cache_dir: &Path, model: ModelId) -> bool {
    cache_dir.join(model.file_name()).exists()
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/SrtForge/models/`
/// - Linux: `$XDG_CACHE_HOME/SrtForge/models/` or `~/.cache/SrtForge/models/`
/// - Windows: `%LOCALAPPDATA%/SrtForge/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("SrtForge").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("SrtForge").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path);

    // Clean up .part file on any error
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(url: &str, dest: &Path, temp_path: &Path) -> Result<(), ModelResolveError> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let mut file = fs::File::create(temp_path).map_err(|e| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source: e,
    })?;

    // Stream the body in chunks; models run to multiple GB.
    let mut reader = response;
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(|e| ModelResolveError::Write {
            path: temp_path.to_path_buf(),
            source: e,
        })?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n])
            .map_err(|e| ModelResolveError::Write {
                path: temp_path.to_path_buf(),
                source: e,
            })?;
    }

    file.flush().map_err(|e| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source: e,
    })?;
    drop(file);

    fs::rename(temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_model_cache_dir_returns_path() {
        let dir = model_cache_dir();
        assert!(dir.is_ok());
        let path = dir.unwrap();
        assert!(path.to_string_lossy().contains("SrtForge"));
        assert!(path.to_string_lossy().contains("models"));
    }

    #[test]
    fn test_cache_lookup_by_model_file_name() {
        let tmp = TempDir::new().unwrap();
        assert!(!is_cached_in(tmp.path(), ModelId::Tiny));
        fs::write(tmp.path().join("ggml-tiny.bin"), b"model bytes").unwrap();
        assert!(is_cached_in(tmp.path(), ModelId::Tiny));
        // Other models remain uncached.
        assert!(!is_cached_in(tmp.path(), ModelId::Medium));
    }

    #[test]
    fn test_download_invalid_url_returns_error() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("ggml-tiny.bin");
        let result = download("http://invalid.nonexistent.example.com/model", &dest);
        assert!(result.is_err());
    }

    #[test]
    fn test_download_atomic_no_partial_on_failure() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("ggml-tiny.bin");
        let _ = download("http://invalid.nonexistent.example.com/model", &dest);
        // Neither the dest nor the .part file should exist after failure
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}

//! Model registry and package cache with progress reporting via callback

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use wyoming_silero_core::catalog::{ModelPackage, ModelRegistry};
use wyoming_silero_core::types::{DownloadProgress, DownloadStatus};

use crate::error::{Error, Result};

/// File name of the cached registry.
pub const REGISTRY_FILE: &str = "models.yml";

const REGISTRY_TIMEOUT: Duration = Duration::from_secs(30);

/// Path of the cached registry under `cache_dir`.
pub fn registry_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(REGISTRY_FILE)
}

/// Path of a package file under `cache_dir`.
pub fn model_path(cache_dir: &Path, package: &ModelPackage) -> PathBuf {
    cache_dir.join(package.filename())
}

/// Refresh `models.yml` from `url` and parse it.
///
/// The cache is only overwritten by a body that parses. A failed download or
/// an unparsable body falls back to the cached copy; with nothing cached the
/// registry is unavailable.
pub async fn fetch_registry(cache_dir: &Path, url: &str) -> Result<ModelRegistry> {
    tokio::fs::create_dir_all(cache_dir).await?;
    let path = registry_path(cache_dir);

    let failure = match download_text(url).await {
        Ok(body) => match ModelRegistry::parse(&body) {
            Ok(registry) => {
                tokio::fs::write(&path, &body).await?;
                tracing::debug!("registry refreshed from {url}");
                return Ok(registry);
            }
            Err(e) => Error::from(e),
        },
        Err(e) => e,
    };

    if !path.is_file() {
        return Err(Error::RegistryUnavailable(format!(
            "{failure}; no cached copy at {} (network required for first run)",
            path.display()
        )));
    }

    tracing::warn!("registry refresh failed ({failure}), using cached {}", path.display());
    let body = tokio::fs::read_to_string(&path).await?;
    Ok(ModelRegistry::parse(&body)?)
}

async fn download_text(url: &str) -> Result<String> {
    let resp = reqwest::Client::new()
        .get(url)
        .timeout(REGISTRY_TIMEOUT)
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(Error::Download(format!("{url} returned status {}", resp.status())));
    }
    Ok(resp.text().await?)
}

/// Download a model package with progress reporting. Cached packages are
/// returned as-is; interrupted downloads resume from the `.partial` file.
pub async fn download_package(
    cache_dir: &Path,
    package: &ModelPackage,
    on_progress: impl Fn(DownloadProgress),
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(cache_dir).await?;

    let filename = package.filename().to_string();
    let dest = model_path(cache_dir, package);

    if dest.is_file() {
        let size = tokio::fs::metadata(&dest).await.map(|m| m.len()).unwrap_or(0);
        on_progress(progress(&filename, size, size, DownloadStatus::Complete));
        return Ok(dest);
    }

    let partial = cache_dir.join(format!("{filename}.partial"));
    let existing_size = if partial.is_file() {
        tokio::fs::metadata(&partial)
            .await
            .map(|m| m.len())
            .unwrap_or(0)
    } else {
        0
    };

    let client = reqwest::Client::new();
    let mut req = client.get(&package.url);

    if existing_size > 0 {
        tracing::info!("resuming {filename} at {existing_size} bytes");
        req = req.header(reqwest::header::RANGE, format!("bytes={existing_size}-"));
    }

    let resp = req
        .send()
        .await
        .map_err(|e| Error::Download(format!("request for {} failed: {e}", package.url)))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(Error::Download(format!(
            "{} returned status {status}",
            package.url
        )));
    }

    // A server that ignores Range sends the whole file again.
    let resumed = status == reqwest::StatusCode::PARTIAL_CONTENT;
    let total_size = if resumed {
        resp.headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.rsplit('/').next())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0)
    } else {
        resp.content_length().unwrap_or(0)
    };

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .append(resumed)
        .truncate(!resumed)
        .open(&partial)
        .await?;

    let mut bytes_done = if resumed { existing_size } else { 0 };
    let mut stream = resp.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::Download(format!("stream error: {e}")))?;
        file.write_all(&chunk).await?;

        bytes_done += chunk.len() as u64;
        on_progress(progress(&filename, bytes_done, total_size, DownloadStatus::Downloading));
    }

    file.flush().await?;
    drop(file);

    tokio::fs::rename(&partial, &dest).await?;

    let total = total_size.max(bytes_done);
    on_progress(progress(&filename, total, total, DownloadStatus::Complete));

    Ok(dest)
}

fn progress(file: &str, bytes_done: u64, bytes_total: u64, status: DownloadStatus) -> DownloadProgress {
    let percent = match status {
        DownloadStatus::Complete => 100.0,
        DownloadStatus::Downloading if bytes_total == 0 => 0.0,
        DownloadStatus::Downloading => (bytes_done as f32 / bytes_total as f32 * 100.0).min(100.0),
    };
    DownloadProgress {
        file: file.to_string(),
        percent,
        bytes_done,
        bytes_total,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    const UNREACHABLE: &str = "http://127.0.0.1:9/models.yml";

    const MODELS_YML: &str = r#"
tts_models:
  ru:
    v5_1_ru:
      latest:
        package: https://models.silero.ai/models/tts/ru/v5_1_ru.pt
        sample_rate: [8000, 24000, 48000]
"#;

    fn package() -> ModelPackage {
        ModelPackage {
            language: "ru".into(),
            model: "v5_1_ru".into(),
            url: "http://127.0.0.1:9/models/tts/ru/v5_1_ru.pt".into(),
            sample_rates: vec![48_000],
        }
    }

    /// Serve `body` with status 200 to every request; returns the URL.
    async fn serve_body(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        format!("http://{addr}/models.yml")
    }

    #[tokio::test]
    async fn registry_refresh_updates_cache() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_body(MODELS_YML).await;

        let registry = fetch_registry(dir.path(), &url).await.unwrap();
        assert_eq!(registry.languages(), vec!["ru".to_string()]);
        let cached = std::fs::read_to_string(registry_path(dir.path())).unwrap();
        assert_eq!(cached, MODELS_YML);
    }

    #[tokio::test]
    async fn unparsable_registry_keeps_cache() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(registry_path(dir.path()), MODELS_YML).unwrap();
        let url = serve_body("<html>captive portal</html>").await;

        let registry = fetch_registry(dir.path(), &url).await.unwrap();
        assert_eq!(registry.languages(), vec!["ru".to_string()]);
        let cached = std::fs::read_to_string(registry_path(dir.path())).unwrap();
        assert_eq!(cached, MODELS_YML);
    }

    #[tokio::test]
    async fn unparsable_registry_without_cache_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_body("<html>captive portal</html>").await;

        let err = fetch_registry(dir.path(), &url).await.unwrap_err();
        assert!(matches!(err, Error::RegistryUnavailable(_)));
        assert!(!registry_path(dir.path()).exists());
    }

    #[tokio::test]
    async fn registry_falls_back_to_cache() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(registry_path(dir.path()), MODELS_YML).unwrap();

        let registry = fetch_registry(dir.path(), UNREACHABLE).await.unwrap();
        assert_eq!(registry.languages(), vec!["ru".to_string()]);
    }

    #[tokio::test]
    async fn registry_without_cache_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = fetch_registry(dir.path(), UNREACHABLE).await.unwrap_err();
        assert!(matches!(err, Error::RegistryUnavailable(_)));
        assert!(err.to_string().contains("network required for first run"));
    }

    #[tokio::test]
    async fn cached_package_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = package();
        std::fs::write(model_path(dir.path(), &pkg), b"weights").unwrap();

        let seen = Mutex::new(Vec::new());
        let path = download_package(dir.path(), &pkg, |p| seen.lock().unwrap().push(p))
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("v5_1_ru.pt"));
        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].status, DownloadStatus::Complete);
        assert_eq!(seen[0].bytes_total, 7);
    }

    #[tokio::test]
    async fn missing_package_without_network_fails() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = package();
        assert!(!model_path(dir.path(), &pkg).is_file());
        let err = download_package(dir.path(), &pkg, |_| {}).await.unwrap_err();
        assert!(matches!(err, Error::Download(_)));
    }

    #[test]
    fn progress_percent_handles_unknown_length() {
        let p = progress("x", 10, 0, DownloadStatus::Downloading);
        assert_eq!(p.percent, 0.0);
        let p = progress("x", 50, 200, DownloadStatus::Downloading);
        assert_eq!(p.percent, 25.0);
    }
}

//! ToolchainInstaller: download a pinned portable runtime and unpack it.
//!
//! Flow: create the target dir, stream the archive to
//! `<target>/download.<ext>` through an 8 KiB buffer, extract with overwrite,
//! delete the archive, report 100%. Any network, HTTP status or extraction
//! error is reported as `Error: <msg>` status text and a `false` return.
//! The archive never survives a failed install.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use futures_util::StreamExt;
use hcide_core::config::ToolchainConfig;
use hcide_core::observability;
use hcide_fs::{FileSystem, LocalFs};
use tokio::io::AsyncWriteExt;

use crate::error::{Result, ToolchainError};
use crate::events::EventSink;
use crate::handle::RuntimeHandle;
use crate::info_log;
use crate::kind::RuntimeKind;
use crate::profile::ArchiveFormat;

const DOWNLOAD_BUFFER_SIZE: usize = 8 * 1024;
const USER_AGENT: &str = "hcide-toolchain";

/// State of one `install` call. Every progress and status update goes
/// through here so the last values are always known.
#[derive(Debug)]
pub struct DownloadTask {
    pub kind: RuntimeKind,
    pub url: String,
    pub target_dir: PathBuf,
    pub percent_complete: f64,
    pub last_status: String,
    sink: EventSink,
}

impl DownloadTask {
    fn new(kind: RuntimeKind, url: &str, target_dir: &Path, sink: EventSink) -> Self {
        Self {
            kind,
            url: url.to_string(),
            target_dir: target_dir.to_path_buf(),
            percent_complete: 0.0,
            last_status: String::new(),
            sink,
        }
    }

    /// Clamped to `[0, 100]`, rounded down to 0.1, and only emitted when it grows.
    fn progress(&mut self, percent: f64) {
        let percent = (percent.clamp(0.0, 100.0) * 10.0).floor() / 10.0;
        if percent > self.percent_complete {
            self.percent_complete = percent;
            self.sink.progress(percent);
        }
    }

    fn status(&mut self, message: impl Into<String>) {
        self.last_status = message.into();
        self.sink.status(self.last_status.clone());
    }

    fn archive_path(&self, archive: ArchiveFormat) -> PathBuf {
        self.target_dir
            .join(format!("download.{}", archive.extension()))
    }
}

pub struct ToolchainInstaller {
    client: reqwest::Client,
    fs: Arc<dyn FileSystem>,
}

impl ToolchainInstaller {
    pub fn new(config: &ToolchainConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .build()
            .map_err(|e| ToolchainError::Download(format!("HTTP client: {}", e)))?;
        Ok(Self::with_client(client, Arc::new(LocalFs)))
    }

    pub fn with_client(client: reqwest::Client, fs: Arc<dyn FileSystem>) -> Self {
        Self { client, fs }
    }

    /// Download and unpack the pinned runtime for `kind` into `target_dir`.
    pub async fn install(&self, kind: RuntimeKind, target_dir: &Path, sink: &EventSink) -> bool {
        match kind.profile().download {
            Some(spec) => self.install_from(kind, spec.url, spec.archive, target_dir, sink).await,
            None => {
                let msg = format!("No portable {} build for this platform", kind);
                sink.status(format!("Error: {}", msg));
                observability::audit_runtime_install(
                    kind.as_str(),
                    "",
                    &target_dir.to_string_lossy(),
                    false,
                    Some(&msg),
                );
                false
            }
        }
    }

    /// Runtime binary inside a directory previously filled by [`install`](Self::install).
    pub fn installed_handle(kind: RuntimeKind, target_dir: &Path) -> Option<RuntimeHandle> {
        let spec = kind.profile().download?;
        RuntimeHandle::new(kind, target_dir.join(spec.executable)).ok()
    }

    async fn install_from(
        &self,
        kind: RuntimeKind,
        url: &str,
        archive: ArchiveFormat,
        target_dir: &Path,
        sink: &EventSink,
    ) -> bool {
        let mut task = DownloadTask::new(kind, url, target_dir, sink.clone());
        task.status(format!(
            "Preparing to download {}...",
            kind.profile().display_name
        ));
        let archive_path = task.archive_path(archive);
        let start = Instant::now();

        let result = self.download_and_extract(&mut task, archive, &archive_path).await;
        // The archive is removed on both paths; on failure nothing partial may remain.
        if let Err(e) = self.fs.remove_all(&archive_path) {
            tracing::warn!("Failed to remove {}: {}", archive_path.display(), e);
        }

        match result {
            Ok(()) => {
                task.progress(100.0);
                task.status("Installation complete!");
                info_log!(
                    "Installed {} into {} in {}ms",
                    kind,
                    target_dir.display(),
                    start.elapsed().as_millis()
                );
                observability::audit_runtime_install(
                    kind.as_str(),
                    url,
                    &target_dir.to_string_lossy(),
                    true,
                    None,
                );
                true
            }
            Err(e) => {
                let msg = format!("{:#}", e);
                tracing::warn!("Install of {} failed: {}", kind, msg);
                task.status(format!("Error: {}", msg));
                observability::audit_runtime_install(
                    kind.as_str(),
                    url,
                    &target_dir.to_string_lossy(),
                    false,
                    Some(&msg),
                );
                false
            }
        }
    }

    async fn download_and_extract(
        &self,
        task: &mut DownloadTask,
        archive: ArchiveFormat,
        archive_path: &Path,
    ) -> anyhow::Result<()> {
        self.fs
            .create_dir_all(&task.target_dir)
            .context("Failed to create install directory")?;

        task.status("Downloading...");
        self.download(task, archive_path).await?;

        task.status("Extracting...");
        let src = archive_path.to_path_buf();
        let dest = task.target_dir.clone();
        tokio::task::spawn_blocking(move || match archive {
            ArchiveFormat::Zip => extract_zip(&src, &dest),
            ArchiveFormat::TarGz => extract_tar_gz(&src, &dest),
        })
        .await
        .context("Extraction task panicked")??;
        Ok(())
    }

    async fn download(&self, task: &mut DownloadTask, archive_path: &Path) -> anyhow::Result<()> {
        let response = self
            .client
            .get(&task.url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", task.url))?
            .error_for_status()
            .context("Server rejected the download")?;

        let total = response.content_length().filter(|len| *len > 0);
        let file = tokio::fs::File::create(archive_path)
            .await
            .with_context(|| format!("Failed to create {}", archive_path.display()))?;
        let mut writer = tokio::io::BufWriter::with_capacity(DOWNLOAD_BUFFER_SIZE, file);

        let mut received: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Download interrupted")?;
            writer
                .write_all(&chunk)
                .await
                .context("Failed to write archive")?;
            received += chunk.len() as u64;
            if let Some(total) = total {
                task.progress(received as f64 / total as f64 * 100.0);
            }
        }
        writer.flush().await.context("Failed to write archive")?;
        tracing::debug!("Downloaded {} bytes from {}", received, task.url);
        Ok(())
    }
}

fn extract_zip(src: &Path, dest: &Path) -> anyhow::Result<()> {
    let file = File::open(src).context("Failed to open archive")?;
    let mut archive = zip::ZipArchive::new(file).context("Invalid zip archive")?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).context("Failed to read zip entry")?;
        let Some(rel) = entry.enclosed_name().map(Path::to_path_buf) else {
            tracing::warn!("Skipping unsafe zip entry: {}", entry.name());
            continue;
        };
        let out_path = dest.join(rel);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)
                .with_context(|| format!("Failed to create {}", out_path.display()))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut out_file = File::create(&out_path)
            .with_context(|| format!("Failed to create {}", out_path.display()))?;
        std::io::copy(&mut entry, &mut out_file)
            .with_context(|| format!("Failed to extract {}", entry.name()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode))?;
            }
        }
    }
    Ok(())
}

fn extract_tar_gz(src: &Path, dest: &Path) -> anyhow::Result<()> {
    let file = File::open(src).context("Failed to open archive")?;
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));
    archive.set_overwrite(true);
    archive.set_preserve_permissions(true);
    archive
        .unpack(dest)
        .context("Failed to extract tar.gz archive")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ToolchainEvent;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tar_gz_with(file_name: &str, body: &[u8]) -> Vec<u8> {
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, file_name, body).unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn zip_with(file_name: &str, body: &[u8]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file(file_name, zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(body).unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn installer() -> ToolchainInstaller {
        ToolchainInstaller::with_client(reqwest::Client::new(), Arc::new(LocalFs))
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ToolchainEvent>) -> (Vec<f64>, Vec<String>) {
        let mut progress = Vec::new();
        let mut status = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                ToolchainEvent::Progress(p) => progress.push(p),
                ToolchainEvent::Status(s) => status.push(s),
                _ => {}
            }
        }
        (progress, status)
    }

    async fn serve(body: Vec<u8>, status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/runtime"))
            .respond_with(ResponseTemplate::new(status).set_body_bytes(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_install_tar_gz_reports_monotonic_progress_to_100() {
        let payload = vec![b'x'; 64 * 1024];
        let server = serve(tar_gz_with("go/bin/go", &payload), 200).await;
        let target = tempfile::tempdir().unwrap();
        let (sink, mut rx) = EventSink::channel();

        let ok = installer()
            .install_from(
                RuntimeKind::Go,
                &format!("{}/runtime", server.uri()),
                ArchiveFormat::TarGz,
                target.path(),
                &sink,
            )
            .await;
        assert!(ok);

        let (progress, status) = drain(&mut rx);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{:?}", progress);
        assert_eq!(progress.last().copied(), Some(100.0));
        assert_eq!(status.first().map(String::as_str), Some("Preparing to download Go..."));
        assert_eq!(status.last().map(String::as_str), Some("Installation complete!"));
        assert!(status.iter().any(|s| s == "Extracting..."));

        let extracted = target.path().join("go/bin/go");
        assert_eq!(std::fs::read(&extracted).unwrap().len(), payload.len());
        assert!(!target.path().join("download.tar.gz").exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&extracted).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    /// One-shot HTTP server whose response has no Content-Length; the body ends at close.
    async fn serve_without_length(body: Vec<u8>) -> String {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}/runtime", addr)
    }

    #[tokio::test]
    async fn test_install_without_content_length_reports_only_final_progress() {
        let url = serve_without_length(tar_gz_with("node/bin/node", &vec![b'n'; 32 * 1024])).await;
        let target = tempfile::tempdir().unwrap();
        let (sink, mut rx) = EventSink::channel();

        let ok = installer()
            .install_from(RuntimeKind::Node, &url, ArchiveFormat::TarGz, target.path(), &sink)
            .await;
        assert!(ok);

        let (progress, status) = drain(&mut rx);
        assert_eq!(progress, vec![100.0]);
        assert_eq!(status.last().map(String::as_str), Some("Installation complete!"));
        assert!(target.path().join("node/bin/node").is_file());
        assert!(!target.path().join("download.tar.gz").exists());
    }

    #[tokio::test]
    async fn test_install_zip_overwrites_existing_files() {
        let server = serve(zip_with("python.exe", b"new"), 200).await;
        let target = tempfile::tempdir().unwrap();
        std::fs::write(target.path().join("python.exe"), b"old").unwrap();

        let ok = installer()
            .install_from(
                RuntimeKind::Python,
                &format!("{}/runtime", server.uri()),
                ArchiveFormat::Zip,
                target.path(),
                &EventSink::discard(),
            )
            .await;
        assert!(ok);
        assert_eq!(std::fs::read(target.path().join("python.exe")).unwrap(), b"new");
        assert!(!target.path().join("download.zip").exists());
    }

    #[tokio::test]
    async fn test_http_error_fails_without_leftover_archive() {
        let server = serve(b"not found".to_vec(), 404).await;
        let target = tempfile::tempdir().unwrap();
        let (sink, mut rx) = EventSink::channel();

        let ok = installer()
            .install_from(
                RuntimeKind::Node,
                &format!("{}/runtime", server.uri()),
                ArchiveFormat::TarGz,
                target.path(),
                &sink,
            )
            .await;
        assert!(!ok);

        let (progress, status) = drain(&mut rx);
        assert!(progress.iter().all(|p| *p < 100.0));
        assert!(status.last().unwrap().starts_with("Error: "));
        assert!(!target.path().join("download.tar.gz").exists());
    }

    #[tokio::test]
    async fn test_corrupt_archive_fails_and_is_removed() {
        let server = serve(b"definitely not gzip".to_vec(), 200).await;
        let target = tempfile::tempdir().unwrap();
        let (sink, mut rx) = EventSink::channel();

        let ok = installer()
            .install_from(
                RuntimeKind::Go,
                &format!("{}/runtime", server.uri()),
                ArchiveFormat::TarGz,
                target.path(),
                &sink,
            )
            .await;
        assert!(!ok);
        let (_, status) = drain(&mut rx);
        assert!(status.iter().any(|s| s == "Extracting..."));
        assert!(status.last().unwrap().starts_with("Error: "));
        assert!(!target.path().join("download.tar.gz").exists());
    }

    #[tokio::test]
    async fn test_unreachable_server_fails() {
        let target = tempfile::tempdir().unwrap();
        let ok = installer()
            .install_from(
                RuntimeKind::Go,
                "http://127.0.0.1:9/runtime",
                ArchiveFormat::Zip,
                target.path(),
                &EventSink::discard(),
            )
            .await;
        assert!(!ok);
        assert!(!target.path().join("download.zip").exists());
    }

    #[test]
    fn test_task_progress_is_clamped_and_monotonic() {
        let (sink, mut rx) = EventSink::channel();
        let mut task = DownloadTask::new(RuntimeKind::Go, "u", Path::new("."), sink);
        task.progress(10.04);
        task.progress(5.0);
        task.progress(10.0);
        task.progress(250.0);
        let (progress, _) = drain(&mut rx);
        assert_eq!(progress, vec![10.0, 100.0]);
        assert_eq!(task.percent_complete, 100.0);
    }

    #[test]
    fn test_installed_handle_uses_layout_table() {
        let target = tempfile::tempdir().unwrap();
        assert!(ToolchainInstaller::installed_handle(RuntimeKind::Go, target.path()).is_none());
        if let Some(spec) = RuntimeKind::Go.profile().download {
            let exe = target.path().join(spec.executable);
            std::fs::create_dir_all(exe.parent().unwrap()).unwrap();
            std::fs::write(&exe, "").unwrap();
            let handle = ToolchainInstaller::installed_handle(RuntimeKind::Go, target.path()).unwrap();
            assert_eq!(handle.path(), exe.as_path());
        }
    }
}

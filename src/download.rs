//! Downloads a single remote file to disk.

use std::{
    fmt,
    fs::{self, File},
    future::Future,
    io::{self, BufWriter, Write},
    path::Path,
};

use bytes::Bytes;
use futures::{stream::BoxStream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, warn};

use crate::error::{FetchError, Result};

/// Size of the write buffer between the response stream and the file.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Name prefix of in-flight atomic writes. A file still carrying it was left by
/// an interrupted run and can be deleted.
pub const PARTIAL_PREFIX: &str = ".tlcfetch-";
pub const PARTIAL_SUFFIX: &str = ".part";

/// An opened response body.
pub struct Body {
    pub content_length: Option<u64>,
    pub stream: BoxStream<'static, Result<Bytes>>,
}

/// Something that can open a URL as a stream of bytes.
pub trait ByteSource {
    fn open(&self, url: &str) -> impl Future<Output = Result<Body>> + Send;
}

#[derive(Debug, Clone, Default)]
/// Fetches over HTTP(S).
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(client: reqwest::Client) -> Self {
        HttpSource { client }
    }
}

impl ByteSource for HttpSource {
    async fn open(&self, url: &str) -> Result<Body> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        Ok(Body {
            content_length: response.content_length(),
            stream: response
                .bytes_stream()
                .map(|chunk| chunk.map_err(FetchError::from))
                .boxed(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// How the body reaches its final path.
pub enum WritePolicy {
    /// Write to a temporary sibling and rename once the body is complete.
    #[default]
    Atomic,
    /// Write straight to the destination. An interrupted process leaves a
    /// partial file that later runs consider complete.
    InPlace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyExists,
    Duplicate,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyExists => write!(f, "already exists"),
            SkipReason::Duplicate => write!(f, "duplicate target"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Downloaded(u64),
    Skipped(SkipReason),
    Failed(String),
}

/// Returns false only when the file is already on disk and not empty.
pub fn should_fetch(local_path: &Path) -> bool {
    match fs::metadata(local_path) {
        Ok(metadata) => metadata.len() == 0,
        Err(_) => true,
    }
}

/// Streams `url` into `local_path`.
///
/// Never returns an error: transport failures become `TransferOutcome::Failed`
/// so the caller can move on to the next file.
pub async fn fetch<S: ByteSource>(
    source: &S,
    url: &str,
    local_path: &Path,
    policy: WritePolicy,
    progress: &ProgressBar,
) -> TransferOutcome {
    match try_fetch(source, url, local_path, policy, progress).await {
        Ok(bytes) => {
            debug!(url, path = %local_path.display(), bytes, "download complete");
            TransferOutcome::Downloaded(bytes)
        }
        Err(e) => {
            warn!(url, error = %e, "download failed");
            TransferOutcome::Failed(e.to_string())
        }
    }
}

async fn try_fetch<S: ByteSource>(
    source: &S,
    url: &str,
    local_path: &Path,
    policy: WritePolicy,
    progress: &ProgressBar,
) -> Result<u64> {
    let body = source.open(url).await?;

    if let Some(total_size) = body.content_length.filter(|&n| n > 0) {
        progress.set_length(total_size);
        progress.set_style(
            ProgressStyle::with_template(
                "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {eta}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );
    }

    let parent = match local_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    match policy {
        WritePolicy::Atomic => {
            let mut temp = partial_file_in(parent)?;
            // The temp file is removed on drop if the body fails.
            let written = write_body(body, temp.as_file_mut(), progress).await?;
            temp.persist(local_path).map_err(|e| FetchError::Io(e.error))?;
            Ok(written)
        }
        WritePolicy::InPlace => {
            let mut file = File::create(local_path)?;
            match write_body(body, &mut file, progress).await {
                Ok(written) => Ok(written),
                Err(e) => {
                    drop(file);
                    let _ = fs::remove_file(local_path);
                    Err(e)
                }
            }
        }
    }
}

/// Temporary sibling for an atomic write, readable the way `File::create`
/// would leave it once renamed.
fn partial_file_in(dir: &Path) -> io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    builder.prefix(PARTIAL_PREFIX).suffix(PARTIAL_SUFFIX);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }

    builder.tempfile_in(dir)
}

/// Whether `path` names a leftover of an interrupted atomic write.
pub fn is_partial(path: &Path) -> bool {
    match path.file_name() {
        Some(name) => {
            let name = name.to_string_lossy();
            name.starts_with(PARTIAL_PREFIX) && name.ends_with(PARTIAL_SUFFIX)
        }
        None => false,
    }
}

async fn write_body(body: Body, file: &mut File, progress: &ProgressBar) -> Result<u64> {
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut stream = body.stream;
    let mut downloaded = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        progress.set_position(downloaded);
    }

    writer.flush()?;

    Ok(downloaded)
}

// -- Test sources ------------------------------------------------------------


// -- Tests -------------------------------------------------------------------

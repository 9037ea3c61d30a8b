use bytes::Bytes;
use futures::Stream;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::io::ReaderStream;

/// The staging directory shared by every request.
///
/// Names are always `{id}_{name}` where `id` is fresh per request, so concurrent
/// requests never touch the same file.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Opens the staging directory, creating it when absent.
    pub async fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 128 random bits, hex encoded.
    pub fn new_id() -> String {
        hex::encode(rand::random::<[u8; 16]>())
    }

    /// Resolves `{id}_{name}` inside the staging directory. Anything that would not be
    /// a single plain path component is refused.
    pub fn path_for(&self, id: &str, name: &str) -> io::Result<PathBuf> {
        let staged_name = format!("{}_{}", id, name);
        let mut components = Path::new(&staged_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(&staged_name)),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing to stage outside of {}: {}", self.root.display(), staged_name),
            )),
        }
    }

    /// Streams `reader` into a new staged file. Fails rather than overwrite.
    pub async fn persist<R>(&self, id: &str, name: &str, reader: &mut R) -> io::Result<(StagedFile, u64)>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let path = self.path_for(id, name)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        // From here on the guard owns the path, so a failed copy leaves nothing behind.
        let staged = StagedFile::new(path);

        let size = tokio::io::copy(reader, &mut file).await?;
        file.flush().await?;

        Ok((staged, size))
    }

    /// Claims a staged path for a file someone else will write.
    pub fn reserve(&self, id: &str, name: &str) -> io::Result<StagedFile> {
        Ok(StagedFile::new(self.path_for(id, name)?))
    }
}

/// A file in the staging directory, removed when dropped.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the file for streaming. The file is deleted once the stream is dropped.
    pub async fn into_stream(self) -> io::Result<(u64, StagedFileStream)> {
        let file = File::open(&self.path).await?;
        let len = file.metadata().await?.len();
        Ok((
            len,
            StagedFileStream {
                inner: ReaderStream::new(file),
                _staged: self,
            },
        ))
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("🧹 Removed staged file {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to remove staged file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Body stream over a staged file that keeps the file alive until the body is done.
pub struct StagedFileStream {
    inner: ReaderStream<File>,
    _staged: StagedFile,
}

impl Stream for StagedFileStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

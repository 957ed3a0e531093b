//! Client-side file delivery.
//!
//! A `DownloadSink` hands out short-lived references to a byte payload.
//! `TransientReference` owns one such reference and releases it when it goes
//! out of scope, whatever path the download took.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Platform capability for saving a payload under a filename.
pub trait DownloadSink {
    type Handle;

    /// Stage `bytes` and return a reference to them.
    fn create_transient_reference(&self, bytes: Vec<u8>, media_type: &str) -> std::io::Result<Self::Handle>;

    /// Deliver the staged payload to the user as `filename`.
    fn trigger(&self, handle: &Self::Handle, filename: &str) -> std::io::Result<()>;

    /// Free the staged payload.
    fn release(&self, handle: Self::Handle);
}

/// Scoped ownership of a sink handle.
pub struct TransientReference<'s, S: DownloadSink> {
    sink: &'s S,
    handle: Option<S::Handle>,
}

impl<'s, S: DownloadSink> TransientReference<'s, S> {
    pub fn acquire(sink: &'s S, bytes: Vec<u8>, media_type: &str) -> std::io::Result<Self> {
        let handle = sink.create_transient_reference(bytes, media_type)?;
        Ok(Self {
            sink,
            handle: Some(handle),
        })
    }

    pub fn trigger(&self, filename: &str) -> std::io::Result<()> {
        match &self.handle {
            Some(handle) => self.sink.trigger(handle, filename),
            None => Err(std::io::Error::other("transient reference already released")),
        }
    }
}

impl<S: DownloadSink> Drop for TransientReference<'_, S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.sink.release(handle);
        }
    }
}

/// Staged payload inside a `DirectorySink`.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Native sink: downloads land as files in a directory.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    next_id: AtomicU64,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Create `path` and fill it with `write`. A failed write removes the partial file.
fn stage_file(path: &Path, write: impl FnOnce(&mut fs::File) -> io::Result<()>) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    let written = write(&mut file).and_then(|()| file.sync_all());
    drop(file);
    if let Err(err) = written {
        if let Err(cleanup) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %cleanup, "failed to remove partial download");
        }
        return Err(err);
    }
    Ok(())
}

impl DownloadSink for DirectorySink {
    type Handle = StagedFile;

    fn create_transient_reference(&self, bytes: Vec<u8>, media_type: &str) -> std::io::Result<StagedFile> {
        fs::create_dir_all(&self.dir)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let path = self
            .dir
            .join(format!(".menurank-{}-{id}.part", std::process::id()));
        stage_file(&path, |file| file.write_all(&bytes))?;
        tracing::trace!(path = %path.display(), media_type, "staged download");
        Ok(StagedFile { path })
    }

    fn trigger(&self, handle: &StagedFile, filename: &str) -> std::io::Result<()> {
        // Keep the download inside the sink directory.
        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| std::io::Error::other(format!("invalid download name: {filename:?}")))?;
        let target = self.dir.join(name);
        fs::copy(&handle.path, &target)?;
        tracing::debug!(target = %target.display(), "download written");
        Ok(())
    }

    fn release(&self, handle: StagedFile) {
        if let Err(err) = fs::remove_file(&handle.path) {
            tracing::warn!(path = %handle.path.display(), error = %err, "failed to release staged download");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("menurank-sink-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_directory_sink_delivers_and_cleans_up() {
        let dir = scratch_dir("deliver");
        let sink = DirectorySink::new(&dir);
        {
            let reference = TransientReference::acquire(&sink, b"%PDF-1.4 test".to_vec(), "application/pdf").unwrap();
            reference.trigger("report_2025-09-10_2025-09-20.pdf").unwrap();
        }
        assert_eq!(entries(&dir), vec!["report_2025-09-10_2025-09-20.pdf".to_string()]);
        assert_eq!(
            fs::read(dir.join("report_2025-09-10_2025-09-20.pdf")).unwrap(),
            b"%PDF-1.4 test"
        );
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_directory_sink_releases_on_failed_trigger() {
        let dir = scratch_dir("failed");
        let sink = DirectorySink::new(&dir);
        {
            let reference = TransientReference::acquire(&sink, vec![1, 2, 3], "application/pdf").unwrap();
            assert!(reference.trigger("..").is_err());
        }
        assert!(entries(&dir).is_empty());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_failed_staging_leaves_no_partial_file() {
        let dir = scratch_dir("partial");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(".menurank-partial.part");

        let result = stage_file(&path, |file| {
            file.write_all(b"%PDF-1.4 half")?;
            Err(io::Error::other("disk full"))
        });

        assert_eq!(result.unwrap_err().to_string(), "disk full");
        assert!(!path.exists());
        assert!(entries(&dir).is_empty());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_trigger_strips_directories() {
        let dir = scratch_dir("strip");
        let sink = DirectorySink::new(&dir);
        let reference = TransientReference::acquire(&sink, vec![7], "application/pdf").unwrap();
        reference.trigger("../../escape.pdf").unwrap();
        drop(reference);
        assert_eq!(entries(&dir), vec!["escape.pdf".to_string()]);
        fs::remove_dir_all(&dir).unwrap();
    }
}

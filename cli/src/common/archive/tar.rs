//! # Build Context Tar Serialization (`common::archive::tar`)
//!
//! File: cli/src/common/archive/tar.rs
//!
//! ## Overview
//!
//! `ArchiveBuilder` walks a context directory and writes every selected entry as
//! an uncompressed tar stream. Two selection modes exist:
//!
//! - **`Selection::EntireDirectory`**: the whole context minus `.dockerignore`
//!   exclusions. The designated Dockerfile is stored under the name `Dockerfile`.
//! - **`Selection::SingleFileOrDirectory`**: used by `container upload`. A
//!   generated Dockerfile that copies the source into `/.destination/` comes
//!   first, followed by the source file or directory tree.
//!
//! ## Architecture
//!
//! - The walk is depth-first in lexical order and never follows symbolic links;
//!   a link is archived as a link entry holding its target.
//! - Excluded directories are pruned, so nothing below them is visited.
//! - Every entry name is stored at most once. Directory names end in `/`.
//! - A file that cannot be opened is logged at debug level and skipped; the
//!   rest of the archive is still produced. A file that shrinks or fails while
//!   its body is being copied is zero-filled up to the size in its header, so
//!   later entries stay aligned.
//! - Entry names are taken from the raw path bytes. Names that are not valid
//!   UTF-8 are archived as they are on disk.
//! - Any failure writing to the output (including `BrokenPipe` once the reader
//!   of a `PipeWriter` is gone) stops the walk and is returned.
//! - `write_to` owns its writer. However it returns (success, error, or an
//!   unwinding panic), the tar trailer is attempted and the writer is dropped,
//!   which is what closes a `PipeWriter` for the consumer.
//!
//! ## Examples
//!
//! ```rust
//! use crate::common::archive::ArchiveBuilder;
//! use std::path::Path;
//!
//! # fn run() -> anyhow::Result<()> {
//! let builder = ArchiveBuilder::for_upload(Path::new("/home/me/site"))?;
//! let mut bytes = Vec::new();
//! builder.write_to(&mut bytes)?;
//! # Ok(())
//! # }
//! ```
//!
use crate::core::error::{DockhandError, Result};
use anyhow::{anyhow, Context};
use std::{
    borrow::Cow,
    collections::HashSet,
    ffi::{OsStr, OsString},
    fs::{self, File},
    io::{self, Read, Write},
    path::{Path, PathBuf},
};
use tar::{EntryType, Header, HeaderMode};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use super::{IgnoreMatcher, DOCKERFILE, DOCKERIGNORE};

/// Which entries of the context root end up in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Everything under the root that `.dockerignore` does not exclude.
    /// `dockerfile` is the root-relative name of the file stored as `Dockerfile`.
    EntireDirectory { dockerfile: PathBuf },
    /// Only `source` (a root-relative name), preceded by a generated Dockerfile.
    SingleFileOrDirectory { source: String, is_dir: bool },
}

/// Counters reported once the archive has been fully written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Entries written (files, directories, links), excluding the generated Dockerfile.
    pub files: u64,
    /// Sum of the on-disk sizes of those entries, in bytes.
    pub total_bytes: u64,
}

impl ArchiveSummary {
    /// `---> Sent 3 file(s), 1.25 KB`
    pub fn report_line(&self) -> String {
        format!(
            "---> Sent {} file(s), {:.2} KB",
            self.files,
            self.total_bytes as f64 / 1024.0
        )
    }
}

/// Produces the tar stream for one context directory.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    root: PathBuf,
    selection: Selection,
    excludes: IgnoreMatcher,
}

impl ArchiveBuilder {
    /// Prepares a whole-directory build context.
    ///
    /// `path` is either the context directory (then `dockerfile_name` is looked
    /// up inside it) or the Dockerfile itself (then its parent is the context).
    /// Fails with `DockerfileNotFound` when no such file exists, and with an
    /// ignore-file error when `.dockerignore` is unreadable or malformed. Both
    /// happen before any byte is produced.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn for_build(path: &Path, dockerfile_name: &str) -> Result<Self> {
        let path = absolute(path)?;
        let dockerfile_path = if path.is_dir() {
            path.join(dockerfile_name)
        } else {
            path.clone()
        };
        if !dockerfile_path.is_file() {
            return Err(anyhow!(DockhandError::DockerfileNotFound {
                path: path.display().to_string(),
            }));
        }
        let (root, dockerfile) = split_parent(&dockerfile_path)?;
        let excludes = IgnoreMatcher::load(&root)?;
        debug!(
            "Build context root {} with Dockerfile '{}'",
            root.display(),
            dockerfile.to_string_lossy()
        );
        Ok(Self {
            root,
            selection: Selection::EntireDirectory {
                dockerfile: PathBuf::from(dockerfile),
            },
            excludes,
        })
    }

    /// Prepares an upload context for a single file or directory.
    /// The context root is the source's parent directory.
    #[instrument(skip_all, fields(source = %source.display()))]
    pub fn for_upload(source: &Path) -> Result<Self> {
        let source = absolute(source)?;
        let metadata = fs::metadata(&source)
            .with_context(|| format!("Cannot access upload source {}", source.display()))?;
        let (root, name) = split_parent(&source)?;
        // The name is written into the generated Dockerfile.
        let name = name.into_string().map_err(|name| {
            anyhow!(DockhandError::ArgumentParsing(format!(
                "Upload source name {:?} is not valid UTF-8",
                name
            )))
        })?;
        Ok(Self {
            root,
            selection: Selection::SingleFileOrDirectory {
                source: name,
                is_dir: metadata.is_dir(),
            },
            excludes: IgnoreMatcher::empty(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the complete archive to `out` and returns what was sent.
    ///
    /// # Errors
    ///
    /// Fails as soon as writing to `out` fails. Entries that cannot be read
    /// are skipped instead.
    pub fn write_to<W: Write>(&self, out: W) -> Result<ArchiveSummary> {
        let mut tar = tar::Builder::new(out);
        let mut seen = HashSet::new();
        let mut summary = ArchiveSummary::default();

        let walk_start = match &self.selection {
            Selection::EntireDirectory { .. } => self.root.clone(),
            Selection::SingleFileOrDirectory { source, is_dir } => {
                append_generated_dockerfile(&mut tar, source, *is_dir)
                    .context("Failed to add the generated Dockerfile to the archive")?;
                self.root.join(source)
            }
        };

        let mut walker = WalkDir::new(&walk_start)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Can't stat file {:?}, error: {}", e.path(), e);
                    continue;
                }
            };
            let relative = match self.relative_name(entry.path()) {
                Some(relative) => relative,
                None => continue,
            };
            let is_dir = entry.file_type().is_dir();
            if self.is_skipped(&relative) {
                debug!("Skipping {}", relative.display());
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }
            if !seen.insert(relative.clone()) {
                continue;
            }
            let name = self.entry_name(&relative);
            match append_entry(&mut tar, entry.path(), name) {
                Ok(size) => {
                    info!("Adding {} ({:.2} KB)", name.display(), size as f64 / 1024.0);
                    summary.files += 1;
                    summary.total_bytes += size;
                }
                Err(AppendError::Source(e)) => {
                    debug!("Can't add file {} to tar, error: {}", relative.display(), e)
                }
                Err(AppendError::Output(e)) => {
                    let message = format!("Failed to write {} to the archive", name.display());
                    return Err(anyhow::Error::new(e).context(message));
                }
            }
        }

        let mut out = tar.into_inner().context("Failed to finish tar archive")?;
        out.flush().context("Failed to flush tar archive")?;
        debug!("Archive complete: {:?}", summary);
        Ok(summary)
    }

    /// Root-relative path of `path`, byte for byte. `None` for the root itself.
    fn relative_name(&self, path: &Path) -> Option<PathBuf> {
        let relative = path.strip_prefix(&self.root).ok()?;
        if relative.as_os_str().is_empty() || relative == Path::new(".") {
            None
        } else {
            Some(relative.to_path_buf())
        }
    }

    fn is_skipped(&self, relative: &Path) -> bool {
        match &self.selection {
            Selection::EntireDirectory { dockerfile } => {
                if relative == dockerfile || relative == Path::new(DOCKERIGNORE) {
                    false
                } else if relative == Path::new(DOCKERFILE) {
                    // A stray `Dockerfile` would shadow the renamed one.
                    true
                } else {
                    self.excludes.is_excluded(&slash_name(relative))
                }
            }
            Selection::SingleFileOrDirectory { source, .. } => {
                !relative.starts_with(source) || relative == Path::new(DOCKERFILE)
            }
        }
    }

    fn entry_name<'a>(&self, relative: &'a Path) -> &'a Path {
        match &self.selection {
            Selection::EntireDirectory { dockerfile } if relative == dockerfile => {
                Path::new(DOCKERFILE)
            }
            _ => relative,
        }
    }
}

/// `/`-separated form of a relative path, used for pattern matching only.
fn slash_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Why an entry could not be appended.
#[derive(Debug)]
enum AppendError {
    /// Reading the entry from disk failed before anything was written.
    Source(io::Error),
    /// The archive output failed; the stream is no longer usable.
    Output(io::Error),
}

/// Copies exactly `declared` bytes: whatever the underlying reader no longer
/// delivers (early EOF or a read error) is replaced with zeros.
struct FixedLengthReader<R> {
    inner: R,
    remaining: u64,
    zero_filled: u64,
    failure: Option<io::Error>,
}

impl<R: Read> FixedLengthReader<R> {
    fn new(inner: R, declared: u64) -> Self {
        Self {
            inner,
            remaining: declared,
            zero_filled: 0,
            failure: None,
        }
    }
}

impl<R: Read> Read for FixedLengthReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let max = usize::try_from(self.remaining)
            .unwrap_or(usize::MAX)
            .min(buf.len());
        let buf = &mut buf[..max];
        let read = if self.zero_filled > 0 || self.failure.is_some() {
            0
        } else {
            match self.inner.read(buf) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => return Err(e),
                Err(e) => {
                    self.failure = Some(e);
                    0
                }
            }
        };
        let read = if read == 0 {
            buf.fill(0);
            self.zero_filled += max as u64;
            max
        } else {
            read
        };
        self.remaining -= read as u64;
        Ok(read)
    }
}

/// The Dockerfile that makes an upload image copy its payload into a bind mount.
pub fn upload_dockerfile(source: &str, is_dir: bool) -> String {
    let copy_from = if is_dir {
        format!("/.source/{}/.", source)
    } else {
        format!("/.source/{}", source)
    };
    format!(
        "FROM busybox:latest\nADD {src} /.source/{src}\n{cmd}",
        src = source,
        cmd = format!("CMD [\"cp\",\"-r\",\"{}\",\"/.destination/\"]\n", copy_from)
    )
}

fn append_generated_dockerfile<W: Write>(
    tar: &mut tar::Builder<W>,
    source: &str,
    is_dir: bool,
) -> io::Result<()> {
    let contents = upload_dockerfile(source, is_dir);
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_mode(0o100644);
    header.set_size(contents.len() as u64);
    header.set_mtime(chrono::Utc::now().timestamp().max(0) as u64);
    tar.append_data(&mut header, DOCKERFILE, contents.as_bytes())
}

/// Writes one filesystem entry and returns its on-disk size.
fn append_entry<W: Write>(
    tar: &mut tar::Builder<W>,
    path: &Path,
    name: &Path,
) -> std::result::Result<u64, AppendError> {
    let metadata = fs::symlink_metadata(path).map_err(AppendError::Source)?;
    let mut header = Header::new_gnu();
    header.set_metadata_in_mode(&metadata, HeaderMode::Complete);
    let file_type = metadata.file_type();

    if file_type.is_symlink() {
        let target = fs::read_link(path).map_err(AppendError::Source)?;
        header.set_size(0);
        tar.append_link(&mut header, name, &target).map_err(AppendError::Output)?;
    } else if file_type.is_file() {
        // Opened before the header goes out, so an unreadable file leaves no trace.
        let file = File::open(path).map_err(AppendError::Source)?;
        header.set_size(metadata.len());
        let mut body = FixedLengthReader::new(file, metadata.len());
        tar.append_data(&mut header, name, &mut body).map_err(AppendError::Output)?;
        if body.zero_filled > 0 {
            warn!(
                "{} changed while it was archived, {} byte(s) zero-filled{}",
                path.display(),
                body.zero_filled,
                body.failure
                    .map(|e| format!(" after a read error: {}", e))
                    .unwrap_or_default()
            );
        }
    } else if file_type.is_dir() {
        header.set_size(0);
        append_directory(tar, &mut header, name).map_err(AppendError::Output)?;
    } else {
        header.set_size(0);
        tar.append_data(&mut header, name, io::empty()).map_err(AppendError::Output)?;
    }
    Ok(metadata.len())
}

#[cfg(unix)]
fn name_bytes(name: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(name.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn name_bytes(name: &Path) -> Cow<'_, [u8]> {
    Cow::Owned(slash_name(name).into_bytes())
}

/// Directory names end in `/`. `Header::set_path` normalizes the trailing `/`
/// away, so short names are written into the name field directly.
fn append_directory<W: Write>(
    tar: &mut tar::Builder<W>,
    header: &mut Header,
    name: &Path,
) -> io::Result<()> {
    let mut bytes = name_bytes(name).into_owned();
    bytes.push(b'/');
    let bytes = bytes.as_slice();
    let slot_len = header.as_old().name.len();
    if bytes.len() >= slot_len {
        return tar.append_data(header, name, io::empty());
    }
    header.set_path(name)?;
    let slot = &mut header.as_old_mut().name;
    slot[..bytes.len()].copy_from_slice(bytes);
    slot[bytes.len()..].iter_mut().for_each(|b| *b = 0);
    header.set_cksum();
    tar.append(header, io::empty())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("Failed to get current directory")?
            .join(path))
    }
}

fn split_parent(path: &Path) -> Result<(PathBuf, OsString)> {
    let name = path
        .file_name()
        .map(OsStr::to_os_string)
        .ok_or_else(|| anyhow!("Path {} has no file name", path.display()))?;
    let parent = path
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("Path {} has no parent directory", path.display()))?;
    Ok((parent, name))
}

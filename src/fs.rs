// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Filesystem utilities.
//!
//! Everything the dot store needs from the filesystem: directory creation,
//! breadth-first traversal, hard-link based directory cloning, SHA-1 hashing,
//! and chunked file comparison.
//!
//! All file content is read in fixed-size chunks. The chunk size defaults to
//! [`DEFAULT_CHUNK_SIZE`], but every reader takes it as a parameter so small
//! files can exercise multi-chunk paths.

use sha1::{Digest, Sha1};
use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fs::{self, File, FileType},
    io::{ErrorKind, Read},
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Default number of bytes read per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Create directory and any missing parent directories, like `mkdir -p`.
///
/// No-op if directory already exists.
///
/// # Errors
///
/// - Return [`FsError::CreateDir`] if any missing directory cannot be created.
pub fn ensure_directory(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    mkdirp::mkdirp(path).map_err(|err| FsError::CreateDir {
        source: err,
        path: path.to_path_buf(),
    })?;

    Ok(())
}

/// Entry yielded by [`Walk`].
#[derive(Debug, Clone)]
pub struct WalkEntry {
    path: PathBuf,
    file_type: FileType,
}

impl WalkEntry {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }

    /// Entry is a real directory. Symbolic links to directories are not.
    pub fn is_dir(&self) -> bool {
        self.file_type.is_dir()
    }

    /// Entry is a regular file.
    pub fn is_file(&self) -> bool {
        self.file_type.is_file()
    }
}

/// Breadth-first traversal over all descendants of a directory.
///
/// Directories are queued as they are found, and yielded along with files
/// unless the walk is restricted to files only. Symbolic links are yielded
/// as-is, but never descended into. The walk is lazy and one-shot.
///
/// By default a directory that cannot be read produces a
/// [`FsError::Traversal`] item, after which the walk carries on with the
/// rest of its queue. In best-effort mode those errors are swallowed, and the
/// offending subtree is simply skipped.
#[derive(Debug)]
pub struct Walk {
    queue: VecDeque<PathBuf>,
    entries: Option<(PathBuf, fs::ReadDir)>,
    files_only: bool,
    ignore_errors: bool,
}

/// Start breadth-first traversal of `path`.
pub fn walk(path: impl Into<PathBuf>, files_only: bool) -> Walk {
    Walk {
        queue: VecDeque::from([path.into()]),
        entries: None,
        files_only,
        ignore_errors: false,
    }
}

impl Walk {
    /// Skip unreadable subtrees instead of reporting them.
    pub fn ignore_errors(mut self, yes: bool) -> Self {
        self.ignore_errors = yes;
        self
    }

    fn fail(&self, source: std::io::Error, path: PathBuf) -> Option<Result<WalkEntry>> {
        if self.ignore_errors {
            debug!("skip unreadable path {:?}: {source}", path.display());
            None
        } else {
            Some(Err(FsError::Traversal { source, path }))
        }
    }
}

impl Iterator for Walk {
    type Item = Result<WalkEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some((dir, entries)) = self.entries.as_mut() else {
                let dir = self.queue.pop_front()?;
                match fs::read_dir(&dir) {
                    Ok(entries) => self.entries = Some((dir, entries)),
                    Err(err) => match self.fail(err, dir) {
                        Some(item) => return Some(item),
                        None => continue,
                    },
                }
                continue;
            };

            let entry = match entries.next() {
                Some(Ok(entry)) => entry,
                Some(Err(err)) => {
                    let dir = dir.clone();
                    self.entries = None;
                    match self.fail(err, dir) {
                        Some(item) => return Some(item),
                        None => continue,
                    }
                }
                None => {
                    self.entries = None;
                    continue;
                }
            };

            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => match self.fail(err, path) {
                    Some(item) => return Some(item),
                    None => continue,
                },
            };

            // INVARIANT: Hit a directory? Queue it up for later!
            if file_type.is_dir() {
                self.queue.push_back(path.clone());
                if self.files_only {
                    continue;
                }
            }

            return Some(Ok(WalkEntry { path, file_type }));
        }
    }
}

/// Recursively reproduce directory structure, and hard link its files.
///
/// Every directory under `source` is recreated under `target` if missing, and
/// every other entry is hard linked to its matching path under `target`.
///
/// # Errors
///
/// - Return [`FsError::Traversal`] if `source` cannot be walked.
/// - Return [`FsError::CreateDir`] if a directory cannot be created.
/// - Return [`FsError::HardLink`] if a hard link cannot be made, notably when
///   the destination already exists. Destinations are never cleared here.
#[instrument(skip(source, target), level = "debug")]
pub fn clone_directory(source: impl AsRef<Path>, target: impl AsRef<Path>) -> Result<()> {
    let (source, target) = (source.as_ref(), target.as_ref());
    debug!("clone {:?} into {:?}", source.display(), target.display());
    ensure_directory(target)?;

    for entry in walk(source, false) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .unwrap_or_else(|_| entry.path());
        let destination = target.join(relative);

        if entry.is_dir() {
            ensure_directory(&destination)?;
        } else {
            hard_link(entry.path(), &destination)?;
        }
    }

    Ok(())
}

/// Hard link `from` to `to`.
///
/// # Errors
///
/// - Return [`FsError::HardLink`] if link cannot be created.
pub fn hard_link(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
    let (from, to) = (from.as_ref(), to.as_ref());
    fs::hard_link(from, to).map_err(|err| FsError::HardLink {
        source: err,
        from: from.to_path_buf(),
        to: to.to_path_buf(),
    })
}

/// Remove file or directory tree at `path`.
///
/// Symbolic links are removed themselves, never their targets. No-op if
/// nothing exists at `path`.
///
/// # Errors
///
/// - Return [`FsError::Remove`] if removal fails.
pub fn remove_path(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let result = match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(err) => Err(err),
    };

    result.map_err(|err| FsError::Remove {
        source: err,
        path: path.to_path_buf(),
    })
}

/// Input accepted by [`hash_bytes_or_path`].
#[derive(Debug, Clone, Copy)]
pub enum HashInput<'a> {
    /// Raw content to hash directly.
    Bytes(&'a [u8]),

    /// File whose content should be hashed.
    Path(&'a Path),
}

impl<'a> From<&'a str> for HashInput<'a> {
    fn from(text: &'a str) -> Self {
        Self::Bytes(text.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for HashInput<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a Path> for HashInput<'a> {
    fn from(path: &'a Path) -> Self {
        Self::Path(path)
    }
}

/// Calculate SHA-1 hex digest of raw content, or of a file's content.
///
/// Returns `None` if given a path that does not exist.
///
/// # Errors
///
/// - Return [`FsError::Read`] if an existing file cannot be read.
pub fn hash_bytes_or_path<'a>(
    input: impl Into<HashInput<'a>>,
    chunk_size: usize,
) -> Result<Option<String>> {
    match input.into() {
        HashInput::Bytes(bytes) => Ok(Some(hex::encode(Sha1::digest(bytes)))),
        HashInput::Path(path) if path.exists() => hash_file(path, chunk_size).map(Some),
        HashInput::Path(_) => Ok(None),
    }
}

/// Calculate SHA-1 hex digest of file, streaming it in chunks.
///
/// # Errors
///
/// - Return [`FsError::Read`] if file cannot be opened or read.
pub fn hash_file(path: impl AsRef<Path>, chunk_size: usize) -> Result<String> {
    let path = path.as_ref();
    let read_error = |err| FsError::Read {
        source: err,
        path: path.to_path_buf(),
    };

    let mut file = File::open(path).map_err(read_error)?;
    hash_reader(&mut file, chunk_size).map_err(read_error)
}

fn hash_reader(reader: &mut impl Read, chunk_size: usize) -> std::io::Result<String> {
    let mut hasher = Sha1::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];
    loop {
        let count = read_chunk(reader, &mut buffer)?;
        if count == 0 {
            break;
        }
        hasher.update(&buffer[..count]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Calculate SHA-1 hex digest for every regular file under directory.
///
/// Keys are file paths relative to `path` in posix form.
///
/// # Errors
///
/// - Return [`FsError::Traversal`] if directory cannot be walked.
/// - Return [`FsError::Read`] if a file cannot be read.
pub fn hash_directory(
    path: impl AsRef<Path>,
    chunk_size: usize,
) -> Result<BTreeMap<String, String>> {
    let path = path.as_ref();
    let mut hashes = BTreeMap::new();
    for entry in walk(path, true) {
        let entry = entry?;
        if !entry.is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(path).unwrap_or(entry.path());
        hashes.insert(
            crate::path::to_posix(relative),
            hash_file(entry.path(), chunk_size)?,
        );
    }

    Ok(hashes)
}

/// Compare two files chunk by chunk.
///
/// Stops at the first chunk that does not match.
///
/// # Errors
///
/// - Return [`FsError::Read`] if either file cannot be opened or read.
pub fn files_differ(a: impl AsRef<Path>, b: impl AsRef<Path>, chunk_size: usize) -> Result<bool> {
    let (a, b) = (a.as_ref(), b.as_ref());
    let mut file_a = File::open(a).map_err(|err| FsError::Read {
        source: err,
        path: a.to_path_buf(),
    })?;
    let mut file_b = File::open(b).map_err(|err| FsError::Read {
        source: err,
        path: b.to_path_buf(),
    })?;

    let chunk_size = chunk_size.max(1);
    let mut buf_a = vec![0u8; chunk_size];
    let mut buf_b = vec![0u8; chunk_size];
    loop {
        let count_a = read_chunk(&mut file_a, &mut buf_a).map_err(|err| FsError::Read {
            source: err,
            path: a.to_path_buf(),
        })?;
        let count_b = read_chunk(&mut file_b, &mut buf_b).map_err(|err| FsError::Read {
            source: err,
            path: b.to_path_buf(),
        })?;

        if buf_a[..count_a] != buf_b[..count_b] {
            return Ok(true);
        }

        // INVARIANT: Equal chunks that came up short mean both hit EOF together.
        if count_a < chunk_size {
            return Ok(false);
        }
    }
}

/// Compare two directory trees by their regular files.
///
/// Trees differ when one has a file the other lacks, or when a pair of
/// matching files differ in content.
///
/// # Errors
///
/// - Return [`FsError::Traversal`] if either directory cannot be walked.
/// - Return [`FsError::Read`] if a file cannot be read.
pub fn directories_differ(
    a: impl AsRef<Path>,
    b: impl AsRef<Path>,
    chunk_size: usize,
) -> Result<bool> {
    let (a, b) = (a.as_ref(), b.as_ref());
    let files_a = relative_files(a)?;
    let files_b = relative_files(b)?;
    if files_a != files_b {
        return Ok(true);
    }

    for relative in &files_a {
        if files_differ(a.join(relative), b.join(relative), chunk_size)? {
            return Ok(true);
        }
    }

    Ok(false)
}

fn relative_files(path: &Path) -> Result<BTreeSet<PathBuf>> {
    let mut files = BTreeSet::new();
    for entry in walk(path, true) {
        let entry = entry?;
        if entry.is_file() {
            let relative = entry.path().strip_prefix(path).unwrap_or(entry.path());
            files.insert(relative.to_path_buf());
        }
    }

    Ok(files)
}

// Keep reading until buffer is full or EOF, so short reads never look like a
// mismatch.
fn read_chunk(reader: &mut impl Read, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(count) => filled += count,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }

    Ok(filled)
}

/// All possible error types for filesystem utilities.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// Directory could not be created.
    #[error("failed to create directory at {:?}", path.display())]
    CreateDir {
        source: std::io::Error,
        path: PathBuf,
    },

    /// Directory could not be read during traversal.
    #[error("failed to traverse {:?}", path.display())]
    Traversal {
        source: std::io::Error,
        path: PathBuf,
    },

    /// Hard link could not be made, e.g., destination already exists.
    #[error("failed to hard link {:?} to {:?}", from.display(), to.display())]
    HardLink {
        source: std::io::Error,
        from: PathBuf,
        to: PathBuf,
    },

    /// File could not be read.
    #[error("failed to read {:?}", path.display())]
    Read {
        source: std::io::Error,
        path: PathBuf,
    },

    /// File or directory could not be removed.
    #[error("failed to remove {:?}", path.display())]
    Remove {
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = FsError> = std::result::Result<T, E>;

// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dot domain representation.
//!
//! A __dot__ is a configuration file or directory tracked by a profile. The
//! live file at its origin, and the copy in the profile's store are hard
//! links of one another, so an edit made in place shows up in the store
//! without any syncing.
//!
//! # Drift Detection
//!
//! Hard links do not survive every kind of edit. Plenty of editors save by
//! writing a new file and renaming it over the old one, which quietly splits
//! the origin from its store-side copy. Each dot therefore records a SHA-1
//! hash of its content, and the time that hash was taken. Comparing the
//! recorded hash against a fresh one tells whether the dot [`changed`] since
//! it was last checked. Comparing the origin against the store-side copy
//! tells whether the two have [`diverged`].
//!
//! # Lifecycle
//!
//! A dot is __loaded__ when its normalized path is already tracked by the
//! profile. Otherwise it is __created__ on request: its type is classified
//! once from the filesystem, and its first hash is recorded. A dot that was
//! neither loaded nor created is __unbound__, and every operation that needs
//! its record fails with [`DotError::Unbound`].
//!
//! [`changed`]: Dot::changed
//! [`diverged`]: Dot::diverged

use crate::{
    config::{Checksum, DotKind, DotRecord, RecordField},
    fs::{
        clone_directory, directories_differ, ensure_directory, files_differ, hard_link,
        hash_directory, hash_file, remove_path, FsError,
    },
    path::{absolutize, resolve, ResolvedPath},
    profile::{DotRegistry, Profile},
};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, info, instrument, warn};

/// A tracked dot bound to the profile that owns it.
#[derive(Debug)]
pub struct Dot<'p, P = Profile>
where
    P: DotRegistry,
{
    profile: &'p mut P,
    path: ResolvedPath,
}

impl<'p, P> Dot<'p, P>
where
    P: DotRegistry,
{
    /// Construct new dot from raw path.
    ///
    /// Loads the dot's record if the profile already tracks it. Otherwise the
    /// dot is created when `create` is set, or left unbound.
    ///
    /// # Errors
    ///
    /// - Return [`DotError::Path`] if raw path cannot be resolved.
    /// - Return [`DotError::MissingOrigin`] or [`DotError::UnsupportedOrigin`]
    ///   if a new dot cannot be classified.
    /// - Return [`DotError::Profile`] if a new dot cannot be persisted.
    #[instrument(skip(profile, raw), level = "debug")]
    pub fn new(profile: &'p mut P, raw: impl AsRef<str>, create: bool) -> Result<Self> {
        let path = resolve(
            raw,
            profile.user_home(),
            profile.dot_home_path(),
            profile.dot_root_path(),
        )?;
        let mut dot = Self { profile, path };

        if dot.is_bound() {
            debug!("load dot {:?}", dot.normalized_origin_path());
        } else if create {
            dot.create()?;
        } else {
            debug!("dot {:?} is not tracked", dot.normalized_origin_path());
        }

        Ok(dot)
    }

    /// Load dot, or start tracking it if needed.
    ///
    /// # Errors
    ///
    /// - Return any error from [`Dot::new`].
    pub fn track(profile: &'p mut P, raw: impl AsRef<str>) -> Result<Self> {
        Self::new(profile, raw, true)
    }

    /// Load dot without ever tracking it.
    ///
    /// # Errors
    ///
    /// - Return [`DotError::Path`] if raw path cannot be resolved.
    pub fn open(profile: &'p mut P, raw: impl AsRef<str>) -> Result<Self> {
        Self::new(profile, raw, false)
    }

    fn create(&mut self) -> Result<()> {
        let origin = self.absolute_origin_path();
        let kind = match fs::metadata(origin) {
            Ok(metadata) if metadata.is_dir() => DotKind::Dir,
            Ok(metadata) if metadata.is_file() => DotKind::File,
            Ok(_) => return Err(DotError::UnsupportedOrigin(origin.to_path_buf())),
            Err(_) => return Err(DotError::MissingOrigin(origin.to_path_buf())),
        };

        self.ensure_store_outside_origin()?;

        info!("track {kind} {:?}", self.normalized_origin_path());
        let sha1 = self.hash_as(kind)?;
        let key = self.normalized_origin_path().to_string();
        self.profile.dots_mut().insert(
            key,
            DotRecord {
                sha1,
                last_sha1_check: now(),
                kind,
            },
        );
        self.profile.save()?;

        Ok(())
    }

    // INVARIANT: Store-side copy never lives inside the origin, or cloning
    // the origin would keep walking into its own copy.
    fn ensure_store_outside_origin(&self) -> Result<()> {
        let origin = self.absolute_origin_path();
        if absolutize(self.dot_path())?.starts_with(origin) {
            return Err(DotError::StoreInsideOrigin(origin.to_path_buf()));
        }

        Ok(())
    }

    /// Path exactly as the caller supplied it.
    pub fn origin_path(&self) -> &str {
        &self.path.origin_path
    }

    /// Expanded and resolved absolute origin path.
    pub fn absolute_origin_path(&self) -> &Path {
        &self.path.absolute_origin_path
    }

    /// Key of the dot in its profile.
    pub fn normalized_origin_path(&self) -> &str {
        &self.path.normalized_origin_path
    }

    /// Location of the store-side copy.
    pub fn dot_path(&self) -> &Path {
        &self.path.dot_path
    }

    /// Check if profile holds a record for this dot.
    pub fn is_bound(&self) -> bool {
        self.profile
            .dots()
            .contains_key(self.normalized_origin_path())
    }

    /// Persisted record of this dot.
    ///
    /// # Errors
    ///
    /// - Return [`DotError::Unbound`] if dot is not tracked.
    pub fn record(&self) -> Result<&DotRecord> {
        self.profile
            .dots()
            .get(self.normalized_origin_path())
            .ok_or_else(|| DotError::Unbound(self.normalized_origin_path().to_string()))
    }

    /// Type of this dot.
    ///
    /// # Errors
    ///
    /// - Return [`DotError::Unbound`] if dot is not tracked.
    pub fn kind(&self) -> Result<DotKind> {
        Ok(self.record()?.kind)
    }

    /// Content hash recorded at the last check.
    ///
    /// # Errors
    ///
    /// - Return [`DotError::Unbound`] if dot is not tracked.
    pub fn sha1(&self) -> Result<&Checksum> {
        Ok(&self.record()?.sha1)
    }

    /// Unix timestamp of the last check.
    ///
    /// # Errors
    ///
    /// - Return [`DotError::Unbound`] if dot is not tracked.
    pub fn last_sha1_check(&self) -> Result<i64> {
        Ok(self.record()?.last_sha1_check)
    }

    /// Look up record field by its serialized name.
    ///
    /// # Errors
    ///
    /// - Return [`DotError::Unbound`] if dot is not tracked.
    /// - Return [`DotError::UnknownField`] if record has no such field.
    pub fn field(&self, name: &str) -> Result<RecordField<'_>> {
        self.record()?
            .field(name)
            .ok_or_else(|| DotError::UnknownField(name.to_string()))
    }

    /// Check if anything exists at the origin.
    pub fn origin_exists(&self) -> bool {
        fs::symlink_metadata(self.absolute_origin_path()).is_ok()
    }

    /// Check if anything exists at the store-side location.
    pub fn dot_exists(&self) -> bool {
        fs::symlink_metadata(self.dot_path()).is_ok()
    }

    /// Capture the origin into the store.
    ///
    /// Any stale store-side copy is removed, the origin is hard linked, or
    /// cloned when it is a directory, into the store, and the new hash is
    /// recorded.
    ///
    /// # Errors
    ///
    /// - Return [`DotError::Unbound`] if dot is not tracked.
    /// - Return [`DotError::MissingOrigin`] if origin does not exist. The
    ///   store-side copy is left alone in that case.
    /// - Return [`DotError::StoreInsideOrigin`] if origin contains the store.
    /// - Return [`DotError::Fs`] if linking fails.
    /// - Return [`DotError::Profile`] if new hash cannot be persisted.
    #[instrument(skip(self), level = "debug")]
    pub fn link_dot(&mut self) -> Result<()> {
        let kind = self.kind()?;
        let (origin, dot_path) = (self.absolute_origin_path(), self.dot_path());
        if !self.origin_exists() {
            return Err(DotError::MissingOrigin(origin.to_path_buf()));
        }
        self.ensure_store_outside_origin()?;
        info!("link {:?} into store", self.normalized_origin_path());

        if let Some(parent) = dot_path.parent() {
            ensure_directory(parent)?;
        }

        if self.dot_exists() {
            debug!("remove stale store entry {:?}", dot_path.display());
            remove_path(dot_path)?;
        }

        match kind {
            DotKind::File => hard_link(origin, dot_path)?,
            DotKind::Dir => clone_directory(origin, dot_path)?,
        }

        self.update_hash()
    }

    /// Materialize the store-side copy back at the origin.
    ///
    /// Used to activate a profile on a fresh machine. Missing parent
    /// directories of the origin are created.
    ///
    /// # Errors
    ///
    /// - Return [`DotError::Unbound`] if dot is not tracked.
    /// - Return [`DotError::MissingDot`] if there is no store-side copy to
    ///   link back. Nothing is touched in that case.
    /// - Return [`DotError::AlreadyExists`] if origin exists, and `overwrite`
    ///   is not set. Nothing is touched in that case.
    /// - Return [`DotError::Fs`] if linking fails.
    #[instrument(skip(self), level = "debug")]
    pub fn link_back(&mut self, overwrite: bool) -> Result<()> {
        let kind = self.kind()?;
        let (origin, dot_path) = (self.absolute_origin_path(), self.dot_path());
        if !self.dot_exists() {
            return Err(DotError::MissingDot(dot_path.to_path_buf()));
        }

        if self.origin_exists() {
            if !overwrite {
                return Err(DotError::AlreadyExists(
                    self.normalized_origin_path().to_string(),
                ));
            }

            warn!("overwrite origin {:?}", origin.display());
            remove_path(origin)?;
        }

        info!("link {:?} back from store", self.normalized_origin_path());
        if let Some(parent) = origin.parent() {
            ensure_directory(parent)?;
        }

        match kind {
            DotKind::File => hard_link(dot_path, origin)?,
            DotKind::Dir => clone_directory(dot_path, origin)?,
        }

        Ok(())
    }

    /// Remove store-side copy.
    ///
    /// The record itself is kept, see [`Dot::delete`] to stop tracking.
    ///
    /// # Errors
    ///
    /// - Return [`DotError::Unbound`] if dot is not tracked.
    /// - Return [`DotError::Fs`] if removal fails.
    #[instrument(skip(self), level = "debug")]
    pub fn unlink(&self) -> Result<()> {
        let kind = self.kind()?;
        if !self.dot_exists() {
            return Ok(());
        }

        let dot_path = self.dot_path();
        info!("unlink {:?} from store", self.normalized_origin_path());
        let result = match kind {
            DotKind::File => fs::remove_file(dot_path),
            DotKind::Dir => fs::remove_dir_all(dot_path),
        };

        result.map_err(|err| {
            DotError::Fs(FsError::Remove {
                source: err,
                path: dot_path.to_path_buf(),
            })
        })
    }

    /// Stop tracking this dot.
    ///
    /// Removes the store-side copy if present, drops the record, and persists
    /// the profile right away. The dot is unbound afterwards.
    ///
    /// # Errors
    ///
    /// - Return [`DotError::Fs`] if store-side copy cannot be removed.
    /// - Return [`DotError::Profile`] if profile cannot be persisted.
    #[instrument(skip(self), level = "debug")]
    pub fn delete(&mut self) -> Result<()> {
        info!("untrack {:?}", self.normalized_origin_path());
        if self.dot_exists() {
            remove_path(self.dot_path())?;
        }

        let key = self.normalized_origin_path().to_string();
        self.profile.dots_mut().remove(&key);
        self.profile.save()?;

        Ok(())
    }

    /// Calculate current content hash of the origin.
    ///
    /// # Errors
    ///
    /// - Return [`DotError::Unbound`] if dot is not tracked.
    /// - Return [`DotError::MissingOrigin`] if origin does not exist.
    /// - Return [`DotError::Fs`] if origin cannot be read.
    pub fn hash(&self) -> Result<Checksum> {
        self.hash_as(self.kind()?)
    }

    fn hash_as(&self, kind: DotKind) -> Result<Checksum> {
        let origin = self.absolute_origin_path();
        if !self.origin_exists() {
            return Err(DotError::MissingOrigin(origin.to_path_buf()));
        }

        let chunk_size = self.profile.chunk_size();
        let checksum = match kind {
            DotKind::File => Checksum::File(hash_file(origin, chunk_size)?),
            DotKind::Dir => Checksum::Dir(hash_directory(origin, chunk_size)?),
        };

        Ok(checksum)
    }

    /// Recalculate and record content hash, then persist the profile.
    ///
    /// # Errors
    ///
    /// - Return [`DotError::Unbound`] if dot is not tracked.
    /// - Return [`DotError::MissingOrigin`] if origin does not exist.
    /// - Return [`DotError::Fs`] if origin cannot be read.
    /// - Return [`DotError::Profile`] if profile cannot be persisted.
    #[instrument(skip(self), level = "debug")]
    pub fn update_hash(&mut self) -> Result<()> {
        let sha1 = self.hash()?;
        let key = self.normalized_origin_path().to_string();
        let record = self
            .profile
            .dots_mut()
            .get_mut(&key)
            .ok_or_else(|| DotError::Unbound(key.clone()))?;
        record.sha1 = sha1;
        record.last_sha1_check = now();
        debug!("recorded new hash for {key:?}");
        self.profile.save()?;

        Ok(())
    }

    /// Check if origin content no longer matches the recorded hash.
    ///
    /// A missing origin counts as changed.
    ///
    /// # Errors
    ///
    /// - Return [`DotError::Unbound`] if dot is not tracked.
    /// - Return [`DotError::Fs`] if origin cannot be read.
    pub fn changed(&self) -> Result<bool> {
        let recorded = self.sha1()?;
        if !self.origin_exists() {
            return Ok(true);
        }

        Ok(self.hash()? != *recorded)
    }

    /// Check if origin and store-side copy hold different content.
    ///
    /// A missing side counts as diverged.
    ///
    /// # Errors
    ///
    /// - Return [`DotError::Unbound`] if dot is not tracked.
    /// - Return [`DotError::Fs`] if either side cannot be read.
    pub fn diverged(&self) -> Result<bool> {
        let kind = self.kind()?;
        if !self.origin_exists() || !self.dot_exists() {
            return Ok(true);
        }

        let (origin, dot_path) = (self.absolute_origin_path(), self.dot_path());
        let chunk_size = self.profile.chunk_size();
        let diverged = match kind {
            DotKind::File => files_differ(origin, dot_path, chunk_size)?,
            DotKind::Dir => directories_differ(origin, dot_path, chunk_size)?,
        };

        Ok(diverged)
    }

    /// Summarize state of this dot.
    ///
    /// # Errors
    ///
    /// - Return [`DotError::Unbound`] if dot is not tracked.
    /// - Return [`DotError::Fs`] if either side cannot be read.
    pub fn status(&self) -> Result<DotStatus> {
        self.record()?;
        let status = if !self.origin_exists() {
            DotStatus::MissingOrigin
        } else if !self.dot_exists() {
            DotStatus::MissingDot
        } else if self.diverged()? {
            DotStatus::Diverged
        } else if self.changed()? {
            DotStatus::Changed
        } else {
            DotStatus::Clean
        };

        Ok(status)
    }
}

/// Summary of a dot's state.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DotStatus {
    /// Nothing exists at the origin.
    MissingOrigin,

    /// Nothing exists in the store.
    MissingDot,

    /// Origin and store-side copy hold different content.
    Diverged,

    /// Content no longer matches the recorded hash.
    Changed,

    /// Content matches everywhere.
    Clean,
}

impl Display for DotStatus {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let status = match self {
            Self::MissingOrigin => "missing origin",
            Self::MissingDot => "missing in store",
            Self::Diverged => "diverged",
            Self::Changed => "changed",
            Self::Clean => "clean",
        };
        fmt.pad(status)
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}

/// All possible error types for dot interaction.
#[derive(Debug, thiserror::Error)]
pub enum DotError {
    /// Origin is in the way of linking back.
    #[error("origin {0} already exists")]
    AlreadyExists(String),

    /// Dot has no record in its profile.
    #[error("dot {0} is not tracked")]
    Unbound(String),

    /// Record has no field with given name.
    #[error("unknown dot record field {0:?}")]
    UnknownField(String),

    /// Nothing exists at the origin.
    #[error("origin {:?} does not exist", .0.display())]
    MissingOrigin(PathBuf),

    /// Nothing exists in the store to link back.
    #[error("store-side copy {:?} does not exist", .0.display())]
    MissingDot(PathBuf),

    /// Origin holds the store itself.
    #[error("origin {:?} contains the dot store", .0.display())]
    StoreInsideOrigin(PathBuf),

    /// Origin is neither a regular file nor a directory.
    #[error("origin {:?} is neither a file nor a directory", .0.display())]
    UnsupportedOrigin(PathBuf),

    /// Raw path cannot be resolved.
    #[error(transparent)]
    Path(#[from] crate::path::PathError),

    /// Filesystem operation fails.
    #[error(transparent)]
    Fs(#[from] crate::fs::FsError),

    /// Profile cannot be persisted.
    #[error(transparent)]
    Profile(#[from] crate::profile::ProfileError),
}

/// Friendly result alias :3
pub type Result<T, E = DotError> = std::result::Result<T, E>;

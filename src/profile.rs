// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Profile management.
//!
//! A __profile__ is a named set of tracked dots. It owns the store-side
//! copies of its dots, and the profile file recording each one of them.
//!
//! # Profile Layout
//!
//! Each profile lives in its own directory:
//!
//! - `profile.toml`: the profile file, see [`ProfileConfig`].
//! - `home/`: home-mirror root, dots under the user's home directory.
//! - `root/`: root-mirror root, dots anywhere else on the filesystem.
//!
//! The profile file is always rewritten in full on save.

use crate::{
    config::{DotRecord, ProfileConfig},
    fs::{ensure_directory, DEFAULT_CHUNK_SIZE},
    path::absolutize,
};

use std::{
    collections::BTreeMap,
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Layer of indirection for the profile owning a set of dots.
pub trait DotRegistry {
    /// Tracked dots keyed by normalized path.
    fn dots(&self) -> &BTreeMap<String, DotRecord>;

    /// Mutable access to tracked dots.
    fn dots_mut(&mut self) -> &mut BTreeMap<String, DotRecord>;

    /// Persist every tracked dot.
    fn save(&self) -> Result<()>;

    /// Home directory dots are normalized against.
    fn user_home(&self) -> &Path;

    /// Root of store-side copies for dots under home.
    fn dot_home_path(&self) -> &Path;

    /// Root of store-side copies for dots outside of home.
    fn dot_root_path(&self) -> &Path;

    /// Number of bytes read per chunk when hashing or comparing files.
    fn chunk_size(&self) -> usize {
        DEFAULT_CHUNK_SIZE
    }
}

/// Profile persisted as a TOML file.
#[derive(Debug)]
pub struct Profile {
    name: String,
    path: PathBuf,
    user_home: PathBuf,
    dot_home_path: PathBuf,
    dot_root_path: PathBuf,
    config: ProfileConfig,
}

impl Profile {
    /// File name of the profile file inside a profile directory.
    pub const FILE_NAME: &'static str = "profile.toml";

    /// Open profile at target directory.
    ///
    /// Creates profile directory layout if it does not exist yet. Reads the
    /// profile file when present, otherwise starts out with an empty profile.
    /// A user home set in the profile file takes precedence over
    /// `user_home`.
    ///
    /// # Errors
    ///
    /// - Return [`ProfileError::Fs`] if profile layout cannot be created.
    /// - Return [`ProfileError::Io`] if profile file cannot be read.
    /// - Return [`ProfileError::Config`] if profile file cannot be parsed.
    /// - Return [`ProfileError::Path`] if user home cannot be resolved.
    #[instrument(skip(path, user_home), level = "debug")]
    pub fn open(path: impl Into<PathBuf>, user_home: impl AsRef<Path>) -> Result<Self> {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!("open profile {name:?} at {:?}", path.display());

        let dot_home_path = path.join("home");
        let dot_root_path = path.join("root");
        ensure_directory(&dot_home_path)?;
        ensure_directory(&dot_root_path)?;

        let file = path.join(Self::FILE_NAME);
        let config: ProfileConfig = if file.exists() {
            read_to_string(&file)
                .map_err(|err| ProfileError::Io {
                    source: err,
                    path: file.clone(),
                })?
                .parse()?
        } else {
            ProfileConfig::default()
        };

        // INVARIANT: Home must be canonical so dots normalize against it.
        let user_home = match &config.settings.user_home {
            Some(user_home) => absolutize(user_home.expand()?)?,
            None => absolutize(user_home.as_ref())?,
        };

        Ok(Self {
            name,
            path,
            user_home,
            dot_home_path,
            dot_root_path,
            config,
        })
    }

    /// Name of profile.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path to profile directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current profile configuration.
    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }
}

impl DotRegistry for Profile {
    fn dots(&self) -> &BTreeMap<String, DotRecord> {
        &self.config.dots
    }

    fn dots_mut(&mut self) -> &mut BTreeMap<String, DotRecord> {
        &mut self.config.dots
    }

    /// Rewrite profile file with current configuration.
    ///
    /// # Errors
    ///
    /// - Return [`ProfileError::Io`] if profile file cannot be written.
    #[instrument(skip(self), level = "debug")]
    fn save(&self) -> Result<()> {
        let file = self.path.join(Self::FILE_NAME);
        debug!("save profile {:?} to {:?}", self.name, file.display());
        write(&file, self.config.to_string()).map_err(|err| ProfileError::Io {
            source: err,
            path: file,
        })
    }

    fn user_home(&self) -> &Path {
        &self.user_home
    }

    fn dot_home_path(&self) -> &Path {
        &self.dot_home_path
    }

    fn dot_root_path(&self) -> &Path {
        &self.dot_root_path
    }

    fn chunk_size(&self) -> usize {
        self.config.settings.chunk_size
    }
}

/// All possible error types for profile interaction.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// Profile file cannot be read or written.
    #[error("failed to access profile file at {:?}", path.display())]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    /// Profile file cannot be parsed or rendered.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// User home cannot be resolved.
    #[error(transparent)]
    Path(#[from] crate::path::PathError),

    /// Profile layout cannot be created or removed.
    #[error(transparent)]
    Fs(#[from] crate::fs::FsError),

    /// Profile does not exist in store.
    #[error("profile {0:?} not found")]
    ProfileNotFound(String),

    /// Profile name is not a plain directory name.
    #[error("invalid profile name {0:?}")]
    InvalidProfileName(String),
}

/// Friendly result alias :3
pub type Result<T, E = ProfileError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Checksum, DotKind};
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[test]
    fn open_creates_layout() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let home = root.path().join("home");
        std::fs::create_dir_all(&home)?;

        let profile = Profile::open(root.path().join("work"), &home)?;

        assert_eq!(profile.name(), "work");
        assert!(profile.dot_home_path().is_dir());
        assert!(profile.dot_root_path().is_dir());
        assert_eq!(profile.user_home(), std::fs::canonicalize(&home)?);
        assert!(profile.dots().is_empty());
        assert_eq!(profile.chunk_size(), DEFAULT_CHUNK_SIZE);

        Ok(())
    }

    #[test]
    fn save_then_reopen() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let path = root.path().join("work");

        let mut profile = Profile::open(&path, root.path())?;
        profile.dots_mut().insert(
            "~/.bashrc".into(),
            DotRecord {
                sha1: Checksum::File("blah".into()),
                last_sha1_check: 42,
                kind: DotKind::File,
            },
        );
        profile.save()?;

        let reopened = Profile::open(&path, root.path())?;
        assert_eq!(reopened.config(), profile.config());

        Ok(())
    }

    #[test]
    fn user_home_override_wins() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let path = root.path().join("work");
        let pinned = root.path().join("pinned");
        std::fs::create_dir_all(&path)?;
        std::fs::create_dir_all(&pinned)?;
        std::fs::write(
            path.join(Profile::FILE_NAME),
            format!(
                "[settings]\nchunk_size = 8\nuser_home = {:?}\n",
                pinned.display().to_string()
            ),
        )?;

        let profile = Profile::open(&path, root.path())?;
        assert_eq!(profile.user_home(), std::fs::canonicalize(&pinned)?);
        assert_eq!(profile.chunk_size(), 8);

        Ok(())
    }

    #[sealed_test(env = [("HOME", "/home/blah")])]
    fn save_keeps_user_home_unexpanded() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let path = root.path().join("work");
        std::fs::create_dir_all(&path)?;
        std::fs::write(
            path.join(Profile::FILE_NAME),
            "[settings]\nuser_home = \"$HOME\"\n",
        )?;

        let mut profile = Profile::open(&path, root.path())?;
        assert_eq!(profile.user_home(), absolutize("/home/blah")?);
        profile.dots_mut().insert(
            "~/.bashrc".into(),
            DotRecord {
                sha1: Checksum::File("blah".into()),
                last_sha1_check: 42,
                kind: DotKind::File,
            },
        );
        profile.save()?;

        let saved = std::fs::read_to_string(path.join(Profile::FILE_NAME))?;
        assert!(saved.contains("user_home = \"$HOME\""), "got:\n{saved}");
        assert!(!saved.contains("/home/blah"));

        Ok(())
    }
}

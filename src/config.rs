// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for the profile file that dotcontrol uses to simplify
//! the process of serialization and deserialization. File I/O is left to the
//! caller to figure out.

use crate::fs::DEFAULT_CHUNK_SIZE;

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Profile file layout.
///
/// Every profile comes with a __profile file__. It holds the settings of the
/// profile, and the mapping of every tracked dot keyed by its normalized
/// path.
///
/// # General Layout
///
/// A profile file is composed of two basic parts: settings and dots. The
/// settings section defines how the profile should treat its dots. The dots
/// section records, for every tracked dot, its type and the content hash
/// taken the last time it was checked.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ProfileConfig {
    /// Settings for the profile.
    #[serde(default)]
    pub settings: ProfileSettings,

    /// Tracked dots keyed by normalized path.
    #[serde(default)]
    pub dots: BTreeMap<String, DotRecord>,
}

impl FromStr for ProfileConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        toml::de::from_str(data).map_err(ConfigError::Deserialize)
    }
}

impl Display for ProfileConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Profile configuration settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ProfileSettings {
    /// Number of bytes read per chunk when hashing or comparing files.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Home directory to normalize dots against instead of the user's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_home: Option<UserHome>,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            user_home: None,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

/// Path acting as the home directory of a profile.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct UserHome(PathBuf);

impl UserHome {
    /// Construct new user home.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Treat user home as [`Path`] slice.
    ///
    /// The path is kept exactly as written in the profile file, so it can
    /// still hold `~` or environment variable references.
    pub fn as_path(&self) -> &Path {
        self.0.as_path()
    }

    /// Perform shell expansion on user home.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::ShellExpansion`] if a referenced variable is
    ///   not set.
    pub fn expand(&self) -> Result<PathBuf, ConfigError> {
        let expanded = shellexpand::full(self.to_string().as_str())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned();

        Ok(PathBuf::from(expanded))
    }
}

impl Display for UserHome {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_path().to_string_lossy().as_ref())
    }
}

/// Persisted record of a tracked dot.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct DotRecord {
    /// Content hash taken at the last check.
    pub sha1: Checksum,

    /// Unix timestamp of the last check.
    pub last_sha1_check: i64,

    /// Type of the tracked filesystem object.
    #[serde(rename = "type")]
    pub kind: DotKind,
}

impl DotRecord {
    /// Look up record field by its serialized name.
    ///
    /// Returns `None` for names outside of the record schema.
    pub fn field(&self, name: &str) -> Option<RecordField<'_>> {
        match name {
            "sha1" => Some(RecordField::Sha1(&self.sha1)),
            "last_sha1_check" => Some(RecordField::LastSha1Check(self.last_sha1_check)),
            "type" => Some(RecordField::Type(self.kind)),
            _ => None,
        }
    }
}

/// Borrowed value of a [`DotRecord`] field.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RecordField<'a> {
    Sha1(&'a Checksum),
    LastSha1Check(i64),
    Type(DotKind),
}

/// SHA-1 content hash of a dot.
///
/// Files get a single hex digest. Directories get a hex digest for every
/// regular file keyed by its posix path relative to the directory.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Checksum {
    File(String),
    Dir(BTreeMap<String, String>),
}

/// Type of a tracked filesystem object.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DotKind {
    File,
    Dir,
}

impl Display for DotKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::File => fmt.pad("file"),
            Self::Dir => fmt.pad("dir"),
        }
    }
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

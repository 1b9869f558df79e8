// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Profile store management and manipulation.
//!
//! Dotcontrol groups profiles together into one place called the __store__.
//! The store houses all available profiles that the user can manipulate
//! locally.
//!
//! # Store Layout
//!
//! The store can generally be placed anywhere on the user's file system.
//! However, the default location is `$XDG_DATA_HOME/dotcontrol-store`. Each
//! profile is given its own unique local name. The name of a profile in the
//! store is the name of the directory that contains the profile itself. So,
//! `$XDG_DATA_HOME/dotcontrol-store/laptop` means that the store contains a
//! profile named "laptop".
//!
//! Dotcontrol only evaluates the top-level of the store. Thus, it is not
//! possible to nest profiles inside one another.

use crate::{
    fs::{ensure_directory, remove_path},
    profile::{Profile, ProfileError, Result},
};

use std::{
    fs::read_dir,
    path::{Component, Path, PathBuf},
};
use tracing::{info, instrument};

/// Directory housing every profile.
#[derive(Debug, Clone)]
pub struct Store {
    store_path: PathBuf,
}

impl Store {
    /// Open store at target path, creating it if needed.
    ///
    /// # Errors
    ///
    /// - Return [`ProfileError::Fs`] if store directory cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store_path = path.into();
        ensure_directory(&store_path)?;

        Ok(Self { store_path })
    }

    /// Path to store directory.
    pub fn path(&self) -> &Path {
        &self.store_path
    }

    /// Open profile by name, creating it if it does not exist yet.
    ///
    /// # Errors
    ///
    /// - Return [`ProfileError::InvalidProfileName`] if name is not a plain
    ///   directory name.
    /// - Return any error from [`Profile::open`].
    pub fn profile(&self, name: impl AsRef<str>, user_home: impl AsRef<Path>) -> Result<Profile> {
        let path = self.profile_path(name.as_ref())?;
        Profile::open(path, user_home)
    }

    /// List names of every profile in store in sorted order.
    ///
    /// # Errors
    ///
    /// - Return [`ProfileError::Io`] if store directory cannot be read.
    pub fn profile_names(&self) -> Result<Vec<String>> {
        let io_error = |err| ProfileError::Io {
            source: err,
            path: self.store_path.clone(),
        };

        let mut names = Vec::new();
        for entry in read_dir(&self.store_path).map_err(io_error)? {
            let entry = entry.map_err(io_error)?;
            let path = entry.path();
            if path.join(Profile::FILE_NAME).is_file() || path.join("home").is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        Ok(names)
    }

    /// Remove profile and every store-side copy it holds.
    ///
    /// Origins of tracked dots are left alone.
    ///
    /// # Errors
    ///
    /// - Return [`ProfileError::InvalidProfileName`] if name is not a plain
    ///   directory name.
    /// - Return [`ProfileError::ProfileNotFound`] if profile does not exist.
    /// - Return [`ProfileError::Fs`] if profile cannot be removed.
    #[instrument(skip(self, name), level = "debug")]
    pub fn remove_profile(&self, name: impl AsRef<str>) -> Result<()> {
        let name = name.as_ref();
        let path = self.profile_path(name)?;
        if !path.is_dir() {
            return Err(ProfileError::ProfileNotFound(name.to_string()));
        }

        info!("remove profile {name:?}");
        remove_path(path)?;

        Ok(())
    }

    fn profile_path(&self, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.store_path.join(name)),
            _ => Err(ProfileError::InvalidProfileName(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn profiles_are_listed_and_removed() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let store = Store::open(root.path().join("store"))?;

        store.profile("work", root.path())?;
        store.profile("laptop", root.path())?;
        assert_eq!(store.profile_names()?, vec!["laptop", "work"]);

        store.remove_profile("work")?;
        assert_eq!(store.profile_names()?, vec!["laptop"]);

        assert!(matches!(
            store.remove_profile("work"),
            Err(ProfileError::ProfileNotFound(_))
        ));

        Ok(())
    }

    #[test]
    fn profile_names_must_be_plain() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let store = Store::open(root.path())?;

        for name in ["", "..", "a/b", "/abs"] {
            assert!(matches!(
                store.profile(name, root.path()),
                Err(ProfileError::InvalidProfileName(_))
            ));
        }

        Ok(())
    }
}

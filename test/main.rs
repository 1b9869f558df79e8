// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

mod integration;

use anyhow::Result;
use dotcontrol::{Profile, Store};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// Scratch machine with a home directory and a dot store.
pub(crate) struct MachineFixture {
    root: TempDir,
    home: PathBuf,
}

impl MachineFixture {
    pub(crate) fn new() -> Result<Self> {
        let root = tempfile::tempdir()?;

        // INVARIANT: Home must be canonical so tests can compare paths.
        let home = fs::canonicalize(root.path())?.join("home");
        fs::create_dir_all(&home)?;

        Ok(Self { root, home })
    }

    pub(crate) fn home(&self) -> &Path {
        &self.home
    }

    pub(crate) fn store(&self) -> Result<Store> {
        Ok(Store::open(self.root.path().join("store"))?)
    }

    pub(crate) fn profile(&self, name: &str) -> Result<Profile> {
        Ok(self.store()?.profile(name, &self.home)?)
    }

    pub(crate) fn write(
        &self,
        relative: impl AsRef<Path>,
        contents: impl AsRef<str>,
    ) -> Result<PathBuf> {
        let path = self.home.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents.as_ref())?;

        Ok(path)
    }

    /// Wipe the home directory, as if moving onto a fresh machine.
    pub(crate) fn wipe_home(&self) -> Result<()> {
        fs::remove_dir_all(&self.home)?;
        fs::create_dir_all(&self.home)?;

        Ok(())
    }
}

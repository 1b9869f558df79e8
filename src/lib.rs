// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Track dotfiles by hard linking them into a managed store.
//!
//! Each tracked file or directory is called a __dot__. Dots belong to a
//! __profile__, which mirrors them under its own directory in the __store__,
//! and records a content hash for each one of them to detect drift between
//! the live file and its stored copy.

pub mod config;
pub mod dot;
pub mod fs;
pub mod path;
pub mod profile;
pub mod store;

pub use config::{Checksum, DotKind, DotRecord, ProfileConfig, ProfileSettings, RecordField};
pub use dot::{Dot, DotError, DotStatus};
pub use profile::{DotRegistry, Profile, ProfileError};
pub use store::Store;

// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! tracked, and figure out where their store-side copies live.
//!
//! # Normalized Paths
//!
//! Every dot is keyed by its __normalized path__. Files under the user's home
//! directory are keyed as `~/relative/path`, so a profile can be carried over
//! to another machine whose home directory lives somewhere else. Anything
//! outside of the home directory is keyed by its absolute posix path.
//!
//! The store mirrors that structure. Home-relative dots are placed under the
//! profile's home-mirror root, and all other dots are placed under the
//! root-mirror using their absolute path stripped of its root component.

use std::{
    env::VarError,
    fs,
    path::{Component, Path, PathBuf},
};

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`PathError::NoWayHome`] if home directory path cannot be
///   determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(PathError::NoWayHome)
}

/// Determine default absolute path to the dot store directory.
///
/// Uses XDG Base Directory path `$XDG_DATA_HOME/dotcontrol-store` as the
/// default absolute path for the store. Does not check if the path returned
/// actually exists.
///
/// # Errors
///
/// - Return [`PathError::NoWayHome`] if home directory path cannot be
///   determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_store_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|path| path.join("dotcontrol-store"))
        .ok_or(PathError::NoWayHome)
}

/// Fully resolved location of a dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Path exactly as the caller supplied it.
    pub origin_path: String,

    /// Expanded and resolved absolute origin path.
    pub absolute_origin_path: PathBuf,

    /// Key of the dot in its profile's mapping.
    pub normalized_origin_path: String,

    /// Location of the store-side copy.
    pub dot_path: PathBuf,
}

/// Resolve raw path into a [`ResolvedPath`].
///
/// Performs `~` and environment variable expansion, makes the result
/// absolute, and resolves symbolic links for every part of the path that
/// exists. The origin itself does not need to exist.
///
/// # Errors
///
/// - Return [`PathError::ShellExpansion`] if an environment variable is
///   undefined.
/// - Return [`PathError::CurrentDir`] if a relative path cannot be made
///   absolute.
/// - Return [`PathError::Canonicalize`] if an existing prefix cannot be
///   resolved.
pub fn resolve(
    raw: impl AsRef<str>,
    user_home: &Path,
    dot_home_path: &Path,
    dot_root_path: &Path,
) -> Result<ResolvedPath> {
    let origin_path = raw.as_ref().to_string();
    let absolute_origin_path = absolutize(expand(&origin_path, user_home)?)?;

    let (normalized_origin_path, dot_path) = match absolute_origin_path.strip_prefix(user_home) {
        Ok(relative) if relative.as_os_str().is_empty() => {
            ("~".to_string(), dot_home_path.to_path_buf())
        }
        Ok(relative) => (
            format!("~/{}", to_posix(relative)),
            dot_home_path.join(relative),
        ),
        Err(_) => {
            let relative = absolute_origin_path
                .components()
                .filter(|component| matches!(component, Component::Normal(_)))
                .collect::<PathBuf>();
            (
                format!("/{}", to_posix(&relative)),
                dot_root_path.join(relative),
            )
        }
    };

    Ok(ResolvedPath {
        origin_path,
        absolute_origin_path,
        normalized_origin_path,
        dot_path,
    })
}

/// Expand `~` and environment variables in raw path.
///
/// The tilde is expanded against `user_home` rather than the process's home
/// directory, so a profile can pin its own home.
///
/// # Errors
///
/// - Return [`PathError::ShellExpansion`] if an environment variable is
///   undefined.
pub fn expand(raw: impl AsRef<str>, user_home: &Path) -> Result<PathBuf> {
    let expanded = shellexpand::full_with_context(
        raw.as_ref(),
        || user_home.to_str(),
        |var| std::env::var(var).map(Some),
    )?;

    Ok(PathBuf::from(expanded.into_owned()))
}

/// Make path absolute, resolving symbolic links along its existing prefix.
///
/// Works like `realpath -m`: "." components are dropped, ".." pops the last
/// resolved component, and once a component does not exist, the remainder
/// is appended lexically.
///
/// # Errors
///
/// - Return [`PathError::CurrentDir`] if current working directory cannot be
///   determined for a relative path.
/// - Return [`PathError::Canonicalize`] if an existing prefix cannot be
///   resolved.
pub fn absolutize(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(PathError::CurrentDir)?
            .join(path)
    };

    let mut resolved = PathBuf::new();
    let mut exists = true;
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component),
            Component::CurDir => continue,
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => {
                resolved.push(name);

                // INVARIANT: Only canonicalize while every prefix so far exists.
                if exists {
                    match fs::symlink_metadata(&resolved) {
                        Ok(_) => {
                            resolved = fs::canonicalize(&resolved).map_err(|err| {
                                PathError::Canonicalize {
                                    source: err,
                                    path: resolved.clone(),
                                }
                            })?;
                        }
                        Err(_) => exists = false,
                    }
                }
            }
        }
    }

    Ok(resolved)
}

/// Render path with "/" separators regardless of platform.
pub fn to_posix(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// All possible error types for path resolution.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// No way to determine user's home directory.
    ///
    /// # See Also
    ///
    /// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
    #[error("cannot determine absolute path to user's home directory")]
    NoWayHome,

    /// Shell expansion of raw path failed.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<VarError>),

    /// Current working directory is unavailable.
    #[error("cannot determine current working directory")]
    CurrentDir(#[source] std::io::Error),

    /// Existing path could not be canonicalized.
    #[error("cannot resolve {:?}", .path.display())]
    Canonicalize {
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = PathError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    fn layout(home: &Path) -> (PathBuf, PathBuf) {
        (home.join(".store/home"), home.join(".store/root"))
    }

    #[test]
    fn resolve_under_home_uses_tilde_key() -> anyhow::Result<()> {
        let home = tempfile::tempdir()?;
        let home = fs::canonicalize(home.path())?;
        let (dot_home, dot_root) = layout(&home);
        let resolved = resolve("~/.config/nvim/init.lua", &home, &dot_home, &dot_root)?;

        assert_eq!(resolved.normalized_origin_path, "~/.config/nvim/init.lua");
        assert_eq!(
            resolved.absolute_origin_path,
            home.join(".config/nvim/init.lua")
        );
        assert_eq!(resolved.dot_path, dot_home.join(".config/nvim/init.lua"));

        // INVARIANT: Key round-trips back to the absolute origin path.
        let relative = resolved.normalized_origin_path.strip_prefix("~/").unwrap();
        assert_eq!(home.join(relative), resolved.absolute_origin_path);

        Ok(())
    }

    #[test]
    fn resolve_outside_home_uses_absolute_key() -> anyhow::Result<()> {
        let home = tempfile::tempdir()?;
        let home = fs::canonicalize(home.path())?;
        let (dot_home, dot_root) = layout(&home);
        let resolved = resolve("/nonexistent/etc/hosts", &home, &dot_home, &dot_root)?;

        assert_eq!(resolved.normalized_origin_path, "/nonexistent/etc/hosts");
        assert_eq!(resolved.dot_path, dot_root.join("nonexistent/etc/hosts"));

        Ok(())
    }

    #[test]
    fn resolve_home_itself() -> anyhow::Result<()> {
        let home = tempfile::tempdir()?;
        let home = fs::canonicalize(home.path())?;
        let (dot_home, dot_root) = layout(&home);
        let resolved = resolve("~", &home, &dot_home, &dot_root)?;

        assert_eq!(resolved.normalized_origin_path, "~");
        assert_eq!(resolved.dot_path, dot_home);

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn absolutize_follows_symlinks_and_parent_dirs() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let root = fs::canonicalize(root.path())?;
        fs::create_dir_all(root.join("real/sub"))?;
        std::os::unix::fs::symlink(root.join("real"), root.join("link"))?;

        assert_eq!(
            absolutize(root.join("link/sub/../missing/./file"))?,
            root.join("real/missing/file")
        );

        Ok(())
    }

    #[sealed_test(env = [("DOTCONTROL_TEST_DIR", "/opt/blah")])]
    fn expand_env_and_tilde() -> anyhow::Result<()> {
        let home = Path::new("/home/blah");
        assert_eq!(
            expand("$DOTCONTROL_TEST_DIR/file", home)?,
            PathBuf::from("/opt/blah/file")
        );
        assert_eq!(expand("~/.bashrc", home)?, PathBuf::from("/home/blah/.bashrc"));

        Ok(())
    }

    #[test]
    fn expand_undefined_variable_fails() {
        let result = expand("$DOTCONTROL_SURELY_UNDEFINED/file", Path::new("/home/blah"));
        assert!(matches!(result, Err(PathError::ShellExpansion(_))));
    }

    #[sealed_test]
    fn absolutize_relative_path_against_cwd() -> anyhow::Result<()> {
        let cwd = fs::canonicalize(std::env::current_dir()?)?;
        fs::write("present.txt", "blah")?;

        assert_eq!(absolutize("present.txt")?, cwd.join("present.txt"));
        assert_eq!(absolutize("./a/../b")?, cwd.join("b"));

        Ok(())
    }

    #[test]
    fn posix_rendering() {
        assert_eq!(to_posix(Path::new("a/b/c.txt")), "a/b/c.txt");
        assert_eq!(to_posix(Path::new("/etc/hosts")), "etc/hosts");
    }
}

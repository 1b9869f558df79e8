// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use dotcontrol::{
    path::{default_store_dir, home_dir},
    Dot, DotRegistry, Profile, Store,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::{path::PathBuf, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "dotcontrol [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to store directory.
    #[arg(short, long, global = true, value_name = "path")]
    pub store: Option<PathBuf>,

    /// Name of profile to use.
    #[arg(short, long, global = true, value_name = "name", default_value = "default")]
    pub profile: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let store = match self.store {
            Some(path) => Store::open(path)?,
            None => Store::open(default_store_dir()?)?,
        };
        let mut profile = store.profile(&self.profile, home_dir()?)?;

        match self.command {
            Command::Track(opts) => run_track(&mut profile, opts),
            Command::Untrack(opts) => run_untrack(&mut profile, opts),
            Command::Relink(opts) => run_relink(&mut profile, opts),
            Command::Restore(opts) => run_restore(&mut profile, opts),
            Command::Status => run_status(&mut profile),
            Command::List => run_list(&profile),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Start tracking files or directories, and link them into the store.
    #[command(override_usage = "dotcontrol track [options] <path>...")]
    Track(PathOptions),

    /// Stop tracking dots, and remove their copies from the store.
    #[command(override_usage = "dotcontrol untrack [options] <path>...")]
    Untrack(PathOptions),

    /// Link current state of tracked dots into the store again.
    #[command(override_usage = "dotcontrol relink [options] <path>...")]
    Relink(PathOptions),

    /// Link tracked dots from the store back to their origins.
    #[command(override_usage = "dotcontrol restore [options] [<path>]...")]
    Restore(RestoreOptions),

    /// Show state of every tracked dot.
    Status,

    /// List every tracked dot.
    List,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct PathOptions {
    /// Paths of dots to act on.
    #[arg(required = true, value_name = "path")]
    pub paths: Vec<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct RestoreOptions {
    /// Paths of dots to restore, every tracked dot if none are given.
    #[arg(value_name = "path")]
    pub paths: Vec<String>,

    /// Replace whatever currently exists at the origin.
    #[arg(short, long)]
    pub overwrite: bool,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn run_track(profile: &mut Profile, opts: PathOptions) -> Result<()> {
    for path in opts.paths {
        let mut dot = Dot::track(profile, &path)?;
        dot.link_dot()?;
    }

    Ok(())
}

fn run_untrack(profile: &mut Profile, opts: PathOptions) -> Result<()> {
    for path in opts.paths {
        let mut dot = Dot::open(profile, &path)?;
        if !dot.is_bound() {
            warn!("{:?} is not tracked", dot.normalized_origin_path());
            continue;
        }
        dot.delete()?;
    }

    Ok(())
}

fn run_relink(profile: &mut Profile, opts: PathOptions) -> Result<()> {
    for path in opts.paths {
        Dot::open(profile, &path)?.link_dot()?;
    }

    Ok(())
}

fn run_restore(profile: &mut Profile, opts: RestoreOptions) -> Result<()> {
    let paths = if opts.paths.is_empty() {
        profile.dots().keys().cloned().collect()
    } else {
        opts.paths
    };

    for path in paths {
        Dot::open(profile, &path)?.link_back(opts.overwrite)?;
    }

    Ok(())
}

fn run_status(profile: &mut Profile) -> Result<()> {
    let keys = profile.dots().keys().cloned().collect::<Vec<_>>();
    if keys.is_empty() {
        info!("profile {:?} tracks nothing", profile.name());
        return Ok(());
    }

    for key in keys {
        let dot = Dot::open(profile, &key)?;
        println!("{:<16} {key}", dot.status()?);
    }

    Ok(())
}

fn run_list(profile: &Profile) -> Result<()> {
    for (key, record) in profile.dots() {
        println!("{:<4} {key}", record.kind);
    }

    Ok(())
}

// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::MachineFixture;

use anyhow::Result;
use dotcontrol::{Checksum, Dot, DotError, DotKind, DotRegistry, DotStatus, Profile};
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::fs;

#[test]
fn tracked_dots_survive_reopening_profile() -> Result<()> {
    let machine = MachineFixture::new()?;
    machine.write(".bashrc", "export BLAH=1\n")?;
    machine.write(".config/nvim/init.lua", "vim.o.number = true\n")?;

    let mut profile = machine.profile("work")?;
    for raw in ["~/.bashrc", "~/.config/nvim"] {
        Dot::track(&mut profile, raw)?.link_dot()?;
    }

    let mut reopened = machine.profile("work")?;
    assert_eq!(
        reopened.dots().keys().collect::<Vec<_>>(),
        vec!["~/.bashrc", "~/.config/nvim"]
    );

    let dot = Dot::open(&mut reopened, "~/.config/nvim")?;
    assert_eq!(dot.kind()?, DotKind::Dir);
    assert!(matches!(dot.sha1()?, Checksum::Dir(files) if files.contains_key("init.lua")));
    assert_eq!(dot.status()?, DotStatus::Clean);

    Ok(())
}

#[test]
fn relative_and_absolute_spellings_share_one_key() -> Result<()> {
    let machine = MachineFixture::new()?;
    let bashrc = machine.write(".bashrc", "blah")?;

    let mut profile = machine.profile("work")?;
    Dot::track(&mut profile, "~/.bashrc")?;
    let dot = Dot::open(&mut profile, bashrc.display().to_string())?;

    assert!(dot.is_bound());
    assert_eq!(dot.normalized_origin_path(), "~/.bashrc");

    Ok(())
}

#[test]
fn restore_profile_onto_fresh_home() -> Result<()> {
    let machine = MachineFixture::new()?;
    machine.write(".bashrc", "export BLAH=1\n")?;
    machine.write(".config/git/config", "[user]\n")?;

    let mut profile = machine.profile("work")?;
    for raw in ["~/.bashrc", "~/.config/git"] {
        Dot::track(&mut profile, raw)?.link_dot()?;
    }
    machine.wipe_home()?;

    let mut profile = machine.profile("work")?;
    let keys = profile.dots().keys().cloned().collect::<Vec<_>>();
    for key in keys {
        Dot::open(&mut profile, &key)?.link_back(false)?;
    }

    assert_eq!(fs::read_to_string(machine.home().join(".bashrc"))?, "export BLAH=1\n");
    assert_eq!(
        fs::read_to_string(machine.home().join(".config/git/config"))?,
        "[user]\n"
    );

    Ok(())
}

#[test]
fn restore_refuses_to_clobber_origin() -> Result<()> {
    let machine = MachineFixture::new()?;
    let bashrc = machine.write(".bashrc", "tracked")?;

    let mut profile = machine.profile("work")?;
    Dot::track(&mut profile, "~/.bashrc")?.link_dot()?;
    fs::remove_file(&bashrc)?;
    fs::write(&bashrc, "local")?;

    let mut dot = Dot::open(&mut profile, "~/.bashrc")?;
    assert!(matches!(dot.link_back(false), Err(DotError::AlreadyExists(_))));
    assert_eq!(fs::read_to_string(&bashrc)?, "local");

    dot.link_back(true)?;
    assert_eq!(fs::read_to_string(&bashrc)?, "tracked");

    Ok(())
}

#[test]
fn untracking_persists_immediately() -> Result<()> {
    let machine = MachineFixture::new()?;
    machine.write(".bashrc", "blah")?;

    let mut profile = machine.profile("work")?;
    let mut dot = Dot::track(&mut profile, "~/.bashrc")?;
    dot.link_dot()?;
    let dot_path = dot.dot_path().to_path_buf();
    dot.delete()?;

    let mut reopened = machine.profile("work")?;
    assert!(reopened.dots().is_empty());
    assert!(!dot_path.exists());
    assert!(!Dot::new(&mut reopened, "~/.bashrc", false)?.is_bound());

    Ok(())
}

#[test]
fn hand_written_profile_file_is_honored() -> Result<()> {
    let machine = MachineFixture::new()?;
    machine.write(".bashrc", "blah")?;
    let path = machine.store()?.path().join("handmade");
    fs::create_dir_all(&path)?;
    fs::write(
        path.join(Profile::FILE_NAME),
        indoc! {r#"
            [settings]
            chunk_size = 2

            [dots."~/.bashrc"]
            sha1 = "0000000000000000000000000000000000000000"
            last_sha1_check = 0
            type = "file"
        "#},
    )?;

    let mut profile = machine.profile("handmade")?;
    assert_eq!(profile.chunk_size(), 2);

    let mut dot = Dot::open(&mut profile, "~/.bashrc")?;
    assert!(dot.changed()?);
    assert_eq!(dot.status()?, DotStatus::MissingDot);

    dot.link_dot()?;
    assert!(!dot.changed()?);
    assert!(dot.last_sha1_check()? > 0);

    Ok(())
}

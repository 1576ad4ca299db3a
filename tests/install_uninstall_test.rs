#![cfg(unix)]

mod common;

use anyhow::Result;
use common::{TestEnv, is_real_dir, is_symlink, symlinks_under};
use dotx::commands::{install, uninstall};
use dotx::ledger::{InstallationDb, LinkType};
use std::fs;
use std::path::{Path, PathBuf};

fn read_link(path: &Path) -> PathBuf {
    fs::read_link(path).unwrap()
}

#[test]
fn test_install_then_uninstall_round_trip() -> Result<()> {
    let env = TestEnv::new()?;
    env.touch("bash/dot-bashrc")?;
    env.touch("bash/dot-config/app/config.toml")?;
    let ctx = env.context()?;

    install::execute(&ctx, &[env.package("bash")])?;

    let bashrc = env.home.join(".bashrc");
    assert!(is_symlink(&bashrc));
    assert_eq!(read_link(&bashrc), PathBuf::from("../dotfiles/bash/dot-bashrc"));
    assert!(fs::read_to_string(&bashrc)?.contains("dot-bashrc"));

    // .config is always created for real; app inside it is linked whole
    assert!(is_real_dir(&env.home.join(".config")));
    let app = env.home.join(".config/app");
    assert!(is_symlink(&app));
    assert_eq!(
        read_link(&app),
        PathBuf::from("../../dotfiles/bash/dot-config/app")
    );

    {
        let ledger = InstallationDb::open(&env.ledger_path)?;
        let records = ledger.installations(&env.dotfiles, "bash");
        let kinds: Vec<_> = records
            .iter()
            .map(|r| (r.target_path.clone(), r.link_type))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (bashrc.clone(), LinkType::File),
                (env.home.join(".config"), LinkType::CreatedDir),
                (app.clone(), LinkType::Directory),
            ]
        );
    }

    uninstall::execute(&ctx, &[env.package("bash")])?;

    assert!(!bashrc.exists() && !is_symlink(&bashrc));
    assert!(!is_symlink(&app));
    // Created directories stay behind; they may be shared
    assert!(is_real_dir(&env.home.join(".config")));
    assert!(symlinks_under(&env.home).is_empty());

    let ledger = InstallationDb::open(&env.ledger_path)?;
    let remaining: Vec<_> = ledger
        .installations(&env.dotfiles, "bash")
        .into_iter()
        .map(|r| r.link_type)
        .collect();
    assert_eq!(remaining, vec![LinkType::CreatedDir]);
    Ok(())
}

#[test]
fn test_uninstall_removes_whole_directory_link() -> Result<()> {
    let env = TestEnv::new()?;
    env.touch("pkg/dir1/dir2/file.txt")?;
    let ctx = env.context()?;

    install::execute(&ctx, &[env.package("pkg")])?;
    let dir1 = env.home.join("dir1");
    assert!(is_symlink(&dir1));
    assert!(env.home.join("dir1/dir2/file.txt").exists());

    uninstall::execute(&ctx, &[env.package("pkg")])?;
    assert!(!dir1.exists() && !is_symlink(&dir1));
    assert!(!env.home.join("dir1/dir2").exists());
    assert!(!env.home.join("dir1/dir2/file.txt").exists());
    Ok(())
}

#[test]
fn test_conflict_refuses_every_package() -> Result<()> {
    let env = TestEnv::new()?;
    env.touch("aaa/dot-aaarc")?;
    env.touch("bbb/dot-profile")?;
    env.touch_home(".profile")?;
    let ctx = env.context()?;

    let err = install::execute(&ctx, &[env.package("aaa"), env.package("bbb")]).unwrap_err();
    assert!(err.to_string().contains("Refusing to install"));

    // Nothing from the clean package was installed either
    assert!(!is_symlink(&env.home.join(".aaarc")));
    assert!(!env.ledger_path.exists());
    assert_eq!(
        fs::read_to_string(env.home.join(".profile"))?,
        "contents of .profile\n"
    );
    Ok(())
}

#[test]
fn test_multiple_packages_share_created_directory() -> Result<()> {
    let env = TestEnv::new()?;
    env.touch("git/dot-config/git/config")?;
    env.touch("nvim/dot-config/nvim/init.lua")?;
    let ctx = env.context()?;

    install::execute(&ctx, &[env.package("git"), env.package("nvim")])?;
    assert!(is_real_dir(&env.home.join(".config")));
    assert!(is_symlink(&env.home.join(".config/git")));
    assert!(is_symlink(&env.home.join(".config/nvim")));
    {
        let ledger = InstallationDb::open(&env.ledger_path)?;
        let owner = ledger.find_by_target(&env.home.join(".config")).unwrap();
        assert_eq!(owner.package_name, "git");
    }

    uninstall::execute(&ctx, &[env.package("git")])?;
    assert!(!is_symlink(&env.home.join(".config/git")));
    assert!(is_symlink(&env.home.join(".config/nvim")));
    Ok(())
}

#[test]
fn test_second_install_links_into_existing_directory() -> Result<()> {
    let env = TestEnv::new()?;
    env.touch("one/tools/a")?;
    env.touch("two/tools/b")?;
    fs::create_dir_all(env.home.join("tools"))?;
    let ctx = env.context()?;

    install::execute(&ctx, &[env.package("one"), env.package("two")])?;
    assert!(is_real_dir(&env.home.join("tools")));
    assert!(is_symlink(&env.home.join("tools/a")));
    assert!(is_symlink(&env.home.join("tools/b")));
    Ok(())
}

#[test]
fn test_dry_run_changes_nothing() -> Result<()> {
    let env = TestEnv::new()?;
    env.touch("bash/dot-bashrc")?;
    let mut ctx = env.context()?;
    ctx.dry_run = true;

    install::execute(&ctx, &[env.package("bash")])?;
    assert!(!is_symlink(&env.home.join(".bashrc")));
    assert!(!env.ledger_path.exists());
    Ok(())
}

#[test]
fn test_ignore_rules_apply_to_install() -> Result<()> {
    let env = TestEnv::new()?;
    env.touch("bash/dot-bashrc")?;
    env.touch("bash/README.md")?;
    env.touch("bash/notes.bak")?;
    fs::write(env.package("bash").join(".dotxignore"), "README.md\n")?;
    env.write_config("[ignore]\npatterns = [\"*.bak\"]\n")?;
    let ctx = env.context()?;

    install::execute(&ctx, &[env.package("bash")])?;
    assert!(is_symlink(&env.home.join(".bashrc")));
    assert!(!is_symlink(&env.home.join("README.md")));
    assert!(!is_symlink(&env.home.join("notes.bak")));
    assert!(!is_symlink(&env.home.join(".dotxignore")));
    Ok(())
}

#[test]
fn test_package_always_create_file() -> Result<()> {
    let env = TestEnv::new()?;
    env.touch("vim/dot-vim/vimrc")?;
    fs::write(env.package("vim").join(".always-create"), "/.vim\n")?;
    let ctx = env.context()?;

    install::execute(&ctx, &[env.package("vim")])?;
    assert!(is_real_dir(&env.home.join(".vim")));
    assert!(is_symlink(&env.home.join(".vim/vimrc")));
    assert!(!env.home.join(".always-create").exists());
    Ok(())
}

#[test]
fn test_disabled_ledger_records_nothing() -> Result<()> {
    let env = TestEnv::new()?;
    env.touch("bash/dot-bashrc")?;
    env.write_config("[ledger]\nenabled = false\n")?;
    let ctx = env.context()?;

    install::execute(&ctx, &[env.package("bash")])?;
    assert!(is_symlink(&env.home.join(".bashrc")));
    assert!(!env.ledger_path.exists());
    Ok(())
}

#[test]
fn test_custom_rename_prefix() -> Result<()> {
    let env = TestEnv::new()?;
    env.touch("bash/_bashrc")?;
    env.touch("bash/dot-kept")?;
    env.write_config("[core]\nrename_prefix = \"_\"\n")?;
    let ctx = env.context()?;

    install::execute(&ctx, &[env.package("bash")])?;
    assert!(is_symlink(&env.home.join(".bashrc")));
    assert!(is_symlink(&env.home.join("dot-kept")));
    Ok(())
}

#[test]
fn test_reinstall_is_refused_until_uninstalled() -> Result<()> {
    let env = TestEnv::new()?;
    env.touch("bash/dot-bashrc")?;
    env.touch("bash/dot-config/app/config.toml")?;
    let ctx = env.context()?;

    install::execute(&ctx, &[env.package("bash")])?;
    let before = symlinks_under(&env.home);

    // Existing links count as occupied destinations, even our own
    let err = install::execute(&ctx, &[env.package("bash")]).unwrap_err();
    assert!(err.to_string().contains("Refusing to install"));
    assert_eq!(symlinks_under(&env.home), before);

    uninstall::execute(&ctx, &[env.package("bash")])?;
    install::execute(&ctx, &[env.package("bash")])?;
    assert_eq!(symlinks_under(&env.home), before);
    Ok(())
}

#[test]
fn test_conflict_with_directory_and_dangling_link() -> Result<()> {
    let env = TestEnv::new()?;
    env.touch("aaa/dot-aaarc")?;
    env.touch("bbb/foo")?;
    env.touch("bbb/dot-dangling")?;
    fs::create_dir_all(env.home.join("foo"))?;
    std::os::unix::fs::symlink("/nonexistent/target", env.home.join(".dangling"))?;
    let ctx = env.context()?;

    let err = install::execute(&ctx, &[env.package("aaa"), env.package("bbb")]).unwrap_err();
    assert!(err.to_string().contains("Refusing to install"));
    assert!(!is_symlink(&env.home.join(".aaarc")));
    assert!(is_real_dir(&env.home.join("foo")));
    Ok(())
}

#[test]
fn test_missing_target_is_an_error() -> Result<()> {
    let env = TestEnv::new()?;
    env.touch("bash/dot-bashrc")?;
    let mut ctx = env.context()?;
    ctx.target = env.root.join("nowhere");

    let err = install::execute(&ctx, &[env.package("bash")]).unwrap_err();
    assert!(err.to_string().contains("Target directory does not exist"));
    Ok(())
}

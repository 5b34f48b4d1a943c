use archive_rename::config::{CONFIG_ENV, ConfigSource, resolve_config_path};
use assert_fs::TempDir;
use assert_fs::prelude::*;
use serial_test::serial;
use std::process::Command;

fn bin() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("archive_rename"))
}

#[test]
#[serial]
fn env_config_is_used_and_flag_beats_it() {
    let td = TempDir::new().unwrap();
    let env_cfg = td.child("from_env.xml");
    env_cfg.write_str("<config/>").unwrap();
    let flag_cfg = td.child("from_flag.xml");
    flag_cfg.write_str("<config/>").unwrap();

    // Set env for this process; serialize to avoid cross-test interference
    unsafe {
        std::env::set_var(CONFIG_ENV, env_cfg.path());
    }
    let from_env = resolve_config_path(None).unwrap();
    let from_flag = resolve_config_path(Some(flag_cfg.path())).unwrap();
    // Cleanup env
    unsafe {
        std::env::remove_var(CONFIG_ENV);
    }

    assert_eq!(from_env, ConfigSource::Env(env_cfg.path().to_path_buf()));
    assert_eq!(from_flag, ConfigSource::Flag(flag_cfg.path().to_path_buf()));
}

#[test]
#[serial]
fn env_directory_means_config_xml_inside_it() {
    let td = TempDir::new().unwrap();
    unsafe {
        std::env::set_var(CONFIG_ENV, td.path());
    }
    let src = resolve_config_path(None).unwrap();
    unsafe {
        std::env::remove_var(CONFIG_ENV);
    }
    assert_eq!(src.path(), td.path().join("config.xml"));
    assert!(src.is_explicit());
}

#[test]
fn relative_env_path_resolves_against_current_dir() {
    let td = TempDir::new().unwrap();
    td.child("conf/config.xml").write_str("<config/>").unwrap();

    let out = bin()
        .current_dir(td.path())
        .env(CONFIG_ENV, "conf")
        .arg("print-config")
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    let expected = td.path().join("conf").join("config.xml");
    assert!(stdout.contains(&*expected.to_string_lossy()), "{stdout}");
    assert!(stdout.contains("A config file exists"), "{stdout}");
}

#[test]
fn missing_explicit_config_fails_the_run() {
    let td = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let out = bin()
        .env(CONFIG_ENV, td.path().join("nope.xml"))
        .args(["run", "--dry-run"])
        .arg(root.path())
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("config file not found"));
}

#[test]
fn cli_flag_overrides_xml_depth() {
    let td = TempDir::new().unwrap();
    let cfg = td.child("config.xml");
    cfg.write_str("<config><max_depth>1</max_depth></config>").unwrap();
    let root = TempDir::new().unwrap();
    root.child("a/b/f.jpg").write_str("x").unwrap();

    let refused = bin()
        .env(CONFIG_ENV, cfg.path())
        .args(["run", "--dry-run"])
        .arg(root.path())
        .output()
        .unwrap();
    assert!(!refused.status.success(), "xml limit of 1 rejects depth 2");

    let allowed = bin()
        .env(CONFIG_ENV, cfg.path())
        .args(["run", "--dry-run", "--max-depth", "2"])
        .arg(root.path())
        .output()
        .unwrap();
    assert!(allowed.status.success(), "{}", String::from_utf8_lossy(&allowed.stderr));
}

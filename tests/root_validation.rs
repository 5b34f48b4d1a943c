use archive_rename::config::validate_log_dir;
use archive_rename::validate_root;
use std::fs;
use tempfile::tempdir;

#[test]
fn root_is_canonicalized() {
    let td = tempdir().unwrap();
    fs::create_dir(td.path().join("archive")).unwrap();
    let dotted = td.path().join("archive").join(".");
    let got = validate_root(&dotted, false).unwrap();
    assert_eq!(got, dunce::canonicalize(td.path().join("archive")).unwrap());
}

#[test]
fn missing_root_is_invalid() {
    let td = tempdir().unwrap();
    let err = validate_root(&td.path().join("gone"), true).unwrap_err();
    assert_eq!(err.kind(), "invalid_root");
}

#[cfg(unix)]
#[test]
fn symlinked_root_is_refused() {
    let td = tempdir().unwrap();
    let real = td.path().join("real");
    fs::create_dir(&real).unwrap();
    let link = td.path().join("link");
    std::os::unix::fs::symlink(&real, &link).unwrap();
    let err = validate_root(&link, true).unwrap_err();
    assert!(err.to_string().contains("symlink"), "{err}");
}

#[cfg(target_os = "linux")]
#[test]
fn read_only_root_is_refused_unless_dry_run() {
    use std::os::unix::fs::PermissionsExt;
    // root bypasses permission bits
    if unsafe { libc::geteuid() } == 0 {
        eprintln!("Skipping: running as root");
        return;
    }
    let td = tempdir().unwrap();
    let ro = td.path().join("ro");
    fs::create_dir(&ro).unwrap();
    fs::set_permissions(&ro, fs::Permissions::from_mode(0o555)).unwrap();

    let err = validate_root(&ro, false).unwrap_err();
    assert_eq!(err.kind(), "permission_denied");
    assert!(validate_root(&ro, true).is_ok());

    fs::set_permissions(&ro, fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn log_dir_is_created_outside_the_root() {
    let root = tempdir().unwrap();
    let root = dunce::canonicalize(root.path()).unwrap();
    let logs = tempdir().unwrap();
    let wanted = logs.path().join("nested").join("logs");
    let got = validate_log_dir(&wanted, &root).unwrap();
    assert!(got.is_dir());
    assert!(validate_log_dir(&root.join("inside"), &root).is_err());
    assert!(!root.join("inside").exists(), "refused before anything is created");
}

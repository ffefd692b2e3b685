//! Custom-flavor separators, the default directory, and registry lifecycle.

use memfs::{registry, FsErrorKind, MemFs, MemFsConfig, OpenFlags};

#[test]
fn backslash_separator_is_accepted() {
    let fs = MemFs::new("memory:custom-backslash", &MemFsConfig::custom('\\'))
        .expect("filesystem");
    assert_eq!(fs.separator(), '\\');

    let dir = fs.path("\\top", &[]).expect("path");
    fs.create_directory(&dir).expect("mkdir");
    let file = fs.path("\\top\\nested", &[]).expect("path");
    fs.create_file(&file).expect("create");
    assert!(fs.exists(&file));
    assert_eq!(file.to_string(), "\\top\\nested");
}

#[test]
fn snowman_separator_is_rejected() {
    let err = MemFs::new("memory:custom-snowman", &MemFsConfig::custom('\u{2603}'))
        .expect_err("snowman");
    assert_eq!(err.kind(), FsErrorKind::InvalidConfig);

    let err = MemFs::new("memory:custom-space", &MemFsConfig::custom(' '))
        .expect_err("space");
    assert_eq!(err.kind(), FsErrorKind::InvalidConfig);

    let err = MemFs::new("memory:custom-combining", &MemFsConfig::custom('\u{0301}'))
        .expect_err("combining mark");
    assert_eq!(err.kind(), FsErrorKind::InvalidConfig);
}

#[test]
fn relative_paths_resolve_against_default_directory() {
    let config = MemFsConfig::posix().with_default_directory("/work");
    let fs = MemFs::new("memory:custom-cwd", &config).expect("filesystem");
    fs.create_directory(&fs.path("/work", &[]).expect("path"))
        .expect("mkdir");

    let relative = fs.path("notes.txt", &[]).expect("path");
    assert!(!relative.is_absolute());
    fs.create_file(&relative).expect("create");
    assert!(fs.exists(&fs.path("/work/notes.txt", &[]).expect("path")));
    assert_eq!(
        fs.to_real_path(&relative).expect("realpath").to_string(),
        "/work/notes.txt"
    );
}

#[test]
fn non_absolute_default_directory_is_rejected() {
    let config = MemFsConfig::posix().with_default_directory("relative/dir");
    let err = MemFs::new("memory:custom-bad-cwd", &config).expect_err("config");
    assert_eq!(err.kind(), FsErrorKind::InvalidConfig);
}

#[test]
fn registry_interns_and_close_unregisters() {
    let identifier = "memory:lifecycle";
    let fs = registry()
        .create(identifier, &MemFsConfig::posix())
        .expect("create");

    let again = registry().get(identifier).expect("get");
    assert_eq!(again.identifier(), identifier);

    let err = registry()
        .create(identifier, &MemFsConfig::posix())
        .expect_err("duplicate");
    assert_eq!(err.kind(), FsErrorKind::AlreadyExists);

    fs.close();
    let err = registry().get(identifier).expect_err("unregistered");
    assert_eq!(err.kind(), FsErrorKind::Unregistered);

    // The identifier is free again after close.
    let replacement = registry()
        .create(identifier, &MemFsConfig::posix())
        .expect("recreate");
    replacement.close();
}

#[test]
fn principal_lookup_dies_with_the_filesystem() {
    let config = MemFsConfig::posix().with_users(["someone"]);
    let fs = registry()
        .create("memory:lifecycle-principals", &config)
        .expect("create");

    let user = fs.principals().lookup_user("someone").expect("lookup");
    assert_eq!(user.name(), "someone");
    assert_eq!(
        fs.principals().lookup_user("nobody").expect_err("unknown").kind(),
        FsErrorKind::Unregistered
    );

    fs.close();
    assert_eq!(
        fs.principals().lookup_user("someone").expect_err("closed").kind(),
        FsErrorKind::Closed
    );
}

#[test]
fn custom_flavor_has_no_optional_views() {
    let fs = MemFs::new("memory:custom-basic-only", &MemFsConfig::custom('|'))
        .expect("filesystem");
    let file = fs.path("|data", &[]).expect("path");
    fs.create_file(&file).expect("create");

    // Only the basic view exists; everything else is unsupported.
    let err = fs
        .read_attributes(&file, "posix:permissions")
        .expect_err("posix");
    assert_eq!(err.kind(), FsErrorKind::NotSupported);
    let err = fs.owner(&file).expect_err("owner");
    assert_eq!(err.kind(), FsErrorKind::NotSupported);

    // Basic attributes still work, as does content io.
    let attrs = fs.read_attributes(&file, "size").expect("basic");
    assert!(attrs.contains_key("size"));
    let handle = fs
        .open(&file, OpenFlags::WRITE | OpenFlags::READ)
        .expect("open");
    handle.write(b"ok").expect("write");
}

#[test]
fn paths_from_another_filesystem_are_rejected() {
    let a = MemFs::new("memory:cross-a", &MemFsConfig::posix()).expect("filesystem");
    let b = MemFs::new("memory:cross-b", &MemFsConfig::posix()).expect("filesystem");

    let foreign = b.path("/f", &[]).expect("path");
    let err = a.create_file(&foreign).expect_err("foreign path");
    assert_eq!(err.kind(), FsErrorKind::InvalidOperation);
    assert!(!a.exists(&foreign));
}

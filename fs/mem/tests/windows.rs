//! Windows-flavor behavior: drive roots, case folding, DOS attributes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use memfs::{
    AccessMode, AttrValue, FsErrorKind, FsPath, MemFs, MemFsConfig, MoveFlags, OpenFlags,
};

fn new_fs(authority: &str) -> Arc<MemFs> {
    MemFs::new(format!("memory:{authority}"), &MemFsConfig::windows()).expect("filesystem")
}

fn path(fs: &MemFs, s: &str) -> FsPath {
    fs.path(s, &[]).expect("path")
}

fn hash_of(path: &FsPath) -> u64 {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn drive_paths_fold_case_and_keep_display() {
    let fs = new_fs("win-paths");
    let upper = path(&fs, "C:\\TEMP");
    let lower = path(&fs, "c:\\temp");

    assert_eq!(upper, lower);
    assert_eq!(hash_of(&upper), hash_of(&lower));
    assert_eq!(upper.to_string(), "C:\\TEMP");
    assert_eq!(lower.to_string(), "c:\\temp");
    assert!(upper.starts_with(&path(&fs, "c:\\")));
}

#[test]
fn lookup_is_case_insensitive_and_case_preserving() {
    let fs = new_fs("win-lookup");
    fs.create_directory(&path(&fs, "C:\\Temp")).expect("mkdir");
    fs.create_file(&path(&fs, "c:\\temp\\Read Me.TXT"))
        .expect("create");

    assert!(fs.exists(&path(&fs, "C:\\TEMP\\read me.txt")));
    assert!(fs.is_regular_file(&path(&fs, "c:/temp/READ ME.txt")));

    // Listing returns the casing the entries were created with.
    let listed = fs.list_directory(&path(&fs, "C:\\TEMP")).expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].file_name(), Some("Read Me.TXT"));

    let real = fs
        .to_real_path(&path(&fs, "c:\\temp\\read me.txt"))
        .expect("realpath");
    assert_eq!(real.to_string(), "C:\\Temp\\Read Me.TXT");
}

#[test]
fn case_folded_duplicate_names_collide() {
    let fs = new_fs("win-collide");
    fs.create_file(&path(&fs, "C:\\File")).expect("create");
    let err = fs.create_file(&path(&fs, "C:\\FILE")).expect_err("collision");
    assert_eq!(err.kind(), FsErrorKind::AlreadyExists);
}

#[test]
fn multiple_drives_hold_separate_trees() {
    let config = MemFsConfig::windows().with_roots(["C:\\", "D:\\"]);
    let fs = MemFs::new("memory:win-drives", &config).expect("filesystem");

    fs.create_file(&fs.path("C:\\on-c", &[]).expect("path"))
        .expect("create");
    assert!(!fs.exists(&fs.path("D:\\on-c", &[]).expect("path")));

    // Same filesystem, so moving across drives is an ordinary move.
    fs.move_entry(
        &fs.path("C:\\on-c", &[]).expect("path"),
        &fs.path("D:\\moved", &[]).expect("path"),
        MoveFlags::empty(),
    )
    .expect("move across drives");
    assert!(fs.exists(&fs.path("d:\\MOVED", &[]).expect("path")));

    let err = fs.path("E:\\nowhere", &[]).expect_err("unknown drive");
    assert_eq!(err.kind(), FsErrorKind::InvalidPath);
}

#[test]
fn forbidden_characters_fail_parse() {
    let fs = new_fs("win-forbidden");
    for bad in ["C:\\a?b", "C:\\a\"b", "C:\\<a>", "C:\\a|b", "C:\\col:on"] {
        let err = fs.path(bad, &[]).expect_err("forbidden");
        assert_eq!(err.kind(), FsErrorKind::InvalidPath);
    }
}

#[test]
fn dos_read_only_blocks_writes_without_write_check_on_set() {
    let fs = new_fs("win-readonly");
    let file = path(&fs, "C:\\locked.txt");
    fs.create_file(&file).expect("create");

    fs.set_attribute(&file, "dos:readonly", AttrValue::Bool(true))
        .expect("set readonly");

    let err = fs.check_access(&file, AccessMode::WRITE).expect_err("write");
    assert_eq!(err.kind(), FsErrorKind::PermissionDenied);
    let err = fs.open(&file, OpenFlags::WRITE).expect_err("open write");
    assert_eq!(err.kind(), FsErrorKind::PermissionDenied);
    assert!(fs.open(&file, OpenFlags::READ).is_ok());

    // Clearing readonly needs no WRITE access either (Windows semantics).
    fs.set_attribute(&file, "dos:readonly", AttrValue::Bool(false))
        .expect("clear readonly");
    assert!(fs.open(&file, OpenFlags::WRITE).is_ok());
}

#[test]
fn root_starts_hidden_and_system() {
    let fs = new_fs("win-root-dos");
    let attrs = fs
        .read_attributes(&path(&fs, "C:\\"), "dos:hidden,system,readonly,archive")
        .expect("attrs");
    assert_eq!(attrs.get("hidden"), Some(&AttrValue::Bool(true)));
    assert_eq!(attrs.get("system"), Some(&AttrValue::Bool(true)));
    assert_eq!(attrs.get("readonly"), Some(&AttrValue::Bool(false)));
    assert_eq!(attrs.get("archive"), Some(&AttrValue::Bool(false)));

    let created = fs.path("C:\\plain", &[]).expect("path");
    fs.create_directory(&created).expect("mkdir");
    let attrs = fs
        .read_attributes(&created, "dos:hidden,system")
        .expect("attrs");
    assert_eq!(attrs.get("hidden"), Some(&AttrValue::Bool(false)));
    assert_eq!(attrs.get("system"), Some(&AttrValue::Bool(false)));
}

#[test]
fn dos_attribute_selector_mixes_basic_fields() {
    let fs = new_fs("win-dos-selector");
    let file = path(&fs, "C:\\f");
    fs.create_file(&file).expect("create");
    let handle = fs.open(&file, OpenFlags::WRITE).expect("open");
    handle.write(b"123456").expect("write");

    let attrs = fs
        .read_attributes(&file, "dos:hidden,size")
        .expect("attrs");
    assert_eq!(attrs.get("hidden"), Some(&AttrValue::Bool(false)));
    assert_eq!(attrs.get("size"), Some(&AttrValue::Size(6)));
    assert_eq!(attrs.len(), 2);
}

#[test]
fn slash_alias_is_accepted_on_input() {
    let fs = new_fs("win-alias");
    fs.create_directory(&path(&fs, "C:/mixed")).expect("mkdir");
    fs.create_file(&path(&fs, "C:/mixed/f")).expect("create");
    assert!(fs.exists(&path(&fs, "C:\\mixed\\f")));
    assert_eq!(path(&fs, "C:/mixed/f").to_string(), "C:\\mixed\\f");
}

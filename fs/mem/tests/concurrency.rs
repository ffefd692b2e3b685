//! Concurrency properties: create races, cross-directory moves, shared
//! handles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use memfs::{FsErrorKind, MemFs, MemFsConfig, MoveFlags, OpenFlags};

fn new_fs(authority: &str) -> Arc<MemFs> {
    MemFs::new(format!("memory:{authority}"), &MemFsConfig::posix()).expect("filesystem")
}

#[test]
fn concurrent_create_of_one_name_has_exactly_one_winner() {
    let fs = new_fs("conc-create");
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let wins = Arc::new(AtomicUsize::new(0));
    let losses = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let fs = fs.clone();
            let barrier = barrier.clone();
            let wins = wins.clone();
            let losses = losses.clone();
            thread::spawn(move || {
                let path = fs.path("/contended", &[]).expect("path");
                barrier.wait();
                match fs.create_file(&path) {
                    Ok(()) => {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(err) => {
                        assert_eq!(err.kind(), FsErrorKind::AlreadyExists);
                        losses.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread");
    }

    assert_eq!(wins.load(Ordering::SeqCst), 1);
    assert_eq!(losses.load(Ordering::SeqCst), threads - 1);
    assert_eq!(
        fs.list_directory(&fs.path("/", &[]).expect("path"))
            .expect("list")
            .len(),
        1
    );
}

#[test]
fn opposing_cross_directory_moves_do_not_deadlock() {
    let fs = new_fs("conc-moves");
    let left = fs.path("/left", &[]).expect("path");
    let right = fs.path("/right", &[]).expect("path");
    fs.create_directory(&left).expect("mkdir");
    fs.create_directory(&right).expect("mkdir");
    fs.create_file(&fs.path("/left/ball", &[]).expect("path"))
        .expect("create");

    let rounds = 200;
    let barrier = Arc::new(Barrier::new(2));

    let ltr = {
        let fs = fs.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            let src = fs.path("/left/ball", &[]).expect("path");
            let dst = fs.path("/right/ball", &[]).expect("path");
            barrier.wait();
            let mut moved = 0usize;
            for _ in 0..rounds {
                if fs.move_entry(&src, &dst, MoveFlags::empty()).is_ok() {
                    moved += 1;
                }
            }
            moved
        })
    };
    let rtl = {
        let fs = fs.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            let src = fs.path("/right/ball", &[]).expect("path");
            let dst = fs.path("/left/ball", &[]).expect("path");
            barrier.wait();
            let mut moved = 0usize;
            for _ in 0..rounds {
                if fs.move_entry(&src, &dst, MoveFlags::empty()).is_ok() {
                    moved += 1;
                }
            }
            moved
        })
    };

    let ltr_moves = ltr.join().expect("thread");
    let rtl_moves = rtl.join().expect("thread");

    // The ball is in exactly one of the two directories.
    let in_left = fs.exists(&fs.path("/left/ball", &[]).expect("path"));
    let in_right = fs.exists(&fs.path("/right/ball", &[]).expect("path"));
    assert!(in_left ^ in_right, "ltr={ltr_moves} rtl={rtl_moves}");
}

#[test]
fn append_handles_never_lose_writes() {
    let fs = new_fs("conc-append");
    let path = fs.path("/log", &[]).expect("path");
    fs.create_file(&path).expect("create");

    let writers = 4;
    let per_writer = 50;
    let barrier = Arc::new(Barrier::new(writers));
    let handles: Vec<_> = (0..writers)
        .map(|i| {
            let fs = fs.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let path = fs.path("/log", &[]).expect("path");
                let handle = fs.open(&path, OpenFlags::APPEND).expect("open");
                let record = [b'a' + i as u8; 8];
                barrier.wait();
                for _ in 0..per_writer {
                    assert_eq!(handle.write(&record).expect("append"), record.len());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread");
    }

    let reader = fs.open(&path, OpenFlags::READ).expect("open");
    assert_eq!(
        reader.len().expect("len"),
        (writers * per_writer * 8) as u64
    );
}

#[test]
fn delete_and_list_race_stays_consistent() {
    let fs = new_fs("conc-delete-list");
    let dir = fs.path("/spool", &[]).expect("path");
    fs.create_directory(&dir).expect("mkdir");
    for i in 0..50 {
        fs.create_file(&fs.path(&format!("/spool/f{i}"), &[]).expect("path"))
            .expect("create");
    }

    let barrier = Arc::new(Barrier::new(2));
    let deleter = {
        let fs = fs.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            for i in 0..50 {
                let path = fs.path(&format!("/spool/f{i}"), &[]).expect("path");
                fs.delete(&path).expect("delete");
            }
        })
    };
    let lister = {
        let fs = fs.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            let dir = fs.path("/spool", &[]).expect("path");
            barrier.wait();
            for _ in 0..50 {
                // Every snapshot observes a consistent prefix-free state.
                let listed = fs.list_directory(&dir).expect("list");
                assert!(listed.len() <= 50);
            }
        })
    };
    deleter.join().expect("deleter");
    lister.join().expect("lister");

    assert!(fs.list_directory(&dir).expect("list").is_empty());
}

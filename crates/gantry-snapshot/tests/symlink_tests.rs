//! Symbolic link handling during directory walks
#![cfg(unix)]

use gantry_hash::ContentHash;
use gantry_snapshot::{AccessType, DefaultFileSystemSnapshotter, FileSystemLocationSnapshot, FileType, SnapshotterConfig};
use gantry_test_utils::{init_test_logging, TempTree};
use pretty_assertions::assert_eq;

fn snapshotter() -> DefaultFileSystemSnapshotter {
    DefaultFileSystemSnapshotter::from_config(&SnapshotterConfig::default()).unwrap()
}

fn child<'a>(snapshot: &'a FileSystemLocationSnapshot, name: &str) -> &'a FileSystemLocationSnapshot {
    snapshot
        .children()
        .iter()
        .find(|child| child.name().as_ref() == name)
        .unwrap_or_else(|| panic!("no child {name} in {}", snapshot.absolute_path()))
}

#[test]
fn cycle_back_to_ancestor_terminates() {
    init_test_logging();
    let tree = TempTree::new();
    tree.file("d/sub/file.txt", "x");
    tree.symlink("d/sub/loop", tree.join("d"));
    tree.symlink("d/self", ".");

    let snapshotter = snapshotter();
    let snapshot = snapshotter.snapshot(&tree.join("d")).unwrap();

    let names: Vec<_> = snapshot.children().iter().map(|c| c.name().to_string()).collect();
    assert_eq!(names, vec!["sub"]);
    let sub_names: Vec<_> = child(&snapshot, "sub").children().iter().map(|c| c.name().to_string()).collect();
    assert_eq!(sub_names, vec!["file.txt"]);
    assert_eq!(snapshot.node_count(), 3);
    assert_eq!(snapshotter.statistics().symlinks, 2);
}

#[test]
fn indirect_cycle_through_followed_link_terminates() {
    let tree = TempTree::new();
    tree.file("a/one.txt", "1");
    tree.file("b/two.txt", "2");
    tree.symlink("a/to-b", tree.join("b"));
    tree.symlink("b/to-a", tree.join("a"));

    let snapshot = snapshotter().snapshot(&tree.join("a")).unwrap();
    let to_b = child(&snapshot, "to-b");
    assert_eq!(to_b.file_type(), FileType::Directory);
    let names: Vec<_> = to_b.children().iter().map(|c| c.name().to_string()).collect();
    assert_eq!(names, vec!["two.txt"]);
}

#[test]
fn linked_directory_is_remapped_under_link() {
    let tree = TempTree::new();
    tree.file("shared/inner/deep.txt", "deep");
    tree.file("project/own.txt", "own");
    let link = tree.symlink("project/linked", tree.join("shared"));

    let snapshot = snapshotter().snapshot(&tree.join("project")).unwrap();
    let linked = child(&snapshot, "linked");
    assert_eq!(linked.access_type(), AccessType::ViaSymlink);
    assert_eq!(linked.absolute_path().as_ref(), link.to_string_lossy());

    let deep = child(child(linked, "inner"), "deep.txt");
    assert_eq!(deep.access_type(), AccessType::ViaSymlink);
    assert_eq!(
        deep.absolute_path().as_ref(),
        link.join("inner/deep.txt").to_string_lossy()
    );
    assert_eq!(deep.regular_file_hash(), Some(ContentHash::compute(b"deep")));
    assert_eq!(child(&snapshot, "own.txt").access_type(), AccessType::Direct);

    // same content, different access type, still the same directory digest
    let direct = snapshotter().snapshot(&tree.join("shared")).unwrap();
    assert_eq!(direct.hash(), linked.hash());
    assert_eq!(direct.access_type(), AccessType::Direct);
}

#[test]
fn linked_file_and_dangling_link() {
    let tree = TempTree::new();
    tree.file("outside/data.bin", "payload");
    tree.symlink("d/data", tree.join("outside/data.bin"));
    tree.symlink("d/gone", tree.join("nowhere"));

    let snapshot = snapshotter().snapshot(&tree.join("d")).unwrap();
    let data = child(&snapshot, "data");
    assert_eq!(data.file_type(), FileType::RegularFile);
    assert_eq!(data.access_type(), AccessType::ViaSymlink);
    assert_eq!(data.regular_file_hash(), Some(ContentHash::compute(b"payload")));

    let gone = child(&snapshot, "gone");
    assert_eq!(gone.file_type(), FileType::Missing);
    assert_eq!(gone.access_type(), AccessType::ViaSymlink);
}

#[test]
fn sibling_links_to_same_directory_are_both_walked() {
    let tree = TempTree::new();
    tree.file("target/t.txt", "t");
    tree.symlink("d/first", tree.join("target"));
    tree.symlink("d/second", tree.join("target"));

    let snapshot = snapshotter().snapshot(&tree.join("d")).unwrap();
    let first = child(&snapshot, "first");
    let second = child(&snapshot, "second");
    assert_eq!(first.hash(), second.hash());
    assert_ne!(first.absolute_path(), second.absolute_path());
}

#[test]
fn root_reached_through_link_is_via_symlink() {
    let tree = TempTree::new();
    tree.file("real/a.txt", "a");
    let link = tree.symlink("alias", tree.join("real"));

    let snapshot = snapshotter().snapshot(&link).unwrap();
    assert_eq!(snapshot.file_type(), FileType::Directory);
    assert_eq!(snapshot.access_type(), AccessType::ViaSymlink);
    assert_eq!(child(&snapshot, "a.txt").access_type(), AccessType::ViaSymlink);
    assert_eq!(snapshot.absolute_path().as_ref(), link.to_string_lossy());
}

use std::fs;
use std::sync::Arc;

use story_store::{LibraryData, LibraryStore, Subscription};
use tempfile::TempDir;

fn drain(updates: &mut Subscription<Arc<LibraryData>>) -> Vec<Vec<String>> {
    let mut seen = Vec::new();
    while let Some(data) = updates.try_recv() {
        seen.push(data.iter().map(String::from).collect());
    }
    seen
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Library Lifecycle
///
/// 1. Open a library containing one story and a hidden directory
/// 2. Create, rename and delete stories
/// 3. Check that invalid requests leave the disk and the snapshot alone
#[tokio::test]
async fn test_library_lifecycle() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("library");
    fs::create_dir_all(root.join("existing")).unwrap();
    fs::create_dir_all(root.join(".thumbnails")).unwrap();

    let library = LibraryStore::open(&root).expect("library should open");
    library.flush().await;
    let mut updates = library.updates();

    library.create("new");
    library.rename("existing", "renamed");
    library.delete("new");
    library.flush().await;

    assert_eq!(
        drain(&mut updates),
        vec![
            names(&["existing"]),
            names(&["existing", "new"]),
            names(&["new", "renamed"]),
            names(&["renamed"]),
        ]
    );
    assert!(root.join("renamed").is_dir());
    assert!(!root.join("existing").exists());
    assert!(!root.join("new").exists());
    assert!(root.join(".thumbnails").is_dir());
}

#[tokio::test]
async fn test_rename_guard() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("a")).unwrap();
    fs::create_dir(temp.path().join("b")).unwrap();

    let library = LibraryStore::open(temp.path()).expect("library should open");
    library.flush().await;
    let mut updates = library.updates();
    drain(&mut updates);

    library.rename("a", "b");
    library.rename("missing", "c");
    library.rename("a", "");
    library.rename("a", "x/y");
    library.flush().await;

    assert!(drain(&mut updates).is_empty());
    assert!(temp.path().join("a").is_dir());
    assert!(!temp.path().join("c").exists());
}

#[tokio::test]
async fn test_delete_guard() {
    let temp = TempDir::new().unwrap();
    let library = LibraryStore::open(temp.path()).expect("library should open");
    library.flush().await;
    let mut updates = library.updates();
    drain(&mut updates);

    // Present on disk but unknown until refreshed.
    fs::create_dir(temp.path().join("late")).unwrap();
    library.delete("late");
    library.delete("never");
    library.flush().await;

    assert!(drain(&mut updates).is_empty());
    assert!(temp.path().join("late").is_dir());

    library.refresh();
    library.delete("late");
    library.flush().await;
    assert_eq!(drain(&mut updates), vec![names(&["late"]), names(&[])]);
}

#[tokio::test]
async fn test_deleting_story_removes_tracks() {
    let temp = TempDir::new().unwrap();
    let library = LibraryStore::open(temp.path()).expect("library should open");
    library.create("bedtime");
    library.flush().await;

    let story = library.open_story("bedtime").expect("story should open");
    fs::write(story.wip_recording_path(), b"clip").unwrap();
    story.save_wip_recording("intro");
    story.flush().await;
    assert!(story.track_path("intro").is_file());
    drop(story);

    library.delete("bedtime");
    library.flush().await;
    assert!(!temp.path().join("bedtime").exists());
    assert!(library.latest().expect("snapshot").is_empty());
}

//! Scan a real directory tree, derive tags, page a directory and view it

use app_core::{
    AppConfig, AppState, ExclusionStore, ImageLoader, LoadedMedia, SessionPhase, SessionUpdate,
    TagSortMode,
};
use app_db::ExclusionDb;
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn write_png(path: &Path) {
    image::RgbaImage::from_pixel(3, 2, image::Rgba([200, 10, 10, 255]))
        .save(path)
        .unwrap();
}

fn build_library(root: &Path) {
    fs::create_dir_all(root.join("2023/Beach Trip")).unwrap();
    fs::create_dir_all(root.join("Beach Party")).unwrap();
    fs::create_dir_all(root.join("Mountain Trip")).unwrap();
    fs::create_dir_all(root.join("⭐⭐ Vol2 Mountain")).unwrap();
    fs::create_dir_all(root.join("⭐⭐ Sunset")).unwrap();
    fs::create_dir_all(root.join("empty")).unwrap();

    write_png(&root.join("2023/Beach Trip/a1.png"));
    fs::write(root.join("2023/Beach Trip/clip.mp4"), b"video").unwrap();
    write_png(&root.join("Beach Party/p.png"));
    fs::write(root.join("Beach Party/notes.txt"), b"not media").unwrap();
    write_png(&root.join("⭐⭐ Vol2 Mountain/fav.png"));
    write_png(&root.join("⭐⭐ Sunset/s.png"));
    for i in 0..25 {
        write_png(&root.join(format!("Mountain Trip/m_{}.png", i)));
    }
}

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.library.watch = false;
    config.session.page_size = 10;
    config
}

fn store(dir: &Path) -> Arc<dyn ExclusionStore> {
    let pool = app_db::open(&dir.join("shelf.db")).unwrap();
    Arc::new(ExclusionDb::new(pool))
}

#[tokio::test]
async fn test_library_flow() {
    app_log::init_test_logging();
    let library = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    build_library(library.path());

    let mut state = AppState::with_filesystem(config(), store(data.path()));
    let root = library.path().canonicalize().unwrap();
    assert_eq!(state.load_root(&root).await.unwrap(), 5);

    let ids: Vec<String> = state.visible_tags().into_iter().map(|t| t.id).collect();
    // Star tags first; "party", "sunset" and "vol2" never become tags
    assert_eq!(ids, vec!["⭐⭐", "beach", "mountain", "trip"]);

    // Select the big directory and follow it page by page
    let mountain = root.join("Mountain Trip");
    state.select_directory(&mountain).unwrap();
    assert_eq!(state.session().total(), 25);

    let mut appended = Vec::new();
    while let Some(progress) = state.next_session_update().await {
        match progress.update {
            SessionUpdate::PageAppended { range, .. } => appended.push(range),
            other => panic!("unexpected update {:?}", other),
        }
    }
    assert_eq!(appended, vec![0..10, 10..20, 20..25]);
    assert_eq!(state.session().phase(), SessionPhase::Done);

    // Natural order: m_2 before m_10
    let names: Vec<&str> = state.session().items()[..3].iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["m_0.png", "m_1.png", "m_2.png"]);
    assert_eq!(state.session().items()[10].name, "m_10.png");

    let frame = state.open_viewer(100).unwrap();
    assert_eq!(frame.index, 24);
    assert_eq!(state.step_viewer(1).unwrap().index, 24);
    let frame = state.step_viewer(-1).unwrap();
    assert_eq!(frame.item.as_ref().unwrap().name, "m_23.png");

    let loader = ImageLoader::new();
    match state.load_viewer_media(&loader).await.unwrap() {
        LoadedMedia::Bitmap { width, height, .. } => assert_eq!((width, height), (3, 2)),
        other => panic!("expected bitmap, got {:?}", other),
    }

    // Mixed directory: only media, videos included
    state.select_directory(&root.join("2023/Beach Trip")).unwrap();
    state.settle_session().await;
    let names: Vec<&str> = state.session().items().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a1.png", "clip.mp4"]);
}

#[tokio::test]
async fn test_exclusions_survive_restart() {
    let library = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    build_library(library.path());
    let root = library.path().canonicalize().unwrap();

    {
        let mut state = AppState::with_filesystem(config(), store(data.path()));
        state.load_root(&root).await.unwrap();
        assert!(state.exclude_tag("TRIP").unwrap());
    }

    let mut state = AppState::with_filesystem(config(), store(data.path()));
    state.load_root(&root).await.unwrap();
    assert_eq!(state.excluded_tags(), vec!["trip".to_string()]);

    state.set_sort_mode(TagSortMode::Frequency);
    let ids: Vec<String> = state.visible_tags().into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec!["⭐⭐", "beach", "mountain"]);
}

#[tokio::test]
async fn test_reselecting_discards_old_pages() {
    let library = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    build_library(library.path());
    let root = library.path().canonicalize().unwrap();

    let mut state = AppState::with_filesystem(config(), store(data.path()));
    state.load_root(&root).await.unwrap();

    let first = state.select_directory(&root.join("Mountain Trip")).unwrap();
    let second = state.select_directory(&root.join("Beach Party")).unwrap();
    assert!(second > first);

    let progress = state.settle_session().await;
    for step in &progress {
        if let SessionUpdate::PageAppended { request_id, .. } = step.update {
            assert_eq!(request_id, second);
        }
    }
    let names: Vec<&str> = state.session().items().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["p.png"]);
}

#[tokio::test]
async fn test_watcher_rescans_changed_library() {
    let library = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    build_library(library.path());
    let root = library.path().canonicalize().unwrap();

    let mut config = config();
    config.library.watch = true;
    config.library.watch_debounce_ms = 100;
    let mut state = AppState::with_filesystem(config, store(data.path()));
    state.load_root(&root).await.unwrap();
    assert!(!state.poll_library_changes().await.unwrap());

    state.select_directory(&root.join("Beach Party")).unwrap();
    state.settle_session().await;
    assert_eq!(state.session().items().len(), 1);

    fs::create_dir(root.join("Forest Trip")).unwrap();
    write_png(&root.join("Forest Trip/f.png"));
    write_png(&root.join("Beach Party/q.png"));

    let mut rescanned = false;
    for _ in 0..100 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        rescanned |= state.poll_library_changes().await.unwrap();
        if state.leaves().len() == 6 && state.session().phase() == SessionPhase::Idle {
            break;
        }
    }

    assert!(rescanned);
    assert_eq!(state.leaves().len(), 6);
    // Media count of the selected directory changed, so its session was dropped
    assert_eq!(state.session().phase(), SessionPhase::Idle);
    let trips: Vec<&str> = state
        .leaves_for_tag("trip")
        .iter()
        .map(|l| l.display_path.as_str())
        .collect();
    assert_eq!(trips, vec!["2023/Beach Trip", "Forest Trip", "Mountain Trip"]);
}

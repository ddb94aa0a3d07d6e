//! Integration tests for the synchronization engine over real JSONL files.

use cclog_db::{sync_all, sync_incremental, sync_project, Database};
use pretty_assertions::assert_eq;
use std::fs;
use tokio_test::assert_ok;

mod queries_shared;
use queries_shared::Fixture;

#[tokio::test]
async fn test_second_sync_skips_everything() {
    let fx = Fixture::new();
    let app = fx.repo("app");
    fx.write_simple_session("-work-app", "s1", &app);
    fx.write_simple_session("-work-app", "s2", &app);
    fx.write_simple_session("-work-lib", "s3", &fx.plain_dir("lib"));

    let db = Database::new_in_memory().await.unwrap();
    let source = fx.source();

    let first = assert_ok!(sync_all(&db, &source).await);
    assert_eq!(first.projects_processed, 2);
    assert_eq!(first.sessions_found, 3);
    assert_eq!(first.sessions_synced, 3);
    assert_eq!(first.error_count, 0, "{:?}", first.errors);

    let second = assert_ok!(sync_incremental(&db, &source).await);
    assert_eq!(second.sessions_synced, 0);
    assert_eq!(second.sessions_skipped, first.sessions_synced);
    assert_eq!(db.count_sessions(None).await.unwrap(), 3);

    // A new file shows up on the next pass.
    fx.write_simple_session("-work-app", "s4", &app);
    let third = assert_ok!(sync_all(&db, &source).await);
    assert_eq!(third.sessions_synced, 1);
    assert_eq!(third.sessions_skipped, 3);
}

#[tokio::test]
async fn test_same_session_under_two_projects_stored_once() {
    let fx = Fixture::new();
    let cwd = fx.plain_dir("shared");
    fx.write_simple_session("-a", "dup", &cwd);
    fx.write_simple_session("-b", "dup", &cwd);

    let db = Database::new_in_memory().await.unwrap();
    let result = sync_all(&db, &fx.source()).await.unwrap();

    assert_eq!(result.sessions_found, 2);
    assert_eq!(result.sessions_synced, 1);
    assert_eq!(result.sessions_skipped, 1);
    assert_eq!(result.error_count, 0);
    assert_eq!(db.count_sessions(None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_passes_create_each_session_once() {
    let fx = Fixture::new();
    let cwd = fx.plain_dir("busy");
    for i in 0..12 {
        fx.write_simple_session("-busy", &format!("s{i}"), &cwd);
    }

    let db = Database::new(&fx.db_path()).await.unwrap();
    let source = fx.source();

    let (a, b) = tokio::join!(sync_all(&db, &source), sync_all(&db, &source));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.error_count + b.error_count, 0, "{:?} {:?}", a.errors, b.errors);
    assert_eq!(a.sessions_synced + b.sessions_synced, 12);
    assert_eq!(a.sessions_synced + a.sessions_skipped, 12);
    assert_eq!(b.sessions_synced + b.sessions_skipped, 12);
    assert_eq!(db.count_sessions(None).await.unwrap(), 12);
}

#[tokio::test]
async fn test_unparseable_session_is_reported_and_others_continue() {
    let fx = Fixture::new();
    let cwd = fx.plain_dir("app");
    fx.write_simple_session("-app", "good", &cwd);
    fs::write(fx.projects.join("-app").join("bad.jsonl"), "not json\n\n").unwrap();

    let db = Database::new_in_memory().await.unwrap();
    let result = sync_all(&db, &fx.source()).await.unwrap();

    assert_eq!(result.sessions_synced, 1);
    assert_eq!(result.error_count, 1);
    assert_eq!(result.errors[0].session.as_deref(), Some("bad"));

    // The failure is retried, not remembered.
    let again = sync_all(&db, &fx.source()).await.unwrap();
    assert_eq!(again.sessions_skipped, 1);
    assert_eq!(again.error_count, 1);
}

#[tokio::test]
async fn test_missing_projects_dir_fails_whole_pass() {
    let fx = Fixture::new();
    let db = Database::new_in_memory().await.unwrap();
    let source = cclog_core::FileSessionSource::new(fx.projects.join("nope"));

    assert!(sync_all(&db, &source).await.is_err());
}

#[tokio::test]
async fn test_project_created_with_detected_git_root() {
    let fx = Fixture::new();
    let repo = fx.repo("app");
    let wt = fx.worktree(&repo, "app-feature");
    fx.write_simple_session("-work-app", "s1", &repo);
    fx.write_simple_session("-work-app-feature", "s2", &wt);
    fx.write_simple_session("-work-notes", "s3", &fx.plain_dir("notes"));

    let db = Database::new_in_memory().await.unwrap();
    sync_all(&db, &fx.source()).await.unwrap();

    let root = repo.display().to_string();
    let main = db.get_project_by_name("-work-app").await.unwrap().unwrap();
    let feature = db.get_project_by_name("-work-app-feature").await.unwrap().unwrap();
    let notes = db.get_project_by_name("-work-notes").await.unwrap().unwrap();
    assert_eq!(main.git_root.as_deref(), Some(root.as_str()));
    assert_eq!(feature.git_root.as_deref(), Some(root.as_str()));
    assert_eq!(notes.git_root, None);
}

#[tokio::test]
async fn test_git_root_backfilled_and_never_cleared() {
    let fx = Fixture::new();
    let dir = fx.plain_dir("late");
    fx.write_simple_session("-late", "s1", &dir);

    let db = Database::new_in_memory().await.unwrap();
    sync_all(&db, &fx.source()).await.unwrap();
    let project = db.get_project_by_name("-late").await.unwrap().unwrap();
    assert_eq!(project.git_root, None);

    // `git init` happens later; the next synced session picks it up.
    fs::create_dir_all(dir.join(".git")).unwrap();
    fx.write_simple_session("-late", "s2", &dir);
    sync_all(&db, &fx.source()).await.unwrap();
    let root = dir.display().to_string();
    let project = db.get_project_by_name("-late").await.unwrap().unwrap();
    assert_eq!(project.git_root.as_deref(), Some(root.as_str()));

    // The marker disappearing leaves the stored root alone.
    fs::remove_dir_all(dir.join(".git")).unwrap();
    fx.write_simple_session("-late", "s3", &dir);
    sync_all(&db, &fx.source()).await.unwrap();
    let project = db.get_project_by_name("-late").await.unwrap().unwrap();
    assert_eq!(project.git_root.as_deref(), Some(root.as_str()));
}

#[tokio::test]
async fn test_stored_session_matches_file() {
    let fx = Fixture::new();
    let cwd = fx.plain_dir("app");
    fx.write_session(
        "-app",
        "night",
        &cwd,
        "2026-01-20T23:00:00.000Z",
        "2026-01-21T02:00:00.000Z",
        1000,
    );

    let db = Database::new_in_memory().await.unwrap();
    sync_all(&db, &fx.source()).await.unwrap();

    let session = db.get_session("night").await.unwrap();
    assert_eq!(session.total_tokens.input_tokens, 1000);
    assert_eq!(session.model_usage["claude-sonnet"].input_tokens, 1000);
    assert_eq!(session.entries.len(), 2);

    let row = db.get_session_row("night").await.unwrap().unwrap();
    assert_eq!(row.first_user_message, "work on night");
    assert_eq!(row.duration_seconds, 3 * 3600);

    let project = db.get_project_by_name("-app").await.unwrap().unwrap();
    assert_eq!(
        db.project_working_directory(project.id).await.unwrap(),
        Some(cwd.display().to_string())
    );
    let days = db
        .project_timeline(project.id, cclog_db::Period::Day, 30)
        .await
        .unwrap();
    assert_eq!(days.len(), 2);
    assert!(days.iter().all(|d| d.total_input_tokens == 1000 && d.session_count == 1));
}

#[tokio::test]
async fn test_sync_single_project_leaves_others() {
    let fx = Fixture::new();
    fx.write_simple_session("-one", "a", &fx.plain_dir("one"));
    fx.write_simple_session("-two", "b", &fx.plain_dir("two"));

    let db = Database::new_in_memory().await.unwrap();
    let result = sync_project(&db, &fx.source(), "-one").await.unwrap();

    assert_eq!(result.projects_processed, 1);
    assert_eq!(result.sessions_synced, 1);
    assert!(db.get_project_by_name("-two").await.unwrap().is_none());
    let one = db.get_project_by_name("-one").await.unwrap().unwrap();
    assert!(one.last_scan_time.is_some());
}

//! Integration tests for repository grouping after sync.

use cclog_db::{sync_all, sync_project_groups, Database};

mod queries_shared;
use queries_shared::Fixture;

#[tokio::test]
async fn test_grouping_converges_as_worktrees_appear() {
    let fx = Fixture::new();
    let repo = fx.repo("app");
    let wt1 = fx.worktree(&repo, "app-one");
    let wt2 = fx.worktree(&repo, "app-two");
    fx.write_simple_session("-app", "s1", &repo);
    fx.write_simple_session("-app-one", "s2", &wt1);
    fx.write_simple_session("-app-two", "s3", &wt2);
    fx.write_simple_session("-scratch", "s4", &fx.plain_dir("scratch"));

    let db = Database::new_in_memory().await.unwrap();
    sync_all(&db, &fx.source()).await.unwrap();

    let groups = db.list_project_groups().await.unwrap();
    assert_eq!(groups.len(), 2);
    let app = &groups[0];
    assert_eq!(app.name, "app");
    assert_eq!(app.git_root.as_deref(), Some(repo.display().to_string().as_str()));
    assert_eq!(db.get_projects_by_group_id(app.id).await.unwrap().len(), 3);
    assert_eq!(groups[1].name, "-scratch");
    assert_eq!(groups[1].git_root, None);
    assert_eq!(db.get_projects_by_group_id(groups[1].id).await.unwrap().len(), 1);

    // A fifth project on the same repository joins the existing group.
    let wt3 = fx.worktree(&repo, "app-three");
    fx.write_simple_session("-app-three", "s5", &wt3);
    sync_all(&db, &fx.source()).await.unwrap();

    let after = db.list_project_groups().await.unwrap();
    assert_eq!(after.len(), 2);
    assert_eq!(after[0].id, app.id);
    assert_eq!(db.get_projects_by_group_id(app.id).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_regrouping_is_idempotent() {
    let fx = Fixture::new();
    let repo = fx.repo("svc.git");
    fx.write_simple_session("-svc", "s1", &repo);

    let db = Database::new_in_memory().await.unwrap();
    sync_all(&db, &fx.source()).await.unwrap();

    let again = sync_project_groups(&db).await.unwrap();
    assert_eq!(again.groups_created, 0);
    assert_eq!(again.memberships_added, 0);

    let groups = db.list_project_groups().await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "svc");
}

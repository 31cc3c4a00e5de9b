mod helpers;

use gitward::commands::{ChangelogOutcome, MaintenanceOutcome, MaintenanceTask};
use gitward::config::BackendKind;
use gitward::{Capability, ErrorCategory, GitError};
use helpers::{
    audit_lines_with, audited_client, client, create_bare_remote, create_commit,
    create_source_repo, create_test_repo, git,
};
use tempfile::TempDir;

#[test]
fn test_clone_and_checkout() {
    let temp = TempDir::new().unwrap();
    let source = create_source_repo(temp.path(), 2);
    let ws = temp.path().join("ws");
    let log = temp.path().join("audit.log");
    let client = audited_client(&ws, BackendKind::Library, &log);

    client
        .clone_repo()
        .url(source.to_str().unwrap())
        .execute()
        .expect("clone failed");
    client
        .checkout()
        .reference("origin/main")
        .branch("main")
        .execute()
        .expect("checkout failed");

    assert!(ws.join("file0.txt").exists());
    assert!(ws.join("file1.txt").exists());
    assert_eq!(git(&ws, &["symbolic-ref", "HEAD"]), "refs/heads/main");
    assert_eq!(
        client.rev_parse("HEAD").unwrap(),
        client.rev_parse("origin/main").unwrap()
    );

    assert_eq!(audit_lines_with(&log, "libgit2 clone").len(), 1);
    assert_eq!(audit_lines_with(&log, "libgit2 checkout origin/main").len(), 1);
}

#[test]
fn test_push_then_head_rev() {
    let (temp, repo) = create_test_repo();
    create_commit(&repo, "a.txt", "a", "First");
    let bare = create_bare_remote(temp.path(), "remote.git");
    let client = client(&repo, BackendKind::Library);

    client.set_remote_url("origin", bare.to_str().unwrap()).unwrap();
    client
        .push()
        .to("origin")
        .reference("HEAD:refs/heads/main")
        .execute()
        .expect("push failed");

    let head = client.rev_parse("HEAD").unwrap();
    assert_eq!(
        client.get_head_rev(bare.to_str().unwrap(), "main").unwrap(),
        Some(head)
    );
    assert_eq!(client.get_head_rev(bare.to_str().unwrap(), "nope").unwrap(), None);
}

#[test]
fn test_tag_push_overwrites_remote_tag() {
    let (temp, repo) = create_test_repo();
    create_commit(&repo, "a.txt", "a", "First");
    let bare = create_bare_remote(temp.path(), "remote.git");
    let client = client(&repo, BackendKind::Library);
    assert!(!client.supports(Capability::RejectsTagOverwrite));

    client.set_remote_url("origin", bare.to_str().unwrap()).unwrap();
    client.create_tag("v1", None).unwrap();
    client.push().to("origin").tags(true).execute().unwrap();

    let second = create_commit(&repo, "b.txt", "b", "Second");
    git(&repo, &["tag", "-f", "v1"]);
    client.push().to("origin").tags(true).execute().unwrap();

    assert_eq!(git(&bare, &["rev-parse", "refs/tags/v1"]), second);
}

#[test]
fn test_double_delete_is_tolerated() {
    let (_temp, repo) = create_test_repo();
    create_commit(&repo, "a.txt", "a", "First");
    let client = client(&repo, BackendKind::Library);

    client.create_branch("tmp", None).unwrap();
    assert!(client.ref_exists("refs/heads/tmp").unwrap());
    client.delete_branch("tmp").unwrap();
    client.delete_branch("tmp").unwrap();

    client.create_tag("t1", Some("annotated")).unwrap();
    client.delete_tag("t1").unwrap();
    client.delete_tag("t1").unwrap();
    assert!(!client.tag_exists("t1").unwrap());

    client.delete_ref("refs/heads/never-existed").unwrap();
}

#[test]
fn test_fetch_timeout_is_capped() {
    let temp = TempDir::new().unwrap();
    let source = create_source_repo(temp.path(), 1);
    let ws = temp.path().join("ws");
    let log = temp.path().join("audit.log");
    let client = audited_client(&ws, BackendKind::Library, &log);

    client.init().execute().unwrap();
    client
        .fetch()
        .from(source.to_str().unwrap())
        .timeout(u64::MAX)
        .execute()
        .unwrap();

    let lines = audit_lines_with(&log, "[timeout:10080min]");
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("libgit2 fetch"));
    assert!(client.ref_exists("refs/remotes/origin/main").unwrap());
}

#[test]
fn test_fast_forward_then_merge_commit() {
    let (_temp, repo) = create_test_repo();
    create_commit(&repo, "base.txt", "base", "Base");
    let client = client(&repo, BackendKind::Library);

    client.create_branch("feature", None).unwrap();
    client.checkout().reference("feature").execute().unwrap();
    let feature_tip = create_commit(&repo, "f1.txt", "f1", "Feature 1");
    client.checkout().reference("main").execute().unwrap();
    assert!(!repo.join("f1.txt").exists());

    client.merge().revision("feature").execute().unwrap();
    assert_eq!(client.rev_parse("HEAD").unwrap().as_str(), feature_tip);
    assert!(repo.join("f1.txt").exists());

    let main_tip = create_commit(&repo, "m1.txt", "m1", "Main 1");
    client.checkout().reference("feature").execute().unwrap();
    let feature_tip = create_commit(&repo, "f2.txt", "f2", "Feature 2");
    client.checkout().reference("main").execute().unwrap();

    client.merge().revision("feature").execute().unwrap();
    let parents = git(&repo, &["rev-list", "--parents", "-n", "1", "HEAD"]);
    let parents: Vec<&str> = parents.split_whitespace().skip(1).collect();
    assert_eq!(parents, [main_tip.as_str(), feature_tip.as_str()]);
    assert!(repo.join("f2.txt").exists());
    assert!(repo.join("m1.txt").exists());
}

#[test]
fn test_changelog_between_revisions() {
    let temp = TempDir::new().unwrap();
    let source = create_source_repo(temp.path(), 3);
    let client = client(&source, BackendKind::Library);

    let mut out = Vec::new();
    let outcome = client
        .changelog()
        .excludes("HEAD~2")
        .to(&mut out)
        .execute()
        .unwrap();

    assert_eq!(outcome, ChangelogOutcome::Completed { bytes: out.len() });
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().filter(|l| l.starts_with("commit ")).count(), 2);
    assert!(text.contains("    Commit 2"));
    assert!(text.contains(" A\tfile2.txt"));
    assert!(!text.contains("file0.txt"));
}

#[test]
fn test_unsupported_operations() {
    let (_temp, repo) = create_test_repo();
    create_commit(&repo, "a.txt", "a", "First");
    let client = client(&repo, BackendKind::Library);

    let err = client
        .checkout()
        .reference("main")
        .sparse_checkout_paths(["a.txt"])
        .execute()
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Unsupported);

    let err = client
        .submodule_update()
        .remote_tracking(true)
        .execute()
        .unwrap_err();
    assert!(matches!(err, GitError::Unsupported { backend: "library", .. }));

    assert_eq!(
        client
            .maintenance()
            .task(MaintenanceTask::CommitGraph)
            .execute()
            .unwrap(),
        MaintenanceOutcome::NotSupported
    );
}

#[test]
fn test_operations_outside_repository() {
    let temp = TempDir::new().unwrap();
    let client = client(&temp.path().join("missing"), BackendKind::Library);

    assert!(matches!(
        client.rev_parse("HEAD").unwrap_err(),
        GitError::NotARepository(_)
    ));
}

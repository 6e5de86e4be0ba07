use git2::{Oid, Repository, Signature, Time};
use swhid::{
    from_content, from_directory, from_snapshot, DirectoryEntry, EntryKind, ObjectHash, ObjectType,
    PermissionTable, SnapshotBranch, Swhid, SwhidComputer, SwhidError,
};
use tempfile::TempDir;

/// A small repository: one file, two commits, an annotated and a lightweight tag.
struct TestRepo {
    dir: TempDir,
    repo: Repository,
    blob: Oid,
    tree: Oid,
    first_commit: Oid,
    head_commit: Oid,
    annotated_tag: Oid,
}

impl TestRepo {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let author = Signature::new("Ada Lovelace", "ada@example.com", &Time::new(1_600_000_000, 120))
            .unwrap();
        let committer =
            Signature::new("Charles Babbage", "charles@example.com", &Time::new(1_600_000_600, -300))
                .unwrap();

        let blob = repo.blob(b"hello\n").unwrap();
        let tree = {
            let mut builder = repo.treebuilder(None).unwrap();
            builder.insert("README", blob, 0o100644).unwrap();
            builder.write().unwrap()
        };

        let first_commit = {
            let tree = repo.find_tree(tree).unwrap();
            repo.commit(Some("HEAD"), &author, &committer, "Initial commit\n", &tree, &[])
                .unwrap()
        };
        let head_commit = {
            let tree = repo.find_tree(tree).unwrap();
            let parent = repo.find_commit(first_commit).unwrap();
            repo.commit(
                Some("HEAD"),
                &author,
                &committer,
                "Second commit\n\nWith a body.\n",
                &tree,
                &[&parent],
            )
            .unwrap()
        };

        let annotated_tag = {
            let target = repo.find_object(head_commit, None).unwrap();
            repo.tag("v1.0", &target, &committer, "Version 1.0\n", false)
                .unwrap()
        };
        {
            let target = repo.find_object(first_commit, None).unwrap();
            repo.tag_lightweight("light", &target, false).unwrap();
        }

        Self {
            dir,
            repo,
            blob,
            tree,
            first_commit,
            head_commit,
            annotated_tag,
        }
    }

    fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    fn head_target(&self) -> String {
        let head = self.repo.find_reference("HEAD").unwrap();
        head.symbolic_target().unwrap().to_string()
    }
}

fn oid_swhid(object_type: ObjectType, oid: Oid) -> Swhid {
    Swhid::new(object_type, ObjectHash::from_hex(&oid.to_string()).unwrap())
}

#[test]
fn test_revision_matches_commit_id() {
    let repo = TestRepo::new();
    let computer = SwhidComputer::new();

    assert_eq!(
        computer.compute_revision_swhid(repo.path(), "HEAD").unwrap(),
        oid_swhid(ObjectType::Revision, repo.head_commit)
    );
    assert_eq!(
        computer.compute_revision_swhid(repo.path(), "HEAD~1").unwrap(),
        oid_swhid(ObjectType::Revision, repo.first_commit)
    );
}

#[test]
fn test_revision_through_tag_name() {
    let repo = TestRepo::new();
    assert_eq!(
        SwhidComputer::new().compute_revision_swhid(repo.path(), "v1.0").unwrap(),
        oid_swhid(ObjectType::Revision, repo.head_commit)
    );
}

#[test]
fn test_revision_metadata_fields() {
    let repo = TestRepo::new();
    let metadata = swhid::from_git::revision_metadata(&repo.repo, "HEAD").unwrap();

    assert_eq!(metadata.parents.len(), 1);
    assert_eq!(metadata.author.as_deref(), Some(&b"Ada Lovelace <ada@example.com>"[..]));
    assert_eq!(metadata.author_timestamp, Some(1_600_000_000));
    assert_eq!(metadata.author_timezone.as_deref(), Some("+0200"));
    assert_eq!(metadata.committer_timezone.as_deref(), Some("-0500"));
    assert_eq!(metadata.message.as_deref(), Some(&b"Second commit\n\nWith a body.\n"[..]));
    assert_eq!(
        metadata.directory.unwrap().resolve().unwrap().to_hex(),
        repo.tree.to_string()
    );
}

#[test]
fn test_release_matches_tag_id() {
    let repo = TestRepo::new();
    assert_eq!(
        SwhidComputer::new().compute_release_swhid(repo.path(), "v1.0").unwrap(),
        oid_swhid(ObjectType::Release, repo.annotated_tag)
    );
}

#[test]
fn test_lightweight_tag_is_not_a_release() {
    let repo = TestRepo::new();
    let err = SwhidComputer::new()
        .compute_release_swhid(repo.path(), "light")
        .unwrap_err();
    assert!(matches!(err, SwhidError::InvalidInput(_)));
}

#[test]
fn test_missing_tag() {
    let repo = TestRepo::new();
    let err = SwhidComputer::new()
        .compute_release_swhid(repo.path(), "v9.9")
        .unwrap_err();
    assert!(matches!(err, SwhidError::Git(_)));
}

#[test]
fn test_snapshot_of_repository() {
    let repo = TestRepo::new();
    let head_target = repo.head_target();

    let expected = from_snapshot(vec![
        SnapshotBranch::alias("HEAD", head_target.as_str()),
        SnapshotBranch::object(head_target.as_str(), ObjectType::Revision, repo.head_commit.to_string()),
        SnapshotBranch::object("refs/tags/v1.0", ObjectType::Release, repo.annotated_tag.to_string()),
        SnapshotBranch::object("refs/tags/light", ObjectType::Revision, repo.first_commit.to_string()),
    ])
    .unwrap();

    assert_eq!(SwhidComputer::new().compute_snapshot_swhid(repo.path()).unwrap(), expected);
}

#[test]
fn test_snapshot_with_blob_and_tree_references() {
    let repo = TestRepo::new();
    repo.repo
        .reference("refs/blobs/readme", repo.blob, false, "test")
        .unwrap();
    repo.repo
        .reference("refs/trees/root", repo.tree, false, "test")
        .unwrap();

    let branches = swhid::from_git::snapshot_branches(&repo.repo).unwrap();
    let find = |name: &str| {
        branches
            .iter()
            .find(|branch| branch.name == name.as_bytes())
            .unwrap()
            .target_type
            .to_string()
    };
    assert_eq!(find("refs/blobs/readme"), "content");
    assert_eq!(find("refs/trees/root"), "directory");
    assert_eq!(find("HEAD"), "alias");
    assert_eq!(find("refs/tags/v1.0"), "release");
}

#[test]
fn test_not_a_repository() {
    let dir = TempDir::new().unwrap();
    let err = SwhidComputer::new().compute_snapshot_swhid(dir.path()).unwrap_err();
    assert!(matches!(err, SwhidError::Git(_)));
}

#[test]
fn test_tree_matches_directory_on_disk() {
    let repo = TestRepo::new();
    let workdir = TempDir::new().unwrap();
    std::fs::write(workdir.path().join("README"), b"hello\n").unwrap();

    let swhid = SwhidComputer::new()
        .with_git_index(false)
        .compute_directory_swhid(workdir.path())
        .unwrap();
    assert_eq!(swhid, oid_swhid(ObjectType::Directory, repo.tree));
}

#[cfg(unix)]
#[test]
fn test_index_mode_overrides_filesystem() {
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    let tool = dir.path().join("tool");
    std::fs::write(&tool, b"#!/bin/sh\n").unwrap();
    std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new("tool")).unwrap();
    index.write().unwrap();
    std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o644)).unwrap();

    let tree = |kind: EntryKind| {
        from_directory(vec![DirectoryEntry::new("tool", kind, from_content(b"#!/bin/sh\n"))]).unwrap()
    };

    let with_index = SwhidComputer::new().compute_directory_swhid(dir.path()).unwrap();
    assert_eq!(with_index, tree(EntryKind::Executable));

    let without_index = SwhidComputer::new()
        .with_git_index(false)
        .compute_directory_swhid(dir.path())
        .unwrap();
    assert_eq!(without_index, tree(EntryKind::File));

    let table = PermissionTable::from_json_str(r#"{"tool": "100644"}"#, dir.path()).unwrap();
    let with_table = SwhidComputer::new()
        .with_permissions(Some(table))
        .compute_directory_swhid(dir.path())
        .unwrap();
    assert_eq!(with_table, tree(EntryKind::File));
}

//! End-to-end behaviour of the repository: push, freeze, list, retrieve.

use std::collections::BTreeMap;

use arca_catalog::{CatalogError, PushStatus, Repository, RepositoryLayout};
use arca_core::{sha256_digest, PackageName, VersionName, VersionSelector};
use proptest::prelude::*;

async fn open() -> (tempfile::TempDir, Repository) {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::open(&RepositoryLayout::new(dir.path()), "apk")
        .await
        .unwrap();
    (dir, repo)
}

fn v(s: &str) -> VersionName {
    VersionName::new(s).unwrap()
}

fn pkg(s: &str) -> PackageName {
    PackageName::new(s).unwrap()
}

#[tokio::test]
async fn same_bytes_twice_is_one_row_and_one_file() {
    let (_dir, repo) = open().await;

    let first = repo.push("app.apk", b"B1".to_vec(), "first").await.unwrap();
    let second = repo.push("app.apk", b"B1".to_vec(), "again").await.unwrap();

    assert_eq!(first.status, PushStatus::Created);
    assert_eq!(second.status, PushStatus::Duplicate);
    assert_eq!(first.hash, second.hash);
    assert_eq!(first.path, second.path);
    assert_eq!(repo.stats().await.unwrap().artifacts, 1);
    assert_eq!(repo.store().list_hashes(&pkg("app")).unwrap().len(), 1);
}

#[tokio::test]
async fn same_bytes_under_another_name_reuse_the_stored_artifact() {
    let (_dir, repo) = open().await;

    let first = repo.push("app.apk", b"same".to_vec(), "").await.unwrap();
    let second = repo.push("copy.apk", b"same".to_vec(), "").await.unwrap();

    assert_eq!(first.status, PushStatus::Created);
    assert_eq!(second.status, PushStatus::Duplicate);
    assert_eq!(second.name, pkg("app"));
    assert_eq!(second.path, first.path);
    assert!(second.path.is_file());
    assert_eq!(repo.stats().await.unwrap().artifacts, 1);
    assert!(repo.store().list_hashes(&pkg("copy")).unwrap().is_empty());
    assert!(!repo.store().base_dir().join("copy").exists());
    assert!(repo.verify().await.unwrap().is_clean());
}

#[tokio::test]
async fn push_validates_filename_and_content() {
    let (_dir, repo) = open().await;

    assert!(matches!(
        repo.push("app.zip", b"x".to_vec(), "").await,
        Err(CatalogError::Validation(_))
    ));
    assert!(matches!(
        repo.push("app.apk", Vec::new(), "").await,
        Err(CatalogError::Validation(_))
    ));
    assert!(matches!(
        repo.push("..apk", b"x".to_vec(), "").await,
        Err(CatalogError::Validation(_))
    ));
    assert_eq!(repo.stats().await.unwrap().artifacts, 0);
}

#[tokio::test]
async fn push_accepts_uppercase_extension() {
    let (_dir, repo) = open().await;
    let outcome = repo.push("Tool.APK", b"t".to_vec(), "").await.unwrap();
    assert_eq!(outcome.name.as_str(), "Tool");
    assert!(outcome.path.to_string_lossy().ends_with(".apk"));
}

#[tokio::test]
async fn reference_scenario() {
    let (_dir, repo) = open().await;

    let h1 = repo.push("app.apk", b"B1".to_vec(), "").await.unwrap().hash;
    let h2 = repo.push("app.apk", b"B2".to_vec(), "").await.unwrap().hash;
    assert_ne!(h1, h2);

    let report = repo.freeze(&v("r1")).await.unwrap();
    assert_eq!(report.member_count, 1);
    assert_eq!(report.members[0].name, pkg("app"));
    assert_eq!(report.members[0].content_hash, h2);

    let h3 = repo.push("lib.apk", b"B3".to_vec(), "").await.unwrap().hash;

    let versions = repo.versions().await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].version, v("r1"));

    let latest_app = repo
        .resolve_single(&VersionSelector::Latest, &pkg("app"))
        .await
        .unwrap();
    assert_eq!(latest_app.artifact.content_hash, h2);

    let bundle = repo
        .resolve_bundle(&VersionSelector::Named(v("r1")))
        .await
        .unwrap();
    let hashes: Vec<_> = bundle.members.iter().map(|m| m.artifact.content_hash).collect();
    assert_eq!(hashes, vec![h2]);
    assert!(!hashes.contains(&h3));
}

#[tokio::test]
async fn refreeze_drops_members_that_are_no_longer_latest() {
    let (_dir, repo) = open().await;
    repo.push("app.apk", b"a1".to_vec(), "").await.unwrap();
    repo.freeze(&v("r1")).await.unwrap();
    let created = repo.versions().await.unwrap()[0].created_at;

    repo.push("app.apk", b"a2".to_vec(), "").await.unwrap();
    repo.push("lib.apk", b"l1".to_vec(), "").await.unwrap();
    repo.freeze(&v("r1")).await.unwrap();

    let members = repo.members_of(&v("r1")).await.unwrap();
    let pairs: Vec<_> = members
        .iter()
        .map(|a| (a.name.to_string(), a.content_hash))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("app".to_string(), sha256_digest(b"a2")),
            ("lib".to_string(), sha256_digest(b"l1")),
        ]
    );

    let versions = repo.versions().await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].created_at, created);
    assert_eq!(versions[0].member_count, 2);
}

#[tokio::test]
async fn latest_single_reflects_push_without_freeze() {
    let (_dir, repo) = open().await;
    let h = repo.push("app.apk", b"only".to_vec(), "").await.unwrap().hash;
    let (resolved, bytes) = repo
        .fetch(&VersionSelector::Latest, &pkg("app"))
        .await
        .unwrap();
    assert_eq!(resolved.artifact.content_hash, h);
    assert_eq!(resolved.display_filename, "app.apk");
    assert_eq!(bytes, b"only");

    assert!(matches!(
        repo.resolve_bundle(&VersionSelector::Latest).await,
        Err(CatalogError::NoFrozenVersions)
    ));
}

#[tokio::test]
async fn bundle_unpacks_to_pushed_bytes() {
    let (_dir, repo) = open().await;
    repo.push("app.apk", b"app bytes".to_vec(), "").await.unwrap();
    repo.push("lib.apk", vec![0u8, 159, 146, 150], "").await.unwrap();
    repo.freeze(&v("r1")).await.unwrap();

    let (version, bundle) = repo.bundle(&VersionSelector::Latest).await.unwrap();
    assert_eq!(version, v("r1"));

    let out = tempfile::tempdir().unwrap();
    arca_store::unpack(&bundle, out.path()).unwrap();
    assert_eq!(std::fs::read(out.path().join("app.apk")).unwrap(), b"app bytes");
    assert_eq!(
        std::fs::read(out.path().join("lib.apk")).unwrap(),
        vec![0u8, 159, 146, 150]
    );
}

#[tokio::test]
async fn names_carry_version_tag_of_latest_push() {
    let (_dir, repo) = open().await;
    repo.push("app.apk", b"a1".to_vec(), "").await.unwrap();
    repo.freeze(&v("r1")).await.unwrap();
    repo.freeze(&v("r2")).await.unwrap();
    repo.push("lib.apk", b"l1".to_vec(), "").await.unwrap();

    let names = repo.names().await.unwrap();
    let tags: Vec<_> = names
        .iter()
        .map(|n| (n.name.to_string(), n.version_tag.as_ref().map(|v| v.to_string())))
        .collect();
    assert_eq!(
        tags,
        vec![
            ("app".to_string(), Some("r2".to_string())),
            ("lib".to_string(), None),
        ]
    );
}

#[tokio::test]
async fn history_lists_annotations_and_tags() {
    let (_dir, repo) = open().await;
    repo.push("app.apk", b"a1".to_vec(), "initial").await.unwrap();
    repo.freeze(&v("r1")).await.unwrap();
    repo.push("app.apk", b"a2".to_vec(), "fix crash").await.unwrap();

    let history = repo.name_history(&pkg("app")).await.unwrap();
    assert_eq!(history.versions.len(), 2);
    assert_eq!(history.versions[0].annotation, "fix crash");
    assert!(history.versions[0].version_tags.is_empty());
    assert_eq!(history.versions[1].annotation, "initial");
    assert_eq!(history.versions[1].version_tags, vec![v("r1")]);

    assert!(matches!(
        repo.name_history(&pkg("ghost")).await,
        Err(CatalogError::ArtifactNotFound(_))
    ));
    assert_eq!(repo.history().await.unwrap(), vec![history]);
}

#[tokio::test]
async fn verify_reports_missing_and_corrupt_files() {
    let (_dir, repo) = open().await;
    let gone = repo.push("gone.apk", b"g".to_vec(), "").await.unwrap();
    let bad = repo.push("bad.apk", b"b".to_vec(), "").await.unwrap();
    repo.push("fine.apk", b"f".to_vec(), "").await.unwrap();

    std::fs::remove_file(&gone.path).unwrap();
    std::fs::write(&bad.path, b"tampered").unwrap();

    let report = repo.verify().await.unwrap();
    assert_eq!(report.checked, 3);
    assert_eq!(report.missing_files.len(), 1);
    assert_eq!(report.missing_files[0].name, pkg("gone"));
    assert_eq!(report.corrupt_files.len(), 1);
    assert_eq!(report.corrupt_files[0].name, pkg("bad"));
    assert!(report.orphan_files.is_empty());
}

#[tokio::test]
async fn verify_reports_stored_files_without_catalog_rows() {
    let (_dir, repo) = open().await;
    repo.push("app.apk", b"a".to_vec(), "").await.unwrap();

    let stray = sha256_digest(b"stray");
    let put = repo.store().put(&pkg("ghost"), &stray, b"stray").unwrap();

    let report = repo.verify().await.unwrap();
    assert_eq!(report.checked, 1);
    assert!(report.missing_files.is_empty());
    assert!(report.corrupt_files.is_empty());
    assert_eq!(report.orphan_files, vec![put.path]);
    assert!(!report.is_clean());
}

#[tokio::test]
async fn concurrent_pushes_of_shared_bytes_under_different_names_store_one_file() {
    let (_dir, repo) = open().await;
    let mut handles = Vec::new();
    for i in 0..8 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.push(&format!("n{i}.apk"), b"shared".to_vec(), "")
                .await
                .unwrap()
        }));
    }
    let mut outcomes = Vec::new();
    for h in handles {
        outcomes.push(h.await.unwrap());
    }

    let created: Vec<_> = outcomes
        .iter()
        .filter(|o| o.status == PushStatus::Created)
        .collect();
    assert_eq!(created.len(), 1);
    for o in &outcomes {
        assert_eq!(o.name, created[0].name);
        assert_eq!(o.path, created[0].path);
    }
    assert_eq!(repo.stats().await.unwrap().artifacts, 1);
    assert!(repo.verify().await.unwrap().is_clean());
}

#[tokio::test]
async fn concurrent_pushes_of_identical_bytes_create_one_row() {
    let (_dir, repo) = open().await;
    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.push("app.apk", b"same".to_vec(), "").await.unwrap().status
        }));
    }
    let mut created = 0;
    for h in handles {
        if h.await.unwrap() == PushStatus::Created {
            created += 1;
        }
    }
    assert_eq!(created, 1);
    assert_eq!(repo.stats().await.unwrap().artifacts, 1);
}

// ---------------------------------------------------------------------------
// Latest-per-name property
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn freeze_selects_last_push_of_every_name(
        pushes in proptest::collection::vec((0usize..4, any::<u32>()), 1..20)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (_dir, repo) = open().await;
            let names = ["app", "lib", "tool", "svc"];

            // Expected latest per name, counting only pushes that were new.
            let mut expected = BTreeMap::new();
            for (i, (n, salt)) in pushes.iter().enumerate() {
                let bytes = format!("{}-{salt}-{i}", names[*n]).into_bytes();
                let out = repo
                    .push(&format!("{}.apk", names[*n]), bytes, "")
                    .await
                    .unwrap();
                if out.status == PushStatus::Created {
                    expected.insert(names[*n].to_string(), out.hash);
                }
            }

            let report = repo.freeze(&v("snap")).await.unwrap();
            let actual: BTreeMap<_, _> = report
                .members
                .iter()
                .map(|a| (a.name.to_string(), a.content_hash))
                .collect();
            assert_eq!(actual, expected);
        });
    }
}

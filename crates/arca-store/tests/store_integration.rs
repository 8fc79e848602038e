//! Content store and bundle assembler working together.

use arca_core::{sha256_digest, PackageName};
use arca_store::{assemble, unpack, BundleEntry, ContentStore};

#[test]
fn stored_files_survive_a_bundle_roundtrip() {
    let root = tempfile::tempdir().unwrap();
    let store = ContentStore::new(root.path().join("repository"), "apk");

    let inputs: [(&str, &[u8]); 3] = [
        ("app", b"app build 2"),
        ("lib", &[0u8, 1, 2, 3, 255, 254]),
        ("tool", b""),
    ];

    let mut entries = Vec::new();
    for (name, bytes) in inputs {
        let name = PackageName::new(name).unwrap();
        let digest = sha256_digest(bytes);
        let outcome = store.put(&name, &digest, bytes).unwrap();
        entries.push(BundleEntry::new(outcome.path, name.display_filename("apk")));
    }

    let bundle = assemble(&entries).unwrap();
    let out = tempfile::tempdir().unwrap();
    let files = unpack(&bundle, out.path()).unwrap();
    assert_eq!(files.len(), 3);

    for (name, bytes) in inputs {
        let extracted = std::fs::read(out.path().join(format!("{name}.apk"))).unwrap();
        assert_eq!(extracted, bytes);
    }
}

#[test]
fn two_uploads_of_one_name_coexist() {
    let root = tempfile::tempdir().unwrap();
    let store = ContentStore::new(root.path(), "apk");
    let name = PackageName::new("app").unwrap();

    let h1 = sha256_digest(b"v1");
    let h2 = sha256_digest(b"v2");
    store.put(&name, &h1, b"v1").unwrap();
    store.put(&name, &h2, b"v2").unwrap();

    let mut expected = vec![h1, h2];
    expected.sort();
    assert_eq!(store.list_hashes(&name).unwrap(), expected);
    assert_eq!(store.read_verified(&name, &h1).unwrap().unwrap(), b"v1");
}

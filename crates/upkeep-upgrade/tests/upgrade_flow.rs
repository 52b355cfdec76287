use std::fs;
use std::path::Path;

use serde_json::json;
use tempfile::TempDir;
use upkeep_registry::{InMemoryRegistry, NewFileRelease, SqliteRegistry};
use upkeep_upgrade::{
    BundleInfo, RegisteredProjectInfo, ReleaseVersion, UpgradeConfig, UpgradeError, UpgradeService,
};

fn v(s: &str) -> ReleaseVersion {
    s.parse().unwrap()
}

fn put(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// The same scenario runs against both stores.
fn services() -> Vec<(UpgradeService, Option<TempDir>)> {
    let dir = tempfile::tempdir().unwrap();
    let sqlite = SqliteRegistry::open(&dir.path().join("ProjectReleaseInfo.db")).unwrap();
    vec![
        (
            UpgradeService::with_registry(
                Box::new(InMemoryRegistry::new()),
                UpgradeConfig::default(),
            )
            .unwrap(),
            None,
        ),
        (
            UpgradeService::with_registry(Box::new(sqlite), UpgradeConfig::default()).unwrap(),
            Some(dir),
        ),
    ]
}

// ---------------------------------------------------------------------------
// Identification
// ---------------------------------------------------------------------------

#[test]
fn file_shared_by_project_and_bundle_identifies_both() {
    for (svc, _guard) in services() {
        let reg = svc.registry();
        let h1 = upkeep_crypto::ContentHasher::FILE.hash(b"F bytes");
        let p = reg
            .register_project(&RegisteredProjectInfo::new("P", v("1.0")))
            .unwrap();
        let bu = reg
            .register_bundle(&BundleInfo::new("Bu", "bu.zip", v("1.0")))
            .unwrap();
        reg.register_files(&[
            NewFileRelease::new("bin/F.dll", v("1.0"), h1).in_project(p),
            NewFileRelease::new("bin/F.dll", v("1.0"), h1).in_bundle(bu),
        ])
        .unwrap();

        let tree = tempfile::tempdir().unwrap();
        put(tree.path(), "bin/F.dll", "F bytes");
        let info = svc.identify(tree.path()).unwrap();
        assert_eq!(info.project, RegisteredProjectInfo::new("P", v("1.0")));
        assert!(info.has_bundle("Bu"));
        assert!(info.possible_bundles_applied.is_empty());
    }
}

#[test]
fn unknown_tree_is_not_identifiable() {
    for (svc, _guard) in services() {
        let tree = tempfile::tempdir().unwrap();
        put(tree.path(), "bin/F.dll", "never registered");
        assert!(matches!(
            svc.identify(tree.path()),
            Err(UpgradeError::NotIdentifiable(_))
        ));
    }
}

// ---------------------------------------------------------------------------
// Full upgrade
// ---------------------------------------------------------------------------

const REL_ID: &str = "00000000-0000-0000-0000-000000000001";

fn relationship(modified: &str, child_property: &str) -> String {
    json!({
        "id": REL_ID,
        "parent_entity_id": "00000000-0000-0000-0000-00000000000a",
        "child_entity_id": "00000000-0000-0000-0000-00000000000b",
        "parent_property": "Contacts",
        "child_property": child_property,
        "cardinality": "one_to_many",
        "columns": [{
            "id": "00000000-0000-0000-0000-0000000000c1",
            "parent_column": "ACCOUNTID",
            "child_column": "ACCOUNTID"
        }],
        "last_modified_utc": modified
    })
    .to_string()
}

fn order(keys: &[&str]) -> String {
    let items: Vec<_> = keys
        .iter()
        .map(|k| json!({"id": k, "file_name": format!("{k}.page")}))
        .collect();
    json!({ "items": items }).to_string()
}

/// Stock 1.0 tree.
fn stock_tree(root: &Path) {
    put(root, "bin/Shop.dll", "shop 1.0");
    put(root, "web/home.page", "<home/>");
    put(root, "Portal/Nav/Main.order.json", &order(&["A", "B", "C"]));
    put(
        root,
        "Model/Account.resources.json",
        &json!({"Title": "Account", "Help": "Accounts"}).to_string(),
    );
    put(
        root,
        "Model/Account.Contact.1.relationship.json",
        &relationship("2020-01-01T00:00:00Z", "Account"),
    );
    put(root, "modelindex.xml", "<cache/>");
}

#[test]
fn customized_tree_upgrades_onto_new_release() {
    for (svc, _guard) in services() {
        let base = tempfile::tempdir().unwrap();
        stock_tree(base.path());
        let reg = svc
            .register_project(base.path(), "Shop", v("1.0.0.0"), Some("shop-1.0.zip"), |_| {})
            .unwrap();
        assert_eq!(reg.files, 5);

        let source = tempfile::tempdir().unwrap();
        stock_tree(source.path());
        put(source.path(), "web/home.page", "<home customized/>");
        put(source.path(), "custom/new.page", "<mine/>");
        put(source.path(), "Portal/Nav/Main.order.json", &order(&["C", "A", "B"]));
        put(
            source.path(),
            "Model/Account.resources.json",
            &json!({"Title": "Customer", "Help": "Accounts"}).to_string(),
        );
        fs::remove_file(source.path().join("Model/Account.Contact.1.relationship.json")).unwrap();
        put(
            source.path(),
            "Model/Customer.Contact.1.relationship.json",
            &relationship("2024-06-01T12:00:00Z", "Account"),
        );

        let info = svc.identify(source.path()).unwrap();
        assert_eq!(info.project.version, v("1.0.0.0"));

        let target = tempfile::tempdir().unwrap();
        put(target.path(), "bin/Shop.dll", "shop 2.0");
        put(target.path(), "Portal/Nav/Main.order.json", &order(&["A", "B", "D"]));
        put(
            target.path(),
            "Model/Account.resources.json",
            &json!({"Title": "Account", "Help": "Accounts", "Badge": "New"}).to_string(),
        );

        let report = svc
            .upgrade(source.path(), base.path(), target.path())
            .unwrap();
        assert_eq!(report.added, ["custom/new.page"]);
        assert_eq!(
            report.auto_mergeable,
            ["Model/Account.resources.json", "Portal/Nav/Main.order.json"]
        );
        assert_eq!(report.manual_merge, ["web/home.page"]);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);

        assert_eq!(
            fs::read_to_string(target.path().join("custom/new.page")).unwrap(),
            "<mine/>"
        );
        let menu_bytes = fs::read(target.path().join("Portal/Nav/Main.order.json")).unwrap();
        let menu: serde_json::Value = serde_json::from_slice(&menu_bytes).unwrap();
        let ids: Vec<_> = menu["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, ["A", "B", "D"]);
        let resources: serde_json::Value = serde_json::from_slice(
            &fs::read(target.path().join("Model/Account.resources.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(
            resources,
            json!({"Badge": "New", "Help": "Accounts", "Title": "Customer"})
        );
        assert!(!target.path().join("web/home.page").exists());
    }
}

#[test]
fn renamed_and_edited_relationship_is_flagged() {
    for (svc, _guard) in services() {
        let base = tempfile::tempdir().unwrap();
        stock_tree(base.path());
        svc.register_project(base.path(), "Shop", v("1.0"), None, |_| {})
            .unwrap();

        let source = tempfile::tempdir().unwrap();
        stock_tree(source.path());
        fs::remove_file(source.path().join("Model/Account.Contact.1.relationship.json")).unwrap();
        put(
            source.path(),
            "Model/Customer.Contact.1.relationship.json",
            &relationship("2024-06-01T12:00:00Z", "Customer"),
        );

        let report = svc.analyze(source.path(), base.path()).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.warnings[0].path,
            "Model/Customer.Contact.1.relationship.json"
        );
    }
}

#[test]
fn registration_windows_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = UpgradeConfig {
        registry_path: dir.path().join("releases.db"),
        batch_size: 2,
        ..Default::default()
    };
    let base = tempfile::tempdir().unwrap();
    stock_tree(base.path());

    let mut windows = 0;
    {
        let svc = UpgradeService::open(config.clone()).unwrap();
        svc.register_project(base.path(), "Shop", v("1.0"), None, |_| windows += 1)
            .unwrap();
    }
    assert_eq!(windows, 3);

    let svc = UpgradeService::open(config).unwrap();
    assert_eq!(svc.registry().file_count().unwrap(), 5);
    assert_eq!(svc.lookup("shop.dll", true).unwrap().len(), 1);
}

//! End-to-end tests for the fetch → cache → unpack pipeline.

use dewy::deploy::DeployerBuilder;
use dewy::kvs::{FileBuilder, Kvs};
use dewy::release::Release;
use dewy::Error;

use std::fs;
use std::sync::Arc;

mod common;
use common::helpers::*;

#[tokio::test]
async fn test_deploy_downloads_caches_and_unpacks() {
    let temp_dir = create_temp_dir();
    let store = Arc::new(create_test_store(temp_dir.path(), 1024 * 1024));
    let server = serve(vec![("/download/v1.0.0.zip", 200, create_release_zip_bytes())]);
    let deployer = DeployerBuilder::new()
        .store(store.clone())
        .activation_dir(temp_dir.path().join("releases"))
        .retries(0)
        .system_proxy(false)
        .build()
        .unwrap();

    let release = Release::try_from(server.url("/download/v1.0.0.zip").as_str()).unwrap();
    let deployment = deployer.deploy(&release).await.unwrap();

    assert!(!deployment.from_cache);
    assert_eq!(deployment.key, "v1.0.0.zip");
    assert_eq!(deployment.archive, store.root_path().join("v1.0.0.zip"));
    assert_eq!(deployment.destination, temp_dir.path().join("releases").join("v1.0.0"));
    assert_eq!(deployment.extracted, deployment.destination.join("app").join("config.toml"));
    assert_eq!(deployment.top_level, vec!["app".to_string()]);
    assert_eq!(deployment.root(), deployment.destination.join("app"));
    assert_eq!(
        fs::read(deployment.root().join("config.toml")).unwrap(),
        b"port = 8000\n"
    );
    assert_eq!(store.list().unwrap(), vec!["v1.0.0.zip".to_string()]);
}

#[tokio::test]
async fn test_deploy_reuses_cached_archive() {
    let temp_dir = create_temp_dir();
    let store = Arc::new(create_test_store(temp_dir.path(), 1024 * 1024));
    let server = serve(vec![("/v2.zip", 200, create_release_zip_bytes())]);
    let deployer = DeployerBuilder::new()
        .store(store.clone())
        .activation_dir(temp_dir.path().join("releases"))
        .retries(0)
        .system_proxy(false)
        .build()
        .unwrap();
    let release = Release::try_from(server.url("/v2.zip").as_str()).unwrap();

    deployer.deploy(&release).await.unwrap();
    let second = deployer.deploy(&release).await.unwrap();

    assert!(second.from_cache);
    assert_eq!(server.hits(), 1);

    deployer.invalidate("v2.zip").unwrap();
    let third = deployer.deploy(&release).await.unwrap();

    assert!(!third.from_cache);
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn test_deploy_respects_store_ceiling() {
    let temp_dir = create_temp_dir();
    let store = Arc::new(
        FileBuilder::new()
            .directory(temp_dir.path().join("cache"))
            .max_size(64)
            .build()
            .unwrap(),
    );
    let server = serve(vec![("/v3.zip", 200, create_release_zip_bytes())]);
    let deployer = DeployerBuilder::new()
        .store(store.clone())
        .activation_dir(temp_dir.path().join("releases"))
        .retries(0)
        .system_proxy(false)
        .build()
        .unwrap();
    let release = Release::try_from(server.url("/v3.zip").as_str()).unwrap();

    let result = deployer.deploy(&release).await;

    assert!(matches!(result, Err(Error::CapacityExceeded { max_size: 64, .. })));
    assert!(store.list().unwrap().is_empty());
    assert!(!temp_dir.path().join("releases").exists());
}

#[tokio::test]
async fn test_deploy_rejects_corrupt_artifact() {
    let temp_dir = create_temp_dir();
    let store = Arc::new(create_test_store(temp_dir.path(), 1024 * 1024));
    let server = serve(vec![("/broken.zip", 200, b"definitely not a zip".to_vec())]);
    let deployer = DeployerBuilder::new()
        .store(store.clone())
        .activation_dir(temp_dir.path().join("releases"))
        .retries(0)
        .system_proxy(false)
        .build()
        .unwrap();
    let release = Release::try_from(server.url("/broken.zip").as_str()).unwrap();

    let result = deployer.deploy(&release).await;

    assert!(matches!(result, Err(Error::ArchiveOpen { .. })));
    // The artifact stays cached; invalidating it is the caller's decision.
    assert!(store.contains("broken.zip").unwrap());
}

#[tokio::test]
async fn test_concurrent_deploys_of_same_release() {
    let temp_dir = create_temp_dir();
    let store = Arc::new(create_test_store(temp_dir.path(), 1024 * 1024));
    let server = serve(vec![("/v4.zip", 200, create_release_zip_bytes())]);
    let deployer = DeployerBuilder::new()
        .store(store.clone())
        .activation_dir(temp_dir.path().join("releases"))
        .retries(0)
        .system_proxy(false)
        .build()
        .unwrap();
    let release = Release::try_from(server.url("/v4.zip").as_str()).unwrap();

    let (first, second) = tokio::join!(deployer.deploy(&release), deployer.deploy(&release));

    let first = first.unwrap();
    let second = second.unwrap();
    assert!(!first.from_cache || !second.from_cache);
    assert_eq!(first.destination, second.destination);
    assert_eq!(store.list().unwrap(), vec!["v4.zip".to_string()]);
    assert_eq!(
        fs::read(first.root().join("config.toml")).unwrap(),
        b"port = 8000\n"
    );
}

#[test]
fn test_builder_getters() {
    let temp_dir = create_temp_dir();
    let deployer = DeployerBuilder::new()
        .store(Arc::new(create_test_store(temp_dir.path(), 1024)))
        .activation_dir(temp_dir.path().join("releases"))
        .retries(7)
        .build()
        .unwrap();

    assert_eq!(deployer.activation_dir(), temp_dir.path().join("releases"));
    assert_eq!(deployer.retries(), 7);
    assert_eq!(deployer.store().max_size(), 1024);
}

//! Deploying to and resolving from repositories over HTTP and FTP

mod common;

use std::fs;

use artship::config::RepositoryConfig;
use artship::core::checksum::calculate_checksum;
use artship::deploy::{Coordinates, Deployer};
use artship::error::ArtshipError;
use artship::protocol::ftp::FileType;
use artship::resolver::{Artifact, ArtifactResolver, Capabilities, RemoteRepositoryResolver, RepositoryResolver};
use common::{quiet_config, FakeFtpServer, FakeHttpServer};
use tempfile::tempdir;

const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

#[test]
fn test_deploy_over_http() {
    let server = FakeHttpServer::start();
    let dir = tempdir().unwrap();
    let file = dir.path().join("app.jar");
    fs::write(&file, b"hello world").unwrap();

    let coordinates = Coordinates::for_file(&file, "org.example", "app", "1.0").unwrap();
    let receipt = Deployer::new(quiet_config())
        .deploy(&file, &coordinates, &server.url("/releases/"))
        .unwrap();

    assert_eq!(receipt.artifact_url, server.url("/releases/org/example/app/1.0/app-1.0.jar"));
    assert_eq!(receipt.bytes, 11);
    assert_eq!(receipt.checksum, HELLO_SHA256);
    assert_eq!(server.get("/releases/org/example/app/1.0/app-1.0.jar").unwrap(), b"hello world");
    assert_eq!(
        server.get("/releases/org/example/app/1.0/app-1.0.jar.sha256").unwrap(),
        HELLO_SHA256.as_bytes()
    );
}

#[test]
fn test_deploy_over_ftp_with_classifier() {
    let server = FakeFtpServer::start();
    let dir = tempdir().unwrap();
    let file = dir.path().join("app.zip");
    fs::write(&file, vec![9u8; 4096]).unwrap();

    let mut config = quiet_config();
    config.ftp.file_type = FileType::Binary;
    let coordinates = Coordinates::for_file(&file, "org.example", "app", "2.1")
        .unwrap()
        .with_classifier(Some("dist"));
    Deployer::new(config)
        .deploy(&file, &coordinates, &server.url("/repo"))
        .unwrap();

    assert_eq!(server.get("/repo/org/example/app/2.1/app-2.1-dist.zip").unwrap(), vec![9u8; 4096]);
    assert_eq!(
        server.get("/repo/org/example/app/2.1/app-2.1-dist.zip.sha256").unwrap(),
        calculate_checksum(&file).unwrap().as_bytes()
    );
}

#[test]
fn test_deploy_over_ftp_keeps_binary_bytes() {
    let server = FakeFtpServer::start();
    let dir = tempdir().unwrap();
    let file = dir.path().join("app.jar");
    // Zip header with bare CR and LF bytes that ASCII mode would rewrite
    let payload = [80u8, 75, 3, 4, 10, 0, 13, 1, 10, 255];
    fs::write(&file, payload).unwrap();

    let coordinates = Coordinates::for_file(&file, "org.example", "app", "1.0").unwrap();
    let config = quiet_config();
    assert_eq!(config.ftp.file_type, FileType::Ascii);
    Deployer::new(config)
        .deploy(&file, &coordinates, &server.url("/repo"))
        .unwrap();

    assert_eq!(server.get("/repo/org/example/app/1.0/app-1.0.jar").unwrap(), payload);
    assert_eq!(
        server.get("/repo/org/example/app/1.0/app-1.0.jar.sha256").unwrap(),
        calculate_checksum(&file).unwrap().as_bytes()
    );
    assert!(server.saw("TYPE I"));
    assert!(!server.saw("TYPE A"));
}

#[test]
fn test_resolve_over_ftp_keeps_binary_bytes() {
    let server = FakeFtpServer::start();
    let payload = [80u8, 75, 3, 4, 13, 10, 0, 10, 13, 255];
    server.put("/repo/org/example/lib/3.0/lib-3.0.jar", &payload);

    let dir = tempdir().unwrap();
    let mut config = quiet_config();
    config.repository.local = dir.path().join("local");
    config.repository.remotes = vec![server.url("/repo")];

    let resolver = RemoteRepositoryResolver::new(&config);
    let artifact = Artifact::parse("org.example:lib:3.0").unwrap();
    let path = resolver.resolve_file(&artifact).unwrap().unwrap();

    assert_eq!(fs::read(&path).unwrap(), payload);
    assert!(server.saw("TYPE I"));
}

#[test]
fn test_resolve_reports_aborted_ftp_transfer() {
    let server = FakeFtpServer::start();
    server.put("/repo/org/example/lib/3.0/lib-3.0.jar", &[1u8; 4096]);
    server.abort("/repo/org/example/lib/3.0/lib-3.0.jar");

    let dir = tempdir().unwrap();
    let mut config = quiet_config();
    config.repository.local = dir.path().join("local");
    config.repository.remotes = vec![server.url("/repo")];

    let resolver = RemoteRepositoryResolver::new(&config);
    let artifact = Artifact::parse("org.example:lib:3.0").unwrap();
    assert!(resolver.resolve_file(&artifact).is_err());
    assert!(!dir.path().join("local/org/example/lib/3.0/lib-3.0.jar").exists());
}

#[test]
fn test_deploy_failure_is_wrapped() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("app.jar");
    fs::write(&file, b"x").unwrap();

    let coordinates = Coordinates::for_file(&file, "org.example", "app", "1.0").unwrap();
    // Nothing listens on port 9 of the loopback interface
    let err = Deployer::new(quiet_config())
        .deploy(&file, &coordinates, "http://127.0.0.1:9/releases")
        .unwrap_err();

    match err {
        ArtshipError::Deploy(message) => {
            assert!(message.starts_with("Failed to deploy"), "{}", message);
            assert!(message.contains("org.example:app:1.0"), "{}", message);
        }
        other => panic!("expected a deploy error, got {:?}", other),
    }
}

#[test]
fn test_resolve_downloads_into_local_repository() {
    let server = FakeHttpServer::start();
    server.put("/maven/org/example/lib/3.0/lib-3.0.jar", b"library bytes");

    let dir = tempdir().unwrap();
    let mut config = quiet_config();
    config.repository = RepositoryConfig {
        local: dir.path().join("local"),
        remotes: vec![server.url("/empty"), server.url("/maven")],
        offline: false,
    };

    let resolver = RepositoryResolver::select(&config, Capabilities { offline: false, has_remotes: true });
    let artifact = Artifact::parse("org.example:lib:3.0").unwrap();
    let path = resolver.resolve_file(&artifact).unwrap().unwrap();

    assert_eq!(path, dir.path().join("local/org/example/lib/3.0/lib-3.0.jar"));
    assert_eq!(fs::read(&path).unwrap(), b"library bytes");

    // Second lookup is served from the local repository
    server.files.lock().unwrap().clear();
    assert_eq!(resolver.resolve_file(&artifact).unwrap(), Some(path));
}

#[test]
fn test_resolve_missing_everywhere() {
    let server = FakeHttpServer::start();
    let dir = tempdir().unwrap();
    let mut config = quiet_config();
    config.repository.local = dir.path().join("local");
    config.repository.remotes = vec![server.url("/maven")];

    let resolver = RemoteRepositoryResolver::new(&config);
    let artifact = Artifact::parse("org.example:absent:1.0").unwrap();
    assert_eq!(resolver.resolve_file(&artifact).unwrap(), None);
}

#[test]
fn test_offline_resolution_ignores_remotes() {
    let server = FakeHttpServer::start();
    server.put("/maven/org/example/lib/3.0/lib-3.0.jar", b"library bytes");

    let dir = tempdir().unwrap();
    let mut config = quiet_config();
    config.repository.local = dir.path().join("local");
    config.repository.remotes = vec![server.url("/maven")];

    let resolver = RepositoryResolver::select(&config, Capabilities { offline: true, has_remotes: true });
    let artifact = Artifact::parse("org.example:lib:3.0").unwrap();
    assert_eq!(resolver.name(), "local repository");
    assert_eq!(resolver.resolve_file(&artifact).unwrap(), None);
}

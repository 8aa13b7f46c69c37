use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use dewy::kvs::{CapacityCheck, File, FileBuilder};
use dewy::HttpClientConfig;

/// Creates a temporary directory for testing purposes
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Creates test file content of specified size
pub fn create_test_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Creates a store rooted at `dir/cache` with the given ceiling
pub fn create_test_store(dir: &Path, max_size: u64) -> File {
    FileBuilder::new()
        .directory(dir.join("cache"))
        .max_size(max_size)
        .build()
        .expect("Failed to create store")
}

/// Creates a store using the directory-size capacity check
pub fn create_directory_size_store(dir: &Path, max_size: u64) -> File {
    FileBuilder::new()
        .directory(dir.to_path_buf())
        .max_size(max_size)
        .capacity_check(CapacityCheck::DirectorySize)
        .build()
        .expect("Failed to create store")
}

/// Asserts that a file exists at the given path
pub fn assert_file_exists(path: &Path) {
    assert!(path.exists(), "File should exist at path: {:?}", path);
}

/// Returns the permission bits of a path
#[cfg(unix)]
pub fn mode_of(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .expect("Failed to get metadata")
        .permissions()
        .mode()
        & 0o777
}

// === Zip Fixtures ===

/// One member of a test archive
pub enum Entry<'a> {
    Dir(&'a str, u32),
    Stored(&'a str, &'a [u8], u32),
    Deflated(&'a str, &'a [u8], u32),
}

/// Writes a zip archive with the given entries and returns its path
pub fn create_test_zip(dir: &Path, filename: &str, entries: &[Entry<'_>]) -> PathBuf {
    let path = dir.join(filename);
    fs::write(&path, create_test_zip_bytes(entries)).expect("Failed to write zip");
    path
}

/// Builds the bytes of a zip archive with the given entries
pub fn create_test_zip_bytes(entries: &[Entry<'_>]) -> Vec<u8> {
    let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for entry in entries {
        match entry {
            Entry::Dir(name, mode) => {
                let options = FileOptions::default().unix_permissions(*mode);
                writer.add_directory(*name, options).expect("Failed to add directory");
            }
            Entry::Stored(name, content, mode) => {
                let options = FileOptions::default()
                    .compression_method(CompressionMethod::Stored)
                    .unix_permissions(*mode);
                writer.start_file(*name, options).expect("Failed to start file");
                writer.write_all(content).expect("Failed to write entry");
            }
            Entry::Deflated(name, content, mode) => {
                let options = FileOptions::default()
                    .compression_method(CompressionMethod::Deflated)
                    .unix_permissions(*mode);
                writer.start_file(*name, options).expect("Failed to start file");
                writer.write_all(content).expect("Failed to write entry");
            }
        }
    }
    writer.finish().expect("Failed to finish zip").into_inner()
}

/// A typical release archive: one top-level directory holding a binary and a config
pub fn create_release_zip_bytes() -> Vec<u8> {
    create_test_zip_bytes(&[
        Entry::Dir("app/", 0o755),
        Entry::Deflated("app/server", b"#!/bin/sh\necho serving\n", 0o755),
        Entry::Stored("app/config.toml", b"port = 8000\n", 0o644),
    ])
}

// === HTTP Server ===

/// A minimal HTTP/1.1 server answering GET requests from a fixed route table
pub struct TestServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
}

impl TestServer {
    /// Full URL of `path` on this server
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Number of requests served so far
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Serves `routes` (path, status, body) on an ephemeral local port
pub fn serve(routes: Vec<(&'static str, u16, Vec<u8>)>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local address");
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            counter.fetch_add(1, Ordering::SeqCst);

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        request.extend_from_slice(&buf[..n]);
                        if request.windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }
                }
            }

            let request = String::from_utf8_lossy(&request);
            let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
            let (status, body) = routes
                .iter()
                .find(|(p, _, _)| *p == path)
                .map(|(_, status, body)| (*status, body.clone()))
                .unwrap_or((404, b"not found".to_vec()));
            let reason = match status {
                200 => "OK",
                404 => "Not Found",
                _ => "Error",
            };

            let header = format!(
                "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
                status,
                reason,
                body.len()
            );
            let _ = stream.write_all(header.as_bytes());
            let _ = stream.write_all(&body);
            let _ = stream.flush();
        }
    });

    TestServer {
        base_url: format!("http://{}", addr),
        hits,
    }
}

/// HTTP settings for talking to the local test server
pub fn create_test_http_config() -> HttpClientConfig {
    HttpClientConfig {
        retries: 0,
        system_proxy: false,
        ..HttpClientConfig::default()
    }
}

#![cfg(feature = "preview")]

use folio::preview::PreviewServer;
use tempfile::TempDir;

fn site_root() -> TempDir {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("images")).unwrap();
    std::fs::write(root.path().join("index.html"), "<html><body>home</body></html>").unwrap();
    std::fs::write(root.path().join("images/blue-lungs-400w.webp"), b"RIFF....WEBP").unwrap();
    std::fs::write(root.path().join("images/café.webp"), b"RIFF....WEBP").unwrap();
    root
}

/// Serve a fresh site on a free port; the directory lives as long as the
/// returned guard
fn start_test_server() -> (TempDir, String) {
    let root = site_root();
    let server = PreviewServer::bind(root.path(), "127.0.0.1:0").unwrap();
    let addr = server.server_addr().unwrap();
    std::thread::spawn(move || {
        let _ = server.serve();
    });
    (root, format!("http://{}", addr))
}

#[test]
fn test_serves_index_for_directories() {
    let (_site, base) = start_test_server();
    let resp = reqwest::blocking::get(format!("{}/", base)).unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "text/html; charset=utf-8"
    );
    assert!(resp.text().unwrap().contains("home"));
}

#[test]
fn test_content_type_follows_extension() {
    let (_site, base) = start_test_server();
    let resp = reqwest::blocking::get(format!("{}/images/blue-lungs-400w.webp", base)).unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers()["content-type"].to_str().unwrap(), "image/webp");
}

#[test]
fn test_missing_file_is_404() {
    let (_site, base) = start_test_server();
    let resp = reqwest::blocking::get(format!("{}/css/missing.css", base)).unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[test]
fn test_encoded_traversal_is_rejected() {
    let (_site, base) = start_test_server();
    let resp = reqwest::blocking::get(format!("{}/images/..%2F..%2F..%2Fetc%2Fpasswd", base)).unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[test]
fn test_only_get_and_head_are_served() {
    let (_site, base) = start_test_server();
    let client = reqwest::blocking::Client::new();
    let resp = client.post(format!("{}/", base)).body("x").send().unwrap();
    assert_eq!(resp.status().as_u16(), 405);
}

#[test]
fn test_non_ascii_file_names_are_served() {
    let (_site, base) = start_test_server();
    let resp = reqwest::blocking::get(format!("{}/images/caf%C3%A9.webp", base)).unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers()["content-type"].to_str().unwrap(), "image/webp");
}

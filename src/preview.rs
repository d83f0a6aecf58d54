//! Local preview server for a built site.

use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};
use url::Url;

#[cfg(feature = "preview")]
use crate::{Error, Result};
#[cfg(feature = "preview")]
use std::fs::File;
#[cfg(feature = "preview")]
use std::net::SocketAddr;
#[cfg(feature = "preview")]
use tiny_http::{Header, Method, Request, Response, Server};

pub const DEFAULT_PORT: u16 = 4173;

/// Content type for a file, by extension
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "json" | "webmanifest" => "application/json",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "ico" => "image/x-icon",
        "woff2" => "font/woff2",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(not(feature = "preview"), allow(dead_code))]
enum Resolved {
    File(PathBuf),
    NotFound,
    Forbidden,
}

/// Map a request target onto a file under `root`. Dot segments are
/// resolved by URL parsing; anything that still escapes `root` (say through
/// an encoded separator or a symlink) is forbidden.
#[cfg_attr(not(feature = "preview"), allow(dead_code))]
fn resolve(root: &Path, target: &str) -> Resolved {
    let Ok(url) = Url::parse("http://preview.local/").and_then(|base| base.join(target)) else {
        return Resolved::Forbidden;
    };
    let mut path = root.to_path_buf();
    for segment in url.path_segments().into_iter().flatten() {
        if segment.is_empty() {
            continue;
        }
        let lowered = segment.to_ascii_lowercase();
        if lowered.contains("%2f") || lowered.contains("%5c") || segment.contains('\\') {
            return Resolved::Forbidden;
        }
        let Ok(decoded) = percent_decode_str(segment).decode_utf8() else {
            return Resolved::NotFound;
        };
        if Path::new(decoded.as_ref())
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Resolved::Forbidden;
        }
        path.push(decoded.as_ref());
    }
    if path.is_dir() {
        path.push("index.html");
    }

    let (Ok(canonical), Ok(root)) = (path.canonicalize(), root.canonicalize()) else {
        return Resolved::NotFound;
    };
    if !canonical.starts_with(&root) {
        return Resolved::Forbidden;
    }
    if canonical.is_file() {
        Resolved::File(canonical)
    } else {
        Resolved::NotFound
    }
}

#[cfg(feature = "preview")]
fn header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes())
        .map_err(|_| Error::ServerError(format!("invalid header {}: {}", name, value)))
}

#[cfg(feature = "preview")]
pub struct PreviewServer {
    server: Server,
    root: PathBuf,
}

#[cfg(feature = "preview")]
impl PreviewServer {
    /// Bind to `addr` (e.g. `127.0.0.1:4173`; port 0 picks a free one)
    pub fn bind(root: impl Into<PathBuf>, addr: &str) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::ServerError(format!("{} is not a directory", root.display())));
        }
        let server = Server::http(addr).map_err(|e| Error::ServerError(e.to_string()))?;
        Ok(Self { server, root })
    }

    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serve until the listener shuts down
    pub fn serve(&self) -> Result<()> {
        if let Some(addr) = self.server_addr() {
            log::info!("serving {} at http://{}/", self.root.display(), addr);
        }
        for request in self.server.incoming_requests() {
            if let Err(e) = self.handle(request) {
                log::warn!("preview request failed: {}", e);
            }
        }
        Ok(())
    }

    fn handle(&self, request: Request) -> Result<()> {
        let target = request.url().to_string();
        if !matches!(request.method(), Method::Get | Method::Head) {
            log::debug!("{} {} -> 405", request.method(), target);
            let resp = Response::from_string("Method Not Allowed").with_status_code(405);
            return Ok(request.respond(resp)?);
        }

        match resolve(&self.root, &target) {
            Resolved::File(path) => {
                log::debug!("GET {} -> 200 {}", target, path.display());
                let resp = Response::from_file(File::open(&path)?)
                    .with_header(header("Content-Type", content_type(&path))?);
                request.respond(resp)?;
            }
            Resolved::NotFound => {
                log::debug!("GET {} -> 404", target);
                let resp = Response::from_string("Not Found")
                    .with_status_code(404)
                    .with_header(header("Content-Type", "text/plain; charset=utf-8")?);
                request.respond(resp)?;
            }
            Resolved::Forbidden => {
                log::warn!("rejected request outside the site root: {}", target);
                let resp = Response::from_string("Forbidden").with_status_code(403);
                request.respond(resp)?;
            }
        }
        Ok(())
    }
}

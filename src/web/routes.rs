//! File service router.
//!
//! | Route | Behaviour |
//! |-------|-----------|
//! | `GET /` | HTML listing with download / delete links |
//! | `GET /list` | `{"files":[{"name","size"}],"used","total"}` |
//! | `GET /download?file=` | file bytes, 404 if absent |
//! | `GET /delete?file=` | 400 if `file` missing, 500 if delete fails |
//!
//! Handlers talk to the [`FileStorePort`] only; the capture buffer and the
//! NVS snapshot are out of reach from here.

use log::{info, warn};
use serde::Serialize;

use super::codec::{Method, Request, Response};
use super::page;
use crate::app::ports::{FileEntry, FileStorePort, FsError};

#[derive(Serialize)]
struct Listing<'a> {
    files: &'a [FileEntry],
    used: u64,
    total: u64,
}

/// Stateless router over the file store.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileService;

impl FileService {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, req: &Request, files: &mut dyn FileStorePort) -> Response {
        if req.method != Method::Get {
            return Response::text(405, "method not allowed").with_header("Allow", "GET".into());
        }

        match req.path.as_str() {
            "/" => self.index(files),
            "/list" => self.list(files),
            "/download" => self.download(req, files),
            "/delete" => self.delete(req, files),
            _ => Response::text(404, "not found"),
        }
    }

    fn index(&self, files: &dyn FileStorePort) -> Response {
        let listing = files
            .list()
            .and_then(|entries| files.usage().map(|usage| (entries, usage)));
        match listing {
            Ok((entries, usage)) => Response::html(page::render_index(&entries, usage)),
            Err(e) => Response::new(500, "text/html; charset=utf-8", page::render_unavailable(e)),
        }
    }

    fn list(&self, files: &dyn FileStorePort) -> Response {
        let (entries, usage) = match files.list().and_then(|e| files.usage().map(|u| (e, u))) {
            Ok(v) => v,
            Err(e) => return Response::text(500, &format!("cannot list files: {e}")),
        };
        let body = Listing {
            files: &entries,
            used: usage.used,
            total: usage.total,
        };
        match serde_json::to_string(&body) {
            Ok(json) => Response::json(json),
            Err(_) => Response::text(500, "serialisation failed"),
        }
    }

    fn download(&self, req: &Request, files: &dyn FileStorePort) -> Response {
        let name = match file_param(req) {
            Ok(name) => name,
            Err(resp) => return resp,
        };
        match files.read(&name) {
            Ok(bytes) => {
                info!("http: download {} ({} bytes)", name, bytes.len());
                let base = name.rsplit('/').next().unwrap_or(&name).to_string();
                Response::new(200, "text/plain; charset=utf-8", bytes).with_header(
                    "Content-Disposition",
                    format!("attachment; filename=\"{base}\""),
                )
            }
            // The store is flat: a nested name can never exist in it.
            Err(FsError::NotFound | FsError::InvalidName) => Response::text(404, "file not found"),
            Err(e) => Response::text(500, &format!("read failed: {e}")),
        }
    }

    fn delete(&self, req: &Request, files: &mut dyn FileStorePort) -> Response {
        let name = match file_param(req) {
            Ok(name) => name,
            Err(resp) => return resp,
        };
        match files.delete(&name) {
            Ok(()) => {
                info!("http: deleted {}", name);
                Response::text(200, &format!("deleted {name}"))
            }
            Err(e) => {
                warn!("http: delete {} failed ({})", name, e);
                Response::text(500, &format!("delete failed: {e}"))
            }
        }
    }
}

/// Extract and normalise the `file` parameter.
fn file_param(req: &Request) -> Result<String, Response> {
    let raw = req.param("file").map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(Response::text(400, "missing 'file' parameter"));
    }
    normalise_name(raw).ok_or_else(|| Response::text(400, "invalid file name"))
}

/// Prefix a `/` if missing; reject anything that walks out of the store.
pub fn normalise_name(raw: &str) -> Option<String> {
    if raw.split(['/', '\\']).any(|seg| seg == "..") || raw.contains('\0') {
        return None;
    }
    if raw.starts_with('/') {
        Some(raw.to_string())
    } else {
        Some(format!("/{raw}"))
    }
}

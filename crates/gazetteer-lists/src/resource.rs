//! Resolving, decoding and writing list and definition resources.
//!
//! Locations are plain filesystem paths or `file://` URLs. Reads are
//! BOM-aware: a UTF-8 or UTF-16 byte order mark overrides the configured
//! encoding and is stripped from the decoded text.

use std::io::Write;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use url::Url;

use crate::ListsError;

/// Turn a configured location into a filesystem path.
pub fn resolve_location(location: &str) -> Result<PathBuf, ListsError> {
    if !looks_like_url(location) {
        return Ok(PathBuf::from(location));
    }
    let url = Url::parse(location)
        .map_err(|e| ListsError::resource(location, format!("malformed URL: {e}")))?;
    if url.scheme() != "file" {
        return Err(ListsError::resource(
            location,
            format!("unsupported URL scheme '{}'", url.scheme()),
        ));
    }
    url.to_file_path()
        .map_err(|()| ListsError::resource(location, "URL does not name a local file"))
}

/// Resolve a list name against the directory of the definition file.
///
/// Absolute paths and URLs are used as they are.
pub fn resolve_relative(base: Option<&Path>, name: &str) -> Result<PathBuf, ListsError> {
    let path = resolve_location(name)?;
    if path.is_absolute() {
        return Ok(path);
    }
    let dir = base
        .and_then(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty());
    Ok(match dir {
        Some(dir) => dir.join(path),
        None => path,
    })
}

fn looks_like_url(location: &str) -> bool {
    location.contains("://") || location.starts_with("file:")
}

/// Look up an encoding by its WHATWG label (`"UTF-8"`, `"latin1"`, ...).
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding, ListsError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| ListsError::resource(label, "unknown character encoding"))
}

/// Read a whole resource and decode it, honoring a leading byte order mark.
pub fn read_text(path: &Path, encoding: &'static Encoding) -> Result<String, ListsError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ListsError::resource(path.display(), format!("cannot read: {e}")))?;
    let (text, used, had_errors) = encoding.decode(&bytes);
    if had_errors {
        tracing::warn!(
            path = %path.display(),
            encoding = used.name(),
            "malformed byte sequences replaced while decoding"
        );
    }
    Ok(text.into_owned())
}

/// Replace the file at `path` with `contents`.
///
/// The text is written to a temporary file in the same directory first and
/// then moved over the target, so readers never observe a partial file. An
/// existing target keeps its permissions.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), ListsError> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let unwritable = |e: &dyn std::fmt::Display| {
        ListsError::resource(path.display(), format!("cannot write: {e}"))
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| unwritable(&e))?;
    if let Ok(existing) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(existing.permissions())
            .map_err(|e| unwritable(&e))?;
    }
    tmp.write_all(contents.as_bytes()).map_err(|e| unwritable(&e))?;
    tmp.flush().map_err(|e| unwritable(&e))?;
    tmp.persist(path).map_err(|e| unwritable(&e.error))?;
    Ok(())
}

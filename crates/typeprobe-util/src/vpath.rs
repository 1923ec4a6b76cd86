//! Path arithmetic for the in-memory package file system.
//!
//! Virtual paths are always absolute, `/`-separated strings such as
//! `/node_modules/pkg/dist/index.js`. They never touch the host file system,
//! so `std::path` (with its platform-specific separators) is not used here.

/// Normalize a virtual path: collapse repeated separators and resolve
/// `.` and `..` segments. The result always starts with `/`.
#[must_use]
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    let mut out = String::with_capacity(path.len() + 1);
    for segment in &segments {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Join a relative path onto a directory and normalize the result.
///
/// If `rel` is already absolute it replaces `dir`.
#[must_use]
pub fn join(dir: &str, rel: &str) -> String {
    if rel.starts_with('/') {
        return normalize(rel);
    }
    normalize(&format!("{dir}/{rel}"))
}

/// Directory portion of a path (`/a/b/c.js` -> `/a/b`).
#[must_use]
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

/// Final segment of a path (`/a/b/c.js` -> `c.js`).
#[must_use]
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// All ancestor directories of `dir`, nearest first, ending with `/`.
#[must_use]
pub fn ancestors(dir: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut current = dir;
    loop {
        out.push(current);
        if current == "/" {
            break;
        }
        current = dirname(current);
    }
    out
}

/// Whether a module specifier is relative (`./x`, `../x`, `.` or `..`).
#[must_use]
pub fn is_relative_specifier(spec: &str) -> bool {
    spec == "." || spec == ".." || spec.starts_with("./") || spec.starts_with("../")
}

/// Express `path` relative to `base_dir`, if it lives below it.
#[must_use]
pub fn strip_dir<'a>(path: &'a str, base_dir: &str) -> Option<&'a str> {
    let base = base_dir.trim_end_matches('/');
    path.strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('/'))
}

// Lightweight path display wrapper that renders with forward slashes.
// Avoids allocating strings until actually formatted for console output.
pub(crate) struct DisplayPath<'a>(pub(crate) &'a std::path::Path);

impl<'a> std::fmt::Display for DisplayPath<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.0.to_string_lossy().to_string();
        let out = normalize_path(&s, true);
        f.write_str(&out)
    }
}

pub(crate) fn display_path(p: &std::path::Path) -> DisplayPath<'_> {
    DisplayPath(p)
}

/// Normalize a path-like string for internal use:
/// - converts backslashes to forward slashes
/// - collapses repeated slashes
/// - optionally preserves a trailing slash
///
/// Remote roots typed by the user (`/sdcard/DCIM/`, `//sdcard//DCIM`) go
/// through this before any ancestor comparison.
pub fn normalize_path(p: &str, preserve_trailing_slash: bool) -> String {
    if p.is_empty() {
        return String::new();
    }
    let mut s = p.replace('\\', "/");
    while s.contains("//") {
        s = s.replace("//", "/");
    }
    if !preserve_trailing_slash {
        // Strip trailing slashes, but keep root "/"
        while s.len() > 1 && s.ends_with('/') {
            s.pop();
        }
    }
    s
}

/// POSIX parent of a normalized remote path. The parent of `/` and of any
/// top-level entry is `/`.
pub fn remote_parent(p: &str) -> &str {
    match p.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &p[..idx],
    }
}

/// Component-wise `relative_to`: returns the part of `path` below `ancestor`,
/// or `None` when `path` is not a strict descendant. `/sdcard/DCIMX` is not
/// below `/sdcard/DCIM`.
pub fn relative_to<'a>(path: &'a str, ancestor: &str) -> Option<&'a str> {
    if ancestor == "/" {
        let rest = path.strip_prefix('/')?;
        return if rest.is_empty() { None } else { Some(rest) };
    }
    let rest = path.strip_prefix(ancestor)?.strip_prefix('/')?;
    if rest.is_empty() { None } else { Some(rest) }
}

/// Quote a path for the device shell that `adb shell` hands its arguments to.
pub fn shell_quote(p: &str) -> String {
    let mut out = String::with_capacity(p.len() + 2);
    out.push('"');
    for c in p.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

use anyhow::Result;
use std::path::Path;

use super::TransferItem;
use super::helpers::{normalize_path, relative_to, remote_parent};

#[derive(Clone, Copy, Debug)]
pub struct ResolveOptions {
    /// Drop items whose destination already exists locally.
    pub skip_existing: bool,
    /// Create missing parent directories of every emitted destination.
    pub create_parents: bool,
}

/// Destination path relative to `dest_root` for one remote path.
///
/// Rooted mode (`queried_root` given): relative to the parent of the queried
/// root, so querying `/sdcard/DCIM` lands files under `<dest>/DCIM/...`.
/// Flat mode: leading separators are stripped and nothing is validated.
/// Either way `.`/`..` and empty components are dropped so the result never
/// leaves `dest_root`.
fn relative_destination(path: &str, queried_root: Option<&str>) -> Result<String> {
    let rel = match queried_root {
        Some(root) => {
            let root_norm = normalize_path(root, false);
            let path_norm = normalize_path(path, false);
            let base = remote_parent(&root_norm);
            match relative_to(&path_norm, base) {
                Some(rel) => rel.to_string(),
                None => {
                    return Err(crate::PullError::NotUnderQueriedRoot {
                        path: path.to_string(),
                        root: root.to_string(),
                    }
                    .into());
                }
            }
        }
        None => path.to_string(),
    };
    Ok(confine(&rel))
}

fn confine(rel: &str) -> String {
    rel.split('/')
        .filter(|c| !matches!(*c, "" | "." | ".."))
        .collect::<Vec<_>>()
        .join("/")
}

/// Map remote paths to `(source, destination)` pairs under `dest_root`.
///
/// All paths are validated before the filesystem is touched: a path outside
/// its queried root aborts the whole batch with no directories created.
/// Output order follows input order.
pub fn resolve_destinations(
    paths: &[String],
    dest_root: &Path,
    queried_root: Option<&str>,
    opts: ResolveOptions,
) -> Result<Vec<TransferItem>> {
    let relatives = paths
        .iter()
        .map(|p| relative_destination(p, queried_root).map(|rel| (p, rel)))
        .collect::<Result<Vec<_>>>()?;

    let mut items = Vec::with_capacity(relatives.len());
    for (src, rel) in relatives {
        if rel.is_empty() {
            tracing::warn!("'{}' names no file below the destination, skipping", src);
            continue;
        }
        let dest = dest_root.join(&rel);
        if opts.skip_existing && dest.exists() {
            tracing::debug!("skip existing {}", dest.display());
            continue;
        }
        items.push(TransferItem { source: src.clone(), destination: dest });
    }
    if opts.create_parents {
        create_parent_dirs(&items)?;
    }
    Ok(items)
}

/// Create the missing parent directories of every destination. Idempotent.
pub fn create_parent_dirs(items: &[TransferItem]) -> Result<()> {
    for item in items {
        if let Some(parent) = item.destination.parent() {
            std::fs::create_dir_all(parent).map_err(|e| -> anyhow::Error {
                crate::PullError::CreateDirFailed {
                    path: parent.display().to_string(),
                    reason: e.to_string(),
                }
                .into()
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREATE: ResolveOptions = ResolveOptions { skip_existing: true, create_parents: true };

    #[test]
    fn rooted_mode_keeps_queried_directory_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = vec!["/sdcard/DCIM/100/img.jpg".to_string()];
        let items = resolve_destinations(&paths, dir.path(), Some("/sdcard/DCIM"), CREATE)
            .expect("resolve");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source, "/sdcard/DCIM/100/img.jpg");
        assert_eq!(items[0].destination, dir.path().join("DCIM/100/img.jpg"));
        assert!(dir.path().join("DCIM").join("100").is_dir());
    }

    #[test]
    fn rooted_mode_tolerates_trailing_slash_on_root() {
        let rel = relative_destination("/sdcard/DCIM/a.jpg", Some("/sdcard/DCIM/")).expect("rel");
        assert_eq!(rel, "DCIM/a.jpg");
    }

    #[test]
    fn single_file_root_lands_directly_under_dest() {
        let rel = relative_destination("/sdcard/a.jpg", Some("/sdcard/a.jpg")).expect("rel");
        assert_eq!(rel, "a.jpg");
    }

    #[test]
    fn flat_mode_strips_one_leading_slash() {
        assert_eq!(relative_destination("/a/b/c.txt", None).expect("rel"), "a/b/c.txt");
        assert_eq!(relative_destination("a/b", None).expect("rel"), "a/b");
    }

    #[test]
    fn flat_mode_never_escapes_the_destination() {
        assert_eq!(relative_destination("//x/y", None).expect("rel"), "x/y");
        assert_eq!(relative_destination("/a/../../etc/passwd", None).expect("rel"), "a/etc/passwd");
        assert_eq!(relative_destination("./a//b/", None).expect("rel"), "a/b");

        let dir = tempfile::tempdir().expect("tempdir");
        let paths = vec!["//x/y".to_string(), "/..".to_string()];
        let opts = ResolveOptions { skip_existing: false, create_parents: false };
        let items = resolve_destinations(&paths, dir.path(), None, opts).expect("resolve");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].destination, dir.path().join("x/y"));
        assert!(items[0].destination.starts_with(dir.path()));
    }

    #[test]
    fn path_outside_root_aborts_without_creating_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = vec!["/sdcard/DCIM/ok.jpg".to_string(), "/data/evil.jpg".to_string()];
        let err = resolve_destinations(&paths, dir.path(), Some("/sdcard/DCIM"), CREATE)
            .expect_err("must fail");
        assert!(err.to_string().contains("/data/evil.jpg"));
        assert!(!dir.path().join("DCIM").exists());
    }

    #[test]
    fn existing_destinations_are_dropped_silently() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("x")).expect("mkdir");
        std::fs::write(dir.path().join("x/1.jpg"), b"done").expect("write");
        let paths = vec!["/x/1.jpg".to_string(), "/x/2.jpg".to_string()];
        let items = resolve_destinations(&paths, dir.path(), None, CREATE).expect("resolve");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source, "/x/2.jpg");

        let keep = ResolveOptions { skip_existing: false, create_parents: true };
        let items = resolve_destinations(&paths, dir.path(), None, keep).expect("resolve");
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn dry_resolution_leaves_filesystem_alone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = vec!["/a/b/c.txt".to_string()];
        let opts = ResolveOptions { skip_existing: true, create_parents: false };
        let items = resolve_destinations(&paths, dir.path(), None, opts).expect("resolve");
        assert_eq!(items[0].destination, dir.path().join("a/b/c.txt"));
        assert!(!dir.path().join("a").exists());
    }
}

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Insertion-ordered set of candidate paths with O(1) removal.
/// Removed slots are tombstoned and skipped when the set is drained.
#[derive(Default)]
struct CandidateSet {
    entries: Vec<Option<String>>,
    index: HashMap<String, usize>,
}

impl CandidateSet {
    fn insert(&mut self, path: String) -> bool {
        if self.index.contains_key(&path) {
            return false;
        }
        self.index.insert(path.clone(), self.entries.len());
        self.entries.push(Some(path));
        true
    }

    fn remove(&mut self, path: &str) -> bool {
        match self.index.remove(path) {
            Some(slot) => {
                self.entries[slot] = None;
                true
            }
            None => false,
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.entries.into_iter().flatten().collect()
    }
}

fn join_remote(parent: &str, child: &str) -> String {
    if parent.ends_with('/') { format!("{}{}", parent, child) } else { format!("{}/{}", parent, child) }
}

/// Turn the output of `ls -R <queried_root>` into the list of remote files.
///
/// The listing is a sequence of blocks: a `/dir:` header line followed by the
/// names of its direct children. Every child (file or directory) is added to
/// the candidate set as soon as it is seen; a directory shows up again later
/// as its own block header, at which point it is removed. Whatever was never
/// promoted to a header is a file.
///
/// If the whole listing is a single line equal to `queried_root`, the root is
/// itself a file and the result is just that path.
///
/// An empty remote directory yields no entries, exactly like a missing one.
pub fn parse_listing(listing: &str, queried_root: &str) -> Vec<String> {
    let lines: Vec<&str> = listing.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.len() == 1 && lines[0] == queried_root {
        return vec![lines[0].to_string()];
    }

    let mut candidates = CandidateSet::default();
    let mut seen_headers: HashSet<String> = HashSet::new();
    let mut parent: Option<String> = None;

    for line in lines {
        if line.starts_with('/') {
            let header = line.trim_end_matches(':').to_string();
            candidates.remove(&header);
            if seen_headers.insert(header.clone()) {
                parent = Some(header);
            } else {
                tracing::warn!("directory '{}' listed twice; ignoring the repeated block", header);
                parent = None;
            }
            continue;
        }
        match parent.as_deref() {
            Some(p) => {
                candidates.insert(join_remote(p, line));
            }
            None => {
                tracing::warn!("ignoring listing line outside any directory block: {}", line);
            }
        }
    }
    candidates.into_vec()
}

/// Read a flat list of remote paths, one per line. Lines are trimmed and
/// blank lines are dropped.
pub fn read_filelist(input_file: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(input_file)
        .with_context(|| format!("failed to read list file {}", input_file.display()))?;
    Ok(content.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DCIM_LISTING: &str = "/sdcard/DCIM:\n100\nthumb.db\n\n/sdcard/DCIM/100:\nimg.jpg\nsub\n\n/sdcard/DCIM/100/sub:\nclip.mp4\n";

    #[test]
    fn directories_are_removed_when_their_header_appears() {
        let files = parse_listing(DCIM_LISTING, "/sdcard/DCIM");
        assert_eq!(
            files,
            vec!["/sdcard/DCIM/thumb.db", "/sdcard/DCIM/100/img.jpg", "/sdcard/DCIM/100/sub/clip.mp4"]
        );
    }

    #[test]
    fn no_output_path_is_a_header() {
        let files = parse_listing(DCIM_LISTING, "/sdcard/DCIM");
        let headers: Vec<&str> = DCIM_LISTING
            .lines()
            .filter(|l| l.starts_with('/'))
            .map(|l| l.trim_end_matches(':'))
            .collect();
        for f in &files {
            assert!(!headers.contains(&f.as_str()), "{} is a directory header", f);
        }
    }

    #[test]
    fn single_line_equal_to_root_is_a_file() {
        assert_eq!(parse_listing("/sdcard/a.jpg\r\n", "/sdcard/a.jpg"), vec!["/sdcard/a.jpg"]);
    }

    #[test]
    fn empty_listing_and_empty_directory_yield_nothing() {
        assert!(parse_listing("", "/sdcard/x").is_empty());
        assert!(parse_listing("/sdcard/Empty:\n", "/sdcard/Empty").is_empty());
    }

    #[test]
    fn carriage_returns_and_root_parent_are_handled() {
        let files = parse_listing("/:\r\nfoo\r\n", "/");
        assert_eq!(files, vec!["/foo"]);
    }

    #[test]
    fn repeated_header_block_is_ignored() {
        let listing = "/d:\nloop\na\n/d/loop:\nb\n/d/loop:\nc\n";
        assert_eq!(parse_listing(listing, "/d"), vec!["/d/a", "/d/loop/b"]);
    }

    #[test]
    fn lines_before_any_header_are_ignored() {
        let listing = "ls: /nope: No such file or directory\n";
        assert!(parse_listing(listing, "/nope").is_empty());
    }

    #[test]
    fn read_filelist_trims_and_drops_blank_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let p = dir.path().join("list.txt");
        std::fs::write(&p, "/a/b.txt\n  /c d/e.jpg  \n\n").expect("write");
        let list = read_filelist(&p).expect("read");
        assert_eq!(list, vec!["/a/b.txt", "/c d/e.jpg"]);
    }
}

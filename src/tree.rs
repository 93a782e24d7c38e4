//! Filesystem tree reporter
//!
//! Lazy depth-first walk of a directory with ignore-pattern pruning.
//! Replaces the two near-identical ad-hoc tree dump scripts with one
//! component configured by an ignore list and a truncation length.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Marker appended when file content exceeds the truncation length
pub const TRUNCATION_MARKER: &str = "...";

/// Pruning rules: substring patterns matched against the path plus
/// absolute path prefixes. A directory matching a rule is pruned before
/// descent, so its contents are never visited.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    patterns: Vec<String>,
    prefixes: Vec<PathBuf>,
}

impl IgnoreRules {
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            patterns,
            prefixes: Vec::new(),
        }
    }

    pub fn with_prefixes(mut self, prefixes: Vec<PathBuf>) -> Self {
        self.prefixes = prefixes;
        self
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        let display = path.to_string_lossy();
        self.patterns.iter().any(|p| display.contains(p.as_str()))
            || self.prefixes.iter().any(|prefix| path.starts_with(prefix))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
}

/// One node in the walk. `content` is populated for files when content
/// reading is enabled, already truncated.
#[derive(Debug, Clone)]
pub struct TreeEntry {
    pub path: PathBuf,
    pub depth: usize,
    pub kind: NodeKind,
    pub content: Option<String>,
}

/// Lazy depth-first iterator over a directory tree. Within a directory,
/// files are yielded first (sorted by name), then subdirectories.
pub struct TreeWalker {
    stack: Vec<(PathBuf, usize, Option<NodeKind>)>,
    rules: IgnoreRules,
    read_contents: bool,
    max_chars: usize,
}

impl TreeWalker {
    pub fn new(root: impl Into<PathBuf>, rules: IgnoreRules) -> Self {
        Self {
            // The root is classified lazily; it is walked even when it is
            // itself a symlink, since the caller named it explicitly
            stack: vec![(root.into(), 0, None)],
            rules,
            read_contents: false,
            max_chars: 500,
        }
    }

    /// Include (truncated) file contents in yielded entries
    pub fn with_contents(mut self, max_chars: usize) -> Self {
        self.read_contents = true;
        self.max_chars = max_chars;
        self
    }

    fn expand_directory(&mut self, path: &Path, depth: usize) {
        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), "cannot read directory: {}", e);
                return;
            }
        };

        let mut files = Vec::new();
        let mut dirs = Vec::new();
        for entry in entries.flatten() {
            let child = entry.path();
            if self.rules.is_ignored(&child) {
                continue;
            }
            // Classify without following symlinks: a symlinked directory
            // is listed but never descended, so a link cycle cannot make
            // the walk revisit nodes
            match entry.file_type() {
                Ok(file_type) if file_type.is_dir() => dirs.push(child),
                Ok(_) => files.push(child),
                Err(e) => {
                    warn!(path = %child.display(), "cannot stat entry: {}", e);
                }
            }
        }
        files.sort();
        dirs.sort();

        // LIFO stack: push subdirectories first so files come out first
        for dir in dirs.into_iter().rev() {
            self.stack.push((dir, depth + 1, Some(NodeKind::Directory)));
        }
        for file in files.into_iter().rev() {
            self.stack.push((file, depth + 1, Some(NodeKind::File)));
        }
    }
}

impl Iterator for TreeWalker {
    type Item = TreeEntry;

    fn next(&mut self) -> Option<TreeEntry> {
        let (path, depth, kind) = self.stack.pop()?;
        let kind = kind.unwrap_or_else(|| {
            if path.is_dir() {
                NodeKind::Directory
            } else {
                NodeKind::File
            }
        });

        if kind == NodeKind::Directory {
            self.expand_directory(&path, depth);
            Some(TreeEntry {
                path,
                depth,
                kind: NodeKind::Directory,
                content: None,
            })
        } else {
            let content = self
                .read_contents
                .then(|| read_content(&path, self.max_chars));
            Some(TreeEntry {
                path,
                depth,
                kind: NodeKind::File,
                content,
            })
        }
    }
}

/// Read file content as text, truncated to `max_chars`. Content that is
/// not valid UTF-8 is retried as Latin-1; binary content and unreadable
/// files yield a bracketed placeholder instead of an error.
fn read_content(path: &Path, max_chars: usize) -> String {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => return format!("[{}]", crate::error::AppError::Io(e)),
    };

    // NUL bytes mean no text encoding applies; Latin-1 would only
    // produce garbage
    if bytes.contains(&0) {
        let err = crate::error::AppError::Decode("content is not text".to_string());
        return format!("[{}]", err);
    }

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => latin1(e.into_bytes()),
    };
    truncate(&text, max_chars)
}

/// Latin-1 decoding of NUL-free bytes: every byte maps to a code point
fn latin1(bytes: Vec<u8>) -> String {
    bytes.into_iter().map(|b| b as char).collect()
}

/// First `max_chars` characters plus the marker when content is longer
pub fn truncate(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let mut out: String = content.chars().take(max_chars).collect();
        out.push_str(TRUNCATION_MARKER);
        out
    }
}

/// Render one entry as an indented tree line (plus content lines for files)
pub fn render_entry(entry: &TreeEntry) -> String {
    let indent = "  ".repeat(entry.depth);
    let name = entry
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| entry.path.display().to_string());

    match entry.kind {
        NodeKind::Directory => format!("{}📁 {}\n", indent, name),
        NodeKind::File => {
            let mut out = format!("{}📄 {}\n", indent, name);
            if let Some(content) = &entry.content {
                out.push_str(&format!("{}   Content:\n", indent));
                for line in content.lines() {
                    out.push_str(&format!("{}   {}\n", indent, line));
                }
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn touch(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
    }

    #[test]
    fn walks_depth_first_with_files_before_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b.txt"), "b");
        touch(&root.join("a.txt"), "a");
        fs::create_dir(root.join("sub")).unwrap();
        touch(&root.join("sub/c.txt"), "c");

        let names: Vec<String> = TreeWalker::new(root, IgnoreRules::default())
            .map(|e| e.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        let expected: Vec<String> = vec![
            root.file_name().unwrap().to_string_lossy().into_owned(),
            "a.txt".into(),
            "b.txt".into(),
            "sub".into(),
            "c.txt".into(),
        ];
        assert_eq!(names, expected);
    }

    #[test]
    fn ignored_directory_contents_are_never_visited() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("node_modules")).unwrap();
        touch(&root.join("node_modules/dep.js"), "x");
        touch(&root.join("keep.txt"), "y");

        let rules = IgnoreRules::new(vec!["node_modules".to_string()]);
        let entries: Vec<TreeEntry> = TreeWalker::new(root, rules.clone()).collect();

        for entry in &entries {
            for ancestor in entry.path.ancestors() {
                if ancestor == root {
                    break;
                }
                assert!(
                    !rules.is_ignored(ancestor),
                    "yielded {} under ignored ancestor {}",
                    entry.path.display(),
                    ancestor.display()
                );
            }
        }
        assert!(entries.iter().all(|e| !e.path.ends_with("dep.js")));
        assert!(entries.iter().any(|e| e.path.ends_with("keep.txt")));
    }

    #[test]
    fn prefix_rules_prune_too() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("secret")).unwrap();
        touch(&root.join("secret/key.txt"), "k");
        touch(&root.join("open.txt"), "o");

        let rules = IgnoreRules::default().with_prefixes(vec![root.join("secret")]);
        let entries: Vec<TreeEntry> = TreeWalker::new(root, rules).collect();
        assert!(entries.iter().all(|e| !e.path.starts_with(root.join("secret"))));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_listed_but_never_descended() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("sub")).unwrap();
        touch(&root.join("sub/file.txt"), "f");
        // Link cycle back to the root
        std::os::unix::fs::symlink(root, root.join("sub/loop")).unwrap();

        let entries: Vec<TreeEntry> =
            TreeWalker::new(root, IgnoreRules::default()).collect();

        // root, sub, file.txt and the link itself, each exactly once
        assert_eq!(entries.len(), 4);
        let loop_entry = entries
            .iter()
            .find(|e| e.path.ends_with("loop"))
            .expect("symlink is listed");
        assert_eq!(loop_entry.kind, NodeKind::File);

        let mut paths: Vec<&Path> = entries.iter().map(|e| e.path.as_path()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), entries.len());
    }

    #[test]
    fn depth_mirrors_directory_nesting() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        touch(&root.join("a/b/deep.txt"), "d");

        let deep = TreeWalker::new(root, IgnoreRules::default())
            .find(|e| e.path.ends_with("deep.txt"))
            .unwrap();
        assert_eq!(deep.depth, 3);
    }

    #[test]
    fn content_at_limit_passes_through() {
        let content = "x".repeat(500);
        assert_eq!(truncate(&content, 500), content);
    }

    #[test]
    fn content_over_limit_is_truncated_exactly() {
        let content = "x".repeat(501);
        let truncated = truncate(&content, 500);
        assert_eq!(truncated.len(), 500 + TRUNCATION_MARKER.len());
        assert!(truncated.ends_with(TRUNCATION_MARKER));
        assert_eq!(&truncated[..500], &content[..500]);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let content = "é".repeat(501);
        let truncated = truncate(&content, 500);
        assert_eq!(truncated.chars().count(), 500 + TRUNCATION_MARKER.len());
    }

    #[test]
    fn non_utf8_content_falls_back_to_latin1() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.txt");
        fs::write(&path, [0x63, 0x61, 0x66, 0xE9]).unwrap(); // "café" in Latin-1

        let content = read_content(&path, 500);
        assert_eq!(content, "café");
    }

    #[test]
    fn binary_content_yields_decode_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        fs::write(&path, [0x89, 0x50, 0x4E, 0x47, 0x00, 0x01]).unwrap();

        let content = read_content(&path, 500);
        assert_eq!(content, "[Decode error: content is not text]");
    }

    #[test]
    fn missing_file_yields_placeholder() {
        let content = read_content(Path::new("/nonexistent/definitely-not-here"), 500);
        assert!(content.starts_with("[IO error:"));
    }

    #[test]
    fn render_indents_by_depth() {
        let entry = TreeEntry {
            path: PathBuf::from("/tmp/x/y.txt"),
            depth: 2,
            kind: NodeKind::File,
            content: Some("hello".to_string()),
        };
        let rendered = render_entry(&entry);
        assert!(rendered.starts_with("    📄 y.txt\n"));
        assert!(rendered.contains("    hello"));
    }
}

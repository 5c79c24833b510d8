use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Finds the source units to submit for analysis
pub(crate) struct SourceScanner {
    root: PathBuf,
}

impl SourceScanner {
    pub(crate) fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Walk the root (.gitignore aware) and return analyzable files in path order
    pub(crate) fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let root = self.root.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false);
        builder.filter_entry(move |entry| !SourceScanner::is_skipped_dir(entry.path(), &root));

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    if !entry.file_type().is_some_and(|t| t.is_file()) {
                        continue;
                    }

                    let path = entry.path();
                    if !Self::is_source_file(path) {
                        continue;
                    }
                    if let Ok(meta) = entry.metadata() {
                        if meta.len() > MAX_FILE_SIZE_BYTES {
                            log::debug!(
                                "Skipping large file {} ({} bytes > {})",
                                path.display(),
                                meta.len(),
                                MAX_FILE_SIZE_BYTES
                            );
                            continue;
                        }
                    }

                    files.push(path.to_path_buf());
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        files.sort();
        log::info!("Found {} source files under {}", files.len(), self.root.display());
        files
    }

    pub(crate) fn is_source_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext.as_str()))
    }

    fn is_skipped_dir(path: &Path, root: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(root) else {
            return false;
        };
        relative.components().any(|component| match component {
            std::path::Component::Normal(name) => {
                let lowered = name.to_string_lossy().to_lowercase();
                SKIPPED_DIRS.contains(&lowered.as_str())
            }
            _ => false,
        })
    }
}

const SKIPPED_DIRS: &[&str] = &[
    // VCS / editors
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    // environments / caches
    "node_modules",
    "venv",
    ".venv",
    "env",
    "__pycache__",
    ".pytest_cache",
    ".tox",
    ".next",
    ".nuxt",
    ".svelte-kit",
    // build output
    "dist",
    "build",
    "target",
    "coverage",
    "htmlcov",
];

const MAX_FILE_SIZE_BYTES: u64 = 1_048_576; // 1 MB

/// Parsed languages plus component files that only feed path-based signals
const SOURCE_EXTENSIONS: &[&str] = &[
    "py", "pyw", "js", "jsx", "mjs", "cjs", "ts", "mts", "cts", "tsx", "vue", "svelte",
];

#[cfg(test)]
mod tests {
    use super::SourceScanner;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn relative(root: &std::path::Path, files: Vec<std::path::PathBuf>) -> Vec<String> {
        files
            .into_iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn finds_sources_in_path_order() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("app")).unwrap();
        fs::write(temp.path().join("app/views.py"), b"x = 1\n").unwrap();
        fs::write(temp.path().join("app/main.py"), b"x = 1\n").unwrap();
        fs::write(temp.path().join("index.ts"), b"export {}\n").unwrap();
        fs::write(temp.path().join("README.md"), b"# readme\n").unwrap();

        let files = SourceScanner::new(temp.path()).scan();
        assert_eq!(
            relative(temp.path(), files),
            vec!["app/main.py", "app/views.py", "index.ts"]
        );
    }

    #[test]
    fn skips_environment_and_build_dirs() {
        let temp = tempdir().unwrap();
        for dir in ["node_modules/react", "venv/lib", "dist", "src"] {
            fs::create_dir_all(temp.path().join(dir)).unwrap();
        }
        fs::write(temp.path().join("node_modules/react/index.js"), b"x\n").unwrap();
        fs::write(temp.path().join("venv/lib/site.py"), b"x = 1\n").unwrap();
        fs::write(temp.path().join("dist/bundle.js"), b"x\n").unwrap();
        fs::write(temp.path().join("src/app.js"), b"x\n").unwrap();
        fs::write(temp.path().join(".gitignore"), b"/generated\n").unwrap();
        fs::create_dir_all(temp.path().join("generated")).unwrap();
        fs::write(temp.path().join("generated/out.py"), b"x = 1\n").unwrap();

        let files = SourceScanner::new(temp.path()).scan();
        assert_eq!(relative(temp.path(), files), vec!["src/app.js"]);
    }
}

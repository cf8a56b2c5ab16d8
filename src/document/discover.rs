//! Source discovery.

use super::SourceFormat;
use crate::error::ConfigError;
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use std::path::{Path, PathBuf};

/// A documentation source found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute or caller-relative path to read from.
    pub path: PathBuf,
    /// Path relative to the source directory without suffix, `/`-separated.
    pub docname: String,
    /// Path relative to the source directory, `/`-separated.
    pub filename: String,
    pub format: SourceFormat,
}

/// Walks `source_dir` for files with one of `suffixes`, skipping `exclude` globs.
///
/// Hidden files and anything matched by `.gitignore`/`.ignore` files are skipped.
/// The result is sorted by docname. When two files map to the same docname
/// (`intro.rst` and `intro.md`), the suffix listed first in `suffixes` wins.
pub fn discover(
    source_dir: &Path,
    suffixes: &[String],
    exclude: &[String],
) -> Result<Vec<SourceFile>, ConfigError> {
    let mut overrides = OverrideBuilder::new(source_dir);
    for pattern in exclude {
        overrides
            .add(&format!("!{}", pattern))
            .map_err(|e| ConfigError::InvalidExclude {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
    }
    let overrides = overrides.build().map_err(|e| ConfigError::InvalidExclude {
        pattern: exclude.join(", "),
        message: e.to_string(),
    })?;

    let mut found: Vec<(usize, SourceFile)> = Vec::new();
    for entry in WalkBuilder::new(source_dir)
        .overrides(overrides)
        .require_git(false)
        .build()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable source entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.path();
        let Some(rank) = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| suffixes.iter().position(|s| s == ext))
        else {
            continue;
        };
        let Ok(relative) = path.strip_prefix(source_dir) else {
            continue;
        };
        let Some(filename) = to_slash(relative) else {
            tracing::warn!("Skipping source with non UTF-8 path: {}", path.display());
            continue;
        };
        let docname = match filename.rsplit_once('.') {
            Some((stem, _)) => stem.to_string(),
            None => filename.clone(),
        };

        found.push((
            rank,
            SourceFile {
                path: path.to_path_buf(),
                docname,
                filename,
                format: SourceFormat::from_path(path),
            },
        ));
    }

    found.sort_by(|(rank_a, a), (rank_b, b)| a.docname.cmp(&b.docname).then(rank_a.cmp(rank_b)));
    found.dedup_by(|(_, later), (_, kept)| {
        let duplicate = later.docname == kept.docname;
        if duplicate {
            tracing::warn!(
                "Multiple sources for document '{}'; using {} and ignoring {}",
                kept.docname,
                kept.filename,
                later.filename
            );
        }
        duplicate
    });

    tracing::debug!("Discovered {} sources under {}", found.len(), source_dir.display());
    Ok(found.into_iter().map(|(_, source)| source).collect())
}

fn to_slash(path: &Path) -> Option<String> {
    let parts = path
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};

    fn suffixes() -> Vec<String> {
        vec!["rst".to_string(), "md".to_string()]
    }

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "Title\n=====\n").unwrap();
    }

    #[test]
    fn finds_sources_sorted_by_docname() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "tutorial/index.rst");
        touch(dir.path(), "index.rst");
        touch(dir.path(), "design/load.md");
        touch(dir.path(), "conf.py");

        let_assert!(Ok(found) = discover(dir.path(), &suffixes(), &[]));
        let names: Vec<_> = found.iter().map(|s| s.docname.as_str()).collect();
        check!(names == vec!["design/load", "index", "tutorial/index"]);
        check!(found[0].filename == "design/load.md");
        check!(found[0].format == SourceFormat::Markdown);
    }

    #[test]
    fn exclude_patterns_and_hidden_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "index.rst");
        touch(dir.path(), "_build/html/index.rst");
        touch(dir.path(), ".hidden/notes.rst");

        let_assert!(Ok(found) = discover(dir.path(), &suffixes(), &["_build/**".to_string()]));
        let names: Vec<_> = found.iter().map(|s| s.docname.as_str()).collect();
        check!(names == vec!["index"]);
    }

    #[test]
    fn first_listed_suffix_wins_for_duplicate_docnames() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "intro.md");
        touch(dir.path(), "intro.rst");

        let_assert!(Ok(found) = discover(dir.path(), &suffixes(), &[]));
        check!(found.len() == 1);
        check!(found[0].filename == "intro.rst");
    }
}

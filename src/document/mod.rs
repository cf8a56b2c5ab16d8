//! Documentation sources: discovery on disk and parsing into indexable documents.
//!
//! Parsing is deliberately shallow. The index only needs section titles, body
//! text and described objects, so markup is recognized just far enough to tell
//! those apart.

mod discover;
mod markdown;
mod rst;

pub use discover::{SourceFile, discover};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Title used for documents that have no section title at all.
pub const NO_TITLE: &str = "<no title>";

/// Source markup recognized by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    ReStructuredText,
    Markdown,
    PlainText,
}

impl SourceFormat {
    /// Picks the format from a file suffix (without the dot).
    pub fn from_suffix(suffix: &str) -> Self {
        match suffix.to_ascii_lowercase().as_str() {
            "rst" | "rest" => Self::ReStructuredText,
            "md" | "markdown" => Self::Markdown,
            _ => Self::PlainText,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(Self::PlainText, Self::from_suffix)
    }
}

/// An API entity described by a documentation directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DescribedObject {
    /// Domain name such as `py` or `js`.
    pub domain: String,
    /// Object type within the domain (`module`, `class`, `method`...).
    pub objtype: String,
    /// Fully qualified, dot-separated name.
    pub fullname: String,
    /// Fragment identifier of the object's description on its page.
    pub anchor: String,
    /// 0 = important, 1 = default, 2 = unimportant, negative = not searchable.
    pub priority: i32,
}

impl DescribedObject {
    /// Creates an object with the anchor and priority its type implies.
    pub fn new(domain: &str, objtype: &str, fullname: &str) -> Self {
        let (anchor, priority) = if objtype == "module" {
            (format!("module-{}", fullname), 0)
        } else {
            (fullname.to_string(), 1)
        };
        Self {
            domain: domain.to_string(),
            objtype: objtype.to_string(),
            fullname: fullname.to_string(),
            anchor,
            priority,
        }
    }
}

/// The indexable content of one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Path relative to the source directory without suffix, `/`-separated.
    pub docname: String,
    /// Path relative to the source directory, `/`-separated.
    pub filename: String,
    /// First section title, or [`NO_TITLE`].
    pub title: String,
    /// Text of every section title, the document title included.
    pub title_text: Vec<String>,
    /// Body text fragments.
    pub body_text: Vec<String>,
    pub objects: Vec<DescribedObject>,
}

impl SourceDocument {
    fn empty(docname: &str, filename: &str) -> Self {
        Self {
            docname: docname.to_string(),
            filename: filename.to_string(),
            title: NO_TITLE.to_string(),
            title_text: Vec::new(),
            body_text: Vec::new(),
            objects: Vec::new(),
        }
    }

    /// Records a section title; the first one becomes the document title.
    fn push_title(&mut self, title: String) {
        if self.title_text.is_empty() {
            self.title = title.clone();
        }
        self.title_text.push(title);
    }

    fn push_body(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            self.body_text.push(text.to_string());
        }
    }
}

/// Parses source text in the given format.
pub fn parse(docname: &str, filename: &str, text: &str, format: SourceFormat) -> SourceDocument {
    let mut doc = SourceDocument::empty(docname, filename);
    match format {
        SourceFormat::ReStructuredText => rst::parse_into(&mut doc, text),
        SourceFormat::Markdown => markdown::parse_into(&mut doc, text),
        SourceFormat::PlainText => markdown::parse_plain_into(&mut doc, text),
    }
    doc
}

/// Strips inline markup characters from a title for display.
fn clean_title(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '`' | '*'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    #[rstest]
    #[case("rst", SourceFormat::ReStructuredText)]
    #[case("MD", SourceFormat::Markdown)]
    #[case("txt", SourceFormat::PlainText)]
    #[case("adoc", SourceFormat::PlainText)]
    fn format_from_suffix(#[case] suffix: &str, #[case] expected: SourceFormat) {
        check!(SourceFormat::from_suffix(suffix) == expected);
    }

    #[test]
    fn module_objects_get_prefixed_anchor_and_high_priority() {
        let module = DescribedObject::new("py", "module", "pkg.errors");
        check!(module.anchor == "module-pkg.errors");
        check!(module.priority == 0);

        let class = DescribedObject::new("py", "class", "pkg.errors.Bad");
        check!(class.anchor == "pkg.errors.Bad");
        check!(class.priority == 1);
    }

    #[test]
    fn document_without_titles_gets_placeholder() {
        let doc = parse("notes", "notes.txt", "\n\n", SourceFormat::PlainText);
        check!(doc.title == NO_TITLE);
        check!(doc.title_text.is_empty());
    }

    #[test]
    fn clean_title_strips_inline_markup() {
        check!(clean_title(" The ``ingest`` *command* ") == "The ingest command");
    }
}

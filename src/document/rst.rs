//! reStructuredText parsing: section titles, directives and described objects.

use super::{DescribedObject, SourceDocument, clean_title};
use regex::Regex;
use std::sync::LazyLock;

/// Characters allowed in section adornment lines.
const ADORNMENT_CHARS: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Python object types usable without a `py:` prefix.
const PY_OBJECT_TYPES: &[&str] = &[
    "module",
    "function",
    "data",
    "class",
    "exception",
    "method",
    "classmethod",
    "staticmethod",
    "attribute",
];

/// Object types whose nested directives are qualified by their name.
const CLASS_LIKE_TYPES: &[&str] = &["class", "exception", "struct", "interface"];

/// Directives whose whole block (arguments and content) carries no searchable text.
const SKIPPED_DIRECTIVES: &[&str] = &[
    "toctree",
    "raw",
    "include",
    "literalinclude",
    "image",
    "highlight",
    "meta",
    "index",
    "contents",
    "autosummary",
];

/// Directives whose argument is not prose (a language, a path, an expression).
const NON_TEXT_ARGUMENTS: &[&str] = &["figure", "code-block", "code", "sourcecode", "only", "ifconfig"];

/// Directives whose argument renders as a (non-section) title.
const TITLED_DIRECTIVES: &[&str] = &["topic", "sidebar", "admonition"];

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9][\w:+-]*)::(?:\s+(.*))?$").expect("directive pattern is valid")
});

/// A class-like object whose indented block qualifies nested objects.
struct Scope {
    indent: usize,
    name: String,
}

struct RstParser<'d, 't> {
    doc: &'d mut SourceDocument,
    lines: Vec<&'t str>,
    module: Option<String>,
    scopes: Vec<Scope>,
}

pub(super) fn parse_into(doc: &mut SourceDocument, text: &str) {
    let mut parser = RstParser {
        doc,
        lines: text.lines().collect(),
        module: None,
        scopes: Vec::new(),
    };
    parser.run();
}

impl RstParser<'_, '_> {
    fn run(&mut self) {
        let mut i = 0;
        while i < self.lines.len() {
            i = self.step(i);
        }
    }

    /// Consumes the construct starting at line `i` and returns the next line to look at.
    fn step(&mut self, i: usize) -> usize {
        let line = self.lines[i];
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return i + 1;
        }
        let indent = indent_of(line);

        if let Some(rest) = trimmed.strip_prefix("..")
            && (rest.is_empty() || rest.starts_with(' '))
        {
            return self.explicit_markup(i, indent, rest.trim());
        }

        if indent == 0 {
            // Overlined title: adornment, text, matching adornment.
            if let Some(c) = adornment_char(line) {
                if let (Some(title), Some(under)) = (self.lines.get(i + 1), self.lines.get(i + 2))
                    && !title.trim().is_empty()
                    && adornment_char(under) == Some(c)
                {
                    self.doc.push_title(clean_title(title));
                    return i + 3;
                }
                // Transition line.
                return i + 1;
            }

            // Underlined title.
            if let Some(next) = self.lines.get(i + 1)
                && adornment_char(next).is_some()
                && next.trim_end().chars().count() >= trimmed.chars().count()
            {
                self.doc.push_title(clean_title(trimmed));
                return i + 2;
            }
        }

        self.doc.push_body(trimmed);
        i + 1
    }

    fn explicit_markup(&mut self, i: usize, indent: usize, rest: &str) -> usize {
        // Hyperlink targets and substitution definitions carry no prose.
        if rest.starts_with('_') || rest.starts_with('|') {
            return self.block_end(i + 1, indent);
        }

        // Footnotes and citations: the label is dropped, the text is body.
        if rest.starts_with('[') {
            if let Some(end) = rest.find(']') {
                self.doc.push_body(&rest[end + 1..]);
            }
            return i + 1;
        }

        let Some(caps) = DIRECTIVE_RE.captures(rest) else {
            // Anything else is a comment, including its indented block.
            return self.block_end(i + 1, indent);
        };
        let name = caps.get(1).map_or("", |m| m.as_str());
        let args = caps.get(2).map_or("", |m| m.as_str()).trim();

        let (content_start, noindex) = self.skip_options(i + 1);

        if let Some((domain, objtype)) = object_directive(name) {
            self.object_directive(domain, objtype, args, indent, noindex);
            return content_start;
        }

        let name = name.to_ascii_lowercase();
        if SKIPPED_DIRECTIVES.contains(&name.as_str()) {
            return self.block_end(i + 1, indent);
        }
        if TITLED_DIRECTIVES.contains(&name.as_str()) {
            if !args.is_empty() {
                self.doc.title_text.push(clean_title(args));
            }
        } else if !NON_TEXT_ARGUMENTS.contains(&name.as_str()) {
            self.doc.push_body(args);
        }
        content_start
    }

    /// Skips the option field lines directly below a directive.
    /// Returns the first content line and whether `:noindex:` was present.
    fn skip_options(&self, start: usize) -> (usize, bool) {
        let mut j = start;
        let mut noindex = false;
        while let Some(line) = self.lines.get(j) {
            let trimmed = line.trim();
            if !trimmed.starts_with(':') || indent_of(line) == 0 {
                break;
            }
            if trimmed.starts_with(":noindex:") || trimmed.starts_with(":no-index:") {
                noindex = true;
            }
            j += 1;
        }
        (j, noindex)
    }

    fn object_directive(
        &mut self,
        domain: &str,
        objtype: &str,
        args: &str,
        indent: usize,
        noindex: bool,
    ) {
        match objtype {
            "currentmodule" => {
                self.module = (!args.is_empty() && args != "None").then(|| args.to_string());
                return;
            }
            "module" => {
                self.module = (!args.is_empty()).then(|| args.to_string());
                self.scopes.clear();
                if !noindex && !args.is_empty() {
                    self.doc.objects.push(DescribedObject::new(domain, objtype, args));
                }
                return;
            }
            _ => {}
        }

        let Some(name) = signature_name(args) else {
            return;
        };

        while self.scopes.last().is_some_and(|scope| scope.indent >= indent) {
            self.scopes.pop();
        }
        let qualified = match self.scopes.last() {
            Some(scope) if !name.starts_with(&format!("{}.", scope.name)) => {
                format!("{}.{}", scope.name, name)
            }
            _ => name.to_string(),
        };
        let fullname = match &self.module {
            Some(module) if domain == "py" && !qualified.starts_with(&format!("{}.", module)) => {
                format!("{}.{}", module, qualified)
            }
            _ => qualified.clone(),
        };

        if !noindex {
            self.doc
                .objects
                .push(DescribedObject::new(domain, objtype, &fullname));
        }
        self.doc.push_body(args);

        if CLASS_LIKE_TYPES.contains(&objtype) {
            self.scopes.push(Scope {
                indent,
                name: qualified,
            });
        }
    }

    /// First line after the block indented deeper than `indent`.
    fn block_end(&self, start: usize, indent: usize) -> usize {
        let mut j = start;
        while let Some(line) = self.lines.get(j) {
            if !line.trim().is_empty() && indent_of(line) <= indent {
                break;
            }
            j += 1;
        }
        j
    }
}

/// Splits `domain:type` directive names; bare Python object types default to `py`.
fn object_directive(name: &str) -> Option<(&str, &str)> {
    if let Some((domain, objtype)) = name.split_once(':') {
        if domain.is_empty() || objtype.is_empty() || objtype.contains(':') {
            return None;
        }
        return Some((domain, objtype));
    }
    (PY_OBJECT_TYPES.contains(&name) || name == "currentmodule").then_some(("py", name))
}

/// Extracts the object name from a signature such as `async get(url, retries=3) -> bytes`.
fn signature_name(signature: &str) -> Option<&str> {
    let head = signature.split('(').next().unwrap_or(signature).trim();
    let name = head.split_whitespace().last()?;
    let name = name.trim_end_matches([':', ',', ';']);
    (!name.is_empty()).then_some(name)
}

fn adornment_char(line: &str) -> Option<char> {
    let line = line.trim_end();
    if line.chars().count() < 3 || line.starts_with(char::is_whitespace) {
        return None;
    }
    let first = line.chars().next()?;
    (ADORNMENT_CHARS.contains(first) && line.chars().all(|c| c == first)).then_some(first)
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

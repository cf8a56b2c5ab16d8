//! Reading and writing the JavaScript object-literal dialect of the index payload.
//!
//! The dialect is JSON with two relaxations: object keys that are plain
//! identifiers (and not reserved words) are written without quotes, and strings
//! may be single-quoted when read. Object entries are always written sorted as
//! encoded `key:value` strings, which keeps the output byte-for-byte reproducible.

use crate::error::{IndexError, JsParseError};
use crate::search::SearchIndex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt::{self, Write as _};
use std::str::FromStr;

/// Wrapper call around the JS payload.
pub const SET_INDEX_PREFIX: &str = "Search.setIndex(";

/// JavaScript reserved words, which must be quoted when used as keys.
const RESERVED_WORDS: &[&str] = &[
    "abstract", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "debugger", "default", "delete", "do", "double", "else", "enum", "export",
    "extends", "false", "final", "finally", "float", "for", "function", "goto", "if",
    "implements", "import", "in", "instanceof", "int", "interface", "long", "native", "new",
    "null", "package", "private", "protected", "public", "return", "short", "static", "super",
    "switch", "synchronized", "this", "throw", "throws", "transient", "true", "try", "typeof",
    "var", "void", "volatile", "while", "with",
];

/// On-disk encoding of the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexFormat {
    /// `Search.setIndex({...})` script.
    #[default]
    Js,
    /// Plain JSON document.
    Json,
}

impl fmt::Display for IndexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Js => "js",
            Self::Json => "json",
        })
    }
}

impl FromStr for IndexFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "js" | "javascript" => Ok(Self::Js),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown index format '{}' (expected js or json)", other)),
        }
    }
}

/// Serializes an index in the requested format.
pub fn dump_index(index: &SearchIndex, format: IndexFormat) -> Result<String, IndexError> {
    match format {
        IndexFormat::Js => {
            let value = serde_json::to_value(index).map_err(|e| IndexError::Shape(e.to_string()))?;
            Ok(format!("{}{})", SET_INDEX_PREFIX, dumps(&value)))
        }
        IndexFormat::Json => {
            serde_json::to_string(index).map_err(|e| IndexError::Shape(e.to_string()))
        }
    }
}

/// Parses an index written in either format. The format is detected from the content.
pub fn load_index(text: &str) -> Result<SearchIndex, IndexError> {
    let trimmed = text.trim();
    let value = if let Some(rest) = trimmed.strip_prefix(SET_INDEX_PREFIX) {
        let body = rest
            .trim_end()
            .trim_end_matches(';')
            .trim_end()
            .strip_suffix(')')
            .ok_or(IndexError::MissingWrapper)?;
        loads(body)?
    } else if trimmed.starts_with('{') {
        loads(trimmed)?
    } else {
        return Err(IndexError::MissingWrapper);
    };
    serde_json::from_value(value).map_err(|e| IndexError::Shape(e.to_string()))
}

/// Encodes a value in the JS object-literal dialect.
pub fn dumps(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            let _ = write!(out, "{}", n);
        }
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            // Entries sort as whole `key:value` strings, so `pid001:0` precedes `pid:1`.
            let mut entries: Vec<String> = map
                .iter()
                .map(|(key, item)| {
                    let mut entry = encode_key(key);
                    entry.push(':');
                    write_value(&mut entry, item);
                    entry
                })
                .collect();
            entries.sort_unstable();
            out.push('{');
            out.push_str(&entries.join(","));
            out.push('}');
        }
    }
}

fn encode_key(key: &str) -> String {
    if is_bare_key(key) {
        key.to_string()
    } else {
        let mut out = String::with_capacity(key.len() + 2);
        write_string(&mut out, key);
        out
    }
}

fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED_WORDS.contains(&key)
}

/// Double-quoted string; everything outside printable ASCII is escaped.
fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            ' '..='~' => out.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{:04x}", unit);
                }
            }
        }
    }
    out.push('"');
}

/// Parses the JS object-literal dialect into a JSON value.
pub fn loads(text: &str) -> Result<Value, JsParseError> {
    let mut parser = Parser {
        text,
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_whitespace();
    if parser.pos != text.len() {
        return Err(JsParseError::new("trailing characters", parser.pos));
    }
    Ok(value)
}

/// Deepest nesting of objects and arrays accepted by [`loads`].
pub const MAX_DEPTH: usize = 128;

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn error(&self, message: &str) -> JsParseError {
        JsParseError::new(message, self.pos)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), JsParseError> {
        self.skip_whitespace();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn value(&mut self) -> Result<Value, JsParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'{') => self.nested(Self::object),
            Some(b'[') => self.nested(Self::array),
            Some(b'"' | b'\'') => self.string().map(Value::String),
            Some(b'-' | b'0'..=b'9') => self.number(),
            Some(b) if is_ident_start(b) => {
                let start = self.pos;
                match self.identifier() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" => Ok(Value::Null),
                    _ => Err(JsParseError::new("unexpected identifier", start)),
                }
            }
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Value, JsParseError>,
    ) -> Result<Value, JsParseError> {
        if self.depth == MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn object(&mut self) -> Result<Value, JsParseError> {
        self.expect(b'{')?;
        let mut map = Map::new();
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Value::Object(map));
        }
        loop {
            self.skip_whitespace();
            let key = match self.peek() {
                Some(b'"' | b'\'') => self.string()?,
                Some(b'0'..=b'9') => self.digits().to_string(),
                Some(b) if is_ident_start(b) => self.identifier().to_string(),
                _ => return Err(self.error("expected object key")),
            };
            self.expect(b':')?;
            let value = self.value()?;
            map.insert(key, value);

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Value::Object(map));
                }
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn array(&mut self) -> Result<Value, JsParseError> {
        self.expect(b'[')?;
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Value::Array(items));
        }
        loop {
            items.push(self.value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }
    }

    fn identifier(&mut self) -> &str {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    fn digits(&mut self) -> &str {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    fn number(&mut self) -> Result<Value, JsParseError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        if self.digits().is_empty() {
            return Err(self.error("expected digits"));
        }
        let mut is_float = false;
        if self.peek() == Some(b'.') {
            is_float = true;
            self.pos += 1;
            self.digits();
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if self.digits().is_empty() {
                return Err(self.error("expected exponent digits"));
            }
        }
        let literal = &self.text[start..self.pos];
        let number = if is_float {
            literal.parse::<f64>().ok().and_then(Number::from_f64)
        } else if let Ok(n) = literal.parse::<u64>() {
            Some(Number::from(n))
        } else {
            literal.parse::<i64>().ok().map(Number::from)
        };
        number
            .map(Value::Number)
            .ok_or_else(|| JsParseError::new("invalid number", start))
    }

    fn string(&mut self) -> Result<String, JsParseError> {
        let quote = self.peek().ok_or_else(|| self.error("expected string"))?;
        self.pos += 1;
        let mut out = String::new();
        loop {
            let start = self.pos;
            while self.peek().is_some_and(|b| b != quote && b != b'\\') {
                self.pos += 1;
            }
            out.push_str(&self.text[start..self.pos]);
            match self.peek() {
                Some(b'\\') => {
                    self.pos += 1;
                    self.escape(&mut out)?;
                }
                Some(_) => {
                    self.pos += 1;
                    return Ok(out);
                }
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), JsParseError> {
        let Some(b) = self.peek() else {
            return Err(self.error("unterminated escape"));
        };
        self.pos += 1;
        match b {
            b'n' => out.push('\n'),
            b'r' => out.push('\r'),
            b't' => out.push('\t'),
            b'b' => out.push('\u{8}'),
            b'f' => out.push('\u{c}'),
            b'u' => {
                let first = self.hex4()?;
                let c = if (0xD800..0xDC00).contains(&first) {
                    if !self.text[self.pos..].starts_with("\\u") {
                        return Err(self.error("unpaired surrogate"));
                    }
                    self.pos += 2;
                    let second = self.hex4()?;
                    if !(0xDC00..0xE000).contains(&second) {
                        return Err(JsParseError::new("unpaired surrogate", self.pos - 6));
                    }
                    let combined = 0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00);
                    char::from_u32(combined)
                } else {
                    char::from_u32(first)
                };
                out.push(c.ok_or_else(|| self.error("invalid unicode escape"))?);
            }
            _ => {
                // \" \' \\ \/ and any other escaped character stand for themselves.
                self.pos -= 1;
                let c = self.text[self.pos..]
                    .chars()
                    .next()
                    .ok_or_else(|| self.error("unterminated escape"))?;
                self.pos += c.len_utf8();
                out.push(c);
            }
        }
        Ok(())
    }

    fn hex4(&mut self) -> Result<u32, JsParseError> {
        let digits = self
            .text
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| self.error("truncated unicode escape"))?;
        let value = u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid unicode escape"))?;
        self.pos += 4;
        Ok(value)
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use serde_json::json;

    #[test]
    fn keys_are_bare_unless_reserved_or_not_identifiers() {
        let value = json!({"terms": 1, "class": 2, "kf.common": 3, "0": 4, "_x": 5, "And": 6});
        check!(dumps(&value) == r#"{"0":4,"class":2,"kf.common":3,And:6,_x:5,terms:1}"#);
    }

    #[test]
    fn entries_sort_as_whole_strings() {
        let value = json!({"pid": 1, "pid001": 0, "a": [2], "a1": 3});
        check!(dumps(&value) == "{a1:3,a:[2],pid001:0,pid:1}");
    }

    #[test]
    fn strings_escape_non_ascii() {
        let value = json!(["tab\there", "qu\"ote", "café", "🦀"]);
        check!(dumps(&value) == r#"["tab\there","qu\"ote","caf\u00e9","\ud83e\udd80"]"#);
    }

    #[test]
    fn loads_accepts_the_dialect() {
        let_assert!(Ok(value) = loads(r#"{docnames:['a', "b"], "break":[1,2], n:-1.5, t:true, z:null}"#));
        check!(value == json!({"docnames": ["a", "b"], "break": [1, 2], "n": -1.5, "t": true, "z": null}));
    }

    #[test]
    fn loads_decodes_escapes() {
        let_assert!(Ok(value) = loads(r#"["caf\u00e9","\ud83e\udd80","a\'b","x\\y"]"#));
        check!(value == json!(["café", "🦀", "a'b", "x\\y"]));
    }

    #[test]
    fn dumps_then_loads_preserves_value() {
        let value = json!({"objects": {"pkg.mod": {"Thing": [0, 1, 1, ""]}}, "objnames": {"0": ["py", "class", "Python class"]}});
        let_assert!(Ok(back) = loads(&dumps(&value)));
        check!(back == value);
    }

    #[test]
    fn errors_carry_offsets() {
        let_assert!(Err(e) = loads("{a:[1,2}"));
        check!(e.offset == 7);
        let_assert!(Err(e) = loads("{a:1} x"));
        check!(e.message == "trailing characters");
        let_assert!(Err(_) = loads("{a:\"open"));
        let_assert!(Err(_) = loads("{a:bogus}"));
    }

    #[test]
    fn high_surrogate_needs_a_low_surrogate() {
        let_assert!(Err(e) = loads(r#""\ud83eA""#));
        check!(e.message == "unpaired surrogate");
        check!(e.offset == 7);
        let_assert!(Err(e) = loads(r#""\ud83e\ud83e""#));
        check!(e.message == "unpaired surrogate");
    }

    #[test]
    fn nesting_is_bounded() {
        let deepest = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        let_assert!(Ok(_) = loads(&deepest));

        let_assert!(Err(e) = loads(&"[".repeat(200_000)));
        check!(e.message == "nesting too deep");
        check!(e.offset == MAX_DEPTH);

        let_assert!(Err(e) = loads(&"{a:".repeat(MAX_DEPTH + 1)));
        check!(e.message == "nesting too deep");
    }

    #[test]
    fn load_index_requires_wrapper_or_object() {
        check!(matches!(load_index("var x = 1"), Err(IndexError::MissingWrapper)));
        check!(matches!(load_index("Search.setIndex({}"), Err(IndexError::MissingWrapper)));
    }

    #[test]
    fn index_round_trips_in_both_formats() {
        let mut index = SearchIndex {
            docnames: vec!["index".into()],
            filenames: vec!["index.rst".into()],
            titles: vec!["Überblick".into()],
            ..SearchIndex::default()
        };
        index.envversion.insert("docsearch".into(), 1);
        index.terms.insert("new".into(), crate::search::DocSet::One(0));

        for format in [IndexFormat::Js, IndexFormat::Json] {
            let_assert!(Ok(text) = dump_index(&index, format));
            let_assert!(Ok(back) = load_index(&text));
            check!(back == index);
        }

        let_assert!(Ok(js) = dump_index(&index, IndexFormat::Js));
        check!(js.starts_with("Search.setIndex({docnames:[\"index\"],envversion:{docsearch:1},"));
        check!(js.contains("terms:{\"new\":0}"));
    }

    #[test]
    fn format_parses_from_str() {
        check!("JS".parse::<IndexFormat>() == Ok(IndexFormat::Js));
        check!("json".parse::<IndexFormat>() == Ok(IndexFormat::Json));
        check!("xml".parse::<IndexFormat>().is_err());
    }
}

//! The frozen search index: the payload passed to `Search.setIndex(...)`.

use crate::error::IndexError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Set of documents a term occurs in.
///
/// One document is encoded as a bare integer, several as a sorted list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocSet {
    One(usize),
    Many(Vec<usize>),
}

impl DocSet {
    /// Builds the canonical encoding of an ascending, duplicate-free list.
    pub fn from_sorted(mut docs: Vec<usize>) -> Option<Self> {
        match docs.len() {
            0 => None,
            1 => docs.pop().map(Self::One),
            _ => Some(Self::Many(docs)),
        }
    }

    pub fn as_slice(&self) -> &[usize] {
        match self {
            Self::One(doc) => std::slice::from_ref(doc),
            Self::Many(docs) => docs,
        }
    }

    pub fn contains(&self, doc: usize) -> bool {
        self.as_slice().contains(&doc)
    }

    /// Canonical: non-empty, strictly ascending, lists hold two or more entries.
    fn is_canonical(&self) -> bool {
        match self {
            Self::One(_) => true,
            Self::Many(docs) => docs.len() >= 2 && docs.windows(2).all(|w| w[0] < w[1]),
        }
    }
}

/// `[docindex, typeindex, priority, anchor]` entry of the `objects` table.
///
/// The anchor is shortened: `""` means the object's full name and `"-"` means
/// `<objtype>-<fullname>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry(pub usize, pub usize, pub i32, pub String);

impl ObjectEntry {
    pub fn docindex(&self) -> usize {
        self.0
    }

    pub fn typeindex(&self) -> usize {
        self.1
    }

    pub fn priority(&self) -> i32 {
        self.2
    }

    pub fn anchor(&self) -> &str {
        &self.3
    }
}

/// `[domain, objtype, label]` entry of the `objnames` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectName(pub String, pub String, pub String);

impl ObjectName {
    pub fn domain(&self) -> &str {
        &self.0
    }

    pub fn objtype(&self) -> &str {
        &self.1
    }

    /// Human readable type label such as "Python class".
    pub fn label(&self) -> &str {
        &self.2
    }
}

/// Object prefix → object name → entry.
pub type ObjectTable = BTreeMap<String, BTreeMap<String, ObjectEntry>>;

/// The complete index payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchIndex {
    pub docnames: Vec<String>,
    pub envversion: BTreeMap<String, u32>,
    pub filenames: Vec<String>,
    pub objects: ObjectTable,
    pub objnames: BTreeMap<usize, ObjectName>,
    pub objtypes: BTreeMap<usize, String>,
    pub terms: BTreeMap<String, DocSet>,
    pub titles: Vec<String>,
    pub titleterms: BTreeMap<String, DocSet>,
}

/// A document resolved from its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentRef<'a> {
    pub index: usize,
    pub docname: &'a str,
    pub title: &'a str,
    pub filename: &'a str,
}

/// An entry of the `objects` table with its type information resolved.
#[derive(Debug, Clone, Copy)]
pub struct ObjectRef<'a> {
    pub prefix: &'a str,
    pub name: &'a str,
    pub entry: &'a ObjectEntry,
    pub kind: Option<&'a ObjectName>,
}

impl ObjectRef<'_> {
    /// `prefix.name`, or just `name` for top-level objects.
    pub fn fullname(&self) -> String {
        if self.prefix.is_empty() {
            self.name.to_string()
        } else {
            format!("{}.{}", self.prefix, self.name)
        }
    }

    pub fn objtype(&self) -> &str {
        self.kind.map_or("", ObjectName::objtype)
    }

    pub fn label(&self) -> &str {
        self.kind.map_or("", ObjectName::label)
    }

    /// Expands the shortened anchor to the page fragment.
    pub fn resolved_anchor(&self) -> String {
        match self.entry.anchor() {
            "" => self.fullname(),
            "-" => format!("{}-{}", self.objtype(), self.fullname()),
            anchor => anchor.to_string(),
        }
    }
}

/// Size summary of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub terms: usize,
    pub title_terms: usize,
    pub objects: usize,
    pub object_types: usize,
}

impl SearchIndex {
    /// Documents containing `term` in their body text.
    pub fn lookup_term(&self, term: &str) -> &[usize] {
        self.terms.get(term).map(DocSet::as_slice).unwrap_or_default()
    }

    /// Documents containing `term` in a section title.
    pub fn lookup_title_term(&self, term: &str) -> &[usize] {
        self.titleterms.get(term).map(DocSet::as_slice).unwrap_or_default()
    }

    pub fn document(&self, index: usize) -> Option<DocumentRef<'_>> {
        Some(DocumentRef {
            index,
            docname: self.docnames.get(index)?,
            title: self.titles.get(index)?,
            filename: self.filenames.get(index).map_or("", String::as_str),
        })
    }

    pub fn documents(&self) -> impl Iterator<Item = DocumentRef<'_>> {
        (0..self.docnames.len()).filter_map(|i| self.document(i))
    }

    pub fn document_index(&self, docname: &str) -> Option<usize> {
        self.docnames
            .binary_search_by(|name| name.as_str().cmp(docname))
            .ok()
    }

    /// Every object, ordered by prefix then name.
    pub fn object_entries(&self) -> impl Iterator<Item = ObjectRef<'_>> {
        self.objects.iter().flat_map(move |(prefix, names)| {
            names.iter().map(move |(name, entry)| ObjectRef {
                prefix,
                name,
                entry,
                kind: self.objnames.get(&entry.typeindex()),
            })
        })
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            documents: self.docnames.len(),
            terms: self.terms.len(),
            title_terms: self.titleterms.len(),
            objects: self.objects.values().map(BTreeMap::len).sum(),
            object_types: self.objtypes.len(),
        }
    }

    /// Checks every structural invariant and returns all violations found.
    pub fn validate(&self) -> Vec<IndexError> {
        let mut errors = Vec::new();
        let len = self.docnames.len();

        if self.filenames.len() != len || self.titles.len() != len {
            errors.push(IndexError::LengthMismatch {
                docnames: len,
                filenames: self.filenames.len(),
                titles: self.titles.len(),
            });
        }

        if let Some(pos) = self.docnames.windows(2).position(|w| w[0] >= w[1]) {
            errors.push(IndexError::UnsortedDocnames(pos + 1));
        }

        for (table, mapping) in [("terms", &self.terms), ("titleterms", &self.titleterms)] {
            for (key, docs) in mapping {
                if !docs.is_canonical() {
                    errors.push(IndexError::InvalidDocSet {
                        table,
                        key: key.clone(),
                    });
                }
                if let Some(&index) = docs.as_slice().iter().find(|&&doc| doc >= len) {
                    errors.push(IndexError::DocumentOutOfRange {
                        table,
                        key: key.clone(),
                        index,
                        len,
                    });
                }
            }
        }

        for object in self.object_entries() {
            let entry = object.entry;
            if entry.docindex() >= len {
                errors.push(IndexError::DocumentOutOfRange {
                    table: "objects",
                    key: object.fullname(),
                    index: entry.docindex(),
                    len,
                });
            }
            if !(0..=2).contains(&entry.priority()) {
                errors.push(IndexError::InvalidPriority {
                    name: object.fullname(),
                    priority: entry.priority(),
                });
            }
            if object.kind.is_none() || !self.objtypes.contains_key(&entry.typeindex()) {
                errors.push(IndexError::UnknownObjectType {
                    name: object.fullname(),
                    typeindex: entry.typeindex(),
                });
            }
        }

        for (typeindex, objtype) in &self.objtypes {
            let agrees = self
                .objnames
                .get(typeindex)
                .is_some_and(|name| *objtype == format!("{}:{}", name.domain(), name.objtype()));
            if !agrees {
                errors.push(IndexError::ObjectTypeMismatch(*typeindex));
            }
        }
        for typeindex in self.objnames.keys() {
            if !self.objtypes.contains_key(typeindex) {
                errors.push(IndexError::ObjectTypeMismatch(*typeindex));
            }
        }

        errors
    }
}

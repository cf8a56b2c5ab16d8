//! Mutable index state that documents are fed into and that freezes into a [`SearchIndex`].

use super::index::{DocSet, ObjectEntry, ObjectName, SearchIndex};
use super::tokenize::Language;
use crate::document::{DescribedObject, SourceDocument};
use crate::error::IndexError;
use ahash::{AHashMap, AHashSet};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Key of this producer in `envversion`.
pub const PRODUCER: &str = "docsearch";

/// Version of the payload layout written by this producer.
pub const FORMAT_VERSION: u32 = 1;

/// Collects per-document terms and objects.
///
/// All state is keyed by docname, so documents can be fed in any order and
/// re-fed or pruned without rebuilding everything.
#[derive(Debug)]
pub struct IndexBuilder {
    language: Language,
    titles: BTreeMap<String, String>,
    filenames: BTreeMap<String, String>,
    /// Body term → docnames.
    mapping: AHashMap<String, BTreeSet<String>>,
    /// Title term → docnames.
    title_mapping: AHashMap<String, BTreeSet<String>>,
    objects: BTreeMap<String, Vec<DescribedObject>>,
}

impl IndexBuilder {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            titles: BTreeMap::new(),
            filenames: BTreeMap::new(),
            mapping: AHashMap::new(),
            title_mapping: AHashMap::new(),
            objects: BTreeMap::new(),
        }
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Number of documents currently held.
    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn contains(&self, docname: &str) -> bool {
        self.titles.contains_key(docname)
    }

    /// Adds a document, replacing anything previously fed under its docname.
    pub fn feed(&mut self, doc: &SourceDocument) {
        if self.contains(&doc.docname) {
            self.remove(&doc.docname);
        }
        let docname = &doc.docname;
        self.titles.insert(docname.clone(), doc.title.clone());
        self.filenames.insert(docname.clone(), doc.filename.clone());

        for text in &doc.title_text {
            for word in self.language.split(text) {
                if let Some(term) = self.language.index_word(word) {
                    self.title_mapping
                        .entry(term)
                        .or_default()
                        .insert(docname.clone());
                }
            }
        }

        for text in &doc.body_text {
            for word in self.language.split(text) {
                let Some(term) = self.language.index_word(word) else {
                    continue;
                };
                let in_title = self
                    .title_mapping
                    .get(&term)
                    .is_some_and(|docs| docs.contains(docname));
                if !in_title {
                    self.mapping.entry(term).or_default().insert(docname.clone());
                }
            }
        }

        if !doc.objects.is_empty() {
            self.objects.insert(docname.clone(), doc.objects.clone());
        }
    }

    /// Removes a single document from every table.
    pub fn remove(&mut self, docname: &str) {
        self.titles.remove(docname);
        self.filenames.remove(docname);
        self.objects.remove(docname);
        for mapping in [&mut self.mapping, &mut self.title_mapping] {
            mapping.retain(|_, docs| {
                docs.remove(docname);
                !docs.is_empty()
            });
        }
    }

    /// Keeps only the documents named in `keep`.
    pub fn prune(&mut self, keep: &AHashSet<String>) {
        let before = self.titles.len();
        self.titles.retain(|docname, _| keep.contains(docname));
        self.filenames.retain(|docname, _| keep.contains(docname));
        self.objects.retain(|docname, _| keep.contains(docname));
        for mapping in [&mut self.mapping, &mut self.title_mapping] {
            mapping.retain(|_, docs| {
                docs.retain(|docname| keep.contains(docname));
                !docs.is_empty()
            });
        }
        let removed = before - self.titles.len();
        if removed > 0 {
            tracing::debug!("Pruned {} documents from the index", removed);
        }
    }

    /// Restores builder state from a previously frozen index.
    ///
    /// Fails when the index was written by another producer version or does
    /// not satisfy the index invariants; callers fall back to a full build.
    pub fn load(&mut self, frozen: &SearchIndex) -> Result<(), IndexError> {
        if frozen.envversion.get(PRODUCER) != Some(&FORMAT_VERSION) {
            return Err(IndexError::VersionMismatch {
                found: format!("{:?}", frozen.envversion),
                expected: format!("{{\"{}\": {}}}", PRODUCER, FORMAT_VERSION),
            });
        }
        if let Some(error) = frozen.validate().into_iter().next() {
            return Err(error);
        }

        for doc in frozen.documents() {
            self.titles.insert(doc.docname.to_string(), doc.title.to_string());
            self.filenames.insert(doc.docname.to_string(), doc.filename.to_string());
        }

        let docnames = &frozen.docnames;
        for (target, source) in [
            (&mut self.mapping, &frozen.terms),
            (&mut self.title_mapping, &frozen.titleterms),
        ] {
            for (term, docs) in source {
                target
                    .entry(term.clone())
                    .or_default()
                    .extend(docs.as_slice().iter().map(|&i| docnames[i].clone()));
            }
        }

        for object in frozen.object_entries() {
            let fullname = html_unescape(&object.fullname());
            let anchor = match object.entry.anchor() {
                "" => fullname.clone(),
                "-" => format!("{}-{}", object.objtype(), fullname),
                anchor => anchor.to_string(),
            };
            let domain = object.kind.map_or("", ObjectName::domain);
            self.objects
                .entry(docnames[object.entry.docindex()].clone())
                .or_default()
                .push(DescribedObject {
                    domain: domain.to_string(),
                    objtype: object.objtype().to_string(),
                    fullname,
                    anchor,
                    priority: object.entry.priority(),
                });
        }

        tracing::debug!("Loaded {} documents from previous index", frozen.docnames.len());
        Ok(())
    }

    /// Produces the immutable index. The output only depends on the fed content.
    pub fn freeze(&self) -> SearchIndex {
        let start = Instant::now();

        let docnames: Vec<String> = self.titles.keys().cloned().collect();
        let fn2index: AHashMap<&str, usize> = docnames
            .iter()
            .enumerate()
            .map(|(i, docname)| (docname.as_str(), i))
            .collect();

        let mut index = SearchIndex {
            titles: self.titles.values().cloned().collect(),
            filenames: docnames
                .iter()
                .map(|docname| self.filenames.get(docname).cloned().unwrap_or_default())
                .collect(),
            terms: freeze_mapping(&self.mapping, &fn2index),
            titleterms: freeze_mapping(&self.title_mapping, &fn2index),
            ..SearchIndex::default()
        };
        self.freeze_objects(&fn2index, &mut index);
        index.envversion.insert(PRODUCER.to_string(), FORMAT_VERSION);
        index.docnames = docnames;

        let stats = index.stats();
        tracing::info!(
            "Froze index: {} documents, {} terms, {} title terms, {} objects in {:?}",
            stats.documents,
            stats.terms,
            stats.title_terms,
            stats.objects,
            start.elapsed()
        );
        index
    }

    fn freeze_objects(&self, fn2index: &AHashMap<&str, usize>, index: &mut SearchIndex) {
        let mut objects: Vec<(&str, &DescribedObject)> = self
            .objects
            .iter()
            .flat_map(|(docname, objects)| objects.iter().map(move |obj| (docname.as_str(), obj)))
            .filter(|(docname, obj)| obj.priority >= 0 && fn2index.contains_key(docname))
            .collect();
        objects.sort_by(|(doc_a, a), (doc_b, b)| {
            (&a.domain, &a.fullname, &a.objtype, doc_a, &a.anchor, a.priority)
                .cmp(&(&b.domain, &b.fullname, &b.objtype, doc_b, &b.anchor, b.priority))
        });

        // Objects sharing an escaped name collapse to the last one in sort order,
        // before type indices are handed out.
        let named: Vec<(&str, &DescribedObject, String)> = objects
            .into_iter()
            .map(|(docname, obj)| (docname, obj, html_escape(&obj.fullname)))
            .collect();
        let mut last: AHashMap<&str, usize> = AHashMap::new();
        for (i, (_, _, escaped)) in named.iter().enumerate() {
            if let Some(previous) = last.insert(escaped.as_str(), i) {
                let (doc_a, a, _) = &named[previous];
                let (doc_b, b, _) = &named[i];
                tracing::warn!(
                    "Duplicate object {}: {}:{} in {} is shadowed by {}:{} in {}",
                    escaped,
                    a.domain,
                    a.objtype,
                    doc_a,
                    b.domain,
                    b.objtype,
                    doc_b
                );
            }
        }

        let mut typeindices: AHashMap<(&str, &str), usize> = AHashMap::new();
        for (i, (docname, obj, escaped)) in named.iter().enumerate() {
            if last.get(escaped.as_str()) != Some(&i) {
                continue;
            }
            let next = typeindices.len();
            let typeindex = *typeindices
                .entry((obj.domain.as_str(), obj.objtype.as_str()))
                .or_insert_with(|| {
                    index
                        .objtypes
                        .insert(next, format!("{}:{}", obj.domain, obj.objtype));
                    index.objnames.insert(
                        next,
                        ObjectName(
                            obj.domain.clone(),
                            obj.objtype.clone(),
                            object_type_label(&obj.domain, &obj.objtype),
                        ),
                    );
                    next
                });

            let shortanchor = if obj.anchor == obj.fullname {
                String::new()
            } else if obj.anchor == format!("{}-{}", obj.objtype, obj.fullname) {
                "-".to_string()
            } else {
                obj.anchor.clone()
            };

            let (prefix, name) = escaped.rsplit_once('.').unwrap_or(("", escaped.as_str()));
            index.objects.entry(prefix.to_string()).or_default().insert(
                name.to_string(),
                ObjectEntry(fn2index[*docname], typeindex, obj.priority, shortanchor),
            );
        }
    }
}

fn freeze_mapping(
    mapping: &AHashMap<String, BTreeSet<String>>,
    fn2index: &AHashMap<&str, usize>,
) -> BTreeMap<String, DocSet> {
    mapping
        .iter()
        .filter_map(|(term, docs)| {
            let mut indices: Vec<usize> = docs
                .iter()
                .filter_map(|docname| fn2index.get(docname.as_str()).copied())
                .collect();
            indices.sort_unstable();
            DocSet::from_sorted(indices).map(|set| (term.clone(), set))
        })
        .collect()
}

/// Human readable label of an object type, e.g. "Python class".
///
/// Unknown types are labelled with the bare type name.
pub fn object_type_label(domain: &str, objtype: &str) -> String {
    let domain_label = match domain {
        "py" => "Python",
        "js" => "JavaScript",
        "c" => "C",
        "cpp" => "C++",
        "rst" => "reStructuredText",
        _ => return objtype.to_string(),
    };
    let type_label = match (domain, objtype) {
        ("py", "classmethod") => "class method",
        ("py", "staticmethod") => "static method",
        ("c" | "cpp", "var") => "variable",
        ("c" | "cpp", "macro") => "macro",
        ("rst", "directive:option") => "directive-option",
        (_, other) => other,
    };
    format!("{} {}", domain_label, type_label)
}

fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn html_unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{SourceFormat, parse};
    use assert2::{check, let_assert};
    use rstest::{fixture, rstest};

    #[fixture]
    fn builder() -> IndexBuilder {
        IndexBuilder::new(Language::english())
    }

    fn doc(docname: &str, title: &str, body: &[&str]) -> SourceDocument {
        let mut text = format!("{}\n{}\n\n", title, "=".repeat(title.len()));
        for line in body {
            text.push_str(line);
            text.push_str("\n\n");
        }
        parse(docname, &format!("{}.rst", docname), &text, SourceFormat::ReStructuredText)
    }

    #[rstest]
    fn title_words_are_not_repeated_as_body_terms(mut builder: IndexBuilder) {
        builder.feed(&doc("install", "Installation", &["Install the package with pip."]));
        let index = builder.freeze();

        check!(index.titles == vec!["Installation"]);
        check!(index.lookup_title_term("instal") == &[0]);
        check!(index.lookup_term("instal").is_empty());
        check!(index.lookup_term("pip") == &[0]);
        check!(index.lookup_term("the").is_empty());
        check!(index.lookup_term("with").is_empty());
    }

    #[rstest]
    fn documents_are_sorted_and_sets_encoded(mut builder: IndexBuilder) {
        builder.feed(&doc("tutorial/index", "Tutorial", &["Ingest a study."]));
        builder.feed(&doc("index", "Overview", &["Ingest everything."]));
        let index = builder.freeze();

        check!(index.docnames == vec!["index", "tutorial/index"]);
        check!(index.filenames == vec!["index.rst", "tutorial/index.rst"]);
        let lang = Language::english();
        check!(index.terms.get(&lang.stem("ingest")) == Some(&DocSet::Many(vec![0, 1])));
        check!(index.terms.get(&lang.stem("study")) == Some(&DocSet::One(1)));
        check!(index.validate().is_empty());
    }

    #[rstest]
    fn refeeding_replaces_previous_content(mut builder: IndexBuilder) {
        builder.feed(&doc("load", "Load", &["Targets are loaded in order."]));
        builder.feed(&doc("load", "Loading", &["Dataservice payloads."]));
        let index = builder.freeze();

        let lang = Language::english();
        check!(index.titles == vec!["Loading"]);
        check!(index.lookup_term(&lang.stem("Targets")).is_empty());
        check!(index.lookup_term(&lang.stem("Dataservice")) == &[0]);
    }

    #[rstest]
    fn prune_drops_documents_everywhere(mut builder: IndexBuilder) {
        builder.feed(&doc("a", "Alpha", &["shared words"]));
        builder.feed(&doc("b", "Beta", &["shared terms", ".. py:function:: run()"]));
        let keep: AHashSet<String> = ["a".to_string()].into_iter().collect();
        builder.prune(&keep);
        let index = builder.freeze();

        check!(index.docnames == vec!["a"]);
        check!(index.lookup_term(&Language::english().stem("shared")) == &[0]);
        check!(index.lookup_title_term("beta").is_empty());
        check!(index.objects.is_empty());
        check!(builder.len() == 1);
    }

    #[rstest]
    fn objects_are_grouped_by_prefix_with_short_anchors(mut builder: IndexBuilder) {
        let mut source = doc("api", "API", &[]);
        source.objects = vec![
            DescribedObject::new("py", "module", "kf.common"),
            DescribedObject::new("py", "class", "kf.common.Runner"),
            DescribedObject::new("py", "function", "main"),
            DescribedObject {
                anchor: "custom".into(),
                ..DescribedObject::new("py", "data", "kf.common.VERSION")
            },
        ];
        builder.feed(&source);
        let index = builder.freeze();

        let common = &index.objects["kf.common"];
        check!(common["Runner"].anchor() == "");
        check!(common["VERSION"].anchor() == "custom");
        check!(index.objects["kf"]["common"].anchor() == "-");
        check!(index.objects["kf"]["common"].priority() == 0);
        check!(index.objects[""]["main"].priority() == 1);

        // Sorted by fullname: kf.common (module), kf.common.Runner (class), ...
        check!(index.objtypes[&0] == "py:module");
        check!(index.objtypes[&1] == "py:class");
        check!(index.objnames[&1] == ObjectName("py".into(), "class".into(), "Python class".into()));
        check!(index.validate().is_empty());
    }

    #[rstest]
    fn duplicate_names_keep_only_the_last_object_type(mut builder: IndexBuilder) {
        let mut a = doc("a", "A", &[]);
        a.objects = vec![DescribedObject::new("py", "function", "foo")];
        let mut b = doc("b", "B", &[]);
        b.objects = vec![DescribedObject::new("py", "data", "foo")];
        builder.feed(&a);
        builder.feed(&b);
        let frozen = builder.freeze();

        check!(frozen.objtypes.len() == 1);
        check!(frozen.objtypes[&0] == "py:function");
        check!(frozen.objects[""]["foo"].docindex() == 0);
        check!(frozen.validate().is_empty());

        let mut restored = IndexBuilder::new(Language::english());
        let_assert!(Ok(()) = restored.load(&frozen));
        check!(restored.freeze() == frozen);
    }

    #[rstest]
    fn negative_priority_objects_are_dropped(mut builder: IndexBuilder) {
        let mut source = doc("api", "API", &[]);
        source.objects = vec![DescribedObject {
            priority: -1,
            ..DescribedObject::new("py", "function", "hidden")
        }];
        builder.feed(&source);
        let index = builder.freeze();
        check!(index.objects.is_empty());
        check!(index.objtypes.is_empty());
    }

    #[rstest]
    fn load_then_freeze_reproduces_the_index(mut builder: IndexBuilder) {
        let mut api = doc("api", "API <reference>", &["Runner helpers."]);
        api.objects = vec![
            DescribedObject::new("py", "module", "kf"),
            DescribedObject::new("py", "class", "kf.Map<K>"),
        ];
        builder.feed(&api);
        builder.feed(&doc("index", "Overview", &["Welcome to the docs."]));
        let frozen = builder.freeze();

        let mut restored = IndexBuilder::new(Language::english());
        let_assert!(Ok(()) = restored.load(&frozen));
        check!(restored.freeze() == frozen);
        check!(frozen.objects["kf"].contains_key("Map&lt;K&gt;"));
    }

    #[rstest]
    fn load_rejects_other_producer_versions(mut builder: IndexBuilder) {
        let mut frozen = IndexBuilder::new(Language::english()).freeze();
        frozen.envversion.insert(PRODUCER.to_string(), FORMAT_VERSION + 1);
        let_assert!(Err(IndexError::VersionMismatch { .. }) = builder.load(&frozen));

        frozen.envversion.clear();
        frozen.envversion.insert("sphinx".to_string(), 56);
        let_assert!(Err(IndexError::VersionMismatch { .. }) = builder.load(&frozen));
    }

    #[rstest]
    #[case("py", "method", "Python method")]
    #[case("py", "staticmethod", "Python static method")]
    #[case("c", "var", "C variable")]
    #[case("std", "label", "label")]
    fn type_labels(#[case] domain: &str, #[case] objtype: &str, #[case] expected: &str) {
        check!(object_type_label(domain, objtype) == expected);
    }

    #[test]
    fn html_escaping_round_trips() {
        let raw = "a<b>&\"c'";
        check!(html_escape(raw) == "a&lt;b&gt;&amp;&quot;c&#x27;");
        check!(html_unescape(&html_escape(raw)) == raw);
    }
}

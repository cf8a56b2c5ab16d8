//! Query evaluation against a frozen [`SearchIndex`].

use super::index::SearchIndex;
use super::query::ParsedQuery;
use super::scoring::Scorer;
use super::tokenize::Language;
use ahash::AHashMap;
use rapidfuzz::distance::jaro_winkler;
use serde::Serialize;
use std::collections::BTreeMap;

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Maximum number of suggestions returned.
const MAX_SUGGESTIONS: usize = 5;

/// A single ranked hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub docname: String,
    /// Page title for document hits, the object's full name for object hits.
    pub title: String,
    /// Fragment within the page, empty for whole-document hits.
    pub anchor: String,
    /// "<type label>, in <page title>" for object hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub score: i32,
    pub filename: String,
}

impl SearchResult {
    /// `docname#anchor`, or the bare docname for document hits.
    pub fn target(&self) -> String {
        if self.anchor.is_empty() {
            self.docname.clone()
        } else {
            format!("{}#{}", self.docname, self.anchor)
        }
    }
}

/// Results of one query, with suggestions when nothing matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
    /// Number of matches before the limit was applied.
    pub total: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

/// Evaluates queries. Holds only shared references, so it is cheap to create per request.
#[derive(Debug, Clone, Copy)]
pub struct Searcher<'a> {
    index: &'a SearchIndex,
    language: &'a Language,
    scorer: &'a Scorer,
}

impl<'a> Searcher<'a> {
    pub fn new(index: &'a SearchIndex, language: &'a Language, scorer: &'a Scorer) -> Self {
        Self {
            index,
            language,
            scorer,
        }
    }

    /// Parses and runs `query`, returning at most `limit` results.
    pub fn search(&self, query: &str, limit: usize) -> SearchResponse {
        let parsed = ParsedQuery::parse(query, self.language);
        let mut results = self.run(&parsed);
        let total = results.len();
        results.truncate(limit);

        let suggestions = if total == 0 {
            self.suggest(&parsed)
        } else {
            Vec::new()
        };

        tracing::debug!("Query '{}' matched {} results", query, total);
        SearchResponse {
            query: query.to_string(),
            results,
            total,
            suggestions,
        }
    }

    /// All results of a parsed query, ranked.
    pub fn run(&self, query: &ParsedQuery) -> Vec<SearchResult> {
        let mut best: BTreeMap<(String, String), SearchResult> = BTreeMap::new();

        let objects = query.object_terms.iter().enumerate().flat_map(|(i, term)| {
            let others: Vec<&str> = query
                .object_terms
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, other)| other.as_str())
                .collect();
            self.object_search(term, &others)
        });

        for result in objects.chain(self.term_search(query)) {
            let key = (result.docname.clone(), result.anchor.clone());
            match best.get(&key) {
                Some(existing) if existing.score >= result.score => {}
                _ => {
                    best.insert(key, result);
                }
            }
        }

        let mut results: Vec<SearchResult> = best.into_values().collect();
        results.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        });
        results
    }

    /// Objects whose full name contains `term` and whose description contains every one of `others`.
    fn object_search(&self, term: &str, others: &[&str]) -> Vec<SearchResult> {
        let mut results = Vec::new();
        for object in self.index.object_entries() {
            let fullname = object.fullname();
            let lower = fullname.to_lowercase();
            if !lower.contains(term) {
                continue;
            }
            let Some(doc) = self.index.document(object.entry.docindex()) else {
                continue;
            };

            if !others.is_empty() {
                let haystack =
                    format!("{} {} {} {}", object.prefix, object.name, object.label(), doc.title)
                        .to_lowercase();
                if !others.iter().all(|other| haystack.contains(other)) {
                    continue;
                }
            }

            let score = self.scorer.object_name(&lower, term)
                + self.scorer.object_priority(object.entry.priority());
            results.push(SearchResult {
                docname: doc.docname.to_string(),
                anchor: object.resolved_anchor(),
                title: fullname,
                description: Some(format!("{}, in {}", object.label(), doc.title)),
                score,
                filename: doc.filename.to_string(),
            });
        }
        results
    }

    /// Documents matching every search term and no excluded term.
    fn term_search(&self, query: &ParsedQuery) -> Vec<SearchResult> {
        if query.search_terms.is_empty() {
            return Vec::new();
        }

        // document -> (matched term count, best score)
        let mut scores: AHashMap<usize, (usize, i32)> = AHashMap::new();
        for term in &query.search_terms {
            let hits = self.term_hits(term);
            if hits.is_empty() {
                return Vec::new();
            }
            for (doc, score) in hits {
                let entry = scores.entry(doc).or_insert((0, i32::MIN));
                entry.0 += 1;
                entry.1 = entry.1.max(score);
            }
        }

        let mut docs: Vec<(usize, i32)> = scores
            .into_iter()
            .filter(|&(doc, (matched, _))| {
                matched == query.search_terms.len() && !self.is_excluded(doc, query)
            })
            .map(|(doc, (_, score))| (doc, score))
            .collect();
        docs.sort_unstable();

        docs.into_iter()
            .filter_map(|(doc, score)| {
                let doc = self.index.document(doc)?;
                Some(SearchResult {
                    docname: doc.docname.to_string(),
                    title: doc.title.to_string(),
                    anchor: String::new(),
                    description: None,
                    score,
                    filename: doc.filename.to_string(),
                })
            })
            .collect()
    }

    /// Best score per document for a single term.
    fn term_hits(&self, term: &str) -> AHashMap<usize, i32> {
        let mut hits: AHashMap<usize, i32> = AHashMap::new();
        let mut record = |docs: &[usize], score: i32| {
            for &doc in docs {
                let best = hits.entry(doc).or_insert(score);
                *best = (*best).max(score);
            }
        };

        record(self.index.lookup_term(term), self.scorer.term);
        record(self.index.lookup_title_term(term), self.scorer.title);

        if term.chars().count() > 2 {
            if !self.index.terms.contains_key(term) {
                for (candidate, docs) in &self.index.terms {
                    if candidate.contains(term) {
                        record(docs.as_slice(), self.scorer.partial_term);
                    }
                }
            }
            if !self.index.titleterms.contains_key(term) {
                for (candidate, docs) in &self.index.titleterms {
                    if candidate.contains(term) {
                        record(docs.as_slice(), self.scorer.partial_title);
                    }
                }
            }
        }
        hits
    }

    fn is_excluded(&self, doc: usize, query: &ParsedQuery) -> bool {
        query.excluded_terms.iter().any(|term| {
            self.index.lookup_term(term).contains(&doc)
                || self.index.lookup_title_term(term).contains(&doc)
        })
    }

    /// Index terms close to the query words.
    pub fn suggest(&self, query: &ParsedQuery) -> Vec<String> {
        let mut candidates: Vec<(f64, &str)> = Vec::new();
        for word in &query.highlight_terms {
            for term in self.index.terms.keys().chain(self.index.titleterms.keys()) {
                if term == word {
                    continue;
                }
                let score = jaro_winkler::similarity(word.chars(), term.chars());
                if score >= SUGGESTION_THRESHOLD {
                    candidates.push((score, term));
                }
            }
        }

        candidates.sort_by(|(a, term_a), (b, term_b)| b.total_cmp(a).then(term_a.cmp(term_b)));
        let mut suggestions: Vec<String> = Vec::new();
        for (_, term) in candidates {
            if suggestions.len() == MAX_SUGGESTIONS {
                break;
            }
            if !suggestions.iter().any(|s| s == term) {
                suggestions.push(term.to_string());
            }
        }
        suggestions
    }
}

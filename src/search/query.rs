//! Query parsing.

use super::tokenize::{Language, is_digits};

/// A search query split into the term lists the searcher works with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    /// Stemmed terms every result must contain.
    pub search_terms: Vec<String>,
    /// Stemmed terms no result may contain (written as `-word`).
    pub excluded_terms: Vec<String>,
    /// Lowercased words worth highlighting in result pages.
    pub highlight_terms: Vec<String>,
    /// Lowercased words matched against object names.
    pub object_terms: Vec<String>,
}

impl ParsedQuery {
    /// Splits on whitespace and classifies each word.
    ///
    /// Stopwords and numbers still take part in object search but are
    /// ignored for full-text search. A stem shorter than three characters is
    /// replaced by the word itself when the word is longer.
    pub fn parse(query: &str, language: &Language) -> Self {
        let mut parsed = Self::default();

        for raw in query.split_whitespace() {
            let (excluded, word) = match raw.strip_prefix('-') {
                Some(rest) if !rest.is_empty() => (true, rest),
                _ => (false, raw),
            };
            let lower = word.to_lowercase();

            if !excluded {
                push_unique(&mut parsed.object_terms, lower.clone());
            }
            if language.is_stopword(&lower) || is_digits(&lower) {
                continue;
            }

            let mut term = language.stem(&lower);
            if term.chars().count() < 3 && word.chars().count() >= 3 {
                term = word.to_string();
            }

            if excluded {
                push_unique(&mut parsed.excluded_terms, term);
            } else {
                push_unique(&mut parsed.highlight_terms, lower);
                push_unique(&mut parsed.search_terms, term);
            }
        }

        tracing::trace!(?parsed, "Parsed query '{}'", query);
        parsed
    }

    pub fn is_empty(&self) -> bool {
        self.search_terms.is_empty() && self.object_terms.is_empty()
    }
}

fn push_unique(terms: &mut Vec<String>, term: String) {
    if !terms.contains(&term) {
        terms.push(term);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    #[test]
    fn words_are_stemmed_and_stopwords_skipped() {
        let lang = Language::english();
        let query = ParsedQuery::parse("the Transformation of packages", &lang);
        check!(query.search_terms == vec!["transform", "packag"]);
        check!(query.highlight_terms == vec!["transformation", "packages"]);
        check!(query.object_terms == vec!["the", "transformation", "of", "packages"]);
    }

    #[test]
    fn leading_dash_excludes() {
        let lang = Language::english();
        let query = ParsedQuery::parse("ingest -tests", &lang);
        check!(query.search_terms == vec!["ingest"]);
        check!(query.excluded_terms == vec![lang.stem("tests")]);
        check!(query.object_terms == vec!["ingest"]);
    }

    #[rstest]
    #[case("2018 release", vec!["releas"])]
    #[case("  load   load  ", vec!["load"])]
    #[case("-", vec!["-"])]
    fn parse_edge_cases(#[case] input: &str, #[case] expected: Vec<&str>) {
        let query = ParsedQuery::parse(input, &Language::english());
        check!(query.search_terms == expected);
    }

    #[test]
    fn empty_query() {
        let query = ParsedQuery::parse("   ", &Language::english());
        check!(query.is_empty());
    }
}

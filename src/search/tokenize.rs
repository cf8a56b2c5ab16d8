//! Text tokenization, stemming and word filtering for search indexing.

use crate::error::ConfigError;
use ahash::AHashSet;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::sync::LazyLock;

/// Words shorter than this are never indexed when they start with a Latin-1 character.
const MIN_WORD_LENGTH: usize = 3;

/// Common English stop words filtered out from indexing and queries.
pub(crate) const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "near", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
    "these", "they", "this", "to", "was", "will", "with",
];

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("word pattern is valid"));

/// Language-specific word handling shared by the index builder and the query parser.
pub struct Language {
    code: String,
    stemmer: Stemmer,
    stopwords: AHashSet<String>,
}

impl std::fmt::Debug for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Language")
            .field("code", &self.code)
            .field("stopwords", &self.stopwords.len())
            .finish()
    }
}

impl Language {
    /// Creates the language for a Snowball language code.
    pub fn new(code: &str, extra_stopwords: &[String]) -> Result<Self, ConfigError> {
        let algorithm = algorithm_for(code)
            .ok_or_else(|| ConfigError::UnsupportedLanguage(code.to_string()))?;

        let mut stopwords: AHashSet<String> = if code == "en" {
            ENGLISH_STOPWORDS.iter().map(|w| (*w).to_string()).collect()
        } else {
            AHashSet::new()
        };
        stopwords.extend(extra_stopwords.iter().cloned());

        Ok(Self {
            code: code.to_string(),
            stemmer: Stemmer::create(algorithm),
            stopwords,
        })
    }

    /// The default English language.
    pub fn english() -> Self {
        Self {
            code: "en".to_string(),
            stemmer: Stemmer::create(Algorithm::English),
            stopwords: ENGLISH_STOPWORDS.iter().map(|w| (*w).to_string()).collect(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Splits text into word runs. Underscores are word characters.
    pub fn split<'a>(&self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        WORD_RE.find_iter(text).map(|m| m.as_str())
    }

    /// Lowercases and stems a word.
    pub fn stem(&self, word: &str) -> String {
        self.stemmer.stem(&word.to_lowercase()).into_owned()
    }

    /// Stopword membership is case-sensitive: `And` is not the stopword `and`.
    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    /// Decides whether a word may enter the index.
    pub fn word_filter(&self, word: &str) -> bool {
        let Some(first) = word.chars().next() else {
            return false;
        };
        let len = word.chars().count();
        let code = u32::from(first);

        let short_hiragana = len < MIN_WORD_LENGTH && (12354..12436).contains(&code);
        let rejected_latin = code < 256
            && (len < MIN_WORD_LENGTH || self.is_stopword(word) || is_digits(word));

        !(short_hiragana || rejected_latin)
    }

    /// The form under which `word` is indexed, if any.
    ///
    /// The stem is preferred; when stemming would drop the word (too short,
    /// or it collapses onto a stopword), the raw word is used if it passes.
    pub fn index_word(&self, word: &str) -> Option<String> {
        let stemmed = self.stem(word);
        if self.word_filter(&stemmed) {
            Some(stemmed)
        } else if self.word_filter(word) {
            Some(word.to_string())
        } else {
            None
        }
    }
}

pub(crate) fn is_digits(word: &str) -> bool {
    !word.is_empty() && word.chars().all(char::is_numeric)
}

fn algorithm_for(code: &str) -> Option<Algorithm> {
    let algorithm = match code {
        "ar" => Algorithm::Arabic,
        "da" => Algorithm::Danish,
        "nl" => Algorithm::Dutch,
        "en" => Algorithm::English,
        "fi" => Algorithm::Finnish,
        "fr" => Algorithm::French,
        "de" => Algorithm::German,
        "el" => Algorithm::Greek,
        "hu" => Algorithm::Hungarian,
        "it" => Algorithm::Italian,
        "no" => Algorithm::Norwegian,
        "pt" => Algorithm::Portuguese,
        "ro" => Algorithm::Romanian,
        "ru" => Algorithm::Russian,
        "es" => Algorithm::Spanish,
        "sv" => Algorithm::Swedish,
        "ta" => Algorithm::Tamil,
        "tr" => Algorithm::Turkish,
        _ => return None,
    };
    Some(algorithm)
}

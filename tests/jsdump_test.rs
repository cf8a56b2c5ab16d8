mod common;

use assert2::{check, let_assert};
use common::project_root;
use docsearch::IndexError;
use docsearch::jsdump::{IndexFormat, dump_index, load_index, loads};
use docsearch::search::{DocSet, IndexBuilder, Language, SearchIndex};
use rstest::{fixture, rstest};

#[fixture]
fn sphinx_index_text() -> String {
    std::fs::read_to_string(project_root().join("tests/fixtures/quoted_searchindex.js"))
        .expect("Failed to read fixture index")
}

/// Test: An index written by another generator loads and satisfies every invariant.
#[rstest]
fn foreign_index_loads(sphinx_index_text: String) {
    let_assert!(Ok(index) = load_index(&sphinx_index_text));
    check!(index.docnames == ["api", "index", "tutorial"]);
    check!(index.validate().is_empty(), "{:?}", index.validate());
    check!(index.terms["extract"] == DocSet::One(2));
    check!(index.lookup_term("ingest") == [0, 1, 2]);
    check!(index.envversion["sphinx"] == 56);
}

/// Test: Object entries resolve their shortened anchors.
#[rstest]
fn foreign_objects_resolve(sphinx_index_text: String) {
    let_assert!(Ok(index) = load_index(&sphinx_index_text));
    let anchors: Vec<(String, String)> = index
        .object_entries()
        .map(|object| (object.fullname(), object.resolved_anchor()))
        .collect();
    check!(anchors.contains(&(
        "kf_lib_data_ingest.common.errors".to_string(),
        "module-kf_lib_data_ingest.common.errors".to_string()
    )));
    check!(anchors.contains(&(
        "kf_lib_data_ingest.common.errors.InvalidIngestStageParameters".to_string(),
        "kf_lib_data_ingest.common.errors.InvalidIngestStageParameters".to_string()
    )));
}

/// Test: Re-dumping a loaded index in either format reads back identically.
#[rstest]
#[case(IndexFormat::Js)]
#[case(IndexFormat::Json)]
fn redump_preserves_contents(sphinx_index_text: String, #[case] format: IndexFormat) {
    let_assert!(Ok(index) = load_index(&sphinx_index_text));
    let_assert!(Ok(text) = dump_index(&index, format));
    let_assert!(Ok(again) = load_index(&text));
    check!(again == index);
}

/// Test: The builder refuses to continue from another producer's index.
#[rstest]
fn builder_rejects_foreign_producer(sphinx_index_text: String) {
    let_assert!(Ok(index) = load_index(&sphinx_index_text));
    let mut builder = IndexBuilder::new(Language::english());
    let_assert!(Err(IndexError::VersionMismatch { .. }) = builder.load(&index));
    check!(builder.is_empty());
}

/// Test: Hand-written payloads in the older bare-key dialect are accepted.
#[test]
fn bare_key_dialect_loads() {
    let text = "Search.setIndex({docnames:['index'],envversion:{docsearch:1},filenames:['index.rst'],\
                objects:{},objnames:{},objtypes:{},terms:{ingest:0},titles:['Overview'],titleterms:{overview:0}});";
    let_assert!(Ok(index) = load_index(text));
    check!(index.titles == ["Overview"]);
    check!(index.validate().is_empty());
}

/// Test: Malformed payloads are reported, not half-loaded.
#[rstest]
#[case("var index = {};")]
#[case("Search.setIndex({docnames:[}")]
#[case("Search.setIndex({docnames:['a']})")]
fn malformed_payloads_fail(#[case] text: &str) {
    check!(load_index(text).is_err());
}

/// Test: Structural problems survive loading and are reported by validation.
#[test]
fn invariant_violations_are_reported() {
    let text = "Search.setIndex({docnames:['b','a'],envversion:{},filenames:['b.rst','a.rst'],\
                objects:{},objnames:{},objtypes:{},terms:{word:[1,0]},titles:['B','A'],titleterms:{}})";
    let_assert!(Ok(index) = load_index(text));
    let problems = index.validate();
    check!(problems.iter().any(|p| matches!(p, IndexError::UnsortedDocnames(1))));
    check!(problems.iter().any(|p| matches!(p, IndexError::InvalidDocSet { table: "terms", .. })));
}

/// Test: The literal parser reports the byte offset of a syntax error.
#[test]
fn syntax_errors_carry_offsets() {
    let_assert!(Err(e) = loads("{a:1,b:}"));
    check!(e.offset == 7);
}

/// Test: An empty index dumps to the minimal payload.
#[test]
fn empty_index_dump() {
    let_assert!(Ok(text) = dump_index(&SearchIndex::default(), IndexFormat::Js));
    check!(
        text == "Search.setIndex({docnames:[],envversion:{},filenames:[],objects:{},objnames:{},objtypes:{},terms:{},titles:[],titleterms:{}})"
    );
}

#[fixture]
fn published_index_text() -> String {
    std::fs::read_to_string(project_root().join("tests/fixtures/kf_searchindex.js"))
        .expect("Failed to read published index")
}

/// Test: The index published with the ingest library docs loads and validates.
#[rstest]
fn published_index_loads(published_index_text: String) {
    let_assert!(Ok(index) = load_index(&published_index_text));
    check!(index.docnames.len() == 18);
    check!(index.validate().is_empty(), "{:?}", index.validate());
    check!(index.envversion["sphinx"] == 55);

    let_assert!(Some(doc) = index.document_index("reference/common"));
    check!(index.titles[doc] == "Common");
    check!(index.object_entries().all(|object| object.entry.docindex() == doc));
    check!(index.stats().objects == 6);
}

/// Test: Writing the published index back reproduces it byte-for-byte.
#[rstest]
fn published_index_redumps_identically(published_index_text: String) {
    let_assert!(Ok(index) = load_index(&published_index_text));
    let_assert!(Ok(text) = dump_index(&index, IndexFormat::Js));
    check!(text == published_index_text.trim_end());
}

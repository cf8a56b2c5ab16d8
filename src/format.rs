//! Plain-text rendering shared by the CLI and the MCP tools.

use crate::error::IndexError;
use crate::search::{SearchIndex, SearchResponse};
use std::fmt::Write as _;

/// Format search results into a readable string output.
pub fn format_search_response(response: &SearchResponse) -> String {
    let mut output = String::new();

    if response.results.is_empty() {
        let _ = writeln!(output, "No results found for '{}'.", response.query);
        if !response.suggestions.is_empty() {
            let _ = writeln!(output, "\nDid you mean: {}?", response.suggestions.join(", "));
        }
        output.push_str("\nSearch tips:\n");
        output.push_str("• Every word must occur in a result; try fewer words\n");
        output.push_str("• Search uses stemming: 'loading' matches 'load'\n");
        output.push_str("• Prefix a word with '-' to exclude pages containing it\n");
        return output;
    }

    let _ = writeln!(
        output,
        "Search results for '{}' ({} of {}):\n",
        response.query,
        response.results.len(),
        response.total
    );
    for (idx, result) in response.results.iter().enumerate() {
        let _ = writeln!(
            output,
            "{}. {} [{}] - score: {}",
            idx + 1,
            result.title,
            result.target(),
            result.score
        );
        if let Some(description) = &result.description {
            let _ = writeln!(output, "   {}", description);
        }
        let _ = writeln!(output, "   source: {}", result.filename);
    }
    output
}

/// Lists every document of an index.
pub fn format_documents(index: &SearchIndex) -> String {
    let mut output = format!("{} documents:\n\n", index.docnames.len());
    for doc in index.documents() {
        let _ = writeln!(output, "• {}: {} ({})", doc.docname, doc.title, doc.filename);
    }
    output
}

/// Summary of an index and every invariant violation found in it.
pub fn format_inspection(index: &SearchIndex, problems: &[IndexError]) -> String {
    let stats = index.stats();
    let mut output = String::new();

    let versions: Vec<String> = index
        .envversion
        .iter()
        .map(|(producer, version)| format!("{} {}", producer, version))
        .collect();
    let _ = writeln!(output, "Producer:      {}", versions.join(", "));
    let _ = writeln!(output, "Documents:     {}", stats.documents);
    let _ = writeln!(output, "Terms:         {}", stats.terms);
    let _ = writeln!(output, "Title terms:   {}", stats.title_terms);
    let _ = writeln!(output, "Objects:       {}", stats.objects);
    let _ = writeln!(output, "Object types:  {}", stats.object_types);
    for (typeindex, name) in &index.objnames {
        let _ = writeln!(output, "  {}: {} ({}:{})", typeindex, name.label(), name.domain(), name.objtype());
    }

    if problems.is_empty() {
        output.push_str("\nNo problems found.\n");
    } else {
        let _ = writeln!(output, "\n{} problems found:", problems.len());
        for problem in problems {
            let _ = writeln!(output, "• {}", problem);
        }
    }
    output
}

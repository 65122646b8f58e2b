use citeqa_core::types::{Answer, Citation, RankedResult};

/// Snippet plus the citation of the context it came from.
pub fn assemble(top: &RankedResult, snippet: String) -> Answer {
    Answer {
        snippet,
        citation: Citation { title: top.title.clone(), url: top.url.clone(), chunk_id: top.chunk_id },
    }
}

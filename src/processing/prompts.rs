//! Prompt templates sent to the language model.
//!
//! Templates use `{context_str}` for retrieved text and `{query_str}` for the question.

/// Answer returned when no chunk clears the relevance gate.
pub const NO_RELEVANT_INFORMATION: &str =
    "I could not find relevant information about that question in the uploaded documents.";

/// Question-answering template grounded strictly in retrieved context.
pub const QA_PROMPT: &str = "\
Context information is below.
---------------------
{context_str}
---------------------
Given the context information and not prior knowledge, answer the query.
Query: {query_str}
Answer: ";

/// Structured single-document summary template.
pub const SUMMARIZE_PROMPT: &str = "\
You are an expert in document analysis. Your task is to write a concise, useful summary of the following document.

Document to summarize:
{context_str}

Instructions:
1. Identify the key points and main themes of the document
2. Write a structured summary that includes:
   - The main theme of the document
   - Key points (3-5 at most)
   - Conclusions or other relevant information
3. Keep the summary between 150 and 300 words
4. Use clear, professional language
5. If the document contains specific data, include it in the summary

Question: {query_str}
";

/// Question asked of each reloaded document.
pub const SUMMARIZE_QUERY: &str =
    "Provide a complete and structured summary of this PDF document.";

/// Cross-document relation template covering four axes.
pub const RELATION_PROMPT: &str = "\
You are an expert document analyst. Identify and analyze the relations, connections, and patterns between the following documents based on their summaries.

DOCUMENTS TO ANALYZE:
{context_str}

REQUIRED ANALYSIS:

1. THEMATIC RELATIONS:
   - Do they share main or secondary themes?
   - Are there common concepts, terms, or areas of knowledge?
   - Do they complement each other on a specific topic?

2. TEMPORAL RELATIONS:
   - Are there related dates, periods, or time sequences?
   - Is any document a continuation or update of another?

3. CONTENT RELATIONS:
   - Do they mention the same people, organizations, or entities?
   - Do they share data, statistics, or references?
   - Are there contradictions or complementary facts?

4. FUNCTIONAL RELATIONS:
   - Are they the same kind of document (reports, manuals, studies)?
   - Do they belong to the same project, area, or department?

RESPONSE FORMAT:
- If there are NO significant relations, say so explicitly, explain why, and name the main differences
- If there ARE relations, describe them in a structured and specific way with concrete examples
- Do not invent information that is not present in the summaries

Question: {query_str}

DETAILED ANSWER:
";

/// Question asked of the combined summaries.
pub const RELATION_QUERY: &str = "Analyze the thematic, temporal, content, and functional relations between these documents. Include patterns and conclusions without inventing information that is not in the summaries.";

/// Broad probes used to surface chunks of every indexed document.
pub const RECONSTRUCTION_PROBES: [&str; 4] = [
    "document content text information",
    "PDF file pages content",
    "data main information topic",
    "summary main content document",
];

/// Fill a template with retrieved context and the question.
///
/// Placeholders are resolved in a single pass over the template; substituted text is never
/// scanned again.
pub fn render(template: &str, context: &str, query: &str) -> String {
    let mut out = String::with_capacity(template.len() + context.len() + query.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix("{context_str}") {
            out.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{query_str}") {
            out.push_str(query);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Summary request for text rebuilt from the index, with the source named inline.
pub fn reconstructed_summary_query(source: &str) -> String {
    format!("Write a structured summary of the content of the document from source '{source}'.")
}

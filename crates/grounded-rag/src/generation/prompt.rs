//! Prompt templates for the search and citation formatting passes

use crate::types::FormattingContext;

/// Prompt builder for both generation passes
pub struct PromptBuilder;

impl PromptBuilder {
    /// System instruction for the search pass
    pub fn search_instruction() -> &'static str {
        r#"ROLE:
- You are an advanced multimodal document search agent.
- Your primary source of information is the document search tool attached to this request.

WHEN A USER ASKS A QUESTION:
1. Analyze the query to identify key technical terms and concepts
2. Search the documentation using specific keywords
3. Synthesize a clear, concise, accurate answer based ONLY on the search results
4. If the search results are insufficient, say that the information cannot be found in the provided documents
5. NEVER use external knowledge or guess

ABOUT THE SEARCH TOOL:
- It searches a collection of PDF manuals and technical guides
- Image content (tables, diagrams) is indexed, so visual details can be searched with descriptive text

TONE: Professional, precise, and helpful."#
    }

    /// System instruction for the citation formatting pass
    pub fn formatting_instruction() -> &'static str {
        r#"ROLE:
- You format the output of a document search agent.
- Every claim in the text must be cited with the correct key from the provided grounding chunks.

INPUT:
- AGENT RESPONSE: the original text generated by the search agent
- GROUNDING CHUNKS: the chunks used to ground the response, each with a key (e.g. uri_1) and a content snippet

INSTRUCTIONS:
1. Rewrite the AGENT RESPONSE to include inline citations
2. The citation format MUST be double square brackets containing the key, e.g. [[uri_1]]
3. Place the citation immediately after the sentence or clause it supports
4. If multiple chunks support a statement, include all of them, e.g. [[uri_1]] [[uri_2]]
5. Do NOT change the meaning or facts of the original text
6. ONLY use keys listed under GROUNDING CHUNKS - never invent keys or write locations"#
    }

    /// User message for the formatting pass
    pub fn build_formatting_prompt(context: &FormattingContext) -> String {
        let mut prompt = String::new();

        prompt.push_str("AGENT RESPONSE:\n");
        prompt.push_str(&context.draft_text);
        prompt.push_str("\n\n");

        prompt.push_str("GROUNDING CHUNKS:\n");
        if context.chunks.is_empty() {
            prompt.push_str("(none - leave the response uncited)\n");
        }
        // `key: snippet`; keys are never shown in single brackets
        for chunk in &context.chunks {
            let snippet = chunk.snippet.as_deref().unwrap_or("(no snippet)");
            prompt.push_str(&format!("{}: {}\n", chunk.key, snippet));
            if let Some(title) = &chunk.title {
                prompt.push_str(&format!("Title: {}\n", title));
            }
            prompt.push_str("---\n");
        }

        if !context.allowed_keys.is_empty() {
            prompt.push_str(&format!(
                "\nALLOWED KEYS: {}\n",
                context.allowed_keys.join(", ")
            ));
        }

        prompt.push_str("\nRewrite the agent response with inline [[key]] citations:");
        prompt
    }
}

//! Prompt templates for grounded answers

/// Separator placed between retrieved contexts
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Answer the model is told to give when the context lacks the information
pub const NOT_FOUND_ANSWER: &str = "Sorry, I could not find that information in the documents.";

/// Prompt builder for grounded queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join retrieved contexts into one grounding block
    pub fn build_context(contexts: &[String]) -> String {
        contexts.join(CONTEXT_SEPARATOR)
    }

    /// Build the full prompt with grounding instructions
    pub fn build_prompt(question: &str, contexts: &[String]) -> String {
        format!(
            r#"You are an AI assistant that answers questions using the context provided.

CONTEXT:
{context}

QUESTION: {question}

INSTRUCTIONS:
1. Answer the question using the information in the context above
2. If the information is in the context, give a clear and concise answer
3. If the information is not in the context, say "{not_found}"
4. Do not make up information that is not in the context
5. Answer in the language of the question

ANSWER:"#,
            context = Self::build_context(contexts),
            question = question,
            not_found = NOT_FOUND_ANSWER,
        )
    }
}

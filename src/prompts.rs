//! Centralized prompt construction.
//!
//! Ordinary stage prompts and the final-petition prompt live behind the
//! analysis service, which receives the stage index on the wire. Only the
//! free-form question path composes its prompt client-side, because the wire
//! contract has no question field.

/// Build the request text for a free-form question against a case.
pub fn question_prompt(question: &str) -> String {
    format!(
        "You are a legal analyst. Answer the following question about the case, \
         grounding the answer in the stage analyses provided as context. If the \
         context does not settle the question, say so.\n\nQuestion:\n{}",
        question
    )
}

use std::collections::VecDeque;

/// Character budget for assembled prior-stage context, a rough approximation
/// of the service's token budget.
pub const CONTEXT_CEILING_CHARS: usize = 24_000;

/// Assemble bounded context from prior stage outputs.
///
/// Relevance is purely chronological, so eviction is FIFO: the oldest entries
/// are dropped one at a time until the total length fits under the ceiling or
/// only one entry remains. No summarization, only eviction.
pub fn assemble_context(outputs: &[String], ceiling: usize) -> Vec<String> {
    let mut context: VecDeque<String> = outputs.to_vec().into();
    let mut total: usize = context.iter().map(|s| s.chars().count()).sum();

    while total > ceiling && context.len() > 1 {
        if let Some(evicted) = context.pop_front() {
            total -= evicted.chars().count();
        }
    }

    context.into()
}

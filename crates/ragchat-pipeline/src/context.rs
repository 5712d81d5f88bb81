//! Greedy, budget-bounded context assembly.

use std::collections::HashSet;

use ragchat_core::types::{Context, ScoredPassage, SizePolicy};

#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler {
    policy: SizePolicy,
}

impl ContextAssembler {
    pub fn new(policy: SizePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> SizePolicy {
        self.policy
    }

    /// Select passages in rank order without exceeding `budget`.
    ///
    /// Duplicate document ids keep their best-ranked occurrence. A passage that
    /// does not fit in the remaining budget is skipped whole and the next one
    /// is tried; passages are never cut.
    pub fn assemble(&self, passages: &[ScoredPassage], budget: usize) -> Context {
        let mut ordered: Vec<&ScoredPassage> = passages.iter().collect();
        ordered.sort_by_key(|p| p.rank);

        let mut seen = HashSet::new();
        let mut selected = Vec::new();
        let mut size = 0usize;
        for passage in ordered {
            if !seen.insert(passage.document.id.as_str()) {
                continue;
            }
            let cost = self.policy.measure(&passage.document.text);
            if size + cost > budget {
                tracing::trace!(id = %passage.document.id, cost, remaining = budget - size, "passage skipped");
                continue;
            }
            size += cost;
            selected.push(passage.clone());
        }
        Context { passages: selected, size, budget, policy: self.policy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragchat_core::types::Document;

    fn passage(id: &str, text: &str, rank: usize) -> ScoredPassage {
        ScoredPassage { document: Document::new(id, text), score: 1.0 / rank as f32, rank }
    }

    #[test]
    fn skips_passage_that_does_not_fit_and_tries_the_next() {
        let passages = vec![passage("a", "aaaa", 1), passage("b", "bbbbbbbbbb", 2), passage("c", "cc", 3)];
        let ctx = ContextAssembler::new(SizePolicy::Chars).assemble(&passages, 7);
        assert_eq!(ctx.document_ids(), vec!["a", "c"]);
        assert_eq!(ctx.size, 6);
    }

    #[test]
    fn duplicate_ids_keep_best_rank_even_if_out_of_order() {
        let passages = vec![passage("a", "later copy", 3), passage("b", "bb", 2), passage("a", "first", 1)];
        let ctx = ContextAssembler::default().assemble(&passages, 100);
        assert_eq!(ctx.document_ids(), vec!["a", "b"]);
        assert_eq!(ctx.passages[0].document.text, "first");
    }

    #[test]
    fn zero_budget_yields_empty_context() {
        let ctx = ContextAssembler::default().assemble(&[passage("a", "x", 1)], 0);
        assert!(ctx.is_empty());
        assert_eq!(ctx.size, 0);
    }
}

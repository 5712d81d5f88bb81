use ragchat_core::types::Context;

/// Renders the generator prompt from a template with `{context}` and
/// `{question}` placeholders.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: String,
}

impl PromptBuilder {
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into() }
    }

    /// Placeholders are substituted in one pass, so braces inside the question
    /// or the passages are copied literally.
    pub fn build(&self, question: &str, context: &Context) -> String {
        let context_text = format_context(context);
        let mut out = String::with_capacity(self.template.len() + context_text.len() + question.len());
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            if let Some(after) = tail.strip_prefix("{context}") {
                out.push_str(&context_text);
                rest = after;
            } else if let Some(after) = tail.strip_prefix("{question}") {
                out.push_str(question);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

/// Numbered passages with their source id, one block per passage.
pub fn format_context(context: &Context) -> String {
    context
        .passages
        .iter()
        .enumerate()
        .map(|(i, p)| format!("[{}] (source: {})\n{}", i + 1, p.document.id, p.document.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragchat_core::types::{Document, ScoredPassage, SizePolicy};

    fn context(texts: &[(&str, &str)]) -> Context {
        let passages = texts
            .iter()
            .enumerate()
            .map(|(i, (id, text))| ScoredPassage { document: Document::new(*id, *text), score: 1.0, rank: i + 1 })
            .collect();
        Context { passages, size: 0, budget: 100, policy: SizePolicy::Chars }
    }

    #[test]
    fn fills_both_placeholders() {
        let p = PromptBuilder::new("C:\n{context}\nQ: {question}");
        let out = p.build("what?", &context(&[("a", "apple pie"), ("b", " banana ")]));
        assert_eq!(out, "C:\n[1] (source: a)\napple pie\n\n[2] (source: b)\nbanana\nQ: what?");
    }

    #[test]
    fn question_text_is_not_reinterpreted() {
        let p = PromptBuilder::new("{context}|{question}");
        let out = p.build("say {context}", &context(&[("a", "x {question}")]));
        assert_eq!(out, "[1] (source: a)\nx {question}|say {context}");
    }
}

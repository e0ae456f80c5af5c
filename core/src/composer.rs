use std::sync::Arc;
use tracing::debug;

use crate::chat::{ChatMessage, ChatModel};
use crate::{AnswerResult, Article, DistanceMetric, Result, RetrievedMatch};

/// Characters of article text kept in a response preview.
pub const PREVIEW_CHARS: usize = 200;
const ELLIPSIS: &str = "...";

pub const SYSTEM_INSTRUCTION: &str = "\
You are a helpful assistant that answers questions using only the articles provided to you.
When answering:
1. Use only information found in the supplied articles; do not rely on outside knowledge.
2. Cite every statement with [Source X] notation, where X is the number shown in the article header.
3. If you combine several sources, say which part comes from which source.
4. At the end, list the sources you used, one per line, as: Source X: [Title](URL)
If the articles do not contain a direct answer, say so clearly and suggest the top 3 articles \
that are most likely to help, in the same Source X: [Title](URL) format.";

/// Turns retrieved matches into a grounded prompt and the response shape.
pub struct AnswerComposer {
    chat: Arc<dyn ChatModel>,
    metric: DistanceMetric,
}

impl AnswerComposer {
    pub fn new(chat: Arc<dyn ChatModel>, metric: DistanceMetric) -> Self {
        Self { chat, metric }
    }

    /// One chat round-trip. A chat failure fails the whole request.
    pub async fn compose(&self, question: &str, matches: &[RetrievedMatch]) -> Result<AnswerResult> {
        let context = build_context(matches);
        let messages = [ChatMessage::system(SYSTEM_INSTRUCTION), ChatMessage::user(user_prompt(&context, question))];
        debug!(sources = matches.len(), context_chars = context.len(), "requesting completion");
        let answer = self.chat.complete(&messages).await?;

        let relevant_articles = matches
            .iter()
            .map(|m| Article {
                title: m.metadata.title.clone(),
                url: m.id.clone(),
                content: preview(&m.content),
                relevance: self.metric.relevance(m.distance),
            })
            .collect();
        Ok(AnswerResult { answer, relevant_articles })
    }
}

/// `[Source n: title - url]` blocks, numbered by rank and separated by a blank line.
pub fn build_context(matches: &[RetrievedMatch]) -> String {
    matches
        .iter()
        .enumerate()
        .map(|(i, m)| format!("[Source {}: {} - {}]\n{}", i + 1, m.metadata.title, m.metadata.url, m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn user_prompt(context: &str, question: &str) -> String {
    format!(
        "Here are the available articles:\n-----------------\n{context}\n-----------------\n\n\
         Based on these articles, please answer this question:\n{question}\n\n\
         Remember to cite sources using [Source X] notation."
    )
}

/// First [`PREVIEW_CHARS`] characters followed by `...`.
pub fn preview(content: &str) -> String {
    let mut out: String = content.chars().take(PREVIEW_CHARS).collect();
    out.push_str(ELLIPSIS);
    out
}

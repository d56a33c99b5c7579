//! Query orchestration: pre-flight gates, then the retrieve-assemble-answer
//! pipeline.

use tracing::{debug, info};

use crate::llm::mean_vector;
use crate::prompt::build_prompt;
use crate::vector::recency::prune_by_recency;
use crate::Data;

pub const NOT_LISTENING_REPLY: &str = "I'm not listening to what y'all saying 🙈🙉🙊. \
\nRun \"/listen\" if you want me to start listening.";
pub const EMPTY_QUERY_REPLY: &str = "What?";
pub const EMPTY_KNOWLEDGE_REPLY: &str =
    "Hey, Bot's knowledge base is empty now. Please say something before asking it questions.";
pub const GENERIC_ERROR_REPLY: &str = "The bot ran into an error while answering 😿. \
The details have been logged; if this keeps happening, please open an issue on the \
project's tracker — any feedback is appreciated.";

/// Pre-flight result for a query. Terminal on the first failing gate; none of
/// the failing gates touch the vector store or the LLM.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryGate {
    NotListening,
    EmptyQuery,
    EmptyKnowledge,
    Ready,
}

impl QueryGate {
    /// The fixed reply for a failed gate.
    pub fn reply(&self) -> Option<&'static str> {
        match self {
            QueryGate::NotListening => Some(NOT_LISTENING_REPLY),
            QueryGate::EmptyQuery => Some(EMPTY_QUERY_REPLY),
            QueryGate::EmptyKnowledge => Some(EMPTY_KNOWLEDGE_REPLY),
            QueryGate::Ready => None,
        }
    }
}

/// `has_knowledge` is lazy so the earlier gates decide without touching the
/// message store at all.
pub fn gate(listening: bool, query: &str, has_knowledge: impl FnOnce() -> bool) -> QueryGate {
    if !listening {
        QueryGate::NotListening
    } else if query.trim().is_empty() {
        QueryGate::EmptyQuery
    } else if !has_knowledge() {
        QueryGate::EmptyKnowledge
    } else {
        QueryGate::Ready
    }
}

/// Answer a query for a guild that passed all gates: short-term context,
/// recency-weighted retrieval, prompt assembly, one LLM call.
pub async fn answer(
    data: &Data,
    guild_id: u64,
    channel_id: u64,
    asking_user: &str,
    query: &str,
) -> anyhow::Result<String> {
    let window = data
        .messages
        .recent_for_channel(guild_id, channel_id, data.config.last_n_messages);

    let replies: Vec<String> = window.iter().map(|m| m.formatted.clone()).collect();

    // Multi-string embedding query: the recent window plus the question, so
    // retrieval also matches the conversation the question continues.
    let mut embed_inputs: Vec<String> = window.iter().map(|m| m.raw_text.clone()).collect();
    embed_inputs.push(query.to_string());

    let embeddings = data.llm.embed_many(embed_inputs).await?;
    let query_vector = mean_vector(&embeddings);

    let hits = data
        .vectors
        .search(
            &query_vector,
            guild_id,
            &data.bot_name,
            data.config.similarity_top_k,
        )
        .await?;
    debug!(
        "Retrieved {} similarity hits for guild {}",
        hits.len(),
        guild_id
    );

    let pruned = prune_by_recency(hits, data.config.recency_top_k);
    let context: Vec<String> = pruned.into_iter().map(|hit| hit.text).collect();

    let prompt = build_prompt(&context, &replies, asking_user, &data.bot_name, query);
    info!(
        "Answering query \"{}\" for @{} in guild {} ({} context lines, {} replies)",
        query,
        asking_user,
        guild_id,
        context.len(),
        replies.len()
    );

    data.llm.chat(&prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_listening_wins_regardless_of_query() {
        assert_eq!(
            gate(false, "real question", || true),
            QueryGate::NotListening
        );
        assert_eq!(gate(false, "", || false), QueryGate::NotListening);
    }

    #[test]
    fn empty_query_is_rejected_without_a_knowledge_check() {
        // The knowledge closure must never run for an empty query
        assert_eq!(
            gate(true, "", || panic!("knowledge check should be skipped")),
            QueryGate::EmptyQuery
        );
        assert_eq!(
            gate(true, "   ", || panic!("knowledge check should be skipped")),
            QueryGate::EmptyQuery
        );
    }

    #[test]
    fn empty_knowledge_base_is_rejected() {
        assert_eq!(gate(true, "anything?", || false), QueryGate::EmptyKnowledge);
    }

    #[test]
    fn all_gates_passing_is_ready() {
        let g = gate(true, "is the menu working?", || true);
        assert_eq!(g, QueryGate::Ready);
        assert!(g.reply().is_none());
    }

    #[test]
    fn failed_gates_have_fixed_replies() {
        assert_eq!(gate(false, "q", || true).reply(), Some(NOT_LISTENING_REPLY));
        assert_eq!(gate(true, "", || true).reply(), Some(EMPTY_QUERY_REPLY));
        assert_eq!(
            gate(true, "q", || false).reply(),
            Some(EMPTY_KNOWLEDGE_REPLY)
        );
    }
}

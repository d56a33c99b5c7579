//! Recency post-processing of similarity hits. In a live chat, relevance to
//! what was just discussed outweighs pure semantic similarity, so the search
//! pipeline runs in two stages: vector similarity first, then this pruning
//! step which keeps only the most recently posted candidates.

use super::ScoredRecord;

/// Reduce `hits` to the `top_k` most recently posted, ordered most-recent
/// first. Selection is by timestamp alone; similarity scores only decided
/// which candidates were in `hits` to begin with.
pub fn prune_by_recency(mut hits: Vec<ScoredRecord>, top_k: usize) -> Vec<ScoredRecord> {
    hits.sort_by(|a, b| b.meta.posted_at.cmp(&a.meta.posted_at));
    hits.truncate(top_k);
    hits
}

//! The "look up sources" retrieval tool.
//!
//! Called by the external chat agent runtime. The tool's contract is
//! conversational: every outcome, including degraded ones, is a string the
//! agent can show or reason over, never an HTTP error. The set of sources
//! to search arrives by convention: a system message in the conversation
//! carries a JSON array after [`SELECTED_SOURCES_MARKER`].

use tracing::{info, warn};
use uuid::Uuid;

use nh_vector_store::SearchFilter;

use crate::error::Result;
use crate::models::agent::AgentMessage;
use crate::services::{CurrentUser, Services};

/// Returned verbatim when the conversation has no selected sources; by
/// contract no vector query is issued in that case.
pub const NO_SOURCES_SELECTED: &str =
    "No sources selected. Please select at least one source and try again.";

pub const NO_RESULTS: &str =
    "No relevant information found in the selected sources. Try different sources or rephrase your query.";

/// Marker preceding the JSON array of selected source ids in the system
/// message.
pub const SELECTED_SOURCES_MARKER: &str =
    "List of currently selected source IDs for RAG retrieval:";

/// Retrieval keeps recall high and lets the agent judge relevance.
const SCORE_THRESHOLD: f32 = 0.2;

/// Preview budget per chunk in the formatted tool output.
const PREVIEW_CHARS: usize = 300;

/// Extracts the selected source ids from the conversation, if any system
/// message carries the convention.
pub fn parse_selected_sources(messages: &[AgentMessage]) -> Vec<Uuid> {
    for message in messages.iter().rev() {
        if message.role != "system" {
            continue;
        }
        let Some(index) = message.content.find(SELECTED_SOURCES_MARKER) else {
            continue;
        };
        let tail = &message.content[index + SELECTED_SOURCES_MARKER.len()..];
        let Some(start) = tail.find('[') else { continue };
        let Some(end) = tail[start..].find(']') else { continue };
        let raw = &tail[start..start + end + 1];

        match serde_json::from_str::<Vec<String>>(raw) {
            Ok(ids) => {
                return ids
                    .iter()
                    .filter_map(|id| Uuid::parse_str(id).ok())
                    .collect();
            }
            Err(e) => {
                warn!(error = %e, "Malformed selected-sources array in system message");
                return Vec::new();
            }
        }
    }
    Vec::new()
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let truncated: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{truncated}…")
}

pub struct RetrievalService {
    services: Services,
}

impl RetrievalService {
    pub fn new(services: &Services) -> Self {
        Self {
            services: services.clone(),
        }
    }

    /// Searches the selected sources and formats the top chunks as a
    /// context block for the agent.
    pub async fn look_up_sources(
        &self,
        user: &CurrentUser,
        query: &str,
        top_k: u64,
        selected: &[Uuid],
    ) -> Result<String> {
        if selected.is_empty() {
            info!("Retrieval requested with no sources selected");
            return Ok(NO_SOURCES_SELECTED.to_string());
        }

        let embedding = match self.services.embedder.embed_one(query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "Query embedding failed in retrieval tool");
                return Ok(format!("Failed to create embedding for the query. {e}"));
            }
        };

        let filter = SearchFilter {
            any_ids: selected.to_vec(),
            owner_id: Some(user.id),
        };
        let hits = match self
            .services
            .vector_index
            .search(embedding, top_k.max(1), SCORE_THRESHOLD, filter)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "Vector search failed in retrieval tool");
                return Ok(format!("Failed to search sources. {e}"));
            }
        };

        if hits.is_empty() {
            return Ok(NO_RESULTS.to_string());
        }

        let mut lines = vec![format!("Top {} chunks:", hits.len())];
        for (i, hit) in hits.iter().enumerate() {
            let ref_id = hit
                .record
                .ref_id()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            lines.push(format!("{}. score={:.3} ref={}", i + 1, hit.score, ref_id));
            if let Some(url) = &hit.record.url {
                lines.push(format!("   url={url}"));
            }
            lines.push(format!("   {}", preview(&hit.record.chunk_text)));
        }

        info!(results = hits.len(), "Retrieval tool returned context");
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestContext;
    use nh_vector_store::LogicalId;

    fn system_message(content: &str) -> AgentMessage {
        AgentMessage {
            role: "system".into(),
            content: content.into(),
        }
    }

    #[test]
    fn selected_sources_are_parsed_from_the_system_message() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let messages = vec![
            AgentMessage {
                role: "user".into(),
                content: "hello".into(),
            },
            system_message(&format!(
                "You are a helpful assistant.\n{} [\"{}\", \"{}\"]\nBe concise.",
                SELECTED_SOURCES_MARKER, a, b
            )),
        ];
        assert_eq!(parse_selected_sources(&messages), vec![a, b]);
    }

    #[test]
    fn missing_or_malformed_selection_yields_empty() {
        assert!(parse_selected_sources(&[]).is_empty());
        assert!(parse_selected_sources(&[system_message("no marker here")]).is_empty());
        assert!(parse_selected_sources(&[system_message(&format!(
            "{SELECTED_SOURCES_MARKER} [not-json"
        ))])
        .is_empty());
        // Non-UUID entries are skipped rather than failing the parse.
        let id = Uuid::now_v7();
        let parsed = parse_selected_sources(&[system_message(&format!(
            "{SELECTED_SOURCES_MARKER} [\"bogus\", \"{id}\"]"
        ))]);
        assert_eq!(parsed, vec![id]);
    }

    #[tokio::test]
    async fn empty_selection_returns_the_sentinel_without_searching() {
        let ctx = TestContext::new();
        let user = ctx.user();
        // A point exists, but it must not be consulted.
        ctx.index_text(LogicalId::Source(Uuid::now_v7()), user.id, "hello world")
            .await;

        let result = RetrievalService::new(&ctx.services)
            .look_up_sources(&user, "hello", 5, &[])
            .await
            .unwrap();
        assert_eq!(result, NO_SOURCES_SELECTED);
    }

    #[tokio::test]
    async fn retrieval_is_filtered_to_the_selected_sources() {
        let ctx = TestContext::new();
        let user = ctx.user();
        let selected = Uuid::now_v7();
        let unselected = Uuid::now_v7();
        ctx.index_text(LogicalId::Source(selected), user.id, "greetings hello world")
            .await;
        ctx.index_text(LogicalId::Source(unselected), user.id, "greetings hello world")
            .await;

        let result = RetrievalService::new(&ctx.services)
            .look_up_sources(&user, "hello greetings", 5, &[selected])
            .await
            .unwrap();

        assert!(result.starts_with("Top 1 chunks:"));
        assert!(result.contains(&format!("ref={selected}")));
        assert!(!result.contains(&format!("ref={unselected}")));
    }

    #[tokio::test]
    async fn retrieval_never_crosses_owners() {
        let ctx = TestContext::new();
        let user = ctx.user();
        let other = ctx.user();
        let shared_id = Uuid::now_v7();
        ctx.index_text(LogicalId::Source(shared_id), other.id, "hello world")
            .await;

        let result = RetrievalService::new(&ctx.services)
            .look_up_sources(&user, "hello", 5, &[shared_id])
            .await
            .unwrap();
        assert_eq!(result, NO_RESULTS);
    }

    #[tokio::test]
    async fn long_chunks_are_previewed_with_an_ellipsis() {
        let ctx = TestContext::new();
        let user = ctx.user();
        let source = Uuid::now_v7();
        let long_text = format!("needle {}", "filler ".repeat(100));
        ctx.index_text(LogicalId::Source(source), user.id, &long_text).await;

        let result = RetrievalService::new(&ctx.services)
            .look_up_sources(&user, "needle", 5, &[source])
            .await
            .unwrap();
        assert!(result.contains('…'));
        assert!(!result.contains(&long_text));
    }
}

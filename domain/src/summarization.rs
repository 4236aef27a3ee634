//! Token-bounded map-reduce summarization.
//!
//! Long transcripts are split into token-budgeted chunks, each chunk is
//! summarized independently (map), and the chunk summaries are consolidated
//! into one meeting summary plus extracted action items (reduce). Chunk
//! failures are isolated; reduce failures degrade to concatenation. The
//! pipeline never fails because summarization did.

use crate::error::Error;
use crate::tokenizer::TokenCounter;
use log::*;
use meeting_ai::traits::generation::Provider;
use meeting_ai::types::generation::CompletionRequest;
use meeting_ai::types::summary::{ActionItem, ChunkSummary, MeetingSummary};
use meeting_ai::Error as ProviderError;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Placeholder recorded for a chunk whose summarization call failed.
const CHUNK_FAILURE_PLACEHOLDER: &str = "[Unable to summarize this segment]";

/// Separator between chunk summaries in the reduce prompt.
const CHUNK_SUMMARY_SEPARATOR: &str = "\n\n---\n\n";

/// Maximum attempts for a single rate-limited generation call.
const RATE_LIMIT_ATTEMPTS: u32 = 3;

/// Model configuration for the summarizer.
#[derive(Debug, Clone)]
pub struct SummarizerSettings {
    /// Model for per-chunk map calls.
    pub map_model: String,
    /// Model for consolidation and extraction calls.
    pub reduce_model: String,
    /// Token budget per transcript chunk.
    pub max_chunk_tokens: usize,
}

/// Partitions a transcript into token-bounded chunks.
pub struct SummaryChunker {
    counter: TokenCounter,
    max_chunk_tokens: usize,
}

impl SummaryChunker {
    pub fn new(counter: TokenCounter, max_chunk_tokens: usize) -> Self {
        Self {
            counter,
            max_chunk_tokens,
        }
    }

    /// Returns the transcript as a single chunk when it already fits the
    /// budget - short meetings skip the chunking math (and the extra API
    /// calls) entirely.
    pub fn chunk(&self, transcript: &str) -> Vec<String> {
        if transcript.is_empty() {
            return Vec::new();
        }
        if self.counter.count_tokens(transcript) <= self.max_chunk_tokens {
            return vec![transcript.to_string()];
        }
        self.counter
            .chunk_by_tokens(transcript, self.max_chunk_tokens)
    }
}

/// Number of key points / action items to retain for a meeting of
/// `num_chunks` chunks: a floor of 10 for short meetings, 3 per chunk for
/// long ones, capped at 30.
pub fn scaled_item_budget(num_chunks: usize) -> usize {
    (num_chunks * 3).max(10).min(30)
}

/// Wire shape for the JSON-mode action item extraction response.
#[derive(Debug, Deserialize)]
struct ActionItemsResponse {
    action_items: Vec<ActionItem>,
}

/// Map-reduce summarizer over a text-generation provider.
pub struct MapReduceSummarizer {
    provider: Arc<dyn Provider>,
    chunker: SummaryChunker,
    settings: SummarizerSettings,
}

impl MapReduceSummarizer {
    pub fn new(
        provider: Arc<dyn Provider>,
        chunker: SummaryChunker,
        settings: SummarizerSettings,
    ) -> Self {
        Self {
            provider,
            chunker,
            settings,
        }
    }

    /// Produces the consolidated summary, action items, and key points for a
    /// transcript.
    pub async fn summarize(&self, transcript: &str) -> Result<MeetingSummary, Error> {
        info!(
            "Starting summarization ({} characters of transcript)",
            transcript.len()
        );

        let chunks = self.chunker.chunk(transcript);
        if chunks.is_empty() {
            return Ok(MeetingSummary {
                summary: "No content to summarize.".to_string(),
                action_items: Vec::new(),
                key_points: Vec::new(),
            });
        }

        info!("Split transcript into {} chunks", chunks.len());
        let item_budget = scaled_item_budget(chunks.len());

        let chunk_summaries = self.map_chunks(&chunks).await;
        let summary = self.consolidate(&chunk_summaries, item_budget).await;
        let action_items = self.extract_action_items(&chunk_summaries).await;
        let key_points = extract_key_points(&summary, item_budget);

        info!(
            "Summarization completed: {} chars, {} action items, {} key points",
            summary.len(),
            action_items.len(),
            key_points.len()
        );

        Ok(MeetingSummary {
            summary,
            action_items,
            key_points,
        })
    }

    /// Map stage: one summary per chunk, failures isolated per chunk.
    async fn map_chunks(&self, chunks: &[String]) -> Vec<ChunkSummary> {
        let total = chunks.len();
        let mut summaries = Vec::with_capacity(total);

        for (index, chunk) in chunks.iter().enumerate() {
            debug!("Summarizing chunk {}/{}", index + 1, total);

            let request = CompletionRequest::text(
                &self.settings.map_model,
                map_system_prompt(index + 1, total),
                chunk.clone(),
            )
            .with_max_tokens(800);

            let text = match self.complete_with_rate_limit_retry(request).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to summarize chunk {}: {}", index + 1, e);
                    CHUNK_FAILURE_PLACEHOLDER.to_string()
                }
            };

            summaries.push(ChunkSummary { index, text });
        }

        summaries
    }

    /// Reduce stage: consolidates chunk summaries into the final summary,
    /// falling back to plain concatenation when the call fails.
    async fn consolidate(&self, chunk_summaries: &[ChunkSummary], item_budget: usize) -> String {
        let combined = join_summaries(chunk_summaries, CHUNK_SUMMARY_SEPARATOR);

        let request = CompletionRequest::text(
            &self.settings.reduce_model,
            reduce_system_prompt(item_budget),
            format!("Here are the segment summaries:\n\n{}", combined),
        )
        .with_max_tokens(1500);

        match self.complete_with_rate_limit_retry(request).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Final summary consolidation failed: {}. Falling back to concatenation", e);
                join_summaries(chunk_summaries, "\n\n")
            }
        }
    }

    /// Extracts a normalized action item list from the chunk summaries.
    ///
    /// The JSON-mode call is authoritative; a strict parse failure voids that
    /// response (and only that response). When the JSON call itself fails, a
    /// plain-text bullet extraction runs instead. Extraction never fails the
    /// pipeline - the worst outcome is an empty list.
    async fn extract_action_items(&self, chunk_summaries: &[ChunkSummary]) -> Vec<ActionItem> {
        let combined = join_summaries(chunk_summaries, "\n\n");

        let request = CompletionRequest::json(
            &self.settings.reduce_model,
            ACTION_ITEMS_JSON_PROMPT.to_string(),
            combined.clone(),
        )
        .with_max_tokens(500);

        match self.complete_with_rate_limit_retry(request).await {
            Ok(text) => match serde_json::from_str::<ActionItemsResponse>(&text) {
                Ok(parsed) => parsed.action_items,
                Err(e) => {
                    warn!("Discarding malformed action item JSON: {}", e);
                    Vec::new()
                }
            },
            Err(e) => {
                warn!("JSON action item extraction failed: {}. Trying bullet extraction", e);
                self.extract_action_items_as_bullets(&combined).await
            }
        }
    }

    async fn extract_action_items_as_bullets(&self, combined: &str) -> Vec<ActionItem> {
        let request = CompletionRequest::text(
            &self.settings.reduce_model,
            ACTION_ITEMS_BULLET_PROMPT.to_string(),
            combined.to_string(),
        )
        .with_max_tokens(500);

        match self.complete_with_rate_limit_retry(request).await {
            Ok(text) => parse_bullet_lines(&text)
                .into_iter()
                .map(ActionItem::unassigned)
                .collect(),
            Err(e) => {
                warn!("Bullet action item extraction failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Runs one generation call, retrying only rate-limit failures.
    ///
    /// The wait before attempt `n + 1` is `min(5000 * n, 30000)` ms. Other
    /// error classes return immediately.
    async fn complete_with_rate_limit_retry(
        &self,
        request: CompletionRequest,
    ) -> Result<String, ProviderError> {
        for attempt in 1..=RATE_LIMIT_ATTEMPTS {
            match self.provider.complete(request.clone()).await {
                Ok(text) => return Ok(text),
                Err(ProviderError::RateLimited { .. }) if attempt < RATE_LIMIT_ATTEMPTS => {
                    let wait = Duration::from_millis((5000 * attempt as u64).min(30_000));
                    warn!(
                        "Generation call rate limited (attempt {}/{}), waiting {}ms",
                        attempt,
                        RATE_LIMIT_ATTEMPTS,
                        wait.as_millis()
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
        unreachable!("loop returns on the final attempt")
    }
}

fn join_summaries(chunk_summaries: &[ChunkSummary], separator: &str) -> String {
    chunk_summaries
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

fn map_system_prompt(part: usize, total: usize) -> String {
    format!(
        "You are summarizing a segment (part {} of {}) of a meeting transcript.\n\
         Extract key discussion points, decisions made, and any action items mentioned.\n\
         Preserve important details like who said what for critical decisions; keep speaker names verbatim.\n\
         If any content is not in English, translate it into clean, professional English.\n\
         Be concise but comprehensive.",
        part, total
    )
}

fn reduce_system_prompt(item_budget: usize) -> String {
    format!(
        "You are creating a comprehensive meeting summary from segment summaries.\n\n\
         Create a well-structured summary with:\n\
         1. **Overview**: Brief meeting context and main topic\n\
         2. **Key Discussion Points**: Main topics discussed (bullet points, at most {})\n\
         3. **Decisions Made**: Important decisions and outcomes\n\
         4. **Action Items**: Tasks and next steps (if mentioned)\n\
         5. **Next Steps**: What happens next\n\n\
         Be clear, concise, and professional. Use bullet points for readability.",
        item_budget
    )
}

const ACTION_ITEMS_JSON_PROMPT: &str = "Extract all action items from the meeting summaries.\n\
Return a JSON object with exactly this structure:\n\
{\"action_items\": [{\"owner\": \"Name or role, else 'Unassigned'\", \"task\": \"Specific task description\", \"deadline\": \"Date/time if mentioned, else 'TBD'\"}]}\n\
Return ONLY valid JSON, no markdown or explanation.";

const ACTION_ITEMS_BULLET_PROMPT: &str = "Extract all action items from the meeting summaries.\n\
Format each action item as:\n\
- [Action item description] (Owner: [name if mentioned, else \"Unassigned\"])\n\
Return only the bullet list, no extra text.";

/// Parses bullet lines (`-` or the Unicode bullet) into bare item strings.
pub fn parse_bullet_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            trimmed
                .strip_prefix('-')
                .or_else(|| trimmed.strip_prefix('\u{2022}'))
                .map(|rest| rest.trim().to_string())
        })
        .filter(|item| !item.is_empty())
        .collect()
}

/// Harvests bullet lines from the final summary as key points, capped at the
/// scaled item budget.
pub fn extract_key_points(summary: &str, item_budget: usize) -> Vec<String> {
    summary
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            trimmed
                .strip_prefix('-')
                .or_else(|| trimmed.strip_prefix('*'))
                .or_else(|| trimmed.strip_prefix('\u{2022}'))
                .map(|rest| rest.trim().to_string())
        })
        .filter(|point| !point.is_empty())
        .take(item_budget)
        .collect()
}

//! Crowd poll registry.
//!
//! A simpler subsystem parallel to the trivia rooms: one question, raw
//! device-keyed responses with replace semantics, and a grouped top-8
//! summary for the venue display.

use super::{scoring::normalize_text, AppState};
use crate::protocol::{GroupedEntry, GroupedResults, PollPayload};
use crate::types::*;
use chrono::Utc;

const MAX_OPTIONS: usize = 10;
const MAX_OPEN_TEXT_LEN: usize = 500;
const TOP_GROUP_COUNT: usize = 8;

/// Words masked on the venue's public display. The host view and the raw
/// ledger are never masked.
const MASKED_WORDS: &[&str] = &[
    "ass", "bastard", "bitch", "crap", "damn", "dick", "fuck", "piss", "shit", "tits",
];

/// Mask one word: keep the first character, and the last as well for words
/// longer than four letters, asterisks in between
fn mask_word(word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    let mut out = String::with_capacity(word.len());
    match chars.len() {
        0 => {}
        len if len > 4 => {
            out.push(chars[0]);
            out.push_str(&"*".repeat(len - 2));
            out.push(chars[len - 1]);
        }
        len => {
            out.push(chars[0]);
            out.push_str(&"*".repeat(len - 1));
        }
    }
    out
}

/// Replace listed words in a label, preserving everything else verbatim
pub fn mask_label(label: &str) -> String {
    label
        .split(' ')
        .map(|word| {
            let key: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(|c| c.to_lowercase())
                .collect();
            if MASKED_WORDS.contains(&key.as_str()) {
                mask_word(word)
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl Poll {
    /// Normalize and count raw responses: first-seen text is the label,
    /// case/punctuation variants merge, top 8 by count with the rest folded
    /// into a single "other" bucket
    pub fn grouped(&self) -> GroupedResults {
        // Preserve first-seen order so count ties stay deterministic
        let mut order: Vec<String> = Vec::new();
        let mut labels: Vec<String> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();

        for response in &self.raw_responses {
            let key = match self.response_type {
                PollResponseType::Open => normalize_text(&response.value),
                PollResponseType::Multiple => response.value.clone(),
            };
            match order.iter().position(|k| *k == key) {
                Some(i) => counts[i] += 1,
                None => {
                    order.push(key);
                    labels.push(response.value.clone());
                    counts.push(1);
                }
            }
        }

        let mut entries: Vec<GroupedEntry> = labels
            .into_iter()
            .zip(counts)
            .map(|(label, count)| GroupedEntry { label, count })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count));

        let other_count = entries
            .iter()
            .skip(TOP_GROUP_COUNT)
            .map(|e| e.count)
            .sum();
        entries.truncate(TOP_GROUP_COUNT);

        GroupedResults {
            total: self.raw_responses.len(),
            top: entries,
            other_count,
        }
    }

    /// Build the subscriber view. `masked` is the display variant; counts
    /// and totals are identical between the two, only label text differs.
    pub fn payload(&self, masked: bool) -> PollPayload {
        let mut grouped = self.grouped();
        let mut recent = self.recent_submission.clone();
        if masked {
            for entry in &mut grouped.top {
                entry.label = mask_label(&entry.label);
            }
            recent = recent.map(|r| mask_label(&r));
        }

        PollPayload {
            poll_id: self.poll_id.clone(),
            question: self.question.clone(),
            response_type: self.response_type,
            options: self.options.clone(),
            locked: self.locked,
            show_ticker: self.show_ticker,
            venue_name: self.venue_name.clone(),
            logo_url: self.logo_url.clone(),
            raw_responses_count: self.raw_responses.len(),
            grouped,
            recent_submission: recent,
        }
    }
}

/// Inputs accepted by `create_poll`
#[derive(Debug, Clone, Default)]
pub struct NewPoll {
    pub question: String,
    pub response_type: Option<PollResponseType>,
    pub options: Vec<String>,
    pub venue_name: Option<String>,
    pub logo_url: Option<String>,
}

impl AppState {
    /// Create a poll. `None` when the question is empty after trimming, or
    /// when a multiple-choice poll has no usable options. Options are
    /// trimmed, deduplicated, and capped at 10.
    pub async fn create_poll(&self, new: NewPoll) -> Option<Poll> {
        let question = new.question.trim().to_string();
        if question.is_empty() {
            return None;
        }

        let response_type = new.response_type.unwrap_or(PollResponseType::Open);
        let mut options: Vec<String> = Vec::new();
        if response_type == PollResponseType::Multiple {
            for option in &new.options {
                let trimmed = option.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if !options.iter().any(|o| o.eq_ignore_ascii_case(trimmed)) {
                    options.push(trimmed.to_string());
                }
                if options.len() == MAX_OPTIONS {
                    break;
                }
            }
            if options.is_empty() {
                return None;
            }
        }

        let poll = Poll {
            poll_id: ulid::Ulid::new().to_string(),
            host_token: ulid::Ulid::new().to_string(),
            question,
            response_type,
            options,
            raw_responses: Vec::new(),
            locked: false,
            venue_name: new.venue_name,
            logo_url: new.logo_url,
            show_ticker: true,
            recent_submission: None,
        };

        self.polls
            .write()
            .await
            .insert(poll.poll_id.clone(), poll.clone());
        tracing::info!(poll_id = %poll.poll_id, "Poll created");
        Some(poll)
    }

    pub async fn get_poll(&self, poll_id: &str) -> Option<Poll> {
        self.polls.read().await.get(poll_id).cloned()
    }

    pub async fn check_poll_token(&self, poll_id: &str, host_token: &str) -> bool {
        self.polls
            .read()
            .await
            .get(poll_id)
            .is_some_and(|p| p.host_token == host_token)
    }

    /// Record a device's answer. A device's prior answer is replaced while
    /// the poll is unlocked (one live answer per device, not one-ever).
    /// `None` when the poll is unknown or locked, the option doesn't match,
    /// or open text is empty/oversized.
    pub async fn submit_poll_response(
        &self,
        poll_id: &str,
        text: Option<&str>,
        option_id: Option<&str>,
        device_id: &str,
    ) -> Option<Poll> {
        let mut polls = self.polls.write().await;
        let poll = polls.get_mut(poll_id)?;

        if poll.locked || device_id.trim().is_empty() {
            return None;
        }

        let value = match poll.response_type {
            PollResponseType::Multiple => {
                let wanted = option_id?.trim().to_string();
                // Store the configured casing, not whatever the client sent
                poll.options
                    .iter()
                    .find(|o| o.eq_ignore_ascii_case(&wanted))?
                    .clone()
            }
            PollResponseType::Open => {
                let text = text?.trim().to_string();
                if text.is_empty() || text.len() > MAX_OPEN_TEXT_LEN {
                    return None;
                }
                text
            }
        };

        poll.raw_responses.retain(|r| r.device_id != device_id);
        poll.raw_responses.push(PollResponse {
            response_id: ulid::Ulid::new().to_string(),
            device_id: device_id.to_string(),
            value: value.clone(),
            submitted_at: Utc::now(),
        });
        poll.recent_submission = Some(value);

        Some(poll.clone())
    }

    pub async fn set_poll_locked(&self, poll_id: &str, locked: bool) -> Option<Poll> {
        let mut polls = self.polls.write().await;
        let poll = polls.get_mut(poll_id)?;
        poll.locked = locked;
        tracing::info!(poll_id, locked, "Poll lock updated");
        Some(poll.clone())
    }

    pub async fn set_poll_show_ticker(&self, poll_id: &str, show_ticker: bool) -> Option<Poll> {
        let mut polls = self.polls.write().await;
        let poll = polls.get_mut(poll_id)?;
        poll.show_ticker = show_ticker;
        Some(poll.clone())
    }

    /// Drop collected responses, keeping the question and options
    pub async fn clear_poll_results(&self, poll_id: &str) -> Option<Poll> {
        let mut polls = self.polls.write().await;
        let poll = polls.get_mut(poll_id)?;
        poll.raw_responses.clear();
        poll.recent_submission = None;
        tracing::info!(poll_id, "Poll results cleared");
        Some(poll.clone())
    }

    /// Back to a fresh unlocked poll: responses gone, ticker back on
    pub async fn reset_poll(&self, poll_id: &str) -> Option<Poll> {
        let mut polls = self.polls.write().await;
        let poll = polls.get_mut(poll_id)?;
        poll.raw_responses.clear();
        poll.recent_submission = None;
        poll.locked = false;
        poll.show_ticker = true;
        tracing::info!(poll_id, "Poll reset");
        Some(poll.clone())
    }
}

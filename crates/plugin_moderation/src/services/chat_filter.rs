//! # Chat Filter
//!
//! Blocks listed words and patterns. Words match whole alphanumeric tokens
//! case-insensitively, so `class` does not trip a filter for `ass`.
//! Patterns are regular expressions matched case-insensitively anywhere.

use crate::config::{ChatFilterSettings, FilterMode};
use crate::error::ModerationError;
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use tokio::sync::RwLock;

pub const PERMISSION_CHATFILTER_BYPASS: &str = "warden.chatfilter.bypass";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    Clean,
    /// Message with every hit replaced.
    Replaced(String),
    Blocked,
}

#[derive(Debug)]
struct FilterState {
    enabled: bool,
    mode: FilterMode,
    words: HashSet<String>,
    patterns: Vec<Regex>,
    replacement: String,
}

#[derive(Debug)]
pub struct ChatFilter {
    state: RwLock<FilterState>,
}

impl ChatFilter {
    pub fn new(settings: &ChatFilterSettings) -> Result<Self, ModerationError> {
        Ok(Self {
            state: RwLock::new(compile(settings)?),
        })
    }

    /// Swaps in new settings. The old ones stay if a pattern fails to compile.
    pub async fn reload(&self, settings: &ChatFilterSettings) -> Result<(), ModerationError> {
        let state = compile(settings)?;
        *self.state.write().await = state;
        Ok(())
    }

    pub async fn check(&self, message: &str) -> FilterOutcome {
        let state = self.state.read().await;
        if !state.enabled || (state.words.is_empty() && state.patterns.is_empty()) {
            return FilterOutcome::Clean;
        }

        let (mut matched, mut filtered) = filter_tokens(message, &state.words, &state.replacement);
        for pattern in &state.patterns {
            if pattern.is_match(&filtered) {
                matched = true;
                filtered = pattern
                    .replace_all(&filtered, state.replacement.as_str())
                    .into_owned();
            }
        }

        match (matched, state.mode) {
            (false, _) => FilterOutcome::Clean,
            (true, FilterMode::Cancel) => FilterOutcome::Blocked,
            (true, FilterMode::Replace) => FilterOutcome::Replaced(filtered),
        }
    }
}

fn compile(settings: &ChatFilterSettings) -> Result<FilterState, ModerationError> {
    let patterns = settings
        .patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| ModerationError::Config(format!("chat filter pattern '{pattern}': {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FilterState {
        enabled: settings.enabled,
        mode: settings.mode,
        words: settings.words.iter().map(|w| w.to_lowercase()).collect(),
        patterns,
        replacement: settings.replacement.clone(),
    })
}

fn filter_tokens(message: &str, words: &HashSet<String>, replacement: &str) -> (bool, String) {
    let mut output = String::with_capacity(message.len());
    let mut token = String::new();
    let mut matched = false;

    let mut flush = |token: &mut String, output: &mut String| {
        if token.is_empty() {
            return;
        }
        if words.contains(&token.to_lowercase()) {
            output.push_str(replacement);
            matched = true;
        } else {
            output.push_str(token);
        }
        token.clear();
    };

    for ch in message.chars() {
        if ch.is_alphanumeric() {
            token.push(ch);
        } else {
            flush(&mut token, &mut output);
            output.push(ch);
        }
    }
    flush(&mut token, &mut output);

    (matched, output)
}

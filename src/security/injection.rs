//! Prompt-injection screening for submitted code.
//!
//! Three checks, in order, first hit wins:
//! 1. Instruction-like regex patterns, matched on lowercased text.
//! 2. Three or more distinct instruction keywords, on lowercased text.
//! 3. Special chat-template tokens, matched case-sensitively.
//!
//! The detector is pure and cheap; it runs before any cache or network work.

use std::collections::HashSet;

use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Distinct instruction keywords that make input look like a prompt, not code.
pub const KEYWORD_THRESHOLD: usize = 3;

const INJECTION_PATTERNS: &[&str] = &[
    // direct instruction override
    r"ignore (all )?previous (instructions|prompts|rules)",
    r"disregard (all )?previous (instructions|prompts|rules)",
    r"forget (all )?previous (instructions|prompts|rules)",
    r"ignore (all )?(the )?above",
    r"disregard (all )?(the )?above",
    // role manipulation
    r"you are now",
    r"act as (a |an )?",
    r"pretend (you are|to be)",
    r"simulate (a |an )?",
    r"roleplay as",
    // system prompt extraction
    r"what (are|were) your (initial )?instructions",
    r"show me your (system )?prompt",
    r"reveal your (system )?prompt",
    r"print your (system )?prompt",
    r"what (are|is) your (system )?prompt",
    // output manipulation
    r"output (only|just)",
    r"respond (only|just) with",
    r"say (only|just)",
    r"print (only|just)",
    r"return (only|just)",
    // jailbreaks
    r"dan mode",
    r"developer mode",
    r"jailbreak",
    r"evil mode",
    // inline role markers
    r"new instructions?:",
    r"system:",
    r"assistant:",
    r"<\|im_start\|>",
    r"<\|im_end\|>",
];

const INSTRUCTION_KEYWORDS: &[&str] = &[
    "ignore",
    "disregard",
    "forget",
    "pretend",
    "act as",
    "you are",
    "your role",
    "new instructions",
    "system prompt",
];

const SPECIAL_TOKENS: &[&str] = &[
    "<|endoftext|>",
    "[INST]",
    "[/INST]",
    "<|system|>",
    "<|user|>",
    "<|assistant|>",
];

static PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    INJECTION_PATTERNS
        .iter()
        .map(|p| (*p, Regex::new(p).unwrap()))
        .collect()
});

static KEYWORDS: Lazy<AhoCorasick> = Lazy::new(|| AhoCorasick::new(INSTRUCTION_KEYWORDS).unwrap());

static TOKENS: Lazy<AhoCorasick> = Lazy::new(|| AhoCorasick::new(SPECIAL_TOKENS).unwrap());

/// Outcome of screening one input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Detection {
    pub suspicious: bool,
    /// Empty when not suspicious.
    pub reason: String,
}

impl Detection {
    fn clean() -> Self {
        Self::default()
    }

    fn flagged(reason: String) -> Self {
        Self {
            suspicious: true,
            reason,
        }
    }
}

/// Screen `text` for prompt-injection content.
pub fn detect_prompt_injection(text: &str) -> Detection {
    if text.is_empty() {
        return Detection::clean();
    }

    let lower = text.to_lowercase();

    if let Some((pattern, _)) = PATTERNS.iter().find(|(_, re)| re.is_match(&lower)) {
        return Detection::flagged(format!(
            "Detected potential prompt injection pattern: '{pattern}'"
        ));
    }

    let distinct: HashSet<usize> = KEYWORDS
        .find_overlapping_iter(&lower)
        .map(|m| m.pattern().as_usize())
        .collect();
    if distinct.len() >= KEYWORD_THRESHOLD {
        return Detection::flagged(
            "Input contains multiple instruction-like phrases suggesting prompt injection".into(),
        );
    }

    // Report the earliest token in list order, not in text order.
    if let Some(idx) = TOKENS
        .find_overlapping_iter(text)
        .map(|m| m.pattern().as_usize())
        .min()
    {
        return Detection::flagged(format!(
            "Input contains special model token: {}",
            SPECIAL_TOKENS[idx]
        ));
    }

    Detection::clean()
}

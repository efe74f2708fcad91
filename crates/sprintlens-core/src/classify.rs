//! Status and tag classification.
//!
//! Every predicate here runs its input through [`normalize`] and compares it
//! against one of the fixed vocabularies below. The vocabularies are
//! normalized the same way, so adding an alias is a one-line change to a
//! table.
//!
//! Two completion predicates exist and they are not interchangeable:
//! - [`is_completed`]: the developer has delivered (includes "pending QA")
//! - [`is_fully_completed`]: the task is closed

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::model::Task;

/// Status phrases meaning the developer is done with the task. Matched as
/// whole words, never right after a negation.
const COMPLETED_MARKERS: &[&str] = &[
    "closed",
    "concluido",
    "done",
    "resolved",
    "delivered",
    "entregue",
    "ready for qa",
    "pending qa",
    "awaiting qa",
    "in qa",
];

/// Exact status labels meaning the task is closed for good.
const CLOSED_LABELS: &[&str] = &["closed", "concluido"];

const BLOCKED_MARKERS: &[&str] = &["blocked", "bloqueado", "impeded", "on hold"];

const BACKLOG_ALIASES: &[&str] = &[
    "backlog",
    "no sprint",
    "sem sprint",
    "-",
    "n/a",
    "not allocated",
    "nao alocado",
    "none",
    "null",
    "undefined",
];

const EXCLUDED_CATEGORIES: &[&str] = &["maintenance", "manutencao", "support", "suporte", "infrastructure"];

const HIDDEN_DETAIL_ALIASES: &[(&str, HiddenDetail)] = &[
    ("hidden question", HiddenDetail::HiddenQuestion),
    ("duvida oculta", HiddenDetail::HiddenQuestion),
    ("auxiliary", HiddenDetail::Auxiliary),
    ("auxiliar", HiddenDetail::Auxiliary),
    ("meeting", HiddenDetail::Meeting),
    ("reuniao", HiddenDetail::Meeting),
    ("training", HiddenDetail::Training),
    ("treinamento", HiddenDetail::Training),
    ("impediment", HiddenDetail::Impediment),
    ("impedimento", HiddenDetail::Impediment),
    ("tests", HiddenDetail::Tests),
    ("testes", HiddenDetail::Tests),
];

/// Hidden-detail tags that reclassify a task for specific reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiddenDetail {
    HiddenQuestion,
    Auxiliary,
    Meeting,
    Training,
    Impediment,
    Tests,
}

impl HiddenDetail {
    /// Match a free-text tag, tolerating case, accents and doubled letters.
    pub fn parse(tag: &str) -> Option<Self> {
        let key = normalize(tag);
        if key.is_empty() {
            return None;
        }
        HIDDEN_DETAIL_ALIASES
            .iter()
            .find(|(alias, _)| normalize(alias) == key)
            .map(|(_, detail)| *detail)
    }
}

/// Canonical comparison key: accents stripped, lowercase, whitespace
/// collapsed to single spaces, runs of the same character collapsed.
///
/// Input is decomposed (NFD) first, so precomposed and combining-mark
/// spellings of the same word compare equal.
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last: Option<char> = None;
    for word in input.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
            last = Some(' ');
        }
        let folded = word
            .nfd()
            .filter(|c| !is_combining_mark(*c))
            .flat_map(char::to_lowercase);
        for c in folded {
            if last == Some(c) {
                continue;
            }
            out.push(c);
            last = Some(c);
        }
    }
    out
}

/// Words that flip the meaning of the marker right after them.
const NEGATIONS: &[&str] = &["not", "nao", "no", "never", "nunca"];

/// Normalized alphanumeric words of `text`.
fn words(text: &str) -> Vec<String> {
    normalize(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// True when one of `phrases` appears as whole words in `haystack` and is
/// not directly preceded by a negation.
fn mentions_any(haystack: &str, phrases: &[&str]) -> bool {
    let haystack = words(haystack);
    let negated = |at: usize| at > 0 && NEGATIONS.contains(&haystack[at - 1].as_str());
    phrases.iter().any(|phrase| {
        let phrase = words(phrase);
        !phrase.is_empty()
            && haystack
                .windows(phrase.len())
                .enumerate()
                .any(|(at, window)| window == phrase.as_slice() && !negated(at))
    })
}

fn equals_any(value: &str, candidates: &[&str]) -> bool {
    let value = normalize(value);
    candidates.iter().any(|candidate| normalize(candidate) == value)
}

/// Developer-delivered or closed.
pub fn is_completed(status: &str) -> bool {
    mentions_any(status, COMPLETED_MARKERS)
}

/// Closed, exactly. Stricter than [`is_completed`].
pub fn is_fully_completed(status: &str) -> bool {
    equals_any(status, CLOSED_LABELS)
}

pub fn is_blocked(status: &str) -> bool {
    mentions_any(status, BLOCKED_MARKERS)
}

/// Empty or placeholder iteration label.
pub fn is_backlog_label(label: &str) -> bool {
    label.trim().is_empty() || equals_any(label, BACKLOG_ALIASES)
}

/// Parse free-text tags, dropping the ones outside the vocabulary.
pub fn parse_hidden_details<S: AsRef<str>>(tags: &[S]) -> Vec<HiddenDetail> {
    let mut details: Vec<HiddenDetail> = Vec::new();
    for detail in tags.iter().filter_map(|tag| HiddenDetail::parse(tag.as_ref())) {
        if !details.contains(&detail) {
            details.push(detail);
        }
    }
    details
}

fn has_detail<S: AsRef<str>>(tags: &[S], wanted: &[HiddenDetail]) -> bool {
    tags.iter()
        .filter_map(|tag| HiddenDetail::parse(tag.as_ref()))
        .any(|detail| wanted.contains(&detail))
}

/// Meeting or training time: effort that is not delivery work.
pub fn is_neutral<S: AsRef<str>>(tags: &[S]) -> bool {
    has_detail(tags, &[HiddenDetail::Meeting, HiddenDetail::Training])
}

pub fn is_auxiliary<S: AsRef<str>>(tags: &[S]) -> bool {
    has_detail(tags, &[HiddenDetail::Auxiliary])
}

pub fn has_work_impediment<S: AsRef<str>>(tags: &[S]) -> bool {
    has_detail(tags, &[HiddenDetail::Impediment])
}

pub fn has_hidden_question<S: AsRef<str>>(tags: &[S]) -> bool {
    has_detail(tags, &[HiddenDetail::HiddenQuestion])
}

pub fn has_tests<S: AsRef<str>>(tags: &[S]) -> bool {
    has_detail(tags, &[HiddenDetail::Tests])
}

/// Maintenance-type work kept out of product backlog metrics, recognised by
/// module or feature tag.
pub fn is_excluded_category(task: &Task) -> bool {
    task.module
        .iter()
        .chain(task.features.iter())
        .any(|value| equals_any(value, EXCLUDED_CATEGORIES))
}

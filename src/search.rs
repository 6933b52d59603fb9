//! Keyword scoring, top-N selection, and sender grouping.
//!
//! Scoring is a pure function of (keywords, body). Selection is recomputed
//! from scratch on every search action and never cached.

use std::cmp::{Ordering, Reverse};
use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::store::{Email, RecordStore};

/// At most this many emails survive one search action.
pub const SELECTION_LIMIT: usize = 50;

/// Sender label used for emails with no "From (display)" value.
pub const UNKNOWN_SENDER: &str = "N/A";

/// Split the raw keyword entry on commas, trim, and lower-case. Empty
/// entries (stray commas) are retained; they can never match because
/// whitespace tokenization never produces an empty token.
pub fn parse_keywords(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|k| k.trim().to_lowercase())
        .collect()
}

/// Sum of keyword lengths for every keyword present as an exact
/// whitespace-delimited token of the body. Duplicate keywords in the list
/// add their length once per occurrence. A missing body scores 0.
pub fn score(keywords: &[String], body: Option<&str>) -> u32 {
    let Some(body) = body else {
        return 0;
    };
    let lowered = body.to_lowercase();
    let tokens: HashSet<&str> = lowered.split_whitespace().collect();
    keywords
        .iter()
        .filter(|k| tokens.contains(k.as_str()))
        .map(|k| k.chars().count() as u32)
        .sum()
}

/// The result of one search action: store indices of the top-scoring
/// emails in chronological order, partitioned by sender for plotting.
#[derive(Debug, Clone)]
pub struct Selection {
    /// Store indices, sorted by parsed date ascending, invalid dates last.
    pub picks: Vec<usize>,
    /// One group per distinct sender, ordered by size descending.
    pub groups: Vec<SenderGroup>,
}

#[derive(Debug, Clone)]
pub struct SenderGroup {
    pub sender: String,
    /// Store indices, in the selection's date order.
    pub rows: Vec<usize>,
}

impl Selection {
    /// Resolve a chart selection event back to the underlying record.
    pub fn resolve<'a>(
        &self,
        store: &'a RecordStore,
        group: usize,
        row: usize,
    ) -> Option<&'a Email> {
        let index = *self.groups.get(group)?.rows.get(row)?;
        store.emails.get(index)
    }
}

/// Score every record, keep the top `min(50, n)` (ties stable by row
/// order), re-sort those by date ascending, then partition by sender.
pub fn search(store: &RecordStore, keywords: &[String]) -> Selection {
    let picks = select(store, keywords);
    let groups = group_by_sender(store, &picks);
    Selection { picks, groups }
}

fn select(store: &RecordStore, keywords: &[String]) -> Vec<usize> {
    let mut ranked: Vec<(usize, u32)> = store
        .emails
        .iter()
        .enumerate()
        .map(|(i, e)| (i, score(keywords, e.body.as_deref())))
        .collect();
    // Stable sort: equal scores keep original row order.
    ranked.sort_by_key(|&(_, s)| Reverse(s));
    ranked.truncate(SELECTION_LIMIT);

    let mut picks: Vec<usize> = ranked.into_iter().map(|(i, _)| i).collect();
    picks.sort_by(|&a, &b| {
        cmp_dates(store.emails[a].date_sent, store.emails[b].date_sent)
    });
    picks
}

/// Total order over parsed dates with the invalid sentinel (`None`)
/// grouped after every valid date.
fn cmp_dates(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn group_by_sender(store: &RecordStore, picks: &[usize]) -> Vec<SenderGroup> {
    let mut groups: Vec<SenderGroup> = Vec::new();
    for &index in picks {
        let sender = store.emails[index]
            .sender
            .as_deref()
            .unwrap_or(UNKNOWN_SENDER);
        match groups.iter_mut().find(|g| g.sender == sender) {
            Some(group) => group.rows.push(index),
            None => groups.push(SenderGroup {
                sender: sender.to_string(),
                rows: vec![index],
            }),
        }
    }
    // Largest series first; stable, so equal-sized groups keep
    // first-appearance order.
    groups.sort_by_key(|g| Reverse(g.rows.len()));
    groups
}

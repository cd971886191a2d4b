//! Sibling sort policies
//!
//! Both policies are total orders: names compare case-insensitively with
//! digit runs compared by value, then by exact name, then by URL. The
//! reconciler relies on that to decide insert vs remove.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::entry::Entry;

/// How a node orders its children
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortPolicy {
    /// Natural name order
    Name,
    /// Natural name order, with the listed URLs grouped after everything else
    GroupBottom(HashSet<String>),
}

impl SortPolicy {
    pub fn compare(&self, a: &Entry, b: &Entry) -> Ordering {
        match self {
            Self::Name => compare_name(a, b),
            Self::GroupBottom(bottom) => {
                let a_bottom = bottom.contains(a.url());
                let b_bottom = bottom.contains(b.url());
                a_bottom.cmp(&b_bottom).then_with(|| compare_name(a, b))
            }
        }
    }

    pub fn sort(&self, entries: &mut [Entry]) {
        entries.sort_by(|a, b| self.compare(a, b));
    }
}

/// Natural, case-insensitive name order with a URL tie-break.
pub fn compare_name(a: &Entry, b: &Entry) -> Ordering {
    natural_cmp(a.name(), b.name())
        .then_with(|| a.name().cmp(b.name()))
        .then_with(|| a.url().cmp(b.url()))
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a_chunks = Chunks::new(a);
    let mut b_chunks = Chunks::new(b);
    loop {
        match (a_chunks.next(), b_chunks.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x, y) {
                    (Chunk::Digits(x), Chunk::Digits(y)) => {
                        let x = x.trim_start_matches('0');
                        let y = y.trim_start_matches('0');
                        x.len().cmp(&y.len()).then_with(|| x.cmp(y))
                    }
                    (Chunk::Text(x), Chunk::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
                    (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
                    (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Chunks<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Chunk<'a>> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(if digits {
            Chunk::Digits(chunk)
        } else {
            Chunk::Text(chunk)
        })
    }
}

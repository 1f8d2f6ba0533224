//! Automatic bucketing of uploads for the group merge.

use crate::models::{Group, StagedFile, strip_extension};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Derives the grouping key of an upload's logical name.
///
/// Separator noise (`(`, `)`, ` - `, `_`) becomes spaces, then the key is the
/// leading digit run, else the leading alphanumeric run, else the bare name
/// with every non-alphanumeric character dropped. May be empty.
pub fn group_key(file_name: &str) -> String {
    let stem = strip_extension(file_name);
    let normalized = stem
        .replace(" - ", " ")
        .replace(['(', ')', '_'], " ");
    let normalized = normalized.trim_start();

    let digits: String = normalized
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if !digits.is_empty() {
        return digits;
    }

    let word: String = normalized
        .chars()
        .take_while(|c| c.is_alphanumeric())
        .collect();
    if !word.is_empty() {
        return word;
    }

    stem.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Numeric-aware comparison: digit runs compare by value, so "2" < "10".
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let lhs = take_digits(&mut left);
                let rhs = take_digits(&mut right);
                let lhs_trimmed = lhs.trim_start_matches('0');
                let rhs_trimmed = rhs.trim_start_matches('0');
                let ord = lhs_trimmed
                    .len()
                    .cmp(&rhs_trimmed.len())
                    .then_with(|| lhs_trimmed.cmp(rhs_trimmed));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        run.push(c);
    }
    run
}

/// Partitions staged files into groups.
///
/// Files are keyed by logical name, so renamed duplicates share a group.
/// Files inside a group (by staged name) and the groups themselves are in
/// natural order.
pub fn partition(files: Vec<StagedFile>) -> Vec<Group> {
    let mut buckets: HashMap<String, Vec<StagedFile>> = HashMap::new();
    for file in files {
        buckets
            .entry(group_key(&file.logical_name))
            .or_default()
            .push(file);
    }

    let mut groups: Vec<Group> = buckets
        .into_iter()
        .map(|(key, mut files)| {
            files.sort_by(|a, b| natural_cmp(&a.file_name, &b.file_name));
            Group { key, files }
        })
        .collect();
    groups.sort_by(|a, b| natural_cmp(&a.key, &b.key));
    groups
}

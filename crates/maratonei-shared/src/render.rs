//! Split post text into plain runs, series chips and user references.
//!
//! The text is scanned once, left to right, with a single alternation of
//! both token patterns, so a `@` inside `*...*` stays part of the series
//! chip and is never read as a mention.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*.*?\*|@[\w.]+").expect("reference pattern is valid")
});

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Segment<'a> {
    Text(&'a str),
    /// Series name, without the surrounding asterisks.
    Series(&'a str),
    /// Handle, without the leading `@`.
    User(&'a str),
}

pub fn parse(content: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;

    for m in REFERENCE.find_iter(content) {
        if m.start() > last {
            segments.push(Segment::Text(&content[last..m.start()]));
        }
        let token = m.as_str();
        let segment = if let Some(handle) = token.strip_prefix('@') {
            Segment::User(handle)
        } else {
            let name = &token[1..token.len() - 1];
            if name.is_empty() {
                Segment::Text(token)
            } else {
                Segment::Series(name)
            }
        };
        segments.push(segment);
        last = m.end();
    }

    if last < content.len() {
        segments.push(Segment::Text(&content[last..]));
    }
    segments
}

/// Distinct handles referenced in `content`, in order of first appearance.
pub fn mentioned_handles(content: &str) -> Vec<&str> {
    let mut handles: Vec<&str> = Vec::new();
    for segment in parse(content) {
        if let Segment::User(handle) = segment {
            if !handles.contains(&handle) {
                handles.push(handle);
            }
        }
    }
    handles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_and_user_do_not_interfere() {
        assert_eq!(
            parse("Watch *Breaking Bad* @john"),
            vec![
                Segment::Text("Watch "),
                Segment::Series("Breaking Bad"),
                Segment::Text(" "),
                Segment::User("john"),
            ]
        );
    }

    #[test]
    fn at_sign_inside_series_chip_is_not_a_mention() {
        assert_eq!(
            parse("*Agents of @SHIELD* rocks"),
            vec![Segment::Series("Agents of @SHIELD"), Segment::Text(" rocks")]
        );
        assert!(mentioned_handles("*Agents of @SHIELD*").is_empty());
    }

    #[test]
    fn series_match_is_non_greedy() {
        assert_eq!(
            parse("*Dark* and *Lost*"),
            vec![
                Segment::Series("Dark"),
                Segment::Text(" and "),
                Segment::Series("Lost"),
            ]
        );
    }

    #[test]
    fn dotted_handles_and_plain_text() {
        assert_eq!(
            parse("oi @adriano.ti!"),
            vec![
                Segment::Text("oi "),
                Segment::User("adriano.ti"),
                Segment::Text("!"),
            ]
        );
        assert_eq!(parse("nothing here"), vec![Segment::Text("nothing here")]);
        assert!(parse("").is_empty());
    }

    #[test]
    fn unterminated_or_empty_chip_stays_text() {
        assert_eq!(parse("5 * 3"), vec![Segment::Text("5 * 3")]);
        assert_eq!(parse("**"), vec![Segment::Text("**")]);
    }

    #[test]
    fn handles_are_deduplicated_in_order() {
        assert_eq!(
            mentioned_handles("@bob @ana @bob *x* @carl"),
            vec!["bob", "ana", "carl"]
        );
    }
}

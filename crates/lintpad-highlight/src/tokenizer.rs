//! Line tokenizer.
//!
//! Lines are scanned left to right. At each column the region rules are tried, then the lexical
//! rules in priority order; the first rule whose match starts exactly at the column produces the
//! token. Characters no rule claims become plain text, and adjacent plain spans are merged.

use crate::grammar::Grammar;
use lintpad_core::{TokenCategory, TokenSpan};
use regex::{Captures, Regex};

/// Lexical state carried from the end of one line into the next.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum LineState {
    /// Not inside any multi-line construct.
    #[default]
    Normal,
    /// Inside region rule `region`, waiting for `delimiter`.
    InRegion {
        /// Index of the region rule in the grammar.
        region: usize,
        /// Closing delimiter captured when the region opened.
        delimiter: String,
    },
}

const NO_MATCH: usize = usize::MAX;

/// Leftmost match positions per rule, valid for one line scan.
///
/// A search from byte `pos` that finds its first match at `s` proves no match starts in
/// `pos..s`, so the rule is not searched again until the scan reaches `s`.
struct MatchCache {
    next: Vec<usize>,
}

impl MatchCache {
    fn new(len: usize) -> Self {
        Self { next: vec![0; len] }
    }

    fn captures_at<'t>(
        &mut self,
        slot: usize,
        regex: &Regex,
        text: &'t str,
        pos: usize,
    ) -> Option<Captures<'t>> {
        if self.next[slot] > pos {
            return None;
        }
        let captures = regex.captures_at(text, pos);
        let start = captures
            .as_ref()
            .and_then(|c| c.get(0))
            .map_or(NO_MATCH, |m| m.start());
        self.next[slot] = start;
        captures.filter(|_| start == pos)
    }
}

struct SpanSink<'t> {
    line: usize,
    text: &'t str,
    byte: usize,
    column: usize,
    spans: Vec<TokenSpan>,
}

impl<'t> SpanSink<'t> {
    fn new(line: usize, text: &'t str) -> Self {
        Self {
            line,
            text,
            byte: 0,
            column: 0,
            spans: Vec::new(),
        }
    }

    /// Emit the bytes `self.byte..end` as one token.
    fn push(&mut self, end: usize, category: TokenCategory) {
        if end <= self.byte {
            return;
        }
        let width = self.text[self.byte..end].chars().count();
        let start = self.column;
        self.column += width;
        self.byte = end;

        if category == TokenCategory::Plain
            && let Some(last) = self.spans.last_mut()
            && last.category == TokenCategory::Plain
            && last.end == start
        {
            last.end = self.column;
            return;
        }
        self.spans
            .push(TokenSpan::new(self.line, start, self.column, category));
    }
}

impl Grammar {
    /// Tokenize a single line starting in the normal state.
    pub fn tokenize(&self, text: &str) -> Vec<TokenSpan> {
        self.tokenize_line(0, text, &LineState::Normal).0
    }

    /// Tokenize line `line` starting in `start` and return its spans with the state at its end.
    ///
    /// Spans are ordered, contiguous and cover the whole line; an empty line yields no spans.
    pub fn tokenize_line(
        &self,
        line: usize,
        text: &str,
        start: &LineState,
    ) -> (Vec<TokenSpan>, LineState) {
        let mut sink = SpanSink::new(line, text);

        if let LineState::InRegion { region, delimiter } = start {
            let Some(rule) = self.regions.get(*region) else {
                tracing::warn!(region, grammar = self.name(), "unknown region state; resetting");
                return self.tokenize_line(line, text, &LineState::Normal);
            };
            match rule.find_close(text, 0, delimiter) {
                Some(end) => sink.push(end, rule.category),
                None => {
                    sink.push(text.len(), rule.category);
                    return (sink.spans, start.clone());
                }
            }
        }

        let mut cache = MatchCache::new(self.regions.len() + self.rules.len());
        'scan: while sink.byte < text.len() {
            let pos = sink.byte;

            for (index, rule) in self.regions.iter().enumerate() {
                let Some(captures) = cache.captures_at(index, &rule.open, text, pos) else {
                    continue;
                };
                let Some(delimiter) = captures.name("delim").filter(|d| !d.is_empty()) else {
                    continue;
                };
                let open_end = captures.get(0).map_or(delimiter.end(), |m| m.end());
                let delimiter = delimiter.as_str();
                match rule.find_close(text, open_end, delimiter) {
                    Some(end) => {
                        sink.push(end, rule.category);
                        continue 'scan;
                    }
                    None => {
                        sink.push(text.len(), rule.category);
                        return (
                            sink.spans,
                            LineState::InRegion {
                                region: index,
                                delimiter: delimiter.to_string(),
                            },
                        );
                    }
                }
            }

            for (index, rule) in self.rules.iter().enumerate() {
                let slot = self.regions.len() + index;
                let Some(captures) = cache.captures_at(slot, &rule.regex, text, pos) else {
                    continue;
                };
                let token = captures.get(rule.capture.unwrap_or(0));
                if let Some(token) = token
                    && token.start() == pos
                    && token.end() > pos
                {
                    sink.push(token.end(), rule.category);
                    continue 'scan;
                }
            }

            let next = text[pos..]
                .chars()
                .next()
                .map_or(text.len(), |ch| pos + ch.len_utf8());
            sink.push(next, TokenCategory::Plain);
        }

        (sink.spans, LineState::Normal)
    }
}

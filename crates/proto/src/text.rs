//! Ordered `key|value` text maps.
//!
//! Growtopia text frames are newline-separated lines of pipe-delimited
//! tokens. The first token of a line is its key, the rest are values.
//! Entry order is significant on the wire, so this is a list of pairs
//! rather than a hash map.

use std::fmt;
use std::str::FromStr;

/// Parsed text frame preserving entry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextParse {
    entries: Vec<(String, Vec<String>)>,
}

impl fmt::Display for TextParse {
    /// Renders entries as `key: value` lines for logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, values)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }

            write!(f, "{}: {}", key, values.join("|"))?;
        }

        Ok(())
    }
}

impl TextParse {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse pipe-delimited lines.
    ///
    /// Empty tokens at the start of a line are dropped, so `|text|x` yields
    /// the key `text`. Lines without at least a key and one value are
    /// skipped entirely.
    pub fn parse(input: &str) -> Self {
        let mut entries = Vec::new();

        for line in input.split('\n') {
            let mut tokens = line.split('|').peekable();
            while matches!(tokens.peek(), Some(t) if t.is_empty()) {
                tokens.next();
            }

            let Some(key) = tokens.next() else {
                continue;
            };

            let values: Vec<String> = tokens.map(str::to_owned).collect();
            if values.is_empty() {
                continue;
            }

            entries.push((key.to_owned(), values));
        }

        Self { entries }
    }

    /// Value at `index` of the first entry with `key`.
    pub fn get(&self, key: &str, index: usize) -> Option<&str> {
        let (_, values) = self.entries.iter().find(|(k, _)| k == key)?;
        values.get(index).map(String::as_str)
    }

    /// Like [`get`](Self::get), parsed into `T`.
    pub fn get_parsed<T: FromStr>(&self, key: &str, index: usize) -> Option<T> {
        self.get(key, index)?.parse().ok()
    }

    /// Append an entry with a single value.
    pub fn add<V: ToString>(&mut self, key: &str, value: V) {
        self.entries.push((key.to_owned(), vec![value.to_string()]));
    }

    /// Append an entry with several values.
    pub fn add_list(&mut self, key: &str, values: Vec<String>) {
        self.entries.push((key.to_owned(), values));
    }

    /// Replace the values of the first entry with `key`, or append.
    pub fn set<V: ToString>(&mut self, key: &str, value: V) {
        if let Some((_, values)) = self.entries.iter_mut().find(|(k, _)| k == key) {
            *values = vec![value.to_string()];
            return;
        }

        self.add(key, value);
    }

    /// Drop the first entry with `key`.
    pub fn remove(&mut self, key: &str) {
        if let Some(pos) = self.entries.iter().position(|(k, _)| k == key) {
            self.entries.remove(pos);
        }
    }

    /// True if any entry has `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// True when no entries were parsed or added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in wire order.
    pub fn entries(&self) -> &[(String, Vec<String>)] {
        &self.entries
    }

    /// Rebuild the wire text.
    ///
    /// Entries with an empty key continue the previous line instead of
    /// starting a new one, which is how the client formats `action|input`.
    pub fn serialize(&self) -> String {
        let mut out = String::new();

        for (i, (key, values)) in self.entries.iter().enumerate() {
            out.push_str(key);
            for value in values {
                out.push('|');
                out.push_str(value);
            }

            if let Some((next_key, _)) = self.entries.get(i + 1) {
                if !next_key.is_empty() {
                    out.push('\n');
                }
            }
        }

        out
    }
}

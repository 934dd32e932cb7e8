//! Human-editable text form of a node store
//!
//! Line-oriented, one assignment per line:
//!
//! ```text
//! # comment (also `//` and `;`)
//! [Audio]
//! Volume[Default] = 0.5
//! Volume[music].Enabled = false
//! Title = "  padded  "
//! ```
//!
//! `.name` selects a child, `[parameter]` selects a variant, in any order.
//! Parameters and values may be double-quoted; inside quotes only `\"` and
//! `\\` are escapes. `[Category]` lines group the roots that follow for
//! human editors and are not part of any path.
//!
//! Decoding never fails as a whole: a malformed line is skipped and reported
//! as an [`IniError`] diagnostic.

use std::fmt::Write as _;

use tracing::warn;

use crate::constants::text::{
    ASSIGNMENT, CHILD_SEPARATOR, COMMENT_PREFIXES, ESCAPE, PARAMETER_CLOSE, PARAMETER_OPEN, QUOTE,
};
use crate::error::IniError;
use crate::store::{Node, NodeStore};

/// Result of decoding a document
#[derive(Debug, Default)]
pub struct Decoded {
    pub store: NodeStore,
    pub diagnostics: Vec<IniError>,
}

/// Decode a document into a new store
pub fn decode(text: &str) -> Decoded {
    let mut store = NodeStore::new();
    let diagnostics = decode_into(text, &mut store);
    Decoded { store, diagnostics }
}

/// Decode a document into an existing store, creating nodes as needed.
/// Returns the diagnostics for skipped lines.
pub fn decode_into(text: &str, store: &mut NodeStore) -> Vec<IniError> {
    let mut diagnostics = Vec::new();
    let mut category: Option<String> = None;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || COMMENT_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
            continue;
        }

        let parsed = if trimmed.starts_with(PARAMETER_OPEN) {
            parse_category(trimmed, line).map(|name| {
                category = Some(name).filter(|n| !n.is_empty());
            })
        } else {
            Scanner::new(trimmed, line)
                .assignment()
                .map(|assignment| assignment.apply(store, category.as_deref()))
        };

        if let Err(err) = parsed {
            warn!(line, error = %err, "Skipping malformed line");
            diagnostics.push(err);
        }
    }
    diagnostics
}

/// Encode a store, one line per node that has a value
pub fn encode(store: &NodeStore) -> String {
    let mut out = String::new();
    let mut category: Option<&str> = None;

    for root in store.roots() {
        // A root without a category stays under the previous header.
        if let Some(name) = root.category.as_deref() {
            if category != Some(name) {
                if !out.is_empty() {
                    out.push('\n');
                }
                let _ = writeln!(out, "{PARAMETER_OPEN}{name}{PARAMETER_CLOSE}");
                category = Some(name);
            }
        }
        write_node(&mut out, root.node(), root.name().to_string());
    }
    out
}

fn write_node(out: &mut String, node: &Node, path: String) {
    if let Some(value) = node.value() {
        let _ = writeln!(out, "{path} {ASSIGNMENT} {}", encode_value(value));
    }
    for variant in node.variants() {
        let parameter = encode_parameter(variant.name());
        write_node(out, variant, format!("{path}{PARAMETER_OPEN}{parameter}{PARAMETER_CLOSE}"));
    }
    for child in node.children() {
        if !is_plain_name(child.name()) {
            warn!(name = %child.name(), "Child name cannot be written unquoted");
        }
        write_node(out, child, format!("{path}{CHILD_SEPARATOR}{}", child.name()));
    }
}

fn is_special(c: char) -> bool {
    matches!(c, CHILD_SEPARATOR | PARAMETER_OPEN | PARAMETER_CLOSE | ASSIGNMENT | QUOTE)
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| is_special(c) || c.is_whitespace())
}

fn encode_parameter(parameter: &str) -> String {
    let needs_quotes = parameter.is_empty()
        || parameter.trim() != parameter
        || parameter.contains([PARAMETER_OPEN, PARAMETER_CLOSE, QUOTE]);
    if needs_quotes { quote(parameter) } else { parameter.to_string() }
}

fn encode_value(value: &str) -> String {
    let needs_quotes = value.trim() != value || value.starts_with(QUOTE);
    if needs_quotes { quote(value) } else { value.to_string() }
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push(QUOTE);
    for c in text.chars() {
        if c == QUOTE || c == ESCAPE {
            quoted.push(ESCAPE);
        }
        quoted.push(c);
    }
    quoted.push(QUOTE);
    quoted
}

fn parse_category(line: &str, number: usize) -> Result<String, IniError> {
    line.strip_prefix(PARAMETER_OPEN)
        .and_then(|rest| rest.strip_suffix(PARAMETER_CLOSE))
        .map(|name| name.trim().to_string())
        .ok_or(IniError::UnclosedBracket { line: number })
}

enum Step {
    Child(String),
    Variant(String),
}

/// One parsed `name(.child|[parameter])* = value` line
struct Assignment {
    root: String,
    steps: Vec<Step>,
    value: String,
}

impl Assignment {
    fn apply(self, store: &mut NodeStore, category: Option<&str>) {
        let is_new = store.get_root(&self.root).is_none();
        let root = store.get_or_create_root(&self.root);
        if is_new {
            root.category = category.map(str::to_string);
        }

        let mut node = root.node_mut();
        for step in &self.steps {
            node = match step {
                Step::Child(name) => node.get_or_create_child(name),
                Step::Variant(parameter) => node.get_or_create_variant(parameter),
            };
        }
        node.set_value(self.value);
    }
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Scanner {
    fn new(text: &str, line: usize) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn rest(&self) -> String {
        self.chars[self.pos..].iter().collect()
    }

    fn name(&mut self) -> Result<String, IniError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|c| !is_special(c) && !c.is_whitespace()) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(IniError::MissingName { line: self.line });
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn quoted(&mut self) -> Result<String, IniError> {
        debug_assert_eq!(self.peek(), Some(QUOTE));
        self.pos += 1;
        let mut text = String::new();
        loop {
            match self.bump() {
                Some(QUOTE) => return Ok(text),
                Some(ESCAPE) => match self.bump() {
                    Some(c @ (QUOTE | ESCAPE)) => text.push(c),
                    Some(c) => {
                        text.push(ESCAPE);
                        text.push(c);
                    }
                    None => return Err(IniError::UnterminatedQuote { line: self.line }),
                },
                Some(c) => text.push(c),
                None => return Err(IniError::UnterminatedQuote { line: self.line }),
            }
        }
    }

    fn parameter(&mut self) -> Result<String, IniError> {
        self.skip_whitespace();
        let parameter = if self.peek() == Some(QUOTE) {
            let quoted = self.quoted()?;
            self.skip_whitespace();
            quoted
        } else {
            let start = self.pos;
            while self.peek().is_some_and(|c| c != PARAMETER_CLOSE) {
                self.pos += 1;
            }
            self.chars[start..self.pos].iter().collect::<String>().trim().to_string()
        };

        match self.bump() {
            Some(PARAMETER_CLOSE) => Ok(parameter),
            _ => Err(IniError::UnclosedBracket { line: self.line }),
        }
    }

    fn value(&mut self) -> Result<String, IniError> {
        self.skip_whitespace();
        if self.peek() != Some(QUOTE) {
            return Ok(self.rest().trim().to_string());
        }
        let value = self.quoted()?;
        self.skip_whitespace();
        if self.peek().is_some() {
            return Err(IniError::TrailingText { line: self.line });
        }
        Ok(value)
    }

    fn assignment(mut self) -> Result<Assignment, IniError> {
        let root = self.name()?;
        let mut steps = Vec::new();

        loop {
            self.skip_whitespace();
            match self.bump() {
                Some(CHILD_SEPARATOR) => steps.push(Step::Child(self.name()?)),
                Some(PARAMETER_OPEN) => steps.push(Step::Variant(self.parameter()?)),
                Some(ASSIGNMENT) => break,
                Some(found) => return Err(IniError::UnexpectedCharacter { line: self.line, found }),
                None => return Err(IniError::MissingAssignment { line: self.line }),
            }
        }

        let value = self.value()?;
        Ok(Assignment { root, steps, value })
    }
}

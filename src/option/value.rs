//! Scalar values carried by options
//!
//! Every option stores one [`OptionValue`]. The persisted form is a string;
//! `parse` and `save` must round-trip (`parse(save(v)) == v`) and an empty
//! string always parses to the option's default.

use std::fmt;

use tracing::warn;

/// The type of an option's value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueType {
    /// No scalar payload (pure containers)
    None,
    Bool,
    Int,
    Float,
    Text,
    /// One of a fixed set of spellings, matched case-insensitively
    Choice(&'static [&'static str]),
}

/// The value of an option.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl OptionValue {
    /// Parse a persisted string, falling back to `default` when empty or invalid
    pub fn parse(value_type: &ValueType, text: &str, default: &OptionValue) -> OptionValue {
        if text.is_empty() {
            return default.clone();
        }

        let parsed = match value_type {
            ValueType::None => Some(OptionValue::None),
            ValueType::Bool => parse_bool(text).map(OptionValue::Bool),
            ValueType::Int => text.trim().parse().ok().map(OptionValue::Int),
            ValueType::Float => text.trim().parse().ok().map(OptionValue::Float),
            ValueType::Text => Some(OptionValue::Text(text.to_string())),
            ValueType::Choice(choices) => choices
                .iter()
                .find(|choice| choice.eq_ignore_ascii_case(text.trim()))
                .map(|choice| OptionValue::Text((*choice).to_string())),
        };

        parsed.unwrap_or_else(|| {
            warn!(value = %text, expected = ?value_type, "Unparseable option value, using default");
            default.clone()
        })
    }

    /// Persisted string form
    pub fn save(&self) -> String {
        match self {
            OptionValue::None => String::new(),
            OptionValue::Bool(v) => v.to_string(),
            OptionValue::Int(v) => v.to_string(),
            OptionValue::Float(v) => v.to_string(),
            OptionValue::Text(v) => v.clone(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            OptionValue::Float(v) => Some(*v),
            OptionValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns true if this value can be stored in an option of type `ty`.
    pub fn matches_type(&self, ty: &ValueType) -> bool {
        match (self, ty) {
            (OptionValue::None, ValueType::None)
            | (OptionValue::Bool(_), ValueType::Bool)
            | (OptionValue::Int(_), ValueType::Int)
            | (OptionValue::Float(_), ValueType::Float)
            | (OptionValue::Text(_), ValueType::Text) => true,
            (OptionValue::Text(v), ValueType::Choice(choices)) => choices.contains(&v.as_str()),
            _ => false,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.save())
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Float(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Text(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::Text(v)
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

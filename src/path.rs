//! Option path grammar
//!
//! `segment ("/" segment)*` where `segment = name (":" parameter)?`, e.g.
//! `Volume`, `Volume:music/Enabled`, `Input/Binding:3/Key`.
//! Everything after the first `:` of a segment is the parameter.

use std::fmt;
use std::str::FromStr;

use crate::constants::path::{PARAMETER_SEPARATOR, SEGMENT_SEPARATOR};
use crate::error::PathError;

/// One `name[:parameter]` step of a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String,
    pub parameter: Option<String>,
}

impl PathSegment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameter: None,
        }
    }

    pub fn with_parameter(name: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameter: Some(parameter.into()),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(parameter) = &self.parameter {
            write!(f, "{PARAMETER_SEPARATOR}{parameter}")?;
        }
        Ok(())
    }
}

/// A parsed, non-empty path: a root segment followed by child segments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionPath {
    segments: Vec<PathSegment>,
}

impl OptionPath {
    pub fn root(segment: PathSegment) -> Self {
        Self {
            segments: vec![segment],
        }
    }

    pub fn join(mut self, segment: PathSegment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The root segment and the child segments after it
    pub fn split_root(&self) -> (&PathSegment, &[PathSegment]) {
        self.segments
            .split_first()
            .expect("OptionPath always holds at least one segment")
    }

    pub fn parse(input: &str) -> Result<Self, PathError> {
        if input.is_empty() {
            return Err(PathError::Empty);
        }

        let segments = input
            .split(SEGMENT_SEPARATOR)
            .enumerate()
            .map(|(index, raw)| {
                let (name, parameter) = match raw.split_once(PARAMETER_SEPARATOR) {
                    Some((name, parameter)) => (name, Some(parameter)),
                    None => (raw, None),
                };
                if name.is_empty() {
                    return Err(PathError::EmptyName { index });
                }
                if parameter.is_some_and(str::is_empty) {
                    return Err(PathError::EmptyParameter { index });
                }
                Ok(PathSegment {
                    name: name.to_string(),
                    parameter: parameter.map(str::to_string),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { segments })
    }
}

impl FromStr for OptionPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for OptionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                write!(f, "{SEGMENT_SEPARATOR}")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

//! Option definitions and registry
//!
//! Options are named, typed settings. Each option type is described by an
//! [`OptionDef`] produced by a constructor function; the [`OptionRegistry`]
//! maps option names to those constructors and builds the live
//! [`OptionGraph`] from them at startup.

mod graph;
mod value;

pub use graph::{OptionGraph, OptionId};
pub use value::{OptionValue, ValueType};

use tracing::debug;

use crate::constants::naming::{MODULE_SEPARATOR, TYPE_PREFIX};
use crate::constants::variant::{ARRAY_DEFAULT_PARAMETER, DICTIONARY_DEFAULT_PARAMETER};
use crate::ordering::names_match;

/// How many instances of an option can exist side by side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variance {
    /// Exactly one instance
    #[default]
    Single,
    /// Variants keyed by user-chosen parameters
    Dictionary,
    /// Variants keyed by sequential indices, renumbered automatically
    Array,
}

impl Variance {
    /// Parameter of the always-present default variant
    pub fn default_parameter(self) -> Option<&'static str> {
        match self {
            Variance::Single => None,
            Variance::Dictionary => Some(DICTIONARY_DEFAULT_PARAMETER),
            Variance::Array => Some(ARRAY_DEFAULT_PARAMETER),
        }
    }

    pub fn has_variants(self) -> bool {
        self != Variance::Single
    }
}

/// Constructor for an option type
pub type OptionCtor = fn() -> OptionDef;

/// Definition of one option type.
#[derive(Debug, Clone)]
pub struct OptionDef {
    pub name: String,
    pub variance: Variance,
    pub value_type: ValueType,
    pub default: OptionValue,
    /// Children are applied in ascending priority
    pub priority: i32,
    pub children: Vec<OptionCtor>,
}

impl OptionDef {
    /// Describe an option whose name is derived from `type_name`
    pub fn new(type_name: &str, value_type: ValueType, default: impl Into<OptionValue>) -> Self {
        Self {
            name: derive_option_name(type_name).to_string(),
            variance: Variance::Single,
            value_type,
            default: default.into(),
            priority: 0,
            children: Vec::new(),
        }
    }

    /// Describe an option named after the Rust type `T`
    pub fn of<T: ?Sized>(value_type: ValueType, default: impl Into<OptionValue>) -> Self {
        Self::new(std::any::type_name::<T>(), value_type, default)
    }

    /// A valueless option that only groups children
    pub fn group(type_name: &str) -> Self {
        Self::new(type_name, ValueType::None, OptionValue::None)
    }

    pub fn with_variance(mut self, variance: Variance) -> Self {
        self.variance = variance;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_child(mut self, child: OptionCtor) -> Self {
        self.children.push(child);
        self
    }
}

/// Strip any module path, generic arguments and the `Option` prefix
///
/// `my_app::options::OptionVolume` becomes `Volume`; a bare `Option` is kept.
pub fn derive_option_name(type_name: &str) -> &str {
    let without_generics = type_name.split('<').next().unwrap_or(type_name);
    let last = without_generics
        .rsplit(MODULE_SEPARATOR)
        .next()
        .unwrap_or(without_generics);
    match last.strip_prefix(TYPE_PREFIX) {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => last,
    }
}

/// Registry of all option types known to the application.
#[derive(Debug, Clone, Default)]
pub struct OptionRegistry {
    types: Vec<(String, OptionCtor)>,
}

impl OptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root option type, replacing one with the same name
    pub fn register(&mut self, ctor: OptionCtor) -> &mut Self {
        let name = ctor().name;
        if let Some(entry) = self.types.iter_mut().find(|(n, _)| names_match(n, &name)) {
            debug!(option = %name, "Replacing registered option type");
            entry.1 = ctor;
        } else {
            self.types.push((name, ctor));
        }
        self
    }

    /// Remove a root option type; returns whether it was registered
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.types.len();
        self.types.retain(|(n, _)| !names_match(n, name));
        self.types.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.iter().any(|(n, _)| names_match(n, name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|(n, _)| n.as_str())
    }

    /// Build a fresh live graph with one root instance per registered type
    pub fn instantiate(&self) -> OptionGraph {
        let mut graph = OptionGraph::new();
        for (_, ctor) in &self.types {
            graph.add_root(*ctor);
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OptionVolume;

    fn volume() -> OptionDef {
        OptionDef::of::<OptionVolume>(ValueType::Float, 1.0).with_variance(Variance::Dictionary)
    }

    fn title() -> OptionDef {
        OptionDef::new("Title", ValueType::Text, "Untitled")
    }

    #[test]
    fn test_derive_option_name() {
        assert_eq!(derive_option_name("my_app::options::OptionVolume"), "Volume");
        assert_eq!(derive_option_name("OptionList<alloc::string::String>"), "List");
        assert_eq!(derive_option_name("Title"), "Title");
        assert_eq!(derive_option_name("Option"), "Option");
    }

    #[test]
    fn test_name_from_rust_type() {
        assert_eq!(volume().name, "Volume");
    }

    #[test]
    fn test_variance_default_parameters() {
        assert_eq!(Variance::Single.default_parameter(), None);
        assert_eq!(Variance::Dictionary.default_parameter(), Some("Default"));
        assert_eq!(Variance::Array.default_parameter(), Some("0"));
    }

    #[test]
    fn test_registry_register_replace_and_unregister() {
        let mut registry = OptionRegistry::new();
        registry.register(volume).register(title).register(volume);

        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Volume", "Title"]);
        assert!(registry.unregister("title"));
        assert!(!registry.unregister("title"));
        assert!(!registry.contains("Title"));
    }

    #[test]
    fn test_instantiate_builds_roots() {
        let mut registry = OptionRegistry::new();
        registry.register(volume).register(title);

        let graph = registry.instantiate();
        assert_eq!(graph.roots().len(), 2);
        assert!(graph.root("volume").is_some());
    }
}

//! Live option graph
//!
//! Option instances live in a slab and refer to each other by [`OptionId`].
//! A parent owns its children and variants: children are the fixed set
//! declared by the option type, variants are created and removed at runtime
//! and only ever hang off the default variant (the container itself).
//!
//! Paths are memoized per instance and invalidated by walking the subtree
//! whenever the structure above an instance changes.

use std::cell::OnceCell;

use slab::Slab;
use tracing::trace;

use super::{OptionCtor, OptionDef, OptionValue, ValueType, Variance};
use crate::constants::path::{PARAMETER_SEPARATOR, SEGMENT_SEPARATOR};
use crate::constants::variant::ARRAY_DEFAULT_PARAMETER;
use crate::ordering::{names_match, natural_cmp};

/// Handle to an option instance inside an [`OptionGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionId(usize);

#[derive(Debug)]
struct OptionInstance {
    name: String,
    ctor: OptionCtor,
    variance: Variance,
    value_type: ValueType,
    default: OptionValue,
    value: OptionValue,
    variant_default_parameter: String,
    variant_parameter: String,
    is_default_variant: bool,
    parent: Option<OptionId>,
    variants: Vec<OptionId>,
    children: Vec<OptionId>,
    path: OnceCell<String>,
}

/// The live, typed counterpart of the persisted node tree
#[derive(Debug, Default)]
pub struct OptionGraph {
    instances: Slab<OptionInstance>,
    roots: Vec<OptionId>,
}

impl OptionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate a root option from its constructor
    pub fn add_root(&mut self, ctor: OptionCtor) -> OptionId {
        let id = self.instantiate(ctor, None);
        self.roots.push(id);
        id
    }

    pub fn roots(&self) -> &[OptionId] {
        &self.roots
    }

    pub fn root(&self, name: &str) -> Option<OptionId> {
        self.roots
            .iter()
            .copied()
            .find(|id| names_match(&self.get(*id).name, name))
    }

    /// Whether `id` was issued by this graph
    pub fn contains(&self, id: OptionId) -> bool {
        self.instances.contains(id.0)
    }

    fn get(&self, id: OptionId) -> &OptionInstance {
        &self.instances[id.0]
    }

    fn get_mut(&mut self, id: OptionId) -> &mut OptionInstance {
        &mut self.instances[id.0]
    }

    fn instantiate(&mut self, ctor: OptionCtor, parent: Option<OptionId>) -> OptionId {
        self.instantiate_def(ctor, ctor(), parent)
    }

    fn instantiate_def(
        &mut self,
        ctor: OptionCtor,
        def: OptionDef,
        parent: Option<OptionId>,
    ) -> OptionId {
        let default_parameter = def.variance.default_parameter().unwrap_or_default().to_string();

        let id = OptionId(self.instances.insert(OptionInstance {
            name: def.name,
            ctor,
            variance: def.variance,
            value_type: def.value_type,
            value: def.default.clone(),
            default: def.default,
            variant_parameter: default_parameter.clone(),
            variant_default_parameter: default_parameter,
            is_default_variant: true,
            parent,
            variants: Vec::new(),
            children: Vec::new(),
            path: OnceCell::new(),
        }));

        let mut children: Vec<(i32, OptionId)> = def
            .children
            .into_iter()
            .map(|child| {
                let child_def = child();
                (child_def.priority, self.instantiate_def(child, child_def, Some(id)))
            })
            .collect();
        children.sort_by_key(|(priority, _)| *priority);
        self.get_mut(id).children = children.into_iter().map(|(_, child)| child).collect();
        id
    }

    // -- accessors --------------------------------------------------------

    pub fn name(&self, id: OptionId) -> &str {
        &self.get(id).name
    }

    pub fn variance(&self, id: OptionId) -> Variance {
        self.get(id).variance
    }

    pub fn value_type(&self, id: OptionId) -> &ValueType {
        &self.get(id).value_type
    }

    pub fn parent(&self, id: OptionId) -> Option<OptionId> {
        self.get(id).parent
    }

    pub fn children(&self, id: OptionId) -> &[OptionId] {
        &self.get(id).children
    }

    /// Non-default variants; empty unless `id` is a default variant
    pub fn variants(&self, id: OptionId) -> &[OptionId] {
        &self.get(id).variants
    }

    pub fn variant_parameter(&self, id: OptionId) -> &str {
        &self.get(id).variant_parameter
    }

    pub fn variant_default_parameter(&self, id: OptionId) -> &str {
        &self.get(id).variant_default_parameter
    }

    pub fn is_default_variant(&self, id: OptionId) -> bool {
        self.get(id).is_default_variant
    }

    pub fn find_child(&self, id: OptionId, name: &str) -> Option<OptionId> {
        self.get(id)
            .children
            .iter()
            .copied()
            .find(|child| names_match(&self.get(*child).name, name))
    }

    // -- values -----------------------------------------------------------

    pub fn value(&self, id: OptionId) -> &OptionValue {
        &self.get(id).value
    }

    pub fn default_value(&self, id: OptionId) -> &OptionValue {
        &self.get(id).default
    }

    /// Store a typed value
    ///
    /// Panics if the value does not fit the option's type.
    pub fn set_value(&mut self, id: OptionId, value: impl Into<OptionValue>) {
        let value = value.into();
        let instance = self.get_mut(id);
        assert!(
            value.matches_type(&instance.value_type),
            "value {:?} does not fit option '{}' of type {:?}",
            value,
            instance.name,
            instance.value_type
        );
        instance.value = value;
    }

    /// Parse a persisted string into the option's value
    pub fn load(&mut self, id: OptionId, text: &str) {
        let instance = self.get_mut(id);
        instance.value = OptionValue::parse(&instance.value_type, text, &instance.default);
    }

    /// Persisted string form of the option's value
    pub fn save(&self, id: OptionId) -> String {
        self.get(id).value.save()
    }

    /// Reset the option, its variants and its children to their defaults
    pub fn clear(&mut self, id: OptionId) {
        let instance = self.get_mut(id);
        instance.value = instance.default.clone();
        let nested: Vec<OptionId> = instance
            .variants
            .iter()
            .chain(instance.children.iter())
            .copied()
            .collect();
        for nested in nested {
            self.clear(nested);
        }
    }

    // -- variants ---------------------------------------------------------

    fn assert_variant_container(&self, id: OptionId) {
        let instance = self.get(id);
        assert!(
            instance.variance.has_variants(),
            "option '{}' has Single variance and cannot hold variants",
            instance.name
        );
        assert!(
            instance.is_default_variant,
            "variant '{}' of option '{}' is not the default variant",
            instance.variant_parameter,
            instance.name
        );
    }

    /// Create a new variant keyed by `parameter`
    ///
    /// Panics when `id` cannot hold variants, when `parameter` is the default
    /// parameter, or when a variant with that parameter already exists.
    pub fn add_variant(&mut self, id: OptionId, parameter: &str) -> OptionId {
        let variant = self.attach_variant(id, parameter);
        if self.get(id).variance == Variance::Array {
            self.renumber_array_variants(id);
        }
        variant
    }

    /// Insert a variant without renumbering array variants
    pub(crate) fn attach_variant(&mut self, id: OptionId, parameter: &str) -> OptionId {
        self.assert_variant_container(id);
        let container = self.get(id);
        assert!(
            !names_match(parameter, &container.variant_default_parameter),
            "'{}' is the default parameter of option '{}'",
            parameter,
            container.name
        );
        assert!(
            self.find_variant(id, parameter).is_none(),
            "option '{}' already has a variant '{}'",
            container.name,
            parameter
        );

        let ctor = container.ctor;
        let variant = self.instantiate(ctor, Some(id));
        let instance = self.get_mut(variant);
        instance.variant_parameter = parameter.to_string();
        instance.is_default_variant = false;
        self.get_mut(id).variants.push(variant);

        trace!(option = %self.name(id), parameter, "Added option variant");
        variant
    }

    fn find_variant(&self, id: OptionId, parameter: &str) -> Option<OptionId> {
        self.get(id)
            .variants
            .iter()
            .copied()
            .find(|variant| names_match(&self.get(*variant).variant_parameter, parameter))
    }

    /// Look up a variant; the default parameter resolves to `id` itself
    pub fn get_variant(&mut self, id: OptionId, parameter: &str, create: bool) -> Option<OptionId> {
        match self.lookup_variant(id, parameter) {
            Some(found) => Some(found),
            None if create => Some(self.add_variant(id, parameter)),
            None => None,
        }
    }

    /// Non-creating variant lookup
    pub fn lookup_variant(&self, id: OptionId, parameter: &str) -> Option<OptionId> {
        self.assert_variant_container(id);
        if names_match(parameter, &self.get(id).variant_default_parameter) {
            return Some(id);
        }
        self.find_variant(id, parameter)
    }

    /// Detach a variant from its container
    ///
    /// The detached instance and its subtree stay addressable with no parent,
    /// so ids held elsewhere never alias a later variant. Returns false when
    /// `variant` is not a variant of `id`. Panics when asked to remove the
    /// default variant.
    pub fn remove_variant(&mut self, id: OptionId, variant: OptionId) -> bool {
        self.assert_variant_container(id);
        assert!(
            variant != id,
            "the default variant of option '{}' cannot be removed",
            self.get(id).name
        );

        let container = self.get_mut(id);
        let Some(index) = container.variants.iter().position(|v| *v == variant) else {
            return false;
        };
        container.variants.remove(index);
        self.detach(variant);

        if self.get(id).variance == Variance::Array {
            self.renumber_array_variants(id);
        }
        true
    }

    /// Detach every non-default variant
    pub fn clear_variants(&mut self, id: OptionId) {
        self.assert_variant_container(id);
        let variants = std::mem::take(&mut self.get_mut(id).variants);
        for variant in variants {
            self.detach(variant);
        }
    }

    fn detach(&mut self, variant: OptionId) {
        self.get_mut(variant).parent = None;
        self.invalidate_path(variant);
        trace!(option = %self.name(variant), "Detached option variant");
    }

    /// Force the default variant to index 0 and renumber the others 1..n in
    /// natural order of their current parameters
    pub fn renumber_array_variants(&mut self, id: OptionId) {
        let container = self.get_mut(id);
        if container.variant_parameter != ARRAY_DEFAULT_PARAMETER {
            container.variant_parameter = ARRAY_DEFAULT_PARAMETER.to_string();
            container.variant_default_parameter = ARRAY_DEFAULT_PARAMETER.to_string();
            self.invalidate_path(id);
        }

        let mut variants = self.get(id).variants.clone();
        variants.sort_by(|a, b| {
            natural_cmp(&self.get(*a).variant_parameter, &self.get(*b).variant_parameter)
        });

        for (index, variant) in variants.iter().enumerate() {
            let parameter = (index + 1).to_string();
            if self.get(*variant).variant_parameter != parameter {
                self.get_mut(*variant).variant_parameter = parameter;
                self.invalidate_path(*variant);
            }
        }
        self.get_mut(id).variants = variants;
    }

    // -- paths ------------------------------------------------------------

    /// `Parent/Name` for roots, children and default variants,
    /// `Parent:Parameter` for other variants
    pub fn path(&self, id: OptionId) -> &str {
        let instance = self.get(id);
        instance.path.get_or_init(|| match instance.parent {
            Some(parent) if !instance.is_default_variant => {
                let parent = self.path(parent);
                format!("{parent}{PARAMETER_SEPARATOR}{}", instance.variant_parameter)
            }
            Some(parent) => {
                format!("{}{}{}", self.path(parent), SEGMENT_SEPARATOR, instance.name)
            }
            None => instance.name.clone(),
        })
    }

    /// Drop the memoized path of `id` and everything below it
    pub fn invalidate_path(&mut self, id: OptionId) {
        let instance = self.get_mut(id);
        instance.path.take();
        let nested: Vec<OptionId> = instance
            .variants
            .iter()
            .chain(instance.children.iter())
            .copied()
            .collect();
        for nested in nested {
            self.invalidate_path(nested);
        }
    }
}

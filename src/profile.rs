//! Profile synchronization
//!
//! A [`Profile`] pairs the live [`OptionGraph`] with its persisted
//! [`NodeStore`] and reconciles the two:
//! - **load**: store → graph; the store decides which variants exist
//! - **save_to_store**: graph → store; the graph decides which variants exist
//! - **clean_store**: drop persisted entries that no live option maps to
//!
//! The persisted tree keeps a variant container's own data in a nested
//! variant named after the default parameter, while the live graph uses the
//! container instance itself as the default variant. The container node's own
//! value is never read or written.

use tracing::{debug, info, trace};

use crate::option::{OptionGraph, OptionId, OptionRegistry, Variance};
use crate::ordering::names_match;
use crate::path::OptionPath;
use crate::store::{Node, NodeStore};

/// Live options plus the store they are persisted to
#[derive(Debug)]
pub struct Profile {
    registry: OptionRegistry,
    graph: OptionGraph,
    store: NodeStore,
}

impl Profile {
    /// Build the graph from `registry` with an empty store
    pub fn new(registry: OptionRegistry) -> Self {
        let graph = registry.instantiate();
        Self {
            registry,
            graph,
            store: NodeStore::new(),
        }
    }

    /// Build the graph and load it from `store`
    pub fn with_store(registry: OptionRegistry, store: NodeStore) -> Self {
        let mut profile = Self::new(registry);
        profile.store = store;
        profile.load();
        profile
    }

    pub fn registry(&self) -> &OptionRegistry {
        &self.registry
    }

    pub fn graph(&self) -> &OptionGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut OptionGraph {
        &mut self.graph
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut NodeStore {
        &mut self.store
    }

    pub fn into_store(self) -> NodeStore {
        self.store
    }

    /// Replace the backing store and immediately load from it.
    /// Returns the previous store.
    pub fn swap_store(&mut self, store: NodeStore) -> NodeStore {
        let previous = std::mem::replace(&mut self.store, store);
        self.load();
        previous
    }

    pub fn is_dirty(&mut self, clear: bool) -> bool {
        self.store.check_dirty(clear)
    }

    /// Reset every root option, then load each root node that has a live option
    pub fn load(&mut self) {
        for root in self.graph.roots().to_vec() {
            self.graph.clear(root);
        }

        let mut loaded = 0;
        for root_node in self.store.roots() {
            match self.graph.root(root_node.name()) {
                Some(root) => {
                    load_node(&mut self.graph, root, root_node.node(), false);
                    loaded += 1;
                }
                None => debug!(root = %root_node.name(), "No option for stored root, skipping"),
            }
        }
        info!(roots = loaded, "Loaded profile from store");
    }

    /// Write every live option into the store.
    ///
    /// With `clear`, the store is rebuilt from scratch so that only live
    /// options remain; root `inclusion` and `category` tags are carried over.
    /// The store is only replaced (and marked dirty) when the result differs.
    pub fn save_to_store(&mut self, clear: bool) {
        if !clear {
            for &root in self.graph.roots() {
                let root_node = self.store.get_or_create_root(self.graph.name(root));
                save_node(root_node.node_mut(), &self.graph, root, false);
            }
            debug!(dirty = self.store.is_dirty(), "Saved profile into existing store");
            return;
        }

        let mut fresh = NodeStore::new();
        for &root in self.graph.roots() {
            let name = self.graph.name(root);
            let root_node = fresh.get_or_create_root(name);
            if let Some(previous) = self.store.get_root(name) {
                root_node.inclusion = previous.inclusion.clone();
                root_node.category = previous.category.clone();
            }
            save_node(root_node.node_mut(), &self.graph, root, false);
        }

        if fresh != self.store {
            debug!("Profile changed, replacing store");
            self.store = fresh;
        } else {
            trace!("Profile unchanged, keeping store");
        }
    }

    /// Remove persisted entries that have no live counterpart
    pub fn clean_store(&mut self) {
        let graph = &self.graph;
        self.store.retain_roots(|root_node| {
            let keep = graph.root(root_node.name()).is_some();
            if !keep {
                debug!(root = %root_node.name(), "Pruning stored root without option");
            }
            keep
        });

        for root_node in self.store.roots_mut() {
            if let Some(root) = graph.root(root_node.name()) {
                clean_node(root_node.node_mut(), graph, root, false);
            }
        }
    }

    /// Resolve a path string such as `Volume:music/Enabled`.
    ///
    /// Never creates variants; any unknown segment or malformed path yields `None`.
    pub fn get_option(&self, path: &str) -> Option<OptionId> {
        match OptionPath::parse(path) {
            Ok(path) => self.resolve(&path),
            Err(err) => {
                debug!(path, error = %err, "Malformed option path");
                None
            }
        }
    }

    pub fn resolve(&self, path: &OptionPath) -> Option<OptionId> {
        let (root, rest) = path.split_root();
        let mut id = self.graph.root(&root.name)?;
        if let Some(parameter) = &root.parameter {
            id = self.variant_of(id, parameter)?;
        }
        for segment in rest {
            id = self.graph.find_child(id, &segment.name)?;
            if let Some(parameter) = &segment.parameter {
                id = self.variant_of(id, parameter)?;
            }
        }
        Some(id)
    }

    fn variant_of(&self, id: OptionId, parameter: &str) -> Option<OptionId> {
        if !self.graph.variance(id).has_variants() {
            return None;
        }
        self.graph.lookup_variant(id, parameter)
    }
}

/// Whether `id` must be handled as a variant container at this step
fn is_container(graph: &OptionGraph, id: OptionId, is_default_node: bool) -> bool {
    !is_default_node && graph.variance(id).has_variants() && graph.is_default_variant(id)
}

fn load_node(graph: &mut OptionGraph, id: OptionId, node: &Node, is_default_node: bool) {
    if is_container(graph, id, is_default_node) {
        let default_parameter = graph.variant_default_parameter(id).to_string();
        if let Some(default_node) = node.get_variant(&default_parameter) {
            load_node(graph, id, default_node, true);
        }

        // Arrays are renumbered once at the end so stored parameters still
        // match while the pass runs.
        let mut seen = Vec::new();
        for variant_node in node.variants() {
            if names_match(variant_node.name(), &default_parameter) {
                continue;
            }
            let variant = match graph.lookup_variant(id, variant_node.name()) {
                Some(variant) if seen.contains(&variant) => {
                    debug!(
                        option = %graph.name(id),
                        parameter = %variant_node.name(),
                        "Duplicate stored variant, skipping"
                    );
                    continue;
                }
                Some(variant) => variant,
                None => graph.attach_variant(id, variant_node.name()),
            };
            seen.push(variant);
            load_node(graph, variant, variant_node, false);
        }

        let stale: Vec<OptionId> = graph
            .variants(id)
            .iter()
            .copied()
            .filter(|variant| !seen.contains(variant))
            .collect();
        for variant in stale {
            trace!(
                option = %graph.name(id),
                parameter = %graph.variant_parameter(variant),
                "Removing variant missing from store"
            );
            graph.remove_variant(id, variant);
        }

        if graph.variance(id) == Variance::Array {
            graph.renumber_array_variants(id);
        }
        return;
    }

    graph.load(id, node.value().unwrap_or_default());
    for child_node in node.children() {
        match graph.find_child(id, child_node.name()) {
            Some(child) => load_node(graph, child, child_node, false),
            None => trace!(
                option = %graph.name(id),
                child = %child_node.name(),
                "No option for stored child"
            ),
        }
    }
}

fn save_node(node: &mut Node, graph: &OptionGraph, id: OptionId, is_default_node: bool) {
    if is_container(graph, id, is_default_node) {
        let default_parameter = graph.variant_default_parameter(id);
        save_node(node.get_or_create_variant(default_parameter), graph, id, true);

        node.retain_variants(|variant_node| {
            names_match(variant_node.name(), default_parameter)
                || graph.lookup_variant(id, variant_node.name()).is_some()
        });
        for &variant in graph.variants(id) {
            let variant_node = node.get_or_create_variant(graph.variant_parameter(variant));
            save_node(variant_node, graph, variant, false);
        }
        return;
    }

    node.set_value(graph.save(id));
    for &child in graph.children(id) {
        save_node(node.get_or_create_child(graph.name(child)), graph, child, false);
    }
}

fn clean_node(node: &mut Node, graph: &OptionGraph, id: OptionId, is_default_node: bool) {
    if is_container(graph, id, is_default_node) {
        let default_parameter = graph.variant_default_parameter(id);
        node.retain_variants(|variant_node| {
            names_match(variant_node.name(), default_parameter)
                || graph.lookup_variant(id, variant_node.name()).is_some()
        });
        for variant_node in node.variants_mut() {
            if let Some(variant) = graph.lookup_variant(id, variant_node.name()) {
                clean_node(variant_node, graph, variant, variant == id);
            }
        }
        return;
    }

    node.retain_children(|child_node| graph.find_child(id, child_node.name()).is_some());
    for child_node in node.children_mut() {
        if let Some(child) = graph.find_child(id, child_node.name()) {
            clean_node(child_node, graph, child, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::{OptionDef, OptionValue, ValueType};

    const MODES: &[&str] = &["Windowed", "Fullscreen"];

    fn enabled() -> OptionDef {
        OptionDef::new("OptionEnabled", ValueType::Bool, true)
    }

    fn label() -> OptionDef {
        OptionDef::new("OptionLabel", ValueType::Text, "")
    }

    fn volume() -> OptionDef {
        OptionDef::new("OptionVolume", ValueType::Float, 1.0)
            .with_variance(Variance::Dictionary)
            .with_child(enabled)
    }

    fn slot() -> OptionDef {
        OptionDef::new("OptionSlot", ValueType::Text, "empty")
            .with_variance(Variance::Array)
            .with_child(label)
    }

    fn width() -> OptionDef {
        OptionDef::new("OptionWidth", ValueType::Int, 800_i64)
    }

    fn mode() -> OptionDef {
        OptionDef::new("OptionMode", ValueType::Choice(MODES), "Windowed")
    }

    fn display() -> OptionDef {
        OptionDef::group("OptionDisplay").with_child(width).with_child(mode)
    }

    fn display_without_mode() -> OptionDef {
        OptionDef::group("OptionDisplay").with_child(width)
    }

    fn registry() -> OptionRegistry {
        let mut registry = OptionRegistry::new();
        registry.register(volume).register(slot).register(display);
        registry
    }

    fn profile() -> Profile {
        Profile::new(registry())
    }

    fn option(profile: &Profile, path: &str) -> OptionId {
        profile.get_option(path).unwrap_or_else(|| panic!("no option at {path}"))
    }

    fn value(profile: &Profile, path: &str) -> OptionValue {
        profile.graph().value(option(profile, path)).clone()
    }

    fn stored(profile: &Profile, path: &str) -> Option<String> {
        let path: OptionPath = path.parse().expect("valid path");
        profile.store().find(&path).and_then(Node::value).map(str::to_string)
    }

    fn store_with(entries: &[(&str, &str)]) -> NodeStore {
        let mut store = NodeStore::new();
        for (path, value) in entries {
            let path: OptionPath = path.parse().expect("valid path");
            store.get_or_create(&path).set_value(*value);
        }
        store
    }

    #[test]
    fn test_load_reads_default_variant_from_nested_node() {
        let store = store_with(&[
            ("Volume", "9.0"),
            ("Volume:Default", "0.5"),
            ("Volume:Default/Enabled", "false"),
            ("Volume:music", "0.8"),
            ("Volume:music/Enabled", "true"),
        ]);
        let profile = Profile::with_store(registry(), store);

        assert_eq!(
            value(&profile, "Volume"),
            OptionValue::Float(0.5),
            "container value is ignored"
        );
        assert_eq!(value(&profile, "Volume/Enabled"), OptionValue::Bool(false));
        assert_eq!(value(&profile, "Volume:music"), OptionValue::Float(0.8));
        assert_eq!(value(&profile, "Volume:music/Enabled"), OptionValue::Bool(true));
    }

    #[test]
    fn test_load_resets_missing_values_to_default() {
        let mut profile = profile();
        let width = option(&profile, "Display/Width");
        profile.graph_mut().set_value(width, 1024_i64);

        profile.load();
        assert_eq!(value(&profile, "Display/Width"), OptionValue::Int(800));
    }

    #[test]
    fn test_load_removes_variants_missing_from_store() {
        let mut profile = profile();
        let volume = option(&profile, "Volume");
        profile.graph_mut().add_variant(volume, "music");
        profile.graph_mut().add_variant(volume, "voice");

        let previous = profile.swap_store(store_with(&[("Volume:voice", "0.3")]));
        assert!(previous.is_empty());

        assert!(profile.get_option("Volume:music").is_none());
        assert_eq!(value(&profile, "Volume:voice"), OptionValue::Float(0.3));
        assert_eq!(profile.graph().variants(volume).len(), 1);
    }

    #[test]
    fn test_load_without_variants_clears_live_variants() {
        let mut profile = profile();
        let volume = option(&profile, "Volume");
        profile.graph_mut().add_variant(volume, "music");

        profile.swap_store(store_with(&[("Volume:Default", "0.2")]));
        assert!(profile.graph().variants(volume).is_empty());
        assert_eq!(value(&profile, "Volume"), OptionValue::Float(0.2));
    }

    #[test]
    fn test_load_renumbers_array_variants() {
        let store = store_with(&[
            ("Slot:0", "first"),
            ("Slot:7", "seventh"),
            ("Slot:2", "second"),
            ("Slot:2/Label", "two"),
        ]);
        let profile = Profile::with_store(registry(), store);

        assert_eq!(value(&profile, "Slot"), OptionValue::from("first"));
        assert_eq!(value(&profile, "Slot:1"), OptionValue::from("second"));
        assert_eq!(value(&profile, "Slot:1/Label"), OptionValue::from("two"));
        assert_eq!(value(&profile, "Slot:2"), OptionValue::from("seventh"));
        assert!(profile.get_option("Slot:3").is_none());
    }

    #[test]
    fn test_load_skips_unknown_roots_and_children() {
        let store = store_with(&[
            ("Unknown", "1"),
            ("Display/Depth", "24"),
            ("Display/Width", "640"),
        ]);
        let profile = Profile::with_store(registry(), store);
        assert_eq!(value(&profile, "Display/Width"), OptionValue::Int(640));
    }

    #[test]
    fn test_save_writes_default_variant_under_default_parameter() {
        let mut profile = profile();
        let volume = option(&profile, "Volume");
        let music = profile.graph_mut().add_variant(volume, "music");
        profile.graph_mut().set_value(volume, 0.4);
        profile.graph_mut().set_value(music, 0.9);

        profile.save_to_store(true);

        assert_eq!(stored(&profile, "Volume"), None);
        assert_eq!(stored(&profile, "Volume:Default"), Some("0.4".into()));
        assert_eq!(stored(&profile, "Volume:Default/Enabled"), Some("true".into()));
        assert_eq!(stored(&profile, "Volume:music"), Some("0.9".into()));
        assert_eq!(stored(&profile, "Display/Mode"), Some("Windowed".into()));
    }

    #[test]
    fn test_save_then_load_keeps_values() {
        let mut profile = profile();
        let volume = option(&profile, "Volume");
        let slot = option(&profile, "Slot");
        let music = profile.graph_mut().add_variant(volume, "music");
        let music_enabled = profile.graph().find_child(music, "Enabled").expect("child");
        let first = profile.graph_mut().add_variant(slot, "1");
        let mode = option(&profile, "Display/Mode");
        profile.graph_mut().set_value(music_enabled, false);
        profile.graph_mut().set_value(first, "loaded");
        profile.graph_mut().set_value(mode, "Fullscreen");

        profile.save_to_store(true);
        let reloaded = Profile::with_store(registry(), profile.store().clone());

        let paths = [
            "Volume",
            "Volume:music",
            "Volume:music/Enabled",
            "Slot",
            "Slot:1",
            "Display/Mode",
        ];
        for path in paths {
            assert_eq!(value(&reloaded, path), value(&profile, path), "{path}");
        }
    }

    #[test]
    fn test_save_prunes_store_variants_without_live_option() {
        let mut profile = Profile::with_store(registry(), store_with(&[("Volume:music", "0.8")]));
        let volume = option(&profile, "Volume");
        let music = option(&profile, "Volume:music");
        profile.graph_mut().remove_variant(volume, music);

        profile.save_to_store(false);
        assert_eq!(stored(&profile, "Volume:music"), None);
        assert!(stored(&profile, "Volume:Default").is_some());
    }

    #[test]
    fn test_save_without_clear_keeps_foreign_roots() {
        let mut profile = Profile::with_store(registry(), store_with(&[("Foreign", "x")]));
        profile.save_to_store(false);
        assert_eq!(stored(&profile, "Foreign"), Some("x".into()));

        profile.save_to_store(true);
        assert_eq!(stored(&profile, "Foreign"), None);
    }

    #[test]
    fn test_save_with_clear_keeps_root_tags() {
        let mut store = store_with(&[("Display/Width", "640")]);
        if let Some(root) = store.get_root_mut("Display") {
            root.inclusion = "mobile".into();
            root.category = Some("Video".into());
        }
        let mut profile = Profile::with_store(registry(), store);

        profile.save_to_store(true);
        let root = profile.store().get_root("Display").expect("display root");
        assert_eq!(root.inclusion, "mobile");
        assert_eq!(root.category.as_deref(), Some("Video"));
    }

    #[test]
    fn test_repeated_save_is_not_dirty() {
        let mut profile = profile();
        profile.save_to_store(true);
        assert!(profile.is_dirty(true));

        profile.save_to_store(true);
        assert!(!profile.is_dirty(false));

        let width = option(&profile, "Display/Width");
        profile.graph_mut().set_value(width, 1_i64);
        profile.save_to_store(true);
        assert!(profile.is_dirty(false));
    }

    #[test]
    fn test_clean_removes_unknown_root() {
        let store = store_with(&[("A", "1"), ("Display/Width", "640")]);
        let mut profile = Profile::with_store(registry(), store);
        profile.clean_store();

        assert!(profile.store().get_root("A").is_none());
        assert_eq!(stored(&profile, "Display/Width"), Some("640".into()));
    }

    #[test]
    fn test_clean_removes_children_of_removed_types() {
        let store = store_with(&[("Display/Width", "640"), ("Display/Mode", "Fullscreen")]);
        let mut registry = registry();
        registry.register(display_without_mode);
        let mut profile = Profile::with_store(registry, store);

        profile.clean_store();
        assert_eq!(stored(&profile, "Display/Mode"), None);
        assert_eq!(stored(&profile, "Display/Width"), Some("640".into()));
    }

    #[test]
    fn test_clean_removes_stale_variants_and_keeps_values() {
        let store = store_with(&[
            ("Volume:Default/Enabled", "false"),
            ("Volume:Default/Retired", "1"),
            ("Volume:music", "0.8"),
            ("Volume:music/Retired", "1"),
            ("Volume:voice", "0.3"),
        ]);
        let mut profile = Profile::with_store(registry(), store);
        let volume = option(&profile, "Volume");
        let voice = option(&profile, "Volume:voice");
        profile.graph_mut().remove_variant(volume, voice);
        profile.graph_mut().set_value(volume, 0.1);

        profile.clean_store();

        assert_eq!(stored(&profile, "Volume:voice"), None);
        assert_eq!(stored(&profile, "Volume:Default/Retired"), None);
        assert_eq!(stored(&profile, "Volume:music/Retired"), None);
        assert_eq!(stored(&profile, "Volume:music"), Some("0.8".into()));
        assert_eq!(stored(&profile, "Volume:Default/Enabled"), Some("false".into()));
        assert_eq!(stored(&profile, "Volume:Default"), None, "clean never writes values");
    }

    #[test]
    fn test_get_option_never_creates_variants() {
        let mut profile = profile();
        assert!(profile.get_option("Volume:music/Enabled").is_none());

        let volume = option(&profile, "Volume");
        assert!(profile.graph().variants(volume).is_empty());

        let music = profile.graph_mut().add_variant(volume, "music");
        let enabled = option(&profile, "volume:MUSIC/enabled");
        assert_eq!(profile.graph().parent(enabled), Some(music));
    }

    #[test]
    fn test_get_option_edge_cases() {
        let profile = profile();
        let volume = option(&profile, "Volume");

        assert_eq!(profile.get_option("Volume:Default"), Some(volume));
        assert!(profile.get_option("Display:x").is_none(), "single options have no variants");
        assert!(profile.get_option("Nope").is_none());
        assert!(profile.get_option("Display/Nope").is_none());
        assert!(profile.get_option("Display//Width").is_none());
        assert!(profile.get_option("").is_none());
    }
}

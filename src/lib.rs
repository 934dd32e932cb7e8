//! Hierarchical option profiles
//!
//! Persists named, typed options between a declarative node tree and a live
//! option graph. Options are singular, repeated by key (dictionary variants) or
//! repeated by index (array variants), and may nest child options.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`store`] | Persisted node tree with dirty tracking and flattening |
//! | [`option`] | Option definitions, registry and the live graph |
//! | [`profile`] | Load / save / clean reconciliation and path lookup |
//! | [`path`] | `Name:Parameter/Child` path grammar |
//! | [`ini`] | Human-editable text encoding |
//! | [`persistence`] | Document files (`.ini` text or flattened `.json`) |
//!
//! ```
//! use option_profile::{ini, OptionDef, OptionRegistry, Profile, ValueType, Variance};
//!
//! fn volume() -> OptionDef {
//!     OptionDef::new("OptionVolume", ValueType::Float, 1.0).with_variance(Variance::Dictionary)
//! }
//!
//! let mut registry = OptionRegistry::new();
//! registry.register(volume);
//!
//! let store = ini::decode("Volume[Default] = 0.5\nVolume[music] = 0.8\n").store;
//! let profile = Profile::with_store(registry, store);
//!
//! let music = profile.get_option("Volume:music").unwrap();
//! assert_eq!(profile.graph().save(music), "0.8");
//! ```

#![forbid(unsafe_code)]

pub mod constants;
pub mod error;
pub mod ini;
pub mod option;
pub mod ordering;
pub mod path;
pub mod persistence;
pub mod profile;
pub mod store;

pub use error::{FlatError, IniError, PathError};
pub use option::{
    OptionDef, OptionGraph, OptionId, OptionRegistry, OptionValue, ValueType, Variance,
};
pub use path::{OptionPath, PathSegment};
pub use profile::Profile;
pub use store::{FlatStore, Node, NodeStore, RootNode};

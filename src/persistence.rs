//! Reading and writing profile documents
//!
//! A document is either the human-editable text form (`*.ini`, the default)
//! or the flattened structured form serialized as JSON (`*.json`).

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::constants::config::{APP_DIR, FILENAME, FILE_ENV, JSON_EXTENSION};
use crate::ini;
use crate::option::OptionRegistry;
use crate::profile::Profile;
use crate::store::{FlatStore, NodeStore};

/// On-disk encoding of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Ini,
    Json,
}

impl DocumentFormat {
    /// Pick the format from the file extension; anything but `.json` is text
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case(JSON_EXTENSION) => DocumentFormat::Json,
            _ => DocumentFormat::Ini,
        }
    }
}

/// Default document path: `$OPTION_PROFILE_FILE`, else the platform config dir
pub fn default_path() -> PathBuf {
    if let Ok(path) = std::env::var(FILE_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path.push(FILENAME);
    path
}

/// Parse a document body in the given format
pub fn parse_store(contents: &str, format: DocumentFormat) -> Result<NodeStore> {
    let mut store = match format {
        DocumentFormat::Ini => {
            let decoded = ini::decode(contents);
            if !decoded.diagnostics.is_empty() {
                warn!(skipped = decoded.diagnostics.len(), "Document loaded with skipped lines");
            }
            decoded.store
        }
        DocumentFormat::Json => {
            let flat: FlatStore =
                serde_json::from_str(contents).context("Failed to parse flattened JSON document")?;
            NodeStore::unflatten(flat).context("Failed to rebuild node tree")?
        }
    };
    store.check_dirty(true);
    Ok(store)
}

/// Render a store in the given format
pub fn render_store(store: &NodeStore, format: DocumentFormat) -> Result<String> {
    match format {
        DocumentFormat::Ini => Ok(ini::encode(store)),
        DocumentFormat::Json => serde_json::to_string_pretty(&store.flatten())
            .context("Failed to serialize flattened JSON document"),
    }
}

/// Read a document; a missing file yields an empty store
pub fn read_store(path: &Path) -> Result<NodeStore> {
    if !path.exists() {
        info!(path = %path.display(), "Document not found, starting empty");
        return Ok(NodeStore::new());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read document from {:?}", path))?;
    let store = parse_store(&contents, DocumentFormat::from_path(path))
        .with_context(|| format!("Failed to load document {:?}", path))?;

    info!(path = %path.display(), roots = store.roots().len(), "Loaded document");
    Ok(store)
}

/// Write a document, creating the parent directory if needed
pub fn write_store(path: &Path, store: &NodeStore) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create document directory {:?}", parent))?;
    }

    let contents = render_store(store, DocumentFormat::from_path(path))?;
    fs::write(path, contents).with_context(|| format!("Failed to write document to {:?}", path))?;

    info!(path = %path.display(), "Saved document");
    Ok(())
}

/// Write only when the store has unsaved changes; clears the dirty flags.
/// Returns whether anything was written.
pub fn save_if_dirty(path: &Path, store: &mut NodeStore) -> Result<bool> {
    if !store.is_dirty() {
        debug!(path = %path.display(), "Document unchanged, skipping write");
        return Ok(false);
    }
    write_store(path, store)?;
    store.check_dirty(true);
    Ok(true)
}

/// Build a profile from `registry` and load it from the document at `path`
pub fn load_profile(path: &Path, registry: OptionRegistry) -> Result<Profile> {
    let store = read_store(path)?;
    Ok(Profile::with_store(registry, store))
}

/// Save the live options into the profile's store and write it if changed
pub fn save_profile(path: &Path, profile: &mut Profile) -> Result<bool> {
    profile.save_to_store(true);
    save_if_dirty(path, profile.store_mut())
}

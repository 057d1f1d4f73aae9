//! Artifact resolution and native loading (§4.6).
//!
//! Grounded on `examples/Alb-O-xeno/bin/tome-term/src/plugin/manager/mod.rs`'s
//! `LoadedPlugin`/`Drop` pairing (keep the `Library` alive for exactly as
//! long as the boxed trait object it produced, and drop the trait object
//! first). Unlike `tome-term`'s C-ABI vtable, the factory symbol here
//! returns a boxed Rust trait object directly — this is a from-scratch
//! host, not a C-ABI-compatible one (the C ABI shim is explicitly out of
//! scope, spec.md §1), so the simpler same-compiler convention applies:
//! the plugin crate and the host must be built with the same Rust
//! toolchain, exactly as `libloading`-based Rust plugin systems already do
//! when they don't need cross-language interop.

use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};

use crate::error::{PluginHostError, Result};
use crate::traits::{ConsumerPlugin, ProducerPlugin, TransformerPlugin};

/// Resolve the plugin artifact path (§4.6 resolution order):
/// 1. an explicit CLI argument;
/// 2. the attachment path the settings service delivered, if any;
/// 3. the default installed-plugin file name.
///
/// If the resolved candidate doesn't exist, the installation's `lib` and
/// `bin` directories are searched for a same-named file before failing.
pub fn resolve_artifact_path(
    explicit: Option<PathBuf>,
    attachment: Option<PathBuf>,
    default_filename: &str,
    install_prefix: &Path,
) -> Result<PathBuf> {
    let candidate = explicit
        .or(attachment)
        .unwrap_or_else(|| PathBuf::from(default_filename));

    if candidate.exists() {
        return Ok(candidate);
    }

    let name = candidate
        .file_name()
        .map(|n| n.to_owned())
        .unwrap_or_else(|| default_filename.into());

    for dir in [install_prefix.join("lib"), install_prefix.join("bin")] {
        let alt = dir.join(&name);
        if alt.exists() {
            return Ok(alt);
        }
    }

    Err(PluginHostError::ArtifactNotFound(
        candidate.display().to_string(),
    ))
}

/// Factory symbol names a plugin artifact exports, one per role — a plugin
/// exports exactly one of these, and that's how the host discovers its role
/// without a separate manifest.
pub const PRODUCER_FACTORY_SYMBOL: &[u8] = b"mads_plugin_producer";
pub const TRANSFORMER_FACTORY_SYMBOL: &[u8] = b"mads_plugin_transformer";
pub const CONSUMER_FACTORY_SYMBOL: &[u8] = b"mads_plugin_consumer";

type ProducerFactory = unsafe fn() -> *mut dyn ProducerPlugin;
type TransformerFactory = unsafe fn() -> *mut dyn TransformerPlugin;
type ConsumerFactory = unsafe fn() -> *mut dyn ConsumerPlugin;

/// A loaded producer artifact. Field order matters: `plugin` drops before
/// `_lib`, so the trait object's `Drop` impl (if any) still has a live
/// library to call back into.
pub struct LoadedProducer {
    pub plugin: Box<dyn ProducerPlugin>,
    _lib: Library,
}

pub struct LoadedTransformer {
    pub plugin: Box<dyn TransformerPlugin>,
    _lib: Library,
}

pub struct LoadedConsumer {
    pub plugin: Box<dyn ConsumerPlugin>,
    _lib: Library,
}

/// # Safety
/// The artifact at `path` must have been built against the exact same
/// version of this crate's ABI (same `rustc`, same crate version) and must
/// export a symbol named [`PRODUCER_FACTORY_SYMBOL`] of type
/// `unsafe fn() -> *mut dyn ProducerPlugin` that returns a pointer obtained
/// from `Box::into_raw`.
pub unsafe fn load_producer(path: &Path) -> Result<LoadedProducer> {
    let lib = unsafe { Library::new(path) }?;
    let raw = unsafe {
        let factory: Symbol<ProducerFactory> = lib.get(PRODUCER_FACTORY_SYMBOL)?;
        factory()
    };
    if raw.is_null() {
        return Err(PluginHostError::NullEntry);
    }
    let plugin = unsafe { Box::from_raw(raw) };
    Ok(LoadedProducer { plugin, _lib: lib })
}

/// # Safety
/// See [`load_producer`]; the exported symbol is [`TRANSFORMER_FACTORY_SYMBOL`].
pub unsafe fn load_transformer(path: &Path) -> Result<LoadedTransformer> {
    let lib = unsafe { Library::new(path) }?;
    let raw = unsafe {
        let factory: Symbol<TransformerFactory> = lib.get(TRANSFORMER_FACTORY_SYMBOL)?;
        factory()
    };
    if raw.is_null() {
        return Err(PluginHostError::NullEntry);
    }
    let plugin = unsafe { Box::from_raw(raw) };
    Ok(LoadedTransformer { plugin, _lib: lib })
}

/// # Safety
/// See [`load_producer`]; the exported symbol is [`CONSUMER_FACTORY_SYMBOL`].
pub unsafe fn load_consumer(path: &Path) -> Result<LoadedConsumer> {
    let lib = unsafe { Library::new(path) }?;
    let raw = unsafe {
        let factory: Symbol<ConsumerFactory> = lib.get(CONSUMER_FACTORY_SYMBOL)?;
        factory()
    };
    if raw.is_null() {
        return Err(PluginHostError::NullEntry);
    }
    let plugin = unsafe { Box::from_raw(raw) };
    Ok(LoadedConsumer { plugin, _lib: lib })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_explicit_over_attachment_over_default() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("explicit.plugin");
        std::fs::write(&explicit, b"x").unwrap();

        let resolved = resolve_artifact_path(
            Some(explicit.clone()),
            Some(dir.path().join("attachment.plugin")),
            "default.plugin",
            dir.path(),
        )
        .unwrap();
        assert_eq!(resolved, explicit);
    }

    #[test]
    fn resolve_falls_back_to_attachment_when_no_explicit() {
        let dir = tempfile::tempdir().unwrap();
        let attachment = dir.path().join("attachment.plugin");
        std::fs::write(&attachment, b"x").unwrap();

        let resolved =
            resolve_artifact_path(None, Some(attachment.clone()), "default.plugin", dir.path())
                .unwrap();
        assert_eq!(resolved, attachment);
    }

    #[test]
    fn resolve_searches_install_lib_dir_when_candidate_missing() {
        let dir = tempfile::tempdir().unwrap();
        let lib_dir = dir.path().join("lib");
        std::fs::create_dir_all(&lib_dir).unwrap();
        let installed = lib_dir.join("default.plugin");
        std::fs::write(&installed, b"x").unwrap();

        let resolved = resolve_artifact_path(None, None, "default.plugin", dir.path()).unwrap();
        assert_eq!(resolved, installed);
    }

    #[test]
    fn resolve_fails_when_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = resolve_artifact_path(None, None, "nope.plugin", dir.path());
        assert!(matches!(result, Err(PluginHostError::ArtifactNotFound(_))));
    }
}

//! Plugin lifecycle and staged callback dispatch.
//!
//! A [`Plugin`] is constructed from configuration, loaded once per
//! environment (re)load, and then invoked at the stages it declares
//! through its capability hooks. [`PluginSet`] keeps the registration
//! order, tracks which plugins loaded successfully, and dispatches each
//! stage over the ready subset only.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod plugin;
pub mod set;
pub mod source;

pub use plugin::{
    Capabilities, ControlHook, LastStageHook, PassiveHook, Plugin, RenderHook, Stage,
};
pub use set::{LoadReport, PluginSet};
pub use source::{PluginCatalog, PluginConfig, PluginFactory, PluginSource};

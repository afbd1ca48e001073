//! # Scribe Reconciler
//!
//! Makes a [`scribe_dom::LiveDom`] match a virtual tree with as few observable
//! mutations as possible while keeping live node identity.
//!
//! ```text
//! next tree ──normalize──▶ matcher ──Decision──▶ children ──▶ applier ──▶ LiveDom
//!                            │                     │
//!                         sid_index             portal ──▶ containers under targets
//! ```
//!
//! A [`Renderer`] owns the state that survives between passes. Text-run
//! lookups for cursor mapping go through [`Renderer::text_runs`].

pub mod applier;
pub mod attr_differ;
mod children;
pub mod config;
pub mod errors;
pub mod matcher;
pub mod portal;
pub mod renderer;
pub mod sid_index;
pub mod text_runs;
pub mod work_item;

#[cfg(test)]
mod tests_matcher;

#[cfg(test)]
mod tests_children;

#[cfg(test)]
mod tests_portals;

pub use attr_differ::{diff_attrs, diff_listeners, diff_style, AttrPatch, ListenerPatch};
pub use config::{ReentrancyPolicy, RenderOptions, RendererConfig, CONFIG_FILE_NAME};
pub use errors::{ConfigError, ErrorKind, NodeSummary, PassContext, Phase, RenderError, Severity};
pub use matcher::{Decision, MatchContext, MatchOutcome, MatchStrategy, Matcher};
pub use portal::{PortalEntry, PortalKey, PortalRegistry};
pub use renderer::{RenderHandle, RenderReport, RenderRequest, Renderer, MAX_FOLLOWUP_PASSES};
pub use sid_index::SidIndex;
pub use text_runs::{binary_search_run, build_index, ContainerRuns, RunOptions, TextRun, TextRunIndex};
pub use work_item::{ChangeSet, ChangeTally};

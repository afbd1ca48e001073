//! # Scribe DOM
//!
//! In-memory live tree used as the render target of the reconciler.
//!
//! ## Model
//!
//! ```text
//! LiveDom
//!  ├── body (element, always present, never removed)
//!  │    ├── element ── attributes / style / listeners
//!  │    │    └── text
//!  │    └── ...
//!  └── detached nodes (created but not yet inserted)
//! ```
//!
//! Nodes live in a generational arena and are addressed by [`NodeId`]. A node is
//! *connected* when its ancestor chain reaches `body`. Only mutations that touch
//! connected nodes are observable: they produce [`MutationRecord`]s and bump the
//! [`MutationStats`] counters. Building a subtree while it is detached and then
//! inserting it once is therefore a single observable insertion.
//!
//! Records are buffered and handed to the observer on [`LiveDom::flush_records`],
//! so an observer never sees a half-applied batch.

mod errors;
pub mod html;
pub mod live;
pub mod mutation;
pub mod selector;

pub use errors::DomError;
pub use html::{inner_html, to_html, HtmlOptions};
pub use live::{ElementData, LiveDom, NodeData, NodeId};
pub use mutation::{MutationRecord, MutationStats, Observer};
pub use selector::{query_selector, query_selector_all, Selector};

pub type DomResult<T> = Result<T, DomError>;

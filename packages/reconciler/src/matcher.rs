//! Identity matching
//!
//! For each next node, decides which live node (if any) it continues. The
//! decision is pure: it reads the live tree and the previous siblings but
//! never writes. Strategies run in order and the first that yields a usable
//! candidate wins.

use crate::errors::ErrorKind;
use crate::sid_index::SidIndex;
use scribe_dom::{LiveDom, NodeId};
use scribe_vdom::{classify, component_type, Markers, NodeKind, VNode};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Keep the live node and update it in place
    Reuse(NodeId),
    /// Identity matched but the tag changed: replace, keeping the children
    Retag(NodeId),
    Create,
    /// Not placed among its siblings (portals)
    Skip,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Reuse(_) => write!(f, "reuse"),
            Decision::Retag(_) => write!(f, "retag"),
            Decision::Create => write!(f, "create"),
            Decision::Skip => write!(f, "skip"),
        }
    }
}

/// Previous sibling and the live node it was bound to
#[derive(Debug, Clone, Copy)]
pub struct PrevSibling<'v> {
    pub node: &'v VNode,
    pub live: Option<NodeId>,
}

/// Sibling context for one match
pub struct MatchContext<'a, 'v> {
    pub dom: &'a LiveDom,
    pub markers: &'a Markers,
    /// Live parent the next node will be placed under
    pub parent: NodeId,
    /// Position of the next node among its siblings
    pub index: usize,
    pub prev: &'a [PrevSibling<'v>],
    /// Managed live children of `parent`, foreign nodes excluded
    pub live_children: &'a [NodeId],
    /// Live nodes already claimed this pass
    pub claimed: &'a HashSet<NodeId>,
    /// Live nodes bound to keyed previous siblings
    pub reserved: &'a HashSet<NodeId>,
    pub sid_index: Option<&'a SidIndex>,
}

/// Candidate proposed by a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub node: NodeId,
    /// Matched by identity (stable id or key) rather than by shape
    pub identity: bool,
    /// May live deeper in the parent's subtree and be moved up
    pub relocate: bool,
}

impl Probe {
    fn identity(node: NodeId) -> Self {
        Self {
            node,
            identity: true,
            relocate: false,
        }
    }

    fn shape(node: NodeId) -> Self {
        Self {
            node,
            identity: false,
            relocate: false,
        }
    }
}

pub trait MatchStrategy {
    fn name(&self) -> &'static str;

    /// Whether keyed next nodes may use this strategy
    fn applies_to_keyed(&self) -> bool {
        false
    }

    fn probe(&self, next: &VNode, ctx: &MatchContext<'_, '_>) -> Option<Probe>;
}

/// Note raised while matching, reported by the pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchNote {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub decision: Decision,
    pub strategy: Option<&'static str>,
    pub notes: Vec<MatchNote>,
}

impl MatchOutcome {
    fn new(decision: Decision, strategy: Option<&'static str>, notes: Vec<MatchNote>) -> Self {
        Self {
            decision,
            strategy,
            notes,
        }
    }

    /// Live node the decision claims
    pub fn claimed(&self) -> Option<NodeId> {
        match self.decision {
            Decision::Reuse(node) | Decision::Retag(node) => Some(node),
            _ => None,
        }
    }
}

/// Match by the stable identity attribute
pub struct StableIdentity;

impl MatchStrategy for StableIdentity {
    fn name(&self) -> &'static str {
        "sid"
    }

    fn applies_to_keyed(&self) -> bool {
        true
    }

    fn probe(&self, next: &VNode, ctx: &MatchContext<'_, '_>) -> Option<Probe> {
        let sid = next.sid(ctx.markers)?;
        let attribute = ctx.markers.identity_attribute.as_str();
        let dom = ctx.dom;

        if let Some(node) = ctx.sid_index.and_then(|index| index.get(dom, attribute, &sid)) {
            if dom.parent(node).is_none() || dom.parent(node) == Some(ctx.parent) {
                return Some(Probe::identity(node));
            }
            if node != ctx.parent && dom.is_inclusive_ancestor(ctx.parent, node) {
                return Some(Probe {
                    relocate: true,
                    ..Probe::identity(node)
                });
            }
        }

        let direct: Vec<NodeId> = dom
            .children(ctx.parent)
            .iter()
            .copied()
            .filter(|c| dom.attribute(*c, attribute) == Some(sid.as_str()))
            .collect();
        // Prefer an unclaimed child with the same tag
        let same_tag = direct
            .iter()
            .copied()
            .find(|c| !ctx.claimed.contains(c) && dom.tag(*c) == next.tag.as_deref());
        if let Some(node) = same_tag.or_else(|| direct.first().copied()) {
            return Some(Probe::identity(node));
        }

        dom.descendants(ctx.parent)
            .into_iter()
            .find(|c| dom.attribute(*c, attribute) == Some(sid.as_str()))
            .map(|node| Probe {
                relocate: true,
                ..Probe::identity(node)
            })
    }
}

/// Match a keyed node to the previous sibling with the same key
pub struct Key;

impl MatchStrategy for Key {
    fn name(&self) -> &'static str {
        "key"
    }

    fn applies_to_keyed(&self) -> bool {
        true
    }

    fn probe(&self, next: &VNode, ctx: &MatchContext<'_, '_>) -> Option<Probe> {
        let key = next.key.as_deref()?;
        let mut bound = ctx
            .prev
            .iter()
            .filter(|p| p.node.key.as_deref() == Some(key))
            .filter_map(|p| p.live);
        let first = bound.next()?;
        // Earliest unclaimed wins; if all are claimed, report the first
        let unclaimed = std::iter::once(first)
            .chain(bound)
            .find(|node| !ctx.claimed.contains(node));
        Some(Probe::identity(unclaimed.unwrap_or(first)))
    }
}

/// Reuse the live node bound to the previous sibling at the same index
///
/// Previous siblings are bound to live children by index parity: the k-th
/// previous sibling with tag T owns the k-th live child with tag T.
pub struct Positional;

impl MatchStrategy for Positional {
    fn name(&self) -> &'static str {
        "position"
    }

    fn probe(&self, next: &VNode, ctx: &MatchContext<'_, '_>) -> Option<Probe> {
        let prev = ctx.prev.get(ctx.index)?;
        if prev.node.key.is_some() || tag_key(prev.node) != tag_key(next) {
            return None;
        }
        let prev_sid = prev.node.sid(ctx.markers);
        let next_sid = next.sid(ctx.markers);
        if prev_sid.is_some() && next_sid.is_some() && prev_sid != next_sid {
            return None;
        }
        let live = prev.live?;
        (!ctx.claimed.contains(&live)).then(|| Probe::shape(live))
    }
}

/// Last resort: identical text, then the earliest unclaimed node of the same tag
pub struct Content;

impl Content {
    fn available(&self, node: NodeId, ctx: &MatchContext<'_, '_>) -> bool {
        !ctx.claimed.contains(&node)
            && !ctx.reserved.contains(&node)
            && ctx
                .dom
                .attribute(node, &ctx.markers.identity_attribute)
                .is_none()
    }
}

impl MatchStrategy for Content {
    fn name(&self) -> &'static str {
        "content"
    }

    fn probe(&self, next: &VNode, ctx: &MatchContext<'_, '_>) -> Option<Probe> {
        let dom = ctx.dom;
        let candidates: Vec<NodeId> = ctx
            .live_children
            .iter()
            .copied()
            .filter(|c| self.available(*c, ctx))
            .collect();
        if let Some(text) = next.text.as_deref().filter(|_| next.is_text()) {
            let identical = candidates.iter().find(|c| dom.text(**c) == Some(text));
            return identical
                .or_else(|| candidates.iter().find(|c| dom.is_text(**c)))
                .map(|node| Probe::shape(*node));
        }
        let tag = next.tag_name();
        candidates
            .iter()
            .find(|c| dom.tag(**c) == Some(tag))
            .map(|node| Probe::shape(*node))
    }
}

/// Grouping key for index parity: the tag, or `#text` for text nodes
pub fn tag_key(node: &VNode) -> &str {
    if node.is_text() {
        "#text"
    } else {
        node.tag_name()
    }
}

/// Live counterpart of [`tag_key`]
pub fn live_tag_key(dom: &LiveDom, node: NodeId) -> Option<&str> {
    if dom.is_text(node) {
        Some("#text")
    } else {
        dom.tag(node)
    }
}

/// Ordered strategy list
pub struct Matcher {
    strategies: Vec<Box<dyn MatchStrategy>>,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.strategies.iter().map(|s| s.name()))
            .finish()
    }
}

impl Matcher {
    pub fn new(strategies: Vec<Box<dyn MatchStrategy>>) -> Self {
        Self { strategies }
    }

    /// Stable identity, key, position, content
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(StableIdentity),
            Box::new(Key),
            Box::new(Positional),
            Box::new(Content),
        ])
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn resolve(&self, next: &VNode, ctx: &MatchContext<'_, '_>) -> MatchOutcome {
        let kind = classify(next, ctx.markers);
        if kind == NodeKind::Portal {
            return MatchOutcome::new(Decision::Skip, None, Vec::new());
        }

        let keyed = next.key.is_some();
        let mut notes = Vec::new();
        for strategy in &self.strategies {
            if keyed && !strategy.applies_to_keyed() {
                continue;
            }
            let Some(probe) = strategy.probe(next, ctx) else {
                continue;
            };
            match self.check(next, kind, probe, ctx, &mut notes) {
                Check::Accept(decision) => {
                    return MatchOutcome::new(decision, Some(strategy.name()), notes);
                }
                Check::Collision => {
                    notes.push(MatchNote {
                        kind: ErrorKind::IdentityCollision,
                        message: format!(
                            "Live node already claimed this pass; created <{}> fresh",
                            next.tag_name()
                        ),
                    });
                    return MatchOutcome::new(Decision::Create, Some(strategy.name()), notes);
                }
                Check::Recreate => {
                    return MatchOutcome::new(Decision::Create, Some(strategy.name()), notes);
                }
                Check::Reject => continue,
            }
        }
        MatchOutcome::new(Decision::Create, None, notes)
    }

    fn check(
        &self,
        next: &VNode,
        kind: NodeKind,
        probe: Probe,
        ctx: &MatchContext<'_, '_>,
        notes: &mut Vec<MatchNote>,
    ) -> Check {
        let dom = ctx.dom;
        let node = probe.node;
        if !dom.contains(node) {
            return Check::Reject;
        }
        if ctx.claimed.contains(&node) {
            return if probe.identity {
                Check::Collision
            } else {
                Check::Reject
            };
        }

        match dom.parent(node) {
            Some(parent) if parent == ctx.parent => {}
            None => {
                notes.push(MatchNote {
                    kind: ErrorKind::DetachedReuse,
                    message: format!(
                        "Matched <{}> was detached from its parent; not reused",
                        live_tag_key(dom, node).unwrap_or("?")
                    ),
                });
                return Check::Reject;
            }
            Some(_) => {
                let inside = node != ctx.parent && dom.is_inclusive_ancestor(ctx.parent, node);
                if !(probe.relocate && inside) {
                    return Check::Reject;
                }
            }
        }

        let live_tag = live_tag_key(dom, node);
        if live_tag != Some(tag_key(next)) {
            return if probe.identity {
                Check::Accept(Decision::Retag(node))
            } else {
                Check::Reject
            };
        }

        if kind == NodeKind::Component || is_live_component(dom, node, ctx.markers) {
            let live_type = live_component_type(dom, node, ctx.markers);
            if live_type != component_type(next, ctx.markers) {
                return Check::Recreate;
            }
        }
        Check::Accept(Decision::Reuse(node))
    }
}

enum Check {
    Accept(Decision),
    Collision,
    Recreate,
    Reject,
}

fn is_live_component(dom: &LiveDom, node: NodeId, markers: &Markers) -> bool {
    live_component_type(dom, node, markers).is_some()
}

fn live_component_type(dom: &LiveDom, node: NodeId, markers: &Markers) -> Option<String> {
    dom.attribute(node, &markers.component_marker)?;
    dom.attribute(node, &markers.component_type_attribute)
        .map(str::to_string)
}

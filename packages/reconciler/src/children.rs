//! Keyed children reconciliation
//!
//! A sibling group is reconciled in three steps:
//! 1. resolve every next child against the previous siblings (pure)
//! 2. place: walk the next children back to front, moving only reused nodes
//!    outside the longest run that is already in order and inserting created
//!    subtrees, each built detached and inserted once
//! 3. update reused nodes in order and recurse, then remove unclaimed live
//!    children
//!
//! Live children carrying the portal-container marker are foreign and never
//! touched here.

use crate::applier;
use crate::attr_differ::{
    diff_attrs, diff_attrs_against_live, diff_listeners, diff_listeners_against_live, diff_style,
    diff_style_against_live,
};
use crate::config::{RenderOptions, RendererConfig};
use crate::errors::{ErrorKind, NodeSummary, PassContext, Phase, RenderError};
use crate::matcher::{live_tag_key, tag_key, Decision, MatchContext, Matcher, PrevSibling};
use crate::portal::{PortalKey, PortalRegistry};
use crate::sid_index::SidIndex;
use crate::work_item::{ChangeSet, ChangeTally, WorkArena, WorkItem, WorkItemId};
use lis::LisExt;
use scribe_dom::{DomResult, LiveDom, NodeId};
use scribe_vdom::{classify, NodeKind, VNode};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// Portal found while reconciling, rendered once the main tree is in place
#[derive(Debug, Clone, Copy)]
pub(crate) struct PortalJob<'v> {
    pub next: &'v VNode,
    pub owner: NodeId,
    pub ordinal: usize,
    pub item: WorkItemId,
}

#[derive(Debug, Default)]
pub(crate) struct PassOutput {
    pub errors: Vec<RenderError>,
    pub retained: Vec<NodeId>,
    pub tally: ChangeTally,
    /// Nodes whose content or children changed; dead nodes are reported by parent
    pub touched: Vec<NodeId>,
}

/// State of one render pass
pub(crate) struct Pass<'a, 'v> {
    pub dom: &'a mut LiveDom,
    pub config: &'a RendererConfig,
    pub options: &'a RenderOptions,
    pub matcher: &'a Matcher,
    pub sid_index: &'a mut SidIndex,
    pub portals: &'a mut PortalRegistry,
    /// Content each portal rendered last pass
    pub rendered: &'v HashMap<PortalKey, Vec<VNode>>,
    pub root: NodeId,
    pub pass: u64,
    pub arena: WorkArena<'v>,
    pub touched: Vec<NodeId>,
    claimed: HashSet<NodeId>,
    errors: Vec<RenderError>,
    retained: Vec<NodeId>,
    portal_jobs: VecDeque<PortalJob<'v>>,
}

impl<'a, 'v> Pass<'a, 'v> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dom: &'a mut LiveDom,
        config: &'a RendererConfig,
        options: &'a RenderOptions,
        matcher: &'a Matcher,
        sid_index: &'a mut SidIndex,
        portals: &'a mut PortalRegistry,
        rendered: &'v HashMap<PortalKey, Vec<VNode>>,
        root: NodeId,
        pass: u64,
    ) -> Self {
        Self {
            dom,
            config,
            options,
            matcher,
            sid_index,
            portals,
            rendered,
            root,
            pass,
            arena: WorkArena::new(),
            touched: Vec::new(),
            claimed: HashSet::new(),
            errors: Vec::new(),
            retained: Vec::new(),
            portal_jobs: VecDeque::new(),
        }
    }

    pub fn run(mut self, prev: Option<&'v VNode>, next: Option<&'v VNode>) -> PassOutput {
        if next.is_none() && self.options.preserve_on_clear {
            self.retained = self.managed_children(self.root);
        } else {
            let prev: Vec<&'v VNode> = prev.into_iter().collect();
            let next: Vec<&'v VNode> = next.into_iter().collect();
            self.reconcile_children(self.root, None, &prev, &next);
        }

        while let Some(job) = self.portal_jobs.pop_front() {
            self.render_portal(job);
        }

        PassOutput {
            tally: self.arena.tally(),
            errors: self.errors,
            retained: self.retained,
            touched: self.touched,
        }
    }

    /// Record a recoverable error against a work item
    pub(crate) fn report(
        &mut self,
        kind: ErrorKind,
        message: String,
        node: Option<&VNode>,
        item: WorkItemId,
        phase: Phase,
    ) {
        let context = PassContext::new(self.pass, phase).with_path(self.arena.path(item));
        warn!(kind = %kind, path = ?context.path, "{}", message);
        let mut error = RenderError::new(kind, message, context);
        if let Some(node) = node {
            error = error.with_node(NodeSummary::of(node, &self.config.markers));
        }
        self.errors.push(error);
    }

    fn is_foreign(&self, node: NodeId) -> bool {
        self.dom
            .attribute(node, &self.config.markers.portal_container_attribute)
            .is_some()
    }

    /// Children of `parent` the reconciler owns
    pub(crate) fn managed_children(&self, parent: NodeId) -> Vec<NodeId> {
        self.dom
            .children(parent)
            .iter()
            .copied()
            .filter(|c| !self.is_foreign(*c))
            .collect()
    }

    /// Bind previous siblings to live children
    ///
    /// A previous sibling with a stable id owns the live child carrying that id,
    /// or nothing if the child was relocated away. The rest bind by index parity
    /// per tag among the live children not owned that way.
    fn bind_previous(&self, live_children: &[NodeId], prev: &[&'v VNode]) -> Vec<PrevSibling<'v>> {
        let markers = &self.config.markers;
        let attribute = markers.identity_attribute.as_str();

        let mut by_sid: HashMap<&str, NodeId> = HashMap::new();
        for child in live_children {
            if let Some(sid) = self.dom.attribute(*child, attribute) {
                by_sid.entry(sid).or_insert(*child);
            }
        }
        let mut owned: HashSet<NodeId> = HashSet::new();
        let identified: HashMap<usize, Option<NodeId>> = prev
            .iter()
            .enumerate()
            .filter(|(_, node)| classify(node, markers) != NodeKind::Portal)
            .filter_map(|(i, node)| node.sid(markers).map(|sid| (i, node, sid)))
            .map(|(i, node, sid)| {
                let live = by_sid
                    .get(sid.as_str())
                    .copied()
                    .filter(|live| live_tag_key(self.dom, *live) == Some(tag_key(node)))
                    .filter(|live| owned.insert(*live));
                (i, live)
            })
            .collect();

        let mut by_tag: HashMap<&str, Vec<NodeId>> = HashMap::new();
        for child in live_children.iter().filter(|c| !owned.contains(*c)) {
            if let Some(tag) = live_tag_key(self.dom, *child) {
                by_tag.entry(tag).or_default().push(*child);
            }
        }
        let mut seen: HashMap<&str, usize> = HashMap::new();
        prev.iter()
            .enumerate()
            .map(|(i, node)| {
                if classify(node, markers) == NodeKind::Portal {
                    return PrevSibling { node, live: None };
                }
                if let Some(live) = identified.get(&i) {
                    return PrevSibling { node, live: *live };
                }
                let tag = tag_key(node);
                let ordinal = seen.entry(tag).or_default();
                let live = by_tag.get(tag).and_then(|nodes| nodes.get(*ordinal)).copied();
                *ordinal += 1;
                PrevSibling { node, live }
            })
            .collect()
    }

    pub(crate) fn reconcile_children(
        &mut self,
        parent: NodeId,
        parent_item: Option<WorkItemId>,
        prev: &[&'v VNode],
        next: &[&'v VNode],
    ) {
        let live_children = self.managed_children(parent);
        let prev_siblings = self.bind_previous(&live_children, prev);
        let reserved: HashSet<NodeId> = prev_siblings
            .iter()
            .filter(|p| p.node.key.is_some())
            .filter_map(|p| p.live)
            .collect();

        // 1. Resolve
        let mut items = Vec::with_capacity(next.len());
        for (index, node) in next.iter().copied().enumerate() {
            let outcome = {
                let ctx = MatchContext {
                    dom: &*self.dom,
                    markers: &self.config.markers,
                    parent,
                    index,
                    prev: &prev_siblings,
                    live_children: &live_children,
                    claimed: &self.claimed,
                    reserved: &reserved,
                    sid_index: self.config.use_sid_index.then_some(&*self.sid_index),
                };
                self.matcher.resolve(node, &ctx)
            };
            if let Some(claimed) = outcome.claimed() {
                self.claimed.insert(claimed);
            }
            debug!(
                index,
                decision = %outcome.decision,
                strategy = outcome.strategy.unwrap_or("none"),
                "Resolved child"
            );

            let prev_node = outcome
                .claimed()
                .and_then(|live| prev_siblings.iter().find(|p| p.live == Some(live)))
                .map(|p| p.node);
            let item = self.arena.push(WorkItem {
                prev: prev_node,
                next: node,
                kind: classify(node, &self.config.markers),
                live: outcome.claimed(),
                parent: parent_item,
                index,
                changes: ChangeSet::empty(),
            });
            for note in outcome.notes {
                self.report(note.kind, note.message, Some(node), item, Phase::Match);
            }
            items.push((item, outcome.decision));
        }

        let stale: Vec<NodeId> = live_children
            .iter()
            .copied()
            .filter(|c| !self.claimed.contains(c))
            .collect();

        // 2. Place
        let stable = self.stable_items(parent, &live_children, &items);
        let mut anchor: Option<NodeId> = None;
        for (position, (item, decision)) in items.iter().enumerate().rev() {
            let placed = match decision {
                Decision::Skip => continue,
                Decision::Reuse(node) if stable.contains(&position) => Ok(*node),
                Decision::Reuse(node) => self.move_to(parent, *item, *node, anchor),
                Decision::Retag(old) => self.retag(parent, *item, *old, anchor),
                Decision::Create => self.create(parent, *item, anchor),
            };
            match placed {
                Ok(node) => anchor = Some(node),
                Err(err) => {
                    let next = self.arena.get(*item).next;
                    self.report(ErrorKind::LiveTree, err.to_string(), Some(next), *item, Phase::Apply);
                }
            }
        }

        // 3. Update and recurse
        let mut ordinal = 0;
        for (item, decision) in &items {
            let next = self.arena.get(*item).next;
            match decision {
                Decision::Skip => {
                    if !self.options.exclude_portals {
                        self.portal_jobs.push_back(PortalJob {
                            next,
                            owner: parent,
                            ordinal,
                            item: *item,
                        });
                    }
                    ordinal += 1;
                }
                Decision::Reuse(_) | Decision::Retag(_) => {
                    let Some(live) = self.arena.get(*item).live.filter(|n| self.dom.contains(*n)) else {
                        continue;
                    };
                    if let Err(err) = self.update(*item, live) {
                        self.report(ErrorKind::LiveTree, err.to_string(), Some(next), *item, Phase::Apply);
                    }
                }
                Decision::Create => {}
            }
        }

        for node in stale {
            if self.options.suppress_detach {
                self.retained.push(node);
                continue;
            }
            self.sid_index.invalidate_subtree(self.dom, node);
            self.touched.push(parent);
            if let Err(err) = applier::remove(self.dom, node) {
                let context = PassContext::new(self.pass, Phase::Apply);
                warn!(error = %err, "Failed to remove stale node");
                self.errors
                    .push(RenderError::new(ErrorKind::LiveTree, err.to_string(), context));
            }
        }
    }

    /// Positions of reused children that can stay where they are
    fn stable_items(
        &self,
        parent: NodeId,
        live_children: &[NodeId],
        items: &[(WorkItemId, Decision)],
    ) -> HashSet<usize> {
        let current: HashMap<NodeId, usize> = live_children
            .iter()
            .enumerate()
            .map(|(index, node)| (*node, index))
            .collect();
        let sequence: Vec<(usize, usize)> = items
            .iter()
            .enumerate()
            .filter_map(|(position, (_, decision))| match decision {
                Decision::Reuse(node) if self.dom.parent(*node) == Some(parent) => {
                    current.get(node).map(|index| (position, *index))
                }
                _ => None,
            })
            .collect();
        let indices: Vec<usize> = sequence.iter().map(|(_, index)| *index).collect();
        indices
            .longest_increasing_subsequence()
            .into_iter()
            .map(|i| sequence[i].0)
            .collect()
    }

    fn move_to(&mut self, parent: NodeId, item: WorkItemId, node: NodeId, anchor: Option<NodeId>) -> DomResult<NodeId> {
        let changes = applier::place(self.dom, parent, node, anchor)?;
        if !changes.is_empty() {
            debug!(node = ?node, "Moved child");
            self.touched.push(parent);
        }
        self.arena.get_mut(item).changes |= changes;
        Ok(node)
    }

    fn create(&mut self, parent: NodeId, item: WorkItemId, anchor: Option<NodeId>) -> DomResult<NodeId> {
        let node = self.build(item)?;
        if let Err(err) = self.dom.insert_before(parent, node, anchor) {
            let _ = self.dom.destroy(node);
            return Err(err);
        }
        debug!(node = ?node, "Inserted subtree");
        self.touched.push(parent);
        let entry = self.arena.get_mut(item);
        entry.live = Some(node);
        entry.changes |= ChangeSet::INSERT;
        Ok(node)
    }

    /// Build the subtree for `item` while detached
    fn build(&mut self, item: WorkItemId) -> DomResult<NodeId> {
        let next = self.arena.get(item).next;
        if next.is_text() {
            let text = next.text.as_deref().unwrap_or_default();
            return Ok(applier::create_text(self.dom, text));
        }

        let element = applier::create_element(self.dom, next.tag_name());
        let built = self.decorate(element, next, None).and_then(|_| self.build_children(element, item));
        if let Err(err) = built {
            let _ = self.dom.destroy(element);
            return Err(err);
        }
        self.arena.get_mut(item).live = Some(element);
        Ok(element)
    }

    fn build_children(&mut self, element: NodeId, item: WorkItemId) -> DomResult<()> {
        let next = self.arena.get(item).next;
        let mut ordinal = 0;
        for (index, child) in next.child_nodes().enumerate() {
            let kind = classify(child, &self.config.markers);
            let child_item = self.arena.push(WorkItem {
                prev: None,
                next: child,
                kind,
                live: None,
                parent: Some(item),
                index,
                changes: ChangeSet::INSERT,
            });
            if kind == NodeKind::Portal {
                if !self.options.exclude_portals {
                    self.portal_jobs.push_back(PortalJob {
                        next: child,
                        owner: element,
                        ordinal,
                        item: child_item,
                    });
                }
                ordinal += 1;
                continue;
            }
            let live = self.build(child_item)?;
            self.dom.append_child(element, live)?;
            self.arena.get_mut(child_item).live = Some(live);
        }
        Ok(())
    }

    /// Replace `old` with a node of the next tag, keeping its children
    fn retag(&mut self, parent: NodeId, item: WorkItemId, old: NodeId, anchor: Option<NodeId>) -> DomResult<NodeId> {
        let next = self.arena.get(item).next;
        let replacement = if next.is_text() {
            applier::create_text(self.dom, next.text.as_deref().unwrap_or_default())
        } else {
            let element = applier::create_element(self.dom, next.tag_name());
            if let Err(err) = self.decorate(element, next, None) {
                let _ = self.dom.destroy(element);
                return Err(err);
            }
            element
        };

        if let Err(err) = self.dom.insert_before(parent, replacement, anchor) {
            let _ = self.dom.destroy(replacement);
            return Err(err);
        }
        applier::retire(self.dom, old, replacement)?;
        debug!(old = ?old, new = ?replacement, tag = tag_key(next), "Retagged child");
        self.touched.push(parent);

        let entry = self.arena.get_mut(item);
        entry.live = Some(replacement);
        entry.changes |= ChangeSet::TAG;
        Ok(replacement)
    }

    /// Write attributes, style and listeners onto an element
    fn decorate(&mut self, element: NodeId, next: &VNode, prev: Option<&VNode>) -> DomResult<ChangeSet> {
        let markers = &self.config.markers;
        let (attrs, style, listeners) = match prev {
            Some(prev) => (
                diff_attrs(&prev.attrs, &next.attrs, markers),
                diff_style(&prev.style, &next.style),
                diff_listeners(&prev.attrs, &next.attrs),
            ),
            None => (
                diff_attrs_against_live(self.dom, element, &next.attrs, markers),
                diff_style_against_live(self.dom, element, &next.style),
                diff_listeners_against_live(self.dom, element, &next.attrs),
            ),
        };

        let mut changes = applier::apply_attr_patch(self.dom, element, &attrs)?;
        changes |= applier::apply_style_patch(self.dom, element, &style)?;
        changes |= applier::apply_listener_patch(self.dom, element, &listeners)?;
        if attrs.touches(&markers.identity_attribute) || prev.is_none() {
            if let Some(sid) = next.sid(markers) {
                self.sid_index.insert(sid, element);
            }
        }
        Ok(changes)
    }

    /// Update a reused (or retagged) node in place and reconcile its children
    fn update(&mut self, item: WorkItemId, live: NodeId) -> DomResult<()> {
        let (prev, next, retagged) = {
            let entry = self.arena.get(item);
            (entry.prev, entry.next, entry.changes.contains(ChangeSet::TAG))
        };

        if next.is_text() {
            if !retagged {
                let changes = applier::update_text(self.dom, live, next.text.as_deref().unwrap_or_default())?;
                if !changes.is_empty() {
                    self.touched.push(live);
                }
                self.arena.get_mut(item).changes |= changes;
            }
            return Ok(());
        }

        if !retagged {
            // The previous node is only trusted when its tag and stable id agree
            // with the live one; otherwise diff against the live node itself
            let attribute = self.config.markers.identity_attribute.as_str();
            let prev = prev.filter(|p| {
                Some(tag_key(p)) == live_tag_key(self.dom, live)
                    && p.sid(&self.config.markers).as_deref() == self.dom.attribute(live, attribute)
            });
            let changes = self.decorate(live, next, prev)?;
            if changes.intersects(ChangeSet::ATTRS) {
                self.touched.push(live);
            }
            self.arena.get_mut(item).changes |= changes;
        }

        let prev_children: Vec<&'v VNode> = prev
            .filter(|p| !p.is_text())
            .map(|p| p.child_nodes().collect())
            .unwrap_or_default();
        let next_children: Vec<&'v VNode> = next.child_nodes().collect();
        self.reconcile_children(live, Some(item), &prev_children, &next_children);
        Ok(())
    }
}

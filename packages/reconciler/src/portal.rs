//! Portal management
//!
//! A portal renders its content into a container element appended to a
//! target elsewhere in the live tree. The registry keeps one entry per logical
//! portal so the container survives re-renders: it is moved when the target
//! changes and destroyed only when its owner stops rendering it.
//!
//! Identity is derived in priority order:
//! 1. explicit `id`
//! 2. link to the previous render: owner live node and ordinal among its portals
//! 3. resolved target, for orphaned entries
//! 4. content fingerprint, for orphaned entries

use crate::children::{Pass, PortalJob};
use crate::errors::{ErrorKind, Phase};
use crate::work_item::ChangeSet;
use scribe_dom::{query_selector, DomResult, LiveDom, NodeId};
use scribe_vdom::{PortalTarget, VNode};
use slotmap::{new_key_type, SlotMap};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use tracing::{debug, warn};

new_key_type! {
    pub struct PortalKey;
}

/// Live node owning a portal and the portal's ordinal among its siblings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortalHost {
    pub owner: NodeId,
    pub ordinal: usize,
}

#[derive(Debug)]
pub struct PortalEntry {
    pub id: Option<String>,
    pub target: NodeId,
    pub container: NodeId,
    pub host: PortalHost,
    /// Render container whose passes own this portal
    pub root: NodeId,
    pub fingerprint: Option<u64>,
    rendered: Option<Vec<VNode>>,
    touched: bool,
}

/// How an existing entry was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    Id,
    Link,
    Target,
    Content,
}

#[derive(Debug, Default)]
pub struct PortalRegistry {
    entries: SlotMap<PortalKey, PortalEntry>,
    by_id: HashMap<String, PortalKey>,
    by_link: HashMap<PortalHost, PortalKey>,
}

impl PortalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: PortalKey) -> Option<&PortalEntry> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PortalKey, &PortalEntry)> {
        self.entries.iter()
    }

    /// Container of the portal with explicit `id`
    pub fn container_for_id(&self, id: &str) -> Option<NodeId> {
        self.by_id
            .get(id)
            .and_then(|key| self.entries.get(*key))
            .map(|entry| entry.container)
    }

    /// Whether `node` is a portal container this registry manages
    pub fn is_container(&self, node: NodeId) -> bool {
        self.entries.values().any(|entry| entry.container == node)
    }

    pub(crate) fn begin_pass(&mut self) {
        for entry in self.entries.values_mut() {
            entry.touched = false;
        }
    }

    /// Move rendered content out so a pass can borrow it while updating entries
    pub(crate) fn take_rendered(&mut self) -> HashMap<PortalKey, Vec<VNode>> {
        self.entries
            .iter_mut()
            .filter_map(|(key, entry)| entry.rendered.take().map(|content| (key, content)))
            .collect()
    }

    /// Put back content for entries the pass did not re-render
    pub(crate) fn restore_rendered(&mut self, mut snapshot: HashMap<PortalKey, Vec<VNode>>) {
        for (key, entry) in self.entries.iter_mut() {
            if entry.rendered.is_none() {
                entry.rendered = snapshot.remove(&key);
            }
        }
    }

    fn id_compatible(entry: &PortalEntry, id: Option<&str>) -> bool {
        entry.id.is_none() || entry.id.as_deref() == id
    }

    /// Existing entry for a portal, by the identity priority order
    pub fn lookup(
        &self,
        dom: &LiveDom,
        id: Option<&str>,
        host: &PortalHost,
        target: Option<NodeId>,
        fingerprint: Option<u64>,
    ) -> Option<(PortalKey, IdentitySource)> {
        let available = |key: &PortalKey| self.entries.get(*key).is_some_and(|e| !e.touched);

        if let Some(key) = id.and_then(|id| self.by_id.get(id)).filter(|k| available(k)) {
            return Some((*key, IdentitySource::Id));
        }
        if let Some(key) = self.by_link.get(host).filter(|k| available(k)) {
            if Self::id_compatible(&self.entries[*key], id) {
                return Some((*key, IdentitySource::Link));
            }
        }

        let orphans: Vec<(PortalKey, &PortalEntry)> = self
            .entries
            .iter()
            .filter(|(_, entry)| {
                !entry.touched && !dom.contains(entry.host.owner) && Self::id_compatible(entry, id)
            })
            .collect();
        if let Some(target) = target {
            if let Some((key, _)) = orphans.iter().find(|(_, entry)| entry.target == target) {
                return Some((*key, IdentitySource::Target));
            }
        }
        let fingerprint = fingerprint?;
        orphans
            .iter()
            .find(|(_, entry)| entry.fingerprint == Some(fingerprint))
            .map(|(key, _)| (*key, IdentitySource::Content))
    }

    pub(crate) fn insert(&mut self, entry: PortalEntry) -> PortalKey {
        let id = entry.id.clone();
        let host = entry.host;
        let key = self.entries.insert(entry);
        if let Some(id) = id {
            self.by_id.insert(id, key);
        }
        self.by_link.insert(host, key);
        key
    }

    /// Mark an entry as rendered this pass under `host`
    pub(crate) fn touch(&mut self, key: PortalKey, host: PortalHost) {
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        entry.touched = true;
        if entry.host != host {
            if self.by_link.get(&entry.host) == Some(&key) {
                self.by_link.remove(&entry.host);
            }
            entry.host = host;
        }
        self.by_link.insert(host, key);
    }

    /// Keep portals nested inside a container whose content was not re-rendered
    pub(crate) fn touch_nested(&mut self, dom: &LiveDom, container: NodeId) {
        for entry in self.entries.values_mut() {
            if dom.is_inclusive_ancestor(container, entry.host.owner) {
                entry.touched = true;
            }
        }
    }

    pub(crate) fn entry_mut(&mut self, key: PortalKey) -> Option<&mut PortalEntry> {
        self.entries.get_mut(key)
    }

    fn forget(&mut self, key: PortalKey) -> Option<PortalEntry> {
        let entry = self.entries.remove(key)?;
        if let Some(id) = &entry.id {
            if self.by_id.get(id) == Some(&key) {
                self.by_id.remove(id);
            }
        }
        if self.by_link.get(&entry.host) == Some(&key) {
            self.by_link.remove(&entry.host);
        }
        Some(entry)
    }

    /// Drop entries whose container was destroyed along with its target
    pub(crate) fn forget_dead(&mut self, dom: &LiveDom) -> usize {
        let dead: Vec<PortalKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| !dom.contains(entry.container))
            .map(|(key, _)| key)
            .collect();
        for key in &dead {
            if let Some(entry) = self.forget(*key) {
                debug!(container = ?entry.container, "Forgetting portal with a destroyed container");
            }
        }
        dead.len()
    }

    /// Destroy portals of `root` that were not rendered, portals whose owner is
    /// gone and portals whose container is gone
    pub fn sweep(&mut self, dom: &mut LiveDom, root: NodeId) -> DomResult<usize> {
        let doomed: Vec<PortalKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| {
                (!entry.touched && entry.root == root)
                    || !dom.contains(entry.host.owner)
                    || !dom.contains(entry.container)
            })
            .map(|(key, _)| key)
            .collect();

        for key in &doomed {
            let Some(entry) = self.forget(*key) else {
                continue;
            };
            debug!(container = ?entry.container, "Removing portal");
            if dom.contains(entry.container) {
                dom.destroy(entry.container)?;
            }
        }
        Ok(doomed.len())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_id.clear();
        self.by_link.clear();
    }
}

/// Hash of the normalized content; `None` when it can't be serialized
pub fn fingerprint(content: &[&VNode]) -> Option<u64> {
    let json = serde_json::to_string(content).ok()?;
    let mut hasher = DefaultHasher::new();
    json.hash(&mut hasher);
    Some(hasher.finish())
}

impl<'v> Pass<'_, 'v> {
    fn resolve_target(&self, target: &PortalTarget) -> Option<NodeId> {
        let dom = &*self.dom;
        let body = dom.body();
        let resolved = match target {
            PortalTarget::Body => Some(body),
            PortalTarget::Selector(selector) => query_selector(dom, body, selector).ok().flatten(),
            PortalTarget::StableId(sid) => {
                let attribute = &self.config.markers.identity_attribute;
                self.sid_index
                    .get(dom, attribute, sid)
                    .or_else(|| dom.find_by_attribute(body, attribute, sid))
            }
            PortalTarget::Node(node) => Some(*node),
            PortalTarget::Resolver(resolver) => resolver.resolve(dom),
        };
        resolved.filter(|node| dom.is_element(*node) && dom.is_connected(*node))
    }

    pub(crate) fn render_portal(&mut self, job: PortalJob<'v>) {
        let next = job.next;
        let default_target = PortalTarget::Body;
        let (id, target_spec) = match &next.portal {
            Some(spec) => (spec.id.as_deref(), &spec.target),
            None => (None, &default_target),
        };
        let host = PortalHost {
            owner: job.owner,
            ordinal: job.ordinal,
        };
        let content: Vec<&'v VNode> = next.portal_content().collect();
        let fingerprint = fingerprint(&content);
        // A container destroyed with its old target can't be migrated; start over
        self.portals.forget_dead(self.dom);

        let Some(target) = self.resolve_target(target_spec) else {
            if let Some((key, _)) = self.portals.lookup(self.dom, id, &host, None, None) {
                self.portals.touch(key, host);
                if let Some(container) = self.portals.get(key).map(|e| e.container) {
                    self.portals.touch_nested(self.dom, container);
                }
            }
            let message = format!("Portal target '{}' did not resolve; content skipped", target_spec);
            warn!(target = %target_spec, "Unresolved portal target");
            self.report(ErrorKind::UnresolvedPortalTarget, message, Some(next), job.item, Phase::Portal);
            return;
        };

        let found = self.portals.lookup(self.dom, id, &host, Some(target), fingerprint);
        let (key, created) = match found {
            Some((key, source)) => {
                debug!(?source, "Portal matched");
                (key, false)
            }
            None => match self.create_portal(id, host, target) {
                Ok(key) => (key, true),
                Err(err) => {
                    self.report(ErrorKind::LiveTree, err.to_string(), Some(next), job.item, Phase::Portal);
                    return;
                }
            },
        };
        self.portals.touch(key, host);

        let Some((container, current_target, previous_fingerprint)) = self
            .portals
            .get(key)
            .map(|e| (e.container, e.target, e.fingerprint))
        else {
            return;
        };

        if current_target != target {
            debug!(container = ?container, "Migrating portal container");
            if let Err(err) = self.dom.append_child(target, container) {
                self.report(ErrorKind::LiveTree, err.to_string(), Some(next), job.item, Phase::Portal);
                return;
            }
            if let Some(entry) = self.portals.entry_mut(key) {
                entry.target = target;
            }
            self.touched.push(target);
            self.arena.get_mut(job.item).changes |= ChangeSet::MOVE;
        }

        let unchanged = !created
            && fingerprint.is_some()
            && previous_fingerprint == fingerprint
            && self.rendered.contains_key(&key);
        if unchanged {
            self.portals.touch_nested(self.dom, container);
            return;
        }

        let previous: Vec<&'v VNode> = self
            .rendered
            .get(&key)
            .map(|content| content.iter().collect())
            .unwrap_or_default();
        self.arena.get_mut(job.item).live = Some(container);
        self.reconcile_children(container, Some(job.item), &previous, &content);

        if let Some(entry) = self.portals.entry_mut(key) {
            entry.fingerprint = fingerprint;
            entry.rendered = Some(content.into_iter().cloned().collect());
        }
    }

    fn create_portal(&mut self, id: Option<&str>, host: PortalHost, target: NodeId) -> DomResult<PortalKey> {
        let container = self.dom.create_element("div");
        let label = id.unwrap_or("");
        self.dom
            .set_attribute(container, self.config.markers.portal_container_attribute.as_str(), label)?;
        self.dom.append_child(target, container)?;
        self.touched.push(target);
        debug!(container = ?container, target = ?target, "Created portal container");
        Ok(self.portals.insert(PortalEntry {
            id: id.map(str::to_string),
            target,
            container,
            host,
            root: self.root,
            fingerprint: None,
            rendered: None,
            touched: true,
        }))
    }
}

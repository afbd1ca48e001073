//! Render pass driver
//!
//! [`Renderer`] owns everything that outlives a pass: the previous tree per
//! container, the stable-identity index, the portal registry and the text-run
//! cache. A pass is synchronous and runs to completion; renders requested while
//! one is in flight (typically from a live-tree observer holding a
//! [`RenderHandle`]) are rejected and either queued or dropped.

use crate::children::Pass;
use crate::config::{ReentrancyPolicy, RenderOptions, RendererConfig};
use crate::errors::{ErrorKind, PassContext, Phase, RenderError, Severity};
use crate::matcher::Matcher;
use crate::portal::PortalRegistry;
use crate::sid_index::SidIndex;
use crate::text_runs::{ContainerRuns, RunOptions, TextRunIndex};
use crate::work_item::ChangeTally;
use scribe_dom::{LiveDom, MutationStats, NodeId};
use scribe_vdom::{validate_tree, VNode};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use tracing::{debug, info, instrument, warn};

/// Queued renders run after a pass before the rest is left for [`Renderer::run_pending`]
pub const MAX_FOLLOWUP_PASSES: usize = 8;

/// Render requested through a [`RenderHandle`]
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub container: NodeId,
    /// Next tree; `None` clears the container
    pub next: Option<VNode>,
    pub options: RenderOptions,
}

impl RenderRequest {
    pub fn new(container: NodeId, next: Option<VNode>) -> Self {
        Self {
            container,
            next,
            options: RenderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug)]
struct Gate {
    in_flight: Cell<bool>,
    policy: Cell<ReentrancyPolicy>,
    pass: Cell<u64>,
    queue: RefCell<VecDeque<RenderRequest>>,
    rejected: RefCell<Vec<RenderError>>,
}

impl Gate {
    fn new(policy: ReentrancyPolicy) -> Self {
        Self {
            in_flight: Cell::new(false),
            policy: Cell::new(policy),
            pass: Cell::new(0),
            queue: RefCell::new(VecDeque::new()),
            rejected: RefCell::new(Vec::new()),
        }
    }

    fn begin(&self) -> u64 {
        let pass = self.pass.get() + 1;
        self.pass.set(pass);
        self.in_flight.set(true);
        pass
    }

    fn finish(&self) -> Vec<RenderError> {
        self.in_flight.set(false);
        std::mem::take(&mut *self.rejected.borrow_mut())
    }

    fn pop(&self) -> Option<RenderRequest> {
        self.queue.borrow_mut().pop_front()
    }

    fn push_front(&self, request: RenderRequest) {
        self.queue.borrow_mut().push_front(request);
    }
}

/// Cloneable handle for requesting renders from outside the renderer
#[derive(Debug, Clone)]
pub struct RenderHandle {
    gate: Rc<Gate>,
}

impl RenderHandle {
    /// Queue a render
    ///
    /// While a pass is in flight the request is rejected with a reentrancy
    /// error; under [`ReentrancyPolicy::Queue`] it still runs after that pass,
    /// under [`ReentrancyPolicy::Drop`] it is discarded.
    pub fn request(&self, request: RenderRequest) -> Result<(), RenderError> {
        let gate = &self.gate;
        if !gate.in_flight.get() {
            gate.queue.borrow_mut().push_back(request);
            return Ok(());
        }

        let policy = gate.policy.get();
        let message = match policy {
            ReentrancyPolicy::Queue => "Render requested during a pass; queued to run after it",
            ReentrancyPolicy::Drop => "Render requested during a pass; dropped",
        };
        warn!(pass = gate.pass.get(), ?policy, "Reentrant render request");
        let error = RenderError::new(
            ErrorKind::Reentrant,
            message,
            PassContext::new(gate.pass.get(), Phase::Gate),
        );
        if policy == ReentrancyPolicy::Queue {
            gate.queue.borrow_mut().push_back(request);
        }
        gate.rejected.borrow_mut().push(error.clone());
        Err(error)
    }

    pub fn is_rendering(&self) -> bool {
        self.gate.in_flight.get()
    }

    /// Requests waiting to run
    pub fn pending(&self) -> usize {
        self.gate.queue.borrow().len()
    }
}

/// Outcome of one pass
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderReport {
    pub pass: u64,
    pub container: NodeId,
    /// Observable mutations made by this pass
    pub stats: MutationStats,
    pub changes: ChangeTally,
    pub errors: Vec<RenderError>,
    /// Unmatched live nodes left in place
    pub retained: Vec<NodeId>,
    pub portals_removed: usize,
    /// Records delivered to the observer at the end of the pass
    pub records: usize,
    /// Queued passes that ran after this one
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub followups: Vec<RenderReport>,
}

impl RenderReport {
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|e| e.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &RenderError> {
        self.errors.iter().filter(|e| e.severity() == Severity::Warning)
    }

    /// Stats of this pass and every followup
    pub fn total_stats(&self) -> MutationStats {
        let mut total = self.stats;
        for followup in &self.followups {
            total.merge(&followup.total_stats());
        }
        total
    }
}

#[derive(Debug)]
pub struct Renderer {
    config: RendererConfig,
    matcher: Matcher,
    sid_index: SidIndex,
    portals: PortalRegistry,
    text_runs: TextRunIndex,
    gate: Rc<Gate>,
    /// Last rendered (normalized) tree per container
    trees: HashMap<NodeId, VNode>,
    mount: Option<NodeId>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self::with_matcher(config, Matcher::standard())
    }

    pub fn with_matcher(config: RendererConfig, matcher: Matcher) -> Self {
        Self {
            gate: Rc::new(Gate::new(config.reentrancy)),
            config,
            matcher,
            sid_index: SidIndex::new(),
            portals: PortalRegistry::new(),
            text_runs: TextRunIndex::new(),
            trees: HashMap::new(),
            mount: None,
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn set_reentrancy(&mut self, policy: ReentrancyPolicy) {
        self.config.reentrancy = policy;
        self.gate.policy.set(policy);
    }

    pub fn handle(&self) -> RenderHandle {
        RenderHandle {
            gate: Rc::clone(&self.gate),
        }
    }

    /// Container used by [`Self::update`]; `body` when unset
    pub fn mount(&mut self, container: NodeId) {
        self.mount = Some(container);
    }

    pub fn portals(&self) -> &PortalRegistry {
        &self.portals
    }

    pub fn sid_index(&self) -> &SidIndex {
        &self.sid_index
    }

    /// Index identities already present under `root`, e.g. server-rendered content
    pub fn rebuild_sid_index(&mut self, dom: &LiveDom, root: NodeId) {
        self.sid_index
            .rebuild(dom, root, &self.config.markers.identity_attribute);
    }

    /// Last tree rendered into `container`
    pub fn tree(&self, container: NodeId) -> Option<&VNode> {
        self.trees.get(&container)
    }

    pub fn passes(&self) -> u64 {
        self.gate.pass.get()
    }

    /// Reconcile `container` from `prev` to `next`
    ///
    /// Both trees are normalized first. Requests queued during the pass run
    /// afterwards and are reported as followups.
    pub fn render(
        &mut self,
        dom: &mut LiveDom,
        prev: Option<&VNode>,
        next: Option<&VNode>,
        container: NodeId,
        options: &RenderOptions,
    ) -> RenderReport {
        let markers = &self.config.markers;
        let prev = prev.map(|node| node.normalized(markers));
        let next = next.map(|node| node.normalized(markers));
        let mut report = self.run_pass(dom, prev, next, container, options);
        report.followups = self.drain_queue(dom);
        report
    }

    /// Render `next` into the mounted container, diffing against the last render there
    pub fn update(&mut self, dom: &mut LiveDom, next: Option<&VNode>) -> RenderReport {
        self.update_with(dom, next, &RenderOptions::default())
    }

    pub fn update_with(&mut self, dom: &mut LiveDom, next: Option<&VNode>, options: &RenderOptions) -> RenderReport {
        let container = self.mount.unwrap_or_else(|| dom.body());
        let prev = self.trees.remove(&container);
        let next = next.map(|node| node.normalized(&self.config.markers));
        let mut report = self.run_pass(dom, prev, next, container, options);
        report.followups = self.drain_queue(dom);
        report
    }

    /// Run requests queued through handles while no pass was in flight
    pub fn run_pending(&mut self, dom: &mut LiveDom) -> Vec<RenderReport> {
        self.drain_queue(dom)
    }

    fn drain_queue(&mut self, dom: &mut LiveDom) -> Vec<RenderReport> {
        let mut reports = Vec::new();
        while let Some(request) = self.gate.pop() {
            if reports.len() == MAX_FOLLOWUP_PASSES {
                warn!(
                    pending = self.gate.queue.borrow().len() + 1,
                    "Too many queued renders; leaving the rest pending"
                );
                self.gate.push_front(request);
                break;
            }
            let prev = self.trees.remove(&request.container);
            let next = request
                .next
                .as_ref()
                .map(|node| node.normalized(&self.config.markers));
            reports.push(self.run_pass(dom, prev, next, request.container, &request.options));
        }
        reports
    }

    #[instrument(skip_all, fields(container = ?container, clear = next.is_none()))]
    fn run_pass(
        &mut self,
        dom: &mut LiveDom,
        prev: Option<VNode>,
        next: Option<VNode>,
        container: NodeId,
        options: &RenderOptions,
    ) -> RenderReport {
        let pass = self.gate.begin();
        info!(pass, "Starting render pass");
        let before = dom.stats();
        let mut errors = Vec::new();

        if self.config.dev_mode {
            if let Some(next) = &next {
                for warning in validate_tree(next, &self.config.markers) {
                    debug!(level = ?warning.level, "{}", warning.message);
                    errors.push(RenderError::new(
                        ErrorKind::InvalidTree,
                        warning.message,
                        PassContext::new(pass, Phase::Validate),
                    ));
                }
            }
        }

        self.portals.begin_pass();
        let rendered = self.portals.take_rendered();
        let output = Pass::new(
            dom,
            &self.config,
            options,
            &self.matcher,
            &mut self.sid_index,
            &mut self.portals,
            &rendered,
            container,
            pass,
        )
        .run(prev.as_ref(), next.as_ref());
        self.portals.restore_rendered(rendered);
        errors.extend(output.errors);

        let preserved = next.is_none() && options.preserve_on_clear;
        let mut portals_removed = 0;
        if !options.exclude_portals && !preserved {
            match self.portals.sweep(dom, container) {
                Ok(removed) => portals_removed = removed,
                Err(err) => errors.push(RenderError::new(
                    ErrorKind::LiveTree,
                    err.to_string(),
                    PassContext::new(pass, Phase::Sweep),
                )),
            }
        }

        for node in &output.touched {
            self.text_runs.invalidate_containing(dom, *node);
        }
        if portals_removed > 0 {
            self.text_runs.invalidate_containing(dom, container);
        }

        match next {
            Some(next) => {
                self.trees.insert(container, next);
            }
            None if preserved => {
                if let Some(prev) = prev {
                    self.trees.insert(container, prev);
                }
            }
            None => {}
        }

        // Observers run while the pass is still in flight
        let records = dom.flush_records();
        errors.extend(self.gate.finish());

        let stats = dom.stats().since(&before);
        info!(
            pass,
            inserted = stats.inserted,
            moved = stats.moved,
            removed = stats.removed,
            errors = errors.len(),
            "Render pass complete"
        );

        RenderReport {
            pass,
            container,
            stats,
            changes: output.tally,
            errors,
            retained: output.retained,
            portals_removed,
            records,
            followups: Vec::new(),
        }
    }

    fn run_options(&self) -> RunOptions {
        RunOptions {
            trim: self.config.trim_text_runs,
            decoration_attribute: self.config.markers.decoration_attribute.clone(),
        }
    }

    /// Text runs of `container`, cached until invalidated
    pub fn text_runs(&mut self, dom: &LiveDom, container: NodeId) -> &ContainerRuns {
        let options = self.run_options();
        self.text_runs.runs(dom, container, &options)
    }

    pub fn text_runs_for_id(&mut self, dom: &LiveDom, id: &str, container: NodeId) -> &ContainerRuns {
        let options = self.run_options();
        self.text_runs.runs_for_id(dom, id, container, &options)
    }

    pub fn cached_text_runs(&self, id: &str) -> Option<&ContainerRuns> {
        self.text_runs.get_by_id(id)
    }

    /// Drop cached runs affected by an out-of-band write to `node`
    pub fn invalidate_text_runs(&mut self, dom: &LiveDom, node: NodeId) -> usize {
        self.text_runs.invalidate_containing(dom, node)
    }
}

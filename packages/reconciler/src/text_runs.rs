//! Text-run index
//!
//! Maps logical character offsets inside a text-bearing container to the live
//! text fragments that hold them. Marks and decorations split one logical
//! string into several text nodes; a run records where each fragment's
//! logical text starts and ends.
//!
//! Offsets count Unicode scalar values. Only direct text children of the
//! container are trimmed, and only of formatting whitespace: a leading or
//! trailing whitespace run that contains a line break. Plain spaces are
//! content, so `"Hello "` followed by `<strong>world</strong>` is 11 long.

use scribe_dom::{LiveDom, NodeId};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextRun {
    pub node: NodeId,
    pub start: usize,
    /// Exclusive
    pub end: usize,
    /// Where the logical text starts inside the raw fragment
    pub node_offset: usize,
}

impl TextRun {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerRuns {
    pub runs: Vec<TextRun>,
    pub total: usize,
    /// Text node to its run index
    #[serde(skip)]
    pub reverse_map: HashMap<NodeId, usize>,
}

impl ContainerRuns {
    pub fn run_for(&self, node: NodeId) -> Option<&TextRun> {
        self.reverse_map.get(&node).map(|i| &self.runs[*i])
    }

    /// Live position of a logical offset: the fragment and the raw offset in it
    ///
    /// An offset equal to `total` is the end of the last run.
    pub fn locate(&self, offset: usize) -> Option<(NodeId, usize)> {
        if let Some(index) = binary_search_run(&self.runs, offset) {
            let run = &self.runs[index];
            return Some((run.node, run.node_offset + offset - run.start));
        }
        match self.runs.last() {
            Some(run) if offset == self.total => Some((run.node, run.node_offset + run.len())),
            _ => None,
        }
    }

    /// Logical offset of a raw position inside a fragment, clamped to its run
    pub fn offset_of(&self, node: NodeId, raw_offset: usize) -> Option<usize> {
        let run = self.run_for(node)?;
        let within = raw_offset.saturating_sub(run.node_offset).min(run.len());
        Some(run.start + within)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub trim: bool,
    pub decoration_attribute: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            trim: true,
            decoration_attribute: scribe_vdom::markers::DEFAULT_DECORATION_ATTRIBUTE.to_string(),
        }
    }
}

/// Index of the run containing `offset`, `start <= offset < end`
pub fn binary_search_run(runs: &[TextRun], offset: usize) -> Option<usize> {
    let mut low = 0;
    let mut high = runs.len();
    while low < high {
        let mid = low + (high - low) / 2;
        let run = &runs[mid];
        if offset < run.start {
            high = mid;
        } else if offset >= run.end {
            low = mid + 1;
        } else {
            return Some(mid);
        }
    }
    None
}

/// Logical slice of a direct text child: `(leading chars trimmed, logical length)`
fn trimmed_bounds(raw: &str) -> (usize, usize) {
    let chars: Vec<char> = raw.chars().collect();
    let lead = chars.iter().take_while(|c| c.is_whitespace()).count();
    if lead == chars.len() {
        // Whitespace only: formatting if it breaks a line
        return if chars.contains(&'\n') {
            (chars.len(), 0)
        } else {
            (0, chars.len())
        };
    }
    let trail = chars.iter().rev().take_while(|c| c.is_whitespace()).count();
    let lead = if chars[..lead].contains(&'\n') { lead } else { 0 };
    let trail = if chars[chars.len() - trail..].contains(&'\n') {
        trail
    } else {
        0
    };
    (lead, chars.len() - lead - trail)
}

struct Builder<'a> {
    dom: &'a LiveDom,
    options: &'a RunOptions,
    runs: ContainerRuns,
}

impl Builder<'_> {
    fn push(&mut self, node: NodeId, node_offset: usize, len: usize) {
        if len == 0 {
            return;
        }
        let start = self.runs.total;
        self.runs.reverse_map.insert(node, self.runs.runs.len());
        self.runs.runs.push(TextRun {
            node,
            start,
            end: start + len,
            node_offset,
        });
        self.runs.total += len;
    }

    fn decorated(&self, node: NodeId) -> bool {
        self.dom
            .attribute(node, &self.options.decoration_attribute)
            .is_some()
    }

    fn walk_element(&mut self, element: NodeId) {
        for child in self.dom.children(element).to_vec() {
            if let Some(text) = self.dom.text(child) {
                let len = text.chars().count();
                self.push(child, 0, len);
            } else if !self.decorated(child) {
                self.walk_element(child);
            }
        }
    }
}

/// Walk `container` and build its runs
pub fn build_index(dom: &LiveDom, container: NodeId, options: &RunOptions) -> ContainerRuns {
    let mut builder = Builder {
        dom,
        options,
        runs: ContainerRuns::default(),
    };
    for child in dom.children(container) {
        if let Some(text) = dom.text(*child) {
            let (lead, len) = if options.trim {
                trimmed_bounds(text)
            } else {
                (0, text.chars().count())
            };
            builder.push(*child, lead, len);
        } else if !builder.decorated(*child) {
            builder.walk_element(*child);
        }
    }
    debug!(
        runs = builder.runs.runs.len(),
        total = builder.runs.total,
        "Built text runs"
    );
    builder.runs
}

/// Cached runs per container, and per external id
#[derive(Debug, Default)]
pub struct TextRunIndex {
    by_container: HashMap<NodeId, ContainerRuns>,
    by_id: HashMap<String, NodeId>,
}

impl TextRunIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached runs for `container`, built on first use
    pub fn runs(&mut self, dom: &LiveDom, container: NodeId, options: &RunOptions) -> &ContainerRuns {
        self.by_container
            .entry(container)
            .or_insert_with(|| build_index(dom, container, options))
    }

    /// Like [`Self::runs`], also remembering `container` under `id`
    pub fn runs_for_id(
        &mut self,
        dom: &LiveDom,
        id: impl Into<String>,
        container: NodeId,
        options: &RunOptions,
    ) -> &ContainerRuns {
        self.by_id.insert(id.into(), container);
        self.runs(dom, container, options)
    }

    pub fn get(&self, container: NodeId) -> Option<&ContainerRuns> {
        self.by_container.get(&container)
    }

    pub fn get_by_id(&self, id: &str) -> Option<&ContainerRuns> {
        self.by_id.get(id).and_then(|c| self.by_container.get(c))
    }

    /// Drop the runs of `container` and every id naming it
    pub fn invalidate(&mut self, container: NodeId) -> bool {
        self.by_id.retain(|_, named| *named != container);
        self.by_container.remove(&container).is_some()
    }

    pub fn invalidate_id(&mut self, id: &str) -> bool {
        match self.by_id.remove(id) {
            Some(container) => self.invalidate(container),
            None => false,
        }
    }

    /// Drop every cached container that holds `node`, and dead containers
    pub fn invalidate_containing(&mut self, dom: &LiveDom, node: NodeId) -> usize {
        let before = self.by_container.len();
        self.by_container.retain(|container, _| {
            dom.contains(*container) && !dom.is_inclusive_ancestor(*container, node)
        });
        let cached = &self.by_container;
        self.by_id.retain(|_, container| cached.contains_key(container));
        before - self.by_container.len()
    }

    pub fn len(&self) -> usize {
        self.by_container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_container.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_container.clear();
        self.by_id.clear();
    }
}

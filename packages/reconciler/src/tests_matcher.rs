use crate::errors::ErrorKind;
use crate::matcher::{Decision, MatchContext, Matcher, PrevSibling};
use crate::sid_index::SidIndex;
use scribe_dom::{LiveDom, NodeId};
use scribe_vdom::{Markers, PortalTarget, VNode};
use std::collections::HashSet;

struct Fixture {
    dom: LiveDom,
    markers: Markers,
    claimed: HashSet<NodeId>,
    reserved: HashSet<NodeId>,
    sid_index: SidIndex,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dom: LiveDom::new(),
            markers: Markers::default(),
            claimed: HashSet::new(),
            reserved: HashSet::new(),
            sid_index: SidIndex::new(),
        }
    }

    fn element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let node = self.dom.create_element(tag);
        for (name, value) in attrs {
            self.dom.set_attribute(node, *name, *value).unwrap();
        }
        self.dom.append_child(parent, node).unwrap();
        node
    }

    fn text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let node = self.dom.create_text(text);
        self.dom.append_child(parent, node).unwrap();
        node
    }

    fn resolve(&self, next: &VNode, index: usize, prev: &[PrevSibling<'_>]) -> crate::matcher::MatchOutcome {
        self.resolve_with(next, index, prev, false)
    }

    fn resolve_with(
        &self,
        next: &VNode,
        index: usize,
        prev: &[PrevSibling<'_>],
        use_index: bool,
    ) -> crate::matcher::MatchOutcome {
        let parent = self.dom.body();
        let live_children = self.dom.children(parent).to_vec();
        let ctx = MatchContext {
            dom: &self.dom,
            markers: &self.markers,
            parent,
            index,
            prev,
            live_children: &live_children,
            claimed: &self.claimed,
            reserved: &self.reserved,
            sid_index: use_index.then_some(&self.sid_index),
        };
        Matcher::standard().resolve(&next.normalized(&self.markers), &ctx)
    }
}

#[test]
fn test_positional_match_uses_index_parity() {
    let mut fx = Fixture::new();
    let body = fx.dom.body();
    let first = fx.element(body, "div", &[]);
    let second = fx.element(body, "div", &[]);

    let prev_a = VNode::element("div").with_text("A");
    let prev_b = VNode::element("div").with_text("B");
    let prev = [
        PrevSibling {
            node: &prev_a,
            live: Some(first),
        },
        PrevSibling {
            node: &prev_b,
            live: Some(second),
        },
    ];

    // [div A, div B] -> [span, div]: the div continues B, not the first div
    let outcome = fx.resolve(&VNode::element("div"), 1, &prev);
    assert_eq!(outcome.decision, Decision::Reuse(second));
    assert_eq!(outcome.strategy, Some("position"));

    let outcome = fx.resolve(&VNode::element("span"), 0, &prev);
    assert_eq!(outcome.decision, Decision::Create);
}

#[test]
fn test_keyed_nodes_skip_positional_and_content() {
    let mut fx = Fixture::new();
    let body = fx.dom.body();
    let a = fx.element(body, "li", &[]);
    let b = fx.element(body, "li", &[]);

    let prev_a = VNode::element("li").with_key("a");
    let prev_b = VNode::element("li").with_key("b");
    let prev = [
        PrevSibling {
            node: &prev_a,
            live: Some(a),
        },
        PrevSibling {
            node: &prev_b,
            live: Some(b),
        },
    ];

    let outcome = fx.resolve(&VNode::element("li").with_key("b"), 0, &prev);
    assert_eq!(outcome.decision, Decision::Reuse(b));
    assert_eq!(outcome.strategy, Some("key"));

    let outcome = fx.resolve(&VNode::element("li").with_key("c"), 0, &prev);
    assert_eq!(outcome.decision, Decision::Create);
}

#[test]
fn test_key_attribute_is_equivalent_to_key() {
    let mut fx = Fixture::new();
    let body = fx.dom.body();
    let a = fx.element(body, "li", &[]);
    let prev_a = VNode::element("li").with_key("a");
    let prev = [PrevSibling {
        node: &prev_a,
        live: Some(a),
    }];

    let next = VNode::element("li").with_attr("key", "a");
    assert_eq!(fx.resolve(&next, 0, &prev).decision, Decision::Reuse(a));
}

#[test]
fn test_stable_identity_with_new_tag_retags() {
    let mut fx = Fixture::new();
    let body = fx.dom.body();
    let p = fx.element(body, "p", &[("data-node-id", "x")]);

    let outcome = fx.resolve(&VNode::element("h1").with_sid("x"), 0, &[]);
    assert_eq!(outcome.decision, Decision::Retag(p));
    assert_eq!(outcome.strategy, Some("sid"));
}

#[test]
fn test_stable_identity_through_index() {
    let mut fx = Fixture::new();
    let body = fx.dom.body();
    fx.element(body, "p", &[("data-node-id", "x")]);
    let indexed = fx.element(body, "p", &[("data-node-id", "y")]);
    fx.sid_index.insert("y", indexed);

    let outcome = fx.resolve_with(&VNode::element("p").with_sid("y"), 0, &[], true);
    assert_eq!(outcome.decision, Decision::Reuse(indexed));
}

#[test]
fn test_claimed_identity_is_a_collision() {
    let mut fx = Fixture::new();
    let body = fx.dom.body();
    let p = fx.element(body, "p", &[("data-node-id", "x")]);
    fx.claimed.insert(p);

    let outcome = fx.resolve(&VNode::element("p").with_sid("x"), 1, &[]);
    assert_eq!(outcome.decision, Decision::Create);
    assert_eq!(outcome.notes.len(), 1);
    assert_eq!(outcome.notes[0].kind, ErrorKind::IdentityCollision);
}

#[test]
fn test_detached_node_is_not_reused() {
    let mut fx = Fixture::new();
    let detached = fx.dom.create_element("p");
    fx.dom.set_attribute(detached, "data-node-id", "x").unwrap();
    fx.sid_index.insert("x", detached);

    let outcome = fx.resolve_with(&VNode::element("p").with_sid("x"), 0, &[], true);
    assert_eq!(outcome.decision, Decision::Create);
    assert_eq!(outcome.notes[0].kind, ErrorKind::DetachedReuse);
}

#[test]
fn test_stable_identity_relocates_from_descendants() {
    let mut fx = Fixture::new();
    let body = fx.dom.body();
    let wrapper = fx.element(body, "section", &[]);
    let nested = fx.element(wrapper, "p", &[("data-node-id", "deep")]);

    let outcome = fx.resolve(&VNode::element("p").with_sid("deep"), 0, &[]);
    assert_eq!(outcome.decision, Decision::Reuse(nested));
}

#[test]
fn test_content_prefers_identical_text() {
    let mut fx = Fixture::new();
    let body = fx.dom.body();
    fx.text(body, "a");
    let b = fx.text(body, "b");

    let outcome = fx.resolve(&VNode::text("b"), 0, &[]);
    assert_eq!(outcome.decision, Decision::Reuse(b));
    assert_eq!(outcome.strategy, Some("content"));
}

#[test]
fn test_content_skips_reserved_and_identified_nodes() {
    let mut fx = Fixture::new();
    let body = fx.dom.body();
    let reserved = fx.element(body, "p", &[]);
    fx.element(body, "p", &[("data-node-id", "other")]);
    let free = fx.element(body, "p", &[]);
    fx.reserved.insert(reserved);

    let outcome = fx.resolve(&VNode::element("p"), 0, &[]);
    assert_eq!(outcome.decision, Decision::Reuse(free));
}

#[test]
fn test_component_type_change_recreates() {
    let mut fx = Fixture::new();
    let body = fx.dom.body();
    let card = fx.element(
        body,
        "div",
        &[("data-component", "true"), ("data-component-type", "Card")],
    );
    let prev_card = VNode::element("div")
        .with_attr("data-component", true)
        .with_attr("data-component-type", "Card");
    let prev = [PrevSibling {
        node: &prev_card,
        live: Some(card),
    }];

    let same = prev_card.clone();
    assert_eq!(fx.resolve(&same, 0, &prev).decision, Decision::Reuse(card));

    let list = VNode::element("div")
        .with_attr("data-component", true)
        .with_attr("data-component-type", "List");
    assert_eq!(fx.resolve(&list, 0, &prev).decision, Decision::Create);
}

#[test]
fn test_portals_are_skipped() {
    let fx = Fixture::new();
    let outcome = fx.resolve(&VNode::portal(PortalTarget::Body), 0, &[]);
    assert_eq!(outcome.decision, Decision::Skip);
    assert_eq!(outcome.strategy, None);
}

#[test]
fn test_strategy_order() {
    assert_eq!(
        Matcher::standard().strategy_names(),
        vec!["sid", "key", "position", "content"]
    );
}

use crate::config::{RenderOptions, RendererConfig};
use crate::errors::ErrorKind;
use crate::renderer::Renderer;
use scribe_dom::{inner_html, HtmlOptions, LiveDom, NodeId};
use scribe_vdom::VNode;

fn list(keys: &[&str]) -> VNode {
    VNode::element("ul").with_children(
        keys.iter()
            .map(|key| VNode::element("li").with_key(*key).with_text(*key)),
    )
}

fn items(dom: &LiveDom) -> Vec<NodeId> {
    let ul = dom.children(dom.body())[0];
    dom.children(ul).to_vec()
}

#[test]
fn test_reversal_moves_everything_outside_the_kept_run() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    renderer.update(&mut dom, Some(&list(&["a", "b", "c", "d"])));
    let before = items(&dom);

    let report = renderer.update(&mut dom, Some(&list(&["d", "c", "b", "a"])));

    let after = items(&dom);
    assert_eq!(after, vec![before[3], before[2], before[1], before[0]]);
    assert_eq!(report.stats.moved, 3);
    assert_eq!(report.stats.inserted, 0);
    assert_eq!(report.stats.removed, 0);
    assert_eq!(report.changes.moved, 3);
}

#[test]
fn test_removal_leaves_other_items_alone() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    renderer.update(&mut dom, Some(&list(&["a", "b", "c"])));
    let before = items(&dom);

    let report = renderer.update(&mut dom, Some(&list(&["a", "c"])));

    assert_eq!(items(&dom), vec![before[0], before[2]]);
    assert!(!dom.contains(before[1]));
    assert_eq!(report.stats.removed, 1);
    assert_eq!(report.stats.moved, 0);
}

#[test]
fn test_text_change_writes_once_in_place() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    renderer.update(&mut dom, Some(&VNode::element("p").with_text("a")));
    let p = dom.children(dom.body())[0];
    let text = dom.children(p)[0];

    let report = renderer.update(&mut dom, Some(&VNode::element("p").with_text("b")));

    assert_eq!(dom.children(p), &[text]);
    assert_eq!(dom.text(text), Some("b"));
    assert_eq!(report.stats.text_writes, 1);
    assert_eq!(report.stats.structural(), 0);
}

#[test]
fn test_attributes_style_and_listeners() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    let first = VNode::element("button")
        .with_attr("class", "primary")
        .with_attr("disabled", true)
        .with_style("color", "red")
        .with_handler("onclick", "save");
    renderer.update(&mut dom, Some(&first));
    let button = dom.children(dom.body())[0];

    assert_eq!(dom.attribute(button, "class"), Some("primary"));
    assert_eq!(dom.attribute(button, "disabled"), Some(""));
    assert_eq!(dom.attribute(button, "onclick"), None);
    assert_eq!(dom.style(button, "color"), Some("red"));
    assert_eq!(dom.listener(button, "click"), Some("save"));

    let second = VNode::element("button")
        .with_attr("disabled", false)
        .with_style("margin", 4)
        .with_handler("onclick", "cancel");
    let report = renderer.update(&mut dom, Some(&second));

    assert_eq!(dom.attribute(button, "class"), None);
    assert_eq!(dom.attribute(button, "disabled"), None);
    assert_eq!(dom.style(button, "color"), None);
    assert_eq!(dom.style(button, "margin"), Some("4"));
    assert_eq!(dom.listener(button, "click"), Some("cancel"));
    assert_eq!(report.changes.attrs, 1);
    assert_eq!(report.changes.style, 1);
    assert_eq!(report.changes.listeners, 1);
}

#[test]
fn test_key_is_never_written() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    renderer.update(&mut dom, Some(&list(&["a"])));
    let li = items(&dom)[0];
    assert_eq!(dom.attribute(li, "key"), None);
}

#[test]
fn test_retag_moves_children_into_the_replacement() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    let child = VNode::element("span").with_text("kept");
    renderer.update(
        &mut dom,
        Some(&VNode::element("div").with_sid("x").with_child(child.clone())),
    );
    let old = dom.children(dom.body())[0];
    let span = dom.children(old)[0];

    let report = renderer.update(
        &mut dom,
        Some(&VNode::element("h1").with_sid("x").with_child(child)),
    );

    let replacement = dom.children(dom.body())[0];
    assert_eq!(dom.tag(replacement), Some("h1"));
    assert_eq!(dom.attribute(replacement, "data-node-id"), Some("x"));
    assert_eq!(dom.children(replacement), &[span]);
    assert!(!dom.contains(old));
    assert_eq!(report.changes.retagged, 1);
}

#[test]
fn test_component_type_change_recreates() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    let component = |kind: &str| {
        VNode::element("div")
            .with_attr("data-component", true)
            .with_attr("data-component-type", kind)
            .with_text("body")
    };
    renderer.update(&mut dom, Some(&component("Card")));
    let card = dom.children(dom.body())[0];

    renderer.update(&mut dom, Some(&component("Card")));
    assert_eq!(dom.children(dom.body()), &[card]);

    renderer.update(&mut dom, Some(&component("List")));
    let list = dom.children(dom.body())[0];
    assert_ne!(list, card);
    assert!(!dom.contains(card));
    assert_eq!(dom.attribute(list, "data-component-type"), Some("List"));
}

#[test]
fn test_suppress_detach_retains_unmatched() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    let body = dom.body();
    let both = VNode::element("div").with_children([
        VNode::element("p").with_text("a"),
        VNode::element("aside").with_text("b"),
    ]);
    renderer.update(&mut dom, Some(&both));
    let div = dom.children(body)[0];
    let aside = dom.children(div)[1];

    let options = RenderOptions {
        suppress_detach: true,
        ..Default::default()
    };
    let one = VNode::element("div").with_child(VNode::element("p").with_text("a"));
    let report = renderer.update_with(&mut dom, Some(&one), &options);

    assert_eq!(report.retained, vec![aside]);
    assert_eq!(dom.children(div)[1], aside);
    assert_eq!(report.stats.removed, 0);

    let report = renderer.update(&mut dom, Some(&one));
    assert!(!dom.contains(aside));
    assert_eq!(report.stats.removed, 1);
}

#[test]
fn test_clear_and_preserve_on_clear() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    let body = dom.body();
    let tree = VNode::element("p").with_text("keep me");
    renderer.update(&mut dom, Some(&tree));
    let p = dom.children(body)[0];

    let options = RenderOptions {
        preserve_on_clear: true,
        ..Default::default()
    };
    let report = renderer.update_with(&mut dom, None, &options);
    assert_eq!(report.retained, vec![p]);
    assert_eq!(dom.children(body), &[p]);
    assert!(renderer.tree(body).is_some());

    let report = renderer.update(&mut dom, None);
    assert!(dom.children(body).is_empty());
    assert_eq!(report.stats.removed, 1);
    assert!(renderer.tree(body).is_none());
}

#[test]
fn test_foreign_children_are_ignored() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    let body = dom.body();
    let foreign = dom.create_element("div");
    dom.set_attribute(foreign, "data-portal-container", "").unwrap();
    dom.append_child(body, foreign).unwrap();

    renderer.update(&mut dom, Some(&VNode::element("div").with_text("mine")));
    assert_eq!(dom.children(body).len(), 2);
    assert_eq!(dom.children(foreign).len(), 0);

    renderer.update(&mut dom, None);
    assert_eq!(dom.children(body), &[foreign]);
}

#[test]
fn test_explicit_previous_tree() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    let body = dom.body();
    let options = RenderOptions::default();
    let first = VNode::element("p").with_text("one");
    let second = VNode::element("p").with_text("two");

    renderer.render(&mut dom, None, Some(&first), body, &options);
    let p = dom.children(body)[0];
    let report = renderer.render(&mut dom, Some(&first), Some(&second), body, &options);

    assert_eq!(dom.children(body), &[p]);
    assert_eq!(dom.text_content(p), "two");
    assert_eq!(report.stats.structural(), 0);
}

fn fresh_html(tree: &VNode) -> String {
    let mut dom = LiveDom::new();
    Renderer::default().update(&mut dom, Some(tree));
    inner_html(&dom, dom.body(), &HtmlOptions::default())
}

#[test]
fn test_siblings_left_behind_by_a_relocation_are_diffed_correctly() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    let before = VNode::element("main").with_child(VNode::element("section").with_children([
        VNode::element("p").with_sid("x").with_attr("class", "a").with_text("X"),
        VNode::element("p").with_attr("class", "b").with_text("Y"),
    ]));
    let after = VNode::element("main").with_children([
        VNode::element("p").with_sid("x").with_attr("class", "a").with_text("X"),
        VNode::element("section")
            .with_child(VNode::element("p").with_attr("class", "a").with_text("Y")),
    ]);
    renderer.update(&mut dom, Some(&before));
    let main = dom.children(dom.body())[0];
    let section = dom.children(main)[0];
    let moved = dom.children(section)[0];
    let left = dom.children(section)[1];

    let report = renderer.update(&mut dom, Some(&after));

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(dom.children(main), &[moved, section]);
    assert_eq!(dom.children(section), &[left]);
    assert_eq!(dom.attribute(left, "class"), Some("a"));
    assert_eq!(inner_html(&dom, dom.body(), &HtmlOptions::default()), fresh_html(&after));

    let again = renderer.update(&mut dom, Some(&after));
    assert!(again.stats.is_empty());
}

#[test]
fn test_relocated_sibling_does_not_shift_positional_bindings() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    let before = VNode::element("main").with_child(VNode::element("ul").with_children([
        VNode::element("li").with_sid("top").with_text("top"),
        VNode::element("li").with_attr("title", "one").with_text("1"),
        VNode::element("li").with_attr("title", "two").with_text("2"),
    ]));
    let after = VNode::element("main").with_children([
        VNode::element("li").with_sid("top").with_text("top"),
        VNode::element("ul").with_children([
            VNode::element("li").with_attr("title", "one").with_text("1"),
            VNode::element("li").with_attr("title", "one").with_text("2"),
        ]),
    ]);
    renderer.update(&mut dom, Some(&before));

    let report = renderer.update(&mut dom, Some(&after));

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(inner_html(&dom, dom.body(), &HtmlOptions::default()), fresh_html(&after));
}

#[test]
fn test_dev_mode_reports_unstable_trees() {
    let mut dom = LiveDom::new();
    let config = RendererConfig {
        dev_mode: true,
        ..Default::default()
    };
    let mut renderer = Renderer::new(config);
    let tree = VNode::element("div").with_children([
        VNode::element("p").with_sid("same"),
        VNode::element("p").with_sid("same"),
    ]);

    let report = renderer.update(&mut dom, Some(&tree));
    assert!(report.errors.iter().any(|e| e.kind == ErrorKind::InvalidTree));
    assert!(!report.has_errors());
}

#[test]
fn test_error_paths_point_at_the_node() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    let tree = VNode::element("div").with_children([
        VNode::element("p").with_sid("twin"),
        VNode::element("p").with_sid("twin"),
    ]);
    renderer.update(&mut dom, Some(&tree));

    let report = renderer.update(&mut dom, Some(&tree));
    let collision = report
        .errors
        .iter()
        .find(|e| e.kind == ErrorKind::IdentityCollision)
        .expect("second twin collides");
    assert_eq!(collision.context.path, vec![0, 1]);
    assert_eq!(collision.node.as_ref().and_then(|n| n.sid.as_deref()), Some("twin"));
}

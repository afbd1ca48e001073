use crate::config::RenderOptions;
use crate::errors::ErrorKind;
use crate::renderer::Renderer;
use scribe_dom::{inner_html, HtmlOptions, LiveDom, NodeId};
use scribe_vdom::{PortalTarget, VNode};

fn page(target: &str, content: &str) -> VNode {
    VNode::element("main").with_children([
        VNode::element("div").with_attr("id", "a"),
        VNode::element("div").with_attr("id", "b"),
        VNode::portal(PortalTarget::Selector(target.to_string()))
            .with_child(VNode::element("p").with_text(content)),
    ])
}

fn only_container(renderer: &Renderer) -> NodeId {
    let mut entries = renderer.portals().iter();
    let (_, entry) = entries.next().expect("one portal");
    assert!(entries.next().is_none());
    entry.container
}

fn target(dom: &LiveDom, id: &str) -> NodeId {
    scribe_dom::query_selector(dom, dom.body(), &format!("#{id}"))
        .unwrap()
        .unwrap()
}

#[test]
fn test_portal_renders_into_target() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    renderer.update(&mut dom, Some(&page("#a", "hi")));

    let container = only_container(&renderer);
    assert_eq!(dom.parent(container), Some(target(&dom, "a")));
    assert_eq!(dom.attribute(container, "data-portal-container"), Some(""));
    assert_eq!(dom.text_content(container), "hi");

    // The portal itself occupies no slot among its siblings
    let main = dom.children(dom.body())[0];
    assert_eq!(dom.children(main).len(), 2);
}

#[test]
fn test_target_change_moves_the_same_container() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    renderer.update(&mut dom, Some(&page("#a", "hi")));
    let container = only_container(&renderer);
    let paragraph = dom.children(container)[0];

    let report = renderer.update(&mut dom, Some(&page("#b", "hi")));

    assert_eq!(only_container(&renderer), container);
    assert_eq!(dom.parent(container), Some(target(&dom, "b")));
    assert!(dom.children(target(&dom, "a")).is_empty());
    assert_eq!(dom.children(container), &[paragraph]);
    assert_eq!(report.stats.moved, 1);
    assert_eq!(report.stats.inserted, 0);
}

#[test]
fn test_unchanged_content_is_not_reconciled() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    renderer.update(&mut dom, Some(&page("#a", "hi")));

    let report = renderer.update(&mut dom, Some(&page("#a", "hi")));
    assert!(report.stats.is_empty());
    assert_eq!(report.portals_removed, 0);
}

#[test]
fn test_content_updates_inside_the_container() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    renderer.update(&mut dom, Some(&page("#a", "one")));
    let container = only_container(&renderer);
    let paragraph = dom.children(container)[0];

    let report = renderer.update(&mut dom, Some(&page("#a", "two")));

    assert_eq!(dom.children(container), &[paragraph]);
    assert_eq!(dom.text_content(paragraph), "two");
    assert_eq!(report.stats.text_writes, 1);
}

#[test]
fn test_portal_is_removed_with_its_owner() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    renderer.update(&mut dom, Some(&page("#a", "hi")));
    let container = only_container(&renderer);

    let report = renderer.update(&mut dom, Some(&VNode::element("main")));

    assert_eq!(report.portals_removed, 1);
    assert!(renderer.portals().is_empty());
    assert!(!dom.contains(container));
}

#[test]
fn test_unresolved_target_is_retried() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    let tree = |with_target: bool| {
        let mut main = VNode::element("main");
        if with_target {
            main = main.with_child(VNode::element("div").with_attr("id", "late"));
        }
        main.with_child(
            VNode::portal(PortalTarget::Selector("#late".into())).with_child(VNode::text("x")),
        )
    };

    let report = renderer.update(&mut dom, Some(&tree(false)));
    let warning = report
        .errors
        .iter()
        .find(|e| e.kind == ErrorKind::UnresolvedPortalTarget)
        .expect("unresolved target reported");
    assert_eq!(warning.context.path, vec![0, 0]);
    assert!(renderer.portals().is_empty());

    let report = renderer.update(&mut dom, Some(&tree(true)));
    assert!(report.errors.is_empty());
    let container = only_container(&renderer);
    assert_eq!(dom.parent(container), Some(target(&dom, "late")));
}

#[test]
fn test_replaced_target_gets_a_fresh_container() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    let tree = |tag: &str| {
        VNode::element("main").with_children([
            VNode::element(tag).with_attr("id", "a"),
            VNode::portal(PortalTarget::Selector("#a".into()))
                .with_child(VNode::element("p").with_text("hi")),
        ])
    };
    renderer.update(&mut dom, Some(&tree("div")));
    let first = only_container(&renderer);

    // The old target goes away with the container inside it
    for _ in 0..3 {
        let report = renderer.update(&mut dom, Some(&tree("section")));
        assert!(report.errors.is_empty(), "{:?}", report.errors);
    }

    assert!(!dom.contains(first));
    let container = only_container(&renderer);
    let section = target(&dom, "a");
    assert_eq!(dom.tag(section), Some("section"));
    assert_eq!(dom.parent(container), Some(section));
    assert_eq!(dom.text_content(container), "hi");

    let mut fresh = LiveDom::new();
    Renderer::default().update(&mut fresh, Some(&tree("section")));
    let options = HtmlOptions::default();
    assert_eq!(
        inner_html(&dom, dom.body(), &options),
        inner_html(&fresh, fresh.body(), &options)
    );
}

#[test]
fn test_explicit_id_and_stable_id_targets() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    let tree = VNode::element("main").with_children([
        VNode::element("aside").with_sid("sidebar"),
        VNode::portal(PortalTarget::StableId("sidebar".into()))
            .with_portal_id("menu")
            .with_child(VNode::element("nav")),
    ]);
    renderer.update(&mut dom, Some(&tree));

    let container = renderer.portals().container_for_id("menu").unwrap();
    let aside = dom.find_by_attribute(dom.body(), "data-node-id", "sidebar").unwrap();
    assert_eq!(dom.parent(container), Some(aside));
    assert_eq!(dom.attribute(container, "data-portal-container"), Some("menu"));
}

#[test]
fn test_exclude_portals_leaves_them_alone() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    let options = RenderOptions {
        exclude_portals: true,
        ..Default::default()
    };
    renderer.update_with(&mut dom, Some(&page("#a", "hi")), &options);
    assert!(renderer.portals().is_empty());

    renderer.update(&mut dom, Some(&page("#a", "hi")));
    let container = only_container(&renderer);

    renderer.update_with(&mut dom, Some(&page("#b", "changed")), &options);
    assert!(dom.contains(container));
    assert_eq!(dom.parent(container), Some(target(&dom, "a")));
    assert_eq!(dom.text_content(container), "hi");
    assert_eq!(renderer.portals().len(), 1);
}

#[test]
fn test_node_and_resolver_targets() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    let body = dom.body();
    let host = dom.create_element("section");
    dom.append_child(body, host).unwrap();
    let root = dom.create_element("div");
    dom.append_child(body, root).unwrap();
    renderer.mount(root);

    let tree = VNode::element("main").with_children([
        VNode::portal(PortalTarget::Node(host)).with_child(VNode::text("direct")),
        VNode::portal(PortalTarget::resolver(|dom: &LiveDom| {
            dom.children(dom.body()).first().copied()
        }))
        .with_child(VNode::text("resolved")),
    ]);
    renderer.update(&mut dom, Some(&tree));

    assert_eq!(renderer.portals().len(), 2);
    assert_eq!(dom.text_content(host), "directresolved");
    assert_eq!(dom.children(body), &[host, root]);
}

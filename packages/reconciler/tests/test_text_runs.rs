/// Text-run index over rendered content

use scribe_dom::{LiveDom, NodeId};
use scribe_reconciler::{binary_search_run, Renderer};
use scribe_vdom::VNode;

fn render_paragraph(dom: &mut LiveDom, renderer: &mut Renderer, tree: &VNode) -> NodeId {
    renderer.update(dom, Some(tree));
    dom.children(dom.body())[0]
}

#[test]
fn test_marks_split_one_logical_string() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    let tree = VNode::element("p")
        .with_child("Hello ")
        .with_child(VNode::element("strong").with_text("world"));
    let p = render_paragraph(&mut dom, &mut renderer, &tree);
    let strong = dom.children(p)[1];
    let world = dom.children(strong)[0];

    let runs = renderer.text_runs(&dom, p);
    assert_eq!(runs.total, 11);
    assert_eq!(runs.runs.len(), 2);

    let hit = binary_search_run(&runs.runs, 7).unwrap();
    assert_eq!(runs.runs[hit].node, world);
    assert_eq!(runs.locate(7), Some((world, 1)));
    assert_eq!(runs.locate(11), Some((world, 5)));
    assert_eq!(runs.offset_of(world, 2), Some(8));
}

#[test]
fn test_decorations_are_not_text() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    let tree = VNode::element("p").with_children([
        VNode::text("ab"),
        VNode::element("span")
            .with_attr("data-decoration", true)
            .with_text("widget"),
        VNode::text("cd"),
    ]);
    let p = render_paragraph(&mut dom, &mut renderer, &tree);

    let runs = renderer.text_runs(&dom, p);
    assert_eq!(runs.total, 4);
    assert_eq!(runs.runs[1].start, 2);
}

#[test]
fn test_render_invalidates_touched_containers() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    let p = render_paragraph(&mut dom, &mut renderer, &VNode::element("p").with_text("short"));
    assert_eq!(renderer.text_runs_for_id(&dom, "intro", p).total, 5);

    renderer.update(&mut dom, Some(&VNode::element("p").with_text("much longer")));
    assert!(renderer.cached_text_runs("intro").is_none());
    assert_eq!(renderer.text_runs(&dom, p).total, 11);
}

#[test]
fn test_out_of_band_writes_need_invalidation() {
    let mut dom = LiveDom::new();
    let mut renderer = Renderer::default();
    let p = render_paragraph(&mut dom, &mut renderer, &VNode::element("p").with_text("abc"));
    let text = dom.children(p)[0];
    assert_eq!(renderer.text_runs(&dom, p).total, 3);

    dom.set_text(text, "abcdef").unwrap();
    assert_eq!(renderer.text_runs(&dom, p).total, 3);

    assert_eq!(renderer.invalidate_text_runs(&dom, text), 1);
    assert_eq!(renderer.text_runs(&dom, p).total, 6);
}

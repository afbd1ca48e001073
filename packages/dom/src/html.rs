//! HTML serialization of live subtrees

use crate::live::{LiveDom, NodeData, NodeId};

/// Options for HTML serialization
#[derive(Debug, Clone)]
pub struct HtmlOptions {
    /// Pretty print with one element per line
    pub pretty: bool,
    /// Indentation string
    pub indent: String,
    /// Emit bound listeners as `data-on-*` attributes
    pub listeners: bool,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            indent: "  ".to_string(),
            listeners: false,
        }
    }
}

impl HtmlOptions {
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            ..Default::default()
        }
    }
}

struct Context<'a> {
    dom: &'a LiveDom,
    options: &'a HtmlOptions,
    depth: usize,
    buffer: String,
}

impl<'a> Context<'a> {
    fn new(dom: &'a LiveDom, options: &'a HtmlOptions) -> Self {
        Self {
            dom,
            options,
            depth: 0,
            buffer: String::new(),
        }
    }

    fn add(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn add_indent(&mut self) {
        if self.options.pretty {
            for _ in 0..self.depth {
                self.buffer.push_str(&self.options.indent);
            }
        }
    }

    fn newline(&mut self) {
        if self.options.pretty {
            self.buffer.push('\n');
        }
    }

    fn write_node(&mut self, id: NodeId) {
        let dom = self.dom;
        match dom.node(id) {
            Some(NodeData::Text(text)) => {
                self.add_indent();
                let escaped = escape_text(text);
                self.add(&escaped);
                self.newline();
            }
            Some(NodeData::Element(element)) => {
                self.add_indent();
                self.add(&format!("<{}", element.tag));
                for (name, value) in &element.attributes {
                    self.add(&format!(" {}", name));
                    if !value.is_empty() {
                        self.add(&format!("=\"{}\"", escape_attribute(value)));
                    }
                }
                if !element.style.is_empty() {
                    let style: Vec<String> = element
                        .style
                        .iter()
                        .map(|(k, v)| format!("{}: {}", k, v))
                        .collect();
                    self.add(&format!(" style=\"{}\"", escape_attribute(&style.join("; "))));
                }
                if self.options.listeners {
                    for (event, handler) in &element.listeners {
                        self.add(&format!(" data-on-{}=\"{}\"", event, escape_attribute(handler)));
                    }
                }

                let children = dom.children(id);
                if children.is_empty() && is_void(&element.tag) {
                    self.add(" />");
                    self.newline();
                    return;
                }
                self.add(">");

                let inline = children.iter().all(|c| dom.is_text(*c));
                if inline {
                    for child in children {
                        if let Some(text) = dom.text(*child) {
                            let escaped = escape_text(text);
                            self.add(&escaped);
                        }
                    }
                } else {
                    self.newline();
                    self.depth += 1;
                    for child in children {
                        self.write_node(*child);
                    }
                    self.depth -= 1;
                    self.add_indent();
                }
                self.add(&format!("</{}>", element.tag));
                self.newline();
            }
            None => {}
        }
    }
}

fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta"
            | "source" | "track" | "wbr"
    )
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

/// Serialize `node` and its subtree
pub fn to_html(dom: &LiveDom, node: NodeId, options: &HtmlOptions) -> String {
    let mut ctx = Context::new(dom, options);
    ctx.write_node(node);
    ctx.buffer
}

/// Serialize the children of `node`
pub fn inner_html(dom: &LiveDom, node: NodeId, options: &HtmlOptions) -> String {
    let mut ctx = Context::new(dom, options);
    for child in dom.children(node) {
        ctx.write_node(*child);
    }
    ctx.buffer
}

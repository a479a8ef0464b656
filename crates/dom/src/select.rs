use html5ever::tendril::StrTendril;
use html5ever::{Attribute as HtmlAttribute, LocalName, Namespace as NamespaceUrl, QualName};
use scraper::node::{Element, Text};
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::DomError;
use crate::node::{Document, Namespace, NodeData, NodeId};

fn parse_selector(selector: &str) -> Result<Selector, DomError> {
    Selector::parse(selector).map_err(|e| DomError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// HTML names are matched lower-cased, foreign names as written.
fn local_name(namespace: Namespace, name: &str) -> LocalName {
    match namespace {
        Namespace::Html => LocalName::from(name.to_ascii_lowercase()),
        _ => LocalName::from(name),
    }
}

impl Document {
    /// Elements under `roots` (the roots included) matching a CSS selector,
    /// in document order.
    ///
    /// Matching is delegated to `scraper`. The subtrees are copied node by
    /// node into a `scraper` tree without going through the HTML parser, so
    /// structure the parser would rewrite (a `div` inside a `p`, a `tr`
    /// directly under `table`) is matched as it is.
    pub fn select_in(&self, roots: &[NodeId], selector: &str) -> Result<Vec<NodeId>, DomError> {
        let selector = parse_selector(selector)?;
        let mut html = Html::new_fragment();
        let top = html.tree.root().id();
        let mut elements = Vec::new();
        let mut pending: Vec<_> = roots.iter().rev().map(|&n| (n, top)).collect();
        while let Some((node, parent)) = pending.pop() {
            let Some(value) = self.mirror(node) else {
                continue;
            };
            let Some(mut parent) = html.tree.get_mut(parent) else {
                continue;
            };
            let id = parent.append(value).id();
            if self.is_element(node) {
                elements.push((node, id));
                pending.extend(self.children(node).iter().rev().map(|&c| (c, id)));
            }
        }
        Ok(elements
            .into_iter()
            .filter(|&(_, id)| {
                html.tree
                    .get(id)
                    .and_then(ElementRef::wrap)
                    .map(|element| selector.matches(&element))
                    .unwrap_or(false)
            })
            .map(|(node, _)| node)
            .collect())
    }

    /// All matching elements in the document.
    pub fn select(&self, selector: &str) -> Result<Vec<NodeId>, DomError> {
        self.select_in(self.children(self.root()), selector)
    }

    /// First matching element in the document.
    pub fn select_first(&self, selector: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.select(selector)?.into_iter().next())
    }

    /// The `scraper` counterpart of one node. Comments are left out.
    fn mirror(&self, id: NodeId) -> Option<Node> {
        match self.data(id)? {
            NodeData::Element(e) => {
                let attributes = e
                    .attributes
                    .iter()
                    .map(|a| HtmlAttribute {
                        name: QualName::new(None, NamespaceUrl::from(""), local_name(e.namespace, &a.name)),
                        value: StrTendril::from(a.value.as_str()),
                    })
                    .collect();
                let name = QualName::new(
                    None,
                    NamespaceUrl::from(e.namespace.uri()),
                    local_name(e.namespace, &e.name),
                );
                Some(Node::Element(Element::new(name, attributes)))
            }
            NodeData::Text(t) => Some(Node::Text(Text {
                text: StrTendril::from(t.as_str()),
            })),
            NodeData::Comment(_) | NodeData::Document => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use crate::*;

    #[test]
    fn test_parse_and_serialize_fragment() {
        let doc = Document::parse_fragment(r#"<p class="lead">Count: 1</p><button>Go</button>"#);
        assert_eq!(doc.to_html(), r#"<p class="lead">Count: 1</p><button>Go</button>"#);
        assert_eq!(doc.children(doc.root()).len(), 2);
    }

    #[test]
    fn test_serialize_void_and_empty_attribute() {
        let doc = Document::parse_fragment(r#"<input disabled value="x"><br>"#);
        assert_eq!(doc.to_html(), r#"<input disabled value="x" /><br />"#);
    }

    #[test]
    fn test_serialize_escapes_text_and_attributes() {
        let mut doc = Document::new();
        let root = doc.root();
        let p = doc.create_element("p");
        doc.set_attribute(p, "title", "a \"b\" & <c>").unwrap();
        let t = doc.create_text("1 < 2 & 3 > 2");
        doc.append_child(p, t).unwrap();
        doc.append_child(root, p).unwrap();
        assert_eq!(
            doc.to_html(),
            r#"<p title="a &quot;b&quot; &amp; &lt;c&gt;">1 &lt; 2 &amp; 3 &gt; 2</p>"#
        );
    }

    #[test]
    fn test_parse_keeps_comments() {
        let doc = Document::parse_fragment("<div><!-- note -->x</div>");
        let div = doc.children(doc.root())[0];
        let comment = doc.children(div)[0];
        assert_eq!(doc.data(comment).map(NodeData::kind_name), Some("comment"));
        assert_eq!(doc.text(comment), Some(" note "));
    }

    #[test]
    fn test_parse_table_parts_in_context() {
        let doc = Document::parse_fragment("<tr><td>1</td><td>2</td></tr>");
        assert_eq!(doc.to_html(), "<tr><td>1</td><td>2</td></tr>");

        let doc = Document::parse_fragment("<td>only</td>");
        assert_eq!(doc.to_html(), "<td>only</td>");
    }

    #[test]
    fn test_parse_options_in_context() {
        let doc = Document::parse_fragment(r#"<option value="a">A</option><option value="b">B</option>"#);
        let roots = doc.children(doc.root());
        assert_eq!(roots.len(), 2);
        assert_eq!(doc.attribute(roots[1], "value"), Some("b"));
    }

    #[test]
    fn test_svg_namespace_inside_svg() {
        let doc = Document::parse_fragment(r#"<svg><circle r="4"></circle></svg>"#);
        let svg = doc.children(doc.root())[0];
        let circle = doc.children(svg)[0];
        let data = doc.element(circle).unwrap();
        assert_eq!(data.namespace, Namespace::Svg);
        assert!(!data.out_of_context);
    }

    #[test]
    fn test_svg_element_out_of_context() {
        let doc = Document::parse_fragment(r#"<circle r="4"></circle>"#);
        let circle = doc.children(doc.root())[0];
        let data = doc.element(circle).unwrap();
        assert_eq!(data.namespace, Namespace::Html);
        assert!(data.out_of_context);
    }

    #[test]
    fn test_insert_before_and_detach() {
        let mut doc = Document::parse_fragment("<ul><li>a</li><li>c</li></ul>");
        let ul = doc.children(doc.root())[0];
        let c = doc.children(ul)[1];
        let b = doc.create_element("li");
        let text = doc.create_text("b");
        doc.append_child(b, text).unwrap();
        doc.insert_before(ul, b, Some(c)).unwrap();
        assert_eq!(doc.to_html(), "<ul><li>a</li><li>b</li><li>c</li></ul>");

        doc.detach(c).unwrap();
        assert_eq!(doc.to_html(), "<ul><li>a</li><li>b</li></ul>");
        assert!(!doc.is_attached(c));
        assert_eq!(doc.text_content(c), "c");
    }

    #[test]
    fn test_insert_rejects_cycles() {
        let mut doc = Document::parse_fragment("<div><span></span></div>");
        let div = doc.children(doc.root())[0];
        let span = doc.children(div)[0];
        let err = doc.append_child(span, div).unwrap_err();
        assert!(matches!(err, DomError::InvalidInsertion { .. }));
    }

    #[test]
    fn test_insert_rejects_text_parent() {
        let mut doc = Document::new();
        let t = doc.create_text("x");
        let p = doc.create_element("p");
        assert!(doc.append_child(t, p).is_err());
    }

    #[test]
    fn test_set_text_on_element_fails() {
        let mut doc = Document::parse_fragment("<p>x</p>");
        let p = doc.children(doc.root())[0];
        assert_eq!(doc.set_text(p, "y"), Err(DomError::NotCharacterData(p)));
    }

    #[test]
    fn test_attribute_update_keeps_position() {
        let mut doc = Document::parse_fragment(r#"<a id="x" href="/">l</a>"#);
        let a = doc.children(doc.root())[0];
        doc.set_attribute(a, "id", "y").unwrap();
        assert_eq!(doc.outer_html(a), r#"<a id="y" href="/">l</a>"#);
        assert!(doc.remove_attribute(a, "id").unwrap());
        assert!(!doc.remove_attribute(a, "id").unwrap());
    }

    #[test]
    fn test_select_by_tag_class_and_attribute() {
        let doc = Document::parse_fragment(
            r#"<div><p class="a">1</p><p class="b">2</p><button disabled>x</button></div>"#,
        );
        assert_eq!(doc.select("p").unwrap().len(), 2);
        let b = doc.select_first("p.b").unwrap().unwrap();
        assert_eq!(doc.text_content(b), "2");
        let button = doc.select_first("button[disabled]").unwrap().unwrap();
        assert_eq!(doc.tag_name(button), Some("button"));
        assert!(doc.select_first("span").unwrap().is_none());
    }

    #[test]
    fn test_select_after_mutation() {
        let mut doc = Document::parse_fragment("<ul><li>a</li></ul>");
        let ul = doc.children(doc.root())[0];
        let li = doc.create_element("li");
        doc.set_attribute(li, "class", "new").unwrap();
        doc.append_child(ul, li).unwrap();
        assert_eq!(doc.select("li.new").unwrap(), vec![li]);

        doc.detach(li).unwrap();
        assert!(doc.select("li.new").unwrap().is_empty());
    }

    #[test]
    fn test_select_table_rows() {
        let doc = Document::parse_fragment("<tr><td>1</td></tr><tr><td>2</td></tr>");
        let cells = doc.select("td").unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(doc.text_content(cells[1]), "2");
    }

    fn build(doc: &mut Document, parent: NodeId, name: &str) -> NodeId {
        let node = doc.create_element(name);
        doc.append_child(parent, node).unwrap();
        node
    }

    #[test]
    fn test_select_keeps_built_structure() {
        let mut doc = Document::new();
        let root = doc.root();
        let p = build(&mut doc, root, "p");
        let div = build(&mut doc, p, "div");
        doc.set_attribute(div, "class", "x").unwrap();
        let table = build(&mut doc, root, "table");
        let tr = build(&mut doc, table, "tr");
        let td = build(&mut doc, tr, "td");

        assert_eq!(doc.select("p > div.x").unwrap(), vec![div]);
        assert_eq!(doc.select("table > tr").unwrap(), vec![tr]);
        assert_eq!(doc.select("tr > td").unwrap(), vec![td]);
        assert!(doc.select("tbody").unwrap().is_empty());
    }

    #[test]
    fn test_select_mixed_case_names() {
        let mut doc = Document::new();
        let root = doc.root();
        let button = build(&mut doc, root, "BUTTON");
        doc.set_attribute(button, "Disabled", "").unwrap();
        assert_eq!(doc.select("button[disabled]").unwrap(), vec![button]);
    }

    #[test]
    fn test_select_svg_children() {
        let doc = Document::parse_fragment(r#"<svg viewBox="0 0 8 8"><circle r="4"></circle></svg>"#);
        let circle = doc.select_first("svg > circle").unwrap().unwrap();
        assert_eq!(doc.attribute(circle, "r"), Some("4"));
    }

    #[test]
    fn test_release_reuses_slots() {
        let mut doc = Document::new();
        let root = doc.root();
        let ul = build(&mut doc, root, "ul");
        for _ in 0..50 {
            let items: Vec<_> = (0..10).map(|_| build(&mut doc, ul, "li")).collect();
            for item in items {
                doc.release(item).unwrap();
            }
        }
        assert_eq!(doc.slot_count(), 12);
        assert_eq!(doc.node_count(), 2);
        assert_eq!(doc.to_html(), "<ul></ul>");
    }

    #[test]
    fn test_release_frees_whole_subtree() {
        let mut doc = Document::parse_fragment("<div><b>x</b></div><i>y</i>");
        let div = doc.children(doc.root())[0];
        let b = doc.children(div)[0];
        doc.release(div).unwrap();
        assert!(!doc.contains(div));
        assert!(!doc.contains(b));
        assert_eq!(doc.node_count(), 3);
        assert_eq!(doc.to_html(), "<i>y</i>");
        assert!(matches!(doc.release(doc.root()), Err(DomError::ReleaseRoot)));
        assert!(matches!(doc.release(div), Err(DomError::UnknownNode(_))));
    }

    #[test]
    fn test_child_namespace() {
        assert_eq!(Namespace::Html.for_child("div", "svg"), Namespace::Svg);
        assert_eq!(Namespace::Svg.for_child("svg", "circle"), Namespace::Svg);
        assert_eq!(Namespace::Svg.for_child("foreignObject", "div"), Namespace::Html);
        assert_eq!(Namespace::Html.for_child("div", "circle"), Namespace::Html);
        assert_eq!(Namespace::Html.for_child("p", "math"), Namespace::MathMl);
        assert_eq!(Namespace::MathMl.for_child("math", "mi"), Namespace::MathMl);
        assert_eq!(Namespace::MathMl.for_child("mi", "b"), Namespace::Html);
    }

    #[test]
    fn test_invalid_selector() {
        let doc = Document::parse_fragment("<p></p>");
        assert!(matches!(
            doc.select("p[").unwrap_err(),
            DomError::InvalidSelector { .. }
        ));
    }

    #[test]
    fn test_extract_copies_unwired() {
        let mut doc = Document::parse_fragment("<div><b>x</b></div><i>y</i>");
        let owner: Rc<dyn Any> = Rc::new(1u8);
        doc.set_owner(Rc::downgrade(&owner));
        assert!(doc.is_wired());

        let div = doc.children(doc.root())[0];
        let copy = doc.extract(&[div]).unwrap();
        assert!(!copy.is_wired());
        assert_eq!(copy.to_html(), "<div><b>x</b></div>");
    }

    #[test]
    fn test_owner_dropped_unwires() {
        let mut doc = Document::new();
        let owner: Rc<dyn Any> = Rc::new(());
        doc.set_owner(Rc::downgrade(&owner));
        drop(owner);
        assert!(!doc.is_wired());
    }

    #[test]
    fn test_descendants_preorder() {
        let doc = Document::parse_fragment("<a><b><c></c></b><d></d></a>");
        let a = doc.children(doc.root())[0];
        let names: Vec<_> = doc
            .descendants(a)
            .into_iter()
            .filter_map(|n| doc.tag_name(n))
            .collect();
        assert_eq!(names, vec!["b", "c", "d"]);
    }
}

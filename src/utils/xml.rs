//! Minimal element tree over quick-xml events.
//!
//! The E-utilities fetch payloads vary a lot between records (inline markup in
//! titles, optional sections, identifiers in several places), so the adapters
//! read them through a small tree with path lookups instead of fixed serde
//! structs.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// A node in the parsed tree
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An XML element with its attributes and children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

/// Parse a document into a tree rooted at a synthetic `#document` element
pub fn parse(xml: &str) -> Result<XmlElement, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<XmlElement> = vec![XmlElement::named("#document")];

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => stack.push(element_from(e)),
            Event::Empty(ref e) => {
                let element = element_from(e);
                push_child(&mut stack, XmlNode::Element(element));
            }
            Event::End(_) => close_top(&mut stack),
            Event::Text(t) => {
                let text = match t.unescape() {
                    Ok(text) => text.into_owned(),
                    // Unknown entities (e.g. &nbsp;) are kept verbatim
                    Err(_) => String::from_utf8_lossy(&t).into_owned(),
                };
                push_child(&mut stack, XmlNode::Text(text));
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                push_child(&mut stack, XmlNode::Text(text));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    // Tolerate truncated documents
    while stack.len() > 1 {
        close_top(&mut stack);
    }
    Ok(stack.pop().unwrap_or_default())
}

fn element_from(start: &BytesStart<'_>) -> XmlElement {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let attributes = start
        .attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            (key, value)
        })
        .collect();
    XmlElement {
        name,
        attributes,
        children: Vec::new(),
    }
}

fn push_child(stack: &mut [XmlElement], node: XmlNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn close_top(stack: &mut Vec<XmlElement>) {
    if stack.len() > 1 {
        if let Some(done) = stack.pop() {
            push_child(stack, XmlNode::Element(done));
        }
    }
}

impl XmlElement {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Attribute value by local name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Direct child elements
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// First direct child element with the given name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    /// All descendant elements in document order, excluding `self`
    pub fn descendants(&self) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        for child in self.elements() {
            out.push(child);
            out.extend(child.descendants());
        }
        out
    }

    /// All elements matching `path` anywhere below `self`
    ///
    /// The first segment matches any descendant, following segments match
    /// direct children, so `"abstract/p"` finds every `<p>` directly inside
    /// any `<abstract>`.
    pub fn find_all(&self, path: &str) -> Vec<&XmlElement> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let Some(first) = segments.next() else {
            return Vec::new();
        };

        let mut current: Vec<&XmlElement> = self
            .descendants()
            .into_iter()
            .filter(|e| e.name == first)
            .collect();

        for segment in segments {
            current = current
                .into_iter()
                .flat_map(|e| e.elements().filter(move |c| c.name == segment))
                .collect();
        }
        current
    }

    /// First element matching `path`
    pub fn find(&self, path: &str) -> Option<&XmlElement> {
        self.find_all(path).into_iter().next()
    }

    /// Concatenated text of this element and all its descendants
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(e) => e.collect_text(out),
            }
        }
    }

    /// Flattened text with whitespace runs collapsed to single spaces
    pub fn clean_text(&self) -> String {
        collapse_whitespace(&self.text())
    }

    /// Cleaned text of the first element matching `path`, if non-empty
    pub fn find_text(&self, path: &str) -> Option<String> {
        self.find(path)
            .map(|e| e.clean_text())
            .filter(|t| !t.is_empty())
    }
}

/// Collapse every whitespace run into one space and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<!DOCTYPE root>
<root>
  <article>
    <title>On <i>E. coli</i> &amp; friends</title>
    <abstract>
      <p>First part.</p>
      <p>Second part.</p>
    </abstract>
    <id type="doi">10.1/x</id>
    <empty kind="flag"/>
  </article>
</root>"#;

    #[test]
    fn test_flattened_text_includes_inline_markup() {
        let root = parse(DOC).unwrap();
        assert_eq!(root.find_text("title").as_deref(), Some("On E. coli & friends"));
    }

    #[test]
    fn test_path_lookup() {
        let root = parse(DOC).unwrap();
        let paragraphs = root.find_all("abstract/p");
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[1].clean_text(), "Second part.");
        assert!(root.find("article/nothing").is_none());
    }

    #[test]
    fn test_attributes_and_empty_elements() {
        let root = parse(DOC).unwrap();
        let id = root.find("id").unwrap();
        assert_eq!(id.attr("type"), Some("doi"));
        assert_eq!(root.find("empty").and_then(|e| e.attr("kind")), Some("flag"));
    }
}

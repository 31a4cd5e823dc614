//! Lightweight element tree over WordprocessingML
//!
//! `word/document.xml` is parsed into a small tree whose elements remember
//! their byte ranges in the source text. Readers walk the tree; writers
//! splice new markup into exactly those ranges and leave every other byte
//! untouched.

use std::ops::Range;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::error::DocxResult;

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    /// Qualified name as written, e.g. `w:tc`
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    /// Whole element, start tag through end tag
    pub span: Range<usize>,
    /// Between the end of the start tag and the start of the end tag
    pub content: Range<usize>,
}

impl XmlElement {
    /// Name without its namespace prefix
    pub fn local(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn is(&self, local: &str) -> bool {
        self.local() == local
    }

    /// Attribute by local name
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.rsplit(':').next() == Some(local))
            .map(|(_, v)| v.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// Direct children with the given local name
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.is(local))
    }

    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.is(local))
    }

    /// `w:val` of a direct child property, e.g. `w:pStyle`
    pub fn child_val(&self, local: &str) -> Option<&str> {
        self.child(local).and_then(|c| c.attr("val"))
    }

    /// Concatenated character data of the subtree
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(el: &XmlElement, out: &mut String) {
    for child in &el.children {
        match child {
            XmlNode::Text(t) => out.push_str(t),
            XmlNode::Element(e) => collect_text(e, out),
        }
    }
}

/// Parse a document into its root element
pub fn parse(xml: &str) -> DocxResult<XmlElement> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let before = reader.buffer_position();
        let event = reader.read_event()?;
        let after = reader.buffer_position();

        match event {
            Event::Start(e) => {
                stack.push(XmlElement {
                    name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    attrs: attributes(&e)?,
                    children: Vec::new(),
                    span: before..after,
                    content: after..after,
                });
            }
            Event::Empty(e) => {
                let el = XmlElement {
                    name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    attrs: attributes(&e)?,
                    children: Vec::new(),
                    span: before..after,
                    content: after..after,
                };
                attach(&mut stack, &mut root, el);
            }
            Event::End(_) => {
                if let Some(mut el) = stack.pop() {
                    el.content = el.content.start..before;
                    el.span = el.span.start..after;
                    attach(&mut stack, &mut root, el);
                }
            }
            Event::Text(t) => {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(t.unescape()?.into_owned()));
                }
            }
            Event::CData(t) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(XmlNode::Text(String::from_utf8_lossy(&t).into_owned()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    root.ok_or_else(|| quick_xml::Error::UnexpectedEof("document has no root element".into()).into())
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, el: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(el)),
        None => {
            if root.is_none() {
                *root = Some(el);
            }
        }
    }
}

fn attributes(e: &quick_xml::events::BytesStart<'_>) -> DocxResult<Vec<(String, String)>> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::InvalidAttr)?;
        out.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            attr.unescape_value()?.into_owned(),
        ));
    }
    Ok(out)
}

/// Escape text for element content
pub fn escape(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}

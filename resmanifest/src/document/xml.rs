// XML parsing into raw trees and serialization of document forests

use super::DocumentNode;
use crate::config::INDENT_WIDTH;
use crate::error::{ManifestError, Result};
use crate::tree::RawNode;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// An element being read: its name, child fields so far, and any text.
struct Frame {
    name: String,
    children: Vec<(String, RawNode)>,
    text: String,
}

impl Frame {
    fn new(name: String) -> Self {
        Frame {
            name,
            children: Vec::new(),
            text: String::new(),
        }
    }

    fn add_child(&mut self, name: String, node: RawNode) {
        match self.children.iter_mut().find(|(k, _)| *k == name) {
            Some((_, RawNode::List(items))) => items.push(node),
            Some((_, existing)) => {
                let first = std::mem::replace(existing, RawNode::List(Vec::new()));
                *existing = RawNode::List(vec![first, node]);
            }
            None => self.children.push((name, node)),
        }
    }

    fn into_node(self) -> (String, RawNode) {
        // Whitespace-only text is indentation; anything else is kept verbatim.
        let has_text = !self.text.trim().is_empty();
        let node = if !self.children.is_empty() {
            if has_text {
                log::debug!("Dropping text mixed with child elements in <{}>", self.name);
            }
            RawNode::Map(self.children)
        } else if has_text {
            RawNode::Leaf(self.text)
        } else {
            RawNode::empty()
        };
        (self.name, node)
    }
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

/// Parse XML text into a raw tree whose top level maps each top-level
/// element name (normally just the root tag) to its content.
///
/// Returns `Ok(None)` when the text holds no element. Attributes,
/// comments, declarations and processing instructions are ignored. Leaf
/// text is kept exactly, surrounding whitespace included; an element whose
/// text is only whitespace reads as empty.
pub fn parse(text: &str, source_name: &str) -> Result<Option<RawNode>> {
    let failure = |reason: String| ManifestError::ParseFailure {
        source_name: source_name.to_string(),
        reason,
    };

    let mut reader = Reader::from_str(text);

    // The bottom frame stands for the document itself.
    let mut stack = vec![Frame::new(String::new())];

    loop {
        let event = reader.read_event().map_err(|e| {
            failure(format!("{e} at position {}", reader.buffer_position()))
        })?;
        match event {
            Event::Start(start) => stack.push(Frame::new(element_name(&start))),
            Event::Empty(start) => {
                let name = element_name(&start);
                if let Some(top) = stack.last_mut() {
                    top.add_child(name, RawNode::empty());
                }
            }
            Event::Text(t) => {
                let value = t.unescape().map_err(|e| failure(e.to_string()))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&value);
                }
            }
            Event::CData(c) => {
                let value = String::from_utf8_lossy(&c.into_inner()).into_owned();
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&value);
                }
            }
            Event::End(end) => {
                if stack.len() < 2 {
                    let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                    return Err(failure(format!("unexpected closing tag </{name}>")));
                }
                if let Some(frame) = stack.pop() {
                    let (name, node) = frame.into_node();
                    if let Some(parent) = stack.last_mut() {
                        parent.add_child(name, node);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() > 1 {
        let open = stack.last().map(|f| f.name.clone()).unwrap_or_default();
        return Err(failure(format!("unclosed element <{open}>")));
    }

    match stack.pop() {
        Some(document) if !document.children.is_empty() => {
            Ok(Some(RawNode::Map(document.children)))
        }
        _ => Ok(None),
    }
}

/// Serialize a document forest as indented XML, one element per line.
pub fn serialize(forest: &[DocumentNode]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT_WIDTH);
    for node in forest {
        write_node(&mut writer, node)?;
    }
    let mut out = String::from_utf8_lossy(&writer.into_inner()).into_owned();
    if !out.is_empty() {
        out.push('\n');
    }
    Ok(out)
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &DocumentNode) -> Result<()> {
    match node {
        DocumentNode::Element { name, children } if children.is_empty() => {
            writer.write_event(Event::Empty(BytesStart::new(name.as_str())))?;
        }
        DocumentNode::Element { name, children } => {
            writer.write_event(Event::Start(BytesStart::new(name.as_str())))?;
            for child in children {
                write_node(writer, child)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        }
        DocumentNode::Text(value) => {
            writer.write_event(Event::Text(BytesText::new(value)))?;
        }
    }
    Ok(())
}

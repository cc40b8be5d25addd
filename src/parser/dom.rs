//! Minimal element tree over quick-xml events.
//!
//! The result files use several historical tag spellings and nesting depths
//! for the same field, so extraction needs document-order descendant lookup
//! (the original tool leaned on `querySelector` for this). Attributes are
//! not modeled; none of the schemas carry data in them.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::ParseError;

/// Nesting guard against pathological inputs.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    fn new(name: String) -> Self {
        Self {
            name,
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// First descendant with the given tag name, preorder document order.
    /// Never matches `self`.
    pub fn find(&self, name: &str) -> Option<&XmlNode> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants with the given tag name, preorder document order.
    pub fn find_all(&self, name: &str) -> Vec<&XmlNode> {
        let mut out = Vec::new();
        self.collect_named(name, &mut out);
        out
    }

    fn collect_named<'a>(&'a self, name: &str, out: &mut Vec<&'a XmlNode>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            child.collect_named(name, out);
        }
    }

    /// Descendant lookup along a chain of tag names, e.g.
    /// `["Results", "score"]` finds a `score` anywhere under a `Results`.
    pub fn find_path(&self, path: &[&str]) -> Option<&XmlNode> {
        match path {
            [] => None,
            [name] => self.find(name),
            [first, rest @ ..] => self
                .find_all(first)
                .into_iter()
                .find_map(|node| node.find_path(rest)),
        }
    }

    /// Text content of the first non-empty match among alternative paths.
    /// Empty text does not satisfy a path; the next alternative is tried,
    /// matching the original's `a?.textContent || b?.textContent` chains.
    pub fn text_at(&self, paths: &[&[&str]]) -> Option<&str> {
        for path in paths {
            if let Some(node) = self.find_path(path) {
                let text = node.text.trim();
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
        None
    }

    /// Trimmed own text.
    pub fn text(&self) -> &str {
        self.text.trim()
    }
}

/// Parse XML text into an element tree rooted at the document element.
pub fn parse_document(xml: &str) -> Result<XmlNode, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(malformed(&reader, "element nesting too deep"));
                }
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                stack.push(XmlNode::new(name));
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let node = XmlNode::new(name);
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None if root.is_none() => {
                        root = Some(node);
                        break;
                    }
                    None => {}
                }
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| malformed(&reader, &e.to_string()))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                // quick-xml rejects mismatched end tags before we get here
                let node = match stack.pop() {
                    Some(node) => node,
                    None => return Err(malformed(&reader, "unexpected closing tag")),
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => {
                        root = Some(node);
                        break;
                    }
                }
            }
            Ok(Event::Eof) => {
                if !stack.is_empty() {
                    return Err(malformed(&reader, "unexpected end of document"));
                }
                break;
            }
            Err(e) => return Err(malformed(&reader, &e.to_string())),
            // Declarations, comments, processing instructions, doctypes
            Ok(_) => {}
        }
    }

    root.ok_or(ParseError::EmptyDocument)
}

fn malformed(reader: &Reader<&[u8]>, reason: &str) -> ParseError {
    ParseError::Malformed {
        position: reader.buffer_position() as u64,
        reason: reason.to_string(),
    }
}

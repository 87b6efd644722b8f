// ibfund/src/xml_tree.rs
// Navigable element tree over quick-xml.
//
// The extractor re-queries subtrees (e.g. line items keyed by a period end
// date discovered in a first pass), so report documents are folded into a
// tree once instead of being re-streamed per query. quick-xml does not
// resolve DTDs or external entities, which is what we want for third-party
// report payloads.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::base::FundError;

/// One XML element: tag name, attributes in document order, text content
/// and child elements in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlNode {
  pub name: String,
  pub attrs: Vec<(String, String)>,
  pub text: Option<String>,
  pub children: Vec<XmlNode>,
}

impl XmlNode {
  fn new(name: String) -> Self {
    XmlNode { name, attrs: Vec::new(), text: None, children: Vec::new() }
  }

  /// Parse a complete XML document into its root element.
  pub fn parse(xml: &str) -> Result<XmlNode, FundError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
      match reader.read_event_into(&mut buf) {
        Ok(Event::Start(e)) => {
          let node = node_from_start(&e)?;
          stack.push(node);
        }
        Ok(Event::Empty(e)) => {
          let node = node_from_start(&e)?;
          match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None if root.is_none() => root = Some(node),
            None => return Err(FundError::ParseError("Multiple XML root elements".into())),
          }
        }
        Ok(Event::Text(t)) => {
          let value = t
            .unescape()
            .map_err(|err| FundError::ParseError(format!("XML text unescape error: {}", err)))?;
          if let Some(node) = stack.last_mut() {
            match node.text.as_mut() {
              Some(existing) => existing.push_str(&value),
              None => node.text = Some(value.into_owned()),
            }
          }
        }
        Ok(Event::CData(t)) => {
          let value = String::from_utf8_lossy(t.as_ref()).into_owned();
          if let Some(node) = stack.last_mut() {
            match node.text.as_mut() {
              Some(existing) => existing.push_str(&value),
              None => node.text = Some(value),
            }
          }
        }
        Ok(Event::End(e)) => {
          let node = match stack.pop() {
            Some(n) => n,
            None => {
              return Err(FundError::ParseError(format!(
                "Unexpected closing tag </{}>",
                String::from_utf8_lossy(e.name().as_ref())
              )))
            }
          };
          if node.name.as_bytes() != e.name().as_ref() {
            return Err(FundError::ParseError(format!(
              "Mismatched closing tag </{}> for <{}>",
              String::from_utf8_lossy(e.name().as_ref()),
              node.name
            )));
          }
          match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None if root.is_none() => root = Some(node),
            None => return Err(FundError::ParseError("Multiple XML root elements".into())),
          }
        }
        Ok(Event::Eof) => break,
        Ok(_) => { /* declarations, comments, PIs */ }
        Err(err) => return Err(FundError::ParseError(format!("XML parsing error: {}", err))),
      }
      buf.clear();
    }

    if !stack.is_empty() {
      return Err(FundError::ParseError(format!(
        "Unclosed XML element <{}>",
        stack.last().map(|n| n.name.as_str()).unwrap_or("?")
      )));
    }
    root.ok_or_else(|| FundError::ParseError("Empty XML document".into()))
  }

  pub fn attr(&self, name: &str) -> Option<&str> {
    self.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
  }

  pub fn require_attr(&self, name: &str) -> Result<&str, FundError> {
    self.attr(name).ok_or_else(|| {
      FundError::ParseError(format!("<{}> missing required attribute '{}'", self.name, name))
    })
  }

  pub fn text(&self) -> Option<&str> {
    self.text.as_deref()
  }

  pub fn require_text(&self) -> Result<&str, FundError> {
    self
      .text()
      .ok_or_else(|| FundError::ParseError(format!("<{}> has no text content", self.name)))
  }

  /// Child elements with the given tag name, in document order.
  pub fn children_named<'a, 'n>(
    &'a self,
    name: &'n str,
  ) -> impl Iterator<Item = &'a XmlNode> + use<'a, 'n> {
    self.children.iter().filter(move |c| c.name == name)
  }

  /// First child element with the given tag name.
  pub fn find(&self, name: &str) -> Option<&XmlNode> {
    self.children_named(name).next()
  }

  /// Exactly one child element with the given tag name, otherwise a
  /// parse error. Used where the document schema promises a singleton.
  pub fn find_one(&self, name: &str) -> Result<&XmlNode, FundError> {
    let mut it = self.children_named(name);
    let first = it.next().ok_or_else(|| {
      FundError::ParseError(format!("<{}> has no <{}> child", self.name, name))
    })?;
    if it.next().is_some() {
      return Err(FundError::ParseError(format!(
        "<{}> has more than one <{}> child",
        self.name, name
      )));
    }
    Ok(first)
  }

  /// All descendant elements with the given tag name, depth-first in
  /// document order. The node itself is not considered.
  pub fn descendants<'a>(&'a self, name: &str) -> Vec<&'a XmlNode> {
    let mut found = Vec::new();
    self.collect_descendants(name, &mut found);
    found
  }

  fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlNode>) {
    for child in &self.children {
      if child.name == name {
        found.push(child);
      }
      child.collect_descendants(name, found);
    }
  }

  /// Elements reached by walking the given child-tag path from this node,
  /// in document order. `path(&["Issues", "Issue", "IssueID"])` matches
  /// every IssueID under every Issue under every Issues child.
  pub fn path<'a>(&'a self, names: &[&str]) -> Vec<&'a XmlNode> {
    let mut current: Vec<&XmlNode> = vec![self];
    for name in names {
      let mut next = Vec::new();
      for node in current {
        next.extend(node.children_named(name));
      }
      current = next;
    }
    current
  }

  /// Text content parsed as f64, failing loudly on missing or
  /// non-numeric text.
  pub fn parse_f64_text(&self) -> Result<f64, FundError> {
    let text = self.require_text()?;
    text.trim().parse::<f64>().map_err(|_| {
      FundError::ParseError(format!("<{}>: expected a number, got '{}'", self.name, text))
    })
  }

  pub fn parse_i64_text(&self) -> Result<i64, FundError> {
    let text = self.require_text()?;
    text.trim().parse::<i64>().map_err(|_| {
      FundError::ParseError(format!("<{}>: expected an integer, got '{}'", self.name, text))
    })
  }
}

fn node_from_start(e: &quick_xml::events::BytesStart) -> Result<XmlNode, FundError> {
  let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
  let mut node = XmlNode::new(name);
  for attr_result in e.attributes() {
    let attr = attr_result
      .map_err(|err| FundError::ParseError(format!("XML attribute parsing error: {}", err)))?;
    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
    let value = attr
      .unescape_value()
      .map_err(|err| FundError::ParseError(format!("Attribute value unescape error: {}", err)))?
      .into_owned();
    node.attrs.push((key, value));
  }
  Ok(node)
}

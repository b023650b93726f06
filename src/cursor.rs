// SPDX-License-Identifier: MIT
//
// Copyright 2025, The cellfeed authors.

//! A forward only cursor over an xml document
//!
//! [`XmlCursor`] sits on top of a `quick_xml` reader and remembers the last
//! event it stopped on, so callers can inspect the current element (its local
//! name or attributes) before moving on. Adjacent text, cdata and entity
//! events are merged into a single text event.

use std::io::BufRead;

use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::{Decoder, Reader as XmlReader};

use crate::feed::FeedError;
use crate::utils::trim_to_none;

/// Kind of node the cursor stopped on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorEvent {
    /// Start of an element
    Start,
    /// End of an element
    End,
    /// Text content
    Text,
}

#[derive(Debug)]
enum State {
    Initial,
    Start {
        name: String,
        attributes: Vec<(String, String)>,
    },
    End {
        name: String,
    },
    Text(String),
    Eof,
}

/// A pull cursor over xml elements
pub struct XmlCursor<R: BufRead> {
    xml: XmlReader<R>,
    buf: Vec<u8>,
    state: State,
    /// Event read past the end of a text run
    pending: Option<State>,
}

impl<R: BufRead> XmlCursor<R> {
    /// Creates a new cursor positioned before the first node
    pub fn new(reader: R) -> XmlCursor<R> {
        let mut xml = XmlReader::from_reader(reader);
        let config = xml.config_mut();
        config.check_end_names = false;
        config.trim_text(false);
        config.check_comments = false;
        config.expand_empty_elements = true;
        XmlCursor {
            xml,
            buf: Vec::with_capacity(1024),
            state: State::Initial,
            pending: None,
        }
    }

    /// Moves to the next start, end or text node
    ///
    /// Returns `None` once the document is exhausted.
    pub fn advance(&mut self) -> Result<Option<CursorEvent>, FeedError> {
        let next = match self.pending.take() {
            Some(state) => state,
            None => self.read_node()?,
        };
        self.state = match next {
            State::Text(mut text) => loop {
                match self.read_node()? {
                    State::Text(more) => text.push_str(&more),
                    other => {
                        self.pending = Some(other);
                        break State::Text(text);
                    }
                }
            },
            other => other,
        };
        Ok(match self.state {
            State::Start { .. } => Some(CursorEvent::Start),
            State::End { .. } => Some(CursorEvent::End),
            State::Text(_) => Some(CursorEvent::Text),
            State::Initial | State::Eof => None,
        })
    }

    /// Local name of the current start or end element
    pub fn local_name(&self) -> Option<&str> {
        match &self.state {
            State::Start { name, .. } | State::End { name } => Some(name),
            _ => None,
        }
    }

    /// Text of the current text node
    pub fn text(&self) -> Option<&str> {
        match &self.state {
            State::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Value of an attribute of the current start element
    ///
    /// The attribute local name is matched ignoring ascii case. The value is
    /// trimmed, blank values are reported as `None`.
    pub fn attribute(&self, name: &str) -> Option<String> {
        match &self.state {
            State::Start { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .and_then(|(_, v)| trim_to_none(v)),
            _ => None,
        }
    }

    /// Reads up to the next text node and returns it trimmed
    ///
    /// Returns `None` if an end element comes first or if the text is blank.
    pub fn text_trimmed(&mut self) -> Result<Option<String>, FeedError> {
        Ok(self.text_content()?.as_deref().and_then(trim_to_none))
    }

    /// Reads up to the next text node and returns it untouched
    ///
    /// Returns `None` if an end element comes first.
    pub fn text_content(&mut self) -> Result<Option<String>, FeedError> {
        while let Some(event) = self.advance()? {
            match event {
                CursorEvent::Text => return Ok(self.text().map(str::to_string)),
                CursorEvent::End => return Ok(None),
                CursorEvent::Start => (),
            }
        }
        Ok(None)
    }

    /// Moves to the next start element named `name`
    ///
    /// Stops and returns `false` if the end of `parent` is reached first.
    pub fn start_element(&mut self, name: &str, parent: Option<&str>) -> Result<bool, FeedError> {
        self.start_element_unless(name, parent, &[])
    }

    /// Moves to the next start element named `name`
    ///
    /// Stops and returns `false` if the end of `parent` or a start element
    /// named in `stops` is reached first. The cursor is left on that element.
    pub fn start_element_unless(
        &mut self,
        name: &str,
        parent: Option<&str>,
        stops: &[&str],
    ) -> Result<bool, FeedError> {
        while let Some(event) = self.advance()? {
            match (event, self.local_name()) {
                (CursorEvent::Start, Some(n)) if n == name => return Ok(true),
                (CursorEvent::Start, Some(n)) if stops.contains(&n) => return Ok(false),
                (CursorEvent::End, Some(n)) if parent == Some(n) => return Ok(false),
                _ => (),
            }
        }
        Ok(false)
    }

    /// Moves to the next end element named `name`
    pub fn end_element(&mut self, name: &str) -> Result<bool, FeedError> {
        while let Some(event) = self.advance()? {
            if event == CursorEvent::End && self.local_name() == Some(name) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn read_node(&mut self) -> Result<State, FeedError> {
        let decoder = self.xml.decoder();
        loop {
            self.buf.clear();
            return Ok(match self.xml.read_event_into(&mut self.buf)? {
                Event::Start(e) => start_state(&e, decoder)?,
                Event::End(e) => State::End {
                    name: decoder.decode(e.local_name().as_ref())?.into_owned(),
                },
                Event::Text(t) => State::Text(t.xml10_content()?.into_owned()),
                Event::CData(c) => State::Text(c.decode()?.into_owned()),
                Event::GeneralRef(r) => State::Text(resolve_entity(&r)?),
                Event::Eof => State::Eof,
                _ => continue,
            });
        }
    }
}

fn start_state(e: &BytesStart<'_>, decoder: Decoder) -> Result<State, FeedError> {
    let name = decoder.decode(e.local_name().as_ref())?.into_owned();
    let mut attributes = Vec::new();
    for a in e.attributes() {
        let a = a?;
        let key = decoder.decode(a.key.local_name().as_ref())?.into_owned();
        let raw = decoder.decode(&a.value)?;
        attributes.push((key, unescape(&raw)?.into_owned()));
    }
    Ok(State::Start { name, attributes })
}

fn resolve_entity(r: &BytesRef<'_>) -> Result<String, FeedError> {
    if let Some(c) = r.resolve_char_ref()? {
        return Ok(c.to_string());
    }
    let name = r.decode()?;
    match resolve_predefined_entity(&name) {
        Some(s) => Ok(s.to_string()),
        None => Err(FeedError::UnknownEntity(name.into_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<root xmlns:x="urn:x">
  <!-- comment -->
  <item ID=" 1 " x:kind="a&amp;b" blank="  ">first &lt;one&gt; &#x41;<![CDATA[<raw>]]></item>
  <group>
    <item id="2"/>
  </group>
  <item id="3">third</item>
  <tail/>
</root>"#;

    fn cursor() -> XmlCursor<&'static [u8]> {
        XmlCursor::new(DOC.as_bytes())
    }

    #[test]
    fn test_attributes() {
        let mut c = cursor();
        assert!(c.start_element("item", None).unwrap());
        assert_eq!(c.local_name(), Some("item"));
        assert_eq!(c.attribute("id"), Some("1".to_string()));
        assert_eq!(c.attribute("kind"), Some("a&b".to_string()));
        assert_eq!(c.attribute("blank"), None);
        assert_eq!(c.attribute("missing"), None);
    }

    #[test]
    fn test_text_is_merged() {
        let mut c = cursor();
        assert!(c.start_element("item", None).unwrap());
        assert_eq!(
            c.text_trimmed().unwrap(),
            Some("first <one> A<raw>".to_string())
        );
        // attribute lookups only apply to start elements
        assert_eq!(c.attribute("id"), None);
        assert_eq!(c.advance().unwrap(), Some(CursorEvent::End));
        assert_eq!(c.local_name(), Some("item"));
    }

    #[test]
    fn test_empty_element_has_no_text() {
        let mut c = cursor();
        assert!(c.start_element("group", None).unwrap());
        assert!(c.start_element("item", Some("group")).unwrap());
        assert_eq!(c.attribute("id"), Some("2".to_string()));
        assert_eq!(c.text_content().unwrap(), None);
        assert!(!c.start_element("item", Some("group")).unwrap());
        assert_eq!(c.local_name(), Some("group"));
    }

    #[test]
    fn test_start_element_unless() {
        let mut c = cursor();
        assert!(c.start_element("item", None).unwrap());
        assert!(!c.start_element_unless("item", Some("root"), &["group"]).unwrap());
        assert_eq!(c.local_name(), Some("group"));
        assert!(c.end_element("group").unwrap());
        assert!(c.start_element_unless("item", Some("root"), &["tail"]).unwrap());
        assert_eq!(c.attribute("id"), Some("3".to_string()));
        assert!(!c.start_element_unless("item", Some("root"), &["tail"]).unwrap());
        assert_eq!(c.local_name(), Some("tail"));
        assert!(!c.start_element("item", Some("root")).unwrap());
        assert_eq!(c.advance().unwrap(), None);
    }

    #[test]
    fn test_missing_element() {
        let mut c = cursor();
        assert!(!c.start_element("nothing", None).unwrap());
        assert_eq!(c.advance().unwrap(), None);
        assert!(!c.end_element("root").unwrap());
    }

    #[test]
    fn test_unknown_entity() {
        let mut c = XmlCursor::new(&b"<a>&nbsp;</a>"[..]);
        assert!(c.start_element("a", None).unwrap());
        match c.text_content() {
            Err(FeedError::UnknownEntity(e)) => assert_eq!(e, "nbsp"),
            r => panic!("unexpected result {r:?}"),
        }
    }
}

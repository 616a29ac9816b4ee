//! Path-dispatched XML pull parsing.
//!
//! [`PathDispatchParser`] pull-parses an XML stream while tracking the path of
//! open elements. When the path of a just-opened element exactly matches a
//! registered path, the handler is invoked once with an [`ElementCursor`]
//! scoped to that element's subtree. The handler consumes the subtree (the
//! cursor drains whatever it leaves behind) and the parser resumes after the
//! element without observing its end event.
//!
//! Dispatch is flat, not recursive: once an outer path fires, elements inside
//! that subtree are never dispatched separately, because the handler already
//! consumed them. Nested occurrences of the same tag at a different depth are
//! independent paths.
//!
//! Dispatch paths exclude the document root element, so
//! `"Build/SourceBasePath"` matches `<SourceBasePath>` inside `<Build>`
//! directly under the root, whatever the root is called.

use std::collections::HashMap;
use std::io::BufRead;

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;

use crate::error::{FprError, Result};
use crate::xml::tree::XmlElement;

/// Handler invoked once per matching path occurrence.
pub type Handler<'h, R> = Box<dyn FnMut(&mut ElementCursor<'_, R>) -> Result<()> + 'h>;

/// Pull parser dispatching on exact open-element paths.
pub struct PathDispatchParser<'h, R: BufRead> {
    handlers: HashMap<String, Handler<'h, R>>,
}

impl<'h, R: BufRead> Default for PathDispatchParser<'h, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'h, R: BufRead> PathDispatchParser<'h, R> {
    /// Create a parser with no registered handlers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for an exact element path.
    ///
    /// # Arguments
    /// * `path` - Slash-joined element names below the document root
    /// * `handler` - Invoked once per occurrence with a cursor scoped to the
    ///   matched element
    #[must_use]
    pub fn register(
        mut self,
        path: &str,
        handler: impl FnMut(&mut ElementCursor<'_, R>) -> Result<()> + 'h,
    ) -> Self {
        self.handlers.insert(path.to_string(), Box::new(handler));
        self
    }

    /// Parse one source to completion, dispatching registered handlers.
    ///
    /// May be invoked multiple times over independently-opened sources; no
    /// parser state carries across invocations.
    ///
    /// # Errors
    /// Malformed input fails with the byte position of the error. Any error
    /// raised inside a handler propagates and aborts the run.
    pub fn run(&mut self, source: R) -> Result<()> {
        let mut reader = Reader::from_reader(source);
        let mut buf = Vec::new();
        let mut stack: Vec<String> = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Err(source) => {
                    return Err(FprError::Xml {
                        position: reader.error_position() as u64,
                        source,
                    })
                }
                Ok(Event::Eof) => break,
                Ok(Event::Start(start)) => {
                    stack.push(local_name(&start));
                    if let Some(handler) = self.handlers.get_mut(&join_below_root(&stack)) {
                        let start = start.to_owned();
                        let mut cursor = ElementCursor::open(&mut reader, start);
                        handler(&mut cursor)?;
                        cursor.finish()?;
                        // The handler consumed the matching end event, so the
                        // element is popped here instead.
                        stack.pop();
                    }
                }
                Ok(Event::Empty(start)) => {
                    stack.push(local_name(&start));
                    if let Some(handler) = self.handlers.get_mut(&join_below_root(&stack)) {
                        let start = start.to_owned();
                        let mut cursor = ElementCursor::already_closed(&mut reader, start);
                        handler(&mut cursor)?;
                    }
                    stack.pop();
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(_) => {}
            }
            buf.clear();
        }

        Ok(())
    }
}

/// Cursor positioned at a just-opened element, scoped to its subtree.
///
/// Exactly one consuming read is meaningful per cursor; afterwards the
/// subtree is exhausted and [`ElementCursor::finish`] is a no-op.
pub struct ElementCursor<'r, R: BufRead> {
    reader: &'r mut Reader<R>,
    start: BytesStart<'static>,
    /// Open elements of the subtree still awaiting their end event,
    /// including the subtree root. Zero means fully consumed.
    depth: usize,
}

impl<'r, R: BufRead> ElementCursor<'r, R> {
    fn open(reader: &'r mut Reader<R>, start: BytesStart<'static>) -> Self {
        Self {
            reader,
            start,
            depth: 1,
        }
    }

    /// Cursor for a self-closing element; there is no subtree to consume.
    fn already_closed(reader: &'r mut Reader<R>, start: BytesStart<'static>) -> Self {
        Self {
            reader,
            start,
            depth: 0,
        }
    }

    /// Tag name of the element this cursor is scoped to.
    #[must_use]
    pub fn name(&self) -> String {
        String::from_utf8_lossy(self.start.local_name().as_ref()).into_owned()
    }

    /// Decode the whole subtree into an owned element tree.
    pub fn read_tree(&mut self) -> Result<XmlElement> {
        let root = element_from_start(&self.start)?;
        if self.depth == 0 {
            return Ok(root);
        }

        let mut path: Vec<XmlElement> = vec![root];
        let mut buf = Vec::new();
        loop {
            match self.reader.read_event_into(&mut buf) {
                Err(source) => return Err(self.xml_error(source)),
                Ok(Event::Start(start)) => {
                    self.depth += 1;
                    path.push(element_from_start(&start)?);
                }
                Ok(Event::Empty(start)) => {
                    let child = element_from_start(&start)?;
                    if let Some(parent) = path.last_mut() {
                        parent.children.push(child);
                    }
                }
                Ok(Event::End(_)) => {
                    self.depth -= 1;
                    match (path.pop(), path.last_mut()) {
                        (Some(done), Some(parent)) => parent.children.push(done),
                        (Some(done), None) => return Ok(done),
                        (None, _) => return Err(self.unexpected_eof()),
                    }
                }
                Ok(Event::Text(text)) => {
                    let decoded = decode_text(&text)?;
                    if let Some(current) = path.last_mut() {
                        current.text.push_str(&decoded);
                    }
                }
                Ok(Event::CData(cdata)) => {
                    if let Some(current) = path.last_mut() {
                        current
                            .text
                            .push_str(&String::from_utf8_lossy(cdata.as_ref()));
                    }
                }
                Ok(Event::Eof) => return Err(self.unexpected_eof()),
                Ok(_) => {}
            }
            buf.clear();
        }
    }

    /// Read the concatenated text content of the subtree, discarding element
    /// structure.
    pub fn read_text(&mut self) -> Result<String> {
        let mut out = String::new();
        let mut buf = Vec::new();
        while self.depth > 0 {
            match self.reader.read_event_into(&mut buf) {
                Err(source) => return Err(self.xml_error(source)),
                Ok(Event::Start(_)) => self.depth += 1,
                Ok(Event::End(_)) => self.depth -= 1,
                Ok(Event::Text(text)) => out.push_str(&decode_text(&text)?),
                Ok(Event::CData(cdata)) => {
                    out.push_str(&String::from_utf8_lossy(cdata.as_ref()));
                }
                Ok(Event::Eof) => return Err(self.unexpected_eof()),
                Ok(_) => {}
            }
            buf.clear();
        }
        Ok(out)
    }

    /// Consume whatever remains of the subtree.
    pub fn finish(&mut self) -> Result<()> {
        let mut buf = Vec::new();
        while self.depth > 0 {
            match self.reader.read_event_into(&mut buf) {
                Err(source) => return Err(self.xml_error(source)),
                Ok(Event::Start(_)) => self.depth += 1,
                Ok(Event::End(_)) => self.depth -= 1,
                Ok(Event::Eof) => return Err(self.unexpected_eof()),
                Ok(_) => {}
            }
            buf.clear();
        }
        Ok(())
    }

    fn xml_error(&self, source: quick_xml::Error) -> FprError {
        FprError::Xml {
            position: self.reader.error_position() as u64,
            source,
        }
    }

    fn unexpected_eof(&self) -> FprError {
        FprError::UnexpectedEof {
            position: self.reader.buffer_position() as u64,
        }
    }
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

/// Dispatch key for the current open-element stack: everything below the
/// document root, slash-joined.
fn join_below_root(stack: &[String]) -> String {
    match stack.len() {
        0 | 1 => String::new(),
        _ => stack[1..].join("/"),
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.local_name().as_ref()).into_owned());
    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attribute.value).into_owned();
        let value = unescape(&raw)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn decode_text(text: &BytesText<'_>) -> Result<String> {
    let raw = String::from_utf8_lossy(text.as_ref()).into_owned();
    Ok(unescape(&raw)?.into_owned())
}

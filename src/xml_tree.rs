use crate::err::{XmlResult, XmlStructureError};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// An owned XML element: name, attributes in document order, and child elements.
///
/// Text content is not kept, usagestats XML stores everything in attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Parses `bytes` into a single element tree.
///
/// Fails unless the input is exactly one well-formed root element, optionally surrounded by
/// a declaration, comments, processing instructions or whitespace.
pub fn parse_tree(bytes: &[u8]) -> XmlResult<XmlElement> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| XmlStructureError::syntax(e, reader.error_position()))?;

        match event {
            Event::Start(start) => {
                let element = element_from_start(&start, position)?;
                if stack.is_empty() && root.is_some() {
                    return Err(XmlStructureError::MultipleRootElements {
                        name: element.name,
                        position,
                    });
                }
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = element_from_start(&start, position)?;
                attach(&mut stack, &mut root, element, position)?;
            }
            Event::End(end) => {
                let found = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                let element = stack.pop().ok_or_else(|| XmlStructureError::MismatchedEndTag {
                    expected: String::new(),
                    found: found.clone(),
                })?;
                if element.name != found {
                    return Err(XmlStructureError::MismatchedEndTag {
                        expected: element.name,
                        found,
                    });
                }
                attach(&mut stack, &mut root, element, position)?;
            }
            Event::Text(text) => {
                if stack.is_empty() && !text.iter().all(u8::is_ascii_whitespace) {
                    return Err(XmlStructureError::TextOutsideRoot { position });
                }
            }
            Event::CData(_) => {
                if stack.is_empty() {
                    return Err(XmlStructureError::TextOutsideRoot { position });
                }
            }
            Event::Eof => break,
            _ => {}
        }

        buf.clear();
    }

    if let Some(open) = stack.pop() {
        return Err(XmlStructureError::UnclosedElement { name: open.name });
    }

    root.ok_or(XmlStructureError::NoRootElement)
}

fn element_from_start(start: &BytesStart<'_>, position: u64) -> XmlResult<XmlElement> {
    let name = utf8(start.name().as_ref(), position)?;

    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| XmlStructureError::syntax(e, position))?;
        let key = utf8(attribute.key.as_ref(), position)?;
        let value = attribute
            .unescape_value()
            .map_err(|e| XmlStructureError::syntax(e, position))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
    position: u64,
) -> XmlResult<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(XmlStructureError::MultipleRootElements {
                name: element.name,
                position,
            });
        }
    }
    Ok(())
}

fn utf8(bytes: &[u8], position: u64) -> XmlResult<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| XmlStructureError::InvalidUtf8 { position })
}

//! Namespace-tolerant parsing of legacy XML API responses.
//!
//! Veracode wraps most responses in a default namespace
//! (`xmlns="https://analysiscenter.veracode.com/schema/..."`) but older
//! endpoints and proxies may strip it. [`XmlDocument`] parses the body once,
//! derives the namespace mapping from the root element and answers element
//! queries through that mapping, so callers never branch on the response shape.

use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

use crate::VeracodeError;

/// One element of a parsed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Local name without any prefix
    pub name: String,
    /// Resolved namespace URI, if the element is qualified
    pub namespace: Option<String>,
    /// Attributes in document order, namespace declarations excluded
    pub attributes: Vec<(String, String)>,
    /// Concatenated character data directly inside the element
    pub text: String,
}

impl XmlElement {
    /// Attribute value by name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attribute value by name, empty when absent.
    #[must_use]
    pub fn attr_or_empty(&self, name: &str) -> &str {
        self.attr(name).unwrap_or_default()
    }

    /// Element name in Clark notation (`{uri}local`).
    #[must_use]
    pub fn clark_name(&self) -> String {
        match &self.namespace {
            Some(uri) => format!("{{{uri}}}{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// A parsed response: the root plus every element in document order.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    /// All elements, `elements[0]` is the root
    elements: Vec<XmlElement>,
}

impl XmlDocument {
    /// Parse a response body.
    ///
    /// # Errors
    ///
    /// Returns [`VeracodeError::XmlParse`] for malformed XML or an empty document.
    pub fn parse(xml: &str) -> Result<Self, VeracodeError> {
        Self::parse_bytes(xml.as_bytes())
    }

    /// Parse a response body as received on the wire.
    ///
    /// Names and values that are not valid UTF-8 are decoded lossily; the
    /// caller keeps the original bytes if it needs them verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`VeracodeError::XmlParse`] for malformed XML or an empty document.
    pub fn parse_bytes(xml: &[u8]) -> Result<Self, VeracodeError> {
        let mut reader = NsReader::from_reader(xml);
        reader.config_mut().trim_text(false);

        let mut buf = Vec::new();
        let mut elements: Vec<XmlElement> = Vec::new();
        // Indices into `elements` of currently open elements
        let mut open: Vec<usize> = Vec::new();

        loop {
            {
                let (resolved, event) = reader
                    .read_resolved_event_into(&mut buf)
                    .map_err(|e| VeracodeError::XmlParse(e.to_string()))?;

                match event {
                    Event::Start(ref e) => {
                        ensure_single_root(&open, &elements)?;
                        elements.push(Self::read_element(resolved, e)?);
                        open.push(elements.len().saturating_sub(1));
                    }
                    Event::Empty(ref e) => {
                        ensure_single_root(&open, &elements)?;
                        elements.push(Self::read_element(resolved, e)?);
                    }
                    Event::End(_) => {
                        open.pop();
                    }
                    Event::Text(ref e) => {
                        if let Some(&index) = open.last() {
                            elements[index].text.push_str(&String::from_utf8_lossy(e));
                        }
                    }
                    Event::CData(ref e) => {
                        if let Some(&index) = open.last() {
                            elements[index].text.push_str(&String::from_utf8_lossy(e));
                        }
                    }
                    Event::GeneralRef(ref e) => {
                        if let Some(&index) = open.last() {
                            let name = String::from_utf8_lossy(e).into_owned();
                            let text = &mut elements[index].text;
                            if let Ok(Some(ch)) = e.resolve_char_ref() {
                                text.push(ch);
                            } else if let Some(value) = resolve_predefined_entity(&name) {
                                text.push_str(value);
                            } else {
                                text.push('&');
                                text.push_str(&name);
                                text.push(';');
                            }
                        }
                    }
                    Event::Eof => break,
                    _ => {}
                }
            }
            buf.clear();
        }

        if elements.is_empty() {
            return Err(VeracodeError::XmlParse(
                "response contains no root element".to_string(),
            ));
        }
        if !open.is_empty() {
            return Err(VeracodeError::XmlParse(
                "unexpected end of document".to_string(),
            ));
        }

        for element in &mut elements {
            element.text = element.text.trim().to_string();
        }

        Ok(Self { elements })
    }

    /// Build an element from a start tag and its resolved namespace.
    fn read_element(
        resolved: ResolveResult<'_>,
        e: &BytesStart<'_>,
    ) -> Result<XmlElement, VeracodeError> {
        let namespace = match resolved {
            ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
            ResolveResult::Unbound => None,
            ResolveResult::Unknown(prefix) => {
                return Err(VeracodeError::XmlParse(format!(
                    "unbound namespace prefix '{}'",
                    String::from_utf8_lossy(&prefix)
                )));
            }
        };

        let mut attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| VeracodeError::XmlParse(err.to_string()))?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let raw = String::from_utf8_lossy(&attr.value).into_owned();
            let value = unescape(&raw)
                .map_err(|err| VeracodeError::XmlParse(format!("attribute '{key}': {err}")))?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(XmlElement {
            name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
            namespace,
            attributes,
            text: String::new(),
        })
    }

    /// The root element.
    #[must_use]
    pub fn root(&self) -> &XmlElement {
        // parse() guarantees at least one element
        &self.elements[0]
    }

    /// Namespace URI of the root element, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.root().namespace.as_deref()
    }

    /// Render a local name in Clark notation under the root namespace.
    #[must_use]
    pub fn clark_name(&self, local: &str) -> String {
        match self.namespace() {
            Some(uri) => format!("{{{uri}}}{local}"),
            None => local.to_string(),
        }
    }

    /// All descendants of the root named `local`, in document order.
    ///
    /// Elements qualified with the root namespace are preferred; when the
    /// root is unqualified or nothing qualified matches, unqualified elements
    /// are returned instead.
    #[must_use]
    pub fn find_all(&self, local: &str) -> Vec<&XmlElement> {
        let descendants = || self.elements.iter().skip(1).filter(|e| e.name == local);

        if let Some(uri) = self.namespace() {
            let qualified: Vec<&XmlElement> = descendants()
                .filter(|e| e.namespace.as_deref() == Some(uri))
                .collect();
            if !qualified.is_empty() {
                return qualified;
            }
        }

        descendants().filter(|e| e.namespace.is_none()).collect()
    }

    /// First descendant named `local`, see [`XmlDocument::find_all`].
    #[must_use]
    pub fn find_first(&self, local: &str) -> Option<&XmlElement> {
        self.find_all(local).into_iter().next()
    }

    /// Fail when the server answered with an `<error>` document.
    ///
    /// # Errors
    ///
    /// Returns [`VeracodeError::Api`] carrying the error text.
    pub fn check_api_error(&self) -> Result<(), VeracodeError> {
        let root = self.root();
        if root.name == "error" {
            let message = if root.text.is_empty() {
                "unspecified error".to_string()
            } else {
                root.text.clone()
            };
            return Err(VeracodeError::Api(message));
        }
        Ok(())
    }
}

fn ensure_single_root(open: &[usize], elements: &[XmlElement]) -> Result<(), VeracodeError> {
    if open.is_empty() && !elements.is_empty() {
        return Err(VeracodeError::XmlParse("multiple root elements".to_string()));
    }
    Ok(())
}

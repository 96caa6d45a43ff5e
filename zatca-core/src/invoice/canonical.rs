//! Canonical XML 1.1 (`http://www.w3.org/2006/12/xml-c14n11`, without comments).
//!
//! [`invoice_hash_input`] applies the three XPath exclusions of the invoice `ds:Reference`
//! before serializing:
//!
//! * `ext:UBLExtensions`
//! * `cac:Signature`
//! * the `cac:AdditionalDocumentReference` whose `cbc:ID` is `QR`
//!
//! Removal unlinks the element only; whitespace text around it is kept, as an XPath node-set
//! filter does.
use super::xml::constants::{CAC_NS, CBC_NS, EXT_NS};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;
use thiserror::Error;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Error)]
pub enum CanonicalizationError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed XML: {0}")]
    Malformed(String),
    #[error("XML is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("namespace prefix `{0}` is not declared")]
    UnboundPrefix(String),
    #[error("document has no root element")]
    MissingRoot,
    #[error("unexpected content outside the root element")]
    ContentOutsideRoot,
}

type Result<T> = std::result::Result<T, CanonicalizationError>;

#[derive(Debug)]
enum Node {
    Element(Element),
    Text(String),
    Pi { target: String, data: String },
}

#[derive(Debug, Default)]
struct Element {
    name: String,
    namespaces: Vec<(String, String)>,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn prefix(&self) -> &str {
        split_qname(&self.name).0
    }

    fn local_name(&self) -> &str {
        split_qname(&self.name).1
    }

    /// String value of the first text child, the way `text()` selects it.
    fn first_text(&self) -> Option<&str> {
        self.children.iter().find_map(|child| match child {
            Node::Text(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug)]
struct Document {
    before: Vec<Node>,
    root: Element,
    after: Vec<Node>,
}

/// In-scope namespace bindings, prefix `""` being the default namespace.
type Scope = BTreeMap<String, String>;

fn split_qname(name: &str) -> (&str, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (prefix, local),
        None => ("", name),
    }
}

fn extend_scope(parent: &Scope, element: &Element) -> Scope {
    let mut scope = parent.clone();
    for (prefix, uri) in &element.namespaces {
        scope.insert(prefix.clone(), uri.clone());
    }
    scope
}

fn resolve<'s>(scope: &'s Scope, prefix: &str) -> Result<&'s str> {
    match scope.get(prefix) {
        Some(uri) => Ok(uri.as_str()),
        None if prefix.is_empty() => Ok(""),
        None if prefix == "xml" => Ok(XML_NS),
        None => Err(CanonicalizationError::UnboundPrefix(prefix.to_string())),
    }
}

/// `\r\n` and lone `\r` become `\n`, as an XML processor reports them.
fn normalize_line_endings(raw: &str) -> String {
    raw.replace("\r\n", "\n").replace('\r', "\n")
}

fn unescape(raw: &str) -> Result<String> {
    quick_xml::escape::unescape(raw)
        .map(|value| value.into_owned())
        .map_err(|e| CanonicalizationError::Malformed(e.to_string()))
}

fn parse_start(start: &BytesStart<'_>) -> Result<Element> {
    let name = std::str::from_utf8(start.name().as_ref())?.to_string();
    let mut element = Element {
        name,
        ..Element::default()
    };
    for attr in start.attributes() {
        let attr = attr.map_err(|e| CanonicalizationError::Malformed(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let raw = normalize_line_endings(std::str::from_utf8(&attr.value)?);
        // Attribute-value normalization: literal whitespace becomes a space, references do not.
        let raw = raw.replace(['\n', '\t'], " ");
        let value = unescape(&raw)?;
        if key == "xmlns" {
            element.namespaces.push((String::new(), value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            element.namespaces.push((prefix.to_string(), value));
        } else {
            element.attributes.push((key, value));
        }
    }
    Ok(element)
}

fn parse(xml: &str) -> Result<Document> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = true;

    let mut stack: Vec<Element> = Vec::new();
    let mut before = Vec::new();
    let mut after = Vec::new();
    let mut root: Option<Element> = None;

    fn attach(stack: &mut [Element], node: Node) -> bool {
        match stack.last_mut() {
            Some(parent) => {
                parent.children.push(node);
                true
            }
            None => false,
        }
    }

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(CanonicalizationError::ContentOutsideRoot);
                }
                stack.push(parse_start(&start)?);
            }
            Event::Empty(start) => {
                if root.is_some() {
                    return Err(CanonicalizationError::ContentOutsideRoot);
                }
                let element = parse_start(&start)?;
                if stack.is_empty() {
                    root = Some(element);
                } else {
                    attach(&mut stack, Node::Element(element));
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| CanonicalizationError::Malformed("unbalanced end tag".into()))?;
                if stack.is_empty() {
                    root = Some(element);
                } else {
                    attach(&mut stack, Node::Element(element));
                }
            }
            Event::Text(text) => {
                let raw = normalize_line_endings(std::str::from_utf8(&text)?);
                if stack.is_empty() {
                    if !raw.trim().is_empty() {
                        return Err(CanonicalizationError::ContentOutsideRoot);
                    }
                    continue;
                }
                let value = unescape(&raw)?;
                attach(&mut stack, Node::Text(value));
            }
            Event::CData(cdata) => {
                let value = normalize_line_endings(std::str::from_utf8(&cdata)?);
                if !attach(&mut stack, Node::Text(value)) {
                    return Err(CanonicalizationError::ContentOutsideRoot);
                }
            }
            Event::PI(pi) => {
                let raw = std::str::from_utf8(&pi)?;
                let (target, data) = match raw.split_once(|c: char| c.is_ascii_whitespace()) {
                    Some((target, data)) => (target.to_string(), data.trim_start().to_string()),
                    None => (raw.to_string(), String::new()),
                };
                let node = Node::Pi { target, data };
                if !stack.is_empty() {
                    attach(&mut stack, node);
                } else if root.is_none() {
                    before.push(node);
                } else {
                    after.push(node);
                }
            }
            // Declaration, doctype and comments have no canonical form.
            Event::Decl(_) | Event::DocType(_) | Event::Comment(_) => {}
            Event::Eof => break,
        }
    }

    if !stack.is_empty() {
        return Err(CanonicalizationError::Malformed("unclosed element".into()));
    }
    let root = root.ok_or(CanonicalizationError::MissingRoot)?;
    Ok(Document {
        before,
        root,
        after,
    })
}

fn is_excluded(element: &Element, scope: &Scope) -> Result<bool> {
    let uri = resolve(scope, element.prefix())?;
    Ok(match (uri, element.local_name()) {
        (EXT_NS, "UBLExtensions") => true,
        (CAC_NS, "Signature") => true,
        (CAC_NS, "AdditionalDocumentReference") => {
            let mut is_qr = false;
            for child in &element.children {
                if let Node::Element(child) = child {
                    let child_scope = extend_scope(scope, child);
                    if resolve(&child_scope, child.prefix())? == CBC_NS
                        && child.local_name() == "ID"
                    {
                        let id = child.first_text().unwrap_or_default();
                        is_qr = id.split_whitespace().collect::<Vec<_>>().join(" ") == "QR";
                        break;
                    }
                }
            }
            is_qr
        }
        _ => false,
    })
}

fn prune(element: &mut Element, scope: &Scope) -> Result<usize> {
    let mut removed = 0;
    let children = std::mem::take(&mut element.children);
    for child in children {
        match child {
            Node::Element(mut child) => {
                let child_scope = extend_scope(scope, &child);
                if is_excluded(&child, &child_scope)? {
                    removed += 1;
                    continue;
                }
                removed += prune(&mut child, &child_scope)?;
                element.children.push(Node::Element(child));
            }
            other => element.children.push(other),
        }
    }
    Ok(removed)
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            c => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            c => out.push(c),
        }
    }
}

fn write_pi(target: &str, data: &str, out: &mut String) {
    out.push_str("<?");
    out.push_str(target);
    if !data.is_empty() {
        out.push(' ');
        out.push_str(data);
    }
    out.push_str("?>");
}

fn write_element(element: &Element, parent_scope: &Scope, out: &mut String) -> Result<()> {
    let scope = extend_scope(parent_scope, element);
    resolve(&scope, element.prefix())?;

    // Only declarations that change the binding inherited from the parent are rendered.
    let mut namespaces: Vec<(&str, &str)> = element
        .namespaces
        .iter()
        .filter(|(prefix, uri)| {
            let inherited = parent_scope.get(prefix.as_str()).map(String::as_str);
            if prefix.is_empty() {
                inherited.unwrap_or("") != uri.as_str()
            } else {
                !uri.is_empty() && inherited != Some(uri.as_str())
            }
        })
        .map(|(prefix, uri)| (prefix.as_str(), uri.as_str()))
        .collect();
    namespaces.sort_by(|a, b| a.0.cmp(b.0));
    namespaces.dedup_by(|a, b| a.0 == b.0);

    let mut attributes = Vec::with_capacity(element.attributes.len());
    for (name, value) in &element.attributes {
        let (prefix, local) = split_qname(name);
        let uri = if prefix.is_empty() {
            ""
        } else {
            resolve(&scope, prefix)?
        };
        attributes.push((uri, local, name.as_str(), value.as_str()));
    }
    attributes.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    out.push('<');
    out.push_str(&element.name);
    for (prefix, uri) in namespaces {
        if prefix.is_empty() {
            out.push_str(" xmlns=\"");
        } else {
            out.push_str(" xmlns:");
            out.push_str(prefix);
            out.push_str("=\"");
        }
        escape_attribute(uri, out);
        out.push('"');
    }
    for (_, _, name, value) in attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attribute(value, out);
        out.push('"');
    }
    out.push('>');

    for child in &element.children {
        match child {
            Node::Element(child) => write_element(child, &scope, out)?,
            Node::Text(text) => escape_text(text, out),
            Node::Pi { target, data } => write_pi(target, data, out),
        }
    }

    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
    Ok(())
}

fn serialize(document: &Document) -> Result<String> {
    let mut out = String::with_capacity(4096);
    for node in &document.before {
        if let Node::Pi { target, data } = node {
            write_pi(target, data, &mut out);
            out.push('\n');
        }
    }
    write_element(&document.root, &Scope::new(), &mut out)?;
    for node in &document.after {
        if let Node::Pi { target, data } = node {
            out.push('\n');
            write_pi(target, data, &mut out);
        }
    }
    Ok(out)
}

/// Canonicalize a whole document.
///
/// # Examples
/// ```rust
/// use zatca_core::invoice::canonical::canonicalize;
///
/// let xml = "<?xml version=\"1.0\"?>\n<a b='2' a='1'><!-- note --><c/></a>";
/// assert_eq!(canonicalize(xml)?, "<a a=\"1\" b=\"2\"><c></c></a>");
/// # Ok::<(), zatca_core::invoice::canonical::CanonicalizationError>(())
/// ```
pub fn canonicalize(xml: &str) -> Result<String> {
    serialize(&parse(xml)?)
}

/// Bytes that are hashed for the invoice `ds:Reference`: the document without the signature
/// extension, the `cac:Signature` element and the QR reference, canonicalized.
///
/// # Errors
/// Fails when the XML is malformed or uses an undeclared prefix.
pub fn invoice_hash_input(xml: &str) -> Result<String> {
    let mut document = parse(xml)?;
    let scope = extend_scope(&Scope::new(), &document.root);
    let removed = prune(&mut document.root, &scope)?;
    tracing::debug!(removed, "excluded signature and QR subtrees from invoice hash input");
    serialize(&document)
}

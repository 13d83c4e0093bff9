//! Minimal XMP metadata model
//!
//! This module provides just enough of an XMP toolkit to carry simple
//! (string-valued) properties between an RDF/XML packet and Rust code.
//!
//! XMP Structure:
//! - XMP packets are XML-based RDF metadata inside `x:xmpmeta` / `rdf:RDF`
//! - Properties can be attributes on rdf:Description or child elements
//! - Structured values (arrays, structs, qualifiers) are not modelled and are
//!   skipped when parsing

use crate::{
    error::{Error, Result},
    namespace::{self, ADOBE_META_NAMESPACE, HAS_EXTENDED_XMP, RDF_NAMESPACE, XMP_NOTE_NAMESPACE},
};
use quick_xml::{
    escape::unescape,
    events::{BytesEnd, BytesStart, BytesText, Event},
    name::QName,
    Reader, Writer,
};
use std::collections::{BTreeMap, HashMap};

const PACKET_BEGIN: &str = "<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>";
const PACKET_END: &str = "<?xpacket end=\"w\"?>";
const TOOLKIT: &str = concat!("jpeg-xmp-io ", env!("CARGO_PKG_VERSION"));

/// Options controlling [`XmpMeta::serialize`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Write properties as `rdf:Description` attributes, without indentation
    pub use_compact_format: bool,
    /// Leave out the `<?xpacket ...?>` begin/end processing instructions
    pub omit_packet_wrapper: bool,
}

impl SerializeOptions {
    /// Expanded form with packet wrapper (same as `default()`)
    pub fn new() -> Self {
        Self::default()
    }

    /// Options used for packets embedded in JPEG segments
    ///
    /// Compact, and without the packet wrapper: some XML parsers reject the
    /// wrapper's closing processing instruction.
    pub fn embedding() -> Self {
        Self::new().compact(true).omit_packet_wrapper(true)
    }

    /// Set compact (attribute) form
    pub fn compact(mut self, compact: bool) -> Self {
        self.use_compact_format = compact;
        self
    }

    /// Set whether the packet wrapper is left out
    pub fn omit_packet_wrapper(mut self, omit: bool) -> Self {
        self.omit_packet_wrapper = omit;
        self
    }
}

/// An XMP property tree holding simple properties
///
/// Properties are keyed by namespace URI and property name; iteration order
/// is sorted, which keeps serialization deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmpMeta {
    properties: BTreeMap<String, BTreeMap<String, String>>,
}

impl XmpMeta {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, replacing any previous value
    ///
    /// The namespace must be registered (see [`crate::namespace`]).
    pub fn set_property(
        &mut self,
        namespace: &str,
        name: &str,
        value: impl Into<String>,
    ) -> Result<()> {
        if !namespace::is_namespace_registered(namespace) {
            return Err(Error::Serialization(format!(
                "Unregistered namespace: {}",
                namespace
            )));
        }
        if namespace == RDF_NAMESPACE || namespace == ADOBE_META_NAMESPACE {
            return Err(Error::Serialization(format!(
                "Namespace {} is reserved for packet structure",
                namespace
            )));
        }
        if !is_valid_name(name) {
            return Err(Error::Serialization(format!(
                "Invalid property name: {:?}",
                name
            )));
        }
        let value = value.into();
        check_value(name, &value)?;
        self.properties
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), value);
        Ok(())
    }

    /// Get a property value
    pub fn property(&self, namespace: &str, name: &str) -> Option<&str> {
        self.properties
            .get(namespace)
            .and_then(|props| props.get(name))
            .map(String::as_str)
    }

    /// Check if a property exists
    pub fn has_property(&self, namespace: &str, name: &str) -> bool {
        self.property(namespace, name).is_some()
    }

    /// Remove a property, returning its value
    pub fn delete_property(&mut self, namespace: &str, name: &str) -> Option<String> {
        let props = self.properties.get_mut(namespace)?;
        let value = props.remove(name);
        if props.is_empty() {
            self.properties.remove(namespace);
        }
        value
    }

    /// Iterate `(namespace, name, value)` triples
    pub fn properties(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.properties.iter().flat_map(|(ns, props)| {
            props
                .iter()
                .map(move |(name, value)| (ns.as_str(), name.as_str(), value.as_str()))
        })
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.properties.values().map(BTreeMap::len).sum()
    }

    /// True if no property is set
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// GUID of the extended XMP this packet links to, if any
    pub fn extended_xmp_guid(&self) -> Option<&str> {
        self.property(XMP_NOTE_NAMESPACE, HAS_EXTENDED_XMP)
    }

    /// Parse an RDF/XML packet
    ///
    /// Namespaces declared in the packet are added to the registry.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::Serialization(format!("XMP is not UTF-8: {}", e)))?;
        let text = text.trim_start_matches('\u{feff}');

        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut scope = Scope::default();
        let mut meta = Self::new();
        let mut saw_rdf = false;
        let mut in_description = false;

        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Start(ref e) => {
                    let name = element_name(e)?;
                    let attributes = scope.declare(e)?;

                    if in_description {
                        // Property element: only plain text content is a simple value
                        let end = e.name().as_ref().to_vec();
                        let raw = reader.read_text(QName(&end)).map_err(xml_error)?;
                        if raw.contains('<') {
                            log::debug!("Skipping structured XMP property {}", name);
                            continue;
                        }
                        let value = unescape(&raw).map_err(xml_error)?;
                        meta.insert_qualified(&scope, &name, value.into_owned())?;
                    } else if scope.is(&name, RDF_NAMESPACE, "Description") {
                        meta.insert_attributes(&scope, attributes)?;
                        in_description = true;
                    } else if scope.is(&name, RDF_NAMESPACE, "RDF") {
                        saw_rdf = true;
                    }
                }
                Event::Empty(ref e) => {
                    let name = element_name(e)?;
                    let attributes = scope.declare(e)?;

                    if in_description {
                        let value = attributes
                            .into_iter()
                            .find(|(key, _)| scope.is(key, RDF_NAMESPACE, "resource"))
                            .map(|(_, value)| value)
                            .unwrap_or_default();
                        meta.insert_qualified(&scope, &name, value)?;
                    } else if scope.is(&name, RDF_NAMESPACE, "Description") {
                        meta.insert_attributes(&scope, attributes)?;
                    } else if scope.is(&name, RDF_NAMESPACE, "RDF") {
                        saw_rdf = true;
                    }
                }
                Event::End(ref e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if in_description && scope.is(&name, RDF_NAMESPACE, "Description") {
                        in_description = false;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_rdf {
            return Err(Error::Serialization("No rdf:RDF element in XMP".into()));
        }
        Ok(meta)
    }

    /// Serialize to RDF/XML
    pub fn serialize(&self, options: &SerializeOptions) -> Result<Vec<u8>> {
        let mut namespaces = Vec::with_capacity(self.properties.len());
        for uri in self.properties.keys() {
            let prefix = namespace::namespace_prefix(uri).ok_or_else(|| {
                Error::Serialization(format!("Unregistered namespace: {}", uri))
            })?;
            namespaces.push((prefix, uri.as_str()));
        }

        let mut out = Vec::new();
        if !options.omit_packet_wrapper {
            out.extend_from_slice(PACKET_BEGIN.as_bytes());
        }

        let mut writer = if options.use_compact_format {
            Writer::new(out)
        } else {
            Writer::new_with_indent(out, b' ', 1)
        };

        let mut xmpmeta = BytesStart::new("x:xmpmeta");
        xmpmeta.push_attribute(("xmlns:x", ADOBE_META_NAMESPACE));
        xmpmeta.push_attribute(("x:xmptk", TOOLKIT));
        writer.write_event(Event::Start(xmpmeta)).map_err(xml_error)?;

        let mut rdf = BytesStart::new("rdf:RDF");
        rdf.push_attribute(("xmlns:rdf", RDF_NAMESPACE));
        writer.write_event(Event::Start(rdf)).map_err(xml_error)?;

        let mut description = BytesStart::new("rdf:Description");
        description.push_attribute(("rdf:about", ""));
        for (prefix, uri) in &namespaces {
            let declaration = format!("xmlns:{}", prefix);
            description.push_attribute((declaration.as_str(), *uri));
        }

        if options.use_compact_format || self.is_empty() {
            for ((prefix, _), props) in namespaces.iter().zip(self.properties.values()) {
                for (name, value) in props {
                    check_value(name, value)?;
                    let key = format!("{}:{}", prefix, name);
                    description.push_attribute((key.as_str(), value.as_str()));
                }
            }
            writer
                .write_event(Event::Empty(description))
                .map_err(xml_error)?;
        } else {
            writer
                .write_event(Event::Start(description))
                .map_err(xml_error)?;
            for ((prefix, _), props) in namespaces.iter().zip(self.properties.values()) {
                for (name, value) in props {
                    check_value(name, value)?;
                    let key = format!("{}:{}", prefix, name);
                    writer
                        .write_event(Event::Start(BytesStart::new(key.as_str())))
                        .map_err(xml_error)?;
                    writer
                        .write_event(Event::Text(BytesText::new(value)))
                        .map_err(xml_error)?;
                    writer
                        .write_event(Event::End(BytesEnd::new(key.as_str())))
                        .map_err(xml_error)?;
                }
            }
            writer
                .write_event(Event::End(BytesEnd::new("rdf:Description")))
                .map_err(xml_error)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("rdf:RDF")))
            .map_err(xml_error)?;
        writer
            .write_event(Event::End(BytesEnd::new("x:xmpmeta")))
            .map_err(xml_error)?;

        let mut out = writer.into_inner();
        if !options.omit_packet_wrapper {
            out.push(b'\n');
            out.extend_from_slice(PACKET_END.as_bytes());
        }
        Ok(out)
    }

    fn insert_attributes(&mut self, scope: &Scope, attributes: Vec<(String, String)>) -> Result<()> {
        for (key, value) in attributes {
            let is_structural = key == "xmlns"
                || key.starts_with("xmlns:")
                || key.starts_with("xml:")
                || scope.uri_of(&key) == Some(RDF_NAMESPACE);
            if !is_structural {
                self.insert_qualified(scope, &key, value)?;
            }
        }
        Ok(())
    }

    fn insert_qualified(&mut self, scope: &Scope, qname: &str, value: String) -> Result<()> {
        let Some((prefix, local)) = qname.split_once(':') else {
            log::debug!("Skipping unqualified XMP property {}", qname);
            return Ok(());
        };
        let uri = scope.uri_of(qname).ok_or_else(|| {
            Error::Serialization(format!("Undeclared namespace prefix: {}", prefix))
        })?;
        if uri == RDF_NAMESPACE {
            return Ok(());
        }
        namespace::register_namespace(uri, prefix);
        self.properties
            .entry(uri.to_string())
            .or_default()
            .insert(local.to_string(), value);
        Ok(())
    }
}

/// Prefix declarations seen so far in a packet
#[derive(Debug, Default)]
struct Scope {
    uri_by_prefix: HashMap<String, String>,
}

impl Scope {
    /// Record `xmlns:*` declarations and return all attributes, unescaped
    fn declare(&mut self, element: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
        let mut attributes = Vec::new();
        for attr in element.attributes() {
            let attr = attr.map_err(xml_error)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let raw = std::str::from_utf8(&attr.value).map_err(xml_error)?;
            let value = unescape(raw).map_err(xml_error)?.into_owned();
            if let Some(prefix) = key.strip_prefix("xmlns:") {
                self.uri_by_prefix.insert(prefix.to_string(), value.clone());
            }
            attributes.push((key, value));
        }
        Ok(attributes)
    }

    /// Namespace URI of a qualified name, falling back to the registry
    fn uri_of(&self, qname: &str) -> Option<&str> {
        let (prefix, _) = qname.split_once(':')?;
        match self.uri_by_prefix.get(prefix) {
            Some(uri) => Some(uri.as_str()),
            None => match prefix {
                "rdf" => Some(RDF_NAMESPACE),
                "x" => Some(ADOBE_META_NAMESPACE),
                _ => None,
            },
        }
    }

    fn is(&self, qname: &str, namespace: &str, local: &str) -> bool {
        qname.split_once(':').map(|(_, l)| l) == Some(local) && self.uri_of(qname) == Some(namespace)
    }
}

fn element_name(element: &BytesStart<'_>) -> Result<String> {
    std::str::from_utf8(element.name().as_ref())
        .map(str::to_string)
        .map_err(xml_error)
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// XML 1.0 allows no C0 controls besides tab, LF and CR
fn check_value(name: &str, value: &str) -> Result<()> {
    match value
        .chars()
        .find(|c| c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r' | '\u{7f}'))
    {
        Some(c) => Err(Error::Serialization(format!(
            "Control character U+{:04X} in value of {}",
            c as u32, name
        ))),
        None => Ok(()),
    }
}

fn xml_error<E: std::fmt::Display>(err: E) -> Error {
    Error::Serialization(err.to_string())
}

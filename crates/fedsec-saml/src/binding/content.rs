//! Parsed protocol message fragments.
//!
//! [`XmlFragment`] keeps the serialized element alongside the handful of
//! values the security layer reads from it: the element and schema type
//! names, message identifier, issue instant, issuer and protocol family.

use std::fmt;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, QName, ResolveResult};
use quick_xml::reader::NsReader;

use crate::error::{SamlError, SamlResult};
use crate::policy::ProtocolMessage;
use crate::types::{
    Issuer, QualifiedName, SAML10_PROTOCOL_ENUM, SAML11_PROTOCOL_ENUM, SAML1P_NS, SAML1_NS,
    SAML20P_NS, SAML20_NS, XSI_NS,
};

/// Attributes that carry a message identifier, across protocol versions.
const ID_ATTRIBUTES: [&str; 4] = ["ID", "ResponseID", "RequestID", "AssertionID"];

/// A single well-formed XML element and the security-relevant values read
/// from it.
///
/// A fragment may be attached to a parent, meaning it is still part of a
/// larger document. Only detached fragments can be stored on their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlFragment {
    xml: String,
    element_name: QualifiedName,
    schema_type: Option<QualifiedName>,
    message_id: Option<String>,
    issue_instant: Option<DateTime<Utc>>,
    issuer: Option<Issuer>,
    protocol: Option<&'static str>,
    parent: Option<String>,
}

#[derive(Debug)]
struct XmlAttribute {
    namespace: Option<String>,
    local_name: String,
    value: String,
}

#[derive(Default)]
struct IssuerBuilder {
    text: String,
    format: Option<String>,
    name_qualifier: Option<String>,
    sp_name_qualifier: Option<String>,
}

impl IssuerBuilder {
    fn build(self) -> Option<Issuer> {
        let name = self.text.trim();
        if name.is_empty() {
            return None;
        }
        Some(Issuer {
            name: name.to_string(),
            format: self.format,
            name_qualifier: self.name_qualifier,
            sp_name_qualifier: self.sp_name_qualifier,
        })
    }
}

impl XmlFragment {
    /// Parses a serialized element.
    ///
    /// The input must contain exactly one root element.
    pub fn parse(xml: impl Into<String>) -> SamlResult<Self> {
        let xml = xml.into();
        let mut reader = NsReader::from_str(&xml);
        reader.config_mut().trim_text(true);

        let mut root: Option<RootInfo> = None;
        let mut closed = false;
        let mut depth = 0usize;
        let mut issuer: Option<IssuerBuilder> = None;
        let mut in_issuer = false;
        let mut saml1_issuer: Option<String> = None;

        loop {
            let (ns, event) = reader.read_resolved_event()?;
            let ns = bound_namespace(&ns);
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    if closed {
                        return Err(SamlError::XmlParse(
                            "content after the root element".to_string(),
                        ));
                    }
                    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    let attributes = attributes(&reader, e)?;

                    if depth == 0 {
                        root = Some(RootInfo::read(&reader, ns, local, &attributes)?);
                    } else if depth == 1 {
                        if ns.as_deref() == Some(SAML20_NS) && local == "Issuer" && issuer.is_none() {
                            let mut builder = IssuerBuilder::default();
                            for attr in attributes.iter().filter(|a| a.namespace.is_none()) {
                                match attr.local_name.as_str() {
                                    "Format" => builder.format = Some(attr.value.clone()),
                                    "NameQualifier" => {
                                        builder.name_qualifier = Some(attr.value.clone());
                                    }
                                    "SPNameQualifier" => {
                                        builder.sp_name_qualifier = Some(attr.value.clone());
                                    }
                                    _ => {}
                                }
                            }
                            issuer = Some(builder);
                            in_issuer = !is_empty;
                        } else if ns.as_deref() == Some(SAML1_NS)
                            && local == "Assertion"
                            && saml1_issuer.is_none()
                        {
                            saml1_issuer = plain_attribute(&attributes, "Issuer");
                        }
                    }

                    if is_empty {
                        if depth == 0 {
                            closed = true;
                        }
                    } else {
                        depth += 1;
                    }
                }
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    in_issuer = false;
                    if depth == 0 {
                        closed = true;
                    }
                }
                Event::Text(ref t) => {
                    if depth == 0 {
                        return Err(SamlError::XmlParse(
                            "text outside the root element".to_string(),
                        ));
                    }
                    if in_issuer {
                        if let Some(builder) = issuer.as_mut() {
                            let text = t
                                .unescape()
                                .map_err(|e| SamlError::XmlParse(e.to_string()))?;
                            builder.text.push_str(&text);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let root = root.ok_or_else(|| SamlError::XmlParse("no root element".to_string()))?;
        if !closed {
            return Err(SamlError::XmlParse("unterminated root element".to_string()));
        }

        let issuer = issuer
            .and_then(IssuerBuilder::build)
            .or_else(|| root.saml1_issuer.clone().map(Issuer::new))
            .or_else(|| saml1_issuer.filter(|s| !s.is_empty()).map(Issuer::new));

        Ok(Self {
            xml,
            element_name: root.name,
            schema_type: root.schema_type,
            message_id: root.message_id,
            issue_instant: root.issue_instant,
            issuer,
            protocol: root.protocol,
            parent: None,
        })
    }

    /// Marks the fragment as contained in `parent`.
    #[must_use]
    pub fn attached_to(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Detaches the fragment from its parent.
    pub fn detach(&mut self) {
        self.parent = None;
    }

    /// Returns the containing element's name, if attached.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Returns the serialized element.
    #[must_use]
    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// Consumes the fragment, returning the serialized element.
    #[must_use]
    pub fn into_xml(self) -> String {
        self.xml
    }
}

impl ProtocolMessage for XmlFragment {
    fn element_name(&self) -> &QualifiedName {
        &self.element_name
    }

    fn schema_type(&self) -> Option<&QualifiedName> {
        self.schema_type.as_ref()
    }

    fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    fn issue_instant(&self) -> Option<DateTime<Utc>> {
        self.issue_instant
    }

    fn issuer(&self) -> Option<&Issuer> {
        self.issuer.as_ref()
    }

    fn protocol(&self) -> Option<&str> {
        self.protocol
    }
}

impl fmt::Display for XmlFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.xml)
    }
}

struct RootInfo {
    name: QualifiedName,
    schema_type: Option<QualifiedName>,
    message_id: Option<String>,
    issue_instant: Option<DateTime<Utc>>,
    protocol: Option<&'static str>,
    saml1_issuer: Option<String>,
}

impl RootInfo {
    fn read(
        reader: &NsReader<&[u8]>,
        namespace: Option<String>,
        local_name: String,
        attributes: &[XmlAttribute],
    ) -> SamlResult<Self> {
        let schema_type = attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(XSI_NS) && a.local_name == "type")
            .map(|a| {
                let (ns, local) = reader.resolve_element(QName(a.value.trim().as_bytes()));
                let local = String::from_utf8_lossy(local.as_ref()).into_owned();
                match bound_namespace(&ns) {
                    Some(ns) => QualifiedName::new(ns, local),
                    None => QualifiedName::local(local),
                }
            });

        let message_id = ID_ATTRIBUTES
            .iter()
            .find_map(|name| plain_attribute(attributes, name))
            .filter(|id| !id.is_empty());

        let issue_instant = plain_attribute(attributes, "IssueInstant")
            .map(|value| {
                DateTime::parse_from_rfc3339(value.trim())
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| SamlError::XmlParse(format!("invalid IssueInstant '{value}': {e}")))
            })
            .transpose()?;

        let protocol = match namespace.as_deref() {
            Some(SAML20P_NS | SAML20_NS) => Some(SAML20P_NS),
            Some(SAML1P_NS | SAML1_NS) => {
                match plain_attribute(attributes, "MinorVersion").as_deref() {
                    Some("0") => Some(SAML10_PROTOCOL_ENUM),
                    _ => Some(SAML11_PROTOCOL_ENUM),
                }
            }
            _ => None,
        };

        let saml1_issuer = if namespace.as_deref() == Some(SAML1_NS) && local_name == "Assertion" {
            plain_attribute(attributes, "Issuer").filter(|s| !s.is_empty())
        } else {
            None
        };

        let name = match namespace {
            Some(ns) => QualifiedName::new(ns, local_name),
            None => QualifiedName::local(local_name),
        };

        Ok(Self {
            name,
            schema_type,
            message_id,
            issue_instant,
            protocol,
            saml1_issuer,
        })
    }
}

fn bound_namespace(result: &ResolveResult<'_>) -> Option<String> {
    match result {
        ResolveResult::Bound(Namespace(ns)) => Some(String::from_utf8_lossy(ns).into_owned()),
        _ => None,
    }
}

fn attributes(reader: &NsReader<&[u8]>, start: &BytesStart<'_>) -> SamlResult<Vec<XmlAttribute>> {
    let mut out = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (ns, local) = reader.resolve_attribute(attr.key);
        let namespace = bound_namespace(&ns);
        let local_name = String::from_utf8_lossy(local.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| SamlError::XmlParse(e.to_string()))?
            .into_owned();
        out.push(XmlAttribute {
            namespace,
            local_name,
            value,
        });
    }
    Ok(out)
}

fn plain_attribute(attributes: &[XmlAttribute], name: &str) -> Option<String> {
    attributes
        .iter()
        .find(|a| a.namespace.is_none() && a.local_name == name)
        .map(|a| a.value.clone())
}

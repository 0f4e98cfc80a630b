//! Markup material (XRF) decoder
//!
//! ```text
//! <HEADER MAGIC="XRF" VERSION="900" />
//! <MATERIAL NUMMAPS="1">
//!   <AMBIENT>255 255 255 0</AMBIENT>
//!   <DIFFUSE>255 255 255 255</DIFFUSE>
//!   <SPECULAR>0 0 0 0</SPECULAR>
//!   <SHININESS>0</SHININESS>
//!   <MAP>skin.tga</MAP>
//! </MATERIAL>
//! ```
//!
//! The file has two top-level elements, so the body is wrapped in a
//! synthetic document element before it reaches the XML reader. Color
//! components that are missing or not a byte keep their previous value.

use xml::attribute::OwnedAttribute;
use xml::reader::{ParserConfig, XmlEvent};

use calforge_core::{Color, Error};

use crate::header::{MARKUP_FORMAT_VERSION, MARKUP_MATERIAL_MAGIC};
use crate::traits::{ParseOptions, ParseResult, Parser};

use super::Material;

const HEADER_TAG: &str = "HEADER";
const DOCUMENT_TAG: &str = "CALFORGE_DOCUMENT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Ambient,
    Diffuse,
    Specular,
    Shininess,
    Map,
}

impl Field {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "AMBIENT" => Some(Field::Ambient),
            "DIFFUSE" => Some(Field::Diffuse),
            "SPECULAR" => Some(Field::Specular),
            "SHININESS" => Some(Field::Shininess),
            "MAP" => Some(Field::Map),
            _ => None,
        }
    }
}

/// Markup material decoder
#[derive(Debug, Default)]
pub struct MarkupMaterialParser;

impl MarkupMaterialParser {
    pub fn new() -> Self {
        Self
    }
}

impl Parser for MarkupMaterialParser {
    type Output = Material;

    fn extensions(&self) -> &[&str] {
        &["xrf"]
    }

    fn name(&self) -> &str {
        "Markup Material Parser"
    }

    fn supported_versions(&self) -> &[i32] {
        &[MARKUP_FORMAT_VERSION]
    }

    fn parse_bytes(&self, data: &[u8], options: &ParseOptions) -> ParseResult<Option<Material>> {
        // Bytes widen to chars as in the binary formats
        let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
        let text: String = data.iter().copied().map(char::from).collect();
        let body = skip_preamble(&text);
        if !body.starts_with("<HEADER") {
            return Ok(None);
        }

        let document = format!("<{DOCUMENT_TAG}>{body}</{DOCUMENT_TAG}>");
        let reader = ParserConfig::new()
            .trim_whitespace(true)
            .create_reader(document.as_bytes());

        let mut material = Material::new(options.name_or_default());
        let mut header_checked = false;
        let mut field: Option<Field> = None;
        let mut content = String::new();

        for event in reader {
            let event = event.map_err(|e| Error::InvalidMarkup {
                message: e.to_string(),
            })?;

            match event {
                XmlEvent::StartElement {
                    name, attributes, ..
                } => {
                    let tag = name.local_name.as_str();
                    if tag == DOCUMENT_TAG {
                        continue;
                    }
                    if !header_checked {
                        if tag != HEADER_TAG || !check_header(&attributes) {
                            return Ok(None);
                        }
                        header_checked = true;
                        continue;
                    }
                    if let Some(f) = Field::from_tag(tag) {
                        field = Some(f);
                        content.clear();
                    }
                }
                XmlEvent::Characters(s) | XmlEvent::CData(s) => {
                    if field.is_some() {
                        content.push_str(&s);
                    }
                }
                XmlEvent::EndElement { name } => {
                    if let Some(f) = field {
                        if Field::from_tag(&name.local_name) == Some(f) {
                            apply_field(&mut material, f, content.trim());
                            field = None;
                        }
                    }
                }
                _ => {}
            }
        }

        if !header_checked {
            return Ok(None);
        }

        tracing::debug!(material = %material.name, maps = material.maps.len(), "Decoded markup material");
        Ok(Some(material))
    }
}

/// Skip a byte-order mark, XML declarations and comments ahead of the header
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn skip_preamble(text: &str) -> &str {
    let mut rest = text.trim_start_matches('\u{feff}').trim_start();
    loop {
        let (open, close) = if rest.starts_with("<?") {
            ("<?", "?>")
        } else if rest.starts_with("<!--") {
            ("<!--", "-->")
        } else {
            return rest;
        };
        match rest[open.len()..].find(close) {
            Some(end) => rest = rest[open.len() + end + close.len()..].trim_start(),
            None => return rest,
        }
    }
}

fn attribute<'a>(attributes: &'a [OwnedAttribute], key: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name.local_name == key)
        .map(|a| a.value.as_str())
}

/// Check the header magic; an unexpected version only warns
fn check_header(attributes: &[OwnedAttribute]) -> bool {
    if attribute(attributes, "MAGIC") != Some(MARKUP_MATERIAL_MAGIC) {
        return false;
    }

    match attribute(attributes, "VERSION").map(|v| v.trim().parse::<i32>()) {
        Some(Ok(MARKUP_FORMAT_VERSION)) => {}
        Some(Ok(version)) => tracing::warn!(
            version,
            expected = MARKUP_FORMAT_VERSION,
            "Unexpected markup material version, assuming a compatible layout"
        ),
        _ => tracing::warn!("Markup material header has no readable VERSION"),
    }
    true
}

fn apply_field(material: &mut Material, field: Field, text: &str) {
    match field {
        Field::Ambient => material.ambient = parse_color(text, material.ambient),
        Field::Diffuse => material.diffuse = parse_color(text, material.diffuse),
        Field::Specular => material.specular = parse_color(text, material.specular),
        Field::Shininess => match text.parse::<f32>() {
            Ok(value) => material.shininess = value,
            Err(_) => tracing::warn!(value = text, "Malformed SHININESS, keeping previous value"),
        },
        Field::Map => material.maps.push(text.to_string()),
    }
}

/// Whitespace-separated byte components; missing or malformed ones keep `previous`
pub(crate) fn parse_color(text: &str, previous: Color) -> Color {
    let mut components = previous.to_array();
    let mut tokens = text.split_whitespace();

    for slot in components.iter_mut() {
        match tokens.next().map(|t| (t, t.parse::<u8>())) {
            Some((_, Ok(value))) => *slot = value,
            Some((token, Err(_))) => {
                tracing::warn!(token, "Malformed color component, keeping previous value")
            }
            None => {}
        }
    }

    Color::from_array(components)
}

//! Content-type sniffing: the server decides what a file is, not the client.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::{BlobError, BlobResult};

pub const PNG: &str = "image/png";
pub const JPEG: &str = "image/jpeg";
pub const WEBP: &str = "image/webp";
pub const GIF: &str = "image/gif";
pub const SVG: &str = "image/svg+xml";

/// Raster types accepted on upload.
pub const RASTER_TYPES: [&str; 4] = [PNG, JPEG, WEBP, GIF];

/// How much of a text document is inspected for the root element.
const SNIFF_PREFIX_BYTES: usize = 4096;

/// Elements that run script or embed an HTML document.
const ACTIVE_ELEMENTS: [&str; 6] = ["script", "foreignobject", "iframe", "embed", "object", "handler"];

const SCRIPT_SCHEMES: [&str; 2] = ["javascript:", "vbscript:"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Raster,
    Vector,
}

/// A MIME type established from file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedType {
    pub mime: &'static str,
    pub kind: ImageKind,
}

impl VerifiedType {
    /// Canonical file extension for the type.
    pub fn extension(&self) -> &'static str {
        match self.mime {
            PNG => "png",
            JPEG => "jpg",
            WEBP => "webp",
            GIF => "gif",
            _ => "svg",
        }
    }

    /// Whether `ext` is a usual extension for this type.
    pub fn accepts_extension(&self, ext: &str) -> bool {
        match self.mime {
            JPEG => matches!(ext, "jpg" | "jpeg"),
            _ => ext == self.extension(),
        }
    }
}

/// Determine the real type of `bytes`.
///
/// A binary signature wins over whatever the client declared. Without one,
/// the buffer must look like an SVG document free of scripting.
pub fn sniff(bytes: &[u8], declared: Option<&str>) -> BlobResult<VerifiedType> {
    if bytes.is_empty() {
        return Err(BlobError::unsupported_type("empty file"));
    }

    // infer also matches text formats (xml, html, shell); those are not
    // binary signatures and go through the markup check instead
    let detected = infer::get(bytes).filter(|k| k.matcher_type() != infer::MatcherType::Text);

    if let Some(kind) = detected {
        let mime = kind.mime_type();
        let Some(verified) = RASTER_TYPES.iter().find(|t| **t == mime) else {
            tracing::warn!(detected = mime, declared = ?declared, "rejected upload with disallowed signature");
            return Err(BlobError::unsupported_type(mime));
        };
        log_mismatch(declared, verified);
        return Ok(VerifiedType {
            mime: verified,
            kind: ImageKind::Raster,
        });
    }

    if looks_like_svg(bytes) {
        if has_active_content(bytes) {
            tracing::warn!(declared = ?declared, "rejected svg with scripting");
            return Err(BlobError::unsupported_type("svg with scripting"));
        }
        log_mismatch(declared, SVG);
        return Ok(VerifiedType {
            mime: SVG,
            kind: ImageKind::Vector,
        });
    }

    tracing::warn!(declared = ?declared, "rejected upload with unrecognised content");
    Err(BlobError::unsupported_type(format!(
        "{} (content unrecognizable)",
        declared.unwrap_or("unknown")
    )))
}

fn log_mismatch(declared: Option<&str>, verified: &str) {
    if let Some(declared) = declared {
        let declared = declared.trim().to_ascii_lowercase();
        if !declared.is_empty() && declared != verified {
            tracing::warn!(declared = %declared, detected = verified, "declared content type ignored");
        }
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let prefix = &bytes[..bytes.len().min(SNIFF_PREFIX_BYTES)];
    let text = String::from_utf8_lossy(prefix);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    if !text.starts_with('<') {
        return false;
    }
    text.to_ascii_lowercase().contains("<svg")
}

/// Walks the markup and flags anything a browser could execute when the
/// file is opened directly. Unparseable markup counts as active.
fn has_active_content(bytes: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(bytes) else {
        return true;
    };
    let mut reader = Reader::from_str(text.trim_start_matches('\u{feff}'));

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if is_active_element(&e) {
                    return true;
                }
            }
            Ok(Event::DocType(e)) => {
                // entity declarations can smuggle markup past the walk
                if String::from_utf8_lossy(&e).to_ascii_uppercase().contains("<!ENTITY") {
                    return true;
                }
            }
            Ok(Event::Eof) => return false,
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(error = %err, "svg markup did not parse");
                return true;
            }
        }
    }
}

fn is_active_element(e: &BytesStart<'_>) -> bool {
    let name = e.local_name();
    let name = String::from_utf8_lossy(name.as_ref()).to_ascii_lowercase();
    if ACTIVE_ELEMENTS.contains(&name.as_str()) {
        return true;
    }

    for attr in e.attributes() {
        let Ok(attr) = attr else {
            return true;
        };
        let key = attr.key.local_name();
        let key = String::from_utf8_lossy(key.as_ref()).to_ascii_lowercase();
        if key.starts_with("on") {
            return true;
        }

        let Ok(value) = attr.unescape_value() else {
            return true;
        };
        let value: String = value
            .chars()
            .filter(|c| !c.is_whitespace() && !c.is_control())
            .collect::<String>()
            .to_ascii_lowercase();

        // <set attributeName="onclick" to="..."> installs a handler later
        if key == "attributename" && value.starts_with("on") {
            return true;
        }
        if SCRIPT_SCHEMES.iter().any(|scheme| value.contains(scheme)) {
            return true;
        }
        if key == "href" && value.starts_with("data:text/html") {
            return true;
        }
    }
    false
}

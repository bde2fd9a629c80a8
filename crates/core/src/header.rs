//! Script header parsing.
//!
//! A script may begin with a block delimited by `/** DataSonnet ... */`
//! declaring input/output media types and codec defaults. The block is
//! replaced by blank lines before compilation so source positions
//! survive.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::media::MediaType;

const HEADER_OPEN: &str = "/** DataSonnet";
const HEADER_CLOSE: &str = "*/";

/// Declarations extracted from the script prologue.
#[derive(Debug, Clone)]
pub struct Header {
    pub preserve_order: bool,
    /// `(name, media type)`; the name `*` applies to all inputs.
    inputs: Vec<(String, MediaType)>,
    outputs: Vec<MediaType>,
    dataformats: Vec<MediaType>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            preserve_order: true,
            inputs: Vec::new(),
            outputs: Vec::new(),
            dataformats: Vec::new(),
        }
    }
}

impl Header {
    /// Parse the header block (if any) and return it together with the
    /// script body, header lines blanked out.
    pub fn extract(script: &str) -> Result<(Header, String)> {
        let trimmed = script.trim_start();
        if !trimmed.starts_with(HEADER_OPEN) {
            return Ok((Header::default(), script.to_string()));
        }
        let Some(open_at) = script.find(HEADER_OPEN) else {
            return Ok((Header::default(), script.to_string()));
        };
        let close_at = script[open_at..]
            .find(HEADER_CLOSE)
            .map(|i| open_at + i)
            .ok_or_else(|| Error::HeaderParse("unterminated header block".to_string()))?;

        let block = &script[open_at + HEADER_OPEN.len()..close_at];
        let header = Self::parse_block(block)?;

        let mut body = String::with_capacity(script.len());
        body.push_str(&script[..open_at]);
        for ch in script[open_at..close_at + HEADER_CLOSE.len()].chars() {
            body.push(if ch == '\n' { '\n' } else { ' ' });
        }
        body.push_str(&script[close_at + HEADER_CLOSE.len()..]);
        Ok((header, body))
    }

    fn parse_block(block: &str) -> Result<Header> {
        let mut header = Header::default();
        for raw in block.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            if let Some(rest) = line.strip_prefix("preserveOrder=") {
                header.preserve_order = match rest.trim() {
                    "true" => true,
                    "false" => false,
                    other => {
                        return Err(Error::HeaderParse(format!(
                            "preserveOrder must be true or false, got: {other}"
                        )))
                    }
                };
            } else if let Some(rest) = line.strip_prefix("input ") {
                let (name, media_type) = rest
                    .trim()
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| Error::HeaderParse(line.to_string()))?;
                header
                    .inputs
                    .push((name.to_string(), MediaType::parse(media_type)?));
            } else if let Some(rest) = line.strip_prefix("output ") {
                header.outputs.push(MediaType::parse(rest)?);
            } else if let Some(rest) = line.strip_prefix("dataformat ") {
                header.dataformats.push(MediaType::parse(rest)?);
            } else {
                return Err(Error::HeaderParse(line.to_string()));
            }
        }
        Ok(header)
    }

    /// Declared default media type for a named input: the
    /// highest-quality declaration among exact-name and `*` entries.
    #[must_use]
    pub fn input_media_type(&self, name: &str) -> Option<&MediaType> {
        self.inputs
            .iter()
            .filter(|(n, _)| n == name || n == "*")
            .map(|(_, mt)| mt)
            .max_by(|a, b| {
                a.quality()
                    .partial_cmp(&b.quality())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Highest-quality output declaration.
    #[must_use]
    pub fn output_media_type(&self) -> Option<&MediaType> {
        self.outputs.iter().max_by(|a, b| {
            a.quality()
                .partial_cmp(&b.quality())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    /// Codec default parameters declared via `dataformat` for the given
    /// index.
    #[must_use]
    pub fn dataformat_params(&self, media_type: &MediaType) -> IndexMap<String, String> {
        let mut params = IndexMap::new();
        for declared in &self.dataformats {
            if declared.same_index(media_type) {
                for (key, value) in &declared.parameters {
                    params.insert(key.clone(), value.clone());
                }
            }
        }
        params
    }

    /// Resolve the effective media type for a named input document:
    /// dataformat defaults < declared input parameters < the document's
    /// own parameters.
    #[must_use]
    pub fn resolve_input(&self, name: &str, document: &MediaType) -> MediaType {
        match self.input_media_type(name) {
            Some(declared) if declared.same_index(document) => {
                declared.layered(&self.dataformat_params(declared), &document.parameters)
            }
            _ => document.layered(&self.dataformat_params(document), &IndexMap::new()),
        }
    }

    /// Resolve the effective output media type, honoring the caller's
    /// override.
    #[must_use]
    pub fn resolve_output(&self, requested: Option<&MediaType>) -> MediaType {
        let base = requested
            .or_else(|| self.output_media_type())
            .cloned()
            .unwrap_or_else(|| MediaType::new("application", "json"));
        base.layered(&self.dataformat_params(&base), &IndexMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SCRIPT: &str = "/** DataSonnet\n\
        // sample header\n\
        preserveOrder=false\n\
        input payload application/csv;separator=|\n\
        input * application/json\n\
        output application/json;q=0.9\n\
        output application/xml;q=0.4\n\
        dataformat application/csv;quote='\n\
        */\n\
        payload";

    #[test]
    fn test_extract_parses_declarations() {
        let (header, body) = Header::extract(SCRIPT).unwrap();
        assert!(!header.preserve_order);
        assert_eq!(
            header.input_media_type("payload").unwrap().essence(),
            "application/csv"
        );
        assert_eq!(
            header.input_media_type("other").unwrap().essence(),
            "application/json"
        );
        assert_eq!(header.output_media_type().unwrap().essence(), "application/json");
        assert_eq!(body.trim(), "payload");
    }

    #[test]
    fn test_header_lines_blanked_preserve_line_count() {
        let (_, body) = Header::extract(SCRIPT).unwrap();
        assert_eq!(body.lines().count(), SCRIPT.lines().count());
    }

    #[test]
    fn test_no_header_is_default() {
        let (header, body) = Header::extract("payload.x").unwrap();
        assert!(header.preserve_order);
        assert!(header.input_media_type("payload").is_none());
        assert_eq!(body, "payload.x");
    }

    #[test]
    fn test_unrecognized_line_is_fatal() {
        let err = Header::extract("/** DataSonnet\nbogus line\n*/\nnull").unwrap_err();
        assert!(matches!(err, Error::HeaderParse(_)));
    }

    #[test]
    fn test_parameter_layering_for_input() {
        let (header, _) = Header::extract(SCRIPT).unwrap();
        let document = MediaType::parse("application/csv;separator=\";\"").unwrap();
        let merged = header.resolve_input("payload", &document);
        // dataformat default < declared < document
        assert_eq!(merged.param("quote"), Some("'"));
        assert_eq!(merged.param("separator"), Some(";"));
    }

    #[test]
    fn test_output_defaults_to_json() {
        let header = Header::default();
        assert_eq!(header.resolve_output(None).essence(), "application/json");
    }
}

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMarkup {
    pub markup: String,
    pub encoding_label: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("failed to decode bytes with {encoding}: {message}")]
    DecodeFailure { encoding: String, message: String },
}

/// Decode a response body into UTF-8 using: BOM -> Content-Type charset -> valid UTF-8 -> chardetng.
pub fn decode_markup(bytes: &[u8], content_type: Option<&str>) -> Result<DecodedMarkup, DecodeError> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(label) = content_type.and_then(extract_charset) {
        if let Some(enc) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, enc);
        }
    }

    // Fragments rarely carry a meta charset; trust UTF-8 when it validates.
    if std::str::from_utf8(bytes).is_ok() {
        return decode_with(bytes, UTF_8);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let enc = detector.guess(None, true);
    decode_with(bytes, enc)
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches(['"', '\'']).to_string())
        })
        .next()
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> Result<DecodedMarkup, DecodeError> {
    let (text, _, had_errors) = enc.decode(bytes);
    if had_errors {
        return Err(DecodeError::DecodeFailure {
            encoding: enc.name().to_string(),
            message: "decoding error".into(),
        });
    }
    Ok(DecodedMarkup {
        markup: text.into_owned(),
        encoding_label: enc.name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{decode_markup, extract_charset};

    #[test]
    fn charset_parameter_is_found_case_insensitively() {
        assert_eq!(
            extract_charset("text/html; Charset=\"ISO-8859-1\"").as_deref(),
            Some("ISO-8859-1")
        );
        assert_eq!(extract_charset("text/html"), None);
    }

    #[test]
    fn latin1_header_is_honoured() {
        let decoded = decode_markup(b"<p>caf\xe9</p>", Some("text/html; charset=iso-8859-1")).unwrap();
        assert_eq!(decoded.markup, "<p>café</p>");
        assert_eq!(decoded.encoding_label, "windows-1252");
    }

    #[test]
    fn plain_utf8_without_header() {
        let decoded = decode_markup("<div>Läuft</div>".as_bytes(), None).unwrap();
        assert_eq!(decoded.markup, "<div>Läuft</div>");
        assert_eq!(decoded.encoding_label, "UTF-8");
    }

    #[test]
    fn bom_wins_over_header() {
        let decoded = decode_markup(b"\xEF\xBB\xBFok", Some("text/html; charset=iso-8859-1")).unwrap();
        assert_eq!(decoded.markup, "ok");
    }
}

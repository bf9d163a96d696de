//! EXIF decoding over a fetched object prefix.

use crate::error::{ErrorKind, Result};
use crate::format::Format;
use crate::models::Metadata;
use exif::{Field, In, Tag, Value};
use exn::OptionExt;
use serde_json::{Number, Value as JsonValue};
use std::io::Cursor;
use tracing::instrument;

/// Undefined-typed values longer than this are opaque blobs (maker notes,
/// embedded previews) and are not worth storing.
const MAX_UNDEFINED_LEN: usize = 64;

#[derive(Debug)]
pub struct Extractor<'a> {
    bytes: &'a [u8],
}

impl<'a> Extractor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn format(&self) -> Option<Format> {
        Format::from_magic_bytes(self.bytes)
    }

    /// Decode every recognised primary-image field into a [`Metadata`] map.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Empty`] for a zero-length buffer.
    /// - [`ErrorKind::UnsupportedFormat`] when the magic bytes are unknown.
    /// - [`ErrorKind::NoMetadata`] when there is no EXIF block, or nothing in
    ///   it maps to a named field.
    /// - [`ErrorKind::Truncated`] when the block runs past the fetched bytes.
    /// - [`ErrorKind::Malformed`] for anything else the decoder rejects.
    #[instrument(level = "trace", skip(self), fields(len = self.bytes.len()))]
    pub fn metadata(&self) -> Result<Metadata> {
        if self.bytes.is_empty() {
            exn::bail!(ErrorKind::Empty);
        }
        let format = self.format().ok_or_raise(|| ErrorKind::UnsupportedFormat)?;
        if format == Format::Jpeg && jpeg_header_overruns(self.bytes) {
            exn::bail!(ErrorKind::Truncated);
        }

        let exif = exif::Reader::new()
            .read_from_container(&mut Cursor::new(self.bytes))
            .map_err(|err| exn::Exn::from(classify(err, format)))?;

        let metadata: Metadata = exif
            .fields()
            .filter(|field| field.ifd_num == In::PRIMARY && field.tag != Tag::MakerNote)
            .filter_map(|field| Some((field_name(field.tag)?, convert(field)?)))
            .collect();
        if metadata.is_empty() {
            exn::bail!(ErrorKind::NoMetadata(format.name()));
        }
        tracing::trace!(fields = metadata.len(), %format, "Decoded EXIF fields");
        Ok(metadata)
    }
}

fn classify(err: exif::Error, format: Format) -> ErrorKind {
    match err {
        exif::Error::NotFound(_) => ErrorKind::NoMetadata(format.name()),
        exif::Error::Io(_) => ErrorKind::Truncated,
        exif::Error::InvalidFormat(msg) if msg.contains("runcated") => ErrorKind::Truncated,
        other => ErrorKind::Malformed(other.to_string()),
    }
}

/// Walk the JPEG marker segments up to the first APP1 and report whether the
/// buffer ends before that segment does.
fn jpeg_header_overruns(bytes: &[u8]) -> bool {
    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return false;
        }
        let marker = bytes[pos + 1];
        // EOI, or SOS and the entropy-coded data after it.
        if marker == 0xD9 || marker == 0xDA {
            return false;
        }
        let len = usize::from(u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]));
        let end = pos + 2 + len;
        if end > bytes.len() {
            return true;
        }
        if marker == 0xE1 {
            return false;
        }
        pos = end;
    }
    // A lone EOI straight after SOI fits in two bytes.
    !(pos + 2 <= bytes.len() && bytes[pos..pos + 2] == [0xFF, 0xD9])
}

/// The snake_case name of a tag, or `None` for tags the decoder has no name
/// for (those display as `Tag(Context, number)`).
fn field_name(tag: Tag) -> Option<String> {
    let name = tag.to_string();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(snake_case(&name))
}

/// Convert a CamelCase EXIF tag name to snake_case.
///
/// Runs of capitals are treated as one acronym word, so `GPSLatitude` becomes
/// `gps_latitude` and `XResolution` becomes `x_resolution`.
pub(crate) fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase() || prev.is_ascii_digit() || (prev.is_ascii_uppercase() && next_is_lower) {
                out.push('_');
            }
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// Convert a decoded field value to JSON. Single-element arrays collapse to a
/// scalar.
fn convert(field: &Field) -> Option<JsonValue> {
    let values: Vec<JsonValue> = match &field.value {
        Value::Ascii(strings) => {
            let text = strings
                .iter()
                .map(|s| String::from_utf8_lossy(s).trim_end_matches('\0').trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            return (!text.is_empty()).then_some(JsonValue::String(text));
        },
        Value::Byte(v) => v.iter().map(|&n| JsonValue::from(n)).collect(),
        Value::Short(v) => v.iter().map(|&n| JsonValue::from(n)).collect(),
        Value::Long(v) => v.iter().map(|&n| JsonValue::from(n)).collect(),
        Value::SByte(v) => v.iter().map(|&n| JsonValue::from(n)).collect(),
        Value::SShort(v) => v.iter().map(|&n| JsonValue::from(n)).collect(),
        Value::SLong(v) => v.iter().map(|&n| JsonValue::from(n)).collect(),
        Value::Rational(v) => v.iter().map(|r| float(r.to_f64())).collect(),
        Value::SRational(v) => v.iter().map(|r| float(r.to_f64())).collect(),
        Value::Float(v) => v.iter().map(|&n| float(f64::from(n))).collect(),
        Value::Double(v) => v.iter().map(|&n| float(n)).collect(),
        Value::Undefined(bytes, _) if bytes.len() <= MAX_UNDEFINED_LEN => {
            return Some(JsonValue::String(field.display_value().to_string()));
        },
        _ => return None,
    };
    match values.len() {
        0 => None,
        1 => values.into_iter().next(),
        _ => Some(JsonValue::Array(values)),
    }
}

/// Zero denominators decode to NaN or infinity, which JSON cannot carry;
/// those become `null`.
fn float(n: f64) -> JsonValue {
    Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, ExifBuilder, TAG_DATE_TIME, TAG_MAKE, TAG_ORIENTATION, TAG_X_RESOLUTION};
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("Orientation", "orientation")]
    #[case("XResolution", "x_resolution")]
    #[case("FNumber", "f_number")]
    #[case("GPSLatitude", "gps_latitude")]
    #[case("GPSLatitudeRef", "gps_latitude_ref")]
    #[case("DateTimeOriginal", "date_time_original")]
    #[case("ISOSpeed", "iso_speed")]
    #[case("ExifVersion", "exif_version")]
    #[case("YCbCrPositioning", "y_cb_cr_positioning")]
    #[case("Gamma", "gamma")]
    fn test_snake_case(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(snake_case(input), expected);
    }

    #[test]
    fn test_jpeg_fields() {
        let bytes = fixtures::camera_jpeg("Canon", "EOS R5", 6);
        let metadata = Extractor::new(&bytes).metadata().unwrap();
        assert_eq!(metadata.get("make"), Some(&json!("Canon")));
        assert_eq!(metadata.get("model"), Some(&json!("EOS R5")));
        assert_eq!(metadata.get("orientation"), Some(&json!(6)));
        assert_eq!(metadata.get("x_resolution"), Some(&json!(72.0)));
    }

    #[test]
    fn test_standalone_tiff() {
        let bytes = ExifBuilder::new().short(TAG_ORIENTATION, 1).ascii(TAG_DATE_TIME, "2024:07:01 12:30:00").tiff();
        let extractor = Extractor::new(&bytes);
        assert_eq!(extractor.format(), Some(Format::Tiff));
        let metadata = extractor.metadata().unwrap();
        assert_eq!(metadata.get("date_time"), Some(&json!("2024:07:01 12:30:00")));
        assert_eq!(metadata.get("orientation"), Some(&json!(1)));
    }

    #[test]
    fn test_zero_denominator_is_null() {
        let bytes = ExifBuilder::new().ascii(TAG_MAKE, "Nikon").rational(TAG_X_RESOLUTION, 72, 0).jpeg(0);
        let metadata = Extractor::new(&bytes).metadata().unwrap();
        assert_eq!(metadata.get("make"), Some(&json!("Nikon")));
        assert_eq!(metadata.get("x_resolution"), Some(&JsonValue::Null));
    }

    #[test]
    fn test_empty_buffer() {
        let err = Extractor::new(b"").metadata().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Empty));
    }

    #[rstest]
    #[case(b"GIF89a\x01\x00\x01\x00")]
    #[case(b"plain text, not an image")]
    fn test_unsupported_format(#[case] bytes: &[u8]) {
        let err = Extractor::new(bytes).metadata().unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat));
    }

    #[test]
    fn test_jpeg_without_exif() {
        let bytes = fixtures::bare_jpeg();
        let err = Extractor::new(&bytes).metadata().unwrap_err();
        assert!(matches!(&*err, ErrorKind::NoMetadata("JPEG")));
    }

    #[rstest]
    #[case(6)]
    #[case(20)]
    #[case(40)]
    fn test_truncated_jpeg(#[case] len: usize) {
        let bytes = fixtures::camera_jpeg("Canon", "EOS R5", 1);
        let err = Extractor::new(&bytes[..len]).metadata().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Truncated), "unexpected error at {len} bytes: {err:?}");
    }

    // Offsets into `camera_jpeg`: the TIFF header starts at 12, the IFD0
    // entry count sits at 20.
    #[test]
    fn test_corrupted_byte_order() {
        let mut bytes = fixtures::camera_jpeg("Canon", "EOS R5", 1);
        bytes[12..14].copy_from_slice(b"XX");
        let err = Extractor::new(&bytes).metadata().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Malformed(_)), "unexpected error: {err:?}");
        assert_eq!(crate::extract(&bytes), None);
    }

    #[test]
    fn test_corrupted_entry_count() {
        let mut bytes = fixtures::camera_jpeg("Canon", "EOS R5", 1);
        bytes[20..22].copy_from_slice(&[0xFF, 0xFF]);
        let err = Extractor::new(&bytes).metadata().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Truncated | ErrorKind::Malformed(_)), "unexpected error: {err:?}");
        assert_eq!(crate::extract(&bytes), None);
    }

    #[test]
    fn test_header_fits_in_prefix() {
        let bytes = fixtures::camera_jpeg("Canon", "EOS R5", 1);
        // Drop the filler and EOI, keep the whole APP1 segment.
        let prefix = &bytes[..bytes.len() - 258];
        assert!(!jpeg_header_overruns(prefix));
        assert!(Extractor::new(prefix).metadata().is_ok());
    }
}

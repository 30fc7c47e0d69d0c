//! miniCBF image decoding.
//!
//! Pilatus detectors write "miniCBF": an ASCII CIF wrapper around a single
//! binary section compressed with the CBF byte-offset scheme. Only the
//! dialect the detector writes is handled: one binary section,
//! `x-CBF_BYTE_OFFSET` conversion, signed 32-bit little-endian elements.
//!
//! Decoding is an honest [`Result`]; the zero-fill degradation the pipeline
//! relies on lives in the assembler, not here.

use std::fs;
use std::path::Path;

use ndarray::Array2;

use crate::error::DecodeError;

/// MIME boundary that opens the binary section.
const SECTION_BOUNDARY: &[u8] = b"--CIF-BINARY-FORMAT-SECTION--";

/// Marks the start of the compressed pixel stream.
const BINARY_MARKER: [u8; 4] = [0x0c, 0x1a, 0x04, 0xd5];

const ELEMENT_TYPE_I32: &str = "signed 32-bit integer";
const CONVERSION_BYTE_OFFSET: &str = "x-CBF_BYTE_OFFSET";

/// Decode the miniCBF file at `path` into a `(rows, cols)` pixel array.
///
/// # Errors
///
/// Any I/O or format problem comes back as a [`DecodeError`]; nothing is
/// degraded at this layer.
pub fn decode(path: impl AsRef<Path>) -> Result<Array2<i32>, DecodeError> {
    let bytes = fs::read(path)?;
    decode_bytes(&bytes)
}

/// Decode an in-memory miniCBF payload.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_bytes(bytes: &[u8]) -> Result<Array2<i32>, DecodeError> {
    let boundary = find(bytes, SECTION_BOUNDARY).ok_or(DecodeError::NotCbf)?;
    let after_boundary = &bytes[boundary + SECTION_BOUNDARY.len()..];

    let marker = find(after_boundary, &BINARY_MARKER).ok_or(DecodeError::MissingMarker)?;
    let header = BinaryHeader::parse(&after_boundary[..marker])?;
    let stream = &after_boundary[marker + BINARY_MARKER.len()..];

    let expected = header.rows * header.cols;
    if header.elements != expected {
        return Err(DecodeError::ElementCount {
            expected,
            got: header.elements,
        });
    }

    let pixels = byte_offset_decode(stream, expected)?;
    Array2::from_shape_vec((header.rows, header.cols), pixels)
        .map_err(|_| DecodeError::MalformedField("X-Binary-Size-Second-Dimension"))
}

/// Fields of the binary-section header this dialect needs.
struct BinaryHeader {
    rows: usize,
    cols: usize,
    elements: usize,
}

impl BinaryHeader {
    fn parse(raw: &[u8]) -> Result<Self, DecodeError> {
        let text = String::from_utf8_lossy(raw);

        let conversions = quoted_attr(&text, "conversions=\"").unwrap_or("(none)");
        if conversions != CONVERSION_BYTE_OFFSET {
            return Err(DecodeError::UnsupportedCompression(conversions.to_string()));
        }

        let element_type = field(&text, "X-Binary-Element-Type")
            .ok_or(DecodeError::MissingField("X-Binary-Element-Type"))?
            .trim_matches('"');
        if element_type != ELEMENT_TYPE_I32 {
            return Err(DecodeError::UnsupportedElementType(element_type.to_string()));
        }

        if let Some(order) = field(&text, "X-Binary-Element-Byte-Order") {
            if !order.eq_ignore_ascii_case("LITTLE_ENDIAN") {
                return Err(DecodeError::UnsupportedByteOrder(order.to_string()));
            }
        }

        Ok(Self {
            cols: int_field(&text, "X-Binary-Size-Fastest-Dimension")?,
            rows: int_field(&text, "X-Binary-Size-Second-Dimension")?,
            elements: int_field(&text, "X-Binary-Number-of-Elements")?,
        })
    }
}

/// Value of a `Key: value` header line, trimmed.
fn field<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines().find_map(|line| {
        let line = line.trim();
        let rest = line.strip_prefix(key)?;
        let rest = rest.trim_start();
        rest.strip_prefix(':').map(str::trim)
    })
}

fn int_field(text: &str, key: &'static str) -> Result<usize, DecodeError> {
    let value = field(text, key).ok_or(DecodeError::MissingField(key))?;
    value
        .parse::<usize>()
        .map_err(|_| DecodeError::MalformedField(key))
}

/// Value of a `name="value"` attribute anywhere in the header.
fn quoted_attr<'a>(text: &'a str, open: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let rest = &text[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// CBF byte-offset decompression.
///
/// A running accumulator starts at zero; each element is the accumulator
/// after adding a delta. Deltas are one signed byte, with `0x80` escaping to
/// a little-endian `i16` and `0x8000` escaping further to an `i32`. The
/// 64-bit escape level cannot occur with a 32-bit pixel type and is rejected
/// as corrupt.
fn byte_offset_decode(stream: &[u8], n: usize) -> Result<Vec<i32>, DecodeError> {
    let truncated = |got: usize| DecodeError::Truncated { expected: n, got };

    let mut out = Vec::with_capacity(n);
    let mut current: i32 = 0;
    let mut pos = 0usize;

    while out.len() < n {
        let byte = *stream.get(pos).ok_or_else(|| truncated(out.len()))?;
        pos += 1;

        let delta = if byte != 0x80 {
            i32::from(byte as i8)
        } else {
            let two = stream.get(pos..pos + 2).ok_or_else(|| truncated(out.len()))?;
            let short = i16::from_le_bytes([two[0], two[1]]);
            pos += 2;
            if short != i16::MIN {
                i32::from(short)
            } else {
                let four = stream.get(pos..pos + 4).ok_or_else(|| truncated(out.len()))?;
                let wide = i32::from_le_bytes([four[0], four[1], four[2], four[3]]);
                pos += 4;
                if wide == i32::MIN {
                    return Err(DecodeError::DeltaOverflow);
                }
                wide
            }
        };

        current = current.wrapping_add(delta);
        out.push(current);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Byte-offset compress `values`, picking the narrowest escape per delta.
    fn encode(values: &[i32]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut current = 0i64;
        for &v in values {
            let delta = i64::from(v) - current;
            if (-127..=127).contains(&delta) {
                out.push(delta as i8 as u8);
            } else if (-32767..=32767).contains(&delta) {
                out.push(0x80);
                out.extend_from_slice(&(delta as i16).to_le_bytes());
            } else {
                out.push(0x80);
                out.extend_from_slice(&i16::MIN.to_le_bytes());
                out.extend_from_slice(&(delta as i32).to_le_bytes());
            }
            current = i64::from(v);
        }
        out
    }

    fn minicbf(rows: usize, cols: usize, values: &[i32]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"###CBF: VERSION 1.5, CBFlib v0.7.8 - PILATUS detectors\r\n");
        out.extend_from_slice(b"\r\n_array_data.data\r\n;\r\n");
        out.extend_from_slice(SECTION_BOUNDARY);
        out.extend_from_slice(b"\r\nContent-Type: application/octet-stream;\r\n");
        out.extend_from_slice(b"     conversions=\"x-CBF_BYTE_OFFSET\"\r\n");
        out.extend_from_slice(b"Content-Transfer-Encoding: BINARY\r\n");
        out.extend_from_slice(b"X-Binary-ID: 1\r\n");
        out.extend_from_slice(b"X-Binary-Element-Type: \"signed 32-bit integer\"\r\n");
        out.extend_from_slice(b"X-Binary-Element-Byte-Order: LITTLE_ENDIAN\r\n");
        out.extend_from_slice(
            format!("X-Binary-Number-of-Elements: {}\r\n", values.len()).as_bytes(),
        );
        out.extend_from_slice(format!("X-Binary-Size-Fastest-Dimension: {cols}\r\n").as_bytes());
        out.extend_from_slice(format!("X-Binary-Size-Second-Dimension: {rows}\r\n").as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&BINARY_MARKER);
        out.extend_from_slice(&encode(values));
        out.extend_from_slice(b"\r\n--CIF-BINARY-FORMAT-SECTION----\r\n;\r\n");
        out
    }

    #[test]
    fn test_decode_small_image() {
        let values = [0, 1, 2, 3, 100, -5];
        let bytes = minicbf(2, 3, &values);
        let img = decode_bytes(&bytes).unwrap();
        assert_eq!(img.dim(), (2, 3));
        assert_eq!(img.as_slice().unwrap(), &values);
    }

    #[test]
    fn test_decode_wide_deltas_through_escapes() {
        // Forces the i16 and i32 escape levels.
        let values = [0, 300, -40_000, 2_000_000, 2_000_001];
        let bytes = minicbf(1, 5, &values);
        let img = decode_bytes(&bytes).unwrap();
        assert_eq!(img.as_slice().unwrap(), &values);
    }

    #[test]
    fn test_garbage_is_not_cbf() {
        let err = decode_bytes(b"not an image at all").unwrap_err();
        assert!(matches!(err, DecodeError::NotCbf));
    }

    #[test]
    fn test_truncated_stream_is_reported() {
        let values: Vec<i32> = (0..12).collect();
        let mut bytes = minicbf(3, 4, &values);
        // Cut mid-stream: keep the marker and six of the twelve deltas.
        let pos = find(&bytes, &BINARY_MARKER).unwrap();
        bytes.truncate(pos + BINARY_MARKER.len() + 6);
        let err = decode_bytes(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { expected: 12, .. }));
    }

    #[test]
    fn test_element_count_mismatch_is_rejected() {
        let values = [0, 1, 2, 3];
        let bytes = minicbf(2, 3, &values); // header says 4 elements, dims imply 6
        let err = decode_bytes(&bytes).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::ElementCount {
                expected: 6,
                got: 4
            }
        ));
    }

    #[test]
    fn test_unsupported_compression_is_rejected() {
        let mut bytes = minicbf(1, 2, &[1, 2]);
        // Overwrite the conversion token in place; same length keeps the
        // rest of the payload intact.
        let pos = find(&bytes, b"x-CBF_BYTE_OFFSET").unwrap();
        bytes[pos..pos + 17].copy_from_slice(b"x-CBF_CANONICAL__");
        let err = decode_bytes(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedCompression(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = decode("/nonexistent/dir/img.cbf").unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)));
    }
}

//! Shared helpers: synthesize miniCBF files the way the detector's
//! acquisition software writes them.

use std::fs;
use std::path::Path;

use ndarray::Array2;

const BINARY_MARKER: [u8; 4] = [0x0c, 0x1a, 0x04, 0xd5];

/// Byte-offset compress `values`, narrowest escape per delta.
fn byte_offset_encode(values: &[i32]) -> Vec<u8> {
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

/// Serialize `data` as a miniCBF payload.
pub fn minicbf_bytes(data: &Array2<i32>) -> Vec<u8> {
    let (rows, cols) = data.dim();
    let values: Vec<i32> = data.iter().copied().collect();

    let mut out = Vec::new();
    out.extend_from_slice(b"###CBF: VERSION 1.5, CBFlib v0.7.8 - PILATUS detectors\r\n");
    out.extend_from_slice(b"\r\n_array_data.data\r\n;\r\n");
    out.extend_from_slice(b"--CIF-BINARY-FORMAT-SECTION--\r\n");
    out.extend_from_slice(b"Content-Type: application/octet-stream;\r\n");
    out.extend_from_slice(b"     conversions=\"x-CBF_BYTE_OFFSET\"\r\n");
    out.extend_from_slice(b"Content-Transfer-Encoding: BINARY\r\n");
    out.extend_from_slice(b"X-Binary-ID: 1\r\n");
    out.extend_from_slice(b"X-Binary-Element-Type: \"signed 32-bit integer\"\r\n");
    out.extend_from_slice(b"X-Binary-Element-Byte-Order: LITTLE_ENDIAN\r\n");
    out.extend_from_slice(format!("X-Binary-Number-of-Elements: {}\r\n", values.len()).as_bytes());
    out.extend_from_slice(format!("X-Binary-Size-Fastest-Dimension: {cols}\r\n").as_bytes());
    out.extend_from_slice(format!("X-Binary-Size-Second-Dimension: {rows}\r\n").as_bytes());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&BINARY_MARKER);
    out.extend_from_slice(&byte_offset_encode(&values));
    out.extend_from_slice(b"\r\n--CIF-BINARY-FORMAT-SECTION----\r\n;\r\n");
    out
}

/// Write `data` as a miniCBF file at `path`.
pub fn write_cbf(path: impl AsRef<Path>, data: &Array2<i32>) {
    fs::write(path, minicbf_bytes(data)).unwrap();
}

/// A small test image with distinguishable pixel values.
pub fn test_image(rows: usize, cols: usize, offset: i32) -> Array2<i32> {
    Array2::from_shape_fn((rows, cols), |(r, c)| offset + (r * cols + c) as i32)
}

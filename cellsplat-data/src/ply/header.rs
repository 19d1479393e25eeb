//! Text header of the Gaussian asset format.

use std::io::{self, BufRead, Write};

use crate::codec::DecodeError;
use crate::types::SPLAT_FLOATS;

/// Line terminating the header.
pub const END_HEADER: &str = "end_header";

/// Property names in record order.
pub fn splat_property_names() -> Vec<String> {
    let mut names: Vec<String> = ["x", "y", "z", "nx", "ny", "nz"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    names.extend((0..3).map(|i| format!("f_dc_{i}")));
    names.extend((0..45).map(|i| format!("f_rest_{i}")));
    names.push("opacity".to_string());
    names.extend((0..3).map(|i| format!("scale_{i}")));
    names.extend((0..4).map(|i| format!("rot_{i}")));
    debug_assert_eq!(names.len(), SPLAT_FLOATS);
    names
}

/// What the header declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlyHeader {
    pub format: Option<String>,
    pub vertex_count: Option<usize>,
    /// `(type, name)` of each vertex property, in order.
    pub properties: Vec<(String, String)>,
    pub magic: bool,
}

impl PlyHeader {
    /// Whether the header describes little-endian splat records in the
    /// expected property order.
    pub fn matches_splat_layout(&self) -> bool {
        let expected = splat_property_names();
        self.magic
            && self.format.as_deref() == Some("binary_little_endian 1.0")
            && self.properties.len() == expected.len()
            && self
                .properties
                .iter()
                .zip(&expected)
                .all(|((ty, name), want)| ty == "float" && name == want)
    }
}

/// Consume header lines up to and including [`END_HEADER`].
///
/// Returns `Ok(None)` if the input ends before the sentinel.
pub(crate) fn read_header<R: BufRead>(reader: &mut R) -> Result<Option<PlyHeader>, DecodeError> {
    let mut header = PlyHeader::default();
    let mut in_vertex = false;
    let mut buf = Vec::new();
    let mut first = true;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        let line = std::str::from_utf8(&buf)
            .map_err(|source| DecodeError::InvalidText {
                location: crate::codec::Location::Header,
                field: "header line",
                source,
            })?
            .trim();

        if first {
            header.magic = line == "ply";
            first = false;
        }
        if line == END_HEADER {
            return Ok(Some(header));
        }

        let mut words = line.split_whitespace();
        match words.next() {
            Some("format") => header.format = Some(words.collect::<Vec<_>>().join(" ")),
            Some("element") => {
                in_vertex = words.next() == Some("vertex");
                if in_vertex {
                    header.vertex_count = words.next().and_then(|n| n.parse().ok());
                }
            }
            Some("property") if in_vertex => {
                if let (Some(ty), Some(name)) = (words.next(), words.next()) {
                    header.properties.push((ty.to_string(), name.to_string()));
                }
            }
            _ => {}
        }
    }
}

pub(crate) fn write_header<W: Write>(writer: &mut W, vertex_count: usize) -> io::Result<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format binary_little_endian 1.0")?;
    writeln!(writer, "element vertex {vertex_count}")?;
    for name in splat_property_names() {
        writeln!(writer, "property float {name}")?;
    }
    writeln!(writer, "{END_HEADER}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_property_order() {
        let names = splat_property_names();
        assert_eq!(names.len(), 62);
        assert_eq!(&names[..3], &["x", "y", "z"]);
        assert_eq!(names[6], "f_dc_0");
        assert_eq!(names[9], "f_rest_0");
        assert_eq!(names[53], "f_rest_44");
        assert_eq!(names[54], "opacity");
        assert_eq!(names[61], "rot_3");
    }

    #[test]
    fn test_written_header_parses_back() {
        let mut bytes = Vec::new();
        write_header(&mut bytes, 5).unwrap();
        bytes.extend([1, 2, 3]);

        let mut cursor = Cursor::new(bytes);
        let header = read_header(&mut cursor).unwrap().unwrap();
        assert!(header.matches_splat_layout());
        assert_eq!(header.vertex_count, Some(5));

        // Reader is left at the first payload byte.
        let mut rest = Vec::new();
        std::io::Read::read_to_end(&mut cursor, &mut rest).unwrap();
        assert_eq!(rest, vec![1, 2, 3]);
    }

    #[test]
    fn test_missing_sentinel() {
        let mut cursor = Cursor::new(b"ply\nformat binary_little_endian 1.0\n".to_vec());
        assert!(read_header(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_layout_mismatch() {
        let text = "ply\nformat binary_little_endian 1.0\nelement vertex 1\n\
                    property float x\nproperty float y\nproperty float z\nend_header\n";
        let header = read_header(&mut Cursor::new(text.as_bytes().to_vec()))
            .unwrap()
            .unwrap();
        assert!(!header.matches_splat_layout());

        let text = "ply\nformat ascii 1.0\nend_header\n";
        let header = read_header(&mut Cursor::new(text.as_bytes().to_vec()))
            .unwrap()
            .unwrap();
        assert_eq!(header.format.as_deref(), Some("ascii 1.0"));
        assert!(!header.matches_splat_layout());
    }
}

//! Gaussian asset loading and saving.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use super::PlyError;
use super::header::{read_header, write_header};
use crate::codec::{DecodeError, FieldReader, MAX_PREALLOC};
use crate::types::{SPLAT_FLOATS, SPLAT_RECORD_SIZE, Splat};

fn decode_record(buf: &[u8; SPLAT_RECORD_SIZE]) -> Splat {
    let mut floats = [0f32; SPLAT_FLOATS];
    for (value, chunk) in floats.iter_mut().zip(buf.chunks_exact(4)) {
        *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Splat::from_floats(floats)
}

/// Decode a Gaussian asset.
///
/// The header is scanned up to `end_header`, then fixed-size records are read
/// until the input ends. A trailing partial record is an error.
pub fn read_splats<R: BufRead>(mut reader: R) -> Result<Vec<Splat>, PlyError> {
    let header = read_header(&mut reader)?.ok_or(PlyError::MissingEndHeader)?;
    if !header.magic {
        return Err(PlyError::HeaderMismatch("missing 'ply' magic line".into()));
    }
    if !header.matches_splat_layout() {
        return Err(PlyError::HeaderMismatch(format!(
            "format {:?} with {} vertex properties, expected binary_little_endian 1.0 with {} floats",
            header.format.as_deref().unwrap_or("<none>"),
            header.properties.len(),
            SPLAT_FLOATS
        )));
    }

    let mut r = FieldReader::new(reader);
    let mut splats = Vec::with_capacity(header.vertex_count.unwrap_or(0).min(MAX_PREALLOC));
    let mut buf = [0u8; SPLAT_RECORD_SIZE];
    loop {
        r.enter_record(splats.len());
        match r.fill(&mut buf)? {
            0 => break,
            SPLAT_RECORD_SIZE => splats.push(decode_record(&buf)),
            _ => {
                return Err(DecodeError::Truncated {
                    location: r.location(),
                    field: "splat record",
                }
                .into());
            }
        }
    }

    if let Some(declared) = header.vertex_count {
        if declared != splats.len() {
            warn!(
                "Header declares {} splats but {} records were read",
                declared,
                splats.len()
            );
        }
    }

    Ok(splats)
}

/// Encode a Gaussian asset.
pub fn write_splats<W: Write>(writer: &mut W, splats: &[Splat]) -> std::io::Result<()> {
    write_header(writer, splats.len())?;
    for splat in splats {
        for value in splat.to_floats() {
            writer.write_all(&value.to_le_bytes())?;
        }
    }
    Ok(())
}

/// Load a Gaussian asset file.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_splats(path: impl AsRef<Path>) -> Result<Vec<Splat>, PlyError> {
    let path = path.as_ref();
    debug!("Loading splats from: {}", path.display());
    let file = File::open(path).map_err(PlyError::io(path))?;
    let splats = read_splats(BufReader::new(file)).map_err(|e| e.in_file(path))?;
    info!("Loaded {} splats", splats.len());
    Ok(splats)
}

/// Save a Gaussian asset file, creating parent directories as needed.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn save_splats(path: impl AsRef<Path>, splats: &[Splat]) -> Result<(), PlyError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(PlyError::io(parent))?;
    }
    let file = File::create(path).map_err(PlyError::io(path))?;
    let mut writer = BufWriter::new(file);
    write_splats(&mut writer, splats)
        .and_then(|_| writer.flush())
        .map_err(PlyError::io(path))?;
    info!("Wrote {} splats", splats.len());
    Ok(())
}

//! `points3D.bin` encoding.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use glam::DVec3;
use tracing::warn;

use crate::codec::{DecodeError, FieldReader, MAX_PREALLOC};
use crate::types::{Point3D, TrackElement};

/// Decode a points file.
///
/// Reads exactly the declared number of records; trailing bytes are ignored.
pub fn read_points3d<R: BufRead>(reader: R) -> Result<BTreeMap<u64, Point3D>, DecodeError> {
    let mut r = FieldReader::new(reader);
    let count = r.u64("point count")?;

    let mut points = BTreeMap::new();
    for index in 0..count as usize {
        r.enter_record(index);

        let id = r.u64("point id")?;
        let position = DVec3::from_array(r.f64s::<3>("position")?);
        let color = [r.u8("color")?, r.u8("color")?, r.u8("color")?];
        let error = r.f64("error")?;

        let track_length = r.u64("track length")? as usize;
        let mut track = Vec::with_capacity(track_length.min(MAX_PREALLOC));
        for _ in 0..track_length {
            let camera_id = r.u32("track camera id")?;
            let point2d_idx = r.u32("track point2d index")?;
            track.push(TrackElement::new(camera_id, point2d_idx));
        }

        let point = Point3D {
            position,
            color,
            error,
            track,
        };
        if points.insert(id, point).is_some() {
            warn!("Duplicate point id {} at record {}, keeping the later one", id, index);
        }
    }

    Ok(points)
}

/// Encode a points file.
pub fn write_points3d<W: Write>(writer: &mut W, points: &BTreeMap<u64, Point3D>) -> io::Result<()> {
    writer.write_all(&(points.len() as u64).to_le_bytes())?;

    for (id, point) in points {
        writer.write_all(&id.to_le_bytes())?;
        crate::codec::write_f64s(writer, &point.position.to_array())?;
        writer.write_all(&point.color)?;
        writer.write_all(&point.error.to_le_bytes())?;
        writer.write_all(&(point.track.len() as u64).to_le_bytes())?;
        for el in &point.track {
            writer.write_all(&el.camera_id.to_le_bytes())?;
            writer.write_all(&el.point2d_idx.to_le_bytes())?;
        }
    }

    Ok(())
}

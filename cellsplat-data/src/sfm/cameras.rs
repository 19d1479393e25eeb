//! `images.bin` encoding: one record per registered image (camera pose).

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use glam::{DQuat, DVec2, DVec3};
use tracing::warn;

use crate::codec::{DecodeError, FieldReader, MAX_PREALLOC, write_f64s};
use crate::types::{Camera, Observation};

/// Decode an images file.
///
/// Reads exactly the declared number of records; trailing bytes are ignored.
pub fn read_cameras<R: BufRead>(reader: R) -> Result<BTreeMap<u32, Camera>, DecodeError> {
    let mut r = FieldReader::new(reader);
    let count = r.u64("camera count")?;

    let mut cameras = BTreeMap::new();
    for index in 0..count as usize {
        r.enter_record(index);

        let id = r.u32("camera id")?;
        let [w, x, y, z] = r.f64s::<4>("rotation")?;
        let translation = DVec3::from_array(r.f64s::<3>("translation")?);
        let model_id = r.u32("camera model id")?;
        let name = r.nul_terminated("image name")?;

        // Coordinates and ids are stored as two consecutive arrays.
        let point_count = r.u64("point2d count")? as usize;
        let mut observations = Vec::with_capacity(point_count.min(MAX_PREALLOC));
        for _ in 0..point_count {
            let [px, py] = r.f64s::<2>("point2d coordinates")?;
            observations.push(Observation::untracked(DVec2::new(px, py)));
        }
        for obs in &mut observations {
            obs.point3d_id = r.i64("point3d id")?;
        }

        let camera = Camera {
            rotation: DQuat::from_xyzw(x, y, z, w),
            translation,
            model_id,
            name,
            observations,
        };
        if cameras.insert(id, camera).is_some() {
            warn!("Duplicate camera id {} at record {}, keeping the later one", id, index);
        }
    }

    Ok(cameras)
}

/// Encode an images file.
///
/// Names are stored NUL-terminated, so a name containing a NUL byte is
/// rejected before anything is written.
pub fn write_cameras<W: Write>(writer: &mut W, cameras: &BTreeMap<u32, Camera>) -> io::Result<()> {
    if let Some((id, _)) = cameras.iter().find(|(_, c)| c.name.as_bytes().contains(&0)) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("camera {id} has a name containing a NUL byte"),
        ));
    }

    writer.write_all(&(cameras.len() as u64).to_le_bytes())?;

    for (id, camera) in cameras {
        let q = camera.rotation;
        writer.write_all(&id.to_le_bytes())?;
        write_f64s(writer, &[q.w, q.x, q.y, q.z])?;
        write_f64s(writer, &camera.translation.to_array())?;
        writer.write_all(&camera.model_id.to_le_bytes())?;
        writer.write_all(camera.name.as_bytes())?;
        writer.write_all(&[0])?;

        writer.write_all(&(camera.observations.len() as u64).to_le_bytes())?;
        for obs in &camera.observations {
            write_f64s(writer, &obs.xy.to_array())?;
        }
        for obs in &camera.observations {
            writer.write_all(&obs.point3d_id.to_le_bytes())?;
        }
    }

    Ok(())
}

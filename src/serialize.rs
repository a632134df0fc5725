use std::io::Write;

use serde::Serialize;

/// Appends `data`, encoded as JSON, as the archive entry at `path`.
pub fn serialize_object<W: Write>(
    path: String,
    data: &impl Serialize,
    archive_builder: &mut tar::Builder<W>,
) -> Result<(), Box<dyn std::error::Error + 'static>> {
    let encoded = serde_json::to_vec_pretty(data)?;

    let mut header = tar::Header::new_gnu();
    header.set_size(encoded.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    archive_builder.append_data(&mut header, path, encoded.as_slice())?;
    Ok(())
}

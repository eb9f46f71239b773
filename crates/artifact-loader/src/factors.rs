//! Binary factor-matrix format.
//!
//! `user_factors.bin` / `item_factors.bin` hold a small fixed header —
//! two little-endian u64s giving (rows, cols) — followed by the
//! row-major float32 payload. The spec pins the on-disk shape
//! ("float32, row-major") but not a byte layout; this header lets the
//! loader validate dimensions up front instead of trusting the id
//! maps alone.

use ndarray::Array2;
use std::io::Read;
use std::path::Path;

pub fn load_factor_matrix(path: &Path) -> anyhow::Result<Array2<f32>> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| anyhow::anyhow!("opening factor file {}: {e}", path.display()))?;

    let mut header = [0u8; 16];
    file.read_exact(&mut header)
        .map_err(|e| anyhow::anyhow!("reading header of {}: {e}", path.display()))?;
    let rows = u64::from_le_bytes(header[0..8].try_into().unwrap()) as usize;
    let cols = u64::from_le_bytes(header[8..16].try_into().unwrap()) as usize;

    if cols == 0 {
        anyhow::bail!("factor file {} declares zero columns", path.display());
    }

    let mut payload = Vec::with_capacity(rows * cols);
    let mut buf = vec![0u8; rows * cols * 4];
    file.read_exact(&mut buf)
        .map_err(|e| anyhow::anyhow!("reading payload of {}: {e}", path.display()))?;
    for chunk in buf.chunks_exact(4) {
        payload.push(f32::from_le_bytes(chunk.try_into().unwrap()));
    }

    Array2::from_shape_vec((rows, cols), payload)
        .map_err(|e| anyhow::anyhow!("shape mismatch in {}: {e}", path.display()))
}

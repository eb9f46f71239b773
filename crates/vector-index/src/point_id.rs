//! Stable ItemId -> point id derivation, ported from the original
//! `qdrant_manager.py::_item_id_to_int`: the first 16 hex digits of
//! the item id's MD5 digest, interpreted as a u64, masked to 63 bits.

pub fn item_id_to_point_id(item_id: &str) -> u64 {
    let digest = md5::compute(item_id.as_bytes());
    let hex = format!("{digest:x}");
    let first16 = &hex[..16];
    let value = u64::from_str_radix(first16, 16).expect("16 hex chars always parse as u64");
    value & 0x7FFF_FFFF_FFFF_FFFF // mod 2^63
}

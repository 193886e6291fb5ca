use uuid::Uuid;

pub const ID_LEN: usize = 24;

pub fn generate_id() -> String {
    let uuid = Uuid::now_v7();
    let hex = format!("{:032x}", uuid.as_u128());
    // 48-bit millisecond timestamp followed by the low 48 random bits, so ids
    // sort by creation time and stay unique within the same millisecond.
    format!("{}{}", &hex[..12], &hex[20..])
}

/// Whether `id` has the shape of an identifier produced by [`generate_id`].
pub fn is_valid(id: &str) -> bool {
    id.len() == ID_LEN && id.bytes().all(|b| b.is_ascii_hexdigit())
}

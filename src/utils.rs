use indicatif::ProgressStyle;

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
        .expect("invalid progress bar template")
        .progress_chars("##-")
}

/// 根据目录中的图片路径生成确定性的对象 ID
///
/// 取 BLAKE3 哈希的前 16 字节，按 UUIDv8 格式输出，重复导入同一条记录时会覆盖旧对象。
pub fn object_id(image_ref: &str) -> String {
    let hash = blake3::hash(image_ref.as_bytes());
    let mut b = [0u8; 16];
    b.copy_from_slice(&hash.as_bytes()[..16]);
    b[6] = (b[6] & 0x0f) | 0x80;
    b[8] = (b[8] & 0x3f) | 0x80;
    let hex = b.iter().map(|x| format!("{x:02x}")).collect::<String>();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_id_is_stable_uuid() {
        let id = object_id("1163.jpg");
        assert_eq!(id, object_id("1163.jpg"));
        assert_ne!(id, object_id("1164.jpg"));

        let parts = id.split('-').map(str::len).collect::<Vec<_>>();
        assert_eq!(parts, vec![8, 4, 4, 4, 12]);
        assert_eq!(&id[14..15], "8");
    }
}

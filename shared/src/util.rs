/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a Snowflake-style i64 for use as resource ID.
///
/// Layout (53 bits, fits in JavaScript's Number.MAX_SAFE_INTEGER):
///   - 41 bits: milliseconds since 2024-01-01 UTC (~69 years)
///   - 12 bits: random (4096 values per ms)
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    // Custom epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let now = now_millis();
    let ts = (now - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let rand_bits: i64 = rand::thread_rng().gen_range(0..0x1000); // 12 bits
    (ts << 12) | rand_bits
}

/// Normalise an email for storage and comparison.
///
/// Identity providers hand back mixed-case addresses; every ownership check in
/// the service compares normalised values.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_ids_are_positive_and_distinct() {
        let a = snowflake_id();
        let b = snowflake_id();
        assert!(a > 0);
        assert!(b > 0);
        // 同一毫秒内仍可能碰撞，但概率 1/4096
        assert!(a >> 12 <= b >> 12);
    }

    #[test]
    fn test_snowflake_fits_js_safe_integer() {
        const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;
        assert!(snowflake_id() <= MAX_SAFE_INTEGER);
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Reader@Example.COM "), "reader@example.com");
        assert_eq!(normalize_email("a@b.c"), "a@b.c");
    }
}

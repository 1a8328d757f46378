//! 运单号生成
//!
//! 格式 `PRCL-<UTC YYYYMMDD>-<6 位大写十六进制>`，后缀来自 3 字节系统随机数。
//! 唯一性由存储层的 UNIQUE 索引保证，生成器本身不查库。

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use shared::error::{AppError, AppResult};

const PREFIX: &str = "PRCL";
const SUFFIX_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackingId(String);

impl TrackingId {
    pub fn generate() -> AppResult<Self> {
        Self::generate_at(Utc::now())
    }

    pub fn generate_at(now: DateTime<Utc>) -> AppResult<Self> {
        let mut bytes = [0u8; 3];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| AppError::internal("Failed to generate tracking id"))?;
        Ok(Self::from_parts(now, bytes))
    }

    fn from_parts(now: DateTime<Utc>, bytes: [u8; 3]) -> Self {
        Self(format!(
            "{PREFIX}-{}-{}",
            now.format("%Y%m%d"),
            hex::encode_upper(bytes)
        ))
    }

    /// Validate an externally supplied tracking id
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split('-');
        let (Some(prefix), Some(date), Some(suffix), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };

        let valid = prefix == PREFIX
            && date.len() == 8
            && NaiveDate::parse_from_str(date, "%Y%m%d").is_ok()
            && suffix.len() == SUFFIX_LEN
            && suffix
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c));
        valid.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format() {
        let at = Utc.with_ymd_and_hms(2025, 3, 7, 23, 59, 0).unwrap();
        let id = TrackingId::from_parts(at, [0x0a, 0xbc, 0xff]);
        assert_eq!(id.as_str(), "PRCL-20250307-0ABCFF");
    }

    #[test]
    fn test_generate_parses() {
        let at = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        let id = TrackingId::generate_at(at).unwrap();
        assert!(id.as_str().starts_with("PRCL-20241231-"));
        assert_eq!(TrackingId::parse(id.as_str()), Some(id));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(TrackingId::parse("PRCL-20250307-0abcff").is_none());
        assert!(TrackingId::parse("PRCL-20251307-0ABCFF").is_none());
        assert!(TrackingId::parse("PKG-20250307-0ABCFF").is_none());
        assert!(TrackingId::parse("PRCL-20250307-0ABCF").is_none());
        assert!(TrackingId::parse("PRCL-20250307-0ABCFF-1").is_none());
    }

    #[test]
    fn test_generated_ids_differ() {
        // 2^24 空间，连续两次相同的概率可忽略
        let a = TrackingId::generate().unwrap();
        let b = TrackingId::generate().unwrap();
        assert_ne!(a, b);
    }
}

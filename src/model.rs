//! Plain records crossing the host-API seam.
//!
//! Everything the archiver persists is expressed with these types so the
//! crawl engine never touches platform library types directly.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct GuildRecord {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ChannelRecord {
    pub id: u64,
    pub guild_id: u64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub user_id: u64,
    pub name: String,
    pub discriminator: Option<u16>,
    pub nick: Option<String>,
    pub joined_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: u64,
    pub channel_id: u64,
    pub created_at: DateTime<Utc>,
    pub author_id: u64,
    pub author_name: String,
    /// Raw markup as delivered by the platform; resolved before persisting.
    pub content: String,
    pub mentions: Vec<UserRef>,
    pub attachments: Vec<AttachmentRecord>,
    pub embeds: Vec<EmbedRecord>,
}

#[derive(Debug, Clone)]
pub struct UserRef {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct AttachmentRecord {
    pub filename: String,
    pub content_type: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct EmbedRecord {
    pub kind: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub video_url: Option<String>,
}

/// Stored embed classification. The discriminants match the CHECK constraint
/// on the embeds table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedKind {
    Other = 0,
    Image = 1,
    Video = 2,
}

impl EmbedKind {
    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

/// Platform epoch: 2015-01-01T00:00:00Z, in milliseconds.
const SNOWFLAKE_EPOCH_MS: i64 = 1_420_070_400_000;

/// Smallest snowflake id whose embedded timestamp is >= `at`.
pub fn snowflake_at(at: DateTime<Utc>) -> u64 {
    let ms = (at.timestamp_millis() - SNOWFLAKE_EPOCH_MS).max(0) as u64;
    ms << 22
}

/// Pagination cursor that admits every message created at or after `at`.
/// The history endpoint treats its `after` parameter as exclusive.
pub fn cursor_before(at: DateTime<Utc>) -> u64 {
    snowflake_at(at).saturating_sub(1).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn snowflake_of_epoch_is_zero() {
        let epoch = Utc.timestamp_millis_opt(SNOWFLAKE_EPOCH_MS).unwrap();
        assert_eq!(snowflake_at(epoch), 0);
    }

    #[test]
    fn snowflake_encodes_millis_since_epoch() {
        let at = Utc.timestamp_millis_opt(SNOWFLAKE_EPOCH_MS + 1000).unwrap();
        assert_eq!(snowflake_at(at), 1000 << 22);
    }

    #[test]
    fn ids_order_like_timestamps() {
        let t1 = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        assert!(snowflake_at(t1) < snowflake_at(t2));
    }

    #[test]
    fn cursor_sits_just_below_the_boundary() {
        let at = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(cursor_before(at), snowflake_at(at) - 1);

        // A message stamped exactly at the boundary is admitted.
        assert!(snowflake_at(at) > cursor_before(at));
    }

    #[test]
    fn cursor_never_reaches_zero() {
        let epoch = Utc.timestamp_millis_opt(SNOWFLAKE_EPOCH_MS).unwrap();
        assert_eq!(cursor_before(epoch), 1);
    }
}

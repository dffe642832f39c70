//! Trait seam between the crawl engine and the remote chat platform.

use async_trait::async_trait;

use crate::error::ArchiveResult;
use crate::model::{ChannelRecord, GuildRecord, MemberRecord, MessageRecord};

/// Read-only view of the remote platform, as far as the archiver needs one.
///
/// Implementations page through remote listings; the engine drives the
/// cursors. Every method may suspend on network I/O and reports listing
/// failures as [`crate::error::ArchiveError::Api`].
#[async_trait]
pub trait ChatHost: Send + Sync {
    /// Every guild visible to the authenticated credential.
    async fn guilds(&self) -> ArchiveResult<Vec<GuildRecord>>;

    /// The guild's text channels.
    async fn text_channels(&self, guild_id: u64) -> ArchiveResult<Vec<ChannelRecord>>;

    /// One page of members with user ids strictly greater than `after`,
    /// ascending. An empty page ends the listing.
    async fn members_after(
        &self,
        guild_id: u64,
        after: Option<u64>,
    ) -> ArchiveResult<Vec<MemberRecord>>;

    /// One page of messages with ids strictly greater than `after`,
    /// ascending. An empty page means the channel has no further history.
    async fn messages_after(&self, channel_id: u64, after: u64)
        -> ArchiveResult<Vec<MessageRecord>>;
}

//! The archival crawling engine.
//!
//! A guild is archived by refreshing its metadata and membership, then
//! walking every text channel's lifetime as a sequence of fixed-size time
//! windows. Channels fan out under a bounded permit pool; everything inside
//! one channel (windows, messages, payload sub-fetches) runs strictly
//! sequentially so the per-window checkpoint stays meaningful.

pub mod media;
pub mod window;

use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::config::DATE_FMT;
use crate::db::Store;
use crate::error::ArchiveResult;
use crate::host::ChatHost;
use crate::model::{cursor_before, AttachmentRecord, ChannelRecord, EmbedRecord, GuildRecord, MessageRecord};
use crate::sanitize;
use media::{classify_embed, MediaFetcher};
use window::{windows, Window};

#[derive(Clone)]
pub struct Archiver {
    host: Arc<dyn ChatHost>,
    store: Store,
    media: Arc<MediaFetcher>,
    window_length: Duration,
    concurrency: usize,
}

impl Archiver {
    pub fn new(
        host: Arc<dyn ChatHost>,
        store: Store,
        media: Arc<MediaFetcher>,
        window_days: i64,
        concurrency: usize,
    ) -> Self {
        Self {
            host,
            store,
            media,
            window_length: Duration::days(window_days),
            concurrency: concurrency.max(1),
        }
    }

    /// Archives every guild visible to the credential, one at a time.
    pub async fn run(&self) -> ArchiveResult<()> {
        for guild in self.host.guilds().await? {
            self.archive_guild(&guild).await?;
        }
        Ok(())
    }

    pub async fn archive_guild(&self, guild: &GuildRecord) -> ArchiveResult<()> {
        info!("Archiving guild: {}", guild.name);
        self.store.upsert_guild(guild)?;
        self.sync_members(guild.id).await?;

        let channels = self.host.text_channels(guild.id).await?;
        info!(
            "Archiving {} channels concurrently ({}x)",
            channels.len(),
            self.concurrency
        );

        let limiter = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        for channel in channels {
            let archiver = self.clone();
            let limiter = Arc::clone(&limiter);
            tasks.spawn(async move {
                let _permit = match limiter.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                if let Err(e) = archiver.archive_channel(&channel).await {
                    error!("Failed to archive #{}: {e}", channel.name);
                }
            });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Channel task aborted: {e}");
            }
        }
        Ok(())
    }

    /// Unbounded paginated membership refresh; every page is upserted and the
    /// whole sync is committed once at the end.
    async fn sync_members(&self, guild_id: u64) -> ArchiveResult<()> {
        let mut total = 0usize;
        let mut after = None;
        loop {
            let page = self.host.members_after(guild_id, after).await?;
            let Some(last) = page.last() else { break };
            after = Some(last.user_id);
            total += page.len();
            for member in &page {
                self.store.upsert_member(guild_id, member)?;
            }
        }
        self.store.checkpoint()?;
        info!("Refreshed {total} members");
        Ok(())
    }

    /// Walks the channel's lifetime in fixed-size windows, committing after
    /// each one. "Now" is captured once on entry; windows that finish before
    /// the wall clock catches up are not reopened.
    pub async fn archive_channel(&self, channel: &ChannelRecord) -> ArchiveResult<()> {
        info!("Start archiving channel: #{}", channel.name);
        self.store.upsert_channel(channel)?;
        self.store.checkpoint()?;

        let until = Utc::now();
        for window in windows(channel.created_at, until, self.window_length) {
            info!(
                "Archiving interval: {} - {}",
                window.start.format(DATE_FMT),
                window.end.format(DATE_FMT)
            );
            self.archive_interval(channel.id, window).await?;
            self.store.checkpoint()?;
        }
        Ok(())
    }

    /// Pages through one window's history in ascending id order. Each message
    /// is persisted, then its attachments and embeds, before the next one is
    /// looked at.
    async fn archive_interval(&self, channel_id: u64, window: Window) -> ArchiveResult<()> {
        let mut cursor = cursor_before(window.start);
        'pages: loop {
            let page = self.host.messages_after(channel_id, cursor).await?;
            let Some(last) = page.last() else { break };
            cursor = last.id;
            for message in &page {
                if message.created_at >= window.end {
                    break 'pages;
                }
                self.archive_message(message).await?;
            }
        }
        Ok(())
    }

    async fn archive_message(&self, message: &MessageRecord) -> ArchiveResult<()> {
        debug!(
            "[{}] {}: {}",
            message.created_at.format(DATE_FMT),
            message.author_name,
            message.content
        );
        let content = sanitize::resolve_markup(&message.content, &message.mentions);
        self.store.upsert_message(message, &content)?;

        for attachment in &message.attachments {
            self.archive_attachment(message.id, attachment).await?;
        }
        for embed in &message.embeds {
            self.archive_embed(message.id, embed).await?;
        }
        Ok(())
    }

    async fn archive_attachment(
        &self,
        message_id: u64,
        attachment: &AttachmentRecord,
    ) -> ArchiveResult<()> {
        debug!("Download attachment: {}", attachment.url);
        let payload = self.media.download(&attachment.url).await;
        self.store
            .insert_attachment(message_id, attachment, payload.as_deref())
    }

    async fn archive_embed(&self, message_id: u64, embed: &EmbedRecord) -> ArchiveResult<()> {
        let (kind, source) = classify_embed(embed);
        let payload = match source {
            Some(url) => self.media.download(url).await,
            None => None,
        };
        self.store
            .insert_embed(message_id, kind, embed, payload.as_deref())
    }
}

//! serenity-backed implementation of the host seam.
//!
//! Pages arrive from the platform newest-first; everything here is
//! normalized to the ascending-id order the crawl engine expects.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::builder::GetMessages;
use serenity::http::{GuildPagination, Http};
use serenity::model::channel::{ChannelType, Message};
use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};
use serenity::model::timestamp::Timestamp;
use std::sync::Arc;

use crate::error::ArchiveResult;
use crate::host::ChatHost;
use crate::model::{
    AttachmentRecord, ChannelRecord, EmbedRecord, GuildRecord, MemberRecord, MessageRecord,
    UserRef,
};

const GUILD_PAGE: u64 = 200;
const MEMBER_PAGE: u64 = 1000;
const HISTORY_PAGE: u8 = 100;

pub struct DiscordHost {
    http: Arc<Http>,
}

impl DiscordHost {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChatHost for DiscordHost {
    async fn guilds(&self) -> ArchiveResult<Vec<GuildRecord>> {
        let mut records = Vec::new();
        let mut after: Option<GuildId> = None;
        loop {
            let target = after.map(GuildPagination::After);
            let page = self.http.get_guilds(target, Some(GUILD_PAGE)).await?;
            let Some(last) = page.last() else { break };
            after = Some(last.id);
            records.extend(page.into_iter().map(|info| GuildRecord {
                id: info.id.get(),
                name: info.name,
            }));
        }
        Ok(records)
    }

    async fn text_channels(&self, guild_id: u64) -> ArchiveResult<Vec<ChannelRecord>> {
        let channels = GuildId::new(guild_id).channels(&self.http).await?;
        let mut records: Vec<ChannelRecord> = channels
            .into_values()
            .filter(|channel| channel.kind == ChannelType::Text)
            .map(|channel| ChannelRecord {
                id: channel.id.get(),
                guild_id,
                name: channel.name,
                created_at: to_utc(channel.id.created_at()),
            })
            .collect();
        records.sort_by_key(|channel| channel.id);
        Ok(records)
    }

    async fn members_after(
        &self,
        guild_id: u64,
        after: Option<u64>,
    ) -> ArchiveResult<Vec<MemberRecord>> {
        let members = GuildId::new(guild_id)
            .members(&self.http, Some(MEMBER_PAGE), after.map(UserId::new))
            .await?;
        Ok(members
            .into_iter()
            .map(|member| MemberRecord {
                user_id: member.user.id.get(),
                name: member.user.name,
                discriminator: member.user.discriminator.map(|d| d.get()),
                nick: member.nick,
                joined_at: member.joined_at.map(to_utc),
            })
            .collect())
    }

    async fn messages_after(
        &self,
        channel_id: u64,
        after: u64,
    ) -> ArchiveResult<Vec<MessageRecord>> {
        let builder = GetMessages::new()
            .after(MessageId::new(after.max(1)))
            .limit(HISTORY_PAGE);
        let mut page = ChannelId::new(channel_id).messages(&self.http, builder).await?;
        page.sort_by_key(|message| message.id);
        Ok(page.into_iter().map(message_record).collect())
    }
}

fn to_utc(ts: Timestamp) -> DateTime<Utc> {
    ts.with_timezone(&Utc)
}

fn message_record(message: Message) -> MessageRecord {
    MessageRecord {
        id: message.id.get(),
        channel_id: message.channel_id.get(),
        created_at: to_utc(message.timestamp),
        author_id: message.author.id.get(),
        author_name: message.author.name,
        content: message.content,
        mentions: message
            .mentions
            .iter()
            .map(|user| UserRef {
                id: user.id.get(),
                name: user.name.clone(),
            })
            .collect(),
        attachments: message
            .attachments
            .into_iter()
            .map(|attachment| AttachmentRecord {
                filename: attachment.filename,
                content_type: attachment.content_type,
                url: attachment.url,
            })
            .collect(),
        embeds: message
            .embeds
            .into_iter()
            .map(|embed| EmbedRecord {
                kind: embed.kind,
                title: embed.title,
                description: embed.description,
                url: embed.url,
                video_url: embed.video.map(|video| video.url),
            })
            .collect(),
    }
}

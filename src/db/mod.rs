//! SQLite store for archived guild history.
//!
//! One connection is shared by every archival task. Keyed entities (guilds,
//! members, channels, messages) are written with `INSERT OR REPLACE`, so
//! re-crawling unchanged history is idempotent for those tables. Attachments
//! and embeds have no natural key and are plain-inserted; a re-crawl
//! duplicates their rows. Writes accumulate in an open transaction until
//! [`Store::checkpoint`] commits them.

use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::error::ArchiveResult;
use crate::model::{
    AttachmentRecord, ChannelRecord, EmbedKind, EmbedRecord, GuildRecord, MemberRecord,
    MessageRecord,
};

const SCHEMA: &str = include_str!("schema.sql");

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Opens (or creates) the database at `path` and bootstraps the schema.
    /// A deferred transaction is started immediately; nothing written after
    /// this point is durable until the next [`Store::checkpoint`].
    pub fn open<P: AsRef<Path>>(path: P) -> ArchiveResult<Self> {
        info!("Store: opening database at {}", path.as_ref().display());
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch("BEGIN")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Commits everything written so far and opens the next transaction.
    pub fn checkpoint(&self) -> ArchiveResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("COMMIT; BEGIN")?;
        Ok(())
    }

    /// Commits any trailing writes. The store must not be used afterwards.
    pub fn close(&self) -> ArchiveResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("COMMIT")?;
        Ok(())
    }

    pub fn upsert_guild(&self, guild: &GuildRecord) -> ArchiveResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO guilds (id, name) VALUES (?1, ?2)",
            params![guild.id as i64, guild.name],
        )?;
        Ok(())
    }

    pub fn upsert_member(&self, guild_id: u64, member: &MemberRecord) -> ArchiveResult<()> {
        debug!(
            "Store: member {} ({:?}) in guild {}",
            member.name, member.nick, guild_id
        );
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO members (id, guild_id, joined_at, name, discriminator, nickname)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                member.user_id as i64,
                guild_id as i64,
                member.joined_at.map(|at| at.timestamp()),
                member.name,
                member.discriminator,
                member.nick,
            ],
        )?;
        Ok(())
    }

    pub fn upsert_channel(&self, channel: &ChannelRecord) -> ArchiveResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO channels (id, name, guild_id) VALUES (?1, ?2, ?3)",
            params![channel.id as i64, channel.name, channel.guild_id as i64],
        )?;
        Ok(())
    }

    /// Persists the message snapshot with its markup already resolved.
    pub fn upsert_message(&self, message: &MessageRecord, content: &str) -> ArchiveResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO messages (id, channel_id, created_at, author_id, author_name, content)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id as i64,
                message.channel_id as i64,
                message.created_at.timestamp(),
                message.author_id as i64,
                message.author_name,
                content,
            ],
        )?;
        Ok(())
    }

    pub fn insert_attachment(
        &self,
        message_id: u64,
        attachment: &AttachmentRecord,
        payload: Option<&[u8]>,
    ) -> ArchiveResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO attachments (message_id, filename, content_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                message_id as i64,
                attachment.filename,
                attachment.content_type,
                payload,
            ],
        )?;
        Ok(())
    }

    pub fn insert_embed(
        &self,
        message_id: u64,
        kind: EmbedKind,
        embed: &EmbedRecord,
        payload: Option<&[u8]>,
    ) -> ArchiveResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO embeds (message_id, kind, title, description, url, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message_id as i64,
                kind.as_i64(),
                embed.title,
                embed.description,
                embed.url,
                payload,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn guild(id: u64, name: &str) -> GuildRecord {
        GuildRecord {
            id,
            name: name.to_string(),
        }
    }

    fn member(user_id: u64, name: &str, nick: Option<&str>) -> MemberRecord {
        MemberRecord {
            user_id,
            name: name.to_string(),
            discriminator: Some(7),
            nick: nick.map(str::to_string),
            joined_at: Some(Utc.with_ymd_and_hms(2021, 3, 1, 12, 0, 0).unwrap()),
        }
    }

    fn message(id: u64, channel_id: u64) -> MessageRecord {
        MessageRecord {
            id,
            channel_id,
            created_at: Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap(),
            author_id: 9,
            author_name: "ada".to_string(),
            content: "hello".to_string(),
            mentions: Vec::new(),
            attachments: Vec::new(),
            embeds: Vec::new(),
        }
    }

    fn attachment(name: &str) -> AttachmentRecord {
        AttachmentRecord {
            filename: name.to_string(),
            content_type: Some("image/png".to_string()),
            url: "https://cdn.example/a.png".to_string(),
        }
    }

    fn count(store: &Store, table: &str) -> i64 {
        let conn = store.conn.lock().unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .unwrap()
    }

    #[test]
    fn keyed_upsert_overwrites() {
        let store = Store::open(":memory:").unwrap();

        store.upsert_guild(&guild(1, "first")).unwrap();
        store.upsert_guild(&guild(1, "renamed")).unwrap();

        assert_eq!(count(&store, "guilds"), 1);
        let conn = store.conn.lock().unwrap();
        let name: String = conn
            .query_row("SELECT name FROM guilds WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "renamed");
    }

    #[test]
    fn member_key_is_user_and_guild() {
        let store = Store::open(":memory:").unwrap();

        store.upsert_member(10, &member(1, "ada", None)).unwrap();
        store.upsert_member(20, &member(1, "ada", None)).unwrap();
        store
            .upsert_member(10, &member(1, "ada", Some("admiral")))
            .unwrap();

        assert_eq!(count(&store, "members"), 2);
        let conn = store.conn.lock().unwrap();
        let nick: Option<String> = conn
            .query_row(
                "SELECT nickname FROM members WHERE id = 1 AND guild_id = 10",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(nick.as_deref(), Some("admiral"));
    }

    #[test]
    fn message_upsert_is_idempotent() {
        let store = Store::open(":memory:").unwrap();

        store.upsert_message(&message(5, 2), "hello").unwrap();
        store.upsert_message(&message(5, 2), "hello").unwrap();

        assert_eq!(count(&store, "messages"), 1);
    }

    #[test]
    fn attachments_have_no_key_and_duplicate() {
        let store = Store::open(":memory:").unwrap();

        store
            .insert_attachment(5, &attachment("cat.png"), Some(b"bytes"))
            .unwrap();
        store
            .insert_attachment(5, &attachment("cat.png"), Some(b"bytes"))
            .unwrap();

        assert_eq!(count(&store, "attachments"), 2);
    }

    #[test]
    fn failed_fetch_persists_null_payload() {
        let store = Store::open(":memory:").unwrap();

        store
            .insert_attachment(5, &attachment("gone.png"), None)
            .unwrap();

        let conn = store.conn.lock().unwrap();
        let payload: Option<Vec<u8>> = conn
            .query_row("SELECT payload FROM attachments", [], |row| row.get(0))
            .unwrap();
        assert_eq!(payload, None);
    }

    #[test]
    fn embed_kind_is_stored_as_declared() {
        let store = Store::open(":memory:").unwrap();
        let embed = EmbedRecord {
            kind: Some("image".to_string()),
            title: Some("t".to_string()),
            description: None,
            url: Some("https://example.com/x.png".to_string()),
            video_url: None,
        };

        store
            .insert_embed(5, EmbedKind::Image, &embed, Some(b"img"))
            .unwrap();

        let conn = store.conn.lock().unwrap();
        let kind: i64 = conn
            .query_row("SELECT kind FROM embeds", [], |row| row.get(0))
            .unwrap();
        assert_eq!(kind, 1);
    }

    #[test]
    fn writes_are_invisible_until_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.db");
        let store = Store::open(&path).unwrap();

        store.upsert_guild(&guild(1, "one")).unwrap();

        let reader = Connection::open(&path).unwrap();
        let visible: i64 = reader
            .query_row("SELECT COUNT(*) FROM guilds", [], |row| row.get(0))
            .unwrap();
        assert_eq!(visible, 0);

        store.checkpoint().unwrap();
        let visible: i64 = reader
            .query_row("SELECT COUNT(*) FROM guilds", [], |row| row.get(0))
            .unwrap();
        assert_eq!(visible, 1);
    }
}

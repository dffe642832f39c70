//! Gateway session controller: authenticate once, archive every visible
//! guild sequentially, then shut the shard down and close the store.

use serenity::client::{Client, Context, EventHandler};
use serenity::model::gateway::{GatewayIntents, Ready};
use serenity::model::user::OnlineStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

use crate::archive::media::MediaFetcher;
use crate::archive::Archiver;
use crate::config::{Config, DATE_FMT};
use crate::db::Store;
use crate::discord::DiscordHost;
use crate::error::ArchiveError;

struct Handler {
    config: Config,
    store: Store,
    media: Arc<MediaFetcher>,
    started: AtomicBool,
}

#[serenity::async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        // The gateway can redeliver READY on reconnect.
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Logged in as: {}, starting operation..", ready.user.name);
        ctx.set_presence(None, OnlineStatus::Invisible);

        let host = Arc::new(DiscordHost::new(ctx.http.clone()));
        let archiver = Archiver::new(
            host,
            self.store.clone(),
            Arc::clone(&self.media),
            self.config.interval_days,
            self.config.concurrency,
        );
        if let Err(e) = archiver.run().await {
            error!("Archival run failed: {e}");
        }

        info!("Operation completed, closing connection..");
        if let Err(e) = self.store.close() {
            error!("Failed to close store: {e}");
        }
        ctx.shard.shutdown_clean();
    }
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    info!(
        "Crawl start floor (informational): {}",
        config.start_floor.format(DATE_FMT)
    );
    let store = Store::open(&config.database_url)?;
    let media = Arc::new(MediaFetcher::new()?);

    let intents = GatewayIntents::non_privileged()
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::MESSAGE_CONTENT;

    let token = config.discord_token.clone();
    let mut client = Client::builder(&token, intents)
        .event_handler(Handler {
            config,
            store,
            media,
            started: AtomicBool::new(false),
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {e}"))?;

    client.start().await.map_err(ArchiveError::Auth)?;
    Ok(())
}

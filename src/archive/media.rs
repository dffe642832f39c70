//! Binary payload retrieval for attachments and embeds.

use reqwest::Client;
use tracing::{debug, error};

use crate::model::{EmbedKind, EmbedRecord};

/// Some embed hosts refuse requests from obvious bots, so payload fetches
/// identify as a desktop browser.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux i686; rv:109.0) Gecko/20100101 Firefox/114.0";

/// Shared HTTP fetcher for attachment and embed payloads.
///
/// Fetches never retry. A failure of any shape (connect, status, body) is
/// logged and collapsed to `None`; the caller persists the row regardless.
pub struct MediaFetcher {
    http: Client,
}

impl MediaFetcher {
    pub fn new() -> reqwest::Result<Self> {
        let http = Client::builder().user_agent(BROWSER_USER_AGENT).build()?;
        Ok(Self { http })
    }

    pub async fn download(&self, url: &str) -> Option<Vec<u8>> {
        debug!("Download file: {url}");
        match self.get(url).await {
            Ok(payload) => Some(payload),
            Err(e) => {
                error!("Failed to download file {url}: {e}");
                None
            }
        }
    }

    async fn get(&self, url: &str) -> reqwest::Result<Vec<u8>> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Decides how an embed is stored and where its payload, if any, comes from.
///
/// "gifv" is a looping video misreported as a gif; it is stored as a video
/// and fetched from the resolved video URL when the platform exposes one.
/// Plain images are fetched from the embed's primary URL. Everything else is
/// recorded without a payload.
pub fn classify_embed(embed: &EmbedRecord) -> (EmbedKind, Option<&str>) {
    match embed.kind.as_deref() {
        Some("gifv") => (
            EmbedKind::Video,
            embed.video_url.as_deref().or(embed.url.as_deref()),
        ),
        Some("image") => (EmbedKind::Image, embed.url.as_deref()),
        _ => (EmbedKind::Other, None),
    }
}

//! Third-party content shown in prompts and kind messages.
//!
//! Every lookup is best effort: failures are logged and replaced with
//! default content so a flaky API never blocks a prompt or a DM.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rand::seq::SliceRandom;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use simba_core::config::ContentConfig;
use simba_slack::blocks::{QuoteOfTheDay, FALLBACK_QUOTE_AUTHOR};

#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Same quote for the whole calendar day.
    async fn quote_of_the_day(&self) -> QuoteOfTheDay;

    fn buzz_word(&self) -> String;

    async fn gif_for(&self, buzz_word: &str) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct WireQuote {
    text: Option<String>,
    author: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GifSearch {
    #[serde(default)]
    data: Vec<GifHit>,
}

#[derive(Debug, Deserialize)]
struct GifHit {
    images: GifImages,
}

#[derive(Debug, Deserialize)]
struct GifImages {
    original: GifImage,
}

#[derive(Debug, Deserialize)]
struct GifImage {
    url: String,
}

pub struct HttpContentProvider {
    http: reqwest::Client,
    quote_api_url: String,
    giphy_api_url: String,
    giphy_api_key: Option<SecretString>,
    buzz_words: Vec<String>,
    today: Mutex<Option<(NaiveDate, QuoteOfTheDay)>>,
}

impl HttpContentProvider {
    pub fn new(config: &ContentConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            quote_api_url: config.quote_api_url.clone(),
            giphy_api_url: config.giphy_api_url.clone(),
            giphy_api_key: config.giphy_api_key.clone(),
            buzz_words: config.buzz_words.clone(),
            today: Mutex::new(None),
        })
    }

    async fn fetch_quote(&self) -> Result<QuoteOfTheDay, reqwest::Error> {
        let quotes: Vec<WireQuote> =
            self.http.get(&self.quote_api_url).send().await?.error_for_status()?.json().await?;
        Ok(pick_quote(quotes, &mut rand::thread_rng()))
    }

    async fn fetch_gif(
        &self,
        key: &SecretString,
        buzz_word: &str,
    ) -> Result<Option<String>, reqwest::Error> {
        let search: GifSearch = self
            .http
            .get(&self.giphy_api_url)
            .query(&[
                ("api_key", key.expose_secret()),
                ("q", buzz_word),
                ("limit", "1"),
                ("offset", "0"),
                ("rating", "g"),
                ("lang", "en"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(search.data.into_iter().next().map(|hit| hit.images.original.url))
    }
}

fn pick_quote<R: rand::Rng>(quotes: Vec<WireQuote>, rng: &mut R) -> QuoteOfTheDay {
    let usable: Vec<QuoteOfTheDay> = quotes
        .into_iter()
        .filter_map(|quote| {
            let text = quote.text?.trim().to_owned();
            if text.is_empty() {
                return None;
            }
            // type.fit appends its own name to every author.
            let author = quote
                .author
                .map(|author| author.trim_end_matches(", type.fit").trim().to_owned())
                .filter(|author| !author.is_empty() && author != "type.fit")
                .unwrap_or_else(|| FALLBACK_QUOTE_AUTHOR.to_owned());
            Some(QuoteOfTheDay { text, author })
        })
        .collect();

    usable.choose(rng).cloned().unwrap_or_default()
}

#[async_trait]
impl ContentProvider for HttpContentProvider {
    async fn quote_of_the_day(&self) -> QuoteOfTheDay {
        let date = Utc::now().date_naive();
        let mut today = self.today.lock().await;
        if let Some((cached_on, quote)) = today.as_ref() {
            if *cached_on == date {
                return quote.clone();
            }
        }

        let quote = match self.fetch_quote().await {
            Ok(quote) => quote,
            Err(error) => {
                warn!(event_name = "content.quote.failed", error = %error, "quote api unavailable");
                // Not cached, so the next prompt retries the API.
                return QuoteOfTheDay::default();
            }
        };
        debug!(event_name = "content.quote.fetched", author = %quote.author, "quote of the day");
        *today = Some((date, quote.clone()));
        quote
    }

    fn buzz_word(&self) -> String {
        self.buzz_words
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| "kindness".to_owned())
    }

    async fn gif_for(&self, buzz_word: &str) -> Option<String> {
        let Some(key) = &self.giphy_api_key else {
            debug!(event_name = "content.gif.disabled", "no giphy api key configured");
            return None;
        };

        match self.fetch_gif(key, buzz_word).await {
            Ok(url) => url,
            Err(error) => {
                warn!(
                    event_name = "content.gif.failed",
                    error = %error,
                    buzz_word,
                    "gif api unavailable"
                );
                None
            }
        }
    }
}

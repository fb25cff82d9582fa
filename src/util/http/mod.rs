use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::{config::HttpSettings, logging};

pub mod element;
pub mod user_agent;

/// Turns a URL into the raw text of the document behind it.
///
/// This is the only way pages reach the network, so tests swap in an
/// implementation that serves fixtures.
#[async_trait(?Send)]
pub trait Fetch {
    async fn get_text(&self, url: &str) -> Result<String>;
}

/// [`Fetch`] over HTTP(S) GET with a `reqwest` client.
///
/// Every call is a single request: a transport error or a non-success status
/// is returned to the caller as is, without retrying.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        // 既にインストール済みなら Err が返るだけ
        let _ = rustls::crypto::ring::default_provider().install_default();

        let user_agent = settings
            .user_agent
            .clone()
            .unwrap_or_else(user_agent::gen_random_ua);

        let client = Client::builder()
            // ===== 圧縮 =====
            .brotli(true)
            .gzip(true)
            .zstd(true)
            // ===== タイムアウト =====
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(Duration::from_secs(settings.timeout_secs))
            // ===== Cookie とリダイレクト =====
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .referer(true)
            .user_agent(user_agent)
            .build()
            .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))?;

        Ok(HttpFetcher { client })
    }
}

#[async_trait(?Send)]
impl Fetch for HttpFetcher {
    async fn get_text(&self, url: &str) -> Result<String> {
        let start = Instant::now();
        let response = self.client.get(url).send().await;
        let elapsed = start.elapsed().as_millis();

        let response = match response {
            Ok(response) => response,
            Err(why) => {
                logging::error_file_async(format!(
                    "GET:{} failed because {:?}. {} ms",
                    url, why, elapsed
                ));
                return Err(anyhow!("Failed to send request to {}: {:?}", url, why));
            }
        };

        let status = response.status();
        logging::info_file_async(format!("GET:{} {} {} ms", url, status, elapsed));

        if !status.is_success() {
            return Err(anyhow!("GET {} returned {}", url, status));
        }

        response
            .text()
            .await
            .map_err(|e| anyhow!("Error parsing response text of {}: {:?}", url, e))
    }
}

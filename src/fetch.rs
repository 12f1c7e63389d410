use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Url;
use tracing::info;

use crate::error::PipelineError;

const USER_AGENT: &str = concat!("key_dates/", env!("CARGO_PKG_VERSION"));

/// GET the page body. Any non-2xx status aborts the run; nothing is retried.
pub async fn fetch_page(url: &Url) -> Result<String, PipelineError> {
    let transport = |source| PipelineError::Transport {
        url: url.to_string(),
        source,
    };

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(transport)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Fetching {url}"));
    pb.enable_steady_tick(Duration::from_millis(100));

    info!("Fetching {}", url);
    let result = async {
        let response = client.get(url.clone()).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(transport)
    }
    .await;
    pb.finish_and_clear();

    let body = result?;
    info!("Fetched {} bytes", body.len());
    Ok(body)
}

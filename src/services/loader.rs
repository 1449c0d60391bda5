use reqwest::Client;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to fetch survey data: {0}")]
    Request(#[from] reqwest::Error),
    #[error("failed to load survey data: {status} {reason}")]
    Status { status: u16, reason: String },
    #[error("failed to read local survey file: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetches the raw survey text from a single source.
///
/// An override URL, when present, is the exclusive source; otherwise the
/// configured local file is read. One attempt, no retry, no caching. A
/// non-success response fails with the status code and reason.
pub async fn load_survey_text(
    config: &Config,
    override_url: Option<&str>,
) -> Result<String, LoadError> {
    match override_url {
        Some(url) => {
            tracing::info!("loading survey data from external url: {}", url);
            let response = Client::new().get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(LoadError::Status {
                    status: status.as_u16(),
                    reason: status
                        .canonical_reason()
                        .unwrap_or("unknown status")
                        .to_string(),
                });
            }
            Ok(response.text().await?)
        }
        None => {
            tracing::info!(
                "no external data url provided, using local data file: {}",
                config.data_path.display()
            );
            Ok(tokio::fs::read_to_string(&config.data_path).await?)
        }
    }
}

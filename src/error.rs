use reqwest::{Response, StatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("CalDAV error: {0}")]
    CalDav(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// Check CalDAV response status and return appropriate error
/// Returns the response body as text on success
pub async fn check_caldav_response(response: Response, context: &str) -> Result<String> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SettingsError::Auth(format!(
            "{}: server rejected the username or password ({})",
            context, status
        )));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SettingsError::CalDav(format!("{} {}: {}", context, status, body)));
    }

    Ok(response.text().await?)
}

//! Shared blocking HTTP plumbing for the backend clients.

use std::time::Duration;

use reqwest::blocking::{Client, Response};

/// Longest response body carried into an error message.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Build a blocking client where every request is bounded by `timeout`.
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(30)))
        .user_agent(concat!("dub-core/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Split a response into success, or status plus a shortened body.
pub(crate) fn check_status(response: Response) -> Result<Response, (u16, String)> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err((status.as_u16(), truncate(body.trim(), MAX_ERROR_BODY_CHARS)))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("short", 10), "short");
    }
}

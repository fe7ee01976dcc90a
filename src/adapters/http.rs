//! JSON-over-HTTP helper with the two-stage timeout used by model adapters.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::{timeout, Instant};

use super::{CallBudget, ProviderError};

/// POST `body` to `url` and decode the JSON response.
///
/// The response headers must arrive within `budget.first_response`; the whole
/// exchange, body included, must finish within `budget.overall`.
pub async fn post_json<B, T>(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &B,
    budget: CallBudget,
) -> Result<T, ProviderError>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let started = Instant::now();

    let mut request = client.post(url).json(body);
    if let Some(token) = bearer {
        request = request.bearer_auth(token);
    }

    let first_wait = budget.first_response.min(budget.overall);
    let response = timeout(first_wait, request.send())
        .await
        .map_err(|_| ProviderError::first_response_timeout(budget))?
        .map_err(|e| ProviderError::Transport(e.to_string()))?;

    let status = response.status();
    let remaining = budget.overall.saturating_sub(started.elapsed());
    let text = timeout(remaining, response.text())
        .await
        .map_err(|_| ProviderError::overall_timeout(budget))?
        .map_err(|e| ProviderError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body: truncate(&text, 300),
        });
    }

    serde_json::from_str(&text).map_err(|e| ProviderError::Malformed(e.to_string()))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }
}

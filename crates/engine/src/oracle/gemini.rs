use sentineldesk_common::error::OracleError;
use serde::Deserialize;
use serde_json::json;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: String,
}

/// Single attempt at a Gemini `generateContent` call. Retry and rate
/// limiting live in the caller — this is transport only.
pub async fn generate_content(
    http: &reqwest::Client,
    api_key: &str,
    model: &str,
    prompt: &str,
) -> Result<String, OracleError> {
    let url = format!("{API_BASE}/{model}:generateContent?key={api_key}");
    let body = json!({
        "contents": [{ "parts": [{ "text": prompt }] }]
    });

    let response = http
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|e| OracleError::Transport(e.to_string()))?;

    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(OracleError::RateExhausted);
    }
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(OracleError::Transport(format!("HTTP {status}: {detail}")));
    }

    let parsed: GenerateContentResponse = response
        .json()
        .await
        .map_err(|e| OracleError::MalformedResponse(e.to_string()))?;

    parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text)
        .ok_or_else(|| OracleError::MalformedResponse("no candidates in response".into()))
}

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::logging::RequestLogger;
use crate::providers::ApiFormat;
use crate::translate::request::{forecast_request, to_gemini_request, to_openai_request};
use crate::translate::response::{gemini_to_outcome, openai_to_outcome, ChatOutcome};
use crate::translate::types::parse_messages;

use serde::Serialize;
use serde_json::{json, Value};

/// What the inbound request asked for.
#[derive(Debug, Clone, Copy)]
enum Payload<'a> {
    Chat(&'a [Value]),
    Forecast(&'a str),
}

/// Forward a conversation to the configured upstream.
///
/// `Ok` means the upstream answered (even if it refused). `Err` means the
/// messages do not fit the upstream format (`Validation`, nothing is sent), the
/// upstream could not be reached, or its success body could not be read.
pub async fn proxy_chat(
    messages: &[Value],
    config: &ProxyConfig,
    api_key: &str,
    client: &reqwest::Client,
    log: &RequestLogger,
) -> Result<ChatOutcome> {
    log.info(
        "proxy",
        format!("Chat request: messages={}", messages.len()),
    );
    dispatch(Payload::Chat(messages), config, api_key, client, log).await
}

/// Forward a single free-form prompt (the forecast entry point).
pub async fn proxy_forecast(
    prompt: &str,
    config: &ProxyConfig,
    api_key: &str,
    client: &reqwest::Client,
    log: &RequestLogger,
) -> Result<ChatOutcome> {
    log.info("proxy", format!("Forecast request: prompt_len={}", prompt.len()));
    dispatch(Payload::Forecast(prompt), config, api_key, client, log).await
}

async fn dispatch(
    payload: Payload<'_>,
    config: &ProxyConfig,
    api_key: &str,
    client: &reqwest::Client,
    log: &RequestLogger,
) -> Result<ChatOutcome> {
    let base_url = config.effective_base_url()?;
    let base_url = base_url.trim_end_matches('/');
    let model = config.effective_model()?;

    let outcome = match config.api_format()? {
        ApiFormat::Gemini => {
            let body = match payload {
                Payload::Chat(raw) => to_gemini_request(&parse_messages(raw)?),
                Payload::Forecast(prompt) => forecast_request(prompt),
            };
            let url = format!("{base_url}/models/{model}:generateContent");
            log.info("proxy", format!("POST {url}"));

            // The key travels as a query parameter, so the keyed URL is never logged.
            let keyed_url = reqwest::Url::parse_with_params(&url, &[("key", api_key)])
                .map_err(|e| ProxyError::config(format!("Invalid upstream URL {url}: {e}")))?;
            let (status, text) = send_json(client.post(keyed_url), &body).await?;
            log.debug("proxy", format!("Response status={} body_len={}", status, text.len()));
            gemini_to_outcome(status, &text)
        }
        ApiFormat::OpenAi => {
            let body = match payload {
                Payload::Chat(messages) => to_openai_request(messages, &model),
                Payload::Forecast(prompt) => {
                    to_openai_request(&[json!({"role": "user", "content": prompt})], &model)
                }
            };
            let url = format!("{base_url}/chat/completions");
            log.info("proxy", format!("POST {url} model={model}"));

            let request = client.post(&url).bearer_auth(api_key);
            let (status, text) = send_json(request, &body).await?;
            log.debug("proxy", format!("Response status={} body_len={}", status, text.len()));
            openai_to_outcome(status, &text)
        }
    };

    match &outcome {
        Ok(ChatOutcome::Reply(text)) => {
            log.info("proxy", format!("Completed: reply_len={}", text.len()));
        }
        Ok(ChatOutcome::ContentBlocked) => {
            log.warn("proxy", "Upstream returned no usable content; sending blocked reply");
        }
        Ok(ChatOutcome::Rejected { message, status }) => {
            log.warn("proxy", format!("Upstream rejected request status={status}: {message}"));
        }
        Err(_) => {}
    }

    outcome
}

/// Send one JSON POST and read the whole body back as text.
async fn send_json<T: Serialize + ?Sized>(
    request: reqwest::RequestBuilder,
    body: &T,
) -> Result<(u16, String)> {
    let response = request
        .json(body)
        .send()
        .await
        .map_err(ProxyError::transport)?;

    let status = response.status().as_u16();
    let text = response.text().await.map_err(ProxyError::transport)?;
    Ok((status, text))
}

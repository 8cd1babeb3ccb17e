//! Turns attachment URLs into inline `data:` URIs for the backend payload.

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Resolves one attachment URL to a `data:` URI. Existing `data:` URIs
/// pass through untouched; `http(s)` URLs are fetched and inlined with the
/// response's Content-Type as the mime type.
pub async fn to_data_uri(client: &reqwest::Client, url: &str) -> anyhow::Result<String> {
    if url.starts_with("data:") {
        return Ok(url.to_string());
    }

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("failed to fetch attachment '{url}'"))?
        .error_for_status()
        .with_context(|| format!("attachment fetch '{url}' returned an error status"))?;

    let mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("failed to read attachment body '{url}'"))?;

    Ok(format!("data:{mime};base64,{}", STANDARD.encode(&bytes)))
}

/// Resolves a batch of attachments. Failures are logged and skipped so one
/// dead link never blocks the rest of the turn.
pub async fn encode_all(client: &reqwest::Client, urls: &[String]) -> Vec<String> {
    let mut encoded = Vec::with_capacity(urls.len());
    for url in urls {
        match to_data_uri(client, url).await {
            Ok(uri) => encoded.push(uri),
            Err(err) => log::warn!("skipping attachment: {err:#}"),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn data_uris_pass_through() {
        let client = reqwest::Client::new();
        let uri = "data:image/png;base64,AAAA";
        assert_eq!(to_data_uri(&client, uri).await.unwrap(), uri);
    }

    #[tokio::test]
    async fn http_urls_are_fetched_and_inlined() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pic.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![1u8, 2, 3])
                    .insert_header("content-type", "image/png"),
            )
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let uri = to_data_uri(&client, &format!("{}/pic.png", server.uri()))
            .await
            .unwrap();
        assert_eq!(uri, format!("data:image/png;base64,{}", STANDARD.encode([1u8, 2, 3])));
    }

    #[tokio::test]
    async fn batch_encoding_skips_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![9u8])
                    .insert_header("content-type", "image/png"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let urls = vec![
            format!("{}/gone.png", server.uri()),
            format!("{}/ok.png", server.uri()),
        ];
        let encoded = encode_all(&client, &urls).await;
        assert_eq!(encoded.len(), 1);
        assert!(encoded[0].starts_with("data:image/png;base64,"));
    }
}

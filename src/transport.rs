//! HTTP transport: fetching feed bytes and delivering event envelopes.
//!
//! Both operations are single-attempt by design; callers log failures and
//! move on. Timeouts are the client's concern — the `reqwest::Client` built
//! at startup carries one.

use futures::StreamExt;
use thiserror::Error;

use crate::envelope::Envelope;

/// Response bodies above this size are rejected outright.
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while talking to a feed server or the receiver.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level error (DNS, connection, TLS, timeout, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
}

/// Fetches a feed document, returning its raw bytes.
///
/// Single attempt; any non-2xx status is an error.
pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, TransportError> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(TransportError::HttpStatus(response.status().as_u16()));
    }

    read_limited_bytes(response, MAX_BODY_SIZE).await
}

/// Delivers one envelope to the receiver endpoint as an HTTP POST, the
/// envelope attributes carried as headers and the JSON body as the payload.
pub async fn deliver(
    client: &reqwest::Client,
    endpoint: &str,
    envelope: &Envelope,
) -> Result<(), TransportError> {
    let response = client
        .post(endpoint)
        .header("ce-specversion", envelope.spec_version)
        .header("ce-type", envelope.event_type)
        .header("ce-source", envelope.source.as_str())
        .header("ce-id", envelope.id.as_str())
        .header("ce-time", envelope.time.as_str())
        .header("Content-Type", envelope.content_type)
        .header("User-Agent", envelope.user_agent)
        .body(envelope.body.clone())
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(TransportError::HttpStatus(response.status().as_u16()));
    }

    Ok(())
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, TransportError> {
    // Fast path: trust Content-Length when present
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(TransportError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(TransportError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(TransportError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope;
    use crate::event::{Event, EventEntry, EventFeed};
    use chrono::{TimeZone, Utc};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_event() -> Event {
        Event {
            feed: EventFeed {
                title: "Feed".to_string(),
                url: "https://feed.example.com".to_string(),
            },
            entry: EventEntry {
                title: "Post".to_string(),
                url: "https://feed.example.com/post".to_string(),
                published_at: Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap(),
            },
        }
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<feed></feed>"))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let bytes = fetch(&client, &format!("{}/feed.xml", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes, b"<feed></feed>");
    }

    #[tokio::test]
    async fn test_fetch_non_2xx_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch(&client, &server.uri()).await.unwrap_err();
        match err {
            TransportError::HttpStatus(404) => {}
            e => panic!("Expected HttpStatus(404), got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_fetch_rejects_oversized_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(vec![b'x'; MAX_BODY_SIZE + 1]),
            )
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch(&client, &server.uri()).await.unwrap_err();
        assert!(matches!(err, TransportError::ResponseTooLarge));
    }

    #[tokio::test]
    async fn test_deliver_sends_envelope_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/events"))
            .and(header("ce-specversion", "1.0"))
            .and(header("ce-type", "feed.publish"))
            .and(header("ce-source", "https://feed.example.com/post"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let env = envelope::encode(&sample_event()).unwrap();
        let client = reqwest::Client::new();
        deliver(&client, &format!("{}/events", server.uri()), &env)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["entry"]["url"], "https://feed.example.com/post");
        assert!(requests[0].headers.contains_key("ce-id"));
        assert!(requests[0].headers.contains_key("ce-time"));
        assert!(requests[0]
            .headers
            .get("user-agent")
            .is_some_and(|v| v.to_str().unwrap().starts_with("notifeed/")));
    }

    #[tokio::test]
    async fn test_deliver_non_2xx_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let env = envelope::encode(&sample_event()).unwrap();
        let client = reqwest::Client::new();
        let err = deliver(&client, &server.uri(), &env).await.unwrap_err();
        assert!(matches!(err, TransportError::HttpStatus(500)));
    }
}

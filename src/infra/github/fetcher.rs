use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;

use crate::{
    application::upstream::{ContentFetcher, RawDocument, UpstreamError},
    domain::locator::ContentLocator,
};

use super::GitHubClient;

#[derive(Debug, Deserialize)]
struct ContentPayload {
    path: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[async_trait]
impl ContentFetcher for GitHubClient {
    async fn fetch(&self, locator: &ContentLocator) -> Result<RawDocument, UpstreamError> {
        let (endpoint, revision) = match locator.encoded_path() {
            Some(path) => (
                format!(
                    "/repos/{}/{}/contents/{}",
                    locator.owner(),
                    locator.repo(),
                    path
                ),
                locator.revision().name(),
            ),
            None => (
                format!("/repos/{}/{}/readme", locator.owner(), locator.repo()),
                None,
            ),
        };
        let query: Vec<(&str, &str)> = revision.map(|rev| ("ref", rev)).into_iter().collect();

        let subject = locator.path().unwrap_or("README");
        let payload: ContentPayload = self.get_json(&endpoint, &query, subject).await?;

        let body = decode_content(&payload)?;
        Ok(RawDocument {
            body,
            path: payload.path,
        })
    }
}

fn decode_content(payload: &ContentPayload) -> Result<String, UpstreamError> {
    if !payload.encoding.eq_ignore_ascii_case("base64") {
        return Err(UpstreamError::decode(format!(
            "unsupported content encoding `{}`",
            payload.encoding
        )));
    }

    let compact: String = payload
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| UpstreamError::decode(format!("invalid base64 content: {err}")))?;
    let body = String::from_utf8(bytes)
        .map_err(|err| UpstreamError::decode(format!("content is not UTF-8: {err}")))?;

    if body.trim().is_empty() {
        return Err(UpstreamError::EmptyContent);
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(content: &str, encoding: &str) -> ContentPayload {
        ContentPayload {
            path: "README.md".into(),
            content: content.into(),
            encoding: encoding.into(),
        }
    }

    #[test]
    fn decodes_wrapped_base64() {
        let encoded = STANDARD.encode("# Title\n\nBody text that wraps.");
        let wrapped = format!("{}\n{}\n", &encoded[..20], &encoded[20..]);
        assert_eq!(
            decode_content(&payload(&wrapped, "base64")).expect("decodes"),
            "# Title\n\nBody text that wraps."
        );
    }

    #[test]
    fn rejects_malformed_base64() {
        assert!(matches!(
            decode_content(&payload("!!not base64!!", "base64")),
            Err(UpstreamError::Decode { .. })
        ));
    }

    #[test]
    fn rejects_unknown_encoding() {
        assert!(matches!(
            decode_content(&payload("abc", "none")),
            Err(UpstreamError::Decode { .. })
        ));
    }

    #[test]
    fn whitespace_only_body_is_empty() {
        let encoded = STANDARD.encode(" \n\t\n");
        assert_eq!(
            decode_content(&payload(&encoded, "base64")),
            Err(UpstreamError::EmptyContent)
        );
    }

    #[test]
    fn non_utf8_body_is_a_decode_error() {
        let encoded = STANDARD.encode([0xff, 0xfe, 0xfd]);
        assert!(matches!(
            decode_content(&payload(&encoded, "base64")),
            Err(UpstreamError::Decode { .. })
        ));
    }
}

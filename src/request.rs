use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Url;

use crate::auth::BlobToken;
use crate::error::StoreError;
use crate::store::{BlobStore, PutBlobResult, PutOptions};

static BLOB_API: &str = "https://blob.vercel-storage.com";
static API_VERSION: &str = "7";

const X_API_VERSION: HeaderName = HeaderName::from_static("x-api-version");
const X_ACCESS: HeaderName = HeaderName::from_static("x-vercel-blob-access");
const X_ADD_RANDOM_SUFFIX: HeaderName = HeaderName::from_static("x-add-random-suffix");
const X_CACHE_CONTROL_MAX_AGE: HeaderName = HeaderName::from_static("x-cache-control-max-age");
const X_CONTENT_TYPE: HeaderName = HeaderName::from_static("x-content-type");

/// HTTP client for the Vercel Blob REST API.
pub struct BlobClient {
    client: reqwest::Client,
    base: Url,
}

impl BlobClient {
    /// `api_url` defaults to the public Vercel Blob endpoint.
    pub fn new(token: &BlobToken, api_url: Option<&str>) -> Result<BlobClient, StoreError> {
        Self::build(token, api_url, reqwest::Client::builder())
    }

    fn build(
        token: &BlobToken,
        api_url: Option<&str>,
        builder: reqwest::ClientBuilder,
    ) -> Result<BlobClient, StoreError> {
        let api_url = api_url.unwrap_or(BLOB_API);
        let base = Url::parse(api_url).map_err(|e| StoreError::InvalidUrl {
            url: api_url.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl {
                url: api_url.to_string(),
                reason: "url cannot carry a path".into(),
            });
        }
        let client = Self::gen_client(token, builder)?;
        Ok(BlobClient { client, base })
    }

    pub fn gen_client(
        token: &BlobToken,
        builder: reqwest::ClientBuilder,
    ) -> Result<reqwest::Client, StoreError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&token.bearer())?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(X_API_VERSION, HeaderValue::from_static(API_VERSION));
        Ok(builder.default_headers(headers).build()?)
    }

    /// `{base}/{key}` with every key segment percent-encoded.
    pub fn object_url(&self, key: &str) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl {
                url: self.base.to_string(),
                reason: "url cannot carry a path".into(),
            })?
            .pop_if_empty()
            .extend(key.split('/'));
        Ok(url)
    }

    fn put_headers(options: &PutOptions) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(X_ACCESS, HeaderValue::from_static(options.access.as_str()));
        headers.insert(
            X_ADD_RANDOM_SUFFIX,
            HeaderValue::from_static(if options.add_random_suffix { "1" } else { "0" }),
        );
        headers.insert(
            X_CACHE_CONTROL_MAX_AGE,
            HeaderValue::from(options.cache_control_max_age),
        );
        if let Some(content_type) = &options.content_type {
            headers.insert(X_CONTENT_TYPE, HeaderValue::from_str(content_type)?);
        }
        Ok(headers)
    }
}

#[async_trait]
impl BlobStore for BlobClient {
    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        options: &PutOptions,
    ) -> Result<PutBlobResult, StoreError> {
        let url = self.object_url(key)?;
        let res = self
            .client
            .put(url)
            .headers(Self::put_headers(options)?)
            .body(body)
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(StoreError::Status { status, body: text });
        }
        serde_json::from_str(&text).map_err(StoreError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn token() -> BlobToken {
        BlobToken::new("vercel_blob_rw_test").expect("token")
    }

    fn local_client(base: &str) -> BlobClient {
        BlobClient::build(&token(), Some(base), reqwest::Client::builder().no_proxy())
            .expect("client")
    }

    /// Accepts one connection, answers it, and hands back the raw request.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.expect("write");
            socket.shutdown().await.ok();
            request
        });
        (format!("http://{addr}"), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.expect("read");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + len {
                break;
            }
        }
        String::from_utf8_lossy(&buf).to_lowercase()
    }

    #[test]
    fn object_url_encodes_segments() {
        let client = local_client("https://blob.example.com");
        let url = client.object_url("sub dir/b c.txt").expect("url");
        assert_eq!(url.as_str(), "https://blob.example.com/sub%20dir/b%20c.txt");

        let client = local_client("https://blob.example.com/api/");
        let url = client.object_url("a.txt").expect("url");
        assert_eq!(url.as_str(), "https://blob.example.com/api/a.txt");
    }

    #[test]
    fn rejects_unusable_api_url() {
        assert!(matches!(
            BlobClient::new(&token(), Some("not a url")),
            Err(StoreError::InvalidUrl { .. })
        ));
        assert!(matches!(
            BlobClient::new(&token(), Some("mailto:someone@example.com")),
            Err(StoreError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn put_headers_carry_options() {
        let options = PutOptions::public(31_536_000).with_content_type(Some("text/plain"));
        let headers = BlobClient::put_headers(&options).expect("headers");
        assert_eq!(headers[&X_ACCESS], "public");
        assert_eq!(headers[&X_ADD_RANDOM_SUFFIX], "0");
        assert_eq!(headers[&X_CACHE_CONTROL_MAX_AGE], "31536000");
        assert_eq!(headers[&X_CONTENT_TYPE], "text/plain");
    }

    #[tokio::test]
    async fn put_sends_key_payload_and_headers() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"url":"https://store.public.blob.vercel-storage.com/sub/b.txt","pathname":"sub/b.txt"}"#,
        )
        .await;
        let client = local_client(&base);
        let options = PutOptions::public(31_536_000).with_content_type(Some("text/plain"));

        let blob = client
            .put("sub/b.txt", b"hello".to_vec(), &options)
            .await
            .expect("put");
        assert_eq!(blob.url, "https://store.public.blob.vercel-storage.com/sub/b.txt");
        assert_eq!(blob.pathname, "sub/b.txt");

        let request = server.await.expect("server");
        assert!(request.starts_with("put /sub/b.txt http/1.1"));
        assert!(request.contains("authorization: bearer vercel_blob_rw_test"));
        assert!(request.contains("x-api-version: 7"));
        assert!(request.contains("x-add-random-suffix: 0"));
        assert!(request.contains("x-cache-control-max-age: 31536000"));
        assert!(request.ends_with("\r\n\r\nhello"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (base, server) = serve_once("403 Forbidden", r#"{"error":{"code":"forbidden"}}"#).await;
        let client = local_client(&base);

        let err = client
            .put("a.txt", b"a".to_vec(), &PutOptions::public(60))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Status { status, ref body } if status == reqwest::StatusCode::FORBIDDEN && body.contains("forbidden")
        ));
        server.await.expect("server");
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let (base, server) = serve_once("200 OK", "not json").await;
        let client = local_client(&base);

        let err = client
            .put("a.txt", b"a".to_vec(), &PutOptions::public(60))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
        server.await.expect("server");
    }
}

//! Request transports.
//!
//! A [`Transport`] sends one request and hands back the response. Wrappers
//! hold an inner transport and change or observe the request on its way
//! through; the client composes them as `LogTransport(AuthTransport(base))`.

use crate::error::UpError;
use futures_util::future::BoxFuture;
use log::info;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Request, Response};
use std::fmt;
use std::sync::Arc;

pub trait Transport: fmt::Debug + Send + Sync {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response, reqwest::Error>>;
}

impl Transport for reqwest::Client {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response, reqwest::Error>> {
        Box::pin(self.execute(request))
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response, reqwest::Error>> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response, reqwest::Error>> {
        (**self).send(request)
    }
}

/// Sets `Authorization: Bearer <token>` on every request.
#[derive(Debug, Clone)]
pub struct AuthTransport<T> {
    inner: T,
    header: HeaderValue,
}

impl<T: Transport> AuthTransport<T> {
    pub fn new(inner: T, token: &str) -> Result<Self, UpError> {
        let mut header = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| UpError::Config("token contains characters not allowed in a header"))?;
        header.set_sensitive(true);
        Ok(Self { inner, header })
    }
}

impl<T: Transport> Transport for AuthTransport<T> {
    fn send(&self, mut request: Request) -> BoxFuture<'_, Result<Response, reqwest::Error>> {
        request
            .headers_mut()
            .insert(AUTHORIZATION, self.header.clone());
        self.inner.send(request)
    }
}

/// Logs each request line and response status at `info` level.
#[derive(Debug, Clone)]
pub struct LogTransport<T> {
    inner: T,
}

impl<T: Transport> LogTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

impl<T: Transport> Transport for LogTransport<T> {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response, reqwest::Error>> {
        Box::pin(async move {
            info!("--> {} {}", request.method(), request.url());
            let response = self.inner.send(request).await?;
            info!("<-- {} {}", response.status(), response.url());
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records requests and fails them, so no network is needed.
    #[derive(Debug, Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, Option<HeaderValue>)>>,
    }

    impl Transport for Recorder {
        fn send(&self, request: Request) -> BoxFuture<'_, Result<Response, reqwest::Error>> {
            let auth = request.headers().get(AUTHORIZATION).cloned();
            self.seen
                .lock()
                .unwrap()
                .push((request.url().to_string(), auth));
            // Building against an invalid URL is the cheapest way to get a
            // reqwest::Error without a server.
            let err = reqwest::Client::new().get("not a url").build().unwrap_err();
            Box::pin(async move { Err(err) })
        }
    }

    fn request(url: &str) -> Request {
        reqwest::Client::new().get(url).build().unwrap()
    }

    #[tokio::test]
    async fn auth_sets_bearer_header_on_every_request() {
        let recorder = Arc::new(Recorder::default());
        let transport = AuthTransport::new(Arc::clone(&recorder), "secret-token").unwrap();

        let _ = transport.send(request("https://example.com/a")).await;
        let _ = transport.send(request("https://example.com/b")).await;

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        for (_, auth) in seen.iter() {
            let auth = auth.as_ref().unwrap();
            assert_eq!(auth.to_str().unwrap(), "Bearer secret-token");
            assert!(auth.is_sensitive());
        }
    }

    #[tokio::test]
    async fn auth_replaces_existing_header() {
        let recorder = Arc::new(Recorder::default());
        let transport = AuthTransport::new(Arc::clone(&recorder), "mine").unwrap();
        let mut req = request("https://example.com/");
        req.headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer theirs"));

        let _ = transport.send(req).await;

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].1.as_ref().unwrap().to_str().unwrap(), "Bearer mine");
    }

    #[test]
    fn auth_rejects_token_with_newline() {
        let err = AuthTransport::new(reqwest::Client::new(), "bad\ntoken").unwrap_err();
        assert!(matches!(err, UpError::Config(_)));
    }

    /// Keeps every formatted record so tests can check what was logged.
    struct Capture;

    static LINES: Mutex<Vec<String>> = Mutex::new(Vec::new());

    impl log::Log for Capture {
        fn enabled(&self, _: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            LINES.lock().unwrap().push(record.args().to_string());
        }

        fn flush(&self) {}
    }

    fn capture_logs() {
        static CAPTURE: Capture = Capture;
        // Only the first call installs it; later calls share the sink.
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Trace);
    }

    #[tokio::test]
    async fn log_records_request_and_status_lines_without_token() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        capture_logs();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logged"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let auth = AuthTransport::new(reqwest::Client::new(), "hush-hush-token").unwrap();
        let transport = LogTransport::new(auth);
        let url = format!("{}/logged", server.uri());
        let response = transport.send(request(&url)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let lines: Vec<String> = LINES
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.contains(&url))
            .cloned()
            .collect();
        assert_eq!(
            lines,
            vec![format!("--> GET {url}"), format!("<-- 200 OK {url}")]
        );
        assert!(
            LINES
                .lock()
                .unwrap()
                .iter()
                .all(|line| !line.contains("hush-hush-token"))
        );
    }

    #[tokio::test]
    async fn log_passes_request_through_unchanged() {
        let recorder = Arc::new(Recorder::default());
        let auth = AuthTransport::new(Arc::clone(&recorder), "t").unwrap();
        let transport = LogTransport::new(auth);

        let result = transport.send(request("https://example.com/x?y=1")).await;

        assert!(result.is_err());
        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].0, "https://example.com/x?y=1");
        assert_eq!(seen[0].1.as_ref().unwrap().to_str().unwrap(), "Bearer t");
    }
}

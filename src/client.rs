use crate::decode::decode;
use crate::error::{ApiError, ErrorResponse, UpError};
use crate::models::{
    AccountResponse, AccountsResponse, ListResponse, PingResponse, RegisterWebhookRequest,
    TransactionResponse, TransactionsResponse, WebhookEvent, WebhookInput, WebhookInputAttributes,
    WebhookResponse, WebhooksResponse,
};
use crate::options::{
    AccountsOption, TransactionsOption, WebhookOption, query_pairs, webhook_description,
};
use crate::transport::{AuthTransport, LogTransport, Transport};
use log::{debug, info, warn};
use reqwest::{Client as HttpClient, Method, Request, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

pub const BASE_URL: &str = "https://api.up.com.au";
const API_PREFIX: [&str; 2] = ["api", "v1"];

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    http: HttpClient,
    transport: Arc<dyn Transport>,
    timeout: Option<Duration>,
}

impl Client {
    /// Create a new client with the default base URL and no request logging.
    pub fn new(token: impl Into<String>) -> Result<Self, UpError> {
        Self::builder(token).build()
    }

    pub fn builder(token: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(token)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check the token against the service.
    pub async fn ping(&self) -> Result<PingResponse, UpError> {
        debug!("Pinging Up API");
        let request = self.build(Method::GET, &["util", "ping"], |r| r)?;
        self.execute(request, StatusCode::OK)
            .await
            .map_err(|err| match err {
                UpError::Api(api) => UpError::Ping(api),
                other => other,
            })
    }

    pub async fn list_accounts(
        &self,
        options: &[AccountsOption],
    ) -> Result<AccountsResponse, UpError> {
        debug!("Listing accounts with {} option(s)", options.len());
        let query = query_pairs(options);
        let request = self.build(Method::GET, &["accounts"], |r| r.query(&query))?;
        self.execute(request, StatusCode::OK).await
    }

    pub async fn get_account(&self, id: &str) -> Result<AccountResponse, UpError> {
        debug!("Fetching account {}", id);
        let request = self.build(Method::GET, &["accounts", resource_id(id)?], |r| r)?;
        self.execute(request, StatusCode::OK).await
    }

    /// List transactions across all accounts, newest first.
    pub async fn list_transactions(
        &self,
        options: &[TransactionsOption],
    ) -> Result<TransactionsResponse, UpError> {
        debug!("Listing transactions with {} option(s)", options.len());
        let query = query_pairs(options);
        let request = self.build(Method::GET, &["transactions"], |r| r.query(&query))?;
        self.execute(request, StatusCode::OK).await
    }

    pub async fn get_transaction(&self, id: &str) -> Result<TransactionResponse, UpError> {
        debug!("Fetching transaction {}", id);
        let request = self.build(Method::GET, &["transactions", resource_id(id)?], |r| r)?;
        self.execute(request, StatusCode::OK).await
    }

    pub async fn list_webhooks(&self) -> Result<WebhooksResponse, UpError> {
        debug!("Listing webhooks");
        let request = self.build(Method::GET, &["webhooks"], |r| r)?;
        self.execute(request, StatusCode::OK).await
    }

    /// Register `url` to receive webhook events. The returned resource holds
    /// the secret key used to sign deliveries; the service never shows it
    /// again.
    pub async fn register_webhook(
        &self,
        url: &str,
        options: &[WebhookOption],
    ) -> Result<WebhookResponse, UpError> {
        let body = RegisterWebhookRequest {
            data: WebhookInput {
                attributes: WebhookInputAttributes {
                    url,
                    description: webhook_description(options),
                },
            },
        };
        info!("Registering webhook at {}", url);
        let request = self.build(Method::POST, &["webhooks"], |r| r.json(&body))?;
        self.execute(request, StatusCode::CREATED).await
    }

    /// Ask the service to send a `PING` event to the webhook.
    pub async fn ping_webhook(&self, id: &str) -> Result<WebhookEvent, UpError> {
        info!("Pinging webhook {}", id);
        let request = self.build(Method::POST, &["webhooks", resource_id(id)?, "ping"], |r| r)?;
        self.execute(request, StatusCode::CREATED).await
    }

    /// Follow the `next` link of a list response. `None` on the last page.
    ///
    /// The link must share the base URL's origin, otherwise the token would
    /// be sent to whichever host the response names.
    pub async fn next_page<T>(
        &self,
        page: &ListResponse<T>,
    ) -> Result<Option<ListResponse<T>>, UpError>
    where
        T: DeserializeOwned,
    {
        if !page.has_next() {
            return Ok(None);
        }
        let next = Url::parse(&page.links.next)?;
        if next.origin() != self.base_url.origin() {
            warn!("Refusing next page link {}", next);
            return Err(UpError::ForeignLink(page.links.next.clone()));
        }
        debug!("Following next page link");
        let request = self.finish(self.http.get(next))?;
        self.execute(request, StatusCode::OK).await.map(Some)
    }

    fn build(
        &self,
        method: Method,
        segments: &[&str],
        customize: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Request, UpError> {
        // Each segment is percent-encoded on its own, so `/` and `?` inside
        // an ID stay part of that segment.
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpError::Config("base URL cannot hold a path"))?
            .pop_if_empty()
            .extend(API_PREFIX)
            .extend(segments);
        self.finish(customize(self.http.request(method, url)))
    }

    fn finish(&self, builder: RequestBuilder) -> Result<Request, UpError> {
        let builder = match self.timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        };
        Ok(builder.build()?)
    }

    async fn execute<T>(&self, request: Request, success: StatusCode) -> Result<T, UpError>
    where
        T: DeserializeOwned,
    {
        let response = self.transport.send(request).await?;
        let status = response.status();
        // Read the whole body up front; this also returns the connection to
        // the pool whatever happens next.
        let body = response.bytes().await?;
        debug!("Received status {} with {} byte body", status, body.len());

        if status != success {
            let envelope: ErrorResponse = decode(&body)?;
            if envelope.errors.is_empty() {
                return Err(UpError::UnexpectedStatus(status));
            }
            return Err(ApiError::from(envelope).into());
        }
        Ok(decode(&body)?)
    }
}

/// IDs go into the path as a single segment; an empty or dot segment would
/// address a different endpoint.
fn resource_id(id: &str) -> Result<&str, UpError> {
    match id {
        "" | "." | ".." => Err(UpError::InvalidParameter("resource ID must name a resource")),
        _ => Ok(id),
    }
}

pub struct ClientBuilder {
    token: String,
    base_url: String,
    verbose: bool,
    timeout: Option<Duration>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: BASE_URL.to_string(),
            verbose: false,
            timeout: None,
            transport: None,
        }
    }

    /// Override the base URL (useful for tests or proxies).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Log every request and response status.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Give up on a request after `timeout`. Requests never time out unless
    /// this is set.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Send requests through `transport` instead of a fresh `reqwest::Client`.
    /// Auth and logging are still layered on top.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        let transport: Arc<dyn Transport> = Arc::new(transport);
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Client, UpError> {
        if self.token.trim().is_empty() {
            return Err(UpError::Config("bearer token must not be empty"));
        }

        let base_url = Url::parse(&self.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(UpError::Config("base URL cannot hold a path"));
        }

        let http = HttpClient::builder().build()?;
        let base: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(http.clone()),
        };
        let auth = AuthTransport::new(base, &self.token)?;
        let transport: Arc<dyn Transport> = if self.verbose {
            Arc::new(LogTransport::new(auth))
        } else {
            Arc::new(auth)
        };

        info!("Initialized Up API client for {}", base_url);
        Ok(Client {
            base_url,
            http,
            transport,
            timeout: self.timeout,
        })
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("verbose", &self.verbose)
            .field("timeout", &self.timeout)
            .field("has_transport", &self.transport.is_some())
            .finish()
    }
}

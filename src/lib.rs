//! Rust client for the Up banking REST API.
//! Provides an async interface returning typed JSON:API resources, with
//! strict decoding so upstream schema changes surface as errors.

pub mod client;
pub mod decode;
pub mod error;
pub mod models;
pub mod money;
pub mod options;
pub mod transport;
pub mod webhook;

pub use client::{BASE_URL, Client, ClientBuilder};
pub use decode::{DecodeError, DecodeErrorKind};
pub use error::{ApiError, ErrorObject, ErrorResponse, ErrorSource, UpError};
pub use models::{
    AccountResource, AccountType, Document, ListResponse, TransactionResource, TransactionStatus,
    WebhookEvent, WebhookEventType, WebhookResource,
};
pub use money::MoneyObject;
pub use options::{AccountsOption, QueryOption, TransactionsOption, WebhookOption};
pub use transport::{AuthTransport, LogTransport, Transport};

//! Per-operation request options.
//!
//! A [`QueryOption`] is tagged with the operation it belongs to, so a
//! transaction time filter cannot be handed to [`crate::Client::list_accounts`].
//! Options are applied in the order given and never replace each other: two
//! page sizes produce two `page[size]` parameters.

use chrono::{DateTime, FixedOffset};
use std::fmt;
use std::marker::PhantomData;

pub const PAGE_SIZE: &str = "page[size]";
pub const FILTER_SINCE: &str = "filter[since]";
pub const FILTER_UNTIL: &str = "filter[until]";

/// Marker for [`crate::Client::list_accounts`].
#[derive(Debug, Clone, Copy)]
pub enum Accounts {}

/// Marker for [`crate::Client::list_transactions`].
#[derive(Debug, Clone, Copy)]
pub enum Transactions {}

/// Operations that accept a page size.
pub trait Paginated {}

impl Paginated for Accounts {}
impl Paginated for Transactions {}

pub struct QueryOption<Op> {
    name: &'static str,
    value: String,
    _op: PhantomData<fn() -> Op>,
}

pub type AccountsOption = QueryOption<Accounts>;
pub type TransactionsOption = QueryOption<Transactions>;

impl<Op> QueryOption<Op> {
    fn new(name: &'static str, value: String) -> Self {
        Self {
            name,
            value,
            _op: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl<Op: Paginated> QueryOption<Op> {
    /// Number of records per page.
    pub fn page_size(size: u32) -> Self {
        Self::new(PAGE_SIZE, size.to_string())
    }
}

impl QueryOption<Transactions> {
    /// Only transactions created at or after `at`.
    pub fn since(at: impl Into<DateTime<FixedOffset>>) -> Self {
        Self::new(FILTER_SINCE, at.into().to_rfc3339())
    }

    /// Only transactions created before `at`.
    pub fn until(at: impl Into<DateTime<FixedOffset>>) -> Self {
        Self::new(FILTER_UNTIL, at.into().to_rfc3339())
    }
}

// Manual impls so `Op` (an uninhabited marker) needs no bounds.
impl<Op> Clone for QueryOption<Op> {
    fn clone(&self) -> Self {
        Self::new(self.name, self.value.clone())
    }
}

impl<Op> fmt::Debug for QueryOption<Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOption")
            .field("name", &self.name)
            .field("value", &self.value)
            .finish()
    }
}

impl<Op> PartialEq for QueryOption<Op> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value
    }
}

impl<Op> Eq for QueryOption<Op> {}

/// Flatten options into ordered query pairs, keeping repeats.
pub(crate) fn query_pairs<Op>(options: &[QueryOption<Op>]) -> Vec<(&'static str, &str)> {
    options.iter().map(|o| (o.name, o.value.as_str())).collect()
}

/// Options for [`crate::Client::register_webhook`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOption {
    Description(String),
}

impl WebhookOption {
    /// Free-form description shown alongside the webhook. The service caps
    /// it at 64 characters.
    pub fn description(description: impl Into<String>) -> Self {
        WebhookOption::Description(description.into())
    }
}

/// Last description wins when several are given.
pub(crate) fn webhook_description(options: &[WebhookOption]) -> Option<&str> {
    options.iter().rev().find_map(|o| match o {
        WebhookOption::Description(d) => Some(d.as_str()),
    })
}

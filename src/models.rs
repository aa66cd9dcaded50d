use crate::money::MoneyObject;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Saver,
    Transactional,
    HomeLoan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnershipType {
    Individual,
    Joint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Held,
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookEventType {
    TransactionCreated,
    TransactionSettled,
    TransactionDeleted,
    Ping,
}

macro_rules! wire_name {
    ($ty:ty { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Name used on the wire.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_name!(AccountType {
    Saver => "SAVER",
    Transactional => "TRANSACTIONAL",
    HomeLoan => "HOME_LOAN",
});
wire_name!(OwnershipType {
    Individual => "INDIVIDUAL",
    Joint => "JOINT",
});
wire_name!(TransactionStatus {
    Held => "HELD",
    Settled => "SETTLED",
});
wire_name!(WebhookEventType {
    TransactionCreated => "TRANSACTION_CREATED",
    TransactionSettled => "TRANSACTION_SETTLED",
    TransactionDeleted => "TRANSACTION_DELETED",
    Ping => "PING",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelfLink {
    #[serde(rename = "self")]
    pub self_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelatedLink {
    pub related: String,
}

/// Identifies a related resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

/// Pagination links of a list response. Missing links are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageLinks {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub prev: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub next: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub links: PageLinks,
}

impl<T> ListResponse<T> {
    pub fn has_next(&self) -> bool {
        !self.links.next.is_empty()
    }
}

/// Envelope around a single resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document<T> {
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PingResponse {
    pub meta: PingMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct PingMeta {
    pub id: String,
    pub status_emoji: String,
}

// Accounts

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountResource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: AccountAttributes,
    pub relationships: AccountRelationships,
    pub links: SelfLink,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct AccountAttributes {
    pub display_name: String,
    pub account_type: AccountType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership_type: Option<OwnershipType>,
    pub balance: MoneyObject,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountRelationships {
    pub transactions: RelatedLinks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelatedLinks {
    pub links: RelatedLink,
}

pub type AccountsResponse = ListResponse<AccountResource>;
pub type AccountResponse = Document<AccountResource>;

// Transactions

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionResource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: TransactionAttributes,
    pub relationships: TransactionRelationships,
    pub links: SelfLink,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct TransactionAttributes {
    pub status: TransactionStatus,
    pub description: String,
    pub raw_text: Option<String>,
    pub message: Option<String>,
    pub hold_info: Option<HoldInfo>,
    pub round_up: Option<RoundUp>,
    pub cashback: Option<Cashback>,
    pub amount: MoneyObject,
    pub foreign_amount: Option<MoneyObject>,
    pub settled_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct HoldInfo {
    pub amount: MoneyObject,
    pub foreign_amount: Option<MoneyObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RoundUp {
    pub amount: MoneyObject,
    pub boost_portion: Option<MoneyObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Cashback {
    pub description: String,
    pub amount: MoneyObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionRelationships {
    pub account: RelatedResource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<TagsRelationship>,
}

/// A to-one relationship: the related resource and where to fetch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelatedResource {
    pub data: ResourceIdentifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<RelatedLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagsRelationship {
    pub links: SelfLink,
}

pub type TransactionsResponse = ListResponse<TransactionResource>;
pub type TransactionResponse = Document<TransactionResource>;

// Webhooks

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookResource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: WebhookAttributes,
    pub relationships: WebhookRelationships,
    pub links: SelfLink,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct WebhookAttributes {
    pub url: String,
    pub description: Option<String>,
    /// Only present in the response to registering the webhook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookRelationships {
    pub logs: RelatedLinks,
}

pub type WebhooksResponse = ListResponse<WebhookResource>;
pub type WebhookResponse = Document<WebhookResource>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookEventResource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: WebhookEventAttributes,
    pub relationships: WebhookEventRelationships,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct WebhookEventAttributes {
    pub event_type: WebhookEventType,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookEventRelationships {
    pub webhook: RelatedResource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<RelatedResource>,
}

/// Response to pinging a webhook, and the body of every webhook delivery.
pub type WebhookEvent = Document<WebhookEventResource>;

// Requests

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RegisterWebhookRequest<'a> {
    pub data: WebhookInput<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct WebhookInput<'a> {
    pub attributes: WebhookInputAttributes<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct WebhookInputAttributes<'a> {
    pub url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default())
}

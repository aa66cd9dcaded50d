use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use comfy_table::presets::NOTHING;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use upngo::webhook::parse_event;
use upngo::{
    AccountsOption, Client, ListResponse, MoneyObject, TransactionsOption, WebhookEventType,
    WebhookOption,
};

const KEYRING_SERVICE: &str = "upngo";
const KEYRING_KEY: &str = "upbank-token";

#[derive(Debug, Parser)]
#[command(name = "upngo", about = "Talk to your bank from the CLI!")]
struct Cli {
    /// API token; falls back to UPBANK_TOKEN, then to the token saved by `init`
    #[arg(long, env = "UPBANK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log every request and response
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Save your token in the system keyring so later commands can use it
    Init,
    /// Ping Up. Useful to test your token is correct
    Ping,
    /// List accounts, transactions or webhooks
    #[command(subcommand)]
    List(ListCommand),
    /// Get an account or transaction by ID
    #[command(subcommand)]
    Get(GetCommand),
    /// Register a webhook
    #[command(subcommand)]
    Add(AddCommand),
    /// Send a PING event to a webhook
    PingWebhook { id: String },
    /// Check a captured webhook delivery against its signature
    VerifyWebhook {
        /// Secret key returned when the webhook was registered
        #[arg(long, env = "UPBANK_WEBHOOK_SECRET", hide_env_values = true)]
        secret: String,
        /// Value of the X-Up-Authenticity-Signature header
        #[arg(long)]
        signature: String,
        /// File holding the raw request body
        body: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum ListCommand {
    Accounts {
        #[arg(long)]
        page_size: Option<u32>,
    },
    Transactions {
        #[arg(long)]
        page_size: Option<u32>,
        /// Only transactions at or after this RFC 3339 time
        #[arg(long, value_parser = parse_timestamp)]
        since: Option<DateTime<FixedOffset>>,
        /// Only transactions before this RFC 3339 time
        #[arg(long, value_parser = parse_timestamp)]
        until: Option<DateTime<FixedOffset>>,
    },
    Webhooks,
}

#[derive(Debug, Subcommand)]
enum GetCommand {
    Account { id: String },
    Transaction { id: String },
}

#[derive(Debug, Subcommand)]
enum AddCommand {
    /// Register a webhook at URL
    Webhook {
        url: String,
        /// Webhook description (optional)
        #[arg(short, long)]
        description: Option<String>,
    },
}

fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(raw).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let (token, verbose) = (cli.token, cli.verbose);
    let connect = move || -> Result<Client, Box<dyn Error>> {
        let token = resolve_token(token, stored_token)?;
        Ok(Client::builder(token).verbose(verbose).build()?)
    };

    match cli.command {
        Commands::Init => {
            println!("Enter your Up token below and it will be saved in your keyring.");
            let token = rpassword::prompt_password("Up token: ")?;
            keyring_entry()?.set_password(token.trim())?;
            println!("Token saved 🔑");
        }
        Commands::Ping => {
            connect()?.ping().await?;
            println!("Successfully pinged Up ⚡");
        }
        Commands::List(ListCommand::Accounts { page_size }) => {
            let options: Vec<AccountsOption> =
                page_size.map(AccountsOption::page_size).into_iter().collect();
            let accounts = connect()?.list_accounts(&options).await?;
            let rows = accounts
                .data
                .iter()
                .map(|a| {
                    let attrs = &a.attributes;
                    vec![
                        attrs.display_name.clone(),
                        attrs.account_type.to_string(),
                        attrs.balance.format(),
                    ]
                })
                .collect();
            print_table(rows);
            print_next(&accounts);
        }
        Commands::List(ListCommand::Transactions {
            page_size,
            since,
            until,
        }) => {
            let mut options = Vec::new();
            options.extend(page_size.map(TransactionsOption::page_size));
            options.extend(since.map(TransactionsOption::since));
            options.extend(until.map(TransactionsOption::until));
            let transactions = connect()?.list_transactions(&options).await?;
            let rows = transactions
                .data
                .iter()
                .map(|t| {
                    let attrs = &t.attributes;
                    vec![
                        attrs.created_at.format("%Y-%m-%d %H:%M").to_string(),
                        attrs.description.clone(),
                        attrs.amount.format(),
                        attrs.status.to_string(),
                    ]
                })
                .collect();
            print_table(rows);
            print_next(&transactions);
        }
        Commands::List(ListCommand::Webhooks) => {
            let webhooks = connect()?.list_webhooks().await?;
            let rows = webhooks
                .data
                .iter()
                .map(|w| {
                    vec![
                        w.id.clone(),
                        w.attributes.url.clone(),
                        w.attributes.description.clone().unwrap_or_default(),
                    ]
                })
                .collect();
            print_table(rows);
        }
        Commands::Get(GetCommand::Account { id }) => {
            let account = connect()?.get_account(&id).await?.data;
            let attrs = account.attributes;
            print_table(vec![
                vec!["Name:".into(), attrs.display_name],
                vec!["Type:".into(), attrs.account_type.to_string()],
                vec!["Balance:".into(), attrs.balance.format()],
            ]);
        }
        Commands::Get(GetCommand::Transaction { id }) => {
            let txn = connect()?.get_transaction(&id).await?.data;
            let attrs = txn.attributes;
            let mut rows = vec![
                vec!["Description:".into(), attrs.description],
                vec![
                    "Message:".into(),
                    attrs.message.unwrap_or_else(|| "N/A".into()),
                ],
                vec!["Amount:".into(), attrs.amount.format()],
            ];
            if let Some(foreign) = attrs.foreign_amount.as_ref().map(MoneyObject::format) {
                rows.push(vec!["Foreign amount:".into(), foreign]);
            }
            rows.push(vec!["Status:".into(), attrs.status.to_string()]);
            rows.push(vec!["Date:".into(), attrs.created_at.to_rfc2822()]);
            print_table(rows);
        }
        Commands::Add(AddCommand::Webhook { url, description }) => {
            let options: Vec<WebhookOption> = description
                .map(WebhookOption::description)
                .into_iter()
                .collect();
            let webhook = connect()?.register_webhook(&url, &options).await?;
            let secret = webhook.data.attributes.secret_key.unwrap_or_default();
            println!("Successfully registered webhook at {url} 💸");
            println!();
            println!("Here's the secret key:");
            println!("\t{secret}");
            println!("Use it to verify requests sent to the webhook URL.");
        }
        Commands::PingWebhook { id } => {
            let event = connect()?.ping_webhook(&id).await?;
            println!(
                "Sent {} event {} to webhook {}",
                event.data.attributes.event_type, event.data.id, id
            );
        }
        Commands::VerifyWebhook {
            secret,
            signature,
            body,
        } => {
            let body = fs::read(&body)?;
            let event = parse_event(secret.as_bytes(), &body, &signature)?;
            match event.data.attributes.event_type {
                WebhookEventType::Ping => println!("pong"),
                other => println!("Verified {} event {}", other, event.data.id),
            }
        }
    }

    Ok(())
}

fn print_next<T>(page: &ListResponse<T>) {
    if page.has_next() {
        println!("\nMore results: {}", page.links.next);
    }
}

fn print_table(rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table.load_preset(NOTHING).add_rows(rows);
    println!("{table}");
}

fn keyring_entry() -> keyring::Result<keyring::Entry> {
    keyring::Entry::new(KEYRING_SERVICE, KEYRING_KEY)
}

/// The token saved by `init`, if there is one.
fn stored_token() -> keyring::Result<Option<String>> {
    match keyring_entry()?.get_password() {
        Ok(token) => Ok(Some(token)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(err),
    }
}

/// `--token` or `UPBANK_TOKEN` wins; otherwise read the keyring. Finding
/// nothing yields an empty token, which `Client` rejects as a config error.
fn resolve_token(
    explicit: Option<String>,
    stored: impl FnOnce() -> keyring::Result<Option<String>>,
) -> keyring::Result<String> {
    match explicit {
        Some(token) => Ok(token),
        None => Ok(stored()?.unwrap_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upngo::UpError;

    #[test]
    fn explicit_token_skips_keyring() {
        let token = resolve_token(Some("from-env".into()), || {
            panic!("keyring must not be read when a token is given")
        })
        .unwrap();
        assert_eq!(token, "from-env");
    }

    #[test]
    fn falls_back_to_stored_token() {
        let token = resolve_token(None, || Ok(Some("from-keyring".into()))).unwrap();
        assert_eq!(token, "from-keyring");
    }

    #[test]
    fn keyring_failure_is_reported() {
        let err = resolve_token(None, || Err(keyring::Error::NoStorageAccess("locked".into())));
        assert!(err.is_err());
    }

    #[test]
    fn no_token_anywhere_is_a_config_error() {
        let token = resolve_token(None, || Ok(None)).unwrap();
        let err = Client::new(token).unwrap_err();
        assert!(matches!(err, UpError::Config(_)));
    }

    #[test]
    fn init_needs_no_token() {
        let cli = Cli::try_parse_from(["upngo", "init"]).unwrap();
        assert!(matches!(cli.command, Commands::Init));
    }
}

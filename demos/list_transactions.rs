use chrono::{Days, Utc};
use upngo::{Client, TransactionsOption};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let token =
        env::var("UPBANK_TOKEN").map_err(|_| "Set UPBANK_TOKEN in your environment or .env file")?;

    let client = Client::new(token)?;

    // Walk every page of the last 30 days of transactions.
    let until = Utc::now();
    let since = until
        .checked_sub_days(Days::new(30))
        .ok_or("start of window out of range")?;

    let mut page = client
        .list_transactions(&[
            TransactionsOption::page_size(50),
            TransactionsOption::since(since),
            TransactionsOption::until(until),
        ])
        .await?;
    let mut count = 0;
    loop {
        for txn in &page.data {
            count += 1;
            let attrs = &txn.attributes;
            println!(
                "{} | {} | {} | {}",
                attrs.created_at.format("%Y-%m-%d"),
                attrs.status,
                attrs.amount,
                attrs.description
            );
        }
        match client.next_page(&page).await? {
            Some(next) => page = next,
            None => break,
        }
    }
    println!("Fetched {count} transactions from {since} to {until}");

    Ok(())
}

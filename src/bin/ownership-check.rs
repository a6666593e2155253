//! Tells which events an ownership cookie still grants, according to the live dataset of a site.
//!
//! Usage: `ownership-check <site URL | config.json> <raw cookie value>`
//!
//! The raw cookie value is the URL-encoded one, as shown by the developer tools of a browser.
//! Set the RUST_LOG environment variable to display more info.

use std::path::Path;

use event_drop::client::Client;
use event_drop::config::{OWNERSHIP_COOKIE_NAME, SiteConfig};
use event_drop::consent::{ConsentDecision, ConsentRecord};
use event_drop::cookie::MemoryCookieJar;
use event_drop::ledger::{LedgerStore, load_ownership};
use event_drop::traits::SystemClock;


#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <site URL | config.json> <raw cookie value>", args[0]);
        std::process::exit(2);
    }

    let config = match load_config(&args[1]) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid site configuration: {}", err);
            std::process::exit(2);
        }
    };
    let client = match Client::new(&config) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("Unable to create a client: {}", err);
            std::process::exit(1);
        }
    };

    // Pretend the visitor consented, so that a pruned cookie gets displayed
    let jar = MemoryCookieJar::with_cookie(OWNERSHIP_COOKIE_NAME, &args[2]);
    ConsentRecord::new(&jar, config.cookie_domain.clone()).record(ConsentDecision::Accepted);

    let store = LedgerStore::new(&jar, config.cookie_domain.clone());
    let view = load_ownership(&store, &client, &SystemClock).await;

    if view.reconciled == false {
        log::warn!("The dataset at {} could not be used, this list has not been pruned", config.base_url);
    }
    println!("{} owned event(s):", view.owned.len());
    for id in view.owned.iter() {
        println!("  {}\t{}", id, config.edit_link_for(id));
    }
    match jar.last_written(OWNERSHIP_COOKIE_NAME) {
        Some(header) => println!("The cookie would be rewritten as:\n  {}", header),
        None => println!("The cookie would be left untouched"),
    }
}

fn load_config(arg: &str) -> Result<SiteConfig, Box<dyn std::error::Error>> {
    if arg.ends_with(".json") {
        SiteConfig::from_file(Path::new(arg))
    } else {
        SiteConfig::new(arg)
    }
}

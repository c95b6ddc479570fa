use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::info;

use cookie_eater::cookie::export_to_json;
use cookie_eater::{Browser, CookieManager, NewCookie};

#[derive(Parser)]
#[command(name = "cookie-eater")]
#[command(about = "Read, search and edit browser cookie databases", long_about = None)]
#[command(version)]
struct Cli {
    /// Browser whose cookie database to use: chrome or firefox
    #[arg(short, long, global = true, default_value = "chrome")]
    browser: Browser,

    /// Explicit cookie database path (default: the browser's default profile)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CookieArgs {
    /// Host the cookie belongs to
    host: String,

    /// Cookie name
    name: String,

    /// Cookie value
    value: String,

    #[arg(long, default_value = "/")]
    path: String,

    /// Hours from now until the cookie expires
    #[arg(long, default_value_t = 24)]
    expires_in_hours: i64,

    #[arg(long)]
    secure: bool,

    #[arg(long)]
    http_only: bool,

    /// Browser specific field as key=value (repeatable), e.g. same_site=1
    #[arg(long = "extra", value_name = "KEY=VALUE")]
    extras: Vec<String>,
}

impl CookieArgs {
    fn to_cookie(&self) -> Result<NewCookie> {
        let expires_in = chrono::Duration::try_hours(self.expires_in_hours)
            .with_context(|| format!("--expires-in-hours {} is out of range", self.expires_in_hours))?;
        let mut cookie = NewCookie::new(&self.host, &self.name, &self.value)
            .path(&self.path)
            .expires_in(expires_in)
            .secure(self.secure)
            .http_only(self.http_only);

        for extra in &self.extras {
            let (key, raw) = extra
                .split_once('=')
                .with_context(|| format!("Invalid extra field {:?}, expected KEY=VALUE", extra))?;
            let value = serde_json::from_str::<Value>(raw)
                .unwrap_or_else(|_| Value::String(raw.to_string()));
            cookie = cookie.extra(key, value);
        }

        Ok(cookie)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show where the browser's default cookie database is
    Locate,

    /// Search cookies by host, name or value (case-insensitive, any match)
    Find {
        #[arg(long, default_value = "")]
        host: String,

        #[arg(long, default_value = "")]
        name: String,

        #[arg(long, default_value = "")]
        value: String,
    },

    /// Print every cookie as JSON
    Dump {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Add a cookie
    Add(CookieArgs),

    /// Delete the cookie with exactly this host and name
    Delete { host: String, name: String },

    /// Replace a cookie (delete, then add)
    Update {
        #[command(flatten)]
        cookie: CookieArgs,

        /// Fail if there is no cookie to replace
        #[arg(long)]
        strict: bool,
    },

    /// Copy the cookie database next to itself with a .backup suffix
    Backup,
}

fn open(cli: &Cli) -> Result<CookieManager> {
    CookieManager::open(cli.browser.dialect(), cli.db.clone())
        .with_context(|| format!("Failed to open {} cookie database", cli.browser))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Locate => {
            let path = CookieManager::find_db(cli.browser.dialect().as_ref())?;
            println!("{}", path.display());
        }

        Commands::Find { host, name, value } => {
            let jar = open(&cli)?;
            let records = jar.find_cookies(host, name, value)?;
            info!("🔍 Found {} cookies in {}", records.len(), jar.name());
            println!("{}", serde_json::to_string_pretty(&records)?);
        }

        Commands::Dump { output } => {
            let jar = open(&cli)?;
            let records = jar.dump()?;
            match output {
                Some(path) => {
                    export_to_json(&records, path)?;
                    info!("✅ Exported {} cookies to {:?}", records.len(), path);
                }
                None => println!("{}", serde_json::to_string_pretty(&records)?),
            }
        }

        Commands::Add(args) => {
            let jar = open(&cli)?;
            jar.add_cookie(&args.to_cookie()?)?;
            info!("✅ Added {} for {}", args.name, args.host);
        }

        Commands::Delete { host, name } => {
            let jar = open(&cli)?;
            jar.delete_cookie(host, name)?;
            info!("✅ Deleted {} for {}", name, host);
        }

        Commands::Update { cookie, strict } => {
            let jar = open(&cli)?;
            jar.update_cookie(&cookie.to_cookie()?, !strict)?;
            info!("✅ Updated {} for {}", cookie.name, cookie.host);
        }

        Commands::Backup => {
            let jar = open(&cli)?;
            let backup = jar.backup()?;
            info!("💾 Backed up {} cookies to {:?}", jar.name(), backup);
            println!("{}", backup.display());
        }
    }

    Ok(())
}

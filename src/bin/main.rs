//! postsearch CLI - search posts by keyword and save them as JSON
//!
//! Subcommands cover each retrieval path: a bearer token exchange, the
//! standard search endpoint, premium historical search, and an external
//! scraper fallback.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use postsearch::{
    auth::Authenticator,
    config::{ClientConfig, DEFAULT_API_BASE_URL},
    credentials::{CredentialProvider, Credentials, EnvCredentials, KeyFile, DEFAULT_YAML_KEY},
    providers::{
        premium::{PremiumSearchArgs, PremiumSearchProvider},
        scraper::{run_scraper, ScraperConfig, DEFAULT_PROGRAM},
        standard::StandardSearchProvider,
    },
    search_posts,
    sink::{ResultSink, DEFAULT_AGGREGATE_FILE},
    troubleshooting_hint,
    types::{Query, ResultRecord, ResultSet, ResultType},
    utils::debug,
    SearchOptions, SearchProvider,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "postsearch")]
#[command(about = "Search social-media posts by keyword and save them as JSON")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange application credentials for a bearer token
    Token {
        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Search the standard endpoint (recent posts only)
    Standard {
        /// Search term
        query: String,

        #[command(flatten)]
        connection: ConnectionArgs,

        /// Result ranking
        #[arg(short, long, value_enum)]
        result_type: Option<ResultTypeCli>,

        /// Maximum number of results (the endpoint returns at most 100)
        #[arg(short, long, default_value = "5")]
        count: u32,

        /// Only posts from this date on (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,

        /// Only posts before this date (YYYY-MM-DD)
        #[arg(long)]
        until: Option<NaiveDate>,

        /// Language code (e.g., en, es, ca)
        #[arg(short, long)]
        language: Option<String>,

        /// Authenticate on each search instead of once up front
        #[arg(long)]
        lazy_auth: bool,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Search a premium endpoint configured in a key file
    Premium {
        /// Search term
        query: String,

        /// YAML key file
        #[arg(long, default_value = "./twitter_keys.yml")]
        key_file: PathBuf,

        /// Section of the key file to use
        #[arg(long, default_value = DEFAULT_YAML_KEY)]
        yaml_key: String,

        /// Let SEARCHTWEETS_* environment variables override the key file
        #[arg(long)]
        env_overwrite: bool,

        /// Only posts from this date on (YYYY-MM-DD)
        #[arg(long)]
        from_date: Option<NaiveDate>,

        /// Only posts before this date (YYYY-MM-DD)
        #[arg(long)]
        to_date: Option<NaiveDate>,

        /// Total number of results to collect
        #[arg(short, long, default_value = "500")]
        max_results: u32,

        /// Stop after this many requests
        #[arg(long)]
        max_requests: Option<usize>,

        /// API base URL used for the token exchange
        #[arg(long, env = "POSTSEARCH_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
        api_base_url: String,

        /// Request timeout in milliseconds
        #[arg(long, default_value = "15000")]
        timeout_ms: u64,

        /// Directory to write the aggregate file into
        #[arg(short, long, default_value = "data")]
        output_dir: PathBuf,

        /// Aggregate file name
        #[arg(long, default_value = DEFAULT_AGGREGATE_FILE)]
        file_name: String,

        /// Print results without writing anything
        #[arg(long)]
        no_save: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Enable debug output
        #[arg(short, long)]
        debug: bool,
    },
    /// Run an external scraper that writes CSV
    Scrape {
        /// Search term
        query: String,

        /// Scraper program
        #[arg(long, default_value = DEFAULT_PROGRAM)]
        program: PathBuf,

        /// Directory the scraper writes into
        #[arg(short, long, default_value = "data")]
        output_dir: PathBuf,

        /// Only posts from this date on (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,

        /// Maximum number of posts to scrape
        #[arg(short, long, default_value = "100")]
        limit: u32,

        /// Let the scraper print to the terminal
        #[arg(long)]
        show_output: bool,
    },
}

#[derive(Args)]
struct ConnectionArgs {
    /// Environment variable holding the application key
    #[arg(long, default_value = "APP_KEY")]
    key_var: String,

    /// Environment variable holding the application secret
    #[arg(long, default_value = "APP_SECRET")]
    secret_var: String,

    /// Read consumer_key/consumer_secret from this YAML key file instead
    #[arg(long)]
    key_file: Option<PathBuf>,

    /// Section of the key file to use
    #[arg(long, default_value = DEFAULT_YAML_KEY)]
    yaml_key: String,

    /// API base URL for the token and search endpoints
    #[arg(long, env = "POSTSEARCH_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    api_base_url: String,

    /// Request timeout in milliseconds
    #[arg(long, default_value = "15000")]
    timeout_ms: u64,
}

impl ConnectionArgs {
    fn client_config(&self) -> Result<ClientConfig> {
        Ok(ClientConfig::with_base_url(&self.api_base_url)
            .context("Invalid API base URL")?
            .with_timeout(Some(self.timeout_ms)))
    }

    fn credentials(&self) -> Result<Credentials> {
        let credentials = match &self.key_file {
            Some(path) => KeyFile::new(path)
                .with_yaml_key(&self.yaml_key)
                .get_credentials()
                .with_context(|| format!("Cannot load credentials from {}", path.display()))?,
            None => EnvCredentials::new(&self.key_var, &self.secret_var)
                .get_credentials()
                .with_context(|| {
                    format!(
                        "Set {} and {} or pass --key-file",
                        self.key_var, self.secret_var
                    )
                })?,
        };
        Ok(credentials)
    }
}

#[derive(Args)]
struct OutputArgs {
    /// Directory to write results into
    #[arg(short, long, default_value = "data")]
    output_dir: PathBuf,

    /// Write one aggregate file with this name instead of one file per post
    #[arg(long)]
    aggregate: Option<String>,

    /// Print results without writing anything
    #[arg(long)]
    no_save: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

impl OutputArgs {
    fn sink(&self) -> Option<ResultSink> {
        if self.no_save {
            return None;
        }
        Some(match &self.aggregate {
            Some(file_name) => ResultSink::aggregate(&self.output_dir, file_name),
            None => ResultSink::per_record(&self.output_dir),
        })
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ResultTypeCli {
    Mixed,
    Recent,
    Popular,
}

impl From<ResultTypeCli> for ResultType {
    fn from(value: ResultTypeCli) -> Self {
        match value {
            ResultTypeCli::Mixed => ResultType::Mixed,
            ResultTypeCli::Recent => ResultType::Recent,
            ResultTypeCli::Popular => ResultType::Popular,
        }
    }
}

#[derive(ValueEnum, Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Simple,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Token { connection } => handle_token(connection).await,
        Commands::Standard {
            query,
            connection,
            result_type,
            count,
            since,
            until,
            language,
            lazy_auth,
            output,
        } => {
            let mut search = Query::new(query).with_count(count);
            if let Some(result_type) = result_type {
                search = search.with_result_type(result_type.into());
            }
            if let Some(since) = since {
                search = search.with_since(since);
            }
            if let Some(until) = until {
                search = search.with_until(until);
            }
            if let Some(language) = language {
                search = search.with_language(language);
            }
            handle_standard_search(search, connection, lazy_auth, output).await
        }
        Commands::Premium {
            query,
            key_file,
            yaml_key,
            env_overwrite,
            from_date,
            to_date,
            max_results,
            max_requests,
            api_base_url,
            timeout_ms,
            output_dir,
            file_name,
            no_save,
            format,
            debug,
        } => {
            let mut search = Query::new(query).with_count(max_results);
            if let Some(from_date) = from_date {
                search = search.with_since(from_date);
            }
            if let Some(to_date) = to_date {
                search = search.with_until(to_date);
            }

            let key_file = KeyFile::new(key_file)
                .with_yaml_key(&yaml_key)
                .with_env_overwrite(env_overwrite);
            let config = ClientConfig::with_base_url(&api_base_url)
                .context("Invalid API base URL")?
                .with_timeout(Some(timeout_ms));
            let output = OutputArgs {
                output_dir,
                aggregate: Some(file_name),
                no_save,
                format,
                debug,
            };
            handle_premium_search(search, key_file, max_requests, config, output).await
        }
        Commands::Scrape {
            query,
            program,
            output_dir,
            since,
            limit,
            show_output,
        } => {
            let mut builder = ScraperConfig::builder(&query)
                .program(program)
                .output_dir(output_dir)
                .limit(limit)
                .hide_output(!show_output);
            if let Some(since) = since {
                builder = builder.since(since);
            }
            handle_scrape(builder.build()?).await
        }
    }
}

async fn handle_token(connection: ConnectionArgs) -> Result<()> {
    let config = connection.client_config()?;
    let credentials = connection.credentials()?;

    let authenticator = Authenticator::new(&config)?;
    let token = authenticator
        .authenticate(&credentials)
        .await
        .map_err(|e| explain("token", e))?;

    println!("{}", token.as_str());
    Ok(())
}

async fn handle_standard_search(
    query: Query,
    connection: ConnectionArgs,
    lazy_auth: bool,
    output: OutputArgs,
) -> Result<()> {
    let config = connection.client_config()?;
    let credentials = connection.credentials()?;

    let provider = if lazy_auth {
        StandardSearchProvider::with_credentials(credentials, &config)?
    } else {
        StandardSearchProvider::connect(&credentials, &config)
            .await
            .map_err(|e| explain("standard", e))?
    };

    run_search(query, Box::new(provider), output).await
}

async fn handle_premium_search(
    query: Query,
    key_file: KeyFile,
    max_requests: Option<usize>,
    config: ClientConfig,
    output: OutputArgs,
) -> Result<()> {
    let args = PremiumSearchArgs::load(&key_file)
        .with_context(|| format!("Cannot load premium settings from {}", key_file.path().display()))?;

    let mut provider = PremiumSearchProvider::new(args, &config);
    if let Some(max_requests) = max_requests {
        provider = provider.with_max_requests(max_requests);
    }

    run_search(query, Box::new(provider), output).await
}

async fn run_search(
    query: Query,
    provider: Box<dyn SearchProvider>,
    output: OutputArgs,
) -> Result<()> {
    let provider_name = provider.name().to_string();
    let options = SearchOptions {
        query,
        debug: output.debug.then(debug::verbose),
        provider,
    };

    let results = search_posts(options)
        .await
        .map_err(|e| explain(&provider_name, e))?;

    display_results(&results, &output.format, &provider_name)?;

    if let Some(sink) = output.sink() {
        let written = sink.persist(&results).await?;
        println!(
            "{} {} file(s) in {}",
            "Saved".bold().green(),
            written.len(),
            sink.directory().display()
        );
    }

    Ok(())
}

async fn handle_scrape(config: ScraperConfig) -> Result<()> {
    let csv_path = run_scraper(&config)
        .await
        .map_err(|e| explain("scraper", e))?;

    println!(
        "{} {}",
        "Scraper output:".bold(),
        csv_path.display().to_string().blue()
    );
    Ok(())
}

fn explain(provider_name: &str, error: postsearch::SearchError) -> anyhow::Error {
    let hint = troubleshooting_hint(provider_name, &error);
    anyhow::Error::new(error).context(format!("{provider_name} search failed. {hint}"))
}

fn display_results(results: &ResultSet, format: &OutputFormat, provider: &str) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results.records)?);
        }
        OutputFormat::Simple => {
            for record in results {
                println!("{}\n", record.text().unwrap_or_default());
            }
        }
        OutputFormat::Table => {
            println!("{} {}", "Search Results from".bold(), provider.bold().blue());
            println!("{}", "─".repeat(80).dimmed());

            for (i, record) in results.iter().enumerate() {
                print_record(i + 1, record);
            }

            println!("{} {}", "Total results:".bold(), results.len().to_string().bold());
        }
    }
    Ok(())
}

fn print_record(position: usize, record: &ResultRecord) {
    let id = record.id().unwrap_or_else(|| "?".to_string());
    println!("{}. {}", position.to_string().bold(), id.cyan());

    if let Some(author) = record
        .get("user")
        .and_then(|user| user.get("screen_name"))
        .and_then(|name| name.as_str())
    {
        println!("   @{}", author.green());
    }

    if let Some(text) = record.text() {
        let truncated = if text.chars().count() > 200 {
            format!("{}...", text.chars().take(200).collect::<String>())
        } else {
            text.to_string()
        };
        println!("   {}", truncated.italic());
    }

    if let Some(created_at) = record.get("created_at").and_then(|v| v.as_str()) {
        println!("   {}", created_at.yellow());
    }

    println!();
}

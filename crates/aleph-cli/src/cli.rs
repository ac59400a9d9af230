use std::net::SocketAddr;
use std::path::PathBuf;

use aleph_publish::DEFAULT_BATCH_SIZE;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "aleph",
    about = "aleph node: publish statements and replicate them to peers",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Node configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Publish statements from newline-delimited JSON, read from `filename` or
    /// stdin, to a running node
    Publish(PublishArgs),
    /// Run a node: push responder and HTTP API
    Serve(ServeArgs),
    /// Print a stored object
    Get(GetArgs),
    /// Print or generate the publisher id
    Id(IdArgs),
    /// Ping another node on its push address
    Ping(PingArgs),
}

#[derive(Args)]
pub struct PublishArgs {
    pub namespace: String,
    pub filename: Option<PathBuf>,
    /// Dot-separated path to a field holding a well-known identifier, or a
    /// JSON array of keys. Use the array form if your keys contain "."
    #[arg(long, alias = "idSelector")]
    pub id_selector: String,
    /// Key path selecting the part of each record to publish. The id
    /// selector is then relative to it
    #[arg(long, alias = "contentSelector")]
    pub content_selector: Option<String>,
    /// Capture groups are concatenated to form the id, e.g. '(dpla_)http.*/(.*)'
    /// turns "dpla_http://dp.la/api/items/2e49bf37" into "dpla_2e49bf37"
    #[arg(long, alias = "idRegex")]
    pub id_regex: Option<String>,
    #[arg(long, alias = "batchSize", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
    /// Only extract ids and print them
    #[arg(long, alias = "dryRun")]
    pub dry_run: bool,
    /// Push address of the node to publish to. Defaults to the configured push_addr
    #[arg(long)]
    pub peer: Option<String>,
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub push_addr: Option<SocketAddr>,
    #[arg(long)]
    pub http_addr: Option<SocketAddr>,
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Namespace prefix peers may push into (repeatable)
    #[arg(long = "allow")]
    pub allowed_namespaces: Vec<String>,
}

#[derive(Args)]
pub struct GetArgs {
    pub key: String,
    /// Write the stored bytes without decoding
    #[arg(long)]
    pub raw: bool,
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct IdArgs {
    #[arg(long)]
    pub key_file: Option<PathBuf>,
    /// Generate a new key and write it to the key file
    #[arg(long, requires = "key_file")]
    pub generate: bool,
}

#[derive(Args)]
pub struct PingArgs {
    /// Push address of the node. Defaults to the configured push_addr
    pub addr: Option<String>,
}

use std::io::Write;
use std::sync::Arc;

use aleph_publish::{
    BatchPublisher, NamespaceClient, PeerNamespace, PublishEvent, PublishOptions, RecordStream,
};
use aleph_statement::SequenceCounter;
use aleph_server::{read_key, write_key, AlephNode, NodeConfig};
use aleph_statement::{parse_selector, IdExtractor, IdPattern};
use aleph_store::{Datastore, Fetched, GetOptions};
use aleph_types::{ContentRef, PublisherIdentity};
use anyhow::{bail, Context};
use colored::Colorize;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match cli.config.as_deref() {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };
    match cli.command {
        Command::Publish(args) => cmd_publish(config, args).await,
        Command::Serve(args) => cmd_serve(config, args).await,
        Command::Get(args) => cmd_get(config, args).await,
        Command::Id(args) => cmd_id(config, args),
        Command::Ping(args) => cmd_ping(config, args).await,
    }
}

async fn cmd_publish(config: NodeConfig, args: PublishArgs) -> anyhow::Result<()> {
    let id_selector = parse_selector(&args.id_selector)?;
    let content_selector = args.content_selector.as_deref().map(parse_selector).transpose()?;
    let id_pattern = args.id_regex.as_deref().map(IdPattern::new).transpose()?;
    let extractor = IdExtractor::new(id_selector, content_selector, id_pattern);

    // Statements always land on a running node; the CLI keeps nothing itself.
    let peer = args.peer.unwrap_or_else(|| config.push_addr.to_string());
    let identity: Arc<dyn PublisherIdentity> = Arc::new(config.load_identity()?);
    let client: Arc<dyn NamespaceClient> = Arc::new(
        PeerNamespace::new(identity, Arc::new(SequenceCounter::new()), peer)
            .with_max_frame_size(config.max_frame_size),
    );

    let source = match &args.filename {
        Some(path) => path.display().to_string(),
        None => "standard input".to_string(),
    };
    let records = RecordStream::open(args.filename.as_deref())
        .await
        .with_context(|| format!("Error reading from {source}"))?;

    let options = PublishOptions {
        namespace: args.namespace,
        batch_size: args.batch_size,
        dry_run: args.dry_run,
    };
    let (publisher, mut events) = BatchPublisher::new(client, extractor, options);
    let printer = async {
        while let Some(event) = events.recv().await {
            match &event {
                PublishEvent::BatchFailed { .. } => eprintln!("{}", format_event(&event).red()),
                _ => println!("{}", format_event(&event)),
            }
        }
    };
    let (result, ()) = tokio::join!(publisher.run(records), printer);
    let summary = result?;

    if args.dry_run {
        return Ok(());
    }
    if !summary.is_success() {
        bail!(
            "{} of {} batches failed to publish",
            summary.failed_batches,
            summary.batches
        );
    }
    println!("{}", "All statements published successfully".green());
    Ok(())
}

/// One output line per publish event.
pub fn format_event(event: &PublishEvent) -> String {
    match event {
        PublishEvent::Published {
            statement_id,
            body_hash,
            refs,
        } => format!(
            "statement id: {statement_id} -- body: {body_hash} -- refs: {}",
            json_list(refs)
        ),
        PublishEvent::DryRun { refs, tags } => {
            format!("refs: {}, tags: {}", json_list(refs), json_list(tags))
        }
        PublishEvent::BatchFailed {
            batch: Some(batch),
            error,
        } => format!("Error publishing statements (batch {batch}): {error}"),
        PublishEvent::BatchFailed { batch: None, error } => {
            format!("Error publishing statements: {error}")
        }
    }
}

fn json_list<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    let items: Vec<&String> = items.into_iter().collect();
    serde_json::to_string(&items).unwrap_or_else(|_| format!("{items:?}"))
}

async fn cmd_serve(mut config: NodeConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(addr) = args.push_addr {
        config.push_addr = addr;
    }
    if let Some(addr) = args.http_addr {
        config.http_addr = addr;
    }
    if args.data_dir.is_some() {
        config.data_dir = args.data_dir;
    }
    if !args.allowed_namespaces.is_empty() {
        config.allowed_namespaces = args.allowed_namespaces;
    }

    let node = AlephNode::from_config(config)?;
    println!("{} aleph node {}", "✓".green().bold(), node.public_id().cyan());
    println!("  push: {}", node.config().push_addr.to_string().bold());
    println!("  http: {}", node.config().http_addr.to_string().bold());
    match &node.config().data_dir {
        Some(dir) => println!("  store: {}", dir.display()),
        None => println!("  store: {}", "in-memory".yellow()),
    }
    node.serve().await?;
    Ok(())
}

async fn cmd_get(mut config: NodeConfig, args: GetArgs) -> anyhow::Result<()> {
    if args.data_dir.is_some() {
        config.data_dir = args.data_dir;
    }
    if config.data_dir.is_none() {
        bail!("get needs a store: pass --data-dir or set data_dir in the config file");
    }
    let key = ContentRef::from_b58(&args.key)?;
    let store = Datastore::open(&config.store_options())?;

    if args.raw {
        let bytes = store.get_raw(&key).await?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&bytes)?;
        stdout.flush()?;
        return Ok(());
    }
    match store.get(&key, GetOptions::default()).await? {
        Fetched::Structured(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Fetched::Undecodable(text) => {
            eprintln!("{}", "stored bytes are not JSON, printing base64".yellow());
            println!("{text}");
        }
        Fetched::Raw(bytes) => println!("{}", String::from_utf8_lossy(&bytes)),
    }
    Ok(())
}

async fn cmd_ping(config: NodeConfig, args: PingArgs) -> anyhow::Result<()> {
    let addr = args.addr.unwrap_or_else(|| config.push_addr.to_string());
    let node = AlephNode::from_config(config)?;
    let rtt = node
        .ping(&addr)
        .await
        .with_context(|| format!("no pong from {addr}"))?;
    println!(
        "{} pong from {} in {:.1} ms",
        "✓".green().bold(),
        addr.cyan(),
        rtt.as_secs_f64() * 1000.0
    );
    Ok(())
}

fn cmd_id(config: NodeConfig, args: IdArgs) -> anyhow::Result<()> {
    let key_file = args.key_file.or(config.key_file);
    let key = match (key_file, args.generate) {
        (Some(path), true) => {
            let key = aleph_crypto::PublisherKey::generate();
            write_key(&path, &key)?;
            println!("{} wrote {}", "✓".green().bold(), path.display());
            key
        }
        (Some(path), false) => read_key(&path)?,
        (None, _) => bail!("no key file: pass --key-file or set key_file in the config file"),
    };
    println!("{}", key.public_id());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aleph_crypto::ContentHasher;
    use std::collections::BTreeSet;

    #[test]
    fn published_line_format() {
        let body_hash = ContentHasher::hash(b"hello world");
        let line = format_event(&PublishEvent::Published {
            statement_id: "pub:1:0".into(),
            body_hash,
            refs: vec!["dpla_2e49".into()],
        });
        assert_eq!(
            line,
            "statement id: pub:1:0 -- body: QmaozNR7DZHQK1ZcU9p7QdrshMvXqWK6gpu5rmrkPdT3L4 -- refs: [\"dpla_2e49\"]"
        );
    }

    #[test]
    fn dry_run_line_format() {
        let line = format_event(&PublishEvent::DryRun {
            refs: vec!["a".into()],
            tags: BTreeSet::new(),
        });
        assert_eq!(line, "refs: [\"a\"], tags: []");
    }

    #[test]
    fn failure_line_names_batch() {
        let line = format_event(&PublishEvent::BatchFailed {
            batch: Some(3),
            error: "boom".into(),
        });
        assert!(line.starts_with("Error publishing statements (batch 3)"));

        let line = format_event(&PublishEvent::BatchFailed { batch: None, error: "boom".into() });
        assert_eq!(line, "Error publishing statements: boom");
    }

    // Serve a node with a filesystem store on loopback; returns a config pointing at it.
    async fn running_node(
        store_dir: &std::path::Path,
    ) -> (NodeConfig, Arc<aleph_statement::StatementLog>) {
        let push = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let http = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = NodeConfig {
            push_addr: push.local_addr().unwrap(),
            http_addr: http.local_addr().unwrap(),
            data_dir: Some(store_dir.to_path_buf()),
            ..NodeConfig::default()
        };
        let node = AlephNode::from_config(config.clone()).unwrap();
        let log = node.log();
        tokio::spawn(node.serve_on(push, http));
        (config, log)
    }

    fn publish_args(input: std::path::PathBuf) -> PublishArgs {
        PublishArgs {
            namespace: "scratch.cli".into(),
            filename: Some(input),
            id_selector: "id".into(),
            content_selector: None,
            id_regex: None,
            batch_size: 1,
            dry_run: false,
            peer: None,
        }
    }

    #[tokio::test]
    async fn publish_lands_on_configured_node() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("records.ndjson");
        std::fs::write(&input, "{\"id\": \"a\", \"v\": 1}\n{\"id\": \"b\", \"v\": 2}\n").unwrap();
        let (config, log) = running_node(&dir.path().join("store")).await;

        cmd_publish(config.clone(), publish_args(input)).await.unwrap();

        assert_eq!(log.namespace_len("scratch.cli").unwrap(), 2);
        let store = Datastore::open(&config.store_options()).unwrap();
        assert_eq!(store.len().await.unwrap(), 2);
        let key = ContentHasher::hash_json(&serde_json::json!({"id": "a", "v": 1})).unwrap();
        assert!(store.contains(&key).await.unwrap());
    }

    #[tokio::test]
    async fn publish_without_node_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("records.ndjson");
        std::fs::write(&input, "{\"id\": \"a\"}\n").unwrap();
        let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = NodeConfig {
            push_addr: closed.local_addr().unwrap(),
            ..NodeConfig::default()
        };
        drop(closed);

        let err = cmd_publish(config, publish_args(input)).await.unwrap_err();
        assert!(err.to_string().contains("1 of 1 batches failed"), "{err}");
    }

    #[tokio::test]
    async fn ping_reaches_running_node() {
        let dir = tempfile::tempdir().unwrap();
        let (config, _) = running_node(&dir.path().join("store")).await;
        cmd_ping(config, PingArgs { addr: None }).await.unwrap();
    }

    #[tokio::test]
    async fn bad_selector_fails_before_io() {
        let args = PublishArgs {
            namespace: "scratch.cli".into(),
            filename: Some("/nonexistent/records.ndjson".into()),
            id_selector: "[\"unterminated".into(),
            content_selector: None,
            id_regex: None,
            batch_size: 10,
            dry_run: false,
            peer: None,
        };
        let err = cmd_publish(NodeConfig::default(), args).await.unwrap_err();
        assert!(err.to_string().contains("invalid selector"), "{err}");
    }

    #[test]
    fn id_generate_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.key");
        let generate = IdArgs { key_file: Some(path.clone()), generate: true };
        cmd_id(NodeConfig::default(), generate).unwrap();
        let read = IdArgs { key_file: Some(path), generate: false };
        cmd_id(NodeConfig::default(), read).unwrap();
        assert!(cmd_id(NodeConfig::default(), IdArgs { key_file: None, generate: false }).is_err());
    }
}

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use jimeng_bridge::{
    config::LoggingConfig, logger, BatchUploader, BlobStoreClient, CosConfig, ObjectAcl,
    PipelineConfig, UploadRequest,
};
use serde_json::json;

#[derive(Parser)]
#[command(name = "cos-tool", version, about = "Tencent COS operator tool", author)]
struct Cli {
    /// Use an in-memory bucket instead of COS (fetches still hit the network)
    #[arg(long, global = true)]
    dry_run: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the configured bucket is reachable
    Check,
    List {
        #[arg(long, default_value = "")]
        prefix: String,
        #[arg(long, default_value_t = 100)]
        max_keys: usize,
    },
    /// Fetch and upload images; each item is `label=url` or a bare URL
    Upload {
        #[arg(required = true)]
        items: Vec<String>,
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Upload a local file; the content type follows its extension unless given
    UploadFile {
        path: PathBuf,
        key: String,
        #[arg(long)]
        acl: Option<ObjectAcl>,
        #[arg(long)]
        content_type: Option<String>,
    },
    Delete {
        key: String,
    },
    Presign {
        key: String,
        #[arg(long, default_value_t = 3600)]
        expires: u64,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let lookup = |key: &str| env::var(key).ok();
    let cos_config = CosConfig::from_lookup(lookup)?;
    let mut pipeline_config = PipelineConfig::from_lookup(lookup)?;

    let logging = LoggingConfig::from_lookup(lookup)?;
    logger::init_with_config(
        logger::LoggerConfig::from_settings(&logging).with_prefix("cos-tool"),
    )?;
    logger::log_cos_config(&cos_config, &pipeline_config);

    let store = if cli.dry_run {
        log::info!("🧪 Dry run: objects go to an in-memory bucket");
        BlobStoreClient::in_memory(cos_config)
    } else {
        BlobStoreClient::connect(cos_config).await?
    };

    let ok = match cli.command {
        Command::Check => {
            let reachable = store.test_connection().await;
            print_json(&json!({
                "bucket": store.config().bucket,
                "region": store.config().region,
                "reachable": reachable,
            }));
            reachable
        }
        Command::List { prefix, max_keys } => {
            let objects = store.list_objects(&prefix, max_keys).await;
            print_json(&json!({ "prefix": prefix, "count": objects.len(), "objects": objects }));
            true
        }
        Command::Upload { items, workers } => {
            if let Some(workers) = workers {
                pipeline_config = pipeline_config.with_upload_workers(workers);
            }
            pipeline_config.validate()?;

            let requests = items.iter().map(|item| parse_item(item)).collect();
            let uploader = BatchUploader::new(store, pipeline_config);
            let outcome = uploader.upload_batch(requests).await?;
            print_json(&outcome);
            outcome.failure_count() == 0
        }
        Command::UploadFile {
            path,
            key,
            acl,
            content_type,
        } => match store
            .upload_file(&path, &key, content_type.as_deref(), acl)
            .await
        {
            Ok(url) => {
                print_json(&json!({ "key": key, "url": url }));
                true
            }
            Err(e) => {
                print_json(&json!({ "key": key, "error": e.to_info() }));
                false
            }
        },
        Command::Delete { key } => {
            let deleted = store.delete_object(&key).await;
            print_json(&json!({ "key": key, "deleted": deleted }));
            deleted
        }
        Command::Presign { key, expires } => {
            let url = store.presigned_url(&key, expires).await;
            let ok = !url.is_empty();
            print_json(&json!({ "key": key, "expires_secs": expires, "url": url }));
            ok
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// `label=url` splits on the first `=` unless the whole item is already a URL.
fn parse_item(item: &str) -> UploadRequest {
    if item.starts_with("http://") || item.starts_with("https://") {
        return UploadRequest::new(item, "image");
    }
    match item.split_once('=') {
        Some((label, url)) => UploadRequest::new(url.trim(), label.trim()),
        None => UploadRequest::new(item, "image"),
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => log::error!("❌ Cannot render output: {}", e),
    }
}

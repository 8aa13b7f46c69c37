//! Fetch a release archive, cache it and unpack it.
//!
//! ```text
//! RUST_LOG=dewy=debug cargo run --example deploy -- https://example.com/v1.0.0.zip ./releases
//! ```

use color_eyre::{eyre::eyre, Result};
use dewy::deploy::DeployerBuilder;
use dewy::kvs::{FileBuilder, Kvs};
use dewy::release::Release;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .ok_or_else(|| eyre!("usage: deploy <release-url> [activation-dir]"))?;
    let activation_dir = args.next().map(PathBuf::from).unwrap_or_else(|| "releases".into());

    let store = Arc::new(FileBuilder::new().build()?);
    let deployer = DeployerBuilder::new()
        .store(store.clone())
        .activation_dir(activation_dir)
        .build()?;

    let release = Release::try_from(url.as_str())?;
    let deployment = deployer.deploy(&release).await?;

    println!("Cached releases in {}:", store.root_path().display());
    for key in store.list()? {
        println!("  {}", key);
    }
    println!("Activate {}", deployment.root().display());

    Ok(())
}

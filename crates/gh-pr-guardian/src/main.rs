use anyhow::Context;
use gh_pr_guardian::{logger, Guardian};
use gh_pr_guardian_config::GuardianConfig;

#[tokio::main]
async fn main() {
    // .env may carry RUST_LOG, so load it before the logger
    gh_pr_guardian_config::load_dotenv();
    logger::init();

    if let Err(err) = run().await {
        log::error!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = GuardianConfig::load();

    let client = gh_client::connect(config.host.as_deref())
        .await
        .context("Failed to create GitHub client")?;
    let guardian = Guardian::from_config(client, &config)?;

    log::info!(
        "Starting gh-pr-guardian for {}{}",
        guardian.repository(),
        if config.dry_run { " (dry run)" } else { "" }
    );

    let summary = guardian.run().await?;
    log::info!("{}", summary);

    Ok(())
}

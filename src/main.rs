use anyhow::Context;
use verdict_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load Verdict settings")?;
    verdict_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "verdict starting"
    );

    verdict::app::run(&settings).await
}

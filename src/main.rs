use campaign_desk::configuration::Settings;
use campaign_desk::startup::Application;
use campaign_desk::telemetry::config_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::get_configuration().expect("Failed to read configuration");

    config_tracing(&settings.application);

    let app = Application::build(settings).await?;
    tracing::info!(port = app.port(), "Listening");
    app.run_until_terminated().await?;
    Ok(())
}

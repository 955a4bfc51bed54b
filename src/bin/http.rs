#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use day_planner::{PlannerConfig, TaskService, http_api};
    use tracing_subscriber::EnvFilter;

    let config = PlannerConfig::load()?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::info!(?config, "configuration loaded");

    let addr = config.socket_addr()?;
    let service = TaskService::open(config.clock()?, config.database_path.as_deref())?;
    http_api::serve(addr, service).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}

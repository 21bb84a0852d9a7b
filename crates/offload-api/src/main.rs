use offload_api::setup;
use offload_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    setup::init_tracing();

    let config = Config::from_env()?;

    let (_state, router) = setup::initialize_app(&config).await?;

    setup::server::start_server(&config, router).await?;

    Ok(())
}

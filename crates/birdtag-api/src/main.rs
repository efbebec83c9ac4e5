use birdtag_core::Config;

// Use mimalloc as the global allocator for lower fragmentation under musl-based containers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // Database, storage, collaborators, background tasks and routes
    let app = birdtag_api::setup::initialize_app(config.clone()).await?;

    birdtag_api::setup::server::start_server(&config, app.router).await?;

    app.background.shutdown();

    Ok(())
}

use faillog::App;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    App::new().run().await
}

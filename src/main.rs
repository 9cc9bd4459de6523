#[tokio::main]
async fn main() -> anyhow::Result<()> {
    finchat::run().await
}

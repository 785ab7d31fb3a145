//! terraverify server binary

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    terraverify::server::run().await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    focusguard_lib::run().await
}

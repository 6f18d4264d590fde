#[tokio::main]
async fn main() -> std::io::Result<()> {
    telemetry_server::run_with_config().await
}

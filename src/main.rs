#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    atelier_chat::run().await
}

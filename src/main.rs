#[tokio::main]
async fn main() {
    engagement::start_server().await;
}

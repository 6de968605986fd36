use std::sync::Arc;

use petcare_client::{ApiClient, ClientConfig, InMemorySession, TokenPair};
use reqwest::Method;

#[derive(serde::Deserialize, Debug)]
struct Pet {
    id: String,
    name: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional: enable basic logging for the example
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    // Load configuration from a JSON file placed next to the binary
    let cfg = ClientConfig::from_file("config.json")?;
    let session = Arc::new(InMemorySession::new(TokenPair::new(
        "ACCESS_TOKEN",
        "REFRESH_TOKEN",
    )));
    let client = ApiClient::new(cfg, session.clone())?;

    let request = client.request(Method::GET, "/pets");
    let pets: Vec<Pet> = client.execute(&request).await?;
    for pet in &pets {
        println!("{} ({})", pet.name, pet.id);
    }

    let delete = client.request(Method::DELETE, "/pets/42");
    client.execute_no_content(&delete).await?;
    println!("session: {:?}", session.state());
    Ok(())
}

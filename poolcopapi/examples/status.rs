//! Prints the status of the PoolCop registered for an API key.
//!
//! ```bash
//! POOLCOPILOT_API_KEY=... cargo run --example status
//! ```

#[tokio::main]
async fn main() -> poolcopapi::Result<()> {
    let api_key = std::env::var("POOLCOPILOT_API_KEY")
        .expect("Expected POOLCOPILOT_API_KEY to be set");

    let mut client = poolcopapi::PoolCopilot::new(api_key)?;
    let session = client.open()?;
    let status = session.status().await?;
    println!("{status:#}");

    if let Some(id) = session.poolcop_id().await {
        println!("poolcop id: {id}");
    }
    Ok(())
}

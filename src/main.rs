use stress_test::{stress_test_editing, stress_test_scaling, HarnessResult, StressConfig};
use tracing_subscriber::EnvFilter;
pub mod stress_test;

#[tokio::main]
async fn main() -> HarnessResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Run async stress tests
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            ASYNC STRESS TESTS                               ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    // Test 1: few clients, short session
    let stats = stress_test_editing(StressConfig::default()).await?;
    stats.print();
    stats.ensure_converged()?;

    // Test 2: more clients, rarely syncing while they type
    let stats = stress_test_editing(StressConfig {
        num_clients: 10,
        edits_per_client: 300,
        num_steps: 1000,
        sync_probability: 0.05,
        seed: 7,
        ..StressConfig::default()
    })
    .await?;
    stats.print();
    stats.ensure_converged()?;

    // Test 3: empty starting document
    let stats = stress_test_editing(StressConfig {
        initial_document: String::new(),
        seed: 1234,
        ..StressConfig::default()
    })
    .await?;
    stats.print();
    stats.ensure_converged()?;

    // Test 4: Scaling analysis
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║          SCALING ANALYSIS (Editing)                        ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    stress_test_scaling(12, 4).await?;

    println!("\n✓ All stress tests completed successfully!");
    Ok(())
}

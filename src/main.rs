use hub::{run_simulation, HubConfigBuilder, HubError};
use tracing_subscriber::EnvFilter;
pub mod hub;

fn main() -> Result<(), HubError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async_main())
}

async fn async_main() -> Result<(), HubError> {
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            HUB CONVERGENCE RUNS                            ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let runs = [
        // Custom clocks only
        HubConfigBuilder::new()
            .replicas(4)
            .writes_per_replica(100)
            .custom_clock_ratio(1.0)
            .build(),
        // Mixed clocks; the hub's wall clock dominates
        HubConfigBuilder::new()
            .replicas(4)
            .writes_per_replica(100)
            .custom_clock_ratio(0.5)
            .build(),
        // More replicas contending through a narrow channel
        HubConfigBuilder::new()
            .replicas(16)
            .writes_per_replica(500)
            .channel_capacity(8)
            .build(),
    ];

    let mut all_converged = true;
    for config in runs {
        let report = run_simulation(config).await?;
        report.print();
        all_converged &= report.converged;
    }

    if all_converged {
        println!("\n✓ All replicas converged in every run");
    } else {
        println!("\n✗ Some replicas diverged");
    }
    Ok(())
}

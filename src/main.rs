mod cli;

use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands, log_level};
use store::{MemoryStore, ProvisionMode, Provisioner, RetryingClient, StoreClient};
use tokio_util::sync::CancellationToken;
use workload::{RunSummary, StressConfig, WorkloadError, WorkloadOrchestrator};

fn orchestrator(
    store: &Arc<MemoryStore>,
    client: &Arc<dyn StoreClient>,
    mode: ProvisionMode,
    config: StressConfig,
    cancel: &CancellationToken,
) -> WorkloadOrchestrator {
    let provisioner = Provisioner::new(store.clone()).mode(mode);
    WorkloadOrchestrator::new(client.clone(), Arc::new(provisioner), config)
        .with_cancellation(cancel.clone())
}

async fn handle_run(
    cli: &Cli,
    store: Arc<MemoryStore>,
    client: Arc<dyn StoreClient>,
    cancel: CancellationToken,
) -> Result<Vec<RunSummary>, WorkloadError> {
    let mut summaries = Vec::new();
    match cli.command {
        Commands::Run {
            iterations,
            concurrency,
            id_space,
            report_every,
            provision,
            preload,
        } => {
            let config = StressConfig::builder()
                .table(cli.store.table.clone())
                .id_space_max(id_space)
                .reporting_interval_ops(report_every)
                .seed(cli.seed)
                .build()?;

            // the preload owns the fresh table; the mix must not drop it again
            let mode = match preload {
                Some(items) => {
                    let mut loader = orchestrator(
                        &store,
                        &client,
                        ProvisionMode::Recreate,
                        config.clone(),
                        &cancel,
                    );
                    summaries.push(loader.load(items, concurrency).await?);
                    ProvisionMode::CreateIfAbsent
                }
                None => provision,
            };
            if !cancel.is_cancelled() {
                let mut runner = orchestrator(&store, &client, mode, config, &cancel);
                summaries.push(runner.run(iterations, concurrency).await?);
            }
        }
        Commands::Load {
            items,
            concurrency,
            report_every,
        } => {
            let config = StressConfig::builder()
                .table(cli.store.table.clone())
                .reporting_interval_ops(report_every)
                .build()?;
            let mut loader =
                orchestrator(&store, &client, ProvisionMode::Recreate, config, &cancel);
            summaries.push(loader.load(items, concurrency).await?);
        }
    }
    Ok(summaries)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(log_level(cli.verbose))
        .init();

    let concurrency = cli.command.concurrency();
    if cli.store.max_connections < concurrency {
        tracing::warn!(
            "{} connections for {} workers; requests will queue on the pool",
            cli.store.max_connections,
            concurrency
        );
    }

    let store = Arc::new(cli.store.memory_store());
    let client: Arc<dyn StoreClient> = Arc::new(RetryingClient::new(
        store.clone(),
        cli.store.retry_policy(),
    ));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, letting in-flight iterations finish");
            on_signal.cancel();
        }
    });

    for summary in handle_run(&cli, store, client, cancel).await? {
        println!("{}", summary);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(cli: &Cli) -> (Arc<MemoryStore>, Arc<dyn StoreClient>) {
        let store = Arc::new(cli.store.memory_store());
        let client: Arc<dyn StoreClient> = Arc::new(RetryingClient::new(
            store.clone(),
            cli.store.retry_policy(),
        ));
        (store, client)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_preload_keeps_table_for_mix() -> Result<(), WorkloadError> {
        let cli = Cli::parse_from([
            "stampede",
            "run",
            "--iterations",
            "10",
            "--concurrency",
            "4",
            "--preload",
            "100",
            "--seed",
            "5",
        ]);
        let (store, client) = wire(&cli);

        let summaries = handle_run(&cli, store.clone(), client, CancellationToken::new()).await?;

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].scenario, "load");
        assert_eq!(summaries[0].total_operations, 100);
        assert_eq!(summaries[1].scenario, "mixed");
        assert_eq!(summaries[1].total_operations, 40);
        // a recreated table would hold only the mix's own 20 writes
        assert!(store.item_count("test_table").is_some_and(|n| n >= 90));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_command_writes_every_item() -> Result<(), WorkloadError> {
        let cli = Cli::parse_from(["stampede", "load", "--items", "25", "--concurrency", "3"]);
        let (store, client) = wire(&cli);

        let summaries = handle_run(&cli, store.clone(), client, CancellationToken::new()).await?;

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].error_counts.total(), 0);
        assert_eq!(store.item_count("test_table"), Some(25));
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_before_start_skips_the_run() -> Result<(), WorkloadError> {
        let cli = Cli::parse_from(["stampede", "run", "--iterations", "10", "--concurrency", "2"]);
        let (store, client) = wire(&cli);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summaries = handle_run(&cli, store.clone(), client, cancel).await?;

        assert!(summaries.is_empty());
        assert_eq!(store.item_count("test_table"), None);
        Ok(())
    }
}

use newrelic_collector_gateway::cli::{Cli, CliCommand};
use newrelic_collector_gateway::config::GatewayConfig;
use newrelic_collector_gateway::configurer::ConfigurerRegistry;
use newrelic_collector_gateway::gateway::{controller, GatewaySync};
use newrelic_collector_gateway::k8s::client::{try_new_client, KubeGatewayCluster};
use std::error::Error;
use std::process::exit;
use std::sync::Arc;
use tracing::{error, info};

fn main() {
    let config = match Cli::init() {
        Ok(CliCommand::Run(config)) => config,
        // One-shot operations print their output and exit.
        Ok(CliCommand::OneShot(op)) => match op.run_one_shot() {
            Ok(output) => {
                print!("{output}");
                exit(0);
            }
            Err(err) => {
                eprintln!("{err}");
                exit(1);
            }
        },
        Err(err) => {
            eprintln!("Error parsing CLI arguments: {err}");
            exit(1);
        }
    };

    if let Err(e) = _main(config) {
        error!("The collector gateway exited with an error: {e}");
        exit(1);
    }
}

// Split from main so errors are logged once, in display format.
fn _main(config: GatewayConfig) -> Result<(), Box<dyn Error>> {
    config.log.try_init()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let client = try_new_client(&config.k8s).await?;
        let cluster = KubeGatewayCluster::new(client.clone(), &config.namespace, &config.settings_name);
        let sync = GatewaySync::new(
            cluster,
            Arc::new(ConfigurerRegistry::default()),
            &config.namespace,
            config.gateway.clone(),
        );
        controller::run(client, &config.namespace, sync, config.requeue).await;
        Ok::<(), Box<dyn Error>>(())
    })?;

    info!("exiting gracefully");
    Ok(())
}

use crate::InstanceCommands;
use colored::Colorize;
use lbsync_core::Cloud;

pub async fn handle(cloud: &Cloud, command: InstanceCommands) -> anyhow::Result<()> {
    match command {
        InstanceCommands::Exists { provider_id } => {
            let exists = cloud.instance_exists_by_provider_id(&provider_id).await?;
            println!("{}", yes_no(exists));
        }
        InstanceCommands::Shutdown { provider_id } => {
            let shutdown = cloud.instance_shutdown_by_provider_id(&provider_id).await?;
            println!("{}", yes_no(shutdown));
        }
        InstanceCommands::Addresses { provider_id } => {
            let addresses = cloud.node_addresses_by_provider_id(&provider_id).await?;
            println!("{}", serde_json::to_string_pretty(&addresses)?);
        }
    }
    Ok(())
}

fn yes_no(value: bool) -> colored::ColoredString {
    if value { "yes".green() } else { "no".red() }
}

use crate::RouteCommands;
use colored::Colorize;
use lbsync_core::{Cloud, Route};

pub async fn handle(cloud: &Cloud, command: RouteCommands) -> anyhow::Result<()> {
    match command {
        RouteCommands::List => {
            let routes = cloud.list_routes().await?;
            println!(
                "{}",
                format!("Routes in {} ({}):", cloud.config().route_table, routes.len()).bold()
            );
            for route in &routes {
                println!("  • {} → {}", route.destination_cidr.cyan(), route.target_node);
            }
        }
        RouteCommands::Create { node, cidr } => {
            cloud.create_route(&route(node, cidr)).await?;
            println!("{}", "✓ route created".green());
        }
        RouteCommands::Delete { node, cidr } => {
            cloud.delete_route(&route(node, cidr)).await?;
            println!("{}", "✓ route deleted".green());
        }
    }
    Ok(())
}

fn route(node: String, cidr: String) -> Route {
    Route {
        name: node.clone(),
        target_node: node,
        destination_cidr: cidr,
    }
}

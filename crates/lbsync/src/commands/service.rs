use crate::input;
use colored::Colorize;
use lbsync_core::{Cloud, LoadBalancerStatus};
use std::path::Path;

pub async fn ensure(cloud: &Cloud, service: &Path, nodes: &Path) -> anyhow::Result<()> {
    let service = input::read_service(service)?;
    let nodes = input::read_nodes(nodes)?;

    println!(
        "{} {} ({})",
        "Ensuring load balancer for".yellow(),
        service.to_string().cyan(),
        cloud.load_balancer_name(&service)
    );
    let status = cloud.ensure_load_balancer(&service, &nodes).await?;

    println!("{}", "✓ load balancer converged".green());
    print_status(&status);
    Ok(())
}

pub async fn update(cloud: &Cloud, service: &Path, nodes: &Path) -> anyhow::Result<()> {
    let service = input::read_service(service)?;
    let nodes = input::read_nodes(nodes)?;

    println!(
        "{} {}",
        "Updating backends for".yellow(),
        service.to_string().cyan()
    );
    cloud.update_load_balancer(&service, &nodes).await?;

    println!("{}", "✓ backends converged".green());
    Ok(())
}

pub async fn get(cloud: &Cloud, service: &Path) -> anyhow::Result<()> {
    let service = input::read_service(service)?;

    match cloud.get_load_balancer(&service).await? {
        Some(status) => {
            println!("{} {}", service.to_string().cyan(), cloud.load_balancer_name(&service));
            print_status(&status);
        }
        None => {
            println!("{} has no load balancer", service.to_string().cyan());
        }
    }
    Ok(())
}

pub async fn delete(cloud: &Cloud, service: &Path) -> anyhow::Result<()> {
    let service = input::read_service(service)?;

    println!(
        "{} {}",
        "Deleting load balancer for".yellow(),
        service.to_string().cyan()
    );
    cloud.ensure_load_balancer_deleted(&service).await?;

    println!("{}", "✓ deleted".green());
    Ok(())
}

fn print_status(status: &LoadBalancerStatus) {
    if status.ingress.is_empty() {
        println!("  (no ingress address yet)");
    }
    for ingress in &status.ingress {
        println!("  • {}", ingress.ip.bold());
    }
}

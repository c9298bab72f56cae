//! Backend target convergence

mod common;

use common::*;
use lbsync_cloud::{CloudError, LoadBalancerKind, Target};
use std::time::Duration;

#[tokio::test]
async fn test_instance_queries_are_chunked_by_five() {
    let fake = FakeCloud::new();
    let nodes = nodes_for(&seed_instances(&fake, 12));
    let cloud = cloud(&fake);

    cloud
        .ensure_load_balancer(&service(vec![port("http", 80, 30080)]), &nodes)
        .await
        .unwrap();

    let chunks: Vec<usize> = fake
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::DescribeInstancesByIps(ips) => Some(ips.len()),
            _ => None,
        })
        .collect();
    assert_eq!(chunks, vec![5, 5, 2]);
}

#[tokio::test]
async fn test_registration_is_batched_by_twenty() {
    let fake = FakeCloud::new();
    let nodes = nodes_for(&seed_instances(&fake, 45));
    let cloud = cloud(&fake);

    cloud
        .ensure_load_balancer(&service(vec![port("http", 80, 30080)]), &nodes)
        .await
        .unwrap();

    let batches: Vec<usize> = fake
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::RegisterTargets(_, targets) => Some(targets.len()),
            _ => None,
        })
        .collect();
    assert_eq!(batches, vec![20, 20, 5]);
    assert_eq!(fake.count(|c| matches!(c, Call::DescribeInstancesByIps(_))), 9);

    let lb = &fake.load_balancers()[0];
    assert_eq!(fake.targets_of(&lb.id, 80, "TCP").len(), 45);
}

#[tokio::test]
async fn test_deregistration_is_batched_by_twenty() {
    let fake = FakeCloud::new();
    let nodes = nodes_for(&seed_instances(&fake, 45));
    let cloud = cloud(&fake);
    cloud
        .ensure_load_balancer(&service(vec![port("http", 80, 30080)]), &nodes)
        .await
        .unwrap();
    fake.clear_calls();

    cloud
        .update_load_balancer(&service(vec![port("http", 80, 30081)]), &nodes)
        .await
        .unwrap();

    let batches = |deregister: bool| -> Vec<usize> {
        fake.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::DeregisterTargets(_, targets) if deregister => Some(targets.len()),
                Call::RegisterTargets(_, targets) if !deregister => Some(targets.len()),
                _ => None,
            })
            .collect()
    };
    assert_eq!(batches(true), vec![20, 20, 5]);
    assert_eq!(batches(false), vec![20, 20, 5]);

    // every deregistration is issued before the first registration
    let calls = fake.calls();
    let last_deregister = calls
        .iter()
        .rposition(|c| matches!(c, Call::DeregisterTargets(..)))
        .unwrap();
    let first_register = calls
        .iter()
        .position(|c| matches!(c, Call::RegisterTargets(..)))
        .unwrap();
    assert!(last_deregister < first_register);

    let lb = &fake.load_balancers()[0];
    let targets = fake.targets_of(&lb.id, 80, "TCP");
    assert_eq!(targets.len(), 45);
    assert!(targets.iter().all(|t| t.port == 30081));
}

#[tokio::test]
async fn test_every_port_gets_its_node_port_targets() {
    let fake = FakeCloud::new();
    let nodes = nodes_for(&seed_instances(&fake, 2));
    let cloud = cloud(&fake);
    let service = service(vec![port("http", 80, 30080), port("https", 443, 30443)]);

    cloud.ensure_load_balancer(&service, &nodes).await.unwrap();

    let lb = &fake.load_balancers()[0];
    assert_eq!(
        fake.targets_of(&lb.id, 443, "TCP"),
        vec![Target::new("ins-1", 30443), Target::new("ins-2", 30443)]
    );
    assert_eq!(
        fake.targets_of(&lb.id, 80, "TCP"),
        vec![Target::new("ins-1", 30080), Target::new("ins-2", 30080)]
    );
}

#[tokio::test]
async fn test_instances_outside_the_vpc_are_never_targets() {
    let fake = FakeCloud::new();
    fake.add_instance(instance("ins-1", "10.0.0.1"));
    fake.add_instance(instance_in("ins-foreign", "10.0.0.2", "vpc-other"));
    let cloud = cloud(&fake);

    cloud
        .ensure_load_balancer(
            &service(vec![port("http", 80, 30080)]),
            &[node("10.0.0.1"), node("10.0.0.2")],
        )
        .await
        .unwrap();

    let lb = &fake.load_balancers()[0];
    assert_eq!(
        fake.targets_of(&lb.id, 80, "TCP"),
        vec![Target::new("ins-1", 30080)]
    );
}

#[tokio::test]
async fn test_only_selected_nodes_become_targets() {
    let fake = FakeCloud::new();
    let instances = seed_instances(&fake, 2);
    let cloud = cloud(&fake);
    let mut master = node(&instances[1].private_ips[0]);
    master.labels.clear();

    cloud
        .ensure_load_balancer(
            &service(vec![port("http", 80, 30080)]),
            &[node(&instances[0].private_ips[0]), master],
        )
        .await
        .unwrap();

    let lb = &fake.load_balancers()[0];
    assert_eq!(
        fake.targets_of(&lb.id, 80, "TCP"),
        vec![Target::new("ins-1", 30080)]
    );
}

#[tokio::test]
async fn test_custom_node_selector_from_annotations() {
    let fake = FakeCloud::new();
    let instances = seed_instances(&fake, 2);
    let cloud = cloud(&fake);
    let mut service = service(vec![port("http", 80, 30080)]);
    service.annotations.insert(
        lbsync_core::options::ANNOTATION_NODE_LABEL_KEY.to_string(),
        "pool".to_string(),
    );
    service.annotations.insert(
        lbsync_core::options::ANNOTATION_NODE_LABEL_VALUE.to_string(),
        "edge".to_string(),
    );
    let mut edge = node(&instances[1].private_ips[0]);
    edge.labels.insert("pool".into(), "edge".into());

    cloud
        .ensure_load_balancer(&service, &[node(&instances[0].private_ips[0]), edge])
        .await
        .unwrap();

    let lb = &fake.load_balancers()[0];
    assert_eq!(
        fake.targets_of(&lb.id, 80, "TCP"),
        vec![Target::new("ins-2", 30080)]
    );
}

#[tokio::test]
async fn test_no_matching_nodes_is_a_validation_error() {
    let fake = FakeCloud::new();
    let cloud = cloud(&fake);
    let mut unlabeled = node("10.0.0.1");
    unlabeled.labels.clear();

    let err = cloud
        .ensure_load_balancer(&service(vec![port("http", 80, 30080)]), &[unlabeled])
        .await
        .unwrap_err();

    assert!(matches!(err, CloudError::Validation(_)));
    assert_eq!(fake.count(|c| matches!(c, Call::DescribeInstancesByIps(_))), 0);
}

#[tokio::test]
async fn test_update_deregisters_removed_nodes() {
    let fake = FakeCloud::new();
    let nodes = nodes_for(&seed_instances(&fake, 3));
    let cloud = cloud(&fake);
    let service = service(vec![port("http", 80, 30080)]);
    cloud.ensure_load_balancer(&service, &nodes).await.unwrap();
    fake.clear_calls();

    cloud
        .update_load_balancer(&service, &nodes[..2])
        .await
        .unwrap();

    let lb = &fake.load_balancers()[0];
    assert_eq!(fake.count(|c| matches!(c, Call::RegisterTargets(..))), 0);
    let removed: Vec<Vec<Target>> = fake
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::DeregisterTargets(_, targets) => Some(targets),
            _ => None,
        })
        .collect();
    assert_eq!(removed, vec![vec![Target::new("ins-3", 30080)]]);
    assert_eq!(
        fake.targets_of(&lb.id, 80, "TCP"),
        vec![Target::new("ins-1", 30080), Target::new("ins-2", 30080)]
    );
}

#[tokio::test]
async fn test_node_port_change_replaces_targets() {
    let fake = FakeCloud::new();
    let nodes = nodes_for(&seed_instances(&fake, 1));
    let cloud = cloud(&fake);
    cloud
        .ensure_load_balancer(&service(vec![port("http", 80, 30080)]), &nodes)
        .await
        .unwrap();

    cloud
        .update_load_balancer(&service(vec![port("http", 80, 30081)]), &nodes)
        .await
        .unwrap();

    let lb = &fake.load_balancers()[0];
    assert_eq!(
        fake.targets_of(&lb.id, 80, "TCP"),
        vec![Target::new("ins-1", 30081)]
    );
}

#[tokio::test]
async fn test_update_without_listener_for_port_fails() {
    let fake = FakeCloud::new();
    let nodes = nodes_for(&seed_instances(&fake, 1));
    fake.add_load_balancer(LoadBalancerKind::Private, VPC_ID, Some("subnet-1"), SERVICE_UID);
    let cloud = cloud(&fake);

    let err = cloud
        .update_load_balancer(&service(vec![port("http", 80, 30080)]), &nodes)
        .await
        .unwrap_err();

    assert!(matches!(err, CloudError::Validation(_)));
    assert!(fake.mutations().is_empty());
}

#[tokio::test]
async fn test_failing_instance_chunk_aborts_the_pass() {
    let fake = FakeCloud::new();
    let nodes = nodes_for(&seed_instances(&fake, 12));
    fake.fail_instance_chunk(1);
    let cloud = cloud(&fake);

    let err = cloud
        .ensure_load_balancer(&service(vec![port("http", 80, 30080)]), &nodes)
        .await
        .unwrap_err();

    assert!(matches!(err, CloudError::Transport(_)));
    assert_eq!(fake.count(|c| matches!(c, Call::RegisterTargets(..))), 0);
}

#[tokio::test(start_paused = true)]
async fn test_instance_lookups_are_served_from_cache_until_expiry() {
    let fake = FakeCloud::new();
    let nodes = nodes_for(&seed_instances(&fake, 3));
    let cloud = cloud(&fake);
    let service = service(vec![port("http", 80, 30080)]);
    cloud.ensure_load_balancer(&service, &nodes).await.unwrap();
    fake.clear_calls();

    cloud.update_load_balancer(&service, &nodes).await.unwrap();
    assert_eq!(fake.count(|c| matches!(c, Call::DescribeInstancesByIps(_))), 0);
    assert_eq!(fake.count(|c| matches!(c, Call::DescribeLoadBalancers(_))), 0);

    tokio::time::advance(Duration::from_secs(61)).await;
    cloud.update_load_balancer(&service, &nodes).await.unwrap();
    assert_eq!(fake.count(|c| matches!(c, Call::DescribeInstancesByIps(_))), 1);
    assert_eq!(fake.count(|c| matches!(c, Call::DescribeLoadBalancers(_))), 1);
}

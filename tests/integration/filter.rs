//! Server list filtering against registry checks and gossip liveness

use vigil::discovery::{Check, CheckStatus, Member, MemberStatus};
use vigil::health::{HealthLevel, ServerListFilter};

use crate::{candidate, filter_for, instance_check, instance_ids, registry_with_alive_nodes};

#[tokio::test]
async fn test_green_tier_wins_over_warn() {
    let registry = registry_with_alive_nodes(&["node-1", "node-2", "node-3"]);
    registry.put_check(instance_check("node-1", "orders-1", CheckStatus::Passing));
    registry.put_check(instance_check("node-2", "orders-2", CheckStatus::Warning));
    registry.put_check(instance_check("node-3", "orders-3", CheckStatus::Passing));

    let selected = filter_for(&registry)
        .select_healthy_servers(vec![
            candidate("node-1", "orders-1"),
            candidate("node-2", "orders-2"),
            candidate("node-3", "orders-3"),
        ])
        .await
        .unwrap();

    assert_eq!(instance_ids(&selected), vec!["orders-1", "orders-3"]);
}

#[tokio::test]
async fn test_all_failed_selects_nothing() {
    let registry = registry_with_alive_nodes(&["node-1", "node-2"]);
    registry.put_check(instance_check("node-1", "orders-1", CheckStatus::Critical));
    registry.put_check(Check::node("node-2", "serfHealth", CheckStatus::Critical));
    registry.put_check(instance_check("node-2", "orders-2", CheckStatus::Passing));

    let selected = filter_for(&registry)
        .select_healthy_servers(vec![candidate("node-1", "orders-1"), candidate("node-2", "orders-2")])
        .await
        .unwrap();

    assert!(selected.is_empty());
}

#[tokio::test]
async fn test_instances_without_checks_beat_unknown_ones() {
    let registry = registry_with_alive_nodes(&["node-1", "node-2"]);
    registry.put_check(instance_check("node-1", "orders-1", CheckStatus::Unknown));

    let selected = filter_for(&registry)
        .select_healthy_servers(vec![candidate("node-1", "orders-1"), candidate("node-2", "orders-2")])
        .await
        .unwrap();

    assert_eq!(instance_ids(&selected), vec!["orders-2"]);
}

/// A node missing from the gossip pool is not penalized: its checks are
/// simply not consulted, so its instances rank as if the node had no check.
#[tokio::test]
async fn test_dead_node_ranks_no_check_defined() {
    let registry = registry_with_alive_nodes(&["node-1"]);
    registry.put_member(Member::new("node-2", "10.0.0.2", MemberStatus::Failed));
    registry.put_check(Check::node("node-2", "serfHealth", CheckStatus::Critical));
    registry.put_check(instance_check("node-1", "orders-1", CheckStatus::Unknown));

    let filter = filter_for(&registry);
    let candidates = vec![candidate("node-1", "orders-1"), candidate("node-2", "orders-2")];

    let ranked = filter.rank(candidates.clone()).await.unwrap();
    assert_eq!(ranked[0].level, HealthLevel::Undetermined);
    assert_eq!(ranked[1].level, HealthLevel::NoCheckDefined);

    let selected = filter.select_healthy_servers(candidates).await.unwrap();
    assert_eq!(instance_ids(&selected), vec!["orders-2"]);
}

#[tokio::test]
async fn test_failure_is_not_an_empty_selection() {
    let registry = registry_with_alive_nodes(&["node-1"]);
    registry.put_check(instance_check("node-1", "orders-1", CheckStatus::Passing));
    let filter = filter_for(&registry);

    registry.fail_reads(true);
    let err = filter
        .select_healthy_servers(vec![candidate("node-1", "orders-1")])
        .await
        .unwrap_err();
    assert!(err.is_transient());

    registry.fail_reads(false);
    let selected = filter
        .select_healthy_servers(vec![candidate("node-1", "orders-1")])
        .await
        .unwrap();
    assert_eq!(instance_ids(&selected), vec!["orders-1"]);
}

#[tokio::test]
async fn test_filter_through_trait_object() {
    let registry = registry_with_alive_nodes(&["node-1", "node-2"]);
    registry.put_check(Check::node("node-1", "mem", CheckStatus::Warning));
    registry.put_check(instance_check("node-1", "orders-1", CheckStatus::Passing));
    registry.put_check(instance_check("node-2", "orders-2", CheckStatus::Passing));

    let stage: Box<dyn ServerListFilter> = Box::new(filter_for(&registry));
    let selected = stage
        .filter(vec![candidate("node-1", "orders-1"), candidate("node-2", "orders-2")])
        .await
        .unwrap();

    assert_eq!(instance_ids(&selected), vec!["orders-2"]);
    assert_eq!(selected[0].addr(), "node-2.local:8080");
}

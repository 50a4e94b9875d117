//! Add-network flow against in-memory backends

mod common;

use common::{backends, gke_cluster, sql_instance, FakeCloud};
use std::sync::Arc;
use std::time::Duration;
use tanc::error::AncError;
use tanc::gcp::operations::OperationStatus;
use tanc::resource::{add_network, fetch_detail, AuthorizedNetwork, CloudResource, MutationOptions};
use tokio_test::{assert_err, assert_ok};

fn fast() -> MutationOptions {
    MutationOptions {
        poll_interval: Duration::from_millis(10),
        deadline: Duration::from_secs(2),
    }
}

fn db(project: &str, name: &str, public: bool) -> CloudResource {
    CloudResource::DatabaseInstance(sql_instance(project, name, public))
}

#[tokio::test(start_paused = true)]
async fn test_office_then_duplicate_under_new_name() {
    let cloud = Arc::new(
        FakeCloud::new()
            .with_instance(sql_instance("p1", "db1", true))
            .script(vec![OperationStatus::Running, OperationStatus::Done]),
    );
    let backends = backends(cloud.clone(), &["p1"]);
    let resource = db("p1", "db1", true);

    let outcome = assert_ok!(
        add_network(&backends, fast(), &resource, "office", "203.0.113.5").await
    );
    assert_eq!(outcome.message, "Successfully added network office");
    assert_eq!(outcome.network.cidr_value, "203.0.113.5/32");

    let stored = cloud.instance("p1", "db1").unwrap();
    assert_eq!(
        stored.authorized_networks,
        vec![AuthorizedNetwork::new("office", "203.0.113.5/32")]
    );

    let calls_before = cloud.calls();
    let err = assert_err!(
        add_network(&backends, fast(), &resource, "office2", "203.0.113.5/32").await
    );
    assert_eq!(
        err.to_string(),
        "network 203.0.113.5/32 already exists with name office"
    );
    // Only the detail re-read happened, nothing was submitted
    assert_eq!(cloud.calls(), calls_before + 1);
}

#[tokio::test]
async fn test_duplicate_under_same_name() {
    let mut instance = sql_instance("p1", "db1", true);
    instance
        .authorized_networks
        .push(AuthorizedNetwork::new("office", "203.0.113.5"));
    let cloud = Arc::new(FakeCloud::new().with_instance(instance));
    let backends = backends(cloud, &["p1"]);

    let err = add_network(
        &backends,
        fast(),
        &db("p1", "db1", true),
        "office",
        "203.0.113.5",
    )
    .await
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "network 203.0.113.5/32 with name office already exists"
    );
}

#[tokio::test]
async fn test_private_instance_makes_no_calls() {
    let cloud = Arc::new(FakeCloud::new().with_instance(sql_instance("p1", "db1", false)));
    let backends = backends(cloud.clone(), &["p1"]);

    let err = add_network(
        &backends,
        fast(),
        &db("p1", "db1", false),
        "office",
        "203.0.113.5",
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AncError::CannotMutate(_)));
    assert_eq!(cloud.calls(), 0);
}

#[tokio::test]
async fn test_stale_public_copy_rechecked_against_backend() {
    let cloud = Arc::new(FakeCloud::new().with_instance(sql_instance("p1", "db1", false)));
    let backends = backends(cloud.clone(), &["p1"]);

    let err = add_network(
        &backends,
        fast(),
        &db("p1", "db1", true),
        "office",
        "203.0.113.5",
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AncError::CannotMutate(_)));
    assert_eq!(cloud.calls(), 1);
}

#[tokio::test]
async fn test_blank_input_rejected() {
    let cloud = Arc::new(FakeCloud::new().with_instance(sql_instance("p1", "db1", true)));
    let backends = backends(cloud.clone(), &["p1"]);
    let resource = db("p1", "db1", true);

    let err = add_network(&backends, fast(), &resource, "  ", "10.0.0.1")
        .await
        .unwrap_err();
    assert!(matches!(err, AncError::InvalidInput(_)));

    let err = add_network(&backends, fast(), &resource, "office", "")
        .await
        .unwrap_err();
    assert!(matches!(err, AncError::InvalidInput(_)));

    assert_eq!(cloud.calls(), 0);
}

#[tokio::test]
async fn test_missing_instance_is_not_found() {
    let cloud = Arc::new(FakeCloud::new());
    let backends = backends(cloud, &["p1"]);

    let err = add_network(
        &backends,
        fast(),
        &db("p1", "gone", true),
        "office",
        "203.0.113.5",
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AncError::NotFound { ref name, .. } if name == "gone"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_operation_surfaces_message() {
    let cloud = Arc::new(
        FakeCloud::new()
            .with_instance(sql_instance("p1", "db1", true))
            .script(vec![OperationStatus::Failed(
                "Invalid CIDR range".to_string(),
            )]),
    );
    let backends = backends(cloud.clone(), &["p1"]);

    let err = add_network(
        &backends,
        fast(),
        &db("p1", "db1", true),
        "office",
        "203.0.113.5",
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AncError::OperationFailed(ref m) if m == "Invalid CIDR range"));
    assert!(cloud
        .instance("p1", "db1")
        .unwrap()
        .authorized_networks
        .is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_operation_never_finishing_times_out() {
    let cloud = Arc::new(FakeCloud::new().with_instance(sql_instance("p1", "db1", true)));
    let backends = backends(cloud.clone(), &["p1"]);
    let options = MutationOptions {
        poll_interval: Duration::from_secs(5),
        deadline: Duration::from_secs(30),
    };

    let started = tokio::time::Instant::now();
    let err = add_network(
        &backends,
        options,
        &db("p1", "db1", true),
        "office",
        "203.0.113.5",
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AncError::Timeout { waited, .. } if waited == Duration::from_secs(30)));
    assert!(started.elapsed() >= Duration::from_secs(30));
    // get + patch + polls at 5s..=25s (the 30s tick races the deadline)
    assert!(cloud.calls() >= 2 + 5);
}

#[tokio::test]
async fn test_rejected_update() {
    let mut cloud = FakeCloud::new().with_instance(sql_instance("p1", "db1", true));
    cloud.reject_with = Some(409);
    let cloud = Arc::new(cloud);
    let backends = backends(cloud, &["p1"]);

    let err = add_network(
        &backends,
        fast(),
        &db("p1", "db1", true),
        "office",
        "203.0.113.5",
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AncError::BackendRejected(ref m) if m.contains("conflict")));
}

#[tokio::test(start_paused = true)]
async fn test_cluster_add_preserves_existing_networks() {
    let mut cluster = gke_cluster("p1", "main");
    cluster
        .master_authorized_networks
        .push(AuthorizedNetwork::new("vpn", "10.8.0.0/16"));
    let cloud = Arc::new(
        FakeCloud::new()
            .with_cluster(cluster.clone())
            .script(vec![OperationStatus::Done]),
    );
    let backends = backends(cloud.clone(), &["p1"]);
    let resource = CloudResource::Cluster(cluster);

    add_network(&backends, fast(), &resource, "home", "198.51.100.7")
        .await
        .unwrap();

    let refreshed = fetch_detail(&backends, &resource).await.unwrap();
    assert_eq!(
        refreshed.authorized_networks(),
        &[
            AuthorizedNetwork::new("vpn", "10.8.0.0/16"),
            AuthorizedNetwork::new("home", "198.51.100.7/32"),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_private_cluster_still_accepts_networks() {
    let mut cluster = gke_cluster("p1", "locked");
    cluster.private_cluster_enabled = true;
    cluster.public_endpoint = String::new();
    let cloud = Arc::new(
        FakeCloud::new()
            .with_cluster(cluster.clone())
            .script(vec![OperationStatus::Done]),
    );
    let backends = backends(cloud, &["p1"]);

    let outcome = add_network(
        &backends,
        fast(),
        &CloudResource::Cluster(cluster),
        "home",
        "198.51.100.7",
    )
    .await
    .unwrap();

    assert_eq!(outcome.operation, "op-0");
}

#[tokio::test(start_paused = true)]
async fn test_failed_poll_is_reported_not_retried() {
    let mut cloud = FakeCloud::new().with_instance(sql_instance("p1", "db1", true));
    cloud.poll_error = Some(403);
    let cloud = Arc::new(cloud);
    let backends = backends(cloud.clone(), &["p1"]);

    let started = tokio::time::Instant::now();
    let err = add_network(
        &backends,
        fast(),
        &db("p1", "db1", true),
        "office",
        "203.0.113.5",
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        AncError::PollFailed { ref operation, ref message }
            if operation == "op-0" && message.starts_with("Permission denied")
    ));
    // get + patch + a single poll
    assert_eq!(cloud.calls(), 3);
    assert!(started.elapsed() < fast().deadline);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_cluster_networks_are_kept() {
    let mut cluster = gke_cluster("p1", "main");
    cluster.master_authorized_networks_enabled = false;
    cluster
        .master_authorized_networks
        .push(AuthorizedNetwork::new("vpn", "192.0.2.0/24"));
    let cloud = Arc::new(
        FakeCloud::new()
            .with_cluster(cluster.clone())
            .script(vec![OperationStatus::Done]),
    );
    let backends = backends(cloud.clone(), &["p1"]);
    let resource = CloudResource::Cluster(cluster);

    let err = add_network(&backends, fast(), &resource, "vpn2", "192.0.2.0/24")
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "network 192.0.2.0/24 already exists with name vpn"
    );

    add_network(&backends, fast(), &resource, "home", "198.51.100.7")
        .await
        .unwrap();

    let refreshed = fetch_detail(&backends, &resource).await.unwrap();
    assert_eq!(
        refreshed.authorized_networks(),
        &[
            AuthorizedNetwork::new("vpn", "192.0.2.0/24"),
            AuthorizedNetwork::new("home", "198.51.100.7/32"),
        ]
    );
}

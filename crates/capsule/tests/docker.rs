//! End-to-end tests against a real Docker daemon.
//!
//! Run with `--features integration`.

use std::time::Duration;

use capsule::wait::for_listening_port;
use capsule::{
    Orchestrator, OrchestratorConfig, from_image, waiting_for, with_exposed_ports, with_timeout,
};

#[test_log::test(tokio::test)]
#[cfg_attr(not(feature = "integration"), ignore = "requires a Docker daemon")]
async fn test_nginx_round_trip() {
    let config = OrchestratorConfig::load().unwrap();
    let orchestrator = Orchestrator::connect(&config).unwrap();

    let definition = orchestrator.new_generic_container(
        from_image("nginx:alpine", []),
        [
            with_exposed_ports([80u16]),
            waiting_for(for_listening_port(80u16).with_startup_timeout(Duration::from_secs(60))),
        ],
    );

    let started = orchestrator
        .run(&definition, [with_timeout(Duration::from_secs(300))])
        .await
        .unwrap();

    let info = orchestrator.info(&started, []).await.unwrap();
    assert!(!info.host().is_empty());
    assert!(info.mapped_port("80/tcp").unwrap() > 0);

    orchestrator.terminate(&started, []).await.unwrap();
}

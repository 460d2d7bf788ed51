// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::net::{IpAddr, Ipv4Addr};

use netmon_core::{MonitorConfig, MonitorError, UnifiedMonitor};
use serial_test::serial;
use tokio::time::{timeout, Duration};

#[tokio::test]
async fn test_monitor_starts_and_stops_from_config() {
    // Nothing answers SNMP here, so every check reports the device as down
    let config = MonitorConfig {
        switch_ips: vec![IpAddr::V4(Ipv4Addr::LOCALHOST)],
        snmp_port: 9,
        query_timeout: Duration::from_millis(100),
        syslog_host: "127.0.0.1".to_string(),
        syslog_port: 0,
        log_level: "error".to_string(),
        ..Default::default()
    };

    let monitor = UnifiedMonitor::from_config(config).expect("failed to build monitor");
    let handle = monitor.start().await.expect("failed to start monitor");
    assert!(handle.local_addr().is_some());

    tokio::time::sleep(Duration::from_millis(200)).await;

    timeout(Duration::from_secs(10), handle.shutdown())
        .await
        .expect("shutdown hung")
        .expect("shutdown failed");
}

#[tokio::test]
async fn test_invalid_endpoint_is_rejected_before_start() {
    let config = MonitorConfig {
        event_endpoint: Some("localhost:8080".to_string()),
        ..Default::default()
    };

    assert!(matches!(
        config.validate(),
        Err(MonitorError::InvalidConfig(_))
    ));
}

#[test]
#[serial]
fn test_config_from_env_rejects_empty_device_list() {
    std::env::set_var("NETMON_SWITCH_IPS", " , ");
    std::env::set_var("NETMON_NETWORK_PREFIX", "not.a.prefix");

    let result = MonitorConfig::from_env();

    std::env::remove_var("NETMON_SWITCH_IPS");
    std::env::remove_var("NETMON_NETWORK_PREFIX");
    assert!(matches!(result, Err(MonitorError::InvalidConfig(_))));
}

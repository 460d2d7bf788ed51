// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use netmon::constants::{
    DEFAULT_CHECKER_WORKERS, DEFAULT_CHECK_INTERVAL, DEFAULT_DRAIN_TIMEOUT,
    DEFAULT_PROCESSOR_WORKERS, DEFAULT_QUERY_TIMEOUT, DEFAULT_SNMP_PORT, DEFAULT_SYSLOG_PORT,
};
use netmon::device::DeviceDirectory;

use crate::error::MonitorError;

const DEFAULT_NETWORK_PREFIX: &str = "10.6.26";
const DEFAULT_SWITCH_COUNT: u8 = 10;
const DEFAULT_COMMUNITY: &str = "public";
const DEFAULT_SYSLOG_HOST: &str = "0.0.0.0";
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration for the monitor, fixed for the life of the process
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Monitored devices, in polling order
    pub switch_ips: Vec<IpAddr>,
    /// SNMP community shared by every device
    pub snmp_community: String,
    /// Port devices answer SNMP on
    pub snmp_port: u16,
    /// Upper bound on a single remote query
    pub query_timeout: Duration,
    /// Host the syslog socket binds to (e.g., "0.0.0.0")
    pub syslog_host: String,
    /// Syslog port, 0 picks an ephemeral port
    pub syslog_port: u16,
    /// Time between polling cycles
    pub check_interval: Duration,
    /// Size of the message processing pool
    pub processor_workers: usize,
    /// Size of the polling pool
    pub checker_workers: usize,
    /// How long shutdown waits for queued work
    pub drain_timeout: Duration,
    /// Base URL events are POSTed to; events are logged when unset
    pub event_endpoint: Option<String>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            switch_ips: (1..=DEFAULT_SWITCH_COUNT)
                .map(|host| IpAddr::V4(Ipv4Addr::new(10, 6, 26, host)))
                .collect(),
            snmp_community: DEFAULT_COMMUNITY.to_string(),
            snmp_port: DEFAULT_SNMP_PORT,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            syslog_host: DEFAULT_SYSLOG_HOST.to_string(),
            syslog_port: DEFAULT_SYSLOG_PORT,
            check_interval: DEFAULT_CHECK_INTERVAL,
            processor_workers: DEFAULT_PROCESSOR_WORKERS,
            checker_workers: DEFAULT_CHECKER_WORKERS,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            event_endpoint: None,
            log_level: "info".to_string(),
        }
    }
}

impl MonitorConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, MonitorError> {
        let switch_ips = match non_empty_var("NETMON_SWITCH_IPS") {
            Some(list) => parse_switch_ips(&list)?,
            None => {
                let prefix = non_empty_var("NETMON_NETWORK_PREFIX")
                    .unwrap_or_else(|| DEFAULT_NETWORK_PREFIX.to_string());
                let count = parse_var("NETMON_SWITCH_COUNT", DEFAULT_SWITCH_COUNT)?;
                switch_range(&prefix, count)?
            }
        };
        let snmp_community = env::var("NETMON_SNMP_COMMUNITY")
            .unwrap_or_else(|_| DEFAULT_COMMUNITY.to_string());
        let snmp_port = parse_var("NETMON_SNMP_PORT", DEFAULT_SNMP_PORT)?;
        let query_timeout = Duration::from_millis(parse_var(
            "NETMON_QUERY_TIMEOUT_MS",
            millis(DEFAULT_QUERY_TIMEOUT),
        )?);
        let syslog_host =
            env::var("NETMON_SYSLOG_HOST").unwrap_or_else(|_| DEFAULT_SYSLOG_HOST.to_string());
        let syslog_port = parse_var("NETMON_SYSLOG_PORT", DEFAULT_SYSLOG_PORT)?;
        let check_interval = Duration::from_secs(parse_var(
            "NETMON_CHECK_INTERVAL_SECS",
            DEFAULT_CHECK_INTERVAL.as_secs(),
        )?);
        let processor_workers = parse_var("NETMON_PROCESSOR_WORKERS", DEFAULT_PROCESSOR_WORKERS)?;
        let checker_workers = parse_var("NETMON_CHECKER_WORKERS", DEFAULT_CHECKER_WORKERS)?;
        let drain_timeout = Duration::from_millis(parse_var(
            "NETMON_DRAIN_TIMEOUT_MS",
            millis(DEFAULT_DRAIN_TIMEOUT),
        )?);
        let event_endpoint = non_empty_var("NETMON_EVENT_ENDPOINT");
        let log_level = env::var("NETMON_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|_| "info".to_string());

        let config = Self {
            switch_ips,
            snmp_community,
            snmp_port,
            query_timeout,
            syslog_host,
            syslog_port,
            check_interval,
            processor_workers,
            checker_workers,
            drain_timeout,
            event_endpoint,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.switch_ips.is_empty() {
            return Err(invalid("at least one device must be configured"));
        }
        if self.snmp_community.is_empty() {
            return Err(invalid("NETMON_SNMP_COMMUNITY cannot be empty"));
        }
        if self.snmp_port == 0 {
            return Err(invalid("SNMP port must be greater than 0"));
        }
        if self.syslog_host.trim().is_empty() {
            return Err(invalid("NETMON_SYSLOG_HOST cannot be empty"));
        }
        if self.processor_workers == 0 || self.checker_workers == 0 {
            return Err(invalid("worker pools need at least one worker"));
        }
        if self.check_interval.is_zero() {
            return Err(invalid("check interval must be greater than 0"));
        }
        if self.query_timeout.is_zero() {
            return Err(invalid("query timeout must be greater than 0"));
        }
        if let Some(endpoint) = &self.event_endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(MonitorError::InvalidConfig(format!(
                    "Event endpoint '{}' must be an http(s) URL",
                    endpoint
                )));
            }
        }
        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(MonitorError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    /// The device directory every component shares
    pub fn directory(&self) -> DeviceDirectory {
        DeviceDirectory::new(self.switch_ips.iter().copied(), &self.snmp_community)
    }
}

fn invalid(reason: &str) -> MonitorError {
    MonitorError::InvalidConfig(reason.to_string())
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|val| !val.trim().is_empty())
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, MonitorError> {
    match non_empty_var(key) {
        Some(val) => val.trim().parse().map_err(|_| {
            MonitorError::InvalidConfig(format!("{} has an invalid value '{}'", key, val))
        }),
        None => Ok(default),
    }
}

/// Parses a comma or whitespace separated address list.
pub fn parse_switch_ips(list: &str) -> Result<Vec<IpAddr>, MonitorError> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry.parse::<IpAddr>().map_err(|_| {
                MonitorError::InvalidConfig(format!("'{}' is not a valid IP address", entry))
            })
        })
        .collect()
}

/// `prefix.1 ..= prefix.count` for a three-octet IPv4 prefix such as `10.6.26`.
pub fn switch_range(prefix: &str, count: u8) -> Result<Vec<IpAddr>, MonitorError> {
    let octets: Vec<u8> = prefix
        .trim_end_matches('.')
        .split('.')
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|_| {
            MonitorError::InvalidConfig(format!("'{}' is not a valid network prefix", prefix))
        })?;
    let [a, b, c] = octets[..] else {
        return Err(MonitorError::InvalidConfig(format!(
            "Network prefix '{}' must have three octets",
            prefix
        )));
    };
    if !(1..=254).contains(&count) {
        return Err(MonitorError::InvalidConfig(format!(
            "Switch count {} must be between 1 and 254",
            count
        )));
    }

    Ok((1..=count)
        .map(|host| IpAddr::V4(Ipv4Addr::new(a, b, c, host)))
        .collect())
}

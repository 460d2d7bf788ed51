// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Standard syslog port.
pub const DEFAULT_SYSLOG_PORT: u16 = 514;
pub const DEFAULT_SNMP_PORT: u16 = 161;

// Syslog over UDP is capped well below this by RFC 5426 in practice
pub const BUFFER_SIZE: usize = 8192;

pub const DEFAULT_PROCESSOR_WORKERS: usize = 5;
pub const DEFAULT_CHECKER_WORKERS: usize = 10;

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Identity reported when a device's sysName cannot be resolved.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown";

/// sysUpTime.0, in hundredths of a second since the agent (re)started.
pub const SYS_UPTIME_OID: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 3, 0];
/// sysName.0, the administratively assigned device name.
pub const SYS_NAME_OID: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 5, 0];

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Static allow-list of monitored devices.
//!
//! The directory is built once at startup and shared read-only between the listener
//! (admission filtering) and both worker pools (query targets).

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

/// A monitored network device and the credential used to query it.
#[derive(Clone, PartialEq, Eq)]
pub struct Device {
    address: IpAddr,
    community: Arc<str>,
}

impl Device {
    pub fn new(address: IpAddr, community: impl Into<Arc<str>>) -> Self {
        Device {
            address: address.to_canonical(),
            community: community.into(),
        }
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    pub fn community(&self) -> &str {
        &self.community
    }
}

// The community is a shared secret, keep it out of logs.
impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("address", &self.address)
            .field("community", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

/// Immutable set of devices, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct DeviceDirectory {
    devices: Vec<Arc<Device>>,
    index: HashMap<IpAddr, usize>,
}

impl DeviceDirectory {
    /// Builds a directory sharing one community across all addresses.
    ///
    /// Duplicate addresses are collapsed, keeping the first occurrence.
    pub fn new<I>(addresses: I, community: &str) -> Self
    where
        I: IntoIterator<Item = IpAddr>,
    {
        let community: Arc<str> = Arc::from(community);
        let mut directory = DeviceDirectory::default();
        for address in addresses {
            let device = Device::new(address, Arc::clone(&community));
            if directory.index.contains_key(&device.address) {
                continue;
            }
            directory
                .index
                .insert(device.address, directory.devices.len());
            directory.devices.push(Arc::new(device));
        }
        directory
    }

    /// Looks a device up by address. IPv4-mapped IPv6 addresses match their IPv4 form.
    pub fn get(&self, address: IpAddr) -> Option<&Arc<Device>> {
        self.index
            .get(&address.to_canonical())
            .and_then(|&i| self.devices.get(i))
    }

    pub fn contains(&self, address: IpAddr) -> bool {
        self.index.contains_key(&address.to_canonical())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Device>> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

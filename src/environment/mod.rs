//! Host environment facts recorded at the top of every diagnosis

pub mod platform;

pub use platform::SystemEnvironment;

use crate::types::LinkType;
use serde::{Deserialize, Serialize};

/// Address recorded when the host is offline
pub const OFFLINE_ADDRESS: &str = "127.0.0.1";
/// Resolver recorded when none is known
pub const UNKNOWN_RESOLVER: &str = "0.0.0.0";

/// Synchronous connectivity, address and resolver queries.
///
/// Implementations never fail: anything they cannot determine degrades to a
/// sentinel value.
pub trait EnvironmentInspector: Send + Sync {
    fn is_connected(&self) -> bool;

    fn link_type(&self) -> LinkType;

    /// Local address on the given link; empty when unknown
    fn local_address(&self, link_type: LinkType) -> String;

    /// Default gateway, only meaningful on wifi
    fn gateway(&self) -> Option<String>;

    /// Primary and secondary resolver
    fn dns_resolvers(&self) -> (String, String);

    fn device_info(&self) -> String;
}

/// One environment query block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub connected: bool,
    pub link_type: LinkType,
    pub local_address: String,
    pub gateway: Option<String>,
    pub dns: (String, String),
}

impl EnvironmentSnapshot {
    /// Query the inspector once, applying the offline placeholders
    pub fn collect(inspector: &dyn EnvironmentInspector) -> Self {
        let connected = inspector.is_connected();
        let link_type = inspector.link_type();

        let (local_address, gateway) = if connected {
            let gateway = if link_type == LinkType::Wifi {
                inspector.gateway()
            } else {
                None
            };
            (inspector.local_address(link_type), gateway)
        } else {
            (OFFLINE_ADDRESS.to_string(), None)
        };

        let dns = if connected {
            inspector.dns_resolvers()
        } else {
            (UNKNOWN_RESOLVER.to_string(), UNKNOWN_RESOLVER.to_string())
        };

        Self {
            connected,
            link_type,
            local_address,
            gateway,
            dns,
        }
    }

    /// Transcript lines, in recording order
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(5);
        lines.push(format!(
            "Current Network:\t{}",
            if self.connected { "Connected" } else { "Not connected" }
        ));
        lines.push(format!("Network Type:\t{}", self.link_type));
        lines.push(format!("Local IP:\t{}", self.local_address));
        if let Some(gateway) = &self.gateway {
            lines.push(format!("Local Gateway:\t{}", gateway));
        }
        lines.push(format!("Local DNS:\t{},{}", self.dns.0, self.dns.1));
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        connected: bool,
        link: LinkType,
    }

    impl EnvironmentInspector for Fixed {
        fn is_connected(&self) -> bool {
            self.connected
        }
        fn link_type(&self) -> LinkType {
            self.link
        }
        fn local_address(&self, _link_type: LinkType) -> String {
            "10.0.0.5".to_string()
        }
        fn gateway(&self) -> Option<String> {
            Some("10.0.0.1".to_string())
        }
        fn dns_resolvers(&self) -> (String, String) {
            ("8.8.8.8".to_string(), "8.8.4.4".to_string())
        }
        fn device_info(&self) -> String {
            "linux:x86_64:host".to_string()
        }
    }

    #[test]
    fn test_connected_wifi_block() {
        let snapshot = EnvironmentSnapshot::collect(&Fixed { connected: true, link: LinkType::Wifi });
        assert_eq!(snapshot.lines(), vec![
            "Current Network:\tConnected",
            "Network Type:\twifi",
            "Local IP:\t10.0.0.5",
            "Local Gateway:\t10.0.0.1",
            "Local DNS:\t8.8.8.8,8.8.4.4",
        ]);
    }

    #[test]
    fn test_gateway_only_on_wifi() {
        let snapshot = EnvironmentSnapshot::collect(&Fixed { connected: true, link: LinkType::Cellular });
        assert_eq!(snapshot.gateway, None);
        assert_eq!(snapshot.lines().len(), 4);
    }

    #[test]
    fn test_offline_placeholders() {
        let snapshot = EnvironmentSnapshot::collect(&Fixed { connected: false, link: LinkType::Unknown });
        assert_eq!(snapshot.lines(), vec![
            "Current Network:\tNot connected",
            "Network Type:\tunknown",
            "Local IP:\t127.0.0.1",
            "Local DNS:\t0.0.0.0,0.0.0.0",
        ]);
    }
}

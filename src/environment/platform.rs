//! Host environment queries for the current platform

use crate::{
    environment::{EnvironmentInspector, UNKNOWN_RESOLVER},
    types::LinkType,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

/// Well-known address used only to pick a route; no packet is sent
const ROUTE_PROBE: &str = "8.8.8.8:53";

/// Inspector backed by sockets, procfs and the OS resolver configuration
#[derive(Debug, Default, Clone)]
pub struct SystemEnvironment;

impl SystemEnvironment {
    pub fn new() -> Self {
        Self
    }

    /// Source address the kernel would use for outbound traffic
    fn outbound_address(&self) -> Option<IpAddr> {
        let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))).ok()?;
        socket.connect(ROUTE_PROBE).ok()?;
        let local = socket.local_addr().ok()?.ip();
        if local.is_unspecified() {
            None
        } else {
            Some(local)
        }
    }
}

impl EnvironmentInspector for SystemEnvironment {
    fn is_connected(&self) -> bool {
        self.outbound_address()
            .map(|ip| !ip.is_loopback())
            .unwrap_or(false)
    }

    fn link_type(&self) -> LinkType {
        default_interface()
            .map(|iface| classify_interface(&iface, interface_is_wireless(&iface)))
            .unwrap_or(LinkType::Unknown)
    }

    fn local_address(&self, _link_type: LinkType) -> String {
        self.outbound_address()
            .map(|ip| ip.to_string())
            .unwrap_or_default()
    }

    fn gateway(&self) -> Option<String> {
        read_route_table()
            .and_then(|table| parse_default_route(&table))
            .map(|(_, gateway)| gateway.to_string())
    }

    fn dns_resolvers(&self) -> (String, String) {
        let servers = match trust_dns_resolver::system_conf::read_system_conf() {
            Ok((config, _opts)) => {
                let mut ips: Vec<IpAddr> = Vec::new();
                for ns in config.name_servers() {
                    let ip = ns.socket_addr.ip();
                    if !ips.contains(&ip) {
                        ips.push(ip);
                    }
                }
                ips
            }
            Err(_) => Vec::new(),
        };

        let mut iter = servers.into_iter().map(|ip| ip.to_string());
        let primary = iter.next().unwrap_or_else(|| UNKNOWN_RESOLVER.to_string());
        let secondary = iter.next().unwrap_or_else(|| UNKNOWN_RESOLVER.to_string());
        (primary, secondary)
    }

    fn device_info(&self) -> String {
        format!("{}:{}:{}", std::env::consts::OS, std::env::consts::ARCH, hostname())
    }
}

/// Map an interface name to the link technology it most likely uses
pub fn classify_interface(name: &str, wireless: bool) -> LinkType {
    if wireless || name.starts_with("wl") || name.starts_with("wlan") {
        LinkType::Wifi
    } else if ["wwan", "rmnet", "ppp", "ccmni", "pdp"]
        .iter()
        .any(|prefix| name.starts_with(prefix))
    {
        LinkType::Cellular
    } else {
        LinkType::Unknown
    }
}

/// Interface and gateway of the default route in `/proc/net/route` format
pub fn parse_default_route(table: &str) -> Option<(String, Ipv4Addr)> {
    table.lines().skip(1).find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 || fields[1] != "00000000" {
            return None;
        }
        let raw = u32::from_str_radix(fields[2], 16).ok()?;
        // the kernel prints the address in host (little-endian) byte order
        let gateway = Ipv4Addr::from(raw.to_le_bytes());
        if gateway.is_unspecified() {
            return None;
        }
        Some((fields[0].to_string(), gateway))
    })
}

#[cfg(target_os = "linux")]
fn read_route_table() -> Option<String> {
    std::fs::read_to_string("/proc/net/route").ok()
}

#[cfg(not(target_os = "linux"))]
fn read_route_table() -> Option<String> {
    None
}

fn default_interface() -> Option<String> {
    read_route_table()
        .and_then(|table| parse_default_route(&table))
        .map(|(iface, _)| iface)
}

#[cfg(target_os = "linux")]
fn interface_is_wireless(iface: &str) -> bool {
    std::path::Path::new("/sys/class/net").join(iface).join("wireless").exists()
}

#[cfg(not(target_os = "linux"))]
fn interface_is_wireless(_iface: &str) -> bool {
    false
}

#[cfg(unix)]
fn hostname() -> String {
    let mut buf = [0u8; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        return "unknown".to_string();
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

#[cfg(not(unix))]
fn hostname() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_else(|_| "unknown".to_string())
}

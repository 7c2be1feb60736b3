//! Network value objects
//!
//! CIDR blocks, protocols and firewall rules shared by the network resources.

use crate::error::StackError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// IPv4 network in CIDR notation (`10.0.0.0/16`)
///
/// Host bits must be zero, so `10.0.1.5/24` is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cidr {
    address: Ipv4Addr,
    prefix: u8,
}

impl Cidr {
    pub fn new(address: Ipv4Addr, prefix: u8) -> Result<Self, StackError> {
        if prefix > 32 {
            return Err(StackError::InvalidConfig(format!(
                "invalid prefix length /{} (must be 0-32)",
                prefix
            )));
        }

        let cidr = Self { address, prefix };
        if u32::from(address) & !cidr.mask() != 0 {
            return Err(StackError::InvalidConfig(format!(
                "{}/{} has host bits set",
                address, prefix
            )));
        }

        Ok(cidr)
    }

    /// `0.0.0.0/0`
    pub fn any() -> Self {
        Self::from_parts(Ipv4Addr::UNSPECIFIED, 0)
    }

    /// Build from parts without checking the prefix or host bits
    pub(crate) const fn from_parts(address: Ipv4Addr, prefix: u8) -> Self {
        Self { address, prefix }
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    fn mask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix)
        }
    }

    /// Whether `other` lies entirely inside this network
    pub fn contains(&self, other: &Cidr) -> bool {
        other.prefix >= self.prefix
            && u32::from(other.address) & self.mask() == u32::from(self.address)
    }
}

impl FromStr for Cidr {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| StackError::InvalidConfig(format!("invalid CIDR block: {}", s)))?;

        let address = Ipv4Addr::from_str(addr)
            .map_err(|_| StackError::InvalidConfig(format!("invalid IPv4 address: {}", addr)))?;
        let prefix = prefix
            .parse::<u8>()
            .map_err(|_| StackError::InvalidConfig(format!("invalid CIDR block: {}", s)))?;

        Self::new(address, prefix)
    }
}

impl TryFrom<String> for Cidr {
    type Error = StackError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cidr> for String {
    fn from(cidr: Cidr) -> Self {
        cidr.to_string()
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix)
    }
}

/// Traffic protocol of a firewall rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    Icmp,
    /// Every protocol and every port
    All,
}

impl Protocol {
    pub fn parse(s: &str) -> Result<Self, StackError> {
        match s.to_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "icmp" => Ok(Protocol::Icmp),
            "all" | "-1" => Ok(Protocol::All),
            other => Err(StackError::InvalidConfig(format!(
                "unknown protocol: {}",
                other
            ))),
        }
    }

    /// Protocol string understood by the EC2 API
    pub fn as_engine_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Icmp => "icmp",
            Self::All => "-1",
        }
    }

    fn has_ports(&self) -> bool {
        matches!(self, Self::Tcp | Self::Udp)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
            Self::Icmp => write!(f, "icmp"),
            Self::All => write!(f, "all"),
        }
    }
}

/// A single allow rule of a security group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FirewallRule {
    pub protocol: Protocol,
    pub from_port: u16,
    pub to_port: u16,
    pub cidr_blocks: Vec<Cidr>,
}

impl FirewallRule {
    /// Single TCP port
    pub fn tcp(port: u16, cidr: Cidr) -> Self {
        Self {
            protocol: Protocol::Tcp,
            from_port: port,
            to_port: port,
            cidr_blocks: vec![cidr],
        }
    }

    /// All protocols, all ports
    pub fn allow_all(cidr: Cidr) -> Self {
        Self {
            protocol: Protocol::All,
            from_port: 0,
            to_port: 0,
            cidr_blocks: vec![cidr],
        }
    }

    pub fn validate(&self) -> Result<(), StackError> {
        if self.cidr_blocks.is_empty() {
            return Err(StackError::InvalidConfig(format!(
                "{} rule {}-{} has no CIDR blocks",
                self.protocol, self.from_port, self.to_port
            )));
        }

        if self.protocol.has_ports() {
            if self.from_port > self.to_port {
                return Err(StackError::InvalidConfig(format!(
                    "{} port range {}-{} is reversed",
                    self.protocol, self.from_port, self.to_port
                )));
            }
        } else if self.protocol == Protocol::All && (self.from_port != 0 || self.to_port != 0) {
            return Err(StackError::InvalidConfig(
                "rules for all protocols must use ports 0-0".to_string(),
            ));
        }

        Ok(())
    }
}

impl fmt::Display for FirewallRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cidrs: Vec<String> = self.cidr_blocks.iter().map(|c| c.to_string()).collect();
        write!(
            f,
            "{} {}-{} {}",
            self.protocol,
            self.from_port,
            self.to_port,
            cidrs.join(",")
        )
    }
}

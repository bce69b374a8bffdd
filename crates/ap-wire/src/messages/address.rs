use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

crate::wire_message! {
    /// A discovered service address.
    ///
    /// `ip` holds raw address bytes: 4 for IPv4, 16 for IPv6. Records with
    /// any other length are skipped during normalization.
    pub struct AddressRecord {
        pub ip: Vec<u8>,
        pub port: u16,
        /// Opaque token the receiving service uses to authenticate us.
        pub ticket: String,
    }
}

impl AddressRecord {
    /// Build a record from a socket address.
    pub fn from_socket_addr(addr: SocketAddr, ticket: impl Into<String>) -> Self {
        let ip = match addr.ip() {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        };
        Self {
            ip,
            port: addr.port(),
            ticket: ticket.into(),
        }
    }

    /// Interpret the raw bytes, or `None` for an unsupported length.
    pub fn ip_addr(&self) -> Option<IpAddr> {
        match self.ip.len() {
            4 => {
                let octets: [u8; 4] = self.ip.as_slice().try_into().ok()?;
                Some(IpAddr::V4(Ipv4Addr::from(octets)))
            }
            16 => {
                let octets: [u8; 16] = self.ip.as_slice().try_into().ok()?;
                Some(IpAddr::V6(Ipv6Addr::from(octets)))
            }
            _ => None,
        }
    }

    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.ip_addr().map(|ip| SocketAddr::new(ip, self.port))
    }
}

/// Clasificación de la interfaz en la que escucha un socket.
///
/// Determina qué tan alcanzable es un puerto desde fuera de la máquina y
/// define el orden de preferencia al deduplicar un mismo puerto enlazado en
/// varias interfaces.
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceClass {
    /// Dirección sin especificar (0.0.0.0 / ::): todas las interfaces
    Any,
    Public,
    Private,
    Loopback,
    Unknown,
}

impl InterfaceClass {
    /// Clasifica una dirección textual tal como la produce `socket_table`.
    pub fn classify(addr: &str) -> Self {
        match addr.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) => Self::classify_v4(ip),
            Ok(IpAddr::V6(ip)) => match ip.to_ipv4_mapped() {
                Some(mapped) => Self::classify_v4(mapped),
                None => Self::classify_v6(ip),
            },
            Err(_) => InterfaceClass::Unknown,
        }
    }

    fn classify_v4(ip: Ipv4Addr) -> Self {
        if ip.is_loopback() {
            InterfaceClass::Loopback
        } else if ip.is_unspecified() {
            InterfaceClass::Any
        } else if ip.is_private() || ip.is_link_local() {
            InterfaceClass::Private
        } else {
            InterfaceClass::Public
        }
    }

    fn classify_v6(ip: Ipv6Addr) -> Self {
        let first = ip.segments()[0];
        if ip.is_loopback() {
            InterfaceClass::Loopback
        } else if ip.is_unspecified() {
            InterfaceClass::Any
        } else if first & 0xfe00 == 0xfc00 || first & 0xffc0 == 0xfe80 {
            // fc00::/7 (ULA) y fe80::/10 (link-local)
            InterfaceClass::Private
        } else {
            InterfaceClass::Public
        }
    }

    /// Rango de exposición: any > public > private > loopback > unknown.
    pub fn rank(self) -> u8 {
        match self {
            InterfaceClass::Any => 4,
            InterfaceClass::Public => 3,
            InterfaceClass::Private => 2,
            InterfaceClass::Loopback => 1,
            InterfaceClass::Unknown => 0,
        }
    }

    /// Alcanzable desde fuera de la máquina
    pub fn is_exposed(self) -> bool {
        matches!(self, InterfaceClass::Any | InterfaceClass::Public)
    }

    pub fn label(self) -> &'static str {
        match self {
            InterfaceClass::Any => "any",
            InterfaceClass::Public => "public",
            InterfaceClass::Private => "private",
            InterfaceClass::Loopback => "loopback",
            InterfaceClass::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_ipv4() {
        assert_eq!(InterfaceClass::classify("0.0.0.0"), InterfaceClass::Any);
        assert_eq!(InterfaceClass::classify("127.0.0.1"), InterfaceClass::Loopback);
        assert_eq!(InterfaceClass::classify("192.168.1.20"), InterfaceClass::Private);
        assert_eq!(InterfaceClass::classify("10.0.0.5"), InterfaceClass::Private);
        assert_eq!(InterfaceClass::classify("8.8.8.8"), InterfaceClass::Public);
    }

    #[test]
    fn test_classify_ipv6() {
        assert_eq!(InterfaceClass::classify("::"), InterfaceClass::Any);
        assert_eq!(InterfaceClass::classify("::1"), InterfaceClass::Loopback);
        assert_eq!(InterfaceClass::classify("fe80::1"), InterfaceClass::Private);
        assert_eq!(InterfaceClass::classify("fd12:3456::1"), InterfaceClass::Private);
        assert_eq!(InterfaceClass::classify("2001:db8::1"), InterfaceClass::Public);
        assert_eq!(
            InterfaceClass::classify("::ffff:127.0.0.1"),
            InterfaceClass::Loopback
        );
    }

    /// Direcciones tal como las escribe el lector de `/proc/net/tcp6`
    #[test]
    fn test_classify_ipv6_full_groups() {
        let cases = [
            ("0000:0000:0000:0000:0000:0000:0000:0000", InterfaceClass::Any),
            ("0000:0000:0000:0000:0000:0000:0000:0001", InterfaceClass::Loopback),
            ("fe80:0000:0000:0000:0000:0000:0000:0001", InterfaceClass::Private),
            ("0000:0000:0000:0000:0000:ffff:7f00:0001", InterfaceClass::Loopback),
            ("0000:0000:0000:0000:0000:ffff:0000:0000", InterfaceClass::Any),
        ];
        for (addr, expected) in cases {
            assert_eq!(InterfaceClass::classify(addr), expected, "{}", addr);
        }
    }

    #[test]
    fn test_classify_garbage_is_unknown() {
        assert_eq!(InterfaceClass::classify("0100007"), InterfaceClass::Unknown);
        assert_eq!(InterfaceClass::classify(""), InterfaceClass::Unknown);
    }

    /// El orden de preferencia al deduplicar es estricto
    #[test]
    fn test_rank_order() {
        let ordered = [
            InterfaceClass::Any,
            InterfaceClass::Public,
            InterfaceClass::Private,
            InterfaceClass::Loopback,
            InterfaceClass::Unknown,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0].rank() > pair[1].rank());
        }
        assert!(InterfaceClass::Any.is_exposed());
        assert!(!InterfaceClass::Loopback.is_exposed());
    }
}

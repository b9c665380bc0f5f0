/// Módulo de lectura de las tablas de sockets del kernel.
///
/// Lee `/proc/net/tcp` y `/proc/net/tcp6` directamente (sin depender de `ss`)
/// y decodifica las direcciones hexadecimales a su forma textual.
/// Solo se conservan los sockets en estado LISTEN.
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;

/// Código hexadecimal del estado LISTEN en las tablas del kernel
const TCP_LISTEN: &str = "0A";

/// Tablas leídas en cada escaneo, relativas a la raíz de `/proc`
const TCP_TABLES: [&str; 2] = ["net/tcp", "net/tcp6"];

/// Familia de direcciones del socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
    /// Dirección con longitud inesperada; se conserva sin decodificar
    Unknown,
}

/// Socket en escucha tal como aparece en una tabla del kernel.
///
/// El inodo solo identifica al socket dentro de un mismo escaneo: el kernel
/// lo reutiliza cuando el socket se cierra.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocketRecord {
    pub port: u16,
    pub local_addr: String,
    pub family: AddressFamily,
    pub inode: u64,
    pub tx_queue: u64,
    pub rx_queue: u64,
    pub listening: bool,
}

/// Lee todos los sockets TCP en escucha (IPv4 e IPv6).
///
/// La ausencia de `net/tcp6` no es un error (hosts sin IPv6). Las líneas
/// malformadas se descartan individualmente. Si el mismo par puerto+dirección
/// aparece dos veces en el escaneo se conserva solo el primero.
///
/// # Arguments
/// * `proc_root` - Raíz del sistema de archivos proc (normalmente `/proc`)
pub fn read_listening_sockets(proc_root: &Path) -> Result<Vec<SocketRecord>> {
    let mut sockets = Vec::new();
    let mut seen: HashSet<(u16, String)> = HashSet::new();

    for table in TCP_TABLES {
        let path = proc_root.join(table);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound && table.ends_with('6') => {
                log::debug!("{} no existe, se omite IPv6", path.display());
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        for record in parse_table(&contents) {
            if seen.insert((record.port, record.local_addr.clone())) {
                sockets.push(record);
            }
        }
    }

    Ok(sockets)
}

/// Parsea el contenido completo de una tabla (la primera línea es cabecera).
pub fn parse_table(contents: &str) -> Vec<SocketRecord> {
    contents
        .lines()
        .skip(1)
        .filter_map(parse_line)
        .collect()
}

/// Parsea una línea de la tabla.
///
/// Formato (campos separados por espacios):
/// ```text
///   sl  local_address rem_address   st tx_queue:rx_queue tr:tm->when retrnsmt  uid  timeout inode
///    0: 0100007F:1F90 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 41273 ...
/// ```
///
/// # Returns
/// `Some(SocketRecord)` solo para sockets en LISTEN bien formados.
fn parse_line(line: &str) -> Option<SocketRecord> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 10 {
        return None;
    }

    if !fields[3].eq_ignore_ascii_case(TCP_LISTEN) {
        return None;
    }

    let (addr_hex, port_hex) = fields[1].split_once(':')?;
    let port = u16::from_str_radix(port_hex, 16).ok()?;

    let (local_addr, family) = match addr_hex.len() {
        8 => (decode_ipv4(addr_hex)?, AddressFamily::Ipv4),
        32 => (decode_ipv6(addr_hex)?, AddressFamily::Ipv6),
        _ => (addr_hex.to_string(), AddressFamily::Unknown),
    };

    // Colas: un fallo aquí degrada a 0 en vez de descartar el socket
    let (tx_queue, rx_queue) = fields[4]
        .split_once(':')
        .map(|(tx, rx)| {
            (
                u64::from_str_radix(tx, 16).unwrap_or(0),
                u64::from_str_radix(rx, 16).unwrap_or(0),
            )
        })
        .unwrap_or((0, 0));

    let inode = fields[9].parse::<u64>().ok()?;

    Some(SocketRecord {
        port,
        local_addr,
        family,
        inode,
        tx_queue,
        rx_queue,
        listening: true,
    })
}

/// Decodifica una dirección IPv4 del kernel.
///
/// Los 8 caracteres codifican un u32 en orden de bytes del host
/// (little-endian): `0100007F` → `127.0.0.1`.
pub fn decode_ipv4(hex: &str) -> Option<String> {
    if hex.len() != 8 {
        return None;
    }
    let value = u32::from_str_radix(hex, 16).ok()?;
    let [a, b, c, d] = value.to_le_bytes();
    Some(format!("{}.{}.{}.{}", a, b, c, d))
}

/// Operación inversa de [`decode_ipv4`]: `127.0.0.1` → `0100007F`.
pub fn encode_ipv4(addr: &str) -> Option<String> {
    let ip: std::net::Ipv4Addr = addr.parse().ok()?;
    Some(format!("{:08X}", u32::from_le_bytes(ip.octets())))
}

/// Decodifica una dirección IPv6 del kernel.
///
/// Los 32 caracteres son cuatro palabras de 32 bits little-endian: se
/// invierten los bytes de cada palabra y se reagrupan en 8 hextetos.
/// El resultado lleva siempre los 8 grupos de 4 dígitos, sin comprimir:
/// `::1` se escribe `0000:0000:0000:0000:0000:0000:0000:0001`.
pub fn decode_ipv6(hex: &str) -> Option<String> {
    if hex.len() != 32 || !hex.is_ascii() {
        return None;
    }

    let mut octets = [0u8; 16];
    for word in 0..4 {
        let chunk = &hex[word * 8..(word + 1) * 8];
        let value = u32::from_str_radix(chunk, 16).ok()?;
        octets[word * 4..(word + 1) * 4].copy_from_slice(&value.to_le_bytes());
    }

    let groups: Vec<String> = std::net::Ipv6Addr::from(octets)
        .segments()
        .iter()
        .map(|group| format!("{:04x}", group))
        .collect();
    Some(groups.join(":"))
}

/// Fuentes de datos del sistema operativo.
///
/// `SystemSource` agrupa los tres lectores externos (procesos, sockets,
/// inodos) para que el estado de puertos se pueda probar con datos fijos.
use std::path::PathBuf;

use crate::error::Result;
use crate::inode::InodeIndex;
use crate::process_table::{self, ProcessTable};
use crate::socket_table::{self, SocketRecord};

pub trait SystemSource: Send + Sync {
    /// Tabla de procesos actual.
    fn processes(&self) -> Result<ProcessTable>;

    /// Sockets TCP en escucha (IPv4 e IPv6).
    fn listening_sockets(&self) -> Result<Vec<SocketRecord>>;

    /// Índice inodo → PID construido en este momento.
    fn inode_index(&self) -> InodeIndex;
}

/// Fuente real basada en `/proc`.
#[derive(Debug, Clone)]
pub struct ProcfsSource {
    proc_root: PathBuf,
}

impl ProcfsSource {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }
}

impl Default for ProcfsSource {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl SystemSource for ProcfsSource {
    fn processes(&self) -> Result<ProcessTable> {
        process_table::snapshot(&self.proc_root)
    }

    fn listening_sockets(&self) -> Result<Vec<SocketRecord>> {
        socket_table::read_listening_sockets(&self.proc_root)
    }

    fn inode_index(&self) -> InodeIndex {
        InodeIndex::scan(&self.proc_root)
    }
}

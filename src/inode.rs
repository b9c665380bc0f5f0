/// Módulo de resolución inodo de socket → PID.
///
/// Recorre los descriptores de archivo de todos los procesos buscando
/// enlaces `socket:[INODO]`. El coste es proporcional al total de
/// descriptores abiertos del sistema, por eso el índice se construye una sola
/// vez por escaneo y se consulta para todos los puertos.
use std::collections::HashMap;
use std::path::Path;

use procfs::process::FDTarget;

/// Índice inodo → PID dueño, válido solo para el escaneo que lo construyó
#[derive(Debug, Default, Clone)]
pub struct InodeIndex {
    owners: HashMap<u64, i32>,
}

impl InodeIndex {
    /// Construye el índice escaneando `/proc/<pid>/fd` de cada proceso.
    ///
    /// Los procesos cuyos descriptores no se pueden leer (sin permisos,
    /// terminados durante el escaneo) se omiten sin error.
    pub fn scan(proc_root: &Path) -> Self {
        let mut index = Self::default();

        let processes = match procfs::process::all_processes_with_root(proc_root) {
            Ok(processes) => processes,
            Err(e) => {
                log::warn!("No se pudo listar {}: {}", proc_root.display(), e);
                return index;
            }
        };

        for process in processes.flatten() {
            let pid = process.pid();
            let Ok(fds) = process.fd() else {
                continue;
            };
            for fd in fds.flatten() {
                if let FDTarget::Socket(inode) = fd.target {
                    index.insert(inode, pid);
                }
            }
        }

        log::debug!("Índice de inodos: {} sockets con dueño", index.len());
        index
    }

    /// Registra un socket; si el inodo ya tiene dueño gana el primero.
    pub fn insert(&mut self, inode: u64, pid: i32) {
        self.owners.entry(inode).or_insert(pid);
    }

    /// PID dueño del inodo, o `None` si pertenece a otro namespace
    /// (contenedores) o su proceso no se pudo escanear.
    pub fn resolve(&self, inode: u64) -> Option<i32> {
        self.owners.get(&inode).copied()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

impl FromIterator<(u64, i32)> for InodeIndex {
    fn from_iter<I: IntoIterator<Item = (u64, i32)>>(iter: I) -> Self {
        let mut index = Self::default();
        for (inode, pid) in iter {
            index.insert(inode, pid);
        }
        index
    }
}

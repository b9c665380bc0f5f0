/// Módulo de lectura de la tabla de procesos.
///
/// Construye un snapshot `PID → ProcessRecord` a partir de `/proc` usando
/// `procfs`. Cada campo se lee de forma independiente: si un proceso no
/// permite leer su línea de comandos (sandbox, otro usuario, etc.) ese campo
/// queda vacío y el resto del snapshot continúa.
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use nix::unistd::{Uid, User};
use procfs::process::Process;
use serde::Serialize;

use crate::error::Result;

/// Snapshot de la tabla de procesos indexado por PID
pub type ProcessTable = HashMap<i32, ProcessRecord>;

/// Información de un proceso en un instante dado.
///
/// Es un valor inmutable: se vuelve a crear en cada escaneo.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessRecord {
    pub pid: i32,
    /// PID del padre (0 o 1 significa "sin padre relevante")
    pub ppid: i32,
    pub name: String,
    pub cmdline: String,
    pub username: String,
    /// Instante de creación en segundos Unix (0 si no se pudo leer)
    pub create_time: u64,
    pub memory_mb: f64,
    pub cwd: String,
    /// Unidad de systemd que contiene al proceso, si la hay
    pub service_unit: Option<String>,
}

impl ProcessRecord {
    /// Crea un registro sintético para sockets sin proceso asociado.
    ///
    /// Los consumidores nunca reciben un proceso nulo: cuando el kernel no
    /// expone el dueño del socket se muestra este marcador.
    pub fn placeholder(name: &str, cmdline: &str, username: &str) -> Self {
        Self {
            name: name.to_string(),
            cmdline: cmdline.to_string(),
            username: username.to_string(),
            ..Default::default()
        }
    }
}

impl std::fmt::Display for ProcessRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (PID: {}, PPID: {})", self.name, self.pid, self.ppid)
    }
}

/// Escanea todos los procesos visibles bajo `proc_root`.
///
/// Solo falla si no se puede listar el directorio proc en sí; los procesos
/// que desaparecen durante el escaneo simplemente se omiten.
pub fn snapshot(proc_root: &Path) -> Result<ProcessTable> {
    let processes = procfs::process::all_processes_with_root(proc_root)?;

    let boot_time = procfs::boot_time_secs().unwrap_or_else(|e| {
        log::debug!("No se pudo leer el boot time: {}", e);
        0
    });
    let clock = ProcessClock {
        boot_time,
        ticks_per_second: procfs::ticks_per_second().max(1),
        page_size: procfs::page_size(),
    };

    let mut users = UserCache::default();
    let mut table = ProcessTable::new();

    for process in processes {
        let process = match process {
            Ok(process) => process,
            Err(e) => {
                log::debug!("Proceso omitido durante el escaneo: {}", e);
                continue;
            }
        };
        let record = read_record(&process, proc_root, &clock, &mut users);
        table.insert(record.pid, record);
    }

    log::debug!("Tabla de procesos: {} procesos", table.len());
    Ok(table)
}

/// Constantes del sistema necesarias para convertir los campos de `stat`
struct ProcessClock {
    boot_time: u64,
    ticks_per_second: u64,
    page_size: u64,
}

/// Lee un proceso campo por campo, degradando cada fallo a su valor vacío.
fn read_record(
    process: &Process,
    proc_root: &Path,
    clock: &ProcessClock,
    users: &mut UserCache,
) -> ProcessRecord {
    let pid = process.pid();

    let cmdline = process
        .cmdline()
        .map(|args| args.join(" "))
        .unwrap_or_default();

    let mut record = ProcessRecord {
        pid,
        cmdline,
        ..Default::default()
    };

    match process.stat() {
        Ok(stat) => {
            record.ppid = stat.ppid;
            record.name = stat.comm;
            record.create_time = clock.boot_time + stat.starttime / clock.ticks_per_second;
            record.memory_mb = (stat.rss * clock.page_size) as f64 / (1024.0 * 1024.0);
        }
        Err(e) => {
            log::debug!("stat ilegible para PID {}: {}", pid, e);
            record.name = name_from_cmdline(&record.cmdline);
        }
    }

    if let Ok(uid) = process.uid() {
        record.username = users.name_for(uid);
    }

    if let Ok(cwd) = process.cwd() {
        record.cwd = cwd.to_string_lossy().to_string();
    }

    record.service_unit = fs::read_to_string(proc_root.join(pid.to_string()).join("cgroup"))
        .ok()
        .and_then(|cgroup| service_unit_from_cgroup(&cgroup));

    record
}

/// Nombre corto a partir del primer argumento de la línea de comandos.
fn name_from_cmdline(cmdline: &str) -> String {
    cmdline
        .split_whitespace()
        .next()
        .and_then(|exe| exe.trim_end_matches('/').rsplit('/').next())
        .unwrap_or_default()
        .to_string()
}

/// Extrae la unidad `.service` de un archivo `/proc/<pid>/cgroup`.
///
/// Formato v2: `0::/system.slice/nginx.service`. Se usa el último segmento
/// `*.service` de la ruta, así las sesiones de usuario
/// (`user@1000.service/app.slice/foo.service`) devuelven la unidad más interna.
pub fn service_unit_from_cgroup(cgroup: &str) -> Option<String> {
    cgroup
        .lines()
        .filter_map(|line| line.splitn(3, ':').nth(2))
        .flat_map(|path| path.split('/'))
        .filter(|segment| segment.ends_with(".service"))
        .last()
        .map(str::to_string)
}

/// Caché UID → nombre de usuario para no consultar passwd por cada proceso
#[derive(Default)]
struct UserCache {
    names: HashMap<u32, String>,
}

impl UserCache {
    fn name_for(&mut self, uid: u32) -> String {
        self.names
            .entry(uid)
            .or_insert_with(|| match User::from_uid(Uid::from_raw(uid)) {
                Ok(Some(user)) => user.name,
                _ => uid.to_string(),
            })
            .clone()
    }
}

/// Estado de observación de puertos.
///
/// Fusiona en cada escaneo la tabla de sockets, la tabla de procesos y el
/// índice de inodos en una vista por puerto, y recuerda entre escaneos
/// cuándo se vio cada par (puerto, PID) por primera y última vez.
///
/// ## Ciclo de vida de una observación
/// - Se crea la primera vez que aparece su clave (puerto, PID dueño).
/// - Se actualiza en cada escaneo en el que vuelve a aparecer.
/// - Cada escaneo en el que falta incrementa su contador de ausencias; al
///   superar la tolerancia se elimina.
///
/// La clave no usa el inodo: el kernel lo reutiliza entre sockets distintos.
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};

use crate::classify::{self, AgeBucket, Category, Classification, Classifier, Insight, ProjectInfo};
use crate::error::Result;
use crate::inode::InodeIndex;
use crate::interface::InterfaceClass;
use crate::process_table::{ProcessRecord, ProcessTable};
use crate::socket_table::SocketRecord;
use crate::source::SystemSource;

/// Escaneos consecutivos que una observación puede faltar antes de eliminarse
pub const DEFAULT_MISS_TOLERANCE: u32 = 3;

/// Antigüedad mínima para considerar un puerto olvidado
pub const DEFAULT_FORGOTTEN_THRESHOLD: Duration = Duration::from_secs(10 * 60);

// ─────────────────────────────────────────────────────────────
// Tipos expuestos
// ─────────────────────────────────────────────────────────────

/// Actividad de las colas del socket respecto al escaneo anterior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrafficInfo {
    pub tx_queue: u64,
    pub rx_queue: u64,
    pub is_active: bool,
}

/// Etiquetas de riesgo de una observación
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Risk {
    /// El padre del proceso ya no existe
    OrphanedProcess,
    /// El kernel no expone el proceso dueño del socket
    HiddenProcess,
    /// Servicio de desarrollo accesible desde fuera de la máquina
    PublicExposure,
}

/// Copia de solo lectura de una observación, tal como se entrega al exterior
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortObservation {
    pub port: u16,
    pub local_addr: String,
    pub interface: InterfaceClass,
    /// `None` cuando el socket no se pudo asociar a ningún proceso
    pub pid: Option<i32>,
    pub process: ProcessRecord,
    #[serde(serialize_with = "serialize_unix_secs")]
    pub first_seen: SystemTime,
    #[serde(serialize_with = "serialize_unix_secs")]
    pub last_seen: SystemTime,
    pub orphaned: bool,
    pub insight: Insight,
    pub traffic: TrafficInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub risks: Vec<Risk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectInfo>,
}

fn serialize_unix_secs<S: Serializer>(time: &SystemTime, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    serializer.serialize_u64(secs)
}

/// Datos crudos de un escaneo, capturados fuera del lock
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    pub processes: ProcessTable,
    pub sockets: Vec<SocketRecord>,
    pub inodes: InodeIndex,
}

impl SystemSnapshot {
    /// Enumera procesos, sockets e inodos. Es la parte costosa del escaneo.
    pub fn capture(source: &dyn SystemSource) -> Result<Self> {
        Ok(Self {
            processes: source.processes()?,
            sockets: source.listening_sockets()?,
            inodes: source.inode_index(),
        })
    }
}

// ─────────────────────────────────────────────────────────────
// Estado interno
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ObservationKey {
    port: u16,
    pid: Option<i32>,
}

#[derive(Debug, Clone)]
struct ObservationEntry {
    first_seen: SystemTime,
    last_seen: SystemTime,
    misses: u32,
    last_tx: u64,
    last_rx: u64,
}

impl ObservationEntry {
    fn new(now: SystemTime) -> Self {
        Self {
            first_seen: now,
            last_seen: now,
            misses: 0,
            last_tx: 0,
            last_rx: 0,
        }
    }
}

/// Socket ya resuelto a su proceso, antes de enriquecerlo
struct ResolvedSocket<'a> {
    socket: &'a SocketRecord,
    key: ObservationKey,
    process: Option<&'a ProcessRecord>,
    noise: bool,
}

/// Resultado de la sección crítica para un socket
struct Refreshed {
    first_seen: SystemTime,
    last_seen: SystemTime,
    is_active: bool,
}

// ─────────────────────────────────────────────────────────────
// Tracker
// ─────────────────────────────────────────────────────────────

/// Dueño exclusivo de la tabla de observaciones.
///
/// Se comparte entre peticiones por referencia (`Arc<Engine>`); el lock se
/// toma solo para crear, actualizar y eliminar entradas, nunca durante la
/// enumeración de procesos o sockets.
#[derive(Debug)]
pub struct PortTracker {
    state: Mutex<HashMap<ObservationKey, ObservationEntry>>,
    classifier: Classifier,
    miss_tolerance: u32,
    forgotten_threshold: Duration,
}

impl PortTracker {
    pub fn new(classifier: Classifier, miss_tolerance: u32, forgotten_threshold: Duration) -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
            classifier,
            miss_tolerance,
            forgotten_threshold,
        }
    }

    /// Escanea el sistema y actualiza el estado.
    pub fn poll(&self, source: &dyn SystemSource) -> Result<Vec<PortObservation>> {
        let snapshot = SystemSnapshot::capture(source)?;
        Ok(self.observe(&snapshot, SystemTime::now()))
    }

    /// Fusiona un snapshot ya capturado en el estado y devuelve la vista.
    ///
    /// # Arguments
    /// * `snapshot` - Procesos, sockets e inodos de este escaneo
    /// * `now` - Instante del escaneo
    ///
    /// # Returns
    /// Una observación por puerto, ordenadas por número de puerto.
    pub fn observe(&self, snapshot: &SystemSnapshot, now: SystemTime) -> Vec<PortObservation> {
        let resolved: Vec<ResolvedSocket<'_>> = snapshot
            .sockets
            .iter()
            .map(|socket| {
                let pid = snapshot.inodes.resolve(socket.inode);
                let process = pid.and_then(|pid| snapshot.processes.get(&pid));
                let noise =
                    process.is_some_and(|p| classify::is_noise_process(&p.cmdline, &p.name));
                ResolvedSocket {
                    socket,
                    key: ObservationKey {
                        port: socket.port,
                        pid,
                    },
                    process,
                    noise,
                }
            })
            .collect();

        let refreshed = self.refresh_state(&resolved, now);

        let mut by_port: BTreeMap<u16, PortObservation> = BTreeMap::new();
        for (resolved, refreshed) in resolved.iter().zip(refreshed) {
            // Ruido: se envejece igual pero no se expone
            if resolved.noise {
                continue;
            }

            let observation = self.enrich(resolved, refreshed, &snapshot.processes, now);
            match by_port.get(&observation.port) {
                Some(existing) if existing.interface.rank() >= observation.interface.rank() => {}
                _ => {
                    by_port.insert(observation.port, observation);
                }
            }
        }

        log::debug!(
            "Escaneo: {} sockets, {} puertos visibles",
            snapshot.sockets.len(),
            by_port.len()
        );
        by_port.into_values().collect()
    }

    /// Sección crítica: upsert de las claves vistas, ausencias y expulsión.
    ///
    /// Todo el trabajo de un escaneo sobre el estado ocurre bajo un único
    /// lock, así un escaneo concurrente no puede envejecer entradas que otro
    /// acaba de refrescar.
    fn refresh_state(&self, resolved: &[ResolvedSocket<'_>], now: SystemTime) -> Vec<Refreshed> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        // Profundidad de colas previa de cada clave, antes de tocarla
        let mut previous: HashMap<ObservationKey, (u64, u64)> = HashMap::new();
        let mut refreshed = Vec::with_capacity(resolved.len());

        for item in resolved {
            let entry = state
                .entry(item.key)
                .or_insert_with(|| ObservationEntry::new(now));

            let (prev_tx, prev_rx) = match previous.get(&item.key) {
                Some(&depths) => {
                    entry.last_tx = entry.last_tx.max(item.socket.tx_queue);
                    entry.last_rx = entry.last_rx.max(item.socket.rx_queue);
                    depths
                }
                None => {
                    let depths = (entry.last_tx, entry.last_rx);
                    previous.insert(item.key, depths);
                    entry.last_tx = item.socket.tx_queue;
                    entry.last_rx = item.socket.rx_queue;
                    depths
                }
            };

            entry.last_seen = now;
            entry.misses = 0;

            refreshed.push(Refreshed {
                first_seen: entry.first_seen,
                last_seen: entry.last_seen,
                is_active: item.socket.tx_queue > prev_tx || item.socket.rx_queue > prev_rx,
            });
        }

        let tolerance = self.miss_tolerance;
        state.retain(|key, entry| {
            if previous.contains_key(key) {
                return true;
            }
            entry.misses += 1;
            if entry.misses > tolerance {
                log::debug!(
                    "Observación expulsada: puerto {} (PID {:?}) tras {} ausencias",
                    key.port,
                    key.pid,
                    entry.misses
                );
                return false;
            }
            true
        });

        refreshed
    }

    /// Construye la vista exterior de un socket (fuera del lock).
    fn enrich(
        &self,
        resolved: &ResolvedSocket<'_>,
        refreshed: Refreshed,
        processes: &ProcessTable,
        now: SystemTime,
    ) -> PortObservation {
        let socket = resolved.socket;
        let interface = InterfaceClass::classify(&socket.local_addr);
        let age = now.duration_since(refreshed.first_seen).unwrap_or_default();
        let mut risks = Vec::new();
        let mut orphaned = false;

        let (process, insight, project) = match resolved.process {
            Some(process) => {
                let parent = processes.get(&process.ppid);
                if process.ppid > 1 && parent.is_none() {
                    orphaned = true;
                    risks.push(Risk::OrphanedProcess);
                }

                let classification = self.classifier.explain(&process.cmdline, &process.name);
                let (is_forgotten, forgotten_reasons) =
                    classify::is_forgotten_port(age, self.forgotten_threshold, process, parent);
                let insight = build_insight(classification, age, is_forgotten, forgotten_reasons);

                (process.clone(), insight, classify::project_from_cwd(&process.cwd))
            }
            None => match classify::classify_port(socket.port).filter(|c| c.category != Category::System) {
                Some(classification) => {
                    let placeholder = ProcessRecord::placeholder(
                        &classification.label,
                        &classification.label,
                        "N/A",
                    );
                    (placeholder, build_insight(classification, age, false, Vec::new()), None)
                }
                None => {
                    risks.push(Risk::HiddenProcess);
                    let placeholder = ProcessRecord::placeholder(
                        "UNKNOWN",
                        "Unknown process (likely Docker or System)",
                        "unknown",
                    );
                    let classification = classify::unidentified(socket.port);
                    (placeholder, build_insight(classification, age, false, Vec::new()), None)
                }
            },
        };

        if interface.is_exposed() && insight.category == Category::Dev {
            risks.push(Risk::PublicExposure);
        }

        PortObservation {
            port: socket.port,
            local_addr: socket.local_addr.clone(),
            interface,
            pid: resolved.key.pid,
            process,
            first_seen: refreshed.first_seen,
            last_seen: refreshed.last_seen,
            orphaned,
            insight,
            traffic: TrafficInfo {
                tx_queue: socket.tx_queue,
                rx_queue: socket.rx_queue,
                is_active: refreshed.is_active,
            },
            risks,
            project,
        }
    }

    /// Cantidad de claves (puerto, PID) seguidas, incluidas las de ruido.
    pub fn tracked_len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn build_insight(
    classification: Classification,
    age: Duration,
    is_forgotten: bool,
    forgotten_reasons: Vec<String>,
) -> Insight {
    Insight {
        explanation: classification.label,
        icon: classification.icon,
        category: classification.category,
        age_category: AgeBucket::from_age(age),
        age_duration: classify::format_age(age),
        is_forgotten,
        forgotten_reasons,
    }
}

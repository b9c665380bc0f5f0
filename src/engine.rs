/// Fachada del motor: la superficie de consulta que usan el CLI y el tray.
///
/// `Engine` es el dueño del estado de observaciones durante toda la vida del
/// proceso y se comparte entre hilos con `Arc<Engine>`. Cada petición se
/// ejecuta aislada: un pánico dentro de una petición se convierte en
/// `EngineError::Internal` y no afecta a las demás.
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, error, info};

use crate::classify::Classifier;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::observation::{PortObservation, PortTracker, SystemSnapshot};
use crate::process_table::ProcessRecord;
use crate::safety::SafetyPolicy;
use crate::service::{self, ServiceStopResult};
use crate::simulate::{self, KillSimulation};
use crate::source::{ProcfsSource, SystemSource};
use crate::terminate::{KillOutcome, NixSignaller, Signaller, Terminator};

pub struct Engine {
    config: EngineConfig,
    tracker: PortTracker,
    policy: SafetyPolicy,
    source: Box<dyn SystemSource>,
    terminator: Terminator,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("tracked", &self.tracker.tracked_len())
            .finish()
    }
}

impl Engine {
    /// Motor sobre el `/proc` real y señales reales.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let source = ProcfsSource::new(config.proc_root.clone());
        Self::with_parts(config, Box::new(source), Box::new(NixSignaller))
    }

    /// Motor con fuente de datos y emisor de señales inyectados.
    pub fn with_parts(
        config: EngineConfig,
        source: Box<dyn SystemSource>,
        signaller: Box<dyn Signaller>,
    ) -> Result<Self> {
        let tracker = PortTracker::new(
            Classifier::new()?,
            config.miss_tolerance,
            config.forgotten_threshold,
        );
        let terminator = Terminator::new(
            signaller,
            config.term_poll_interval,
            config.term_max_attempts,
        );

        Ok(Self {
            policy: config.safety_policy(),
            config,
            tracker,
            source,
            terminator,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    /// Observaciones actuales. Cada llamada es un escaneo nuevo.
    pub fn ports(&self) -> Result<Vec<PortObservation>> {
        self.guarded("ports", || {
            let observations = self.tracker.poll(self.source.as_ref())?;
            debug!(
                "Escaneo: {} puertos visibles, {} en seguimiento",
                observations.len(),
                self.tracker.tracked_len()
            );
            Ok(observations)
        })
    }

    /// Tabla de procesos ordenada por PID.
    pub fn processes(&self) -> Result<Vec<ProcessRecord>> {
        self.guarded("processes", || {
            let mut processes: Vec<ProcessRecord> =
                self.source.processes()?.into_values().collect();
            processes.sort_by_key(|p| p.pid);
            Ok(processes)
        })
    }

    /// Análisis de impacto de terminar `pid`, sin efectos sobre el proceso.
    ///
    /// Procesos y puertos salen del mismo snapshot crudo, sin pasar por el
    /// seguimiento: no altera antigüedades ni contadores de ausencia.
    pub fn simulate_kill(&self, pid: i32) -> Result<KillSimulation> {
        self.guarded("simulate", || {
            let snapshot = SystemSnapshot::capture(self.source.as_ref())?;
            Ok(simulate::simulate_kill(pid, &snapshot, &self.policy))
        })
    }

    /// Termina `pid`. No consulta la política de seguridad: eso le
    /// corresponde al llamador a partir de `simulate_kill`.
    pub fn kill(&self, pid: i32, force: bool) -> Result<KillOutcome> {
        self.guarded("kill", || {
            info!("Terminando PID {} (force={})", pid, force);
            self.terminator.terminate(pid, force)
        })
    }

    pub fn stop_service(&self, name: &str) -> Result<ServiceStopResult> {
        self.guarded("stop-service", || service::stop_service(name))
    }

    /// Ejecuta una petición capturando cualquier pánico.
    fn guarded<T, F>(&self, request: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("Pánico en la petición {}: {}", request, message);
                Err(EngineError::Internal(format!("{}: {}", request, message)))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "pánico sin mensaje".to_string()
    }
}

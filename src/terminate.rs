/// Terminación de procesos con escalado SIGTERM → SIGKILL.
///
/// Cada petición recorre la máquina de estados
/// `Requested → SigtermSent → (GracefullyDead | Escalated) → SigkillSent → (Dead | Failed)`.
/// La espera es acotada: bloquea al hilo llamador como mucho
/// `poll_interval * max_attempts`. Quien necesite respuesta inmediata debe
/// lanzar la petición en su propio hilo y puede abandonar la espera sin
/// deshacer nada.
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use serde::Serialize;

use crate::error::{EngineError, Result};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Envío de señales. `None` es la comprobación de existencia (señal 0).
pub trait Signaller: Send + Sync {
    fn send(&self, pid: i32, signal: Option<Signal>) -> nix::Result<()>;
}

/// Señales reales vía `kill(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NixSignaller;

impl Signaller for NixSignaller {
    fn send(&self, pid: i32, signal: Option<Signal>) -> nix::Result<()> {
        signal::kill(Pid::from_raw(pid), signal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KillState {
    Requested,
    SigtermSent,
    GracefullyDead,
    Escalated,
    SigkillSent,
    Dead,
    Failed,
}

/// Fase en la que terminó la petición
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KillPhase {
    Sigterm,
    Sigkill,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KillOutcome {
    pub success: bool,
    pub phase: KillPhase,
    pub message: String,
    #[serde(skip)]
    pub state: KillState,
}

impl KillOutcome {
    fn new(state: KillState, phase: KillPhase, message: impl Into<String>) -> Self {
        Self {
            success: !matches!(state, KillState::Failed),
            phase,
            message: message.into(),
            state,
        }
    }
}

pub struct Terminator {
    signaller: Box<dyn Signaller>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl Default for Terminator {
    fn default() -> Self {
        Self::new(Box::new(NixSignaller), DEFAULT_POLL_INTERVAL, DEFAULT_MAX_ATTEMPTS)
    }
}

impl std::fmt::Debug for Terminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminator")
            .field("poll_interval", &self.poll_interval)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl Terminator {
    pub fn new(signaller: Box<dyn Signaller>, poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            signaller,
            poll_interval,
            max_attempts,
        }
    }

    /// Termina `pid`.
    ///
    /// # Arguments
    /// * `pid` - Proceso objetivo; 0 o negativo se rechaza sin enviar nada
    /// * `force` - Salta directamente a SIGKILL
    ///
    /// # Returns
    /// `Err` solo para un PID inválido. Los fallos de entrega de la señal se
    /// informan como `KillOutcome` con `success = false`.
    pub fn terminate(&self, pid: i32, force: bool) -> Result<KillOutcome> {
        if pid <= 0 {
            return Err(EngineError::InvalidPid(pid));
        }

        let mut state = KillState::Requested;
        debug!("Kill PID {} solicitado (force={})", pid, force);

        if !force {
            match self.signaller.send(pid, Some(Signal::SIGTERM)) {
                Ok(()) => {
                    state = KillState::SigtermSent;
                    debug!("PID {}: {:?}", pid, state);
                    if self.wait_for_exit(pid) {
                        info!("PID {} terminó tras SIGTERM", pid);
                        return Ok(KillOutcome::new(
                            KillState::GracefullyDead,
                            KillPhase::Sigterm,
                            "Terminated gracefully",
                        ));
                    }
                    state = KillState::Escalated;
                    warn!("PID {} sigue vivo tras SIGTERM, escalando a SIGKILL", pid);
                }
                Err(Errno::ESRCH) => {
                    return Ok(KillOutcome::new(
                        KillState::GracefullyDead,
                        KillPhase::Sigterm,
                        "Process already exited",
                    ));
                }
                Err(e) => {
                    // SIGKILL decide el resultado final
                    warn!("SIGTERM a PID {} falló: {}", pid, e);
                }
            }
        }

        debug!("PID {}: {:?} → SigkillSent", pid, state);
        match self.signaller.send(pid, Some(Signal::SIGKILL)) {
            Ok(()) => {
                info!("SIGKILL enviado a PID {}", pid);
                Ok(KillOutcome::new(KillState::Dead, KillPhase::Sigkill, "Force terminated"))
            }
            Err(Errno::ESRCH) => Ok(KillOutcome::new(
                KillState::Dead,
                KillPhase::Sigkill,
                "Process already exited",
            )),
            Err(e) => {
                warn!("SIGKILL a PID {} falló: {}", pid, e);
                Ok(KillOutcome::new(
                    KillState::Failed,
                    KillPhase::Sigkill,
                    EngineError::Signal(e).to_string(),
                ))
            }
        }
    }

    /// Sondea la existencia de `pid` hasta `max_attempts` veces.
    fn wait_for_exit(&self, pid: i32) -> bool {
        for _ in 0..self.max_attempts {
            thread::sleep(self.poll_interval);
            if let Err(Errno::ESRCH) = self.signaller.send(pid, None) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Registra las señales enviadas y simula un proceso que muere tras
    /// `dies_after` sondeos de existencia.
    #[derive(Default)]
    struct RecordingSignaller {
        sent: Arc<Mutex<Vec<Option<Signal>>>>,
        dies_after: Option<usize>,
        already_gone: bool,
        deny_with: Option<Errno>,
    }

    impl Signaller for RecordingSignaller {
        fn send(&self, _pid: i32, signal: Option<Signal>) -> nix::Result<()> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(signal);
            if self.already_gone {
                return Err(Errno::ESRCH);
            }
            if let Some(errno) = self.deny_with {
                return Err(errno);
            }
            let liveness_checks = sent.iter().filter(|s| s.is_none()).count();
            match (signal, self.dies_after) {
                (None, Some(limit)) if liveness_checks >= limit => Err(Errno::ESRCH),
                _ => Ok(()),
            }
        }
    }

    fn terminator(signaller: RecordingSignaller) -> (Terminator, Arc<Mutex<Vec<Option<Signal>>>>) {
        let sent = Arc::clone(&signaller.sent);
        (Terminator::new(Box::new(signaller), Duration::ZERO, 8), sent)
    }

    #[test]
    fn test_rejects_kernel_pids_before_signalling() {
        for pid in [0, -1, -4242] {
            let (term, sent) = terminator(RecordingSignaller::default());
            assert!(matches!(term.terminate(pid, false), Err(EngineError::InvalidPid(p)) if p == pid));
            assert!(matches!(term.terminate(pid, true), Err(EngineError::InvalidPid(_))));
            assert!(sent.lock().unwrap().is_empty());
        }
    }

    #[test]
    fn test_graceful_exit() {
        let (term, sent) = terminator(RecordingSignaller {
            dies_after: Some(3),
            ..Default::default()
        });

        let outcome = term.terminate(4242, false).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.phase, KillPhase::Sigterm);
        assert_eq!(outcome.state, KillState::GracefullyDead);

        let sent = sent.lock().unwrap();
        assert_eq!(sent[0], Some(Signal::SIGTERM));
        assert!(!sent.contains(&Some(Signal::SIGKILL)));
    }

    #[test]
    fn test_escalates_after_bounded_wait() {
        let (term, sent) = terminator(RecordingSignaller::default());

        let outcome = term.terminate(4242, false).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.phase, KillPhase::Sigkill);
        assert_eq!(outcome.state, KillState::Dead);

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1 + 8 + 1);
        assert_eq!(sent.last(), Some(&Some(Signal::SIGKILL)));
    }

    #[test]
    fn test_force_skips_graceful_phase() {
        let (term, sent) = terminator(RecordingSignaller::default());

        let outcome = term.terminate(4242, true).unwrap();
        assert_eq!(outcome.phase, KillPhase::Sigkill);
        assert_eq!(*sent.lock().unwrap(), vec![Some(Signal::SIGKILL)]);
    }

    /// Un proceso que ya no existe cuenta como éxito
    #[test]
    fn test_vanished_process_is_success() {
        let (term, _) = terminator(RecordingSignaller {
            already_gone: true,
            ..Default::default()
        });
        let outcome = term.terminate(4242, false).unwrap();
        assert!(outcome.success);

        let (term, _) = terminator(RecordingSignaller {
            already_gone: true,
            ..Default::default()
        });
        assert!(term.terminate(4242, true).unwrap().success);
    }

    #[test]
    fn test_permission_denied_reports_cause() {
        let (term, sent) = terminator(RecordingSignaller {
            deny_with: Some(Errno::EPERM),
            ..Default::default()
        });

        let outcome = term.terminate(1234, false).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.state, KillState::Failed);
        assert_eq!(outcome.phase, KillPhase::Sigkill);
        assert!(!outcome.message.is_empty());
        // SIGTERM fallido pasa directo a SIGKILL, sin sondeos
        assert_eq!(sent.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = KillOutcome::new(KillState::GracefullyDead, KillPhase::Sigterm, "ok");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["phase"], "sigterm");
        assert!(json.get("state").is_none());
    }

    /// Termina de verdad un hijo propio con SIGTERM
    #[test]
    fn test_terminates_spawned_child() {
        let mut child = match std::process::Command::new("sleep").arg("30").spawn() {
            Ok(child) => child,
            Err(_) => return,
        };
        let pid = child.id() as i32;

        // Recoge al hijo en segundo plano para que no quede zombi
        let reaper = std::thread::spawn(move || child.wait());

        let term = Terminator::new(Box::new(NixSignaller), Duration::from_millis(100), 20);
        let outcome = term.terminate(pid, false).unwrap();
        assert!(outcome.success);

        let status = reaper.join().unwrap().unwrap();
        assert!(!status.success());
    }
}

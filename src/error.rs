/// Tipos de error del motor.
///
/// Solo llegan aquí los fallos que abortan una petición completa. Los campos
/// que no se pueden leer de un proceso o socket concreto se degradan a valores
/// vacíos en su lector correspondiente y nunca se convierten en `EngineError`.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Error de E/S: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error leyendo /proc: {0}")]
    Proc(#[from] procfs::ProcError),

    /// PID 0 o negativo: el proceso idle del kernel o un grupo de procesos.
    #[error("No se puede terminar el proceso del kernel (PID {0})")]
    InvalidPid(i32),

    #[error("Error enviando señal: {0}")]
    Signal(#[from] nix::errno::Errno),

    #[error("Patrón de clasificación inválido: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Error del gestor de servicios: {0}")]
    Service(String),

    #[error("Error JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Pánico capturado en el límite de una petición.
    #[error("Fallo interno: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

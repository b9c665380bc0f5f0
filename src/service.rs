/// Parada de unidades de systemd.
///
/// Delega en `systemctl stop`; sin reintentos ni marcha atrás.
use std::process::Command;

use log::{info, warn};
use serde::Serialize;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStopResult {
    pub success: bool,
    pub message: String,
}

/// Valida un nombre de unidad antes de pasarlo al gestor de servicios.
///
/// Un nombre que empieza por `-` se interpretaría como opción de `systemctl`.
pub fn validate_service_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EngineError::Service("Nombre de servicio vacío".to_string()));
    }
    if name.starts_with('-') || name.chars().any(char::is_whitespace) {
        return Err(EngineError::Service(format!(
            "Nombre de servicio inválido: {}",
            name
        )));
    }
    Ok(name)
}

/// Detiene la unidad `name` con `systemctl stop`.
///
/// Un nombre inválido es `Err`; un fallo de `systemctl` se devuelve como
/// resultado con la salida combinada en el mensaje.
pub fn stop_service(name: &str) -> Result<ServiceStopResult> {
    let name = validate_service_name(name)?;
    info!("Deteniendo servicio {}", name);

    let output = Command::new("systemctl").args(["stop", name]).output()?;

    if output.status.success() {
        return Ok(ServiceStopResult {
            success: true,
            message: format!("Service {} stopped successfully", name),
        });
    }

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    warn!("systemctl stop {} falló: {}", name, combined.trim());

    Ok(ServiceStopResult {
        success: false,
        message: format!(
            "Failed to stop service: {}. Output: {}",
            output.status,
            combined.trim()
        ),
    })
}

/// Políticas de seguridad para acciones destructivas.
///
/// Conjunto de predicados puros, sin estado: puertos protegidos, cuentas de
/// sistema y procesos críticos. La capa de seguridad solo informa; decidir si
/// se bloquea o solo se advierte es responsabilidad del llamador, salvo para
/// los procesos críticos por nombre, que siempre deben tratarse como bloqueo.
use serde::Serialize;

/// Puertos críticos del sistema (puerto, motivo)
pub const PROTECTED_PORTS: &[(u16, &str)] = &[
    (22, "SSH"),
    (53, "DNS"),
    (80, "HTTP (system)"),
    (443, "HTTPS (system)"),
    (2375, "Docker (unencrypted)"),
    (2376, "Docker (TLS)"),
    (2377, "Docker Swarm"),
    (3306, "MySQL"),
    (5432, "PostgreSQL"),
    (6379, "Redis"),
    (27017, "MongoDB"),
];

/// Cuentas de sistema cuyos procesos requieren confirmación explícita
pub const DEFAULT_PROTECTED_USERS: &[&str] = &["root", "systemd", "docker", "postgres", "mysql", "redis"];

/// Procesos que nunca se deben terminar desde esta herramienta
pub const CRITICAL_PROCESSES: &[&str] = &[
    "systemd",
    "init",
    "sshd",
    "dockerd",
    "containerd",
    "Xorg",
    "Xwayland",
    "gnome-shell",
    "kwin",
    "plasma",
];

/// Gravedad de una protección
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtectionLevel {
    /// El llamador puede anularla con confirmación explícita
    Advisory,
    /// No se debe anular
    Critical,
}

/// Motivo por el que un recurso está protegido
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Protection {
    pub level: ProtectionLevel,
    pub reason: String,
}

impl Protection {
    pub fn advisory(reason: impl Into<String>) -> Self {
        Self {
            level: ProtectionLevel::Advisory,
            reason: reason.into(),
        }
    }

    pub fn critical(reason: impl Into<String>) -> Self {
        Self {
            level: ProtectionLevel::Critical,
            reason: reason.into(),
        }
    }
}

/// Tratamiento de los procesos de root y de cuentas protegidas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootPolicy {
    /// Protección de nivel advertencia (se puede anular)
    #[default]
    Advisory,
    /// Se trata igual que un proceso crítico
    Block,
}

impl std::str::FromStr for RootPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "advisory" | "warn" => Ok(RootPolicy::Advisory),
            "block" | "deny" => Ok(RootPolicy::Block),
            other => Err(format!("Política de root desconocida: {}", other)),
        }
    }
}

/// Comprueba si un puerto es crítico para el sistema.
///
/// # Returns
/// `Some(motivo)` si el puerto está en la tabla de protegidos.
pub fn is_protected_port(port: u16) -> Option<&'static str> {
    PROTECTED_PORTS
        .iter()
        .find(|(protected, _)| *protected == port)
        .map(|(_, reason)| *reason)
}

/// Proceso crítico por nombre (comparación sin mayúsculas)
pub fn is_critical_process(name: &str) -> bool {
    CRITICAL_PROCESSES
        .iter()
        .any(|critical| critical.eq_ignore_ascii_case(name))
}

/// Política configurable: cuentas protegidas y tratamiento de root.
#[derive(Debug, Clone)]
pub struct SafetyPolicy {
    pub protected_users: Vec<String>,
    pub root_policy: RootPolicy,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            protected_users: DEFAULT_PROTECTED_USERS.iter().map(|u| u.to_string()).collect(),
            root_policy: RootPolicy::default(),
        }
    }
}

impl SafetyPolicy {
    pub fn new(protected_users: Vec<String>, root_policy: RootPolicy) -> Self {
        Self {
            protected_users,
            root_policy,
        }
    }

    pub fn is_protected_user(&self, username: &str) -> bool {
        username == "root"
            || self
                .protected_users
                .iter()
                .any(|user| user.eq_ignore_ascii_case(username))
    }

    /// Evalúa la protección de un proceso.
    ///
    /// Un proceso crítico por nombre siempre es `Critical`. Un proceso de
    /// root o de una cuenta protegida es `Advisory`, salvo que la política
    /// de root sea `Block`.
    pub fn check_process(&self, name: &str, username: &str) -> Option<Protection> {
        if is_critical_process(name) {
            return Some(Protection::critical(format!("System-critical process: {}", name)));
        }

        if self.is_protected_user(username) {
            let reason = format!("Process owned by system user: {}", username);
            return Some(match self.root_policy {
                RootPolicy::Advisory => Protection::advisory(reason),
                RootPolicy::Block => Protection::critical(reason),
            });
        }

        None
    }
}

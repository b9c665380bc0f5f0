/// Argumentos de línea de comandos.
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use portwatch::safety::RootPolicy;
use portwatch::EngineConfig;

#[derive(Parser, Debug)]
#[command(name = "portwatch", version)]
#[command(about = "Monitor de puertos TCP en escucha para Linux", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Salida en JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Escaneos consecutivos que un puerto puede faltar antes de olvidarlo
    #[arg(long, global = true, value_name = "N")]
    pub miss_tolerance: Option<u32>,

    /// Antigüedad a partir de la cual un puerto puede considerarse olvidado
    #[arg(long, global = true, value_name = "MIN")]
    pub forgotten_minutes: Option<u64>,

    /// Raíz del sistema de ficheros proc
    #[arg(long, global = true, value_name = "PATH")]
    pub proc_root: Option<PathBuf>,

    /// Tratamiento de procesos de root y cuentas de sistema
    #[arg(long, global = true, value_enum)]
    pub root_policy: Option<RootPolicyArg>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Icono en la bandeja del sistema (por defecto)
    Tray,

    /// Puertos en escucha
    Ports,

    /// Escaneos repetidos con seguimiento de antigüedad
    Watch {
        /// Segundos entre escaneos
        #[arg(long, default_value_t = 2)]
        interval: u64,

        /// Número de escaneos (0 = sin límite)
        #[arg(long, default_value_t = 0)]
        count: u64,
    },

    /// Tabla de procesos
    Processes,

    /// Impacto de terminar un proceso, sin enviar señales
    Simulate {
        pid: i32,
    },

    /// Termina un proceso (SIGTERM y, si no basta, SIGKILL)
    Kill {
        pid: i32,

        /// SIGKILL directamente
        #[arg(long)]
        force: bool,

        /// Confirma la terminación de recursos protegidos no críticos
        #[arg(long)]
        yes: bool,
    },

    /// Detiene una unidad de systemd
    StopService {
        name: String,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RootPolicyArg {
    Advisory,
    Block,
}

impl From<RootPolicyArg> for RootPolicy {
    fn from(arg: RootPolicyArg) -> Self {
        match arg {
            RootPolicyArg::Advisory => RootPolicy::Advisory,
            RootPolicyArg::Block => RootPolicy::Block,
        }
    }
}

impl Cli {
    /// Aplica los argumentos sobre la configuración del entorno.
    pub fn apply(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(n) = self.miss_tolerance {
            config.miss_tolerance = n;
        }
        if let Some(minutes) = self.forgotten_minutes {
            config.forgotten_threshold =
                std::time::Duration::from_secs(minutes.saturating_mul(60));
        }
        if let Some(root) = &self.proc_root {
            config.proc_root = root.clone();
        }
        if let Some(policy) = self.root_policy {
            config.root_policy = policy.into();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_tray() {
        let cli = Cli::parse_from(["portwatch"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.apply(EngineConfig::default()), EngineConfig::default());
    }

    #[test]
    fn test_kill_flags() {
        let cli = Cli::parse_from(["portwatch", "kill", "4242", "--force", "--json"]);
        assert!(cli.json);
        match cli.command {
            Some(Command::Kill { pid, force, yes }) => {
                assert_eq!(pid, 4242);
                assert!(force);
                assert!(!yes);
            }
            other => panic!("comando inesperado: {:?}", other),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "portwatch",
            "--miss-tolerance",
            "5",
            "--forgotten-minutes",
            "1",
            "--root-policy",
            "block",
            "ports",
        ]);
        let config = cli.apply(EngineConfig::default());
        assert_eq!(config.miss_tolerance, 5);
        assert_eq!(config.forgotten_threshold.as_secs(), 60);
        assert_eq!(config.root_policy, RootPolicy::Block);
    }

    /// `--forgotten-minutes` con el máximo de u64 no desborda
    #[test]
    fn test_forgotten_minutes_saturate() {
        let cli = Cli::parse_from([
            "portwatch",
            "--forgotten-minutes",
            "18446744073709551615",
            "ports",
        ]);
        let config = cli.apply(EngineConfig::default());
        assert_eq!(config.forgotten_threshold.as_secs(), u64::MAX);
    }
}

//! # PortWatch
//!
//! Monitor de puertos TCP en escucha para Linux, con icono en la bandeja
//! del sistema y línea de comandos.
//!
//! ## Características
//! - Asocia cada puerto a su proceso leyendo `/proc`
//! - Explica qué herramienta abrió el puerto y desde cuándo
//! - Detecta puertos olvidados, procesos huérfanos y servicios expuestos
//! - Simula el impacto antes de terminar un proceso
//! - Terminación escalonada SIGTERM → SIGKILL
//!
//! ## Uso
//! `portwatch` sin argumentos lanza el tray; `portwatch --help` lista los
//! subcomandos.

mod cli;
mod tray;

use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;

use cli::{Cli, Command};
use portwatch::classify::format_age;
use portwatch::observation::PortObservation;
use portwatch::process_table::ProcessRecord;
use portwatch::{Engine, EngineConfig, Result};

/// Desvincula el proceso de la terminal que lo inició.
///
/// `setsid()` crea una sesión sin terminal de control, de modo que el tray
/// no recibe SIGHUP al cerrarse la terminal y `portwatch &` se comporta
/// como `nohup portwatch &`.
fn daemonize() {
    // Falla si ya somos líder de sesión; en ese caso no hay nada que hacer
    if let Err(err) = nix::unistd::setsid() {
        log::debug!("setsid() no aplicable en este contexto: {err}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let tray_mode = matches!(cli.command, None | Some(Command::Tray));

    // Los subcomandos escriben en stdout; solo el tray registra a nivel info
    let default_level = if tray_mode { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();

    let config = cli.apply(EngineConfig::from_env());
    let engine = match Engine::new(config) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            log::error!("No se pudo iniciar el motor: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if tray_mode {
        log::info!("PortWatch v{} iniciando...", env!("CARGO_PKG_VERSION"));
        daemonize();
        tray::run_tray(engine);
        return ExitCode::SUCCESS;
    }

    match run(&cli, &engine) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, engine: &Engine) -> Result<ExitCode> {
    let json = cli.json;

    match &cli.command {
        None | Some(Command::Tray) => Ok(ExitCode::SUCCESS),

        Some(Command::Ports) => {
            let observations = engine.ports()?;
            if json {
                print_json(&observations)?;
            } else {
                print_ports(&observations);
            }
            Ok(ExitCode::SUCCESS)
        }

        Some(Command::Watch { interval, count }) => {
            let mut polls = 0u64;
            loop {
                let observations = engine.ports()?;
                polls += 1;
                if json {
                    println!("{}", serde_json::to_string(&observations)?);
                } else {
                    println!("── Escaneo {} ──", polls);
                    print_ports(&observations);
                }
                if *count > 0 && polls >= *count {
                    break;
                }
                thread::sleep(Duration::from_secs((*interval).max(1)));
            }
            Ok(ExitCode::SUCCESS)
        }

        Some(Command::Processes) => {
            let processes = engine.processes()?;
            if json {
                print_json(&processes)?;
            } else {
                print_processes(&processes);
            }
            Ok(ExitCode::SUCCESS)
        }

        Some(Command::Simulate { pid }) => {
            let sim = engine.simulate_kill(*pid)?;
            if json {
                print_json(&sim)?;
            } else {
                match &sim.target_process {
                    Some(process) => println!("Objetivo: {}", process),
                    None => println!("Objetivo: PID {} (no encontrado)", sim.target_pid),
                }
                println!("Procesos hijos: {}", sim.child_processes.len());
                for child in &sim.child_processes {
                    println!("  {}", child);
                }
                println!("Puertos afectados: {:?}", sim.affected_ports);
                if let Some(reason) = &sim.protected_reason {
                    println!("Protegido: {}", reason);
                }
                for warning in &sim.warnings {
                    println!("Aviso: {}", warning);
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Some(Command::Kill { pid, force, yes }) => {
            let sim = engine.simulate_kill(*pid)?;
            for warning in &sim.warnings {
                eprintln!("aviso: {}", warning);
            }
            if sim.blocks(*yes) {
                let reason = sim.protected_reason.as_deref().unwrap_or("recurso protegido");
                if sim.is_hard_block() {
                    eprintln!("bloqueado: {}", reason);
                } else {
                    eprintln!("protegido: {} (usa --yes para confirmar)", reason);
                }
                return Ok(ExitCode::FAILURE);
            }

            let outcome = engine.kill(*pid, *force)?;
            if json {
                print_json(&outcome)?;
            } else {
                println!("{:?}: {}", outcome.phase, outcome.message);
            }
            Ok(if outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Some(Command::StopService { name }) => {
            let result = engine.stop_service(name)?;
            if json {
                print_json(&result)?;
            } else {
                println!("{}", result.message);
            }
            Ok(if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_ports(observations: &[PortObservation]) {
    if observations.is_empty() {
        println!("No hay puertos en escucha");
        return;
    }

    println!(
        "{:<6} {:<8} {:<10} {:<9} {:<12} {:<16} {}",
        "PORT", "PID", "USER", "IFACE", "AGE", "PROCESS", "INSIGHT"
    );
    for obs in observations {
        let pid = obs.pid.map_or_else(|| "-".to_string(), |p| p.to_string());
        let mut insight = obs.insight.explanation.clone();
        if obs.insight.is_forgotten {
            insight.push_str(" [olvidado]");
        }
        if let Some(project) = &obs.project {
            insight.push_str(&format!(" ({})", project.name));
        }
        println!(
            "{:<6} {:<8} {:<10} {:<9} {:<12} {:<16} {}",
            obs.port,
            pid,
            truncate(&obs.process.username, 10),
            obs.interface.label(),
            obs.insight.age_duration,
            truncate(&obs.process.name, 16),
            insight
        );
    }
}

fn print_processes(processes: &[ProcessRecord]) {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    println!(
        "{:<8} {:<8} {:<10} {:>9} {:<10} {}",
        "PID", "PPID", "USER", "MEM(MB)", "UPTIME", "COMMAND"
    );
    for p in processes {
        let uptime = if p.create_time > 0 && now >= p.create_time {
            format_age(Duration::from_secs(now - p.create_time))
        } else {
            "-".to_string()
        };
        let command = if p.cmdline.is_empty() { &p.name } else { &p.cmdline };
        println!(
            "{:<8} {:<8} {:<10} {:>9.1} {:<10} {}",
            p.pid,
            p.ppid,
            truncate(&p.username, 10),
            p.memory_mb,
            uptime,
            truncate(command, 80)
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

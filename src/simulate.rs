/// Simulación de impacto de terminar un proceso (dry run).
///
/// Calcula sin efectos secundarios qué procesos y puertos caerían junto con
/// el objetivo y si alguno está protegido. Es idempotente: con las mismas
/// entradas devuelve siempre el mismo resultado.
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::classify;
use crate::inode::InodeIndex;
use crate::observation::SystemSnapshot;
use crate::process_table::{ProcessRecord, ProcessTable};
use crate::safety::{self, Protection, ProtectionLevel, SafetyPolicy};
use crate::socket_table::SocketRecord;

/// Resultado del análisis de impacto
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KillSimulation {
    pub target_pid: i32,
    pub target_process: Option<ProcessRecord>,
    /// Descendientes transitivos, ordenados por PID
    pub child_processes: Vec<ProcessRecord>,
    /// Puertos distintos del objetivo y sus descendientes, ordenados
    pub affected_ports: Vec<u16>,
    pub is_protected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protection_level: Option<ProtectionLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protected_reason: Option<String>,
    pub warnings: Vec<String>,
}

impl KillSimulation {
    /// Bloqueo que el llamador no debe anular
    pub fn is_hard_block(&self) -> bool {
        self.protection_level == Some(ProtectionLevel::Critical)
    }

    /// `confirmed` anula solo las protecciones de nivel advertencia.
    pub fn blocks(&self, confirmed: bool) -> bool {
        self.is_hard_block() || (self.is_protected && !confirmed)
    }
}

/// Encuentra todos los descendientes de `pid`.
///
/// Recorre el árbol en anchura con un conjunto de visitados: una lectura
/// concurrente de `/proc` puede producir ciclos o auto-referencias y el
/// recorrido debe terminar igualmente.
pub fn descendants(pid: i32, processes: &ProcessTable) -> Vec<ProcessRecord> {
    let mut children: HashMap<i32, Vec<i32>> = HashMap::new();
    for process in processes.values() {
        children.entry(process.ppid).or_default().push(process.pid);
    }

    let mut visited: HashSet<i32> = HashSet::from([pid]);
    let mut queue: VecDeque<i32> = VecDeque::from([pid]);
    let mut found: Vec<ProcessRecord> = Vec::new();

    while let Some(parent) = queue.pop_front() {
        let Some(kids) = children.get(&parent) else {
            continue;
        };
        for &child in kids {
            if !visited.insert(child) {
                continue;
            }
            if let Some(record) = processes.get(&child) {
                found.push(record.clone());
            }
            queue.push_back(child);
        }
    }

    found.sort_by_key(|p| p.pid);
    found
}

/// Puertos cuyo dueño es `pid` o alguno de sus descendientes.
///
/// Trabaja sobre los sockets crudos del escaneo: un puerto compartido con
/// otro proceso o con un proceso filtrado de la vista sigue contando.
pub fn affected_ports(
    pid: i32,
    children: &[ProcessRecord],
    sockets: &[SocketRecord],
    inodes: &InodeIndex,
) -> Vec<u16> {
    let pids: HashSet<i32> = std::iter::once(pid)
        .chain(children.iter().map(|c| c.pid))
        .collect();

    sockets
        .iter()
        .filter(|socket| {
            inodes
                .resolve(socket.inode)
                .is_some_and(|owner| pids.contains(&owner))
        })
        .map(|socket| socket.port)
        .collect::<BTreeSet<u16>>()
        .into_iter()
        .collect()
}

/// Análisis completo de terminar `pid`.
///
/// # Arguments
/// * `pid` - Proceso objetivo
/// * `snapshot` - Procesos, sockets e inodos de un mismo escaneo
/// * `policy` - Política de seguridad vigente
pub fn simulate_kill(pid: i32, snapshot: &SystemSnapshot, policy: &SafetyPolicy) -> KillSimulation {
    let processes = &snapshot.processes;
    let mut protections: Vec<Protection> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    if pid <= 0 {
        protections.push(Protection::critical(format!(
            "Cannot terminate system kernel process (PID {})",
            pid
        )));
    }

    let target = processes.get(&pid).cloned();
    match &target {
        Some(process) => {
            if let Some(protection) = policy.check_process(&process.name, &process.username) {
                protections.push(protection);
            }

            if process.ppid > 1 {
                if let Some(parent) = processes.get(&process.ppid) {
                    if !classify::is_shell_parent(&parent.name) {
                        warnings.push(format!("Parent process is not a shell: {}", parent.name));
                    }
                }
            }
        }
        None => warnings.push(format!("Process {} not found in the process table", pid)),
    }

    let children = descendants(pid, processes);
    if !children.is_empty() {
        warnings.push(format!(
            "Will terminate {} child process(es)",
            children.len()
        ));
    }

    let ports = affected_ports(pid, &children, &snapshot.sockets, &snapshot.inodes);
    for &port in &ports {
        if let Some(reason) = safety::is_protected_port(port) {
            protections.push(Protection::advisory(format!(
                "Protected port {} ({}) will be affected",
                port, reason
            )));
        }
    }

    let protection_level = protections.iter().map(|p| p.level).max();
    let protected_reason = (!protections.is_empty()).then(|| {
        protections
            .iter()
            .map(|p| p.reason.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    });

    KillSimulation {
        target_pid: pid,
        target_process: target,
        child_processes: children,
        affected_ports: ports,
        is_protected: protection_level.is_some(),
        protection_level,
        protected_reason,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket_table::AddressFamily;

    fn process(pid: i32, ppid: i32, name: &str, user: &str) -> ProcessRecord {
        ProcessRecord {
            pid,
            ppid,
            name: name.to_string(),
            username: user.to_string(),
            ..Default::default()
        }
    }

    fn table(processes: Vec<ProcessRecord>) -> ProcessTable {
        processes.into_iter().map(|p| (p.pid, p)).collect()
    }

    fn socket(port: u16, local_addr: &str, inode: u64) -> SocketRecord {
        SocketRecord {
            port,
            local_addr: local_addr.to_string(),
            family: if local_addr.contains(':') {
                AddressFamily::Ipv6
            } else {
                AddressFamily::Ipv4
            },
            inode,
            tx_queue: 0,
            rx_queue: 0,
            listening: true,
        }
    }

    /// Snapshot con procesos y puertos `(puerto, pid)` en loopback.
    fn snapshot(processes: Vec<ProcessRecord>, owners: &[(u16, Option<i32>)]) -> SystemSnapshot {
        let mut sockets = Vec::new();
        let mut inodes = InodeIndex::default();
        for (i, &(port, pid)) in owners.iter().enumerate() {
            let inode = 1000 + i as u64;
            sockets.push(socket(port, "127.0.0.1", inode));
            if let Some(pid) = pid {
                inodes.insert(inode, pid);
            }
        }
        SystemSnapshot {
            processes: table(processes),
            sockets,
            inodes,
        }
    }

    fn only_processes(processes: Vec<ProcessRecord>) -> SystemSnapshot {
        snapshot(processes, &[])
    }

    /// A→B→C, A→D: los descendientes de A son exactamente {B, C, D}
    #[test]
    fn test_descendants_transitive() {
        let processes = table(vec![
            process(10, 1, "A", "alice"),
            process(20, 10, "B", "alice"),
            process(30, 20, "C", "alice"),
            process(40, 10, "D", "alice"),
            process(50, 1, "E", "alice"),
        ]);

        let pids: Vec<i32> = descendants(10, &processes).iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![20, 30, 40]);
    }

    /// Un ciclo o auto-referencia no debe colgar el recorrido
    #[test]
    fn test_descendants_terminates_on_cycles() {
        let processes = table(vec![
            process(10, 30, "A", "alice"),
            process(20, 10, "B", "alice"),
            process(30, 20, "C", "alice"),
            process(40, 40, "self", "alice"),
        ]);

        let pids: Vec<i32> = descendants(10, &processes).iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![20, 30]);
        assert!(descendants(40, &processes).is_empty());
    }

    #[test]
    fn test_affected_ports_cover_descendants() {
        let snapshot = snapshot(
            vec![
                process(10, 1, "npm", "alice"),
                process(20, 10, "node", "alice"),
                process(99, 1, "other", "alice"),
            ],
            &[
                (3000, Some(20)),
                (3000, Some(20)),
                (9229, Some(10)),
                (8080, Some(99)),
                (5000, None),
            ],
        );

        let sim = simulate_kill(10, &snapshot, &SafetyPolicy::default());
        assert_eq!(sim.affected_ports, vec![3000, 9229]);
        assert!(!sim.is_protected);
        assert!(sim.warnings.iter().any(|w| w == "Will terminate 1 child process(es)"));
    }

    /// Un puerto compartido con otro PID sigue afectando al objetivo
    #[test]
    fn test_port_bound_by_two_pids() {
        let mut inodes = InodeIndex::default();
        inodes.insert(1, 10);
        inodes.insert(2, 20);
        let snapshot = SystemSnapshot {
            processes: table(vec![
                process(10, 1, "node", "alice"),
                process(20, 1, "node", "alice"),
            ]),
            sockets: vec![
                socket(8080, "0000:0000:0000:0000:0000:0000:0000:0001", 1),
                socket(8080, "0.0.0.0", 2),
            ],
            inodes,
        };

        let sim = simulate_kill(10, &snapshot, &SafetyPolicy::default());
        assert_eq!(sim.affected_ports, vec![8080]);

        let sim = simulate_kill(20, &snapshot, &SafetyPolicy::default());
        assert_eq!(sim.affected_ports, vec![8080]);
    }

    /// Un puerto protegido marca la simulación aunque el proceso no lo esté
    #[test]
    fn test_protected_port_marks_simulation() {
        let snapshot = snapshot(vec![process(10, 1, "postgres", "alice")], &[(5432, Some(10))]);

        let sim = simulate_kill(10, &snapshot, &SafetyPolicy::default());
        assert!(sim.is_protected);
        assert_eq!(sim.protection_level, Some(ProtectionLevel::Advisory));
        assert!(!sim.is_hard_block());
        assert!(sim.blocks(false));
        assert!(!sim.blocks(true));
        assert!(sim.protected_reason.unwrap().contains("PostgreSQL"));
    }

    #[test]
    fn test_critical_process_is_hard_block() {
        let snapshot = only_processes(vec![process(500, 1, "dockerd", "root")]);
        let sim = simulate_kill(500, &snapshot, &SafetyPolicy::default());
        assert!(sim.is_protected);
        assert!(sim.is_hard_block());
        assert!(sim.blocks(true));
    }

    #[test]
    fn test_parent_shell_warning() {
        let snapshot = only_processes(vec![
            process(100, 1, "systemd", "alice"),
            process(200, 100, "node", "alice"),
            process(300, 1, "zsh", "alice"),
            process(400, 300, "node", "alice"),
        ]);

        let sim = simulate_kill(200, &snapshot, &SafetyPolicy::default());
        assert!(sim
            .warnings
            .contains(&"Parent process is not a shell: systemd".to_string()));

        let sim = simulate_kill(400, &snapshot, &SafetyPolicy::default());
        assert!(sim.warnings.is_empty());
    }

    /// Emuladores de terminal cuentan como shell; multiplexores no
    #[test]
    fn test_parent_shell_matches_by_substring() {
        let snapshot = only_processes(vec![
            process(100, 1, "gnome-terminal-server", "alice"),
            process(200, 100, "node", "alice"),
            process(300, 1, "Bash", "alice"),
            process(400, 300, "node", "alice"),
            process(500, 1, "tmux: server", "alice"),
            process(600, 500, "node", "alice"),
        ]);
        let policy = SafetyPolicy::default();

        assert!(simulate_kill(200, &snapshot, &policy).warnings.is_empty());
        assert!(simulate_kill(400, &snapshot, &policy).warnings.is_empty());
        assert!(simulate_kill(600, &snapshot, &policy)
            .warnings
            .contains(&"Parent process is not a shell: tmux: server".to_string()));
    }

    #[test]
    fn test_missing_and_kernel_targets() {
        let snapshot = SystemSnapshot::default();

        let sim = simulate_kill(12345, &snapshot, &SafetyPolicy::default());
        assert!(sim.target_process.is_none());
        assert!(!sim.is_protected);
        assert_eq!(sim.warnings.len(), 1);

        let sim = simulate_kill(0, &snapshot, &SafetyPolicy::default());
        assert!(sim.is_hard_block());
    }

    /// Repetir la simulación con las mismas entradas da el mismo resultado
    #[test]
    fn test_simulation_is_idempotent() {
        let snapshot = snapshot(
            vec![
                process(10, 1, "A", "alice"),
                process(20, 10, "B", "alice"),
                process(30, 10, "C", "alice"),
                process(40, 20, "D", "alice"),
            ],
            &[(3000, Some(40)), (22, Some(30))],
        );
        let policy = SafetyPolicy::default();

        let first = simulate_kill(10, &snapshot, &policy);
        for _ in 0..5 {
            assert_eq!(simulate_kill(10, &snapshot, &policy), first);
        }
        assert_eq!(first.affected_ports, vec![22, 3000]);
    }
}

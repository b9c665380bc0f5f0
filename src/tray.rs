/// Módulo del system tray (bandeja del sistema).
///
/// Muestra los puertos en escucha usando el protocolo
/// StatusNotifierItem/AppIndicator de Linux.
///
/// ## Características del menú:
/// - Vista filtrada (Todos / Dev / Olvidados)
/// - Paginación configurable (5 o 10 puertos por página)
/// - Submenú por puerto con antigüedad, riesgos y acciones
/// - SIGTERM / SIGKILL deshabilitados para recursos protegidos
/// - Actualización automática cada `refresh_interval`
use ksni::{self, menu::StandardItem, menu::SubMenu, Tray};
use std::process;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use portwatch::classify::Category;
use portwatch::observation::{PortObservation, Risk};
use portwatch::safety;
use portwatch::Engine;

/// Tamaño de página por defecto al iniciar la aplicación
const DEFAULT_PAGE_SIZE: usize = 10;

/// Subconjunto de observaciones visible en el menú
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewFilter {
    All,
    Dev,
    Forgotten,
}

impl ViewFilter {
    pub fn label(self) -> &'static str {
        match self {
            ViewFilter::All => "Todos",
            ViewFilter::Dev => "Dev",
            ViewFilter::Forgotten => "Olvidados",
        }
    }

    pub fn matches(self, observation: &PortObservation) -> bool {
        match self {
            ViewFilter::All => true,
            ViewFilter::Dev => observation.insight.category == Category::Dev,
            ViewFilter::Forgotten => observation.insight.is_forgotten,
        }
    }
}

/// Número de páginas para `total` elementos (al menos 1 si hay alguno).
pub fn total_pages(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Elementos de la página `page` (base 0); vacío si la página no existe.
pub fn page_slice<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_mul(page_size).min(items.len());
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// Motivo por el que no se ofrece terminar el dueño de un puerto.
fn protection_reason(engine: &Engine, observation: &PortObservation) -> Option<String> {
    if observation.pid.is_none() {
        return Some("proceso desconocido".to_string());
    }
    if let Some(protection) = engine
        .policy()
        .check_process(&observation.process.name, &observation.process.username)
    {
        return Some(protection.reason);
    }
    safety::is_protected_port(observation.port).map(|reason| format!("puerto protegido: {}", reason))
}

// ─────────────────────────────────────────────────────────────
// Estado del tray con filtros y paginación
// ─────────────────────────────────────────────────────────────

pub struct PortWatchTray {
    engine: Arc<Engine>,
    /// Última vista entregada por el motor
    observations: Arc<Mutex<Vec<PortObservation>>>,
    /// Pide un escaneo inmediato al hilo de actualización
    refresh_tx: Sender<()>,
    view_filter: ViewFilter,
    /// Página actual (base 0)
    current_page: usize,
    page_size: usize,
}

impl PortWatchTray {
    /// Crea el tray con un escaneo inicial.
    pub fn new(engine: Arc<Engine>, refresh_tx: Sender<()>) -> Self {
        let tray = Self {
            engine,
            observations: Arc::new(Mutex::new(Vec::new())),
            refresh_tx,
            view_filter: ViewFilter::All,
            current_page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        };
        tray.refresh_ports();
        tray
    }

    pub fn observations_handle(&self) -> Arc<Mutex<Vec<PortObservation>>> {
        Arc::clone(&self.observations)
    }

    /// Escanea de inmediato y sustituye la vista.
    fn refresh_ports(&self) {
        store_poll(&self.engine, &self.observations);
    }

    fn visible_observations(&self) -> Vec<PortObservation> {
        self.observations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|o| self.view_filter.matches(o))
            .cloned()
            .collect()
    }

    fn request_refresh(&self) {
        // El receptor solo desaparece al cerrar la aplicación
        let _ = self.refresh_tx.send(());
    }
}

/// Escaneo del motor volcado en la vista compartida.
fn store_poll(engine: &Engine, observations: &Mutex<Vec<PortObservation>>) {
    match engine.ports() {
        Ok(fresh) => {
            log::debug!("{} puertos visibles", fresh.len());
            *observations.lock().unwrap_or_else(PoisonError::into_inner) = fresh;
        }
        Err(e) => log::error!("Error escaneando puertos: {}", e),
    }
}

// ─────────────────────────────────────────────────────────────
// Implementación del menú contextual del tray
// ─────────────────────────────────────────────────────────────

impl Tray for PortWatchTray {
    fn icon_name(&self) -> String {
        "network-server".into()
    }

    fn title(&self) -> String {
        "PortWatch".into()
    }

    fn id(&self) -> String {
        "portwatch".into()
    }

    /// Construye el menú contextual dinámico.
    ///
    /// ```text
    /// 🔄 Actualizar
    /// ──────────
    /// 📊 Vista: [Todos|Dev|Olvidados] ▸
    /// 📋 Por página: [5|10] ▸
    /// ──────────
    /// 📡 N puertos
    /// 🟢 5173 node: Vite dev server ▸
    /// 🟠 3000 node: Next.js dev server ▸
    /// ──────────
    /// ◀ Anterior | Página X/Y | ▶ Siguiente
    /// ──────────
    /// ❌ Salir
    /// ```
    fn menu(&self) -> Vec<ksni::MenuItem<Self>> {
        let mut items: Vec<ksni::MenuItem<Self>> = vec![
            build_refresh_item(),
            ksni::MenuItem::Separator,
            build_filter_submenu(self.view_filter),
            build_page_size_submenu(self.page_size),
            ksni::MenuItem::Separator,
        ];

        let visible = self.visible_observations();
        let total = visible.len();
        let pages = total_pages(total, self.page_size);
        let safe_page = self.current_page.min(pages.saturating_sub(1));

        if total == 0 {
            items.push(build_empty_message());
        } else {
            items.push(build_count_header(total, self.view_filter));
            for observation in page_slice(&visible, safe_page, self.page_size) {
                items.push(build_port_submenu(&self.engine, observation));
            }
        }

        if pages > 1 {
            items.push(ksni::MenuItem::Separator);
            items.extend(build_navigation_items(safe_page, pages));
        }

        items.push(ksni::MenuItem::Separator);
        items.push(build_exit_item());

        items
    }
}

// ─────────────────────────────────────────────────────────────
// Constructores de items del menú
// ─────────────────────────────────────────────────────────────

/// Item "🔄 Actualizar": escanea de inmediato y vuelve a la primera página.
fn build_refresh_item() -> ksni::MenuItem<PortWatchTray> {
    StandardItem {
        label: "🔄 Actualizar".into(),
        activate: Box::new(|tray: &mut PortWatchTray| {
            log::info!("Actualizando lista de puertos...");
            tray.refresh_ports();
            tray.current_page = 0;
        }),
        ..Default::default()
    }
    .into()
}

/// Submenú de vista con indicador ● en la activa.
///
/// # Arguments
/// * `current` - Vista actualmente seleccionada
fn build_filter_submenu(current: ViewFilter) -> ksni::MenuItem<PortWatchTray> {
    let submenu_items: Vec<ksni::MenuItem<PortWatchTray>> =
        [ViewFilter::All, ViewFilter::Dev, ViewFilter::Forgotten]
            .iter()
            .map(|&filter| {
                let indicator = if filter == current { "●" } else { "○" };
                StandardItem {
                    label: format!("{} {}", indicator, filter.label()),
                    activate: Box::new(move |tray: &mut PortWatchTray| {
                        log::info!("Vista cambiada a: {}", filter.label());
                        tray.view_filter = filter;
                        tray.current_page = 0;
                    }),
                    ..Default::default()
                }
                .into()
            })
            .collect();

    SubMenu {
        label: format!("📊 Vista: {}", current.label()),
        submenu: submenu_items,
        ..Default::default()
    }
    .into()
}

/// Submenú de tamaño de página (5 o 10 puertos).
///
/// Cambiar el tamaño devuelve a la primera página.
///
/// # Arguments
/// * `current_size` - Tamaño de página actual
fn build_page_size_submenu(current_size: usize) -> ksni::MenuItem<PortWatchTray> {
    let submenu_items: Vec<ksni::MenuItem<PortWatchTray>> = [5usize, 10]
        .iter()
        .map(|&size| {
            let indicator = if size == current_size { "●" } else { "○" };
            StandardItem {
                label: format!("{} {} puertos", indicator, size),
                activate: Box::new(move |tray: &mut PortWatchTray| {
                    tray.page_size = size;
                    tray.current_page = 0;
                }),
                ..Default::default()
            }
            .into()
        })
        .collect();

    SubMenu {
        label: format!("📋 Por página: {}", current_size),
        submenu: submenu_items,
        ..Default::default()
    }
    .into()
}

/// Item deshabilitado para una vista sin puertos.
fn build_empty_message() -> ksni::MenuItem<PortWatchTray> {
    StandardItem {
        label: "✅ No hay puertos en escucha".into(),
        enabled: false,
        ..Default::default()
    }
    .into()
}

/// Encabezado con el número de puertos de la vista.
///
/// # Arguments
/// * `total` - Puertos que pasan el filtro, en todas las páginas
/// * `filter` - Vista activa; `Todos` no se indica en la etiqueta
fn build_count_header(total: usize, filter: ViewFilter) -> ksni::MenuItem<PortWatchTray> {
    let filter_label = match filter {
        ViewFilter::All => String::new(),
        other => format!(" ({})", other.label()),
    };

    StandardItem {
        label: format!("📡 {} puertos{}", total, filter_label),
        enabled: false,
        ..Default::default()
    }
    .into()
}

/// Línea informativa, no clickeable.
fn info_item(label: String) -> ksni::MenuItem<PortWatchTray> {
    StandardItem {
        label,
        enabled: false,
        ..Default::default()
    }
    .into()
}

/// Submenú de un puerto: detalle, riesgos y acciones.
///
/// - 🟢 reciente, 🟠 en espera, 🔴 olvidado
/// - 🟡 sin proceso identificable
fn build_port_submenu(
    engine: &Engine,
    observation: &PortObservation,
) -> ksni::MenuItem<PortWatchTray> {
    let insight = &observation.insight;
    let icon = if observation.pid.is_none() {
        "🟡"
    } else if insight.is_forgotten {
        "🔴"
    } else {
        match insight.age_category {
            portwatch::classify::AgeBucket::Fresh => "🟢",
            _ => "🟠",
        }
    };

    let mut submenu: Vec<ksni::MenuItem<PortWatchTray>> = vec![
        info_item(format!(
            "{} ({})",
            observation.local_addr,
            observation.interface.label()
        )),
        info_item(format!("{}", observation.process)),
        info_item(format!(
            "⏱ {} ({})",
            insight.age_duration,
            insight.age_category.label()
        )),
    ];

    if let Some(project) = &observation.project {
        submenu.push(info_item(format!("📁 {}", project.name)));
    }
    for reason in &insight.forgotten_reasons {
        submenu.push(info_item(format!("💤 {}", reason)));
    }
    for risk in &observation.risks {
        let label = match risk {
            Risk::OrphanedProcess => "⚠ Proceso huérfano",
            Risk::HiddenProcess => "⚠ Proceso oculto",
            Risk::PublicExposure => "⚠ Expuesto a la red",
        };
        submenu.push(info_item(label.to_string()));
    }

    submenu.push(ksni::MenuItem::Separator);

    match (observation.pid, protection_reason(engine, observation)) {
        (Some(pid), None) => {
            submenu.push(build_kill_item(pid, observation.port, false));
            submenu.push(build_kill_item(pid, observation.port, true));
        }
        (_, Some(reason)) => submenu.push(info_item(format!("🔒 {}", reason))),
        (None, None) => {}
    }

    if let Some(unit) = &observation.process.service_unit {
        submenu.push(build_stop_service_item(unit.clone()));
    }

    SubMenu {
        label: format!(
            "{} {} {}: {}",
            icon, observation.port, observation.process.name, insight.explanation
        ),
        submenu,
        ..Default::default()
    }
    .into()
}

/// Terminar el dueño de un puerto en un hilo propio.
///
/// La simulación se repite justo antes de enviar señales: el menú puede
/// llevar un rato abierto.
fn build_kill_item(pid: i32, port: u16, force: bool) -> ksni::MenuItem<PortWatchTray> {
    let label = if force {
        "💀 Forzar (SIGKILL)"
    } else {
        "⚔️ Terminar (SIGTERM)"
    };

    StandardItem {
        label: label.into(),
        activate: Box::new(move |tray: &mut PortWatchTray| {
            let engine = Arc::clone(&tray.engine);
            let refresh_tx = tray.refresh_tx.clone();
            thread::spawn(move || {
                match engine.simulate_kill(pid) {
                    Ok(sim) if sim.blocks(false) => {
                        log::warn!(
                            "Terminación de PID {} bloqueada: {}",
                            pid,
                            sim.protected_reason.unwrap_or_default()
                        );
                        return;
                    }
                    Ok(sim) => {
                        for warning in &sim.warnings {
                            log::warn!("PID {}: {}", pid, warning);
                        }
                    }
                    Err(e) => {
                        log::error!("Simulación de PID {} falló: {}", pid, e);
                        return;
                    }
                }

                match engine.kill(pid, force) {
                    Ok(outcome) if outcome.success => {
                        log::info!("Puerto {} (PID {}): {}", port, pid, outcome.message)
                    }
                    Ok(outcome) => log::error!("Puerto {} (PID {}): {}", port, pid, outcome.message),
                    Err(e) => log::error!("Error terminando PID {}: {}", pid, e),
                }
                let _ = refresh_tx.send(());
            });
        }),
        ..Default::default()
    }
    .into()
}

/// Item "⏹ Detener servicio" para puertos cuyo dueño vive en una unidad
/// de systemd.
///
/// `systemctl` puede tardar: corre en un hilo propio y al terminar pide un
/// escaneo nuevo.
///
/// # Arguments
/// * `unit` - Nombre de la unidad, p. ej. `nginx.service`
fn build_stop_service_item(unit: String) -> ksni::MenuItem<PortWatchTray> {
    StandardItem {
        label: format!("⏹ Detener servicio {}", unit),
        activate: Box::new(move |tray: &mut PortWatchTray| {
            let engine = Arc::clone(&tray.engine);
            let unit = unit.clone();
            let refresh_tx = tray.refresh_tx.clone();
            thread::spawn(move || {
                match engine.stop_service(&unit) {
                    Ok(result) if result.success => log::info!("{}", result.message),
                    Ok(result) => log::error!("{}", result.message),
                    Err(e) => log::error!("Error deteniendo {}: {}", unit, e),
                }
                let _ = refresh_tx.send(());
            });
        }),
        ..Default::default()
    }
    .into()
}

/// Items de navegación entre páginas.
///
/// - ◀ Anterior (deshabilitado en la primera página)
/// - Página X/Y (indicador)
/// - ▶ Siguiente (deshabilitado en la última página)
///
/// # Arguments
/// * `current_page` - Página actual (base 0)
/// * `total_pages` - Número total de páginas
fn build_navigation_items(
    current_page: usize,
    total_pages: usize,
) -> Vec<ksni::MenuItem<PortWatchTray>> {
    vec![
        StandardItem {
            label: "◀ Anterior".into(),
            enabled: current_page > 0,
            activate: Box::new(|tray: &mut PortWatchTray| {
                tray.current_page = tray.current_page.saturating_sub(1);
            }),
            ..Default::default()
        }
        .into(),
        info_item(format!("📄 Página {}/{}", current_page + 1, total_pages)),
        StandardItem {
            label: "▶ Siguiente".into(),
            enabled: current_page + 1 < total_pages,
            activate: Box::new(move |tray: &mut PortWatchTray| {
                if tray.current_page + 1 < total_pages {
                    tray.current_page += 1;
                }
            }),
            ..Default::default()
        }
        .into(),
    ]
}

/// Item "❌ Salir" del menú.
fn build_exit_item() -> ksni::MenuItem<PortWatchTray> {
    StandardItem {
        label: "❌ Salir".into(),
        activate: Box::new(|_: &mut PortWatchTray| {
            log::info!("PortWatch cerrándose...");
            process::exit(0);
        }),
        ..Default::default()
    }
    .into()
}

// ─────────────────────────────────────────────────────────────
// Inicio del servicio system tray
// ─────────────────────────────────────────────────────────────

/// Inicia el system tray y bloquea el hilo principal.
///
/// El hilo de actualización escanea cada `refresh_interval` o en cuanto
/// una acción del menú lo pide por el canal.
pub fn run_tray(engine: Arc<Engine>) {
    log::info!("Iniciando PortWatch system tray...");

    let (refresh_tx, refresh_rx) = mpsc::channel::<()>();
    let interval = engine.config().refresh_interval;

    let tray = PortWatchTray::new(Arc::clone(&engine), refresh_tx);
    let observations = tray.observations_handle();

    let service = ksni::TrayService::new(tray);
    let handle = service.handle();

    thread::spawn(move || loop {
        match refresh_rx.recv_timeout(interval) {
            Ok(()) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        store_poll(&engine, &observations);
        handle.update(|_tray: &mut PortWatchTray| {
            log::debug!("Menú actualizado");
        });
    });

    if let Err(e) = service.run() {
        log::error!("Error ejecutando el servicio de tray: {}", e);
    }
}

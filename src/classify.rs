/// Módulo de clasificación de procesos y puertos.
///
/// Traduce una línea de comandos a una etiqueta legible ("Vite dev server"),
/// un ícono y una categoría, y decide si un puerto parece olvidado.
///
/// ## Reglas
/// La tabla de patrones es una lista ordenada de pares (patrón, resultado):
/// gana la primera coincidencia, así que los frameworks concretos van antes
/// que los runtimes genéricos (`vite` antes que `node`).
use std::time::Duration;

use regex::Regex;
use serde::Serialize;

use crate::error::Result;
use crate::process_table::ProcessRecord;

/// Límite superior de la franja "fresh"
const FRESH_LIMIT: Duration = Duration::from_secs(5 * 60);

/// Límite superior de la franja "lingering"
const LINGERING_LIMIT: Duration = Duration::from_secs(15 * 60);

// ─────────────────────────────────────────────────────────────
// Tipos de resultado
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Dev,
    Database,
    System,
    Unidentified,
}

/// Resultado de clasificar un proceso o un puerto
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub label: String,
    pub icon: &'static str,
    pub category: Category,
}

impl Classification {
    fn new(label: impl Into<String>, icon: &'static str, category: Category) -> Self {
        Self {
            label: label.into(),
            icon,
            category,
        }
    }
}

/// Franja de antigüedad de una observación
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeBucket {
    Fresh,
    Lingering,
    Forgotten,
}

impl AgeBucket {
    /// fresh < 5 min, lingering < 15 min, forgotten en adelante
    pub fn from_age(age: Duration) -> Self {
        if age < FRESH_LIMIT {
            AgeBucket::Fresh
        } else if age < LINGERING_LIMIT {
            AgeBucket::Lingering
        } else {
            AgeBucket::Forgotten
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeBucket::Fresh => "fresh",
            AgeBucket::Lingering => "lingering",
            AgeBucket::Forgotten => "forgotten",
        }
    }
}

/// Enriquecimiento visible de una observación de puerto
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub explanation: String,
    pub icon: &'static str,
    pub category: Category,
    pub age_category: AgeBucket,
    pub age_duration: String,
    pub is_forgotten: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub forgotten_reasons: Vec<String>,
}

/// Proyecto deducido del directorio de trabajo del proceso
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    pub name: String,
    pub path: String,
}

// ─────────────────────────────────────────────────────────────
// Tablas de patrones
// ─────────────────────────────────────────────────────────────

/// Tabla ordenada: (regex, etiqueta, ícono, categoría)
const DEV_TOOL_RULES: &[(&str, &str, &str, Category)] = &[
    // Ecosistema Node.js
    (r"(?i)\bvite\b", "Vite dev server", "vite", Category::Dev),
    (r"(?i)webpack", "Webpack dev server", "webpack", Category::Dev),
    (r"(?i)\bnext(\s+dev|\s+start|/dist|-server)", "Next.js dev server", "nextjs", Category::Dev),
    (r"(?i)\bnuxt", "Nuxt.js dev server", "nuxt", Category::Dev),
    (r"(?i)react-scripts", "Create React App dev server", "react", Category::Dev),
    (r"(?i)vue-cli|@vue/cli", "Vue CLI dev server", "vue", Category::Dev),
    (r"(?i)\bng\s+serve|angular.*serve", "Angular dev server", "angular", Category::Dev),
    (r"(?i)esbuild", "esbuild bundler", "node", Category::Dev),
    (r"(?i)\bparcel\b", "Parcel dev server", "node", Category::Dev),
    (r"(?i)rollup.*(-w\b|--watch)", "Rollup watcher", "node", Category::Dev),
    (r"(?i)nodemon", "Nodemon process monitor", "node", Category::Dev),
    (r"(?i)ts-node", "TypeScript runtime", "typescript", Category::Dev),
    (r"(?i)\btsx\s", "TSX runtime", "typescript", Category::Dev),
    (r"(?i)\bnpm\s+(run\s+)?(dev|start|serve)", "npm script", "npm", Category::Dev),
    (r"(?i)\bpnpm\s", "pnpm script", "npm", Category::Dev),
    (r"(?i)\byarn\s", "yarn script", "npm", Category::Dev),
    (r"(?i)\bbun\s", "Bun runtime", "bun", Category::Dev),
    // Ecosistema Python
    (r"(?i)\bflask\b", "Flask dev server", "python", Category::Dev),
    (r"(?i)manage\.py\s+runserver|django.*runserver", "Django dev server", "django", Category::Dev),
    (r"(?i)\buvicorn\b", "Uvicorn ASGI server", "python", Category::Dev),
    (r"(?i)\bgunicorn\b", "Gunicorn WSGI server", "python", Category::Dev),
    (r"(?i)\bfastapi\b", "FastAPI server", "python", Category::Dev),
    (r"(?i)\bstreamlit\b", "Streamlit app", "python", Category::Dev),
    (r"(?i)\bjupyter", "Jupyter server", "jupyter", Category::Dev),
    (r"(?i)python.*-m\s+http\.server", "Python HTTP server", "python", Category::Dev),
    (r"(?i)python.*SimpleHTTP", "Python SimpleHTTP server", "python", Category::Dev),
    // Ecosistema Go
    (r"(?i)\bgo\s+run\b", "Go run command", "go", Category::Dev),
    (r"(?i)(^|/)air(\s|$)", "Air live reload (Go)", "go", Category::Dev),
    // Ecosistema Rust
    (r"(?i)cargo\s+(run|watch)", "Cargo run/watch", "rust", Category::Dev),
    (r"(?i)trunk\s+serve", "Trunk dev server (WASM)", "rust", Category::Dev),
    // Ecosistema Ruby
    (r"(?i)rails\s+(s|server)\b", "Rails dev server", "ruby", Category::Dev),
    (r"(?i)\bpuma\b", "Puma web server", "ruby", Category::Dev),
    (r"(?i)webrick", "WEBrick server", "ruby", Category::Dev),
    // Ecosistema Java/JVM
    (r"(?i)spring-boot", "Spring Boot app", "java", Category::Dev),
    (r"(?i)gradle.*bootRun", "Gradle bootRun", "java", Category::Dev),
    // Ecosistema PHP
    (r"(?i)php\s+-S\b", "PHP built-in server", "php", Category::Dev),
    (r"(?i)artisan\s+serve", "Laravel dev server", "php", Category::Dev),
    // Bases de datos / servicios
    (r"(?i)postgres", "PostgreSQL database", "database", Category::Database),
    (r"(?i)mysqld|mariadbd", "MySQL database", "database", Category::Database),
    (r"(?i)redis-server", "Redis server", "database", Category::Database),
    (r"(?i)\bmongod\b", "MongoDB server", "database", Category::Database),
    (r"(?i)docker-proxy", "Docker published port", "docker", Category::Dev),
    // Tauri / Electron
    (r"(?i)\btauri\b", "Tauri dev server", "tauri", Category::Dev),
    (r"(?i)electron", "Electron app", "electron", Category::Dev),
    // Patrones genéricos (menor prioridad)
    (r"(?i)(^|/)node(\s|$)", "Node.js process", "node", Category::Dev),
    (r"(?i)(^|/)python[\d.]*(\s|$)", "Python process", "python", Category::Dev),
    (r"(?i)(^|/)ruby(\s|$)", "Ruby process", "ruby", Category::Dev),
    (r"(?i)(^|/)java(\s|$)", "Java process", "java", Category::Dev),
    (r"(?i)(^|/)php(\s|$)", "PHP process", "php", Category::Dev),
];

/// Procesos que abren puertos como detalle de implementación del editor:
/// se siguen para el envejecimiento pero no se muestran.
const NOISE_PATTERNS: &[&str] = &[
    "rust-analyzer",
    "gopls",
    "typescript-language-server",
    "tsserver",
    "pyright",
    "pylsp",
    "jedi-language-server",
    "clangd",
    "lua-language-server",
    "debugpy",
    "dlv dap",
    "js-debug",
    "vscode-server",
    "extensionhost",
    "copilot-language-server",
];

/// Editores / IDEs (por nombre de ejecutable)
const IDE_NAMES: &[&str] = &[
    "code", "codium", "cursor", "zed", "vim", "nvim", "neovim", "emacs", "sublime_text", "subl",
    "atom", "idea", "webstorm", "pycharm", "goland", "rubymine", "phpstorm", "clion", "rider",
    "android-studio", "fleet",
];

/// Shells interactivas (por nombre de ejecutable)
const SHELL_NAMES: &[&str] = &["bash", "zsh", "sh", "fish", "dash", "ksh", "nu"];

/// Emuladores de terminal y multiplexores (coincidencia por subcadena)
const TERMINAL_PATTERNS: &[&str] = &[
    "terminal", "konsole", "alacritty", "kitty", "wezterm", "iterm", "hyper", "tmux", "screen",
    "foot", "tilix", "xterm",
];

/// Padres que cuentan como shell interactiva al simular una terminación
/// (coincidencia por subcadena)
const SHELL_PARENT_PATTERNS: &[&str] = &[
    "bash", "zsh", "sh", "fish", "terminal", "konsole", "gnome-terminal", "alacritty", "kitty",
    "wezterm",
];

/// Puertos conocidos para sockets sin proceso identificable
const PORT_HINTS: &[(u16, &str, &str, Category)] = &[
    (22, "SSH server", "system", Category::System),
    (53, "DNS resolver", "system", Category::System),
    (80, "HTTP server", "system", Category::System),
    (443, "HTTPS server", "system", Category::System),
    (631, "CUPS printing", "system", Category::System),
    (3000, "Node/React dev server", "node", Category::Dev),
    (3306, "MySQL database", "database", Category::Database),
    (4200, "Angular dev server", "angular", Category::Dev),
    (5000, "Flask dev server", "python", Category::Dev),
    (5173, "Vite dev server", "vite", Category::Dev),
    (5432, "PostgreSQL database", "database", Category::Database),
    (6379, "Redis server", "database", Category::Database),
    (8000, "Python/Django dev server", "python", Category::Dev),
    (8080, "HTTP dev/proxy server", "docker", Category::Dev),
    (8888, "Jupyter server", "jupyter", Category::Dev),
    (9000, "PHP-FPM", "php", Category::Dev),
    (27017, "MongoDB server", "database", Category::Database),
];

// ─────────────────────────────────────────────────────────────
// Clasificador
// ─────────────────────────────────────────────────────────────

struct Rule {
    pattern: Regex,
    label: &'static str,
    icon: &'static str,
    category: Category,
}

/// Tabla de reglas compilada una única vez por motor
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Classifier {
    pub fn new() -> Result<Self> {
        let rules = DEV_TOOL_RULES
            .iter()
            .map(|&(pattern, label, icon, category)| {
                Ok(Rule {
                    pattern: Regex::new(pattern)?,
                    label,
                    icon,
                    category,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    /// Explica qué es un proceso.
    ///
    /// Orden: patrones sobre la línea de comandos, patrones sobre el nombre,
    /// sesión de terminal, "Started by <nombre>" y finalmente "Unknown origin".
    pub fn explain(&self, cmdline: &str, name: &str) -> Classification {
        if let Some(rule) = self.first_match(cmdline) {
            return Classification::new(rule.label, rule.icon, rule.category);
        }

        if let Some(rule) = self.first_match(name) {
            return Classification::new(rule.label, rule.icon, rule.category);
        }

        if is_terminal_name(name) {
            return Classification::new("Interactive terminal session", "terminal", Category::Dev);
        }

        if !name.is_empty() {
            return Classification::new(format!("Started by {}", name), "process", Category::Dev);
        }

        Classification::new("Unknown origin", "unknown", Category::Unidentified)
    }

    fn first_match(&self, text: &str) -> Option<&Rule> {
        if text.is_empty() {
            return None;
        }
        self.rules.iter().find(|rule| rule.pattern.is_match(text))
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("rules", &self.rules.len())
            .finish()
    }
}

/// Clasificación heurística por número de puerto.
pub fn classify_port(port: u16) -> Option<Classification> {
    PORT_HINTS
        .iter()
        .find(|(hint, ..)| *hint == port)
        .map(|&(_, label, icon, category)| Classification::new(label, icon, category))
}

/// Clasificación de último recurso para sockets sin dueño identificable.
///
/// Los puertos altos suelen ser servicios de contenedores (docker-proxy en
/// otro namespace); los bajos se tratan como recursos del sistema.
pub fn unidentified(port: u16) -> Classification {
    if port >= 1024 {
        Classification::new("Potential Dev/Container Service", "docker", Category::Dev)
    } else {
        Classification::new("Unidentified Service", "system", Category::Unidentified)
    }
}

/// Procesos de editor (language servers, puentes de depuración) que no
/// deben aparecer en la vista.
pub fn is_noise_process(cmdline: &str, name: &str) -> bool {
    let cmd = cmdline.to_lowercase();
    let name = name.to_lowercase();
    NOISE_PATTERNS
        .iter()
        .any(|pattern| cmd.contains(pattern) || name.contains(pattern))
}

// ─────────────────────────────────────────────────────────────
// Reconocimiento de ancestros
// ─────────────────────────────────────────────────────────────

/// Coincide si el nombre es exactamente uno de la lista o una variante
/// con sufijo (`code-insiders`, `idea.sh`).
fn matches_executable(name: &str, names: &[&str]) -> bool {
    let name = name.to_lowercase();
    names.iter().any(|candidate| {
        name == *candidate
            || name.starts_with(&format!("{}-", candidate))
            || name.starts_with(&format!("{}.", candidate))
    })
}

/// Nombre del ejecutable desde el primer argumento de la línea de comandos
fn executable_of(cmdline: &str) -> &str {
    cmdline
        .split_whitespace()
        .next()
        .and_then(|exe| exe.rsplit('/').next())
        .unwrap_or_default()
}

/// Shell o emulador de terminal reconocido.
pub fn is_terminal_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    matches_executable(&lower, SHELL_NAMES)
        || TERMINAL_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

/// Padre reconocido como shell interactiva, sin distinguir mayúsculas.
pub fn is_shell_parent(name: &str) -> bool {
    let lower = name.to_lowercase();
    SHELL_PARENT_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

pub fn is_ide_process(process: &ProcessRecord) -> bool {
    matches_executable(&process.name, IDE_NAMES)
        || matches_executable(executable_of(&process.cmdline), IDE_NAMES)
}

pub fn is_terminal_process(process: &ProcessRecord) -> bool {
    is_terminal_name(&process.name) || is_terminal_name(executable_of(&process.cmdline))
}

// ─────────────────────────────────────────────────────────────
// Envejecimiento y puertos olvidados
// ─────────────────────────────────────────────────────────────

/// Decide si un puerto parece olvidado.
///
/// La antigüedad por encima del umbral es obligatoria pero nunca suficiente:
/// se exige además un segundo indicio (lanzado desde un IDE o desde una
/// terminal). Un servidor legítimo de larga vida solo cumple el primero.
///
/// # Arguments
/// * `age` - Tiempo desde la primera observación
/// * `threshold` - Umbral de antigüedad configurado
/// * `process` - Proceso dueño del puerto
/// * `parent` - Proceso padre, si sigue vivo
///
/// # Returns
/// `(veredicto, motivos)`; los motivos listan los criterios cumplidos.
pub fn is_forgotten_port(
    age: Duration,
    threshold: Duration,
    process: &ProcessRecord,
    parent: Option<&ProcessRecord>,
) -> (bool, Vec<String>) {
    if age < threshold {
        return (false, Vec::new());
    }

    let mut reasons = vec![format!(
        "Open for {} (threshold: {})",
        format_duration_short(age),
        format_duration_short(threshold)
    )];

    let ide = parent
        .filter(|p| is_ide_process(p))
        .or_else(|| is_ide_process(process).then_some(process));
    if let Some(ide) = ide {
        reasons.push(format!("Spawned by IDE/editor: {}", ide.name));
    }

    if parent.is_some_and(is_terminal_process) {
        reasons.push("Running in terminal session".to_string());
    }

    (reasons.len() >= 2, reasons)
}

/// Duración legible para la vista: `42s`, `3m 7s`, `2h 5m`, `1d 3h`.
pub fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86_400 {
        format!("{}h {}m", secs / 3600, (secs / 60) % 60)
    } else {
        format!("{}d {}h", secs / 86_400, (secs / 3600) % 24)
    }
}

/// Duración compacta para los motivos: `42s`, `12m`, `2h 5m`.
fn format_duration_short(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs / 60) % 60)
    }
}

/// Identifica el proyecto a partir del directorio de trabajo.
///
/// Usa el último componente de la ruta; los nombres genéricos (`src`, `app`,
/// `build`, `dist`) se califican con su directorio padre (`web/src`).
pub fn project_from_cwd(cwd: &str) -> Option<ProjectInfo> {
    let trimmed = cwd.trim_end_matches('/');
    let mut parts = trimmed.rsplit('/').filter(|p| !p.is_empty());
    let last = parts.next()?;

    let name = match last {
        "src" | "app" | "build" | "dist" => match parts.next() {
            Some(parent) => format!("{}/{}", parent, last),
            None => last.to_string(),
        },
        _ => last.to_string(),
    };

    Some(ProjectInfo {
        name,
        path: cwd.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(name: &str, cmdline: &str) -> ProcessRecord {
        ProcessRecord {
            pid: 100,
            ppid: 50,
            name: name.to_string(),
            cmdline: cmdline.to_string(),
            ..Default::default()
        }
    }

    const MIN: u64 = 60;

    #[test]
    fn test_all_rules_compile() {
        let classifier = Classifier::new().unwrap();
        assert_eq!(classifier.rules.len(), DEV_TOOL_RULES.len());
    }

    /// El framework concreto tiene prioridad sobre el runtime genérico
    #[test]
    fn test_specific_pattern_precedes_generic() {
        let classifier = Classifier::new().unwrap();
        let vite = classifier.explain("node /home/u/app/node_modules/.bin/vite --port 5173", "node");
        assert_eq!(vite.label, "Vite dev server");

        let plain = classifier.explain("node server.js", "node");
        assert_eq!(plain.label, "Node.js process");
        assert_eq!(plain.icon, "node");
    }

    #[test]
    fn test_falls_back_to_name_then_generic_labels() {
        let classifier = Classifier::new().unwrap();

        // Sin cmdline legible: se usa el nombre
        assert_eq!(classifier.explain("", "redis-server").label, "Redis server");
        assert_eq!(
            classifier.explain("", "redis-server").category,
            Category::Database
        );

        assert_eq!(
            classifier.explain("", "zsh").label,
            "Interactive terminal session"
        );
        assert_eq!(classifier.explain("/opt/foo/bard --x", "bard").label, "Started by bard");

        let unknown = classifier.explain("", "");
        assert_eq!(unknown.label, "Unknown origin");
        assert_eq!(unknown.category, Category::Unidentified);
    }

    #[test]
    fn test_age_buckets() {
        assert_eq!(AgeBucket::from_age(Duration::from_secs(0)), AgeBucket::Fresh);
        assert_eq!(AgeBucket::from_age(Duration::from_secs(5 * MIN - 1)), AgeBucket::Fresh);
        assert_eq!(AgeBucket::from_age(Duration::from_secs(5 * MIN)), AgeBucket::Lingering);
        assert_eq!(AgeBucket::from_age(Duration::from_secs(15 * MIN - 1)), AgeBucket::Lingering);
        assert_eq!(AgeBucket::from_age(Duration::from_secs(15 * MIN)), AgeBucket::Forgotten);
    }

    /// La antigüedad sola nunca basta
    #[test]
    fn test_forgotten_requires_two_signals() {
        let threshold = Duration::from_secs(10 * MIN);
        let age = Duration::from_secs(20 * MIN);
        let server = process("node", "node server.js");
        let init_like = process("supervisord", "/usr/bin/supervisord");

        let (forgotten, reasons) = is_forgotten_port(age, threshold, &server, Some(&init_like));
        assert!(!forgotten);
        assert_eq!(reasons.len(), 1);

        let (forgotten, _) = is_forgotten_port(age, threshold, &server, None);
        assert!(!forgotten);
    }

    #[test]
    fn test_forgotten_with_ide_ancestry() {
        let threshold = Duration::from_secs(10 * MIN);
        let server = process("node", "node server.js");
        let ide = process("code", "/usr/share/code/code --type=renderer");

        let (forgotten, reasons) =
            is_forgotten_port(Duration::from_secs(20 * MIN), threshold, &server, Some(&ide));
        assert!(forgotten);
        assert!(reasons.iter().any(|r| r.contains("IDE/editor: code")));

        // Mismo padre pero puerto reciente: no olvidado
        let (forgotten, reasons) =
            is_forgotten_port(Duration::from_secs(2 * MIN), threshold, &server, Some(&ide));
        assert!(!forgotten);
        assert!(reasons.is_empty());
    }

    #[test]
    fn test_forgotten_with_terminal_ancestry() {
        let threshold = Duration::from_secs(10 * MIN);
        let server = process("python3", "python3 -m http.server");
        let shell = process("bash", "-bash");

        let (forgotten, reasons) =
            is_forgotten_port(Duration::from_secs(11 * MIN), threshold, &server, Some(&shell));
        assert!(forgotten);
        assert!(reasons.contains(&"Running in terminal session".to_string()));
    }

    /// La comparación es por subcadena: basta con que el nombre la contenga
    #[test]
    fn test_shell_parent_recognition() {
        assert!(is_shell_parent("bash"));
        assert!(is_shell_parent("-ZSH"));
        assert!(is_shell_parent("gnome-terminal-server"));
        assert!(is_shell_parent("wezterm-gui"));
        assert!(!is_shell_parent("systemd"));
        assert!(!is_shell_parent("tmux: server"));
        assert!(!is_shell_parent("node"));
    }

    /// `sshd` o `gnome-shell` no cuentan como shell interactiva
    #[test]
    fn test_terminal_name_recognition() {
        assert!(is_terminal_name("bash"));
        assert!(is_terminal_name("gnome-terminal-server"));
        assert!(is_terminal_name("tmux: server"));
        assert!(!is_terminal_name("sshd"));
        assert!(!is_terminal_name("gnome-shell"));
    }

    #[test]
    fn test_noise_filter() {
        assert!(is_noise_process(
            "/home/u/.vscode-server/bin/x/node --inspect",
            "node"
        ));
        assert!(is_noise_process("", "rust-analyzer"));
        assert!(!is_noise_process("node server.js", "node"));
    }

    #[test]
    fn test_port_hints() {
        let pg = classify_port(5432).unwrap();
        assert_eq!(pg.category, Category::Database);
        assert_eq!(classify_port(22).unwrap().icon, "system");
        assert!(classify_port(12345).is_none());

        assert_eq!(unidentified(32768).label, "Potential Dev/Container Service");
        assert_eq!(unidentified(111).category, Category::Unidentified);
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::from_secs(42)), "42s");
        assert_eq!(format_age(Duration::from_secs(187)), "3m 7s");
        assert_eq!(format_age(Duration::from_secs(2 * 3600 + 5 * 60)), "2h 5m");
        assert_eq!(format_age(Duration::from_secs(27 * 3600)), "1d 3h");
    }

    #[test]
    fn test_project_from_cwd() {
        let project = project_from_cwd("/home/u/projects/shop").unwrap();
        assert_eq!(project.name, "shop");

        let nested = project_from_cwd("/home/u/projects/web/src/").unwrap();
        assert_eq!(nested.name, "web/src");
        assert_eq!(nested.path, "/home/u/projects/web/src/");

        assert!(project_from_cwd("").is_none());
        assert!(project_from_cwd("/").is_none());
    }
}

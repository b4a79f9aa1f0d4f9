//! lox-tools — Bibliothèque commune pour les outils CLI Lox.
//!
//! Objectifs : mutualiser I/O, chrono, couleurs, configuration et les vues
//! (texte, JSON, résumé) d'un chunk, pour que `lox-disasm` reste un simple
//! parseur d'arguments.
//!
//! ## Modules & zones clés
//! - `prelude` : import rapide des types/fns usuels
//! - I/O       : `read_text`, `read_stdin_to_string`, `read_input`, `write_text`
//! - Time      : `Timer`, `human_millis`
//! - Couleurs  : `ColorMode`, `setup_colors`
//! - Config    : `ToolConfig`, `load_config` (`.loxdisasm.toml`, recherche ascendante)
//! - Chunk     : `load_chunk`, `render_text`, `build_json`, `summarize`
//! - Logs      : `init_logger` (feature `cli`)
//!
//! Les fonctions sont pensées "no surprises" et avec `anyhow::Result`.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]
#![cfg_attr(not(debug_assertions), warn(missing_docs))]

use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

pub use lox_core::{
    asm::{assemble_with, AsmError},
    bytecode::{Chunk, Instruction, OpCode},
    disasm::disassemble_to_string,
    memory::{Allocator, BudgetAllocator},
    value::Value,
};

/// Version lisible du crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Nom du fichier de configuration cherché depuis le dossier courant.
pub const CONFIG_FILE_NAME: &str = ".loxdisasm.toml";

/// Petite bannière de version utile pour logs/outils.
pub fn version_banner(tool: &str) -> String {
    format!("{tool} — lox-tools {VERSION}")
}

/* ------------------------------------------------------------------------- */
/* Prelude                                                                   */
/* ------------------------------------------------------------------------- */

/// Prelude pratique pour les bins: re-exports compacts.
pub mod prelude {
    pub use anyhow::{anyhow, Context, Result};
    pub use camino::{Utf8Path, Utf8PathBuf};
    pub use crate::{
        version_banner, human_millis, Timer,
        read_text, read_stdin_to_string, read_input, write_text, to_utf8,
        ColorMode, setup_colors,
        ToolConfig, load_config,
        load_chunk, render_text, build_json, summarize, summarize_budgeted, ChunkSummary,
    };
    #[cfg(feature = "cli")]
    pub use crate::init_logger;
}

/* ------------------------------------------------------------------------- */
/* I/O utils                                                                 */
/* ------------------------------------------------------------------------- */

/// Lis un fichier texte en UTF-8.
pub fn read_text(path: &Utf8Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("lecture {path}"))
}

/// Lis tout `stdin` en String (UTF-8).
pub fn read_stdin_to_string() -> Result<String> {
    let mut s = String::new();
    io::stdin().read_to_string(&mut s)?;
    Ok(s)
}

/// Lis une entrée CLI : `-` pour stdin (nommée `stdin_name`), sinon un fichier.
pub fn read_input(arg: &str, stdin_name: &str) -> Result<(String, Utf8PathBuf)> {
    if arg == "-" {
        Ok((read_stdin_to_string()?, Utf8PathBuf::from(stdin_name)))
    } else {
        let p = Utf8PathBuf::from(arg);
        Ok((read_text(&p)?, p))
    }
}

/// Écrit un texte (UTF-8). Crée les dossiers au besoin.
pub fn write_text(path: &Utf8Path, s: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut f = fs::File::create(path).with_context(|| format!("création {path}"))?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

/// Convertit un `PathBuf` en `Utf8PathBuf` (erreur si non UTF-8).
pub fn to_utf8(p: PathBuf) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(p).map_err(|_| anyhow!("chemin non UTF-8"))
}

/* ------------------------------------------------------------------------- */
/* Time / chrono                                                             */
/* ------------------------------------------------------------------------- */

/// Chrono de scope simple; loggable ensuite.
pub struct Timer {
    start: Instant,
}
impl Timer {
    /// Démarre un chrono.
    pub fn start() -> Self { Self { start: Instant::now() } }
    /// Durée écoulée.
    pub fn elapsed(&self) -> Duration { self.start.elapsed() }
    /// Format humain court.
    pub fn pretty(&self) -> String { human_millis(self.elapsed()) }
}

/// Format "humain" d'une durée.
pub fn human_millis(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1_000 { return format!("{ms} ms"); }
    #[allow(clippy::cast_precision_loss)]
    let s = ms as f64 / 1000.0;
    if s < 60.0 { return format!("{s:.3} s"); }
    let m = (s / 60.0).floor();
    let rest = s - m * 60.0;
    format!("{m:.0} min {rest:.1} s")
}

/* ------------------------------------------------------------------------- */
/* Couleurs                                                                  */
/* ------------------------------------------------------------------------- */

/// Contrôle l'application de couleurs ANSI dans les sorties CLI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Active les couleurs seulement si la sortie supporte ANSI (auto-détection).
    #[default]
    Auto,
    /// Force l'activation des couleurs, même si le terminal semble ne pas les supporter.
    Always,
    /// Désactive complètement les couleurs ANSI.
    Never,
}

/// Configure le mode couleur global pour yansi (si feature `colors` active).
pub fn setup_colors(mode: ColorMode) {
    #[cfg(feature = "colors")]
    {
        match mode {
            ColorMode::Auto => yansi::whenever(yansi::Condition::DEFAULT),
            ColorMode::Always => yansi::enable(),
            ColorMode::Never => yansi::disable(),
        }
    }
    #[cfg(not(feature = "colors"))]
    { let _ = mode; }
}

/* ------------------------------------------------------------------------- */
/* Logs                                                                      */
/* ------------------------------------------------------------------------- */

/// Initialise env_logger : `info` par défaut, `-v` → debug, `-vv` → trace,
/// `-q` → erreurs seulement. `RUST_LOG` reste prioritaire.
#[cfg(feature = "cli")]
pub fn init_logger(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .try_init();
}

/* ------------------------------------------------------------------------- */
/* Configuration                                                             */
/* ------------------------------------------------------------------------- */

/// Configuration de `lox-disasm` (`.loxdisasm.toml`). Les flags CLI gagnent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Plafond d'octets vivants pendant l'assemblage (aucun si absent).
    pub max_bytes: Option<usize>,
    /// Couleurs du résumé.
    pub color: ColorMode,
    /// Affiche le résumé en plus du désassemblage.
    pub summary: bool,
    /// JSON indenté.
    pub json_pretty: bool,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self { max_bytes: None, color: ColorMode::Auto, summary: false, json_pretty: true }
    }
}

/// Charge la config explicite, sinon `.loxdisasm.toml` (recherche ascendante
/// depuis le dossier courant), sinon `Default`.
pub fn load_config(explicit: Option<&Utf8Path>) -> Result<ToolConfig> {
    let cwd = std::env::current_dir()?;
    load_config_from(explicit, &cwd)
}

/// Variante de [`load_config`] avec dossier de départ explicite.
pub fn load_config_from(explicit: Option<&Utf8Path>, start: &Path) -> Result<ToolConfig> {
    if let Some(p) = explicit {
        return parse_config_file(p.as_std_path());
    }
    let mut cur = start.to_path_buf();
    loop {
        let cand = cur.join(CONFIG_FILE_NAME);
        if cand.is_file() {
            log::debug!("config: {}", cand.display());
            return parse_config_file(&cand);
        }
        if !cur.pop() { break; }
    }
    Ok(ToolConfig::default())
}

fn parse_config_file(path: &Path) -> Result<ToolConfig> {
    let s = fs::read_to_string(path).with_context(|| format!("lecture config {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("TOML invalide: {}", path.display()))
}

/* ------------------------------------------------------------------------- */
/* Chunk : chargement & vues                                                 */
/* ------------------------------------------------------------------------- */

/// Assemble une source texte dans un chunk dont l'allocateur mesure (et
/// éventuellement plafonne) la mémoire.
pub fn load_chunk(source: &str, name: &Utf8Path, max_bytes: Option<usize>) -> Result<Chunk<BudgetAllocator>> {
    let budget = max_bytes.map_or_else(BudgetAllocator::unlimited, BudgetAllocator::new);
    let chunk = assemble_with(source, budget).with_context(|| format!("assemblage échoué: {name}"))?;
    log::info!("{name}: {} bytes, {} constants", chunk.len(), chunk.constants().len());
    Ok(chunk)
}

/// Désassemblage texte (titre = nom de fichier).
pub fn render_text<A: Allocator>(chunk: &Chunk<A>, name: &Utf8Path) -> String {
    disassemble_to_string(chunk, name.file_name().unwrap_or("chunk"))
}

/// Vue JSON d'un chunk.
#[derive(Debug, Serialize)]
pub struct ChunkJson<'a> {
    /// Nom logique (chemin ou `<stdin>`).
    pub file: &'a str,
    /// Taille du flux d'instructions.
    pub bytes: usize,
    /// Pool de constantes.
    pub constants: Vec<ConstJson>,
    /// Instructions décodées.
    pub instructions: Vec<Instruction>,
    /// Groupes contigus de lignes.
    pub line_runs: Vec<LineRunJson>,
}

/// Constante dans la vue JSON.
#[derive(Debug, Serialize)]
pub struct ConstJson {
    /// Index dans le pool.
    pub index: usize,
    /// Valeur typée.
    pub value: Value,
    /// Rendu identique au désassembleur.
    pub display: String,
}

/// Plage `[start, end)` d'octets partageant une ligne.
#[derive(Debug, Serialize)]
pub struct LineRunJson {
    /// Premier octet.
    pub range_start: usize,
    /// Fin exclue.
    pub range_end: usize,
    /// Ligne source.
    pub line: u32,
}

/// Construit la vue JSON.
pub fn build_json<'a, A: Allocator>(chunk: &Chunk<A>, name: &'a Utf8Path) -> ChunkJson<'a> {
    let constants = chunk
        .constants()
        .iter()
        .map(|(index, value)| ConstJson { index, value: *value, display: value.to_string() })
        .collect();
    let line_runs = chunk
        .line_runs()
        .map(|(r, line)| LineRunJson { range_start: r.start, range_end: r.end, line })
        .collect();

    ChunkJson {
        file: name.as_str(),
        bytes: chunk.len(),
        constants,
        instructions: chunk.instructions().collect(),
        line_runs,
    }
}

/// Résumé compact d'un chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkSummary {
    /// Octets d'instructions.
    pub bytes: usize,
    /// Instructions décodées (inconnues comprises).
    pub instructions: usize,
    /// Octets qui ne sont pas des opcodes connus.
    pub unknown: usize,
    /// Entrées du pool.
    pub constants: usize,
    /// Capacité du flux d'instructions.
    pub code_capacity: usize,
    /// Capacité du pool.
    pub constants_capacity: usize,
    /// Nombre de groupes de lignes.
    pub line_runs: usize,
    /// Pic mémoire de l'allocateur, si mesuré.
    pub peak_bytes: Option<usize>,
}

/// Calcule le résumé (sans mesure mémoire).
pub fn summarize<A: Allocator>(chunk: &Chunk<A>) -> ChunkSummary {
    let (instructions, unknown) = chunk
        .instructions()
        .fold((0, 0), |(n, u), ins| (n + 1, u + usize::from(ins.is_unknown())));
    ChunkSummary {
        bytes: chunk.len(),
        instructions,
        unknown,
        constants: chunk.constants().len(),
        code_capacity: chunk.code_buffer().capacity(),
        constants_capacity: chunk.constants().capacity(),
        line_runs: chunk.line_runs().count(),
        peak_bytes: None,
    }
}

/// Résumé d'un chunk chargé par [`load_chunk`], avec le pic mémoire.
pub fn summarize_budgeted(chunk: &Chunk<BudgetAllocator>) -> ChunkSummary {
    ChunkSummary { peak_bytes: Some(chunk.allocator().peak()), ..summarize(chunk) }
}

impl fmt::Display for ChunkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bytes={} (cap {}), instructions={}, unknown={}, consts={} (cap {}), line_runs={}",
            self.bytes,
            self.code_capacity,
            self.instructions,
            self.unknown,
            self.constants,
            self.constants_capacity,
            self.line_runs
        )?;
        if let Some(peak) = self.peak_bytes {
            write!(f, ", peak={peak} B")?;
        }
        Ok(())
    }
}

/* ------------------------------------------------------------------------- */
/* Tests                                                                      */
/* ------------------------------------------------------------------------- */

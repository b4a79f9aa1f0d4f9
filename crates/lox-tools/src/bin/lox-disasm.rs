// crates/lox-tools/src/bin/lox-disasm.rs
//! Désassembleur de chunks Lox (source `.loxasm` → listing texte/JSON).
//!
//! Exemples :
//!   lox-disasm demo.loxasm
//!   cat demo.loxasm | lox-disasm - --stdin-name demo.loxasm
//!   lox-disasm demo.loxasm --json | jq
//!   lox-disasm a.loxasm b.loxasm --summary --max-bytes 4096
//!
//! Options utiles :
//!   --json          : vue JSON structurée au lieu du listing
//!   --emit <f>      : écrit la sortie dans un fichier (si 1 entrée)
//!   --summary       : résumé (tailles, capacités, pic mémoire) sur stderr
//!   --max-bytes <n> : plafond mémoire pendant l'assemblage
//!   --config <f>    : config explicite (sinon `.loxdisasm.toml` ascendant)
//!   --color <mode>  : auto|always|never (couleurs pour résumé)
//!   --time          : chrono
//!   --strict        : échec si chunk vide ou octets inconnus
//!   -v / -vv / -q   : verbosité des logs (`RUST_LOG` prioritaire)

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use yansi::{Color, Paint};

use lox_tools::prelude::*;
use lox_tools::{setup_colors as global_setup_colors, ColorMode as GlobalColorMode};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ColorMode { Auto, Always, Never }

impl From<ColorMode> for GlobalColorMode {
    fn from(mode: ColorMode) -> Self {
        match mode {
            ColorMode::Auto => Self::Auto,
            ColorMode::Always => Self::Always,
            ColorMode::Never => Self::Never,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "lox-disasm", version, about = "Désassembleur Lox (.loxasm -> texte/JSON)")]
struct Cli {
    /// Fichier(s) source à analyser (ou '-' pour stdin, unique)
    inputs: Vec<String>,

    /// Affiche un JSON structuré au lieu du listing
    #[arg(long)]
    json: bool,

    /// Chemin fichier où écrire la sortie (si 1 entrée)
    #[arg(long)]
    emit: Option<PathBuf>,

    /// Résumé rapide (tailles/capacités/pic mémoire)
    #[arg(long)]
    summary: bool,

    /// Plafond d'octets vivants pendant l'assemblage
    #[arg(long)]
    max_bytes: Option<usize>,

    /// Fichier de configuration explicite
    #[arg(long)]
    config: Option<PathBuf>,

    /// Couleurs du résumé: auto|always|never
    #[arg(long, value_enum)]
    color: Option<ColorMode>,

    /// Échec si chunk vide ou contenant des octets inconnus
    #[arg(long)]
    strict: bool,

    /// Nom logique quand l’entrée est '-' (stdin)
    #[arg(long, default_value = "<stdin>")]
    stdin_name: String,

    /// Affiche la durée de traitement
    #[arg(long)]
    time: bool,

    /// Verbosité (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Silencieux (erreurs seulement)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Réglages effectifs : config fichier, écrasée par les flags.
struct Settings {
    max_bytes: Option<usize>,
    summary: bool,
    json_pretty: bool,
}

fn main() {
    if let Err(e) = real_main() {
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<()> {
    color_eyre::install().ok();

    let cli = Cli::parse();
    init_logger(cli.verbose, cli.quiet);
    log::debug!("{}", version_banner("lox-disasm"));

    let config_path = cli.config.clone().map(to_utf8).transpose()?;
    let config: ToolConfig = load_config(config_path.as_deref())?;
    global_setup_colors(cli.color.map_or(config.color, GlobalColorMode::from));

    let settings = Settings {
        max_bytes: cli.max_bytes.or(config.max_bytes),
        summary: cli.summary || config.summary,
        json_pretty: config.json_pretty,
    };

    if cli.inputs.is_empty() {
        return Err(anyhow!("Aucune entrée. Exemple: lox-disasm demo.loxasm"));
    }
    if cli.inputs.iter().any(|i| i == "-") && cli.inputs.len() > 1 {
        return Err(anyhow!("'-' (stdin) doit être l'unique entrée"));
    }
    if cli.inputs.len() > 1 && cli.emit.is_some() {
        return Err(anyhow!("Plusieurs entrées → --emit n'a pas de sens"));
    }

    for inp in &cli.inputs {
        let (source, name) = read_input(inp, &cli.stdin_name)?;
        process_one(&source, &name, &cli, &settings)?;
    }
    Ok(())
}

fn process_one(source: &str, name: &Utf8Path, cli: &Cli, settings: &Settings) -> Result<()> {
    let timer = Timer::start();
    let chunk = load_chunk(source, name, settings.max_bytes)?;

    let summary = summarize_budgeted(&chunk);
    if cli.strict {
        if chunk.is_empty() {
            return Err(anyhow!("Chunk vide — échec dû à --strict ({name})"));
        }
        if summary.unknown > 0 {
            return Err(anyhow!("{} octet(s) inconnu(s) — échec dû à --strict ({name})", summary.unknown));
        }
    }

    if settings.summary {
        let title = name.file_name().unwrap_or("<stdin>");
        eprintln!("{}", format!("== {title} ==").paint(Color::Cyan).bold());
        eprintln!("{} {summary}", "•".paint(Color::Blue));
    }

    let out = if cli.json {
        let j = build_json(&chunk, name);
        if settings.json_pretty { serde_json::to_string_pretty(&j)? } else { serde_json::to_string(&j)? }
    } else {
        render_text(&chunk, name)
    };

    if let Some(file) = &cli.emit {
        let dest = to_utf8(file.clone())?;
        write_text(&dest, &out)?;
        eprintln!("📝 {name} → {dest}");
    } else if cli.json {
        println!("{out}");
    } else {
        print!("{out}");
    }

    if cli.time {
        eprintln!("⏱️  {}", timer.pretty());
    }
    Ok(())
}

// CLI binary — panicking on unrecoverable errors is standard for CLI tools.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::unreachable, clippy::indexing_slicing)]

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde_json::json;

use pixel_walle::dsl::builtins::{Category, BUILTINS};
use pixel_walle::dsl::{self, lexer, RunError};
use pixel_walle::model::Canvas;
use pixel_walle::project::{self, ExportFormat};
use pixel_walle::settings::{self, AppSettings};
use pixel_walle::theme::{self, ColorResolver, Theme};
use pixel_walle::paths;

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "pixel-walle-cli", about = "Pixel Wall-E drawing language runner", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config directory override (settings.json, themes/)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Output raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script on a fresh canvas and write the image
    Run {
        script: PathBuf,
        /// Canvas side length
        #[arg(long)]
        size: Option<usize>,
        /// Background color name or #rrggbb
        #[arg(long)]
        background: Option<String>,
        /// Theme file, or theme name under the config dir's themes/
        #[arg(long)]
        theme: Option<String>,
        /// Output file (default: next to the script)
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, value_enum)]
        format: Option<ExportFormat>,
    },
    /// Lex, parse and analyze a script without running it
    Check { script: PathBuf },
    /// Dump the token stream
    Tokens { script: PathBuf },
    /// List every command and query
    Reference,
    /// List every color name a script can use
    Colors {
        #[arg(long)]
        theme: Option<String>,
    },
    /// Show or update stored settings
    Settings {
        #[arg(long)]
        set_size: Option<usize>,
        #[arg(long)]
        set_background: Option<String>,
        #[arg(long)]
        set_theme: Option<PathBuf>,
        #[arg(long)]
        set_max_goto_visits: Option<u32>,
    },
}

// ── Helpers ──────────────────────────────────────────────────────

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    process::exit(1);
}

fn read_script(path: &Path) -> String {
    if !paths::is_script(path) {
        eprintln!(
            "[PixelWallE] Warning: '{}' does not have the .{} extension",
            path.display(),
            paths::SCRIPT_EXTENSION
        );
    }
    project::load_script(path).unwrap_or_else(|e| fail(format!("{}: {e}", path.display())))
}

fn load_theme_ref(config_dir: &Path, reference: Option<&str>) -> Option<Theme> {
    let reference = reference?;
    let path = paths::theme_path(config_dir, reference);
    match theme::load_theme(&path) {
        Ok(t) => {
            eprintln!("[PixelWallE] Loaded theme '{}' ({} colors)", t.name, t.colors.len());
            Some(t)
        }
        Err(e) => fail(format!("theme '{reference}': {e}")),
    }
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// ── Subcommands ──────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    config_dir: &Path,
    settings: &AppSettings,
    raw_json: bool,
    script: &Path,
    size: Option<usize>,
    background: Option<String>,
    theme_ref: Option<String>,
    out: Option<PathBuf>,
    format: Option<ExportFormat>,
) {
    let source = read_script(script);
    let theme_ref = theme_ref.or_else(|| settings.theme.as_ref().map(|p| p.display().to_string()));
    let theme = load_theme_ref(config_dir, theme_ref.as_deref());
    let resolver = theme.as_ref().map(|t| t as &dyn ColorResolver);

    let size = size.unwrap_or(settings.canvas_size);
    if size == 0 {
        fail("canvas size must be at least 1");
    }
    let background_name = background.unwrap_or_else(|| settings.background.clone());
    let bg = theme::resolve_background(&background_name, resolver)
        .unwrap_or_else(|| fail(format!("unknown background color '{background_name}'")));

    let format = format.unwrap_or(settings.export_format);
    let out = out.unwrap_or_else(|| script.with_extension(format.extension()));

    let mut canvas = Canvas::new(size, bg);
    let result = dsl::run_source(&source, &mut canvas, resolver, &settings.interpreter_options());

    match result {
        Err(RunError::Compile(errors)) => {
            if raw_json {
                let errors: Vec<String> = errors.iter().map(ToString::to_string).collect();
                print_json(&json!({ "ok": false, "errors": errors }));
            } else {
                for e in &errors {
                    eprintln!("{e}");
                }
                eprintln!("[PixelWallE] {} error(s), nothing drawn", errors.len());
            }
            process::exit(1);
        }
        Err(RunError::Runtime(e)) => {
            // Partial drawings are still written so the fault can be inspected.
            project::export_canvas(&canvas, &out, format).unwrap_or_else(|err| fail(err));
            if raw_json {
                print_json(&json!({ "ok": false, "errors": [e.to_string()], "output": out }));
            } else {
                eprintln!("{e}");
                eprintln!("[PixelWallE] Partial canvas written to {}", out.display());
            }
            process::exit(1);
        }
        Ok(report) => {
            project::export_canvas(&canvas, &out, format).unwrap_or_else(|err| fail(err));
            if raw_json {
                print_json(&json!({ "ok": true, "report": report, "output": out }));
            } else {
                let pointer = report
                    .pointer
                    .map_or_else(|| "-".to_string(), |(x, y)| format!("({x}, {y})"));
                println!(
                    "Drew {size}x{size} canvas in {} steps, Wall-E at {pointer}, brush {} size {}",
                    report.steps,
                    report.brush_color.to_hex(),
                    report.brush_size
                );
                println!("Wrote {}", out.display());
            }
        }
    }
}

fn cmd_check(raw_json: bool, script: &Path) {
    let source = read_script(script);
    match dsl::compile_source(&source) {
        Ok(program) => {
            if raw_json {
                print_json(&json!({ "ok": true, "statements": program.statements.len() }));
            } else {
                println!("OK: {} statement(s)", program.statements.len());
            }
        }
        Err(errors) => {
            if raw_json {
                let errors: Vec<String> = errors.iter().map(ToString::to_string).collect();
                print_json(&json!({ "ok": false, "errors": errors }));
            } else {
                for e in &errors {
                    println!("{e}");
                }
            }
            process::exit(1);
        }
    }
}

fn cmd_tokens(raw_json: bool, script: &Path) {
    let source = read_script(script);
    let (tokens, errors) = lexer::lex(&source);
    if raw_json {
        let tokens: Vec<_> = tokens
            .iter()
            .map(|t| json!({ "token": format!("{:?}", t.token), "line": t.span.line, "column": t.span.column }))
            .collect();
        let errors: Vec<String> = errors.iter().map(ToString::to_string).collect();
        print_json(&json!({ "tokens": tokens, "errors": errors }));
    } else {
        for t in &tokens {
            println!("{:>4}:{:<4} {:?}", t.span.line, t.span.column, t.token);
        }
        for e in &errors {
            eprintln!("{e}");
        }
    }
    if !errors.is_empty() {
        process::exit(1);
    }
}

fn cmd_reference(raw_json: bool) {
    if raw_json {
        let entries: Vec<_> = BUILTINS
            .iter()
            .map(|b| {
                json!({
                    "name": b.name,
                    "category": match b.category { Category::Command => "command", Category::Function => "function" },
                    "signature": b.signature(),
                    "description": b.description,
                })
            })
            .collect();
        print_json(&json!(entries));
        return;
    }
    for (title, category) in [("Commands", Category::Command), ("Queries", Category::Function)] {
        println!("{title}:");
        for b in BUILTINS.iter().filter(|b| b.category == category) {
            println!("  {:<70} {}", b.signature(), b.description);
        }
    }
    println!("Control flow:");
    println!("  {:<70} Jump to label when the condition is true", "GoTo [label] (condition: Boolean)");
}

fn cmd_colors(config_dir: &Path, settings: &AppSettings, raw_json: bool, theme_ref: Option<String>) {
    let theme_ref = theme_ref.or_else(|| settings.theme.as_ref().map(|p| p.display().to_string()));
    let theme = load_theme_ref(config_dir, theme_ref.as_deref());
    let legend = theme::legend(theme.as_ref());
    if raw_json {
        let entries: Vec<_> = legend
            .iter()
            .map(|(name, color)| json!({ "name": name, "color": color, "hex": color.to_hex() }))
            .collect();
        print_json(&json!(entries));
    } else {
        for (name, color) in &legend {
            println!("  {name:<16} {}", color.to_hex());
        }
    }
}

fn cmd_settings(
    config_dir: &Path,
    mut current: AppSettings,
    raw_json: bool,
    set_size: Option<usize>,
    set_background: Option<String>,
    set_theme: Option<PathBuf>,
    set_max_goto_visits: Option<u32>,
) {
    let changing =
        set_size.is_some() || set_background.is_some() || set_theme.is_some() || set_max_goto_visits.is_some();
    if let Some(size) = set_size {
        current.canvas_size = size;
    }
    if let Some(bg) = set_background {
        if theme::resolve_background(&bg, None).is_none() {
            eprintln!("[PixelWallE] Warning: '{bg}' is not a built-in color or hex value; it must come from a theme");
        }
        current.background = bg;
    }
    if let Some(theme) = set_theme {
        current.theme = (!theme.as_os_str().is_empty()).then_some(theme);
    }
    if let Some(max) = set_max_goto_visits {
        current.max_goto_visits = max;
    }
    if changing {
        settings::save_settings(config_dir, &current).unwrap_or_else(|e| fail(e));
        eprintln!("[PixelWallE] Saved {}", paths::settings_path(config_dir).display());
    }
    if raw_json {
        print_json(&serde_json::to_value(&current).unwrap_or_default());
    } else {
        println!("canvas_size:     {}", current.canvas_size);
        println!("background:      {}", current.background);
        println!(
            "theme:           {}",
            current.theme.as_ref().map_or_else(|| "(none)".to_string(), |p| p.display().to_string())
        );
        println!("max_goto_visits: {}", current.max_goto_visits);
        println!("export_format:   {}", current.export_format.extension());
    }
}

// ── Main ─────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    let config_dir = cli.config_dir.clone().unwrap_or_else(paths::default_config_dir);
    let settings = settings::load_settings(&config_dir).unwrap_or_default();
    if let Err(e) = settings.validate() {
        fail(e);
    }
    let raw = cli.json;

    match cli.command {
        Commands::Run { script, size, background, theme, out, format } => {
            cmd_run(&config_dir, &settings, raw, &script, size, background, theme, out, format);
        }
        Commands::Check { script } => cmd_check(raw, &script),
        Commands::Tokens { script } => cmd_tokens(raw, &script),
        Commands::Reference => cmd_reference(raw),
        Commands::Colors { theme } => cmd_colors(&config_dir, &settings, raw, theme),
        Commands::Settings { set_size, set_background, set_theme, set_max_goto_visits } => {
            cmd_settings(&config_dir, settings, raw, set_size, set_background, set_theme, set_max_goto_visits);
        }
    }
}

#![deny(unsafe_code)]
//! CLI binary for flowfield.
//!
//! Subcommands:
//! - `render` runs an engine for N ticks and writes a PNG
//! - `synth` prints the field source synthesized from a seed
//! - `share` encodes or decodes share strings
//! - `library` saves, loads, lists and deletes named field functions
//! - `presets` lists the named configurations

mod error;

use clap::{Args, Parser, Subcommand};
use error::CliError;
use flowfield_core::{DVec2, FunctionLibrary, FunctionRecord, ShareParams, Viewport, Xorshift64};
use flowfield_expr::{compile, parse_source, render_source, synthesize_with, Grammar};
use flowfield_flow::{FlowConfig, FlowEngine, PRESET_NAMES, REFERENCE_FRAME_MS};
use flowfield_render::Raster;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

#[derive(Parser)]
#[command(name = "flowfield", about = "Particles drifting through synthesized vector fields")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the simulation for N ticks and write a PNG snapshot.
    Render(RenderArgs),
    /// Print the field source synthesized from a seed.
    Synth {
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Use the minimal point-and-arithmetic grammar.
        #[arg(long)]
        pinned: bool,
    },
    /// Encode a share string for a seed, or decode one.
    Share {
        #[arg(long, required_unless_present = "decode", conflicts_with = "decode")]
        seed: Option<u64>,

        /// Preset supplying the tunables when encoding.
        #[arg(long, default_value = "organic")]
        preset: String,

        /// Share string to decode.
        #[arg(long)]
        decode: Option<String>,
    },
    /// Manage saved field functions.
    Library {
        /// Library file.
        #[arg(long, default_value = "flowfield-library.json")]
        file: PathBuf,

        #[command(subcommand)]
        action: LibraryAction,
    },
    /// List the named presets.
    Presets,
}

#[derive(Args)]
struct RenderArgs {
    /// Preset name (see `flowfield presets`).
    #[arg(long, default_value = "organic")]
    preset: String,

    /// Field seed.
    #[arg(long, default_value_t = 42, conflicts_with = "share")]
    seed: u64,

    /// Share string to rebuild instead of a seed.
    #[arg(long)]
    share: Option<String>,

    /// Field source file (`dx = ...` / `dy = ...`) replacing the seeded field.
    #[arg(long)]
    source_file: Option<PathBuf>,

    /// Canvas width in pixels.
    #[arg(short = 'W', long, default_value_t = 512)]
    width: usize,

    /// Canvas height in pixels.
    #[arg(short = 'H', long, default_value_t = 512)]
    height: usize,

    /// Number of simulation ticks.
    #[arg(short, long, default_value_t = 300)]
    ticks: usize,

    /// Milliseconds per tick.
    #[arg(long, default_value_t = REFERENCE_FRAME_MS)]
    delta_ms: f64,

    /// Pointer position as `x,y`.
    #[arg(long)]
    pointer: Option<String>,

    /// Particles to burst at the pointer before the first tick.
    #[arg(long)]
    burst: Option<usize>,

    /// Overlay field arrows.
    #[arg(long)]
    show_field: bool,

    /// Parameter overrides as a JSON object.
    #[arg(long, default_value = "{}")]
    params: String,

    /// Output file path.
    #[arg(short, long, default_value = "flowfield.png")]
    output: PathBuf,
}

#[derive(Subcommand)]
enum LibraryAction {
    /// Save the field for a seed, or from a source file, under a name.
    Save {
        name: String,

        #[arg(long, default_value_t = 42, conflicts_with = "source_file")]
        seed: u64,

        #[arg(long)]
        source_file: Option<PathBuf>,

        /// Replace an existing record of the same name.
        #[arg(long)]
        overwrite: bool,
    },
    /// Print a saved function's source.
    Load { name: String },
    /// List saved functions.
    List,
    /// Delete a saved function.
    Delete { name: String },
}

/// Parses `x,y` into a point.
fn parse_pointer(text: &str) -> Result<DVec2, CliError> {
    let invalid = || CliError::Input(format!("invalid --pointer '{text}': expected x,y"));
    let (x, y) = text.split_once(',').ok_or_else(invalid)?;
    let x: f64 = x.trim().parse().map_err(|_| invalid())?;
    let y: f64 = y.trim().parse().map_err(|_| invalid())?;
    if !(x.is_finite() && y.is_finite()) {
        return Err(invalid());
    }
    Ok(DVec2::new(x, y))
}

fn read_source(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| CliError::Io(format!("{}: {e}", path.display())))
}

/// Source text of the function field synthesized from `seed`.
fn synthesized_source(seed: u64, grammar: &Grammar) -> Result<String, CliError> {
    let (x, y) = synthesize_with(grammar, &mut Xorshift64::seeded(seed))?;
    Ok(render_source(&x, &y))
}

/// Checks that `code` parses and compiles.
fn validate_source(code: &str) -> Result<(), CliError> {
    let (x, y) = parse_source(code)?;
    compile(x, y)
        .map(|_| ())
        .ok_or_else(|| CliError::Input("field source exceeds the node limit".into()))
}

fn print(json_mode: bool, value: &Value, text: impl FnOnce() -> String) -> Result<(), CliError> {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

fn render(json_mode: bool, args: &RenderArgs) -> Result<(), CliError> {
    let params: Value = serde_json::from_str(&args.params)
        .map_err(|e| CliError::Input(format!("invalid --params JSON: {e}")))?;
    let mut config = FlowConfig::preset(&args.preset)?.with_overrides(&params)?;
    config.show_field |= args.show_field;

    let (width, height) = (args.width, args.height);
    let viewport = Viewport::new(width as f64, height as f64)?;
    let mut engine = match &args.share {
        Some(s) => FlowEngine::from_share(viewport, &config, &ShareParams::decode(s)?)?,
        None => FlowEngine::new(viewport, config, args.seed)?,
    };
    if let Some(path) = &args.source_file {
        engine.load_source(&read_source(path)?)?;
    }
    if let Some(text) = &args.pointer {
        engine.set_pointer(Some(parse_pointer(text)?));
    }
    if let Some(count) = args.burst {
        engine.spawn_burst(count);
    }

    let mut raster = Raster::new(width, height)?;
    flowfield_render::expose(&mut engine, &mut raster, args.ticks, args.delta_ms);
    flowfield_render::snapshot::write_png(&raster, &args.output)?;
    tracing::info!(output = %args.output.display(), frame = engine.frame(), "render finished");

    let share = engine.share_params().map(|s| s.encode());
    if json_mode {
        let info = json!({
            "preset": args.preset,
            "seed": engine.seed(),
            "share": share,
            "source": engine.source(),
            "width": width,
            "height": height,
            "ticks": args.ticks,
            "particles": engine.system().len(),
            "params": engine.params(),
            "output": args.output.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        let origin = match (&share, engine.source()) {
            (Some(s), _) => format!("share {s}"),
            (None, Some(_)) => "source file".to_string(),
            (None, None) => "no field".to_string(),
        };
        eprintln!(
            "rendered {} ({width}x{height}, {} ticks, {origin}) -> {}",
            args.preset,
            args.ticks,
            args.output.display()
        );
    }
    Ok(())
}

fn library(json_mode: bool, file: &Path, action: LibraryAction) -> Result<(), CliError> {
    let mut lib = FunctionLibrary::load(file)?;
    match action {
        LibraryAction::Save {
            name,
            seed,
            source_file,
            overwrite,
        } => {
            let code = match source_file {
                Some(path) => {
                    let code = read_source(&path)?;
                    validate_source(&code)?;
                    code
                }
                None => synthesized_source(seed, &Grammar::full())?,
            };
            let record = FunctionRecord::new(name, code);
            let info = serde_json::to_value(&record)?;
            let message = format!("saved '{}' to {}", record.name, file.display());
            lib.insert(record, overwrite)?;
            lib.save(file)?;
            print(json_mode, &info, || message)
        }
        LibraryAction::Load { name } => {
            let record = lib.get(&name)?;
            print(json_mode, &serde_json::to_value(record)?, || {
                record.code.trim_end().to_string()
            })
        }
        LibraryAction::List => {
            let names = lib.names();
            print(json_mode, &json!(names), || names.join("\n"))
        }
        LibraryAction::Delete { name } => {
            let record = lib.remove(&name)?;
            lib.save(file)?;
            print(json_mode, &json!({ "deleted": record.name }), || {
                format!("deleted '{}'", record.name)
            })
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let json_mode = cli.json;
    match cli.command {
        Command::Render(args) => render(json_mode, &args),
        Command::Synth { seed, pinned } => {
            let grammar = if pinned {
                Grammar::pinned()
            } else {
                Grammar::full()
            };
            let (x, y) = synthesize_with(&grammar, &mut Xorshift64::seeded(seed))?;
            let info = json!({
                "seed": seed,
                "dx": x.to_string(),
                "dy": y.to_string(),
                "nodes": x.size() + y.size(),
            });
            print(json_mode, &info, || render_source(&x, &y).trim_end().to_string())
        }
        Command::Share {
            seed,
            preset,
            decode,
        } => {
            let share = match (decode, seed) {
                (Some(text), _) => ShareParams::decode(&text)?,
                (None, Some(seed)) => {
                    let config = FlowConfig::preset(&preset)?;
                    ShareParams {
                        seed,
                        particle_count: config.particles.count,
                        flow_intensity: config.evaluator.flow_intensity,
                        scale: config.evaluator.scale,
                        decay: config.decay,
                    }
                }
                (None, None) => {
                    return Err(CliError::Input("either --seed or --decode is required".into()))
                }
            };
            let mut info = serde_json::to_value(share)?;
            info["encoded"] = json!(share.encode());
            print(json_mode, &info, || share.encode())
        }
        Command::Library { file, action } => library(json_mode, &file, action),
        Command::Presets => {
            let mut presets = serde_json::Map::new();
            for name in PRESET_NAMES {
                presets.insert(name.to_string(), FlowConfig::preset(name)?.params());
            }
            print(json_mode, &Value::Object(presets), || PRESET_NAMES.join("\n"))
        }
    }
}

/// Installs a stderr subscriber honouring `RUST_LOG`, defaulting to `warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);
    Registry::default().with(filter).with(fmt_layer).init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_pointer_accepts_pairs() {
        assert_eq!(parse_pointer("10,20.5").ok(), Some(DVec2::new(10.0, 20.5)));
        assert_eq!(parse_pointer(" -3 , 4 ").ok(), Some(DVec2::new(-3.0, 4.0)));
    }

    #[test]
    fn parse_pointer_rejects_garbage() {
        for text in ["10", "a,b", "1,2,3", "NaN,1", "inf,0"] {
            let err = parse_pointer(text).err().map(|e| e.exit_code());
            assert_eq!(err, Some(12), "{text}");
        }
    }

    #[test]
    fn synthesized_source_matches_pinned_golden() {
        let source = synthesized_source(42, &Grammar::pinned()).ok();
        assert_eq!(source.as_deref(), Some("dx = x-y\ndy = x*y\n"));
    }

    #[test]
    fn validate_source_reports_parse_errors_as_input() {
        assert!(validate_source("dx = x\ndy = y\n").is_ok());
        let err = validate_source("dx = (x\ndy = y\n").err().map(|e| e.exit_code());
        assert_eq!(err, Some(12));
    }

    fn render_args(output: PathBuf) -> RenderArgs {
        RenderArgs {
            preset: "calm".into(),
            seed: 7,
            share: None,
            source_file: None,
            width: 64,
            height: 48,
            ticks: 5,
            delta_ms: REFERENCE_FRAME_MS,
            pointer: Some("10,10".into()),
            burst: Some(5),
            show_field: true,
            params: r#"{"particle_count": 30}"#.into(),
            output,
        }
    }

    #[test]
    fn render_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let args = render_args(dir.path().join("out.png"));
        assert!(render(true, &args).is_ok());
        assert!(args.output.exists());
    }

    #[test]
    fn render_from_share_and_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("field.txt");
        std::fs::write(&source, "dx = sin(y)\ndy = cos(x)\n").unwrap();
        let mut args = render_args(dir.path().join("shared.png"));
        args.share = Some("#99,40,3,5,0.9".into());
        assert!(render(false, &args).is_ok());
        args.source_file = Some(source);
        assert!(render(false, &args).is_ok());
    }

    #[test]
    fn render_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = render_args(dir.path().join("x.png"));
        args.params = "{not json".into();
        assert_eq!(render(false, &args).err().map(|e| e.exit_code()), Some(12));

        let mut args = render_args(dir.path().join("x.png"));
        args.preset = "neon".into();
        assert_eq!(render(false, &args).err().map(|e| e.exit_code()), Some(12));

        let mut args = render_args(dir.path().join("x.png"));
        args.source_file = Some(dir.path().join("missing.txt"));
        assert_eq!(render(false, &args).err().map(|e| e.exit_code()), Some(11));
    }

    #[test]
    fn library_save_load_delete_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lib.json");
        let save = |name: &str, overwrite| {
            library(
                true,
                &file,
                LibraryAction::Save {
                    name: name.into(),
                    seed: 42,
                    source_file: None,
                    overwrite,
                },
            )
        };
        assert!(save("spiral", false).is_ok());
        assert_eq!(save("spiral", false).err().map(|e| e.exit_code()), Some(12));
        assert!(save("spiral", true).is_ok());

        let lib = FunctionLibrary::load(&file).ok().unwrap();
        let record = lib.get("spiral").ok().unwrap();
        assert_eq!(record.code, synthesized_source(42, &Grammar::full()).ok().unwrap());

        assert!(library(false, &file, LibraryAction::Delete { name: "spiral".into() }).is_ok());
        let missing = library(false, &file, LibraryAction::Load { name: "spiral".into() });
        assert_eq!(missing.err().map(|e| e.exit_code()), Some(12));
    }
}

//! calforge CLI
//!
//! Command-line interface for inspecting character asset files and
//! assembling characters from manifests.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};

use calforge_character::{CharacterLoader, FailurePolicy, LoadOptions};
use calforge_parsers::logging::{self, TracingConfig};
use calforge_parsers::{
    parse_file_required, probe_kind, AnimationParser, AssetKind, HumanReadable, Manifest,
    MarkupMaterialParser, MaterialParser, MeshParser, ParseOptions, SkeletonParser,
};

/// calforge - character asset decoder and assembler
#[derive(Parser)]
#[command(name = "calforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format: text, json or yaml
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Position scale factor (overrides the manifest scale)
    #[arg(long, global = true)]
    scale: Option<f32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            _ => Err(format!("Unknown format: {s}")),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a single asset file and summarize it
    Info(InfoArgs),

    /// Load and assemble a character from a manifest
    Load(LoadArgs),

    /// Print the bone hierarchy of a skeleton or a manifest's skeleton
    Bones(BonesArgs),
}

#[derive(Args)]
struct InfoArgs {
    /// Asset file (.csf, .cmf, .caf, .crf, .xrf)
    path: PathBuf,
}

#[derive(Args)]
struct LoadArgs {
    /// Character manifest
    manifest: PathBuf,

    /// Also report merged mesh buffers
    #[arg(long)]
    merged: bool,

    /// Leave out files that fail to decode instead of aborting
    #[arg(long)]
    skip_failed: bool,

    /// Decode files one after another
    #[arg(long)]
    sequential: bool,
}

#[derive(Args)]
struct BonesArgs {
    /// Skeleton file or character manifest
    path: PathBuf,
}

fn setup_logging(verbosity: u8) {
    if !logging::init_with_config(TracingConfig::for_verbosity(verbosity)) {
        debug!("Tracing subscriber already installed");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Info(args) => cmd_info(args, cli.scale, cli.format),
        Commands::Load(args) => cmd_load(args, cli.scale, cli.format),
        Commands::Bones(args) => cmd_bones(args, cli.scale, cli.format),
    }
}

fn emit<T: HumanReadable + ?Sized>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", value.to_readable_string()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value.to_json())?),
        OutputFormat::Yaml => print!("{}", value.to_yaml()),
    }
    Ok(())
}

/// Kind by extension, falling back to the magic signature
fn detect_kind(path: &Path) -> Result<AssetKind> {
    if let Some(kind) = AssetKind::from_path(path) {
        return Ok(kind);
    }

    let mut magic = [0u8; 4];
    std::fs::File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .with_context(|| format!("Failed to read {}", path.display()))?;
    match probe_kind(&magic) {
        Some(kind) => Ok(kind),
        None => bail!("Unrecognized asset file: {}", path.display()),
    }
}

fn cmd_info(args: InfoArgs, scale: Option<f32>, format: OutputFormat) -> Result<()> {
    let path = &args.path;
    if !path.exists() {
        bail!("File not found: {}", path.display());
    }

    let kind = detect_kind(path)?;
    let options = ParseOptions::with_scale(scale.unwrap_or(1.0));
    info!("Decoding {} as {}", path.display(), kind);

    let context = || format!("Failed to decode {kind} file {}", path.display());
    match kind {
        AssetKind::Skeleton => {
            let skeleton = parse_file_required(&SkeletonParser::new(), path, &options).with_context(context)?;
            emit(&skeleton, format)
        }
        AssetKind::Mesh => {
            let mesh = parse_file_required(&MeshParser::new(), path, &options).with_context(context)?;
            emit(&mesh, format)
        }
        AssetKind::Animation => {
            let animation = parse_file_required(&AnimationParser::new(), path, &options).with_context(context)?;
            emit(&animation, format)
        }
        AssetKind::Material => {
            let material = parse_file_required(&MaterialParser::new(), path, &options).with_context(context)?;
            emit(&material, format)
        }
        AssetKind::MarkupMaterial => {
            let material =
                parse_file_required(&MarkupMaterialParser::new(), path, &options).with_context(context)?;
            emit(&material, format)
        }
    }
}

fn load_manifest(path: &Path, scale: Option<f32>) -> Result<Manifest> {
    let mut manifest =
        Manifest::load(path).with_context(|| format!("Failed to read manifest {}", path.display()))?;
    if let Some(scale) = scale {
        debug!("Overriding manifest scale {} with {}", manifest.scale, scale);
        manifest.scale = scale;
    }
    Ok(manifest)
}

fn cmd_load(args: LoadArgs, scale: Option<f32>, format: OutputFormat) -> Result<()> {
    let manifest = load_manifest(&args.manifest, scale)?;
    let name = args
        .manifest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "character".to_string());

    let loader = CharacterLoader::new(LoadOptions {
        policy: if args.skip_failed {
            FailurePolicy::SkipFailed
        } else {
            FailurePolicy::Abort
        },
        parallel: !args.sequential,
    });
    let asset = loader
        .load_named(&manifest, name)
        .with_context(|| format!("Failed to load character from {}", args.manifest.display()))?;

    if !args.merged {
        return emit(&asset, format);
    }

    let merged = asset.merged_meshes();
    match format {
        OutputFormat::Text => {
            print!("{}", asset.to_readable_string());
            for mesh in &merged {
                print!("{}", mesh.to_readable_string());
            }
            println!("Bind poses: {}", asset.bind_poses().len());
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            let json = serde_json::json!({
                "character": asset.to_json(),
                "merged": merged.iter().map(HumanReadable::to_json).collect::<Vec<_>>(),
                "bind_poses": asset.bind_poses().len(),
            });
            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&json)?);
            } else {
                print!("{}", serde_yaml::to_string(&json)?);
            }
        }
    }
    Ok(())
}

fn cmd_bones(args: BonesArgs, scale: Option<f32>, format: OutputFormat) -> Result<()> {
    let (skeleton_path, scale) = match AssetKind::from_path(&args.path) {
        Some(AssetKind::Skeleton) => (args.path.clone(), scale.unwrap_or(1.0)),
        _ => {
            let manifest = load_manifest(&args.path, scale)?;
            match manifest.skeleton {
                Some(path) => (path, manifest.scale),
                None => bail!("Manifest {} names no skeleton", args.path.display()),
            }
        }
    };

    let options = ParseOptions::with_scale(scale);
    let skeleton = parse_file_required(&SkeletonParser::new(), &skeleton_path, &options)
        .with_context(|| format!("Failed to decode skeleton {}", skeleton_path.display()))?;

    if let Err(e) = skeleton.validate() {
        tracing::warn!("Skeleton hierarchy is inconsistent: {e}");
    }
    emit(&skeleton, format)
}

//! `ilmctl`: run partition and validation operations over a JSON snapshot

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use ilm_engine::{EngineConfig, InspectionEngine};
use ilm_model::{ItemId, LotId, MemoryGraphStore, Snapshot};
use ilm_partition::PartitionRule;
use ilm_validation::{nearest_standard_angle, validate_angle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn snapshot_arg() -> Arg {
    Arg::new("snapshot")
        .long("snapshot")
        .short('s')
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("JSON snapshot of items, lots, elements and connections")
}

fn item_arg() -> Arg {
    Arg::new("item")
        .long("item")
        .required(true)
        .help("Item id")
}

fn rule_arg() -> Arg {
    Arg::new("rule")
        .long("rule")
        .default_value("BY_LEVEL")
        .value_parser(value_parser!(PartitionRule))
        .help("BY_LEVEL, BY_ZONE or BY_LEVEL_AND_ZONE")
}

fn cli() -> Command {
    Command::new("ilmctl")
        .version(ilm_engine::VERSION)
        .about("Inspection-lot partitioning and validation")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Engine configuration (TOML)"),
        )
        .subcommand(
            Command::new("preview")
                .about("Show the lots a partition commit would create")
                .arg(snapshot_arg())
                .arg(item_arg())
                .arg(rule_arg()),
        )
        .subcommand(
            Command::new("commit")
                .about("Partition unassigned elements into lots")
                .arg(snapshot_arg())
                .arg(item_arg())
                .arg(rule_arg())
                .arg(
                    Arg::new("write")
                        .long("write")
                        .action(ArgAction::SetTrue)
                        .help("Write the updated snapshot back to its file"),
                ),
        )
        .subcommand(
            Command::new("hierarchy")
                .about("Print an item's lots and their members")
                .arg(snapshot_arg())
                .arg(item_arg()),
        )
        .subcommand(
            Command::new("validate-lot")
                .about("Run the approval gates over a lot without changing it")
                .arg(snapshot_arg())
                .arg(Arg::new("lot").long("lot").required(true).help("Lot id")),
        )
        .subcommand(
            Command::new("check-angle")
                .about("Check an angle against the standard fitting angles")
                .arg(
                    Arg::new("angle")
                        .required(true)
                        .allow_negative_numbers(true)
                        .value_parser(value_parser!(f64))
                        .help("Angle in degrees"),
                ),
        )
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(matches: &ArgMatches) -> Result<EngineConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn open(
    args: &ArgMatches,
    config: EngineConfig,
) -> Result<(Arc<MemoryGraphStore>, InspectionEngine, PathBuf)> {
    let path = args
        .get_one::<PathBuf>("snapshot")
        .cloned()
        .context("--snapshot is required")?;
    let snapshot =
        Snapshot::load(&path).with_context(|| format!("loading snapshot {}", path.display()))?;
    let store = Arc::new(MemoryGraphStore::from_snapshot(snapshot));
    let engine = InspectionEngine::new(config, store.clone())?;
    Ok((store, engine, path))
}

fn item(args: &ArgMatches) -> Result<ItemId> {
    args.get_one::<String>("item")
        .map(|id| ItemId::new(id.as_str()))
        .context("--item is required")
}

fn rule(args: &ArgMatches) -> Result<PartitionRule> {
    args.get_one::<PartitionRule>("rule")
        .copied()
        .context("--rule is required")
}

fn save(store: &MemoryGraphStore, path: &Path) -> Result<()> {
    store
        .snapshot()
        .save(path)
        .with_context(|| format!("writing snapshot {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("preview", args)) => {
            let (_, engine, _) = open(args, config)?;
            let preview = engine.partition().preview(&item(args)?, rule(args)?).await?;
            print_json(&preview)
        }
        Some(("commit", args)) => {
            let (store, engine, path) = open(args, config)?;
            let report = engine.partition().commit(&item(args)?, rule(args)?).await?;
            if args.get_flag("write") && !report.is_noop() {
                save(&store, &path)?;
                tracing::info!(path = %path.display(), "snapshot updated");
            }
            print_json(&report)
        }
        Some(("hierarchy", args)) => {
            let (_, engine, _) = open(args, config)?;
            let tree = engine.item_hierarchy(&item(args)?).await?;
            print_json(&tree)
        }
        Some(("validate-lot", args)) => {
            let (_, engine, _) = open(args, config)?;
            let lot_id = args
                .get_one::<String>("lot")
                .map(|id| LotId::new(id.as_str()))
                .context("--lot is required")?;
            let outcome = engine.check_lot(&lot_id).await?;
            print_json(&outcome)?;
            if !outcome.is_passed() {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(("check-angle", args)) => {
            let angle = *args
                .get_one::<f64>("angle")
                .context("angle is required")?;
            let check = validate_angle(angle);
            print_json(&check)?;
            if !check.valid {
                eprintln!("nearest standard angle: {}°", nearest_standard_angle(angle));
                std::process::exit(1);
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

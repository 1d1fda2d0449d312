//! Command-line front end for the landmark registry.
//!
//! # Responsibility
//! - Compose config, logging, database and service for one invocation.
//! - Expose every service operation as a subcommand with JSON output.
//!
//! # Invariants
//! - Each invocation is one unit of work on a freshly opened connection.
//! - Purge refuses to run without `--yes`.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use landmark_core::db::open_db;
use landmark_core::{
    core_version, init_logging_from_config, sqlite_service, CoreConfig, Landmark, LandmarkId,
    LandmarkOperation, SqliteLandmarkService,
};
use log::info;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "landmark", version, about = "Manage hierarchical address landmarks")]
struct Cli {
    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database path; overrides `database.path` from config.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a landmark.
    Add {
        name: String,
        #[command(flatten)]
        location: LocationArgs,
    },
    /// Change fields of an existing landmark.
    Update {
        id: LandmarkId,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        location: LocationArgs,
        /// Make the landmark a root.
        #[arg(long, conflicts_with = "parent")]
        clear_parent: bool,
    },
    /// Fetch one landmark.
    Get {
        key: String,
        #[arg(long, value_enum, default_value_t = LookupKey::Id)]
        by: LookupKey,
    },
    /// List landmarks, active first.
    List {
        #[arg(long)]
        include_retired: bool,
    },
    /// Case-insensitive name prefix search.
    Search {
        #[arg(default_value = "")]
        prefix: String,
        #[arg(long)]
        include_retired: bool,
        #[arg(long)]
        offset: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Count prefix search matches.
    Count {
        #[arg(default_value = "")]
        prefix: String,
        #[arg(long)]
        include_retired: bool,
    },
    /// List landmarks without a parent.
    Roots {
        #[arg(long)]
        include_retired: bool,
    },
    /// List direct children of a landmark.
    Children {
        id: LandmarkId,
        #[arg(long)]
        include_retired: bool,
    },
    /// Retire a landmark.
    Retire {
        id: LandmarkId,
        #[arg(long)]
        reason: String,
    },
    /// Return a retired landmark to service.
    Unretire { id: LandmarkId },
    /// Permanently delete a landmark.
    Purge {
        id: LandmarkId,
        /// Confirm the irreversible delete.
        #[arg(long)]
        yes: bool,
    },
    /// Read or write the address template.
    #[command(subcommand)]
    Template(TemplateCommand),
    /// Show the privilege each operation requires.
    Privileges,
}

#[derive(Debug, Args)]
struct LocationArgs {
    #[arg(long)]
    latitude: Option<String>,
    #[arg(long)]
    longitude: Option<String>,
    #[arg(long)]
    parent: Option<LandmarkId>,
}

#[derive(Debug, Subcommand)]
enum TemplateCommand {
    Get,
    Set {
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        xml: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LookupKey {
    Id,
    Name,
    Uuid,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            println!("{output:#}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Value> {
    let mut config = match &cli.config {
        Some(path) => CoreConfig::from_file(path)
            .with_context(|| format!("failed to load config `{}`", path.display()))?,
        None => CoreConfig::default(),
    };
    if let Some(db) = cli.db {
        config.database.path = db;
    }

    init_logging_from_config(&config.logging)
        .map_err(|message| anyhow!(message))
        .context("failed to initialize logging")?;
    info!(
        "event=cli_start module=cli status=ok version={}",
        core_version()
    );

    let conn = open_db(&config.database.path).with_context(|| {
        format!(
            "failed to open database `{}`",
            config.database.path.display()
        )
    })?;
    let service = sqlite_service(&conn).context("database schema is not usable")?;
    execute(&service, cli.command)
}

fn execute(service: &SqliteLandmarkService<'_>, command: Command) -> Result<Value> {
    match command {
        Command::Add { name, location } => {
            let mut landmark = Landmark::new(name);
            location.apply(&mut landmark);
            landmark_json(&service.save_landmark(&landmark)?)
        }
        Command::Update {
            id,
            name,
            location,
            clear_parent,
        } => {
            let mut landmark = require(service, id)?;
            if let Some(name) = name {
                landmark.name = name;
            }
            location.apply(&mut landmark);
            if clear_parent {
                landmark.parent_id = None;
            }
            landmark_json(&service.save_landmark(&landmark)?)
        }
        Command::Get { key, by } => {
            let found = match by {
                LookupKey::Id => {
                    let id = key
                        .parse::<LandmarkId>()
                        .with_context(|| format!("`{key}` is not a landmark id"))?;
                    service.get_landmark(id)?
                }
                LookupKey::Name => service.get_landmark_by_name(&key)?,
                LookupKey::Uuid => {
                    let uuid = Uuid::parse_str(&key)
                        .with_context(|| format!("`{key}` is not a uuid"))?;
                    service.get_landmark_by_uuid(uuid)?
                }
            };
            match found {
                Some(landmark) => landmark_json(&landmark),
                None => Ok(Value::Null),
            }
        }
        Command::List { include_retired } => list_json(service.list_landmarks(include_retired)?),
        Command::Search {
            prefix,
            include_retired,
            offset,
            limit,
        } => list_json(service.search_landmarks(&prefix, include_retired, offset, limit)?),
        Command::Count {
            prefix,
            include_retired,
        } => Ok(json!({ "count": service.count_landmarks(&prefix, include_retired)? })),
        Command::Roots { include_retired } => {
            list_json(service.get_root_landmarks(include_retired)?)
        }
        Command::Children {
            id,
            include_retired,
        } => list_json(service.get_child_landmarks(id, include_retired)?),
        Command::Retire { id, reason } => {
            let landmark = require(service, id)?;
            landmark_json(&service.retire_landmark(&landmark, &reason)?)
        }
        Command::Unretire { id } => {
            let landmark = require(service, id)?;
            landmark_json(&service.unretire_landmark(&landmark)?)
        }
        Command::Purge { id, yes } => {
            if !yes {
                bail!("purge is irreversible; pass --yes to confirm");
            }
            let landmark = require(service, id)?;
            service.purge_landmark(&landmark)?;
            Ok(json!({ "purged": id }))
        }
        Command::Template(TemplateCommand::Get) => {
            Ok(json!({ "template": service.get_address_template()? }))
        }
        Command::Template(TemplateCommand::Set { xml, file }) => {
            let xml = match (xml, file) {
                (Some(xml), _) => xml,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read template `{}`", path.display()))?,
                (None, None) => bail!("provide template XML or --file"),
            };
            service.save_address_template(&xml)?;
            Ok(json!({ "saved": true }))
        }
        Command::Privileges => {
            let entries: serde_json::Map<String, Value> = LandmarkOperation::ALL
                .iter()
                .map(|operation| {
                    (
                        operation.as_str().to_string(),
                        Value::String(operation.required_privilege().as_str().to_string()),
                    )
                })
                .collect();
            Ok(Value::Object(entries))
        }
    }
}

impl LocationArgs {
    fn apply(self, landmark: &mut Landmark) {
        if let Some(latitude) = self.latitude {
            landmark.latitude = Some(latitude);
        }
        if let Some(longitude) = self.longitude {
            landmark.longitude = Some(longitude);
        }
        if let Some(parent) = self.parent {
            landmark.parent_id = Some(parent);
        }
    }
}

fn require(service: &SqliteLandmarkService<'_>, id: LandmarkId) -> Result<Landmark> {
    service
        .get_landmark(id)?
        .ok_or_else(|| anyhow!("landmark not found: {id}"))
}

fn landmark_json(landmark: &Landmark) -> Result<Value> {
    serde_json::to_value(landmark).context("failed to encode landmark")
}

fn list_json(landmarks: Vec<Landmark>) -> Result<Value> {
    serde_json::to_value(landmarks).context("failed to encode landmarks")
}

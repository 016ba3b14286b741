//! Command-line surface.

use crate::demo::{self, User, UserRepository};
use crate::output::{print_bindings, print_report, OutputFormat};
use clap::{Parser, Subcommand};
use log::info;
use repokit_core::registry::{parse_capability, Contract};
use repokit_core::{
    build_container, init_logging, AuditedRepo, IdentifiedRepo, KeyedRepo, MessageBus,
    RepoResult, Settings,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "repokit", version, about = "Inspect and exercise repository bindings")]
pub struct Cli {
    /// Settings file; defaults to `repokit.toml` when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register the sample catalog and print the binding table.
    Bindings {
        /// Only show bindings for one capability contract.
        #[arg(long)]
        capability: Option<String>,
    },
    /// Write, soft-delete and restore a user through the bound repositories.
    Demo {
        #[arg(long, default_value = "ada@example.com")]
        email: String,
    },
}

impl Cli {
    pub fn execute(self) -> Result<(), String> {
        let settings = Settings::load(self.config.as_deref()).map_err(|err| err.to_string())?;
        init_logging(&settings.logging).map_err(|err| err.to_string())?;

        match self.command {
            Command::Bindings { capability } => {
                bindings(&settings, capability.as_deref(), self.format)
            }
            Command::Demo { email } => {
                run_demo(&settings, &email, self.format).map_err(|err| err.to_string())
            }
        }
    }
}

fn bindings(
    settings: &Settings,
    capability: Option<&str>,
    format: OutputFormat,
) -> Result<(), String> {
    let filter = capability
        .map(parse_capability)
        .transpose()
        .map_err(|err| err.to_string())?;
    let catalog =
        demo::catalog(settings.storage.sqlite_path.as_deref()).map_err(|err| err.to_string())?;
    let (container, report) = build_container(&catalog, None).map_err(|err| err.to_string())?;

    let rows: Vec<_> = container
        .bindings()
        .into_iter()
        .filter(|binding| match filter {
            Some(capability) => {
                binding.service.starts_with(&format!("{}<", Contract::Interface(capability)))
            }
            None => true,
        })
        .collect();
    print_report(&report, format);
    print_bindings(&rows, format);
    Ok(())
}

fn run_demo(settings: &Settings, email: &str, format: OutputFormat) -> RepoResult<()> {
    let catalog = demo::catalog(settings.storage.sqlite_path.as_deref())?;
    let (container, report) = build_container(&catalog, Some(Arc::new(MessageBus::new())))?;
    print_report(&report, format);

    let users = container.audited::<User>()?;
    let write = users.write_context();
    users.add(vec![User::new(email)])?;
    let summary = users.commit(write)?;
    info!(
        "event=demo_write module=cli status=ok inserted={}",
        summary.inserted.len()
    );

    let authored = container.class_as::<User, UserRepository>("UserRepository")?;
    let Some(user) = authored.find_by_email(email)? else {
        println!("user {email} was not persisted");
        return Ok(());
    };
    println!(
        "stored user #{} guid={} email={}",
        user.id, user.identity.guid, user.email
    );

    let write = users.write_context();
    users.delete(vec![user.clone()])?;
    users.commit(write)?;
    println!(
        "after delete: visible={} stored={}",
        users.all()?.len(),
        users.all_including_deleted()?.len()
    );

    let Some(tombstoned) = users.find_by_guid(user.identity.guid)? else {
        return Ok(());
    };
    let write = users.write_context();
    users.restore(vec![tombstoned])?;
    users.commit(write)?;
    println!("after restore: visible={}", users.all()?.len());
    Ok(())
}

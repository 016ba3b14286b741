//! Table and JSON rendering.

use repokit_core::registry::Binding;
use repokit_core::RegistrationReport;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Serialize)]
struct ReportView<'a> {
    context: &'a str,
    entities: &'a [&'static str],
    authored: &'a [String],
    generic: &'a [String],
    unbound: &'a [&'static str],
}

pub fn print_report(report: &RegistrationReport, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            println!("context: {}", report.context);
            println!("authored: {}", report.authored.join(", "));
            println!("generic: {}", report.generic.join(", "));
            if !report.unbound.is_empty() {
                println!("unbound: {}", report.unbound.join(", "));
            }
        }
        OutputFormat::Json => {
            let view = ReportView {
                context: report.context,
                entities: &report.entities,
                authored: &report.authored,
                generic: &report.generic,
                unbound: &report.unbound,
            };
            print_json(&view);
        }
    }
}

pub fn print_bindings(bindings: &[Binding], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if bindings.is_empty() {
                println!("No bindings.");
                return;
            }
            let width = bindings
                .iter()
                .map(|binding| binding.service.len())
                .max()
                .unwrap_or(0);
            for binding in bindings {
                println!(
                    "{:<width$}  ->  {}",
                    binding.service,
                    binding.implementation,
                    width = width
                );
            }
        }
        OutputFormat::Json => print_json(&bindings),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("failed to render JSON: {err}"),
    }
}

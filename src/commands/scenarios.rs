//! `coachbench scenarios` and `coachbench show` - inspect the scenario bank

use std::path::Path;

use coachbench_core::error::Result;
use coachbench_core::scenario::{self, Scenario};
use serde_json::json;

use crate::cli::{Cli, OutputFormat};

pub fn list(cli: &Cli, dir: &Path) -> Result<()> {
    let scenarios = scenario::load_dir(dir)?;
    match cli.format {
        OutputFormat::Json => {
            let items: Vec<_> = scenarios
                .iter()
                .map(|s| json!({"id": s.id, "name": s.name, "decision": s.decision}))
                .collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        OutputFormat::Human => {
            if scenarios.is_empty() && !cli.quiet {
                println!("No scenarios in {}", dir.display());
            }
            for s in &scenarios {
                println!("{:<28} {}", s.id, s.name);
            }
        }
    }
    Ok(())
}

fn section(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n{}:\n", title));
    for item in items {
        out.push_str(&format!("  - {}\n", item));
    }
}

pub fn describe(s: &Scenario) -> String {
    let mut out = format!("{} ({})\n\n{}\n", s.name, s.id, s.persona.trim());
    section(&mut out, "Constraints", &s.constraints);
    section(&mut out, "Goals", &s.goals);
    section(&mut out, "Conflicts", &s.conflicts);
    section(&mut out, "Red lines", &s.red_lines);
    if !s.starter_context.trim().is_empty() {
        out.push_str(&format!("\nOpening: {}\n", s.starter_context.trim()));
    }
    out.push_str(&format!("\nDecision: {}\n", s.decision_question()));
    out
}

pub fn show(cli: &Cli, dir: &Path, id: &str) -> Result<()> {
    let scenarios = scenario::load_dir(dir)?;
    let found = scenario::find(&scenarios, id)?;
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(found)?),
        OutputFormat::Human => print!("{}", describe(found)),
    }
    Ok(())
}

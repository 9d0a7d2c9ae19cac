//! `acctdiff list-services`

use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::services;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let registry = services::builtin_registry();

    ui::header("Supported Services");
    for (name, info) in registry.service_infos() {
        println!("  {:<18} {}", name.bold(), info.description);
        if ctx.verbose > 0 {
            ui::dim(&format!("    {}", info.resource_types.join(", ")));
        }
    }

    println!();
    ui::kv("Total", &registry.len().to_string());
    if ctx.verbose == 0 {
        ui::dim("Use -v to show resource types");
    }
    Ok(())
}

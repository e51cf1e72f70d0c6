use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use formula_transpile::{
    expand_range, generate_class, CellInfoTable, CodegenOptions, RewriteRules, SheetCell,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Parser)]
#[command(name = "formula-transpile")]
#[command(about = "Translate the formulas of a spreadsheet into a Python class.")]
struct Cli {
    /// Sheet file: `{"cells": {"A1": <value or "=formula">, ...}}`.
    sheet: PathBuf,

    /// Range of alternating header and value cells (e.g. `A8:A29`).
    #[arg(short = 'a', long = "alternating", value_name = "RANGE")]
    alternating: Vec<String>,

    /// Header range and value range of a table, separated by a comma (e.g. `B2:Z2,B33:Z33`).
    #[arg(short = 'z', long = "horizontal", value_name = "HEADERS,VALUES")]
    horizontal: Vec<String>,

    /// Name of the generated class.
    #[arg(long = "class-name", default_value = "Sheet")]
    class_name: String,

    /// JSON file overriding the builtin constant/function substitution tables.
    #[arg(long)]
    rules: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct SheetFile {
    #[serde(default)]
    cells: BTreeMap<String, JsonValue>,
}

impl SheetFile {
    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read sheet {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse sheet {}", path.display()))
    }

    /// Cells of `range` in expansion order; coordinates absent from the file read as empty.
    fn cells_in(&self, range: &str) -> Result<Vec<SheetCell>> {
        let coords = expand_range(range).with_context(|| format!("expand range `{range}`"))?;
        Ok(coords
            .map(|coordinate| {
                let value = self.cells.get(&coordinate).cloned().unwrap_or(JsonValue::Null);
                SheetCell::new(coordinate, value)
            })
            .collect())
    }
}

fn build_table(sheet: &SheetFile, cli: &Cli) -> Result<CellInfoTable> {
    let mut table = CellInfoTable::new();

    for range in &cli.alternating {
        let cells = sheet.cells_in(range)?;
        let part = CellInfoTable::from_alternating(&cells)
            .with_context(|| format!("alternating range `{range}`"))?;
        table
            .merge(part)
            .with_context(|| format!("alternating range `{range}`"))?;
    }

    for pair in &cli.horizontal {
        let (headers, values) = pair
            .split_once(',')
            .with_context(|| format!("expected `HEADERS,VALUES`, got `{pair}`"))?;
        let headers = sheet.cells_in(headers.trim())?;
        let values = sheet.cells_in(values.trim())?;
        let part = CellInfoTable::from_horizontal(&headers, &values)
            .with_context(|| format!("horizontal ranges `{pair}`"))?;
        table
            .merge(part)
            .with_context(|| format!("horizontal ranges `{pair}`"))?;
    }

    Ok(table)
}

fn load_rules(path: Option<&Path>) -> Result<RewriteRules> {
    let Some(path) = path else {
        return Ok(RewriteRules::builtin().clone());
    };
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read rules {}", path.display()))?;
    RewriteRules::from_json_str(&text).with_context(|| format!("parse rules {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if cli.alternating.is_empty() && cli.horizontal.is_empty() {
        anyhow::bail!("no cells selected; pass at least one -a or -z range");
    }

    let sheet = SheetFile::read(&cli.sheet)?;
    let table = build_table(&sheet, &cli)?;
    let rules = load_rules(cli.rules.as_deref())?;
    log::debug!("bound {} cells", table.len());

    let options = CodegenOptions {
        class_name: cli.class_name.clone(),
        ..CodegenOptions::default()
    };
    let module = generate_class(&table, &rules, &options);

    let mut stdout = std::io::stdout().lock();
    let written = stdout
        .write_all(module.source.as_bytes())
        .and_then(|()| stdout.flush());
    if let Err(err) = written {
        if err.kind() != std::io::ErrorKind::BrokenPipe {
            return Err(err).context("write generated source");
        }
    }

    if !module.is_complete() {
        anyhow::bail!(
            "{} of the sheet's formulas could not be translated",
            module.failures.len()
        );
    }
    Ok(())
}

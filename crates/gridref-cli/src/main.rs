//! gridref CLI - formula evaluation and rewriting tool

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gridref::prelude::*;
use gridref::{function_suggestion, show_cell_suggestions};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gridref")]
#[command(author, version, about = "Spreadsheet formula evaluation and rewriting tool")]
struct Cli {
    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a formula
    #[command(alias = "e")]
    Eval {
        /// Formula text (the leading `=` is optional)
        formula: String,

        /// Anchor cell the formula belongs to
        #[arg(short, long, default_value = "Sheet1!A1")]
        at: String,

        /// Cell input as ADDR=INPUT (repeatable), e.g. `A1=10` or `A2==A1*2`
        #[arg(short, long = "cell")]
        cells: Vec<String>,

        /// Largest range a reference may materialize
        #[arg(long)]
        max_range_cells: Option<u64>,
    },

    /// List the ranges a formula references
    Refs {
        formula: String,

        /// Sheet of the formula's own cell
        #[arg(short, long, default_value = "Sheet1")]
        sheet: String,
    },

    /// Show the token stream of a formula
    Tokens {
        formula: String,

        /// Also report editor suggestions at this byte offset
        #[arg(short, long)]
        cursor: Option<usize>,
    },

    /// Rewrite a formula as if copied from one cell to another
    Translate {
        formula: String,

        /// Source cell (A1 notation)
        #[arg(long)]
        from: String,

        /// Destination cell (A1 notation)
        #[arg(long)]
        to: String,
    },

    /// Shift merged regions across a row/column insertion or removal
    Shift {
        /// row-insert, row-remove, column-insert or column-remove
        edit: StructuralEdit,

        /// 1-based row or column index
        index: u32,

        /// Regions as TOP,LEFT,RIGHT,BOTTOM
        #[arg(required = true)]
        boxes: Vec<String>,
    },

    /// Recalculate a sheet of ADDR=INPUT lines and print each formula's outcome
    Recalc {
        /// Input file (default: stdin)
        input: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let json = cli.json;

    match cli.command {
        Commands::Eval {
            formula,
            at,
            cells,
            max_range_cells,
        } => eval(&formula, &at, &cells, max_range_cells, json).await,
        Commands::Refs { formula, sheet } => refs(&formula, &sheet, json),
        Commands::Tokens { formula, cursor } => tokens(&formula, cursor, json),
        Commands::Translate { formula, from, to } => {
            let from = from
                .parse::<Coord>()
                .with_context(|| format!("Invalid source cell '{}'", from))?;
            let to = to
                .parse::<Coord>()
                .with_context(|| format!("Invalid destination cell '{}'", to))?;
            println!("{}", translate(&formula, from, to));
            Ok(())
        }
        Commands::Shift { edit, index, boxes } => shift(edit, index, &boxes, json),
        Commands::Recalc { input } => recalc(input.as_deref(), json).await,
    }
}

async fn eval(
    formula: &str,
    at: &str,
    cells: &[String],
    max_range_cells: Option<u64>,
    json: bool,
) -> Result<()> {
    let anchor = CellAddress::parse_qualified(at, "Sheet1")
        .with_context(|| format!("Invalid anchor cell '{}'", at))?;

    let mut store = CellStore::new();
    for cell in cells {
        load_input(&mut store, cell, &anchor.sheet)?;
    }

    let mut config = EvaluatorConfig::default();
    if let Some(limit) = max_range_cells {
        config.max_range_cells = limit;
    }
    let evaluator = FormulaEvaluator::with_config(config).with_value_getter(store);
    let result = evaluator.evaluate(formula, &anchor, None).await;

    if json {
        print_json(&result)?;
    } else {
        match (&result.error, &result.value) {
            (Some(error), _) => println!("error: {}", error),
            (None, Some(value)) => println!("{}", value),
            (None, None) => println!(),
        }
    }
    Ok(())
}

fn refs(formula: &str, sheet: &str, json: bool) -> Result<()> {
    let ranges = selections_from_input(formula, sheet);
    if json {
        return print_json(&ranges);
    }
    for range in ranges {
        println!("{}", range);
    }
    Ok(())
}

#[derive(Serialize)]
struct CursorReport {
    function: Option<String>,
    show_cell_suggestions: bool,
}

fn tokens(formula: &str, cursor: Option<usize>, json: bool) -> Result<()> {
    let tokens = tokenize(formula).tokens;
    let report = cursor.map(|cursor| CursorReport {
        function: function_suggestion(&tokens, cursor).map(|t| t.image),
        show_cell_suggestions: show_cell_suggestions(&tokens, cursor),
    });

    if json {
        return print_json(&serde_json::json!({ "tokens": tokens, "cursor": report }));
    }

    for token in &tokens {
        println!("{}..{}\t{:?}\t{}", token.start, token.end, token.kind, token.image);
    }
    if let Some(report) = report {
        println!(
            "suggest: {}\tcells: {}",
            report.function.as_deref().unwrap_or("-"),
            report.show_cell_suggestions
        );
    }
    Ok(())
}

fn shift(edit: StructuralEdit, index: u32, boxes: &[String], json: bool) -> Result<()> {
    let boxes = boxes
        .iter()
        .map(|b| parse_box(b))
        .collect::<Result<Vec<_>>>()?;
    let shifted = shift_boxes(&boxes, edit, index);

    if json {
        return print_json(&shifted);
    }
    for b in shifted {
        println!("{},{},{},{}", b.top, b.left, b.right, b.bottom);
    }
    Ok(())
}

fn parse_box(text: &str) -> Result<BoundingBox> {
    let parts = text
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid region '{}'", text))?;
    match parts.as_slice() {
        [top, left, right, bottom] => Ok(BoundingBox::new(*top, *left, *right, *bottom)),
        _ => bail!("Region '{}' needs TOP,LEFT,RIGHT,BOTTOM", text),
    }
}

#[derive(Serialize)]
struct CellOutcome {
    cell: String,
    value: Option<CellValue>,
    error: Option<String>,
}

async fn recalc(input: Option<&Path>, json: bool) -> Result<()> {
    let text = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let mut store = CellStore::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        load_input(&mut store, line, "Sheet1")?;
    }

    let evaluator = FormulaEvaluator::new();
    let stats = Recalculation::new(&evaluator)
        .run(&mut store)
        .await
        .context("Failed to recalculate")?;

    let outcomes: Vec<CellOutcome> = store
        .formula_cells()
        .map(|(addr, config)| CellOutcome {
            cell: addr.to_string(),
            value: config.result.clone(),
            error: config.error.clone(),
        })
        .collect();

    if json {
        return print_json(&outcomes);
    }

    let mut stdout = io::stdout().lock();
    for outcome in &outcomes {
        let shown = match (&outcome.error, &outcome.value) {
            (Some(error), _) => format!("error: {}", error),
            (None, Some(value)) => value.to_string(),
            (None, None) => String::new(),
        };
        writeln!(stdout, "{}\t{}", outcome.cell, shown).context("Failed to write to stdout")?;
    }
    eprintln!(
        "Calculated {} formulas ({} errors, {} circular)",
        stats.cells_calculated, stats.errors, stats.circular_references
    );
    Ok(())
}

/// Store one `ADDR=INPUT` assignment
fn load_input(store: &mut CellStore, assignment: &str, home_sheet: &str) -> Result<()> {
    let (addr, input) = assignment
        .split_once('=')
        .with_context(|| format!("Expected ADDR=INPUT, got '{}'", assignment))?;
    store
        .set_input(home_sheet, addr.trim(), input)
        .with_context(|| format!("Invalid cell '{}'", addr))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};

use cohort_explorer::alert::Alert;
use cohort_explorer::config::ExplorerConfig;
use cohort_explorer::data::cohort::Cohort;
use cohort_explorer::data::columns::format_millis;
use cohort_explorer::data::filter::{ActiveFilters, Filter, FilterValue};
use cohort_explorer::data::model::{ColumnType, EntityId, EntityKind};
use cohort_explorer::data::sorting::ColumnSorting;
use cohort_explorer::state::{AppState, DataState, Session};
use cohort_explorer::tools::{execute_tool_calls, ToolCall, HIGHLIGHT_PATIENT_JOURNEYS};
use cohort_explorer::views::bins::Histogram;
use cohort_explorer::views::scatter::ScatterPlotData;

#[derive(Parser)]
#[command(
    name = "cohort-explorer",
    version,
    about = "Filter and cross-filter linked patient and event tables"
)]
struct Cli {
    /// Patient table (.csv with name and type header rows, or .parquet).
    #[arg(long, value_name = "FILE")]
    patients: PathBuf,

    /// Event table, linked to patients through its pid column.
    #[arg(long, value_name = "FILE")]
    events: PathBuf,

    /// JSON config overriding bin count, default axes and colours.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Table the filters apply to.
    #[arg(long, default_value = "patients")]
    view: EntityKind,

    /// JSON array of `{ "column": NAME, "value": { "type": ..., ... } }`.
    #[arg(long, value_name = "FILE")]
    filters: Option<PathBuf>,

    /// Chart a category, date or timestamp column of the active view.
    #[arg(long = "histogram", value_name = "COLUMN")]
    histograms: Vec<String>,

    /// Scatter plot axes (patient columns).
    #[arg(long, num_args = 2, value_names = ["X", "Y"])]
    scatter: Vec<String>,

    /// Patient ids to highlight as the cohort.
    #[arg(long, value_delimiter = ',', value_name = "PID")]
    highlight: Vec<String>,

    /// Sort the printed rows of the active view by this column.
    #[arg(long, value_name = "COLUMN")]
    sort: Option<String>,

    /// Sort descending.
    #[arg(long, requires = "sort")]
    desc: bool,

    /// Print the first N rows of the active view.
    #[arg(long, default_value_t = 0, value_name = "N")]
    rows: usize,

    /// Print one JSON report instead of text.
    #[arg(long)]
    json: bool,
}

/// A filter as written in a filter file: the column by name only.
#[derive(Debug, Deserialize)]
struct FilterSpec {
    column: String,
    value: FilterValue,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    view: EntityKind,
    patients: Counts,
    events: Counts,
    filters: &'a ActiveFilters,
    cohort: &'a Cohort,
    filtered_out_patients: Vec<EntityId>,
    histograms: BTreeMap<&'a str, &'a Histogram>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scatter: Option<ScatterPlotData>,
    rows: Vec<BTreeMap<&'a str, &'a str>>,
    alerts: &'a [Alert],
}

#[derive(Serialize)]
struct Counts {
    total: usize,
    filtered: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ExplorerConfig::from_file(path)?,
        None => ExplorerConfig::default(),
    };

    let mut state = AppState::new(config);
    if !state.load_files(&cli.patients, &cli.events) {
        for alert in &state.alerts {
            eprintln!("{}: {}", alert.topic, alert.message);
        }
        let reason = match &state.data {
            DataState::Failed { message } => message.clone(),
            other => format!("data state is {}", other.label()),
        };
        bail!("could not load data: {reason}");
    }

    if !cli.highlight.is_empty() {
        let arguments = serde_json::json!({ "pids": cli.highlight }).to_string();
        let call = ToolCall::new("cli", HIGHLIGHT_PATIENT_JOURNEYS, arguments);
        for message in execute_tool_calls(&mut state, &[call]) {
            log::info!("{}", message.content);
        }
    }

    let Some(session) = state.session_mut() else {
        bail!("no session after loading");
    };
    configure(session, &cli)?;
    state.wait();

    let Some(session) = state.session() else {
        bail!("no session after loading");
    };
    if cli.json {
        let report = build_report(session, &cli, &state.alerts);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_text(session, &cli, &state.alerts);
    }
    Ok(())
}

fn configure(session: &mut Session, cli: &Cli) -> Result<()> {
    session.set_view(cli.view);

    if let Some(path) = &cli.filters {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading filters {}", path.display()))?;
        let specs: Vec<FilterSpec> = serde_json::from_str(&text)
            .with_context(|| format!("parsing filters {}", path.display()))?;
        for spec in specs {
            let Some(column) = session.table(cli.view).column(&spec.column).cloned() else {
                bail!("no column '{}' in the {} table", spec.column, cli.view);
            };
            session.add_filter(Filter::new(column, spec.value)?)?;
        }
    }

    if let [x, y] = cli.scatter.as_slice() {
        if !session.set_scatter_axes(Some(x), Some(y)) {
            log::warn!("Scatter axes '{x}' / '{y}' are not both patient columns");
        }
    }

    if let Some(name) = &cli.sort {
        let Some(column) = session.table(cli.view).column(name).cloned() else {
            bail!("no column '{name}' to sort by in the {} table", cli.view);
        };
        let sorting = if cli.desc {
            ColumnSorting::Desc(column)
        } else {
            ColumnSorting::Asc(column)
        };
        session.set_sorting(cli.view, sorting);
    }

    for name in &cli.histograms {
        if !session.request_histogram(name) {
            log::warn!("Column '{name}' has no chart in the {} view", cli.view);
        }
    }
    Ok(())
}

fn counts(session: &Session, kind: EntityKind) -> Counts {
    Counts {
        total: session.table(kind).len(),
        filtered: session.filtered_indices(kind).len(),
    }
}

fn build_report<'a>(session: &'a Session, cli: &'a Cli, alerts: &'a [Alert]) -> Report<'a> {
    let table = session.table(cli.view);
    let rows = session
        .table_rows(cli.view)
        .into_iter()
        .take(cli.rows)
        .map(|row| {
            table
                .columns
                .iter()
                .map(|c| (c.name.as_str(), row.cell(c).unwrap_or("")))
                .collect()
        })
        .collect();

    Report {
        view: session.view(),
        patients: counts(session, EntityKind::Patients),
        events: counts(session, EntityKind::Events),
        filters: session.filters(),
        cohort: session.cohort(),
        filtered_out_patients: session.filtered_out_patient_ids(),
        histograms: cli
            .histograms
            .iter()
            .map(|name| (name.as_str(), session.histogram(name)))
            .collect(),
        scatter: (!cli.scatter.is_empty()).then(|| session.scatter_plot()),
        rows,
        alerts,
    }
}

fn print_text(session: &Session, cli: &Cli, alerts: &[Alert]) {
    for kind in [EntityKind::Patients, EntityKind::Events] {
        let c = counts(session, kind);
        println!("{kind}: {} of {} pass", c.filtered, c.total);
    }
    for filter in session.filters() {
        println!("filter on '{}' ({})", filter.column.name, filter.column_type());
    }
    if !session.cohort().is_empty() {
        println!("cohort: {} patients", session.cohort().len());
    }

    for name in &cli.histograms {
        let column_type = session
            .table(cli.view)
            .column(name)
            .map(|c| c.column_type)
            .unwrap_or(ColumnType::String);
        println!("\n{name}");
        match session.histogram(name) {
            Histogram::Empty => println!("  (no bins)"),
            Histogram::Categories(bins) => {
                for bin in bins {
                    println!("  {:<24} {:>6} in {:>6} out", bin.category, bin.filtered_in, bin.filtered_out);
                }
            }
            Histogram::Intervals(bins) => {
                for bin in bins {
                    let close = if bin.is_last { ']' } else { ')' };
                    println!(
                        "  [{} .. {}{close} {:>6} in {:>6} out",
                        format_millis(column_type, bin.x0),
                        format_millis(column_type, bin.x1),
                        bin.filtered_in,
                        bin.filtered_out
                    );
                }
            }
        }
    }

    if !cli.scatter.is_empty() {
        let plot = session.scatter_plot();
        let hidden = plot.data.iter().filter(|d| d.is_filtered_out).count();
        println!(
            "\nscatter {} x {}: {} points, {hidden} filtered out",
            plot.x_axis_label,
            plot.y_axis_label,
            plot.data.len()
        );
    }

    if cli.rows > 0 {
        let table = session.table(cli.view);
        println!();
        println!("{}", table.column_names().join("\t"));
        for row in session.table_rows(cli.view).into_iter().take(cli.rows) {
            println!("{}", row.values.join("\t"));
        }
    }

    for alert in alerts {
        eprintln!("{}: {}", alert.topic, alert.message);
    }
}

//! Talentgraph CLI: developer harness for the calibration engine
//!
//! Reads and writes JSON employee snapshots. Everything else is the library.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use std::path::{Path, PathBuf};
use talentgraph::analysis::{manager_bias_with_view, AnalysisContext, ManagerView};
use talentgraph::{
    AnalysisRegistry, AnalysisResult, CalibrationPipeline, Config, Employee, EmployeeId,
    LlmReasoningClient, OrgGraph, PopulationGenerator, ReasoningProvider,
};

#[derive(Parser)]
#[command(name = "talentgraph", version, about = "Talent calibration bias analysis")]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// YAML configuration file
    #[arg(long, global = true, env = "TALENTGRAPH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a seeded synthetic population
    Generate {
        /// Number of employees
        #[arg(long, default_value_t = 200)]
        count: usize,

        /// RNG seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Reference managers by name where the name is unique
        #[arg(long)]
        name_refs: bool,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate the reporting structure of a snapshot
    Validate {
        /// Employee snapshot (JSON array)
        input: PathBuf,
    },
    /// Run every registered analysis
    Analyze {
        input: PathBuf,

        /// Reference date for tenure (YYYY-MM-DD), defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// Also run manager analysis over all reports, for comparison
        #[arg(long)]
        compare_views: bool,
    },
    /// Show the reporting chain of one employee
    Chain {
        input: PathBuf,

        /// Employee id
        id: u64,
    },
    /// Full calibration report with insights
    Report {
        input: PathBuf,

        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let result = match load_config(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Commands::Generate {
                count,
                seed,
                name_refs,
                output,
            } => run_generate(count, seed, name_refs, output.as_deref()),
            Commands::Validate { input } => run_validate(&input, &cli.format),
            Commands::Analyze {
                input,
                as_of,
                compare_views,
            } => run_analyze(&input, &config, as_of, compare_views, &cli.format),
            Commands::Chain { input, id } => run_chain(&input, id, &cli.format),
            Commands::Report { input, as_of } => run_report(&input, config, as_of, &cli.format).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_env();
    Ok(config)
}

fn load_employees(path: &Path) -> Result<Vec<Employee>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let employees = serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    Ok(employees)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn run_generate(count: usize, seed: u64, name_refs: bool, output: Option<&Path>) -> Result<()> {
    let mut generator = PopulationGenerator::new(seed).with_as_of(today());
    if name_refs {
        generator = generator.with_name_refs();
    }
    let employees = generator.generate(count);
    let json = serde_json::to_string_pretty(&employees)?;

    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Wrote {} employees to {}", employees.len(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn run_validate(input: &Path, format: &OutputFormat) -> Result<()> {
    let employees = load_employees(input)?;
    let result = talentgraph::validate_structure(&employees);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Table => {
            println!("Employees: {}", employees.len());
            println!("Valid:     {}", result.is_valid);
            for error in &result.errors {
                println!("  - {}", error);
            }
        }
    }

    if !result.is_valid {
        anyhow::bail!("{} structural defect(s)", result.errors.len());
    }
    Ok(())
}

fn run_analyze(
    input: &Path,
    config: &Config,
    as_of: Option<NaiveDate>,
    compare_views: bool,
    format: &OutputFormat,
) -> Result<()> {
    let employees = load_employees(input)?;
    let graph = OrgGraph::validated(&employees)?;
    let ctx = AnalysisContext::new(&employees, &config.analysis, as_of.unwrap_or_else(today)).with_graph(&graph);

    let mut results = AnalysisRegistry::standard().run_all(&ctx);
    if compare_views {
        results.push(manager_bias_with_view(&ctx, ManagerView::AllReports));
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Table => print_analyses(&results),
    }
    Ok(())
}

fn run_chain(input: &Path, id: u64, format: &OutputFormat) -> Result<()> {
    let employees = load_employees(input)?;
    let graph = OrgGraph::validated(&employees)?;
    let chain = graph.reporting_chain(EmployeeId(id))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&chain)?),
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Hop", "Id", "Name", "Level", "Title"]);
            for (hop, manager) in chain.iter().enumerate() {
                if let Some(e) = graph.employee_by_id(*manager) {
                    table.add_row(vec![
                        (hop + 1).to_string(),
                        e.id.to_string(),
                        e.name.clone(),
                        e.level.to_string(),
                        e.job_title.clone(),
                    ]);
                }
            }
            println!("{}", table);
        }
    }
    Ok(())
}

async fn run_report(
    input: &Path,
    config: Config,
    as_of: Option<NaiveDate>,
    format: &OutputFormat,
) -> Result<()> {
    let employees = load_employees(input)?;

    let client = if config.reasoning.enabled {
        Some(LlmReasoningClient::new(&config.reasoning)?)
    } else {
        None
    };
    let provider = client.as_ref().map(|c| c as &dyn ReasoningProvider);

    let pipeline = CalibrationPipeline::new(config, AnalysisRegistry::standard());
    let report = pipeline
        .run(&employees, as_of.unwrap_or_else(today), provider)
        .await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => {
            println!(
                "Headcount {} | managers {} | depth {}",
                report.summary.headcount, report.summary.manager_count, report.summary.max_depth
            );
            print_analyses(&report.analyses);

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Id", "Priority", "Type", "Title", "Affected"]);
            for insight in &report.insights {
                table.add_row(vec![
                    insight.id.clone(),
                    format!("{:?}", insight.priority),
                    format!("{:?}", insight.insight_type),
                    insight.title.clone(),
                    insight.affected_count.to_string(),
                ]);
            }
            println!("{}", table);

            match report.narrative.summary() {
                Some(summary) => println!("\n{}", summary),
                None => println!("\n(no narrative summary)"),
            }
        }
    }
    Ok(())
}

fn print_analyses(results: &[AnalysisResult]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Analysis", "Status", "Chi²", "df", "p", "V", "n", "Flagged"]);
    for r in results {
        table.add_row(vec![
            r.name.clone(),
            r.status.to_string(),
            format!("{:.2}", r.chi_square),
            r.degrees_of_freedom.to_string(),
            format!("{:.4}", r.p_value),
            format!("{:.3}", r.effect_size),
            r.sample_size.to_string(),
            r.flagged_deviations().count().to_string(),
        ]);
    }
    println!("{}", table);
}

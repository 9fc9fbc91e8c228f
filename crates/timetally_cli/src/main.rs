//! Command-line front end over `timetally_core`.
//!
//! # Responsibility
//! - Open the database, start logging and dispatch one subcommand.
//! - Render the node tree and weekly summary as plain text.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use timetally_core::db::open_db;
use timetally_core::{
    default_log_level, init_logging, parse_week_selector, Materialization, NewNode, NodeAddress,
    NodeId, NodeKind, NodeRepository, SqliteNodeRepository, SqliteWorkRepository, SummaryModel,
    TreeStore, When, WorkEntry, WorkRepository,
};

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "timetally")]
#[command(about = "Customer/project/task tree with weekly time summaries")]
struct Cli {
    /// SQLite database file, created on first use
    #[arg(long, default_value = "timetally.db")]
    db: PathBuf,

    /// Absolute directory for rolling log files; logging is off when omitted
    #[arg(long)]
    log_dir: Option<String>,

    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the whole node tree
    Tree,
    /// Create a node under a parent (top level when omitted)
    Add {
        #[arg(long, value_enum)]
        kind: KindArg,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        parent: Option<NodeId>,

        #[arg(long, default_value = "")]
        descr: String,

        #[arg(long, default_value = "0")]
        charge: i64,
    },
    /// Rename an existing node
    Rename {
        #[arg(long)]
        id: NodeId,

        #[arg(long)]
        name: String,
    },
    /// Record a charge against a task for one day
    LogWork {
        #[arg(long)]
        task: NodeId,

        #[arg(long)]
        charge: i64,

        /// Defaults to today
        #[arg(long)]
        day: Option<NaiveDate>,
    },
    /// Print the weekly summary table
    Summary {
        /// ISO week such as 2026-W43
        #[arg(long, conflicts_with = "previous")]
        week: Option<String>,

        #[arg(long)]
        previous: bool,

        /// Include tasks the tree has not expanded yet
        #[arg(long)]
        full: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Folder,
    Customer,
    Project,
    Task,
}

impl From<KindArg> for NodeKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Folder => NodeKind::Folder,
            KindArg::Customer => NodeKind::Customer,
            KindArg::Project => NodeKind::Project,
            KindArg::Task => NodeKind::Task,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }

    let conn = open_db(&cli.db)?;
    let mut tree = TreeStore::new(SqliteNodeRepository::try_new(&conn)?);
    let work = SqliteWorkRepository::try_new(&conn)?;

    match cli.command {
        Commands::Tree => {
            tree.realize_all()?;
            print_subtree(&mut tree, None, 0);
        }
        Commands::Add {
            kind,
            name,
            parent,
            descr,
            charge,
        } => {
            let parent = parent.map(|id| find_node(&mut tree, id)).transpose()?;
            let init = NewNode {
                name,
                descr,
                active: None,
                charge,
            };
            let address = tree.create_child(parent, kind.into(), init)?;
            if let Some(node) = tree.node(address) {
                println!("{}\t{}", format_id(node.id), node.name);
            }
        }
        Commands::Rename { id, name } => {
            let address = find_node(&mut tree, id)?;
            tree.rename(address, &name)?;
            println!("{id}\t{}", name.trim());
        }
        Commands::LogWork { task, charge, day } => {
            let address = find_node(&mut tree, task)?;
            let is_task = tree
                .node(address)
                .is_some_and(|node| node.kind() == NodeKind::Task);
            if !is_task {
                return Err(format!("node {task} is not a task").into());
            }
            let day = day.unwrap_or_else(|| Local::now().date_naive());
            let id = work.log_work(&WorkEntry::new(task, day, charge))?;
            info!("event=work_log module=cli status=ok work_id={id} node_id={task} day={day}");
            println!("{day}\t{task}\t{charge}");
        }
        Commands::Summary {
            week,
            previous,
            full,
        } => {
            let mut summary = SummaryModel::new(Local::now().date_naive());
            if let Some(week) = week {
                summary.set_selected_week(parse_week_selector(&week)?);
                summary.set_when(When::WeekNumber);
            } else if previous {
                summary.set_when(When::Previous);
            }
            if full {
                summary.set_materialization(Materialization::Full);
            }
            summary.reload(&mut tree, &work)?;
            print_summary(&summary);
        }
    }
    Ok(())
}

fn find_node<R: NodeRepository>(tree: &mut TreeStore<R>, id: NodeId) -> CliResult<NodeAddress> {
    tree.reveal(id)?.ok_or_else(|| format!("node {id} not found").into())
}

fn print_subtree<R: NodeRepository>(
    tree: &mut TreeStore<R>,
    parent: Option<NodeAddress>,
    depth: usize,
) {
    for row in 0..tree.child_count(parent) {
        let Some(address) = tree.child(parent, row) else {
            continue;
        };
        if let Some(node) = tree.node(address) {
            println!(
                "{:indent$}{} [{}] #{}",
                "",
                node.name,
                node.kind().icon_key(),
                format_id(node.id),
                indent = depth * 2
            );
        }
        print_subtree(tree, Some(address), depth + 1);
    }
}

fn print_summary(summary: &SummaryModel) {
    println!("{}", summary.selection_text());
    println!("{}", summary.headers().join("\t"));
    for row in summary.rows() {
        let days: Vec<String> = row.days.iter().map(i64::to_string).collect();
        println!("{}\t{}\t{}", row.label, days.join("\t"), row.total());
    }
    let totals: Vec<String> = summary
        .column_totals()
        .iter()
        .map(i64::to_string)
        .collect();
    println!("Total\t{}\t{}", totals.join("\t"), summary.grand_total());
}

fn format_id(id: Option<NodeId>) -> String {
    id.map_or_else(|| "-".to_string(), |value| value.to_string())
}

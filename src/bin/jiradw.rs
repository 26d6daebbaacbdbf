use clap::{Parser, Subcommand};

use jiradw::date_util::round_to;
use jiradw::{
    CurrentSprintMetrics, Database, IssueQuery, JiraConfig, JiraDW, MetricsOptions, StatusLabels,
};

#[derive(Parser)]
#[command(name = "jiradw", about = "Jira issue mirror CLI")]
struct Cli {
    /// Database path (default: ~/.jiradw/jiradw.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Progress reporter that writes to stderr.
struct StderrProgress;

impl jiradw::SyncProgress for StderrProgress {
    fn on_page_fetched(&self, page: u32, fetched_so_far: usize) {
        eprintln!("  Page {page}: {fetched_so_far} issues fetched");
    }

    fn on_batch_ready(&self, issues: usize, links: usize) {
        eprintln!("  Writing {issues} issues and {links} links...");
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch issues matching a JQL query and mirror them locally
    Sync {
        /// JQL query (default: your issues created in the reporting window)
        jql: Option<String>,

        /// Issues per request (overrides JIRA_PAGE_SIZE)
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Show mirror status
    Status,
    /// Show counts by status, type, sprint and link type
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// List mirrored issues
    Issues {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        r#type: Option<String>,
        #[arg(long)]
        sprint: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        epic: Option<String>,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        json: bool,
        #[arg(long, conflicts_with = "json")]
        csv: bool,
        /// Only print the number of matching issues
        #[arg(long)]
        count: bool,
    },
    /// Show one issue and its links
    Issue {
        key: String,
        #[arg(long)]
        json: bool,
    },
    /// Workload and progress for the current sprint
    Metrics {
        /// Sprint capacity in hours
        #[arg(long, default_value_t = jiradw::metrics::DEFAULT_CAPACITY_HOURS)]
        capacity: f64,
        /// Status name counted as done
        #[arg(long)]
        done_status: Option<String>,
        /// Status name counted as in progress
        #[arg(long)]
        in_progress_status: Option<String>,
        /// Status name counted as open
        #[arg(long)]
        open_status: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Dump the issue link graph
    Graph {
        #[arg(long)]
        json: bool,
    },
    /// Drop all mirrored data and recreate the schema
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    // Credentials are checked before touching the database.
    let config = match &cli.command {
        Commands::Sync { page_size, .. } => {
            let mut config = JiraConfig::from_env()?;
            if let Some(size) = page_size {
                anyhow::ensure!(*size > 0, "--page-size must be positive");
                config.page_size = *size;
            }
            Some(config)
        }
        _ => None,
    };

    let db = match &cli.db {
        Some(path) => Database::open_at(path).await?,
        None => Database::open().await?,
    };

    match cli.command {
        Commands::Sync { jql, .. } => {
            let Some(config) = config else {
                anyhow::bail!("missing Jira configuration");
            };
            let jql = jql.unwrap_or_else(|| jiradw::DEFAULT_JQL.to_string());
            let dw = JiraDW::from_config(db, &config)?;
            eprintln!("Syncing: {jql}");
            let report = dw.sync(&jql, &StderrProgress).await?;
            print_sync_report(&report);
            println!();
            let stats = dw.statistics().await?;
            print_statistics(&stats);
        }
        Commands::Status => {
            print_status(&db).await?;
        }
        Commands::Stats { json } => {
            let stats = jiradw::query::statistics(&db).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_statistics(&stats);
            }
        }
        Commands::Issues {
            status,
            r#type,
            sprint,
            assignee,
            epic,
            label,
            limit,
            json,
            csv,
            count,
        } => {
            let mut query = IssueQuery::new();
            if let Some(ref s) = status {
                query = query.status(s);
            }
            if let Some(ref t) = r#type {
                query = query.issue_type(t);
            }
            if let Some(ref s) = sprint {
                query = query.sprint(s);
            }
            if let Some(ref a) = assignee {
                query = query.assignee(a);
            }
            if let Some(ref e) = epic {
                query = query.epic(e);
            }
            if let Some(ref l) = label {
                query = query.label(l);
            }
            if let Some(n) = limit {
                query = query.limit(n);
            }

            if count {
                println!("{}", query.count(&db).await?);
            } else if json {
                println!("{}", query.to_json(&db).await?);
            } else if csv {
                print!("{}", query.to_csv(&db).await?);
            } else {
                let rows = query.issues(&db).await?;
                for row in &rows {
                    let issue = &row.issue;
                    println!(
                        "{:<12} {:<12} {:<24} {}",
                        issue.issue_key,
                        issue.status.as_deref().unwrap_or("-"),
                        truncate(issue.sprint.as_deref().unwrap_or("-"), 24),
                        issue.summary.as_deref().unwrap_or("")
                    );
                }
                println!("\n{} issues", rows.len());
            }
        }
        Commands::Issue { key, json } => {
            let Some(detail) = jiradw::query::get_issue(&db, &key).await? else {
                anyhow::bail!("Issue {key} not found");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&detail)?);
            } else {
                print_issue(&detail);
            }
        }
        Commands::Metrics {
            capacity,
            done_status,
            in_progress_status,
            open_status,
            json,
        } => {
            let defaults = StatusLabels::default();
            let options = MetricsOptions {
                capacity_hours: capacity,
                statuses: StatusLabels {
                    done: done_status.unwrap_or(defaults.done),
                    in_progress: in_progress_status.unwrap_or(defaults.in_progress),
                    open: open_status.unwrap_or(defaults.open),
                },
            };
            let metrics = jiradw::metrics::compute_current_sprint_metrics(&db, &options).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&metrics)?);
            } else {
                print_metrics(&metrics);
            }
        }
        Commands::Graph { json } => {
            let graph = jiradw::query::link_graph(&db).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&graph)?);
            } else {
                for edge in &graph.edges {
                    println!(
                        "{} --[{}]--> {}",
                        edge.source_issue_key,
                        edge.direction_label.as_deref().unwrap_or(&edge.direction),
                        edge.target_issue_key
                    );
                }
                println!(
                    "\n{} issues, {} links",
                    graph.nodes.len(),
                    graph.edges.len()
                );
            }
        }
        Commands::Reset { yes } => {
            if !yes {
                anyhow::bail!("Refusing to drop mirrored data without --yes");
            }
            db.reset().await?;
            println!("Database reset.");
        }
    }

    Ok(())
}

async fn print_status(db: &Database) -> anyhow::Result<()> {
    let stats = jiradw::query::statistics(db).await?;
    let last_sync = jiradw::query::last_synced_at(db).await?;

    println!("Mirror Status");
    println!("  Issues:    {}", stats.total);
    println!("  Links:     {}", stats.total_links);
    println!("  Sprints:   {}", stats.by_sprint.len());
    println!(
        "  Last sync: {}",
        last_sync
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string())
    );
    Ok(())
}

fn print_sync_report(report: &jiradw::SyncReport) {
    println!("Sync: {}", report.jql);
    println!("  Fetched: {} records in {} pages", report.records_fetched, report.pages_fetched);
    println!("  Issues:  {}", report.issues_written);
    println!("  Links:   {}", report.links_written);
    if report.issues_skipped > 0 {
        println!("  Skipped: {} records without a key", report.issues_skipped);
    }
}

fn print_statistics(stats: &jiradw::Statistics) {
    println!("Statistics");
    println!("  Issues: {}", stats.total);
    println!("  Links:  {}", stats.total_links);

    println!("\nBy status:");
    for row in &stats.by_status {
        println!("  {}: {}", row.value.as_deref().unwrap_or("(none)"), row.count);
    }

    println!("\nBy type:");
    for row in &stats.by_type {
        println!("  {}: {}", row.value.as_deref().unwrap_or("(none)"), row.count);
    }

    if !stats.by_sprint.is_empty() {
        println!("\nBy sprint:");
        for row in &stats.by_sprint {
            println!(
                "  {}: {} issues, {:.2}h estimated, {:.2}h spent",
                row.sprint, row.count, row.total_estimate, row.total_spent
            );
        }
    }

    if !stats.by_link_type.is_empty() {
        println!("\nBy link type:");
        for row in &stats.by_link_type {
            println!(
                "  {} ({}): {}",
                row.link_type_name.as_deref().unwrap_or("(none)"),
                row.direction,
                row.count
            );
        }
    }
}

fn print_issue(detail: &jiradw::IssueDetail) {
    let issue = &detail.issue.issue;
    let hours = |h: Option<f64>| h.map_or("-".to_string(), |h| format!("{h:.2}h"));
    let text = |s: &Option<String>| s.clone().unwrap_or_else(|| "-".to_string());

    println!("{}  {}", issue.issue_key, text(&issue.summary));
    println!("  Type:      {}", text(&issue.issue_type));
    println!("  Status:    {}", text(&issue.status));
    println!("  Priority:  {}", text(&issue.priority));
    println!("  Assignee:  {}", text(&issue.assignee));
    println!("  Reporter:  {}", text(&issue.reporter));
    println!("  Sprint:    {}", text(&issue.sprint));
    println!("  Epic:      {}", text(&issue.epic_link));
    println!("  Estimate:  {}", hours(issue.original_estimate));
    println!("  Spent:     {}", hours(issue.time_spent));
    if !issue.labels.is_empty() {
        println!("  Labels:    {}", issue.labels.join(", "));
    }
    println!(
        "  Created:   {}",
        issue.created.map_or("-".to_string(), |t| t.format("%d.%m.%Y %H:%M").to_string())
    );
    println!(
        "  Updated:   {}",
        issue.updated.map_or("-".to_string(), |t| t.format("%d.%m.%Y %H:%M").to_string())
    );

    if !detail.links.is_empty() {
        println!("\nLinks:");
        for link in &detail.links {
            println!(
                "  {} {} [{}] {}",
                link.direction_label.as_deref().unwrap_or(link.direction.as_str()),
                link.target_issue_key,
                link.target_status.as_deref().unwrap_or("-"),
                link.target_summary.as_deref().unwrap_or("")
            );
        }
    }
}

fn print_metrics(metrics: &CurrentSprintMetrics) {
    let m = match metrics {
        CurrentSprintMetrics::Data(m) => m,
        CurrentSprintMetrics::NoData => {
            println!("No sprint data.");
            return;
        }
    };
    println!("Sprint: {}", m.sprint_name);
    println!("  Capacity:   {:.2}h", m.sprint_capacity);
    println!(
        "  Tasks:      {} total, {} done, {} in progress, {} open",
        m.total_tasks, m.completed_tasks, m.in_progress_tasks, m.open_tasks
    );
    println!("  Estimated:  {:.2}h", m.total_estimated);
    println!("  Spent:      {:.2}h ({:.2}h on done tasks)", m.total_spent, m.completed_spent);
    println!("  Remaining:  {:.2}h capacity, {:.2}h work", m.remaining_capacity, m.remaining_work);
    println!("  Progress:   {}%", round_to(m.progress_percent, 1));
    println!(
        "  Workload:   {}% ({})",
        round_to(m.workload_percent, 1),
        m.workload_status
    );
    println!("  Time used:  {}%", round_to(m.time_used_percent, 1));
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

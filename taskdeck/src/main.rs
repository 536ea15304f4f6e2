//! `TaskDeck` command-line client.
//!
//! Talks to a running `taskdeck-server`: logs in with the configured
//! credentials, then runs one subcommand against the task collection.
//!
//! # Usage
//!
//! ```bash
//! taskdeck list
//! taskdeck add "Water the plants" --due 2026-09-01 --priority High
//! taskdeck complete 0198c5a0-...
//! taskdeck watch
//! ```

use std::sync::Arc;

use clap::{Parser, Subcommand};
use taskdeck::config::{ClientCliArgs, ClientConfig};
use taskdeck::remote::{ClientError, RemoteTaskService};
use taskdeck::store::TaskStore;
use taskdeck::sync::SyncAdapter;
use taskdeck_core::dashboard::DashboardStats;
use taskdeck_core::protocol::ServerEvent;
use taskdeck_core::task::{GeoPoint, Priority, Task, TaskDraft, TaskId};

#[derive(Parser, Debug)]
#[command(version, about = "TaskDeck task client")]
struct Cli {
    #[command(flatten)]
    args: ClientCliArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all tasks.
    List,

    /// Show one task in full.
    Show {
        /// Task id.
        id: String,
    },

    /// Create a task.
    Add {
        /// Task title.
        title: String,

        /// Free-form description.
        #[arg(long, default_value = "")]
        description: String,

        /// Due date, `YYYY-MM-DD`.
        #[arg(long)]
        due: String,

        /// Priority: Low, Medium or High.
        #[arg(long, default_value = "Medium")]
        priority: Priority,

        /// Latitude of an optional location.
        #[arg(long, requires = "lng")]
        lat: Option<f64>,

        /// Longitude of an optional location.
        #[arg(long, requires = "lat")]
        lng: Option<f64>,
    },

    /// Edit fields of a task; unspecified fields keep their value.
    Edit {
        /// Task id.
        id: String,

        /// New title.
        #[arg(long)]
        title: Option<String>,

        /// New description.
        #[arg(long)]
        description: Option<String>,

        /// New due date, `YYYY-MM-DD`.
        #[arg(long)]
        due: Option<String>,

        /// New priority: Low, Medium or High.
        #[arg(long)]
        priority: Option<Priority>,

        /// New latitude.
        #[arg(long, requires = "lng")]
        lat: Option<f64>,

        /// New longitude.
        #[arg(long, requires = "lat")]
        lng: Option<f64>,

        /// New completion state (true or false).
        #[arg(long)]
        completed: Option<bool>,
    },

    /// Mark a task completed.
    Complete {
        /// Task id.
        id: String,
    },

    /// Delete a task.
    Delete {
        /// Task id.
        id: String,
    },

    /// Show dashboard statistics for the collection.
    Dashboard,

    /// Stream collection snapshots until interrupted.
    Watch,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::load(&cli.args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if let Err(e) = run(&config, cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(config: &ClientConfig, command: Command) -> Result<(), ClientError> {
    let remote = Arc::new(RemoteTaskService::new(&config.server_url)?);
    remote.login(&config.username, &config.password).await?;

    let store = Arc::new(TaskStore::new());
    let sync = SyncAdapter::new(Arc::clone(&store), Arc::clone(&remote));

    match command {
        Command::List => {
            sync.fetch_into_store().await?;
            let tasks = store.tasks();
            if tasks.is_empty() {
                println!("No tasks.");
            }
            for task in &tasks {
                print_task_line(task);
            }
        }

        Command::Show { id } => match sync.fetch_task_cached(&TaskId::new(id)).await {
            Ok(task) => print_task_full(&task),
            Err(ClientError::NotFound) => println!("Task not found."),
            Err(e) => return Err(e),
        },

        Command::Add {
            title,
            description,
            due,
            priority,
            lat,
            lng,
        } => {
            let draft = TaskDraft {
                title,
                description,
                due_date: due,
                priority,
                location: location_from_parts(lat, lng),
                completed: false,
            };
            draft.validate()?;
            let task = sync.add_task(draft).await?;
            println!("Created task {}", task.id);
        }

        Command::Edit {
            id,
            title,
            description,
            due,
            priority,
            lat,
            lng,
            completed,
        } => {
            let id = TaskId::new(id);
            let current = sync.fetch_task_cached(&id).await?;
            let mut draft = TaskDraft::from(current);
            if let Some(title) = title {
                draft.title = title;
            }
            if let Some(description) = description {
                draft.description = description;
            }
            if let Some(due) = due {
                draft.due_date = due;
            }
            if let Some(priority) = priority {
                draft.priority = priority;
            }
            if let Some(location) = location_from_parts(lat, lng) {
                draft.location = Some(location);
            }
            if let Some(completed) = completed {
                draft.completed = completed;
            }
            draft.validate()?;
            let task = sync.edit_task(&id, draft).await?;
            print_task_line(&task);
        }

        Command::Complete { id } => {
            let id = TaskId::new(id);
            let mut task = sync.fetch_task_cached(&id).await?;
            task.completed = true;
            // Optimistic local flip; the server write confirms or records
            // the failure on the store.
            store.update_task(task.clone());
            let task = sync.edit_task(&id, TaskDraft::from(task)).await?;
            print_task_line(&task);
        }

        Command::Delete { id } => {
            let id = TaskId::new(id);
            sync.delete_task(&id).await?;
            println!("Deleted task {id}");
        }

        Command::Dashboard => {
            sync.fetch_into_store().await?;
            print_dashboard(&DashboardStats::for_today(&store.tasks()));
        }

        Command::Watch => {
            let mut stream = remote.subscribe().await?;
            println!("Watching for snapshots; press Ctrl-C to stop.");
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    event = stream.next_event() => match event {
                        Some(Ok(ServerEvent::Snapshot { tasks })) => {
                            store.set_tasks(tasks);
                            let tasks = store.tasks();
                            println!("-- snapshot: {} task(s)", tasks.len());
                            for task in &tasks {
                                print_task_line(task);
                            }
                        }
                        Some(Err(e)) => tracing::warn!(error = %e, "bad frame"),
                        None => {
                            println!("Server closed the stream.");
                            break;
                        }
                    },
                }
            }
        }
    }

    Ok(())
}

fn location_from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<GeoPoint> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
        _ => None,
    }
}

fn print_task_line(task: &Task) {
    let mark = if task.completed { 'x' } else { ' ' };
    println!(
        "[{mark}] {}  {}  ({}, due {})",
        task.id, task.title, task.priority, task.due_date
    );
}

fn print_task_full(task: &Task) {
    print_task_line(task);
    if !task.description.is_empty() {
        println!("    {}", task.description);
    }
    if let Some(location) = &task.location {
        println!("    at {:.5}, {:.5}", location.lat, location.lng);
    }
}

fn print_dashboard(stats: &DashboardStats) {
    println!(
        "{} task(s): {} completed, {} pending",
        stats.total, stats.completed, stats.pending
    );
    println!(
        "priority: {} low / {} medium / {} high",
        stats.priority.low, stats.priority.medium, stats.priority.high
    );
    println!("completed over the last 7 days:");
    for point in &stats.trend {
        println!("  {}  {}", point.day, point.completed);
    }
    if stats.upcoming.is_empty() {
        println!("nothing upcoming");
    } else {
        println!("upcoming:");
        for task in &stats.upcoming {
            print_task_line(task);
        }
    }
}

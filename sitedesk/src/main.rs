use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use sitedesk::SiteDesk;
use sitedesk::config::Config;
use sitedesk::models::{EntityId, LoginForm, TaskFilter};
use sitedesk::store::StoreError;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Construction project desk")]
struct Cli {
    /// Configuration file, with or without extension
    #[arg(long, default_value = "sitedesk/config")]
    config: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
enum Commands {
    /// Sign in and keep the credential for later commands
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List projects, optionally filtered by name
    Projects {
        #[arg(long)]
        search: Option<String>,
    },
    Project { id: EntityId },
    Tasks {
        #[arg(long)]
        project: Option<EntityId>,
    },
    /// Print a user's notifications, then keep printing new ones with --watch
    Notifications {
        user: EntityId,
        #[arg(long)]
        watch: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let config = Config::load(&args.config)
        .with_context(|| format!("cannot load configuration from {}", args.config))?;
    let desk = SiteDesk::from_config(&config);

    match args.command {
        Commands::Login { email, password } => {
            let form = LoginForm { email, password };
            if !desk.account.login(&form).await {
                fail(desk.account.state().error)?;
            }
            if let Some(user) = desk.account.state().user {
                println!("Signed in as {} ({})", user.username, user.role.label());
            }
        }
        Commands::Logout => {
            desk.account.logout().await;
            println!("Signed out");
        }
        Commands::Whoami => {
            if !desk.account.load_current_user().await {
                fail(desk.account.state().error)?;
            }
            if let Some(user) = desk.account.state().user {
                println!("{} <{}>", user.username, user.email);
                println!("{} / {} / {}", user.role.label(), user.department, user.position);
            }
        }
        Commands::Projects { search } => {
            if !desk.projects.fetch_all(&Default::default()).await {
                fail(desk.projects.state().error)?;
            }
            for project in desk.projects.search(search.as_deref().unwrap_or_default()) {
                println!(
                    "{:>4}  {:<30} {:<6} {:>3}%  {} ~ {}",
                    project.id,
                    project.name,
                    project.status.label(),
                    project.progress,
                    day(project.start_date),
                    day(project.end_date)
                );
            }
        }
        Commands::Project { id } => {
            if !desk.projects.fetch_one(id).await {
                fail(desk.projects.state().error)?;
            }
            if let Some(project) = desk.projects.state().selected {
                println!("{} [{}]", project.name, project.status.label());
                println!("{}", project.description);
                println!("manager: {}  location: {}", project.manager, project.location);
                println!("budget: {:.0}  progress: {}%", project.budget, project.progress);
            }
        }
        Commands::Tasks { project } => {
            let filter = TaskFilter { project_id: project };
            if !desk.tasks.fetch_all(&filter).await {
                fail(desk.tasks.state().error)?;
            }
            for task in desk.tasks.state().items {
                println!(
                    "{:>4}  {:<30} {:<4} {:<3} {}",
                    task.id,
                    task.name,
                    task.status.label(),
                    task.priority.label(),
                    task.assignee
                );
            }
        }
        Commands::Notifications { user, watch } => {
            if !desk.notifications.open(user).await {
                fail(desk.notifications.state().error)?;
            }
            let mut printed = 0;
            for notification in desk.notifications.state().items.iter().rev() {
                print_notification(notification);
                printed += 1;
            }
            println!("{} unread", desk.notifications.unread_count());

            if watch {
                let mut changes = desk.notifications.subscribe();
                loop {
                    tokio::select! {
                        changed = changes.changed() => {
                            if changed.is_err() {
                                break;
                            }
                            let state = changes.borrow_and_update().clone();
                            let fresh = state.items.len().saturating_sub(printed);
                            for notification in state.items.iter().take(fresh).rev() {
                                print_notification(notification);
                            }
                            printed = state.items.len();
                        }
                        _ = tokio::signal::ctrl_c() => break,
                    }
                }
            }
            desk.notifications.close();
        }
    }

    Ok(())
}

fn print_notification(notification: &sitedesk::models::Notification) {
    let marker = if notification.is_read { " " } else { "*" };
    println!(
        "{marker} {}  [{:?}] {}: {}",
        notification.created_at.format("%Y-%m-%d %H:%M"),
        notification.kind,
        notification.title,
        notification.message
    );
}

fn day(date: Option<chrono::NaiveDate>) -> String {
    date.map(|date| date.to_string()).unwrap_or_else(|| "-".to_string())
}

fn fail(error: Option<StoreError>) -> anyhow::Result<()> {
    match error {
        Some(error) => bail!("{} ({:?})", error.message, error.kind),
        None => bail!("request failed"),
    }
}

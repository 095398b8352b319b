use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{ClientSettings, InstanceConfigPatch, NewInstanceConfig};
use crate::persist::{load_state, save_state};
use crate::projects::SearchProject;
use crate::search::SearchResult;
use crate::search_events::{EventBusError, SearchEvent};
use crate::GitlabCodeSearch;

#[derive(Parser)]
#[command(name = "gitlab-code-search")]
#[command(version)]
#[command(about = "Search code across the projects of several GitLab instances", long_about = None)]
pub struct Cli {
    /// State file holding instances and loaded projects
    #[arg(long, global = true, env = "GITLAB_CODE_SEARCH_STATE")]
    pub state_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage registered GitLab instances
    #[command(subcommand)]
    Instance(InstanceCommand),
    /// Server versions of registered instances
    #[command(subcommand)]
    Versions(VersionsCommand),
    /// Project listings of registered instances
    #[command(subcommand)]
    Projects(ProjectsCommand),
    /// Search code in selected projects
    Search(SearchArgs),
}

#[derive(Subcommand)]
pub enum InstanceCommand {
    /// Register an instance; its version is fetched to check the token
    Add {
        #[arg(long)]
        url: String,
        #[arg(long)]
        token: String,
        /// Requests per minute; omit or 0 for unlimited
        #[arg(long)]
        rate_limit: Option<u32>,
    },
    /// Change an instance
    Edit {
        id: String,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        rate_limit: Option<u32>,
    },
    /// Forget an instance and its projects
    Remove { id: String },
    /// Show registered instances
    List,
}

#[derive(Subcommand)]
pub enum VersionsCommand {
    /// Fetch the version of every instance again
    Refresh,
}

#[derive(Subcommand)]
pub enum ProjectsCommand {
    /// Load project listings
    Load {
        /// Only this instance
        #[arg(long)]
        instance: Option<String>,
        /// Reload even when cached
        #[arg(long)]
        force: bool,
        /// Include archived projects from now on
        #[arg(long)]
        with_archived: bool,
        /// Hide archived projects from now on
        #[arg(long, conflicts_with = "with_archived")]
        without_archived: bool,
    },
    /// Show loaded projects grouped by namespace
    List {
        #[arg(long)]
        instance: Option<String>,
    },
}

#[derive(Args)]
pub struct SearchArgs {
    pub query: String,
    /// `INSTANCE_ID:PROJECT_ID`, repeatable
    #[arg(long = "project", value_parser = parse_search_project)]
    pub projects: Vec<SearchProject>,
    /// Search every loaded project of every instance
    #[arg(long)]
    pub all: bool,
}

fn parse_search_project(value: &str) -> Result<SearchProject, String> {
    let (gitlab_id, project_id) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("expected INSTANCE_ID:PROJECT_ID, got {value:?}"))?;
    let project_id = project_id
        .parse()
        .map_err(|e| format!("invalid project id {project_id:?}: {e}"))?;
    Ok(SearchProject::new(gitlab_id, project_id))
}

fn default_state_file() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().context("Could not determine data directory")?;
    Ok(data_dir.join("gitlab-code-search").join("state.json"))
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let state_file = match cli.state_file {
        Some(path) => path,
        None => default_state_file()?,
    };

    let app = GitlabCodeSearch::new(ClientSettings::default())?;
    let state = load_state(&state_file)
        .await
        .with_context(|| format!("Failed to load {}", state_file.display()))?;
    app.restore(state);

    let result = match cli.command {
        Commands::Instance(command) => run_instance(&app, command, &state_file).await,
        Commands::Versions(VersionsCommand::Refresh) => {
            let updated = app.configs.update_versions().await;
            println!("Updated {updated} of {} versions", app.configs.all().len());
            persist(&app, &state_file).await
        }
        Commands::Projects(command) => run_projects(&app, command, &state_file).await,
        Commands::Search(args) => run_search(&app, args).await,
    };

    app.shutdown();
    result
}

async fn persist(app: &GitlabCodeSearch, state_file: &Path) -> Result<()> {
    save_state(state_file, app.snapshot())
        .await
        .with_context(|| format!("Failed to save {}", state_file.display()))
}

async fn run_instance(app: &GitlabCodeSearch, command: InstanceCommand, state_file: &Path) -> Result<()> {
    match command {
        InstanceCommand::Add {
            url,
            token,
            rate_limit,
        } => {
            let config = app
                .configs
                .add(NewInstanceConfig {
                    gitlab_url: url,
                    token,
                    rate_limit,
                })
                .await?;
            app.projects.sync_with_configs();
            println!("{}", config.id);
        }
        InstanceCommand::Edit {
            id,
            url,
            token,
            rate_limit,
        } => {
            let patch = InstanceConfigPatch {
                gitlab_url: url,
                token,
                rate_limit: rate_limit.map(Some),
            };
            app.configs.update(&id, patch).await?;
        }
        InstanceCommand::Remove { id } => {
            app.configs.remove(&id)?;
            app.projects.sync_with_configs();
        }
        InstanceCommand::List => {
            for config in app.configs.all() {
                let version = config
                    .version
                    .as_ref()
                    .map_or("unknown", |v| v.version.as_str());
                let rate_limit = config
                    .effective_rate_limit()
                    .map_or_else(|| "unlimited".to_string(), |l| format!("{l}/min"));
                println!("{}  {}  version {version}  {rate_limit}", config.id, config.gitlab_url);
            }
            return Ok(());
        }
    }
    persist(app, state_file).await
}

async fn run_projects(app: &GitlabCodeSearch, command: ProjectsCommand, state_file: &Path) -> Result<()> {
    match command {
        ProjectsCommand::Load {
            instance,
            force,
            with_archived,
            without_archived,
        } => {
            let mut force = force;
            let requested = if with_archived {
                Some(true)
            } else if without_archived {
                Some(false)
            } else {
                None
            };
            if let Some(with_archived) = requested.filter(|w| *w != app.configs.with_archived_projects()) {
                // A different filter invalidates every loaded listing.
                app.configs.set_with_archived_projects(with_archived);
                app.projects.reset_data_cache();
                force = true;
            }
            match instance {
                Some(id) => {
                    app.projects.update_gitlab_data(&id, force).await?;
                }
                None => {
                    let loaded = app.projects.update_all_gitlab_data(force).await;
                    println!("Reloaded {loaded} of {} instances", app.configs.all().len());
                }
            }
            persist(app, state_file).await
        }
        ProjectsCommand::List { instance } => {
            for data in app.projects.data() {
                if instance.as_ref().is_some_and(|id| *id != data.id) {
                    continue;
                }
                let url = app
                    .configs
                    .get(&data.id)
                    .map_or_else(|| data.id.clone(), |c| c.gitlab_url);
                println!("{url} ({})", data.id);
                for (namespace, projects) in data.by_namespace() {
                    println!("  {namespace}");
                    for project in projects {
                        println!("    {:>8}  {}", project.id, project.name);
                    }
                }
            }
            Ok(())
        }
    }
}

async fn run_search(app: &GitlabCodeSearch, args: SearchArgs) -> Result<()> {
    let mut selection = args.projects;
    if args.all {
        for data in app.projects.data() {
            selection.extend(data.projects.iter().map(|p| SearchProject::new(data.id.as_str(), p.id)));
        }
    }
    if selection.is_empty() {
        bail!("Nothing to search: pass --project INSTANCE_ID:PROJECT_ID or --all");
    }
    app.projects.set_search_projects(selection);

    let mut events = app.search.events().subscribe_filtered(|event| {
        matches!(
            event,
            SearchEvent::RateLimitWaiting { .. } | SearchEvent::ProjectSearched { .. }
        )
    });
    let reporter = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SearchEvent::RateLimitWaiting { gitlab_id, .. }) => {
                    eprintln!("rate limit reached on {gitlab_id}, waiting for the next window");
                }
                Ok(SearchEvent::ProjectSearched { done, total, .. }) => {
                    eprintln!("searched {done}/{total} projects");
                }
                Ok(_) | Err(EventBusError::ReceiverLagged(_)) => {}
                Err(_) => break,
            }
        }
    });

    if !app.search.search_selected(&args.query)? {
        bail!("Query is empty");
    }
    tokio::select! {
        () = app.search.results().wait_idle() => {}
        _ = tokio::signal::ctrl_c() => {
            eprintln!("stopping search");
            app.search.stop_searching();
        }
    }
    reporter.abort();

    let results = app.search.results().results();
    for result in &results {
        print_result(result);
    }
    eprintln!("{} results", results.len());
    Ok(())
}

fn print_result(result: &SearchResult) {
    let project = result
        .project_name
        .as_deref()
        .unwrap_or(result.gitlab_url.as_str());
    println!("{project} {}:{}", result.raw.path, result.raw.startline);
    if let Some(url) = result.blob_url() {
        println!("  {url}");
    }
    for line in result.raw.data.lines() {
        println!("    {line}");
    }
}

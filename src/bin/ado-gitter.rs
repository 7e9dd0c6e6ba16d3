use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::{debug, info};

use ado_gitter::error::AdoResult;
use ado_gitter::logging::{init_logging, parse_early_log_config};
use ado_gitter::models::{Command, parse_repository_reference};
use ado_gitter::scm::{PullRequest, Repository, ScmService};
use ado_gitter::service::repository::AdoRepository;
use ado_gitter::{Args, AzureDevOpsService, Config, GIT_HASH, VERSION};

#[tokio::main]
async fn main() -> AdoResult<()> {
    // Logging is set up before argument parsing so configuration loading can be traced
    let raw_args: Vec<String> = std::env::args().collect();
    let _log_guard = init_logging(parse_early_log_config(&raw_args));

    let mut args = Args::parse();
    info!(version = VERSION, git_hash = GIT_HASH, "Starting ado-gitter");

    // Handle --create-config flag
    if args.create_config {
        let path = Config::create_sample_config()?;
        println!("Sample config written to {}", path.display());
        return Ok(());
    }

    let Some(command) = args.command.clone() else {
        return Err(anyhow!("No command given, see --help").into());
    };

    // Single-repository commands only need their own repository selected
    if let Command::Open { repository, .. }
    | Command::Merge { repository, .. }
    | Command::Close { repository, .. } = &command
    {
        args.connection.repos.push(repository.clone());
    }

    // Resolve configuration from CLI args, environment variables, and config file
    let config = Config::default()
        .merge(Config::load_from_file()?)
        .merge(Config::load_from_env())
        .merge(Config::from_cli(&args.connection));
    debug!(settings = %config.describe(), "Resolved configuration");

    let service = AzureDevOpsService::new(config.resolve()?);
    run(&service, command).await?;
    Ok(())
}

async fn run(service: &AzureDevOpsService, command: Command) -> Result<()> {
    match command {
        Command::Repos => {
            for repo in service.get_repositories().await? {
                println!(
                    "{}\t{}\t{}",
                    repo.full_name(),
                    repo.default_branch(),
                    repo.clone_url()
                );
            }
        }
        Command::Prs { branch } => {
            for pr in service.get_pull_requests(&branch).await? {
                println!("{pr}\t{}\t{}", pr.status(), pr.url());
            }
        }
        Command::Open { repository, branch } => {
            let repo = find_repository(service, &repository).await?;
            match service.get_open_pull_request(&repo, &branch).await? {
                Some(pr) => println!("{pr}\t{}\t{}", pr.status(), pr.url()),
                None => println!("No open pull request from {branch} in {repository}"),
            }
        }
        Command::Merge { repository, branch } => {
            let repo = find_repository(service, &repository).await?;
            let pr = open_pull_request(service, &repo, &branch).await?;
            service.merge_pull_request(&pr).await?;
            println!("Completed {pr}");
        }
        Command::Close { repository, branch } => {
            let repo = find_repository(service, &repository).await?;
            let pr = open_pull_request(service, &repo, &branch).await?;
            service.close_pull_request(&pr).await?;
            println!("Abandoned {pr}");
        }
    }
    Ok(())
}

async fn find_repository(service: &AzureDevOpsService, reference: &str) -> Result<AdoRepository> {
    let (project, name) = parse_repository_reference(reference)?;
    service
        .get_repositories()
        .await?
        .into_iter()
        .find(|repo| repo.project_name == project && repo.name == name)
        .with_context(|| format!("Repository {reference} not found"))
}

async fn open_pull_request<S: ScmService>(
    service: &S,
    repo: &S::Repository,
    branch: &str,
) -> Result<S::PullRequest> {
    service
        .get_open_pull_request(repo, branch)
        .await?
        .with_context(|| format!("No open pull request from {branch} in {}", repo.full_name()))
}

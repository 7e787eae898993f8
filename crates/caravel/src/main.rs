use caravel_cloud::{ActionType, ApplyResult, CloudProvider, Orchestrator, StackState};
use caravel_cloud_aws::{build_stack, AwsProvider, StackNames};
use caravel_config::DeployConfig;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Write;

#[derive(Parser)]
#[command(name = "caravel")]
#[command(
    about = "Provision and tear down an ECS/Fargate application stack via the aws CLI",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the stack (idempotent: existing resources are reused)
    Up,
    /// Tear the stack down in reverse dependency order
    Down {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show what `up` would change without mutating anything
    Plan,
    /// Show recorded state and live existence for every resource
    Status,
    /// Check that the aws CLI is installed and credentials resolve
    Auth,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // Version needs no config file
    if matches!(cli.command, Commands::Version) {
        println!("caravel {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config_path = caravel_config::find_config_file()?;
    let config = DeployConfig::load(&config_path)?;
    tracing::debug!("Loaded config from {}", config_path.display());

    let provider = AwsProvider::new(&config.region);
    let stack = build_stack(&config);
    let project_root = std::env::current_dir()?;
    let orchestrator = Orchestrator::new(&provider, &stack, &project_root);

    match cli.command {
        Commands::Up => {
            ensure_authenticated(&provider).await?;

            println!(
                "{} {} ({} resources, region {})",
                "Provisioning".cyan().bold(),
                config.project,
                stack.len(),
                config.region
            );

            let (result, state) = orchestrator.up().await?;
            print_apply_result(&result);

            if !result.is_success() {
                anyhow::bail!("provisioning aborted on first failure");
            }

            print_outputs(&config, &state);
        }
        Commands::Down { yes } => {
            ensure_authenticated(&provider).await?;

            if !yes && !confirm_destroy(&config.project)? {
                println!("Aborted.");
                return Ok(());
            }

            println!(
                "{} {} ({} resources)",
                "Destroying".red().bold(),
                config.project,
                stack.len()
            );

            let result = orchestrator.down().await?;
            print_apply_result(&result);

            if !result.is_success() {
                anyhow::bail!("teardown aborted on first failure");
            }
        }
        Commands::Plan => {
            let plan = orchestrator.plan().await?;

            for action in &plan.actions {
                let sigil = match action.action_type {
                    ActionType::Create => "+".green(),
                    ActionType::Delete => "-".red(),
                    ActionType::NoOp => "=".normal(),
                };
                println!("  {} {}", sigil, action.description);
            }
            println!();
            println!("{}", plan.summary());
        }
        Commands::Status => {
            let entries = orchestrator.status().await?;

            for entry in &entries {
                let live = if entry.exists {
                    "present".green()
                } else {
                    "absent".yellow()
                };
                let id = entry
                    .recorded
                    .as_ref()
                    .map(|r| r.id.clone())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "  {:<18} {:<28} {:<8} {}",
                    entry.record.kind.to_string(),
                    entry.record.name,
                    live,
                    id
                );
            }
        }
        Commands::Auth => {
            let auth = provider.check_auth().await?;
            if auth.authenticated {
                println!(
                    "{} authenticated as {}",
                    "✓".green(),
                    auth.account_info.unwrap_or_default()
                );
            } else {
                println!(
                    "{} not authenticated: {}",
                    "✗".red(),
                    auth.error.unwrap_or_default()
                );
                anyhow::bail!("authentication check failed");
            }
        }
        Commands::Version => unreachable!(),
    }

    Ok(())
}

async fn ensure_authenticated(provider: &AwsProvider) -> anyhow::Result<()> {
    let auth = provider.check_auth().await?;
    if !auth.authenticated {
        anyhow::bail!(
            "not authenticated: {}",
            auth.error.unwrap_or_else(|| "unknown".to_string())
        );
    }
    Ok(())
}

/// Destroy is irreversible; require the project name to be typed back
fn confirm_destroy(project: &str) -> anyhow::Result<bool> {
    print!(
        "{} This deletes every resource of {}. Type the project name to confirm: ",
        "WARNING:".red().bold(),
        project.bold()
    );
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim() == project)
}

fn print_apply_result(result: &ApplyResult) {
    for action in &result.succeeded {
        println!("  {} {}", "✓".green(), action.message);
    }
    for action in &result.failed {
        println!(
            "  {} {}: {}",
            "✗".red(),
            action.action_id,
            action.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!();
    println!(
        "{} succeeded, {} failed in {:.1}s",
        result.succeeded.len(),
        result.failed.len(),
        result.duration_ms as f64 / 1000.0
    );
}

/// Identifiers the caller needs after provisioning
fn print_outputs(config: &DeployConfig, state: &StackState) {
    let names = StackNames::new(&config.project);

    println!();
    println!("{}", "Outputs".bold());

    if let Some(repo) = state.get_resource(&names.repository) {
        if let Some(uri) = repo.get_attribute::<String>("uri") {
            println!("  image repository: {}", uri);
        }
    }
    if let Some(role) = state.get_resource(&names.execution_role) {
        println!("  execution role:   {}", role.id);
    }
    if let Some(role) = state.get_resource(&names.task_role) {
        println!("  task role:        {}", role.id);
    }
    if let Some(alb) = state.get_resource(&names.load_balancer) {
        if let Some(dns) = alb.get_attribute::<String>("dns_name") {
            println!("  application URL:  http://{}", dns.cyan());
        }
    }
}

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use impactdesk::auth::{check_access, check_action, nav_links, Access, Action, AuthError, Route};
use impactdesk::{Config, PublicAccount, Role, SessionStore};
use std::future::Future;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Sign in to the impactdesk dashboards from the terminal.
#[derive(Parser, Debug)]
#[command(name = "impactdesk", version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "IMPACTDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Override the data directory from config
    #[arg(long, env = "IMPACTDESK_DATA_DIR")]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an account and sign in
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// ngo, donor or auditor
        #[arg(long)]
        role: Role,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in to an existing account
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Check whether the current session may open a route, e.g. /submit-report
    Open { path: String },
    /// List navigation entries for the current session
    Nav,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("impactdesk=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
        config.validate()?;
    }
    let store = impactdesk::open_store(&config).context("Failed to open session store")?;

    let result = run(&store, cli.command).await;
    store.dispose();
    result
}

async fn run(store: &SessionStore, command: Commands) -> Result<()> {
    match command {
        Commands::Signup {
            email,
            name,
            role,
            password,
        } => {
            let secret = match password {
                Some(p) => p,
                None => dialoguer::Password::new()
                    .with_prompt("Password")
                    .with_confirmation("Confirm password", "Passwords do not match")
                    .interact()?,
            };
            eprintln!("Creating account...");
            let account =
                interruptible(store, store.register(&email, &secret, &name, role)).await?;
            println!("Welcome, {}! Signed in as {}.", account.name, account.role.label());
        }
        Commands::Login { email, password } => {
            let secret = match password {
                Some(p) => p,
                None => dialoguer::Password::new()
                    .with_prompt("Password")
                    .interact()?,
            };
            eprintln!("Signing in...");
            match interruptible(store, store.authenticate(&email, &secret)).await {
                Ok(account) => println!("Welcome back, {}!", account.name),
                Err(AuthError::InvalidCredentials) => {
                    bail!("Login failed: invalid email or password")
                }
                Err(e) if e.is_retryable() => bail!("{e}. Please try again"),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Logout => {
            let was_signed_in = store.session().is_some();
            store.terminate();
            if was_signed_in {
                println!("Signed out.");
            } else {
                println!("Not signed in.");
            }
        }
        Commands::Whoami => match store.session() {
            Some(account) => print_account(&account),
            None => println!("Not signed in."),
        },
        Commands::Open { path } => {
            let Some(route) = Route::parse(&path) else {
                bail!("Unknown route '{path}'");
            };
            match check_access(&route, store.session().as_ref()) {
                Access::Granted => {
                    println!("{} is open.", route.path());
                    if matches!(route, Route::Report(_))
                        && check_action(Action::VerifyReport, store.session().as_ref())
                            == Access::Granted
                    {
                        println!("{} is available.", Action::VerifyReport.label());
                    }
                }
                Access::LoginRequired => {
                    bail!("{} requires signing in", route.path())
                }
                Access::Forbidden { required, actual } => bail!(
                    "{} is for {} accounts; signed in as {}",
                    route.path(),
                    required.label(),
                    actual.label()
                ),
            }
        }
        Commands::Nav => {
            for link in nav_links(store.session().as_ref()) {
                println!("{:<16} {}", link.label, link.path);
            }
        }
    }
    Ok(())
}

/// Run a store operation, cancelling it on Ctrl-C.
async fn interruptible<T>(
    store: &SessionStore,
    op: impl Future<Output = Result<T, AuthError>>,
) -> Result<T, AuthError> {
    tokio::pin!(op);
    tokio::select! {
        result = &mut op => result,
        _ = tokio::signal::ctrl_c() => {
            store.cancel_pending();
            op.await
        }
    }
}

fn print_account(account: &PublicAccount) {
    println!("Name:  {}", account.name);
    println!("Email: {}", account.email);
    println!("Role:  {}", account.role.label());
    println!("ID:    {}", account.id);
    if let Some(avatar) = &account.avatar {
        println!("Avatar: {avatar}");
    }
}

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use verdict::{
    mail,
    modules::users::{models::check_username, repo as users},
    Prepared,
};
use verdict_authz::Role;
use verdict_kernel::settings::Settings;

/// Verdict command-line interface.
#[derive(Parser, Debug)]
#[command(name = "verdict-cli", author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API until interrupted.
    Serve,
    /// Apply pending database migrations and exit.
    Migrate,
    /// Create an admin account with the superuser flag, or promote an existing one.
    CreateSuperuser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
    /// Print every API route with its methods.
    Routes,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load Verdict settings")?;
    verdict_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Commands::Serve => verdict::app::run(&settings).await,
        Commands::Migrate => cmd_migrate(&settings).await,
        Commands::CreateSuperuser { username, email } => {
            cmd_create_superuser(&settings, &username, &email).await
        }
        Commands::Routes => cmd_routes(&settings),
    }
}

async fn cmd_migrate(settings: &Settings) -> Result<()> {
    let Prepared { state, applied, .. } =
        verdict::prepare(settings, mail::from_settings(&settings.mail)).await?;
    for key in &applied {
        println!("applied {key}");
    }
    println!("{} migration(s) applied", applied.len());
    state.db.close().await;
    Ok(())
}

async fn cmd_create_superuser(settings: &Settings, username: &str, email: &str) -> Result<()> {
    check_username(username).context("invalid username")?;
    if !email.contains('@') {
        bail!("'{email}' is not an email address");
    }

    let Prepared { state, .. } =
        verdict::prepare(settings, mail::from_settings(&settings.mail)).await?;

    let user = match users::find_by_username(&state.db, username).await? {
        Some(existing) => {
            if existing.email != email {
                bail!("user '{username}' exists with a different email");
            }
            users::promote_to_superuser(&state.db, existing.id).await?
        }
        None => {
            let mut new_user = users::NewUser::member(username, email);
            new_user.role = Role::Admin;
            new_user.is_superuser = true;
            users::insert(&state.db, &new_user)
                .await
                .context("failed to create superuser")?
        }
    };

    tracing::info!(username = %user.username, "superuser ready");
    println!("superuser '{}' <{}> is ready", user.username, user.email);
    state.db.close().await;
    Ok(())
}

/// Routes come from the merged OpenAPI document, so nothing is connected.
fn cmd_routes(settings: &Settings) -> Result<()> {
    let db = verdict_db::connect_lazy(&settings.database)?;
    let state = verdict::AppState::new(settings, db, mail::from_settings(&settings.mail))?;
    let registry = verdict::build_registry(&state);

    let document = verdict_http::router::openapi_document(&registry);
    let Some(paths) = document["paths"].as_object() else {
        bail!("OpenAPI document has no paths");
    };
    for (path, item) in paths {
        let methods: Vec<String> = item
            .as_object()
            .map(|ops| ops.keys().map(|method| method.to_uppercase()).collect())
            .unwrap_or_default();
        println!("{:<24} {path}", methods.join(","));
    }
    Ok(())
}

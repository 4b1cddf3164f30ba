use crate::infra::Database;
use chrono::{DateTime, Utc};
use clap::Args;
use homestead::accounts::{EmailAddress, RepositoryError, User, UserRepository};
use homestead::config::AppConfig;
use homestead::error::AppError;
use homestead::properties::{
    NewOrganizationForm, Organization, PropertyService, PropertyServiceError,
};
use homestead::telemetry;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug, Default)]
pub(crate) struct SeedArgs {
    /// Account email address
    #[arg(long)]
    pub(crate) email: String,
    /// Display name for a newly created account
    #[arg(long)]
    pub(crate) name: Option<String>,
    /// Create an organization owned by the account
    #[arg(long)]
    pub(crate) organization: Option<String>,
}

#[derive(Debug)]
pub(crate) struct SeedOutcome {
    pub(crate) user: User,
    pub(crate) created_user: bool,
    pub(crate) organization: Option<Organization>,
}

fn open_configured() -> Result<(AppConfig, Database), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let database = Database::open(&config.database.path)?;
    Ok((config, database))
}

pub(crate) fn run_init() -> Result<(), AppError> {
    let (config, _) = open_configured()?;
    println!("Database ready at {}", config.database.path);
    Ok(())
}

pub(crate) fn run_seed(args: SeedArgs) -> Result<(), AppError> {
    let (config, database) = open_configured()?;
    let outcome = seed(Arc::new(database), &args, Utc::now())?;

    let verb = if outcome.created_user {
        "Created"
    } else {
        "Found existing"
    };
    println!("{verb} account {} ({})", outcome.user.email, outcome.user.id);
    if let Some(organization) = &outcome.organization {
        println!(
            "Created organization {} ({})",
            organization.name, organization.id
        );
    }
    println!("Database: {}", config.database.path);
    Ok(())
}

/// Ensure the account exists and is verified, then optionally give it an
/// organization. Re-running with the same email reuses the account.
pub(crate) fn seed(
    database: Arc<Database>,
    args: &SeedArgs,
    now: DateTime<Utc>,
) -> Result<SeedOutcome, AppError> {
    let email = EmailAddress::parse(&args.email)
        .map_err(|message| AppError::InvalidInput(message.to_string()))?;

    let (user, created_user) = match database.find_user_by_email(&email)? {
        Some(existing) => {
            if !existing.email_verified {
                database.mark_email_verified(&existing.id)?;
            }
            let user = database
                .fetch_user(&existing.id)?
                .ok_or(RepositoryError::NotFound)?;
            (user, false)
        }
        None => {
            let name = args
                .name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string);
            let mut user = User::new(email, name, now);
            user.email_verified = true;
            (database.insert_user(user)?, true)
        }
    };
    info!(user_id = %user.id, created = created_user, "seed account ready");

    let organization = match &args.organization {
        Some(name) => {
            let form = NewOrganizationForm { name: name.clone() };
            let organization = PropertyService::new(database)
                .create_organization(&user, &form, now)
                .map_err(|err| match err {
                    PropertyServiceError::Validation(errors) => {
                        AppError::InvalidInput(errors.to_string())
                    }
                    PropertyServiceError::NotFound => AppError::Storage(RepositoryError::NotFound),
                    PropertyServiceError::Repository(err) => AppError::Storage(err),
                })?;
            Some(organization)
        }
        None => None,
    };

    Ok(SeedOutcome {
        user,
        created_user,
        organization,
    })
}

//! courtier: operator tool for the access-control store and payment
//! references.

use std::error::Error;

use clap::{Parser, Subcommand};
use courtier_access::{AccessConfig, AccessControl};
use courtier_core::models::permission::{Action, Module};
use courtier_db::repository::{SurrealPermissionGrantRepository, SurrealRoleRepository};
use courtier_db::{DbConfig, DbManager};
use courtier_payment::{
    ChecksumPolicy, IbanValidator, format_qr_reference, generate_qr_reference,
    get_qr_reference_type, validate_qr_reference,
};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "courtier")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,

    /// Resolve the permissions of a user in a tenant
    Permissions {
        #[arg(long)]
        tenant: Uuid,

        #[arg(long)]
        user: Uuid,

        /// Only check this module (requires --action)
        #[arg(long, requires = "action")]
        module: Option<Module>,

        #[arg(long, requires = "module")]
        action: Option<Action>,
    },

    /// Validate an IBAN and print the result as JSON
    Iban {
        value: String,

        /// Reject checksum failures for every country
        #[arg(long)]
        strict: bool,
    },

    /// Derive the QR reference of an invoice number
    QrReference { invoice_number: String },

    /// Check a QR reference's length and check digit
    CheckReference { reference: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => {
            let db = connect().await?;
            let applied = courtier_db::run_migrations(db.client()).await?;
            tracing::info!(applied, "Migrations complete");
        }
        Commands::Permissions {
            tenant,
            user,
            module,
            action,
        } => {
            let db = connect().await?;
            let access = AccessControl::new(
                SurrealRoleRepository::new(db.client().clone()),
                SurrealPermissionGrantRepository::new(db.client().clone()),
                AccessConfig::default(),
            );
            let perms = access.try_resolve(Some(user), Some(tenant)).await?;

            match (module, action) {
                (Some(module), Some(action)) => {
                    let output = serde_json::json!({
                        "module": module,
                        "action": action,
                        "allowed": perms.can(module, action),
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                _ => println!("{}", serde_json::to_string_pretty(&perms)?),
            }
        }
        Commands::Iban { value, strict } => {
            let policy = if strict {
                ChecksumPolicy::strict()
            } else {
                ChecksumPolicy::default()
            };
            let validator = IbanValidator::new(policy);
            let result = validator.validate(&value);
            let output = serde_json::json!({
                "validation": result,
                "iban_for_qr": validator.iban_for_qr(&value),
                "reference_type": get_qr_reference_type(&value),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::QrReference { invoice_number } => {
            let reference = generate_qr_reference(&invoice_number);
            println!("{reference}");
            println!("{}", format_qr_reference(&reference));
        }
        Commands::CheckReference { reference } => {
            let compact = validate_qr_reference(&reference)?;
            println!("{}", format_qr_reference(&compact));
        }
    }

    Ok(())
}

/// Logs go to stderr so command output stays parseable. JSON when
/// `COURTIER_LOG_JSON` is set.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("courtier=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if std::env::var_os("COURTIER_LOG_JSON").is_some() {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn connect() -> Result<DbManager, surrealdb::Error> {
    let config = DbConfig::from_env();
    DbManager::connect(&config).await
}

use std::collections::VecDeque;
use std::path::PathBuf;

use sqlx::postgres::PgPoolOptions;

use terraverify::auth::{JwtValidator, DEFAULT_AUDIENCE, DEFAULT_ISSUER};
use terraverify::geometry::GeometryComparator;
use terraverify::infra::PgRegistryStore;
use terraverify::{OfficialRecord, Polygon, PrincipalId};

fn print_help() {
    eprintln!(
        "\
terraverify-admin

USAGE:
  terraverify-admin <command> [options]

COMMANDS:
  migrate                         Run database migrations
  import-registry                 Load official records from a JSON file
  issue-token                     Issue a bearer token for a principal
  compare                         Compare two polygons with the 2-of-3 rule

COMMON OPTIONS:
  --database-url <postgres_url>    (defaults to env DATABASE_URL)

import-registry OPTIONS:
  --file <path>                   (required) JSON array of registry records
  --no-migrate                    (optional) Skip migrations before importing

issue-token OPTIONS:
  --principal <id>                (required) Principal placed in the `sub` claim
  --ttl-hours <n>                 (default: 24)
  (secret from env JWT_SECRET; issuer/audience from JWT_ISSUER/JWT_AUDIENCE)

compare OPTIONS:
  --submitted <json>              (required) Polygon as [{{\"lat\":..,\"lng\":..}},..]
  --official <json>               (required) Polygon in the same format
"
    );
}

fn require_database_url(database_url: Option<String>) -> anyhow::Result<String> {
    database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required (or pass --database-url)"))
}

fn require_value(args: &mut VecDeque<String>, flag: &str) -> anyhow::Result<String> {
    args.pop_front()
        .ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))
}

fn parse_polygon(flag: &str, raw: &str) -> anyhow::Result<Polygon> {
    serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("invalid polygon for {flag}: {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args: VecDeque<String> = std::env::args().skip(1).collect();
    let Some(command) = args.pop_front() else {
        print_help();
        return Ok(());
    };

    if matches!(command.as_str(), "-h" | "--help" | "help") {
        print_help();
        return Ok(());
    }

    match command.as_str() {
        "migrate" => {
            let mut database_url: Option<String> = None;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => {
                        database_url = Some(require_value(&mut args, "--database-url")?);
                    }
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let database_url = require_database_url(database_url)?;
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;
            terraverify::migrations::run_postgres(&pool).await?;
            println!("ok: migrations applied");
            Ok(())
        }
        "import-registry" => {
            let mut database_url: Option<String> = None;
            let mut file: Option<PathBuf> = None;
            let mut migrate = true;

            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => {
                        database_url = Some(require_value(&mut args, "--database-url")?);
                    }
                    "--file" => file = Some(PathBuf::from(require_value(&mut args, "--file")?)),
                    "--no-migrate" => migrate = false,
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let file = file.ok_or_else(|| anyhow::anyhow!("--file is required"))?;
            let raw = std::fs::read_to_string(&file)
                .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", file.display()))?;
            let records: Vec<OfficialRecord> = serde_json::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", file.display()))?;

            let database_url = require_database_url(database_url)?;
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;
            if migrate {
                terraverify::migrations::run_postgres(&pool).await?;
            }

            let store = PgRegistryStore::new(pool);
            let mut imported: u64 = 0;
            for record in &records {
                if record.coordinates.len() < terraverify::domain::MIN_POLYGON_VERTICES {
                    eprintln!(
                        "skip: {} has {} vertices",
                        record.certificate_number,
                        record.coordinates.len()
                    );
                    continue;
                }
                store.upsert(record).await?;
                imported += 1;
            }

            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "file": file.display().to_string(),
                    "records": records.len(),
                    "imported": imported,
                    "skipped": records.len() as u64 - imported,
                }))?
            );
            Ok(())
        }
        "issue-token" => {
            let mut principal: Option<String> = None;
            let mut ttl_hours: i64 = 24;

            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--principal" => principal = Some(require_value(&mut args, "--principal")?),
                    "--ttl-hours" => ttl_hours = require_value(&mut args, "--ttl-hours")?.parse()?,
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let principal = principal
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("--principal is required"))?;
            if ttl_hours <= 0 {
                anyhow::bail!("--ttl-hours must be positive");
            }

            let secret = std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET is required to issue tokens"))?;
            let issuer = std::env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string());
            let audience =
                std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| DEFAULT_AUDIENCE.to_string());

            let validator = JwtValidator::new(secret.as_bytes(), &issuer, &audience);
            let token = validator
                .issue(&PrincipalId::new(principal), chrono::Duration::hours(ttl_hours))
                .map_err(|e| anyhow::anyhow!("failed to issue token: {e}"))?;
            println!("{token}");
            Ok(())
        }
        "compare" => {
            let mut submitted: Option<Polygon> = None;
            let mut official: Option<Polygon> = None;

            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--submitted" => {
                        let raw = require_value(&mut args, "--submitted")?;
                        submitted = Some(parse_polygon("--submitted", &raw)?);
                    }
                    "--official" => {
                        let raw = require_value(&mut args, "--official")?;
                        official = Some(parse_polygon("--official", &raw)?);
                    }
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let submitted = submitted.ok_or_else(|| anyhow::anyhow!("--submitted is required"))?;
            let official = official.ok_or_else(|| anyhow::anyhow!("--official is required"))?;

            let comparison = GeometryComparator::new().compare(&submitted, &official);
            println!("{}", serde_json::to_string_pretty(&comparison)?);
            Ok(())
        }
        other => {
            print_help();
            anyhow::bail!("unknown command: {other}");
        }
    }
}

use anyhow::{Result, anyhow};
use diesel::pg::Pg;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    Up,
    Down,
}

/// Applies or reverts embedded migrations and returns the versions touched, in order.
///
/// Without `steps` (or with 0) every pending migration is applied, or every applied one
/// reverted. With `steps` at most that many are touched. An empty result means the
/// schema was already where it was asked to be.
pub fn run_migrations<H>(
    harness: &mut H,
    direction: MigrationDirection,
    steps: Option<usize>,
) -> Result<Vec<String>>
where
    H: MigrationHarness<Pg>,
{
    let steps = steps.filter(|steps| *steps > 0);
    let mut versions = Vec::new();

    match (direction, steps) {
        (MigrationDirection::Up, None) => {
            let applied = harness.run_pending_migrations(MIGRATIONS).map_err(|err| anyhow!(err))?;
            versions.extend(applied.iter().map(ToString::to_string));
        }
        (MigrationDirection::Up, Some(steps)) => {
            for _ in 0..steps {
                if !harness.has_pending_migration(MIGRATIONS).map_err(|err| anyhow!(err))? {
                    break;
                }
                let version = harness.run_next_migration(MIGRATIONS).map_err(|err| anyhow!(err))?;
                versions.push(version.to_string());
            }
        }
        (MigrationDirection::Down, None) => {
            let reverted = harness.revert_all_migrations(MIGRATIONS).map_err(|err| anyhow!(err))?;
            versions.extend(reverted.iter().map(ToString::to_string));
        }
        (MigrationDirection::Down, Some(steps)) => {
            for _ in 0..steps {
                if harness.applied_migrations().map_err(|err| anyhow!(err))?.is_empty() {
                    break;
                }
                let version = harness.revert_last_migration(MIGRATIONS).map_err(|err| anyhow!(err))?;
                versions.push(version.to_string());
            }
        }
    }

    Ok(versions)
}

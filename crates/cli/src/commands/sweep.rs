use chrono::Utc;

use matchslot_core::config::{AppConfig, LoadOptions};
use matchslot_db::{connect_with_settings, fixtures, migrations};

use crate::commands::{runtime, CommandResult};

/// Runs the stale-hold expiry sweep once. Nothing else in the system ever
/// reverts a hold, so operators schedule this command.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "sweep",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match runtime("sweep") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let coordinator = fixtures::coordinator_for(&pool, &config);
        let released = coordinator
            .release_stale_holds(Utc::now())
            .await
            .map_err(|error| ("sweep", error.to_string(), 6u8))?;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(released)
    });

    match result {
        Ok(released) => CommandResult::success(
            "sweep",
            format!("released {} stale hold(s)", released.len()),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("sweep", error_class, message, exit_code)
        }
    }
}

use matchslot_core::config::{AppConfig, LoadOptions};
use matchslot_db::{connect_with_settings, fixtures, migrations};

use crate::commands::{runtime, CommandResult};

/// Seeds the demo offers and prints the links needed to walk the flow.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match runtime("seed") {
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
        let summary = fixtures::seed_demo(&pool, &config)
            .await
            .map_err(|error| ("seed", error.to_string(), 6u8))?;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(summary)
    });

    match result {
        Ok(summary) => {
            let offers: Vec<String> = summary
                .offers
                .iter()
                .map(|offer| {
                    let approval = offer
                        .approval_link
                        .as_deref()
                        .map(|link| format!(", approval: {link}"))
                        .unwrap_or_default();
                    format!(
                        "{} ({:?}) share: {}{approval}",
                        offer.host_name, offer.status, offer.share_link
                    )
                })
                .collect();
            CommandResult::success(
                "seed",
                format!("seeded {} demo offers: {}", summary.offers.len(), offers.join("; ")),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

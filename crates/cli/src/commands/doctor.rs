use serde::Serialize;

use matchslot_core::config::{AppConfig, ConfigError, LoadOptions};
use matchslot_db::connect_with_settings;

use crate::commands::runtime;

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: &'static str,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    command: &'static str,
    status: &'static str,
    checks: Vec<DoctorCheck>,
}

/// Validates configuration and database connectivity without mutating
/// anything.
pub fn run(json: bool) -> String {
    let mut checks = Vec::new();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config",
                status: "ok",
                detail: format!(
                    "workflow {:?}, database {}",
                    config.workflow.approval_mode, config.database.url
                ),
            });
            Some(config)
        }
        Err(error @ ConfigError::Validation(_)) => {
            checks.push(DoctorCheck {
                name: "config",
                status: "fail",
                detail: error.to_string(),
            });
            None
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config",
                status: "fail",
                detail: format!("could not load configuration: {error}"),
            });
            None
        }
    };

    if let Some(config) = &config {
        let detail = match runtime("doctor") {
            Ok(runtime) => runtime.block_on(async {
                match connect_with_settings(
                    &config.database.url,
                    config.database.max_connections,
                    config.database.timeout_secs,
                )
                .await
                {
                    Ok(pool) => {
                        pool.close().await;
                        Ok(format!("reachable at {}", config.database.url))
                    }
                    Err(error) => Err(error.to_string()),
                }
            }),
            Err(failure) => Err(failure.output),
        };

        match detail {
            Ok(detail) => checks.push(DoctorCheck { name: "database", status: "ok", detail }),
            Err(detail) => checks.push(DoctorCheck { name: "database", status: "fail", detail }),
        }
    }

    let status =
        if checks.iter().all(|check| check.status == "ok") { "ok" } else { "fail" };
    let report = DoctorReport { command: "doctor", status, checks };

    if json {
        serde_json::to_string(&report).unwrap_or_else(|error| {
            format!("{{\"command\":\"doctor\",\"status\":\"fail\",\"checks\":[],\"error\":\"{error}\"}}")
        })
    } else {
        let mut lines = vec![format!("doctor: {status}")];
        for check in &report.checks {
            lines.push(format!("  [{}] {} - {}", check.status, check.name, check.detail));
        }
        lines.join("\n")
    }
}

use matchslot_core::config::{AppConfig, LoadOptions};

/// Prints the effective configuration after file and environment overrides.
pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return serde_json::json!({
                "command": "config",
                "status": "error",
                "message": error.to_string(),
            })
            .to_string();
        }
    };

    serde_json::json!({
        "command": "config",
        "status": "ok",
        "database": {
            "url": config.database.url,
            "max_connections": config.database.max_connections,
            "timeout_secs": config.database.timeout_secs,
        },
        "links": {
            "base_url": config.links.base_url,
        },
        "workflow": {
            "approval_mode": format!("{:?}", config.workflow.approval_mode),
            "require_slot_approval": config.workflow.require_slot_approval,
            "hold_timeout_minutes": config.workflow.hold_timeout_minutes,
        },
        "logging": {
            "level": config.logging.level,
            "format": format!("{:?}", config.logging.format),
        },
    })
    .to_string()
}

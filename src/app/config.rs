use std::path::Path;

use crate::config::ResolvedConfig;
use crate::duration::format_duration;

pub fn config_output(config_path: &Path, config: &ResolvedConfig) -> serde_json::Value {
    serde_json::json!({
        "config_file": config_path.display().to_string(),
        "data_directory": config.data_dir.display().to_string(),
        "reporting_currency": config.reporting_currency,
        "timezone": config.timezone.name(),
        "display": config.display,
        "reporting": config.reporting,
        "payments": {
            "source": config.payments.base_url.as_deref().unwrap_or("snapshot"),
            "lookup_timeout": format_duration(config.payments.lookup_timeout),
            "max_concurrent_lookups": config.payments.max_concurrent_lookups
        }
    })
}

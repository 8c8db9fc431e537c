use serde_json::json;

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::registry::HandlerRegistry;

pub fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let registry = HandlerRegistry::build(&config.server.handler_dir);

    match output_format {
        OutputFormat::Json => {
            let routes: Vec<_> = registry.routes().collect();
            let response = json!({
                "handler_dir": config.server.handler_dir,
                "routes": routes,
            });
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            if registry.is_empty() {
                println!("No routes found in {}", config.server.handler_dir.display());
            }
            for descriptor in registry.routes() {
                let mut schemas = Vec::new();
                if descriptor.input_schema.is_some() {
                    schemas.push("input");
                }
                if descriptor.output_schema.is_some() {
                    schemas.push("output");
                }
                if schemas.is_empty() {
                    println!("POST /api/{}", descriptor.name);
                } else {
                    println!("POST /api/{}  [validates {}]", descriptor.name, schemas.join(", "));
                }
            }
        }
    }
    Ok(())
}

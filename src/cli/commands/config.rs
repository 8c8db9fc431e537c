use crate::cli::OutputFormat;
use crate::config::AppConfig;

pub fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    println!("{}", render(config, output_format)?);
    Ok(())
}

fn render(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<String> {
    match output_format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(config)?),
        OutputFormat::Text => {
            let exec_timeout = config
                .exec
                .timeout
                .map(|t| format!("{:?}", t))
                .unwrap_or_else(|| "none".to_string());
            let lines = [
                format!("environment:      {:?}", config.environment),
                format!("listen:           {}", config.listen_address()),
                format!("handler dir:      {}", config.server.handler_dir.display()),
                format!("public dir:       {}", config.server.public_dir.display()),
                format!("max request size: {} bytes", config.server.max_request_size_bytes),
                format!("compression:      {}", config.server.enable_compression),
                format!("cors:             {}", config.server.enable_cors),
                format!("identity claim:   {}", config.security.id_key),
                format!("token lookup:     {}", config.security.jwt_token_lookup),
                format!("token timeout:    {:?}", config.security.jwt_timeout),
                format!("realm:            {}", config.security.jwt_realm),
                format!("secret set:       {}", !config.security.jwt_secret.is_empty()),
                format!("exec timeout:     {}", exec_timeout),
            ];
            Ok(lines.join("\n"))
        }
    }
}

use clap::Parser;
use fold_autopopulate::{
    discover, AutopopulateConfig, DiscoveredPath, Directive, LoggingSystem, ReferenceTarget,
    SchemaRegistry,
};
use serde_json::{json, Value};
use std::path::PathBuf;

/// Print the autopopulate paths discovered for JSON schema definitions
#[derive(Parser, Debug)]
#[command(name = "autopopulate_inspect", version, about)]
struct Cli {
    /// Schema definitions file
    definitions: PathBuf,

    /// Only inspect the named schema
    #[arg(long)]
    schema: Option<String>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    /// Default maxDepth attached to every discovered path
    #[arg(long)]
    max_depth: Option<u32>,

    /// Plugin configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level for the crate's own logging
    #[arg(long)]
    log_level: Option<String>,
}

fn describe_setting(setting: &Directive) -> &'static str {
    match setting {
        Directive::Skip => "off",
        Directive::Enabled => "on",
        Directive::Options(_) => "options",
        Directive::Callable(_) => "function",
    }
}

fn describe_target(target: &ReferenceTarget) -> String {
    match target {
        ReferenceTarget::Model(model) => format!("ref {}", model),
        ReferenceTarget::Dynamic(selector) => format!("refPath {}", selector),
        ReferenceTarget::Unspecified => "unspecified".to_string(),
    }
}

fn path_json(found: &DiscoveredPath) -> Result<Value, serde_json::Error> {
    Ok(json!({
        "path": found.path,
        "target": describe_target(&found.target),
        "autopopulate": describe_setting(&found.autopopulate),
        "directive": serde_json::to_value(&found.directive)?,
    }))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AutopopulateConfig::from_file(path)?,
        None => AutopopulateConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.logging.default_level = level.clone();
    }
    config.apply_env_overrides()?;
    if let Some(max_depth) = cli.max_depth {
        config.default_max_depth = max_depth;
    }
    config.validate()?;
    LoggingSystem::init(&config.logging)?;

    let registry = SchemaRegistry::load_from_file(&cli.definitions)?;
    let roots: Vec<_> = match &cli.schema {
        Some(name) => {
            let id = registry
                .find_by_name(name)
                .ok_or_else(|| format!("Schema {} not found in {}", name, cli.definitions.display()))?;
            vec![id]
        }
        None => registry.iter().map(|(id, _)| id).collect(),
    };

    let mut report = serde_json::Map::new();
    for root in roots {
        let name = registry.get(root)?.name.clone();
        let paths = discover(&registry, root, config.default_max_depth)?;

        if cli.json {
            let entries = paths.iter().map(path_json).collect::<Result<Vec<_>, _>>()?;
            report.insert(name, Value::Array(entries));
            continue;
        }

        println!("{} ({} path(s))", name, paths.len());
        for found in &paths {
            println!(
                "  {:<32} {:<20} {}",
                found.path,
                describe_target(&found.target),
                describe_setting(&found.autopopulate)
            );
        }
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&Value::Object(report))?);
    }
    Ok(())
}

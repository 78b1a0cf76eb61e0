//! textgen-relay CLI: 文本生成中继的命令行工具
//!
//! Usage:
//!   textgen-relay ask <prompt> [--model M] [--temperature T] [--max-tokens N]
//!   textgen-relay check <prompt>       Show how the prompt filter treats a prompt
//!   textgen-relay models               List provider models
//!   textgen-relay feed                 Show recent public prompts
//!   textgen-relay config               Print the effective configuration

use anyhow::{bail, Context};
use textgen_relay::assistant::fallback_reply;
use textgen_relay::{GenerationService, RelayConfig, TextGenerationOptions};
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match args[1].as_str() {
        "ask" => cmd_ask(&args[2..]),
        "check" => cmd_check(&args[2..]),
        "models" => cmd_models(),
        "feed" => cmd_feed(),
        "config" => cmd_config(),
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"textgen-relay: 文本生成中继命令行工具

USAGE:
    textgen-relay <COMMAND> [OPTIONS]

COMMANDS:
    ask <prompt> [OPTIONS]      Generate text for a prompt
        --model <name>          Model to use
        --temperature <t>       Sampling temperature
        --max-tokens <n>        Maximum answer length
    check <prompt>              Show how the prompt filter treats a prompt
    models                      List models offered by the provider
    feed                        Show recent public prompts
    config                      Print the effective configuration as YAML
    version                     Show version information
    help                        Show this help message

ENVIRONMENT:
    TEXTGEN_CONFIG              YAML configuration file
    TEXTGEN_BASE_URL            API root (default https://text.pollinations.ai)
    RUST_LOG                    Log filter (default warn)"#
    );
}

fn cmd_version() {
    println!("textgen-relay {}", env!("CARGO_PKG_VERSION"));
}

fn load_config() -> anyhow::Result<RelayConfig> {
    let config = match std::env::var("TEXTGEN_CONFIG") {
        Ok(path) if !path.is_empty() => {
            let mut config = RelayConfig::from_file(&path)
                .with_context(|| format!("loading configuration from {path}"))?;
            config.apply_env_overrides()?;
            config
        }
        _ => RelayConfig::from_env()?,
    };
    Ok(config)
}

fn build_service() -> anyhow::Result<GenerationService> {
    let service = GenerationService::builder().config(load_config()?).build()?;
    Ok(service)
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")
}

/// Split `ask` arguments into the prompt words and generation options.
fn parse_ask_args(args: &[String]) -> anyhow::Result<(String, TextGenerationOptions)> {
    let mut options = TextGenerationOptions::new();
    let mut words = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--model" => {
                let value = iter.next().context("--model needs a value")?;
                options = options.with_model(value.as_str());
            }
            "--temperature" => {
                let value = iter.next().context("--temperature needs a value")?;
                let t: f64 = value
                    .parse()
                    .with_context(|| format!("invalid temperature: {value}"))?;
                options = options.with_temperature(t);
            }
            "--max-tokens" => {
                let value = iter.next().context("--max-tokens needs a value")?;
                let n: u32 = value
                    .parse()
                    .with_context(|| format!("invalid token count: {value}"))?;
                options = options.with_max_tokens(n);
            }
            flag if flag.starts_with("--") => bail!("unknown option: {flag}"),
            word => words.push(word),
        }
    }
    if words.is_empty() {
        bail!("ask needs a prompt");
    }
    Ok((words.join(" "), options))
}

fn cmd_ask(args: &[String]) -> anyhow::Result<()> {
    let (prompt, options) = parse_ask_args(args)?;
    let service = build_service()?;
    let result = runtime()?.block_on(service.generate_text(&prompt, &options));

    match result.into_result() {
        Ok((text, cached)) => {
            println!("{}", text.trim());
            if cached {
                eprintln!("(cached)");
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("{} ({})", err.message, err.kind);
            eprintln!();
            println!("{}", fallback_reply(&prompt));
            std::process::exit(2);
        }
    }
}

fn cmd_check(args: &[String]) -> anyhow::Result<()> {
    if args.is_empty() {
        bail!("check needs a prompt");
    }
    let prompt = args.join(" ");
    let service = build_service()?;
    let filter = service.prompt_filter();

    let matched = filter.matched_terms(&prompt);
    if matched.is_empty() {
        println!("✓ prompt is safe");
    } else {
        println!("✗ blacklisted: {}", matched.join(", "));
        println!("  sent as: {}", filter.filter_prompt(&prompt));
    }
    Ok(())
}

fn cmd_models() -> anyhow::Result<()> {
    let service = build_service()?;
    let models = runtime()?.block_on(service.text_models());
    if models.is_empty() {
        bail!("no models available");
    }
    for model in &models {
        match &model.description {
            Some(desc) => println!("{:<20} {}", model.name, desc),
            None => println!("{}", model.name),
        }
    }
    Ok(())
}

fn cmd_feed() -> anyhow::Result<()> {
    let service = build_service()?;
    let feed = runtime()?.block_on(service.text_feed());
    for item in &feed {
        println!("{}", serde_json::to_string(item)?);
    }
    println!("{} item(s)", feed.len());
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = load_config()?;
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}

use std::io::Read;

use mailtriage::config::Settings;
use mailtriage::llm::create_provider;
use mailtriage::pipeline::EmailPipeline;

/// Classify one email from a file argument or stdin and print the result
/// as JSON. The HTTP layer is a separate concern; this binary exercises
/// the same pipeline entry points it would call.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let settings = Settings::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let llm = create_provider(&settings)?;
    eprintln!(
        "mailtriage v{} (provider: {}, model: {})",
        env!("CARGO_PKG_VERSION"),
        llm.name(),
        llm.model()
    );

    let pipeline = EmailPipeline::new(llm, &settings);

    let result = match std::env::args().nth(1) {
        Some(path) => {
            let bytes = std::fs::read(&path)?;
            let filename = std::path::Path::new(&path)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(&path)
                .to_string();
            pipeline.classify_file(&bytes, &filename).await?
        }
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            pipeline.classify(&text).await?
        }
    };

    if result.degraded {
        eprintln!("warning: degraded result (model unavailable or partial)");
    }
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

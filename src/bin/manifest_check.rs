use clap::Parser;
use stock_mcp::config::cli::ManifestArgs;
use stock_mcp::utils::logger;
use stock_mcp::utils::validation::Validate;
use stock_mcp::{Manifest, StockError};

fn main() {
    let args = ManifestArgs::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("📁 Loading manifest from: {}", args.path.display());

    if let Err(e) = run(&args) {
        tracing::error!(
            "❌ Manifest check failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());
        std::process::exit(e.severity().exit_code().max(1));
    }
}

fn run(args: &ManifestArgs) -> Result<(), StockError> {
    let manifest = Manifest::from_file(&args.path)?;
    manifest.validate()?;

    if args.check_env_files {
        let base_dir = args
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        manifest.check_env_files(base_dir)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    display_summary(&manifest)?;
    Ok(())
}

fn display_summary(manifest: &Manifest) -> Result<(), StockError> {
    println!("✅ Manifest is valid");
    println!("📋 Manifest summary:");
    println!(
        "  Version: {}",
        if manifest.version.is_empty() {
            "(unspecified)"
        } else {
            manifest.version.as_str()
        }
    );
    println!("  Services: {}", manifest.service_names().len());

    for (name, spec) in manifest.services() {
        println!("  - {}", name);
        if let Some(build) = &spec.build {
            println!("      build: {}", build.context());
        }
        if let Some(image) = &spec.image {
            println!("      image: {}", image);
        }
        for port in spec.port_bindings()? {
            println!("      port: {}", port);
        }
        for file in spec.env_files() {
            println!("      env_file: {}", file);
        }
        let deps = spec.dependencies();
        if !deps.is_empty() {
            println!("      depends_on: {}", deps.join(", "));
        }
        for mount in spec.bind_mounts()? {
            println!(
                "      volume: {} -> {}{}",
                mount.source.as_deref().unwrap_or("(anonymous)"),
                mount.target,
                if mount.read_only { " (ro)" } else { "" }
            );
        }
    }

    let shared = manifest.shared_env_files();
    if !shared.is_empty() {
        println!("  Shared env files: {}", shared.join(", "));
    }

    println!("🚀 Start order: {}", manifest.start_order()?.join(" -> "));
    Ok(())
}

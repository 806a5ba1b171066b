//! `personachat onboard`: First-time setup.

use personachat_config::AppConfig;
use personachat_core::Result;

pub async fn run() -> Result<()> {
    let config_dir = AppConfig::config_dir();
    let config_path = AppConfig::config_path();

    println!("PersonaChat — First-Time Setup");
    println!("==============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("  Created config.toml at: {}", config_path.display());
    println!("\n  Next steps:");
    println!("   1. Add your API key to {} (or set OPENROUTER_API_KEY)", config_path.display());
    println!("   2. Optionally point [persona] file at your persona prompt");
    println!("   3. Run: personachat chat --doc <your-cv.pdf>\n");

    Ok(())
}

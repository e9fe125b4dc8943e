//! Check command implementation.
//!
//! Resolves the configuration exactly as `dev` would and validates it,
//! without binding a port or watching files.

use crate::cli::CheckArgs;
use crate::config::{ConfigOverrides, KiteConfig};
use crate::error::Result;
use crate::ui;

/// Execute the check command.
///
/// With `--json` the resolved configuration is printed on stdout; otherwise a
/// summary goes to stderr.
pub async fn execute(args: CheckArgs) -> Result<()> {
    ui::info("Checking configuration...");

    let config = KiteConfig::load(&ConfigOverrides::from(&args), args.config.as_deref())?;
    config.validate()?;

    ui::success("Configuration is valid!");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    ui::info(&format!("  root:            {}", config.root.display()));
    ui::info(&format!("  address:         {}:{}", config.host, config.port));
    ui::info(&format!("  hmrPath:         {}", config.hmr_path));
    ui::info(&format!("  bareModuleRoute: {}", config.bare_module_route));
    ui::info(&format!("  publicDir:       {}", config.public_dir.display()));
    ui::info(&format!("  debounceMs:      {}", config.debounce_ms));
    if !config.watch_ignore.is_empty() {
        ui::info(&format!("  watchIgnore:     {}", config.watch_ignore.join(", ")));
    }

    Ok(())
}

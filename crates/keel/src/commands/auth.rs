use colored::Colorize;

use crate::setup::Providers;

/// Report authentication status of every provider. Fails if any is unauthenticated.
pub async fn handle(providers: &Providers) -> anyhow::Result<bool> {
    let mut all_ok = true;
    for provider in providers.all() {
        let status = provider.check_auth().await?;
        if status.authenticated {
            println!(
                "{} {}: {}",
                "✓".green(),
                provider.display_name(),
                status.account_info.unwrap_or_default().cyan()
            );
        } else {
            all_ok = false;
            println!(
                "{} {}: {}",
                "✗".red(),
                provider.display_name(),
                status.error.unwrap_or_default().red()
            );
        }
    }
    Ok(all_ok)
}

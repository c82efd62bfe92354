//! Key maintenance commands.

use wicket::Authority;

use crate::cli::StoreArgs;
use crate::output::{OutputFormat, print_status};

/// Run the `rotate-keys` command
pub async fn rotate(args: &StoreArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let authority = Authority::open(args.options()).await?;
    authority.rotate_keys().await?;
    print_status("rotated", format);
    Ok(())
}

/// Run the `reset-keys` command
pub async fn reset(args: &StoreArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let authority = Authority::open(args.options()).await?;
    authority.reset_keys().await?;
    print_status("reset", format);
    Ok(())
}

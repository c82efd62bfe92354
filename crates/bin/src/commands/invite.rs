//! Invitation commands - print bootstrap and regular invitation tokens.

use wicket::Authority;

use crate::cli::{FirstRunArgs, InviteArgs};
use crate::output::{InvitationOutput, OutputFormat, print_invitation};

/// Run the `first-run` command
pub async fn first_run(
    args: &FirstRunArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let authority = Authority::open(args.store.options()).await?;
    let (user, token) = authority.first_run_invitation(&args.root).await?;
    print_invitation(&InvitationOutput::new(&user, token), format)?;
    Ok(())
}

/// Run the `invite` command
pub async fn invite(args: &InviteArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let authority = Authority::open(args.store.options()).await?;
    let (user, token) = authority
        .create_invitation(&args.email, args.admin, args.trust)
        .await?;
    print_invitation(&InvitationOutput::new(&user, token), format)?;
    Ok(())
}

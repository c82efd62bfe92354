//! Output formatting helpers for human-readable and JSON output.

use serde::Serialize;
use wicket::User;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Human }
    }
}

/// An issued invitation as printed by the CLI and returned by `/invites`.
#[derive(Debug, Serialize)]
pub struct InvitationOutput {
    pub id: String,
    pub email: String,
    pub is_admin: bool,
    pub trust: u32,
    pub token: String,
}

impl InvitationOutput {
    pub fn new(user: &User, token: String) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            trust: user.trust,
            token,
        }
    }

    /// Path a browser can open to accept the invitation.
    pub fn link(&self) -> String {
        format!("/login?invite={}", self.token)
    }
}

/// Print `invitation` in the selected format.
pub fn print_invitation(
    invitation: &InvitationOutput,
    format: OutputFormat,
) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Human => {
            println!("Invitation: {}", invitation.id);
            println!("Email:      {}", invitation.email);
            println!("Admin:      {}", invitation.is_admin);
            println!("Trust:      {}", invitation.trust);
            println!("Token:      {}", invitation.token);
            println!("Accept at:  {}", invitation.link());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(invitation)?);
        }
    }
    Ok(())
}

/// Print a one-line status message, or `{"status": ...}` in JSON mode.
pub fn print_status(message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Human => println!("{message}"),
        OutputFormat::Json => println!("{}", serde_json::json!({ "status": message })),
    }
}

use dialoguer::{theme::ColorfulTheme, Confirm};

/// Asks before a destructive call. Anything but an explicit yes declines.
pub fn confirm_action(msg: &str) -> bool {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(msg)
        .default(false)
        .interact()
        .unwrap_or(false)
}

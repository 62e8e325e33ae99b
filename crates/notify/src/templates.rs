//! Plain-text bodies for verification emails.

use chrono::Duration;

/// A rendered email ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

/// Email carrying a verification link.
pub fn verification_link(url: &str, expiry: Duration) -> RenderedEmail {
    RenderedEmail {
        subject: "Email Verification".to_string(),
        body: format!(
            "Please verify your email by clicking the link below:\n\n\
             {url}\n\n\
             This link will expire in {}.\n\n\
             If you did not register for this account, please ignore this email.",
            describe(expiry)
        ),
    }
}

/// Email carrying a 6-digit verification code.
pub fn verification_code(code: &str, expiry: Duration) -> RenderedEmail {
    RenderedEmail {
        subject: "Your Verification Code".to_string(),
        body: format!(
            "Your verification code is: {code}\n\n\
             This code will expire in {}.\n\n\
             If you did not request this code, please ignore this email.",
            describe(expiry)
        ),
    }
}

/// Human-readable expiry window, in the largest whole unit.
fn describe(window: Duration) -> String {
    let (amount, unit) = if window.num_days() > 0 && window.num_hours() % 24 == 0 {
        (window.num_days(), "day")
    } else if window.num_hours() > 0 && window.num_minutes() % 60 == 0 {
        (window.num_hours(), "hour")
    } else {
        (window.num_minutes(), "minute")
    };
    if amount == 1 {
        format!("1 {unit}")
    } else {
        format!("{amount} {unit}s")
    }
}

use super::OutgoingMail;

pub fn verification(to: &str, name: &str, url: &str, ttl_minutes: i64) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Verify your account".into(),
        html: format!(
            "<h2>Hello {name}</h2>\
             <p>To activate your account click the link below:</p>\
             <a href=\"{url}\">Verify account</a>\
             <p>This link expires in {}.</p>",
            humanize_minutes(ttl_minutes)
        ),
    }
}

pub fn verification_resend(to: &str, name: &str, url: &str) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Account verification resent".into(),
        html: format!(
            "<h2>Hello {name}</h2>\
             <p>Click the button below to verify your account:</p>\
             <a href=\"{url}\" style=\"display:inline-block; padding: 10px 18px; background:#4F46E5; \
             color:white; border-radius: 6px; text-decoration:none;\">Verify account</a>\
             <p>If you did not request this email you can ignore it.</p>"
        ),
    }
}

pub fn password_reset(to: &str, name: &str, url: &str, ttl_minutes: i64) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Reset your password".into(),
        html: format!(
            "<p>Hello {name},</p>\
             <p>You asked to reset your password.</p>\
             <p>Follow the link below to choose a new one:</p>\
             <a href=\"{url}\">{url}</a>\
             <p>This link expires in {}.</p>",
            humanize_minutes(ttl_minutes)
        ),
    }
}

fn humanize_minutes(minutes: i64) -> String {
    match minutes {
        60 => "1 hour".to_string(),
        m if m % 60 == 0 => format!("{} hours", m / 60),
        1 => "1 minute".to_string(),
        m => format!("{m} minutes"),
    }
}

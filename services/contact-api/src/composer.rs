// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Builds the inbox notification for a validated submission.

use crate::config::MailConfig;
use crate::validator::Submission;
use ammonia::clean_text;
use serde::Serialize;
use std::fmt;

/// Submitter identity used for the `Reply-To` header.
///
/// Kept structured so the transport never has to reparse a display string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyTo {
    pub name: String,
    pub email: String,
}

impl fmt::Display for ReplyTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" <{}>", self.name, self.email)
    }
}

/// Fully rendered message, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedMessage {
    pub from: String,
    pub to: String,
    pub reply_to: ReplyTo,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Render `submission` for the configured inbox.
pub fn compose(submission: &Submission, mail: &MailConfig) -> ComposedMessage {
    let Submission {
        email,
        name,
        contact,
        message,
    } = submission;

    let text = format!(
        "Name: {name}\nEmail: {email}\nContact: {contact}\n\nMessage:\n{message}"
    );

    // User text is escaped line by line so the <br> separators stay markup.
    let message_html = message
        .split('\n')
        .map(clean_text)
        .collect::<Vec<_>>()
        .join("<br>");

    let html = format!(
        "<h2>New Contact Form Submission</h2>\n\
         <p><strong>Name:</strong> {}</p>\n\
         <p><strong>Email:</strong> {}</p>\n\
         <p><strong>Contact:</strong> {}</p>\n\
         <p><strong>Message:</strong></p>\n\
         <p>{}</p>\n",
        clean_text(name),
        clean_text(email),
        clean_text(contact),
        message_html,
    );

    ComposedMessage {
        from: mail.inbox_from.clone(),
        to: mail.inbox_to.clone(),
        reply_to: ReplyTo {
            name: name.clone(),
            email: email.clone(),
        },
        subject: format!("{} - Contact Form: {name}", mail.subject_prefix),
        text,
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail_config() -> MailConfig {
        MailConfig {
            inbox_to: "office@example.org".to_string(),
            inbox_from: "website@example.org".to_string(),
            subject_prefix: "Kidz Montessori Academy".to_string(),
        }
    }

    fn submission(message: &str) -> Submission {
        Submission {
            email: "jane@example.com".to_string(),
            name: "Jane Doe".to_string(),
            contact: "555-0100".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_envelope_fields() {
        let composed = compose(&submission("Hello"), &mail_config());

        assert_eq!(composed.from, "website@example.org");
        assert_eq!(composed.to, "office@example.org");
        assert_eq!(composed.reply_to.name, "Jane Doe");
        assert_eq!(composed.reply_to.email, "jane@example.com");
        assert_eq!(
            composed.reply_to.to_string(),
            "\"Jane Doe\" <jane@example.com>"
        );
        assert_eq!(
            composed.subject,
            "Kidz Montessori Academy - Contact Form: Jane Doe"
        );
    }

    #[test]
    fn test_text_body_layout() {
        let composed = compose(&submission("Hello\nWorld"), &mail_config());
        assert_eq!(
            composed.text,
            "Name: Jane Doe\nEmail: jane@example.com\nContact: 555-0100\n\nMessage:\nHello\nWorld"
        );
    }

    #[test]
    fn test_html_newlines_become_line_breaks() {
        let composed = compose(&submission("Hello\nWorld"), &mail_config());
        assert!(composed.html.contains("Hello<br>World"));
        assert!(composed.html.contains("<h2>New Contact Form Submission</h2>"));
    }

    #[test]
    fn test_html_escapes_user_markup() {
        let mut hostile = submission("<script>alert(1)</script>\n<b>bold</b>");
        hostile.name = "<img src=x onerror=alert(1)>".to_string();
        hostile.contact = "\"><a href='x'>".to_string();

        let composed = compose(&hostile, &mail_config());

        assert!(!composed.html.contains("<script>"));
        assert!(!composed.html.contains("<img"));
        assert!(!composed.html.contains("<a href"));
        assert!(!composed.html.contains("<b>"));
        assert!(composed.html.contains("&lt;script&gt;"));
        // Plain text stays verbatim
        assert!(composed.text.contains("<script>alert(1)</script>"));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let s = submission("Same input");
        assert_eq!(compose(&s, &mail_config()), compose(&s, &mail_config()));
    }
}

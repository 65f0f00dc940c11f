/// Mail templates
use super::email::MailMessage;

/// Escape text for use in HTML content and quoted attributes
fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// "Successful registration" message carrying the verification link
pub fn successful_registration(recipient: &str, verification_link: &str) -> MailMessage {
    let text_body = format!(
        "Welcome!\n\n\
        Your account has been created. Please click the following link to verify your email address:\n\
        {}\n\n\
        If you did not register, please ignore this email.",
        verification_link
    );

    let html_body = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; padding: 20px; color: #333;">
    <h2>Welcome!</h2>
    <p>Your account has been created. Please verify your email address:</p>
    <p style="margin: 30px 0;">
        <a href="{link}" style="background-color: #000; color: #fff; padding: 14px 28px; text-decoration: none; border-radius: 25px; display: inline-block;">Verify Email</a>
    </p>
    <p style="color: #666; font-size: 14px;">
        If the button doesn't work, copy this link into your browser:<br>
        <a href="{link}">{link}</a>
    </p>
    <p style="color: #999; font-size: 12px;">If you did not register, please ignore this email.</p>
</body>
</html>"#,
        link = escape_html(verification_link)
    );

    MailMessage {
        to: recipient.to_string(),
        subject: "Registration successful - verify your email".to_string(),
        text_body,
        html_body: Some(html_body),
    }
}

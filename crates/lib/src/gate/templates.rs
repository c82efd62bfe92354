//! HTML for the login surface
//!
//! Simple inline HTML templates without a template engine.

const STYLES: &str = r#"
    body {
        font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Arial, sans-serif;
        max-width: 420px;
        margin: 60px auto;
        padding: 0 20px;
        background: #f5f5f5;
    }
    .container {
        background: white;
        padding: 30px;
        border-radius: 8px;
        box-shadow: 0 2px 4px rgba(0,0,0,0.1);
    }
    label {
        display: block;
        font-weight: bold;
        margin: 12px 0 4px;
    }
    input[type="text"],
    input[type="password"] {
        width: 100%;
        padding: 10px;
        border: 1px solid #ddd;
        border-radius: 4px;
        box-sizing: border-box;
    }
    button {
        margin-top: 16px;
        background: #0066cc;
        color: white;
        padding: 10px 20px;
        border: none;
        border-radius: 4px;
        cursor: pointer;
    }
    .error {
        color: #d9534f;
        background: #f2dede;
        padding: 10px;
        border-radius: 4px;
    }
"#;

/// Wrap `body` in the shared page chrome. `body` is inserted verbatim.
pub fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>{STYLES}</style>
</head>
<body>
    <div class="container">
        {body}
    </div>
</body>
</html>"#
    )
}

/// Login form posting back to `action`. With an invitation token, renders the
/// sign-up variant that asks for a new name instead.
pub fn login_page(action: &str, error: Option<&str>, invite: Option<&str>) -> String {
    let error_html = error.map_or(String::new(), |e| {
        format!(r#"<div class="error">{}</div>"#, html_escape(e))
    });
    let action = html_escape(action);

    let body = match invite {
        Some(token) => format!(
            r#"<h1>Accept invitation</h1>
        {error_html}
        <form method="POST" action="{action}">
            <input type="hidden" name="invite" value="{token}">
            <label for="chosen_name">Choose a username</label>
            <input type="text" id="chosen_name" name="chosen_name" required autofocus>
            <label for="password">Choose a password</label>
            <input type="password" id="password" name="password" required>
            <button type="submit">Create account</button>
        </form>"#,
            token = html_escape(token),
        ),
        None => format!(
            r#"<h1>Login</h1>
        {error_html}
        <form method="POST" action="{action}">
            <label for="username">Username</label>
            <input type="text" id="username" name="username" required autofocus>
            <label for="password">Password</label>
            <input type="password" id="password" name="password" required>
            <button type="submit">Login</button>
        </form>"#
        ),
    };
    page("Login", &body)
}

/// Shown after a successful login or invitation acceptance.
pub fn welcome_page(name: &str) -> String {
    page(
        "Welcome",
        &format!("<h1>Welcome, {}</h1>", html_escape(name)),
    )
}

/// Shown after logout.
pub fn logged_out_page() -> String {
    page("Logged out", "<h1>Thanks for visiting</h1>")
}

/// Escape text for use in HTML content and attribute values.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

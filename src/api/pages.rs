//! Server-rendered pages.
//!
//! Markup is built with `format!` against a single layout; nothing here is
//! dynamic enough to justify a template engine. Every user-supplied value
//! passes through [`escape`] before it is interpolated.

/// Minimal HTML escaping for text interpolated into markup.
pub(crate) fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn message_block(message: Option<&str>) -> String {
    message.map_or_else(String::new, |message| {
        format!("<p class=\"message\">{}</p>", escape(message))
    })
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\
<html lang=\"en\">\
<head>\
<meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
<title>{title} - Folio</title>\
<style>\
body{{font-family:sans-serif;max-width:28rem;margin:3rem auto;padding:0 1rem}}\
label{{display:block;margin:.75rem 0}}\
input{{display:block;width:100%;padding:.4rem;margin-top:.25rem}}\
.message{{color:#a40000}}\
</style>\
</head>\
<body>{body}</body>\
</html>",
        title = escape(title),
    )
}

pub(crate) fn login(message: Option<&str>) -> String {
    layout(
        "Sign in",
        &format!(
            "<h1>Sign in</h1>\
{message}\
<form method=\"post\" action=\"/login\">\
<label>Username <input type=\"text\" name=\"username\" required></label>\
<label>Password <input type=\"password\" name=\"password\" required></label>\
<button type=\"submit\">Sign in</button>\
</form>\
<p><a href=\"/register\">Create an account</a> | <a href=\"/forgot\">Forgot password?</a></p>",
            message = message_block(message),
        ),
    )
}

pub(crate) fn register(message: Option<&str>) -> String {
    layout(
        "Register",
        &format!(
            "<h1>Register</h1>\
{message}\
<form method=\"post\" action=\"/register\">\
<label>Username <input type=\"text\" name=\"username\" required></label>\
<label>Password <input type=\"password\" name=\"password\" required></label>\
<label>Email <input type=\"email\" name=\"email\" required></label>\
<button type=\"submit\">Register</button>\
</form>\
<p><a href=\"/login\">Back to sign in</a></p>",
            message = message_block(message),
        ),
    )
}

pub(crate) fn forgot(message: Option<&str>) -> String {
    layout(
        "Forgot password",
        &format!(
            "<h1>Forgot password</h1>\
{message}\
<p>Enter your account email and we will send a reset code.</p>\
<form method=\"post\" action=\"/forgot\">\
<label>Email <input type=\"email\" name=\"email\" required></label>\
<button type=\"submit\">Send code</button>\
</form>\
<p><a href=\"/login\">Back to sign in</a></p>",
            message = message_block(message),
        ),
    )
}

pub(crate) fn verify_otp(message: Option<&str>) -> String {
    layout(
        "Verify code",
        &format!(
            "<h1>Verify code</h1>\
{message}\
<p>Enter the 6-digit code we emailed you.</p>\
<form method=\"post\" action=\"/verify_otp\">\
<label>Code <input type=\"text\" name=\"otp\" inputmode=\"numeric\" required></label>\
<button type=\"submit\">Verify</button>\
</form>",
            message = message_block(message),
        ),
    )
}

pub(crate) fn reset_password(message: Option<&str>) -> String {
    layout(
        "Reset password",
        &format!(
            "<h1>Reset password</h1>\
{message}\
<form method=\"post\" action=\"/reset_password\">\
<label>New password <input type=\"password\" name=\"new_password\" required></label>\
<label>Confirm password <input type=\"password\" name=\"confirm_password\" required></label>\
<button type=\"submit\">Reset</button>\
</form>",
            message = message_block(message),
        ),
    )
}

pub(crate) fn index(username: &str, prediction: Option<&str>, message: Option<&str>) -> String {
    let prediction_block = prediction.map_or_else(String::new, |label| {
        format!(
            "<p class=\"prediction\">Prediction: <strong>{}</strong></p>",
            escape(label)
        )
    });

    layout(
        "Leaf check",
        &format!(
            "<h1>Leaf check</h1>\
<p>Signed in as <strong>{user}</strong>. <a href=\"/logout\">Log out</a></p>\
{message}\
<form method=\"post\" action=\"/\" enctype=\"multipart/form-data\">\
<label>Leaf image <input type=\"file\" name=\"leaf_image\" accept=\"image/*\"></label>\
<button type=\"submit\">Classify</button>\
</form>\
{prediction}",
            user = escape(username),
            message = message_block(message),
            prediction = prediction_block,
        ),
    )
}

pub(crate) fn internal_error() -> String {
    layout(
        "Error",
        "<h1>Something went wrong</h1><p>Try again later.</p>",
    )
}

const SETUP_PAGE_HEAD: &str = r##"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<meta name="theme-color" content="#007bff">
<title>SmartGas Setup</title>
<style>
*{box-sizing:border-box}
body{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;background:linear-gradient(135deg,#667eea 0%,#764ba2 100%);margin:0;padding:20px;display:flex;align-items:center;justify-content:center;min-height:100vh;color:#333}
.card{background:#fff;padding:30px;border-radius:20px;box-shadow:0 20px 40px rgba(0,0,0,.1);width:100%;max-width:450px;text-align:center}
h1{color:#2d3748;margin:0 0 10px}
.device-id{background:#f7fafc;padding:10px;border-radius:10px;margin-bottom:25px;font-family:monospace;font-size:14px;color:#4a5568}
label{display:block;text-align:left;font-size:14px;font-weight:600;margin:15px 0 5px;color:#4a5568}
input{width:100%;padding:12px 15px;border-radius:10px;border:2px solid #e2e8f0;font-size:16px}
input:focus{outline:none;border-color:#007bff}
button{margin-top:25px;width:100%;padding:15px;border-radius:10px;border:0;background:linear-gradient(135deg,#007bff,#0056b3);color:#fff;font-size:16px;font-weight:600;cursor:pointer}
</style>
</head>
<body>
<div class="card">
<h1>SmartGas Setup</h1>
"##;

const SETUP_PAGE_FORM: &str = r#"<form method="POST" action="/connect">
<label for="ssid">Wi-Fi network (SSID)</label>
<input id="ssid" name="ssid" required>
<label for="password">Wi-Fi password</label>
<input id="password" name="password" type="password" required>
<label for="email">Alert email (optional)</label>
<input id="email" name="email" type="email">
<label for="mobile">Mobile number (optional)</label>
<input id="mobile" name="mobile" type="tel">
<button type="submit">Save and connect</button>
</form>
</div>
</body>
</html>
"#;

pub fn render_setup_page(device_id: &str) -> String {
    format!(
        "{SETUP_PAGE_HEAD}<div class=\"device-id\">Device ID: {}</div>\n{SETUP_PAGE_FORM}",
        escape_html(device_id)
    )
}

pub fn render_saved_page(ssid: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>SmartGas - Success</title>
<style>
body{{font-family:Arial;background:#f0f9ff;display:flex;align-items:center;justify-content:center;height:100vh;margin:0}}
.card{{background:#fff;padding:30px;border-radius:15px;box-shadow:0 8px 25px rgba(0,0,0,.1);text-align:center;max-width:400px}}
h2{{color:#059669;margin:0 0 15px}}
</style>
<script>setTimeout(function(){{window.close();}},3000);</script>
</head>
<body>
<div class="card">
<h2>Wi-Fi Saved Successfully!</h2>
<p>Device is connecting to your network...</p>
<p><strong>SSID:</strong> {}</p>
<p>This window will close automatically.</p>
</div>
</body>
</html>
"#,
        escape_html(ssid)
    )
}

pub fn render_error_page(message: &str) -> String {
    format!(
        "<h3 style='color: red;'>{}</h3>",
        escape_html(message)
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

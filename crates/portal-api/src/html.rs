//! HTML page fragments. Every dynamic value goes through [`escape`].

use portal_types::JobRow;

const STYLE: &str = r#"
      body { font-family: Arial, sans-serif; margin: 20px; background-color: #f8f8f8; }
      nav { background-color: #333; padding: 10px; text-align: center; margin-bottom: 20px; }
      nav a { color: #f8f8f8; margin: 0 15px; text-decoration: none; font-weight: bold; }
      nav a:hover { text-decoration: underline; }
      nav span { color: white; }
      .container { background-color: #fff; padding: 20px; border-radius: 5px; box-shadow: 0 0 10px rgba(0,0,0,0.1); }
      table { width: 100%; border-collapse: collapse; margin-top: 20px; }
      table, th, td { border: 1px solid #ddd; }
      th, td { padding: 8px; text-align: center; }
      th { background-color: #f2f2f2; }
      .flash { color: green; font-weight: bold; margin-bottom: 10px; }
      .button { background-color: #ff4d4d; color: white; padding: 5px 10px; border: none; border-radius: 3px; cursor: pointer; text-decoration: none; }
      .button:hover { background-color: #e60000; }
      input[type="text"], input[type="password"], textarea, select { width: 100%; padding: 8px; margin: 4px 0; box-sizing: border-box; }
      input[type="submit"] { background-color: #4CAF50; color: white; border: none; padding: 10px 20px; cursor: pointer; }
"#;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

fn nav_bar(user: Option<&str>) -> String {
    let account = match user {
        Some(u) => format!(
            r#"<span>Welcome, {}</span> | <a href="/logout">Logout</a>"#,
            escape(u)
        ),
        None => r#"<a href="/login">Login</a>"#.to_string(),
    };
    format!(
        r#"<nav>
      <a href="/">Home</a>
      <a href="/submit">Submit Job</a>
      <a href="/template">Template</a>
      <a href="/nodes">Node Status</a>
      <a href="/cancel_jobs">Cancel Jobs</a>
      {}
    </nav>"#,
        account
    )
}

/// Full page: header, navigation, container with `body`.
pub fn layout(title: &str, user: Option<&str>, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>{style}</style>
  </head>
  <body>
    {nav}
    <div class="container">
{body}
    </div>
  </body>
</html>
"#,
        title = escape(title),
        style = STYLE,
        nav = nav_bar(user),
        body = body,
    )
}

/// Flash area; messages joined with `<br>`.
pub fn flash_block(messages: &[String]) -> String {
    let joined: Vec<String> = messages.iter().map(|m| escape(m)).collect();
    format!(r#"<div class="flash">{}</div>"#, joined.join("<br>"))
}

pub const LOGIN_FORM: &str = r#"<h2>Login</h2>
<form method="post" action="/login" autocomplete="off">
  <label>User:</label><br>
  <input type="text" name="username" autocomplete="off"><br>
  <label>Password:</label><br>
  <input type="password" name="password" autocomplete="off"><br><br>
  <input type="submit" value="Login">
</form>"#;

pub const SUBMIT_FORM: &str = r#"<h2>Submit Job</h2>
<form method="post" action="/submit" autocomplete="off">
  <label>Job name:</label><br>
  <input type="text" name="job_name" placeholder="e.g. my_job" autocomplete="off"><br><br>
  <label>Job script:</label><br>
  <textarea name="job_script" cols="80" rows="10" placeholder="Write the job script here..." autocomplete="off"></textarea><br>
  <input type="submit" value="Submit Job">
</form>"#;

/// Jobs table; `cancel_links` adds an action column with a button posting to `/cancel/<id>`.
pub fn jobs_table(rows: &[JobRow], cancel_links: bool) -> String {
    if rows.is_empty() {
        return "<p>No jobs registered.</p>".to_string();
    }
    let mut html = String::from(
        "<table>\n<tr><th>JOBID</th><th>Partition</th><th>Name</th><th>State</th>\
         <th>Time</th><th>Nodes</th><th>NodeList</th><th>InterfaceUser</th>",
    );
    if cancel_links {
        html.push_str("<th>Action</th>");
    }
    html.push_str("</tr>\n");
    for row in rows {
        let e = &row.entry;
        html.push_str(&format!(
            r#"<tr><td>{}</td><td>{}</td><td>{}</td><td title="{}">{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>"#,
            escape(&e.job_id),
            escape(&e.partition),
            escape(&e.name),
            escape(e.job_state().label()),
            escape(&e.state),
            escape(&e.time_used),
            escape(&e.nodes),
            escape(&e.nodelist),
            escape(&row.interface_user),
        ));
        if cancel_links {
            html.push_str(&format!(
                r#"<td><form method="post" action="/cancel/{}" style="margin:0;"><button class="button" type="submit">Cancel</button></form></td>"#,
                escape(&e.job_id)
            ));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>");
    html
}

/// Admin-only filter on the cancel page.
pub fn show_all_filter(show_all: bool) -> String {
    format!(
        r#"<form method="get" action="/cancel_jobs" style="margin-bottom:20px;">
  <label><input type="checkbox" name="all" value="on" {}> Show jobs of all users</label>
  <input type="submit" value="Apply">
</form>"#,
        if show_all { "checked" } else { "" }
    )
}

pub fn node_status(text: &str) -> String {
    format!("<h2>Node Status</h2><pre>{}</pre>", escape(text))
}

/// Escape text for use inside a double-quoted JavaScript string in a `<script>` block.
fn js_string_body(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '<' => out.push_str("\\u003c"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Template generator: form fields plus a client-side preview filled into `job_script`.
/// Without scripting the preview stays empty and the server renders the same script.
pub fn template_form(chdir: &str) -> String {
    format!(
        r##"<h2>Job Script Generator</h2>
<form method="post" action="/submit" autocomplete="off">
  <label>Job name:</label><br>
  <input type="text" id="job_name" name="job_name" oninput="updatePreview()" autocomplete="off"><br><br>
  <label>Time (HH:MM:SS):</label><br>
  <select id="time" name="time" oninput="updatePreview()">
    <option value="">-- Select --</option>
    <option value="00:10:00">00:10:00</option>
    <option value="00:30:00">00:30:00</option>
    <option value="01:00:00">01:00:00</option>
    <option value="02:00:00">02:00:00</option>
    <option value="04:00:00">04:00:00</option>
    <option value="08:00:00">08:00:00</option>
  </select><br><br>
  <label>Nodes:</label><br>
  <select id="nodes" name="nodes" oninput="updatePreview()">
    <option value="1" selected>1</option>
    <option value="2">2</option>
    <option value="4">4</option>
    <option value="8">8</option>
  </select><br><br>
  <label>Tasks per node:</label><br>
  <select id="ntasks" name="ntasks" oninput="updatePreview()">
    <option value="1" selected>1</option>
    <option value="2">2</option>
    <option value="4">4</option>
    <option value="8">8</option>
    <option value="16">16</option>
  </select><br><br>
  <label>Memory (e.g. 4G):</label><br>
  <input type="text" id="mem" name="mem" placeholder="e.g. 4G" list="mem-options" oninput="updatePreview()" autocomplete="off">
  <datalist id="mem-options">
    <option value="1G"><option value="2G"><option value="4G"><option value="8G"><option value="16G"><option value="32G">
  </datalist><br><br>
  <label>Job array (e.g. 1-10):</label><br>
  <input type="text" id="array" name="array" placeholder="1-10" oninput="updatePreview()" autocomplete="off"><br><br>
  <label>Commands:</label><br>
  <textarea id="commands" name="commands" rows="5" cols="80" placeholder="Write the commands here..." oninput="updatePreview()" autocomplete="off"></textarea><br><br>
  <label>Script preview:</label><br>
  <textarea id="scriptPreview" name="job_script" rows="10" cols="80" readonly></textarea><br><br>
  <input type="submit" value="Submit Job">
</form>
<script>
function updatePreview() {{
  var v = function (id) {{ return document.getElementById(id).value.trim(); }};
  var directives = [
    ["--job-name", v("job_name")],
    ["--time", v("time")],
    ["--nodes", v("nodes")],
    ["--ntasks-per-node", v("ntasks")],
    ["--mem", v("mem")],
    ["--array", v("array")]
  ];
  var script = "#!/bin/bash\n";
  directives.forEach(function (d) {{
    if (d[1]) {{ script += "#SBATCH " + d[0] + "=" + d[1] + "\n"; }}
  }});
  script += "#SBATCH --chdir={chdir}\n\n";
  script += document.getElementById("commands").value;
  document.getElementById("scriptPreview").value = script.replace(/\r\n/g, "\n");
}}
window.onload = updatePreview;
</script>"##,
        chdir = js_string_body(chdir)
    )
}

// src/page.rs

//! Fixed HTML surrounding the rendered markdown.

/// Prepended to snapshot responses unless the request opts out with
/// `?nojs=true`. The script listens on `/updates` and swaps the body for a
/// fresh script-less snapshot on every event.
pub const LIVE_RELOAD_SCRIPT: &str = r#"
<head>
<script type="application/javascript">
var source = new EventSource("/updates");
source.addEventListener("message", function () {
  fetch("?nojs=true")
    .then(function (response) {
      if (!response.ok) { throw new Error(response.status); }
      return response.text();
    })
    .then(function (html) { document.body.innerHTML = html; })
    .catch(function () {});
}, false);
</script>
</head>
"#;

pub const HTML_HEADER: &str = r#"
<body>
<style type="text/css">
a {
  color: #4183C4;
  text-decoration: none;
}
a:hover {
  text-decoration: underline;
}
h1 {
  border-bottom: 3px solid #ccc;
  padding-bottom: 10px;
}
body {
  font: 14px / 20px "Helvetica Neue", "Lucida Grande", Helvetica, Arial, Verdana, sans-serif;
}
pre, code {
  font-family: "Ubuntu Mono", Courier, monospace;
  background-color: #F0EEEA;
  padding: 2px;
  overflow: auto;
}
.highlight pre {
  padding-left: 6px;
}
table {
  border-collapse: collapse;
}
td, th {
  border: 1px solid #ccc;
  padding: 4px 8px;
}
#wrapper {
  max-width: 800px;
  margin: 50px auto;
  border: 3px solid #ccc;
  padding: 0px 15px;
}
</style>
<div id="wrapper">
"#;

pub const HTML_FOOTER: &str = r#"
</div>
</body>
"#;

/// Surrounds a rendered body with [`HTML_HEADER`] and [`HTML_FOOTER`].
pub fn wrap(body: &[u8]) -> Vec<u8> {
    let mut page = Vec::with_capacity(HTML_HEADER.len() + body.len() + HTML_FOOTER.len());
    page.extend_from_slice(HTML_HEADER.as_bytes());
    page.extend_from_slice(body);
    page.extend_from_slice(HTML_FOOTER.as_bytes());
    page
}

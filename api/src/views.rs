use crate::{domains::Person, form::Form, http::Html};

const HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Persons</title>
</head>
<body>
<h1>Persons</h1>
<ul id="persons"></ul>
"#;

const TAIL: &str = r#"<script>
fetch("/persons")
  .then((res) => res.json())
  .then((persons) => {
    const list = document.getElementById("persons");
    for (const person of persons) {
      const item = document.createElement("li");
      item.textContent = person.name;
      list.appendChild(item);
    }
  });
</script>
</body>
</html>
"#;

/// Renders the landing page: the person list placeholder and the
/// "Add Person" form, with errors and the submitted name when `form` is a
/// failed submission.
pub fn render_index(form: Option<&Form<Person>>) -> Html {
    let mut page = String::with_capacity(HEAD.len() + TAIL.len() + 512);
    page.push_str(HEAD);

    let global_errors = form.map(Form::global_errors).unwrap_or_default();
    for error in global_errors {
        page.push_str(&format!("<p class=\"error\">{}</p>\n", escape(error)));
    }

    let name = form.and_then(|form| form.raw("name")).unwrap_or_default();
    let name_errors = form.map(|form| form.errors("name")).unwrap_or_default();

    page.push_str("<form method=\"post\" action=\"/persons\">\n<dl>\n");
    page.push_str("<dt><label for=\"name\">name</label></dt>\n");
    page.push_str(&format!(
        "<dd><input type=\"text\" id=\"name\" name=\"name\" value=\"{}\"></dd>\n",
        escape(name)
    ));
    for error in name_errors {
        page.push_str(&format!("<dd class=\"error\">{}</dd>\n", escape(error)));
    }
    page.push_str("</dl>\n<button type=\"submit\">Add Person</button>\n</form>\n");

    page.push_str(TAIL);
    Html(page)
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

//! Server-rendered detail page for a single student. It shows exactly the fields the JSON
//! API returns, escaped for HTML.
use registry_common::person::Person;

const MISSING: &str = "\u{2014}";

/// Label and value for every field of a Person, in display order.
pub fn person_rows(person: &Person) -> Vec<(&'static str, Option<String>)> {
    vec![
        ("ID", Some(person.id.to_string())),
        ("First name", Some(person.first_name.clone())),
        ("Last name", Some(person.last_name.clone())),
        ("Middle name", person.middle_name.clone()),
        ("Parents' phone", person.parents_phone.clone()),
        ("Region", person.viloyat.clone()),
        ("District", person.tuman.clone()),
        ("Address", person.manzil.clone()),
        ("Track", person.yonalish.clone()),
        ("About me", person.about_me.clone()),
        ("Studied at", person.oqigan_joyi.clone()),
        ("Date of birth", person.tugilgan_kun.map(|date| date.to_string())),
        ("Gender", person.gender.clone()),
        ("Telegram", person.tg_username.clone()),
        ("Email", person.email.clone()),
    ]
}

pub fn render_person_page(person: &Person) -> String {
    let title = escape_html(&format!("{} {}", person.first_name, person.last_name));

    let mut rows = String::new();
    for (label, value) in person_rows(person) {
        let value = value.as_deref().map_or_else(|| MISSING.to_owned(), escape_html);
        rows.push_str(&format!(
            "\n      <tr><th>{label}</th><td>{value}</td></tr>"
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="uz">
  <head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>
      body {{ font-family: sans-serif; margin: 2rem; }}
      th {{ text-align: left; padding-right: 1rem; vertical-align: top; }}
      td {{ white-space: pre-wrap; }}
    </style>
  </head>
  <body>
    <h1>{title}</h1>
    <table>{rows}
    </table>
  </body>
</html>
"#
    )
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

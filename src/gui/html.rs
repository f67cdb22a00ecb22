//! HTML building blocks: escaping, page layout, navigation and badges.

use super::theme;

/// One navigation entry: path and label.
pub struct NavEntry {
    pub path: &'static str,
    pub label: &'static str,
}

/// Navigation bar, one entry per page.
pub const NAV: &[NavEntry] = &[
    NavEntry { path: "/overview", label: "Visão Geral" },
    NavEntry { path: "/clients", label: "Clientes" },
    NavEntry { path: "/cases", label: "Casos" },
    NavEntry { path: "/documents", label: "Documentos" },
    NavEntry { path: "/calendar", label: "Agenda" },
    NavEntry { path: "/tasks", label: "Tarefas" },
    NavEntry { path: "/cases-by-client", label: "Casos por Cliente" },
    NavEntry { path: "/finance", label: "Financeiro" },
    NavEntry { path: "/reports", label: "Relatórios" },
];

/// Escape text for use in element content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Colored badge for an enumeration value.
pub fn badge(key: &str, label: &str) -> String {
    format!(
        r#"<span class="badge" style="background: {}">{}</span>"#,
        theme::badge_color(key),
        escape(label)
    )
}

/// Warnings shown at the top of a page.
pub fn flashes(warnings: &[String], errors: &[String]) -> String {
    let mut out = String::new();
    for error in errors {
        out.push_str(&format!(r#"<div class="flash error">{}</div>"#, escape(error)));
    }
    for warning in warnings {
        out.push_str(&format!(r#"<div class="flash">{}</div>"#, escape(warning)));
    }
    out
}

/// Full page with navigation; `active` is the path of the current page.
pub fn page(title: &str, active: &str, body: &str) -> String {
    let nav: String = NAV
        .iter()
        .map(|entry| {
            let class = if entry.path == active { r#" class="active""# } else { "" };
            format!(r#"<a href="{}"{}>{}</a>"#, entry.path, class, entry.label)
        })
        .collect();
    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} · Docket</title>
<style>{css}</style>
</head>
<body>
<nav><span class="brand">Docket</span>{nav}</nav>
<main>
<h1>{title}</h1>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
        css = theme::stylesheet(),
        nav = nav,
        body = body,
    )
}

/// `<option>` list with `selected` on the matching key or label.
pub fn options(choices: &[(&str, &str)], selected: &str) -> String {
    choices
        .iter()
        .map(|(key, label)| {
            let is_selected = selected.eq_ignore_ascii_case(key) || selected == *label;
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                escape(key),
                if is_selected { " selected" } else { "" },
                escape(label)
            )
        })
        .collect()
}

/// Small form posting to `action`, rendered as a single button.
pub fn button_form(action: &str, label: &str, class: &str) -> String {
    format!(
        r#"<form method="post" action="{}"><button class="{}">{}</button></form>"#,
        escape(action),
        class,
        escape(label)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<b>"Ana" & 'Bia'</b>"#),
            "&lt;b&gt;&quot;Ana&quot; &amp; &#39;Bia&#39;&lt;/b&gt;"
        );
        assert_eq!(escape("São Paulo"), "São Paulo");
    }

    #[test]
    fn test_page_marks_active_entry() {
        let html = page("Clientes", "/clients", "<p>x</p>");
        assert!(html.contains(r#"<a href="/clients" class="active">Clientes</a>"#));
        assert!(html.contains(r#"<a href="/cases">Casos</a>"#));
        assert!(html.contains("<p>x</p>"));
    }

    #[test]
    fn test_options_selects_by_key_or_label() {
        let choices = [("open", "Aberto"), ("closed", "Fechado")];
        assert!(options(&choices, "closed").contains(r#"<option value="closed" selected>"#));
        assert!(options(&choices, "Aberto").contains(r#"<option value="open" selected>"#));
    }
}

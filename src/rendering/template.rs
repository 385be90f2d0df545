//! Certificate markup as a pure function of the pledge and the user's details

use super::surface::{CAPTURE_TARGET_ID, PREVIEW_TARGET_ID};
use crate::{Pledge, UserData, LOGICAL_HEIGHT, LOGICAL_WIDTH};

const PAPER: &str = "#fbf7ef";
const INK: &str = "#1c1917";
const ACCENT: &str = "#059669";

/// A document holding the full-resolution capture target.
pub fn certificate_markup(pledge: &Pledge, user: &UserData, logo_src: Option<&str>) -> String {
    format!(
        "<!DOCTYPE html><html><body>{}</body></html>",
        certificate_element(CAPTURE_TARGET_ID, pledge, user, logo_src)
    )
}

/// A document with both the on-screen preview and the hidden capture target,
/// as mounted on the success screen.
pub fn success_markup(user: &UserData, logo_src: Option<&str>) -> String {
    let pledge = Pledge::custom(&user.custom_pledge);
    format!(
        "<!DOCTYPE html><html><body>{}{}</body></html>",
        certificate_element(PREVIEW_TARGET_ID, &pledge, user, logo_src),
        certificate_element(CAPTURE_TARGET_ID, &pledge, user, logo_src)
    )
}

/// One certificate subtree at its logical size.
pub fn certificate_element(id: &str, pledge: &Pledge, user: &UserData, logo_src: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        r#"<div id="{}" data-w="{}" data-h="{}" data-bg="{}">"#,
        escape(id),
        LOGICAL_WIDTH,
        LOGICAL_HEIGHT,
        PAPER
    ));
    // frame
    out.push_str(&format!(
        r#"<div data-x="40" data-y="40" data-w="1000" data-h="1360" data-bg="{}"><div data-x="8" data-y="8" data-w="984" data-h="1344" data-bg="{}"></div></div>"#,
        INK, PAPER
    ));
    if let Some(src) = logo_src.filter(|s| !s.trim().is_empty()) {
        out.push_str(&format!(
            r#"<img data-x="460" data-y="110" data-w="160" data-h="160" src="{}">"#,
            escape(src)
        ));
    }
    out.push_str(&format!(
        r#"<h1 data-x="90" data-y="320" data-w="900" data-size="64" data-color="{}" data-align="center">MY 2026 PLEDGE</h1>"#,
        INK
    ));

    let name = user.full_name.trim();
    if !name.is_empty() {
        out.push_str(&format!(
            r#"<h2 data-x="90" data-y="450" data-w="900" data-size="44" data-color="{}" data-align="center">{}</h2>"#,
            ACCENT,
            escape(name)
        ));
    }
    out.push_str(&format!(
        r#"<p data-x="120" data-y="600" data-w="840" data-size="48" data-color="{}" data-align="center">{}</p>"#,
        INK,
        escape(pledge.text.trim())
    ));
    if !pledge.explanation.trim().is_empty() {
        out.push_str(&format!(
            r#"<p data-x="140" data-y="1040" data-w="800" data-size="28" data-color="{}" data-align="center">{}</p>"#,
            ACCENT,
            escape(pledge.explanation.trim())
        ));
    }
    out.push_str(&format!(
        r#"<div data-x="340" data-y="1250" data-w="400" data-h="4" data-bg="{}"></div><span data-x="90" data-y="1290" data-w="900" data-size="26" data-color="{}" data-align="center">#Pledge2026</span>"#,
        ACCENT, INK
    ));
    out.push_str("</div>");
    out
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

//! HTML serialization of a [`PictureOutput`].
//!
//! Tag and attribute names come from the engine or from caller attribute
//! maps; values are escaped through maud's [`Render`] impl for `str`.
//! Attributes print in name order so output is stable across runs.

use crate::picture::{Attributes, PictureOutput};
use maud::{Markup, PreEscaped, Render, html};

/// Serialize to markup: `<picture ...><source ...><img ...></picture>`.
pub fn render(output: &PictureOutput) -> Markup {
    match &output.wrapper {
        None => start_tag("img", &output.img),
        Some(wrapper) => html! {
            (start_tag(&wrapper.tag, &wrapper.attributes))
            @if let Some(source) = &output.source {
                (start_tag("source", source))
            }
            (start_tag("img", &output.img))
            (PreEscaped(format!("</{}>", wrapper.tag)))
        },
    }
}

/// Serialize an optional output; nothing renders as empty markup.
pub fn render_optional(output: Option<&PictureOutput>) -> Markup {
    output.map_or_else(|| html! {}, render)
}

// Tag and attribute names are only known at runtime, which `html!` cannot
// express, so start tags are written by hand.
fn start_tag(tag: &str, attrs: &Attributes) -> Markup {
    let mut html = String::new();
    html.push('<');
    html.push_str(tag);
    for (name, value) in attrs {
        html.push(' ');
        html.push_str(name);
        html.push_str("=\"");
        value.as_str().render_to(&mut html);
        html.push('"');
    }
    html.push('>');
    PreEscaped(html)
}

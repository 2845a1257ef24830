//! Render strategy engine: compiles a stored component into page markup.
//!
//! Rendering is pure computation over an already-loaded [`Component`]: no
//! I/O, no shared state, one call per placement. Each isolation mode
//! produces its own encoding:
//!
//! - **frame**: a self-contained document delivered through a sandboxed
//!   inline-document frame (`sandbox="allow-scripts"`, never
//!   `allow-same-origin`). The only mode with genuine script isolation.
//! - **shadow**: a host element with a declarative shadow-root template
//!   and a bootstrap script that attaches it exactly once.
//! - **slot**: the shadow wiring, but the template projects a `<slot>` and
//!   the markup lives in the host's light DOM where page scripts can reach
//!   it; the host is tagged for the rehydration observer.
//!
//! Every interpolated value is escaped for its destination context
//! ([`escape::escape_html_attr`] / [`escape::escape_js_string`]); the
//! stored fields themselves carry whatever trust the capability policy
//! assigned at write time.

pub mod escape;

use crate::component::{Component, RenderMode};
use crate::frontend::ClientAsset;
use escape::{escape_html_attr, escape_js_string};

/// Attribute marking a host for the rehydration observer.
pub const SLOT_OBSERVATION_ATTR: &str = "data-scrim-slot";

/// A rendered component: page markup plus the client assets the page must
/// enqueue alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Markup to place at the component's position in the page.
    pub markup: String,
    /// Client assets this rendering depends on, in enqueue order.
    pub assets: Vec<ClientAsset>,
}

/// The stable host element id for a stored component.
#[must_use]
pub fn host_element_id(component: &Component) -> String {
    format!("scrim-host-{}", component.id)
}

/// Renders a component according to its isolation mode.
#[must_use]
pub fn render(component: &Component) -> Rendered {
    match component.mode {
        RenderMode::Frame => render_frame(component),
        RenderMode::Shadow => render_host(component, false),
        RenderMode::Slot => render_host(component, true),
    }
}

/// Wraps ad-hoc page content in an observed slot host.
///
/// Used for content that is not a stored component (server-generated
/// fragments the page wants rehydration for), with a caller-supplied host
/// id. The host id is untrusted and escaped for both destination contexts.
#[must_use]
pub fn render_slot_wrapper(content: &str, host_id: &str) -> Rendered {
    let template = build_shadow_template("", None);
    let bootstrap = build_bootstrap(host_id, None);
    let markup = format!(
        "<div id=\"{id}\" class=\"scrim-host\" {SLOT_OBSERVATION_ATTR}=\"1\">{template}{content}</div>{bootstrap}",
        id = escape_html_attr(host_id),
    );
    Rendered {
        markup,
        assets: vec![ClientAsset::HostStyle, ClientAsset::RehydrationObserver],
    }
}

fn render_frame(component: &Component) -> Rendered {
    let document = build_frame_document(component);
    let markup = format!(
        "<iframe class=\"scrim-frame\" title=\"Component {id}\" sandbox=\"allow-scripts\" srcdoc=\"{srcdoc}\"></iframe>",
        id = component.id,
        srcdoc = escape_html_attr(&document),
    );
    Rendered {
        markup,
        assets: vec![ClientAsset::HostStyle],
    }
}

fn render_host(component: &Component, slot: bool) -> Rendered {
    let host_id = host_element_id(component);
    let template = if slot {
        build_shadow_template(&component.style, None)
    } else {
        build_shadow_template(&component.style, Some(&component.markup))
    };
    let bootstrap = build_bootstrap(&host_id, component.script.as_deref());

    let (slot_attr, light_dom) = if slot {
        (
            format!(" {SLOT_OBSERVATION_ATTR}=\"1\""),
            component.markup.as_str(),
        )
    } else {
        (String::new(), "")
    };

    let markup = format!(
        "<div id=\"{id}\" class=\"scrim-host\"{slot_attr}>{template}{light_dom}</div>{bootstrap}",
        id = escape_html_attr(&host_id),
    );

    let assets = if slot {
        vec![ClientAsset::HostStyle, ClientAsset::RehydrationObserver]
    } else {
        vec![ClientAsset::HostStyle]
    };
    Rendered { markup, assets }
}

/// The self-contained document embedded in frame mode.
///
/// Style and script run inside the sandboxed document, so they are embedded
/// verbatim; the frame boundary is the isolation mechanism.
fn build_frame_document(component: &Component) -> String {
    let mut document = String::with_capacity(
        64 + component.style.len()
            + component.markup.len()
            + component.script.as_deref().map_or(0, str::len),
    );
    document.push_str("<!doctype html><html><head><style>");
    document.push_str(&component.style);
    document.push_str("</style></head><body>");
    document.push_str(&component.markup);
    if let Some(script) = component.script.as_deref().filter(|s| !s.is_empty()) {
        document.push_str("<script>");
        document.push_str(script);
        document.push_str("</script>");
    }
    document.push_str("</body></html>");
    document
}

/// The declarative shadow-root template: style block plus either the markup
/// (shadow mode) or a slot projection point (slot mode).
fn build_shadow_template(style: &str, markup: Option<&str>) -> String {
    let content = markup.unwrap_or("<slot></slot>");
    format!("<template shadowrootmode=\"open\"><style>{style}</style>{content}</template>")
}

/// The per-host bootstrap script.
///
/// Idempotent: when the host already has an attached shadow root it does
/// nothing, so browsers that consumed the declarative template at parse
/// time (and re-invocations) are no-ops. Otherwise it attaches the
/// template's content as the shadow root exactly once and removes the
/// template node. When component script is present, a guarded runner
/// executes it in a try/catch, deferred until the document has finished
/// loading, so script errors never block page construction.
fn build_bootstrap(host_id: &str, script: Option<&str>) -> String {
    let id = escape_js_string(host_id);
    let mut boot = format!(
        "(function(){{var host=document.getElementById('{id}');if(!host){{return;}}\
         if(!host.shadowRoot){{var tpl=host.querySelector('template[shadowrootmode]');\
         if(tpl&&host.attachShadow){{host.attachShadow({{mode:'open'}}).appendChild(tpl.content.cloneNode(true));tpl.remove();}}}}"
    );
    if let Some(script) = script.filter(|s| !s.is_empty()) {
        boot.push_str(&format!(
            "var run=function(){{try{{{script}}}catch(e){{console.error('scrim component error',e);}}}};\
             if(document.readyState==='loading'){{document.addEventListener('DOMContentLoaded',run);}}else{{run();}}"
        ));
    }
    boot.push_str("})();");
    format!("<script>{boot}</script>")
}

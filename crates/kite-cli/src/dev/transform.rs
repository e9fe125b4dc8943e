//! Turning a request into a browser-ready response body.
//!
//! Every script that reaches the browser passes through the import rewriter,
//! which is also what keeps the dependency graph current. A component is
//! served as three kinds of modules: its main module (script plus imports of
//! the other two), its template and each of its style blocks.

use crate::dev::DevServerState;
use kite_hmr::rewrite::source_type_for;
use kite_hmr::style::{css_element_id, css_to_module, style_element_id};
use kite_hmr::{
    rewrite_default_export, HmrError, ModuleId, ModuleRequest, RequestKind, Result, SfcDescriptor,
};
use oxc_span::SourceType;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Route of the client runtime script.
pub const CLIENT_ROUTE: &str = "/@kite/client.js";

/// Local binding a component's script export is captured in.
const SCRIPT_BINDING: &str = "__script";

/// A response body with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedModule {
    pub body: Vec<u8>,
    pub content_type: &'static str,
}

impl ServedModule {
    fn javascript(code: String) -> Self {
        Self {
            body: code.into_bytes(),
            content_type: "application/javascript",
        }
    }

    fn html(html: String) -> Self {
        Self {
            body: html.into_bytes(),
            content_type: "text/html; charset=utf-8",
        }
    }
}

/// Outcome of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Served {
    Module(ServedModule),
    /// The code lives at another URL, which relative imports inside it must
    /// resolve against.
    Redirect(String),
}

/// Serve one parsed request.
pub async fn serve(state: &DevServerState, request: &ModuleRequest) -> Result<Served> {
    let path = request.id.path();

    let bare_prefix = format!("{}/", state.config.bare_module_route);
    if let Some(name) = path.strip_prefix(&bare_prefix) {
        return serve_dependency(state, request, name).await;
    }

    let served = match request.id.extension() {
        _ if path == "/" => serve_page(state, &ModuleId::new("/index.html")?).await,
        Some("html" | "htm") => serve_page(state, &request.id).await,
        Some("js" | "mjs") => serve_script(state, request).await,
        Some("css") => serve_css(state, request).await,
        Some("vue") => serve_component(state, request).await,
        Some(ext) if request.is_import && is_static_asset(ext) => Ok(asset_module(path)),
        _ => serve_static(state, path).await,
    }?;
    Ok(Served::Module(served))
}

/// An HTML page with the client runtime injected.
async fn serve_page(state: &DevServerState, id: &ModuleId) -> Result<ServedModule> {
    let html = state.loader.load(id).await?;
    Ok(ServedModule::html(inject_client_script(&html)))
}

/// A plain script, rewritten.
async fn serve_script(state: &DevServerState, request: &ModuleRequest) -> Result<ServedModule> {
    let source = state.loader.load(&request.id).await?;
    let output = state
        .rewriter
        .rewrite(request, &source, SourceType::mjs())?;
    Ok(ServedModule::javascript(output.code))
}

/// A stylesheet: a style-inserting module when imported from script, raw otherwise.
async fn serve_css(state: &DevServerState, request: &ModuleRequest) -> Result<ServedModule> {
    let css = state.loader.load(&request.id).await?;
    if request.is_import {
        let element_id = css_element_id(&request.id);
        return Ok(ServedModule::javascript(css_to_module(&css, &element_id)));
    }
    Ok(ServedModule {
        body: css.into_bytes(),
        content_type: "text/css",
    })
}

/// One of a component's modules, picked by the request kind.
async fn serve_component(state: &DevServerState, request: &ModuleRequest) -> Result<ServedModule> {
    let owner = request.id.owner();
    let descriptor = load_descriptor(state, &owner).await?;

    let code = match request.kind {
        RequestKind::Main => {
            let (code, source_type) = component_main_module(&owner, &descriptor)?;
            state.rewriter.rewrite(request, &code, source_type)?.code
        }
        RequestKind::Template => {
            let template = descriptor
                .template
                .as_ref()
                .ok_or_else(|| missing_block(&owner, "template"))?;
            let code = state.compiler.compile(&request.id, template)?;
            state.rewriter.rewrite(request, &code, SourceType::mjs())?.code
        }
        RequestKind::Style(index) => {
            let style = descriptor
                .styles
                .get(index)
                .ok_or_else(|| missing_block(&owner, &format!("style #{index}")))?;
            let css = match &style.src {
                Some(src) => load_style_src(state, request, &owner, src).await?,
                None => style.content.clone(),
            };
            css_to_module(&css, &style_element_id(&owner, index))
        }
    };

    Ok(ServedModule::javascript(code))
}

/// The stylesheet behind `<style src="...">`.
///
/// The file is recorded as an import of the style block, so editing it
/// reaches the component like any other dependency.
async fn load_style_src(
    state: &DevServerState,
    request: &ModuleRequest,
    owner: &ModuleId,
    src: &str,
) -> Result<String> {
    let target = owner.resolve(src)?;
    state.graph.record_edges(&request.id, [target.clone()]);
    state.loader.load(&target).await
}

/// The cached parse of a component, parsing and caching it on a miss.
async fn load_descriptor(state: &DevServerState, owner: &ModuleId) -> Result<Arc<SfcDescriptor>> {
    if let Some(descriptor) = state.descriptors.get(owner) {
        return Ok(descriptor);
    }
    let source = state.loader.load(owner).await?;
    state
        .descriptors
        .get_or_parse(owner, &source)
        .map_err(|source| HmrError::Sfc {
            id: owner.clone(),
            source,
        })
}

/// Stitch a component's main module: its script with the default export
/// captured, the template's render function and one import per style block.
///
/// Specifiers are left as written; the caller rewrites the whole module so
/// the template and style sub-resources become graph edges of the component.
pub fn component_main_module(
    owner: &ModuleId,
    descriptor: &SfcDescriptor,
) -> Result<(String, SourceType)> {
    let path = owner.path();
    let mut code = String::new();

    let source_type = match descriptor.primary_script() {
        Some(script) => {
            let source_type = source_type_for(script.lang().unwrap_or("js"));
            match &script.src {
                Some(src) => {
                    code.push_str(&format!("import {SCRIPT_BINDING} from {};\n", js_string(src)));
                }
                None => {
                    let captured =
                        rewrite_default_export(owner, &script.content, source_type, SCRIPT_BINDING)?;
                    code.push_str(&captured);
                    code.push('\n');
                }
            }
            source_type
        }
        None => {
            code.push_str(&format!("const {SCRIPT_BINDING} = {{}};\n"));
            SourceType::mjs()
        }
    };

    if descriptor.template.is_some() {
        code.push_str(&format!(
            "import {{ render as __render }} from {};\n{SCRIPT_BINDING}.render = __render;\n",
            js_string(&format!("{path}?type=template"))
        ));
    }

    for index in 0..descriptor.styles.len() {
        code.push_str(&format!(
            "import {};\n",
            js_string(&format!("{path}?type=style&index={index}"))
        ));
    }

    code.push_str(&format!(
        "{SCRIPT_BINDING}.__hmrId = {};\nexport default {SCRIPT_BINDING};\n",
        js_string(path)
    ));

    Ok((code, source_type))
}

/// A bare import resolved through the dependency registry.
///
/// A package whose entry lives elsewhere (`vue` -> `vue/dist/vue.mjs`) is
/// redirected there, so the browser resolves the entry's relative imports
/// from the entry's own directory.
async fn serve_dependency(
    state: &DevServerState,
    request: &ModuleRequest,
    name: &str,
) -> Result<Served> {
    let resolved = state.deps.resolve(name).await?;
    if resolved.url_name != name {
        let location = dependency_url(&state.config.bare_module_route, &resolved.url_name, request);
        debug!(name, %location, "redirecting to package entry");
        return Ok(Served::Redirect(location));
    }

    let source = match tokio::fs::read_to_string(&resolved.path).await {
        Ok(source) => source,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(HmrError::NotFound(resolved.path));
        }
        Err(err) => return Err(HmrError::Io(err)),
    };

    // Rewrite under the file's own location so its relative imports
    // resolve next to it, and its bare imports route back here.
    let located = ModuleRequest {
        id: ModuleId::bare(&state.config.bare_module_route, &resolved.url_name)?,
        ..request.clone()
    };
    let output = state
        .rewriter
        .rewrite(&located, &source, SourceType::mjs())?;
    debug!(name, path = %resolved.path.display(), "served dependency");
    Ok(Served::Module(ServedModule::javascript(output.code)))
}

/// `<route>/<url_name>` carrying the request's `import` marker and token.
fn dependency_url(route: &str, url_name: &str, request: &ModuleRequest) -> String {
    let mut params = Vec::with_capacity(2);
    if request.is_import {
        params.push("import".to_string());
    }
    if let Some(token) = &request.timestamp {
        params.push(format!("t={token}"));
    }

    let mut url = format!("{route}/{url_name}");
    if !params.is_empty() {
        url.push('?');
        url.push_str(&params.join("&"));
    }
    url
}

/// Extensions an `import` turns into a URL export: images, media and fonts.
fn is_static_asset(extension: &str) -> bool {
    matches!(
        extension.to_ascii_lowercase().as_str(),
        "png" | "jpg" | "jpeg" | "gif" | "svg" | "ico" | "webp" | "avif"
            | "mp4" | "webm" | "ogg" | "mp3" | "wav" | "flac" | "aac"
            | "woff" | "woff2" | "eot" | "ttf" | "otf"
    )
}

/// `import logo from "./logo.png"` yields the asset's URL.
fn asset_module(path: &str) -> ServedModule {
    ServedModule::javascript(format!("export default {};\n", js_string(path)))
}

/// A file from the public directory, then from the root.
async fn serve_static(state: &DevServerState, path: &str) -> Result<ServedModule> {
    let relative = path.trim_start_matches('/');
    let candidates: [PathBuf; 2] = [
        state.config.public_dir.join(relative),
        state.config.root.join(relative),
    ];

    for candidate in &candidates {
        match tokio::fs::read(candidate).await {
            Ok(body) => {
                return Ok(ServedModule {
                    body,
                    content_type: determine_content_type(path),
                })
            }
            Err(err) if is_missing(&err) => continue,
            Err(err) => return Err(HmrError::Io(err)),
        }
    }

    Err(HmrError::NotFound(state.config.root.join(relative)))
}

fn is_missing(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::NotFound | std::io::ErrorKind::IsADirectory
    )
}

fn missing_block(owner: &ModuleId, block: &str) -> HmrError {
    HmrError::MissingBlock {
        id: owner.clone(),
        block: block.to_string(),
    }
}

/// JSON string literal, which is also a valid JS string literal.
fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// Insert the client runtime before `</body>`, or append it.
pub fn inject_client_script(html: &str) -> String {
    let script_tag = format!(r#"<script type="module" src="{CLIENT_ROUTE}"></script>"#);

    if let Some(pos) = html.rfind("</body>") {
        let mut result = String::with_capacity(html.len() + script_tag.len() + 4);
        result.push_str(&html[..pos]);
        result.push_str("  ");
        result.push_str(&script_tag);
        result.push('\n');
        result.push_str(&html[pos..]);
        return result;
    }

    let mut result = html.to_string();
    result.push('\n');
    result.push_str(&script_tag);
    result
}

pub fn determine_content_type(path: &str) -> &'static str {
    let extension = std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "wasm" => "application/wasm",
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

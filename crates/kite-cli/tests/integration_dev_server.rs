//! Integration tests for the development server.
//!
//! A real server is bound to an ephemeral port and driven with raw HTTP and
//! WebSocket requests, so transforms, graph maintenance and the HMR socket are
//! exercised the way a browser would.

use kite_cli::config::KiteConfig;
use kite_cli::dev::{DevConfig, DevServer, DevServerState, SharedState};
use kite_hmr::{FileChange, HmrPayload, ModuleId};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};

const APP_VUE: &str = r#"<template>
  <h1>Hello</h1>
</template>

<script>
import { greet } from './util.js'
export default { name: 'App', greet }
</script>

<style>
h1 { color: red; }
</style>

<style>
p { margin: 0; }
</style>
"#;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    write(
        root,
        "index.html",
        "<html><body><div id=\"app\"></div><script type=\"module\" src=\"/main.js\"></script></body></html>",
    );
    write(
        root,
        "main.js",
        "import { createApp } from 'vue'\nimport App from './App.vue'\nimport './style.css'\ncreateApp(App).mount('#app')\n",
    );
    write(root, "App.vue", APP_VUE);
    write(root, "util.js", "export const greet = () => 'hi'\n");
    write(root, "style.css", "body { margin: 0; }\n");
    write(root, "broken.js", "import { from 'nowhere'\n");
    write(root, "logo.png", "not really a png");
    write(root, "public/robots.txt", "User-agent: *\n");
    write(root, ".kite/deps/vue.js", "import '@vue/shared'\nexport const createApp = () => ({});\n");
    write(root, "data.json", "{\"a\": 1}\n");

    write(
        root,
        "src/my comp.vue",
        "<template><p>spaced</p></template>\n\
         <script>\nimport { label } from './中.js'\nexport default { label }\n</script>\n\
         <style>p { color: blue; }</style>\n",
    );
    write(root, "src/中.js", "export const label = 'a'\n");

    write(
        root,
        "Themed.vue",
        "<template><p>themed</p></template>\n<style src=\"./theme.css\"></style>\n",
    );
    write(root, "theme.css", "p { color: green; }\n");

    write(root, "node_modules/pkg/package.json", r#"{ "module": "dist/index.mjs" }"#);
    write(
        root,
        "node_modules/pkg/dist/index.mjs",
        "export { u } from './util.mjs'\n",
    );
    write(root, "node_modules/pkg/dist/util.mjs", "export const u = 1\n");

    temp
}

fn state_for(root: &Path) -> SharedState {
    let config = KiteConfig {
        root: root.to_path_buf(),
        ..KiteConfig::default_config()
    };
    Arc::new(DevServerState::new(DevConfig::resolve(&config).unwrap()))
}

async fn spawn_server(state: SharedState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = DevServer::new(state.config.clone(), state);
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });
    addr
}

struct HttpResponse {
    status: u16,
    head: String,
    body: String,
}

async fn get(addr: SocketAddr, path: &str) -> HttpResponse {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    timeout(Duration::from_secs(5), stream.read_to_end(&mut raw))
        .await
        .expect("response timed out")
        .unwrap();

    let text = String::from_utf8_lossy(&raw).to_string();
    let (head, body) = text.split_once("\r\n\r\n").unwrap();
    let status = head.split(' ').nth(1).unwrap().parse().unwrap();
    HttpResponse {
        status,
        head: head.to_ascii_lowercase(),
        body: body.to_string(),
    }
}

/// Read a single unmasked server text frame.
async fn read_text_frame(stream: &mut TcpStream) -> String {
    let mut header = [0u8; 2];
    timeout(Duration::from_secs(5), stream.read_exact(&mut header))
        .await
        .expect("frame timed out")
        .unwrap();
    assert_eq!(header[0], 0x81, "expected a final text frame");

    let len = match header[1] & 0x7f {
        126 => {
            let mut ext = [0u8; 2];
            stream.read_exact(&mut ext).await.unwrap();
            u16::from_be_bytes(ext) as usize
        }
        127 => {
            let mut ext = [0u8; 8];
            stream.read_exact(&mut ext).await.unwrap();
            u64::from_be_bytes(ext) as usize
        }
        len => len as usize,
    };

    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.unwrap();
    String::from_utf8(payload).unwrap()
}

async fn websocket_handshake(addr: SocketAddr, protocol: Option<&str>) -> (TcpStream, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let protocol_header = protocol
        .map(|p| format!("Sec-WebSocket-Protocol: {p}\r\n"))
        .unwrap_or_default();
    let request = format!(
        "GET /__kite_hmr HTTP/1.1\r\n\
         Host: {addr}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
         Sec-WebSocket-Version: 13\r\n\
         {protocol_header}\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    // Read the response head byte by byte so no frame bytes are consumed.
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        timeout(Duration::from_secs(5), stream.read_exact(&mut byte))
            .await
            .expect("handshake timed out")
            .unwrap();
        head.push(byte[0]);
    }
    (stream, String::from_utf8(head).unwrap().to_ascii_lowercase())
}

fn id(raw: &str) -> ModuleId {
    ModuleId::new(raw).unwrap()
}

/// The id the watcher reports for a file under the served root.
fn watched(state: &SharedState, rel: &str) -> ModuleId {
    let root = &state.config.root;
    ModuleId::from_fs_path(root, &root.join(rel)).unwrap()
}

fn header<'a>(response: &'a HttpResponse, name: &str) -> Option<&'a str> {
    response.head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == name).then(|| value.trim())
    })
}

#[tokio::test]
async fn test_index_gets_client_script() {
    let temp = project();
    let addr = spawn_server(state_for(temp.path())).await;

    let response = get(addr, "/").await;
    assert_eq!(response.status, 200);
    assert!(response.head.contains("content-type: text/html"));

    let script = response.body.find("/@kite/client.js").unwrap();
    assert!(script < response.body.find("</body>").unwrap());
}

#[tokio::test]
async fn test_client_script_knows_hmr_path() {
    let temp = project();
    let addr = spawn_server(state_for(temp.path())).await;

    let response = get(addr, "/@kite/client.js").await;
    assert_eq!(response.status, 200);
    assert!(response.body.contains(r#"const HMR_PATH = "/__kite_hmr";"#));
}

#[tokio::test]
async fn test_script_imports_rewritten_and_recorded() {
    let temp = project();
    let state = state_for(temp.path());
    let addr = spawn_server(state.clone()).await;

    let response = get(addr, "/main.js?t=42").await;
    assert_eq!(response.status, 200);
    assert!(response.body.contains("from '/@module/vue?import&t=42'"));
    assert!(response.body.contains("from './App.vue?import&t=42'"));
    assert!(response.body.contains("import './style.css?import&t=42'"));

    assert_eq!(state.graph.importers_of(&id("/App.vue")), vec![id("/main.js")]);
    assert_eq!(state.graph.importers_of(&id("/@module/vue")), vec![id("/main.js")]);
}

#[tokio::test]
async fn test_component_main_module() {
    let temp = project();
    let state = state_for(temp.path());
    let addr = spawn_server(state.clone()).await;

    let response = get(addr, "/App.vue?import").await;
    assert_eq!(response.status, 200);
    assert!(response.body.contains("const __script = { name: 'App', greet }"));
    assert!(response.body.contains("from './util.js?import'"));
    assert!(response.body.contains("from \"/App.vue?type=template&import\""));
    assert!(response.body.contains("import \"/App.vue?type=style&index=1&import\""));
    assert!(response.body.contains("export default __script;"));

    let importees = state.graph.importees_of(&id("/App.vue"));
    assert!(importees.contains(&id("/util.js")));
    assert!(importees.contains(&id("/App.vue?type=template")));
    assert!(importees.contains(&id("/App.vue?type=style&index=0")));
    assert!(importees.contains(&id("/App.vue?type=style&index=1")));
    assert!(state.descriptors.get(&id("/App.vue")).is_some());
}

#[tokio::test]
async fn test_component_sub_resources() {
    let temp = project();
    let state = state_for(temp.path());
    let addr = spawn_server(state.clone()).await;

    let template = get(addr, "/App.vue?type=template&import").await;
    assert_eq!(template.status, 200);
    assert!(template.body.contains("export function render()"));
    assert!(template.body.contains("from \"/@module/vue?import\""));
    assert_eq!(
        state.graph.importees_of(&id("/App.vue?type=template")),
        vec![id("/@module/vue")]
    );

    let style = get(addr, "/App.vue?type=style&index=1&import").await;
    assert_eq!(style.status, 200);
    let element_id = kite_hmr::style::style_element_id(&id("/App.vue"), 1);
    assert!(style.body.contains(&element_id));
    assert!(style.body.contains("p { margin: 0; }"));

    let missing = get(addr, "/App.vue?type=style&index=5").await;
    assert_eq!(missing.status, 404);
}

#[tokio::test]
async fn test_css_import_and_raw() {
    let temp = project();
    let addr = spawn_server(state_for(temp.path())).await;

    let module = get(addr, "/style.css?import").await;
    assert!(module.head.contains("content-type: application/javascript"));
    assert!(module.body.contains("document.createElement(\"style\")"));

    let raw = get(addr, "/style.css").await;
    assert!(raw.head.contains("content-type: text/css"));
    assert_eq!(raw.body, "body { margin: 0; }\n");
}

#[tokio::test]
async fn test_dependency_registry() {
    let temp = project();
    let state = state_for(temp.path());
    let addr = spawn_server(state.clone()).await;

    let response = get(addr, "/@module/vue?import").await;
    assert_eq!(response.status, 200);
    assert!(response.body.contains("import '/@module/@vue/shared?import'"));

    let missing = get(addr, "/@module/react?import").await;
    assert_eq!(missing.status, 404);
}

#[tokio::test]
async fn test_assets_and_static_files() {
    let temp = project();
    let addr = spawn_server(state_for(temp.path())).await;

    let asset = get(addr, "/logo.png?import").await;
    assert_eq!(asset.body, "export default \"/logo.png\";\n");

    let raw = get(addr, "/logo.png").await;
    assert!(raw.head.contains("content-type: image/png"));

    let public = get(addr, "/robots.txt").await;
    assert_eq!(public.status, 200);
    assert_eq!(public.body, "User-agent: *\n");
}

#[tokio::test]
async fn test_errors_map_to_status_codes() {
    let temp = project();
    let state = state_for(temp.path());
    let addr = spawn_server(state.clone()).await;

    let missing = get(addr, "/nope.js").await;
    assert_eq!(missing.status, 404);

    let broken = get(addr, "/broken.js").await;
    assert_eq!(broken.status, 500);
    assert!(broken.body.contains("Failed to parse /broken.js"));
    assert!(!state.graph.contains(&id("/broken.js")));
}

#[tokio::test]
async fn test_websocket_requires_protocol() {
    let temp = project();
    let addr = spawn_server(state_for(temp.path())).await;

    let (_stream, head) = websocket_handshake(addr, None).await;
    assert!(head.starts_with("http/1.1 400"));
}

#[tokio::test]
async fn test_websocket_connected_then_broadcast() {
    let temp = project();
    let state = state_for(temp.path());
    let addr = spawn_server(state.clone()).await;

    let (mut stream, head) = websocket_handshake(addr, Some("kite-hmr")).await;
    assert!(head.starts_with("http/1.1 101"));
    assert!(head.contains("sec-websocket-protocol: kite-hmr"));

    assert_eq!(read_text_frame(&mut stream).await, r#"{"type":"connected"}"#);
    assert_eq!(state.connections.len(), 1);

    let report = state
        .connections
        .broadcast(&HmrPayload::full_reload("/index.html"));
    assert_eq!(report.delivered, 1);
    assert_eq!(
        read_text_frame(&mut stream).await,
        r#"{"type":"full-reload","path":"/index.html"}"#
    );
}

#[tokio::test]
async fn test_style_edit_sends_style_update() {
    let temp = project();
    let state = state_for(temp.path());
    let addr = spawn_server(state.clone()).await;
    let (_client, mut rx) = state.connections.register();

    assert_eq!(get(addr, "/App.vue?import").await.status, 200);

    let edited = APP_VUE.replace("p { margin: 0; }", "p { margin: 4px; }");
    fs::write(temp.path().join("App.vue"), edited).unwrap();

    let report = state
        .apply_change(&FileChange::Modified(id("/App.vue")))
        .await
        .expect("an update is broadcast");
    assert_eq!(report.delivered, 1);

    let message = rx.recv().await.unwrap();
    let payload = HmrPayload::from_json(&message).unwrap();
    assert_eq!(payload.updates().len(), 1);
    assert_eq!(payload.updates()[0].kind(), "style-update");
    assert_eq!(payload.updates()[0].path(), "/App.vue?type=style&index=1");
}

#[tokio::test]
async fn test_dependency_edit_reloads_component() {
    let temp = project();
    let state = state_for(temp.path());
    let addr = spawn_server(state.clone()).await;
    let (_client, mut rx) = state.connections.register();

    assert_eq!(get(addr, "/main.js").await.status, 200);
    assert_eq!(get(addr, "/App.vue?import").await.status, 200);

    fs::write(temp.path().join("util.js"), "export const greet = () => 'hello'\n").unwrap();
    state
        .apply_change(&FileChange::Modified(id("/util.js")))
        .await
        .expect("an update is broadcast");

    let payload = HmrPayload::from_json(&rx.recv().await.unwrap()).unwrap();
    assert!(matches!(payload, HmrPayload::Multi(_)));
    assert_eq!(payload.updates().len(), 1);
    assert_eq!(payload.updates()[0].kind(), "vue-reload");
    assert_eq!(payload.updates()[0].path(), "/App.vue");
}

#[tokio::test]
async fn test_unimported_change_sends_nothing() {
    let temp = project();
    let state = state_for(temp.path());
    let (_client, mut rx) = state.connections.register();

    let report = state
        .apply_change(&FileChange::Modified(id("/util.js")))
        .await;
    assert!(report.is_none());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_teardown_clears_state() {
    let temp = project();
    let state = state_for(temp.path());
    let addr = spawn_server(state.clone()).await;

    assert_eq!(get(addr, "/App.vue").await.status, 200);
    assert!(!state.graph.is_empty());

    state.teardown();
    assert!(state.graph.is_empty());
    assert!(state.descriptors.is_empty());
}

#[tokio::test]
async fn test_encoded_request_and_watcher_agree_on_component() {
    let temp = project();
    let state = state_for(temp.path());
    let addr = spawn_server(state.clone()).await;
    let (_client, mut rx) = state.connections.register();

    let response = get(addr, "/src/my%20comp.vue?import").await;
    assert_eq!(response.status, 200);
    assert!(response.body.contains("from './中.js?import'"));
    assert!(response.body.contains("\"/src/my comp.vue?type=style&index=0&import\""));

    let component = watched(&state, "src/my comp.vue");
    assert_eq!(component, id("/src/my%20comp.vue"));
    assert!(state.descriptors.get(&component).is_some());

    let edited = fs::read_to_string(temp.path().join("src/my comp.vue"))
        .unwrap()
        .replace("color: blue", "color: red");
    fs::write(temp.path().join("src/my comp.vue"), edited).unwrap();

    state
        .apply_change(&FileChange::Modified(component))
        .await
        .expect("an update is broadcast");

    let payload = HmrPayload::from_json(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(payload.updates().len(), 1);
    assert_eq!(payload.updates()[0].kind(), "style-update");
    assert_eq!(payload.updates()[0].path(), "/src/my comp.vue?type=style&index=0");
}

#[tokio::test]
async fn test_encoded_non_ascii_module_reaches_its_component() {
    let temp = project();
    let state = state_for(temp.path());
    let addr = spawn_server(state.clone()).await;
    let (_client, mut rx) = state.connections.register();

    assert_eq!(get(addr, "/src/my%20comp.vue?import").await.status, 200);

    let leaf = get(addr, "/src/%E4%B8%AD.js?import").await;
    assert_eq!(leaf.status, 200);
    assert!(leaf.body.contains("export const label"));

    let changed = watched(&state, "src/中.js");
    assert_eq!(
        state.graph.importers_of(&changed),
        vec![id("/src/my%20comp.vue")]
    );

    fs::write(temp.path().join("src/中.js"), "export const label = 'b'\n").unwrap();
    state
        .apply_change(&FileChange::Modified(changed))
        .await
        .expect("an update is broadcast");

    let payload = HmrPayload::from_json(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(payload.updates().len(), 1);
    assert_eq!(payload.updates()[0].kind(), "vue-reload");
    assert_eq!(payload.updates()[0].path(), "/src/my comp.vue");
}

#[tokio::test]
async fn test_package_entry_redirect_keeps_relative_imports_working() {
    let temp = project();
    let state = state_for(temp.path());
    let addr = spawn_server(state.clone()).await;

    let redirect = get(addr, "/@module/pkg?import&t=3").await;
    assert_eq!(redirect.status, 307);
    let location = header(&redirect, "location").unwrap().to_string();
    assert_eq!(location, "/@module/pkg/dist/index.mjs?import&t=3");

    let entry = get(addr, &location).await;
    assert_eq!(entry.status, 200);
    assert!(entry.body.contains("from './util.mjs?import&t=3'"));
    assert_eq!(
        state.graph.importees_of(&id("/@module/pkg/dist/index.mjs")),
        vec![id("/@module/pkg/dist/util.mjs")]
    );

    // Where the browser resolves the entry's relative import.
    let sibling = get(addr, "/@module/pkg/dist/util.mjs?import&t=3").await;
    assert_eq!(sibling.status, 200);
    assert!(sibling.body.contains("export const u = 1"));
}

#[tokio::test]
async fn test_only_asset_imports_become_urls() {
    let temp = project();
    let addr = spawn_server(state_for(temp.path())).await;

    let json = get(addr, "/data.json?import").await;
    assert_eq!(json.status, 200);
    assert!(json.head.contains("content-type: application/json"));
    assert_eq!(json.body, "{\"a\": 1}\n");
}

#[tokio::test]
async fn test_style_index_must_be_numeric() {
    let temp = project();
    let addr = spawn_server(state_for(temp.path())).await;

    assert_eq!(get(addr, "/App.vue?type=style&index=abc&import").await.status, 404);
    assert_eq!(get(addr, "/App.vue?type=style&index=0&import").await.status, 200);
}

#[tokio::test]
async fn test_external_style_src_is_loaded_and_tracked() {
    let temp = project();
    let state = state_for(temp.path());
    let addr = spawn_server(state.clone()).await;
    let (_client, mut rx) = state.connections.register();

    assert_eq!(get(addr, "/Themed.vue?import").await.status, 200);
    let style = get(addr, "/Themed.vue?type=style&index=0&import").await;
    assert_eq!(style.status, 200);
    assert!(style.body.contains("p { color: green; }"));
    assert_eq!(
        state.graph.importers_of(&id("/theme.css")),
        vec![id("/Themed.vue?type=style&index=0")]
    );

    fs::write(temp.path().join("theme.css"), "p { color: purple; }\n").unwrap();
    state
        .apply_change(&FileChange::Modified(watched(&state, "theme.css")))
        .await
        .expect("an update is broadcast");

    let payload = HmrPayload::from_json(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(payload.updates()[0].kind(), "vue-reload");
    assert_eq!(payload.updates()[0].path(), "/Themed.vue");
}

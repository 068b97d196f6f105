//! Federation behavior against in-memory tool servers.
//!
//! A fake broker stands in for the network so every test can count session
//! opens/closes and control exactly what each server returns.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use toolfed_mcp::{
    BoxFuture, CompositeToolName, DiscoveryMode, Federation, FederationError, FederationSettings,
    McpError, McpToolContent, McpToolInfo, McpToolResult, SessionBroker, ToolServerEntry,
    ToolServerRegistry, ToolSession,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct FakeServer {
    reachable: bool,
    tools: Vec<McpToolInfo>,
    /// tool name -> result; missing tools answer with a JSON-RPC error
    results: HashMap<String, McpToolResult>,
    list_delay: Duration,
}

impl FakeServer {
    fn up() -> Self {
        Self {
            reachable: true,
            ..Self::default()
        }
    }

    fn down() -> Self {
        Self::default()
    }

    fn tool(mut self, name: &str, description: &str) -> Self {
        self.tools.push(McpToolInfo {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        });
        self
    }

    fn answers(mut self, tool: &str, content: Vec<McpToolContent>, is_error: bool) -> Self {
        self.results
            .insert(tool.to_string(), McpToolResult { content, is_error });
        self
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.list_delay = delay;
        self
    }
}

struct FakeSession {
    server_id: String,
    server: FakeServer,
    calls: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
    closes: Arc<AtomicUsize>,
}

impl ToolSession for FakeSession {
    fn server_id(&self) -> &str {
        &self.server_id
    }

    fn list_tools(&self) -> BoxFuture<'_, Result<Vec<McpToolInfo>, McpError>> {
        Box::pin(async move {
            tokio::time::sleep(self.server.list_delay).await;
            Ok(self.server.tools.clone())
        })
    }

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: serde_json::Value,
    ) -> BoxFuture<'a, Result<McpToolResult, McpError>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), arguments));
            self.server
                .results
                .get(name)
                .cloned()
                .ok_or_else(|| McpError::JsonRpc {
                    server: self.server_id.clone(),
                    code: -32602,
                    message: format!("Unknown tool: {name}"),
                })
        })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, ()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Box::pin(async {})
    }
}

/// Keyed by endpoint URL, the way a real broker reaches servers.
#[derive(Default)]
struct FakeBroker {
    servers: HashMap<String, FakeServer>,
    opens: AtomicUsize,
    closes: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
}

impl FakeBroker {
    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl SessionBroker for FakeBroker {
    fn open<'a>(
        &'a self,
        server_id: &'a str,
        entry: &'a ToolServerEntry,
    ) -> BoxFuture<'a, Result<Box<dyn ToolSession>, McpError>> {
        Box::pin(async move {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let url = entry.endpoint.to_string();
            match self.servers.get(&url) {
                Some(server) if server.reachable => Ok(Box::new(FakeSession {
                    server_id: server_id.to_string(),
                    server: server.clone(),
                    calls: Arc::clone(&self.calls),
                    closes: Arc::clone(&self.closes),
                }) as Box<dyn ToolSession>),
                _ => Err(McpError::ConnectFailed {
                    url,
                    reason: "connection refused".to_string(),
                }),
            }
        })
    }
}

/// Registers `servers` as `<id>` -> `http://<id>/sse` and builds a federation.
fn federation(
    servers: Vec<(&str, FakeServer)>,
    discovery: DiscoveryMode,
) -> (Federation, Arc<FakeBroker>) {
    let mut registry = ToolServerRegistry::new();
    let mut broker = FakeBroker::default();
    for (id, server) in servers {
        let url = format!("http://{id}/sse");
        registry.register(id, ToolServerEntry::sse(&url)).unwrap();
        broker.servers.insert(url, server);
    }
    let broker = Arc::new(broker);
    let settings = FederationSettings {
        session_timeout_ms: 2000,
        discovery,
    };
    let fed = Federation::new(registry, broker.clone(), settings);
    (fed, broker)
}

fn text(s: &str) -> McpToolContent {
    McpToolContent::Text {
        text: s.to_string(),
    }
}

fn names(catalog: &[toolfed_mcp::FunctionTool]) -> Vec<&str> {
    catalog.iter().map(|t| t.name()).collect()
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_server_single_tool() {
    let (fed, broker) = federation(
        vec![(
            "svc-a",
            FakeServer::up()
                .tool("ping", "")
                .answers("ping", vec![text("pong")], false),
        )],
        DiscoveryMode::Sequential,
    );

    let catalog = fed.catalog.build_catalog(&["svc-a"]).await;
    assert_eq!(names(&catalog), vec!["svc-a__ping"]);
    assert_eq!(catalog[0].function.description, "");
    assert_eq!(
        serde_json::to_value(&catalog[0]).unwrap()["type"],
        "function"
    );

    let out = fed
        .router
        .invoke("svc-a__ping", serde_json::Map::new())
        .await
        .unwrap();
    assert_eq!(out, "pong");
    assert_eq!(broker.opens(), 2);
    assert_eq!(broker.closes(), 2);
}

#[tokio::test]
async fn unreachable_server_is_omitted() {
    let (fed, _broker) = federation(
        vec![
            ("svc-a", FakeServer::up().tool("ping", "Ping")),
            ("svc-b", FakeServer::down()),
        ],
        DiscoveryMode::Concurrent,
    );
    let catalog = fed.catalog.build_catalog(&["svc-a", "svc-b"]).await;
    assert_eq!(names(&catalog), vec!["svc-a__ping"]);
}

#[tokio::test]
async fn all_servers_failing_gives_empty_catalog() {
    let (fed, _broker) = federation(
        vec![("svc-a", FakeServer::down()), ("svc-b", FakeServer::down())],
        DiscoveryMode::Concurrent,
    );
    let catalog = fed
        .catalog
        .build_catalog(&["svc-a", "svc-b", "not-registered"])
        .await;
    assert!(catalog.is_empty());
}

#[tokio::test]
async fn composite_names_round_trip_to_origin_server() {
    let (fed, _broker) = federation(
        vec![
            ("alpha", FakeServer::up().tool("search", "").tool("get", "")),
            ("beta", FakeServer::up().tool("search", "").tool("x__y", "")),
        ],
        DiscoveryMode::Concurrent,
    );
    let catalog = fed.catalog.build_catalog(&["alpha", "beta"]).await;
    assert_eq!(
        names(&catalog),
        vec!["alpha__search", "alpha__get", "beta__search", "beta__x__y"]
    );

    for tool in &catalog {
        let parsed = CompositeToolName::parse(tool.name()).unwrap();
        let entry = fed.catalog.registry().resolve(parsed.server_id()).unwrap();
        assert_eq!(
            entry.endpoint.to_string(),
            format!("http://{}/sse", parsed.server_id())
        );
        assert!(tool.name().starts_with(parsed.server_id()));
    }
}

#[tokio::test]
async fn leading_underscore_tool_routes_to_its_server() {
    let (fed, broker) = federation(
        vec![(
            "svc",
            FakeServer::up()
                .tool("_ping", "")
                .answers("_ping", vec![text("pong")], false),
        )],
        DiscoveryMode::Sequential,
    );
    let catalog = fed.catalog.build_full_catalog().await;
    assert_eq!(names(&catalog), vec!["svc___ping"]);

    let parsed = CompositeToolName::parse(catalog[0].name()).unwrap();
    assert_eq!(parsed.server_id(), "svc");
    assert_eq!(parsed.tool_name(), "_ping");

    let out = fed
        .router
        .invoke("svc___ping", serde_json::Map::new())
        .await
        .unwrap();
    assert_eq!(out, "pong");
    assert_eq!(broker.calls.lock().unwrap()[0].0, "_ping");
}

#[tokio::test]
async fn catalog_order_follows_request_not_completion() {
    // The first server answers last; the catalog must still list it first.
    let (fed, _broker) = federation(
        vec![
            (
                "slow",
                FakeServer::up()
                    .tool("one", "")
                    .slow(Duration::from_millis(150)),
            ),
            ("fast", FakeServer::up().tool("two", "")),
        ],
        DiscoveryMode::Concurrent,
    );
    let catalog = fed.catalog.build_catalog(&["slow", "fast"]).await;
    assert_eq!(names(&catalog), vec!["slow__one", "fast__two"]);

    let reversed = fed.catalog.build_catalog(&["fast", "slow"]).await;
    assert_eq!(names(&reversed), vec!["fast__two", "slow__one"]);
}

#[tokio::test]
async fn repeated_builds_are_identical() {
    let (fed, _broker) = federation(
        vec![
            ("svc-a", FakeServer::up().tool("ping", "p").tool("echo", "e")),
            ("svc-b", FakeServer::up().tool("status", "s")),
        ],
        DiscoveryMode::Sequential,
    );
    let first = fed.catalog.build_catalog(&["svc-a", "svc-b"]).await;
    let second = fed.catalog.build_catalog(&["svc-a", "svc-b"]).await;
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[tokio::test]
async fn duplicate_server_ids_are_each_queried() {
    let (fed, broker) = federation(
        vec![("svc-a", FakeServer::up().tool("ping", ""))],
        DiscoveryMode::Sequential,
    );
    let catalog = fed.catalog.build_catalog(&["svc-a", "svc-a"]).await;
    assert_eq!(names(&catalog), vec!["svc-a__ping", "svc-a__ping"]);
    assert_eq!(broker.opens(), 2);
}

#[tokio::test]
async fn full_catalog_covers_every_registered_server() {
    let (fed, _broker) = federation(
        vec![
            ("zeta", FakeServer::up().tool("z", "")),
            ("alpha", FakeServer::up().tool("a", "")),
        ],
        DiscoveryMode::Concurrent,
    );
    let catalog = fed.catalog.build_full_catalog().await;
    assert_eq!(names(&catalog), vec!["alpha__a", "zeta__z"]);
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_name_never_opens_a_session() {
    let (fed, broker) = federation(
        vec![("svc-a", FakeServer::up().tool("ping", ""))],
        DiscoveryMode::Sequential,
    );
    let err = fed
        .router
        .invoke("not-a-valid-name", serde_json::Map::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FederationError::InvalidToolName { .. }));
    assert_eq!(broker.opens(), 0);
}

#[tokio::test]
async fn unknown_server_never_opens_a_session() {
    let (fed, broker) = federation(vec![], DiscoveryMode::Sequential);
    let err = fed
        .router
        .invoke("ghost__ping", serde_json::Map::new())
        .await
        .unwrap_err();
    match err {
        FederationError::UnknownServer { server } => assert_eq!(server, "ghost"),
        other => panic!("Expected UnknownServer, got {other:?}"),
    }
    assert_eq!(broker.opens(), 0);
}

#[tokio::test]
async fn unreachable_server_yields_diagnosable_error() {
    let (fed, _broker) = federation(vec![("svc-b", FakeServer::down())], DiscoveryMode::Sequential);

    let err = fed
        .router
        .invoke("svc-b__ping", serde_json::Map::new())
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(err.to_string().contains("svc-b"));

    let out = fed.router.invoke_for_llm("svc-b__ping", "{}").await;
    assert!(out.is_error);
    assert!(out.text.starts_with("Error executing tool 'svc-b__ping'"));
    assert!(out.text.contains("unavailable"));
}

#[tokio::test]
async fn image_content_is_dropped() {
    let (fed, _broker) = federation(
        vec![(
            "svc-a",
            FakeServer::up().answers(
                "snapshot",
                vec![
                    text("part1"),
                    McpToolContent::Image {
                        data: "iVBORw0KGgo=".into(),
                        mime_type: "image/png".into(),
                    },
                ],
                false,
            ),
        )],
        DiscoveryMode::Sequential,
    );
    let out = fed
        .router
        .invoke("svc-a__snapshot", serde_json::Map::new())
        .await
        .unwrap();
    assert_eq!(out, "part1");
}

#[tokio::test]
async fn multiple_text_items_are_newline_joined() {
    let (fed, _broker) = federation(
        vec![(
            "svc-a",
            FakeServer::up().answers("report", vec![text("line 1"), text("line 2")], false),
        )],
        DiscoveryMode::Sequential,
    );
    let out = fed
        .router
        .invoke("svc-a__report", serde_json::Map::new())
        .await
        .unwrap();
    assert_eq!(out, "line 1\nline 2");
}

#[tokio::test]
async fn arguments_reach_the_unprefixed_tool_name() {
    let (fed, broker) = federation(
        vec![(
            "mcp-weather",
            FakeServer::up().answers("get_weather_by_location", vec![text("sunny")], false),
        )],
        DiscoveryMode::Sequential,
    );
    let out = fed
        .router
        .invoke_json(
            "mcp-weather__get_weather_by_location",
            r#"{"location_name": "Seoul"}"#,
        )
        .await
        .unwrap();
    assert_eq!(out, "sunny");

    let calls = broker.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "get_weather_by_location");
    assert_eq!(calls[0].1, serde_json::json!({"location_name": "Seoul"}));
}

#[tokio::test]
async fn remote_rejection_is_remote_tool_error() {
    let (fed, broker) = federation(
        vec![("svc-a", FakeServer::up().tool("ping", ""))],
        DiscoveryMode::Sequential,
    );
    let err = fed
        .router
        .invoke("svc-a__missing", serde_json::Map::new())
        .await
        .unwrap_err();
    match err {
        FederationError::RemoteToolError {
            server,
            tool,
            message,
        } => {
            assert_eq!(server, "svc-a");
            assert_eq!(tool, "missing");
            assert_eq!(message, "Unknown tool: missing");
        }
        other => panic!("Expected RemoteToolError, got {other:?}"),
    }
    assert_eq!(broker.closes(), 1);
}

#[tokio::test]
async fn error_flagged_result_is_remote_tool_error() {
    let (fed, _broker) = federation(
        vec![(
            "svc-a",
            FakeServer::up().answers("divide", vec![text("division by zero")], true),
        )],
        DiscoveryMode::Sequential,
    );
    let out = fed.router.invoke_for_llm("svc-a__divide", "").await;
    assert!(out.is_error);
    assert!(out.text.contains("division by zero"));
    assert!(!fed
        .router
        .invoke("svc-a__divide", serde_json::Map::new())
        .await
        .unwrap_err()
        .is_retryable());
}

#[tokio::test]
async fn bad_argument_json_never_opens_a_session() {
    let (fed, broker) = federation(
        vec![("svc-a", FakeServer::up().tool("ping", ""))],
        DiscoveryMode::Sequential,
    );
    let out = fed.router.invoke_for_llm("svc-a__ping", "[1, 2, 3]").await;
    assert!(out.is_error);
    assert!(out.text.contains("Invalid arguments"));
    assert_eq!(broker.opens(), 0);
}

#[tokio::test]
async fn malformed_name_wins_over_bad_arguments() {
    let (fed, broker) = federation(
        vec![("svc-a", FakeServer::up().tool("ping", ""))],
        DiscoveryMode::Sequential,
    );
    match fed.router.invoke_json("not-a-valid-name", "[1]").await {
        Err(FederationError::InvalidToolName { name }) => assert_eq!(name, "not-a-valid-name"),
        other => panic!("Expected InvalidToolName, got {other:?}"),
    }

    let out = fed.router.invoke_for_llm("not-a-valid-name", "[1]").await;
    assert!(out.is_error);
    assert!(out.text.contains("Invalid tool name format"), "{}", out.text);
    assert_eq!(broker.opens(), 0);
}

#[tokio::test]
async fn concurrent_invocations_are_independent() {
    let (fed, broker) = federation(
        vec![
            (
                "svc-a",
                FakeServer::up().answers("ping", vec![text("a")], false),
            ),
            (
                "svc-b",
                FakeServer::up().answers("ping", vec![text("b")], false),
            ),
        ],
        DiscoveryMode::Concurrent,
    );
    let router_a = fed.router.clone();
    let router_b = fed.router.clone();
    let (a, b, bad) = tokio::join!(
        router_a.invoke("svc-a__ping", serde_json::Map::new()),
        router_b.invoke("svc-b__ping", serde_json::Map::new()),
        fed.router.invoke("svc-c__ping", serde_json::Map::new()),
    );
    assert_eq!(a.unwrap(), "a");
    assert_eq!(b.unwrap(), "b");
    assert!(matches!(bad, Err(FederationError::UnknownServer { .. })));
    assert_eq!(broker.opens(), 2);
    assert_eq!(broker.closes(), 2);
}

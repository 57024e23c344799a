//! Gleam documentation MCP implementation.
//!
//! This module routes JSON-RPC requests to the MCP methods and tools this
//! server exposes. Tools fetch package metadata from hex.pm and package
//! interfaces from hexdocs.pm, reading through a cache of the raw JSON.
//!
//! # Main Components
//!
//! - [`DocsService`]: Request dispatcher and tool implementations
//! - [`Spawner`]: Capability used to run cache writes in the background
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use gleam_docs_mcp::cache::InMemoryCache;
//! use gleam_docs_mcp::hex_client::HexClient;
//! use gleam_docs_mcp::mcp::{DocsService, TokioSpawner};
//!
//! async fn example() {
//!     let cache = Arc::new(InMemoryCache::new("cache_dir".into()));
//!     let service = DocsService::new(Arc::new(HexClient::new()), cache, Arc::new(TokioSpawner));
//!     let reply = service
//!         .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
//!         .await;
//! }
//! ```

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

use crate::cache::{
    Cache, INTERFACE_TTL, PACKAGE_TTL, interface_key, package_key, search_key, unix_now,
};
use crate::format;
use crate::hex_client::{FetchError, PackageSource};
use crate::interface::{self, DecodeError, PackageInterface};
use crate::packages::{self, PackageSummary};
use crate::protocol::{
    ContentBlock, McpError, McpRequest, McpResponse, PROTOCOL_VERSION, Reply, ResourceDefinition,
    ToolCall, ToolDefinition,
};
use crate::search::{search_functions, search_types};

pub const PACKAGES_RESOURCE: &str = "gleam://packages";

/// hex.pm search selecting packages built on the Gleam standard library.
const GLEAM_PACKAGES_QUERY: &str = "depends:hexpm:gleam_stdlib";

pub type BackgroundTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Runs futures the caller does not wait for.
pub trait Spawner: Send + Sync {
    fn spawn(&self, task: BackgroundTask);
}

/// Spawns onto the current tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

impl Spawner for TokioSpawner {
    fn spawn(&self, task: BackgroundTask) {
        tokio::spawn(task);
    }
}

/// Failure while executing a tool, reported as an internal error.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] DecodeError),

    #[error("Module `{module}` not found in package `{package}`")]
    ModuleNotFound { package: String, module: String },

    #[error("Failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ToolError {
    /// Short machine readable name of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::Fetch(FetchError::Http(_)) => "http_error",
            ToolError::Fetch(FetchError::Parse { .. }) => "parse_error",
            ToolError::Fetch(FetchError::NotFound(_)) => "not_found",
            ToolError::Decode(_) => "decode_error",
            ToolError::ModuleNotFound { .. } => "not_found",
            ToolError::Serialize(_) => "internal",
        }
    }
}

/// The text and structured halves of a tool result.
struct ToolOutput {
    text: String,
    data: Value,
}

impl ToolOutput {
    fn new(data: &impl Serialize, text: String) -> Result<Self, ToolError> {
        Ok(Self {
            text,
            data: serde_json::to_value(data)?,
        })
    }

    fn into_result(self) -> Value {
        json!({
            "content": [ContentBlock::Text { text: self.text }],
            "data": self.data,
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchPackagesArgs {
    #[schemars(description = "Search terms matched against package names and descriptions")]
    pub query: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PackageArgs {
    #[schemars(description = "Name of the package on hex.pm, e.g. gleam_stdlib")]
    pub package_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ModuleArgs {
    #[schemars(description = "Name of the package on hex.pm, e.g. gleam_stdlib")]
    pub package_name: String,
    #[schemars(description = "Full module path, e.g. gleam/list")]
    pub module_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PackageSearchArgs {
    #[schemars(description = "Name of the package on hex.pm, e.g. gleam_stdlib")]
    pub package_name: String,
    #[schemars(description = "Case-insensitive text matched against names, docs and signatures")]
    pub query: String,
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModuleSummary<'a> {
    name: &'a str,
    documentation: &'a str,
    function_count: usize,
    type_count: usize,
    constant_count: usize,
    type_alias_count: usize,
}

/// Answers MCP requests about Gleam packages.
#[derive(Clone)]
pub struct DocsService {
    source: Arc<dyn PackageSource>,
    cache: Arc<dyn Cache>,
    spawner: Arc<dyn Spawner>,
}

impl DocsService {
    pub fn new(
        source: Arc<dyn PackageSource>,
        cache: Arc<dyn Cache>,
        spawner: Arc<dyn Spawner>,
    ) -> Self {
        Self {
            source,
            cache,
            spawner,
        }
    }

    /// Handles one raw inbound message.
    pub async fn handle_message(&self, body: &str) -> Reply {
        let message: Value = match serde_json::from_str(body) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!("Rejecting message that is not JSON: {}", err);
                return Reply::InvalidJson;
            }
        };

        let request = match McpRequest::from_value(&message) {
            Ok(request) => request,
            Err(response) => return Reply::Response(response),
        };

        if request.method == "notifications/initialized" {
            tracing::info!("Client initialized");
            return Reply::NoContent;
        }

        Reply::Response(self.handle_request(request).await)
    }

    /// Handles a validated request.
    pub async fn handle_request(&self, request: McpRequest) -> McpResponse {
        tracing::info!(method = %request.method, id = %request.id, "Handling request");

        let result = match request.method.as_str() {
            "initialize" => Ok(self.initialize()),
            "tools/list" => Ok(json!({ "tools": tool_definitions() })),
            "tools/call" => self.handle_tools_call(request.params).await,
            "resources/list" => Ok(json!({ "resources": resource_definitions() })),
            "resources/read" => self.handle_resources_read(request.params).await,
            method => Err(McpError::method_not_found(method)),
        };

        match result {
            Ok(result) => McpResponse::success(request.id, result),
            Err(error) => McpResponse::error(request.id, error),
        }
    }

    fn initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": { "subscribe": false, "listChanged": false },
            },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "instructions": "This server provides documentation for Gleam packages published on hex.pm. \
                Use 'search_packages' to find packages, 'get_modules' and 'get_module_info' to browse \
                a package's API, and 'search_functions' or 'search_types' to look for specific members. \
                Results are cached for better performance.",
        })
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value, McpError> {
        let call: ToolCall = params
            .and_then(|params| serde_json::from_value(params).ok())
            .filter(|call: &ToolCall| call.arguments.is_object())
            .ok_or_else(|| McpError::invalid_params("Invalid params for tools/call"))?;

        let name = call.name.as_str();
        let output = match name {
            "search_packages" => self.search_packages(arguments(name, call.arguments)?).await,
            "get_package_info" => self.get_package_info(arguments(name, call.arguments)?).await,
            "get_modules" => self.get_modules(arguments(name, call.arguments)?).await,
            "get_module_info" => self.get_module_info(arguments(name, call.arguments)?).await,
            "search_functions" => self.search_functions(arguments(name, call.arguments)?).await,
            "search_types" => self.search_types(arguments(name, call.arguments)?).await,
            "get_package_releases" => {
                self.get_package_releases(arguments(name, call.arguments)?).await
            }
            _ => return Err(McpError::invalid_params(format!("Unknown tool: {name}"))),
        };

        match output {
            Ok(output) => Ok(output.into_result()),
            Err(err) => {
                tracing::warn!("Tool {} failed: {}", name, err);
                Err(McpError::internal_error(format!("{name} failed: {err}"))
                    .with_data(json!({ "kind": err.kind() })))
            }
        }
    }

    async fn handle_resources_read(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: ReadResourceParams = params
            .and_then(|params| serde_json::from_value(params).ok())
            .ok_or_else(|| McpError::invalid_params("Invalid params for resources/read"))?;

        if params.uri != PACKAGES_RESOURCE {
            return Err(McpError::invalid_params(format!("Unknown resource: {}", params.uri)));
        }

        let packages = self.search(GLEAM_PACKAGES_QUERY).await.map_err(|err| {
            McpError::internal_error(format!("Failed to read {PACKAGES_RESOURCE}: {err}"))
        })?;
        let text = serde_json::to_string_pretty(&packages)
            .map_err(|err| McpError::internal_error(err.to_string()))?;

        Ok(json!({
            "contents": [{
                "uri": PACKAGES_RESOURCE,
                "mimeType": "application/json",
                "text": text,
            }],
        }))
    }

    async fn search_packages(&self, args: SearchPackagesArgs) -> Result<ToolOutput, ToolError> {
        let packages = self.search(&args.query).await?;
        ToolOutput::new(
            &json!({ "query": args.query, "packages": packages }),
            format::search_results(&args.query, &packages),
        )
    }

    async fn get_package_info(&self, args: PackageArgs) -> Result<ToolOutput, ToolError> {
        let info = self
            .read_through(
                package_key(&args.package_name),
                PACKAGE_TTL,
                self.source.fetch_package(&args.package_name),
                packages::decode_package_info,
            )
            .await?;
        ToolOutput::new(&info, format::package_info(&info))
    }

    async fn get_modules(&self, args: PackageArgs) -> Result<ToolOutput, ToolError> {
        let interface = self.interface(&args.package_name).await?;
        let modules: Vec<ModuleSummary> = interface
            .modules
            .iter()
            .map(|module| ModuleSummary {
                name: &module.name,
                documentation: &module.documentation,
                function_count: module.functions.len(),
                type_count: module.types.len(),
                constant_count: module.constants.len(),
                type_alias_count: module.type_aliases.len(),
            })
            .collect();
        ToolOutput::new(
            &json!({
                "package": interface.name,
                "version": interface.version,
                "gleamVersionConstraint": interface.gleam_version_constraint,
                "modules": modules,
            }),
            format::modules(&interface),
        )
    }

    async fn get_module_info(&self, args: ModuleArgs) -> Result<ToolOutput, ToolError> {
        let interface = self.interface(&args.package_name).await?;
        let module = interface
            .module(&args.module_name)
            .ok_or_else(|| ToolError::ModuleNotFound {
                package: args.package_name.clone(),
                module: args.module_name.clone(),
            })?;
        ToolOutput::new(module, format::module_info(&interface, module))
    }

    async fn search_functions(&self, args: PackageSearchArgs) -> Result<ToolOutput, ToolError> {
        let interface = self.interface(&args.package_name).await?;
        let hits = search_functions(&interface, &args.query);
        ToolOutput::new(
            &json!({ "package": interface.name, "query": args.query, "functions": hits }),
            format::function_hits(&interface.name, &args.query, &hits),
        )
    }

    async fn search_types(&self, args: PackageSearchArgs) -> Result<ToolOutput, ToolError> {
        let interface = self.interface(&args.package_name).await?;
        let hits = search_types(&interface, &args.query);
        ToolOutput::new(
            &json!({ "package": interface.name, "query": args.query, "types": hits }),
            format::type_hits(&interface.name, &args.query, &hits),
        )
    }

    async fn get_package_releases(&self, args: PackageArgs) -> Result<ToolOutput, ToolError> {
        let releases = self
            .read_through(
                package_key(&args.package_name),
                PACKAGE_TTL,
                self.source.fetch_package(&args.package_name),
                packages::decode_releases,
            )
            .await?;
        ToolOutput::new(&releases, format::releases(&releases))
    }

    async fn search(&self, query: &str) -> Result<Vec<PackageSummary>, ToolError> {
        self.read_through(
            search_key(query),
            PACKAGE_TTL,
            self.source.search_packages(query),
            packages::decode_search_results,
        )
        .await
    }

    async fn interface(&self, package_name: &str) -> Result<PackageInterface, ToolError> {
        self.read_through(
            interface_key(package_name),
            INTERFACE_TTL,
            self.source.fetch_package_interface(package_name),
            interface::decode,
        )
        .await
    }

    /// Decodes the cached text under `key`, or fetches, decodes and then
    /// caches it in the background. Text that fails to decode is not cached.
    async fn read_through<T>(
        &self,
        key: String,
        ttl: u64,
        fetch: impl Future<Output = Result<String, FetchError>>,
        decode: impl FnOnce(&str) -> Result<T, DecodeError>,
    ) -> Result<T, ToolError> {
        let now = unix_now();

        if let Some(text) = self.cache.get(&key, now).await {
            tracing::debug!("Cache hit for {}", key);
            return Ok(decode(&text)?);
        }

        tracing::debug!("Cache miss for {}. Fetching...", key);
        let text = fetch.await?;
        let value = decode(&text)?;

        let cache = Arc::clone(&self.cache);
        self.spawner.spawn(Box::pin(async move {
            if let Err(err) = cache.set(&key, text, now, ttl).await {
                tracing::warn!("Failed to cache {}: {}", key, err);
            }
        }));

        Ok(value)
    }
}

fn arguments<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, McpError> {
    serde_json::from_value(arguments).map_err(|err| {
        McpError::invalid_params(format!("Invalid arguments for {tool}"))
            .with_data(json!({ "reason": err.to_string() }))
    })
}

fn tool<T: JsonSchema>(name: &str, description: &str) -> ToolDefinition {
    let schema = schemars::schema_for!(T);
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: serde_json::to_value(schema).unwrap_or_else(|_| json!({ "type": "object" })),
    }
}

/// The fixed tool table.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        tool::<SearchPackagesArgs>("search_packages", "Search hex.pm for Gleam packages"),
        tool::<PackageArgs>(
            "get_package_info",
            "Get a package's description, licenses, links and download count",
        ),
        tool::<PackageArgs>("get_modules", "List the public modules of a package"),
        tool::<ModuleArgs>(
            "get_module_info",
            "Get the documented types, type aliases, constants and functions of a module",
        ),
        tool::<PackageSearchArgs>("search_functions", "Search the functions of a package"),
        tool::<PackageSearchArgs>("search_types", "Search the custom types of a package"),
        tool::<PackageArgs>(
            "get_package_releases",
            "List the releases of a package, including retired versions",
        ),
    ]
}

pub fn resource_definitions() -> Vec<ResourceDefinition> {
    vec![ResourceDefinition {
        uri: PACKAGES_RESOURCE.to_string(),
        name: "Gleam packages".to_string(),
        description: Some("The most downloaded Gleam packages on hex.pm".to_string()),
        mime_type: Some("application/json".to_string()),
    }]
}

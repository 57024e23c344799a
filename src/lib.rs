//! Gleam Package Documentation MCP Service
//!
//! This crate provides a Model Context Protocol (MCP) service that answers
//! questions about Gleam packages published on hex.pm. Package metadata
//! comes from the hex.pm API and each package's public API from the
//! `package-interface.json` document published on hexdocs.pm.
//!
//! # Features
//!
//! - Search packages and inspect their metadata and releases
//! - Browse modules, types, constants and functions with rendered signatures
//! - Search functions and types within a package
//! - Cache remote documents for faster subsequent access
//! - JSON-RPC over HTTP or stdio
//!
//! # Modules
//!
//! - [`signature`]: Gleam type signature rendering
//! - [`entity`]: Decoding of functions, types, constants and type aliases
//! - [`interface`]: Decoding of package-interface documents
//! - [`search`]: Substring search over a package interface
//! - [`packages`]: Decoding of hex.pm package metadata
//! - [`hex_client`]: HTTP client for hex.pm and hexdocs.pm
//! - [`cache`]: Caching implementation for remote documents
//! - [`format`]: Text rendering of tool results
//! - [`protocol`]: JSON-RPC message types
//! - [`mcp`]: MCP request dispatch and tools
//! - [`server`]: HTTP and stdio transports

pub mod cache;
pub mod entity;
pub mod format;
pub mod hex_client;
pub mod interface;
pub mod mcp;
pub mod packages;
pub mod protocol;
pub mod search;
pub mod server;
pub mod signature;

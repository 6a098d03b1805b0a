//! MCP request handling over a single catalog
//!
//! Tools:
//! - convert, ratio: exact conversions between units of one dimension
//! - normalize, normalize_all: compute and cache normalized quantities
//! - refresh_export: normalize everything and write the export document
//! - list_dimensions, list_systems, list_units: catalog inspection
//! - create/update/delete for dimensions, systems and units, set_normal_unit
//!
//! Resources:
//! - mensura://export - Most recent export document
//! - mensura://catalog - Current catalog snapshot

use std::fs;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};
use mensura_core::prelude::*;
use mensura_units::{
    Catalog, CatalogError, DimensionFields, ExportDocument, MemoryStore, Quantity, SystemFields,
    Unit, UnitFields, UnitFilter,
};
use crate::config::Config;

pub const PROTOCOL_VERSION: &str = "2025-11-25";
const SERVER_NAME: &str = "mensura";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const EXPORT_URI: &str = "mensura://export";
const CATALOG_URI: &str = "mensura://catalog";

// MCP Protocol types
#[derive(Debug, Deserialize)]
pub struct McpRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<JsonValue>,
    method: String,
    #[serde(default)]
    params: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
pub struct McpResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<McpError>,
}

#[derive(Debug, Serialize)]
pub struct McpError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<JsonValue>,
}

impl McpError {
    fn invalid_params(message: impl Into<String>) -> Self {
        McpError { code: -32602, message: message.into(), data: None }
    }
}

/// Text shown to the client plus structured data
type ToolOutput = (String, JsonValue);

pub struct Server {
    catalog: Catalog<MemoryStore>,
    config: Config,
    last_export: Option<ExportDocument>,
}

impl Server {
    /// Load the configured catalog
    pub fn new(config: Config) -> Result<Self, CatalogError> {
        let catalog = config.load_catalog()?;
        Ok(Self::with_catalog(catalog, config))
    }

    pub fn with_catalog(catalog: Catalog<MemoryStore>, config: Config) -> Self {
        Server { catalog, config, last_export: None }
    }

    /// Handle one line of input; `None` when no response is due
    pub fn process_line(&mut self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<McpRequest>(line) {
            Ok(request) => {
                debug!(method = %request.method, "processing request");
                let response = self.handle_request(&request);
                // Notifications (no id) should NOT receive a response
                if request.id.is_none() {
                    debug!(method = %request.method, "notification processed");
                    return None;
                }
                response
            }
            Err(e) => {
                warn!(error = %e, "malformed request");
                McpResponse {
                    jsonrpc: "2.0".to_string(),
                    id: None,
                    result: None,
                    error: Some(McpError { code: -32700, message: format!("Parse error: {}", e), data: None }),
                }
            }
        };

        match serde_json::to_string(&response) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!(error = %e, "failed to serialize response");
                None
            }
        }
    }

    pub fn handle_request(&mut self, request: &McpRequest) -> McpResponse {
        let result = match request.method.as_str() {
            // Lifecycle
            "initialize" => handle_initialize(&request.params),
            "initialized" | "notifications/initialized" => Ok(json!({})),
            "ping" => Ok(json!({})),

            // Tools
            "tools/list" => handle_tools_list(),
            "tools/call" => self.handle_tool_call(&request.params),

            // Resources
            "resources/list" => handle_resources_list(),
            "resources/read" => self.handle_resources_read(&request.params),

            _ => Err(McpError {
                code: -32601,
                message: format!("Method not found: {}", request.method),
                data: None,
            }),
        };

        match result {
            Ok(r) => McpResponse {
                jsonrpc: "2.0".to_string(),
                id: request.id.clone(),
                result: Some(r),
                error: None,
            },
            Err(e) => McpResponse {
                jsonrpc: "2.0".to_string(),
                id: request.id.clone(),
                result: None,
                error: Some(e),
            },
        }
    }

    fn handle_tool_call(&mut self, params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
        let params = params.as_ref().ok_or_else(|| McpError::invalid_params("Missing params"))?;
        let name = params.get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| McpError::invalid_params("Missing tool name"))?;
        let args = params.get("arguments").cloned().unwrap_or(json!({}));

        let outcome = match name {
            "convert" => self.tool_convert(&args),
            "ratio" => self.tool_ratio(&args),
            "normalize" => self.tool_normalize(&args),
            "normalize_all" => self.tool_normalize_all(),
            "refresh_export" => self.tool_refresh_export(),
            "list_dimensions" => self.tool_list_dimensions(),
            "list_systems" => self.tool_list_systems(),
            "list_units" => self.tool_list_units(&args),
            "create_dimension" => self.tool_create_dimension(&args),
            "update_dimension" => self.tool_update_dimension(&args),
            "delete_dimension" => self.tool_delete_dimension(&args),
            "set_normal_unit" => self.tool_set_normal_unit(&args),
            "create_system" => self.tool_create_system(&args),
            "update_system" => self.tool_update_system(&args),
            "delete_system" => self.tool_delete_system(&args),
            "create_unit" => self.tool_create_unit(&args),
            "update_unit" => self.tool_update_unit(&args),
            "delete_unit" => self.tool_delete_unit(&args),
            _ => return Err(McpError::invalid_params(format!("Unknown tool: {}", name))),
        };

        // Every tool but the listings may have written caches or records
        let outcome = if name.starts_with("list_") {
            outcome
        } else {
            outcome.and_then(|out| {
                self.config.persist(&self.catalog).map_err(|e| {
                    warn!(tool = name, error = %e, "change applied but not persisted");
                    MensuraError::new(
                        codes::STORAGE,
                        format!("{} applied in memory, not persisted: {}", name, e),
                    )
                    .with_suggestion("The change is live until restart; check MENSURA_CATALOG_PATH")
                })?;
                Ok(out)
            })
        };

        Ok(match outcome {
            Ok((text, data)) => json!({
                "content": [{ "type": "text", "text": text }],
                "data": data,
                "isError": false
            }),
            Err(e) => {
                info!(tool = name, code = %e.code, "tool failed: {}", e.message);
                json!({
                    "content": [{ "type": "text", "text": e.to_string() }],
                    "error": e.to_json(),
                    "isError": true
                })
            }
        })
    }

    // ========== Conversion tools ==========

    fn tool_convert(&mut self, args: &JsonValue) -> Result<ToolOutput, MensuraError> {
        let scalar = scalar_arg(args, "scalar")?;
        let from = self.catalog.find_unit(str_arg(args, "from")?)?;
        let to = self.catalog.find_unit(str_arg(args, "to")?)?;

        let quantity = Quantity::new(scalar, from.id);
        let converted = quantity.convert_to(to.id, &mut self.catalog)?;
        let text = format!(
            "{} = {}",
            self.catalog.quantity_label(&quantity)?,
            self.catalog.quantity_label(&converted)?
        );
        Ok((text, json!({
            "scalar": converted.scalar,
            "unit": self.catalog.unit_code(&to)?,
        })))
    }

    fn tool_ratio(&mut self, args: &JsonValue) -> Result<ToolOutput, MensuraError> {
        let source = self.catalog.find_unit(str_arg(args, "source")?)?;
        let target = self.catalog.find_unit(str_arg(args, "target")?)?;
        let to_target = self.catalog.ratio_to_target(source.id, target.id)?;
        let to_source = self.catalog.ratio_to_source(source.id, target.id)?;
        let text = format!(
            "1 {} = {} {}\n1 {} = {} {}",
            source.abbreviation, to_target, target.abbreviation,
            target.abbreviation, to_source, source.abbreviation,
        );
        Ok((text, json!({
            "ratio_to_target": to_target.to_scalar()?,
            "ratio_to_source": to_source.to_scalar()?,
        })))
    }

    fn tool_normalize(&mut self, args: &JsonValue) -> Result<ToolOutput, MensuraError> {
        let unit = self.catalog.find_unit(str_arg(args, "unit")?)?;
        let normalized = self.catalog.normalize(unit.id)?;
        let label = self.catalog.quantity_label(&normalized)?;
        Ok((format!("1 {} = {}", unit.abbreviation, label), json!({
            "unit": self.catalog.unit_code(&unit)?,
            "normalized": label,
        })))
    }

    fn tool_normalize_all(&mut self) -> Result<ToolOutput, MensuraError> {
        let count = self.catalog.normalize_all()?;
        Ok((format!("Normalized {} units", count), json!({ "units": count })))
    }

    fn tool_refresh_export(&mut self) -> Result<ToolOutput, MensuraError> {
        let document = self.catalog.export()?;
        let json = document.to_json_pretty()
            .map_err(|e| MensuraError::internal(e.to_string()))?;
        let path = &self.config.export_path;
        fs::write(path, json).map_err(|e| {
            MensuraError::new(codes::STORAGE, format!("cannot write {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), units = document.units.len(), "wrote export document");

        let data = json!({
            "path": path.display().to_string(),
            "units": document.units.len(),
        });
        self.last_export = Some(document);
        Ok((format!("Exported {} units to {}", data["units"], path.display()), data))
    }

    // ========== Listings ==========

    fn tool_list_dimensions(&self) -> Result<ToolOutput, MensuraError> {
        let mut rows = Vec::new();
        for dimension in self.catalog.dimensions()? {
            let normal = self.catalog.normal_unit(dimension.id)?;
            rows.push(json!({
                "id": dimension.id,
                "name": dimension.name,
                "name_plural": dimension.name_plural,
                "code": dimension.code(),
                "normal_unit": normal.map(|u| u.abbreviation),
            }));
        }
        Ok((format!("{} dimensions", rows.len()), JsonValue::Array(rows)))
    }

    fn tool_list_systems(&self) -> Result<ToolOutput, MensuraError> {
        let mut rows = Vec::new();
        for system in self.catalog.systems()? {
            let dimensions: Vec<String> = self.catalog.dimensions_in_system(system.id)?
                .into_iter()
                .map(|d| d.abbreviation)
                .collect();
            rows.push(json!({
                "id": system.id,
                "name": system.name,
                "code": system.code(),
                "description": system.description,
                "dimensions": dimensions,
            }));
        }
        Ok((format!("{} unit systems", rows.len()), JsonValue::Array(rows)))
    }

    fn tool_list_units(&self, args: &JsonValue) -> Result<ToolOutput, MensuraError> {
        let mut filter = UnitFilter::default();
        if let Some(key) = opt_str_arg(args, "dimension") {
            filter.dimension = Some(self.catalog.find_dimension(key)?.id);
        }
        if let Some(key) = opt_str_arg(args, "system") {
            filter.system = Some(self.catalog.find_system(key)?.id);
        }

        let mut rows = Vec::new();
        for unit in self.catalog.units_where(&filter)? {
            rows.push(self.unit_json(&unit)?);
        }
        Ok((format!("{} units", rows.len()), JsonValue::Array(rows)))
    }

    fn unit_json(&self, unit: &Unit) -> Result<JsonValue, MensuraError> {
        let defined_as = match &unit.defining_quantity {
            Some(q) => Some(self.catalog.quantity_label(q)?),
            None => None,
        };
        let normalized = match &unit.normalized_quantity {
            Some(q) => Some(self.catalog.quantity_label(q)?),
            None => None,
        };
        Ok(json!({
            "id": unit.id,
            "code": self.catalog.unit_code(unit)?,
            "name": unit.display_name(),
            "name_plural": unit.name_plural,
            "label": self.catalog.unit_label(unit)?,
            "defined_as": defined_as,
            "normalized": normalized,
            "information_source": unit.information_source,
        }))
    }

    // ========== Dimension admin ==========

    fn tool_create_dimension(&mut self, args: &JsonValue) -> Result<ToolOutput, MensuraError> {
        let fields = dimension_fields(args)?;
        let dimension = self.catalog.create_dimension(fields)?;
        Ok((format!("Created dimension {}", dimension.name), json!({ "id": dimension.id })))
    }

    fn tool_update_dimension(&mut self, args: &JsonValue) -> Result<ToolOutput, MensuraError> {
        let id = self.catalog.find_dimension(str_arg(args, "dimension")?)?.id;
        let dimension = self.catalog.update_dimension(id, dimension_fields(args)?)?;
        Ok((format!("Updated dimension {}", dimension.name), json!({ "id": dimension.id })))
    }

    fn tool_delete_dimension(&mut self, args: &JsonValue) -> Result<ToolOutput, MensuraError> {
        let dimension = self.catalog.find_dimension(str_arg(args, "dimension")?)?;
        self.catalog.delete_dimension(dimension.id)?;
        Ok((format!("Deleted dimension {}", dimension.name), json!({ "id": dimension.id })))
    }

    fn tool_set_normal_unit(&mut self, args: &JsonValue) -> Result<ToolOutput, MensuraError> {
        let id = self.catalog.find_dimension(str_arg(args, "dimension")?)?.id;
        let unit = match opt_str_arg(args, "unit") {
            Some(key) => Some(self.catalog.find_unit(key)?.id),
            None => None,
        };
        let dimension = self.catalog.set_normal_unit(id, unit)?;
        let text = match unit {
            Some(unit) => format!(
                "{} is now normalized against {}",
                dimension.name,
                self.catalog.unit(unit)?.display_name()
            ),
            None => format!("{} has no normal unit", dimension.name),
        };
        Ok((text, json!({ "id": dimension.id, "normal_unit": dimension.normal_unit })))
    }

    // ========== System admin ==========

    fn tool_create_system(&mut self, args: &JsonValue) -> Result<ToolOutput, MensuraError> {
        let system = self.catalog.create_system(system_fields(args)?)?;
        Ok((format!("Created unit system {}", system.name), json!({ "id": system.id })))
    }

    fn tool_update_system(&mut self, args: &JsonValue) -> Result<ToolOutput, MensuraError> {
        let id = self.catalog.find_system(str_arg(args, "system")?)?.id;
        let system = self.catalog.update_system(id, system_fields(args)?)?;
        Ok((format!("Updated unit system {}", system.name), json!({ "id": system.id })))
    }

    fn tool_delete_system(&mut self, args: &JsonValue) -> Result<ToolOutput, MensuraError> {
        let system = self.catalog.find_system(str_arg(args, "system")?)?;
        self.catalog.delete_system(system.id)?;
        Ok((format!("Deleted unit system {}", system.name), json!({ "id": system.id })))
    }

    // ========== Unit admin ==========

    fn tool_create_unit(&mut self, args: &JsonValue) -> Result<ToolOutput, MensuraError> {
        let system = self.catalog.find_system(str_arg(args, "system")?)?;
        let dimension = self.catalog.find_dimension(str_arg(args, "dimension")?)?;
        let fields = UnitFields::new(
            str_arg(args, "name")?,
            str_arg(args, "abbreviation")?,
            system.id,
            dimension.id,
        );
        let fields = self.apply_unit_args(fields, args)?;
        let unit = self.catalog.create_unit(fields)?;
        Ok((format!("Created unit {}", unit.display_name()), self.unit_json(&unit)?))
    }

    fn tool_update_unit(&mut self, args: &JsonValue) -> Result<ToolOutput, MensuraError> {
        let existing = self.catalog.find_unit(str_arg(args, "unit")?)?;
        let mut fields = existing.fields();
        if let Some(name) = opt_str_arg(args, "name") {
            fields.name = name.to_string();
        }
        if let Some(abbreviation) = opt_str_arg(args, "abbreviation") {
            fields.abbreviation = abbreviation.to_string();
        }
        if let Some(key) = opt_str_arg(args, "system") {
            fields.system = self.catalog.find_system(key)?.id;
        }
        if let Some(key) = opt_str_arg(args, "dimension") {
            fields.dimension = self.catalog.find_dimension(key)?.id;
        }
        let fields = self.apply_unit_args(fields, args)?;
        let unit = self.catalog.update_unit(existing.id, fields)?;
        Ok((format!("Updated unit {}", unit.display_name()), self.unit_json(&unit)?))
    }

    fn tool_delete_unit(&mut self, args: &JsonValue) -> Result<ToolOutput, MensuraError> {
        let unit = self.catalog.find_unit(str_arg(args, "unit")?)?;
        self.catalog.delete_unit(unit.id)?;
        Ok((format!("Deleted unit {}", unit.display_name()), json!({ "id": unit.id })))
    }

    /// Optional unit arguments shared by create and update
    ///
    /// `defined_as: null` clears the definition.
    fn apply_unit_args(&self, mut fields: UnitFields, args: &JsonValue) -> Result<UnitFields, MensuraError> {
        if let Some(plural) = opt_str_arg(args, "name_plural") {
            fields.name_plural = plural.to_string();
        }
        if let Some(plural) = opt_str_arg(args, "abbreviation_plural") {
            fields.abbreviation_plural = plural.to_string();
        }
        if let Some(source) = opt_str_arg(args, "information_source") {
            fields.information_source = source.to_string();
        }
        match args.get("defined_as") {
            None => {}
            Some(JsonValue::Null) => fields.defining_quantity = None,
            Some(definition) => {
                let scalar = scalar_arg(definition, "scalar")?;
                let unit = self.catalog.find_unit(str_arg(definition, "unit")?)?;
                fields.defining_quantity = Some(Quantity::new(scalar, unit.id));
            }
        }
        Ok(fields)
    }

    // ========== Resources ==========

    fn handle_resources_read(&self, params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
        let uri = params.as_ref()
            .and_then(|p| p.get("uri"))
            .and_then(|u| u.as_str())
            .ok_or_else(|| McpError::invalid_params("Missing uri parameter"))?;

        let text = match uri {
            EXPORT_URI => self.export_text()?,
            CATALOG_URI => self.catalog.store().snapshot().to_json_pretty()
                .map_err(|e| McpError { code: -32603, message: e.to_string(), data: None })?,
            _ => {
                return Err(McpError::invalid_params(format!(
                    "Invalid URI: {}. Expected {} or {}",
                    uri, EXPORT_URI, CATALOG_URI
                )))
            }
        };

        Ok(json!({
            "contents": [{
                "uri": uri,
                "mimeType": "application/json",
                "text": text
            }]
        }))
    }

    /// The export produced in this session, else the one on disk
    fn export_text(&self) -> Result<String, McpError> {
        if let Some(document) = &self.last_export {
            return document.to_json_pretty()
                .map_err(|e| McpError { code: -32603, message: e.to_string(), data: None });
        }
        fs::read_to_string(&self.config.export_path).map_err(|_| McpError {
            code: -32602,
            message: "No export available yet".to_string(),
            data: Some(json!({ "hint": "call the refresh_export tool first" })),
        })
    }
}

fn handle_initialize(params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let client_info = params.as_ref()
        .and_then(|p| p.get("clientInfo"))
        .and_then(|c| c.get("name"))
        .and_then(|n| n.as_str())
        .unwrap_or("unknown");

    // Use client's protocol version for compatibility
    let client_protocol = params.as_ref()
        .and_then(|p| p.get("protocolVersion"))
        .and_then(|v| v.as_str())
        .unwrap_or(PROTOCOL_VERSION);

    info!(client = client_info, protocol = client_protocol, "client connected");

    Ok(json!({
        "protocolVersion": client_protocol,
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION,
            "description": "Unit catalog with exact fixed-point conversions"
        },
        "capabilities": {
            "tools": { "listChanged": false },
            "resources": { "subscribe": false, "listChanged": false }
        },
        "instructions": "Mensura converts quantities between units of the same dimension. Refer to units by id, name or code (\"US L in\"). Scalars are decimal strings with at most 9 fractional digits."
    }))
}

fn handle_tools_list() -> Result<JsonValue, McpError> {
    let unit_ref = json!({ "type": "string", "description": "Unit id, name or code (e.g., \"US L in\")" });
    let dimension_ref = json!({ "type": "string", "description": "Dimension id, name or abbreviation" });
    let system_ref = json!({ "type": "string", "description": "System id, name or abbreviation" });
    let scalar = json!({ "type": "string", "description": "Decimal value, e.g. \"2.54\"" });
    let quantity = json!({
        "type": ["object", "null"],
        "description": "Defining quantity; null clears it",
        "properties": { "scalar": scalar, "unit": unit_ref },
        "required": ["scalar", "unit"]
    });
    let no_args = json!({ "type": "object", "properties": {} });

    Ok(json!({
        "tools": [
            {
                "name": "convert",
                "description": "Convert a scalar from one unit to another of the same dimension.",
                "inputSchema": {
                    "type": "object",
                    "properties": { "scalar": scalar, "from": unit_ref, "to": unit_ref },
                    "required": ["scalar", "from", "to"]
                }
            },
            {
                "name": "ratio",
                "description": "Conversion factors between two units, in both directions.",
                "inputSchema": {
                    "type": "object",
                    "properties": { "source": unit_ref, "target": unit_ref },
                    "required": ["source", "target"]
                }
            },
            {
                "name": "normalize",
                "description": "Express one unit in the normal unit of its dimension and cache the result.",
                "inputSchema": {
                    "type": "object",
                    "properties": { "unit": unit_ref },
                    "required": ["unit"]
                }
            },
            {
                "name": "normalize_all",
                "description": "Recompute every unit's normalized quantity. All or nothing.",
                "inputSchema": no_args
            },
            {
                "name": "refresh_export",
                "description": "Normalize the catalog and write the export document for client-side conversion.",
                "inputSchema": no_args
            },
            {
                "name": "list_dimensions",
                "description": "List dimensions with their normal units.",
                "inputSchema": no_args
            },
            {
                "name": "list_systems",
                "description": "List unit systems and the dimensions they cover.",
                "inputSchema": no_args
            },
            {
                "name": "list_units",
                "description": "List units, optionally filtered by dimension and system.",
                "inputSchema": {
                    "type": "object",
                    "properties": { "dimension": dimension_ref, "system": system_ref }
                }
            },
            {
                "name": "create_dimension",
                "description": "Create a dimension. Names and abbreviation must be unique.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "name_plural": { "type": "string" },
                        "abbreviation": { "type": "string" }
                    },
                    "required": ["name", "name_plural", "abbreviation"]
                }
            },
            {
                "name": "update_dimension",
                "description": "Rename a dimension.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "dimension": dimension_ref,
                        "name": { "type": "string" },
                        "name_plural": { "type": "string" },
                        "abbreviation": { "type": "string" }
                    },
                    "required": ["dimension", "name", "name_plural", "abbreviation"]
                }
            },
            {
                "name": "delete_dimension",
                "description": "Delete a dimension that has no units.",
                "inputSchema": {
                    "type": "object",
                    "properties": { "dimension": dimension_ref },
                    "required": ["dimension"]
                }
            },
            {
                "name": "set_normal_unit",
                "description": "Assign the normal unit of a dimension; omit unit to clear it. Clears the dimension's cached normalizations.",
                "inputSchema": {
                    "type": "object",
                    "properties": { "dimension": dimension_ref, "unit": unit_ref },
                    "required": ["dimension"]
                }
            },
            {
                "name": "create_system",
                "description": "Create a unit system. Name and abbreviation must be unique.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "abbreviation": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["name", "abbreviation"]
                }
            },
            {
                "name": "update_system",
                "description": "Rename or describe a unit system.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "system": system_ref,
                        "name": { "type": "string" },
                        "abbreviation": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["system", "name", "abbreviation"]
                }
            },
            {
                "name": "delete_system",
                "description": "Delete a unit system that has no units.",
                "inputSchema": {
                    "type": "object",
                    "properties": { "system": system_ref },
                    "required": ["system"]
                }
            },
            {
                "name": "create_unit",
                "description": "Create a unit, defined as a quantity of another unit of the same dimension.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "name_plural": { "type": "string" },
                        "abbreviation": { "type": "string" },
                        "abbreviation_plural": { "type": "string" },
                        "system": system_ref,
                        "dimension": dimension_ref,
                        "defined_as": quantity,
                        "information_source": { "type": "string" }
                    },
                    "required": ["name", "abbreviation", "system", "dimension"]
                }
            },
            {
                "name": "update_unit",
                "description": "Change a unit. Omitted fields keep their values; a new definition clears the dimension's cached normalizations.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "unit": unit_ref,
                        "name": { "type": "string" },
                        "name_plural": { "type": "string" },
                        "abbreviation": { "type": "string" },
                        "abbreviation_plural": { "type": "string" },
                        "system": system_ref,
                        "dimension": dimension_ref,
                        "defined_as": quantity,
                        "information_source": { "type": "string" }
                    },
                    "required": ["unit"]
                }
            },
            {
                "name": "delete_unit",
                "description": "Delete a unit no other record refers to.",
                "inputSchema": {
                    "type": "object",
                    "properties": { "unit": unit_ref },
                    "required": ["unit"]
                }
            }
        ]
    }))
}

fn handle_resources_list() -> Result<JsonValue, McpError> {
    Ok(json!({
        "resources": [
            {
                "uri": EXPORT_URI,
                "name": "export",
                "description": "Latest export document: every unit with its ratio to the normal unit of its dimension",
                "mimeType": "application/json"
            },
            {
                "uri": CATALOG_URI,
                "name": "catalog",
                "description": "Current catalog snapshot",
                "mimeType": "application/json"
            }
        ]
    }))
}

// ========== Argument helpers ==========

fn str_arg<'a>(args: &'a JsonValue, name: &str) -> Result<&'a str, MensuraError> {
    opt_str_arg(args, name)
        .ok_or_else(|| MensuraError::invalid_argument(format!("Missing {} argument", name)))
}

fn opt_str_arg<'a>(args: &'a JsonValue, name: &str) -> Option<&'a str> {
    args.get(name).and_then(|v| v.as_str())
}

/// Scalars arrive as decimal strings; integers are accepted too
fn scalar_arg(args: &JsonValue, name: &str) -> Result<Scalar, MensuraError> {
    match args.get(name) {
        Some(JsonValue::String(s)) => Ok(Scalar::from_str(s)?),
        Some(JsonValue::Number(n)) if n.is_i64() || n.is_u64() => Ok(Scalar::from_str(&n.to_string())?),
        Some(other) => Err(MensuraError::parse_error(format!(
            "{} must be a decimal string, got {}",
            name, other
        ))),
        None => Err(MensuraError::invalid_argument(format!("Missing {} argument", name))),
    }
}

fn dimension_fields(args: &JsonValue) -> Result<DimensionFields, MensuraError> {
    Ok(DimensionFields::new(
        str_arg(args, "name")?,
        str_arg(args, "name_plural")?,
        str_arg(args, "abbreviation")?,
    ))
}

fn system_fields(args: &JsonValue) -> Result<SystemFields, MensuraError> {
    Ok(SystemFields::new(
        str_arg(args, "name")?,
        str_arg(args, "abbreviation")?,
        opt_str_arg(args, "description").unwrap_or(""),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mensura_units::standard_catalog;

    fn server() -> Server {
        Server::with_catalog(standard_catalog().unwrap(), Config::default())
    }

    fn call(server: &mut Server, tool: &str, arguments: JsonValue) -> JsonValue {
        let line = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": { "name": tool, "arguments": arguments }
        });
        let response = server.process_line(&line.to_string()).unwrap();
        let response: JsonValue = serde_json::from_str(&response).unwrap();
        response["result"].clone()
    }

    #[test]
    fn test_initialize_echoes_protocol() {
        let mut server = server();
        let line = r#"{"jsonrpc":"2.0","id":0,"method":"initialize","params":{"protocolVersion":"2025-06-18","clientInfo":{"name":"test"}}}"#;
        let response: JsonValue = serde_json::from_str(&server.process_line(line).unwrap()).unwrap();
        assert_eq!(response["result"]["protocolVersion"], "2025-06-18");
        assert_eq!(response["result"]["serverInfo"]["name"], "mensura");
    }

    #[test]
    fn test_notifications_get_no_response() {
        let mut server = server();
        assert!(server.process_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).is_none());
    }

    #[test]
    fn test_parse_error() {
        let mut server = server();
        let response: JsonValue = serde_json::from_str(&server.process_line("{nope").unwrap()).unwrap();
        assert_eq!(response["error"]["code"], -32700);
    }

    #[test]
    fn test_unknown_method() {
        let mut server = server();
        let response: JsonValue = serde_json::from_str(
            &server.process_line(r#"{"jsonrpc":"2.0","id":3,"method":"prompts/list"}"#).unwrap(),
        ).unwrap();
        assert_eq!(response["error"]["code"], -32601);
    }

    #[test]
    fn test_tools_list_covers_every_tool() {
        let tools = handle_tools_list().unwrap();
        let names: Vec<&str> = tools["tools"].as_array().unwrap()
            .iter().filter_map(|t| t["name"].as_str()).collect();
        assert_eq!(names.len(), 18);
        assert!(names.contains(&"refresh_export"));
        assert!(names.contains(&"set_normal_unit"));
    }

    #[test]
    fn test_convert_tool() {
        let mut server = server();
        let result = call(&mut server, "convert", json!({ "scalar": "12", "from": "US L in", "to": "Meter" }));
        assert_eq!(result["isError"], false);
        assert_eq!(result["data"]["scalar"], "0.3048");
        assert_eq!(result["data"]["unit"], "SI L m");
        assert_eq!(result["content"][0]["text"], "12 in = 0.3048 m");
    }

    #[test]
    fn test_convert_across_dimensions_is_a_tool_error() {
        let mut server = server();
        let result = call(&mut server, "convert", json!({ "scalar": "1", "from": "Foot", "to": "Pound" }));
        assert_eq!(result["isError"], true);
        assert_eq!(result["error"]["code"], "DIMENSION_MISMATCH");
    }

    #[test]
    fn test_convert_rejects_float_scalars() {
        let mut server = server();
        let result = call(&mut server, "convert", json!({ "scalar": 0.1, "from": "Foot", "to": "Inch" }));
        assert_eq!(result["error"]["code"], "PARSE_ERROR");
    }

    #[test]
    fn test_ratio_tool() {
        let mut server = server();
        let result = call(&mut server, "ratio", json!({ "source": "Kilometer", "target": "Meter" }));
        assert_eq!(result["data"]["ratio_to_target"], "1000");
        assert_eq!(result["data"]["ratio_to_source"], "0.001");
    }

    #[test]
    fn test_list_units_filtered() {
        let mut server = server();
        let result = call(&mut server, "list_units", json!({ "dimension": "M", "system": "IMP" }));
        let units = result["data"].as_array().unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0]["code"], "IMP M st");
        assert_eq!(units[0]["defined_as"], "14 lb");
    }

    #[test]
    fn test_admin_round_trip() {
        let mut server = server();
        let result = call(&mut server, "create_unit", json!({
            "name": "Hand",
            "name_plural": "Hands",
            "abbreviation": "hh",
            "system": "IMP",
            "dimension": "Length",
            "defined_as": { "scalar": "4", "unit": "US L in" }
        }));
        assert_eq!(result["isError"], false, "{}", result);
        assert_eq!(result["data"]["code"], "IMP L hh");

        let result = call(&mut server, "normalize", json!({ "unit": "IMP L hh" }));
        assert_eq!(result["data"]["normalized"], "0.1016 m");

        let result = call(&mut server, "delete_unit", json!({ "unit": "Inch" }));
        assert_eq!(result["error"]["code"], "IN_USE");
        let result = call(&mut server, "delete_unit", json!({ "unit": "IMP L hh" }));
        assert_eq!(result["isError"], false);
    }

    #[test]
    fn test_set_normal_unit_tool() {
        let mut server = server();
        let result = call(&mut server, "set_normal_unit", json!({ "dimension": "L", "unit": "Liter" }));
        assert_eq!(result["error"]["code"], "INVALID_NORMAL_UNIT");

        let result = call(&mut server, "set_normal_unit", json!({ "dimension": "L", "unit": "Foot" }));
        assert_eq!(result["isError"], false);
        let result = call(&mut server, "normalize", json!({ "unit": "Mile" }));
        assert_eq!(result["data"]["normalized"], "5280 ft");
    }

    #[test]
    fn test_refresh_export_and_resource() {
        let dir = std::env::temp_dir().join(format!("mensura-export-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let config = Config { catalog_path: None, export_path: dir.join("unit.data.json") };
        let mut server = Server::with_catalog(standard_catalog().unwrap(), config);

        let result = call(&mut server, "refresh_export", json!({}));
        assert_eq!(result["data"]["units"], 24);
        assert!(dir.join("unit.data.json").exists());

        let line = json!({
            "jsonrpc": "2.0", "id": 2, "method": "resources/read",
            "params": { "uri": EXPORT_URI }
        });
        let response: JsonValue = serde_json::from_str(&server.process_line(&line.to_string()).unwrap()).unwrap();
        let text = response["result"]["contents"][0]["text"].as_str().unwrap();
        let document: JsonValue = serde_json::from_str(text).unwrap();
        assert_eq!(document["units"]["US L in"]["ratio"], "0.0254");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_mutations_persist_snapshot() {
        let dir = std::env::temp_dir().join(format!("mensura-catalog-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("catalog.json");
        let config = Config { catalog_path: Some(path.clone()), export_path: dir.join("export.json") };
        let mut server = Server::new(config.clone()).unwrap();

        call(&mut server, "create_system", json!({ "name": "Laboratory", "abbreviation": "LAB" }));
        let reloaded = Server::new(config).unwrap();
        assert!(reloaded.catalog.find_system("LAB").is_ok());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unwritable_snapshot_reports_live_change() {
        let dir = std::env::temp_dir().join(format!("mensura-readonly-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        // A plain file where the snapshot's parent directory should be
        let blocker = dir.join("blocker");
        fs::write(&blocker, "").unwrap();
        let config = Config { catalog_path: Some(blocker.join("catalog.json")), export_path: dir.join("export.json") };
        let mut server = Server::with_catalog(standard_catalog().unwrap(), config);

        let result = call(&mut server, "create_system", json!({ "name": "Laboratory", "abbreviation": "LAB" }));
        assert_eq!(result["isError"], true);
        assert_eq!(result["error"]["code"], "STORAGE");
        let message = result["error"]["message"].as_str().unwrap();
        assert!(message.contains("applied in memory, not persisted"), "{}", message);
        assert!(server.catalog.find_system("LAB").is_ok());

        fs::remove_dir_all(&dir).unwrap();
    }
}

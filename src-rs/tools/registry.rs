use serde_json::Value;

use super::types::{ParamSpec, ParamType, ToolDefinition, ToolFailure, ToolKind, ToolRequest, ToolSchema};

/// Static catalog of the tools a comparison session may call.
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            definitions: ToolKind::ALL.into_iter().map(definition).collect(),
        }
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.definitions.iter().map(ToolDefinition::schema).collect()
    }

    pub fn resolve(&self, name: &str) -> ToolRequest {
        match ToolKind::from_name(name) {
            Some(kind) if self.get(kind).is_some() => ToolRequest::Known(kind),
            _ => ToolRequest::Unknown(name.to_string()),
        }
    }

    pub fn get(&self, kind: ToolKind) -> Option<&ToolDefinition> {
        self.definitions.iter().find(|def| def.kind == kind)
    }

    pub fn has(&self, name: &str) -> bool {
        matches!(self.resolve(name), ToolRequest::Known(_))
    }

    pub fn count(&self) -> usize {
        self.definitions.len()
    }

    /// Checks argument names and JSON types against the declared schema.
    pub fn validate(&self, kind: ToolKind, args: &Value) -> Result<(), ToolFailure> {
        let def = self
            .get(kind)
            .ok_or_else(|| ToolFailure::UnknownTool {
                name: kind.name().to_string(),
            })?;
        let map = args
            .as_object()
            .ok_or_else(|| ToolFailure::invalid(kind, "arguments must be an object"))?;

        for param in &def.params {
            match map.get(param.name) {
                Some(Value::Null) | None if param.required => {
                    return Err(ToolFailure::invalid(kind, format!("missing '{}'", param.name)));
                }
                Some(Value::Null) | None => {}
                Some(value) if !param.kind.accepts(value) => {
                    return Err(ToolFailure::invalid(
                        kind,
                        format!("'{}' must be {:?}", param.name, param.kind),
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

fn definition(kind: ToolKind) -> ToolDefinition {
    let (description, params) = match kind {
        ToolKind::SearchStockData => (
            "General SerpAPI (Google) search for any stock or dividend info.",
            vec![
                ParamSpec::required("query", ParamType::StringArray)
                    .describe("Search queries, issued in order."),
                ParamSpec::optional("roles", ParamType::StringArray).describe(
                    "Optional role per query, aligned by position: a_initial, a_final, \
                     b_initial, b_final, a_dividend, b_dividend.",
                ),
            ],
        ),
        ToolKind::CalculatePriceReturn => (
            "Calculate price return from initial and final prices.",
            vec![
                ParamSpec::required("initial_price", ParamType::Number),
                ParamSpec::required("final_price", ParamType::Number),
            ],
        ),
        ToolKind::CalculateDividendYield => (
            "Calculate dividend yield from total dividend and initial price.",
            vec![
                ParamSpec::required("dividend_total", ParamType::Number),
                ParamSpec::required("initial_price", ParamType::Number),
            ],
        ),
        ToolKind::CalculateTotalReturn => (
            "Calculate total return from price return and dividend yield.",
            vec![
                ParamSpec::required("price_return", ParamType::Number),
                ParamSpec::required("dividend_yield", ParamType::Number),
            ],
        ),
        ToolKind::CompareReturns => (
            "Compare total returns between two stocks.",
            vec![
                ParamSpec::required("stock_a_name", ParamType::String),
                ParamSpec::required("stock_a_return", ParamType::Number),
                ParamSpec::required("stock_b_name", ParamType::String),
                ParamSpec::required("stock_b_return", ParamType::Number),
            ],
        ),
    };
    ToolDefinition {
        kind,
        description,
        params,
    }
}

//! Supply chain profile: stock levels, alternatives, restock orders.

use super::Profile;
use crate::protocol::{Args, ToolError, ToolOutput, ToolSpec};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Serialize)]
struct Product {
    sku: &'static str,
    name: &'static str,
    category: &'static str,
    stock: u64,
    location: &'static str,
}

const fn product(
    sku: &'static str,
    name: &'static str,
    category: &'static str,
    stock: u64,
    location: &'static str,
) -> Product {
    Product {
        sku,
        name,
        category,
        stock,
        location,
    }
}

#[derive(Debug)]
pub struct SupplyChain {
    inventory: Vec<Product>,
}

impl Default for SupplyChain {
    fn default() -> Self {
        Self::new()
    }
}

impl SupplyChain {
    pub fn new() -> Self {
        Self {
            inventory: vec![
                product("EL-1001", "Wireless Mouse", "Electronics", 150, "Warehouse A"),
                product("EL-1002", "Mechanical Keyboard", "Electronics", 8, "Warehouse B"),
                product("EL-1003", "USB-C Hub", "Electronics", 42, "Warehouse A"),
                product("OF-2001", "Ergonomic Chair", "Office", 5, "Warehouse C"),
                product("OF-2002", "Standing Desk", "Office", 23, "Warehouse C"),
            ],
        }
    }

    fn check_stock(&self, args: &Args) -> Result<ToolOutput, ToolError> {
        let query = args.str("sku_or_name")?;
        let needle = query.to_lowercase();
        let found = self.inventory.iter().find(|p| {
            p.sku.to_lowercase().contains(&needle) || p.name.to_lowercase().contains(&needle)
        });
        Ok(match found {
            Some(p) => ToolOutput::json(p),
            None => ToolOutput::text(format!("Product '{query}' not found.")),
        })
    }

    fn alternatives(&self, args: &Args) -> Result<ToolOutput, ToolError> {
        let category = args.str("category")?;
        let min_stock = args.opt_f64("min_stock")?.unwrap_or(0.0);
        let matches: Vec<&Product> = self
            .inventory
            .iter()
            .filter(|p| p.category.eq_ignore_ascii_case(category) && p.stock as f64 >= min_stock)
            .collect();
        Ok(ToolOutput::json(&matches))
    }

    fn restock(&mut self, args: &Args) -> Result<ToolOutput, ToolError> {
        let sku = args.str("sku")?;
        let quantity = args.f64("quantity")?;
        if quantity < 1.0 || quantity.fract() != 0.0 {
            return Err(ToolError::InvalidArgument(format!(
                "Quantity must be a positive whole number, got {quantity}"
            )));
        }

        let Some(p) = self.inventory.iter_mut().find(|p| p.sku == sku) else {
            return Ok(ToolOutput::text(format!("SKU {sku} not found.")));
        };
        p.stock += quantity as u64;
        tracing::info!("Restock order for {sku}: +{quantity}");
        Ok(ToolOutput::text(format!(
            "Order placed. New stock for {sku}: {}",
            p.stock
        )))
    }
}

impl Profile for SupplyChain {
    fn server_name(&self) -> &'static str {
        "supply-chain"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "check_product_stock",
                description: "Check stock level and location for a product.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "sku_or_name": {"type": "string", "description": "SKU or product name"}
                    },
                    "required": ["sku_or_name"]
                }),
            },
            ToolSpec {
                name: "find_alternative_product",
                description: "Find products in the same category with sufficient stock.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "category": {
                            "type": "string",
                            "description": "Product category (e.g. Electronics)"
                        },
                        "min_stock": {"type": "number", "description": "Minimum required stock"}
                    },
                    "required": ["category"]
                }),
            },
            ToolSpec {
                name: "place_restock_order",
                description: "Place an order for more stock.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "sku": {"type": "string", "description": "Target SKU"},
                        "quantity": {"type": "number", "description": "Amount to order"}
                    },
                    "required": ["sku", "quantity"]
                }),
            },
        ]
    }

    fn call_tool(&mut self, name: &str, args: &Args) -> Result<ToolOutput, ToolError> {
        match name {
            "check_product_stock" => self.check_stock(args),
            "find_alternative_product" => self.alternatives(args),
            "place_restock_order" => self.restock(args),
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }
}

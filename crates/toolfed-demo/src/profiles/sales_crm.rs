//! Sales CRM profile: customer profiles, interaction history, dashboard.

use super::Profile;
use crate::protocol::{Args, ResourceSpec, ResourceText, ToolError, ToolOutput, ToolSpec};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Serialize)]
struct Interaction {
    date: String,
    #[serde(rename = "type")]
    kind: &'static str,
    notes: String,
}

#[derive(Debug, Clone, Serialize)]
struct Customer {
    id: &'static str,
    name: &'static str,
    industry: &'static str,
    annual_revenue: u64,
    risk_score: &'static str,
    account_manager: &'static str,
    #[serde(skip)]
    interactions: Vec<Interaction>,
}

fn interaction(date: &str, kind: &'static str, notes: &str) -> Interaction {
    Interaction {
        date: date.to_string(),
        kind,
        notes: notes.to_string(),
    }
}

#[derive(Debug)]
pub struct SalesCrm {
    customers: Vec<Customer>,
}

impl Default for SalesCrm {
    fn default() -> Self {
        Self::new()
    }
}

impl SalesCrm {
    pub fn new() -> Self {
        Self {
            customers: vec![
                Customer {
                    id: "C001",
                    name: "Acme Corp",
                    industry: "Manufacturing",
                    annual_revenue: 1_200_000,
                    risk_score: "Low",
                    account_manager: "Kim Minsu",
                    interactions: vec![
                        interaction("2025-05-20", "Meeting", "Quarterly review; renewal on track."),
                        interaction("2025-04-02", "Email", "Asked for volume pricing on line B."),
                    ],
                },
                Customer {
                    id: "C002",
                    name: "Globex Inc",
                    industry: "Logistics",
                    annual_revenue: 850_000,
                    risk_score: "High",
                    account_manager: "Lee Jiyoung",
                    interactions: vec![
                        interaction("2025-05-28", "Call", "Complained about late deliveries."),
                        interaction("2025-05-10", "Email", "Evaluating a competitor's offer."),
                    ],
                },
                Customer {
                    id: "C003",
                    name: "Initech",
                    industry: "Software",
                    annual_revenue: 430_000,
                    risk_score: "Medium",
                    account_manager: "Park Junho",
                    interactions: vec![interaction(
                        "2025-03-15",
                        "Meeting",
                        "Pilot extended by one quarter.",
                    )],
                },
                Customer {
                    id: "C004",
                    name: "Umbrella Co",
                    industry: "Healthcare",
                    annual_revenue: 2_100_000,
                    risk_score: "High",
                    account_manager: "Kim Minsu",
                    interactions: Vec::new(),
                },
            ],
        }
    }

    /// Case-insensitive: a name fragment or the exact id.
    fn find(&self, query: &str) -> Option<&Customer> {
        let query = query.to_lowercase();
        self.customers
            .iter()
            .find(|c| c.name.to_lowercase().contains(&query) || c.id.to_lowercase() == query)
    }

    fn add_note(&mut self, args: &Args) -> Result<ToolOutput, ToolError> {
        let cust_id = args.str("cust_id")?;
        let note = args.str("note")?;
        let date = match args.opt_str("date")? {
            Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|_| {
                    ToolError::InvalidArgument(format!("Date must be YYYY-MM-DD, got '{d}'"))
                })?
                .to_string(),
            None => chrono::Local::now().format("%Y-%m-%d").to_string(),
        };

        let Some(customer) = self.customers.iter_mut().find(|c| c.id == cust_id) else {
            return Ok(ToolOutput::text(format!("Customer ID '{cust_id}' not found.")));
        };
        customer
            .interactions
            .insert(0, interaction(&date, "Meeting", note));
        tracing::info!("Meeting note added for {cust_id}");
        Ok(ToolOutput::text(format!(
            "Note added to {} successfully.",
            customer.name
        )))
    }
}

impl Profile for SalesCrm {
    fn server_name(&self) -> &'static str {
        "sales-crm"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        let lookup_schema = json!({
            "type": "object",
            "properties": {
                "cust_name_or_id": {"type": "string", "description": "Customer name or ID"}
            },
            "required": ["cust_name_or_id"]
        });
        vec![
            ToolSpec {
                name: "get_customer_profile",
                description: "Retrieve a customer profile including revenue and risk status.",
                input_schema: lookup_schema.clone(),
            },
            ToolSpec {
                name: "get_recent_interactions",
                description: "List recent notes, emails and meetings for a customer.",
                input_schema: lookup_schema,
            },
            ToolSpec {
                name: "add_meeting_note",
                description: "Log a new meeting note for a customer.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "cust_id": {"type": "string", "description": "Exact customer ID"},
                        "note": {"type": "string", "description": "Note content"},
                        "date": {"type": "string", "description": "Date YYYY-MM-DD"}
                    },
                    "required": ["cust_id", "note"]
                }),
            },
        ]
    }

    fn call_tool(&mut self, name: &str, args: &Args) -> Result<ToolOutput, ToolError> {
        match name {
            "get_customer_profile" => {
                let query = args.str("cust_name_or_id")?;
                Ok(match self.find(query) {
                    Some(customer) => ToolOutput::json(customer),
                    None => ToolOutput::text(format!("Customer '{query}' not found.")),
                })
            }
            "get_recent_interactions" => {
                let query = args.str("cust_name_or_id")?;
                Ok(match self.find(query) {
                    Some(customer) => ToolOutput::json(&customer.interactions),
                    None => ToolOutput::text(format!("Customer '{query}' not found.")),
                })
            }
            "add_meeting_note" => self.add_note(args),
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    fn resources(&self) -> Vec<ResourceSpec> {
        vec![ResourceSpec {
            uri: "sales://dashboard",
            name: "Sales Dashboard",
            description: "Overview of high-risk customers",
            mime_type: "application/json",
        }]
    }

    fn read_resource(&self, uri: &str) -> Option<ResourceText> {
        if uri != "sales://dashboard" {
            return None;
        }
        let high_risk: Vec<&str> = self
            .customers
            .iter()
            .filter(|c| c.risk_score == "High")
            .map(|c| c.name)
            .collect();
        let body = json!({
            "high_risk_customers": high_risk,
            "total_customers": self.customers.len(),
        });
        Some(ResourceText {
            mime_type: "application/json",
            text: serde_json::to_string_pretty(&body).ok()?,
        })
    }
}

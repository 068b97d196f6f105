//! HR policy profile: leave balances, leave requests, handbook search.

use super::Profile;
use crate::protocol::{Args, ToolError, ToolOutput, ToolSpec};
use serde::Serialize;
use serde_json::json;

const HANDBOOK: &str = "\
# Employee Handbook

## Vacation Policy
Full-time employees accrue 15 days of paid vacation per year. Requests of \
three days or more must be submitted two weeks in advance. Unused vacation \
carries over up to a maximum of 5 days into the next calendar year.

## Sick Leave
Employees receive 10 days of paid sick leave per year. A doctor's note is \
required for absences longer than three consecutive days. Sick leave does \
not carry over.

## Personal Leave
Up to 3 personal days per year may be used for moving, family events or \
other personal matters. Personal days must be approved by a direct manager.

## Remote Work
Employees may work remotely up to two days per week with manager approval. \
Core collaboration hours are 10:00 to 16:00 local time. Remote work from \
abroad requires HR approval in advance.

## Expense Reimbursement
Business expenses must be submitted within 30 days with itemized receipts. \
Meals during business travel are reimbursed up to the daily allowance.
";

/// Characters of each matching section shown in search results.
const PREVIEW_CHARS: usize = 200;

const LEAVE_TYPES: &[&str] = &["vacation", "sick", "personal"];

#[derive(Debug, Clone, Serialize)]
struct LeaveBalance {
    vacation: f64,
    sick: f64,
    personal: f64,
}

impl LeaveBalance {
    fn get_mut(&mut self, leave_type: &str) -> Option<&mut f64> {
        match leave_type {
            "vacation" => Some(&mut self.vacation),
            "sick" => Some(&mut self.sick),
            "personal" => Some(&mut self.personal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct LeaveRequest {
    #[serde(rename = "type")]
    leave_type: String,
    days: f64,
    status: &'static str,
}

#[derive(Debug, Clone)]
struct Employee {
    id: &'static str,
    leave_balance: LeaveBalance,
    pending_requests: Vec<LeaveRequest>,
}

fn employee(id: &'static str, vacation: f64, sick: f64, personal: f64) -> Employee {
    Employee {
        id,
        leave_balance: LeaveBalance {
            vacation,
            sick,
            personal,
        },
        pending_requests: Vec::new(),
    }
}

/// Sections of the handbook mentioning `query`, each cut to a preview.
fn search_handbook(query: &str) -> String {
    let needle = query.to_lowercase();
    let results: Vec<String> = HANDBOOK
        .split("## ")
        .filter(|block| block.to_lowercase().contains(&needle))
        .map(|block| {
            let preview: String = block.chars().take(PREVIEW_CHARS).collect();
            format!("## {preview}...")
        })
        .collect();

    if results.is_empty() {
        return "No specific policy found matching query.".to_string();
    }
    results.join("\n\n")
}

#[derive(Debug)]
pub struct HrPolicy {
    employees: Vec<Employee>,
}

impl Default for HrPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl HrPolicy {
    pub fn new() -> Self {
        Self {
            employees: vec![
                employee("E001", 15.0, 10.0, 3.0),
                employee("E002", 8.0, 5.0, 2.0),
                employee("E003", 0.0, 7.0, 1.0),
            ],
        }
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Employee> {
        self.employees.iter_mut().find(|e| e.id == id)
    }

    fn balance(&mut self, args: &Args) -> Result<ToolOutput, ToolError> {
        let id = args.str("employee_id")?;
        Ok(match self.find_mut(id) {
            Some(emp) => ToolOutput::json(&emp.leave_balance),
            None => ToolOutput::text("Employee not found."),
        })
    }

    fn submit(&mut self, args: &Args) -> Result<ToolOutput, ToolError> {
        let id = args.str("employee_id")?;
        let leave_type = args.str("type")?;
        let days = args.f64("days")?;

        if !LEAVE_TYPES.contains(&leave_type) {
            return Err(ToolError::InvalidArgument(format!(
                "Leave type must be one of {}, got '{leave_type}'",
                LEAVE_TYPES.join(", ")
            )));
        }
        if days <= 0.0 {
            return Err(ToolError::InvalidArgument(format!(
                "Days must be positive, got {days}"
            )));
        }

        let Some(emp) = self.find_mut(id) else {
            return Ok(ToolOutput::text("Employee not found."));
        };
        let Some(balance) = emp.leave_balance.get_mut(leave_type) else {
            return Err(ToolError::InvalidArgument(format!(
                "Unknown leave type '{leave_type}'"
            )));
        };

        if *balance < days {
            return Ok(ToolOutput::text(format!(
                "Insufficient balance. Available: {balance}"
            )));
        }
        *balance -= days;
        let remaining = *balance;
        emp.pending_requests.push(LeaveRequest {
            leave_type: leave_type.to_string(),
            days,
            status: "Pending",
        });
        tracing::info!("{id} requested {days} {leave_type} days");
        Ok(ToolOutput::text(format!(
            "Request submitted. New {leave_type} balance: {remaining}"
        )))
    }
}

impl Profile for HrPolicy {
    fn server_name(&self) -> &'static str {
        "hr-concierge"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "get_employee_balance",
                description: "Check leave balance for an employee.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "employee_id": {"type": "string", "description": "Employee ID"}
                    },
                    "required": ["employee_id"]
                }),
            },
            ToolSpec {
                name: "search_policy_docs",
                description: "Search the company handbook for policies.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Keywords (e.g. 'vacation', 'remote')"
                        }
                    },
                    "required": ["query"]
                }),
            },
            ToolSpec {
                name: "submit_leave_request",
                description: "Submit a leave request and deduct it from the balance.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "employee_id": {"type": "string", "description": "Employee ID"},
                        "type": {
                            "type": "string",
                            "enum": LEAVE_TYPES,
                            "description": "Leave type"
                        },
                        "days": {"type": "number", "description": "Number of days"}
                    },
                    "required": ["employee_id", "type", "days"]
                }),
            },
        ]
    }

    fn call_tool(&mut self, name: &str, args: &Args) -> Result<ToolOutput, ToolError> {
        match name {
            "get_employee_balance" => self.balance(args),
            "search_policy_docs" => Ok(ToolOutput::text(search_handbook(args.str("query")?))),
            "submit_leave_request" => self.submit(args),
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }
}

//! Validate command - run the form validator from the command line

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use bankfront_core::domain::form::SubmitDecision;
use bankfront_core::services::ValidationService;
use bankfront_core::{FormKind, FormState, OperationResult};
use colored::Colorize;

use super::{get_event_log, log_command};
use crate::output;

/// Parse `FIELD=VALUE` pairs; the value may be empty or contain `=`
fn parse_fields(pairs: &[String]) -> Result<FormState> {
    let mut form = FormState::new();
    for pair in pairs {
        let (field, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected FIELD=VALUE, got {:?}", pair))?;
        if field.is_empty() {
            return Err(anyhow!("Empty field name in {:?}", pair));
        }
        form.set(field, value);
    }
    Ok(form)
}

fn decide(form_name: &str, pairs: &[String]) -> Result<(FormKind, SubmitDecision)> {
    let kind = FormKind::parse(form_name)
        .ok_or_else(|| anyhow!("Unknown form {:?} (expected login, signup, payment or deposit)", form_name))?;
    let form = parse_fields(pairs)?;
    let today = chrono::Utc::now().date_naive();
    Ok((kind, ValidationService::new().validate(kind, &form, today)))
}

/// JSON envelope: failed with the first reason when the form is blocked
fn report(kind: FormKind, decision: SubmitDecision) -> OperationResult<SubmitDecision> {
    let context = HashMap::from([
        ("form".to_string(), serde_json::json!(kind.as_str())),
        ("error_count".to_string(), serde_json::json!(decision.errors.len())),
    ]);
    let result = match decision.reason() {
        None => OperationResult::ok(decision),
        Some(reason) => OperationResult::fail_with_data(decision, reason),
    };
    result.with_context(context)
}

pub fn run(form_name: &str, pairs: &[String], json: bool) -> Result<()> {
    log_command(&get_event_log(), "validate");

    let (kind, decision) = decide(form_name, pairs)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report(kind, decision))?);
        return Ok(());
    }

    if decision.proceed {
        output::success(&format!("{} form would submit", kind.as_str()));
        return Ok(());
    }

    output::warning(&format!("{} form blocked", kind.as_str()));
    let mut table = output::create_table();
    table.set_header(vec!["Field", "Violation", "Message"]);
    for err in &decision.errors {
        table.add_row(vec![
            err.field.clone(),
            format!("{:?}", err.violation),
            err.message.clone(),
        ]);
    }
    println!("{}", table);
    if decision.show_alert {
        println!("{}", "Passwords do not match".red().bold());
    }
    Ok(())
}

//! Token command - mint idempotency tokens for manual submissions

use anyhow::Result;
use bankfront_core::{IdempotencyToken, OperationResult};

use super::{get_event_log, log_command};

/// Mint `count` tokens, each distinct from the one before it
fn mint(count: usize) -> Vec<IdempotencyToken> {
    let mut tokens: Vec<IdempotencyToken> = Vec::with_capacity(count);
    for _ in 0..count {
        let next = match tokens.last() {
            Some(previous) => IdempotencyToken::regenerate(previous),
            None => IdempotencyToken::generate(),
        };
        tokens.push(next);
    }
    tokens
}

pub fn run(count: usize, json: bool) -> Result<()> {
    log_command(&get_event_log(), "token");

    let tokens = mint(count);
    if json {
        println!("{}", serde_json::to_string_pretty(&OperationResult::ok(tokens))?);
    } else {
        for token in tokens {
            println!("{}", token);
        }
    }
    Ok(())
}

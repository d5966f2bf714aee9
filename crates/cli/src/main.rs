//! `momo` command line tool
//!
//! Thin front end over `MomoClient`. Results go to stdout as JSON, logs go
//! to stderr.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use momo_core::dispatch::{for_product, OPERATIONS};
use momo_domain::{MomoConfig, OperationCall, Product};
use momo_infra::{config, MomoClient};
use serde_json::{json, Value};

mod cli;
mod logging;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();

    if let Err(e) = logging::init(args.log_json) {
        eprintln!("Failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Cli) -> anyhow::Result<()> {
    if let Commands::Operations { product } = &args.command {
        return print_json(&operations_listing(*product));
    }

    let config = load_config(&args)?;
    let client = MomoClient::from_config(config).context("failed to build client")?;
    let credentials = client.credentials();

    match args.command {
        Commands::Provision { user_id, show_key } => {
            let api_user_id = credentials
                .ensure_api_user(user_id.as_deref())
                .await
                .context("failed to provision API user")?;
            let api_key = credentials.ensure_api_key().await.context("failed to provision API key")?;

            let mut output = json!({ "apiUserId": api_user_id });
            if show_key {
                output["apiKey"] = Value::String(api_key.expose().to_string());
            }
            print_json(&output)
        }
        Commands::Token { product, show_value } => {
            let token = client
                .token(product)
                .await
                .with_context(|| format!("failed to obtain {product} token"))?;
            let mut output = json!({
                "product": product.as_str(),
                "expiresAt": token.expires_at().to_rfc3339(),
            });
            if show_value {
                output["accessToken"] = Value::String(token.value().to_string());
            }
            print_json(&output)
        }
        Commands::TokenStatus => {
            let mut statuses = serde_json::Map::new();
            for product in Product::ALL {
                let status = credentials.token_status(product).await;
                statuses.insert(product.as_str().to_string(), serde_json::to_value(&status)?);
            }
            print_json(&Value::Object(statuses))
        }
        Commands::UserInfo { user_id } => {
            let info = credentials
                .api_user_info(user_id.as_deref())
                .await
                .context("failed to fetch API user")?;
            match info {
                Some(info) => print_json(&serde_json::to_value(info)?),
                None => anyhow::bail!("API user not found"),
            }
        }
        Commands::Call { name, params, query, body, reference_id } => {
            let call = build_call(params, query, body.as_deref(), reference_id)?;
            let response =
                client.invoke(&name, call).await.with_context(|| format!("{name} failed"))?;
            print_json(&json!({
                "status": response.status,
                "referenceId": response.reference_id,
                "body": response.body,
            }))
        }
        Commands::Operations { .. } => Ok(()),
    }
}

fn load_config(args: &Cli) -> anyhow::Result<MomoConfig> {
    match &args.config {
        Some(path) => config::load_from_file(Some(path.clone()))
            .with_context(|| format!("failed to load {}", path.display())),
        None => config::load().context("failed to load configuration"),
    }
}

fn build_call(
    params: Vec<(String, String)>,
    query: Vec<(String, String)>,
    body: Option<&str>,
    reference_id: Option<String>,
) -> anyhow::Result<OperationCall> {
    let mut call = OperationCall::new();
    for (name, value) in params {
        call = call.path_param(name, value);
    }
    for (name, value) in query {
        call = call.query_param(name, value);
    }
    if let Some(raw) = body {
        let body: Value = serde_json::from_str(raw).context("--body is not valid JSON")?;
        call = call.body(body);
    }
    if let Some(reference_id) = reference_id {
        call = call.with_reference_id(reference_id);
    }
    Ok(call)
}

fn operations_listing(product: Option<Product>) -> Value {
    let operations: Vec<Value> = match product {
        Some(product) => for_product(product).collect::<Vec<_>>(),
        None => OPERATIONS.iter().collect(),
    }
    .into_iter()
    .map(|op| {
        json!({
            "name": op.name,
            "method": op.method.to_string(),
            "path": op.path,
            "params": op.placeholders(),
            "mutating": op.mutating,
        })
    })
    .collect();
    Value::Array(operations)
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_collects_params_query_and_body() {
        let call = build_call(
            vec![("referenceId".into(), "abc".into())],
            vec![("page".into(), "1".into())],
            Some(r#"{"amount":"5"}"#),
            Some("ref-1".into()),
        )
        .unwrap();

        assert_eq!(call.path_params.get("referenceId").map(String::as_str), Some("abc"));
        assert_eq!(call.query, vec![("page".to_string(), "1".to_string())]);
        assert_eq!(call.body, Some(json!({"amount": "5"})));
        assert_eq!(call.reference_id.as_deref(), Some("ref-1"));
    }

    #[test]
    fn call_rejects_malformed_body() {
        let err = build_call(vec![], vec![], Some("{amount"), None).unwrap_err();
        assert!(err.to_string().contains("--body"));
    }

    #[test]
    fn listing_filters_by_product() {
        let all = operations_listing(None);
        assert_eq!(all.as_array().map(Vec::len), Some(OPERATIONS.len()));

        let widget = operations_listing(Some(Product::Widget));
        let names: Vec<&str> = widget
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|op| op["name"].as_str())
            .collect();
        assert!(!names.is_empty());
        assert!(names.iter().all(|name| name.starts_with("widget.")));
    }
}

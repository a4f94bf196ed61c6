use platform_tasks::{App, ToolError};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[derive(Debug, Deserialize)]
struct Invocation {
    task: String,
    #[serde(default)]
    args: Value,
}

async fn run() -> Result<Value, ToolError> {
    let mut raw = String::new();
    tokio::io::stdin().read_to_string(&mut raw).await?;
    let invocation: Invocation = serde_json::from_str(&raw).map_err(|err| {
        ToolError::validation(format!("invalid invocation JSON: {}", err))
            .with_hint("Expected {\"task\": \"<name>\", \"args\": {...}} on stdin")
    })?;

    let app = App::initialize()?;
    app.tool_executor
        .execute(&invocation.task, invocation.args)
        .await
}

async fn emit(value: &Value) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(value.to_string().as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(result) => {
            if let Err(err) = emit(&result).await {
                eprintln!("platform-tasks: {}", err);
                std::process::exit(1);
            }
        }
        Err(err) => {
            let payload = serde_json::json!({
                "failed": true,
                "msg": err.message,
                "error": err.to_value(),
            });
            let _ = emit(&payload).await;
            eprintln!("platform-tasks: {}", err);
            std::process::exit(1);
        }
    }
}

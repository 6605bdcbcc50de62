pub mod config;
pub mod doctor;
pub mod migrate;
pub mod seed;

/// Structured output of one CLI command: a printable body plus the process
/// exit code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let output = serde_json::json!({
            "command": command,
            "status": "ok",
            "message": message.into(),
        });
        Self { exit_code: 0, output: output.to_string() }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let output = serde_json::json!({
            "command": command,
            "status": "error",
            "error_class": error_class,
            "message": message.into(),
        });
        Self { exit_code, output: output.to_string() }
    }
}

pub(crate) fn block_on<F, T>(command: &str, future: F) -> Result<T, CommandResult>
where
    F: std::future::Future<Output = T>,
{
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(
        |error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        },
    )?;

    Ok(runtime.block_on(future))
}

#[cfg(test)]
mod tests {
    use super::CommandResult;

    #[test]
    fn results_serialize_as_json_with_status() {
        let ok = CommandResult::success("migrate", "applied pending migrations");
        let parsed: serde_json::Value = serde_json::from_str(&ok.output).expect("json");
        assert_eq!(parsed["status"], "ok");
        assert_eq!(ok.exit_code, 0);

        let err = CommandResult::failure("doctor", "db_connectivity", "no database", 4);
        let parsed: serde_json::Value = serde_json::from_str(&err.output).expect("json");
        assert_eq!(parsed["error_class"], "db_connectivity");
        assert_eq!(err.exit_code, 4);
    }
}

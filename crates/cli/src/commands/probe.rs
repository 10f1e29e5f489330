use anyhow::{Context, Result};
use std::fmt::Write;

use probe::{ProbeConfig, ProbeReport};

pub struct ProbeArgs {
    pub command: Option<String>,
    pub args: Vec<String>,
    pub settle_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
}

/// Flags win over the configured server
///
/// A `--command` replaces the configured argument list, even when no
/// `--arg` is given.
pub fn resolve_config(args: ProbeArgs, base: &ProbeConfig) -> ProbeConfig {
    let mut config = base.clone();
    match args.command {
        Some(command) => {
            config.command = command;
            config.args = args.args;
        }
        None if !args.args.is_empty() => config.args = args.args,
        None => {}
    }
    if let Some(ms) = args.settle_ms {
        config.settle_ms = ms;
    }
    if let Some(ms) = args.timeout_ms {
        config.response_timeout_ms = ms;
    }
    config
}

pub async fn handle_probe(args: ProbeArgs, base: &ProbeConfig) -> Result<()> {
    let config = resolve_config(args, base);

    println!("Connecting to MCP server...");
    println!("Command: {}", config.command_line());

    let report = probe::run_probe(&config)
        .await
        .with_context(|| format!("Probe of '{}' failed", config.command))?;

    print!("{}", format_report(&report, &config));
    Ok(())
}

/// Cut `text` to at most `width` characters
pub fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

pub fn format_report(report: &ProbeReport, config: &ProbeConfig) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n=== Test 1: Initialize ===");
    let Some(server) = &report.server else {
        let _ = writeln!(out, "Initialize failed");
        if let Some(error) = &report.initialize_error {
            let _ = writeln!(out, "  Error: {}", error);
        }
        write_stop(&mut out, report);
        return out;
    };
    let _ = writeln!(out, "Initialize successful");
    let _ = writeln!(
        out,
        "  Server: {} v{}",
        server.server_info.name.as_deref().unwrap_or("Unknown"),
        server.server_info.version.as_deref().unwrap_or("Unknown")
    );
    if let Some(version) = &server.protocol_version {
        let _ = writeln!(out, "  Protocol: {}", version);
    }

    let _ = writeln!(out, "\n=== Test 2: List Tools ===");
    if report.tools_listed {
        let _ = writeln!(out, "Found {} tools", report.tools.len());
        for tool in report.tools.iter().take(config.tool_preview_count) {
            let description = tool.description.as_deref().unwrap_or("No description");
            let _ = writeln!(
                out,
                "  - {}: {}...",
                tool.name.as_deref().unwrap_or("Unknown"),
                truncate(description, config.description_width)
            );
        }
    } else {
        let _ = writeln!(out, "List tools failed");
    }

    if let Some(call) = &report.tool_call {
        let _ = writeln!(out, "\n=== Test 3: Call Tool '{}' ===", call.tool);
        if call.success {
            let _ = writeln!(out, "Tool call '{}' successful", call.tool);
            if let Some(text) = &call.text {
                let _ = writeln!(out, "  Result preview: {}...", truncate(text, config.preview_width));
            }
        } else {
            let _ = writeln!(out, "Tool call '{}' failed", call.tool);
            if let Some(error) = &call.error {
                let _ = writeln!(out, "  Error: {}", error);
            }
        }
    }

    write_stop(&mut out, report);
    let _ = writeln!(out, "\n=== MCP Server Test Complete ===");
    out
}

fn write_stop(out: &mut String, report: &ProbeReport) {
    if let Some(step) = report.stopped_at {
        let _ = writeln!(out, "\nStopped at {}", step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use probe::protocol::{Error as RpcError, InitializeResult, ServerInfo};
    use probe::{Step, ToolCallOutcome, ToolDescriptor};

    fn tool(name: &str, description: Option<&str>) -> ToolDescriptor {
        ToolDescriptor {
            name: Some(name.to_string()),
            description: description.map(str::to_string),
        }
    }

    fn initialized() -> ProbeReport {
        ProbeReport {
            server: Some(InitializeResult {
                protocol_version: Some("2024-11-05".to_string()),
                server_info: ServerInfo {
                    name: Some("prompt-alchemy".to_string()),
                    version: Some("1.0.0".to_string()),
                },
            }),
            tools_listed: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("héllo wörld", 5), "héllo");
        assert_eq!(truncate("short", 80), "short");
        assert_eq!(truncate("", 3), "");
    }

    #[test]
    fn test_resolve_command_replaces_args() {
        let base = ProbeConfig::default();
        let config = resolve_config(
            ProbeArgs {
                command: Some("./server".to_string()),
                args: vec![],
                settle_ms: Some(0),
                timeout_ms: None,
            },
            &base,
        );
        assert_eq!(config.command_line(), "./server");
        assert_eq!(config.settle_ms, 0);
        assert_eq!(config.response_timeout_ms, base.response_timeout_ms);
    }

    #[test]
    fn test_resolve_args_only() {
        let config = resolve_config(
            ProbeArgs {
                command: None,
                args: vec!["exec".to_string(), "-i".to_string(), "other".to_string()],
                settle_ms: None,
                timeout_ms: Some(1000),
            },
            &ProbeConfig::default(),
        );
        assert_eq!(config.command_line(), "docker exec -i other");
        assert_eq!(config.response_timeout_ms, 1000);
    }

    #[test]
    fn test_full_report() {
        let mut report = initialized();
        let long = "x".repeat(120);
        report.tools = (0..7).map(|i| tool(&format!("tool_{}", i), Some(&long))).collect();
        report.tools.push(tool("bare", None));
        report.tool_call = Some(ToolCallOutcome {
            tool: "tool_0".to_string(),
            success: true,
            text: Some("y".repeat(300)),
            error: None,
        });

        let out = format_report(&report, &ProbeConfig::default());
        assert!(out.contains("Initialize successful\n  Server: prompt-alchemy v1.0.0\n"));
        assert!(out.contains("Found 8 tools\n"));
        assert_eq!(out.matches("  - tool_").count(), 5);
        assert!(out.contains(&format!("  - tool_0: {}...\n", "x".repeat(80))));
        assert!(out.contains("=== Test 3: Call Tool 'tool_0' ==="));
        assert!(out.contains(&format!("  Result preview: {}...\n", "y".repeat(200))));
        assert!(out.ends_with("=== MCP Server Test Complete ===\n"));
        assert!(!out.contains("Stopped at"));
    }

    #[test]
    fn test_failed_initialize_stops_report() {
        let report = ProbeReport {
            initialize_error: Some(RpcError::new(-32600, "bad request")),
            stopped_at: Some(Step::Initialize),
            ..Default::default()
        };

        let out = format_report(&report, &ProbeConfig::default());
        assert!(out.contains("Initialize failed\n  Error: bad request (code -32600)\n"));
        assert!(out.ends_with("\nStopped at initialize\n"));
        assert!(!out.contains("Test 2"));
        assert!(!out.contains("Complete"));
    }

    #[test]
    fn test_failed_tool_call() {
        let mut report = initialized();
        report.tools = vec![tool("generate_prompts", Some("Generate prompts"))];
        report.tool_call = Some(ToolCallOutcome {
            tool: "generate_prompts".to_string(),
            success: false,
            text: None,
            error: Some(RpcError::new(-32602, "missing input")),
        });
        report.stopped_at = Some(Step::CallTool);

        let out = format_report(&report, &ProbeConfig::default());
        assert!(out.contains("  - generate_prompts: Generate prompts...\n"));
        assert!(out.contains("Tool call 'generate_prompts' failed\n  Error: missing input (code -32602)\n"));
        assert!(out.contains("\nStopped at tools/call\n"));
    }

    #[test]
    fn test_no_tools_skips_call() {
        let out = format_report(&initialized(), &ProbeConfig::default());
        assert!(out.contains("Found 0 tools\n"));
        assert!(!out.contains("Test 3"));
    }
}

//! TOML parser with line context in error messages

use std::path::Path;

use anyhow::{Context, Result};

use super::schema::SkillregConfig;

/// Parse skillreg.toml
pub fn parse_config(path: &Path) -> Result<SkillregConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse skillreg.toml content from string
pub fn parse_config_str(content: &str) -> Result<SkillregConfig> {
    let config: SkillregConfig =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;
    config.validate()?;
    Ok(config)
}

fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let message = error.message().to_string();
    let line = error.span().map(|span| {
        let before = content.get(..span.start).unwrap_or(content);
        before.matches('\n').count() + 1
    });

    match line {
        Some(line) => anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line,
            line_context(content, line),
            message
        ),
        None => anyhow::anyhow!("TOML parsing error: {}", message),
    }
}

/// Lines around `line_num`, with the offending line marked.
fn line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 1).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize a configuration to TOML
pub fn to_toml(config: &SkillregConfig) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize configuration to TOML")
}

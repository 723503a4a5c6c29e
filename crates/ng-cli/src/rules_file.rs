use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::time::Instant;

use ng_compiler::{compile_rule_lists, Base, CompileStats};
use ng_core::GateRules;

#[derive(Debug, Clone)]
pub struct CompileSummary {
    pub stats: CompileStats,
    pub total_ms: f64,
}

impl CompileSummary {
    pub fn lines(&self) -> usize {
        self.stats.lists.iter().map(|l| l.lines).sum()
    }
}

/// Rule table selected by `--rules`, or the built-in one.
pub fn load_rules(path: Option<&str>) -> Result<Cow<'static, GateRules>, String> {
    let Some(path) = path else {
        return Ok(Cow::Borrowed(GateRules::builtin()));
    };

    let text = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    let rules = GateRules::from_json(&text)
        .map_err(|e| format!("Invalid rule table '{}': {}", path, e))?;
    Ok(Cow::Owned(rules))
}

pub fn compile_rules(inputs: &[String], base: Base, verbose: bool) -> Result<(GateRules, CompileSummary), String> {
    if inputs.is_empty() {
        return Err("No input files specified".to_string());
    }

    let start = Instant::now();
    let mut texts = Vec::with_capacity(inputs.len());
    for path in inputs {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
        texts.push(content);
    }
    let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();

    let (rules, stats) = compile_rule_lists(&text_refs, base).map_err(|e| match inputs.get(e.list) {
        Some(path) => format!("{}: {}", path, e.source),
        None => e.to_string(),
    })?;

    if verbose {
        for (list_id, (path, list)) in inputs.iter().zip(&stats.lists).enumerate() {
            println!(
                "  [{}] {} - {} lines, {} -> {} entries",
                list_id,
                Path::new(path).file_name().unwrap_or_default().to_string_lossy(),
                list.lines,
                list.entries_before,
                list.entries_after
            );
        }
    }

    let total_ms = start.elapsed().as_secs_f64() * 1000.0;
    Ok((rules, CompileSummary { stats, total_ms }))
}

pub fn write_rules(path: &Path, rules: &GateRules) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create '{}': {}", parent.display(), e))?;
        }
    }
    let json = rules
        .to_json()
        .map_err(|e| format!("Failed to serialize rule table: {}", e))?;
    fs::write(path, json)
        .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
    Ok(())
}

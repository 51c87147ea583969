//! Renders the TypeScript declaration file describing a project's library.

use std::fmt::Write;

use serde_json::Value;

use super::library::{SystemPrompt, SystemState, SystemVariable, VariableType};

const HEADER: &str = "// This file is generated by promptsync. Do not edit it by hand.\n";

pub fn render_types(state: &SystemState) -> String {
    let mut prompts: Vec<&SystemPrompt> = state.prompts.iter().collect();
    prompts.sort_by(|a, b| a.slug.cmp(&b.slug));

    let mut out = String::from(HEADER);
    out.push_str("\nexport type PromptLibrary = {\n");
    out.push_str("  prompts: {\n");
    for prompt in prompts {
        render_prompt(&mut out, prompt);
    }
    out.push_str("  };\n");
    let _ = writeln!(out, "  globals: {};", ts_type(&state.globals.content, 2));
    out.push_str("};\n\nexport default PromptLibrary;\n");
    out
}

fn render_prompt(out: &mut String, prompt: &SystemPrompt) {
    let _ = writeln!(out, "    {}: {{", quote(&prompt.slug));
    let _ = writeln!(
        out,
        "      metadata: {{ uuid: {}; name: {}; slug: {}; latestVersion: {}; }};",
        quote(&prompt.uuid.to_string()),
        quote(&prompt.name),
        quote(&prompt.slug),
        prompt
            .latest_version()
            .map(quote)
            .unwrap_or_else(|| "null".to_string())
    );
    out.push_str("      versions: {\n");

    let mut versions: Vec<_> = prompt.versions.iter().filter(|v| !v.is_archived()).collect();
    versions.sort_by(|a, b| super::library::compare_versions(&a.version, &b.version));
    for version in versions {
        let _ = writeln!(out, "        {}: {{", quote(&version.version));
        let _ = writeln!(out, "          uuid: {};", quote(&version.uuid.to_string()));
        let _ = writeln!(
            out,
            "          status: {};",
            quote(status_label(version.status))
        );
        let _ = writeln!(out, "          variables: {};", variables_type(&version.variables));
        let config = version.config.clone().unwrap_or(Value::Null);
        let _ = writeln!(out, "          config: {};", ts_type(&config, 5));
        out.push_str("        };\n");
    }
    out.push_str("      };\n");
    out.push_str("    };\n");
}

fn status_label(status: super::library::VersionStatus) -> &'static str {
    use super::library::VersionStatus::*;
    match status {
        Draft => "DRAFT",
        Published => "PUBLISHED",
        Archived => "ARCHIVED",
    }
}

fn variables_type(variables: &[SystemVariable]) -> String {
    if variables.is_empty() {
        return "{}".to_string();
    }
    let mut sorted: Vec<&SystemVariable> = variables.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    let fields: Vec<String> = sorted
        .iter()
        .map(|v| {
            let optional = if v.required { "" } else { "?" };
            let ty = match v.var_type {
                VariableType::String => "string",
                VariableType::Number => "number",
                VariableType::Boolean => "boolean",
                VariableType::Json => "any",
            };
            format!("{}{}: {};", v.name, optional, ty)
        })
        .collect();
    format!("{{ {} }}", fields.join(" "))
}

/// Literal type of a JSON value, indented for nesting at `depth`.
fn ts_type(value: &Value, depth: usize) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(items) => match items.first() {
            Some(first) => format!("Array<{}>", ts_type(first, depth)),
            None => "any[]".to_string(),
        },
        Value::Object(map) if map.is_empty() => "{}".to_string(),
        Value::Object(map) => {
            let indent = "  ".repeat(depth + 1);
            let mut out = String::from("{\n");
            for (key, inner) in map {
                let _ = writeln!(out, "{}{}: {};", indent, quote(key), ts_type(inner, depth + 1));
            }
            out.push_str(&"  ".repeat(depth));
            out.push('}');
            out
        }
    }
}

fn quote(raw: &str) -> String {
    format!("'{}'", raw.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::library::{SystemGlobals, SystemVersion, VersionStatus};
    use chrono::{DateTime, Utc};
    use serde_json::json;
    use uuid::Uuid;

    fn state() -> SystemState {
        let variable = |name: &str, var_type, required| SystemVariable {
            uuid: Uuid::nil(),
            name: name.to_string(),
            var_type,
            required,
            default_value: None,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        };
        let version = |v: &str, status| SystemVersion {
            id: 1,
            uuid: Uuid::nil(),
            version: v.to_string(),
            status,
            config: Some(json!({"model": "gpt", "temperature": 0.5})),
            content: "{{ name }}".to_string(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
            last_sync_git_sha: None,
            last_sync_content_sha: None,
            last_sync_variables_sha: None,
            variables: vec![
                variable("name", VariableType::String, true),
                variable("count", VariableType::Number, false),
            ],
        };
        SystemState {
            prompts: vec![SystemPrompt {
                id: 1,
                uuid: Uuid::nil(),
                slug: "greeting".to_string(),
                name: "Greeting".to_string(),
                created_at: DateTime::<Utc>::UNIX_EPOCH,
                updated_at: DateTime::<Utc>::UNIX_EPOCH,
                last_sync_git_sha: None,
                versions: vec![
                    version("0.0.1", VersionStatus::Published),
                    version("0.0.2", VersionStatus::Archived),
                ],
            }],
            globals: SystemGlobals {
                id: 1,
                content: json!({"company": "Acme"}),
                updated_at: DateTime::<Utc>::UNIX_EPOCH,
                last_sync_git_sha: None,
            },
        }
    }

    #[test]
    fn renders_prompts_variables_and_globals() {
        let rendered = render_types(&state());
        assert!(rendered.starts_with(HEADER));
        assert!(rendered.contains("'greeting': {"));
        assert!(rendered.contains("latestVersion: '0.0.1';"));
        assert!(rendered.contains("variables: { count?: number; name: string; };"));
        assert!(rendered.contains("'company': string;"));
        assert!(rendered.contains("export default PromptLibrary;"));
    }

    #[test]
    fn archived_versions_are_left_out() {
        let rendered = render_types(&state());
        assert!(rendered.contains("'0.0.1': {"));
        assert!(!rendered.contains("'0.0.2'"));
    }

    #[test]
    fn output_is_deterministic() {
        assert_eq!(render_types(&state()), render_types(&state()));
    }
}

//! Tool Catalog
//!
//! Each tool maps validated arguments onto one fixed argument-vector template
//! for the delegated binary. No tool does any work itself.

use crate::gateway::ExecutionRequest;
use crate::mcp::protocol::{McpError, Tool};
use serde_json::{json, Map, Value};

/// Builds the argument vector from validated arguments
type ArgvBuilder = fn(&ToolArgs) -> Vec<String>;

/// Arguments of one call, after schema validation
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    values: Map<String, Value>,
}

impl ToolArgs {
    /// A string argument; empty strings count as absent
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// A string argument with a fallback
    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }
}

/// One declared string parameter
#[derive(Debug, Clone, Copy)]
struct Param {
    name: &'static str,
    description: &'static str,
    default: Option<&'static str>,
    required: bool,
}

impl Param {
    const fn optional(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            default: None,
            required: false,
        }
    }

    const fn with_default(
        name: &'static str,
        description: &'static str,
        default: &'static str,
    ) -> Self {
        Self {
            name,
            description,
            default: Some(default),
            required: false,
        }
    }

    const fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            default: None,
            required: true,
        }
    }
}

/// A named tool and its argument-vector template
#[derive(Debug, Clone)]
pub struct ToolSpec {
    name: &'static str,
    description: &'static str,
    params: Vec<Param>,
    build: ArgvBuilder,
}

impl ToolSpec {
    pub fn name(&self) -> &str {
        self.name
    }

    /// JSON Schema for the tool's arguments
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            let mut prop = json!({"type": "string", "description": param.description});
            if let Some(default) = param.default {
                prop["default"] = json!(default);
            }
            properties.insert(param.name.to_string(), prop);
        }

        let mut schema = json!({"type": "object", "properties": properties});
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }

    /// Protocol-level tool definition
    pub fn definition(&self) -> Tool {
        Tool {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema(),
        }
    }

    /// Check raw call arguments against the declared parameters
    ///
    /// `null` is treated as an empty object. Undeclared properties are ignored.
    pub fn validate(&self, arguments: &Value) -> Result<ToolArgs, McpError> {
        let values = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            other => {
                return Err(McpError::invalid_params(format!(
                    "Arguments for '{}' must be an object, got {}",
                    self.name,
                    json_type(other)
                )))
            }
        };

        for param in &self.params {
            match values.get(param.name) {
                None | Some(Value::Null) if param.required => {
                    return Err(McpError::invalid_params(format!(
                        "Missing required argument '{}' for '{}'",
                        param.name, self.name
                    )));
                }
                None | Some(Value::Null) | Some(Value::String(_)) => {}
                Some(other) => {
                    return Err(McpError::invalid_params(format!(
                        "Argument '{}' for '{}' must be a string, got {}",
                        param.name,
                        self.name,
                        json_type(other)
                    )));
                }
            }
        }

        Ok(ToolArgs { values })
    }

    /// Validate arguments and build the gateway request
    pub fn request(&self, arguments: &Value) -> Result<ExecutionRequest, McpError> {
        let args = self.validate(arguments)?;
        Ok(ExecutionRequest::new((self.build)(&args)))
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// Append `flag value` when the argument is present
fn push_opt(mut base: Vec<String>, flag: &str, value: Option<&str>) -> Vec<String> {
    if let Some(value) = value {
        base.push(flag.to_string());
        base.push(value.to_string());
    }
    base
}

/// The fixed catalog of tools
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolSpec>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create the registry with every built-in tool
    pub fn new() -> Self {
        let module = Param::optional("module", "Buf module to operate on");
        let venv = Param::with_default("path", "Virtual environment path", ".venv");

        let tools = vec![
            // Git
            ToolSpec {
                name: "git_status",
                description: "Show git status",
                params: vec![],
                build: |_| argv(&["git", "status"]),
            },
            ToolSpec {
                name: "git_add",
                description: "git add <pattern> (default '.')",
                params: vec![Param::with_default("pattern", "Pathspec to stage", ".")],
                build: |a| argv(&["git", "add", a.get_or("pattern", ".")]),
            },
            ToolSpec {
                name: "git_commit",
                description: "git commit -m <message>",
                params: vec![Param::required("message", "Commit message")],
                build: |a| argv(&["git", "commit", "-m", a.get_or("message", "")]),
            },
            ToolSpec {
                name: "git_push",
                description: "git push",
                params: vec![],
                build: |_| argv(&["git", "push"]),
            },
            // Buf
            ToolSpec {
                name: "buf_generate",
                description: "buf generate [--module <name>]",
                params: vec![module],
                build: |a| push_opt(argv(&["buf", "generate"]), "--module", a.get("module")),
            },
            ToolSpec {
                name: "buf_lint",
                description: "buf lint [--module <name>]",
                params: vec![module],
                build: |a| push_opt(argv(&["buf", "lint"]), "--module", a.get("module")),
            },
            // Python
            ToolSpec {
                name: "py_venv_ensure",
                description: "Create or reuse a Python venv at path (default .venv)",
                params: vec![venv],
                build: |a| argv(&["python", "venv", "ensure", "--path", a.get_or("path", ".venv")]),
            },
            ToolSpec {
                name: "py_venv_remove",
                description: "Remove the Python venv at path (default .venv)",
                params: vec![venv],
                build: |a| argv(&["python", "venv", "remove", "--path", a.get_or("path", ".venv")]),
            },
            ToolSpec {
                name: "py_pip_install",
                description: "Install dependencies via pip inside venv (optional requirements)",
                params: vec![Param::optional("requirements", "Requirements file path")],
                build: |a| {
                    push_opt(
                        argv(&["python", "pip", "install"]),
                        "--requirements",
                        a.get("requirements"),
                    )
                },
            },
            ToolSpec {
                name: "py_pytest",
                description: "Run pytest via safe-ai-util (args optional)",
                params: vec![Param::optional(
                    "args",
                    "Extra pytest arguments, whitespace separated",
                )],
                build: |a| {
                    let mut v = argv(&["python", "run", "pytest"]);
                    if let Some(extra) = a.get("args") {
                        v.extend(extra.split_whitespace().map(str::to_string));
                    }
                    v
                },
            },
        ];

        Self { tools }
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Definitions for `tools/list`, in catalog order
    pub fn definitions(&self) -> Vec<Tool> {
        self.tools.iter().map(ToolSpec::definition).collect()
    }

    /// Resolve a call into a gateway request
    pub fn request(&self, name: &str, arguments: &Value) -> Result<ExecutionRequest, McpError> {
        self.get(name)
            .ok_or_else(|| McpError::invalid_params(format!("Unknown tool: {}", name)))?
            .request(arguments)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_for(name: &str, arguments: Value) -> Vec<String> {
        ToolRegistry::new().request(name, &arguments).unwrap().args
    }

    #[test]
    fn test_catalog_names() {
        let registry = ToolRegistry::new();
        let names: Vec<String> = registry.definitions().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "git_status",
                "git_add",
                "git_commit",
                "git_push",
                "buf_generate",
                "buf_lint",
                "py_venv_ensure",
                "py_venv_remove",
                "py_pip_install",
                "py_pytest",
            ]
        );
        assert_eq!(registry.len(), 10);
    }

    #[test]
    fn test_git_templates() {
        assert_eq!(args_for("git_status", json!({})), vec!["git", "status"]);
        assert_eq!(args_for("git_add", json!({})), vec!["git", "add", "."]);
        assert_eq!(args_for("git_add", json!({"pattern": "src/"})), vec!["git", "add", "src/"]);
        assert_eq!(
            args_for("git_commit", json!({"message": "fix: handle EOF"})),
            vec!["git", "commit", "-m", "fix: handle EOF"]
        );
        assert_eq!(args_for("git_push", Value::Null), vec!["git", "push"]);
    }

    #[test]
    fn test_buf_templates() {
        assert_eq!(args_for("buf_lint", json!({})), vec!["buf", "lint"]);
        assert_eq!(
            args_for("buf_generate", json!({"module": "api"})),
            vec!["buf", "generate", "--module", "api"]
        );
        assert_eq!(args_for("buf_generate", json!({"module": ""})), vec!["buf", "generate"]);
    }

    #[test]
    fn test_python_templates() {
        assert_eq!(
            args_for("py_venv_ensure", json!({})),
            vec!["python", "venv", "ensure", "--path", ".venv"]
        );
        assert_eq!(
            args_for("py_venv_remove", json!({"path": "env"})),
            vec!["python", "venv", "remove", "--path", "env"]
        );
        assert_eq!(
            args_for("py_pip_install", json!({"requirements": "requirements-dev.txt"})),
            vec!["python", "pip", "install", "--requirements", "requirements-dev.txt"]
        );
        assert_eq!(
            args_for("py_pytest", json!({"args": "  -k smoke   -x "})),
            vec!["python", "run", "pytest", "-k", "smoke", "-x"]
        );
        assert_eq!(args_for("py_pytest", json!({})), vec!["python", "run", "pytest"]);
    }

    #[test]
    fn test_unknown_tool() {
        let err = ToolRegistry::new().request("rm_rf", &json!({})).unwrap_err();
        assert_eq!(err.code, -32602);
        assert!(err.message.contains("rm_rf"));
    }

    #[test]
    fn test_missing_required_argument() {
        let registry = ToolRegistry::new();
        let err = registry.request("git_commit", &json!({})).unwrap_err();
        assert_eq!(err.code, -32602);
        assert!(err.message.contains("message"));

        assert!(registry.request("git_commit", &json!({"message": null})).is_err());
    }

    #[test]
    fn test_wrong_argument_type() {
        let err = ToolRegistry::new()
            .request("git_add", &json!({"pattern": 5}))
            .unwrap_err();
        assert!(err.message.contains("must be a string"));
    }

    #[test]
    fn test_arguments_must_be_object() {
        let err = ToolRegistry::new()
            .request("git_status", &json!(["status"]))
            .unwrap_err();
        assert!(err.message.contains("must be an object"));
    }

    #[test]
    fn test_unknown_properties_ignored() {
        assert_eq!(args_for("git_push", json!({"force": true})), vec!["git", "push"]);
    }

    #[test]
    fn test_input_schema_shape() {
        let registry = ToolRegistry::new();

        let commit = registry.get("git_commit").unwrap().input_schema();
        assert_eq!(commit["type"], "object");
        assert_eq!(commit["required"], json!(["message"]));
        assert_eq!(commit["properties"]["message"]["type"], "string");

        let add = registry.get("git_add").unwrap().input_schema();
        assert_eq!(add["properties"]["pattern"]["default"], ".");
        assert!(add.get("required").is_none());

        let status = registry.get("git_status").unwrap().input_schema();
        assert_eq!(status["properties"], json!({}));
    }
}

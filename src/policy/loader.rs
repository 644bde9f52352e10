use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::PolicyDocument;
use crate::rules::{CompileError, RuleCompiler, RuleSet};

use super::default::DEFAULT_POLICY;

/// Errors that can occur during policy loading.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Parse policy text (YAML, which also covers JSON).
pub fn parse_policy(text: &str) -> Result<PolicyDocument, PolicyError> {
    let value: Value = serde_yaml::from_str(text)?;
    let document = PolicyDocument::from_value(value, text);

    validate_document(&document)?;

    Ok(document)
}

/// Load a policy document from a file.
pub fn load_policy(path: impl AsRef<Path>) -> Result<PolicyDocument, PolicyError> {
    let content = fs::read_to_string(path)?;
    parse_policy(&content)
}

/// Compile a parsed document into a rule set tagged with its version.
pub fn compile_document(
    document: &PolicyDocument,
    compiler: &RuleCompiler,
) -> Result<RuleSet, PolicyError> {
    let ruleset = compiler.compile(&document.rules)?;
    Ok(ruleset.with_version(document.version()))
}

/// Validate document-level settings.
fn validate_document(document: &PolicyDocument) -> Result<(), PolicyError> {
    if let Some(version) = &document.declared_version {
        if version.trim().is_empty() {
            return Err(PolicyError::Validation(
                "Policy version cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Where policy text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySource {
    /// A YAML or JSON file on disk
    File(PathBuf),
    /// The policy compiled into the binary
    Builtin,
}

/// Policy loader that reads and compiles policy documents.
#[derive(Debug, Clone)]
pub struct PolicyLoader {
    source: PolicySource,
    compiler: RuleCompiler,
}

impl PolicyLoader {
    /// Create a loader reading from a file.
    pub fn new(policy_path: impl Into<PathBuf>) -> Self {
        PolicyLoader {
            source: PolicySource::File(policy_path.into()),
            compiler: RuleCompiler::default(),
        }
    }

    /// Create a loader serving the built-in default policy.
    pub fn builtin() -> Self {
        PolicyLoader {
            source: PolicySource::Builtin,
            compiler: RuleCompiler::default(),
        }
    }

    /// Use a specific compiler configuration.
    pub fn with_compiler(mut self, compiler: RuleCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Load the document and compile it into a RuleSet.
    pub fn load(&self) -> Result<(PolicyDocument, RuleSet), PolicyError> {
        let document = self.load_document()?;
        let ruleset = compile_document(&document, &self.compiler)?;

        Ok((document, ruleset))
    }

    /// Load only the document (without compiling rules).
    pub fn load_document(&self) -> Result<PolicyDocument, PolicyError> {
        match &self.source {
            PolicySource::File(path) => load_policy(path),
            PolicySource::Builtin => parse_policy(DEFAULT_POLICY),
        }
    }

    /// Compile policy text supplied at runtime, e.g. by an administrator.
    pub fn compile_text(&self, text: &str) -> Result<RuleSet, PolicyError> {
        let document = parse_policy(text)?;
        compile_document(&document, &self.compiler)
    }

    pub fn source(&self) -> &PolicySource {
        &self.source
    }

    pub fn compiler(&self) -> &RuleCompiler {
        &self.compiler
    }
}

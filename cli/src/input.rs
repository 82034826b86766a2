//! Input documents
//!
//! Forms, answers and submissions are read as YAML when the file ends in
//! `.yaml`/`.yml`, otherwise as JSON.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_document(path, &content).with_context(|| format!("parsing {}", path.display()))
}

fn parse_document<T: DeserializeOwned>(path: &Path, content: &str) -> Result<T> {
    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if yaml {
        Ok(serde_yaml::from_str(content)?)
    } else {
        Ok(serde_json::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formkit_core::Form;
    use serde_json::Value;
    use std::collections::HashMap;

    #[test]
    fn test_yaml_and_json_forms() {
        let yaml = "id: contact\ntitle: Contact\nfields:\n  - id: email\n    type: email\n    label: Email\n    required: true\n";
        let form: Form = parse_document(Path::new("form.yaml"), yaml).unwrap();
        assert_eq!(form.fields.len(), 1);
        assert!(form.fields[0].required);

        let values: HashMap<String, Value> =
            parse_document(Path::new("values.json"), r#"{"email": "a@b.co"}"#).unwrap();
        assert_eq!(values["email"], "a@b.co");
    }
}

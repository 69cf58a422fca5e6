//! IAM policy documents
//!
//! The model is deliberately permissive: only `Statement` and each
//! statement's `Resource` are typed, everything else rides along in
//! flattened maps so a parsed document re-serialises without loss. An
//! explicit `null` on a typed key is kept and written back. Shapes
//! the patcher does not understand (a lone statement object, a string
//! `Resource`) deserialize into the `Other` variants and are left alone.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors decoding or encoding a policy document
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Policy document is not valid UTF-8 after URL decoding: {0}")]
    Decode(#[from] std::str::Utf8Error),

    #[error("Policy document is not a JSON object: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Failed to serialize policy document: {0}")]
    Serialize(#[source] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(
        rename = "Version",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<Value>,

    #[serde(
        rename = "Id",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Value>,

    #[serde(
        rename = "Statement",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub statement: Option<Statements>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Statements {
    List(Vec<StatementEntry>),
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatementEntry {
    Statement(Statement),
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(
        rename = "Resource",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub resource: Option<Resource>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Resource {
    List(Vec<String>),
    Other(Value),
}

/// `None` only when the key is absent; `null` becomes `Some`
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl PolicyDocument {
    /// Parse a document as returned by `GetPolicyVersion` (URL-encoded JSON)
    pub fn from_encoded(encoded: &str) -> Result<Self, DocumentError> {
        let decoded = percent_decode_str(encoded).decode_utf8()?;
        Self::from_json(&decoded)
    }

    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        serde_json::from_str(json).map_err(DocumentError::Parse)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        serde_json::to_string(self).map_err(DocumentError::Serialize)
    }

    /// Append `arn` to every statement's resource list.
    ///
    /// Lists that already hold `arn` are not touched. Returns the number of
    /// lists that were extended.
    pub fn add_resource(&mut self, arn: &str) -> usize {
        let Some(Statements::List(entries)) = self.statement.as_mut() else {
            return 0;
        };

        let mut updated = 0;
        for entry in entries {
            if let StatementEntry::Statement(Statement {
                resource: Some(Resource::List(resources)),
                ..
            }) = entry
            {
                if !resources.iter().any(|r| r == arn) {
                    resources.push(arn.to_string());
                    updated += 1;
                }
            }
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ARN: &str = "arn:aws:s3:::data-bucket";

    fn parse(value: &Value) -> PolicyDocument {
        PolicyDocument::from_json(&value.to_string()).unwrap()
    }

    #[test]
    fn test_appends_to_every_resource_list() {
        let mut doc = parse(&json!({
            "Version": "2012-10-17",
            "Statement": [
                {"Effect": "Allow", "Action": "s3:GetObject", "Resource": ["arn:aws:s3:::other-bucket"]},
                {"Effect": "Allow", "Action": "s3:ListBucket", "Resource": []}
            ]
        }));

        assert_eq!(doc.add_resource(ARN), 2);
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({
                "Version": "2012-10-17",
                "Statement": [
                    {"Effect": "Allow", "Action": "s3:GetObject", "Resource": ["arn:aws:s3:::other-bucket", ARN]},
                    {"Effect": "Allow", "Action": "s3:ListBucket", "Resource": [ARN]}
                ]
            })
        );
    }

    #[test]
    fn test_statements_without_resource_are_unchanged() {
        let original = json!({
            "Version": "2012-10-17",
            "Statement": [
                {"Effect": "Allow", "Action": "s3:*", "NotResource": ["arn:aws:s3:::secret"]},
                {"Sid": "Deny", "Effect": "Deny", "Action": "iam:*", "Condition": {"Bool": {"aws:SecureTransport": "false"}}}
            ]
        });
        let mut doc = parse(&original);

        assert_eq!(doc.add_resource(ARN), 0);
        assert_eq!(serde_json::to_value(&doc).unwrap(), original);
    }

    #[test]
    fn test_existing_arn_is_not_duplicated() {
        let mut doc = parse(&json!({
            "Statement": [{"Effect": "Allow", "Resource": ["arn:aws:s3:::other-bucket", ARN]}]
        }));

        assert_eq!(doc.add_resource(ARN), 0);
        assert_eq!(doc.add_resource(ARN), 0);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["Statement"][0]["Resource"], json!(["arn:aws:s3:::other-bucket", ARN]));
    }

    #[test]
    fn test_unexpected_shapes_are_skipped() {
        let original = json!({
            "Version": "2012-10-17",
            "Statement": {"Effect": "Allow", "Resource": ["arn:aws:s3:::lone"]}
        });
        let mut doc = parse(&original);
        assert_eq!(doc.add_resource(ARN), 0);
        assert_eq!(serde_json::to_value(&doc).unwrap(), original);

        let original = json!({
            "Statement": [
                "not-a-statement",
                {"Effect": "Allow", "Resource": "arn:aws:s3:::single"},
                {"Effect": "Allow", "Resource": ["arn:aws:s3:::listed"]}
            ]
        });
        let mut doc = parse(&original);
        assert_eq!(doc.add_resource(ARN), 1);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["Statement"][0], json!("not-a-statement"));
        assert_eq!(value["Statement"][1]["Resource"], json!("arn:aws:s3:::single"));
        assert_eq!(value["Statement"][2]["Resource"], json!(["arn:aws:s3:::listed", ARN]));
    }

    #[test]
    fn test_missing_statement_is_a_no_op() {
        let mut doc = parse(&json!({"Version": "2012-10-17"}));
        assert_eq!(doc.add_resource(ARN), 0);
        assert_eq!(doc.to_json().unwrap(), r#"{"Version":"2012-10-17"}"#);
    }

    #[test]
    fn test_unknown_top_level_keys_survive() {
        let doc = parse(&json!({"Version": "2012-10-17", "Statement": [], "Custom": {"a": 1}}));
        assert_eq!(doc.extra.get("Custom"), Some(&json!({"a": 1})));
        let value: Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(value["Custom"]["a"], json!(1));
    }

    #[test]
    fn test_explicit_nulls_survive() {
        let original = json!({
            "Version": "2012-10-17",
            "Id": null,
            "Statement": [
                {"Effect": "Allow", "Action": "s3:*", "Resource": null},
                {"Effect": "Allow", "Resource": ["arn:aws:s3:::listed"]}
            ]
        });
        let mut doc = parse(&original);

        assert_eq!(doc.add_resource(ARN), 1);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["Id"], Value::Null);
        assert!(value.as_object().unwrap().contains_key("Id"));
        assert_eq!(value["Statement"][0], json!({"Effect": "Allow", "Action": "s3:*", "Resource": null}));
        assert_eq!(value["Statement"][1]["Resource"], json!(["arn:aws:s3:::listed", ARN]));

        let doc = parse(&json!({"Statement": null}));
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!({"Statement": null}));
    }

    #[test]
    fn test_from_encoded() {
        let encoded = "%7B%22Version%22%3A%222012-10-17%22%2C%22Statement%22%3A%5B%7B%22Effect%22%3A%22Allow%22%2C%22Resource%22%3A%5B%22arn%3Aaws%3As3%3A%3A%3Aother-bucket%22%5D%7D%5D%7D";
        let mut doc = PolicyDocument::from_encoded(encoded).unwrap();
        assert_eq!(doc.version, Some(json!("2012-10-17")));
        assert_eq!(doc.add_resource(ARN), 1);
    }

    #[test]
    fn test_non_object_document_is_an_error() {
        assert!(matches!(
            PolicyDocument::from_json("[1, 2]"),
            Err(DocumentError::Parse(_))
        ));
        assert!(matches!(
            PolicyDocument::from_encoded("%7B%22Version%22"),
            Err(DocumentError::Parse(_))
        ));
        assert!(matches!(
            PolicyDocument::from_encoded("%FF%FE"),
            Err(DocumentError::Decode(_))
        ));
    }
}

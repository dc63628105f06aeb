//! Serialization and streaming deserialization of account state files.

use std::io::{BufRead, BufReader, Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{debug, warn};

use tessera_types::{Element, PathIndex, PathIndexEntry};

use crate::error::{CodecError, CodecResult};
use crate::lines::StateLineKind;

/// The structured contents of one parsed state file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedAccount {
    pub elements: Vec<Element>,
    pub accounts: Vec<String>,
    pub path_index: PathIndex,
}

/// Serialize one account's state into gzip-compressed line-delimited JSON.
///
/// Elements are sorted by identifier so the same logical state always
/// produces the same bytes. The compression level is pinned: content hashes
/// are computed over the compressed form, so changing it is a format
/// migration, not a tuning knob.
pub fn serialize_account(
    elements: &[Element],
    account: &str,
    path_index: &PathIndex,
) -> CodecResult<Vec<u8>> {
    let mut sorted: Vec<&Element> = elements.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    serde_json::to_writer(&mut encoder, &sorted)?;
    encoder.write_all(b"\n")?;
    serde_json::to_writer(&mut encoder, account)?;
    encoder.write_all(b"\n")?;
    serde_json::to_writer(&mut encoder, &path_index.to_entries())?;
    encoder.write_all(b"\n")?;
    Ok(encoder.finish()?)
}

/// Parse a gzip-compressed state stream back into structured form.
///
/// Reads the stream line by line through a `BufReader` so the uncompressed
/// payload is never buffered whole. Each line is dispatched through
/// [`StateLineKind`]; unrecognized indices are logged and skipped.
pub fn deserialize_account<R: Read>(reader: R) -> CodecResult<ParsedAccount> {
    let buffered = BufReader::new(GzDecoder::new(reader));
    let mut parsed = ParsedAccount::default();

    for (index, line) in buffered.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match StateLineKind::from_index(index) {
            Some(StateLineKind::Elements) => {
                parsed.elements = serde_json::from_str(&line)?;
            }
            Some(StateLineKind::Accounts) => {
                parsed.accounts = parse_accounts_line(index, &line)?;
            }
            Some(StateLineKind::PathIndex) => {
                let entries: Vec<PathIndexEntry> = serde_json::from_str(&line)?;
                parsed.path_index = PathIndex::from_entries(entries)?;
            }
            Some(StateLineKind::Version) => {
                debug!(line_index = index, "ignoring legacy state version line");
            }
            None => {
                warn!(line_index = index, "skipping unrecognized state line");
            }
        }
    }
    Ok(parsed)
}

/// Parse the account line, accepting both formats.
///
/// Current format: a JSON string naming the account. Legacy format: a JSON
/// object mapping account names to fetch timestamps, from the era when one
/// state file carried multiple accounts; the keys are the account names.
fn parse_accounts_line(index: usize, line: &str) -> CodecResult<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    match value {
        serde_json::Value::String(account) => Ok(vec![account]),
        serde_json::Value::Object(map) => Ok(map.keys().cloned().collect()),
        other => Err(CodecError::MalformedLine {
            index,
            reason: format!("expected account string or legacy object, got {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::ElemId;

    fn element(name: &str, value: serde_json::Value) -> Element {
        Element::new(ElemId::from_full_name(name).unwrap(), value)
    }

    fn sample_index() -> PathIndex {
        let mut index = PathIndex::new();
        index.insert(
            ElemId::from_full_name("salesforce.Lead").unwrap(),
            vec![vec!["salesforce".to_string(), "Objects".to_string()]],
        );
        index
    }

    fn gzip_lines(lines: &[&str]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(lines.join("\n").as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    // -----------------------------------------------------------------------
    // Round-trip
    // -----------------------------------------------------------------------

    #[test]
    fn roundtrip_preserves_elements_account_and_index() {
        let elements = vec![
            element("salesforce.Lead", serde_json::json!({"label": "Lead"})),
            element("salesforce.Account", serde_json::json!({"label": "Account"})),
        ];
        let index = sample_index();

        let bytes = serialize_account(&elements, "salesforce", &index).unwrap();
        let parsed = deserialize_account(bytes.as_slice()).unwrap();

        assert_eq!(parsed.accounts, vec!["salesforce"]);
        assert_eq!(parsed.elements.len(), 2);
        // Serialization sorts by identifier.
        assert_eq!(parsed.elements[0].id.full_name(), "salesforce.Account");
        assert_eq!(parsed.path_index, index);
    }

    #[test]
    fn roundtrip_empty_state() {
        let bytes = serialize_account(&[], "zendesk", &PathIndex::new()).unwrap();
        let parsed = deserialize_account(bytes.as_slice()).unwrap();
        assert!(parsed.elements.is_empty());
        assert_eq!(parsed.accounts, vec!["zendesk"]);
        assert!(parsed.path_index.is_empty());
    }

    #[test]
    fn serialization_is_deterministic_across_input_order() {
        let a = element("salesforce.A", serde_json::json!(1));
        let b = element("salesforce.B", serde_json::json!(2));
        let index = PathIndex::new();

        let forward = serialize_account(&[a.clone(), b.clone()], "salesforce", &index).unwrap();
        let reversed = serialize_account(&[b, a], "salesforce", &index).unwrap();
        assert_eq!(forward, reversed);
    }

    // -----------------------------------------------------------------------
    // Legacy variants
    // -----------------------------------------------------------------------

    #[test]
    fn legacy_account_object_yields_keys() {
        let bytes = gzip_lines(&[
            "[]",
            r#"{"salesforce": "2020-01-01T00:00:00Z", "zendesk": "2020-01-02T00:00:00Z"}"#,
            "[]",
        ]);
        let parsed = deserialize_account(bytes.as_slice()).unwrap();
        assert_eq!(parsed.accounts, vec!["salesforce", "zendesk"]);
    }

    #[test]
    fn version_line_is_ignored() {
        let bytes = gzip_lines(&["[]", "\"salesforce\"", "[]", "\"0.1.0\""]);
        let parsed = deserialize_account(bytes.as_slice()).unwrap();
        assert_eq!(parsed.accounts, vec!["salesforce"]);
    }

    #[test]
    fn missing_version_line_is_valid() {
        let bytes = gzip_lines(&["[]", "\"salesforce\"", "[]"]);
        assert!(deserialize_account(bytes.as_slice()).is_ok());
    }

    #[test]
    fn unrecognized_extra_lines_are_skipped() {
        let bytes = gzip_lines(&[
            "[]",
            "\"salesforce\"",
            "[]",
            "\"0.1.0\"",
            r#"{"future": "line"}"#,
        ]);
        let parsed = deserialize_account(bytes.as_slice()).unwrap();
        assert_eq!(parsed.accounts, vec!["salesforce"]);
    }

    #[test]
    fn blank_lines_do_not_shift_dispatch() {
        // A trailing newline produces an empty final line; it must not fail.
        let bytes = gzip_lines(&["[]", "\"salesforce\"", "[]", ""]);
        assert!(deserialize_account(bytes.as_slice()).is_ok());
    }

    // -----------------------------------------------------------------------
    // Malformed input
    // -----------------------------------------------------------------------

    #[test]
    fn account_line_with_wrong_type_fails() {
        let bytes = gzip_lines(&["[]", "42", "[]"]);
        let err = deserialize_account(bytes.as_slice()).unwrap_err();
        assert!(matches!(err, CodecError::MalformedLine { index: 1, .. }));
    }

    #[test]
    fn malformed_element_array_fails() {
        let bytes = gzip_lines(&["{not json", "\"salesforce\"", "[]"]);
        assert!(matches!(
            deserialize_account(bytes.as_slice()).unwrap_err(),
            CodecError::Json(_)
        ));
    }

    #[test]
    fn truncated_gzip_stream_fails() {
        let mut bytes = serialize_account(&[], "salesforce", &PathIndex::new()).unwrap();
        bytes.truncate(bytes.len() / 2);
        assert!(matches!(
            deserialize_account(bytes.as_slice()).unwrap_err(),
            CodecError::Io(_)
        ));
    }
}

use indexmap::IndexMap;
use serde::Serialize;

pub const RECORD_SEPARATOR: char = '|';
pub const FIELD_SEPARATOR: char = ';';
pub const KEY_VALUE_SEPARATOR: char = ':';

/// A flat record with a fixed, ordered set of named fields.
pub trait Record {
    /// Field names and their already-formatted values, in wire order.
    fn fields(&self) -> Vec<(&'static str, String)>;
}

impl<R: Record + ?Sized> Record for &R {
    fn fields(&self) -> Vec<(&'static str, String)> {
        (**self).fields()
    }
}

/// Booleans travel as `"0"` / `"1"`.
pub fn encode_bool(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// Whether a value can be written without corrupting the framing.
pub fn is_wire_safe(value: &str) -> bool {
    !value.contains([FIELD_SEPARATOR, RECORD_SEPARATOR])
}

pub fn encode_record<R: Record + ?Sized>(record: &R) -> String {
    let mut out = String::new();
    write_record(&mut out, record);
    out
}

pub fn encode_records<I>(records: I) -> String
where
    I: IntoIterator,
    I::Item: Record,
{
    let mut out = String::new();
    for (i, record) in records.into_iter().enumerate() {
        if i > 0 {
            out.push(RECORD_SEPARATOR);
        }
        write_record(&mut out, &record);
    }
    out
}

fn write_record<R: Record + ?Sized>(out: &mut String, record: &R) {
    for (i, (key, value)) in record.fields().into_iter().enumerate() {
        if i > 0 {
            out.push(FIELD_SEPARATOR);
        }
        out.push_str(key);
        out.push(KEY_VALUE_SEPARATOR);
        out.push_str(&value);
    }
}

/// A record read back from its encoded form, fields in wire order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecodedRecord {
    fields: IndexMap<String, String>,
}

impl DecodedRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Decode one record. Pairs without a `:` or with an empty key are skipped.
pub fn decode_record(encoded: &str) -> DecodedRecord {
    let fields = encoded
        .split(FIELD_SEPARATOR)
        .filter_map(|pair| pair.split_once(KEY_VALUE_SEPARATOR))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    DecodedRecord { fields }
}

/// Decode a record list; the empty string is the empty list.
pub fn decode_records(encoded: &str) -> Vec<DecodedRecord> {
    if encoded.is_empty() {
        return Vec::new();
    }
    encoded.split(RECORD_SEPARATOR).map(decode_record).collect()
}

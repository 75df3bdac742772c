//! Flattened-string serialization and page slicing for every read path.
//!
//! A record is encoded as `key:value` pairs joined by `;`, a list of records
//! as encoded records joined by `|`:
//!
//! ```text
//! id:c-1;name:first;ownerDID:did:admin;ownerOrgName:org;disabled:0|id:c-2;...
//! ```
//!
//! Values are written verbatim. They may contain `:` (decoding splits each
//! pair on its first colon) but must not contain `;` or `|`.

pub mod page;
pub mod record;

pub use page::{Page, PageRequest};
pub use record::{
    DecodedRecord, FIELD_SEPARATOR, KEY_VALUE_SEPARATOR, RECORD_SEPARATOR, Record, decode_record,
    decode_records, encode_bool, encode_record, encode_records, is_wire_safe,
};

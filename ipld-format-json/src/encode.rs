use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use ipld_data_model::Node;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// DAG-JSON writes bytes unpadded but readers accept either form.
pub(crate) const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Serializes a [`Node`] in its DAG-JSON shape through any serde serializer.
pub struct DagJsonView<'a>(pub &'a Node);

impl Serialize for DagJsonView<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            Node::Null => serializer.serialize_unit(),
            Node::Bool(b) => serializer.serialize_bool(*b),
            Node::Int(i) => serializer.serialize_i64(*i),
            Node::Float(f) => serializer.serialize_f64(*f),
            Node::String(s) => serializer.serialize_str(s),
            Node::Bytes(bytes) => {
                let mut outer = serializer.serialize_map(Some(1))?;
                outer.serialize_entry("/", &BytesBody(bytes))?;
                outer.end()
            }
            Node::Link(link) => {
                let mut outer = serializer.serialize_map(Some(1))?;
                outer.serialize_entry("/", link.as_str())?;
                outer.end()
            }
            Node::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, &DagJsonView(value))?;
                }
                map.end()
            }
            Node::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&DagJsonView(item))?;
                }
                seq.end()
            }
        }
    }
}

struct BytesBody<'a>(&'a [u8]);

impl Serialize for BytesBody<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("bytes", &BASE64.encode(self.0))?;
        map.end()
    }
}

use bytes::Bytes;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::value::RawValue;

/// An already-serialized payload that is carried through without re-encoding.
///
/// Encoding yields exactly the wrapped bytes and decoding stores its input
/// unchanged, for any byte sequence. When serialized with serde the bytes are
/// embedded verbatim if they form a JSON value, so a record the front end has
/// already encoded is neither wrapped in a string nor escaped twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RawJson(Bytes);

impl RawJson {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Copies a borrowed record. The sink only sees `&[u8]`, so this is the one copy per write.
    pub fn copy_from_slice(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }

    pub fn encode(&self) -> &[u8] {
        &self.0
    }

    pub fn decode(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The payload as a raw JSON value, if it is one.
    pub fn as_raw_value(&self) -> Option<Box<RawValue>> {
        let text = std::str::from_utf8(&self.0).ok()?;
        RawValue::from_string(text.to_owned()).ok()
    }

    pub fn is_json_object(&self) -> bool {
        self.as_raw_value()
            .is_some_and(|raw| raw.get().starts_with('{'))
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl From<Vec<u8>> for RawJson {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<&'static str> for RawJson {
    fn from(text: &'static str) -> Self {
        Self(Bytes::from_static(text.as_bytes()))
    }
}

impl AsRef<[u8]> for RawJson {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for RawJson {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_raw_value() {
            Some(raw) => raw.serialize(serializer),
            None => serializer.serialize_str(&self.to_string_lossy()),
        }
    }
}

impl<'de> Deserialize<'de> for RawJson {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Ok(Self(Bytes::from(raw.get().to_owned())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_identity() {
        let cases: [&[u8]; 5] = [
            b"",
            b"{\"msg\":\"x\"}",
            b"not json at all",
            &[0xff, 0xfe, 0x00, 0x80],
            b"{\"msg\":\"x\"}\n",
        ];

        for bytes in cases {
            let raw = RawJson::decode(bytes.to_vec());
            assert_eq!(raw.encode(), bytes);
        }
    }

    #[test]
    fn test_serialize_embeds_json_verbatim() {
        #[derive(serde::Serialize)]
        struct Wrapper {
            payload: RawJson,
        }

        let wrapper = Wrapper {
            payload: RawJson::from("{\"msg\":\"quoted \\\"x\\\"\",\"n\":1}"),
        };
        let json = serde_json::to_string(&wrapper).unwrap();
        assert_eq!(json, "{\"payload\":{\"msg\":\"quoted \\\"x\\\"\",\"n\":1}}");
    }

    #[test]
    fn test_serialize_falls_back_to_string_for_non_json() {
        let raw = RawJson::from("plain text line");
        assert_eq!(serde_json::to_string(&raw).unwrap(), "\"plain text line\"");
    }

    #[test]
    fn test_deserialize_keeps_raw_text() {
        let raw: RawJson = serde_json::from_str("{\"a\": [1, 2]}").unwrap();
        assert_eq!(raw.encode(), b"{\"a\": [1, 2]}");
    }

    #[test]
    fn test_json_object_detection() {
        assert!(RawJson::from("{\"a\":1}\n").is_json_object());
        assert!(!RawJson::from("[1,2]").is_json_object());
        assert!(!RawJson::from("{broken").is_json_object());
        assert!(!RawJson::default().is_json_object());
    }
}

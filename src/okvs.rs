use crate::error::Result;

/// Oblivious key-value store encoder
pub trait OkvsEncoder<Key, Value> {
    fn encode(&self, map: &[(Key, Value)]) -> Result<Vec<Value>>;
}

/// Oblivious key-value store decoder
pub trait OkvsDecoder<Key, Value> {
    fn decode(&self, okvs: &[Value], key: &Key) -> Result<Value>;
    fn decode_many(&self, okvs: &[Value], keys: &[Key]) -> Result<Vec<Value>> {
        keys.iter().map(|key| self.decode(okvs, key)).collect()
    }
}

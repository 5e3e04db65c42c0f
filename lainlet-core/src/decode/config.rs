//! Config decoder: identity map of `config-name -> string` under
//! `/lain/config`. The simplest decoder in the catalogue: no inversion,
//! no structured payload.

use crate::decode::{DecodeOutcome, Decoder, Inverter};
use crate::store::KVPair;

pub struct ConfigDecoder;

impl Decoder for ConfigDecoder {
    type Value = String;

    fn decode(
        &self,
        raw: &KVPair,
        _previous: Option<&Self::Value>,
        _inverter: &mut Inverter,
    ) -> DecodeOutcome<Self::Value> {
        let value = String::from_utf8_lossy(&raw.value).into_owned();
        DecodeOutcome::new().upsert(raw.key.clone(), value)
    }

    fn decode_removed(
        &self,
        raw_key: &str,
        _previous: Option<&Self::Value>,
        _inverter: &mut Inverter,
    ) -> DecodeOutcome<Self::Value> {
        DecodeOutcome::new().delete(raw_key.to_string())
    }
}

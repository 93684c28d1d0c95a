//! Argument marshalling.
//!
//! Query operations take their parameters as a `map<string, value>`. Callers
//! can hand that map over directly, or use one of the folding conventions
//! here: an alternating key/value sequence, named pairs, or a pre-encoded
//! chunked map as opaque bytes.

use std::collections::HashMap;

use crate::bolt::codec;
use crate::bolt::packstream::Value;
use crate::error::{ArgError, Error, Result};

/// Named parameters for a RUN message.
pub type Params = HashMap<String, Value>;

/// Fold a flat argument sequence into parameters.
///
/// - Empty input means no parameters.
/// - Exactly one argument must be a map, which is passed through.
/// - Otherwise the sequence must alternate keys and values; even-positioned
///   entries are the keys and must be strings.
pub fn params_from_values(args: Vec<Value>) -> std::result::Result<Params, ArgError> {
    if args.is_empty() {
        return Ok(Params::new());
    }

    if args.len() == 1 {
        let mut args = args;
        return match args.remove(0) {
            Value::Map(m) => Ok(m),
            _ => Err(ArgError::NotMap),
        };
    }

    if args.len() % 2 != 0 {
        return Err(ArgError::OddLength);
    }

    let mut out = Params::with_capacity(args.len() / 2);
    let mut iter = args.into_iter();
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        let Value::String(key) = key else {
            return Err(ArgError::KeyNotString);
        };
        out.insert(key, value);
    }
    Ok(out)
}

/// Fold named pairs into parameters. Every name must be non-empty.
pub fn params_from_named<I>(pairs: I) -> std::result::Result<Params, ArgError>
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut out = Params::new();
    for (name, value) in pairs {
        if name.is_empty() {
            return Err(ArgError::EmptyKey);
        }
        out.insert(name, value);
    }
    Ok(out)
}

/// Accept a pre-encoded, chunked PackStream map as opaque bytes.
///
/// The bytes are first screened with [`codec::maybe_map`]; anything that does
/// not look like a chunked map, or decodes to something other than a map, is
/// rejected as [`ArgError::NotMap`].
pub fn params_from_encoded(bytes: &[u8]) -> Result<Params> {
    if !codec::maybe_map(bytes) {
        return Err(ArgError::NotMap.into());
    }
    match codec::decode_message(bytes)? {
        Value::Map(m) => Ok(m),
        _ => Err(ArgError::NotMap.into()),
    }
}

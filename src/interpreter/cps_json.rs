use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::Serialize;

use crate::interpreter::cps::{Procedure, Value};

fn procedure_name(procedure: &Procedure) -> &'static str {
    match procedure {
        Procedure::Builtin(b) => b.name,
        Procedure::Lambda(_) => "lambda",
        Procedure::Mu(_) => "mu",
    }
}

/// Proper lists become arrays, dotted pairs become `{"car": .., "cdr": ..}`.
/// Symbols and procedures are tagged objects so they stay distinct from strings.
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::String(s) => serializer.serialize_str(s),
            Value::Undefined => serializer.serialize_unit(),
            Value::Symbol(s) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("symbol", s)?;
                map.end()
            }
            Value::Procedure(p) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("procedure", procedure_name(p))?;
                map.end()
            }
            Value::Nil => serializer.serialize_seq(Some(0))?.end(),
            Value::Pair(pair) => match self.list_len() {
                Some(len) => {
                    let mut seq = serializer.serialize_seq(Some(len))?;
                    for element in self.iter() {
                        seq.serialize_element(element)?;
                    }
                    seq.end()
                }
                None => {
                    let mut map = serializer.serialize_map(Some(2))?;
                    map.serialize_entry("car", &pair.first)?;
                    map.serialize_entry("cdr", &pair.second)?;
                    map.end()
                }
            },
        }
    }
}

pub fn serialize_value(val: &Value) -> Result<String, serde_json::Error> { serde_json::to_string(val) }

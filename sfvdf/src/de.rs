use serde::Deserialize;
use serde::de::{self, DeserializeSeed, IntoDeserializer, MapAccess, SeqAccess, Visitor};
use serde::forward_to_deserialize_any;

use crate::{KvObject, KvValue};
use std::fmt;

#[derive(Clone, Copy)]
enum Node<'de> {
    Str(&'de str),
    Obj(&'de KvObject),
}

impl<'de> From<&'de KvValue> for Node<'de> {
    fn from(value: &'de KvValue) -> Self {
        match value {
            KvValue::Str(s) => Node::Str(s),
            KvValue::Obj(o) => Node::Obj(o),
        }
    }
}

/// Deserializes typed structs out of a parsed VDF tree.
///
/// VDF has no scalar types, so numbers and booleans are parsed out of their
/// string form (`"1"`/`"0"` for booleans).
pub struct Deserializer<'de> {
    input: Node<'de>,
}

impl<'de> Deserializer<'de> {
    pub fn from_object(input: &'de KvObject) -> Self {
        Deserializer {
            input: Node::Obj(input),
        }
    }

    pub fn from_value(input: &'de KvValue) -> Self {
        Deserializer {
            input: Node::from(input),
        }
    }

    fn from_str(input: &'de str) -> Self {
        Deserializer {
            input: Node::Str(input),
        }
    }

    fn expect_str(&self, what: &str) -> Result<&'de str, Error> {
        match self.input {
            Node::Str(s) => Ok(s),
            Node::Obj(_) => Err(Error(format!("expected {}, found a block", what))),
        }
    }

    fn expect_obj(&self, what: &str) -> Result<&'de KvObject, Error> {
        match self.input {
            Node::Obj(o) => Ok(o),
            Node::Str(s) => Err(Error(format!("expected {}, found string \"{}\"", what, s))),
        }
    }
}

pub fn from_object<'a, T>(object: &'a KvObject) -> Result<T, Error>
where
    T: Deserialize<'a>,
{
    let mut deserializer = Deserializer::from_object(object);
    T::deserialize(&mut deserializer)
}

pub fn from_value<'a, T>(value: &'a KvValue) -> Result<T, Error>
where
    T: Deserialize<'a>,
{
    let mut deserializer = Deserializer::from_value(value);
    T::deserialize(&mut deserializer)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Error(String);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for Error {}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error(msg.to_string())
    }
}

macro_rules! deserialize_parsed {
    ($($method:ident => $visit:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value, Self::Error>
            where
                V: Visitor<'de>,
            {
                let s = self.expect_str(stringify!($ty))?;
                let n = s
                    .trim()
                    .parse::<$ty>()
                    .map_err(|_| Error(format!("invalid {}: \"{}\"", stringify!($ty), s)))?;
                visitor.$visit(n)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for &mut Deserializer<'de> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            Node::Str(s) => visitor.visit_borrowed_str(s),
            Node::Obj(o) => visitor.visit_map(ObjectAccess::new(o)),
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.expect_str("a bool")? {
            "1" | "true" => visitor.visit_bool(true),
            "0" | "false" => visitor.visit_bool(false),
            s => Err(Error(format!("Invalid bool: {}", s))),
        }
    }

    deserialize_parsed! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_f32 => visit_f32: f32,
        deserialize_f64 => visit_f64: f64,
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_borrowed_str(self.expect_str("a string")?)
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        // Absent keys never reach here, so anything present is Some
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        // Arrays are written as blocks keyed "0", "1", ...; keys are ignored
        let object = self.expect_obj("a list")?;
        visitor.visit_seq(ObjectAccess::new(object))
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        let object = self.expect_obj("a block")?;
        visitor.visit_map(ObjectAccess::new(object))
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        let s = self.expect_str("an enum variant")?;
        visitor.visit_enum(s.into_deserializer())
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        i128 u128 char bytes byte_buf unit unit_struct tuple tuple_struct identifier
    }
}

// Walks a block's entries, either as map pairs or as a sequence of values
struct ObjectAccess<'de> {
    iter: std::slice::Iter<'de, (String, KvValue)>,
    value: Option<&'de KvValue>,
}

impl<'de> ObjectAccess<'de> {
    fn new(object: &'de KvObject) -> Self {
        ObjectAccess {
            iter: object.iter(),
            value: None,
        }
    }
}

impl<'de> SeqAccess<'de> for ObjectAccess<'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((_, value)) => {
                let mut de = Deserializer::from_value(value);
                seed.deserialize(&mut de).map(Some)
            }
            None => Ok(None),
        }
    }
}

impl<'de> MapAccess<'de> for ObjectAccess<'de> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                // Keys go through the same string parsing, so numeric ids work as map keys
                let mut de = Deserializer::from_str(key);
                seed.deserialize(&mut de).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        let value = self.value.take().ok_or(Error(
            "MapAccess::next_value called before next_key".to_string(),
        ))?;
        let mut de = Deserializer::from_value(value);
        seed.deserialize(&mut de)
    }
}

//! Resolved document values
//!
//! A loaded document is a tree of [`Value`]s. Containers are shared handles so
//! that function bodies can read and write the state of the container that
//! owns them: a setter like `(value) this.total = value * 2;` mutates the
//! same [`Mapping`] the caller holds.
//!
//! Reading a slot through [`Mapping::get`] or [`Sequence::get`] runs the
//! getter of an [`Accessor`] stored there; writing through `set` runs its
//! setter. The `*_raw` methods bypass accessors.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::error::{LoadError, RuntimeError};
use crate::script::ast::Stmt;
use crate::script::interp;
use crate::script::parser::{parse_program, ParseError};

/// A numeric scalar. Integers stay integers until an operation needs a float.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// The value as an integer, if it has no fractional part
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Number::Int(i) => Some(i),
            Number::Float(f) if f.fract() == 0.0 && f.abs() < 9.2e18 => Some(f as i64),
            Number::Float(_) => None,
        }
    }

    pub fn is_nan(self) -> bool {
        matches!(self, Number::Float(f) if f.is_nan())
    }

    fn float_op(self, other: Number, op: fn(f64, f64) -> f64) -> Number {
        Number::Float(op(self.as_f64(), other.as_f64()))
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.partial_cmp(b),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

impl Add for Number {
    type Output = Number;

    fn add(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_add(b)
                .map(Number::Int)
                .unwrap_or_else(|| self.float_op(other, |a, b| a + b)),
            _ => self.float_op(other, |a, b| a + b),
        }
    }
}

impl Sub for Number {
    type Output = Number;

    fn sub(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_sub(b)
                .map(Number::Int)
                .unwrap_or_else(|| self.float_op(other, |a, b| a - b)),
            _ => self.float_op(other, |a, b| a - b),
        }
    }
}

impl Mul for Number {
    type Output = Number;

    fn mul(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_mul(b)
                .map(Number::Int)
                .unwrap_or_else(|| self.float_op(other, |a, b| a * b)),
            _ => self.float_op(other, |a, b| a * b),
        }
    }
}

impl Div for Number {
    type Output = Number;

    fn div(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) if b != 0 && a.checked_rem(b) == Some(0) => a
                .checked_div(b)
                .map(Number::Int)
                .unwrap_or_else(|| self.float_op(other, |a, b| a / b)),
            _ => self.float_op(other, |a, b| a / b),
        }
    }
}

impl Rem for Number {
    type Output = Number;

    fn rem(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_rem(b)
                .map(Number::Int)
                .unwrap_or_else(|| self.float_op(other, |a, b| a % b)),
            _ => self.float_op(other, |a, b| a % b),
        }
    }
}

impl Neg for Number {
    type Output = Number;

    fn neg(self) -> Number {
        match self {
            Number::Int(i) => i
                .checked_neg()
                .map(Number::Int)
                .unwrap_or(Number::Float(-(i as f64))),
            Number::Float(f) => Number::Float(-f),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) if x.is_nan() => write!(f, "NaN"),
            Number::Float(x) if x.is_infinite() => {
                write!(f, "{}", if x > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Number::Float(x) if x == 0.0 => write!(f, "0"),
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

impl From<i64> for Number {
    fn from(i: i64) -> Self {
        Number::Int(i)
    }
}

impl From<i32> for Number {
    fn from(i: i32) -> Self {
        Number::Int(i64::from(i))
    }
}

impl From<f64> for Number {
    fn from(f: f64) -> Self {
        Number::Float(f)
    }
}

/// A resolved value
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value: missing properties, missing arguments, setter-only reads
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Sequence),
    Mapping(Mapping),
    Function(Function),
    Accessor(Accessor),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().and_then(Number::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_number().map(Number::as_f64)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(func) => Some(func),
            _ => None,
        }
    }

    pub fn as_accessor(&self) -> Option<&Accessor> {
        match self {
            Value::Accessor(accessor) => Some(accessor),
            _ => None,
        }
    }

    /// The `typeof` name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Null | Value::Sequence(_) | Value::Mapping(_) | Value::Accessor(_) => "object",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => !n.is_nan() && n.as_f64() != 0.0,
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Read a property, running accessor getters
    ///
    /// Mappings are keyed by name, sequences and strings by index (plus
    /// `length`). Reading from `undefined` or `null` is an error.
    pub fn get(&self, key: &str) -> Result<Value, RuntimeError> {
        self.get_property_at(key, 0)
    }

    /// Write a property, running accessor setters
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), RuntimeError> {
        self.set_property_at(key, value.into(), 0)
    }

    /// Read a sequence element by position
    pub fn index(&self, index: usize) -> Result<Value, RuntimeError> {
        self.get(&index.to_string())
    }

    /// Call this value as a function
    pub fn call(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        match self {
            Value::Function(func) => func.call(args),
            other => Err(RuntimeError::NotCallable {
                what: other.type_name().to_string(),
            }),
        }
    }

    pub(crate) fn get_property_at(&self, key: &str, depth: usize) -> Result<Value, RuntimeError> {
        match self {
            Value::Mapping(mapping) => mapping.get_at(key, depth),
            Value::Sequence(sequence) => match key {
                "length" => Ok(Value::from(sequence.len() as i64)),
                _ => match key.parse::<usize>() {
                    Ok(index) => sequence.get_at(index, depth),
                    Err(_) => Ok(Value::Undefined),
                },
            },
            Value::String(s) => match key {
                "length" => Ok(Value::from(s.chars().count() as i64)),
                _ => Ok(key
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| s.chars().nth(index))
                    .map(|ch| Value::String(ch.to_string()))
                    .unwrap_or(Value::Undefined)),
            },
            Value::Undefined | Value::Null => Err(RuntimeError::InvalidPropertyRead {
                property: key.to_string(),
                target: self.to_string(),
            }),
            _ => Ok(Value::Undefined),
        }
    }

    pub(crate) fn set_property_at(
        &self,
        key: &str,
        value: Value,
        depth: usize,
    ) -> Result<(), RuntimeError> {
        let invalid = || RuntimeError::InvalidPropertyWrite {
            property: key.to_string(),
            target: self.type_name().to_string(),
        };

        match self {
            Value::Mapping(mapping) => mapping.set_at(key, value, depth),
            Value::Sequence(sequence) => {
                let index = key.parse::<usize>().map_err(|_| invalid())?;
                sequence.set_at(index, value, depth)
            }
            _ => Err(invalid()),
        }
    }

    /// Convert back into a plain YAML value.
    ///
    /// Functions, accessors and `undefined` have no YAML form and become null.
    pub fn to_yaml(&self) -> serde_yaml::Value {
        match self {
            Value::Undefined | Value::Null | Value::Function(_) | Value::Accessor(_) => {
                serde_yaml::Value::Null
            }
            Value::Bool(b) => serde_yaml::Value::Bool(*b),
            Value::Number(Number::Int(i)) => serde_yaml::Value::Number((*i).into()),
            Value::Number(Number::Float(f)) => serde_yaml::Value::Number((*f).into()),
            Value::String(s) => serde_yaml::Value::String(s.clone()),
            Value::Sequence(sequence) => {
                serde_yaml::Value::Sequence(sequence.items().iter().map(Value::to_yaml).collect())
            }
            Value::Mapping(mapping) => {
                let mut out = serde_yaml::Mapping::new();
                for (key, value) in mapping.entries() {
                    out.insert(serde_yaml::Value::String(key), value.to_yaml());
                }
                serde_yaml::Value::Mapping(out)
            }
        }
    }

    /// Convert a plain YAML tree. Marker strings stay ordinary strings.
    pub fn from_yaml(yaml: serde_yaml::Value) -> Result<Value, LoadError> {
        match yaml {
            serde_yaml::Value::Sequence(items) => {
                let items = items
                    .into_iter()
                    .map(Value::from_yaml)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::from(items))
            }
            serde_yaml::Value::Mapping(entries) => {
                let mapping = Mapping::new();
                for (key, value) in entries {
                    mapping.insert(mapping_key(&key)?, Value::from_yaml(value)?);
                }
                Ok(Value::Mapping(mapping))
            }
            serde_yaml::Value::Tagged(tagged) => Value::from_yaml(tagged.value),
            scalar => Ok(from_scalar(&scalar)),
        }
    }
}

/// Convert a YAML scalar; collections become `Undefined`
pub(crate) fn from_scalar(yaml: &serde_yaml::Value) -> Value {
    match yaml {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(*b),
        serde_yaml::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::from(i),
            None => Value::from(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_yaml::Value::String(s) => Value::String(s.clone()),
        serde_yaml::Value::Tagged(tagged) => from_scalar(&tagged.value),
        serde_yaml::Value::Sequence(_) | serde_yaml::Value::Mapping(_) => Value::Undefined,
    }
}

/// Render a YAML mapping key as a property name
pub(crate) fn mapping_key(key: &serde_yaml::Value) -> Result<String, LoadError> {
    match key {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Tagged(tagged) => mapping_key(&tagged.value),
        serde_yaml::Value::Sequence(_) | serde_yaml::Value::Mapping(_) => {
            Err(LoadError::UnsupportedKey {
                key: serde_yaml::to_string(key)
                    .map(|text| text.trim().to_string())
                    .unwrap_or_default(),
            })
        }
        scalar => Ok(from_scalar(scalar).to_string()),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a == b,
            (Value::Mapping(a), Value::Mapping(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Accessor(a), Value::Accessor(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Sequence(s) => fmt::Debug::fmt(s, f),
            Value::Mapping(m) => fmt::Debug::fmt(m, f),
            Value::Function(func) => fmt::Debug::fmt(func, f),
            Value::Accessor(a) => fmt::Debug::fmt(a, f),
        }
    }
}

/// String conversion used by `+` concatenation and error messages
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Sequence(sequence) => {
                let items: Vec<String> = sequence
                    .items()
                    .iter()
                    .map(|item| match item {
                        Value::Undefined | Value::Null => String::new(),
                        other => other.to_string(),
                    })
                    .collect();
                write!(f, "{}", items.join(","))
            }
            Value::Mapping(_) | Value::Accessor(_) => write!(f, "[object Object]"),
            Value::Function(func) => {
                write!(f, "({}) {}", func.params().join(", "), func.source().trim())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Number(Number::Int(i))
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Number(Number::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Number(Number::Float(f))
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(Sequence::from(items))
    }
}

impl From<Mapping> for Value {
    fn from(mapping: Mapping) -> Self {
        Value::Mapping(mapping)
    }
}

impl From<Sequence> for Value {
    fn from(sequence: Sequence) -> Self {
        Value::Sequence(sequence)
    }
}

impl From<Function> for Value {
    fn from(func: Function) -> Self {
        Value::Function(func)
    }
}

/// How far past the end a sequence write may land; the gap is padded with `Undefined`
pub const MAX_SEQUENCE_GAP: usize = 1024;

type MappingCell = RefCell<IndexMap<String, Value>>;
type SequenceCell = RefCell<Vec<Value>>;

/// An insertion-ordered mapping with string keys, shared by handle
#[derive(Clone, Default)]
pub struct Mapping(Rc<MappingCell>);

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `key`, running the getter if the slot holds an accessor.
    /// Missing keys read as `Undefined`.
    pub fn get(&self, key: &str) -> Result<Value, RuntimeError> {
        self.get_at(key, 0)
    }

    /// Write `key`, running the setter if the slot holds an accessor
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), RuntimeError> {
        self.set_at(key, value.into(), 0)
    }

    /// The stored slot, without running accessors
    pub fn get_raw(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    /// Store a value directly, replacing any accessor in the slot
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.borrow_mut().insert(key.into(), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.borrow_mut().shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    /// Raw entries in insertion order
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Whether both handles point at the same mapping
    pub fn ptr_eq(&self, other: &Mapping) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> Receiver {
        Receiver::Mapping(Rc::downgrade(&self.0))
    }

    pub(crate) fn get_at(&self, key: &str, depth: usize) -> Result<Value, RuntimeError> {
        match self.get_raw(key) {
            Some(Value::Accessor(accessor)) => accessor.read(depth),
            Some(value) => Ok(value),
            None => Ok(Value::Undefined),
        }
    }

    pub(crate) fn set_at(&self, key: &str, value: Value, depth: usize) -> Result<(), RuntimeError> {
        match self.get_raw(key) {
            Some(Value::Accessor(accessor)) => accessor.write(key, value, depth),
            _ => {
                self.0.borrow_mut().insert(key.to_string(), value);
                Ok(())
            }
        }
    }
}

impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0.borrow() == *other.0.borrow()
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(entries) => f.debug_map().entries(entries.iter()).finish(),
            Err(_) => write!(f, "Mapping(<borrowed>)"),
        }
    }
}

/// An ordered sequence, shared by handle
#[derive(Clone, Default)]
pub struct Sequence(Rc<SequenceCell>);

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the element at `index`, running the getter if it is an accessor.
    /// Out-of-range reads are `Undefined`.
    pub fn get(&self, index: usize) -> Result<Value, RuntimeError> {
        self.get_at(index, 0)
    }

    /// Write the element at `index`, padding with `Undefined` past the end.
    /// Writes more than [`MAX_SEQUENCE_GAP`] past the end are rejected.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<(), RuntimeError> {
        self.set_at(index, value.into(), 0)
    }

    pub fn get_raw(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    pub fn push(&self, value: impl Into<Value>) {
        self.0.borrow_mut().push(value.into());
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Raw elements in order
    pub fn items(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &Sequence) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> Receiver {
        Receiver::Sequence(Rc::downgrade(&self.0))
    }

    pub(crate) fn get_at(&self, index: usize, depth: usize) -> Result<Value, RuntimeError> {
        match self.get_raw(index) {
            Some(Value::Accessor(accessor)) => accessor.read(depth),
            Some(value) => Ok(value),
            None => Ok(Value::Undefined),
        }
    }

    pub(crate) fn set_at(&self, index: usize, value: Value, depth: usize) -> Result<(), RuntimeError> {
        if let Some(Value::Accessor(accessor)) = self.get_raw(index) {
            return accessor.write(&index.to_string(), value, depth);
        }

        let mut items = self.0.borrow_mut();
        let len = items.len();
        if index > len.saturating_add(MAX_SEQUENCE_GAP) {
            return Err(RuntimeError::IndexTooLarge { index, len });
        }
        if index >= len {
            items.resize(index + 1, Value::Undefined);
        }
        items[index] = value;
        Ok(())
    }
}

impl From<Vec<Value>> for Sequence {
    fn from(items: Vec<Value>) -> Self {
        Sequence(Rc::new(RefCell::new(items)))
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0.borrow() == *other.0.borrow()
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(items) => f.debug_list().entries(items.iter()).finish(),
            Err(_) => write!(f, "Sequence(<borrowed>)"),
        }
    }
}

/// The container a function is bound to, held weakly so that a function
/// stored inside its own receiver does not keep it alive
#[derive(Clone)]
pub(crate) enum Receiver {
    Mapping(Weak<MappingCell>),
    Sequence(Weak<SequenceCell>),
}

impl Receiver {
    fn upgrade(&self) -> Value {
        match self {
            Receiver::Mapping(weak) => weak
                .upgrade()
                .map(|rc| Value::Mapping(Mapping(rc)))
                .unwrap_or(Value::Undefined),
            Receiver::Sequence(weak) => weak
                .upgrade()
                .map(|rc| Value::Sequence(Sequence(rc)))
                .unwrap_or(Value::Undefined),
        }
    }
}

struct FunctionDef {
    params: Vec<String>,
    body: Vec<Stmt>,
    source: String,
}

/// A function materialized from its parameter list and body text.
///
/// The body is parsed once, when the function is created. `this` inside the
/// body is the container the function was bound to when it was resolved.
#[derive(Clone)]
pub struct Function {
    def: Rc<FunctionDef>,
    receiver: Option<Receiver>,
}

impl Function {
    /// Compile an unbound function
    pub fn new(params: Vec<String>, source: &str) -> Result<Self, ParseError> {
        let body = parse_program(source)?;
        Ok(Self {
            def: Rc::new(FunctionDef {
                params,
                body,
                source: source.to_string(),
            }),
            receiver: None,
        })
    }

    pub fn params(&self) -> &[String] {
        &self.def.params
    }

    /// The body text the function was compiled from
    pub fn source(&self) -> &str {
        &self.def.source
    }

    pub(crate) fn body(&self) -> &[Stmt] {
        &self.def.body
    }

    /// The value of `this` inside the body
    pub fn this(&self) -> Value {
        self.receiver
            .as_ref()
            .map(Receiver::upgrade)
            .unwrap_or(Value::Undefined)
    }

    /// Invoke the function. Missing arguments are `undefined`.
    pub fn call(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        self.call_at(args.to_vec(), 0)
    }

    pub(crate) fn call_at(&self, args: Vec<Value>, depth: usize) -> Result<Value, RuntimeError> {
        interp::invoke(self, args, depth)
    }

    /// The same function with `this` bound to `receiver`
    pub(crate) fn bind(&self, receiver: Receiver) -> Self {
        Self {
            def: Rc::clone(&self.def),
            receiver: Some(receiver),
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.def, &other.def)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.params().join(", "))
    }
}

/// A getter/setter pair standing in for a stored value
#[derive(Clone, Debug, PartialEq)]
pub struct Accessor {
    getter: Option<Function>,
    setter: Option<Function>,
}

impl Accessor {
    pub fn new(getter: Option<Function>, setter: Option<Function>) -> Self {
        Self { getter, setter }
    }

    pub fn getter(&self) -> Option<&Function> {
        self.getter.as_ref()
    }

    pub fn setter(&self) -> Option<&Function> {
        self.setter.as_ref()
    }

    pub(crate) fn read(&self, depth: usize) -> Result<Value, RuntimeError> {
        match &self.getter {
            Some(getter) => getter.call_at(Vec::new(), depth),
            None => Ok(Value::Undefined),
        }
    }

    pub(crate) fn write(&self, property: &str, value: Value, depth: usize) -> Result<(), RuntimeError> {
        match &self.setter {
            Some(setter) => setter.call_at(vec![value], depth).map(|_| ()),
            None => Err(RuntimeError::ReadOnly {
                property: property.to_string(),
            }),
        }
    }
}

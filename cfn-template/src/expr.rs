//! Property values: literals, containers and intrinsic functions.

use core::fmt::{self, Display};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::error::ExprError;

/// A scalar JSON value.
///
/// Numbers compare by value when either side is a float, so `300` equals
/// `300.0`.
#[derive(Debug, Clone)]
pub enum Literal {
    /// `null`
    Null,
    /// `true` or `false`
    Bool(bool),
    /// Any JSON number
    Number(Number),
    /// A string
    String(String),
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Null, Literal::Null) => true,
            (Literal::Bool(a), Literal::Bool(b)) => a == b,
            (Literal::Number(a), Literal::Number(b)) => {
                a == b || ((a.is_f64() || b.is_f64()) && a.as_f64() == b.as_f64())
            }
            (Literal::String(a), Literal::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Literal {
    fn to_json(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(n.clone()),
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

/// A value inside a template: either plain data or an intrinsic function.
///
/// Intrinsics are inert. Nothing here evaluates a `Fn::If` or resolves a
/// `Ref`; two expressions are equal when their trees are equal. Map equality
/// ignores key order.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A scalar
    Literal(Literal),
    /// A JSON array
    List(Vec<Expr>),
    /// A JSON object that is not an intrinsic
    Map(IndexMap<String, Expr>),
    /// `{"Ref": id}`: a resource, parameter or pseudo parameter
    Ref(String),
    /// `{"Fn::GetAtt": [resource, attribute]}`
    GetAtt {
        /// Logical ID of the resource
        resource: String,
        /// Attribute name, e.g. `AllocationId`
        attribute: String,
    },
    /// `{"Fn::If": [condition, then, otherwise]}`
    If {
        /// Name of the gating condition
        condition: String,
        /// Value when the condition holds
        then: Box<Expr>,
        /// Value otherwise
        otherwise: Box<Expr>,
    },
    /// `{"Fn::Join": [delimiter, [parts...]]}`
    Join {
        /// Separator placed between parts
        delimiter: String,
        /// The joined values
        parts: Vec<Expr>,
    },
    /// `{"Condition": name}`, as used inside condition bodies
    Condition(String),
    /// Any other `Fn::*` intrinsic, kept as its name and raw arguments.
    ///
    /// Also holds a `Fn::Join` whose list, or a `Fn::GetAtt` whose attribute,
    /// is computed by another intrinsic.
    Fn {
        /// Full intrinsic name, e.g. `Fn::Equals`
        name: String,
        /// The arguments, usually a list
        args: Box<Expr>,
    },
}

impl Expr {
    /// `null`
    pub fn null() -> Self {
        Expr::Literal(Literal::Null)
    }

    /// `{"Ref": id}`
    pub fn reference(id: impl Into<String>) -> Self {
        Expr::Ref(id.into())
    }

    /// `{"Fn::GetAtt": [resource, attribute]}`
    pub fn get_att(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        Expr::GetAtt {
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }

    /// `{"Fn::If": [condition, then, otherwise]}`
    pub fn if_(
        condition: impl Into<String>,
        then: impl Into<Expr>,
        otherwise: impl Into<Expr>,
    ) -> Self {
        Expr::If {
            condition: condition.into(),
            then: Box::new(then.into()),
            otherwise: Box::new(otherwise.into()),
        }
    }

    /// `{"Fn::Join": [delimiter, parts]}`
    pub fn join(delimiter: impl Into<String>, parts: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Join {
            delimiter: delimiter.into(),
            parts: parts.into_iter().collect(),
        }
    }

    /// `{"Condition": name}`
    pub fn condition(name: impl Into<String>) -> Self {
        Expr::Condition(name.into())
    }

    /// Another intrinsic, named without its `Fn::` prefix: `Expr::fn_("Equals", ...)`.
    pub fn fn_(name: &str, args: impl Into<Expr>) -> Self {
        Expr::Fn {
            name: format!("Fn::{name}"),
            args: Box::new(args.into()),
        }
    }

    /// A map from key/value pairs, in order.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Expr)>) -> Self {
        Expr::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// A `{"Key": key, "Value": value}` tag entry.
    pub fn tag(key: impl Into<String>, value: impl Into<Expr>) -> Self {
        let key: String = key.into();
        Expr::map([("Key", Expr::from(key)), ("Value", value.into())])
    }

    /// Short name of the variant as it appears in JSON.
    pub fn kind(&self) -> &str {
        match self {
            Expr::Literal(Literal::Null) => "null",
            Expr::Literal(Literal::Bool(_)) => "bool",
            Expr::Literal(Literal::Number(_)) => "number",
            Expr::Literal(Literal::String(_)) => "string",
            Expr::List(_) => "list",
            Expr::Map(_) => "map",
            Expr::Ref(_) => "Ref",
            Expr::GetAtt { .. } => "Fn::GetAtt",
            Expr::If { .. } => "Fn::If",
            Expr::Join { .. } => "Fn::Join",
            Expr::Condition(_) => "Condition",
            Expr::Fn { name, .. } => name,
        }
    }

    /// Read an expression from JSON.
    ///
    /// An object with exactly one key that is `Ref`, `Condition` or starts
    /// with `Fn::` is an intrinsic. Everything else is plain data.
    pub fn from_json(value: &Value) -> Result<Self, ExprError> {
        match value {
            Value::Null => Ok(Expr::null()),
            Value::Bool(b) => Ok(Expr::Literal(Literal::Bool(*b))),
            Value::Number(n) => Ok(Expr::Literal(Literal::Number(n.clone()))),
            Value::String(s) => Ok(Expr::Literal(Literal::String(s.clone()))),
            Value::Array(items) => items
                .iter()
                .map(Expr::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Expr::List),
            Value::Object(map) => {
                if map.len() == 1
                    && let Some((key, arg)) = map.iter().next()
                    && let Some(expr) = Self::intrinsic_from_json(key, arg)?
                {
                    return Ok(expr);
                }
                map.iter()
                    .map(|(k, v)| Expr::from_json(v).map(|expr| (k.clone(), expr)))
                    .collect::<Result<IndexMap<_, _>, _>>()
                    .map(Expr::Map)
            }
        }
    }

    fn intrinsic_from_json(key: &str, arg: &Value) -> Result<Option<Self>, ExprError> {
        let expr = match key {
            "Ref" => match arg {
                Value::String(id) => Expr::Ref(id.clone()),
                _ => return Err(ExprError::new(key, "expected a logical ID string")),
            },
            // IAM policy statements use `Condition` as a plain key with an object value
            "Condition" => match arg {
                Value::String(name) => Expr::Condition(name.clone()),
                _ => return Ok(None),
            },
            "Fn::GetAtt" => match arg {
                Value::String(dotted) => {
                    let (resource, attribute) = dotted.split_once('.').ok_or_else(|| {
                        ExprError::new(key, "expected `resource.attribute`")
                    })?;
                    Expr::get_att(resource, attribute)
                }
                Value::Array(items) => match items.as_slice() {
                    [Value::String(resource), Value::String(attribute)] => {
                        Expr::get_att(resource.as_str(), attribute.as_str())
                    }
                    // attribute computed by another intrinsic
                    [Value::String(_), Value::Object(_)] => Self::opaque(key, arg)?,
                    _ => return Err(ExprError::new(key, "expected [resource, attribute]")),
                },
                _ => return Err(ExprError::new(key, "expected [resource, attribute]")),
            },
            "Fn::If" => match arg.as_array().map(Vec::as_slice) {
                Some([Value::String(condition), then, otherwise]) => Expr::If {
                    condition: condition.clone(),
                    then: Box::new(Expr::from_json(then)?),
                    otherwise: Box::new(Expr::from_json(otherwise)?),
                },
                _ => return Err(ExprError::new(key, "expected [condition, then, else]")),
            },
            "Fn::Join" => match arg.as_array().map(Vec::as_slice) {
                Some([Value::String(delimiter), Value::Array(parts)]) => Expr::Join {
                    delimiter: delimiter.clone(),
                    parts: parts
                        .iter()
                        .map(Expr::from_json)
                        .collect::<Result<Vec<_>, ExprError>>()?,
                },
                // list produced by another intrinsic, e.g. a `List<...>` parameter
                Some([Value::String(_), Value::Object(_)]) => Self::opaque(key, arg)?,
                _ => return Err(ExprError::new(key, "expected [delimiter, [parts...]]")),
            },
            name if name.starts_with("Fn::") => Self::opaque(name, arg)?,
            _ => return Ok(None),
        };
        Ok(Some(expr))
    }

    fn opaque(name: &str, arg: &Value) -> Result<Self, ExprError> {
        Ok(Expr::Fn {
            name: name.to_owned(),
            args: Box::new(Expr::from_json(arg)?),
        })
    }

    /// Write the expression back as JSON. `Fn::GetAtt` always uses the array form.
    pub fn to_json(&self) -> Value {
        match self {
            Expr::Literal(literal) => literal.to_json(),
            Expr::List(items) => Value::Array(items.iter().map(Expr::to_json).collect()),
            Expr::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Expr::Ref(id) => single("Ref", Value::String(id.clone())),
            Expr::GetAtt {
                resource,
                attribute,
            } => single(
                "Fn::GetAtt",
                Value::Array(vec![
                    Value::String(resource.clone()),
                    Value::String(attribute.clone()),
                ]),
            ),
            Expr::If {
                condition,
                then,
                otherwise,
            } => single(
                "Fn::If",
                Value::Array(vec![
                    Value::String(condition.clone()),
                    then.to_json(),
                    otherwise.to_json(),
                ]),
            ),
            Expr::Join { delimiter, parts } => single(
                "Fn::Join",
                Value::Array(vec![
                    Value::String(delimiter.clone()),
                    Value::Array(parts.iter().map(Expr::to_json).collect()),
                ]),
            ),
            Expr::Condition(name) => single("Condition", Value::String(name.clone())),
            Expr::Fn { name, args } => single(name, args.to_json()),
        }
    }

    /// Visit this expression and every expression nested in it, depth first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::List(items) => items.iter().for_each(|item| item.walk(visit)),
            Expr::Map(map) => map.values().for_each(|value| value.walk(visit)),
            Expr::If {
                then, otherwise, ..
            } => {
                then.walk(visit);
                otherwise.walk(visit);
            }
            Expr::Join { parts, .. } => parts.iter().for_each(|part| part.walk(visit)),
            Expr::Fn { args, .. } => args.walk(visit),
            Expr::Literal(_) | Expr::Ref(_) | Expr::GetAtt { .. } | Expr::Condition(_) => {}
        }
    }

    /// Every logical ID targeted by a `Ref` or `Fn::GetAtt`.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.walk(&mut |expr| match expr {
            Expr::Ref(id) => out.push(id.as_str()),
            Expr::GetAtt { resource, .. } => out.push(resource.as_str()),
            _ => {}
        });
        out
    }

    /// Every condition named by an `Fn::If` or a `Condition` expression.
    pub fn conditions(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.walk(&mut |expr| match expr {
            Expr::If { condition, .. } | Expr::Condition(condition) => {
                out.push(condition.as_str())
            }
            _ => {}
        });
        out
    }
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_owned(), value);
    Value::Object(map)
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Expr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Expr::from_json(&value).map_err(serde::de::Error::custom)
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Expr::Literal(Literal::String(value.to_owned()))
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Expr::Literal(Literal::String(value))
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Expr::Literal(Literal::Bool(value))
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::Literal(Literal::Number(value.into()))
    }
}

impl From<Vec<Expr>> for Expr {
    fn from(value: Vec<Expr>) -> Self {
        Expr::List(value)
    }
}

impl From<Literal> for Expr {
    fn from(value: Literal) -> Self {
        Expr::Literal(value)
    }
}

//! Script Descriptor
//!
//! Component files declare behavior with a call to `exportDefault({...})`
//! inside their `<script>`. The script is parsed with oxc and **never
//! executed**: the object literal passed to `exportDefault` is evaluated
//! statically to JSON and then deserialized into a [`ScriptDescriptor`].
//!
//! ## Invariants
//!
//! 1. **Literal only**: strings, numbers, booleans, `null`, `undefined`,
//!    unary `-`/`+`, parentheses, interpolation-free template literals,
//!    arrays and nested objects. Anything else is a script error.
//! 2. **Functions are source**: function expressions, arrows and object
//!    methods evaluate to their source text. Their behavior is supplied by
//!    the host through a handler set.
//! 3. **Later exports win**: multiple `exportDefault` calls are merged
//!    shallowly in program order.

use indexmap::IndexMap;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ArrayExpressionElement, CallExpression, Expression, ObjectExpression, ObjectPropertyKind,
    PropertyKey, PropertyKind,
};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};
use oxc_syntax::operator::UnaryOperator;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::define::PropertySpec;
use crate::error::{ElementError, Result};

/// Name of the call that hands a descriptor to the loader.
pub const EXPORT_PRIMITIVE: &str = "exportDefault";

/// Behavior declared by a component file's script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScriptDescriptor {
    pub use_shadow: bool,
    pub observed_attributes: Vec<String>,
    /// Method name → source text.
    pub methods: IndexMap<String, String>,
    pub properties: IndexMap<String, PropertySpec>,
    pub init: Option<String>,
    pub connected: Option<String>,
    pub disconnected: Option<String>,
    pub attribute_changed: Option<String>,
    pub property_changed: Option<String>,
}

impl ScriptDescriptor {
    /// Top-level hooks the script declares, by method-table name.
    pub fn declared_hooks(&self) -> Vec<&str> {
        [
            ("init", &self.init),
            ("connected", &self.connected),
            ("disconnected", &self.disconnected),
            ("attributeChanged", &self.attribute_changed),
            ("propertyChanged", &self.property_changed),
        ]
        .into_iter()
        .filter(|(_, source)| source.is_some())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Evaluate `source` and deserialize its export into a descriptor.
pub fn evaluate_descriptor(source: &str) -> Result<ScriptDescriptor> {
    let value = evaluate_exports(source)?;
    serde_json::from_value(value).map_err(|e| ElementError::script(e.to_string()))
}

/// Evaluate every `exportDefault(...)` call in `source` and merge the results.
/// A script without exports yields an empty object.
pub fn evaluate_exports(source: &str) -> Result<Value> {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_module(true);
    let ret = Parser::new(&allocator, source, source_type).parse();

    if let Some(error) = ret.errors.first() {
        return Err(ElementError::script(error.to_string()));
    }

    let mut collector = ExportCollector {
        source,
        exports: Vec::new(),
    };
    collector.visit_program(&ret.program);

    let mut merged = Map::new();
    for export in collector.exports {
        match export? {
            Value::Object(fields) => merged.extend(fields),
            other => {
                return Err(ElementError::script(format!(
                    "{} expects an object literal, got {}",
                    EXPORT_PRIMITIVE, other
                )))
            }
        }
    }
    Ok(Value::Object(merged))
}

struct ExportCollector<'s> {
    source: &'s str,
    exports: Vec<Result<Value>>,
}

impl<'a> Visit<'a> for ExportCollector<'_> {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &call.callee {
            if callee.name == EXPORT_PRIMITIVE {
                let export = match call.arguments.first().and_then(|arg| arg.as_expression()) {
                    Some(expr) => self.evaluate(expr).map(|v| v.unwrap_or(Value::Null)),
                    None => Err(ElementError::script(format!(
                        "{} requires one object argument",
                        EXPORT_PRIMITIVE
                    ))),
                };
                self.exports.push(export);
            }
        }
        oxc_ast_visit::walk::walk_call_expression(self, call);
    }
}

impl ExportCollector<'_> {
    fn slice(&self, span: Span) -> &str {
        &self.source[span.start as usize..span.end as usize]
    }

    fn unsupported(&self, span: Span) -> ElementError {
        ElementError::script(format!("unsupported expression `{}`", self.slice(span)))
    }

    /// `Ok(None)` stands for `undefined`.
    fn evaluate(&self, expr: &Expression<'_>) -> Result<Option<Value>> {
        let value = match expr {
            Expression::StringLiteral(s) => Value::String(s.value.to_string()),
            Expression::NumericLiteral(n) => number_value(n.value, || self.unsupported(n.span))?,
            Expression::BooleanLiteral(b) => Value::Bool(b.value),
            Expression::NullLiteral(_) => Value::Null,
            Expression::Identifier(id) if id.name == "undefined" => return Ok(None),
            Expression::ParenthesizedExpression(p) => return self.evaluate(&p.expression),
            Expression::UnaryExpression(u)
                if matches!(u.operator, UnaryOperator::UnaryNegation | UnaryOperator::UnaryPlus) =>
            {
                let Expression::NumericLiteral(n) = &u.argument else {
                    return Err(self.unsupported(u.span));
                };
                let sign = if matches!(u.operator, UnaryOperator::UnaryNegation) { -1.0 } else { 1.0 };
                number_value(sign * n.value, || self.unsupported(u.span))?
            }
            Expression::TemplateLiteral(t) if t.expressions.is_empty() => Value::String(
                t.quasis
                    .iter()
                    .map(|q| q.value.cooked.as_ref().unwrap_or(&q.value.raw).to_string())
                    .collect(),
            ),
            Expression::ArrayExpression(array) => {
                let mut items = Vec::with_capacity(array.elements.len());
                for element in &array.elements {
                    match element {
                        ArrayExpressionElement::SpreadElement(spread) => {
                            return Err(self.unsupported(spread.span))
                        }
                        ArrayExpressionElement::Elision(_) => items.push(Value::Null),
                        other => {
                            let Some(expr) = other.as_expression() else {
                                return Err(self.unsupported(array.span));
                            };
                            items.push(self.evaluate(expr)?.unwrap_or(Value::Null));
                        }
                    }
                }
                Value::Array(items)
            }
            Expression::ObjectExpression(object) => self.evaluate_object(object)?,
            Expression::FunctionExpression(f) => Value::String(self.slice(f.span).to_string()),
            Expression::ArrowFunctionExpression(f) => Value::String(self.slice(f.span).to_string()),
            other => return Err(self.unsupported(other.span())),
        };
        Ok(Some(value))
    }

    fn evaluate_object(&self, object: &ObjectExpression<'_>) -> Result<Value> {
        let mut fields = Map::new();
        for property in &object.properties {
            let ObjectPropertyKind::ObjectProperty(p) = property else {
                return Err(self.unsupported(property.span()));
            };
            if p.computed || !matches!(p.kind, PropertyKind::Init) {
                return Err(self.unsupported(p.span));
            }
            let key = match &p.key {
                PropertyKey::StaticIdentifier(id) => id.name.to_string(),
                PropertyKey::StringLiteral(s) => s.value.to_string(),
                PropertyKey::NumericLiteral(n) => n.value.to_string(),
                _ => return Err(self.unsupported(p.span)),
            };
            if p.method {
                fields.insert(key, Value::String(self.slice(p.span).to_string()));
                continue;
            }
            if let Some(value) = self.evaluate(&p.value)? {
                fields.insert(key, value);
            }
        }
        Ok(Value::Object(fields))
    }
}

fn number_value(n: f64, unsupported: impl FnOnce() -> ElementError) -> Result<Value> {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        return Ok(Value::from(n as i64));
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(unsupported)
}

//! Building templates.

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::error::TemplateError;
use crate::expr::Expr;
use crate::template::{Output, Parameter, Resource, Template};

/// Format version emitted by [`Stack::synth`].
pub const FORMAT_VERSION: &str = "2010-09-09";

/// A mutable collection of template sections.
///
/// Constructs add parameters, conditions, resources and outputs under unique
/// logical IDs; [`Stack::synth`] checks that everything they reference is
/// declared and freezes the result into a [`Template`].
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    description: Option<String>,
    parameters: IndexMap<String, Parameter>,
    conditions: IndexMap<String, Expr>,
    resources: IndexMap<String, Resource>,
    outputs: IndexMap<String, Output>,
}

impl Stack {
    /// An empty stack.
    pub fn new(name: impl Into<String>) -> Self {
        Stack {
            name: name.into(),
            description: None,
            parameters: IndexMap::new(),
            conditions: IndexMap::new(),
            resources: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    /// The stack name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the template description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    /// Declare a parameter.
    pub fn add_parameter(
        &mut self,
        id: impl Into<String>,
        parameter: Parameter,
    ) -> Result<(), TemplateError> {
        insert_unique(&mut self.parameters, "parameter", id.into(), parameter)
    }

    /// Declare a named condition.
    pub fn add_condition(
        &mut self,
        name: impl Into<String>,
        body: Expr,
    ) -> Result<(), TemplateError> {
        insert_unique(&mut self.conditions, "condition", name.into(), body)
    }

    /// Declare a resource.
    pub fn add_resource(
        &mut self,
        id: impl Into<String>,
        resource: Resource,
    ) -> Result<(), TemplateError> {
        let id = id.into();
        tracing::trace!(stack = %self.name, %id, type_name = %resource.type_name, "add resource");
        insert_unique(&mut self.resources, "resource", id, resource)
    }

    /// Declare an output.
    pub fn add_output(
        &mut self,
        id: impl Into<String>,
        output: Output,
    ) -> Result<(), TemplateError> {
        insert_unique(&mut self.outputs, "output", id.into(), output)
    }

    /// Validate references and produce the template.
    pub fn synth(&self) -> Result<Template, TemplateError> {
        self.validate()?;
        tracing::debug!(
            stack = %self.name,
            resources = self.resources.len(),
            conditions = self.conditions.len(),
            "synthesized"
        );
        Ok(Template {
            format_version: Some(FORMAT_VERSION.to_owned()),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
            conditions: self.conditions.clone(),
            resources: self.resources.clone(),
            outputs: self.outputs.clone(),
            ..Template::default()
        })
    }

    fn validate(&self) -> Result<(), TemplateError> {
        for (name, body) in &self.conditions {
            self.check_expr(&format!("condition `{name}`"), body)?;
        }

        for (id, resource) in &self.resources {
            let from = format!("resource `{id}`");
            if let Some(condition) = &resource.condition {
                self.check_condition(&from, condition)?;
            }
            if let Some(target) = resource
                .depends_on
                .iter()
                .find(|target| !self.resources.contains_key(*target))
            {
                return Err(TemplateError::UnresolvedReference {
                    from,
                    target: target.clone(),
                });
            }
            for expr in resource.expressions() {
                self.check_expr(&from, expr)?;
            }
        }

        for (id, output) in &self.outputs {
            let from = format!("output `{id}`");
            if let Some(condition) = &output.condition {
                self.check_condition(&from, condition)?;
            }
            self.check_expr(&from, &output.value)?;
            if let Some(export) = &output.export {
                self.check_expr(&from, export)?;
            }
        }

        Ok(())
    }

    fn check_expr(&self, from: &str, expr: &Expr) -> Result<(), TemplateError> {
        let mut unresolved = None;
        expr.walk(&mut |node| {
            if unresolved.is_some() {
                return;
            }
            match node {
                Expr::Ref(target) if !self.resolves_ref(target) => unresolved = Some(target),
                Expr::GetAtt { resource, .. } if !self.resources.contains_key(resource) => {
                    unresolved = Some(resource)
                }
                _ => {}
            }
        });
        if let Some(target) = unresolved {
            return Err(TemplateError::UnresolvedReference {
                from: from.to_owned(),
                target: target.clone(),
            });
        }

        for condition in expr.conditions() {
            self.check_condition(from, condition)?;
        }
        Ok(())
    }

    fn check_condition(&self, from: &str, condition: &str) -> Result<(), TemplateError> {
        if self.conditions.contains_key(condition) {
            Ok(())
        } else {
            Err(TemplateError::UndeclaredCondition {
                from: from.to_owned(),
                condition: condition.to_owned(),
            })
        }
    }

    /// Pseudo parameters (`AWS::Region`, `AWS::StackName`, ...) always resolve.
    fn resolves_ref(&self, target: &str) -> bool {
        target.starts_with("AWS::")
            || self.resources.contains_key(target)
            || self.parameters.contains_key(target)
    }
}

fn insert_unique<V>(
    map: &mut IndexMap<String, V>,
    kind: &'static str,
    id: String,
    value: V,
) -> Result<(), TemplateError> {
    match map.entry(id) {
        Entry::Occupied(entry) => Err(TemplateError::DuplicateLogicalId {
            kind,
            id: entry.key().clone(),
        }),
        Entry::Vacant(entry) => {
            entry.insert(value);
            Ok(())
        }
    }
}

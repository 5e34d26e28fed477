//! Action and plugin descriptors handed to hosts.

use std::{fmt, future::Future, pin::Pin, sync::Arc};

use serde::Serialize;
use serde_json::{json, Value};

use crate::{client::Config, errors::Result, schema::InputSchema};

/// Boxed future type for async action handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handler invoked with the raw action input and the invocation context.
pub type ActionHandler = Arc<dyn Fn(Value, Config) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// Wrap an async function as an [`ActionHandler`].
pub fn handler<F, Fut>(f: F) -> ActionHandler
where
    F: Fn(Value, Config) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Arc::new(move |input, cfg| Box::pin(f(input, cfg)))
}

/// One invocable action.
#[derive(Clone)]
pub struct ActionDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: InputSchema,
    pub output_schema: Value,
    handler: ActionHandler,
}

impl ActionDescriptor {
    pub fn new(
        name: &'static str,
        description: &'static str,
        input_schema: InputSchema,
        handler: ActionHandler,
    ) -> Self {
        Self {
            name,
            description,
            input_schema,
            output_schema: json!({ "type": "object" }),
            handler,
        }
    }

    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = schema;
        self
    }

    pub async fn execute(&self, input: Value, cfg: &Config) -> Result<Value> {
        (self.handler)(input, cfg.clone()).await
    }

    pub fn manifest(&self) -> ActionManifest {
        ActionManifest {
            name: self.name,
            description: self.description,
            input_schema: self.input_schema.to_json(),
            output_schema: self.output_schema.clone(),
        }
    }
}

impl fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Static metadata for one provider plugin plus its actions.
///
/// Mega-plugins expose a single action named after the plugin that dispatches
/// on the `action` input field. Other plugins expose one descriptor per action.
#[derive(Debug)]
pub struct PluginDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    pub tags: &'static [&'static str],
    pub documentation: &'static str,
    pub input_schema: InputSchema,
    pub output_schema: Value,
    pub example_input: Value,
    pub example_output: Value,
    actions: Vec<ActionDescriptor>,
}

impl PluginDescriptor {
    pub fn builder(id: &'static str, name: &'static str) -> PluginDescriptorBuilder {
        PluginDescriptorBuilder {
            descriptor: PluginDescriptor {
                id,
                name,
                description: "",
                version: "1.0.0",
                tags: &[],
                documentation: "",
                input_schema: InputSchema::default(),
                output_schema: json!({ "type": "object" }),
                example_input: Value::Null,
                example_output: Value::Null,
                actions: Vec::new(),
            },
        }
    }

    /// Actions in registration order. Descriptors are built once, so this
    /// slice is the same on every access.
    pub fn actions(&self) -> &[ActionDescriptor] {
        &self.actions
    }

    pub fn action(&self, name: &str) -> Option<&ActionDescriptor> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn manifest(&self) -> PluginManifest {
        PluginManifest {
            id: self.id,
            name: self.name,
            description: self.description,
            version: self.version,
            tags: self.tags,
            documentation: self.documentation,
            input_schema: self.input_schema.to_json(),
            output_schema: self.output_schema.clone(),
            example_input: self.example_input.clone(),
            example_output: self.example_output.clone(),
            actions: self.actions.iter().map(ActionDescriptor::manifest).collect(),
        }
    }
}

pub struct PluginDescriptorBuilder {
    descriptor: PluginDescriptor,
}

impl PluginDescriptorBuilder {
    pub fn description(mut self, description: &'static str) -> Self {
        self.descriptor.description = description;
        self
    }

    pub fn version(mut self, version: &'static str) -> Self {
        self.descriptor.version = version;
        self
    }

    pub fn tags(mut self, tags: &'static [&'static str]) -> Self {
        self.descriptor.tags = tags;
        self
    }

    pub fn documentation(mut self, url: &'static str) -> Self {
        self.descriptor.documentation = url;
        self
    }

    pub fn input_schema(mut self, schema: InputSchema) -> Self {
        self.descriptor.input_schema = schema;
        self
    }

    pub fn output_schema(mut self, schema: Value) -> Self {
        self.descriptor.output_schema = schema;
        self
    }

    pub fn example(mut self, input: Value, output: Value) -> Self {
        self.descriptor.example_input = input;
        self.descriptor.example_output = output;
        self
    }

    pub fn action(mut self, action: ActionDescriptor) -> Self {
        self.descriptor.actions.push(action);
        self
    }

    pub fn build(self) -> Arc<PluginDescriptor> {
        Arc::new(self.descriptor)
    }
}

/// Serializable view of an [`ActionDescriptor`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionManifest {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    pub output_schema: Value,
}

/// Serializable view of a [`PluginDescriptor`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    pub tags: &'static [&'static str],
    pub documentation: &'static str,
    pub input_schema: Value,
    pub output_schema: Value,
    pub example_input: Value,
    pub example_output: Value,
    pub actions: Vec<ActionManifest>,
}

//! Datamorph Core
//!
//! A script-driven data-transformation engine: typed input documents
//! (JSON, CSV, XML, YAML, plain text) are read into lazy values, a
//! compiled script is evaluated against them, and the result is
//! serialized back through the codec registry.

pub mod ast;
pub mod codec;
pub mod error;
pub mod eval;
pub mod header;
pub mod media;
pub mod stdlib;
pub mod value;

pub use ast::{Compile, Expr};
pub use codec::{CodecRegistry, DocumentReader, DocumentWriter};
pub use error::{Error, Position, Result};
pub use header::Header;
pub use media::MediaType;
pub use value::{Lazy, Member, Object, ObjectBuilder, Value, Visibility};

use std::collections::HashMap;
use std::rc::Rc;

use eval::{EvalContext, Scope};

/// A document moving across the engine boundary: content plus its
/// media type.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub media_type: MediaType,
}

impl Document {
    #[must_use]
    pub fn new(content: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            content: content.into(),
            media_type,
        }
    }
}

/// Main entry point — a configured transformation engine.
///
/// Holds the codec registry (immutable after construction), the named
/// resources `readUrl` resolves `classpath://` URLs against, and the
/// external script compiler.
pub struct Engine {
    registry: Rc<CodecRegistry>,
    resources: Rc<HashMap<String, String>>,
    compiler: Option<Box<dyn Compile>>,
}

impl Engine {
    /// Engine with the bundled codecs and no compiler.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(CodecRegistry::with_defaults())
    }

    /// Engine over a caller-supplied codec registry.
    #[must_use]
    pub fn with_registry(registry: CodecRegistry) -> Self {
        Self {
            registry: Rc::new(registry),
            resources: Rc::new(HashMap::new()),
            compiler: None,
        }
    }

    /// Install the script compiler used by [`Engine::transform`].
    #[must_use]
    pub fn with_compiler(mut self, compiler: Box<dyn Compile>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    /// Register a named resource for `readUrl("classpath://<name>")`.
    pub fn add_resource(&mut self, name: impl Into<String>, content: impl Into<String>) {
        Rc::make_mut(&mut self.resources).insert(name.into(), content.into());
    }

    /// Run a transformation: parse the script header, compile the
    /// body, read every input through the codec registry, evaluate,
    /// and serialize the result. An explicit `output` media type
    /// overrides any `output` header declaration.
    pub fn transform(
        &self,
        script: &str,
        inputs: &HashMap<String, Document>,
        output: Option<&MediaType>,
    ) -> Result<Document> {
        let (header, body) = Header::extract(script)?;
        let compiler = self
            .compiler
            .as_ref()
            .ok_or_else(|| Error::eval("No script compiler installed"))?;
        let expr = compiler.compile(&body)?;
        self.transform_expr(&header, &expr, inputs, output)
    }

    /// Evaluate a pre-compiled expression under the given header
    /// declarations.
    pub fn transform_expr(
        &self,
        header: &Header,
        expr: &Expr,
        inputs: &HashMap<String, Document>,
        output: Option<&MediaType>,
    ) -> Result<Document> {
        tracing::debug!(inputs = inputs.len(), "starting transformation");
        let ctx = EvalContext::new(Rc::clone(&self.registry), Rc::clone(&self.resources));

        let mut bindings = value::Bindings::new();
        bindings.insert("ds".to_string(), Lazy::of(stdlib::install()));
        for (name, document) in inputs {
            let media_type = header.resolve_input(name, &document.media_type);
            let value = self.registry.read(&document.content, &media_type)?;
            bindings.insert(name.clone(), Lazy::of(value));
        }

        let result = eval::eval(&ctx, expr, &Scope::root(bindings))?;

        let mut media_type = header.resolve_output(output);
        if !header.preserve_order {
            media_type
                .parameters
                .insert("preserveorder".to_string(), "false".to_string());
        }
        let content = self.registry.write(&result, &media_type)?;
        tracing::debug!(media_type = %media_type, "transformation finished");
        Ok(Document::new(content, media_type))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

//! Signal resolution
//!
//! The second pass of a load. The parsed YAML tree is converted into a
//! [`Value`] tree depth-first, children before their parent:
//!
//! - a string starting with the function marker becomes a [`Function`] bound
//!   to the container that holds it
//! - a string starting with the include marker is replaced by the loaded
//!   document, which goes through the whole pipeline with the same syntax
//! - a nested mapping whose keys are exactly the get key, the set key or both
//!   is replaced by an [`Accessor`] whose functions are bound to the
//!   enclosing container
//!
//! Everything else converts as plain data.

mod loader;

pub use loader::{FileLoader, FsLoader, MemoryLoader};

use std::path::{Path, PathBuf};

use crate::config::{resolve_config, SyntaxConfig, SyntaxOverrides};
use crate::error::LoadError;
use crate::parser::markers::{detect, Signal};
use crate::parser::{parse_yaml, LineTransformer};
use crate::value::{
    from_scalar, mapping_key, Accessor, Function, Mapping, Receiver, Sequence, Value,
};

/// Loads documents with one syntax configuration and one file source.
///
/// ```
/// use yaml_script::{Loader, MemoryLoader, SyntaxOverrides, Value};
///
/// let files = MemoryLoader::with_files([("shared.yaml", "answer: 42")]);
/// let loader = Loader::with_file_loader(&SyntaxOverrides::new(), files).unwrap();
///
/// let doc = loader.load("shared: @include shared.yaml").unwrap();
/// assert_eq!(doc.get("shared").unwrap().get("answer").unwrap(), Value::from(42));
/// ```
#[derive(Debug)]
pub struct Loader<F: FileLoader = FsLoader> {
    config: SyntaxConfig,
    transformer: LineTransformer,
    files: F,
}

impl Loader<FsLoader> {
    /// Create a loader that reads includes from disk
    pub fn new(overrides: &SyntaxOverrides) -> Result<Self, LoadError> {
        Self::with_file_loader(overrides, FsLoader)
    }
}

impl<F: FileLoader> Loader<F> {
    /// Create a loader that reads includes through `files`
    pub fn with_file_loader(overrides: &SyntaxOverrides, files: F) -> Result<Self, LoadError> {
        let config = resolve_config(overrides);
        let transformer = LineTransformer::new(&config)?;
        Ok(Self {
            config,
            transformer,
            files,
        })
    }

    /// The syntax this loader recognizes
    pub fn config(&self) -> &SyntaxConfig {
        &self.config
    }

    pub fn file_loader(&self) -> &F {
        &self.files
    }

    /// Load a document from text
    pub fn load(&self, text: &str) -> Result<Value, LoadError> {
        self.resolver().resolve_text(text)
    }

    /// Load a document through the file loader
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Value, LoadError> {
        self.resolver().resolve_file(path.as_ref())
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver {
            config: &self.config,
            transformer: &self.transformer,
            files: &self.files,
            include_stack: Vec::new(),
        }
    }
}

/// State of a single load call
struct Resolver<'a> {
    config: &'a SyntaxConfig,
    transformer: &'a LineTransformer,
    files: &'a dyn FileLoader,
    /// Identities of the documents currently being loaded, outermost first
    include_stack: Vec<PathBuf>,
}

impl Resolver<'_> {
    fn resolve_text(&mut self, text: &str) -> Result<Value, LoadError> {
        let transformed = self.transformer.transform(text);
        let yaml = parse_yaml(&transformed)?;
        self.resolve(yaml, None)
    }

    fn resolve_file(&mut self, path: &Path) -> Result<Value, LoadError> {
        let identity = self.files.identity(path);
        if self.include_stack.contains(&identity) {
            let mut chain = self.include_stack.clone();
            chain.push(identity);
            return Err(LoadError::IncludeCycle { chain });
        }

        tracing::debug!(
            path = %path.display(),
            depth = self.include_stack.len(),
            "loading document"
        );

        let text = self.files.read(path)?;
        self.include_stack.push(identity);
        let result = self.resolve_text(&text);
        self.include_stack.pop();
        result
    }

    /// Convert one node. `owner` is the container the node is stored in.
    fn resolve(
        &mut self,
        node: serde_yaml::Value,
        owner: Option<&Receiver>,
    ) -> Result<Value, LoadError> {
        match node {
            serde_yaml::Value::String(text) => self.resolve_string(&text, owner),
            serde_yaml::Value::Sequence(items) => {
                let sequence = Sequence::new();
                let receiver = sequence.downgrade();
                for (index, item) in items.into_iter().enumerate() {
                    let value = self.resolve_child(&index.to_string(), item, &receiver)?;
                    sequence.push(value);
                }
                Ok(Value::Sequence(sequence))
            }
            serde_yaml::Value::Mapping(entries) => {
                let mapping = Mapping::new();
                let receiver = mapping.downgrade();
                for (key, item) in entries {
                    let key = mapping_key(&key)?;
                    let value = self.resolve_child(&key, item, &receiver)?;
                    mapping.insert(key, value);
                }
                Ok(Value::Mapping(mapping))
            }
            serde_yaml::Value::Tagged(tagged) => self.resolve(tagged.value, owner),
            scalar => Ok(from_scalar(&scalar)),
        }
    }

    fn resolve_child(
        &mut self,
        key: &str,
        node: serde_yaml::Value,
        owner: &Receiver,
    ) -> Result<Value, LoadError> {
        // Only a mapping written in place can turn into an accessor, never an included one
        let nested = matches!(node, serde_yaml::Value::Mapping(_));
        let value = self.resolve(node, Some(owner))?;

        match value {
            Value::Mapping(child) if nested && self.is_accessor(&child) => {
                self.accessor(key, &child, owner)
            }
            value => Ok(value),
        }
    }

    fn is_accessor(&self, child: &Mapping) -> bool {
        let keys = child.keys();
        self.config
            .is_accessor_key_set(keys.iter().map(String::as_str))
    }

    /// Build the accessor for `key` from its get/set container
    fn accessor(&self, key: &str, child: &Mapping, owner: &Receiver) -> Result<Value, LoadError> {
        let part = |name: &str| match child.get_raw(name) {
            None => Ok(None),
            Some(Value::Function(function)) => Ok(Some(function.bind(owner.clone()))),
            Some(_) => Err(LoadError::InvalidAccessor {
                key: key.to_string(),
            }),
        };

        let getter = part(&self.config.get_key)?;
        let setter = part(&self.config.set_key)?;
        tracing::trace!(
            key,
            getter = getter.is_some(),
            setter = setter.is_some(),
            "created accessor"
        );

        Ok(Value::Accessor(Accessor::new(getter, setter)))
    }

    fn resolve_string(&mut self, text: &str, owner: Option<&Receiver>) -> Result<Value, LoadError> {
        match detect(text)? {
            Some(Signal::Function { params, body }) => {
                let function =
                    Function::new(params, body).map_err(|err| LoadError::FunctionSyntax {
                        message: err.to_string(),
                        source_text: body.to_string(),
                    })?;
                tracing::trace!(params = ?function.params(), "materialized function");
                Ok(Value::Function(match owner {
                    Some(owner) => function.bind(owner.clone()),
                    None => function,
                }))
            }
            Some(Signal::Include { path }) => self.resolve_file(Path::new(path)),
            None => Ok(Value::from(text)),
        }
    }
}

/// Resolve an already parsed tree.
///
/// Includes found in `node` are loaded through `files` and run through the
/// whole pipeline with `config`.
pub fn resolve(
    node: serde_yaml::Value,
    config: &SyntaxConfig,
    files: &dyn FileLoader,
) -> Result<Value, LoadError> {
    let transformer = LineTransformer::new(config)?;
    let mut resolver = Resolver {
        config,
        transformer: &transformer,
        files,
        include_stack: Vec::new(),
    };
    resolver.resolve(node, None)
}

/// Load a document from text, reading includes from disk
pub fn load(text: &str, overrides: &SyntaxOverrides) -> Result<Value, LoadError> {
    Loader::new(overrides)?.load(text)
}

/// Load a document from a file on disk
pub fn load_from_file(
    path: impl AsRef<Path>,
    overrides: &SyntaxOverrides,
) -> Result<Value, LoadError> {
    Loader::new(overrides)?.load_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn memory_loader(files: &[(&str, &str)]) -> Loader<MemoryLoader> {
        let files = MemoryLoader::with_files(files.iter().copied());
        Loader::with_file_loader(&SyntaxOverrides::new(), files).unwrap()
    }

    fn load_default(text: &str) -> Value {
        load(text, &SyntaxOverrides::new()).unwrap()
    }

    #[test]
    fn test_plain_document() {
        let doc = load_default("name: demo\ncount: 3\nitems:\n  - a\n  - b\n");
        assert_eq!(doc.get("name").unwrap(), Value::from("demo"));
        assert_eq!(doc.get("count").unwrap(), Value::from(3));
        assert_eq!(doc.get("items").unwrap().index(1).unwrap(), Value::from("b"));
    }

    #[test]
    fn test_inline_function_is_bound_to_owner() {
        let doc = load_default("base: 40\nadd: (n) return this.base + n;\n");
        let add = doc.get("add").unwrap();
        assert_eq!(add.call(&[Value::from(2)]).unwrap(), Value::from(42));
        assert_eq!(add.as_function().unwrap().this(), doc);
    }

    #[test]
    fn test_function_in_sequence_is_bound_to_sequence() {
        let doc = load_default("list:\n  - 5\n  - () return this[0] * 2;\n");
        let list = doc.get("list").unwrap();
        assert_eq!(list.index(1).unwrap().call(&[]).unwrap(), Value::from(10));
    }

    #[test]
    fn test_accessor_replaces_nested_container() {
        let doc = load_default(
            "stored: 1\nprop:\n  get: () return this.stored;\n  set: (v) this.stored = v + 1;\n",
        );
        let mapping = doc.as_mapping().unwrap();
        assert_matches!(mapping.get_raw("prop"), Some(Value::Accessor(_)));
        assert!(!mapping.contains_key("get"));
        assert!(!mapping.contains_key("set"));

        mapping.set("prop", 4).unwrap();
        assert_eq!(mapping.get("prop").unwrap(), Value::from(5));
    }

    #[test]
    fn test_mapping_with_extra_keys_stays_plain() {
        let doc = load_default("prop:\n  get: () return 1;\n  other: 2\n");
        let prop = doc.get("prop").unwrap();
        assert!(prop.as_mapping().is_some());
        assert_eq!(prop.get("get").unwrap().call(&[]).unwrap(), Value::from(1));
    }

    #[test]
    fn test_root_mapping_is_never_an_accessor() {
        let doc = load_default("get: () return 1;\n");
        assert!(doc.as_mapping().is_some());
    }

    #[test]
    fn test_accessor_value_must_be_function() {
        let err = load("prop:\n  get: 42\n", &SyntaxOverrides::new()).unwrap_err();
        assert_matches!(err, LoadError::InvalidAccessor { key } if key == "prop");
    }

    #[test]
    fn test_body_syntax_error() {
        let err = load("f: () return (;\n", &SyntaxOverrides::new()).unwrap_err();
        assert_matches!(err, LoadError::FunctionSyntax { .. });
    }

    #[test]
    fn test_yaml_error_reports_position() {
        let err = load("a: 1\nb: [unclosed\n", &SyntaxOverrides::new()).unwrap_err();
        assert_matches!(err, LoadError::Parse { line, .. } if line > 0);
    }

    #[test]
    fn test_include_from_memory() {
        let loader = memory_loader(&[("inc.yaml", "included:\n  property1: 42\n")]);
        let doc = loader.load("inc: @include inc.yaml\nlist:\n  - @include inc.yaml\n").unwrap();

        let via_key = doc.get("inc").unwrap().get("included").unwrap();
        assert_eq!(via_key.get("property1").unwrap(), Value::from(42));
        let via_item = doc.get("list").unwrap().index(0).unwrap();
        assert_eq!(
            via_item.get("included").unwrap().get("property1").unwrap(),
            Value::from(42)
        );
    }

    #[test]
    fn test_included_accessor_shape_is_spliced_as_is() {
        let loader = memory_loader(&[("acc.yaml", "get: () return 1;\n")]);
        let doc = loader.load("inc: @include acc.yaml\n").unwrap();
        assert!(doc.get("inc").unwrap().as_mapping().is_some());
    }

    #[test]
    fn test_nested_include_error_propagates_unchanged() {
        let loader = memory_loader(&[("outer.yaml", "inner: @include missing.yaml\n")]);
        let err = loader.load("outer: @include outer.yaml\n").unwrap_err();
        assert_matches!(err, LoadError::IncludeNotFound { path } if path == Path::new("missing.yaml"));
    }

    #[test]
    fn test_include_cycle_detected() {
        let loader = memory_loader(&[
            ("a.yaml", "b: @include b.yaml\n"),
            ("b.yaml", "a: @include a.yaml\n"),
        ]);
        let err = loader.load_file("a.yaml").unwrap_err();
        assert_matches!(err, LoadError::IncludeCycle { chain } if chain.len() == 3);
    }

    #[test]
    fn test_same_file_included_twice_is_not_a_cycle() {
        let loader = memory_loader(&[("leaf.yaml", "x: 1\n")]);
        let doc = loader
            .load("one: @include leaf.yaml\ntwo: @include leaf.yaml\n")
            .unwrap();
        assert_eq!(doc.get("two").unwrap().get("x").unwrap(), Value::from(1));
    }

    #[test]
    fn test_resolve_parsed_tree() {
        let files = MemoryLoader::with_files([("n.yaml", "7")]);
        let text = format!(
            "n: {}\nf: {} return x + 1;\n",
            crate::parser::markers::include_marker("n.yaml"),
            crate::parser::markers::function_marker("x")
        );
        let node: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();

        let doc = resolve(node, &SyntaxConfig::default(), &files).unwrap();
        assert_eq!(doc.get("n").unwrap(), Value::from(7));
        assert_eq!(doc.get("f").unwrap().call(&[Value::from(1)]).unwrap(), Value::from(2));
    }

    #[test]
    fn test_root_function_is_unbound() {
        let text = format!("{} return a;", crate::parser::markers::function_marker("a"));
        let doc = load_default(&text);
        let function = doc.as_function().unwrap();
        assert_eq!(function.this(), Value::Undefined);
        assert_eq!(doc.call(&[Value::from("x")]).unwrap(), Value::from("x"));
    }
}

//! yaml-script: YAML documents with embedded functions, accessors and includes
//!
//! This library loads YAML extended with a few line-level constructs:
//! - Inline functions: `key: (a, b) return a + b;`
//! - Multiline functions: a `key: (a, b)` header followed by an indented body
//! - Accessors: a nested mapping holding only `get` and/or `set` functions
//! - Includes: `key: @include path/to/other.yaml`
//!
//! Loading runs in two passes. The line transformer rewrites the extension
//! syntax into marker strings so the text becomes plain YAML, `serde_yaml`
//! parses it, and the resolver turns the markers into live values.
//!
//! # Example
//!
//! ```
//! use yaml_script::{load, SyntaxOverrides, Value};
//!
//! let text = "\
//! total: 0
//! double: (n) return n * 2;
//! counter:
//!   get: () return this.total;
//!   set: (value) this.total = value + 1;
//! ";
//!
//! let doc = load(text, &SyntaxOverrides::new()).unwrap();
//! assert_eq!(doc.get("double").unwrap().call(&[Value::from(21)]).unwrap(), Value::from(42));
//!
//! doc.set("counter", 4).unwrap();
//! assert_eq!(doc.get("counter").unwrap(), Value::from(5));
//! ```

pub mod config;
pub mod error;
pub mod parser;
pub mod resolver;
pub mod script;
pub mod value;

pub use config::{resolve_config, SyntaxConfig, SyntaxOverrides};
pub use error::{LoadError, RuntimeError};
pub use resolver::{load, load_from_file, FileLoader, FsLoader, Loader, MemoryLoader};
pub use value::{Accessor, Function, Mapping, Number, Sequence, Value};

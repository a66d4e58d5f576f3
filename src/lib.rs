/*!
# swagger-codec

OpenAPI 2.0 ("Swagger") document generation from introspected API
descriptions.

A web framework's introspection layer materializes an [`ApiDescription`]
(endpoints with typed, possibly nested and self-referential data shapes);
this crate converts it into a serializable Swagger document. Repeated
composite shapes are factored into shared `definitions` entries and
referenced with `$ref`; shapes whose name turns out to be structurally
unstable are reconciled by inlining instead.

## Usage

```rust
use swagger_codec::{ApiDescription, SwaggerConfig, SwaggerGenerator};

let config = SwaggerConfig::new("My API", "1.0.0")
    .with_base_url("https://api.example.com");
let mut generator = SwaggerGenerator::new(config);
let description = ApiDescription::new(); // endpoint graph from introspection
let spec = generator.generate(&description).unwrap();
assert_eq!(spec.swagger, "2.0");
```
*/

// Re-export main types
pub use crate::{
    config::SwaggerConfig,
    error::{SwaggerError, SwaggerResult},
    fields::{ApiDescription, Endpoint, FieldKind, FieldLocation, FieldNode, Link, LinkField},
    generator::SwaggerGenerator,
    registry::DefinitionRegistry,
    specification::SwaggerSpec,
    utils::{SwaggerUtils, ValidationLevel, ValidationWarning},
};

// Core modules
pub mod config;
pub mod error;
pub mod fields;
pub mod specification;

// Schema conversion
pub mod classify;
pub mod registry;
pub mod schema;

// Document assembly
pub mod generator;
pub mod operations;

// Utilities
pub mod utils;

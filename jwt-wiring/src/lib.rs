// Wiring of JOSE components:
// 1. A declarative `JwtConfig` names every algorithm, key, key set and checker
// 2. The `Registry` registers one lazy binding per key, key set and profile
// 3. The first `get` of a binding resolves its entries through the host's
//    `ResolutionContext` and caches the result
// 4. Downstream code (the `TokenIssuer` and `TokenVerifier`) consumes the
//    cached objects
//
// System components:
//  - Entry resolver and key set composer
//  - Algorithm and checker manager assemblers
//  - Lazy binding registry

pub mod algorithm;
pub mod checker;
pub mod component;
pub mod config;
pub mod context;
mod e2e_tests;
pub mod error;
pub mod issuer;
pub mod keys;
pub mod model;
pub mod registry;
pub mod resolver;
#[cfg(test)]
mod testing;
pub mod time;
pub mod verifier;

pub use component::{Component, DomainKind};
pub use context::{Factory, ResolutionContext, ServiceContainer};
pub use error::{ContextError, RegistryError};
pub use issuer::{IssueError, TokenIssuer};
pub use keys::KeySet;
pub use model::{Entry, JwtConfig, KeySetEntry};
pub use registry::{Namespace, Registry};
pub use verifier::{TokenVerifier, VerifyError};

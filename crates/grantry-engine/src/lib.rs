//! Grantry Engine - permission definitions, grant resolution and grant
//! management
//!
//! Composition is explicit: build a [`PermissionRegistry`] once, then hand
//! the same `Arc` to a [`PermissionChecker`] and a [`PermissionManager`]
//! together with the store (optionally wrapped in a cache) and an
//! [`EventBus`] carrying the cache invalidation handler.

pub mod checker;
pub mod declared;
pub mod dynamic;
pub mod events;
pub mod manager;
pub mod policy;
pub mod registry;
pub mod seeder;
pub mod tree;


pub use checker::{CheckerOptions, PermissionChecker};
pub use declared::{DeclaredDefinitionProvider, GroupSpec, PermissionSpec};
pub use dynamic::{merge_dynamic_records, DynamicPermissionService};
pub use events::{AuditLogHandler, DispatchMode, EventBus};
pub use manager::{GrantDiff, PermissionManager};
pub use policy::{AuthorizationDecision, PermissionRequirement, PolicyEvaluator, PERMISSION_POLICY_PREFIX};
pub use registry::{DefinitionManager, PermissionRegistry, RegistryBuilder};
pub use seeder::{PermissionDataSeeder, SeedFailure, SeedOptions, SeedReport};
pub use tree::{PermissionGroupView, PermissionNodeView, PermissionTreeService, PermissionUpdate};

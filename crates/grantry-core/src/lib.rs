//! Grantry Core - Domain types and traits for the permission engine

pub mod definition;
pub mod error;
pub mod events;
pub mod ids;
pub mod models;
pub mod tenant;
pub mod traits;
pub mod validation;


pub use definition::*;
pub use error::*;
pub use events::*;
pub use ids::*;
pub use models::*;
pub use tenant::CurrentTenant;
pub use traits::*;

pub mod common;
pub mod info;
pub mod lines;
pub mod lookup;
pub mod methods;
pub mod scopes;
pub mod sources;

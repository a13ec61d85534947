pub mod category;
pub mod margin;

pub use category::CategoryResolver;

//! PHPDoc block parsing.
//!
//! # Submodules
//!
//! - [`types`]: the docblock type-expression parser ([`DocblockType`]).
//! - [`tags`]: tag extraction ([`parse_docblock`]) and docblock lookup for
//!   AST nodes and inline `/** @var */` comments.

pub mod tags;
pub mod types;

pub use tags::{
    DocblockData, MethodTag, MethodTagParam, ParamTag, PropertyTag, Tag, TypeTag, VarTag,
    find_inline_var_docblock, get_docblock_for_node, parse_docblock,
};
pub use types::DocblockType;

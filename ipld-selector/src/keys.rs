//! Wire keys of the serialized selector form. These are shared with other
//! implementations and must not change.

pub const MATCHER: &str = ".";
pub const EXPLORE_ALL: &str = "a";
pub const EXPLORE_FIELDS: &str = "f";
pub const EXPLORE_INDEX: &str = "i";
pub const EXPLORE_RANGE: &str = "r";
pub const EXPLORE_UNION: &str = "|";
pub const EXPLORE_RECURSIVE: &str = "R";
pub const EXPLORE_RECURSIVE_EDGE: &str = "@";

pub const NEXT: &str = ">";
pub const FIELDS: &str = "f>";
pub const INDEX: &str = "i";
pub const START: &str = "^";
pub const END: &str = "$";
pub const LIMIT: &str = "d";
/// Accepted when parsing; never written.
pub const LIMIT_ALT: &str = "l";
pub const SEQUENCE: &str = ":>";

pub const LIMIT_DEPTH: &str = "d";
/// Accepted when parsing; never written.
pub const LIMIT_DEPTH_ALT: &str = "depth";
pub const LIMIT_NONE: &str = "none";
